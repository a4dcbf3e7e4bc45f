pub mod authoring;
pub mod types;
pub mod validate;
