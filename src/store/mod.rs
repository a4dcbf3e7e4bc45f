use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::response::types::{Respondent, RespondentSeed, Response};
use crate::survey::types::{Question, QuestionType, Survey};
use crate::user::User;
use crate::util::now_string;

/// Durable records for users, surveys, questions, respondents, and
/// responses, backed by SQLite. Multi-row writes run as single
/// transactions; the duplicate-submission guard re-checks inside a write
/// transaction so racing submissions serialize on the database lock.
pub struct SurveyStore {
    conn: Connection,
}

impl SurveyStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn insert_user(&mut self, user: &User) -> Result<()> {
        let inserted = self.conn.execute(
            "INSERT INTO users (id, name, email, credential_hash, is_verified, created_at) \
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user.id,
                user.name,
                user.email,
                user.credential_hash,
                user.is_verified,
                user.created_at
            ],
        );
        match inserted {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(code, _))
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::InvalidInput(
                    "a user with this email already exists".to_string(),
                ))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn find_user(&self, user_id: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, name, email, credential_hash, is_verified, created_at \
                FROM users WHERE id = ?1",
                params![user_id],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, name, email, credential_hash, is_verified, created_at \
                FROM users WHERE email = ?1",
                params![email],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn insert_survey(&mut self, survey: &Survey, questions: &[Question]) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO surveys (id, title, description, creator_id, is_published, is_active, \
            settings, published_at, expires_at, created_at, updated_at) \
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                survey.id,
                survey.title,
                survey.description,
                survey.creator_id,
                survey.is_published,
                survey.is_active,
                to_json(&survey.settings)?,
                survey.published_at,
                survey.expires_at,
                survey.created_at,
                survey.updated_at
            ],
        )?;
        insert_questions(&tx, questions)?;
        tx.commit()?;
        Ok(())
    }

    pub fn survey(&self, survey_id: &str) -> Result<Option<Survey>> {
        let survey = self
            .conn
            .query_row(
                "SELECT id, title, description, creator_id, is_published, is_active, settings, \
                published_at, expires_at, created_at, updated_at FROM surveys WHERE id = ?1",
                params![survey_id],
                survey_from_row,
            )
            .optional()?;
        Ok(survey)
    }

    pub fn surveys_by_creator(&self, creator_id: &str) -> Result<Vec<Survey>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, description, creator_id, is_published, is_active, settings, \
            published_at, expires_at, created_at, updated_at FROM surveys \
            WHERE creator_id = ?1 ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(params![creator_id], survey_from_row)?;

        let mut surveys = Vec::new();
        for row in rows {
            surveys.push(row?);
        }
        Ok(surveys)
    }

    pub fn questions_for_survey(&self, survey_id: &str) -> Result<Vec<Question>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, survey_id, text, question_type, options, required, order_index, \
            validation FROM questions WHERE survey_id = ?1 ORDER BY order_index ASC",
        )?;
        let rows = stmt.query_map(params![survey_id], question_from_row)?;

        let mut questions = Vec::new();
        for row in rows {
            questions.push(row?);
        }
        Ok(questions)
    }

    /// Total responses and completed responses for a survey.
    pub fn response_totals(&self, survey_id: &str) -> Result<(i64, i64)> {
        let totals = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(is_complete), 0) FROM responses WHERE survey_id = ?1",
            params![survey_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(totals)
    }

    /// Updates the survey's scalar fields and replaces its whole question
    /// set in one transaction, so readers never observe a partial set.
    pub fn replace_survey(&mut self, survey: &Survey, questions: &[Question]) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "UPDATE surveys SET title = ?1, description = ?2, settings = ?3, expires_at = ?4, \
            updated_at = ?5 WHERE id = ?6",
            params![
                survey.title,
                survey.description,
                to_json(&survey.settings)?,
                survey.expires_at,
                survey.updated_at,
                survey.id
            ],
        )?;
        tx.execute(
            "DELETE FROM questions WHERE survey_id = ?1",
            params![survey.id],
        )?;
        insert_questions(&tx, questions)?;
        tx.commit()?;
        Ok(())
    }

    pub fn set_published(&mut self, survey: &Survey) -> Result<()> {
        self.conn.execute(
            "UPDATE surveys SET is_published = ?1, published_at = ?2, updated_at = ?3 \
            WHERE id = ?4",
            params![
                survey.is_published,
                survey.published_at,
                survey.updated_at,
                survey.id
            ],
        )?;
        Ok(())
    }

    /// Deletes the survey's responses, questions, and the survey row as one
    /// transaction.
    pub fn delete_survey(&mut self, survey_id: &str) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM responses WHERE survey_id = ?1",
            params![survey_id],
        )?;
        tx.execute(
            "DELETE FROM questions WHERE survey_id = ?1",
            params![survey_id],
        )?;
        tx.execute("DELETE FROM surveys WHERE id = ?1", params![survey_id])?;
        tx.commit()?;
        Ok(())
    }

    pub fn find_respondent_by_email(&self, email: &str) -> Result<Option<Respondent>> {
        let respondent = self
            .conn
            .query_row(
                "SELECT id, email, name, metadata, created_at FROM respondents WHERE email = ?1",
                params![email],
                respondent_from_row,
            )
            .optional()?;
        Ok(respondent)
    }

    pub fn has_completed_response(&self, survey_id: &str, respondent_id: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM responses \
            WHERE survey_id = ?1 AND respondent_id = ?2 AND is_complete = 1",
            params![survey_id, respondent_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Persists a completed response. Respondent resolution, the duplicate
    /// re-check, and the insert run inside one immediate transaction, so two
    /// racing submissions from the same respondent cannot both land when
    /// `enforce_single` is set.
    pub fn insert_completed_response(
        &mut self,
        response: &mut Response,
        seed: Option<&RespondentSeed>,
        enforce_single: bool,
    ) -> Result<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        response.respondent_id = match seed {
            Some(seed) => Some(resolve_respondent(&tx, seed)?),
            None => None,
        };

        if enforce_single {
            if let Some(respondent_id) = &response.respondent_id {
                let count: i64 = tx.query_row(
                    "SELECT COUNT(*) FROM responses \
                    WHERE survey_id = ?1 AND respondent_id = ?2 AND is_complete = 1",
                    params![response.survey_id, respondent_id],
                    |row| row.get(0),
                )?;
                if count > 0 {
                    return Err(Error::Forbidden(
                        "a response has already been submitted for this survey".to_string(),
                    ));
                }
            }
        }

        tx.execute(
            "INSERT INTO responses (id, survey_id, respondent_id, answers, is_complete, \
            submitted_at, ip_address, user_agent, created_at) \
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                response.id,
                response.survey_id,
                response.respondent_id,
                to_json(&response.answers)?,
                response.is_complete,
                response.submitted_at,
                response.ip_address,
                response.user_agent,
                response.created_at
            ],
        )?;
        tx.commit()?;
        Ok(())
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            credential_hash TEXT NOT NULL,
            is_verified INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
          );
          CREATE TABLE IF NOT EXISTS surveys (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            creator_id TEXT NOT NULL,
            is_published INTEGER NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1,
            settings TEXT NOT NULL,
            published_at TEXT,
            expires_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(creator_id) REFERENCES users(id)
          );
          CREATE INDEX IF NOT EXISTS idx_surveys_creator ON surveys(creator_id);
          CREATE TABLE IF NOT EXISTS questions (
            id TEXT PRIMARY KEY,
            survey_id TEXT NOT NULL,
            text TEXT NOT NULL,
            question_type TEXT NOT NULL,
            options TEXT NOT NULL,
            required INTEGER NOT NULL DEFAULT 0,
            order_index INTEGER NOT NULL,
            validation TEXT NOT NULL,
            FOREIGN KEY(survey_id) REFERENCES surveys(id)
          );
          CREATE INDEX IF NOT EXISTS idx_questions_survey ON questions(survey_id);
          CREATE TABLE IF NOT EXISTS respondents (
            id TEXT PRIMARY KEY,
            email TEXT,
            name TEXT,
            metadata TEXT NOT NULL,
            created_at TEXT NOT NULL
          );
          CREATE INDEX IF NOT EXISTS idx_respondents_email ON respondents(email);
          CREATE TABLE IF NOT EXISTS responses (
            id TEXT PRIMARY KEY,
            survey_id TEXT NOT NULL,
            respondent_id TEXT,
            answers TEXT NOT NULL,
            is_complete INTEGER NOT NULL DEFAULT 0,
            submitted_at TEXT,
            ip_address TEXT,
            user_agent TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY(survey_id) REFERENCES surveys(id),
            FOREIGN KEY(respondent_id) REFERENCES respondents(id)
          );
          CREATE INDEX IF NOT EXISTS idx_responses_survey ON responses(survey_id);
          CREATE INDEX IF NOT EXISTS idx_responses_respondent \
            ON responses(survey_id, respondent_id);",
    )?;
    Ok(())
}

fn insert_questions(conn: &Connection, questions: &[Question]) -> Result<()> {
    for question in questions {
        conn.execute(
            "INSERT INTO questions (id, survey_id, text, question_type, options, required, \
            order_index, validation) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                question.id,
                question.survey_id,
                question.text,
                question.question_type.as_str(),
                to_json(&question.options)?,
                question.required,
                question.order,
                to_json(&question.validation)?
            ],
        )?;
    }
    Ok(())
}

/// Reuses the respondent with a matching email, otherwise inserts a new one.
fn resolve_respondent(conn: &Connection, seed: &RespondentSeed) -> Result<String> {
    if let Some(email) = &seed.email {
        let existing: Option<String> = conn
            .query_row(
                "SELECT id FROM respondents WHERE email = ?1",
                params![email],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }
    }

    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO respondents (id, email, name, metadata, created_at) \
        VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, seed.email, seed.name, "{}", now_string()],
    )?;
    Ok(id)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| Error::InvalidInput(format!("serialization failed: {e}")))
}

fn from_json_column<T: serde::de::DeserializeOwned>(
    index: usize,
    raw: String,
) -> rusqlite::Result<T> {
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        credential_hash: row.get(3)?,
        is_verified: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn survey_from_row(row: &Row) -> rusqlite::Result<Survey> {
    Ok(Survey {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        creator_id: row.get(3)?,
        is_published: row.get(4)?,
        is_active: row.get(5)?,
        settings: from_json_column(6, row.get(6)?)?,
        published_at: row.get(7)?,
        expires_at: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn question_from_row(row: &Row) -> rusqlite::Result<Question> {
    let raw_type: String = row.get(3)?;
    let question_type = QuestionType::parse(&raw_type).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown question type: {raw_type}").into(),
        )
    })?;
    Ok(Question {
        id: row.get(0)?,
        survey_id: row.get(1)?,
        text: row.get(2)?,
        question_type,
        options: from_json_column(4, row.get(4)?)?,
        required: row.get(5)?,
        order: row.get(6)?,
        validation: from_json_column(7, row.get(7)?)?,
    })
}

fn respondent_from_row(row: &Row) -> rusqlite::Result<Respondent> {
    Ok(Respondent {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        metadata: from_json_column(3, row.get(3)?)?,
        created_at: row.get(4)?,
    })
}
