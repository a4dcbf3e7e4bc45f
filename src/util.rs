use chrono::{DateTime, Utc};

pub fn now_string() -> String {
  Utc::now().to_rfc3339()
}

pub fn is_past(timestamp: &str) -> bool {
  DateTime::parse_from_rfc3339(timestamp)
    .map(|value| value.with_timezone(&Utc) < Utc::now())
    .unwrap_or(false)
}

#[cfg(test)]
mod tests {
  use super::is_past;

  #[test]
  fn compares_rfc3339_timestamps_against_now() {
    assert!(is_past("2001-01-01T00:00:00+00:00"));
    assert!(!is_past("2999-01-01T00:00:00+00:00"));
    assert!(!is_past("not a timestamp"));
  }
}
