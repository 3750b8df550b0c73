use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::domain::DashError;

/// A single user as delivered by the record source.
///
/// Only `id`, `name` and `email` are expected to be present. Everything else
/// degrades to "absent" when missing or of the wrong JSON type, so one broken
/// record never fails the whole snapshot.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct UserRecord {
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub email: String,
    #[serde(default, deserialize_with = "lenient_optional_text")]
    pub avatar: Option<String>,
    #[serde(
        rename = "createdAt",
        default,
        deserialize_with = "lenient_optional_text"
    )]
    pub created_at: Option<String>,
}

impl UserRecord {
    pub fn has_avatar(&self) -> bool {
        self.avatar.as_deref().is_some_and(|a| !a.is_empty())
    }

    /// Parsed creation time, `None` when missing or unparseable.
    pub fn created(&self) -> Option<DateTime<FixedOffset>> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }

    /// Calendar day as written in the timestamp, i.e. in the timestamp's own offset.
    pub fn created_day(&self) -> Option<NaiveDate> {
        self.created().map(|dt| dt.date_naive())
    }
}

/// Parses the timestamp formats seen in the user API.
///
/// Values without an offset (`2024-01-01T10:00:00`, `2024-01-01`) are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;
    Some(Utc.from_utc_datetime(&naive).into())
}

/// Parses a response body into a record snapshot.
///
/// The body has to be a JSON array. Elements that are not objects or carry no
/// usable `id` are skipped and logged.
pub fn parse_records(body: &str) -> Result<Vec<UserRecord>, DashError> {
    let value: Value = serde_json::from_str(body)?;
    let Value::Array(items) = value else {
        return Err(DashError::LoadingFailed(
            "expected a JSON array of users".to_string(),
        ));
    };

    let mut records = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<UserRecord>(item) {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!("Skipping user #{idx}: {e}"),
        }
    }
    Ok(records)
}

fn lenient_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "unsupported id value {other}"
        ))),
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_optional_text(deserializer)?.unwrap_or_default())
}

fn lenient_optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
pub(crate) fn user(id: &str, name: &str, email: &str, created_at: Option<&str>) -> UserRecord {
    UserRecord {
        id: id.to_string(),
        name: name.to_string(),
        email: email.to_string(),
        avatar: None,
        created_at: created_at.map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn parses_mock_api_payload() {
        let body = r#"[
            {"createdAt":"2025-07-13T21:17:47.457Z","name":"Ann","avatar":"https://a/1.jpg","email":"ann@x.com","id":"1"},
            {"createdAt":"2025-07-14T05:00:00Z","name":"Bob","avatar":"","email":"bob@x.com","id":2}
        ]"#;
        let records = parse_records(body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "1");
        assert!(records[0].has_avatar());
        assert_eq!(records[1].id, "2");
        assert!(!records[1].has_avatar());
    }

    #[test]
    fn broken_fields_degrade_to_absent() {
        let body = r#"[
            {"id":"1","name":"Ann","email":"a@x.com","createdAt":null,"avatar":false},
            {"id":"2","name":"Bob","email":"b@x.com","createdAt":"yesterday"},
            {"id":"3"},
            {"name":"no id"},
            42
        ]"#;
        let records = parse_records(body).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].created_at, None);
        assert!(!records[0].has_avatar());
        assert_eq!(records[1].created(), None);
        assert_eq!(records[2].name, "");
    }

    #[test]
    fn rejects_non_array_body() {
        assert!(matches!(
            parse_records(r#"{"users": []}"#),
            Err(DashError::LoadingFailed(_))
        ));
        assert!(matches!(parse_records("<html>"), Err(DashError::JsonError(_))));
    }

    #[test]
    fn timestamp_formats() {
        let dt = parse_timestamp("2024-01-02T05:00:00+02:00").unwrap();
        assert_eq!(dt.hour(), 5);
        assert_eq!(dt.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());

        let naive = parse_timestamp("2024-01-02T23:30:00.123").unwrap();
        assert_eq!(naive.offset().local_minus_utc(), 0);
        assert_eq!(naive.hour(), 23);

        let day = parse_timestamp("2024-01-02").unwrap();
        assert_eq!(day.hour(), 0);

        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("02/01/2024"), None);
    }

    #[test]
    fn created_day_uses_timestamp_offset() {
        let record = user("1", "Ann", "a@x.com", Some("2024-01-02T00:30:00+02:00"));
        assert_eq!(
            record.created_day(),
            Some(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
        );
    }
}
