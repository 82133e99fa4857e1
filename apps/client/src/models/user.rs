use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// The authenticated identity as returned by the auth endpoints.
/// Replaced wholesale on every login, registration and `/auth/me` fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(
        default,
        deserialize_with = "deserialize_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

/// Offset-free forms the backend emits for naive database columns.
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Accepts RFC 3339 or a naive datetime, which is taken to be UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}"))),
    }
}

impl User {
    /// Name to show in prompts and menus; falls back to the email.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_user_gets_defaults() {
        let user: User = serde_json::from_str(r#"{"id":"1","email":"a@x.com"}"#).unwrap();
        assert_eq!(user.id, "1");
        assert!(user.is_active);
        assert!(!user.is_verified);
        assert!(user.name.is_none());
        assert!(user.created_at.is_none());
        assert_eq!(user.display_name(), "a@x.com");
    }

    #[test]
    fn test_full_backend_user() {
        let user: User = serde_json::from_str(
            r#"{
                "id": "6f1c",
                "email": "dana@example.com",
                "name": "Dana",
                "is_active": false,
                "is_verified": true,
                "created_at": "2024-03-01T12:00:00Z"
            }"#,
        )
        .unwrap();
        assert!(!user.is_active);
        assert!(user.is_verified);
        assert_eq!(user.display_name(), "Dana");
        assert_eq!(user.created_at.unwrap().to_rfc3339(), "2024-03-01T12:00:00+00:00");
    }

    #[test]
    fn test_naive_created_at_is_read_as_utc() {
        let user: User = serde_json::from_str(
            r#"{"id":"6f1c","email":"dana@example.com","name":"Dana","is_active":true,"is_verified":false,"created_at":"2024-03-01T12:00:00.123456"}"#,
        )
        .unwrap();
        let noon = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(
            user.created_at,
            Some(noon + chrono::Duration::microseconds(123_456))
        );
    }

    #[test]
    fn test_timestamp_forms() {
        let noon = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-01T12:00:00"), Some(noon));
        assert_eq!(parse_timestamp("2024-03-01 12:00:00"), Some(noon));
        assert_eq!(parse_timestamp("2024-03-01T14:00:00+02:00"), Some(noon));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_null_created_at_and_bad_timestamp() {
        let user: User =
            serde_json::from_str(r#"{"id":"1","email":"a@x.com","created_at":null}"#).unwrap();
        assert!(user.created_at.is_none());

        let err = serde_json::from_str::<User>(r#"{"id":"1","email":"a@x.com","created_at":"soon"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("invalid timestamp"));
    }

    #[test]
    fn test_persisted_user_survives_reload() {
        let user: User = serde_json::from_str(
            r#"{"id":"1","email":"a@x.com","created_at":"2024-03-01T12:00:00.5"}"#,
        )
        .unwrap();
        let reloaded: User = serde_json::from_str(&serde_json::to_string(&user).unwrap()).unwrap();
        assert_eq!(reloaded, user);
    }
}
