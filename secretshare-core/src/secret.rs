//! The secret record and the submission it is built from

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::duration::ActiveDuration;
use crate::error::ShareError;

/// A stored one-time secret
#[derive(Clone, PartialEq, Eq)]
pub struct Secret {
    /// Partition key
    pub secret_id: String,
    pub message: String,
    pub secret_key: String,
    pub active_duration: ActiveDuration,
    /// Sort key and TTL attribute, Unix seconds
    pub expiration_time: i64,
}

impl Secret {
    /// Build the record for a new submission written at `now`.
    pub fn create(secret_id: impl Into<String>, submission: NewSecret, now: DateTime<Utc>) -> Self {
        let active_duration = submission.active_duration();
        let expiration_time = (now + active_duration.duration()).timestamp();

        Self {
            secret_id: secret_id.into(),
            message: submission.message,
            secret_key: submission.secret_key,
            active_duration,
            expiration_time,
        }
    }

    /// Whether the secret is past its expiration at Unix time `now`
    pub fn is_expired(&self, now: i64) -> bool {
        self.expiration_time <= now
    }
}

// Message and key stay out of logs.
impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secret")
            .field("secret_id", &self.secret_id)
            .field("message", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .field("active_duration", &self.active_duration)
            .field("expiration_time", &self.expiration_time)
            .finish()
    }
}

/// Body of a write request
///
/// Field names match case-insensitively, with the exact spelling preferred
/// when several casings are present. Missing or `null` `Message` and
/// `SecretKey` decode as empty strings. Unknown fields, including a
/// `SecretID`, are ignored.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewSecret {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub secret_key: String,
    #[serde(default)]
    pub active_duration: Option<String>,
}

const FIELD_NAMES: [&str; 3] = ["Message", "SecretKey", "ActiveDuration"];

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// Rewrites `message`, `SECRETKEY` and the like to their canonical names.
fn canonical_fields(fields: Map<String, Value>) -> Map<String, Value> {
    let mut canonical = Map::with_capacity(fields.len());
    for (name, value) in fields {
        match FIELD_NAMES
            .iter()
            .find(|field| field.eq_ignore_ascii_case(&name))
        {
            Some(field) if *field == name => {
                canonical.insert(name, value);
            }
            Some(field) => {
                canonical.entry(*field).or_insert(value);
            }
            None => {
                canonical.insert(name, value);
            }
        }
    }
    canonical
}

impl NewSecret {
    pub fn from_json(body: &[u8]) -> Result<Self, ShareError> {
        let malformed = |e: serde_json::Error| ShareError::malformed_request(e.to_string());

        let value = match serde_json::from_slice(body).map_err(malformed)? {
            Value::Object(fields) => Value::Object(canonical_fields(fields)),
            other => other,
        };
        serde_json::from_value(value).map_err(malformed)
    }

    /// The requested duration, normalised
    pub fn active_duration(&self) -> ActiveDuration {
        ActiveDuration::normalize(self.active_duration.as_deref())
    }
}

impl std::fmt::Debug for NewSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewSecret")
            .field("message_len", &self.message.len())
            .field("active_duration", &self.active_duration)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_parse_submission() {
        let body = br#"{"Message":"hello","SecretKey":"k1","ActiveDuration":"12h"}"#;
        let submission = NewSecret::from_json(body).unwrap();

        assert_eq!(submission.message, "hello");
        assert_eq!(submission.secret_key, "k1");
        assert_eq!(submission.active_duration(), ActiveDuration::TwelveHours);
    }

    #[test]
    fn test_parse_submission_missing_fields() {
        let submission = NewSecret::from_json(b"{}").unwrap();

        assert_eq!(submission.message, "");
        assert_eq!(submission.secret_key, "");
        assert_eq!(submission.active_duration(), ActiveDuration::OneHour);
    }

    #[test]
    fn test_parse_submission_field_names_ignore_case() {
        let body = br#"{"message":"lower","SECRETKEY":"k","activeDuration":"24h"}"#;
        let submission = NewSecret::from_json(body).unwrap();

        assert_eq!(submission.message, "lower");
        assert_eq!(submission.secret_key, "k");
        assert_eq!(submission.active_duration(), ActiveDuration::TwentyFourHours);
    }

    #[test]
    fn test_parse_submission_exact_name_wins() {
        let body = br#"{"message":"other","Message":"exact","SecretKey":"k"}"#;
        assert_eq!(NewSecret::from_json(body).unwrap().message, "exact");

        let body = br#"{"Message":"exact","MESSAGE":"other","SecretKey":"k"}"#;
        assert_eq!(NewSecret::from_json(body).unwrap().message, "exact");
    }

    #[test]
    fn test_parse_submission_null_fields() {
        let body = br#"{"Message":null,"SecretKey":null,"ActiveDuration":null}"#;
        let submission = NewSecret::from_json(body).unwrap();

        assert_eq!(submission.message, "");
        assert_eq!(submission.secret_key, "");
        assert_eq!(submission.active_duration(), ActiveDuration::OneHour);
    }

    #[test]
    fn test_parse_submission_rejects_bad_json() {
        let bodies: [&[u8]; 4] = [
            b"",
            b"not json",
            br#"{"Message": 42}"#,
            br#"{"ActiveDuration": 1}"#,
        ];
        for body in bodies {
            let err = NewSecret::from_json(body).unwrap_err();
            assert_eq!(err.code, ErrorCode::MalformedRequest);
        }
    }

    #[test]
    fn test_create_computes_expiration() {
        let submission = NewSecret {
            message: "hello".to_string(),
            secret_key: "k1".to_string(),
            active_duration: Some("2h".to_string()),
        };

        let secret = Secret::create("abc", submission, at(1_700_000_000));

        assert_eq!(secret.secret_id, "abc");
        assert_eq!(secret.active_duration, ActiveDuration::TwoHours);
        assert_eq!(secret.expiration_time, 1_700_000_000 + 2 * 3600);
        assert!(!secret.is_expired(1_700_000_000));
        assert!(secret.is_expired(1_700_000_000 + 2 * 3600));
    }

    #[test]
    fn test_create_normalizes_invalid_duration() {
        let submission = NewSecret {
            active_duration: Some("7d".to_string()),
            ..NewSecret::default()
        };

        let secret = Secret::create("abc", submission, at(1_000));

        assert_eq!(secret.active_duration, ActiveDuration::OneHour);
        assert_eq!(secret.expiration_time, 1_000 + 3600);
    }

    #[test]
    fn test_body_cannot_choose_secret_id() {
        let body = br#"{"SecretID":"chosen","Message":"m","SecretKey":"k"}"#;
        let secret = Secret::create("derived", NewSecret::from_json(body).unwrap(), at(0));
        assert_eq!(secret.secret_id, "derived");
    }

    #[test]
    fn test_debug_redacts_payload() {
        let secret = Secret::create(
            "abc",
            NewSecret {
                message: "top secret".to_string(),
                secret_key: "hunter2".to_string(),
                active_duration: None,
            },
            at(0),
        );

        let rendered = format!("{:?}", secret);
        assert!(!rendered.contains("top secret"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("abc"));
    }
}
