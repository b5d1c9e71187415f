//! Presence record wire types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use viewcount_common::RecordId;

/// One (url, session) liveness claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceRecord {
    pub id: RecordId,
    pub url: String,
    pub session_id: String,
    /// Time of the last renewal; set on create and on every patch.
    #[serde(rename = "updated", with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl PresenceRecord {
    /// Live iff renewed less than `threshold` ago.
    pub fn is_live(&self, now: DateTime<Utc>, threshold: std::time::Duration) -> bool {
        now - self.updated_at < crate::clock::to_chrono(threshold)
    }
}

/// Body of a create request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPresence {
    pub url: String,
    pub session_id: String,
}

/// Body of a renewal. Every patch is a full-state write of the listed fields;
/// the store stamps `updated` itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresencePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl PresencePatch {
    /// Heartbeat patch: rewrites the session id, which bumps `updated`.
    pub fn touch(session_id: &str) -> Self {
        Self {
            url: None,
            session_id: Some(session_id.to_string()),
        }
    }
}

/// One page of a list query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPage {
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
    pub items: Vec<PresenceRecord>,
}

/// PocketBase datetime strings: `2024-01-31 12:00:00.000Z`.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3fZ";

    pub fn format(ts: &DateTime<Utc>) -> String {
        ts.format(FORMAT).to_string()
    }

    /// Accepts the PocketBase format and RFC 3339.
    pub fn parse(raw: &str) -> Result<DateTime<Utc>, String> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Ok(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw.trim_end_matches('Z'), "%Y-%m-%d %H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|e| format!("invalid timestamp {raw:?}: {e}"))
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    fn record_at(updated_at: DateTime<Utc>) -> PresenceRecord {
        PresenceRecord {
            id: RecordId::from("r1"),
            url: "https://x/a".into(),
            session_id: "sess_a".into(),
            updated_at,
        }
    }

    #[test]
    fn liveness_is_strictly_within_threshold() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let threshold = Duration::from_secs(120);
        assert!(record_at(now - chrono::Duration::seconds(119)).is_live(now, threshold));
        assert!(!record_at(now - chrono::Duration::seconds(120)).is_live(now, threshold));
        assert!(!record_at(now - chrono::Duration::seconds(130)).is_live(now, threshold));
    }

    #[test]
    fn parses_pocketbase_record() {
        let json = r#"{
            "collectionId": "pbc_123",
            "collectionName": "viewers",
            "id": "abc123def456ghi",
            "url": "https://x/a",
            "session_id": "sess_abc_123",
            "created": "2024-01-31 11:59:00.000Z",
            "updated": "2024-01-31 12:00:00.250Z"
        }"#;
        let record: PresenceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id.as_str(), "abc123def456ghi");
        assert_eq!(
            record.updated_at,
            Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap()
                + chrono::Duration::milliseconds(250)
        );
    }

    #[test]
    fn timestamp_accepts_rfc3339() {
        let ts = timestamp::parse("2024-01-31T12:00:00Z").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap());
        assert!(timestamp::parse("yesterday").is_err());
    }

    #[test]
    fn timestamp_formats_like_pocketbase() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap();
        assert_eq!(timestamp::format(&ts), "2024-01-31 12:00:00.000Z");
    }

    #[test]
    fn touch_patch_serializes_session_only() {
        let json = serde_json::to_value(PresencePatch::touch("sess_a")).unwrap();
        assert_eq!(json, serde_json::json!({ "session_id": "sess_a" }));
    }

    #[test]
    fn record_page_uses_camel_case() {
        let page: RecordPage = serde_json::from_str(
            r#"{"page":1,"perPage":1,"totalItems":7,"totalPages":7,"items":[]}"#,
        )
        .unwrap();
        assert_eq!(page.total_items, 7);
        assert_eq!(page.per_page, 1);
    }
}
