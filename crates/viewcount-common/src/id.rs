use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of store-assigned record ids (matches PocketBase's 15-char ids).
const RECORD_ID_LEN: usize = 15;

pub fn new_client_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Generate a lowercase alphanumeric record id.
pub fn new_record_id() -> String {
    let uuid = uuid::Uuid::new_v4();
    uuid.simple().to_string()[..RECORD_ID_LEN].to_string()
}

/// Opaque identifier assigned by the store when a record is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new() -> Self {
        Self(new_record_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_id_is_valid_uuid() {
        let id = new_client_id();
        let parsed = uuid::Uuid::parse_str(&id);
        assert!(parsed.is_ok());
        assert_eq!(parsed.unwrap().get_version_num(), 4);
    }

    #[test]
    fn record_id_length() {
        assert_eq!(new_record_id().len(), RECORD_ID_LEN);
    }

    #[test]
    fn record_id_is_lower_alnum() {
        let id = new_record_id();
        assert!(id
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn record_id_is_unique() {
        assert_ne!(RecordId::new(), RecordId::new());
    }

    #[test]
    fn record_id_display() {
        let id = RecordId::from("abc123");
        assert_eq!(id.to_string(), "abc123");
        assert_eq!(id.as_str(), "abc123");
    }

    #[test]
    fn record_id_serializes_as_plain_string() {
        let id = RecordId::from("r1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"r1\"");
        let back: RecordId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
