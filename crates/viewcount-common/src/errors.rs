use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Failures surfaced by a presence record store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The presence collection has not been provisioned yet.
    #[error("couldn't find collection: {0}")]
    CollectionNotFound(String),

    #[error("record not found: {0}")]
    RecordNotFound(String),

    /// A record for the same (url, session_id) pair already exists.
    #[error("conflicting record: {0}")]
    Conflict(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("store api error: HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("store parse error: {0}")]
    Parse(String),

    #[error("transaction failed: {0}")]
    Transaction(String),
}

impl StoreError {
    /// True for the first-run condition where nothing has registered yet.
    pub fn is_collection_missing(&self) -> bool {
        matches!(self, StoreError::CollectionNotFound(_))
    }

    /// True when the next scheduled attempt is a reasonable retry.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Network(_) | StoreError::Transaction(_) => true,
            StoreError::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Failures of the live-update transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifierError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("subscribe failed: {0}")]
    Subscribe(String),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("malformed event: {0}")]
    Parse(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PresenceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Notifier(#[from] NotifierError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid page url: {0}")]
    InvalidUrl(String),

    #[error("registration already in progress")]
    AlreadyRegistering,

    #[error("registration cancelled by unregister")]
    RegistrationCancelled,

    #[error("sweep failed: {0}")]
    SweepFailed(String),
}

impl PresenceError {
    pub fn is_collection_missing(&self) -> bool {
        matches!(self, PresenceError::Store(e) if e.is_collection_missing())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::FileNotFound(PathBuf::from("/tmp/missing.toml"));
        assert_eq!(err.to_string(), "config file not found: /tmp/missing.toml");

        let err = ConfigError::ParseError("unexpected token".into());
        assert_eq!(err.to_string(), "config parse error: unexpected token");

        let err = ConfigError::ValidationError("store.url is empty".into());
        assert_eq!(
            err.to_string(),
            "config validation error: store.url is empty"
        );
    }

    #[test]
    fn store_error_display() {
        let err = StoreError::CollectionNotFound("viewers".into());
        assert_eq!(err.to_string(), "couldn't find collection: viewers");

        let err = StoreError::Api {
            status: 400,
            message: "bad filter".into(),
        };
        assert_eq!(err.to_string(), "store api error: HTTP 400: bad filter");
    }

    #[test]
    fn collection_missing_is_distinguishable() {
        assert!(StoreError::CollectionNotFound("viewers".into()).is_collection_missing());
        assert!(!StoreError::Network("reset".into()).is_collection_missing());
        assert!(!StoreError::RecordNotFound("abc".into()).is_collection_missing());
    }

    #[test]
    fn transient_classification() {
        assert!(StoreError::Network("timeout".into()).is_transient());
        assert!(StoreError::Api {
            status: 503,
            message: "unavailable".into()
        }
        .is_transient());
        assert!(StoreError::Api {
            status: 429,
            message: "slow down".into()
        }
        .is_transient());
        assert!(!StoreError::Api {
            status: 400,
            message: "bad".into()
        }
        .is_transient());
        assert!(!StoreError::Conflict("dup".into()).is_transient());
    }

    #[test]
    fn presence_error_from_store() {
        let err: PresenceError = StoreError::CollectionNotFound("viewers".into()).into();
        assert!(matches!(err, PresenceError::Store(_)));
        assert!(err.is_collection_missing());
        assert!(err.to_string().contains("viewers"));
    }

    #[test]
    fn presence_error_from_notifier() {
        let err: PresenceError = NotifierError::Connect("refused".into()).into();
        assert!(matches!(err, PresenceError::Notifier(_)));
        assert!(!err.is_collection_missing());
        assert_eq!(err.to_string(), "connect failed: refused");
    }

    #[test]
    fn presence_error_other_variants() {
        let err = PresenceError::InvalidUrl("not a url".into());
        assert_eq!(err.to_string(), "invalid page url: not a url");

        let err = PresenceError::SweepFailed("batch rejected".into());
        assert_eq!(err.to_string(), "sweep failed: batch rejected");
    }
}
