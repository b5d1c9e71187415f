pub mod errors;
pub mod id;

pub use errors::{ConfigError, NotifierError, PresenceError, StoreError};
pub use id::{new_client_id, new_record_id, RecordId};

pub type Result<T> = std::result::Result<T, PresenceError>;
