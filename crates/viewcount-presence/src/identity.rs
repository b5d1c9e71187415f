//! Session identity and page identity.
//!
//! A session token identifies one viewer (one browser tab, one CLI process)
//! and is generated once per storage scope. The page identity groups viewers
//! of the same page regardless of fragment or trailing slash.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use tracing::warn;
use url::Url;
use viewcount_common::PresenceError;

/// Storage key under which the session token is cached.
pub const SESSION_KEY: &str = "whos-viewing-session-id";

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

// ---------------------------------------------------------------------------
// Session storage
// ---------------------------------------------------------------------------

/// Scoped key/value storage that outlives a reload but not the scope itself.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
}

/// Process-lifetime storage.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
    }
}

/// JSON-file storage, so a restarted process keeps its session token.
///
/// I/O failures are logged and treated as an empty store; the caller then
/// simply gets a fresh token.
#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> HashMap<String, String> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(path = %self.path.display(), error = %e, "Ignoring malformed session file");
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        }
    }
}

impl SessionStorage for FileSessionStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.read_all().remove(key)
    }

    fn set(&self, key: &str, value: &str) {
        let mut values = self.read_all();
        values.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!(path = %parent.display(), error = %e, "Failed to create session directory");
                return;
            }
        }
        let json = match serde_json::to_string_pretty(&values) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize session file");
                return;
            }
        };
        if let Err(e) = std::fs::write(&self.path, json) {
            warn!(path = %self.path.display(), error = %e, "Failed to write session file");
        }
    }
}

// ---------------------------------------------------------------------------
// Session token
// ---------------------------------------------------------------------------

/// Return the cached session token, generating and caching one on first use.
pub fn session_id(storage: &dyn SessionStorage) -> String {
    if let Some(existing) = storage.get(SESSION_KEY).filter(|s| !s.is_empty()) {
        return existing;
    }
    let token = generate_session_token();
    storage.set(SESSION_KEY, &token);
    token
}

/// `sess_<9 random base36 chars>_<epoch millis in base36>`.
pub fn generate_session_token() -> String {
    let mut rng = rand::thread_rng();
    let random: String = (0..9)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    format!("sess_{random}_{}", to_base36(millis))
}

fn to_base36(mut value: u128) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Page identity
// ---------------------------------------------------------------------------

/// Origin + path (one trailing slash stripped) + query. The fragment is dropped.
pub fn normalize_url(url: &Url) -> String {
    let origin = url.origin().ascii_serialization();
    let path = url.path();
    let path = path.strip_suffix('/').unwrap_or(path);
    match url.query() {
        Some(query) if !query.is_empty() => format!("{origin}{path}?{query}"),
        _ => format!("{origin}{path}"),
    }
}

/// A normalized page identity; the grouping key for viewer counts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageUrl(String);

impl PageUrl {
    pub fn parse(raw: &str) -> Result<Self, PresenceError> {
        let url = Url::parse(raw.trim())
            .map_err(|e| PresenceError::InvalidUrl(format!("{raw}: {e}")))?;
        Ok(Self(normalize_url(&url)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&Url> for PageUrl {
    fn from(url: &Url) -> Self {
        Self(normalize_url(url))
    }
}

impl fmt::Display for PageUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
