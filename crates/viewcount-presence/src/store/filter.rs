//! Typed filters and list queries over presence records.

use chrono::{DateTime, Utc};

use super::types::{timestamp, PresenceRecord};

/// Conjunction of optional record predicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceFilter {
    pub url: Option<String>,
    pub session_id: Option<String>,
    /// `updated < t` (stale side of a cutoff).
    pub updated_before: Option<DateTime<Utc>>,
    /// `updated > t` (live side of a cutoff).
    pub updated_after: Option<DateTime<Utc>>,
}

impl PresenceFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_url(url: &str) -> Self {
        Self {
            url: Some(url.to_string()),
            ..Self::default()
        }
    }

    pub fn for_session(url: &str, session_id: &str) -> Self {
        Self {
            url: Some(url.to_string()),
            session_id: Some(session_id.to_string()),
            ..Self::default()
        }
    }

    pub fn stale_before(cutoff: DateTime<Utc>) -> Self {
        Self {
            updated_before: Some(cutoff),
            ..Self::default()
        }
    }

    pub fn live_after(mut self, cutoff: DateTime<Utc>) -> Self {
        self.updated_after = Some(cutoff);
        self
    }

    pub fn matches(&self, record: &PresenceRecord) -> bool {
        self.url.as_deref().map_or(true, |u| record.url == u)
            && self
                .session_id
                .as_deref()
                .map_or(true, |s| record.session_id == s)
            && self.updated_before.map_or(true, |t| record.updated_at < t)
            && self.updated_after.map_or(true, |t| record.updated_at > t)
    }

    /// Render as a PocketBase filter expression. Empty when unconstrained.
    pub fn to_expression(&self) -> String {
        let mut clauses = Vec::new();
        if let Some(url) = &self.url {
            clauses.push(format!("url = {}", quote(url)));
        }
        if let Some(session_id) = &self.session_id {
            clauses.push(format!("session_id = {}", quote(session_id)));
        }
        if let Some(t) = &self.updated_before {
            clauses.push(format!("updated < {}", quote(&timestamp::format(t))));
        }
        if let Some(t) = &self.updated_after {
            clauses.push(format!("updated > {}", quote(&timestamp::format(t))));
        }
        clauses.join(" && ")
    }
}

fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Unsorted,
    UpdatedAsc,
    UpdatedDesc,
}

impl SortOrder {
    pub fn as_param(&self) -> Option<&'static str> {
        match self {
            SortOrder::Unsorted => None,
            SortOrder::UpdatedAsc => Some("updated"),
            SortOrder::UpdatedDesc => Some("-updated"),
        }
    }
}

/// A filtered, sorted, paged list request. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceQuery {
    pub filter: PresenceFilter,
    pub sort: SortOrder,
    pub page: u32,
    pub per_page: u32,
}

impl PresenceQuery {
    pub fn new(filter: PresenceFilter) -> Self {
        Self {
            filter,
            sort: SortOrder::Unsorted,
            page: 1,
            per_page: 30,
        }
    }

    pub fn sorted(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    pub fn paged(mut self, page: u32, per_page: u32) -> Self {
        self.page = page.max(1);
        self.per_page = per_page.max(1);
        self
    }
}
