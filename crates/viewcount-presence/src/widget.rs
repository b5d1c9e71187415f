//! Count rendering. Pure consumers of the count stream.

use std::sync::Arc;

use tracing::info;

use crate::presence::ViewerTracker;

/// Display text for a viewer count, or `None` when nothing should show.
pub fn format_viewers(count: u64) -> Option<String> {
    match count {
        0 => None,
        n => Some(format!("{n} viewing this")),
    }
}

/// Something that displays a viewer count.
pub trait CountRenderer: Send + Sync {
    fn render(&self, count: u64);
}

/// Renders counts as log lines.
#[derive(Debug, Clone)]
pub struct LogRenderer {
    url: String,
}

impl LogRenderer {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
        }
    }
}

impl CountRenderer for LogRenderer {
    fn render(&self, count: u64) {
        match format_viewers(count) {
            Some(text) => info!(url = %self.url, count, "{text}"),
            None => info!(url = %self.url, count, "No viewers"),
        }
    }
}

/// Drive `renderer` from `tracker`'s count stream.
pub fn attach_renderer(tracker: &ViewerTracker, renderer: Arc<dyn CountRenderer>) {
    tracker.on_count_change(move |count| renderer.render(count));
}
