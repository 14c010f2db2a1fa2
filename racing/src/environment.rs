//! Read-only environment data shared with every racer.

use std::collections::HashMap;
use std::sync::Arc;

/// Well-known environment property keys.
///
/// The coordinator itself never interprets these; they are published so that
/// callers and stages agree on key names for commonly passed deployment data.
pub mod properties {
    /// Host name the race was initiated against.
    pub const SERVER_NAME: &str = "server.name";
    /// Port the race was initiated against.
    pub const SERVER_PORT: &str = "server.port";
    /// Deployment context path of the initiating application.
    pub const CONTEXT_PATH: &str = "context.path";
}

/// Immutable string-keyed map handed to all racers at registration time.
///
/// Cloning is cheap: the underlying map is shared. The coordinator passes the
/// environment through unmodified and never validates its contents.
#[derive(Debug, Clone, Default)]
pub struct RaceEnvironment {
    entries: Arc<HashMap<String, String>>,
}

impl RaceEnvironment {
    /// Wraps the given entries into a shared read-only environment.
    pub fn new(entries: HashMap<String, String>) -> Self {
        Self {
            entries: Arc::new(entries),
        }
    }

    /// Returns the value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Iterates over all entries in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the environment carries no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for RaceEnvironment {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
