//! Runtime limits for the worker.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Upper bounds on operations that wait for plugin code.
///
/// Deserialised from the `[timeouts]` table of the worker configuration file;
/// every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Limit for the plugin host's whole bring-up.
    pub initialize_secs: u64,
    /// Limit for one search, from dispatch to the last result.
    pub search_secs: u64,
    /// Limit for a single call into one plugin.
    pub plugin_call_secs: u64,
}

impl Timeouts {
    pub fn initialize(&self) -> Duration {
        Duration::from_secs(self.initialize_secs)
    }

    pub fn search(&self) -> Duration {
        Duration::from_secs(self.search_secs)
    }

    pub fn plugin_call(&self) -> Duration {
        Duration::from_secs(self.plugin_call_secs)
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            initialize_secs: 60,
            search_secs: 30,
            plugin_call_secs: 10,
        }
    }
}
