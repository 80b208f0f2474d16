//! Error types for the plugin registry.

use thiserror::Error;

use protocol::{EmptyIdentifier, PluginId};

/// Failure reported by a single provider.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    /// The provider does not implement this operation.
    #[error("{operation} not supported")]
    Unsupported {
        /// Operation name (e.g. `"preview rendering"`).
        operation: &'static str,
    },

    /// The provider tried and failed.
    #[error("{message}")]
    Failed {
        /// Failure description.
        message: String,
    },
}

impl ProviderError {
    /// Shorthand for [`ProviderError::Failed`].
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// Errors raised while assembling a registry.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RegistryError {
    /// Two providers share an id.
    #[error("Plugin '{plugin}' is already registered")]
    DuplicatePlugin {
        /// The repeated id.
        plugin: PluginId,
    },

    /// A provider was given an unusable id.
    #[error("Invalid plugin id: {0}")]
    InvalidPluginId(#[from] EmptyIdentifier),
}
