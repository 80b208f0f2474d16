//! The trait every compiled-in plugin implements.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use protocol::{Document, ItemId, PluginFault, PluginId, SearchEvent, SearchResult};
use worker::WorkerContext;

use crate::ProviderError;

/// Result kind the launcher UI appends to its list.
pub const ADD_RESULTS: &str = "add";

/// A search plugin hosted by the [`crate::PluginRegistry`].
///
/// Only [`id`](Self::id) and [`search`](Self::search) are required. The other
/// operations default to "not supported" (or to a no-op for the lifecycle
/// hooks).
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Stable, unique plugin id. Result items from this provider are addressed
    /// back to it through this value.
    fn id(&self) -> PluginId;

    /// Called once when the registry loads. An error drops the provider for
    /// the lifetime of the registry.
    async fn initialize(&self, _context: &WorkerContext) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Produces results for `query` through `sink`. Results pushed before an
    /// error is returned are still delivered.
    async fn search(&self, query: &str, sink: ResultSink) -> Result<(), ProviderError>;

    async fn execute(
        &self,
        _context: &WorkerContext,
        _id: &ItemId,
        _payload: Value,
        _extra: Value,
    ) -> Result<(), ProviderError> {
        Err(ProviderError::Unsupported {
            operation: "execution",
        })
    }

    async fn render_preview(&self, _id: &ItemId, _payload: Value) -> Result<String, ProviderError> {
        Err(ProviderError::Unsupported {
            operation: "preview rendering",
        })
    }

    async fn button_action(
        &self,
        _context: &WorkerContext,
        _id: &ItemId,
        _payload: Value,
    ) -> Result<(), ProviderError> {
        Err(ProviderError::Unsupported {
            operation: "button actions",
        })
    }

    /// Default preference document. Providers returning `Some` get a
    /// plugin-scoped preference document whose id equals their plugin id.
    fn default_preferences(&self) -> Option<Document> {
        None
    }

    /// Receives the committed preference document. Also called once after a
    /// successful [`initialize`](Self::initialize) with the defaults.
    async fn on_preferences_committed(&self, _preferences: &Document) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// Where a provider pushes its results for one search.
///
/// Bound to the provider's id so faults are attributed correctly. Cloning is
/// cheap; every clone feeds the same search.
#[derive(Debug, Clone)]
pub struct ResultSink {
    plugin: PluginId,
    tx: mpsc::UnboundedSender<SearchEvent>,
}

impl ResultSink {
    pub(crate) fn new(plugin: PluginId, tx: mpsc::UnboundedSender<SearchEvent>) -> Self {
        Self { plugin, tx }
    }

    /// Returns the id of the provider this sink belongs to.
    pub fn plugin(&self) -> &PluginId {
        &self.plugin
    }

    /// Pushes one result. Returns `false` if the search has already ended
    /// (cancelled or timed out); the provider may stop early.
    pub fn push(&self, result_type: impl Into<String>, payload: Value) -> bool {
        self.tx
            .send(SearchEvent::Result(SearchResult::new(result_type, payload)))
            .is_ok()
    }

    /// Pushes an `add` result.
    pub fn add(&self, payload: Value) -> bool {
        self.push(ADD_RESULTS, payload)
    }

    pub(crate) fn fault(&self, message: String) -> bool {
        self.tx
            .send(SearchEvent::Fault(PluginFault {
                plugin: self.plugin.clone(),
                message,
            }))
            .is_ok()
    }
}
