//! Port definitions for the worker's collaborators.
//!
//! The worker never touches individual plugins. It talks to one
//! [`PluginHost`] (the facade that owns the plugin set), builds that host
//! through a [`PluginHostFactory`] during initialization, and hands the merged
//! app preferences to a [`NetworkConfigurator`] before any plugin starts.
//!
//! ## Architectural Layer
//!
//! **Port definitions.** Implementations live in infrastructure crates
//! (`plugins`, `net`) or in tests.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

use protocol::{Document, ItemId, PluginId, PrefId, SearchEvent};

use crate::{NetworkError, PlatformProxy, PluginHostError, PreferenceView};

/// Lazy, non-restartable stream of events answering one search.
///
/// The stream ending is the end-of-results signal for that search.
pub type SearchStream = BoxStream<'static, SearchEvent>;

// ---------------------------------------------------------------------------
// Plugin host
// ---------------------------------------------------------------------------

/// Facade over the set of loaded plugins.
///
/// Implementations own plugin lifecycle and are responsible for isolating one
/// plugin's failure from the others: a failing plugin shows up as a
/// [`SearchEvent::Fault`] or an `Err`, never as a torn-down host.
#[async_trait]
pub trait PluginHost: Send + Sync {
    /// Loads and initializes every plugin. Called exactly once per host.
    async fn initialize(&self) -> Result<(), PluginHostError>;

    /// Fans `query` out to every loaded plugin.
    fn search_all(&self, query: &str) -> SearchStream;

    /// Runs the action behind a result item.
    async fn execute(
        &self,
        context: &PluginId,
        id: &ItemId,
        payload: Value,
        extra: Value,
    ) -> Result<(), PluginHostError>;

    /// Produces the HTML preview for a result item.
    async fn render_preview(
        &self,
        context: &PluginId,
        id: &ItemId,
        payload: Value,
    ) -> Result<String, PluginHostError>;

    /// Handles a button press on a result item.
    async fn button_action(
        &self,
        context: &PluginId,
        id: &ItemId,
        payload: Value,
    ) -> Result<(), PluginHostError>;

    /// Lists the plugin-scoped preference ids.
    fn get_pref_ids(&self) -> Vec<PrefId>;

    /// Reads one plugin-scoped preference document (including uncommitted
    /// changes).
    fn get_preferences(&self, pref_id: &PrefId) -> Result<Document, PluginHostError>;

    /// Merges `model` into a plugin-scoped document without committing it.
    fn update_preferences(&self, pref_id: &PrefId, model: Document)
        -> Result<(), PluginHostError>;

    /// Restores a plugin-scoped document to its defaults.
    fn reset_preferences(&self, pref_id: &PrefId) -> Result<(), PluginHostError>;

    /// Flushes every pending plugin-scoped change.
    async fn commit_preferences(&self) -> Result<(), PluginHostError>;
}

/// What a plugin host is given when it is constructed.
#[derive(Debug, Clone)]
pub struct WorkerContext {
    /// Live view of the app preference domain.
    pub app_preferences: PreferenceView,
    /// The platform capabilities plugins may invoke on the host desktop.
    pub platform: PlatformProxy,
}

/// Builds the plugin host once the app preferences are known.
pub trait PluginHostFactory: Send + Sync {
    fn create(&self, context: WorkerContext) -> Result<Arc<dyn PluginHost>, PluginHostError>;
}

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// Applies outbound network settings (proxy) from the app preferences.
///
/// Consulted once, during initialization, before the plugin host exists.
pub trait NetworkConfigurator: Send + Sync {
    fn configure(&self, app_preferences: &Document) -> Result<(), NetworkError>;
}
