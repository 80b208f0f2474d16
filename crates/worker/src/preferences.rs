//! Preference domains and the router that addresses them.
//!
//! The worker mirrors three app-owned documents locally (app, window, theme)
//! as [`PreferenceStore`]s. Plugin-scoped documents live behind the
//! [`PluginHost`] port. [`PreferenceRouter`] hides the difference behind one
//! [`PreferenceDomain`] enum with exhaustive handling.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use tokio::sync::watch;
use tracing::debug;

use protocol::{merge_document, Document, PrefId};

use crate::{PluginHost, PluginHostError};

// ---------------------------------------------------------------------------
// Domains
// ---------------------------------------------------------------------------

/// Addresses one independently mutable preference document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PreferenceDomain {
    /// Global application preferences. Shared with plugins through the
    /// worker context.
    App,
    /// Launcher window preferences.
    Window,
    /// Theme preferences.
    Theme,
    /// A plugin-scoped document owned by the plugin host.
    Plugin(PrefId),
}

impl std::fmt::Display for PreferenceDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::App => write!(f, "{}", APP_DOMAIN),
            Self::Window => write!(f, "{}", WINDOW_DOMAIN),
            Self::Theme => write!(f, "{}", THEME_DOMAIN),
            Self::Plugin(id) => write!(f, "plugin:{id}"),
        }
    }
}

pub const APP_DOMAIN: &str = "app";
pub const WINDOW_DOMAIN: &str = "window";
pub const THEME_DOMAIN: &str = "theme";

// ---------------------------------------------------------------------------
// Local stores
// ---------------------------------------------------------------------------

/// In-memory mirror of one named preference document.
///
/// Backed by a `watch` channel: the worker is the single writer, and any
/// number of [`PreferenceView`]s observe the latest document without locking
/// the worker.
#[derive(Debug)]
pub struct PreferenceStore {
    name: &'static str,
    tx: watch::Sender<Document>,
}

impl PreferenceStore {
    /// Creates an empty store with a fixed domain name.
    pub fn new(name: &'static str) -> Self {
        let (tx, _rx) = watch::channel(Document::new());
        Self { name, tx }
    }

    /// Returns the domain name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Merges `patch` into the document; existing keys are retained unless
    /// overwritten.
    pub fn update(&self, patch: Document) {
        debug!(domain = self.name, keys = patch.len(), "Merging preference update");
        self.tx.send_modify(|doc| merge_document(doc, patch));
    }

    /// Restores the empty document.
    pub fn reset(&self) {
        debug!(domain = self.name, "Resetting preferences");
        self.tx.send_modify(|doc| doc.clear());
    }

    /// Returns a copy of the current document.
    pub fn snapshot(&self) -> Document {
        self.tx.borrow().clone()
    }

    /// Returns a read-only live view of this store.
    pub fn view(&self) -> PreferenceView {
        PreferenceView {
            name: self.name,
            rx: self.tx.subscribe(),
        }
    }
}

/// Read-only live view of a [`PreferenceStore`], handed to plugins.
#[derive(Debug, Clone)]
pub struct PreferenceView {
    name: &'static str,
    rx: watch::Receiver<Document>,
}

impl PreferenceView {
    /// Returns the domain name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the current value of `key`.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.rx.borrow().get(key).cloned()
    }

    /// Returns a copy of the current document.
    pub fn snapshot(&self) -> Document {
        self.rx.borrow().clone()
    }

    /// Waits until the document changes. Returns `false` once the owning
    /// store has been dropped.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

/// The three worker-local preference stores.
#[derive(Debug)]
pub struct LocalPreferences {
    app: PreferenceStore,
    window: PreferenceStore,
    theme: PreferenceStore,
}

impl LocalPreferences {
    /// Creates the three stores, empty.
    pub fn new() -> Self {
        Self {
            app: PreferenceStore::new(APP_DOMAIN),
            window: PreferenceStore::new(WINDOW_DOMAIN),
            theme: PreferenceStore::new(THEME_DOMAIN),
        }
    }

    pub fn app(&self) -> &PreferenceStore {
        &self.app
    }

    pub fn window(&self) -> &PreferenceStore {
        &self.window
    }

    pub fn theme(&self) -> &PreferenceStore {
        &self.theme
    }
}

impl Default for LocalPreferences {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Routes preference operations to the local stores or the plugin host.
///
/// Only constructible with a host reference, so plugin-scoped routing can never
/// run against an uninitialized worker.
pub struct PreferenceRouter<'a> {
    local: &'a LocalPreferences,
    host: Arc<dyn PluginHost>,
}

impl<'a> PreferenceRouter<'a> {
    pub fn new(local: &'a LocalPreferences, host: Arc<dyn PluginHost>) -> Self {
        Self { local, host }
    }

    /// Lists the plugin-scoped preference ids, in the host's order.
    pub fn plugin_pref_ids(&self) -> Vec<PrefId> {
        self.host.get_pref_ids()
    }

    /// Reads a domain's document.
    pub fn read(&self, domain: &PreferenceDomain) -> Result<Document, PluginHostError> {
        match domain {
            PreferenceDomain::App => Ok(self.local.app.snapshot()),
            PreferenceDomain::Window => Ok(self.local.window.snapshot()),
            PreferenceDomain::Theme => Ok(self.local.theme.snapshot()),
            PreferenceDomain::Plugin(id) => self.host.get_preferences(id),
        }
    }

    /// Applies a partial (merging) update to a domain.
    pub fn update(&self, domain: &PreferenceDomain, model: Document) -> Result<(), PluginHostError> {
        match domain {
            PreferenceDomain::App => self.local.app.update(model),
            PreferenceDomain::Window => self.local.window.update(model),
            PreferenceDomain::Theme => self.local.theme.update(model),
            PreferenceDomain::Plugin(id) => self.host.update_preferences(id, model)?,
        }
        Ok(())
    }

    /// Restores a domain's defaults.
    pub fn reset(&self, domain: &PreferenceDomain) -> Result<(), PluginHostError> {
        match domain {
            PreferenceDomain::App => self.local.app.reset(),
            PreferenceDomain::Window => self.local.window.reset(),
            PreferenceDomain::Theme => self.local.theme.reset(),
            PreferenceDomain::Plugin(id) => self.host.reset_preferences(id)?,
        }
        Ok(())
    }

    /// Flushes pending plugin preference changes through the host.
    ///
    /// The returned future owns its host handle so it can run as a background
    /// task.
    pub fn commit(&self) -> BoxFuture<'static, Result<(), PluginHostError>> {
        let host = Arc::clone(&self.host);
        async move { host.commit_preferences().await }.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn test_updates_merge_per_key() {
        let store = PreferenceStore::new("app");
        store.update(doc(json!({"a": 1})));
        store.update(doc(json!({"b": 2})));
        store.update(doc(json!({"a": 1})));
        assert_eq!(Value::Object(store.snapshot()), json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_reset_restores_empty_document() {
        let store = PreferenceStore::new("theme");
        store.update(doc(json!({"accent": "blue"})));
        store.update(doc(json!({"font": "mono"})));
        store.reset();
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_domains_are_independent() {
        let local = LocalPreferences::new();
        local.window().update(doc(json!({"width": 600})));
        assert!(local.app().snapshot().is_empty());
        assert!(local.theme().snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_view_observes_later_updates() {
        let store = PreferenceStore::new("app");
        let mut view = store.view();
        assert_eq!(view.get("proxy"), None);

        store.update(doc(json!({"proxy": "system"})));
        assert!(view.changed().await);
        assert_eq!(view.get("proxy"), Some(json!("system")));
        assert_eq!(view.name(), "app");
    }

    #[test]
    fn test_domain_display() {
        let id = PrefId::new("url").unwrap();
        assert_eq!(PreferenceDomain::Plugin(id).to_string(), "plugin:url");
        assert_eq!(PreferenceDomain::Window.to_string(), "window");
    }
}
