//! Minimal collaborators for unit tests inside this crate.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream;
use serde_json::Value;
use tokio::sync::mpsc;

use protocol::{Document, ItemId, OutboundMessage, PluginId, PrefId};

use crate::session::Session;
use crate::{
    NetworkConfigurator, NetworkError, Outbox, PluginHost, PluginHostError, PluginHostFactory,
    SearchStream, Timeouts, WorkerContext,
};

/// A host with no plugins.
pub(crate) struct NullHost;

impl NullHost {
    pub(crate) fn factory() -> Arc<dyn PluginHostFactory> {
        Arc::new(NullFactory)
    }
}

#[async_trait]
impl PluginHost for NullHost {
    async fn initialize(&self) -> Result<(), PluginHostError> {
        Ok(())
    }

    fn search_all(&self, _query: &str) -> SearchStream {
        Box::pin(stream::empty())
    }

    async fn execute(
        &self,
        context: &PluginId,
        _id: &ItemId,
        _payload: Value,
        _extra: Value,
    ) -> Result<(), PluginHostError> {
        Err(PluginHostError::UnknownPlugin {
            plugin: context.clone(),
        })
    }

    async fn render_preview(
        &self,
        context: &PluginId,
        _id: &ItemId,
        _payload: Value,
    ) -> Result<String, PluginHostError> {
        Err(PluginHostError::UnknownPlugin {
            plugin: context.clone(),
        })
    }

    async fn button_action(
        &self,
        context: &PluginId,
        _id: &ItemId,
        _payload: Value,
    ) -> Result<(), PluginHostError> {
        Err(PluginHostError::UnknownPlugin {
            plugin: context.clone(),
        })
    }

    fn get_pref_ids(&self) -> Vec<PrefId> {
        Vec::new()
    }

    fn get_preferences(&self, pref_id: &PrefId) -> Result<Document, PluginHostError> {
        Err(PluginHostError::UnknownPreferences {
            pref_id: pref_id.clone(),
        })
    }

    fn update_preferences(
        &self,
        pref_id: &PrefId,
        _model: Document,
    ) -> Result<(), PluginHostError> {
        Err(PluginHostError::UnknownPreferences {
            pref_id: pref_id.clone(),
        })
    }

    fn reset_preferences(&self, pref_id: &PrefId) -> Result<(), PluginHostError> {
        Err(PluginHostError::UnknownPreferences {
            pref_id: pref_id.clone(),
        })
    }

    async fn commit_preferences(&self) -> Result<(), PluginHostError> {
        Ok(())
    }
}

struct NullFactory;

impl PluginHostFactory for NullFactory {
    fn create(&self, _context: WorkerContext) -> Result<Arc<dyn PluginHost>, PluginHostError> {
        Ok(Arc::new(NullHost))
    }
}

/// Accepts any app preferences.
pub(crate) struct DirectNetwork;

impl NetworkConfigurator for DirectNetwork {
    fn configure(&self, _app_preferences: &Document) -> Result<(), NetworkError> {
        Ok(())
    }
}

/// Builds an `Unstarted` session around `factory`.
pub(crate) fn session(
    factory: Arc<dyn PluginHostFactory>,
) -> (Session, mpsc::UnboundedReceiver<OutboundMessage>) {
    let (outbox, rx) = Outbox::channel();
    let session = Session::new(outbox, factory, Arc::new(DirectNetwork), Timeouts::default());
    (session, rx)
}
