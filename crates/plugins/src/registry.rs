//! Plugin registry: lifecycle, search fan-out and routing for compiled-in
//! providers.

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use futures::future::{self, FutureExt};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use protocol::{Document, ItemId, PluginId, PrefId, SearchEvent};
use worker::{
    guard, PluginHost, PluginHostError, PluginHostFactory, SearchStream, Timeouts, WorkerContext,
};

use crate::preferences::PreferenceBook;
use crate::{builtin, ProviderError, RegistryError, ResultSink, SearchProvider};

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Builds a fresh [`PluginRegistry`] over the registered providers each time
/// the worker initializes.
pub struct RegistryFactory {
    providers: Vec<Arc<dyn SearchProvider>>,
    timeouts: Timeouts,
}

impl RegistryFactory {
    /// Creates a factory with no providers.
    pub fn new(timeouts: Timeouts) -> Self {
        Self {
            providers: Vec::new(),
            timeouts,
        }
    }

    /// Creates a factory with the built-in providers registered.
    pub fn with_builtins(timeouts: Timeouts) -> Result<Self, RegistryError> {
        let mut factory = Self::new(timeouts);
        for provider in builtin::providers()? {
            factory.register(provider)?;
        }
        Ok(factory)
    }

    /// Adds a provider. Search results stream in registration order when
    /// providers answer at the same pace.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicatePlugin`] if a provider with the same
    /// id is already registered.
    pub fn register(&mut self, provider: Arc<dyn SearchProvider>) -> Result<(), RegistryError> {
        let plugin = provider.id();
        if self.providers.iter().any(|p| p.id() == plugin) {
            return Err(RegistryError::DuplicatePlugin { plugin });
        }
        debug!(plugin = %plugin, "Registering plugin");
        self.providers.push(provider);
        Ok(())
    }

    /// Ids of the registered providers, in registration order.
    pub fn plugin_ids(&self) -> Vec<PluginId> {
        self.providers.iter().map(|p| p.id()).collect()
    }
}

impl PluginHostFactory for RegistryFactory {
    fn create(&self, context: WorkerContext) -> Result<Arc<dyn PluginHost>, PluginHostError> {
        Ok(Arc::new(PluginRegistry::new(
            self.providers.clone(),
            context,
            self.timeouts.clone(),
        )))
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// [`PluginHost`] over a fixed set of [`SearchProvider`]s.
pub struct PluginRegistry {
    candidates: Vec<Arc<dyn SearchProvider>>,
    loaded: RwLock<Vec<Arc<dyn SearchProvider>>>,
    preferences: PreferenceBook,
    context: WorkerContext,
    timeouts: Timeouts,
}

impl PluginRegistry {
    /// Creates an unloaded registry. Ids are assumed unique; use
    /// [`RegistryFactory::register`] to enforce that.
    pub fn new(
        candidates: Vec<Arc<dyn SearchProvider>>,
        context: WorkerContext,
        timeouts: Timeouts,
    ) -> Self {
        Self {
            candidates,
            loaded: RwLock::new(Vec::new()),
            preferences: PreferenceBook::default(),
            context,
            timeouts,
        }
    }

    /// Ids of the providers that initialized successfully.
    pub fn loaded_ids(&self) -> Vec<PluginId> {
        self.loaded().iter().map(|p| p.id()).collect()
    }

    fn loaded(&self) -> Vec<Arc<dyn SearchProvider>> {
        self.loaded
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn provider(&self, plugin: &PluginId) -> Result<Arc<dyn SearchProvider>, PluginHostError> {
        self.loaded()
            .into_iter()
            .find(|p| &p.id() == plugin)
            .ok_or_else(|| PluginHostError::UnknownPlugin {
                plugin: plugin.clone(),
            })
    }

    /// Runs one provider call under the per-call limit and panic boundary.
    async fn call<T>(
        &self,
        plugin: &PluginId,
        fut: impl Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, PluginHostError> {
        let limit = self.timeouts.plugin_call();
        match tokio::time::timeout(limit, guard::catch_panic(fut)).await {
            Ok(Ok(result)) => result.map_err(|err| provider_failure(plugin, err)),
            Ok(Err(panic)) => Err(PluginHostError::PluginFailed {
                plugin: plugin.clone(),
                message: format!("panicked: {panic}"),
            }),
            Err(_) => Err(PluginHostError::Timeout {
                plugin: plugin.clone(),
                after: limit,
            }),
        }
    }

    /// Loads one provider and its default preferences.
    async fn load(&self, provider: &Arc<dyn SearchProvider>) -> Result<(), PluginHostError> {
        let plugin = provider.id();
        self.call(&plugin, provider.initialize(&self.context)).await?;

        if let Some(defaults) = provider.default_preferences() {
            self.call(&plugin, provider.on_preferences_committed(&defaults))
                .await?;
            if let Some(pref_id) = PrefId::new(plugin.as_str()) {
                self.preferences.insert(pref_id, defaults);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PluginHost for PluginRegistry {
    async fn initialize(&self) -> Result<(), PluginHostError> {
        let mut loaded = Vec::with_capacity(self.candidates.len());
        let mut seen = HashSet::new();

        for provider in &self.candidates {
            let plugin = provider.id();
            if !seen.insert(plugin.clone()) {
                warn!(plugin = %plugin, "Skipping duplicate plugin id");
                continue;
            }
            match self.load(provider).await {
                Ok(()) => {
                    info!(plugin = %plugin, "Plugin loaded");
                    loaded.push(Arc::clone(provider));
                }
                Err(err) => error!(plugin = %plugin, error = %err, "Plugin failed to load; skipping"),
            }
        }

        info!(
            loaded = loaded.len(),
            registered = self.candidates.len(),
            "Plugin registry initialized"
        );
        *self.loaded.write().unwrap_or_else(PoisonError::into_inner) = loaded;
        Ok(())
    }

    fn search_all(&self, query: &str) -> SearchStream {
        let (tx, rx) = mpsc::unbounded_channel::<SearchEvent>();
        let limit = self.timeouts.plugin_call();

        let searches: Vec<_> = self
            .loaded()
            .into_iter()
            .map(|provider| {
                let sink = ResultSink::new(provider.id(), tx.clone());
                let query = query.to_string();
                async move {
                    let outcome = tokio::time::timeout(
                        limit,
                        guard::catch_panic(provider.search(&query, sink.clone())),
                    )
                    .await;
                    let message = match outcome {
                        Ok(Ok(Ok(()))) => return,
                        Ok(Ok(Err(err))) => err.to_string(),
                        Ok(Err(panic)) => format!("panicked: {panic}"),
                        Err(_) => format!("search timed out after {limit:?}"),
                    };
                    warn!(plugin = %sink.plugin(), error = %message, "Plugin search failed");
                    sink.fault(message);
                }
            })
            .collect();
        // The stream ends once every search has finished and dropped its sink.
        drop(tx);

        let driver = future::join_all(searches)
            .map(|_| None::<SearchEvent>)
            .into_stream()
            .filter_map(future::ready);
        let events = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });
        stream::select(events, driver).boxed()
    }

    async fn execute(
        &self,
        context: &PluginId,
        id: &ItemId,
        payload: Value,
        extra: Value,
    ) -> Result<(), PluginHostError> {
        let provider = self.provider(context)?;
        self.call(context, provider.execute(&self.context, id, payload, extra))
            .await
    }

    async fn render_preview(
        &self,
        context: &PluginId,
        id: &ItemId,
        payload: Value,
    ) -> Result<String, PluginHostError> {
        let provider = self.provider(context)?;
        self.call(context, provider.render_preview(id, payload)).await
    }

    async fn button_action(
        &self,
        context: &PluginId,
        id: &ItemId,
        payload: Value,
    ) -> Result<(), PluginHostError> {
        let provider = self.provider(context)?;
        self.call(context, provider.button_action(&self.context, id, payload))
            .await
    }

    fn get_pref_ids(&self) -> Vec<PrefId> {
        self.preferences.ids()
    }

    fn get_preferences(&self, pref_id: &PrefId) -> Result<Document, PluginHostError> {
        self.preferences.get(pref_id)
    }

    fn update_preferences(
        &self,
        pref_id: &PrefId,
        model: Document,
    ) -> Result<(), PluginHostError> {
        self.preferences.update(pref_id, model)
    }

    fn reset_preferences(&self, pref_id: &PrefId) -> Result<(), PluginHostError> {
        self.preferences.reset(pref_id)
    }

    /// Notifies providers of their changed documents. A document is only
    /// marked committed once its provider accepts it; a rejected one is rolled
    /// back so the stored copy matches what the provider runs with. Every
    /// provider is notified even if an earlier one fails; the first failure is
    /// returned.
    async fn commit_preferences(&self) -> Result<(), PluginHostError> {
        let changes = self.preferences.pending_changes();
        debug!(documents = changes.len(), "Committing plugin preferences");

        let mut first_failure = None;
        for (pref_id, document) in changes {
            let provider = PluginId::new(pref_id.as_str())
                .and_then(|plugin| self.provider(&plugin).ok().map(|p| (plugin, p)));
            let Some((plugin, provider)) = provider else {
                self.preferences.accept(&pref_id, document)?;
                continue;
            };
            match self
                .call(&plugin, provider.on_preferences_committed(&document))
                .await
            {
                Ok(()) => self.preferences.accept(&pref_id, document)?,
                Err(err) => {
                    warn!(plugin = %plugin, error = %err, "Plugin rejected committed preferences");
                    self.preferences.reject(&pref_id, &document)?;
                    first_failure.get_or_insert(err);
                }
            }
        }
        first_failure.map_or(Ok(()), Err)
    }
}

fn provider_failure(plugin: &PluginId, err: ProviderError) -> PluginHostError {
    match err {
        ProviderError::Unsupported { operation } => PluginHostError::Unsupported {
            plugin: plugin.clone(),
            operation,
        },
        ProviderError::Failed { message } => PluginHostError::PluginFailed {
            plugin: plugin.clone(),
            message,
        },
    }
}
