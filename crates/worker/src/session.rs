//! Per-process worker session state.
//!
//! Everything a handler may read or mutate lives on [`Session`]: lifecycle,
//! the local preference stores, the outbox, the collaborator ports and the set
//! of in-flight background tasks. Only the worker's own task touches it.

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::Instrument;

use protocol::SessionId;

use crate::lifecycle::Lifecycle;
use crate::{
    guard, LocalPreferences, NetworkConfigurator, Outbox, PluginHost, PluginHostFactory,
    Timeouts, WorkerError,
};

/// Result of a background task, consumed by the worker loop.
pub(crate) enum Completion {
    /// The plugin host's asynchronous bring-up finished.
    Initialized(Result<Arc<dyn PluginHost>, WorkerError>),
    /// Any other task finished; it has already emitted its own messages.
    Finished,
}

pub(crate) struct Session {
    pub(crate) id: SessionId,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) preferences: LocalPreferences,
    pub(crate) outbox: Outbox,
    pub(crate) factory: Arc<dyn PluginHostFactory>,
    pub(crate) network: Arc<dyn NetworkConfigurator>,
    pub(crate) timeouts: Timeouts,
    pub(crate) tasks: JoinSet<Completion>,
}

impl Session {
    pub(crate) fn new(
        outbox: Outbox,
        factory: Arc<dyn PluginHostFactory>,
        network: Arc<dyn NetworkConfigurator>,
        timeouts: Timeouts,
    ) -> Self {
        Self {
            id: SessionId::new_random(),
            lifecycle: Lifecycle::Unstarted,
            preferences: LocalPreferences::new(),
            outbox,
            factory,
            network,
            timeouts,
            tasks: JoinSet::new(),
        }
    }

    /// Returns the plugin host once the session is `Ready`.
    pub(crate) fn host(&self) -> Option<Arc<dyn PluginHost>> {
        match &self.lifecycle {
            Lifecycle::Ready(host) => Some(Arc::clone(host)),
            _ => None,
        }
    }

    /// Spawns a task whose completion the worker loop will observe.
    pub(crate) fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        self.tasks.spawn(task.in_current_span());
    }

    /// Spawns a fire-and-forget operation; an error or panic is reported as
    /// `onError`.
    pub(crate) fn spawn_reported<F>(&mut self, operation: &'static str, task: F)
    where
        F: Future<Output = Result<(), WorkerError>> + Send + 'static,
    {
        let outbox = self.outbox.clone();
        self.spawn(async move {
            match guard::catch_panic(task).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => outbox.report(&err),
                Err(message) => outbox.report(&WorkerError::UnhandledRuntimeFault {
                    context: operation.to_string(),
                    message,
                }),
            }
            Completion::Finished
        });
    }
}
