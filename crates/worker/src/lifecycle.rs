//! Initialization sequencer.
//!
//! `Unstarted → Initializing → Ready | Failed`. The synchronous steps (merge
//! app preferences, configure the network, construct the host) run inside the
//! `initialize` handler; the host's own bring-up runs as a background task and
//! reports back through [`Completion::Initialized`]. Every path ends in exactly
//! one `pluginsLoaded` or exactly one `onError`.

use std::sync::Arc;

use tracing::{error, info};

use protocol::{Document, OutboundMessage};

use crate::session::{Completion, Session};
use crate::{guard, InitStage, PlatformProxy, PluginHost, WorkerContext, WorkerError};

/// Lifecycle of the worker session. The host handle only exists in `Ready`.
pub(crate) enum Lifecycle {
    Unstarted,
    Initializing,
    Ready(Arc<dyn PluginHost>),
    Failed,
}

impl Lifecycle {
    pub(crate) fn state(&self) -> LifecycleState {
        match self {
            Self::Unstarted => LifecycleState::Unstarted,
            Self::Initializing => LifecycleState::Initializing,
            Self::Ready(_) => LifecycleState::Ready,
            Self::Failed => LifecycleState::Failed,
        }
    }
}

/// Observable lifecycle state, without the host handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unstarted,
    Initializing,
    Ready,
    Failed,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unstarted => "unstarted",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Starts the initialization sequence.
///
/// Rejected while a previous sequence is running or has succeeded; allowed
/// again after a failure.
pub(crate) fn begin(session: &mut Session, app_pref: Document) -> Result<(), WorkerError> {
    match session.lifecycle.state() {
        state @ (LifecycleState::Initializing | LifecycleState::Ready) => {
            return Err(WorkerError::AlreadyInitialized {
                state: state.as_str(),
            });
        }
        LifecycleState::Unstarted | LifecycleState::Failed => {}
    }

    guard::install();
    session.lifecycle = Lifecycle::Initializing;
    session.preferences.app().update(app_pref);

    let prepared = guard::catch_panic_sync(|| prepare(session)).unwrap_or_else(|message| {
        Err(WorkerError::UnhandledRuntimeFault {
            context: "initialize".to_string(),
            message,
        })
    });
    let host = match prepared {
        Ok(host) => host,
        Err(err) => {
            complete(session, Err(err));
            return Ok(());
        }
    };

    let limit = session.timeouts.initialize();
    session.spawn(async move {
        let result = tokio::time::timeout(limit, guard::catch_panic(host.initialize())).await;
        let outcome = match result {
            Ok(Ok(Ok(()))) => Ok(host),
            Ok(Ok(Err(err))) => Err(WorkerError::InitializationFailure {
                stage: InitStage::LoadPlugins,
                reason: err.to_string(),
            }),
            Ok(Err(message)) => Err(WorkerError::InitializationFailure {
                stage: InitStage::LoadPlugins,
                reason: format!("panicked: {message}"),
            }),
            Err(_) => Err(WorkerError::InitializationFailure {
                stage: InitStage::LoadPlugins,
                reason: format!("timed out after {limit:?}"),
            }),
        };
        Completion::Initialized(outcome)
    });
    Ok(())
}

/// Configures the network from the merged app preferences and builds the host.
fn prepare(session: &Session) -> Result<Arc<dyn PluginHost>, WorkerError> {
    let app = session.preferences.app().snapshot();
    session
        .network
        .configure(&app)
        .map_err(|err| WorkerError::InitializationFailure {
            stage: InitStage::ConfigureNetwork,
            reason: err.to_string(),
        })?;

    let context = WorkerContext {
        app_preferences: session.preferences.app().view(),
        platform: PlatformProxy::new(session.outbox.clone()),
    };
    session
        .factory
        .create(context)
        .map_err(|err| WorkerError::InitializationFailure {
            stage: InitStage::ConstructHost,
            reason: err.to_string(),
        })
}

/// Finishes the sequence: `Ready` + `pluginsLoaded`, or `Failed` + `onError`.
pub(crate) fn complete(session: &mut Session, outcome: Result<Arc<dyn PluginHost>, WorkerError>) {
    match outcome {
        Ok(host) => {
            session.lifecycle = Lifecycle::Ready(host);
            info!(session = %session.id, "Plugins loaded");
            session.outbox.send(OutboundMessage::PluginsLoaded {});
        }
        Err(err) => {
            session.lifecycle = Lifecycle::Failed;
            error!(session = %session.id, error = %err, "Initialization failed");
            session.outbox.send(OutboundMessage::error(&err));
        }
    }
}
