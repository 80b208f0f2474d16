//! Error types for the worker control plane.
//!
//! [`WorkerError`] is what a command handler returns; every variant is
//! recoverable and ends up as an `onError` trace on the channel. The remaining
//! enums describe failures of the collaborators behind the worker's ports.

use std::time::Duration;

use thiserror::Error;

use protocol::{PluginId, PrefId, ProtocolError};

// ---------------------------------------------------------------------------
// Worker-level errors
// ---------------------------------------------------------------------------

/// The step of the initialization sequence that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStage {
    /// Applying the merged app preferences to the outbound network stack.
    ConfigureNetwork,
    /// Constructing the plugin host through its factory.
    ConstructHost,
    /// Awaiting the plugin host's own asynchronous bring-up.
    LoadPlugins,
}

impl std::fmt::Display for InitStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConfigureNetwork => write!(f, "configuring network proxy"),
            Self::ConstructHost => write!(f, "constructing plugin host"),
            Self::LoadPlugins => write!(f, "loading plugins"),
        }
    }
}

/// Errors produced while dispatching or running a command.
///
/// None of these terminate the worker. The router turns each one into an
/// `onError` message (and a `result` error when the command carried a call id).
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The initialization sequence failed at `stage`.
    ///
    /// The session moves to `Failed`; a later `initialize` may retry.
    #[error("Initialization failed while {stage}: {reason}")]
    InitializationFailure {
        /// Step that failed.
        stage: InitStage,
        /// Description of the underlying failure.
        reason: String,
    },

    /// A command that needs loaded plugins arrived before initialization
    /// completed.
    #[error("Worker is not initialized; '{command}' requires a successful 'initialize' first")]
    Uninitialized {
        /// Name of the rejected command.
        command: String,
    },

    /// `initialize` arrived while a previous one is running or has succeeded.
    #[error("Worker is already {state}; 'initialize' was ignored")]
    AlreadyInitialized {
        /// Current lifecycle state name.
        state: &'static str,
    },

    /// No handler is registered under the inbound command name.
    #[error("Unknown command '{command}'")]
    UnknownCommand {
        /// The unrecognised name.
        command: String,
    },

    /// The payload could not be decoded for its command.
    #[error(transparent)]
    InvalidPayload(#[from] ProtocolError),

    /// A plugin host operation failed.
    #[error("Plugin host error: {0}")]
    PluginHost(#[from] PluginHostError),

    /// A bounded operation did not finish in time.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        /// Description of the operation, including its correlation value.
        operation: String,
        /// The configured limit.
        after: Duration,
    },

    /// A panic escaped a handler or background task and was caught.
    #[error("Unhandled fault in {context}: {message}")]
    UnhandledRuntimeFault {
        /// Where the fault was caught.
        context: String,
        /// Panic message.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Port errors
// ---------------------------------------------------------------------------

/// Errors reported by a [`crate::PluginHost`] implementation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PluginHostError {
    /// No loaded plugin has this id.
    #[error("Unknown plugin '{plugin}'")]
    UnknownPlugin {
        /// The requested plugin.
        plugin: PluginId,
    },

    /// No plugin-scoped preference document has this id.
    #[error("Unknown preferences '{pref_id}'")]
    UnknownPreferences {
        /// The requested preference id.
        pref_id: PrefId,
    },

    /// The plugin does not implement the requested operation.
    #[error("Plugin '{plugin}' does not support {operation}")]
    Unsupported {
        /// The addressed plugin.
        plugin: PluginId,
        /// Operation name (e.g. `"preview rendering"`).
        operation: &'static str,
    },

    /// The plugin itself reported a failure.
    #[error("Plugin '{plugin}' failed: {message}")]
    PluginFailed {
        /// The failing plugin.
        plugin: PluginId,
        /// Failure description.
        message: String,
    },

    /// The plugin did not answer within the per-call limit.
    #[error("Plugin '{plugin}' did not respond within {after:?}")]
    Timeout {
        /// The unresponsive plugin.
        plugin: PluginId,
        /// The configured limit.
        after: Duration,
    },

    /// The host could not be set up at all.
    #[error("Plugin host setup failed: {message}")]
    Setup {
        /// Failure description.
        message: String,
    },
}

/// Errors reported by a [`crate::NetworkConfigurator`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum NetworkError {
    /// The `proxy` app preference could not be interpreted.
    #[error("Invalid proxy setting '{value}': {reason}")]
    InvalidProxy {
        /// The offending preference value, rendered as JSON.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The HTTP client could not be built with the requested settings.
    #[error("Failed to build HTTP client: {message}")]
    Client {
        /// Failure description.
        message: String,
    },
}

/// Errors raised by the [`crate::PlatformProxy`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlatformError {
    /// The requested platform service is not part of the capability set.
    #[error("Unknown platform service '{service}'")]
    UnknownService {
        /// The requested service name.
        service: String,
    },

    /// The channel to the orchestrator is gone.
    #[error("Orchestrator channel is closed")]
    ChannelClosed,
}
