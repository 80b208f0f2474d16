//! Platform capability proxy.
//!
//! Plugins run inside the worker but act on the desktop through the
//! orchestrator: opening a URL, changing the launcher query, showing a toast.
//! Each call becomes an outbound `callPlatform` message; there is no reply.

use std::str::FromStr;

use serde_json::{json, Value};
use tracing::debug;

use protocol::OutboundMessage;

use crate::{Outbox, PlatformError};

/// The fixed set of platform services exposed to plugins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformService {
    /// Launcher window control (`setQuery`, `close`, `openPreferences`, ...).
    App,
    /// Transient notifications (`enqueue`).
    Toast,
    /// Desktop shell (`openExternal`, `openItem`, `showItemInFolder`).
    Shell,
    /// Orchestrator-side log console (`log`).
    Logger,
    /// System clipboard (`writeText`).
    Clipboard,
}

impl PlatformService {
    /// Returns the wire name of the service.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::App => "app",
            Self::Toast => "toast",
            Self::Shell => "shell",
            Self::Logger => "logger",
            Self::Clipboard => "clipboard",
        }
    }
}

impl FromStr for PlatformService {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "app" => Ok(Self::App),
            "toast" => Ok(Self::Toast),
            "shell" => Ok(Self::Shell),
            "logger" => Ok(Self::Logger),
            "clipboard" => Ok(Self::Clipboard),
            other => Err(PlatformError::UnknownService {
                service: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for PlatformService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Handle through which plugins invoke platform services.
#[derive(Debug, Clone)]
pub struct PlatformProxy {
    outbox: Outbox,
}

impl PlatformProxy {
    pub fn new(outbox: Outbox) -> Self {
        Self { outbox }
    }

    /// Asks the orchestrator to run `service.func(args)`.
    pub fn call(
        &self,
        service: PlatformService,
        func: &str,
        args: Value,
    ) -> Result<(), PlatformError> {
        debug!(service = %service, func, "Forwarding platform call");
        let sent = self.outbox.send(OutboundMessage::CallPlatform {
            service: service.as_str().to_string(),
            func: func.to_string(),
            args,
        });
        if sent {
            Ok(())
        } else {
            Err(PlatformError::ChannelClosed)
        }
    }

    /// Opens `url` with the desktop's default handler.
    pub fn open_external(&self, url: &str) -> Result<(), PlatformError> {
        self.call(PlatformService::Shell, "openExternal", json!([url]))
    }

    /// Replaces the launcher's query text.
    pub fn set_query(&self, query: &str) -> Result<(), PlatformError> {
        self.call(PlatformService::App, "setQuery", json!([query]))
    }

    /// Shows a transient notification.
    pub fn toast(&self, message: &str) -> Result<(), PlatformError> {
        self.call(PlatformService::Toast, "enqueue", json!([message]))
    }
}
