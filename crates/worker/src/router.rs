//! Command router: one handler per command name.
//!
//! Handlers are registered either as *open* (may run in any lifecycle state;
//! only `initialize`) or *ready-gated* (receive the plugin host as an argument
//! and are rejected with [`WorkerError::Uninitialized`] until the session is
//! `Ready`). The router decodes the payload into the handler's declared type
//! before invoking it.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use protocol::InboundMessage;

use crate::session::Session;
use crate::{PluginHost, WorkerError};

/// What a handler hands back to the router.
pub(crate) enum Reply {
    /// Fire-and-forget; nothing is sent.
    None,
    /// Sent immediately as a `result`.
    Value(Value),
    /// Awaited in the background, then sent as a `result`.
    Deferred(BoxFuture<'static, Result<Value, WorkerError>>),
}

/// Registration errors. These are programming errors and surface at startup.
#[derive(Debug, Error, PartialEq)]
pub enum RouterError {
    #[error("Command '{command}' is already registered")]
    DuplicateCommand { command: &'static str },
}

type OpenHandler = Box<dyn Fn(&mut Session, &InboundMessage) -> Result<Reply, WorkerError> + Send + Sync>;

type ReadyHandler = Box<
    dyn Fn(&mut Session, Arc<dyn PluginHost>, &InboundMessage) -> Result<Reply, WorkerError>
        + Send
        + Sync,
>;

enum Route {
    Open(OpenHandler),
    Ready(ReadyHandler),
}

pub(crate) struct Router {
    routes: HashMap<&'static str, Route>,
}

impl Router {
    pub(crate) fn new() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    /// Registers a handler that may run before initialization.
    pub(crate) fn register<P, F>(&mut self, name: &'static str, handler: F) -> Result<(), RouterError>
    where
        P: DeserializeOwned + 'static,
        F: Fn(&mut Session, P) -> Result<Reply, WorkerError> + Send + Sync + 'static,
    {
        self.insert(
            name,
            Route::Open(Box::new(move |session, message| {
                handler(session, message.decode_payload::<P>()?)
            })),
        )
    }

    /// Registers a handler that requires a `Ready` session.
    pub(crate) fn register_ready<P, F>(
        &mut self,
        name: &'static str,
        handler: F,
    ) -> Result<(), RouterError>
    where
        P: DeserializeOwned + 'static,
        F: Fn(&mut Session, Arc<dyn PluginHost>, P) -> Result<Reply, WorkerError>
            + Send
            + Sync
            + 'static,
    {
        self.insert(
            name,
            Route::Ready(Box::new(move |session, host, message| {
                handler(session, host, message.decode_payload::<P>()?)
            })),
        )
    }

    fn insert(&mut self, name: &'static str, route: Route) -> Result<(), RouterError> {
        match self.routes.entry(name) {
            Entry::Occupied(_) => Err(RouterError::DuplicateCommand { command: name }),
            Entry::Vacant(slot) => {
                slot.insert(route);
                Ok(())
            }
        }
    }

    /// Looks up and invokes the handler for `message`.
    pub(crate) fn dispatch(
        &self,
        session: &mut Session,
        message: &InboundMessage,
    ) -> Result<Reply, WorkerError> {
        let route = self
            .routes
            .get(message.name.as_str())
            .ok_or_else(|| WorkerError::UnknownCommand {
                command: message.name.clone(),
            })?;

        match route {
            Route::Open(handler) => handler(session, message),
            Route::Ready(handler) => {
                let host = session.host().ok_or_else(|| WorkerError::Uninitialized {
                    command: message.name.clone(),
                })?;
                handler(session, host, message)
            }
        }
    }

    /// Returns the registered command names, sorted.
    pub(crate) fn commands(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.routes.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
