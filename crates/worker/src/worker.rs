//! The worker actor.
//!
//! [`Worker`] owns the router and the session. It processes one inbound command
//! at a time; anything that has to wait for plugin code runs as a background
//! task whose completion is fed back into the same loop, so lifecycle state is
//! only ever mutated here.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinError;
use tracing::{debug, info, info_span, warn, Span};

use protocol::{InboundMessage, OutboundMessage, SessionId};

use crate::lifecycle::{self, LifecycleState};
use crate::router::{Reply, Router, RouterError};
use crate::session::{Completion, Session};
use crate::{
    commands, guard, LocalPreferences, NetworkConfigurator, Outbox, PluginHostFactory, Timeouts,
    WorkerError,
};

/// Worker-side control plane for one orchestrator channel.
pub struct Worker {
    router: Router,
    session: Session,
    span: Span,
}

impl Worker {
    /// Creates a worker and the receiver of its outbound messages.
    ///
    /// # Errors
    ///
    /// Returns an error if two handlers are registered under the same command
    /// name.
    pub fn new(
        factory: Arc<dyn PluginHostFactory>,
        network: Arc<dyn NetworkConfigurator>,
        timeouts: Timeouts,
    ) -> Result<(Self, mpsc::UnboundedReceiver<OutboundMessage>), RouterError> {
        let router = commands::routes()?;
        let (outbox, outbound_rx) = Outbox::channel();
        let session = Session::new(outbox, factory, network, timeouts);
        let span = info_span!("worker", session = %session.id);
        debug!(parent: &span, commands = ?router.commands(), "Command router ready");

        Ok((
            Self {
                router,
                session,
                span,
            },
            outbound_rx,
        ))
    }

    pub fn session_id(&self) -> SessionId {
        self.session.id
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.session.lifecycle.state()
    }

    /// Returns the worker-local preference stores.
    pub fn preferences(&self) -> &LocalPreferences {
        &self.session.preferences
    }

    /// Returns a sender onto the outbound channel (used by the transport to
    /// report undecodable input).
    pub fn outbox(&self) -> Outbox {
        self.session.outbox.clone()
    }

    /// Number of background tasks still running.
    pub fn in_flight(&self) -> usize {
        self.session.tasks.len()
    }

    /// Dispatches one inbound command.
    ///
    /// Never fails: every error, including a panicking handler, is reported to
    /// the orchestrator and the worker stays available for the next command.
    pub fn handle(&mut self, message: InboundMessage) {
        let span = info_span!(
            parent: &self.span,
            "command",
            command = %message.name,
            call_id = ?message.call_id
        );
        let _entered = span.enter();

        let call_id = message.call_id;
        let outcome = guard::catch_panic_sync(|| self.router.dispatch(&mut self.session, &message))
            .unwrap_or_else(|panic| {
                Err(WorkerError::UnhandledRuntimeFault {
                    context: format!("command '{}'", message.name),
                    message: panic,
                })
            });

        match outcome {
            Ok(Reply::None) => {}
            Ok(Reply::Value(value)) => {
                if let Some(call_id) = call_id {
                    self.session.outbox.send(OutboundMessage::Reply {
                        call_id: Some(call_id),
                        value: Some(value),
                        error: None,
                    });
                }
            }
            Ok(Reply::Deferred(pending)) => {
                let outbox = self.session.outbox.clone();
                let command = message.name.clone();
                self.session.spawn(async move {
                    let reply = match guard::catch_panic(pending).await {
                        Ok(Ok(value)) => call_id.map(|call_id| OutboundMessage::Reply {
                            call_id: Some(call_id),
                            value: Some(value),
                            error: None,
                        }),
                        Ok(Err(err)) => {
                            outbox.report(&err);
                            call_id.map(|call_id| failed_reply(call_id, &err))
                        }
                        Err(message) => {
                            let err = WorkerError::UnhandledRuntimeFault {
                                context: format!("command '{command}'"),
                                message,
                            };
                            outbox.report(&err);
                            call_id.map(|call_id| failed_reply(call_id, &err))
                        }
                    };
                    if let Some(reply) = reply {
                        outbox.send(reply);
                    }
                    Completion::Finished
                });
            }
            Err(err) => {
                warn!(error = %err, "Command rejected");
                self.session.outbox.send(OutboundMessage::error(&err));
                if let Some(call_id) = call_id {
                    self.session.outbox.send(failed_reply(call_id, &err));
                }
            }
        }
    }

    /// Waits for every in-flight background task and applies its completion.
    pub async fn settle(&mut self) {
        while let Some(joined) = self.session.tasks.join_next().await {
            self.on_task_finished(joined);
        }
    }

    /// Serves commands until `inbound` closes, then aborts outstanding work.
    pub async fn run(mut self, mut inbound: mpsc::Receiver<InboundMessage>) {
        info!(parent: &self.span, "Worker started");
        loop {
            tokio::select! {
                message = inbound.recv() => match message {
                    Some(message) => self.handle(message),
                    None => break,
                },
                Some(joined) = self.session.tasks.join_next(), if !self.session.tasks.is_empty() => {
                    self.on_task_finished(joined);
                }
            }
        }

        info!(
            parent: &self.span,
            in_flight = self.session.tasks.len(),
            "Inbound channel closed; shutting down"
        );
        self.session.tasks.shutdown().await;
    }

    fn on_task_finished(&mut self, joined: Result<Completion, JoinError>) {
        let _entered = self.span.enter();
        match joined {
            Ok(Completion::Initialized(outcome)) => lifecycle::complete(&mut self.session, outcome),
            Ok(Completion::Finished) => {}
            Err(err) if err.is_panic() => {
                let message = guard::panic_message(err.into_panic().as_ref());
                self.session.outbox.report(&WorkerError::UnhandledRuntimeFault {
                    context: "background task".to_string(),
                    message,
                });
            }
            Err(err) => debug!(error = %err, "Background task cancelled"),
        }
    }
}

/// Only commands that carried a `callId` get a `result`.
fn failed_reply(call_id: protocol::CallId, err: &WorkerError) -> OutboundMessage {
    OutboundMessage::Reply {
        call_id: Some(call_id),
        value: None,
        error: Some(err.to_string()),
    }
}
