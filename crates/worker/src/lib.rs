//! Worker-side control plane for the Lumen launcher.
//!
//! The orchestrator process drives this worker over a single bidirectional
//! message channel. The worker brings up the plugin set, fans search queries
//! out to every plugin while streaming results back under the caller's ticket,
//! and keeps the app, window, theme and plugin preference domains in sync.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer + port definitions.** This crate sequences calls
//! between the wire protocol ([`protocol`]) and its collaborators, which it
//! only knows through the [`PluginHost`], [`PluginHostFactory`] and
//! [`NetworkConfigurator`] traits. It performs no I/O of its own; the
//! `transport` crate feeds it messages and drains its outbox.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`worker`] | The [`Worker`] actor: dispatch loop and task completions |
//! | `router` | One handler per command name; ready-gating |
//! | `commands` | The handler for each inbound command |
//! | `lifecycle` | Initialization sequencer (`Unstarted → Initializing → Ready \| Failed`) |
//! | `search` | Ticket-tagged streaming search fan-out |
//! | [`preferences`] | Local preference stores and the domain router |
//! | [`host`] | Port traits and the context handed to the plugin host |
//! | [`platform`] | Platform capability proxy for plugins |
//! | [`guard`] | Exception guard (panic hook and unwind boundaries) |
//! | [`errors`] | Error types |

mod commands;
pub mod config;
pub mod errors;
pub mod guard;
pub mod host;
mod lifecycle;
pub mod outbox;
pub mod platform;
pub mod preferences;
mod router;
mod search;
mod session;
pub mod worker;

#[cfg(test)]
mod testing;

pub use config::Timeouts;
pub use errors::{InitStage, NetworkError, PlatformError, PluginHostError, WorkerError};
pub use host::{NetworkConfigurator, PluginHost, PluginHostFactory, SearchStream, WorkerContext};
pub use lifecycle::LifecycleState;
pub use outbox::Outbox;
pub use platform::{PlatformProxy, PlatformService};
pub use preferences::{
    LocalPreferences, PreferenceDomain, PreferenceRouter, PreferenceStore, PreferenceView,
};
pub use router::RouterError;
pub use worker::Worker;
