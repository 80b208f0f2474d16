//! Wire protocol for the Lumen plugin worker.
//!
//! This crate defines everything that crosses the channel between the
//! orchestrator process and the worker process: command envelopes, typed
//! payloads, identifiers, preference documents and search results.
//!
//! ## Architectural Layer
//!
//! **Shared types.** This crate has no I/O dependencies. The `worker` crate
//! gives these messages meaning; the `transport` crate moves them.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`PluginId`, `Ticket`, `CallId`, etc.) |
//! | [`types`] | Preference documents and search results |
//! | [`messages`] | Inbound envelope, payloads, outbound messages |
//! | [`errors`] | Encode/decode errors |

pub mod errors;
pub mod identifiers;
pub mod messages;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use errors::ProtocolError;
pub use identifiers::{CallId, EmptyIdentifier, ItemId, PluginId, PrefId, SessionId, Ticket};
pub use messages::{
    names, ButtonActionPayload, EmptyPayload, ExecutePayload, InboundMessage, InitializePayload,
    ModelPayload, OutboundMessage, PrefIdPayload, RenderPreviewPayload, SearchAllPayload,
    UpdatePreferencesPayload,
};
pub use types::{merge_document, Document, PluginFault, SearchEvent, SearchResult};
