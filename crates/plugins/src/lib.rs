//! Compiled-in plugin registry for the Lumen worker.
//!
//! [`PluginRegistry`] implements the [`worker::PluginHost`] port over a fixed
//! set of [`SearchProvider`]s registered at startup. Each provider is isolated
//! from the others: a provider that fails to initialize is dropped, and a
//! provider that errors, panics or stalls during a search shows up as a single
//! [`protocol::SearchEvent::Fault`] while the rest keep streaming.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Plugin lifecycle, per-plugin timeouts and plugin
//! preference persistence live here. The `worker` crate sees only
//! [`worker::PluginHost`] and [`worker::PluginHostFactory`].
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`provider`] | [`SearchProvider`] trait and [`ResultSink`] |
//! | [`registry`] | [`PluginRegistry`] and [`RegistryFactory`] |
//! | `preferences` | Default, pending and committed plugin documents |
//! | [`builtin`] | Providers shipped with the worker |
//! | [`errors`] | [`ProviderError`] and [`RegistryError`] |

pub mod builtin;
pub mod errors;
mod preferences;
pub mod provider;
pub mod registry;

pub use errors::{ProviderError, RegistryError};
pub use provider::{ResultSink, SearchProvider};
pub use registry::{PluginRegistry, RegistryFactory};
