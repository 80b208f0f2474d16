//! Outbound network adapter for the Lumen worker.
//!
//! Implements the [`worker::NetworkConfigurator`] port. During `initialize` the
//! worker hands over the merged app preferences; [`ProxyAgent`] reads the
//! `proxy` setting from them and rebuilds the shared HTTP client that plugins
//! use for outbound requests.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** All HTTP client construction and proxy handling lives
//! here. The `worker` crate sees only [`worker::NetworkConfigurator`].

mod agent;
mod settings;

pub use agent::ProxyAgent;
pub use settings::{ProxySettings, PROXY_KEY};
