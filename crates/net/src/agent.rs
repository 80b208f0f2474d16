//! Shared HTTP client, rebuilt whenever the proxy setting changes.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use tracing::{debug, info};

use protocol::Document;
use worker::{NetworkConfigurator, NetworkError};

use crate::ProxySettings;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

/// Owns the HTTP client handed to plugins and applies the `proxy` app
/// preference to it.
#[derive(Debug)]
pub struct ProxyAgent {
    state: RwLock<Configured>,
}

#[derive(Debug, Clone)]
struct Configured {
    settings: ProxySettings,
    client: reqwest::Client,
}

impl ProxyAgent {
    /// Creates an agent with direct connections.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Client`] if the TLS backend cannot be set up.
    pub fn new() -> Result<Self, NetworkError> {
        let settings = ProxySettings::Direct;
        let client = build_client(&settings)?;
        Ok(Self {
            state: RwLock::new(Configured { settings, client }),
        })
    }

    /// Returns a handle to the current client. Clones share one connection
    /// pool.
    pub fn client(&self) -> reqwest::Client {
        self.read().client
    }

    /// Returns the proxy settings in effect.
    pub fn settings(&self) -> ProxySettings {
        self.read().settings
    }

    fn read(&self) -> Configured {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl NetworkConfigurator for ProxyAgent {
    fn configure(&self, app_preferences: &Document) -> Result<(), NetworkError> {
        let settings = ProxySettings::from_app_preferences(app_preferences)?;
        let client = build_client(&settings)?;

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.settings != settings {
            info!(from = %state.settings, to = %settings, "Outbound proxy changed");
        } else {
            debug!(proxy = %settings, "Outbound proxy unchanged; client rebuilt");
        }
        *state = Configured { settings, client };
        Ok(())
    }
}

fn build_client(settings: &ProxySettings) -> Result<reqwest::Client, NetworkError> {
    let mut builder = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)));

    match settings {
        ProxySettings::Direct => builder = builder.no_proxy(),
        // reqwest reads the environment proxy variables by default.
        ProxySettings::System => {}
        ProxySettings::Manual(url) => {
            let proxy =
                reqwest::Proxy::all(url.as_str()).map_err(|err| NetworkError::InvalidProxy {
                    value: url.to_string(),
                    reason: err.to_string(),
                })?;
            builder = builder.proxy(proxy);
        }
    }

    builder.build().map_err(|err| NetworkError::Client {
        message: err.to_string(),
    })
}
