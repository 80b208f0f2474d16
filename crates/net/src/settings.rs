//! The `proxy` app preference.

use serde_json::Value;

use protocol::Document;
use worker::NetworkError;

/// App preference key holding the proxy setting.
pub const PROXY_KEY: &str = "proxy";

/// How outbound HTTP requests reach the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxySettings {
    /// Connect directly; environment proxy variables are ignored.
    Direct,
    /// Honour `HTTP_PROXY`, `HTTPS_PROXY` and `NO_PROXY` from the environment.
    System,
    /// Route every request through this proxy URL.
    Manual(reqwest::Url),
}

impl ProxySettings {
    /// Reads the proxy setting from the merged app preferences.
    ///
    /// Accepts an absent key, `null`, `"none"`, `"system"`, a proxy URL
    /// string, or an object of the form `{ "url": "..." }`.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::InvalidProxy`] for any other value, for an
    /// unparsable URL and for a scheme other than `http` or `https`.
    pub fn from_app_preferences(app: &Document) -> Result<Self, NetworkError> {
        match app.get(PROXY_KEY) {
            None | Some(Value::Null) => Ok(Self::Direct),
            Some(Value::String(text)) => Self::from_text(text),
            Some(Value::Object(fields)) => match fields.get("url") {
                Some(Value::String(url)) => Self::manual(url),
                _ => Err(invalid(
                    &Value::Object(fields.clone()),
                    "expected an object with a string 'url' field",
                )),
            },
            Some(other) => Err(invalid(other, "expected a string or an object")),
        }
    }

    fn from_text(text: &str) -> Result<Self, NetworkError> {
        match text.trim() {
            "" | "none" => Ok(Self::Direct),
            "system" => Ok(Self::System),
            url => Self::manual(url),
        }
    }

    fn manual(url: &str) -> Result<Self, NetworkError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| invalid(&Value::String(url.to_string()), &err.to_string()))?;
        match parsed.scheme() {
            "http" | "https" => Ok(Self::Manual(parsed)),
            scheme => Err(invalid(
                &Value::String(url.to_string()),
                &format!("unsupported scheme '{scheme}'"),
            )),
        }
    }
}

impl std::fmt::Display for ProxySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::System => write!(f, "system"),
            Self::Manual(url) => write!(f, "{url}"),
        }
    }
}

fn invalid(value: &Value, reason: &str) -> NetworkError {
    NetworkError::InvalidProxy {
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
