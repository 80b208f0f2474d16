//! Opens web addresses typed into the launcher.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use serde_json::{json, Value};

use protocol::{Document, ItemId, PluginId};
use worker::WorkerContext;

use crate::{ProviderError, ResultSink, SearchProvider};

pub(super) const PLUGIN_ID: &str = "url";
const SCHEMES_KEY: &str = "schemes";

/// Offers an "open in browser" result for queries that look like URLs.
///
/// The accepted schemes come from the plugin's `schemes` preference
/// (`["http", "https"]` by default).
#[derive(Debug)]
pub struct UrlProvider {
    id: PluginId,
    schemes: RwLock<Vec<String>>,
}

impl UrlProvider {
    /// Creates the provider under `id`, which is also the `context` of its
    /// results.
    pub fn new(id: PluginId) -> Self {
        Self {
            id,
            schemes: RwLock::new(default_schemes()),
        }
    }

    /// Returns the query as a URL if its scheme is accepted.
    fn recognise<'q>(&self, query: &'q str) -> Option<&'q str> {
        let candidate = query.trim();
        let (scheme, rest) = candidate.split_once("://")?;
        if rest.is_empty() || candidate.chars().any(char::is_whitespace) {
            return None;
        }
        let schemes = self.schemes.read().unwrap_or_else(PoisonError::into_inner);
        schemes
            .iter()
            .any(|accepted| accepted.eq_ignore_ascii_case(scheme))
            .then_some(candidate)
    }
}

#[async_trait]
impl SearchProvider for UrlProvider {
    fn id(&self) -> PluginId {
        self.id.clone()
    }

    async fn search(&self, query: &str, sink: ResultSink) -> Result<(), ProviderError> {
        if let Some(url) = self.recognise(query) {
            sink.add(json!([{
                "id": url,
                "context": self.id,
                "title": url,
                "desc": "Open in the default browser",
                "icon": "link",
            }]));
        }
        Ok(())
    }

    async fn execute(
        &self,
        context: &WorkerContext,
        id: &ItemId,
        _payload: Value,
        _extra: Value,
    ) -> Result<(), ProviderError> {
        let url = id
            .as_str()
            .ok_or_else(|| ProviderError::failed(format!("item id {id} is not a URL")))?;
        context
            .platform
            .open_external(url)
            .map_err(|err| ProviderError::failed(err.to_string()))
    }

    async fn render_preview(&self, id: &ItemId, _payload: Value) -> Result<String, ProviderError> {
        Ok(format!("<p class=\"url-preview\">{}</p>", escape_html(&id.to_string())))
    }

    fn default_preferences(&self) -> Option<Document> {
        let mut defaults = Document::new();
        defaults.insert(SCHEMES_KEY.to_string(), json!(default_schemes()));
        Some(defaults)
    }

    async fn on_preferences_committed(&self, preferences: &Document) -> Result<(), ProviderError> {
        let schemes = match preferences.get(SCHEMES_KEY) {
            None => default_schemes(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| item.as_str().map(str::to_ascii_lowercase))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| ProviderError::failed("'schemes' must be a list of strings"))?,
            Some(_) => return Err(ProviderError::failed("'schemes' must be a list of strings")),
        };
        *self.schemes.write().unwrap_or_else(PoisonError::into_inner) = schemes;
        Ok(())
    }
}

fn default_schemes() -> Vec<String> {
    vec!["http".to_string(), "https".to_string()]
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
