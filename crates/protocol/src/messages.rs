//! Command messages exchanged between the orchestrator and the worker.
//!
//! Every message on the channel has the shape `{ "name": ..., "payload": ... }`.
//! Inbound messages are kept loosely typed ([`InboundMessage`]) until the
//! router has picked a handler; the handler then decodes its own payload type
//! from this module. Outbound messages are a closed enum ([`OutboundMessage`]).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{CallId, Document, ItemId, PluginId, PrefId, ProtocolError, SearchResult, Ticket};

// ---------------------------------------------------------------------------
// Command names
// ---------------------------------------------------------------------------

/// Names of the inbound commands understood by the worker.
pub mod names {
    pub const INITIALIZE: &str = "initialize";
    pub const SEARCH_ALL: &str = "searchAll";
    pub const EXECUTE: &str = "execute";
    pub const RENDER_PREVIEW: &str = "renderPreview";
    pub const BUTTON_ACTION: &str = "buttonAction";
    pub const GET_PLUGIN_PREF_IDS: &str = "getPluginPrefIds";
    pub const GET_PREFERENCES: &str = "getPreferences";
    pub const UPDATE_PREFERENCES: &str = "updatePreferences";
    pub const RESET_PREFERENCES: &str = "resetPreferences";
    pub const COMMIT_PREFERENCES: &str = "commitPreferences";
    pub const UPDATE_APP_PREFERENCES: &str = "updateAppPreferences";
    pub const UPDATE_WINDOW_PREFERENCES: &str = "updateWindowPreferences";
    pub const UPDATE_THEME_PREFERENCES: &str = "updateThemePreferences";
}

// ---------------------------------------------------------------------------
// Inbound envelope
// ---------------------------------------------------------------------------

/// A command received from the orchestrator, before its payload is decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    /// Selects the handler.
    pub name: String,
    /// Handler-specific payload; opaque to the router.
    #[serde(default)]
    pub payload: Value,
    /// Present when the orchestrator expects a `result` reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<CallId>,
}

impl InboundMessage {
    /// Creates a message with no call id.
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
            call_id: None,
        }
    }

    /// Attaches a call id so the handler's value is returned as a `result`.
    pub fn with_call_id(mut self, call_id: CallId) -> Self {
        self.call_id = Some(call_id);
        self
    }

    /// Parses one message from its JSON text.
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(|source| ProtocolError::MalformedMessage { source })
    }

    /// Decodes the payload into the type expected by the command's handler.
    ///
    /// An absent (`null`) payload decodes as an empty object so commands
    /// without arguments accept both `{}` and a missing payload.
    pub fn decode_payload<P: DeserializeOwned>(&self) -> Result<P, ProtocolError> {
        let payload = match &self.payload {
            Value::Null => Value::Object(Document::new()),
            other => other.clone(),
        };
        serde_json::from_value(payload).map_err(|source| ProtocolError::InvalidPayload {
            command: self.name.clone(),
            source,
        })
    }
}

// ---------------------------------------------------------------------------
// Inbound payloads
// ---------------------------------------------------------------------------

/// Payload of `initialize`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializePayload {
    /// Initial app preference document, merged into the app domain.
    #[serde(default)]
    pub app_pref: Document,
}

/// Payload of `searchAll`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchAllPayload {
    pub ticket: Ticket,
    pub query: String,
}

/// Payload of `execute`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutePayload {
    /// Owning plugin.
    pub context: PluginId,
    #[serde(default)]
    pub id: ItemId,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub extra: Value,
}

/// Payload of `renderPreview`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderPreviewPayload {
    pub ticket: Ticket,
    /// Owning plugin.
    pub context: PluginId,
    #[serde(default)]
    pub id: ItemId,
    #[serde(default)]
    pub payload: Value,
}

/// Payload of `buttonAction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonActionPayload {
    /// Owning plugin.
    pub context: PluginId,
    #[serde(default)]
    pub id: ItemId,
    #[serde(default)]
    pub payload: Value,
}

/// Payload of commands that take no arguments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmptyPayload {}

/// Payload of `getPreferences` and `resetPreferences`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefIdPayload {
    pub pref_id: PrefId,
}

/// Payload of `updatePreferences`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePreferencesPayload {
    pub pref_id: PrefId,
    pub model: Document,
}

/// Payload of `updateAppPreferences`, `updateWindowPreferences` and
/// `updateThemePreferences`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelPayload {
    #[serde(default)]
    pub model: Document,
}

// ---------------------------------------------------------------------------
// Outbound messages
// ---------------------------------------------------------------------------

/// A message sent from the worker to the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "payload", rename_all = "camelCase")]
pub enum OutboundMessage {
    /// Initialization completed and every plugin that could load has loaded.
    PluginsLoaded {},

    /// A failure that the orchestrator should display or log.
    OnError {
        /// Descriptive trace of the failure.
        trace: String,
    },

    /// One search result, tagged with the ticket of the search that produced it.
    RequestAddResults {
        ticket: Ticket,
        #[serde(rename = "type")]
        result_type: String,
        payload: Value,
    },

    /// The rendered preview for a `renderPreview` request.
    RequestRenderPreview { ticket: Ticket, html: String },

    /// The result stream for `ticket` has ended; no further results follow.
    SearchCompleted { ticket: Ticket },

    /// Reply to an inbound command that carried a `callId`.
    #[serde(rename = "result", rename_all = "camelCase")]
    Reply {
        call_id: Option<CallId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// A plugin asked the host desktop to perform a platform action.
    CallPlatform {
        service: String,
        func: String,
        #[serde(default)]
        args: Value,
    },
}

impl OutboundMessage {
    /// Wraps a search result under its originating ticket.
    pub fn add_results(ticket: Ticket, result: SearchResult) -> Self {
        Self::RequestAddResults {
            ticket,
            result_type: result.result_type,
            payload: result.payload,
        }
    }

    /// Builds an `onError` report from any displayable failure.
    pub fn error(trace: impl std::fmt::Display) -> Self {
        Self::OnError {
            trace: trace.to_string(),
        }
    }

    /// Returns the wire name of this message.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PluginsLoaded {} => "pluginsLoaded",
            Self::OnError { .. } => "onError",
            Self::RequestAddResults { .. } => "requestAddResults",
            Self::RequestRenderPreview { .. } => "requestRenderPreview",
            Self::SearchCompleted { .. } => "searchCompleted",
            Self::Reply { .. } => "result",
            Self::CallPlatform { .. } => "callPlatform",
        }
    }

    /// Serialises the message as a single line of compact JSON.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|source| ProtocolError::Encode { source })
    }
}
