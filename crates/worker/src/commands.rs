//! Handlers for every inbound command, and the table that registers them.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use protocol::{
    names, ButtonActionPayload, EmptyPayload, ExecutePayload, InitializePayload, ModelPayload,
    OutboundMessage, PrefIdPayload, RenderPreviewPayload, SearchAllPayload,
    UpdatePreferencesPayload,
};

use crate::router::{Reply, Router, RouterError};
use crate::session::{Completion, Session};
use crate::{lifecycle, search, PluginHost, PreferenceDomain, PreferenceRouter, WorkerError};

/// Builds the router with one handler per inbound command.
pub(crate) fn routes() -> Result<Router, RouterError> {
    let mut router = Router::new();

    router.register(names::INITIALIZE, initialize)?;

    router.register_ready(names::SEARCH_ALL, search_all)?;
    router.register_ready(names::EXECUTE, execute)?;
    router.register_ready(names::RENDER_PREVIEW, render_preview)?;
    router.register_ready(names::BUTTON_ACTION, button_action)?;

    router.register_ready(names::GET_PLUGIN_PREF_IDS, get_plugin_pref_ids)?;
    router.register_ready(names::GET_PREFERENCES, get_preferences)?;
    router.register_ready(names::UPDATE_PREFERENCES, update_preferences)?;
    router.register_ready(names::RESET_PREFERENCES, reset_preferences)?;
    router.register_ready(names::COMMIT_PREFERENCES, commit_preferences)?;
    router.register_ready(names::UPDATE_APP_PREFERENCES, update_app_preferences)?;
    router.register_ready(names::UPDATE_WINDOW_PREFERENCES, update_window_preferences)?;
    router.register_ready(names::UPDATE_THEME_PREFERENCES, update_theme_preferences)?;

    Ok(router)
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

fn initialize(session: &mut Session, payload: InitializePayload) -> Result<Reply, WorkerError> {
    lifecycle::begin(session, payload.app_pref)?;
    Ok(Reply::None)
}

// ---------------------------------------------------------------------------
// Search and passthroughs
// ---------------------------------------------------------------------------

fn search_all(
    session: &mut Session,
    host: Arc<dyn PluginHost>,
    payload: SearchAllPayload,
) -> Result<Reply, WorkerError> {
    debug!(ticket = %payload.ticket, "Starting search");
    let outbox = session.outbox.clone();
    let limit = session.timeouts.search();
    session.spawn(async move {
        search::fan_out(host, payload.ticket, payload.query, outbox, limit).await;
        Completion::Finished
    });
    Ok(Reply::None)
}

fn execute(
    session: &mut Session,
    host: Arc<dyn PluginHost>,
    payload: ExecutePayload,
) -> Result<Reply, WorkerError> {
    session.spawn_reported("execute", async move {
        host.execute(&payload.context, &payload.id, payload.payload, payload.extra)
            .await?;
        Ok::<_, WorkerError>(())
    });
    Ok(Reply::None)
}

fn render_preview(
    session: &mut Session,
    host: Arc<dyn PluginHost>,
    payload: RenderPreviewPayload,
) -> Result<Reply, WorkerError> {
    let outbox = session.outbox.clone();
    session.spawn_reported("renderPreview", async move {
        let html = host
            .render_preview(&payload.context, &payload.id, payload.payload)
            .await?;
        outbox.send(OutboundMessage::RequestRenderPreview {
            ticket: payload.ticket,
            html,
        });
        Ok::<_, WorkerError>(())
    });
    Ok(Reply::None)
}

fn button_action(
    session: &mut Session,
    host: Arc<dyn PluginHost>,
    payload: ButtonActionPayload,
) -> Result<Reply, WorkerError> {
    session.spawn_reported("buttonAction", async move {
        host.button_action(&payload.context, &payload.id, payload.payload)
            .await?;
        Ok::<_, WorkerError>(())
    });
    Ok(Reply::None)
}

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

fn get_plugin_pref_ids(
    session: &mut Session,
    host: Arc<dyn PluginHost>,
    _: EmptyPayload,
) -> Result<Reply, WorkerError> {
    let ids = PreferenceRouter::new(&session.preferences, host).plugin_pref_ids();
    Ok(Reply::Value(Value::Array(
        ids.into_iter().map(|id| Value::String(id.to_string())).collect(),
    )))
}

fn get_preferences(
    session: &mut Session,
    host: Arc<dyn PluginHost>,
    payload: PrefIdPayload,
) -> Result<Reply, WorkerError> {
    let domain = PreferenceDomain::Plugin(payload.pref_id);
    let document = PreferenceRouter::new(&session.preferences, host).read(&domain)?;
    Ok(Reply::Value(Value::Object(document)))
}

fn update_preferences(
    session: &mut Session,
    host: Arc<dyn PluginHost>,
    payload: UpdatePreferencesPayload,
) -> Result<Reply, WorkerError> {
    let domain = PreferenceDomain::Plugin(payload.pref_id);
    PreferenceRouter::new(&session.preferences, host).update(&domain, payload.model)?;
    Ok(Reply::None)
}

fn reset_preferences(
    session: &mut Session,
    host: Arc<dyn PluginHost>,
    payload: PrefIdPayload,
) -> Result<Reply, WorkerError> {
    let domain = PreferenceDomain::Plugin(payload.pref_id);
    PreferenceRouter::new(&session.preferences, host).reset(&domain)?;
    Ok(Reply::None)
}

/// Commits asynchronously; the `result` (null on success) confirms the flush.
fn commit_preferences(
    session: &mut Session,
    host: Arc<dyn PluginHost>,
    _: EmptyPayload,
) -> Result<Reply, WorkerError> {
    let commit = PreferenceRouter::new(&session.preferences, host).commit();
    Ok(Reply::Deferred(Box::pin(async move {
        commit.await?;
        Ok::<_, WorkerError>(Value::Null)
    })))
}

fn update_app_preferences(
    session: &mut Session,
    host: Arc<dyn PluginHost>,
    payload: ModelPayload,
) -> Result<Reply, WorkerError> {
    update_local(session, host, PreferenceDomain::App, payload)
}

fn update_window_preferences(
    session: &mut Session,
    host: Arc<dyn PluginHost>,
    payload: ModelPayload,
) -> Result<Reply, WorkerError> {
    update_local(session, host, PreferenceDomain::Window, payload)
}

fn update_theme_preferences(
    session: &mut Session,
    host: Arc<dyn PluginHost>,
    payload: ModelPayload,
) -> Result<Reply, WorkerError> {
    update_local(session, host, PreferenceDomain::Theme, payload)
}

fn update_local(
    session: &mut Session,
    host: Arc<dyn PluginHost>,
    domain: PreferenceDomain,
    payload: ModelPayload,
) -> Result<Reply, WorkerError> {
    PreferenceRouter::new(&session.preferences, host).update(&domain, payload.model)?;
    Ok(Reply::None)
}
