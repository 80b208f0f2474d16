//! Registry behaviour with scripted providers.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use plugins::{PluginRegistry, ProviderError, RegistryError, RegistryFactory, ResultSink, SearchProvider};
use protocol::{Document, ItemId, OutboundMessage, PluginId, PrefId, SearchEvent};
use worker::{
    Outbox, PlatformProxy, PluginHost, PluginHostError, PluginHostFactory, PreferenceStore,
    Timeouts, WorkerContext,
};

#[derive(Clone, Copy)]
enum Behaviour {
    Ok,
    Fail,
    Panic,
    Hang,
}

struct Scripted {
    id: &'static str,
    init: Behaviour,
    search: Behaviour,
    defaults: Option<Value>,
    committed: Mutex<Vec<Document>>,
}

impl Scripted {
    fn new(id: &'static str) -> Self {
        Self {
            id,
            init: Behaviour::Ok,
            search: Behaviour::Ok,
            defaults: None,
            committed: Mutex::new(Vec::new()),
        }
    }

    fn init(mut self, behaviour: Behaviour) -> Self {
        self.init = behaviour;
        self
    }

    fn search(mut self, behaviour: Behaviour) -> Self {
        self.search = behaviour;
        self
    }

    fn defaults(mut self, defaults: Value) -> Self {
        self.defaults = Some(defaults);
        self
    }
}

async fn act(behaviour: Behaviour, what: &str) -> Result<(), ProviderError> {
    match behaviour {
        Behaviour::Ok => Ok(()),
        Behaviour::Fail => Err(ProviderError::failed(format!("{what} failed"))),
        Behaviour::Panic => panic!("{what} exploded"),
        Behaviour::Hang => futures::future::pending().await,
    }
}

#[async_trait]
impl SearchProvider for Scripted {
    fn id(&self) -> PluginId {
        PluginId::new(self.id).unwrap()
    }

    async fn initialize(&self, _context: &WorkerContext) -> Result<(), ProviderError> {
        act(self.init, "init").await
    }

    async fn search(&self, query: &str, sink: ResultSink) -> Result<(), ProviderError> {
        sink.add(json!({"from": self.id, "query": query}));
        act(self.search, "search").await
    }

    fn default_preferences(&self) -> Option<Document> {
        self.defaults.clone().and_then(|v| v.as_object().cloned())
    }

    async fn on_preferences_committed(&self, preferences: &Document) -> Result<(), ProviderError> {
        self.committed.lock().unwrap().push(preferences.clone());
        Ok(())
    }
}

struct Fixture {
    registry: PluginRegistry,
    outbound: mpsc::UnboundedReceiver<OutboundMessage>,
    _app: PreferenceStore,
}

fn fixture(providers: Vec<Arc<dyn SearchProvider>>) -> Fixture {
    let app = PreferenceStore::new("app");
    let (outbox, outbound) = Outbox::channel();
    let context = WorkerContext {
        app_preferences: app.view(),
        platform: PlatformProxy::new(outbox),
    };
    let timeouts = Timeouts {
        plugin_call_secs: 2,
        ..Timeouts::default()
    };
    Fixture {
        registry: PluginRegistry::new(providers, context, timeouts),
        outbound,
        _app: app,
    }
}

fn plugin(id: &str) -> PluginId {
    PluginId::new(id).unwrap()
}

fn object(value: Value) -> Document {
    value.as_object().cloned().unwrap()
}

#[tokio::test]
async fn test_failing_providers_are_dropped_at_load() {
    let f = fixture(vec![
        Arc::new(Scripted::new("files")),
        Arc::new(Scripted::new("broken").init(Behaviour::Fail)),
        Arc::new(Scripted::new("crashy").init(Behaviour::Panic)),
        Arc::new(Scripted::new("calc")),
    ]);

    f.registry.initialize().await.unwrap();

    assert_eq!(f.registry.loaded_ids(), vec![plugin("files"), plugin("calc")]);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_provider_is_dropped_at_load() {
    let f = fixture(vec![
        Arc::new(Scripted::new("slow").init(Behaviour::Hang)),
        Arc::new(Scripted::new("calc")),
    ]);

    f.registry.initialize().await.unwrap();

    assert_eq!(f.registry.loaded_ids(), vec![plugin("calc")]);
}

#[tokio::test]
async fn test_search_isolates_faulty_providers() {
    let f = fixture(vec![
        Arc::new(Scripted::new("files")),
        Arc::new(Scripted::new("broken").search(Behaviour::Fail)),
        Arc::new(Scripted::new("crashy").search(Behaviour::Panic)),
    ]);
    f.registry.initialize().await.unwrap();

    let events: Vec<SearchEvent> = f.registry.search_all("abc").collect().await;

    let results = events
        .iter()
        .filter(|e| matches!(e, SearchEvent::Result(_)))
        .count();
    assert_eq!(results, 3);

    let mut faults: Vec<(String, String)> = events
        .iter()
        .filter_map(|e| match e {
            SearchEvent::Fault(fault) => Some((fault.plugin.to_string(), fault.message.clone())),
            _ => None,
        })
        .collect();
    faults.sort();
    assert_eq!(
        faults,
        vec![
            ("broken".to_string(), "search failed".to_string()),
            ("crashy".to_string(), "panicked: search exploded".to_string()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_stalled_search_becomes_a_fault() {
    let f = fixture(vec![
        Arc::new(Scripted::new("slow").search(Behaviour::Hang)),
        Arc::new(Scripted::new("calc")),
    ]);
    f.registry.initialize().await.unwrap();

    let events: Vec<SearchEvent> = f.registry.search_all("q").collect().await;

    assert_eq!(events.len(), 3);
    let fault = events.iter().find_map(|e| match e {
        SearchEvent::Fault(fault) => Some(fault.clone()),
        _ => None,
    });
    let fault = fault.unwrap();
    assert_eq!(fault.plugin, plugin("slow"));
    assert!(fault.message.contains("timed out after 2s"), "{}", fault.message);
}

#[tokio::test]
async fn test_search_with_no_plugins_ends_immediately() {
    let f = fixture(Vec::new());
    f.registry.initialize().await.unwrap();

    let events: Vec<SearchEvent> = f.registry.search_all("q").collect().await;

    assert!(events.is_empty());
}

#[tokio::test]
async fn test_calls_are_routed_by_context() {
    let f = fixture(vec![Arc::new(Scripted::new("files"))]);
    f.registry.initialize().await.unwrap();
    let item = ItemId::new("doc");

    let unknown = f
        .registry
        .execute(&plugin("nope"), &item, Value::Null, Value::Null)
        .await;
    assert_eq!(unknown, Err(PluginHostError::UnknownPlugin { plugin: plugin("nope") }));

    let unsupported = f
        .registry
        .render_preview(&plugin("files"), &item, Value::Null)
        .await;
    assert_eq!(
        unsupported,
        Err(PluginHostError::Unsupported {
            plugin: plugin("files"),
            operation: "preview rendering",
        })
    );
}

#[tokio::test]
async fn test_preferences_lifecycle() {
    let calc = Arc::new(Scripted::new("calc").defaults(json!({"precision": 2})));
    let f = fixture(vec![
        Arc::new(Scripted::new("files").defaults(json!({"hidden": false}))),
        calc.clone(),
        Arc::new(Scripted::new("bare")),
    ]);
    f.registry.initialize().await.unwrap();
    let calc_id = PrefId::new("calc").unwrap();

    assert_eq!(
        f.registry.get_pref_ids(),
        vec![PrefId::new("calc").unwrap(), PrefId::new("files").unwrap()]
    );

    f.registry
        .update_preferences(&calc_id, object(json!({"locale": "fr"})))
        .unwrap();
    assert_eq!(
        Value::Object(f.registry.get_preferences(&calc_id).unwrap()),
        json!({"precision": 2, "locale": "fr"})
    );

    f.registry.commit_preferences().await.unwrap();
    f.registry.reset_preferences(&calc_id).unwrap();
    assert_eq!(
        Value::Object(f.registry.get_preferences(&calc_id).unwrap()),
        json!({"precision": 2})
    );

    let committed = calc.committed.lock().unwrap().clone();
    assert_eq!(
        committed,
        vec![
            object(json!({"precision": 2})),
            object(json!({"precision": 2, "locale": "fr"})),
        ]
    );
}

async fn url_host() -> (Arc<dyn PluginHost>, mpsc::UnboundedReceiver<OutboundMessage>) {
    let factory = RegistryFactory::with_builtins(Timeouts::default()).unwrap();
    let app = PreferenceStore::new("app");
    let (outbox, outbound) = Outbox::channel();
    let host = factory
        .create(WorkerContext {
            app_preferences: app.view(),
            platform: PlatformProxy::new(outbox),
        })
        .unwrap();
    host.initialize().await.unwrap();
    (host, outbound)
}

#[tokio::test]
async fn test_url_provider_opens_links_through_platform() {
    let factory = RegistryFactory::with_builtins(Timeouts::default()).unwrap();
    assert_eq!(factory.plugin_ids(), vec![plugin("url")]);

    let (host, mut outbound) = url_host().await;
    let events: Vec<SearchEvent> = host.search_all("https://lumen.dev").collect().await;
    assert_eq!(events.len(), 1);

    host.execute(
        &plugin("url"),
        &ItemId::new("https://lumen.dev"),
        Value::Null,
        Value::Null,
    )
    .await
    .unwrap();

    assert_eq!(
        outbound.try_recv().unwrap(),
        OutboundMessage::CallPlatform {
            service: "shell".to_string(),
            func: "openExternal".to_string(),
            args: json!(["https://lumen.dev"]),
        }
    );
}

#[tokio::test]
async fn test_rejected_commit_rolls_back_and_can_be_redone() {
    let (host, _outbound) = url_host().await;
    let url = PrefId::new("url").unwrap();

    host.update_preferences(&url, object(json!({"schemes": 5})))
        .unwrap();
    let err = host.commit_preferences().await.unwrap_err();
    assert!(err.to_string().contains("'schemes' must be a list of strings"), "{err}");

    assert_eq!(
        Value::Object(host.get_preferences(&url).unwrap()),
        json!({"schemes": ["http", "https"]})
    );
    let events: Vec<SearchEvent> = host.search_all("https://lumen.dev").collect().await;
    assert_eq!(events.len(), 1);

    host.update_preferences(&url, object(json!({"schemes": ["ftp"]})))
        .unwrap();
    host.commit_preferences().await.unwrap();

    let events: Vec<SearchEvent> = host.search_all("https://lumen.dev").collect().await;
    assert!(events.is_empty());
    let events: Vec<SearchEvent> = host.search_all("ftp://mirror").collect().await;
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn test_url_provider_rejects_non_string_item_ids() {
    let (host, mut outbound) = url_host().await;

    let err = host
        .execute(&plugin("url"), &ItemId::new(3), Value::Null, Value::Null)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("item id 3 is not a URL"), "{err}");
    assert!(outbound.try_recv().is_err());
}

#[test]
fn test_duplicate_registration_is_rejected() {
    let mut factory = RegistryFactory::new(Timeouts::default());
    factory.register(Arc::new(Scripted::new("files"))).unwrap();

    let err = factory.register(Arc::new(Scripted::new("files"))).unwrap_err();

    assert_eq!(err, RegistryError::DuplicatePlugin { plugin: plugin("files") });
}

#[tokio::test]
async fn test_fixture_outbox_stays_quiet_without_platform_calls() {
    let mut f = fixture(vec![Arc::new(Scripted::new("files"))]);
    f.registry.initialize().await.unwrap();
    assert!(f.outbound.try_recv().is_err());
}
