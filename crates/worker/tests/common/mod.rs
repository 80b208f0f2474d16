//! Scripted collaborators shared by the worker integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::Poll;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use protocol::{
    Document, InboundMessage, ItemId, OutboundMessage, PluginId, PrefId, SearchEvent,
    SearchResult,
};
use worker::{
    NetworkConfigurator, NetworkError, PluginHost, PluginHostError, PluginHostFactory,
    SearchStream, Timeouts, Worker, WorkerContext,
};

// ---------------------------------------------------------------------------
// Scripts
// ---------------------------------------------------------------------------

pub enum InitScript {
    Succeed,
    /// Fails this many times, then succeeds.
    FailTimes(usize),
    Panic,
    Hang,
}

pub enum SearchScript {
    /// Each plugin yields one `add` result echoing the query.
    Echo(Vec<&'static str>),
    Events(Vec<SearchEvent>),
    PanicAfter(Vec<SearchEvent>),
    Hang,
}

pub struct ScriptedHost {
    init: InitScript,
    init_calls: AtomicUsize,
    search: SearchScript,
    prefs: Mutex<BTreeMap<PrefId, Document>>,
    commits: AtomicUsize,
    executed: Mutex<Vec<(PluginId, ItemId, Value, Value)>>,
}

impl ScriptedHost {
    pub fn new(init: InitScript, search: SearchScript) -> Self {
        Self {
            init,
            init_calls: AtomicUsize::new(0),
            search,
            prefs: Mutex::new(BTreeMap::new()),
            commits: AtomicUsize::new(0),
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn with_prefs(self, id: &str, document: Value) -> Self {
        self.prefs
            .lock()
            .unwrap()
            .insert(PrefId::new(id).unwrap(), object(document));
        self
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn executed(&self) -> Vec<(PluginId, ItemId, Value, Value)> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl PluginHost for ScriptedHost {
    async fn initialize(&self) -> Result<(), PluginHostError> {
        let call = self.init_calls.fetch_add(1, Ordering::SeqCst);
        match self.init {
            InitScript::Succeed => Ok(()),
            InitScript::FailTimes(n) if call < n => Err(PluginHostError::Setup {
                message: "plugin directory unreadable".to_string(),
            }),
            InitScript::FailTimes(_) => Ok(()),
            InitScript::Panic => panic!("plugin loader crashed"),
            InitScript::Hang => futures::future::pending().await,
        }
    }

    fn search_all(&self, query: &str) -> SearchStream {
        match &self.search {
            SearchScript::Echo(plugins) => {
                let query = query.to_string();
                let events: Vec<SearchEvent> = plugins
                    .iter()
                    .map(|plugin| {
                        SearchEvent::Result(SearchResult::new(
                            "add",
                            json!({"plugin": plugin, "query": query}),
                        ))
                    })
                    .collect();
                stream::iter(events).boxed()
            }
            SearchScript::Events(events) => stream::iter(events.clone()).boxed(),
            SearchScript::PanicAfter(events) => stream::iter(events.clone())
                .chain(stream::poll_fn(|_| -> Poll<Option<SearchEvent>> {
                    panic!("search callback threw")
                }))
                .boxed(),
            SearchScript::Hang => stream::pending().boxed(),
        }
    }

    async fn execute(
        &self,
        context: &PluginId,
        id: &ItemId,
        payload: Value,
        extra: Value,
    ) -> Result<(), PluginHostError> {
        if context.as_str() == "missing" {
            return Err(PluginHostError::UnknownPlugin {
                plugin: context.clone(),
            });
        }
        self.executed
            .lock()
            .unwrap()
            .push((context.clone(), id.clone(), payload, extra));
        Ok(())
    }

    async fn render_preview(
        &self,
        context: &PluginId,
        id: &ItemId,
        _payload: Value,
    ) -> Result<String, PluginHostError> {
        Ok(format!("<p>{context}/{id}</p>"))
    }

    async fn button_action(
        &self,
        context: &PluginId,
        _id: &ItemId,
        _payload: Value,
    ) -> Result<(), PluginHostError> {
        Err(PluginHostError::Unsupported {
            plugin: context.clone(),
            operation: "button actions",
        })
    }

    fn get_pref_ids(&self) -> Vec<PrefId> {
        self.prefs.lock().unwrap().keys().cloned().collect()
    }

    fn get_preferences(&self, pref_id: &PrefId) -> Result<Document, PluginHostError> {
        self.prefs
            .lock()
            .unwrap()
            .get(pref_id)
            .cloned()
            .ok_or_else(|| PluginHostError::UnknownPreferences {
                pref_id: pref_id.clone(),
            })
    }

    fn update_preferences(
        &self,
        pref_id: &PrefId,
        model: Document,
    ) -> Result<(), PluginHostError> {
        let mut prefs = self.prefs.lock().unwrap();
        let doc = prefs
            .get_mut(pref_id)
            .ok_or_else(|| PluginHostError::UnknownPreferences {
                pref_id: pref_id.clone(),
            })?;
        protocol::merge_document(doc, model);
        Ok(())
    }

    fn reset_preferences(&self, pref_id: &PrefId) -> Result<(), PluginHostError> {
        let mut prefs = self.prefs.lock().unwrap();
        let doc = prefs
            .get_mut(pref_id)
            .ok_or_else(|| PluginHostError::UnknownPreferences {
                pref_id: pref_id.clone(),
            })?;
        doc.clear();
        Ok(())
    }

    async fn commit_preferences(&self) -> Result<(), PluginHostError> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct ScriptedFactory {
    pub host: Arc<ScriptedHost>,
    pub fail: bool,
    pub contexts: Mutex<Vec<WorkerContext>>,
}

impl ScriptedFactory {
    pub fn new(host: ScriptedHost) -> Arc<Self> {
        Arc::new(Self {
            host: Arc::new(host),
            fail: false,
            contexts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(host: ScriptedHost) -> Arc<Self> {
        Arc::new(Self {
            host: Arc::new(host),
            fail: true,
            contexts: Mutex::new(Vec::new()),
        })
    }

    pub fn created(&self) -> usize {
        self.contexts.lock().unwrap().len()
    }

    pub fn context(&self) -> WorkerContext {
        self.contexts.lock().unwrap()[0].clone()
    }
}

impl PluginHostFactory for ScriptedFactory {
    fn create(&self, context: WorkerContext) -> Result<Arc<dyn PluginHost>, PluginHostError> {
        self.contexts.lock().unwrap().push(context);
        if self.fail {
            return Err(PluginHostError::Setup {
                message: "no plugin directory".to_string(),
            });
        }
        Ok(self.host.clone())
    }
}

#[derive(Default)]
pub struct RecordingNetwork {
    pub reject: bool,
    pub seen: Mutex<Vec<Document>>,
}

impl NetworkConfigurator for RecordingNetwork {
    fn configure(&self, app_preferences: &Document) -> Result<(), NetworkError> {
        self.seen.lock().unwrap().push(app_preferences.clone());
        if self.reject {
            return Err(NetworkError::InvalidProxy {
                value: "\"ftp://nowhere\"".to_string(),
                reason: "unsupported scheme".to_string(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub struct Harness {
    pub worker: Worker,
    pub outbound: mpsc::UnboundedReceiver<OutboundMessage>,
    pub factory: Arc<ScriptedFactory>,
    pub network: Arc<RecordingNetwork>,
}

impl Harness {
    pub fn new(factory: Arc<ScriptedFactory>) -> Self {
        Self::with(factory, RecordingNetwork::default(), Timeouts::default())
    }

    pub fn with(
        factory: Arc<ScriptedFactory>,
        network: RecordingNetwork,
        timeouts: Timeouts,
    ) -> Self {
        let network = Arc::new(network);
        let (worker, outbound) =
            Worker::new(factory.clone(), network.clone(), timeouts).expect("router builds");
        Self {
            worker,
            outbound,
            factory,
            network,
        }
    }

    /// Sends a command and waits for all work it started.
    pub async fn send(&mut self, name: &str, payload: Value) -> Vec<OutboundMessage> {
        self.worker.handle(InboundMessage::new(name, payload));
        self.worker.settle().await;
        self.drain()
    }

    pub fn drain(&mut self) -> Vec<OutboundMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.outbound.try_recv() {
            messages.push(message);
        }
        messages
    }

    /// Runs `initialize` and asserts it succeeded.
    pub async fn ready(&mut self) {
        let out = self.send("initialize", json!({"appPref": {}})).await;
        assert_eq!(out, vec![OutboundMessage::PluginsLoaded {}]);
    }
}

pub fn object(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

pub fn errors(messages: &[OutboundMessage]) -> Vec<String> {
    messages
        .iter()
        .filter_map(|m| match m {
            OutboundMessage::OnError { trace } => Some(trace.clone()),
            _ => None,
        })
        .collect()
}

pub fn count(messages: &[OutboundMessage], name: &str) -> usize {
    messages.iter().filter(|m| m.name() == name).count()
}
