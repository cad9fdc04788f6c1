//! In-memory search engine shared by the integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use elastices::{Client, ConnectionConfig, Document};
use elastices_repository::{
    BulkItemStatus, Connector, ScrollPage, ScrollRequest, SearchEngineClient, SearchError,
};

#[derive(Default)]
struct EngineState {
    /// index name -> documents by id
    indices: BTreeMap<String, BTreeMap<String, Document>>,
    /// live scroll token -> remaining hits and page size
    scrolls: HashMap<String, (VecDeque<Document>, usize)>,
    scroll_seq: usize,
    /// operation name -> number of upcoming calls that fail with a connection error
    transient: HashMap<&'static str, u32>,
    /// bulk requests containing any of these ids always fail with a connection error
    unreachable_ids: HashSet<String>,
    /// bulk items with these ids are rejected by the engine
    rejected_ids: HashSet<String>,
    expire_scrolls: bool,
    calls: Vec<&'static str>,
    next_scroll_tokens: Vec<String>,
    cleared_tokens: Vec<String>,
    bulk_requests: Vec<(Option<String>, Vec<String>)>,
    scroll_routing: Vec<Option<String>>,
}

/// A search engine that keeps indices in memory.
#[derive(Default)]
pub struct FakeEngine {
    state: Mutex<EngineState>,
    call_count: AtomicUsize,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create `index` holding `count` documents with ids "0".."count-1".
    pub async fn seed(&self, index: &str, count: usize) {
        let mut state = self.state.lock().await;
        let docs = state.indices.entry(index.to_string()).or_default();
        for n in 0..count {
            let doc = sample_document(n);
            docs.insert(doc.id.clone().unwrap_or_default(), doc);
        }
    }

    pub async fn create(&self, index: &str) {
        self.state
            .lock()
            .await
            .indices
            .entry(index.to_string())
            .or_default();
    }

    /// Make the next `times` calls of `operation` fail with a connection error.
    pub async fn fail_next(&self, operation: &'static str, times: u32) {
        self.state.lock().await.transient.insert(operation, times);
    }

    pub async fn make_unreachable(&self, id: &str) {
        self.state.lock().await.unreachable_ids.insert(id.to_string());
    }

    pub async fn reject(&self, id: &str) {
        self.state.lock().await.rejected_ids.insert(id.to_string());
    }

    pub async fn expire_scrolls(&self) {
        self.state.lock().await.expire_scrolls = true;
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub async fn calls(&self) -> Vec<&'static str> {
        self.state.lock().await.calls.clone()
    }

    pub async fn calls_to(&self, operation: &str) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| **c == operation)
            .count()
    }

    pub async fn document_count(&self, index: &str) -> Option<usize> {
        self.state.lock().await.indices.get(index).map(|d| d.len())
    }

    pub async fn stored(&self, index: &str, id: &str) -> Option<Document> {
        self.state
            .lock()
            .await
            .indices
            .get(index)
            .and_then(|docs| docs.get(id).cloned())
    }

    pub async fn open_scroll_count(&self) -> usize {
        self.state.lock().await.scrolls.len()
    }

    pub async fn next_scroll_tokens(&self) -> Vec<String> {
        self.state.lock().await.next_scroll_tokens.clone()
    }

    pub async fn cleared_tokens(&self) -> Vec<String> {
        self.state.lock().await.cleared_tokens.clone()
    }

    /// Routing and ids of every bulk request, in order.
    pub async fn bulk_requests(&self) -> Vec<(Option<String>, Vec<String>)> {
        self.state.lock().await.bulk_requests.clone()
    }

    pub async fn scroll_routing(&self) -> Vec<Option<String>> {
        self.state.lock().await.scroll_routing.clone()
    }

    /// Record a call and consume one scripted transient failure for it.
    fn enter(&self, state: &mut EngineState, operation: &'static str) -> Result<(), SearchError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        state.calls.push(operation);
        match state.transient.get_mut(operation) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(SearchError::connection(format!("{} connection reset", operation)))
            }
            _ => Ok(()),
        }
    }

    fn issue_token(state: &mut EngineState) -> String {
        state.scroll_seq += 1;
        format!("scroll-{}", state.scroll_seq)
    }
}

pub fn sample_document(n: usize) -> Document {
    Document::new(n.to_string())
        .with_field("indexId", n as i64)
        .with_field("name", format!("doc-{}", n))
}

#[async_trait]
impl SearchEngineClient for FakeEngine {
    async fn index_exists(&self, index: &str) -> Result<bool, SearchError> {
        let mut state = self.state.lock().await;
        self.enter(&mut state, "index_exists")?;
        Ok(state.indices.contains_key(index))
    }

    async fn create_index(&self, index: &str) -> Result<(), SearchError> {
        let mut state = self.state.lock().await;
        self.enter(&mut state, "create_index")?;
        if state.indices.contains_key(index) {
            return Err(SearchError::IndexAlreadyExists(index.to_string()));
        }
        state.indices.insert(index.to_string(), BTreeMap::new());
        Ok(())
    }

    async fn delete_by_query(&self, index: &str, _query: &Value) -> Result<u64, SearchError> {
        let mut state = self.state.lock().await;
        self.enter(&mut state, "delete_by_query")?;
        let docs = state
            .indices
            .get_mut(index)
            .ok_or_else(|| SearchError::IndexNotFound(index.to_string()))?;
        let deleted = docs.len() as u64;
        docs.clear();
        Ok(deleted)
    }

    async fn open_scroll(&self, request: &ScrollRequest) -> Result<ScrollPage, SearchError> {
        let mut state = self.state.lock().await;
        self.enter(&mut state, "open_scroll")?;
        state.scroll_routing.push(request.routing.clone());

        let mut hits: VecDeque<Document> = state
            .indices
            .get(&request.index)
            .ok_or_else(|| SearchError::IndexNotFound(request.index.clone()))?
            .values()
            .cloned()
            .collect();

        let take = request.batch_size.min(hits.len());
        let documents: Vec<Document> = hits.drain(..take).collect();
        let token = Self::issue_token(&mut state);
        state.scrolls.insert(token.clone(), (hits, request.batch_size));

        Ok(ScrollPage {
            scroll_id: Some(token),
            documents,
        })
    }

    async fn next_scroll(
        &self,
        scroll_id: &str,
        _keep_alive: Duration,
    ) -> Result<ScrollPage, SearchError> {
        let mut state = self.state.lock().await;
        state.next_scroll_tokens.push(scroll_id.to_string());
        self.enter(&mut state, "next_scroll")?;

        if state.expire_scrolls {
            return Err(SearchError::CursorExpired(format!(
                "No search context found for id [{}]",
                scroll_id
            )));
        }

        let (mut hits, batch_size) = state.scrolls.remove(scroll_id).ok_or_else(|| {
            SearchError::CursorExpired(format!("No search context found for id [{}]", scroll_id))
        })?;

        let take = batch_size.min(hits.len());
        let documents: Vec<Document> = hits.drain(..take).collect();
        let token = Self::issue_token(&mut state);
        state.scrolls.insert(token.clone(), (hits, batch_size));

        Ok(ScrollPage {
            scroll_id: Some(token),
            documents,
        })
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), SearchError> {
        let mut state = self.state.lock().await;
        self.enter(&mut state, "clear_scroll")?;
        state.scrolls.remove(scroll_id);
        state.cleared_tokens.push(scroll_id.to_string());
        Ok(())
    }

    async fn bulk_index(
        &self,
        index: &str,
        routing: Option<&str>,
        documents: &[Document],
    ) -> Result<Vec<BulkItemStatus>, SearchError> {
        let mut state = self.state.lock().await;
        self.enter(&mut state, "bulk_index")?;

        let ids: Vec<String> = documents
            .iter()
            .map(|d| d.id.clone().unwrap_or_default())
            .collect();
        state
            .bulk_requests
            .push((routing.map(str::to_string), ids.clone()));

        if ids.iter().any(|id| state.unreachable_ids.contains(id)) {
            return Err(SearchError::connection("bulk connection reset"));
        }

        let mut items = Vec::with_capacity(documents.len());
        for (doc, id) in documents.iter().zip(ids) {
            if state.rejected_ids.contains(&id) {
                items.push(BulkItemStatus::rejected(
                    id,
                    400,
                    "mapper_parsing_exception: failed to parse field [indexId]",
                ));
                continue;
            }
            state
                .indices
                .entry(index.to_string())
                .or_default()
                .insert(id.clone(), doc.clone());
            items.push(BulkItemStatus::accepted(id));
        }
        Ok(items)
    }

    async fn health_check(&self) -> Result<bool, SearchError> {
        let mut state = self.state.lock().await;
        self.enter(&mut state, "health_check")?;
        Ok(true)
    }
}

/// Connector handing out the same fake engine on every connect.
pub struct FakeConnector {
    engine: Arc<FakeEngine>,
    connects: AtomicUsize,
}

impl FakeConnector {
    pub fn new(engine: Arc<FakeEngine>) -> Arc<Self> {
        Arc::new(Self {
            engine,
            connects: AtomicUsize::new(0),
        })
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(
        &self,
        _config: &ConnectionConfig,
    ) -> Result<Arc<dyn SearchEngineClient>, SearchError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let engine: Arc<dyn SearchEngineClient> = self.engine.clone();
        Ok(engine)
    }
}

/// Config with short retry delays.
pub fn test_config() -> ConnectionConfig {
    ConnectionConfig::default()
        .with_retry_delays(10, 40)
        .with_max_retries(2)
}

/// A disconnected client backed by `engine`.
pub fn client_for(engine: &Arc<FakeEngine>, config: ConnectionConfig) -> Client {
    Client::with_connector(config, FakeConnector::new(engine.clone()))
}

/// A connected client backed by `engine`.
pub async fn connected_client(engine: &Arc<FakeEngine>, config: ConnectionConfig) -> Client {
    let mut client = client_for(engine, config);
    client.connect().await.unwrap();
    client
}
