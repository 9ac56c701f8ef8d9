// End-to-end pipeline tests over mock ports: greeting fast path, full
// parse→dispatch→record turns, parse failures, unsupported resources,
// fail-fast retrieval and cancellation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use kubesage_core::atoms::error::{EngineError, EngineResult};
use kubesage_core::atoms::traits::{CompletionPort, ResourceHandler, RetrievalPort};
use kubesage_core::atoms::types::{
    ChunkMetadata, CompletionOptions, DocChunk, Message, ResourceKind, SessionContext, TaskParams,
    TaskResult,
};
use kubesage_core::engine::agent::ClusterAgent;
use kubesage_core::engine::dispatcher::TaskDispatcher;
use kubesage_core::engine::store::InteractionStore;
use kubesage_core::engine::validation::DefaultValidator;

// ── Mock ports ─────────────────────────────────────────────────────────

struct MockProvider {
    responses: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl MockProvider {
    fn returning(responses: &[&str]) -> Arc<Self> {
        Arc::new(MockProvider {
            responses: Mutex::new(responses.iter().rev().map(|s| s.to_string()).collect()),
            calls: AtomicUsize::new(0),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionPort for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(
        &self,
        _messages: &[Message],
        _options: &CompletionOptions,
        cancel: &CancellationToken,
    ) -> EngineResult<String> {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .pop()
            .ok_or_else(|| EngineError::completion("mock", "no scripted response left"))
    }
}

struct MockRetriever {
    chunks: Vec<DocChunk>,
    fail: bool,
    calls: AtomicUsize,
}

impl MockRetriever {
    fn with_chunks(chunks: Vec<DocChunk>) -> Arc<Self> {
        Arc::new(MockRetriever { chunks, fail: false, calls: AtomicUsize::new(0) })
    }

    fn failing() -> Arc<Self> {
        Arc::new(MockRetriever { chunks: Vec::new(), fail: true, calls: AtomicUsize::new(0) })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RetrievalPort for MockRetriever {
    async fn search(
        &self,
        _query: &str,
        k: usize,
        cancel: &CancellationToken,
    ) -> EngineResult<Vec<DocChunk>> {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(EngineError::Retrieval("vector index unavailable".into()));
        }
        Ok(self.chunks.iter().take(k).cloned().collect())
    }
}

struct MockHandler {
    kind: ResourceKind,
    calls: Arc<AtomicUsize>,
    result: TaskResult,
}

#[async_trait]
impl ResourceHandler for MockHandler {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    async fn execute(
        &self,
        _session: &SessionContext,
        _params: &TaskParams,
        _cancel: &CancellationToken,
    ) -> EngineResult<TaskResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.result.clone())
    }
}

// ── Fixture ────────────────────────────────────────────────────────────

struct Fixture {
    agent: ClusterAgent,
    store: Arc<InteractionStore>,
    provider: Arc<MockProvider>,
    retriever: Arc<MockRetriever>,
    pod_calls: Arc<AtomicUsize>,
}

fn chunk(source: &str) -> DocChunk {
    DocChunk {
        content: format!("documentation from {}", source),
        metadata: ChunkMetadata { source: source.into(), start_line: 0, end_line: 39 },
    }
}

fn fixture(provider: Arc<MockProvider>, retriever: Arc<MockRetriever>) -> Fixture {
    let store = Arc::new(InteractionStore::open_in_memory().unwrap());
    let pod_calls = Arc::new(AtomicUsize::new(0));

    let mut dispatcher = TaskDispatcher::new(Box::new(DefaultValidator));
    dispatcher.register(Box::new(MockHandler {
        kind: ResourceKind::Pod,
        calls: pod_calls.clone(),
        result: TaskResult::ok("NAME    READY   STATUS\nweb-0   1/1     Running"),
    }));

    let agent = ClusterAgent::new(
        provider.clone(),
        retriever.clone(),
        store.clone(),
        dispatcher,
        SessionContext { current_context: "test-cluster".into(), current_namespace: "default".into() },
    );

    Fixture { agent, store, provider, retriever, pod_calls }
}

// ── Scenario A: greeting fast path ─────────────────────────────────────

#[tokio::test]
async fn greeting_bypasses_ports_and_records_nothing() {
    let mut fx = fixture(MockProvider::returning(&[]), MockRetriever::with_chunks(vec![]));
    let cancel = CancellationToken::new();

    let result = fx.agent.process_query("hello", &[], &cancel).await.unwrap();

    assert!(result.success);
    assert!(result.output.contains("test-cluster"));
    assert!(result.output.contains("default"));
    assert_eq!(fx.provider.call_count(), 0);
    assert_eq!(fx.retriever.call_count(), 0);
    assert_eq!(fx.store.interaction_count().unwrap(), 0);
    assert_eq!(fx.agent.memory().len(), 1);
}

// ── Scenario B: full parse → dispatch → record ─────────────────────────

#[tokio::test]
async fn list_pods_dispatches_and_records_success() {
    let provider =
        MockProvider::returning(&[r#"{"action":"list","resourceType":"pod","resourceName":"","namespace":"","containerName":"","command":[],"flags":{}}"#]);
    let retriever = MockRetriever::with_chunks(vec![chunk("docs/pods.md")]);
    let mut fx = fixture(provider, retriever);
    let cancel = CancellationToken::new();

    let result = fx.agent.process_query("list all pods", &["cli".into()], &cancel).await.unwrap();

    assert!(result.success);
    assert!(result.output.contains("web-0"));
    assert_eq!(fx.pod_calls.load(Ordering::SeqCst), 1);

    let interactions = fx.store.recent_interactions(10).unwrap();
    assert_eq!(interactions.len(), 1);
    assert!(interactions[0].success);
    assert_eq!(interactions[0].query, "list all pods");
    assert_eq!(interactions[0].context_tags, vec!["cli"]);
    // Retrieved chunks are charged with the outcome even though their
    // baseline score kept them out of the composed prompt.
    assert_eq!(interactions[0].chunks_used, vec!["docs/pods.md:0-39"]);
    assert!(fx.store.chunk_score("docs/pods.md:0-39").unwrap() > 1.0);
    assert_eq!(fx.agent.memory().len(), 1);
}

#[tokio::test]
async fn empty_namespace_defaults_to_session_namespace() {
    let provider = MockProvider::returning(&[r#"{"action":"list","resourceType":"pods"}"#]);
    let mut fx = fixture(provider, MockRetriever::with_chunks(vec![]));
    let cancel = CancellationToken::new();

    fx.agent.process_query("list all pods", &[], &cancel).await.unwrap();

    let window = fx.agent.memory().context_window(1);
    assert_eq!(window[0].params.namespace, "default");
}

// ── Scenario C: unparseable completion output ──────────────────────────

#[tokio::test]
async fn non_json_completion_is_a_parse_error_without_dispatch() {
    let provider = MockProvider::returning(&["not json"]);
    let mut fx = fixture(provider, MockRetriever::with_chunks(vec![chunk("docs/pods.md")]));
    let cancel = CancellationToken::new();

    let err = fx.agent.process_query("do the thing", &[], &cancel).await.unwrap_err();

    match err {
        EngineError::Parse { raw, .. } => assert_eq!(raw, "not json"),
        other => panic!("expected ParseError, got {:?}", other),
    }
    assert_eq!(fx.pod_calls.load(Ordering::SeqCst), 0);

    // The failed turn still yields one interaction and one turn, and the
    // consulted chunks take the hit.
    let interactions = fx.store.recent_interactions(10).unwrap();
    assert_eq!(interactions.len(), 1);
    assert!(!interactions[0].success);
    assert!(fx.store.chunk_score("docs/pods.md:0-39").unwrap() < 1.0);
    assert_eq!(fx.agent.memory().len(), 1);
}

// ── Scenario D: unsupported resource type ──────────────────────────────

#[tokio::test]
async fn unsupported_resource_names_the_value_and_skips_handlers() {
    let provider = MockProvider::returning(&[r#"{"action":"fly","resourceType":"widget"}"#]);
    let mut fx = fixture(provider, MockRetriever::with_chunks(vec![]));
    let cancel = CancellationToken::new();

    let err = fx.agent.process_query("make the widget fly", &[], &cancel).await.unwrap_err();

    match err {
        EngineError::UnsupportedOperation(value) => assert!(value.contains("widget")),
        other => panic!("expected UnsupportedOperation, got {:?}", other),
    }
    assert_eq!(fx.pod_calls.load(Ordering::SeqCst), 0);

    let interactions = fx.store.recent_interactions(10).unwrap();
    assert_eq!(interactions.len(), 1);
    assert!(!interactions[0].success);
}

// ── Fail-fast retrieval ────────────────────────────────────────────────

#[tokio::test]
async fn retrieval_failure_skips_completion() {
    let provider = MockProvider::returning(&[r#"{"action":"list","resourceType":"pod"}"#]);
    let retriever = MockRetriever::failing();
    let mut fx = fixture(provider, retriever);
    let cancel = CancellationToken::new();

    let err = fx.agent.process_query("list pods", &[], &cancel).await.unwrap_err();

    assert!(matches!(err, EngineError::Retrieval(_)));
    assert_eq!(fx.provider.call_count(), 0);
    assert_eq!(fx.pod_calls.load(Ordering::SeqCst), 0);
}

// ── Conversational turns parsed by the model ───────────────────────────

#[tokio::test]
async fn model_classified_conversational_turn_records_success() {
    let provider = MockProvider::returning(
        &[r#"{"action":"conversational","flags":{"response":"I'm an assistant for your cluster."}}"#],
    );
    let mut fx = fixture(provider, MockRetriever::with_chunks(vec![]));
    let cancel = CancellationToken::new();

    let result = fx.agent.process_query("what are you?", &[], &cancel).await.unwrap();

    assert_eq!(result.output, "I'm an assistant for your cluster.");
    let interactions = fx.store.recent_interactions(10).unwrap();
    assert_eq!(interactions.len(), 1);
    assert!(interactions[0].success);
    assert_eq!(fx.pod_calls.load(Ordering::SeqCst), 0);
}

// ── Cancellation ───────────────────────────────────────────────────────

#[tokio::test]
async fn cancelled_turn_writes_nothing() {
    let provider = MockProvider::returning(&[]);
    let retriever = MockRetriever::with_chunks(vec![]);
    let mut fx = fixture(provider, retriever);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = fx.agent.process_query("list pods", &[], &cancel).await.unwrap_err();

    assert!(matches!(err, EngineError::Cancelled));
    assert_eq!(fx.store.interaction_count().unwrap(), 0);
    assert_eq!(fx.agent.memory().len(), 0);
}

// ── Conversation window feeds the next parse ───────────────────────────

#[tokio::test]
async fn successive_turns_accumulate_history() {
    let provider = MockProvider::returning(&[
        r#"{"action":"list","resourceType":"pod"}"#,
        r#"{"action":"list","resourceType":"pod"}"#,
    ]);
    let mut fx = fixture(provider, MockRetriever::with_chunks(vec![]));
    let cancel = CancellationToken::new();

    fx.agent.process_query("list pods", &[], &cancel).await.unwrap();
    fx.agent.process_query("list pods again", &[], &cancel).await.unwrap();

    assert_eq!(fx.agent.memory().len(), 2);
    assert_eq!(fx.store.interaction_count().unwrap(), 2);
}
