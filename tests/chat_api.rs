use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use lawbot_backend::core::config::{AppPaths, Settings};
use lawbot_backend::llm::{ChatRequest, Embedder, Generator, LlmError};
use lawbot_backend::rag::{FlatIndex, SectionStore};
use lawbot_backend::server::router::router;
use lawbot_backend::state::AppState;

const THEFT: &str = "378. Theft.--Whoever, intending to take dishonestly any movable property out of the possession of any person without that person's consent, moves that property in order to such taking, is said to commit theft.";

/// Maps theft questions onto the first axis and everything else onto the third.
struct AxisEmbedder {
    calls: AtomicUsize,
}

#[async_trait]
impl Embedder for AxisEmbedder {
    fn model(&self) -> &str {
        "axis"
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(inputs
            .iter()
            .map(|input| {
                if input.to_lowercase().contains("theft") {
                    vec![1.0, 0.0, 0.0]
                } else {
                    vec![0.0, 0.0, 1.0]
                }
            })
            .collect())
    }
}

/// Fails every call with a message that must never reach the client.
struct BrokenEmbedder;

const EMBEDDER_FAILURE: &str = "connection refused by http://10.0.0.7:8080/v1/embeddings";

#[async_trait]
impl Embedder for BrokenEmbedder {
    fn model(&self) -> &str {
        "broken"
    }

    async fn embed(&self, _inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        Err(LlmError::Config(EMBEDDER_FAILURE.to_string()))
    }
}

struct FixedGenerator;

#[async_trait]
impl Generator for FixedGenerator {
    fn model(&self) -> &str {
        "fixed"
    }

    async fn generate(&self, _request: ChatRequest) -> Result<String, LlmError> {
        Ok(r#"Here is the answer: {"layman_explanation": "Taking someone else's things without asking.", "example": "Keeping a wallet you saw someone drop."}"#.to_string())
    }
}

struct TestServer {
    addr: SocketAddr,
    embedder: Arc<AxisEmbedder>,
    _dir: tempfile::TempDir,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

async fn spawn_server() -> TestServer {
    let embedder = Arc::new(AxisEmbedder {
        calls: AtomicUsize::new(0),
    });
    let (addr, dir) = serve_with(embedder.clone()).await;
    TestServer {
        addr,
        embedder,
        _dir: dir,
    }
}

async fn serve_with(embedder: Arc<dyn Embedder>) -> (SocketAddr, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let paths = Arc::new(AppPaths::with_root(
        dir.path().to_path_buf(),
        dir.path().join("data"),
    ));

    // Row 1 sits on the theft axis; rows 0 and 2 are unrelated.
    let index = FlatIndex::from_vectors(&[
        vec![0.0, 1.0, 0.0],
        vec![1.0, 0.0, 0.0],
        vec![0.0, 1.0, 0.1],
    ])
    .expect("index");
    let sections = SectionStore::from_texts([
        "299. Culpable homicide.",
        THEFT,
        "415. Cheating.",
    ]);

    let state = AppState::from_parts(
        paths,
        Settings::default(),
        embedder,
        Arc::new(FixedGenerator),
        Arc::new(index),
        sections,
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = router(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (addr, dir)
}

#[tokio::test]
async fn root_and_ping_respond() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    let root: Value = client
        .get(server.url("/"))
        .send()
        .await
        .expect("root")
        .json()
        .await
        .expect("root json");
    assert!(root["message"].as_str().is_some());

    let ping: Value = client
        .get(server.url("/ping"))
        .send()
        .await
        .expect("ping")
        .json()
        .await
        .expect("ping json");
    assert_eq!(ping, json!({ "ok": true }));
}

#[tokio::test]
async fn chat_answers_theft_question() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    let res = client
        .post(server.url("/chat"))
        .json(&json!({ "query": "  What is theft?  " }))
        .send()
        .await
        .expect("chat");
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let body: Value = res.json().await.expect("json");

    assert_eq!(body["query"], "What is theft?");
    let response = &body["response"];
    assert_eq!(response["summary_plain"], "Answer based on retrieved IPC sections.");
    let sections = response["sections"].as_array().expect("sections");
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0]["id"], 1);
    assert_eq!(sections[0]["title"], "Section 1");
    assert_eq!(sections[0]["legal_text"], THEFT);
    assert_eq!(
        sections[0]["layman_explanation"],
        "Taking someone else's things without asking."
    );
    assert_eq!(
        response["final_answer"],
        "📘 Section 1:\nLayman: Taking someone else's things without asking.\nExample: Keeping a wallet you saw someone drop.\n"
    );
}

#[tokio::test]
async fn repeated_query_hits_embedding_cache() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    for _ in 0..3 {
        let res = client
            .post(server.url("/chat"))
            .json(&json!({ "query": "What is theft?" }))
            .send()
            .await
            .expect("chat");
        assert_eq!(res.status(), reqwest::StatusCode::OK);
    }

    assert_eq!(server.embedder.calls.load(Ordering::SeqCst), 1);

    let health: Value = client
        .get(server.url("/health"))
        .send()
        .await
        .expect("health")
        .json()
        .await
        .expect("health json");
    assert_eq!(health["status"], "ok");
    assert_eq!(health["sections"], 3);
    assert_eq!(health["query_cache"]["size"], 1);
    assert_eq!(health["query_cache"]["capacity"], 512);
}

#[tokio::test]
async fn unrelated_query_has_no_sections() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    let body: Value = client
        .post(server.url("/chat"))
        .json(&json!({ "query": "best pizza in town" }))
        .send()
        .await
        .expect("chat")
        .json()
        .await
        .expect("json");

    assert_eq!(body["response"]["summary_plain"], "No relevant sections found");
    assert_eq!(body["response"]["sections"], json!([]));
    assert_eq!(body["response"]["final_answer"], "");
}

#[tokio::test]
async fn missing_or_blank_query_is_rejected() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    let bodies = [json!({}), json!({ "query": "   " }), json!({ "query": 42 })];
    for body in bodies {
        let res = client
            .post(server.url("/chat"))
            .json(&body)
            .send()
            .await
            .expect("chat");
        assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
        let error: Value = res.json().await.expect("json");
        assert_eq!(error, json!({ "error": "Query is required" }));
    }

    let malformed = client
        .post(server.url("/chat"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .expect("chat");
    assert_eq!(malformed.status(), reqwest::StatusCode::BAD_REQUEST);

    assert_eq!(server.embedder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn embedding_failure_returns_opaque_500() {
    let (addr, _dir) = serve_with(Arc::new(BrokenEmbedder)).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("http://{}/chat", addr))
        .json(&json!({ "query": "What is theft?" }))
        .send()
        .await
        .expect("chat");
    assert_eq!(res.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);

    let text = res.text().await.expect("body");
    assert!(!text.contains(EMBEDDER_FAILURE));
    assert!(!text.contains("10.0.0.7"));
    let body: Value = serde_json::from_str(&text).expect("json");
    assert_eq!(body, json!({ "error": "Internal server error" }));
}
