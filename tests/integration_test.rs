//! Integration tests for chatmind
//!
//! The completion endpoint is a local mock server; no API key is needed.

use chatmind::config::{LLMConfig, Settings, StorageBackend, StorageConfig};
use chatmind::core::{ChatMessage, CompletionService, LLMClient};
use chatmind::error::CompletionError;
use chatmind::memory::{LocalKeywordExtractor, RemoteKeywordExtractor};
use chatmind::storage::{keys, open_backend, FileSystemStorage, KeyValueStore};
use chatmind::{ChatController, Role, SendOutcome};
use serde_json::json;
use std::sync::Arc;
use tempfile::tempdir;
use tokio::sync::mpsc;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sse_body(deltas: &[&str]) -> String {
    let mut body = String::from(": keep-alive\n\n");
    body.push_str("data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n");
    for delta in deltas {
        let chunk = json!({ "choices": [{ "delta": { "content": delta } }] });
        body.push_str(&format!("data: {}\r\n\r\n", chunk));
    }
    body.push_str("data: [DONE]\n\n");
    // Anything after [DONE] is ignored
    body.push_str("data: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n\n");
    body
}

fn client_for(server: &MockServer) -> LLMClient {
    let config = LLMConfig {
        api_base: format!("{}/v1", server.uri()),
        ..LLMConfig::default()
    };
    LLMClient::new("test-key".to_string(), config).unwrap()
}

async fn mount_stream(server: &MockServer, deltas: &[&str]) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({ "stream": true })))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_body(deltas), "text/event-stream"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_stream_completion_yields_deltas_in_order() {
    let server = MockServer::start().await;
    mount_stream(&server, &["Hel", "lo, ", "wörld"]).await;

    let client = client_for(&server);
    let (tx, mut rx) = mpsc::channel(16);

    client
        .stream_completion(vec![ChatMessage::new("user", "hi")], tx)
        .await
        .unwrap();

    let mut deltas = Vec::new();
    while let Some(delta) = rx.recv().await {
        deltas.push(delta);
    }
    assert_eq!(deltas, vec!["Hel", "lo, ", "wörld"]);
}

#[tokio::test]
async fn test_complete_sends_bearer_and_parses_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_partial_json(json!({ "stream": false, "model": "gpt-4o-mini" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "rust, tokio, async" } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client_for(&server)
        .complete(vec![ChatMessage::new("user", "keywords please")])
        .await
        .unwrap();

    assert_eq!(reply, "rust, tokio, async");
}

#[tokio::test]
async fn test_stream_api_error_is_typed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let (tx, _rx) = mpsc::channel(4);
    let err = client_for(&server)
        .stream_completion(vec![ChatMessage::new("user", "hi")], tx)
        .await
        .unwrap_err();

    match err {
        CompletionError::Api { status, body } => {
            assert_eq!(status, 429);
            assert_eq!(body, "rate limited");
        }
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_complete_retries_then_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(3)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .complete(vec![ChatMessage::new("user", "hi")])
        .await
        .unwrap_err();

    assert!(matches!(err, CompletionError::Api { status: 500, .. }));
}

#[tokio::test]
async fn test_controller_end_to_end_on_filesystem() {
    let server = MockServer::start().await;
    mount_stream(&server, &["Ownership ", "moves values.  "]).await;

    let dir = tempdir().unwrap();
    let settings = Settings::default();
    let completion: Arc<dyn CompletionService> = Arc::new(client_for(&server));
    let storage: Arc<dyn KeyValueStore> =
        Arc::new(FileSystemStorage::new(dir.path().to_path_buf()).await.unwrap());

    let mut controller = ChatController::load(
        completion.clone(),
        Arc::new(LocalKeywordExtractor::default()),
        storage.clone(),
        &settings,
    )
    .await;

    let mut updates = 0;
    let outcome = controller
        .send_message("Explain ownership in Rust", |_| updates += 1)
        .await;

    match outcome {
        SendOutcome::Completed(reply) => assert_eq!(reply.content, "Ownership moves values."),
        other => panic!("unexpected outcome: {:?}", other),
    }
    // user message, two deltas, final
    assert_eq!(updates, 4);

    for key in [keys::CHAT_HISTORY, keys::CONVERSATIONS, keys::CURRENT_CONVERSATION, keys::CONVERSATION_TOPICS] {
        assert!(dir.path().join(format!("{}.json", key)).exists(), "missing {}", key);
    }

    // A fresh process sees the same state
    let restored = ChatController::load(
        completion,
        Arc::new(LocalKeywordExtractor::default()),
        Arc::new(FileSystemStorage::new(dir.path().to_path_buf()).await.unwrap()),
        &settings,
    )
    .await;

    assert_eq!(restored.messages().len(), 2);
    assert_eq!(restored.messages()[1].role, Role::Assistant);
    assert_eq!(restored.conversations().len(), 1);
    assert_eq!(restored.topics().topics()[0].keywords, vec!["ownership", "rust"]);
}

#[tokio::test]
async fn test_controller_failure_keeps_session_usable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let settings = Settings::default();
    let storage = open_backend(&StorageConfig {
        backend: StorageBackend::Memory,
        path: "unused".into(),
    })
    .await
    .unwrap();

    let mut controller = ChatController::new(
        Arc::new(client_for(&server)),
        Arc::new(LocalKeywordExtractor::default()),
        storage,
        &settings,
    );

    let outcome = controller.send_message("Is anyone there?", |_| {}).await;

    let SendOutcome::Failed(text) = outcome else {
        panic!("expected failure");
    };
    assert!(text.contains("503"));
    assert_eq!(controller.messages().len(), 2);
    assert_eq!(controller.messages()[1].role, Role::System);
    assert!(controller.conversations().is_empty());
}

#[tokio::test]
async fn test_remote_extractor_feeds_topics() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({ "stream": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "Tokio, runtime, Note: scheduling" } }]
        })))
        .mount(&server)
        .await;
    mount_stream(&server, &["It uses work stealing."]).await;

    let completion: Arc<dyn CompletionService> = Arc::new(client_for(&server));
    let dir = tempdir().unwrap();
    let storage = open_backend(&StorageConfig {
        backend: StorageBackend::Sqlite,
        path: dir.path().to_path_buf(),
    })
    .await
    .unwrap();

    let mut controller = ChatController::new(
        completion.clone(),
        Arc::new(RemoteKeywordExtractor::new(completion)),
        storage,
        &Settings::default(),
    );

    controller
        .send_message("How does the tokio runtime schedule tasks?", |_| {})
        .await;

    let topics = controller.topics().topics();
    assert_eq!(topics.len(), 1);
    assert_eq!(topics[0].keywords, vec!["tokio", "runtime"]);

    let related = controller.find_related_topics("tokio internals").await;
    assert_eq!(related.len(), 1);
}
