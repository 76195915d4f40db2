mod common;

use common::{FakeLlm, FakeSearch};
use coursemate::ingest::SourceDocument;
use coursemate::server::{AccessPolicy, HttpServer};
use coursemate::session::AssistantSettings;
use coursemate::StudyAssistant;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const QUIZ_REPLY: &str =
    "QUESTION: What is 2+2?\nA) 3\nB) 4\nC) 5\nD) 6\nCORRECT: B\nEXPLANATION: Basic arithmetic.";

fn server(access: AccessPolicy) -> HttpServer {
    let assistant = StudyAssistant::new(
        FakeLlm::replying(QUIZ_REPLY),
        FakeSearch::returning(&[]),
        AssistantSettings {
            cooldown: Duration::ZERO,
            ..AssistantSettings::default()
        },
    );
    HttpServer::new(Arc::new(assistant), access)
}

/// Serve the router on an ephemeral port and return its base URL
async fn spawn(server: &HttpServer) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = server.router();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn load_material(server: &HttpServer) {
    let session = server.session();
    let mut session = session.lock().await;
    let assistant = StudyAssistant::new(
        FakeLlm::replying("unused"),
        FakeSearch::returning(&[]),
        AssistantSettings::default(),
    );
    assistant
        .load_documents(
            &mut session,
            vec![SourceDocument::new("Lecture1", "Photosynthesis converts light energy.")],
            None,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_health_needs_no_auth() {
    let server = server(AccessPolicy {
        api_key: Some("secret".to_string()),
        allowed_origins: Vec::new(),
    });
    let base = spawn(&server).await;

    let response = reqwest::get(format!("{}/health", base)).await.unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "coursemate");
}

#[tokio::test]
async fn test_api_requires_bearer_key() {
    let server = server(AccessPolicy {
        api_key: Some("secret".to_string()),
        allowed_origins: Vec::new(),
    });
    let base = spawn(&server).await;
    let client = reqwest::Client::new();

    let denied = client.get(format!("{}/api/status", base)).send().await.unwrap();
    assert_eq!(denied.status(), 401);
    let body: Value = denied.json().await.unwrap();
    assert_eq!(body["error"], "Missing Authorization header");

    let allowed = client
        .get(format!("{}/api/status", base))
        .bearer_auth("secret")
        .send()
        .await
        .unwrap();
    assert_eq!(allowed.status(), 200);
    let body: Value = allowed.json().await.unwrap();
    assert_eq!(body["material"]["loaded"], false);
}

#[tokio::test]
async fn test_chat_before_material_is_rejected() {
    let server = server(AccessPolicy::default());
    let base = spawn(&server).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/chat", base))
        .json(&json!({"mode": "rag", "message": "What is ATP?"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "📁 Please upload course material first.");
}

#[tokio::test]
async fn test_quiz_round_trip() {
    let server = server(AccessPolicy::default());
    load_material(&server).await;
    let base = spawn(&server).await;
    let client = reqwest::Client::new();

    let early = client
        .post(format!("{}/api/quiz/answer", base))
        .json(&json!({"choice": "B"}))
        .send()
        .await
        .unwrap();
    assert_eq!(early.status(), 409);

    let next: Value = client
        .post(format!("{}/api/quiz/next", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(next["item"]["question"], "What is 2+2?");
    assert_eq!(next["origin"]["origin"], "parsed");

    let invalid = client
        .post(format!("{}/api/quiz/answer", base))
        .json(&json!({"choice": "E"}))
        .send()
        .await
        .unwrap();
    assert_eq!(invalid.status(), 422);

    let answer: Value = client
        .post(format!("{}/api/quiz/answer", base))
        .json(&json!({"choice": "b"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(answer["correct"], true);
    assert_eq!(answer["feedback"], "🎉 **Correct!** Basic arithmetic.");
}

#[tokio::test]
async fn test_reset_clears_conversation() {
    let server = server(AccessPolicy::default());
    load_material(&server).await;
    let base = spawn(&server).await;
    let client = reqwest::Client::new();

    let reply: Value = client
        .post(format!("{}/api/chat", base))
        .json(&json!({"mode": "rag", "message": "What is light?"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(reply["kind"], "text");

    let status: Value = client.get(format!("{}/api/status", base)).send().await.unwrap().json().await.unwrap();
    assert_eq!(status["conversation_length"], 2);

    client.post(format!("{}/api/session/reset", base)).send().await.unwrap();
    let status: Value = client.get(format!("{}/api/status", base)).send().await.unwrap().json().await.unwrap();
    assert_eq!(status["conversation_length"], 0);
    assert_eq!(status["material"]["loaded"], true);
}
