use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde_json::{Value, json};

use verisolve::client::ollama::OllamaClient;
use verisolve::client::{ModelClient, TokenUsage};
use verisolve::config::Config;
use verisolve::error::SolveError;
use verisolve::prompts::{build_solve_prompt, build_verify_prompt};
use verisolve::parser::CandidateAnswer;
use verisolve::task::TaskType;

/// What the fake server does with `/api/chat`.
#[derive(Clone)]
enum Behavior {
    Reply(Value),
    Status(StatusCode),
    Slow(Duration),
}

#[derive(Clone)]
struct Fake {
    behavior: Behavior,
    seen: Arc<Mutex<Vec<Value>>>,
}

async fn chat(State(fake): State<Fake>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    fake.seen.lock().unwrap().push(body);
    match fake.behavior {
        Behavior::Reply(reply) => (StatusCode::OK, Json(reply)),
        Behavior::Status(status) => (status, Json(json!({ "error": "model not found" }))),
        Behavior::Slow(delay) => {
            tokio::time::sleep(delay).await;
            (StatusCode::OK, Json(json!({ "message": { "content": "late" } })))
        }
    }
}

async fn tags() -> Json<Value> {
    Json(json!({ "models": [] }))
}

/// Start a fake Ollama server and return a client pointed at it.
async fn spawn_fake(behavior: Behavior) -> (OllamaClient, Arc<Mutex<Vec<Value>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/api/chat", post(chat))
        .route("/api/tags", get(tags))
        .with_state(Fake {
            behavior,
            seen: seen.clone(),
        });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = OllamaClient::new(&Config {
        endpoint: format!("http://{addr}"),
        model: "solver".into(),
        verifier_model: "checker".into(),
        seed: 7,
        ..Config::default()
    });
    (client, seen)
}

#[tokio::test]
async fn completion_text_and_usage_are_read() {
    let (client, seen) = spawn_fake(Behavior::Reply(json!({
        "model": "solver",
        "message": { "role": "assistant", "content": "{\"value\": 51, \"rationale\": \"r\"}" },
        "done": true,
        "prompt_eval_count": 120,
        "eval_count": 18
    })))
    .await;

    let prompt = build_solve_prompt(TaskType::Numeric, "What is 17*3?");
    let completion = client
        .complete(&prompt, Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(completion.text, "{\"value\": 51, \"rationale\": \"r\"}");
    assert_eq!(
        completion.usage,
        Some(TokenUsage {
            input_tokens: 120,
            output_tokens: 18,
        })
    );

    let requests = seen.lock().unwrap();
    let body = &requests[0];
    assert_eq!(body["model"], json!("solver"));
    assert_eq!(body["stream"], json!(false));
    assert_eq!(body["options"]["seed"], json!(7));
    assert_eq!(body["messages"][0]["role"], json!("system"));
    assert_eq!(body["messages"][1]["role"], json!("user"));
    assert!(
        body["messages"][1]["content"]
            .as_str()
            .unwrap()
            .contains("What is 17*3?")
    );
}

#[tokio::test]
async fn verify_stage_uses_verifier_model() {
    let (client, seen) = spawn_fake(Behavior::Reply(json!({
        "message": { "role": "assistant", "content": "{\"passed\": true}" }
    })))
    .await;

    let candidate = CandidateAnswer::unparsed("{}");
    let prompt = build_verify_prompt(TaskType::Mcq, "Pick.", &candidate);
    let completion = client
        .complete(&prompt, Duration::from_secs(5))
        .await
        .unwrap();

    assert!(completion.usage.is_none());
    assert_eq!(seen.lock().unwrap()[0]["model"], json!("checker"));
}

#[tokio::test]
async fn error_status_is_unavailable() {
    let (client, _seen) = spawn_fake(Behavior::Status(StatusCode::NOT_FOUND)).await;

    let prompt = build_solve_prompt(TaskType::Mcq, "Pick.");
    let err = client
        .complete(&prompt, Duration::from_secs(5))
        .await
        .unwrap_err();

    match err {
        SolveError::BackendUnavailable(msg) => {
            assert!(msg.contains("404"));
            assert!(msg.contains("model not found"));
        }
        other => panic!("expected BackendUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_content_is_unavailable() {
    let (client, _seen) = spawn_fake(Behavior::Reply(json!({
        "message": { "role": "assistant", "content": "  " }
    })))
    .await;

    let prompt = build_solve_prompt(TaskType::Mcq, "Pick.");
    let err = client
        .complete(&prompt, Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, SolveError::BackendUnavailable(_)));
}

#[tokio::test]
async fn malformed_body_is_unavailable() {
    let (client, _seen) = spawn_fake(Behavior::Reply(json!({ "unexpected": true }))).await;

    let prompt = build_solve_prompt(TaskType::Mcq, "Pick.");
    let err = client
        .complete(&prompt, Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, SolveError::BackendUnavailable(_)));
}

#[tokio::test]
async fn slow_backend_times_out() {
    let (client, _seen) = spawn_fake(Behavior::Slow(Duration::from_secs(5))).await;

    let prompt = build_solve_prompt(TaskType::Mcq, "Pick.");
    let err = client
        .complete(&prompt, Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(matches!(err, SolveError::BackendTimeout(_)));
}

#[tokio::test]
async fn unreachable_backend_is_unavailable() {
    // Bind then drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = OllamaClient::new(&Config {
        endpoint: format!("http://{addr}"),
        ..Config::default()
    });

    let prompt = build_solve_prompt(TaskType::Mcq, "Pick.");
    let err = client
        .complete(&prompt, Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, SolveError::BackendUnavailable(_)));
    assert!(client.health().await.is_err());
}

#[tokio::test]
async fn health_check_probes_tags() {
    let (client, _seen) = spawn_fake(Behavior::Status(StatusCode::OK)).await;
    assert!(client.health().await.is_ok());
}
