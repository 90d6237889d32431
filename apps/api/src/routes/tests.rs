//! Router tests against in-process fakes for every external service.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use bytes::Bytes;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::build_router;
use crate::config::Config;
use crate::errors::AppError;
use crate::extract::TextExtractor;
use crate::llm_client::{LlmError, TextGenerator};
use crate::search::{ResourceSearch, SearchError, SearchQuery, SearchResult};
use crate::session::SessionStore;
use crate::speech::{SpeechError, SpeechSynthesizer};
use crate::state::AppState;

const BOUNDARY: &str = "doom-test-boundary";
const RESUME_TEXT: &str =
    "Jane Roe. Senior Rust engineer at Acme Corp since 2019. Built payment systems in Rust and Go.";

#[derive(Default)]
struct FakeLlm {
    calls: AtomicUsize,
    fail: AtomicBool,
}

#[async_trait]
impl TextGenerator for FakeLlm {
    async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail.load(Ordering::SeqCst) {
            return Err(LlmError::Api {
                status: 503,
                message: "model overloaded".to_string(),
            });
        }
        Ok(format!("reply #{n}"))
    }

    fn model(&self) -> &str {
        "fake-model"
    }
}

#[derive(Default)]
struct FakeSpeech {
    calls: AtomicUsize,
}

#[async_trait]
impl SpeechSynthesizer for FakeSpeech {
    async fn synthesize(&self, text: &str) -> Result<Bytes, SpeechError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Bytes::from(format!("ID3:{text}")))
    }

    fn max_input_chars(&self) -> usize {
        5000
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

struct FakeSearch;

#[async_trait]
impl ResourceSearch for FakeSearch {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, SearchError> {
        Ok(vec![SearchResult {
            title: Some("Result".to_string()),
            url: "https://example.com/course".to_string(),
            snippet: query.query.clone(),
            published_date: None,
        }])
    }
}

/// Treats the uploaded bytes as the document's text.
struct PlainTextExtractor;

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    async fn extract_text(&self, file: Bytes) -> Result<String, AppError> {
        Ok(String::from_utf8_lossy(&file).into_owned())
    }
}

struct Harness {
    app: Router,
    llm: Arc<FakeLlm>,
    speech: Arc<FakeSpeech>,
}

fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "GEMINI_API_KEY" | "ELEVENLABS_API_KEY" | "ELEVENLABS_VOICE_ID" | "EXA_API_KEY" => {
            Some("test".to_string())
        }
        _ => None,
    })
    .unwrap()
}

fn harness() -> Harness {
    let llm = Arc::new(FakeLlm::default());
    let speech = Arc::new(FakeSpeech::default());
    let config = test_config();
    let state = AppState {
        llm: llm.clone(),
        speech: speech.clone(),
        search: Arc::new(FakeSearch),
        extractor: Arc::new(PlainTextExtractor),
        sessions: SessionStore::new(config.max_sessions),
        config,
    };
    Harness {
        app: build_router(state),
        llm,
        speech,
    }
}

fn upload(uri: &str, text: &str) -> Request<Body> {
    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"resume\"; filename=\"resume.pdf\"\r\n\
         Content-Type: application/pdf\r\n\r\n\
         {text}\r\n\
         --{BOUNDARY}--\r\n"
    );
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Option<String>, Bytes) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let content_type = res
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, content_type, body)
}

async fn send_json(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let (status, _, body) = send(app, req).await;
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn create_session(h: &Harness) -> String {
    let (status, body) = send_json(&h.app, upload("/api/sessions", RESUME_TEXT)).await;
    assert_eq!(status, StatusCode::CREATED);
    body["sessionId"].as_str().unwrap().to_string()
}

async fn unlock(h: &Harness, id: &str) {
    for i in 0..3 {
        let (status, _) = send_json(
            &h.app,
            post_json(
                &format!("/api/sessions/{id}/chat"),
                json!({ "message": format!("question {i}") }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Stateless API
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health_reports_service() {
    let h = harness();
    let (status, body) = send_json(&h.app, request("GET", "/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "doom-api");
}

#[tokio::test]
async fn test_analyze_rejects_49_characters() {
    let h = harness();
    let text = "a".repeat(49);
    let (status, body) = send_json(&h.app, upload("/api/analyze", &text)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("empty or too short"));
    assert_eq!(h.llm.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_analyze_accepts_51_characters() {
    let h = harness();
    let text = "Rust developer with five years shipping web servers";
    assert_eq!(text.chars().count(), 51);
    let (status, body) = send_json(&h.app, upload("/api/analyze", text)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["analysis"], "reply #1");
    assert_eq!(body["resumeText"], text);
}

#[tokio::test]
async fn test_analyze_without_file_field_is_bad_request() {
    let h = harness();
    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nx\r\n--{BOUNDARY}--\r\n"
    );
    let req = Request::builder()
        .method("POST")
        .uri("/api/analyze")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    let (status, json) = send_json(&h.app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "No file uploaded");
}

#[tokio::test]
async fn test_get_on_post_route_is_405_with_json_error() {
    let h = harness();
    let (status, body) = send_json(&h.app, request("GET", "/api/chat")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"], "Method not allowed");
}

#[tokio::test]
async fn test_stateless_chat_returns_response() {
    let h = harness();
    let (status, body) = send_json(
        &h.app,
        post_json(
            "/api/chat",
            json!({
                "resumeText": RESUME_TEXT,
                "prompt": "Will AI replace me?",
                "history": [{"role": "user", "content": "hi"}],
                "confessions": ["I inflated my title"]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "response": "reply #1" }));
}

#[tokio::test]
async fn test_stateless_chat_upstream_failure_is_500() {
    let h = harness();
    h.llm.fail.store(true, Ordering::SeqCst);
    let (status, body) = send_json(
        &h.app,
        post_json("/api/chat", json!({ "resumeText": RESUME_TEXT, "prompt": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "model overloaded");
}

#[tokio::test]
async fn test_summary_accepts_gender_token() {
    let h = harness();
    let (status, body) = send_json(
        &h.app,
        post_json(
            "/api/summary",
            json!({ "resumeText": RESUME_TEXT, "gender": "female", "language": "french" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"], "reply #1");
}

#[tokio::test]
async fn test_resources_require_skills() {
    let h = harness();
    let (status, body) =
        send_json(&h.app, post_json("/api/resources", json!({ "skills": [] }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No skills provided");

    let (status, body) = send_json(
        &h.app,
        post_json("/api/resources", json!({ "skills": ["Rust", "Kubernetes"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resources"][0]["url"], "https://example.com/course");
}

#[tokio::test]
async fn test_resources_cap_selected_skills() {
    let h = harness();
    let (status, body) = send_json(
        &h.app,
        post_json(
            "/api/resources",
            json!({ "skills": ["rust", "go", "sql", "docker", "aws", "linux"] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Maximum 5 skills can be selected");
}

#[tokio::test]
async fn test_trends_require_industry() {
    let h = harness();
    let (status, body) = send_json(&h.app, post_json("/api/trends", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No industry provided");
}

#[tokio::test]
async fn test_speak_returns_mpeg_audio() {
    let h = harness();
    let (status, content_type, body) = send(
        &h.app,
        post_json("/api/speak", json!({ "text": "Greetings, mortal." })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("audio/mpeg"));
    assert_eq!(&body[..], b"ID3:Greetings, mortal.");
}

#[tokio::test]
async fn test_speak_rejects_blank_text() {
    let h = harness();
    let (status, body) = send_json(&h.app, post_json("/api/speak", json!({ "text": " " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No text provided");
    assert_eq!(h.speech.calls.load(Ordering::SeqCst), 0);
}

// ────────────────────────────────────────────────────────────────────────────
// Session API
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_unknown_session_is_404() {
    let h = harness();
    let (status, _) = send_json(&h.app, request("GET", "/api/sessions/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_three_chats_unlock_and_fourth_changes_nothing() {
    let h = harness();
    let id = create_session(&h).await;
    let chat_uri = format!("/api/sessions/{id}/chat");

    let mut last = Value::Null;
    for i in 0..3 {
        let (_, body) = send_json(
            &h.app,
            post_json(&chat_uri, json!({ "message": format!("q{i}") })),
        )
        .await;
        last = body;
    }
    assert_eq!(last["unlock"]["unlocked"], true);
    assert_eq!(last["unlock"]["remaining"], 0);

    let (_, fourth) = send_json(&h.app, post_json(&chat_uri, json!({ "message": "q3" }))).await;
    assert_eq!(fourth["unlock"], last["unlock"]);

    let (_, snapshot) = send_json(&h.app, request("GET", &format!("/api/sessions/{id}"))).await;
    assert_eq!(snapshot["history"].as_array().unwrap().len(), 8);
    assert_eq!(snapshot["history"][0]["role"], "user");
    assert_eq!(snapshot["history"][1]["role"], "assistant");
}

#[tokio::test]
async fn test_failed_chat_leaves_session_untouched() {
    let h = harness();
    let id = create_session(&h).await;
    h.llm.fail.store(true, Ordering::SeqCst);

    let (status, _) = send_json(
        &h.app,
        post_json(&format!("/api/sessions/{id}/chat"), json!({ "message": "hello?" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (_, snapshot) = send_json(&h.app, request("GET", &format!("/api/sessions/{id}"))).await;
    assert!(snapshot["history"].as_array().unwrap().is_empty());
    assert_eq!(snapshot["unlock"]["progress"], 0);
}

#[tokio::test]
async fn test_gate_stays_unlocked_when_later_chat_fails() {
    let h = harness();
    let id = create_session(&h).await;
    unlock(&h, &id).await;
    h.llm.fail.store(true, Ordering::SeqCst);

    let (status, _) = send_json(
        &h.app,
        post_json(&format!("/api/sessions/{id}/chat"), json!({ "message": "q3" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (_, snapshot) = send_json(&h.app, request("GET", &format!("/api/sessions/{id}"))).await;
    assert_eq!(snapshot["unlock"]["unlocked"], true);
    assert_eq!(snapshot["history"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn test_overlong_chat_message_is_rejected() {
    let h = harness();
    let id = create_session(&h).await;
    let calls_before = h.llm.calls.load(Ordering::SeqCst);

    let (status, body) = send_json(
        &h.app,
        post_json(
            &format!("/api/sessions/{id}/chat"),
            json!({ "message": "x".repeat(4001) }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("too long"));
    assert_eq!(h.llm.calls.load(Ordering::SeqCst), calls_before);
}

#[tokio::test]
async fn test_overlong_confession_is_rejected() {
    let h = harness();
    let id = create_session(&h).await;
    let uri = format!("/api/sessions/{id}/confessions");

    let (status, _) = send_json(&h.app, post_json(&uri, json!({ "text": "y".repeat(501) }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, snapshot) = send_json(&h.app, request("GET", &format!("/api/sessions/{id}"))).await;
    assert!(snapshot["confessions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_skills_fall_back_to_general_skills() {
    let h = harness();
    let id = create_session(&h).await;

    let (status, body) =
        send_json(&h.app, request("GET", &format!("/api/sessions/{id}/skills"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["skills"],
        json!(["communication", "leadership", "problem solving", "time management"])
    );
    assert_eq!(body["maxSelected"], 5);
}

#[tokio::test]
async fn test_skills_are_detected_from_resume() {
    let h = harness();
    let (_, created) = send_json(
        &h.app,
        upload(
            "/api/sessions",
            "Backend developer. Python, Docker and Kubernetes on AWS. Some TypeScript and SQL.",
        ),
    )
    .await;
    let id = created["sessionId"].as_str().unwrap();

    let (status, body) =
        send_json(&h.app, request("GET", &format!("/api/sessions/{id}/skills"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["skills"],
        json!(["python", "sql", "aws", "docker", "kubernetes", "typescript"])
    );
}

#[tokio::test]
async fn test_locked_summary_reports_remaining() {
    let h = harness();
    let id = create_session(&h).await;
    send_json(
        &h.app,
        post_json(&format!("/api/sessions/{id}/chat"), json!({ "message": "one" })),
    )
    .await;

    let (status, body) =
        send_json(&h.app, request("POST", &format!("/api/sessions/{id}/summary"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["remaining"], 2);
    assert_eq!(
        body["error"],
        "Send 2 more messages to unlock the Summary Room!"
    );
}

#[tokio::test]
async fn test_cached_section_skips_generation() {
    let h = harness();
    let id = create_session(&h).await;
    let uri = format!("/api/sessions/{id}/sections/roast");
    let calls_before = h.llm.calls.load(Ordering::SeqCst);

    let (status, first) = send_json(&h.app, request("POST", &uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["cached"], false);

    let (_, second) = send_json(&h.app, request("POST", &uri)).await;
    assert_eq!(second["cached"], true);
    assert_eq!(second["response"], first["response"]);
    assert_eq!(h.llm.calls.load(Ordering::SeqCst), calls_before + 1);

    // Section clicks never count toward the unlock.
    let (_, snapshot) = send_json(&h.app, request("GET", &format!("/api/sessions/{id}"))).await;
    assert_eq!(snapshot["unlock"]["progress"], 0);
    assert_eq!(snapshot["sections"], json!(["roast"]));
}

#[tokio::test]
async fn test_unknown_section_is_404() {
    let h = harness();
    let id = create_session(&h).await;
    let (status, _) = send_json(
        &h.app,
        request("POST", &format!("/api/sessions/{id}/sections/horoscope")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_absolution_requires_a_confession() {
    let h = harness();
    let id = create_session(&h).await;
    let uri = format!("/api/sessions/{id}/absolution");

    let (status, body) = send_json(&h.app, request("POST", &uri)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "You must confess something first!");

    let (status, created) = send_json(
        &h.app,
        post_json(
            &format!("/api/sessions/{id}/confessions"),
            json!({ "text": "My 'startup' was a lemonade stand" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let confession_id = created["confession"]["id"].as_str().unwrap().to_string();

    let (status, _) = send_json(&h.app, request("POST", &uri)).await;
    assert_eq!(status, StatusCode::OK);

    let delete_uri = format!("/api/sessions/{id}/confessions/{confession_id}");
    let (status, _) = send_json(&h.app, request("DELETE", &delete_uri)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send_json(&h.app, request("DELETE", &delete_uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_regenerate_discards_cached_audio() {
    let h = harness();
    let id = create_session(&h).await;
    unlock(&h, &id).await;
    let base = format!("/api/sessions/{id}/summary");

    let (status, _) = send_json(&h.app, request("POST", &base)).await;
    assert_eq!(status, StatusCode::OK);
    send_json(&h.app, post_json(&format!("{base}/gender"), json!({ "gender": "female" }))).await;
    let (_, state) = send_json(
        &h.app,
        post_json(&format!("{base}/language"), json!({ "language": "french" })),
    )
    .await;
    assert_eq!(state["state"]["step"], "readyToGenerate");

    let (status, generated) = send_json(&h.app, request("POST", &format!("{base}/generate"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(generated["state"]["step"], "result");

    let (status, content_type, _) = send(&h.app, request("POST", &format!("{base}/audio"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("audio/mpeg"));
    let (status, _, _) = send(&h.app, request("GET", &format!("{base}/audio"))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, regenerated) =
        send_json(&h.app, request("POST", &format!("{base}/generate"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(regenerated["state"]["hasAudio"], false);

    let (status, body) = send_json(&h.app, request("GET", &format!("{base}/audio"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Please play the audio first!");
}

#[tokio::test]
async fn test_failed_generation_returns_to_ready_with_error() {
    let h = harness();
    let id = create_session(&h).await;
    unlock(&h, &id).await;
    let base = format!("/api/sessions/{id}/summary");
    send_json(&h.app, request("POST", &base)).await;
    send_json(&h.app, post_json(&format!("{base}/gender"), json!({ "gender": "male" }))).await;
    send_json(&h.app, post_json(&format!("{base}/language"), json!({ "language": "hindi" }))).await;

    h.llm.fail.store(true, Ordering::SeqCst);
    let (status, _) = send_json(&h.app, request("POST", &format!("{base}/generate"))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (_, snapshot) = send_json(&h.app, request("GET", &format!("/api/sessions/{id}"))).await;
    assert_eq!(snapshot["summary"]["step"], "readyToGenerate");
    assert_eq!(snapshot["summary"]["lastError"], "model overloaded");

    h.llm.fail.store(false, Ordering::SeqCst);
    let (status, _) = send_json(&h.app, request("POST", &format!("{base}/generate"))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_new_resume_resets_session_state() {
    let h = harness();
    let id = create_session(&h).await;
    unlock(&h, &id).await;
    send_json(&h.app, request("POST", &format!("/api/sessions/{id}/sections/jobs"))).await;

    // A failed upload keeps the old state.
    let (status, _) = send_json(
        &h.app,
        upload(&format!("/api/sessions/{id}/resume"), "too short"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, snapshot) = send_json(&h.app, request("GET", &format!("/api/sessions/{id}"))).await;
    assert_eq!(snapshot["unlock"]["unlocked"], true);

    let new_text = "John Doe. Staff engineer, distributed databases, 12 years across three companies.";
    let (status, body) = send_json(&h.app, upload(&format!("/api/sessions/{id}/resume"), new_text)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resumeText"], new_text);

    let (_, snapshot) = send_json(&h.app, request("GET", &format!("/api/sessions/{id}"))).await;
    assert_eq!(snapshot["unlock"]["unlocked"], false);
    assert!(snapshot["history"].as_array().unwrap().is_empty());
    assert!(snapshot["sections"].as_array().unwrap().is_empty());
    assert!(snapshot["summary"].is_null());
}

#[tokio::test]
async fn test_delete_session() {
    let h = harness();
    let id = create_session(&h).await;
    let uri = format!("/api/sessions/{id}");
    let (status, _) = send_json(&h.app, request("DELETE", &uri)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send_json(&h.app, request("GET", &uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
