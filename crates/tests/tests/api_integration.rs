use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use gateway_api::{build_app_with_upstream, ApiConfig};
use gateway_upstream::{ScriptedGenerator, Upstream};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app(generator: &ScriptedGenerator) -> Router {
    build_app_with_upstream(&ApiConfig::default(), Upstream::scripted(generator.clone()))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn health_reports_metrics() {
    let app = app(&ScriptedGenerator::new());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let parsed = read_json(response).await;
    assert_eq!(parsed["status"], "ok");
    assert_eq!(parsed["metrics"]["requests_total"], 0);
}

#[tokio::test]
async fn plain_chat_returns_upstream_text() {
    let generator = ScriptedGenerator::new().with_reply("Hello! How can I help?");
    let app = app(&generator);

    let response = app
        .oneshot(post_json("/", json!({ "input": "hello", "apikey": "k" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|value| value.to_str().ok()),
        Some("*")
    );
    let parsed = read_json(response).await;
    assert_eq!(
        parsed,
        json!({ "success": true, "response": "Hello! How can I help?" })
    );
    assert_eq!(generator.call_count(), 1);
}

#[tokio::test]
async fn chat_path_accepts_message_list() {
    let generator = ScriptedGenerator::new().with_reply("Paris.");
    let app = app(&generator);

    let response = app
        .oneshot(post_json(
            "/chat",
            json!({
                "messageList": [
                    { "role": "user", "content": "Capital of France?" },
                    { "role": "assistant", "content": "Do you mean today?" },
                    { "role": "user", "content": "Yes" }
                ],
                "apikey": "k",
                "temperature": 0
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let call = &generator.calls()[0];
    assert_eq!(call.config.temperature, 0.0);
    let gateway_core::Contents::Turns(turns) = &call.contents else {
        panic!("expected message turns");
    };
    assert_eq!(turns[1].role, "model");
}

#[tokio::test]
async fn intent_mode_fills_every_configured_slot() {
    let generator = ScriptedGenerator::new().with_reply(
        r#"{"intentions":[{"intention_name":"refund","condition":true,"content":"wants refund"}]}"#,
    );
    let app = app(&generator);

    let response = app
        .oneshot(post_json(
            "/",
            json!({
                "input": "I want my money back",
                "apikey": "k",
                "intention_setting": { "intention_1": "billing", "intention_2": "refund" }
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let parsed = read_json(response).await;
    assert_eq!(parsed["success"], true);
    assert_eq!(
        parsed["intention_1_result"],
        json!({
            "intention_name": "billing",
            "condition": false,
            "content": "not found for intention billing"
        })
    );
    assert_eq!(
        parsed["intention_2_result"],
        json!({
            "intention_name": "refund",
            "condition": true,
            "content": "wants refund"
        })
    );
    assert_eq!(
        parsed["intention_else_result"],
        json!({
            "intention_name": "else",
            "condition": false,
            "content": "not found for intention else"
        })
    );
    let object = parsed.as_object().unwrap();
    for absent in ["intention_3_result", "intention_4_result", "intention_5_result", "error"] {
        assert!(!object.contains_key(absent), "{absent} should be absent");
    }
}

#[tokio::test]
async fn out_of_range_temperature_is_rejected_before_upstream() {
    let generator = ScriptedGenerator::new().with_reply("unused");
    let app = app(&generator);

    let response = app
        .oneshot(post_json(
            "/",
            json!({ "input": "hello", "apikey": "k", "temperature": 5 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let parsed = read_json(response).await;
    assert_eq!(
        parsed,
        json!({ "success": false, "error": "Temperature must be between 0 and 2" })
    );
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn missing_api_key_is_rejected() {
    let generator = ScriptedGenerator::new();
    let app = app(&generator);

    let response = app
        .oneshot(post_json("/", json!({ "input": "hello" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let parsed = read_json(response).await;
    assert_eq!(parsed["error"], "Missing required parameter: apikey");
}

#[tokio::test]
async fn malformed_upstream_json_is_reported() {
    let generator = ScriptedGenerator::new().with_reply("{\"intentions\": [");
    let app = app(&generator);

    let response = app
        .oneshot(post_json(
            "/",
            json!({
                "input": "hello",
                "apikey": "k",
                "intention_setting": { "intention_1": "greeting" }
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let parsed = read_json(response).await;
    assert_eq!(parsed["success"], false);
    assert_eq!(parsed["error"], "Failed to parse JSON response");
    assert!(parsed["details"].as_str().is_some());
    assert!(parsed.get("intention_1_result").is_none());
}

#[tokio::test]
async fn upstream_failure_is_internal_error() {
    let generator = ScriptedGenerator::new().with_failure("Gemini non-success status 403: quota");
    let app = app(&generator);

    let response = app
        .oneshot(post_json("/", json!({ "input": "hello", "apikey": "k" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let parsed = read_json(response).await;
    assert_eq!(parsed["error"], "Internal server error");
    assert_eq!(parsed["details"], "Gemini non-success status 403: quota");
}

#[tokio::test]
async fn unparseable_body_is_rejected() {
    let app = app(&ScriptedGenerator::new());

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let parsed = read_json(response).await;
    assert_eq!(parsed["success"], false);
    assert_eq!(parsed["error"], "Failed to parse request");
    assert!(parsed["details"].as_str().is_some());
}

#[tokio::test]
async fn options_preflight_is_empty_ok() {
    let app = app(&ScriptedGenerator::new());

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/chat")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-methods")
            .and_then(|value| value.to_str().ok()),
        Some("GET, POST, OPTIONS")
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(body.is_empty());
}

#[tokio::test]
async fn other_methods_are_not_allowed() {
    let app = app(&ScriptedGenerator::new());

    let request = Request::builder()
        .method("GET")
        .uri("/")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let parsed = read_json(response).await;
    assert_eq!(parsed, json!({ "error": "Only POST method is allowed" }));
}

#[tokio::test]
async fn unknown_paths_are_not_found() {
    let app = app(&ScriptedGenerator::new());

    let response = app
        .oneshot(post_json("/v1/other", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response
        .headers()
        .contains_key("access-control-allow-origin"));
    let parsed = read_json(response).await;
    assert_eq!(parsed, json!({ "error": "Not Found" }));
}
