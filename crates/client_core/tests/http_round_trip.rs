use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use client_core::{
    HttpTransport, MemoryClipboard, MemoryStateStore, PredictionController, PredictionTransport,
    RequestError, SubmitOutcome,
};
use serde_json::{json, Value};
use shared::domain::{SchemaSource, FALLBACK_FEATURE_NAMES};
use storage::{Storage, LAST_INPUTS_KEY};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone)]
struct ServiceState {
    feature_names: Arc<Mutex<(StatusCode, String)>>,
    predict_reply: Arc<Mutex<(StatusCode, String)>>,
    received: Arc<Mutex<Vec<Value>>>,
}

impl ServiceState {
    fn new(feature_names: (StatusCode, &str), predict_reply: (StatusCode, &str)) -> Self {
        Self {
            feature_names: Arc::new(Mutex::new((feature_names.0, feature_names.1.to_string()))),
            predict_reply: Arc::new(Mutex::new((predict_reply.0, predict_reply.1.to_string()))),
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

async fn handle_feature_names(State(state): State<ServiceState>) -> impl IntoResponse {
    let (status, body) = state.feature_names.lock().await.clone();
    (status, [("content-type", "application/json")], body)
}

async fn handle_predict(
    State(state): State<ServiceState>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    state.received.lock().await.push(body);
    let (status, body) = state.predict_reply.lock().await.clone();
    (status, body)
}

async fn handle_status() -> Json<Value> {
    Json(json!({
        "project_root": "/srv/sosens",
        "models_dir": "/srv/sosens/models",
        "model_loaded": true,
        "scaler_loaded": true,
        "label_encoder_loaded": true,
        "feature_names_available": false,
        "feature_count": null
    }))
}

async fn spawn_service(state: ServiceState) -> anyhow::Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new()
        .route("/feature-names", get(handle_feature_names))
        .route("/predict", post(handle_predict))
        .route("/status", get(handle_status))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

/// Base url of a port nothing listens on.
async fn unreachable_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{addr}")
}

fn controller_for(base_url: &str, store: Arc<MemoryStateStore>) -> PredictionController {
    PredictionController::new(
        Arc::new(HttpTransport::new(base_url)),
        store,
        Arc::new(MemoryClipboard::new()),
    )
}

const MAIZE_REPLY: &str = r#"{"predicted_label":"Maize","predicted_label_index":2,"confidence":0.92,
    "top3":[{"label":"Maize","prob":0.92},{"label":"Beans","prob":0.05}]}"#;

#[tokio::test]
async fn remote_schema_and_prediction_round_trip() {
    let state = ServiceState::new(
        (StatusCode::OK, r#"{"feature_names":["Ph","K","N"]}"#),
        (StatusCode::OK, MAIZE_REPLY),
    );
    let base_url = spawn_service(state.clone()).await.expect("spawn service");
    let store = Arc::new(MemoryStateStore::new());
    let mut controller = controller_for(&base_url, store.clone());

    assert_eq!(controller.load().await, SchemaSource::Remote);
    let names: Vec<String> = controller
        .form()
        .entries()
        .map(|(name, _)| name.to_string())
        .collect();
    assert_eq!(names, vec!["Ph", "K", "N"]);

    controller.set_field("Ph", "6.5").expect("set");
    controller.set_field("K", "140").expect("set");
    controller.set_field("N", "0.23").expect("set");
    let outcome = controller.submit().await;
    assert!(matches!(outcome, SubmitOutcome::Rendered(_)), "{outcome:?}");

    let received = state.received.lock().await.clone();
    assert_eq!(received, vec![json!({"Ph": 6.5, "K": 140.0, "N": 0.23})]);

    let rendered = controller.view().result.expect("rendered");
    assert_eq!(rendered.label, "Maize");
    assert_eq!(rendered.confidence, "92.0%");
    assert_eq!(rendered.top3, vec!["Maize — 92.0%", "Beans — 5.0%"]);

    let stored: Value =
        serde_json::from_str(&store.raw(LAST_INPUTS_KEY).await.expect("last inputs"))
            .expect("json");
    assert_eq!(stored, received[0]);
}

#[tokio::test]
async fn unreachable_service_falls_back_to_static_schema() {
    let base_url = unreachable_base_url().await;
    let mut controller = controller_for(&base_url, Arc::new(MemoryStateStore::new()));

    assert_eq!(controller.load().await, SchemaSource::Fallback);
    let names: Vec<String> = controller
        .form()
        .entries()
        .map(|(name, _)| name.to_string())
        .collect();
    assert_eq!(names, FALLBACK_FEATURE_NAMES.map(str::to_string).to_vec());
    assert!(controller.status().text.contains("fallback"));
}

#[tokio::test]
async fn malformed_schema_payloads_fall_back() {
    for (status, body) in [
        (StatusCode::INTERNAL_SERVER_ERROR, r#"{"feature_names":["Ph"]}"#),
        (StatusCode::OK, "not json"),
        (StatusCode::OK, r#"{"feature_names":[]}"#),
        (StatusCode::OK, r#"{"feature_names":[1,2]}"#),
        (StatusCode::OK, r#"{"names":["Ph"]}"#),
    ] {
        let state = ServiceState::new((status, body), (StatusCode::OK, MAIZE_REPLY));
        let base_url = spawn_service(state).await.expect("spawn service");
        let mut controller = controller_for(&base_url, Arc::new(MemoryStateStore::new()));
        assert_eq!(
            controller.load().await,
            SchemaSource::Fallback,
            "payload {body} should fall back"
        );
        assert_eq!(controller.form().len(), 14);
    }
}

#[tokio::test]
async fn server_error_body_is_displayed_verbatim() {
    let state = ServiceState::new(
        (StatusCode::OK, r#"{"feature_names":["Ph"]}"#),
        (StatusCode::INTERNAL_SERVER_ERROR, "model unavailable"),
    );
    let base_url = spawn_service(state).await.expect("spawn service");
    let mut controller = controller_for(&base_url, Arc::new(MemoryStateStore::new()));
    controller.load().await;
    controller.set_field("Ph", "6").expect("set");

    let outcome = controller.submit().await;

    assert!(matches!(
        outcome,
        SubmitOutcome::Failed(RequestError::Status { status: 500, .. })
    ));
    assert_eq!(controller.status().text, "model unavailable");
    assert!(controller.view().result.is_none());
    assert_eq!(controller.field("Ph"), Some("6"));
}

#[tokio::test]
async fn empty_error_body_reports_http_status() {
    let state = ServiceState::new(
        (StatusCode::OK, r#"{"feature_names":["Ph"]}"#),
        (StatusCode::SERVICE_UNAVAILABLE, ""),
    );
    let base_url = spawn_service(state).await.expect("spawn service");
    let mut controller = controller_for(&base_url, Arc::new(MemoryStateStore::new()));
    controller.load().await;
    controller.set_field("Ph", "6").expect("set");

    controller.submit().await;
    assert_eq!(controller.status().text, "HTTP 503");
}

#[tokio::test]
async fn malformed_prediction_body_is_a_request_failure() {
    let state = ServiceState::new(
        (StatusCode::OK, r#"{"feature_names":["Ph"]}"#),
        (StatusCode::OK, r#"{"label":"Maize"}"#),
    );
    let base_url = spawn_service(state).await.expect("spawn service");
    let mut controller = controller_for(&base_url, Arc::new(MemoryStateStore::new()));
    controller.load().await;
    controller.set_field("Ph", "6").expect("set");

    let outcome = controller.submit().await;
    assert!(matches!(
        outcome,
        SubmitOutcome::Failed(RequestError::Decode(_))
    ));
    assert!(controller.status().is_error());
}

#[tokio::test]
async fn status_endpoint_is_decoded() {
    let state = ServiceState::new(
        (StatusCode::OK, r#"{"feature_names":["Ph"]}"#),
        (StatusCode::OK, MAIZE_REPLY),
    );
    let base_url = spawn_service(state).await.expect("spawn service");
    let status = HttpTransport::new(base_url)
        .fetch_service_status()
        .await
        .expect("status");
    assert!(status.ready_for_predictions());
    assert!(!status.feature_names_available);
    assert_eq!(status.feature_count, None);
}

#[tokio::test]
async fn sqlite_backed_inputs_prefill_the_next_session() {
    let state = ServiceState::new(
        (StatusCode::OK, r#"{"feature_names":["Ph","K"]}"#),
        (StatusCode::OK, MAIZE_REPLY),
    );
    let base_url = spawn_service(state).await.expect("spawn service");
    let storage = Arc::new(Storage::new("sqlite::memory:").await.expect("db"));

    let mut first = PredictionController::new(
        Arc::new(HttpTransport::new(base_url.clone())),
        storage.clone(),
        Arc::new(MemoryClipboard::new()),
    );
    first.load().await;
    first.set_field("Ph", "5.8").expect("set");
    first.set_field("K", "738.23").expect("set");
    first.submit().await;
    first.save_to_history().await.expect("save");

    let mut second = PredictionController::new(
        Arc::new(HttpTransport::new(base_url)),
        storage.clone(),
        Arc::new(MemoryClipboard::new()),
    );
    second.load().await;
    assert_eq!(second.field("Ph"), Some("5.8"));
    assert_eq!(second.field("K"), Some("738.23"));

    let history = second.history().await.expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].result.predicted_label, "Maize");
}
