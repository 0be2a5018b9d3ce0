// CLV Ledger - Web Server
// REST API with Axum. One in-memory ledger per server process.

use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{delete, get, post, put},
    Router,
};
use clap::Parser;
use clv_ledger::{
    sync_store, CustomerInput, CustomerRecord, LedgerConfig, LedgerError, RecordStore,
    SqliteSheet, Summary, SyncReport,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use uuid::Uuid;

/// Shared application state
#[derive(Clone)]
struct AppState {
    store: Arc<Mutex<RecordStore>>,
    config: Arc<LedgerConfig>,
}

impl AppState {
    fn new(store: RecordStore, config: LedgerConfig) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            config: Arc::new(config),
        }
    }

    /// Store operations never leave partial state, so a poisoned lock is still consistent
    fn store(&self) -> MutexGuard<'_, RecordStore> {
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            kind: None,
        }
    }
}

fn ok<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::ok(data))).into_response()
}

fn fail(status: StatusCode, kind: &'static str, message: String) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(message),
            kind: Some(kind),
        }),
    )
        .into_response()
}

fn ledger_error(e: &LedgerError) -> Response {
    let status = match e {
        LedgerError::Validation { .. } | LedgerError::DataFormat { .. } | LedgerError::Csv(_) => {
            StatusCode::BAD_REQUEST
        }
        LedgerError::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
        LedgerError::Sync(_) => StatusCode::BAD_GATEWAY,
        LedgerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    log::warn!("request failed ({}): {}", e.kind(), e);
    fail(status, e.kind(), e.to_string())
}

/// Record as shown in tables. `index` is the current position, `handle` stays
/// valid across other edits and deletes.
#[derive(Serialize)]
struct RecordResponse {
    index: usize,
    #[serde(flatten)]
    record: CustomerRecord,
}

#[derive(Serialize)]
struct SummaryResponse {
    has_data: bool,
    summary: Option<Summary>,
}

#[derive(Deserialize)]
struct BulkDeleteRequest {
    ids: Vec<String>,
}

#[derive(Serialize)]
struct CountResponse {
    count: usize,
}

#[derive(Serialize)]
struct EditResponse {
    updated: bool,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/records - Current ledger in display order
async fn list_records(State(state): State<AppState>) -> Response {
    let store = state.store();
    let rows: Vec<RecordResponse> = store
        .records()
        .iter()
        .cloned()
        .enumerate()
        .map(|(index, record)| RecordResponse { index, record })
        .collect();
    ok(rows)
}

/// POST /api/records - Add one customer (blank ID gets a placeholder)
async fn add_record(State(state): State<AppState>, Json(input): Json<CustomerInput>) -> Response {
    let mut store = state.store();
    match store.add(input) {
        Ok(record) => {
            let record = record.clone();
            ok(RecordResponse {
                index: store.len() - 1,
                record,
            })
        }
        Err(e) => ledger_error(&e),
    }
}

/// PUT /api/rows/:index - Replace a row. Out-of-range is reported, not an error.
async fn edit_row(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Json(input): Json<CustomerInput>,
) -> Response {
    match state.store().edit(index, input) {
        Ok(updated) => ok(EditResponse { updated }),
        Err(e) => ledger_error(&e),
    }
}

/// DELETE /api/rows/:index - Remove exactly one row
async fn delete_row(State(state): State<AppState>, Path(index): Path<usize>) -> Response {
    match state.store().delete_at(index) {
        Some(record) => ok(record),
        None => fail(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("no row at index {}", index),
        ),
    }
}

/// DELETE /api/records/:id - Remove every record with this ID
async fn delete_by_id(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    // Path already percent-decoded the segment
    let count = state.store().delete(&[id.as_str()]);
    ok(CountResponse { count })
}

/// DELETE /api/handles/:handle - Remove the one record with this handle
async fn delete_by_handle(State(state): State<AppState>, Path(handle): Path<String>) -> Response {
    let handle = match Uuid::parse_str(&handle) {
        Ok(handle) => handle,
        Err(e) => {
            return fail(
                StatusCode::BAD_REQUEST,
                "validation",
                format!("invalid handle {:?}: {}", handle, e),
            )
        }
    };

    match state.store().delete_by_handle(handle) {
        Some(record) => ok(record),
        None => fail(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("no record with handle {}", handle),
        ),
    }
}

/// POST /api/bulk-delete - Remove every record whose ID is listed
async fn bulk_delete(
    State(state): State<AppState>,
    Json(req): Json<BulkDeleteRequest>,
) -> Response {
    let count = state.store().delete(req.ids.as_slice());
    ok(CountResponse { count })
}

/// POST /api/import - CSV body with ID, Margin, Biaya_Akuisisi
async fn import_csv(State(state): State<AppState>, body: Bytes) -> Response {
    let text = match std::str::from_utf8(&body) {
        Ok(text) => text,
        Err(e) => {
            return fail(
                StatusCode::BAD_REQUEST,
                "csv",
                format!("CSV body is not valid UTF-8: {}", e),
            )
        }
    };

    match state.store().import_bulk(text.as_bytes()) {
        Ok(count) => {
            log::info!("imported {} records over HTTP", count);
            ok(CountResponse { count })
        }
        Err(e) => ledger_error(&e),
    }
}

/// GET /api/export - CSV download
async fn export_csv(State(state): State<AppState>) -> Response {
    let bytes = match state.store().export_csv() {
        Ok(bytes) => bytes,
        Err(e) => return ledger_error(&e),
    };

    let disposition = format!("attachment; filename=\"{}\"", state.config.export_file_name);
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/csv; charset=utf-8")
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from(bytes))
        .unwrap_or_else(|e| {
            fail(
                StatusCode::INTERNAL_SERVER_ERROR,
                "io",
                format!("cannot build response: {}", e),
            )
        })
}

/// GET /api/summary - Dashboard metrics (has_data = false when empty)
async fn get_summary(State(state): State<AppState>) -> Response {
    let summary = state.store().summary();
    ok(SummaryResponse {
        has_data: summary.is_some(),
        summary,
    })
}

/// POST /api/sync - Replace the configured sheet with the current ledger
async fn sync_sheet(State(state): State<AppState>) -> Response {
    // Snapshot first; the sheet write happens without holding the lock
    let snapshot = state.store().clone();
    let config = state.config.clone();

    let result = tokio::task::spawn_blocking(move || -> Result<SyncReport, LedgerError> {
        let mut sheet = SqliteSheet::from_config(&config)?;
        sync_store(&snapshot, &mut sheet)
    })
    .await;

    match result {
        Ok(Ok(report)) => ok(report),
        Ok(Err(e)) => ledger_error(&e),
        Err(e) => fail(
            StatusCode::INTERNAL_SERVER_ERROR,
            "sync",
            format!("sync task failed: {}", e),
        ),
    }
}

/// GET / - Serve dashboard page
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/records", get(list_records).post(add_record))
        .route("/records/:id", delete(delete_by_id))
        .route("/handles/:handle", delete(delete_by_handle))
        .route("/rows/:index", put(edit_row).delete(delete_row))
        .route("/bulk-delete", post(bulk_delete))
        .route("/import", post(import_csv))
        .route("/export", get(export_csv))
        .route("/summary", get(get_summary))
        .route("/sync", post(sync_sheet))
        .with_state(state);

    Router::new()
        .route("/", get(serve_index))
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

/// HTTP dashboard for the CLV ledger
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct ServerArgs {
    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address (overrides config)
    #[arg(short, long)]
    addr: Option<String>,

    /// CSV file to preload (repeatable)
    #[arg(short, long)]
    import: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = ServerArgs::parse();
    let config = LedgerConfig::load(args.config.as_deref())?;

    println!("🌐 CLV Ledger - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut store = RecordStore::new();
    for path in &args.import {
        let count = store.import_csv_path(path)?;
        println!("✓ Loaded {} records from {}", count, path.display());
    }

    if !config.sync_enabled() {
        println!("⚠️  No sheet_url configured: /api/sync will report a connection error");
    }

    let addr = args.addr.clone().unwrap_or_else(|| config.server_addr.clone());
    let app = build_router(AppState::new(store, config));

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!("\n🚀 Server running on http://{}", addr);
    println!("   API: http://{}/api/records", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let mut store = RecordStore::new();
        store.add(CustomerInput::new("C1", 3_000_000, 200_000)).unwrap();
        store.add(CustomerInput::new("C2", 1_500_000, 1_000_000)).unwrap();
        AppState::new(store, LedgerConfig::default())
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_list_records() {
        let app = build_router(test_state());
        let req = Request::get("/api/records").body(Body::empty()).unwrap();

        let (status, json) = send(app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"][0]["id"], "C1");
        assert_eq!(json["data"][0]["segment"], "High Value");
        assert_eq!(json["data"][1]["index"], 1);
    }

    #[tokio::test]
    async fn test_add_then_edit() {
        let state = test_state();

        let req = json_request(
            "POST",
            "/api/records",
            serde_json::json!({"id": "", "margin": 2_000_000, "acquisition_cost": 500_000}),
        );
        let (status, json) = send(build_router(state.clone()), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["id"], "ID_3");
        assert_eq!(json["data"]["segment"], "Mid Value");

        let req = json_request(
            "PUT",
            "/api/rows/7",
            serde_json::json!({"id": "X", "margin": 1, "acquisition_cost": 0}),
        );
        let (_, json) = send(build_router(state.clone()), req).await;
        assert_eq!(json["data"]["updated"], false);
        assert_eq!(state.store().len(), 3);
    }

    #[tokio::test]
    async fn test_import_validation_error() {
        let state = test_state();
        let req = Request::post("/api/import")
            .body(Body::from("ID,Margin\nX,1\n"))
            .unwrap();

        let (status, json) = send(build_router(state.clone()), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["kind"], "validation");
        assert_eq!(state.store().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_by_id_url_encoded() {
        let state = test_state();
        state
            .store()
            .add(CustomerInput::new("ACME Corp", 10, 0))
            .unwrap();
        state
            .store()
            .add(CustomerInput::new("ACME Corp", 20, 0))
            .unwrap();

        let req = Request::delete("/api/records/ACME%20Corp")
            .body(Body::empty())
            .unwrap();
        let (_, json) = send(build_router(state.clone()), req).await;

        assert_eq!(json["data"]["count"], 2);
        assert_eq!(state.store().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_by_id_with_literal_percent() {
        let mut store = RecordStore::new();
        store.add(CustomerInput::new("A%20B", 10, 0)).unwrap();
        store.add(CustomerInput::new("A B", 20, 0)).unwrap();
        let state = AppState::new(store, LedgerConfig::default());

        // Encoding of the id "A%20B"
        let req = Request::delete("/api/records/A%2520B")
            .body(Body::empty())
            .unwrap();
        let (_, json) = send(build_router(state.clone()), req).await;

        assert_eq!(json["data"]["count"], 1);
        let remaining: Vec<String> = state
            .store()
            .records()
            .iter()
            .map(|r| r.id().to_string())
            .collect();
        assert_eq!(remaining, vec!["A B".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_by_handle_after_positions_shift() {
        let state = test_state();
        let c2 = state.store().records()[1].handle();
        state.store().delete_at(0);

        let req = Request::delete(format!("/api/handles/{}", c2))
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(build_router(state.clone()), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["id"], "C2");
        assert!(state.store().is_empty());

        let req = Request::delete(format!("/api/handles/{}", c2))
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(build_router(state.clone()), req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["kind"], "not_found");

        let req = Request::delete("/api/handles/not-a-uuid")
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(build_router(state), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_import_non_utf8_body_uses_envelope() {
        let state = test_state();
        let mut body = b"ID,Margin,Biaya_Akuisisi\nC9,".to_vec();
        body.extend_from_slice(&[0xff, 0xfe]);
        body.extend_from_slice(b",0\n");
        let req = Request::post("/api/import").body(Body::from(body)).unwrap();

        let (status, json) = send(build_router(state.clone()), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert_eq!(json["kind"], "csv");
        assert_eq!(state.store().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_summary_has_no_data() {
        let app = build_router(AppState::new(RecordStore::new(), LedgerConfig::default()));
        let req = Request::get("/api/summary").body(Body::empty()).unwrap();

        let (status, json) = send(app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["has_data"], false);
        assert!(json["data"]["summary"].is_null());
    }

    #[tokio::test]
    async fn test_sync_without_sheet_is_unavailable() {
        let state = test_state();
        let req = Request::post("/api/sync").body(Body::empty()).unwrap();

        let (status, json) = send(build_router(state.clone()), req).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["kind"], "connection");
        assert_eq!(state.store().len(), 2);
    }

    #[tokio::test]
    async fn test_export_csv() {
        let app = build_router(test_state());
        let req = Request::get("/api/export").body(Body::empty()).unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(
            resp.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"clv_data.csv\""
        );
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.starts_with("ID,Margin,Biaya_Akuisisi,CLV,Segment\n"));
        assert_eq!(text.lines().count(), 3);
    }
}
