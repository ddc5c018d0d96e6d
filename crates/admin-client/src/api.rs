//! Admin API resources
//!
//! Thin wrappers over `AuthClient::send` for the categories, criteria,
//! questions, candidates and validity-window endpoints. Payloads are
//! passed through as `serde_json::Value`; the only interpretation done
//! here is the validity-window date handling and category name
//! normalization the admin screens need.

use std::path::Path;

use chrono::{DateTime, NaiveDate};
use serde_json::{Value, json};

use crate::client::AuthClient;
use crate::error::{Error, Result};
use crate::request::{ApiRequest, FilePart, MultipartBody};

const PDF_MIME: &str = "application/pdf";
const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const XLS_MIME: &str = "application/vnd.ms-excel";
const CSV_MIME: &str = "text/csv";

/// Admin resource operations on top of an `AuthClient`.
#[derive(Clone)]
pub struct AdminApi {
    client: AuthClient,
}

impl AdminApi {
    pub fn new(client: AuthClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &AuthClient {
        &self.client
    }

    // --- categories ---

    pub async fn categories(&self) -> Result<Value> {
        self.call(ApiRequest::get("/categories/")).await
    }

    pub async fn create_category(&self, name: &str) -> Result<Value> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("category name is required".into()));
        }
        self.call(ApiRequest::post("/categories/").json(json!({ "name": name })))
            .await
    }

    pub async fn update_category(&self, id: &str, data: Value) -> Result<Value> {
        self.call(ApiRequest::put(format!("/categories/{}", segment(id)?)).json(data))
            .await
    }

    pub async fn delete_category(&self, id: &str) -> Result<Value> {
        self.call(ApiRequest::delete(format!("/categories/{}", segment(id)?)))
            .await
    }

    // --- criteria ---

    pub async fn criteria(&self) -> Result<Value> {
        self.call(ApiRequest::get("/criteria/")).await
    }

    pub async fn create_criteria(&self, data: Value) -> Result<Value> {
        self.call(ApiRequest::post("/criteria/").json(data)).await
    }

    pub async fn update_criteria(&self, id: &str, data: Value) -> Result<Value> {
        self.call(ApiRequest::put(format!("/criteria/{}", segment(id)?)).json(data))
            .await
    }

    pub async fn delete_criteria(&self, id: &str) -> Result<Value> {
        self.call(ApiRequest::delete(format!("/criteria/{}", segment(id)?)))
            .await
    }

    // --- questions ---

    pub async fn questions(&self, category_id: &str) -> Result<Value> {
        self.call(ApiRequest::get(format!("/questions/{}", segment(category_id)?)))
            .await
    }

    /// Bulk-import questions from a PDF into a category.
    pub async fn upload_questions(&self, category_id: &str, pdf: &Path) -> Result<Value> {
        let category_id = segment(category_id)?;
        let body = MultipartBody::new()
            .text("category_id", category_id)
            .file(FilePart::from_path("file", pdf, PDF_MIME).await?);
        self.call(ApiRequest::post("/questions/upload").multipart(body))
            .await
    }

    pub async fn update_question(&self, id: &str, data: Value) -> Result<Value> {
        self.call(ApiRequest::put(format!("/questions/{}", segment(id)?)).json(data))
            .await
    }

    pub async fn delete_question(&self, id: &str) -> Result<Value> {
        self.call(ApiRequest::delete(format!("/questions/{}", segment(id)?)))
            .await
    }

    // --- candidates ---

    pub async fn candidates(&self) -> Result<Value> {
        self.call(ApiRequest::get("/users/get-all-candidates")).await
    }

    pub async fn candidate(&self, id: &str) -> Result<Value> {
        self.call(ApiRequest::get(format!("/users/candidate/{}", segment(id)?)))
            .await
    }

    /// Bulk-import candidates from a spreadsheet.
    pub async fn upload_candidates(&self, sheet: &Path) -> Result<Value> {
        let body = MultipartBody::new().file(FilePart::from_path("file", sheet, sheet_mime(sheet)).await?);
        self.call(ApiRequest::post("/users/upload").multipart(body))
            .await
    }

    pub async fn update_candidate(&self, id: &str, data: Value) -> Result<Value> {
        self.call(ApiRequest::put(format!("/users/candidate/{}", segment(id)?)).json(data))
            .await
    }

    pub async fn delete_candidate(&self, id: &str) -> Result<Value> {
        self.call(ApiRequest::delete(format!("/users/candidate/{}", segment(id)?)))
            .await
    }

    // --- validity window ---

    /// Current validity window, or `None` when none has been configured.
    pub async fn validity(&self) -> Result<Option<CurrentValidity>> {
        match self.call(ApiRequest::get("/users/validity")).await {
            Ok(body) => Ok(CurrentValidity::from_response(&body)),
            Err(Error::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn create_validity(&self, window: &ValidityWindow) -> Result<Value> {
        self.call(ApiRequest::post("/users/validity").json(window.to_json()))
            .await
    }

    pub async fn update_validity(&self, id: &str, window: &ValidityWindow) -> Result<Value> {
        self.call(ApiRequest::put(format!("/users/validity/{}", segment(id)?)).json(window.to_json()))
            .await
    }

    /// Send and turn any non-2xx final status into `Error::Status`.
    async fn call(&self, request: ApiRequest) -> Result<Value> {
        let response = self.client.send(&request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                message: admin_auth::token::error_message(response).await,
            });
        }

        let body = response.text().await.map_err(Error::Transport)?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| Error::Decode(e.to_string()))
    }
}

/// Validate an id used as a single path segment.
fn segment(id: &str) -> Result<&str> {
    let id = id.trim();
    if id.is_empty() || id.contains(['/', '?', '#']) {
        return Err(Error::InvalidInput(format!("invalid resource id: {id:?}")));
    }
    Ok(id)
}

fn sheet_mime(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("xls") => XLS_MIME,
        Some("csv") => CSV_MIME,
        _ => XLSX_MIME,
    }
}

/// Display name of a category.
///
/// Older records store the name nested as `{"name": {"name": "..."}}`.
pub fn category_name(category: &Value) -> String {
    match category.get("name") {
        Some(Value::String(name)) => name.clone(),
        Some(nested @ Value::Object(_)) => match nested.get("name") {
            Some(Value::String(name)) => name.clone(),
            _ => nested.to_string(),
        },
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Interview validity window, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityWindow {
    pub valid_from: NaiveDate,
    pub valid_to: NaiveDate,
}

impl ValidityWindow {
    /// Parse a window from two `YYYY-MM-DD` dates. Both are required.
    pub fn parse(valid_from: &str, valid_to: &str) -> Result<Self> {
        if valid_from.trim().is_empty() || valid_to.trim().is_empty() {
            return Err(Error::InvalidInput("both dates are required".into()));
        }
        Ok(Self {
            valid_from: parse_date(valid_from)
                .ok_or_else(|| Error::InvalidInput(format!("invalid valid_from: {valid_from}")))?,
            valid_to: parse_date(valid_to)
                .ok_or_else(|| Error::InvalidInput(format!("invalid valid_to: {valid_to}")))?,
        })
    }

    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.valid_from <= date && date <= self.valid_to
    }

    pub fn to_json(&self) -> Value {
        json!({
            "valid_from": self.valid_from.format("%Y-%m-%d").to_string(),
            "valid_to": self.valid_to.format("%Y-%m-%d").to_string(),
        })
    }
}

/// The window the server currently has on record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentValidity {
    pub id: Option<String>,
    pub window: ValidityWindow,
}

impl CurrentValidity {
    /// Read `{"validity": {"_id", "valid_from", "valid_to"}}`.
    pub fn from_response(body: &Value) -> Option<Self> {
        let validity = body.get("validity")?;
        let valid_from = parse_date(validity.get("valid_from")?.as_str()?)?;
        let valid_to = parse_date(validity.get("valid_to")?.as_str()?)?;
        Some(Self {
            id: validity
                .get("_id")
                .and_then(|id| id.as_str())
                .map(str::to_owned),
            window: ValidityWindow {
                valid_from,
                valid_to,
            },
        })
    }
}

/// Accepts `YYYY-MM-DD`, an ISO timestamp starting with one, or the
/// RFC 2822 form Flask uses when serializing datetimes.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    raw.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        .or_else(|| {
            DateTime::parse_from_rfc2822(raw)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientConfig;
    use admin_auth::{CredentialStore, MemoryCredentialStore};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::{any, get};
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    /// Start a mock API that records `METHOD path` plus the body of every call.
    async fn start_recording_api() -> (String, Arc<Mutex<Vec<(String, String)>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let recorded = calls.clone();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let app = axum::Router::new()
            .route(
                "/categories/missing",
                any(|| async {
                    (
                        StatusCode::NOT_FOUND,
                        axum::Json(serde_json::json!({"error": "Category not found or unauthorized"})),
                    )
                }),
            )
            .route(
                "/users/validity",
                get(|| async {
                    axum::Json(serde_json::json!({
                        "validity": {
                            "_id": "v1",
                            "valid_from": "2026-10-01T00:00:00",
                            "valid_to": "Sat, 31 Oct 2026 00:00:00 GMT"
                        }
                    }))
                }),
            )
            .fallback(move |request: Request<Body>| {
                let recorded = recorded.clone();
                async move {
                    let line = format!("{} {}", request.method(), request.uri().path());
                    let bytes = axum::body::to_bytes(request.into_body(), 1024 * 1024)
                        .await
                        .unwrap();
                    recorded
                        .lock()
                        .unwrap()
                        .push((line, String::from_utf8_lossy(&bytes).to_string()));
                    axum::Json(serde_json::json!({"message": "ok"})).into_response()
                }
            });

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (url, calls)
    }

    fn api_for(url: &str) -> AdminApi {
        let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::with_credential("tok1"));
        AdminApi::new(AuthClient::new(ClientConfig::new(url), store).unwrap())
    }

    #[test]
    fn category_name_normalizes_nested_names() {
        assert_eq!(category_name(&json!({"name": "Backend"})), "Backend");
        assert_eq!(category_name(&json!({"name": {"name": "Frontend"}})), "Frontend");
        assert_eq!(category_name(&json!({"name": 42})), "42");
        assert_eq!(category_name(&json!({"_id": "c1"})), "");
    }

    #[test]
    fn validity_window_requires_both_dates() {
        assert!(matches!(
            ValidityWindow::parse("", "2026-10-31"),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            ValidityWindow::parse("2026-10-01", "31/10/2026"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn validity_window_is_inclusive() {
        let window = ValidityWindow::parse("2026-10-01", "2026-10-31").unwrap();
        assert!(window.is_active_on(date("2026-10-01")));
        assert!(window.is_active_on(date("2026-10-18")));
        assert!(window.is_active_on(date("2026-10-31")));
        assert!(!window.is_active_on(date("2026-09-30")));
        assert!(!window.is_active_on(date("2026-11-01")));
    }

    #[test]
    fn validity_window_serializes_plain_dates() {
        let window = ValidityWindow::parse("2026-10-01T09:30:00", "2026-10-31").unwrap();
        assert_eq!(
            window.to_json(),
            json!({"valid_from": "2026-10-01", "valid_to": "2026-10-31"})
        );
    }

    #[test]
    fn current_validity_requires_both_dates() {
        assert!(CurrentValidity::from_response(&json!({"validity": null})).is_none());
        assert!(
            CurrentValidity::from_response(&json!({"validity": {"valid_from": "2026-10-01"}}))
                .is_none()
        );
    }

    #[test]
    fn segment_rejects_path_injection() {
        assert!(segment("665f1c2e9b1e8a0012345678").is_ok());
        assert!(segment("").is_err());
        assert!(segment("a/b").is_err());
        assert!(segment("a?b=1").is_err());
    }

    #[test]
    fn sheet_mime_follows_extension() {
        assert_eq!(sheet_mime(Path::new("c.xlsx")), XLSX_MIME);
        assert_eq!(sheet_mime(Path::new("c.XLS")), XLS_MIME);
        assert_eq!(sheet_mime(Path::new("c.csv")), CSV_MIME);
    }

    #[tokio::test]
    async fn crud_calls_hit_expected_routes() {
        let (url, calls) = start_recording_api().await;
        let api = api_for(&url);

        api.categories().await.unwrap();
        api.create_category("Backend").await.unwrap();
        api.update_category("c1", json!({"name": "Infra"})).await.unwrap();
        api.delete_category("c1").await.unwrap();
        api.criteria().await.unwrap();
        api.questions("c1").await.unwrap();
        api.delete_question("q1").await.unwrap();
        api.candidates().await.unwrap();
        api.candidate("u1").await.unwrap();
        api.update_candidate("u1", json!({"email": "a@b.c"})).await.unwrap();

        let lines: Vec<String> = calls.lock().unwrap().iter().map(|(l, _)| l.clone()).collect();
        assert_eq!(
            lines,
            vec![
                "GET /categories/",
                "POST /categories/",
                "PUT /categories/c1",
                "DELETE /categories/c1",
                "GET /criteria/",
                "GET /questions/c1",
                "DELETE /questions/q1",
                "GET /users/get-all-candidates",
                "GET /users/candidate/u1",
                "PUT /users/candidate/u1",
            ]
        );
        assert!(calls.lock().unwrap()[1].1.contains("\"name\":\"Backend\""));
    }

    #[tokio::test]
    async fn non_success_status_becomes_status_error_with_server_message() {
        let (url, _calls) = start_recording_api().await;
        let api = api_for(&url);

        let err = api.delete_category("missing").await.unwrap_err();
        match err {
            Error::Status { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Category not found or unauthorized");
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn validity_parses_mixed_date_formats() {
        let (url, _calls) = start_recording_api().await;
        let api = api_for(&url);

        let current = api.validity().await.unwrap().unwrap();
        assert_eq!(current.id.as_deref(), Some("v1"));
        assert_eq!(current.window.valid_from, date("2026-10-01"));
        assert_eq!(current.window.valid_to, date("2026-10-31"));
    }

    #[tokio::test]
    async fn upload_candidates_sends_file_part() {
        let (url, calls) = start_recording_api().await;
        let api = api_for(&url);
        let dir = tempfile::tempdir().unwrap();
        let sheet = dir.path().join("candidates.xlsx");
        tokio::fs::write(&sheet, b"PK sheet bytes").await.unwrap();

        api.upload_candidates(&sheet).await.unwrap();

        let calls = calls.lock().unwrap();
        let (line, body) = &calls[0];
        assert_eq!(line, "POST /users/upload");
        assert!(body.contains("name=\"file\""));
        assert!(body.contains("filename=\"candidates.xlsx\""));
        assert!(body.contains("PK sheet bytes"));
    }

    #[tokio::test]
    async fn create_category_rejects_blank_name_locally() {
        let (url, calls) = start_recording_api().await;
        let api = api_for(&url);

        assert!(matches!(
            api.create_category("  ").await,
            Err(Error::InvalidInput(_))
        ));
        assert!(calls.lock().unwrap().is_empty());
    }
}
