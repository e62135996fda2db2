//! JSON HTTP API and the browser-facing intro/login pages.
//!
//! # Endpoints
//!
//! | Method   | Path                          | Auth    | Description |
//! |----------|-------------------------------|---------|-------------|
//! | `GET`    | `/`                           | none    | Intro splash page (timings from `[intro]`) |
//! | `GET`    | `/login`                      | none    | Login page |
//! | `GET`    | `/intro/config`               | none    | Intro timeline as JSON |
//! | `GET`    | `/health`                     | none    | Health check (returns version) |
//! | `POST`   | `/auth/login`                 | none    | Exchange credentials for a bearer token |
//! | `GET`    | `/subjects`                   | user    | Subjects with their lectures |
//! | `GET`    | `/lectures/{id}/file`         | user    | Original uploaded document |
//! | `GET`    | `/lectures/{id}/chunks/count` | user    | Stored chunk count for a lecture |
//! | `POST`   | `/lectures/{id}/summary`      | user    | Generate (or fetch cached) summary |
//! | `POST`   | `/subjects`                   | admin   | Create a subject |
//! | `PUT`    | `/subjects/{name}`            | admin   | Rename a subject |
//! | `DELETE` | `/subjects/{name}`            | admin   | Delete a subject and its lectures |
//! | `POST`   | `/lectures`                   | admin   | Upload and ingest a lecture document |
//! | `DELETE` | `/lectures/{id}`              | admin   | Delete a lecture, chunks, and summaries |
//! | `GET`    | `/users`                      | admin   | List user accounts |
//! | `POST`   | `/users`                      | admin   | Create a user account |
//! | `PUT`    | `/users/{username}`           | admin   | Update role and optionally password |
//! | `DELETE` | `/users/{username}`           | admin   | Delete a user account |
//!
//! # Error Contract
//!
//! All error responses share one schema:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "Subject name must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `unauthorized` (401), `forbidden` (403),
//! `not_found` (404), `summarizer_disabled` (400), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the dashboard can be
//! served from a different origin during development.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::auth::{self, Claims};
use crate::config::Config;
use crate::{extract, ingest, lectures, retrieve, subjects, summarize, users};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    pool: SqlitePool,
}

/// Starts the HTTP server on `[server].bind` and runs until the process is
/// terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let pool = crate::db::connect(&config.db).await?;

    let state = AppState {
        config: Arc::new(config.clone()),
        pool,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(handle_intro_page))
        .route("/login", get(handle_login_page))
        .route("/intro/config", get(handle_intro_config))
        .route("/health", get(handle_health))
        .route("/auth/login", post(handle_login))
        .route("/subjects", get(handle_list_subjects).post(handle_add_subject))
        .route(
            "/subjects/{name}",
            put(handle_rename_subject).delete(handle_delete_subject),
        )
        .route("/lectures", post(handle_upload_lecture))
        .route("/lectures/{id}", delete(handle_delete_lecture))
        .route("/lectures/{id}/file", get(handle_view_file))
        .route("/lectures/{id}/chunks/count", get(handle_chunk_count))
        .route("/lectures/{id}/summary", post(handle_summary))
        .route("/users", get(handle_list_users).post(handle_add_user))
        .route(
            "/users/{username}",
            put(handle_update_user).delete(handle_delete_user),
        )
        .layer(cors)
        .with_state(state);

    println!("Server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn unauthorized(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::UNAUTHORIZED,
        code: "unauthorized".to_string(),
        message: message.into(),
    }
}

fn forbidden(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::FORBIDDEN,
        code: "forbidden".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Maps domain errors to HTTP responses based on their message. The domain
/// modules report failures as `anyhow` errors with stable wording, so this
/// is the single place where wording becomes a status code.
fn classify_error(err: anyhow::Error) -> AppError {
    let msg = err.to_string();

    if msg.contains("not found") || msg.contains("Unknown subject") || msg.contains("No content found")
    {
        not_found(msg)
    } else if msg.contains("disabled") {
        let mut e = bad_request(msg);
        e.code = "summarizer_disabled".to_string();
        e
    } else if msg.contains("must not be empty")
        || msg.contains("already exists")
        || msg.contains("is taken")
        || msg.contains("Invalid role")
        || msg.contains("Unsupported file type")
        || msg.contains("are required")
        || msg.contains("Cannot delete")
    {
        bad_request(msg)
    } else {
        internal(msg)
    }
}

// ============ Auth extraction ============

/// Pull and verify the bearer token from the Authorization header.
fn require_user(headers: &HeaderMap) -> Result<Claims, AppError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| unauthorized("Missing Authorization header"))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| unauthorized("Authorization header must be 'Bearer <token>'"))?;

    auth::verify_token(token).map_err(|e| unauthorized(e.to_string()))
}

fn require_admin(headers: &HeaderMap) -> Result<Claims, AppError> {
    let claims = require_user(headers)?;
    if !claims.is_admin() {
        return Err(forbidden("Admin access required"));
    }
    Ok(claims)
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET / and GET /login ============

/// The intro splash. All timings are inlined from `[intro]` so the page and
/// the configured timeline cannot disagree: the title animates in, the
/// subtitle follows after its delay, the page holds, then fades out and
/// redirects to the login path. One navigation, no retry.
async fn handle_intro_page(State(state): State<AppState>) -> Html<String> {
    let intro = &state.config.intro;
    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Lectern</title>
<style>
  body {{ margin: 0; background: #0f1115; color: #e8e8e8; font-family: sans-serif;
         display: flex; align-items: center; justify-content: center; height: 100vh;
         transition: opacity {exit_ms}ms ease; }}
  body.exiting {{ opacity: 0; }}
  .title {{ font-size: 3rem; opacity: 0; animation: rise {title_ms}ms ease forwards; }}
  .subtitle {{ font-size: 1.2rem; opacity: 0;
               animation: rise {subtitle_ms}ms ease forwards;
               animation-delay: {subtitle_delay_ms}ms; }}
  @keyframes rise {{ from {{ opacity: 0; transform: translateY(12px); }}
                     to {{ opacity: 1; transform: translateY(0); }} }}
</style>
</head>
<body>
<div>
  <div class="title">Lectern</div>
  <div class="subtitle">Lecture summaries, on demand</div>
</div>
<script>
  setTimeout(function () {{
    document.body.classList.add("exiting");
    setTimeout(function () {{ window.location.href = "{redirect}"; }}, {exit_ms});
  }}, {intro_wait_ms});
</script>
</body>
</html>
"#,
        title_ms = intro.title_anim_ms,
        subtitle_delay_ms = intro.subtitle_delay_ms,
        subtitle_ms = intro.subtitle_anim_ms,
        intro_wait_ms = intro.intro_wait_ms(),
        exit_ms = intro.exit_anim_ms,
        redirect = intro.redirect_path,
    );
    Html(html)
}

async fn handle_login_page() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Lectern — Login</title></head>
<body>
<h1>Lectern</h1>
<p>POST your credentials to <code>/auth/login</code> to obtain a token.</p>
</body>
</html>
"#,
    )
}

// ============ GET /intro/config ============

#[derive(Serialize)]
struct IntroConfigResponse {
    title_anim_ms: u64,
    subtitle_delay_ms: u64,
    subtitle_anim_ms: u64,
    hold_ms: u64,
    intro_wait_ms: u64,
    exit_anim_ms: u64,
    redirect_path: String,
}

async fn handle_intro_config(State(state): State<AppState>) -> Json<IntroConfigResponse> {
    let intro = &state.config.intro;
    Json(IntroConfigResponse {
        title_anim_ms: intro.title_anim_ms,
        subtitle_delay_ms: intro.subtitle_delay_ms,
        subtitle_anim_ms: intro.subtitle_anim_ms,
        hold_ms: intro.hold_ms,
        intro_wait_ms: intro.intro_wait_ms(),
        exit_anim_ms: intro.exit_anim_ms,
        redirect_path: intro.redirect_path.clone(),
    })
}

// ============ POST /auth/login ============

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    token: String,
    username: String,
    role: String,
}

async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let role = auth::authenticate(&state.pool, &req.username, &req.password)
        .await
        .map_err(|e| unauthorized(e.to_string()))?;

    let token = auth::issue_token(&req.username, &role, state.config.auth.token_ttl_secs)
        .map_err(|e| internal(e.to_string()))?;

    Ok(Json(LoginResponse {
        token,
        username: req.username,
        role,
    }))
}

// ============ Subjects ============

async fn handle_list_subjects(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    require_user(&headers)?;
    let all = subjects::list_subjects(&state.pool)
        .await
        .map_err(classify_error)?;
    Ok(Json(serde_json::json!({ "subjects": all })))
}

#[derive(Deserialize)]
struct AddSubjectRequest {
    name: String,
}

async fn handle_add_subject(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AddSubjectRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&headers)?;
    subjects::add_subject(&state.pool, &req.name)
        .await
        .map_err(classify_error)?;
    Ok(Json(serde_json::json!({ "name": req.name })))
}

#[derive(Deserialize)]
struct RenameSubjectRequest {
    new_name: String,
}

async fn handle_rename_subject(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
    Json(req): Json<RenameSubjectRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&headers)?;
    subjects::rename_subject(&state.pool, &name, &req.new_name)
        .await
        .map_err(classify_error)?;
    Ok(Json(serde_json::json!({ "name": req.new_name })))
}

async fn handle_delete_subject(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&headers)?;
    let doomed = lectures::list_lectures(&state.pool, Some(&name))
        .await
        .map_err(classify_error)?;
    subjects::delete_subject(&state.pool, &name)
        .await
        .map_err(classify_error)?;
    for lecture in &doomed {
        let _ = std::fs::remove_file(lectures::stored_document_path(&state.config, lecture));
    }
    Ok(Json(serde_json::json!({ "deleted": name })))
}

// ============ Lectures ============

/// Upload body. The document travels as base64 inside the JSON payload.
/// The decoded bytes are staged under `[upload].dir` for the ingestion
/// pipeline; on success the file is kept there (served by
/// `GET /lectures/{id}/file`), on failure it is removed.
#[derive(Deserialize)]
struct UploadLectureRequest {
    title: String,
    subject: String,
    filename: String,
    data_base64: String,
}

#[derive(Serialize)]
struct UploadLectureResponse {
    lecture_id: String,
    chunk_count: usize,
}

async fn handle_upload_lecture(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<UploadLectureRequest>,
) -> Result<Json<UploadLectureResponse>, AppError> {
    require_admin(&headers)?;

    if req.title.trim().is_empty() {
        return Err(bad_request("Lecture title must not be empty"));
    }

    let extension = std::path::Path::new(&req.filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    if extract::content_type_for_extension(&extension).is_none() {
        return Err(bad_request(format!(
            "Unsupported file type '.{}'. Only PDF is supported.",
            extension
        )));
    }

    let bytes = BASE64
        .decode(&req.data_base64)
        .map_err(|_| bad_request("data_base64 is not valid base64"))?;
    if bytes.is_empty() {
        return Err(bad_request("Uploaded file is empty"));
    }

    // Stage under a unique subdirectory so the lecture row records the
    // client's filename, not a collision-safe rename of it
    let base_name = std::path::Path::new(&req.filename)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| bad_request("filename must name a file"))?;

    let upload_dir = &state.config.upload.dir;
    let staged_dir = upload_dir.join(Uuid::new_v4().to_string());
    std::fs::create_dir_all(&staged_dir).map_err(|e| internal(e.to_string()))?;
    let staged = staged_dir.join(&base_name);
    std::fs::write(&staged, &bytes).map_err(|e| internal(e.to_string()))?;

    let result = ingest::process_lecture(
        &state.config,
        &state.pool,
        &staged,
        &req.title,
        &req.subject,
    )
    .await;

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            // Failed pipeline leaves no file behind
            let _ = std::fs::remove_dir_all(&staged_dir);
            return Err(classify_error(e));
        }
    };

    // Keep the original, renamed to the lecture id for the view endpoint
    let stored = upload_dir.join(format!("{}.{}", report.lecture_id, extension));
    std::fs::rename(&staged, &stored).map_err(|e| internal(e.to_string()))?;
    let _ = std::fs::remove_dir_all(&staged_dir);

    Ok(Json(UploadLectureResponse {
        lecture_id: report.lecture_id,
        chunk_count: report.chunk_count,
    }))
}

/// Serve a lecture's original uploaded document.
async fn handle_view_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    require_user(&headers)?;

    let lecture = lectures::get_lecture(&state.pool, &id)
        .await
        .map_err(classify_error)?
        .ok_or_else(|| not_found(format!("Lecture not found: {}", id)))?;

    let path = lectures::stored_document_path(&state.config, &lecture);
    let bytes = std::fs::read(&path)
        .map_err(|_| not_found(format!("No stored document for lecture '{}'", id)))?;

    let content_type = std::path::Path::new(&lecture.original_filename)
        .extension()
        .and_then(|e| e.to_str())
        .and_then(extract::content_type_for_extension)
        .unwrap_or(extract::MIME_PDF);

    Ok((
        [(axum::http::header::CONTENT_TYPE, content_type)],
        bytes,
    )
        .into_response())
}

async fn handle_delete_lecture(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&headers)?;
    let lecture = lectures::get_lecture(&state.pool, &id)
        .await
        .map_err(classify_error)?;
    lectures::delete_lecture_fully(&state.pool, &id)
        .await
        .map_err(classify_error)?;
    if let Some(lecture) = lecture {
        let _ = std::fs::remove_file(lectures::stored_document_path(&state.config, &lecture));
    }
    Ok(Json(serde_json::json!({ "deleted": id })))
}

async fn handle_chunk_count(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_user(&headers)?;

    if lectures::get_lecture(&state.pool, &id)
        .await
        .map_err(classify_error)?
        .is_none()
    {
        return Err(not_found(format!("Lecture not found: {}", id)));
    }

    let count = retrieve::chunk_count(&state.pool, &id)
        .await
        .map_err(classify_error)?;
    Ok(Json(serde_json::json!({ "lecture_id": id, "chunk_count": count })))
}

// ============ POST /lectures/{id}/summary ============

#[derive(Deserialize)]
struct SummaryRequest {
    #[serde(default = "default_target_words")]
    target_words: i64,
    #[serde(default)]
    force_refresh: bool,
}

fn default_target_words() -> i64 {
    600
}

#[derive(Serialize)]
struct SummaryResponse {
    lecture_id: String,
    target_words: i64,
    summary: String,
}

async fn handle_summary(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<SummaryRequest>,
) -> Result<Json<SummaryResponse>, AppError> {
    require_user(&headers)?;

    if req.target_words <= 0 {
        return Err(bad_request("target_words must be positive"));
    }
    if lectures::get_lecture(&state.pool, &id)
        .await
        .map_err(classify_error)?
        .is_none()
    {
        return Err(not_found(format!("Lecture not found: {}", id)));
    }

    let summary = summarize::summarize_lecture(
        &state.config,
        &state.pool,
        &id,
        req.target_words,
        req.force_refresh,
    )
    .await
    .map_err(classify_error)?;

    Ok(Json(SummaryResponse {
        lecture_id: id,
        target_words: req.target_words,
        summary,
    }))
}

// ============ Users ============

async fn handle_list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&headers)?;
    let all = users::list_users(&state.pool)
        .await
        .map_err(classify_error)?;
    Ok(Json(serde_json::json!({ "users": all })))
}

#[derive(Deserialize)]
struct AddUserRequest {
    username: String,
    password: String,
    role: String,
}

async fn handle_add_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AddUserRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&headers)?;
    users::add_user(&state.pool, &req.username, &req.password, &req.role)
        .await
        .map_err(classify_error)?;
    Ok(Json(serde_json::json!({ "username": req.username, "role": req.role })))
}

#[derive(Deserialize)]
struct UpdateUserRequest {
    role: String,
    password: Option<String>,
}

async fn handle_update_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(username): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&headers)?;
    users::update_user(&state.pool, &username, &req.role, req.password.as_deref())
        .await
        .map_err(classify_error)?;
    Ok(Json(serde_json::json!({ "username": username, "role": req.role })))
}

async fn handle_delete_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&headers)?;
    users::delete_user(&state.pool, &username)
        .await
        .map_err(classify_error)?;
    Ok(Json(serde_json::json!({ "deleted": username })))
}
