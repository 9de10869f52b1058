//! HTTP routes of the portal.

use std::future::Future;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderName;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::blob::BlobDeletion;
use crate::error::PortalError;
use crate::portal::ExercisePortal;
use crate::request::Principal;
use crate::Secret;

use super::{extract_authed, extract_unauthed, RequestAdapter, TaintedInputs, REQUEST_ID_HEADER};

/// Shared application state.
///
/// Cheap to clone: everything inside is reference counted.
#[derive(Clone)]
pub struct AppState {
    portal: ExercisePortal,
    admin_token: Option<Arc<Secret<String>>>,
}

impl AppState {
    /// Creates the state. Without an admin token every request is treated as
    /// coming from the administrator.
    pub fn new(portal: ExercisePortal, admin_token: Option<Secret<String>>) -> Self {
        Self {
            portal,
            admin_token: admin_token.map(Arc::new),
        }
    }

    /// Resolves the principal for a presented bearer token.
    pub fn authenticate(&self, bearer: Option<&str>) -> Option<Principal> {
        match &self.admin_token {
            None => Some(Principal::admin()),
            Some(token) => bearer
                .filter(|candidate| token.matches(candidate))
                .map(|_| Principal::admin()),
        }
    }

    /// The portal service.
    pub fn portal(&self) -> &ExercisePortal {
        &self.portal
    }
}

/// Builds the portal router.
///
/// Every response carries an `x-request-id` header: the caller's own, or a
/// fresh UUID when the request had none. Stored blobs are served without
/// authentication under `/blobs/{key}`.
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/blobs/{*key}", get(read_blob))
        .route("/users/", get(list_users))
        .route("/exercises/", get(list_exercises))
        .route("/exercises/create/", post(create_exercise))
        .route("/exercises/upload_image/", post(upload_image))
        .route("/exercises/{ex_id}/update_type/", post(update_type))
        .route("/exercises/{ex_id}/update_video_url/", post(update_video_url))
        .route("/exercises/{ex_id}/update_field/", post(update_field))
        .route("/exercises/{ex_id}/update_array/", post(update_field))
        .route("/exercises/{ex_id}/delete/", post(delete_exercise))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .with_state(state)
}

/// Serves the router until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

type JsonResult = Result<Json<Value>, PortalError>;

fn success(extra: Value) -> Json<Value> {
    let mut body = Map::new();
    body.insert("success".to_string(), Value::Bool(true));
    if let Value::Object(fields) = extra {
        body.extend(fields);
    }
    Json(Value::Object(body))
}

fn exercise_id(inputs: &TaintedInputs) -> Result<String, PortalError> {
    inputs
        .path_param("ex_id")
        .map(|id| id.into_inner())
        .ok_or_else(|| PortalError::usage("Exercise ID is required"))
}

async fn healthz(adapter: RequestAdapter) -> Json<Value> {
    let extraction = extract_unauthed(&adapter);
    extraction.meta.log().debug(format_args!("health check"));
    Json(json!({"status": "ok"}))
}

async fn read_blob(
    State(state): State<AppState>,
    adapter: RequestAdapter,
) -> Result<Response, PortalError> {
    let extraction = extract_unauthed(&adapter);
    let key = extraction
        .inputs
        .path_param("key")
        .map(|key| key.into_inner())
        .unwrap_or_default();

    let blob = state.portal.read_blob(&extraction.meta.log(), &key)?;
    Ok(([(CONTENT_TYPE, blob.content_type)], blob.bytes).into_response())
}

async fn list_users(State(state): State<AppState>, adapter: RequestAdapter) -> JsonResult {
    let extraction = extract_authed(&adapter)?;
    let users = state.portal.list_users(&extraction.meta.log())?;
    Ok(success(json!({ "users": users })))
}

async fn list_exercises(State(state): State<AppState>, adapter: RequestAdapter) -> JsonResult {
    let extraction = extract_authed(&adapter)?;
    let exercises = state.portal.list_exercises(&extraction.meta.log())?;
    Ok(success(json!({ "exercises": exercises })))
}

async fn create_exercise(State(state): State<AppState>, adapter: RequestAdapter) -> JsonResult {
    let extraction = extract_authed(&adapter)?;
    let log = extraction.meta.log();
    let id = state
        .portal
        .create_exercise(&log, extraction.inputs.into_payload())?;
    Ok(success(json!({ "id": id })))
}

async fn update_type(State(state): State<AppState>, adapter: RequestAdapter) -> JsonResult {
    let extraction = extract_authed(&adapter)?;
    let id = exercise_id(&extraction.inputs)?;
    let value = extraction
        .inputs
        .payload()
        .field("exercise_type")
        .ok_or_else(|| PortalError::usage("exercise_type is required"))?;

    let updated = state
        .portal
        .update_type(&extraction.meta.log(), &id, value)?;
    Ok(success(json!({ "updated": updated })))
}

async fn update_video_url(State(state): State<AppState>, adapter: RequestAdapter) -> JsonResult {
    let extraction = extract_authed(&adapter)?;
    let id = exercise_id(&extraction.inputs)?;
    let value = extraction
        .inputs
        .payload()
        .field("video_url")
        .ok_or_else(|| PortalError::usage("video_url is required"))?;

    let updated = state
        .portal
        .update_video_url(&extraction.meta.log(), &id, value)?;
    Ok(success(json!({ "updated": updated })))
}

async fn update_field(State(state): State<AppState>, adapter: RequestAdapter) -> JsonResult {
    let extraction = extract_authed(&adapter)?;
    let id = exercise_id(&extraction.inputs)?;
    let log = extraction.meta.log();

    let updated = state
        .portal
        .update_fields(&log, &id, extraction.inputs.into_payload())?;
    Ok(success(json!({ "updated": updated })))
}

fn deletion_label(outcome: &BlobDeletion) -> &'static str {
    match outcome {
        BlobDeletion::Deleted => "deleted",
        BlobDeletion::NotFound => "not_found",
        BlobDeletion::Failed(_) => "failed",
    }
}

async fn delete_exercise(State(state): State<AppState>, adapter: RequestAdapter) -> JsonResult {
    let extraction = extract_authed(&adapter)?;
    let id = exercise_id(&extraction.inputs)?;

    let images: Map<String, Value> = state
        .portal
        .delete_exercise(&extraction.meta.log(), &id)?
        .iter()
        .map(|(slot, outcome)| (slot.to_string(), json!(deletion_label(outcome))))
        .collect();

    Ok(success(json!({ "images": images })))
}

async fn upload_image(State(state): State<AppState>, adapter: RequestAdapter) -> JsonResult {
    let extraction = extract_authed(&adapter)?;
    let log = extraction.meta.log();
    let payload = extraction.inputs.payload();

    let image = extraction
        .inputs
        .upload("image")
        .cloned()
        .ok_or_else(|| PortalError::usage("Missing fields"))?
        .into_inner();
    let exercise = payload.text("exercise_name").unwrap_or_default();
    let slot = payload.text("image_type").unwrap_or_default();

    let url = state
        .portal
        .upload_image(&log, &exercise, &slot, &image.bytes, &image.content_type)?;
    Ok(success(json!({ "newImageUrl": url })))
}
