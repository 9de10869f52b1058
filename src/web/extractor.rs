//! axum integration: builds a [`RequestAdapter`] from an incoming request.

use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Multipart, RawPathParams, Request};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Form;
use serde_json::Value;
use uuid::Uuid;

use crate::error::PortalError;

use super::{AppState, RequestAdapter, UploadedFile};

/// Header carrying a caller-supplied request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

fn header_str<'a>(headers: &'a HeaderMap, name: impl axum::http::header::AsHeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    header_str(headers, AUTHORIZATION)
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
}

fn malformed(message: impl Into<String>) -> Response {
    PortalError::MalformedPayload(message.into()).into_response()
}

impl FromRequest<AppState> for RequestAdapter {
    type Rejection = Response;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();

        let request_id = header_str(&parts.headers, REQUEST_ID_HEADER)
            .filter(|id| !id.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut adapter = RequestAdapter::new(request_id);
        adapter.set_principal(state.authenticate(bearer_token(&parts.headers)));

        if let Ok(params) = RawPathParams::from_request_parts(&mut parts, state).await {
            for (key, value) in &params {
                adapter.add_path_param(key.to_string(), value.to_string());
            }
        }

        let content_type = header_str(&parts.headers, CONTENT_TYPE)
            .unwrap_or_default()
            .to_ascii_lowercase();
        let req = Request::from_parts(parts, body);

        if content_type.starts_with("multipart/form-data") {
            read_multipart(&mut adapter, req, state).await?;
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            for (key, value) in pairs {
                adapter.append_text_field(key, value);
            }
        } else {
            let bytes = Bytes::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            if !bytes.iter().all(u8::is_ascii_whitespace) {
                match serde_json::from_slice::<Value>(&bytes) {
                    Ok(Value::Object(payload)) => adapter.set_payload(payload),
                    Ok(_) => return Err(malformed("JSON body must be an object")),
                    Err(e) => return Err(malformed(e.to_string())),
                }
            }
        }

        Ok(adapter)
    }
}

async fn read_multipart(
    adapter: &mut RequestAdapter,
    req: Request,
    state: &AppState,
) -> Result<(), Response> {
    let mut multipart = Multipart::from_request(req, state)
        .await
        .map_err(IntoResponse::into_response)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(IntoResponse::into_response)?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(IntoResponse::into_response)?;
                adapter.add_upload(
                    name,
                    UploadedFile {
                        file_name: Some(file_name),
                        content_type,
                        bytes: bytes.to_vec(),
                    },
                );
            }
            None => {
                let text = field.text().await.map_err(IntoResponse::into_response)?;
                adapter.append_text_field(name, text);
            }
        }
    }

    Ok(())
}
