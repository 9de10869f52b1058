//! Request adapter for mapping HTTP requests to portal types.

use std::collections::HashMap;

use serde_json::Value;

use crate::fields::{FieldKind, RawPayload, EXERCISE_FIELDS};
use crate::request::{Principal, RequestMeta};
use crate::Tainted;

use super::{ExtractMetadata, ExtractTaintedInputs};

/// A file part of a multipart request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Client-supplied file name
    pub file_name: Option<String>,
    /// Declared MIME type
    pub content_type: String,
    /// File content
    pub bytes: Vec<u8>,
}

/// Adapter for converting framework-specific HTTP requests into portal types.
///
/// `RequestAdapter` is the integration point between the HTTP framework and
/// the portal. It provides a framework-agnostic interface for:
/// - Extracting request metadata (request-id, principal)
/// - Collecting untrusted inputs (path params, body fields, files) as tainted values
///
/// This type holds simple, owned data only. The axum integration builds it
/// through `FromRequest`; tests build it by hand.
///
/// # Examples
///
/// ```
/// use exercise_portal::web::{ExtractMetadata, ExtractTaintedInputs, RequestAdapter};
/// use exercise_portal::Principal;
/// use serde_json::json;
///
/// let mut adapter = RequestAdapter::new("req-12345".to_string());
/// adapter.set_principal(Some(Principal::admin()));
/// adapter.add_path_param("ex_id".to_string(), "squat".to_string());
/// adapter.add_field("video_url".to_string(), json!("http://x"));
///
/// let meta = adapter.extract_metadata();
/// assert_eq!(meta.request_id, "req-12345");
///
/// let inputs = adapter.extract_tainted_inputs();
/// assert!(inputs.path_param("ex_id").is_some());
/// assert_eq!(inputs.payload().keys(), vec!["video_url".to_string()]);
/// ```
#[derive(Debug, Clone)]
pub struct RequestAdapter {
    /// Unique request identifier (required)
    request_id: String,
    /// Authenticated principal (optional)
    principal: Option<Principal>,
    /// Path parameters from routing (all tainted)
    path_params: HashMap<String, String>,
    /// Body fields from JSON, form or multipart text parts (all tainted)
    payload: RawPayload,
    /// Multipart file parts by field name (all tainted)
    uploads: HashMap<String, UploadedFile>,
}

impl RequestAdapter {
    /// Creates a new request adapter with the given request ID.
    ///
    /// All other fields start empty.
    pub fn new(request_id: String) -> Self {
        Self {
            request_id,
            principal: None,
            path_params: HashMap::new(),
            payload: RawPayload::new(),
            uploads: HashMap::new(),
        }
    }

    /// Sets the authenticated principal for this request.
    pub fn set_principal(&mut self, principal: Option<Principal>) {
        self.principal = principal;
    }

    /// Adds a path parameter.
    pub fn add_path_param(&mut self, key: String, value: String) {
        self.path_params.insert(key, value);
    }

    /// Adds a body field, replacing any earlier value.
    pub fn add_field(&mut self, key: String, value: Value) {
        self.payload.insert(key, value);
    }

    /// Adds a form-style text field.
    ///
    /// Repeated values of a declared string-array field collect into an
    /// array. For every other key the last value wins.
    pub fn append_text_field(&mut self, key: String, value: String) {
        let collects = EXERCISE_FIELDS
            .get(&key)
            .is_some_and(|spec| spec.kind == FieldKind::StringArray);

        match self.payload.get_mut(&key) {
            Some(Value::Array(values)) if collects => values.push(Value::String(value)),
            Some(existing) if collects => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
            _ => {
                self.payload.insert(key, Value::String(value));
            }
        }
    }

    /// Replaces the whole body payload.
    pub fn set_payload(&mut self, payload: RawPayload) {
        self.payload = payload;
    }

    /// Adds an uploaded file.
    pub fn add_upload(&mut self, field: String, file: UploadedFile) {
        self.uploads.insert(field, file);
    }

    /// Returns a reference to the request ID.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns a reference to the principal, if present.
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }
}

impl ExtractMetadata for RequestAdapter {
    fn extract_metadata(&self) -> RequestMeta {
        RequestMeta {
            request_id: self.request_id.clone(),
            principal: self.principal.clone(),
        }
    }
}

impl ExtractTaintedInputs for RequestAdapter {
    fn extract_tainted_inputs(&self) -> TaintedInputs {
        TaintedInputs {
            path_params: self
                .path_params
                .iter()
                .map(|(k, v)| (k.clone(), Tainted::new(v.clone())))
                .collect(),
            payload: Tainted::new(self.payload.clone()),
            uploads: self
                .uploads
                .iter()
                .map(|(k, v)| (k.clone(), Tainted::new(v.clone())))
                .collect(),
        }
    }
}

/// Collection of tainted inputs extracted from an HTTP request.
///
/// All values are wrapped in `Tainted<T>`; body fields reach the store only
/// through the payload sanitizer.
#[derive(Debug, Clone)]
pub struct TaintedInputs {
    path_params: HashMap<String, Tainted<String>>,
    payload: Tainted<RawPayload>,
    uploads: HashMap<String, Tainted<UploadedFile>>,
}

impl TaintedInputs {
    /// Returns one tainted path parameter.
    pub fn path_param(&self, name: &str) -> Option<Tainted<String>> {
        self.path_params.get(name).cloned()
    }

    /// Number of path parameters.
    pub fn path_params_count(&self) -> usize {
        self.path_params.len()
    }

    /// Returns the tainted body payload.
    pub fn payload(&self) -> &Tainted<RawPayload> {
        &self.payload
    }

    /// Consumes the inputs, keeping only the body payload.
    pub fn into_payload(self) -> Tainted<RawPayload> {
        self.payload
    }

    /// Returns one tainted uploaded file.
    pub fn upload(&self, field: &str) -> Option<&Tainted<UploadedFile>> {
        self.uploads.get(field)
    }

    /// Number of uploaded files.
    pub fn uploads_count(&self) -> usize {
        self.uploads.len()
    }
}
