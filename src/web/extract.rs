//! Extraction boundary traits for web integration.
//!
//! This module defines the abstraction for extracting portal types from
//! framework-specific request types.

use crate::request::RequestMeta;

use super::TaintedInputs;

/// Extracts request metadata from a framework-specific request.
///
/// Implementations provide:
/// - Request ID extraction/generation
/// - Principal extraction from auth headers
///
/// # Design Notes
///
/// This trait does NOT:
/// - Reject unauthenticated requests (that's `extract_authed`'s job)
/// - Sanitize inputs (that's the payload sanitizer's job)
///
/// It ONLY maps framework types to domain types.
///
/// # Examples
///
/// ```
/// use exercise_portal::web::ExtractMetadata;
/// use exercise_portal::{Principal, RequestMeta};
///
/// struct MyFrameworkRequest {
///     request_id: String,
///     user: Option<String>,
/// }
///
/// impl ExtractMetadata for MyFrameworkRequest {
///     fn extract_metadata(&self) -> RequestMeta {
///         RequestMeta {
///             request_id: self.request_id.clone(),
///             principal: self.user.as_ref().map(|u| Principal { id: u.clone() }),
///         }
///     }
/// }
/// ```
pub trait ExtractMetadata {
    /// Extracts request metadata.
    ///
    /// Returns a `RequestMeta` containing:
    /// - `request_id`: Unique identifier for this request
    /// - `principal`: Authenticated administrator, if available
    fn extract_metadata(&self) -> RequestMeta;
}

/// Extracts tainted inputs from a framework-specific request.
///
/// All extracted inputs MUST be wrapped in `Tainted<T>`: path parameters,
/// body fields and uploaded files are untrusted until sanitized or validated.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use exercise_portal::web::{ExtractTaintedInputs, RequestAdapter, TaintedInputs};
///
/// struct MyFrameworkRequest {
///     path: HashMap<String, String>,
/// }
///
/// impl ExtractTaintedInputs for MyFrameworkRequest {
///     fn extract_tainted_inputs(&self) -> TaintedInputs {
///         // Use RequestAdapter as a helper for building TaintedInputs
///         let mut adapter = RequestAdapter::new("req-1".to_string());
///
///         for (k, v) in &self.path {
///             adapter.add_path_param(k.clone(), v.clone());
///         }
///
///         adapter.extract_tainted_inputs()
///     }
/// }
/// ```
pub trait ExtractTaintedInputs {
    /// Extracts all untrusted inputs from the request.
    fn extract_tainted_inputs(&self) -> TaintedInputs;
}
