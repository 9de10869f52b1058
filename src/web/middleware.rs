//! Extractor functions that split a request into metadata and tainted inputs.
//!
//! ```text
//! HTTP Request
//!   ↓
//! FromRequest builds RequestAdapter (principal set if the bearer token matched)
//!   ↓
//! Handler calls extract_authed() or extract_unauthed()
//!   ↓
//! Receives (RequestMeta, TaintedInputs)
//!   ↓
//! ExercisePortal sanitizes payloads before any store write
//! ```

use crate::error::{Violation, ViolationKind};
use crate::request::{Principal, RequestMeta};

use super::{ExtractMetadata, ExtractTaintedInputs, RequestAdapter, TaintedInputs};

/// Extraction result for endpoints that do not require a principal.
///
/// # Examples
///
/// ```
/// use exercise_portal::web::{extract_unauthed, RequestAdapter};
///
/// let adapter = RequestAdapter::new("req-001".to_string());
/// let extraction = extract_unauthed(&adapter);
///
/// assert_eq!(extraction.meta.request_id, "req-001");
/// assert!(extraction.meta.principal.is_none());
/// ```
#[derive(Debug)]
pub struct UnauthenticatedExtraction {
    /// Request metadata (principal may be absent)
    pub meta: RequestMeta,
    /// All untrusted inputs from the request
    pub inputs: TaintedInputs,
}

/// Extraction result for endpoints that require a principal.
#[derive(Debug)]
pub struct AuthenticatedExtraction {
    /// Request metadata
    pub meta: RequestMeta,
    /// The authenticated principal
    pub principal: Principal,
    /// All untrusted inputs from the request
    pub inputs: TaintedInputs,
}

/// Extracts metadata and inputs without requiring a principal.
///
/// Never fails.
pub fn extract_unauthed(adapter: &RequestAdapter) -> UnauthenticatedExtraction {
    UnauthenticatedExtraction {
        meta: adapter.extract_metadata(),
        inputs: adapter.extract_tainted_inputs(),
    }
}

/// Extracts metadata and inputs, requiring a principal.
///
/// # Errors
///
/// Returns a `ViolationKind::Unauthenticated` violation if `adapter` has no
/// principal. The HTTP layer answers 401.
///
/// # Examples
///
/// ```
/// use exercise_portal::web::{extract_authed, RequestAdapter};
/// use exercise_portal::Principal;
///
/// let mut adapter = RequestAdapter::new("req-auth".to_string());
/// adapter.set_principal(Some(Principal::admin()));
///
/// let extraction = extract_authed(&adapter).expect("should succeed");
/// assert_eq!(extraction.principal.id, "admin");
///
/// let anonymous = RequestAdapter::new("req-no-auth".to_string());
/// assert!(extract_authed(&anonymous).is_err());
/// ```
pub fn extract_authed(adapter: &RequestAdapter) -> Result<AuthenticatedExtraction, Violation> {
    let meta = adapter.extract_metadata();

    let principal = meta.principal.clone().ok_or_else(|| {
        meta.log()
            .warn(format_args!("rejected request without a valid bearer token"));
        Violation::new(ViolationKind::Unauthenticated, "No principal provided")
    })?;

    Ok(AuthenticatedExtraction {
        meta,
        principal,
        inputs: adapter.extract_tainted_inputs(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_unauthed_succeeds_without_principal() {
        let adapter = RequestAdapter::new("req-unauth-test".to_string());
        let extraction = extract_unauthed(&adapter);

        assert_eq!(extraction.meta.request_id, "req-unauth-test");
        assert!(extraction.meta.principal.is_none());
    }

    #[test]
    fn extract_unauthed_includes_tainted_inputs() {
        let mut adapter = RequestAdapter::new("req-1".to_string());
        adapter.add_path_param("ex_id".to_string(), "squat".to_string());
        adapter.add_field("type".to_string(), json!("reps"));

        let extraction = extract_unauthed(&adapter);

        assert_eq!(extraction.inputs.path_params_count(), 1);
        assert!(!extraction.inputs.payload().is_empty());
    }

    #[test]
    fn extract_authed_succeeds_with_principal() {
        let mut adapter = RequestAdapter::new("req-auth-test".to_string());
        adapter.set_principal(Some(Principal { id: "user-123".to_string() }));

        let extraction = extract_authed(&adapter).expect("should succeed with principal");

        assert_eq!(extraction.meta.request_id, "req-auth-test");
        assert_eq!(extraction.principal.id, "user-123");
    }

    #[test]
    fn extract_authed_fails_without_principal() {
        let adapter = RequestAdapter::new("req-no-principal".to_string());
        let err = extract_authed(&adapter).expect_err("no principal");

        assert_eq!(err.kind, ViolationKind::Unauthenticated);
    }
}
