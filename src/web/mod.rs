//! Web framework integration surface.
//!
//! This module is the boundary between HTTP and the portal. It handles:
//! - Mapping HTTP requests to domain types (`RequestMeta`)
//! - Introducing taint at the boundary (path params, body fields, files → `Tainted<T>`)
//! - Request-ID extraction and propagation
//! - Bearer-token authentication of the administrator
//!
//! # Design Principles
//!
//! 1. **Framework-agnostic core**: [`RequestAdapter`], the extraction traits
//!    and the middleware functions know nothing about axum. Only
//!    `extractor` and `routes` do.
//!
//! 2. **Taint at Boundary**: All external inputs are wrapped in `Tainted<T>`
//!    at extraction time and reach the store only through the payload
//!    sanitizer.
//!
//! 3. **Explicit Context**: No global state. Stores are injected through
//!    [`AppState`].
//!
//! # Request Flow
//!
//! ```text
//! axum Request
//!   → RequestAdapter (FromRequest: request id, principal, path params, body)
//!   → extract_authed / extract_unauthed
//!   → ExercisePortal operation
//!   → {"success": ...} JSON envelope
//! ```

mod adapter;
mod extract;
mod extractor;
mod middleware;
mod routes;

pub use adapter::{RequestAdapter, TaintedInputs, UploadedFile};
pub use extract::{ExtractMetadata, ExtractTaintedInputs};
pub use extractor::REQUEST_ID_HEADER;
pub use middleware::{
    extract_authed, extract_unauthed, AuthenticatedExtraction, UnauthenticatedExtraction,
};
pub use routes::{router, serve, AppState};
