//! Administrative portal over an exercise document store.
//!
//! The portal reads and writes documents (users, exercises, nested routine
//! subcollections) and exercise images, and exposes them over HTTP. Every
//! write goes through the payload sanitizer, which coerces loosely-typed
//! input into the declared field kinds:
//! - **Taint tracking**: request data arrives as [`Tainted<T>`]
//! - **Sanitization**: [`PayloadSanitizer`] is the only way to get a
//!   [`Verified<SanitizedPayload>`]
//! - **Typed sinks**: [`DocumentStore`] writes accept only verified payloads
//!
//! # Core Types
//!
//! - [`EXERCISE_FIELDS`]: the declared exercise fields and their kinds
//! - [`sanitize`]: the pure coercion function behind the sanitizer
//! - [`ExercisePortal`]: the portal operations over injected stores
//! - [`Secret<T>`]: wrapper that redacts the admin token in logs
//! - [`web`]: request extraction, authentication and the axum router
//!
//! # Examples
//!
//! ```
//! use exercise_portal::{
//!     FieldValue, PayloadSanitizer, RawPayload, SanitizeMode, Sanitizer, Tainted, EXERCISE_FIELDS,
//! };
//! use serde_json::json;
//!
//! let mut raw = RawPayload::new();
//! raw.insert("added_count".to_string(), json!("5"));
//! raw.insert("primaryMuscles_en".to_string(), json!(["chest", ""]));
//!
//! let update = PayloadSanitizer::new(&EXERCISE_FIELDS, SanitizeMode::UPDATE)
//!     .sanitize(Tainted::new(raw));
//!
//! assert_eq!(update.as_ref().get("added_count"), Some(&FieldValue::Integer(5)));
//! assert_eq!(update.as_ref().len(), 2);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod blob;
mod config;
mod error;
mod fields;
mod logging;
mod portal;
mod request;
mod sanitizer;
mod secret;
pub mod store;
mod tainted;
mod verified;
pub mod web;

pub use blob::{BlobDeletion, BlobKey, BlobStore, ImageSlot, MemoryBlobStore, StoredBlob};
pub use config::{ConfigError, PortalConfig};
pub use error::{PortalError, Violation, ViolationKind};
pub use fields::{
    FieldDefault, FieldKind, FieldSpec, FieldSpecification, FieldValue, RawPayload,
    EXERCISE_FIELDS,
};
pub use logging::RequestLog;
pub use portal::{derive_exercise_id, ExercisePortal};
pub use request::{Principal, RequestMeta};
pub use sanitizer::{
    coerce, coerce_integer, coerce_string_array, coerce_text, sanitize, PayloadSanitizer,
    SanitizeMode, SanitizedPayload, Sanitizer,
};
pub use secret::Secret;
pub use store::{CollectionPath, Document, DocumentStore, MemoryDocumentStore, StoreError};
pub use tainted::Tainted;
pub use verified::Verified;
