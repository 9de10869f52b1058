//! Document store seam.
//!
//! The portal talks to a schema-less document database through the
//! [`DocumentStore`] trait. Documents are grouped into collections addressed by
//! slash-separated paths (`users`, `users/{uid}/routines`, `exerciseData`).
//!
//! Writes accept only [`Verified<SanitizedPayload>`], so every field written
//! through this trait has been coerced by the payload sanitizer. Reads return
//! raw documents; their fields are whatever the store holds.
//!
//! A tainted payload does not type-check as a write argument:
//!
//! ```compile_fail
//! use exercise_portal::{CollectionPath, DocumentStore, MemoryDocumentStore, RawPayload, Tainted};
//!
//! let store = MemoryDocumentStore::new();
//! let tainted = Tainted::new(RawPayload::new());
//!
//! // Expected &Verified<SanitizedPayload>, got &Tainted<RawPayload>
//! store.set(&CollectionPath::exercises(), "squat", &tainted).unwrap();
//! ```

mod memory;

use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::sanitizer::SanitizedPayload;
use crate::Verified;

pub use memory::MemoryDocumentStore;

/// Collection holding user documents.
pub const USERS: &str = "users";
/// Per-user subcollection of saved routines.
pub const ROUTINES: &str = "routines";
/// Per-user subcollection of routine progress records.
pub const ROUTINES_PROGRESS: &str = "routines_progress";
/// Collection holding exercise documents.
pub const EXERCISES: &str = "exerciseData";

/// Errors reported by a document or blob store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The addressed document or blob does not exist.
    #[error("{path} not found")]
    NotFound {
        /// Full path of the missing item
        path: String,
    },

    /// The store refused access.
    #[error("permission denied for {path}")]
    PermissionDenied {
        /// Full path of the refused item
        path: String,
    },

    /// The store could not be reached or failed internally.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A snapshot used to seed a store could not be read.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Path of a collection, e.g. `users/u1/routines`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// A top-level collection.
    pub fn root(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The `exerciseData` collection.
    pub fn exercises() -> Self {
        Self::root(EXERCISES)
    }

    /// The `users` collection.
    pub fn users() -> Self {
        Self::root(USERS)
    }

    /// A subcollection nested under one document of this collection.
    pub fn subcollection(&self, doc_id: &str, name: &str) -> Self {
        Self(format!("{}/{}/{}", self.0, doc_id, name))
    }

    /// Full path of a document in this collection.
    pub fn document_path(&self, doc_id: &str) -> String {
        format!("{}/{}", self.0, doc_id)
    }

    /// The path as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A document as read from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Document identifier within its collection
    pub id: String,
    /// Raw stored fields
    pub fields: Map<String, Value>,
}

impl Document {
    /// Returns the fields with the identifier added under `id`.
    pub fn into_json_with_id(self) -> Map<String, Value> {
        let mut fields = self.fields;
        fields.insert("id".to_string(), Value::String(self.id));
        fields
    }
}

/// Access to a document database.
///
/// Implementations are shared across request handlers, so they must be
/// `Send + Sync`. Each call is an independent operation; there is no ordering
/// guarantee between calls.
pub trait DocumentStore: Send + Sync {
    /// Lists every document in a collection, ordered by identifier.
    fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, StoreError>;

    /// Reads one document.
    fn get(&self, collection: &CollectionPath, id: &str) -> Result<Option<Document>, StoreError>;

    /// Returns true if the document exists.
    fn exists(&self, collection: &CollectionPath, id: &str) -> Result<bool, StoreError> {
        Ok(self.get(collection, id)?.is_some())
    }

    /// Overwrites a document with the payload, creating it if needed.
    fn set(
        &self,
        collection: &CollectionPath,
        id: &str,
        payload: &Verified<SanitizedPayload>,
    ) -> Result<(), StoreError>;

    /// Merges the payload's fields into an existing document.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the document does not exist.
    fn update(
        &self,
        collection: &CollectionPath,
        id: &str,
        payload: &Verified<SanitizedPayload>,
    ) -> Result<(), StoreError>;

    /// Deletes a document. Deleting a missing document succeeds.
    fn delete(&self, collection: &CollectionPath, id: &str) -> Result<(), StoreError>;
}
