use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use parking_lot::RwLock;
use serde_json::{Map, Value};

use super::{CollectionPath, Document, DocumentStore, StoreError};
use crate::sanitizer::SanitizedPayload;
use crate::Verified;

type Collection = BTreeMap<String, Map<String, Value>>;

/// An in-process document store.
///
/// Collections are kept as ordered maps from document id to fields, so
/// listings come back sorted by id. The store can be seeded from a JSON
/// snapshot of the form:
///
/// ```json
/// {
///   "exerciseData": { "squat": { "name_en": "Squat" } },
///   "users/u1/routines": { "r1": { "title": "Legs" } }
/// }
/// ```
///
/// # Examples
///
/// ```
/// use exercise_portal::{
///     CollectionPath, DocumentStore, MemoryDocumentStore, PayloadSanitizer, RawPayload,
///     SanitizeMode, Sanitizer, Tainted, EXERCISE_FIELDS,
/// };
///
/// let store = MemoryDocumentStore::new();
/// let sanitizer = PayloadSanitizer::new(&EXERCISE_FIELDS, SanitizeMode::CREATE);
/// let payload = sanitizer.sanitize(Tainted::new(RawPayload::new()));
///
/// store.set(&CollectionPath::exercises(), "squat", &payload).unwrap();
/// assert!(store.exists(&CollectionPath::exercises(), "squat").unwrap());
/// ```
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<CollectionPath, Collection>>,
}

impl MemoryDocumentStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a JSON snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidSnapshot` if the snapshot is not an object
    /// of collections, each an object of documents, each an object of fields.
    pub fn from_snapshot(snapshot: &Value) -> Result<Self, StoreError> {
        let store = Self::new();

        let collections = snapshot
            .as_object()
            .ok_or_else(|| StoreError::InvalidSnapshot("top level must be an object".into()))?;

        for (path, documents) in collections {
            let documents = documents.as_object().ok_or_else(|| {
                StoreError::InvalidSnapshot(format!("collection {path} must be an object"))
            })?;

            let collection = CollectionPath::root(path.as_str());
            for (id, fields) in documents {
                let fields = fields.as_object().ok_or_else(|| {
                    StoreError::InvalidSnapshot(format!(
                        "document {} must be an object",
                        collection.document_path(id)
                    ))
                })?;
                store.seed(&collection, id, fields.clone());
            }
        }

        Ok(store)
    }

    /// Reads a JSON snapshot file and builds a store from it.
    pub fn from_snapshot_file(path: &Path) -> Result<Self, StoreError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            StoreError::InvalidSnapshot(format!("cannot read {}: {e}", path.display()))
        })?;
        let snapshot: Value = serde_json::from_str(&text)
            .map_err(|e| StoreError::InvalidSnapshot(format!("{}: {e}", path.display())))?;

        Self::from_snapshot(&snapshot)
    }

    /// Inserts raw fields without sanitization.
    ///
    /// This models data already present in the store; nothing on the request
    /// path calls it.
    pub fn seed(&self, collection: &CollectionPath, id: &str, fields: Map<String, Value>) {
        self.collections
            .write()
            .entry(collection.clone())
            .or_default()
            .insert(id.to_string(), fields);
    }

    /// Total number of documents across all collections.
    pub fn document_count(&self) -> usize {
        self.collections.read().values().map(BTreeMap::len).sum()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read();

        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| Document {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn get(&self, collection: &CollectionPath, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read();

        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Document {
                id: id.to_string(),
                fields: fields.clone(),
            }))
    }

    fn set(
        &self,
        collection: &CollectionPath,
        id: &str,
        payload: &Verified<SanitizedPayload>,
    ) -> Result<(), StoreError> {
        self.collections
            .write()
            .entry(collection.clone())
            .or_default()
            .insert(id.to_string(), payload.as_ref().to_json_map());
        Ok(())
    }

    fn update(
        &self,
        collection: &CollectionPath,
        id: &str,
        payload: &Verified<SanitizedPayload>,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.write();

        let fields = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                path: collection.document_path(id),
            })?;

        for (key, value) in payload.as_ref().iter() {
            fields.insert(key.to_string(), value.to_json());
        }
        Ok(())
    }

    fn delete(&self, collection: &CollectionPath, id: &str) -> Result<(), StoreError> {
        if let Some(docs) = self.collections.write().get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::EXERCISE_FIELDS;
    use crate::{PayloadSanitizer, SanitizeMode, Sanitizer, Tainted};
    use serde_json::json;

    fn verified(mode: SanitizeMode, value: Value) -> Verified<SanitizedPayload> {
        let raw = value.as_object().cloned().unwrap_or_default();
        PayloadSanitizer::new(&EXERCISE_FIELDS, mode).sanitize(Tainted::new(raw))
    }

    #[test]
    fn set_then_get_round_trips_fields() {
        let store = MemoryDocumentStore::new();
        let exercises = CollectionPath::exercises();

        store
            .set(&exercises, "squat", &verified(SanitizeMode::CREATE, json!({"name_en": "Squat"})))
            .expect("set");

        let doc = store.get(&exercises, "squat").expect("get").expect("exists");
        assert_eq!(doc.id, "squat");
        assert_eq!(doc.fields["name_en"], "Squat");
        assert_eq!(doc.fields["type"], "weight_reps");
    }

    #[test]
    fn set_overwrites_whole_document() {
        let store = MemoryDocumentStore::new();
        let exercises = CollectionPath::exercises();
        let mut fields = Map::new();
        fields.insert("legacy".to_string(), json!(true));
        store.seed(&exercises, "row", fields);

        store
            .set(&exercises, "row", &verified(SanitizeMode::UPDATE, json!({"name_en": "Row"})))
            .expect("set");

        let doc = store.get(&exercises, "row").expect("get").expect("exists");
        assert!(!doc.fields.contains_key("legacy"));
        assert_eq!(doc.fields.len(), 1);
    }

    #[test]
    fn update_merges_into_existing_document() {
        let store = MemoryDocumentStore::new();
        let exercises = CollectionPath::exercises();
        store
            .set(&exercises, "dip", &verified(SanitizeMode::CREATE, json!({"name_en": "Dip"})))
            .expect("set");

        store
            .update(&exercises, "dip", &verified(SanitizeMode::UPDATE, json!({"added_count": "3"})))
            .expect("update");

        let doc = store.get(&exercises, "dip").expect("get").expect("exists");
        assert_eq!(doc.fields["name_en"], "Dip");
        assert_eq!(doc.fields["added_count"], 3);
    }

    #[test]
    fn update_missing_document_is_not_found() {
        let store = MemoryDocumentStore::new();

        let err = store
            .update(
                &CollectionPath::exercises(),
                "ghost",
                &verified(SanitizeMode::UPDATE, json!({"name_en": "Ghost"})),
            )
            .expect_err("missing");

        assert_eq!(
            err,
            StoreError::NotFound {
                path: "exerciseData/ghost".into()
            }
        );
    }

    #[test]
    fn delete_is_idempotent() {
        let store = MemoryDocumentStore::new();
        let exercises = CollectionPath::exercises();
        store.seed(&exercises, "lunge", Map::new());

        store.delete(&exercises, "lunge").expect("delete");
        store.delete(&exercises, "lunge").expect("delete again");
        store.delete(&CollectionPath::root("nowhere"), "x").expect("no collection");

        assert!(!store.exists(&exercises, "lunge").expect("exists"));
    }

    #[test]
    fn list_is_sorted_by_id() {
        let store = MemoryDocumentStore::new();
        let exercises = CollectionPath::exercises();
        for id in ["c", "a", "b"] {
            store.seed(&exercises, id, Map::new());
        }

        let ids: Vec<_> = store
            .list(&exercises)
            .expect("list")
            .into_iter()
            .map(|doc| doc.id)
            .collect();

        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(store.list(&CollectionPath::root("empty")).expect("list").is_empty());
    }

    #[test]
    fn snapshot_seeds_nested_collections() {
        let snapshot = json!({
            "users": {"u1": {"email": "a@example.com"}},
            "users/u1/routines": {"r1": {"title": "Legs"}},
            "exerciseData": {"squat": {"name_en": "Squat"}, "row": {}}
        });

        let store = MemoryDocumentStore::from_snapshot(&snapshot).expect("valid snapshot");

        assert_eq!(store.document_count(), 4);
        let routines = CollectionPath::users().subcollection("u1", "routines");
        assert_eq!(store.list(&routines).expect("list").len(), 1);
    }

    #[test]
    fn snapshot_rejects_non_object_documents() {
        let err = MemoryDocumentStore::from_snapshot(&json!({"users": {"u1": [1, 2]}}))
            .expect_err("invalid");
        assert!(matches!(err, StoreError::InvalidSnapshot(msg) if msg.contains("users/u1")));

        assert!(MemoryDocumentStore::from_snapshot(&json!([])).is_err());
        assert!(MemoryDocumentStore::from_snapshot(&json!({"users": 3})).is_err());
    }
}
