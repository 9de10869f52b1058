//! The exercise portal service.
//!
//! [`ExercisePortal`] holds the two store seams and implements every portal
//! operation on top of them. Untrusted input arrives as [`Tainted`] values and
//! reaches the document store only after passing through
//! [`PayloadSanitizer`].

use std::sync::Arc;

use rand::Rng;
use serde_json::{Map, Value};

use crate::blob::{BlobDeletion, BlobKey, BlobStore, ImageSlot, StoredBlob};
use crate::error::PortalError;
use crate::fields::{RawPayload, EXERCISE_FIELDS};
use crate::logging::RequestLog;
use crate::sanitizer::{PayloadSanitizer, SanitizeMode, SanitizedPayload, Sanitizer};
use crate::store::{CollectionPath, DocumentStore, ROUTINES, ROUTINES_PROGRESS};
use crate::Tainted;

/// Attempts at finding a free identifier before giving up.
const MAX_ID_ATTEMPTS: usize = 16;

/// Derives a document identifier from an exercise name.
///
/// Lowercases the name and replaces spaces with underscores.
///
/// # Examples
///
/// ```
/// use exercise_portal::derive_exercise_id;
///
/// assert_eq!(derive_exercise_id("Bench Press"), "bench_press");
/// assert_eq!(derive_exercise_id("  Pull Up "), "pull_up");
/// ```
pub fn derive_exercise_id(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

fn document_id(raw: &str) -> Result<&str, PortalError> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(PortalError::usage("Exercise ID is required"));
    }
    if id.contains('/') {
        return Err(PortalError::usage("Exercise ID must not contain '/'"));
    }
    Ok(id)
}

/// Administrative operations over users, exercises and exercise images.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use exercise_portal::{
///     ExercisePortal, MemoryBlobStore, MemoryDocumentStore, RawPayload, RequestLog, Tainted,
/// };
/// use serde_json::json;
///
/// let portal = ExercisePortal::new(
///     Arc::new(MemoryDocumentStore::new()),
///     Arc::new(MemoryBlobStore::new("http://cdn.test")),
/// );
/// let log = RequestLog::new("req-doc");
///
/// let mut raw = RawPayload::new();
/// raw.insert("name_en".to_string(), json!("Bench Press"));
///
/// let id = portal.create_exercise(&log, Tainted::new(raw)).unwrap();
/// assert_eq!(id, "bench_press");
///
/// let exercises = portal.list_exercises(&log).unwrap();
/// assert_eq!(exercises[0]["type"], "weight_reps");
/// ```
#[derive(Clone)]
pub struct ExercisePortal {
    documents: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
}

impl ExercisePortal {
    /// Creates a portal over the given stores.
    pub fn new(documents: Arc<dyn DocumentStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { documents, blobs }
    }

    /// Lists every user with their `routines` and `routines_progress`.
    ///
    /// User and routine fields are returned as stored.
    pub fn list_users(&self, log: &RequestLog<'_>) -> Result<Vec<Map<String, Value>>, PortalError> {
        let users = CollectionPath::users();
        let mut listed = Vec::new();

        for user in self.documents.list(&users)? {
            let routines = self.list_with_ids(&users.subcollection(&user.id, ROUTINES))?;
            let progress = self.list_with_ids(&users.subcollection(&user.id, ROUTINES_PROGRESS))?;

            let mut fields = user.into_json_with_id();
            fields.insert(ROUTINES.to_string(), Value::Array(routines));
            fields.insert(ROUTINES_PROGRESS.to_string(), Value::Array(progress));
            listed.push(fields);
        }

        log.debug(format_args!("listed {} users", listed.len()));
        Ok(listed)
    }

    fn list_with_ids(&self, collection: &CollectionPath) -> Result<Vec<Value>, PortalError> {
        Ok(self
            .documents
            .list(collection)?
            .into_iter()
            .map(|doc| Value::Object(doc.into_json_with_id()))
            .collect())
    }

    /// Lists every exercise, normalized for display.
    ///
    /// Declared fields are coerced and backfilled with their defaults;
    /// undeclared fields pass through.
    pub fn list_exercises(
        &self,
        log: &RequestLog<'_>,
    ) -> Result<Vec<Map<String, Value>>, PortalError> {
        let sanitizer = PayloadSanitizer::new(&EXERCISE_FIELDS, SanitizeMode::LISTING);

        let exercises: Vec<_> = self
            .documents
            .list(&CollectionPath::exercises())?
            .into_iter()
            .map(|doc| {
                let mut fields = sanitizer.sanitize(Tainted::new(doc.fields)).as_ref().to_json_map();
                fields.insert("id".to_string(), Value::String(doc.id));
                fields
            })
            .collect();

        log.debug(format_args!("listed {} exercises", exercises.len()));
        Ok(exercises)
    }

    /// Creates an exercise and returns its identifier.
    ///
    /// The identifier comes from `id`, else `name_en`, else `name`, and is
    /// normalized with [`derive_exercise_id`]. A taken identifier gets a random
    /// `_xxxx` suffix. Existence check and write are separate store calls.
    pub fn create_exercise(
        &self,
        log: &RequestLog<'_>,
        payload: Tainted<RawPayload>,
    ) -> Result<String, PortalError> {
        let base = payload
            .text("id")
            .or_else(|| payload.text("name_en"))
            .or_else(|| payload.text("name"))
            .map(|raw| derive_exercise_id(&raw))
            .ok_or_else(|| PortalError::usage("Exercise ID or name is required"))?;
        let base = document_id(&base)?;

        let id = self.free_exercise_id(base)?;
        let payload = payload.alias("name", "name_en");
        let verified = PayloadSanitizer::new(&EXERCISE_FIELDS, SanitizeMode::CREATE).sanitize(payload);

        self.documents.set(&CollectionPath::exercises(), &id, &verified)?;

        log.info(format_args!("created exercise {id}"));
        Ok(id)
    }

    fn free_exercise_id(&self, base: &str) -> Result<String, PortalError> {
        let exercises = CollectionPath::exercises();
        if !self.documents.exists(&exercises, base)? {
            return Ok(base.to_string());
        }

        let mut rng = rand::thread_rng();
        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate = format!("{base}_{:04x}", rng.gen::<u16>());
            if !self.documents.exists(&exercises, &candidate)? {
                return Ok(candidate);
            }
        }

        Err(PortalError::Conflict(format!(
            "no free identifier derived from {base}"
        )))
    }

    /// Updates the declared fields present in the payload.
    ///
    /// Undeclared fields are dropped. A payload left with no fields is
    /// rejected before anything is written.
    pub fn update_fields(
        &self,
        log: &RequestLog<'_>,
        exercise_id: &str,
        payload: Tainted<RawPayload>,
    ) -> Result<SanitizedPayload, PortalError> {
        let id = document_id(exercise_id)?;
        let verified = PayloadSanitizer::new(&EXERCISE_FIELDS, SanitizeMode::UPDATE).sanitize(payload);

        if verified.as_ref().is_empty() {
            return Err(PortalError::usage("No valid fields to update"));
        }

        self.documents.update(&CollectionPath::exercises(), id, &verified)?;

        log.info(format_args!(
            "updated exercise {id} fields {:?}",
            verified.as_ref().keys()
        ));
        Ok(verified.into_inner())
    }

    /// Sets the exercise `type`.
    pub fn update_type(
        &self,
        log: &RequestLog<'_>,
        exercise_id: &str,
        value: Tainted<Value>,
    ) -> Result<SanitizedPayload, PortalError> {
        self.update_fields(log, exercise_id, value.into_field("type"))
    }

    /// Sets the exercise `video_url`.
    pub fn update_video_url(
        &self,
        log: &RequestLog<'_>,
        exercise_id: &str,
        value: Tainted<Value>,
    ) -> Result<SanitizedPayload, PortalError> {
        self.update_fields(log, exercise_id, value.into_field("video_url"))
    }

    /// Deletes an exercise, then both of its images.
    ///
    /// Image deletion is best effort: outcomes are logged and returned, and
    /// never fail the operation.
    pub fn delete_exercise(
        &self,
        log: &RequestLog<'_>,
        exercise_id: &str,
    ) -> Result<Vec<(ImageSlot, BlobDeletion)>, PortalError> {
        let id = document_id(exercise_id)?;
        self.documents.delete(&CollectionPath::exercises(), id)?;
        log.info(format_args!("deleted exercise {id}"));

        let outcomes = ImageSlot::ALL
            .into_iter()
            .map(|slot| {
                let key = BlobKey::exercise_image(id, slot);
                let outcome = self.blobs.delete(&key);
                match &outcome {
                    BlobDeletion::Deleted => log.debug(format_args!("deleted image {key}")),
                    BlobDeletion::NotFound => log.debug(format_args!("no image at {key}")),
                    BlobDeletion::Failed(err) => {
                        log.warn(format_args!("failed to delete image {key}: {err}"))
                    }
                }
                (slot, outcome)
            })
            .collect();

        Ok(outcomes)
    }

    /// Reads a stored blob by its key, as addressed by a public URL.
    pub fn read_blob(
        &self,
        log: &RequestLog<'_>,
        raw_key: &str,
    ) -> Result<StoredBlob, PortalError> {
        let not_found = || PortalError::NotFound(format!("blob {raw_key}"));
        let key = BlobKey::parse(raw_key).ok_or_else(not_found)?;

        match self.blobs.read(&key)? {
            Some(blob) => {
                log.debug(format_args!("serving {} bytes from {key}", blob.bytes.len()));
                Ok(blob)
            }
            None => Err(not_found()),
        }
    }

    /// Uploads an exercise image and records its public URL on the exercise.
    ///
    /// If the document update fails after a successful upload the error is
    /// returned and the blob stays in place.
    pub fn upload_image(
        &self,
        log: &RequestLog<'_>,
        exercise_id: &str,
        slot: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, PortalError> {
        let id = document_id(exercise_id)?;
        let slot = ImageSlot::parse(slot)
            .ok_or_else(|| PortalError::usage("Image type must be \"1\" or \"2\""))?;
        if bytes.is_empty() {
            return Err(PortalError::usage("Image is empty"));
        }

        let key = BlobKey::exercise_image(id, slot);
        let url = self.blobs.upload(&key, bytes, content_type)?;
        log.info(format_args!("uploaded {} bytes to {key}", bytes.len()));

        let update = Tainted::new(Value::String(url.clone())).into_field(slot.field_name());
        if let Err(err) = self.update_fields(log, id, update) {
            log.error(format_args!(
                "image {key} uploaded but exercise {id} was not updated: {err}"
            ));
            return Err(err);
        }

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::MemoryBlobStore;
    use crate::fields::FieldValue;
    use crate::store::{MemoryDocumentStore, StoreError, EXERCISES, USERS};
    use serde_json::json;

    struct Fixture {
        documents: Arc<MemoryDocumentStore>,
        blobs: Arc<MemoryBlobStore>,
        portal: ExercisePortal,
    }

    fn fixture() -> Fixture {
        let documents = Arc::new(MemoryDocumentStore::new());
        let blobs = Arc::new(MemoryBlobStore::new("http://cdn.test"));
        let portal = ExercisePortal::new(documents.clone(), blobs.clone());
        Fixture {
            documents,
            blobs,
            portal,
        }
    }

    fn tainted(value: Value) -> Tainted<RawPayload> {
        Tainted::new(value.as_object().cloned().unwrap_or_default())
    }

    fn log() -> RequestLog<'static> {
        RequestLog::new("req-test")
    }

    fn stored(documents: &MemoryDocumentStore, id: &str) -> Map<String, Value> {
        documents
            .get(&CollectionPath::exercises(), id)
            .expect("get")
            .expect("exists")
            .fields
    }

    #[test]
    fn derive_id_lowercases_and_underscores() {
        assert_eq!(derive_exercise_id("Bench Press"), "bench_press");
        assert_eq!(derive_exercise_id("Farmer's  Walk"), "farmer's__walk");
        assert_eq!(derive_exercise_id("squat"), "squat");
    }

    #[test]
    fn create_fills_every_declared_field() {
        let f = fixture();

        let id = f
            .portal
            .create_exercise(
                &log(),
                tainted(json!({
                    "name_en": "Bench Press",
                    "added_count": "5",
                    "primaryMuscles_en": ["chest", ""],
                    "custom_note": "dropped"
                })),
            )
            .expect("create");

        assert_eq!(id, "bench_press");
        let doc = stored(&f.documents, &id);
        assert_eq!(doc.len(), EXERCISE_FIELDS.len());
        assert_eq!(doc["added_count"], 5);
        assert_eq!(doc["primaryMuscles_en"], json!(["chest"]));
        assert_eq!(doc["type"], "weight_reps");
        assert!(!doc.contains_key("custom_note"));
    }

    #[test]
    fn create_prefers_explicit_id() {
        let f = fixture();

        let id = f
            .portal
            .create_exercise(&log(), tainted(json!({"id": "BP 01", "name_en": "Bench"})))
            .expect("create");

        assert_eq!(id, "bp_01");
    }

    #[test]
    fn create_from_form_name_copies_to_name_en() {
        let f = fixture();

        let id = f
            .portal
            .create_exercise(&log(), tainted(json!({"id": "", "name": "Pull Up", "type": "reps"})))
            .expect("create");

        assert_eq!(id, "pull_up");
        let doc = stored(&f.documents, &id);
        assert_eq!(doc["name_en"], "Pull Up");
        assert_eq!(doc["type"], "reps");
        assert!(!doc.contains_key("name"));
    }

    #[test]
    fn create_without_name_is_usage_error() {
        let f = fixture();

        let err = f
            .portal
            .create_exercise(&log(), tainted(json!({"name_en": "   ", "type": "reps"})))
            .expect_err("no name");

        assert!(matches!(err, PortalError::Usage(_)));
        assert_eq!(f.documents.document_count(), 0);
    }

    #[test]
    fn create_rejects_slash_in_id() {
        let f = fixture();

        let err = f
            .portal
            .create_exercise(&log(), tainted(json!({"id": "a/b"})))
            .expect_err("slash");

        assert!(matches!(err, PortalError::Usage(_)));
    }

    #[test]
    fn create_appends_suffix_on_collision() {
        let f = fixture();
        f.documents
            .seed(&CollectionPath::exercises(), "squat", Map::new());

        let id = f
            .portal
            .create_exercise(&log(), tainted(json!({"name_en": "Squat"})))
            .expect("create");

        assert_ne!(id, "squat");
        let suffix = id.strip_prefix("squat_").expect("suffixed");
        assert_eq!(suffix.len(), 4);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert!(stored(&f.documents, "squat").is_empty());
    }

    #[test]
    fn update_writes_only_present_fields() {
        let f = fixture();
        f.portal
            .create_exercise(&log(), tainted(json!({"name_en": "Dip", "video_url": "old"})))
            .expect("create");

        let updated = f
            .portal
            .update_fields(&log(), "dip", tainted(json!({"video_url": " http://x ", "bogus": 1})))
            .expect("update");

        assert_eq!(updated.keys(), vec!["video_url"]);
        let doc = stored(&f.documents, "dip");
        assert_eq!(doc["video_url"], "http://x");
        assert_eq!(doc["name_en"], "Dip");
        assert!(!doc.contains_key("bogus"));
    }

    #[test]
    fn update_with_no_declared_fields_is_rejected() {
        let f = fixture();
        f.documents.seed(&CollectionPath::exercises(), "dip", Map::new());

        let err = f
            .portal
            .update_fields(&log(), "dip", tainted(json!({"bogus": 1})))
            .expect_err("empty");

        assert!(matches!(err, PortalError::Usage(ref msg) if msg == "No valid fields to update"));
        assert!(stored(&f.documents, "dip").is_empty());
    }

    #[test]
    fn update_missing_exercise_is_not_found() {
        let f = fixture();

        let err = f
            .portal
            .update_fields(&log(), "ghost", tainted(json!({"name_en": "Ghost"})))
            .expect_err("missing");

        assert!(matches!(err, PortalError::NotFound(ref path) if path == "exerciseData/ghost"));
    }

    #[test]
    fn update_type_and_video_url() {
        let f = fixture();
        f.documents.seed(&CollectionPath::exercises(), "row", Map::new());

        let typed = f
            .portal
            .update_type(&log(), "row", Tainted::new(json!(" duration ")))
            .expect("type");
        assert_eq!(typed.get("type"), Some(&FieldValue::Text("duration".into())));

        f.portal
            .update_video_url(&log(), "row", Tainted::new(json!(null)))
            .expect("video");

        let doc = stored(&f.documents, "row");
        assert_eq!(doc["type"], "duration");
        assert_eq!(doc["video_url"], "");
    }

    #[test]
    fn delete_removes_document_and_images() {
        let f = fixture();
        f.documents.seed(&CollectionPath::exercises(), "row", Map::new());
        f.blobs
            .upload(&BlobKey::exercise_image("row", ImageSlot::First), b"x", "image/jpeg")
            .expect("upload");

        let outcomes = f.portal.delete_exercise(&log(), "row").expect("delete");

        assert_eq!(
            outcomes,
            vec![
                (ImageSlot::First, BlobDeletion::Deleted),
                (ImageSlot::Second, BlobDeletion::NotFound),
            ]
        );
        assert_eq!(f.documents.document_count(), 0);
        assert!(f.blobs.is_empty());
    }

    #[test]
    fn delete_tolerates_blob_failures() {
        struct BrokenBlobs;

        impl BlobStore for BrokenBlobs {
            fn upload(&self, _: &BlobKey, _: &[u8], _: &str) -> Result<String, StoreError> {
                Err(StoreError::Unavailable("offline".into()))
            }

            fn read(&self, _: &BlobKey) -> Result<Option<StoredBlob>, StoreError> {
                Err(StoreError::Unavailable("offline".into()))
            }

            fn delete(&self, _: &BlobKey) -> BlobDeletion {
                BlobDeletion::Failed(StoreError::Unavailable("offline".into()))
            }
        }

        let documents = Arc::new(MemoryDocumentStore::new());
        documents.seed(&CollectionPath::exercises(), "row", Map::new());
        let portal = ExercisePortal::new(documents.clone(), Arc::new(BrokenBlobs));

        let outcomes = portal.delete_exercise(&log(), "row").expect("delete");

        assert!(outcomes
            .iter()
            .all(|(_, outcome)| matches!(outcome, BlobDeletion::Failed(_))));
        assert_eq!(documents.document_count(), 0);

        let err = portal
            .upload_image(&log(), "row", "1", b"x", "image/jpeg")
            .expect_err("upload fails");
        assert!(matches!(err, PortalError::Store(StoreError::Unavailable(_))));

        let err = portal
            .read_blob(&log(), "exercise_images/row/1.jpg")
            .expect_err("read fails");
        assert!(matches!(err, PortalError::Store(StoreError::Unavailable(_))));
    }

    #[test]
    fn uploaded_image_reads_back_by_key() {
        let f = fixture();
        f.documents.seed(&CollectionPath::exercises(), "squat", Map::new());
        let url = f
            .portal
            .upload_image(&log(), "squat", "1", b"jpeg", "image/jpeg")
            .expect("upload");
        let key = url.strip_prefix("http://cdn.test/").expect("public url");

        let blob = f.portal.read_blob(&log(), key).expect("read");
        assert_eq!(blob.bytes, b"jpeg");
        assert_eq!(blob.content_type, "image/jpeg");

        for missing in ["exercise_images/squat/2.jpg", "../squat", ""] {
            let err = f.portal.read_blob(&log(), missing).expect_err("missing");
            assert!(matches!(err, PortalError::NotFound(_)), "{missing:?}");
        }
    }

    #[test]
    fn upload_sets_image_field() {
        let f = fixture();
        f.documents.seed(&CollectionPath::exercises(), "squat", Map::new());

        let url = f
            .portal
            .upload_image(&log(), "squat", "2", b"jpeg-bytes", "image/jpeg")
            .expect("upload");

        assert_eq!(url, "http://cdn.test/exercise_images/squat/2.jpg");
        assert_eq!(stored(&f.documents, "squat")["image_2"], url);
        let blob = f
            .blobs
            .get(&BlobKey::exercise_image("squat", ImageSlot::Second))
            .expect("stored");
        assert_eq!(blob.bytes, b"jpeg-bytes");
    }

    #[test]
    fn upload_validates_inputs() {
        let f = fixture();
        let cases: [(&str, &str, &[u8]); 4] = [
            ("", "1", b"x"),
            ("a/b", "1", b"x"),
            ("squat", "3", b"x"),
            ("squat", "1", b""),
        ];

        for (id, slot, bytes) in cases {
            let err = f
                .portal
                .upload_image(&log(), id, slot, bytes, "image/jpeg")
                .expect_err("invalid");
            assert!(matches!(err, PortalError::Usage(_)), "{id:?} {slot:?}");
        }
        assert!(f.blobs.is_empty());
    }

    #[test]
    fn upload_to_missing_exercise_keeps_blob() {
        let f = fixture();

        let err = f
            .portal
            .upload_image(&log(), "ghost", "1", b"x", "image/jpeg")
            .expect_err("missing");

        assert!(matches!(err, PortalError::NotFound(_)));
        assert_eq!(f.blobs.len(), 1);
    }

    #[test]
    fn list_exercises_backfills_defaults_and_keeps_unknown() {
        let f = fixture();
        let mut fields = Map::new();
        fields.insert("name_en".to_string(), json!(null));
        fields.insert("added_count".to_string(), json!("4"));
        fields.insert("legacy_flag".to_string(), json!(true));
        f.documents.seed(&CollectionPath::root(EXERCISES), "old", fields);

        let listed = f.portal.list_exercises(&log()).expect("list");

        assert_eq!(listed.len(), 1);
        let exercise = &listed[0];
        assert_eq!(exercise["id"], "old");
        assert_eq!(exercise["name_en"], "");
        assert_eq!(exercise["added_count"], 4);
        assert_eq!(exercise["instructions_en"], json!([]));
        assert_eq!(exercise["legacy_flag"], true);
    }

    #[test]
    fn list_users_nests_subcollections() {
        let f = fixture();
        let users = CollectionPath::root(USERS);
        let mut user = Map::new();
        user.insert("email".to_string(), json!("a@example.com"));
        f.documents.seed(&users, "u1", user);
        f.documents.seed(&users, "u2", Map::new());
        f.documents
            .seed(&users.subcollection("u1", ROUTINES), "r1", Map::new());
        f.documents
            .seed(&users.subcollection("u1", ROUTINES_PROGRESS), "p1", Map::new());
        f.documents
            .seed(&users.subcollection("u1", ROUTINES_PROGRESS), "p2", Map::new());

        let listed = f.portal.list_users(&log()).expect("list");

        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0]["id"], "u1");
        assert_eq!(listed[0]["email"], "a@example.com");
        assert_eq!(listed[0]["routines"], json!([{"id": "r1"}]));
        assert_eq!(listed[0]["routines_progress"].as_array().map(Vec::len), Some(2));
        assert_eq!(listed[1]["routines"], json!([]));
    }
}
