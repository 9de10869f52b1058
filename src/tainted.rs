use std::fmt;

use serde_json::Value;

use crate::fields::RawPayload;
use crate::sanitizer::coerce_text;

/// A wrapper for data that must pass through the payload sanitizer before use.
///
/// `Tainted<T>` marks data from untrusted sources: request bodies, form fields,
/// path parameters, and documents read back from the store whose shape nobody
/// enforced. The value cannot be written to a store without going through
/// [`PayloadSanitizer`](crate::PayloadSanitizer).
///
/// # Security Properties
///
/// - Does NOT implement `Deref` or any implicit conversion traits
/// - Inner value is inaccessible outside this crate
/// - Store writes accept only [`Verified`](crate::Verified) payloads
///
/// # Examples
///
/// ```
/// use exercise_portal::{RawPayload, Tainted};
/// use serde_json::json;
///
/// let mut raw = RawPayload::new();
/// raw.insert("added_count".to_string(), json!("not a number"));
///
/// let payload = Tainted::new(raw);
/// println!("{:?}", payload); // Tainted { inner: {...} }
///
/// // But you CANNOT read the value directly:
/// // let count = payload.inner["added_count"]; // Won't compile!
/// ```
// BREAKING CHANGE WARNING: Do NOT remove Clone - handlers keep a copy for logging the key set.
#[derive(Clone)]
pub struct Tainted<T> {
    // BREAKING CHANGE WARNING: This field MUST remain private.
    // Making it public lets raw request data reach store writes unsanitized.
    inner: T,
}

impl<T> Tainted<T> {
    /// Wraps an untrusted value in `Tainted`.
    ///
    /// Use this for any data from external sources that has not been sanitized.
    pub fn new(value: T) -> Self {
        Self { inner: value }
    }

    /// Extracts the inner value for sanitization.
    ///
    /// This method is `pub(crate)` so that only the sanitizer and the
    /// crate's own boundary code can unwrap a tainted value.
    ///
    /// BREAKING CHANGE WARNING: Changing visibility to `pub` lets external code
    /// skip coercion and write arbitrarily-typed fields into the store.
    pub(crate) fn into_inner(self) -> T {
        self.inner
    }
}

impl Tainted<RawPayload> {
    /// Returns the keys present in the raw payload.
    ///
    /// Keys are safe to expose (they are only ever compared against the
    /// field specification), values are not.
    pub fn keys(&self) -> Vec<String> {
        self.inner.keys().cloned().collect()
    }

    /// Returns true when the payload carries no fields at all.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Reads one value as coerced, non-empty text.
    ///
    /// Used for identifiers and routing inputs that live next to document
    /// fields in the same payload (e.g. `id`, `exercise_name`).
    pub(crate) fn text(&self, key: &str) -> Option<String> {
        self.inner
            .get(key)
            .map(coerce_text)
            .filter(|text| !text.is_empty())
    }

    /// Returns one field of the payload, still tainted.
    pub fn field(&self, key: &str) -> Option<Tainted<Value>> {
        self.inner.get(key).cloned().map(Tainted::new)
    }

    /// Copies `from` to `to` when `to` is absent.
    ///
    /// Form submissions carry the exercise name as `name`; documents store it
    /// as `name_en`.
    pub(crate) fn alias(mut self, from: &str, to: &str) -> Self {
        if !self.inner.contains_key(to) {
            if let Some(value) = self.inner.get(from).cloned() {
                self.inner.insert(to.to_string(), value);
            }
        }
        self
    }
}

impl Tainted<Value> {
    /// Wraps a single value as a one-field payload.
    pub fn into_field(self, name: &str) -> Tainted<RawPayload> {
        let mut payload = RawPayload::new();
        payload.insert(name.to_string(), self.inner);
        Tainted::new(payload)
    }
}

// BREAKING CHANGE WARNING: Do NOT add Deref, AsRef, Borrow, From<T>, Into<T>, or any other
// implicit conversion traits to Tainted<T>. These would let unsanitized payloads reach
// DocumentStore::set / DocumentStore::update.

impl<T: fmt::Debug> fmt::Debug for Tainted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tainted")
            .field("inner", &self.inner)
            .finish()
    }
}
