use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use crate::fields::{FieldKind, FieldSpecification, FieldValue, RawPayload};
use crate::{Tainted, Verified};

/// Mode flags controlling how a raw payload is sanitized.
///
/// # Examples
///
/// ```
/// use exercise_portal::SanitizeMode;
///
/// let mode = SanitizeMode::new(true, false);
/// assert_eq!(mode, SanitizeMode::CREATE);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SanitizeMode {
    /// Fill declared fields that are absent from the input with their default.
    pub apply_defaults: bool,
    /// Copy fields that are not declared into the output without coercion.
    pub include_unknown: bool,
}

impl SanitizeMode {
    /// Full read for display: defaults backfilled, unknown fields kept.
    pub const LISTING: Self = Self::new(true, true);
    /// Document creation: defaults backfilled, unknown fields dropped.
    pub const CREATE: Self = Self::new(true, false);
    /// Partial update: only fields present in the input, unknown fields dropped.
    pub const UPDATE: Self = Self::new(false, false);

    /// Creates a mode from its two flags.
    pub const fn new(apply_defaults: bool, include_unknown: bool) -> Self {
        Self {
            apply_defaults,
            include_unknown,
        }
    }
}

/// A validated mapping ready for a document-store write.
///
/// Every declared field in the payload holds a value of its declared kind and
/// no value is ever null. Entries are kept in declaration order followed by
/// passthrough fields, but equality ignores order.
#[derive(Debug, Clone, Default)]
pub struct SanitizedPayload {
    entries: Vec<(String, FieldValue)>,
}

impl SanitizedPayload {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, name: impl Into<String>, value: FieldValue) {
        self.entries.push((name.into(), value));
    }

    /// Returns the value for a field, if present.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Returns true if the field is present.
    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if sanitization left no fields at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates fields in output order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Field names in output order.
    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|(key, _)| key.as_str()).collect()
    }

    /// Converts the payload into a JSON object for a store write.
    ///
    /// The result is also a valid [`RawPayload`], so a sanitized payload can
    /// be fed back through the sanitizer.
    pub fn to_json_map(&self) -> Map<String, Value> {
        self.entries
            .iter()
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect()
    }
}

impl PartialEq for SanitizedPayload {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key) == Some(value))
    }
}

impl Serialize for SanitizedPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Converts a value to its trimmed textual representation.
///
/// Null becomes the empty string. Strings are trimmed; booleans render as
/// `true`/`false`, numbers and containers as compact JSON.
///
/// # Examples
///
/// ```
/// use exercise_portal::coerce_text;
/// use serde_json::json;
///
/// assert_eq!(coerce_text(&json!(null)), "");
/// assert_eq!(coerce_text(&json!(42)), "42");
/// assert_eq!(coerce_text(&json!("  hi  ")), "hi");
/// ```
pub fn coerce_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.trim().to_string(),
        other => other.to_string().trim().to_string(),
    }
}

/// Converts a value to an integer, degrading to 0 when it cannot be parsed.
///
/// Strings are parsed as integers first, then through a float (so `"3.0"`
/// becomes 3 and `"3.5"` becomes 3). Floats truncate toward zero. Booleans are
/// 0/1. Non-finite or out-of-range numbers, containers and unparseable text
/// become 0.
///
/// # Examples
///
/// ```
/// use exercise_portal::coerce_integer;
/// use serde_json::json;
///
/// assert_eq!(coerce_integer(&json!("7")), 7);
/// assert_eq!(coerce_integer(&json!("3.5")), 3);
/// assert_eq!(coerce_integer(&json!("abc")), 0);
/// assert_eq!(coerce_integer(&json!(true)), 1);
/// ```
pub fn coerce_integer(value: &Value) -> i64 {
    match value {
        Value::Null => 0,
        Value::Bool(flag) => i64::from(*flag),
        Value::Number(number) => match number.as_i64() {
            Some(n) => n,
            None if number.is_u64() => 0,
            None => number.as_f64().map_or(0, truncate_float),
        },
        Value::String(text) => parse_integer(text.trim()),
        Value::Array(_) | Value::Object(_) => 0,
    }
}

fn parse_integer(text: &str) -> i64 {
    if text.is_empty() {
        return 0;
    }
    if let Ok(n) = text.parse::<i64>() {
        return n;
    }
    text.parse::<f64>().map_or(0, truncate_float)
}

fn truncate_float(value: f64) -> i64 {
    // 2^63 is exactly representable; anything at or above it overflows i64.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;

    if !value.is_finite() {
        return 0;
    }
    let truncated = value.trunc();
    if truncated >= LIMIT || truncated < -LIMIT {
        return 0;
    }
    truncated as i64
}

/// Converts a value to a list of non-empty, trimmed strings.
///
/// Null becomes an empty list, arrays are iterated as-is, and any other value
/// is treated as a single element. Null and blank elements are dropped; order
/// and duplicates are kept.
///
/// # Examples
///
/// ```
/// use exercise_portal::coerce_string_array;
/// use serde_json::json;
///
/// let list = coerce_string_array(&json!(["a", " b ", "", null, "a"]));
/// assert_eq!(list, vec!["a", "b", "a"]);
/// ```
pub fn coerce_string_array(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().filter_map(coerce_element).collect(),
        single => coerce_element(single).into_iter().collect(),
    }
}

fn coerce_element(value: &Value) -> Option<String> {
    if value.is_null() {
        return None;
    }
    let text = coerce_text(value);
    (!text.is_empty()).then_some(text)
}

/// Coerces a value to the given kind.
pub fn coerce(kind: FieldKind, value: &Value) -> FieldValue {
    match kind {
        FieldKind::String => FieldValue::Text(coerce_text(value)),
        FieldKind::Integer => FieldValue::Integer(coerce_integer(value)),
        FieldKind::StringArray => FieldValue::TextList(coerce_string_array(value)),
    }
}

/// Sanitizes a raw payload against a field specification.
///
/// Declared fields present in `raw` are coerced to their kind. Declared fields
/// absent from `raw` are filled with a freshly produced default only when
/// `mode.apply_defaults` is set, and omitted otherwise. Undeclared fields are
/// copied unchanged only when `mode.include_unknown` is set.
///
/// This never fails; rejecting an empty result is up to the caller.
///
/// # Examples
///
/// ```
/// use exercise_portal::{sanitize, RawPayload, SanitizeMode, EXERCISE_FIELDS};
/// use serde_json::json;
///
/// let mut raw = RawPayload::new();
/// raw.insert("video_url".to_string(), json!("http://x"));
/// raw.insert("custom_note".to_string(), json!("x"));
///
/// let update = sanitize(&EXERCISE_FIELDS, &raw, SanitizeMode::UPDATE);
/// assert_eq!(update.keys(), vec!["video_url"]);
/// ```
pub fn sanitize(
    fields: &FieldSpecification,
    raw: &RawPayload,
    mode: SanitizeMode,
) -> SanitizedPayload {
    let mut payload = SanitizedPayload::with_capacity(fields.len());

    for spec in fields.iter() {
        match raw.get(spec.name) {
            Some(value) => payload.push(spec.name, coerce(spec.kind, value)),
            None if mode.apply_defaults => payload.push(spec.name, spec.default.produce()),
            None => {}
        }
    }

    if mode.include_unknown {
        for (key, value) in raw {
            if !fields.contains(key) {
                payload.push(key.clone(), FieldValue::Passthrough(value.clone()));
            }
        }
    }

    payload
}

/// Trait for sanitizing tainted values into verified values.
///
/// `Sanitizer<T>` is the only route from [`Tainted<T>`] to [`Verified`]. Store
/// writes accept only verified payloads, so every write passes through an
/// implementation of this trait.
///
/// # Invariants
///
/// Implementations MUST:
/// - Normalize the input according to their rules before wrapping it
/// - Only call `Verified::new_unchecked` on normalized output
pub trait Sanitizer<T> {
    /// The verified output type.
    type Output;

    /// Sanitizes a tainted value.
    fn sanitize(&self, input: Tainted<T>) -> Verified<Self::Output>;
}

/// Sanitizer for raw document payloads.
///
/// Pairs a [`FieldSpecification`] with a [`SanitizeMode`].
///
/// # Examples
///
/// ```
/// use exercise_portal::{
///     FieldValue, PayloadSanitizer, RawPayload, SanitizeMode, Sanitizer, Tainted, EXERCISE_FIELDS,
/// };
/// use serde_json::json;
///
/// let mut raw = RawPayload::new();
/// raw.insert("added_count".to_string(), json!("5"));
/// raw.insert("primaryMuscles_en".to_string(), json!(["chest", ""]));
/// raw.insert("name_en".to_string(), json!(null));
///
/// let sanitizer = PayloadSanitizer::new(&EXERCISE_FIELDS, SanitizeMode::CREATE);
/// let verified = sanitizer.sanitize(Tainted::new(raw));
/// let payload = verified.as_ref();
///
/// assert_eq!(payload.get("added_count"), Some(&FieldValue::Integer(5)));
/// assert_eq!(payload.get("name_en"), Some(&FieldValue::Text(String::new())));
/// assert_eq!(payload.len(), EXERCISE_FIELDS.len());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PayloadSanitizer<'a> {
    fields: &'a FieldSpecification,
    mode: SanitizeMode,
}

impl<'a> PayloadSanitizer<'a> {
    /// Creates a sanitizer for the given specification and mode.
    pub fn new(fields: &'a FieldSpecification, mode: SanitizeMode) -> Self {
        Self { fields, mode }
    }

    /// Returns the mode this sanitizer applies.
    pub fn mode(&self) -> SanitizeMode {
        self.mode
    }
}

impl Sanitizer<RawPayload> for PayloadSanitizer<'_> {
    type Output = SanitizedPayload;

    fn sanitize(&self, input: Tainted<RawPayload>) -> Verified<SanitizedPayload> {
        let raw = input.into_inner();
        let payload = sanitize(self.fields, &raw, self.mode);

        if !self.mode.include_unknown {
            let dropped = raw.keys().filter(|key| !self.fields.contains(key)).count();
            if dropped > 0 {
                tracing::debug!(dropped, "dropped undeclared payload fields");
            }
        }

        Verified::new_unchecked(payload)
    }
}
