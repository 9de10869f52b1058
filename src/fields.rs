//! Field specifications: the static table of expected document fields.
//!
//! A [`FieldSpecification`] names every field a document is expected to carry,
//! the [`FieldKind`] its value must have once sanitized, and the
//! [`FieldDefault`] used when a full write needs the field but the input
//! omitted it.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

/// A raw, loosely-typed payload as received at the boundary.
///
/// Each value is one of the JSON variants (null, bool, number, string, array,
/// object). Form bodies map each key to a string, or to an array of strings
/// when the key repeats.
pub type RawPayload = Map<String, Value>;

/// The value kind a sanitized field is coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Whitespace-trimmed text.
    String,
    /// Signed 64-bit integer.
    Integer,
    /// Ordered list of non-empty, whitespace-trimmed strings.
    StringArray,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::String => write!(f, "string"),
            FieldKind::Integer => write!(f, "integer"),
            FieldKind::StringArray => write!(f, "string-array"),
        }
    }
}

/// Default value for a field that is absent from the input.
///
/// Containers are never shared: string-array defaults are built by a
/// producer function on every call.
#[derive(Debug, Clone, Copy)]
pub enum FieldDefault {
    /// Static text default.
    Text(&'static str),
    /// Static integer default.
    Integer(i64),
    /// Producer of a fresh, empty list.
    FreshList(fn() -> Vec<String>),
}

impl FieldDefault {
    /// Produces the default value.
    pub fn produce(&self) -> FieldValue {
        match self {
            FieldDefault::Text(text) => FieldValue::Text((*text).to_string()),
            FieldDefault::Integer(n) => FieldValue::Integer(*n),
            FieldDefault::FreshList(producer) => FieldValue::TextList(producer()),
        }
    }
}

/// A sanitized field value.
///
/// Every variant except `Passthrough` matches a [`FieldKind`]; `Passthrough`
/// carries an unknown field copied through without coercion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Value of a `string` field.
    Text(String),
    /// Value of an `integer` field.
    Integer(i64),
    /// Value of a `string-array` field.
    TextList(Vec<String>),
    /// Unknown field, copied unchanged.
    Passthrough(Value),
}

impl FieldValue {
    /// Returns the kind this value satisfies, or `None` for passthrough values.
    pub fn kind(&self) -> Option<FieldKind> {
        match self {
            FieldValue::Text(_) => Some(FieldKind::String),
            FieldValue::Integer(_) => Some(FieldKind::Integer),
            FieldValue::TextList(_) => Some(FieldKind::StringArray),
            FieldValue::Passthrough(_) => None,
        }
    }

    /// Converts the value into its JSON representation for a store write.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Text(text) => Value::String(text.clone()),
            FieldValue::Integer(n) => Value::from(*n),
            FieldValue::TextList(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
            FieldValue::Passthrough(value) => value.clone(),
        }
    }

    /// Returns the text if this is a `Text` value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the integer if this is an `Integer` value.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the list if this is a `TextList` value.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::TextList(items) => Some(items),
            _ => None,
        }
    }
}

/// Descriptor for one expected field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Field name as stored in the document.
    pub name: &'static str,
    /// Kind the value is coerced to.
    pub kind: FieldKind,
    /// Default used when defaults are applied and the field is absent.
    pub default: FieldDefault,
}

impl FieldSpec {
    /// A `string` field with an empty default.
    pub const fn text(name: &'static str) -> Self {
        Self::text_or(name, "")
    }

    /// A `string` field with a custom default.
    pub const fn text_or(name: &'static str, default: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::String,
            default: FieldDefault::Text(default),
        }
    }

    /// An `integer` field defaulting to zero.
    pub const fn integer(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Integer,
            default: FieldDefault::Integer(0),
        }
    }

    /// A `string-array` field defaulting to a fresh empty list.
    pub const fn string_array(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::StringArray,
            default: FieldDefault::FreshList(Vec::new),
        }
    }
}

/// An ordered table of field descriptors.
///
/// Declaration order is the order sanitized payloads list their fields in.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpecification {
    fields: &'static [FieldSpec],
}

impl FieldSpecification {
    /// Creates a specification over a static descriptor table.
    pub const fn new(fields: &'static [FieldSpec]) -> Self {
        Self { fields }
    }

    /// Looks up a descriptor by field name.
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }

    /// Returns true if the name is a declared field.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates descriptors in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter()
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no fields are declared.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Field specification for documents in the `exerciseData` collection.
pub static EXERCISE_FIELDS: FieldSpecification = FieldSpecification::new(&[
    FieldSpec::text("name_en"),
    FieldSpec::text("category_en"),
    FieldSpec::text("equipment_en"),
    FieldSpec::text("force_en"),
    FieldSpec::text("level_en"),
    FieldSpec::text("mechanic_en"),
    FieldSpec::text_or("type", "weight_reps"),
    FieldSpec::text("video_url"),
    FieldSpec::text("image_1"),
    FieldSpec::text("image_2"),
    FieldSpec::string_array("primaryMuscles_en"),
    FieldSpec::string_array("secondaryMuscles_en"),
    FieldSpec::string_array("instructions_en"),
    FieldSpec::integer("added_count"),
    FieldSpec::integer("completed_count"),
]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exercise_fields_are_unique() {
        let mut names: Vec<_> = EXERCISE_FIELDS.iter().map(|spec| spec.name).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();

        assert_eq!(names.len(), total);
        assert_eq!(total, EXERCISE_FIELDS.len());
    }

    #[test]
    fn lookup_finds_declared_fields() {
        let spec = EXERCISE_FIELDS.get("added_count").expect("declared");
        assert_eq!(spec.kind, FieldKind::Integer);

        assert!(EXERCISE_FIELDS.contains("primaryMuscles_en"));
        assert!(!EXERCISE_FIELDS.contains("custom_note"));
    }

    #[test]
    fn type_defaults_to_weight_reps() {
        let spec = EXERCISE_FIELDS.get("type").expect("declared");
        assert_eq!(spec.default.produce(), FieldValue::Text("weight_reps".into()));
    }

    #[test]
    fn list_defaults_are_fresh_containers() {
        let spec = EXERCISE_FIELDS.get("instructions_en").expect("declared");

        let mut first = spec.default.produce();
        let second = spec.default.produce();

        if let FieldValue::TextList(items) = &mut first {
            items.push("mutated".to_string());
        }

        assert_eq!(second, FieldValue::TextList(Vec::new()));
        assert_eq!(first.as_list(), Some(&["mutated".to_string()][..]));
    }

    #[test]
    fn field_value_serializes_untagged() {
        let values = vec![
            FieldValue::Text("Squat".into()),
            FieldValue::Integer(4),
            FieldValue::TextList(vec!["quads".into()]),
            FieldValue::Passthrough(serde_json::json!({"k": 1})),
        ];

        let json = serde_json::to_value(&values).expect("serializes");
        assert_eq!(json, serde_json::json!(["Squat", 4, ["quads"], {"k": 1}]));
    }

    #[test]
    fn kind_display() {
        assert_eq!(FieldKind::String.to_string(), "string");
        assert_eq!(FieldKind::Integer.to_string(), "integer");
        assert_eq!(FieldKind::StringArray.to_string(), "string-array");
    }
}
