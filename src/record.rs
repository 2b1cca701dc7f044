use crate::err::FieldError;

use indexmap::IndexMap;
use jiff::Timestamp;
use serde::ser::{Serialize, Serializer};

/// The value stored for a single WER field.
///
/// The shape is decided by the first line that mentions a field:
/// - `Field=value` produces a `Scalar`.
/// - `Field[n]=value` produces a `List`.
/// - `Field[n].Name=label` / `Field.Sub=value` produce a `Group`.
///
/// `Timestamp` is only produced when `EventTime`/`UploadTime` are converted after parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Scalar(String),
    List(Vec<String>),
    Group(IndexMap<String, String>),
    Timestamp(Timestamp),
}

impl FieldValue {
    /// Human readable name of the shape, used in diagnostics.
    pub fn shape_name(&self) -> &'static str {
        match self {
            FieldValue::Scalar(_) => "scalar",
            FieldValue::List(_) => "list",
            FieldValue::Group(_) => "group",
            FieldValue::Timestamp(_) => "timestamp",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&IndexMap<String, String>> {
        match self {
            FieldValue::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            FieldValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Scalar(s) => serializer.serialize_str(s),
            FieldValue::List(l) => l.serialize(serializer),
            FieldValue::Group(g) => g.serialize(serializer),
            FieldValue::Timestamp(ts) => ts.serialize(serializer),
        }
    }
}

/// A single parsed `Report.wer` file.
///
/// Fields keep the order in which they first appeared in the report; overwriting a field keeps
/// its position. Serializes as a flat JSON object of field name to value. Warnings collected
/// while post-processing are not part of the serialized form.
#[derive(Debug, Clone, Default)]
pub struct WerRecord {
    fields: IndexMap<String, FieldValue>,
    warnings: Vec<FieldError>,
}

impl PartialEq for WerRecord {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl WerRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Shortcut for fields holding a plain string.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn fields(&self) -> &IndexMap<String, FieldValue> {
        &self.fields
    }

    /// Field-scoped problems found while post-processing this record.
    pub fn warnings(&self) -> &[FieldError] {
        &self.warnings
    }

    pub(crate) fn fields_mut(&mut self) -> &mut IndexMap<String, FieldValue> {
        &mut self.fields
    }

    pub(crate) fn push_warning(&mut self, warning: FieldError) {
        self.warnings.push(warning);
    }
}

impl Serialize for WerRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}
