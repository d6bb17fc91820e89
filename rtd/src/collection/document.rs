use im::OrdMap;
use itertools::Itertools;
use smallvec::SmallVec;

use crate::collection::DocumentId;
use crate::common::{Value, DOC_ID, FIELD_SEPARATOR};
use crate::errors::{ErrorKind, RtdError, RtdResult};
use std::borrow::Cow;
use std::fmt::{Debug, Display};

type FieldVec = SmallVec<[String; 8]>;

/// Represents a schema-less document.
///
/// A document is composed of key-value pairs. The key is always a [String] and
/// the value is a [Value]. Nested documents are addressed with dotted field paths:
/// if a document is `{"a": {"b": 1}}`, then `document.get("a.b")` returns `1`.
/// Numeric path segments index into arrays (`items.0`), while non-numeric
/// segments applied to an array collect the field from every element.
///
/// The field `id` holds the document identifier. It is assigned by the engine on
/// insert if absent and never changes afterwards.
///
/// Documents are backed by `im::OrdMap`, a persistent ordered map. Cloning a
/// document is O(1) and mutations share structure with the original, which is
/// what lets collections hand out snapshots and stage writes on copies.
#[derive(Clone, PartialEq, Default)]
pub struct Document {
    data: OrdMap<String, Value>,
}

impl Document {
    /// Creates a new empty document.
    pub fn new() -> Self {
        Document {
            data: OrdMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the number of top-level entries.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Associates `value` with the field path `key`.
    ///
    /// Intermediate documents are created when a path segment is absent or null.
    /// Writing through a scalar, or through an array with a non-numeric or
    /// out-of-range index, fails with [ErrorKind::InvalidDocument].
    ///
    /// # Examples
    ///
    /// ```
    /// use rtd::collection::Document;
    /// use rtd::common::Value;
    ///
    /// let mut doc = Document::new();
    /// doc.put("user.name", "Alice").unwrap();
    /// assert_eq!(doc.get("user.name"), Some(Value::from("Alice")));
    /// ```
    pub fn put<'a, T: Into<Value>>(&mut self, key: impl Into<Cow<'a, str>>, value: T) -> RtdResult<()> {
        let key = key.into();
        let splits = split_path(&key)?;
        self.deep_put(&key, &splits, value.into())
    }

    /// Returns the value at the field path `key`, or `None` if it is absent.
    ///
    /// A literal top-level key takes precedence over path traversal, so keys that
    /// contain the separator (as may arrive from JSON input) stay reachable.
    pub fn get(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.data.get(key) {
            return Some(value.clone());
        }

        if !key.contains(FIELD_SEPARATOR) {
            return None;
        }

        let splits: Vec<&str> = key.split(FIELD_SEPARATOR).collect();
        if splits.iter().any(|s| s.is_empty()) {
            return None;
        }
        recursive_get(self.data.get(splits[0]), &splits[1..])
    }

    /// Removes the value at the field path `key`.
    ///
    /// Returns `true` if something was removed. Removing an absent field is not
    /// an error.
    pub fn remove(&mut self, key: &str) -> RtdResult<bool> {
        if self.data.contains_key(key) {
            self.data.remove(key);
            return Ok(true);
        }

        if !key.contains(FIELD_SEPARATOR) {
            return Ok(false);
        }

        let splits = split_path(key)?;
        Ok(self.deep_remove(&splits))
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Returns the document identifier, if one is set.
    ///
    /// Fails with [ErrorKind::InvalidId] if the `id` field holds anything other
    /// than a non-empty string.
    pub fn id(&self) -> RtdResult<Option<DocumentId>> {
        match self.data.get(DOC_ID) {
            None => Ok(None),
            Some(value) => DocumentId::from_value(value).map(Some),
        }
    }

    pub fn has_id(&self) -> bool {
        self.data.contains_key(DOC_ID)
    }

    pub(crate) fn set_id(&mut self, id: &DocumentId) {
        self.data.insert(DOC_ID.to_string(), Value::from(id.as_str()));
    }

    /// Retrieves all leaf field paths of this document, nested ones included.
    pub fn fields(&self) -> FieldVec {
        self.get_fields_internal("")
    }

    /// Merges `other` into this document.
    ///
    /// Nested documents present on both sides are merged recursively; any other
    /// value from `other` overwrites the existing one.
    pub fn merge(&mut self, other: &Document) {
        for (key, value) in other.data.iter() {
            match (self.data.get(key), value) {
                (Some(Value::Document(existing)), Value::Document(incoming)) => {
                    let mut merged = existing.clone();
                    merged.merge(incoming);
                    self.data.insert(key.clone(), Value::Document(merged));
                }
                _ => {
                    self.data.insert(key.clone(), value.clone());
                }
            }
        }
    }

    /// Iterates over the top-level entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.data.iter()
    }

    pub(crate) fn into_entries(self) -> impl Iterator<Item = (String, Value)> {
        self.data.into_iter()
    }

    /// Inserts a top-level key verbatim, without path interpretation.
    pub(crate) fn insert_raw(&mut self, key: String, value: Value) {
        self.data.insert(key, value);
    }

    /// Checks that no key at any depth is empty.
    pub fn validate(&self) -> RtdResult<()> {
        for (key, value) in self.data.iter() {
            if key.is_empty() {
                log::error!("Document does not support empty key");
                return Err(RtdError::new(
                    "Document does not support empty key",
                    ErrorKind::InvalidDocument,
                ));
            }
            validate_value(value)?;
        }
        Ok(())
    }

    /// Serializes the document to UTF-8 JSON bytes.
    pub fn to_bytes(&self) -> RtdResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserializes a document from UTF-8 JSON bytes.
    ///
    /// The top-level JSON value must be an object.
    pub fn from_bytes(bytes: &[u8]) -> RtdResult<Document> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Parses a document from a JSON string.
    pub fn from_json(json: &str) -> RtdResult<Document> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> RtdResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    fn get_fields_internal(&self, prefix: &str) -> FieldVec {
        let mut fields = FieldVec::new();

        for (key, value) in self.data.iter() {
            if key.is_empty() {
                continue;
            }

            let field = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}{}{}", prefix, FIELD_SEPARATOR, key)
            };

            match value {
                Value::Document(doc) if !doc.is_empty() => {
                    fields.append(&mut doc.get_fields_internal(&field));
                }
                _ => fields.push(field),
            }
        }
        fields
    }

    fn deep_put(&mut self, path: &str, splits: &[&str], value: Value) -> RtdResult<()> {
        let key = splits[0];
        if splits.len() == 1 {
            self.data.insert(key.to_string(), value);
            return Ok(());
        }

        let remaining = &splits[1..];
        let updated = match self.data.get(key) {
            None | Some(Value::Null) => {
                let mut nested = Document::new();
                nested.deep_put(path, remaining, value)?;
                Value::Document(nested)
            }
            Some(Value::Document(nested)) => {
                let mut nested = nested.clone();
                nested.deep_put(path, remaining, value)?;
                Value::Document(nested)
            }
            Some(Value::Array(array)) => {
                let mut array = array.clone();
                let index = array_index(path, remaining[0], array.len())?;
                if remaining.len() == 1 {
                    array[index] = value;
                } else {
                    let mut nested = match &array[index] {
                        Value::Null => Document::new(),
                        Value::Document(nested) => nested.clone(),
                        other => return Err(not_a_container(path, remaining[0], other)),
                    };
                    nested.deep_put(path, &remaining[1..], value)?;
                    array[index] = Value::Document(nested);
                }
                Value::Array(array)
            }
            Some(other) => return Err(not_a_container(path, key, other)),
        };
        self.data.insert(key.to_string(), updated);
        Ok(())
    }

    fn deep_remove(&mut self, splits: &[&str]) -> bool {
        let key = splits[0];
        if splits.len() == 1 {
            return self.data.remove(key).is_some();
        }

        let updated = match self.data.get(key) {
            Some(Value::Document(nested)) => {
                let mut nested = nested.clone();
                if !nested.deep_remove(&splits[1..]) {
                    return false;
                }
                Value::Document(nested)
            }
            Some(Value::Array(array)) => {
                let index = match splits[1].parse::<usize>() {
                    Ok(index) if index < array.len() => index,
                    _ => return false,
                };
                let mut array = array.clone();
                if splits.len() == 2 {
                    array.remove(index);
                } else {
                    match &mut array[index] {
                        Value::Document(nested) => {
                            if !nested.deep_remove(&splits[2..]) {
                                return false;
                            }
                        }
                        _ => return false,
                    }
                }
                Value::Array(array)
            }
            _ => return false,
        };
        self.data.insert(key.to_string(), updated);
        true
    }
}

fn split_path(key: &str) -> RtdResult<Vec<&str>> {
    let splits: Vec<&str> = key.split(FIELD_SEPARATOR).collect();
    if splits.iter().any(|s| s.is_empty()) {
        log::error!("Invalid field path '{}'", key);
        return Err(RtdError::new(
            &format!("Invalid field path '{}': empty field name", key),
            ErrorKind::InvalidDocument,
        ));
    }
    Ok(splits)
}

fn array_index(path: &str, segment: &str, len: usize) -> RtdResult<usize> {
    match segment.parse::<usize>() {
        Ok(index) if index < len => Ok(index),
        Ok(index) => {
            log::error!("Array index {} out of bound in '{}'", index, path);
            Err(RtdError::new(
                &format!("Array index {} out of bound in '{}'", index, path),
                ErrorKind::InvalidDocument,
            ))
        }
        Err(_) => {
            log::error!("Invalid array index '{}' in '{}'", segment, path);
            Err(RtdError::new(
                &format!("Invalid array index '{}' in '{}'", segment, path),
                ErrorKind::InvalidDocument,
            ))
        }
    }
}

fn not_a_container(path: &str, segment: &str, value: &Value) -> RtdError {
    log::error!("Cannot write '{}': '{}' is a {}", path, segment, value.type_name());
    RtdError::new(
        &format!(
            "Cannot write '{}': '{}' is a {}",
            path,
            segment,
            value.type_name()
        ),
        ErrorKind::InvalidDocument,
    )
}

fn validate_value(value: &Value) -> RtdResult<()> {
    match value {
        Value::Document(doc) => doc.validate(),
        Value::Array(items) => items.iter().try_for_each(validate_value),
        _ => Ok(()),
    }
}

fn recursive_get(value: Option<&Value>, splits: &[&str]) -> Option<Value> {
    let value = value?;
    if splits.is_empty() {
        return Some(value.clone());
    }

    match value {
        Value::Document(doc) => recursive_get(doc.data.get(splits[0]), &splits[1..]),
        Value::Array(array) => match splits[0].parse::<usize>() {
            Ok(index) => recursive_get(array.get(index), &splits[1..]),
            // not an index, collect the field from every element
            Err(_) => decompose(array, splits),
        },
        _ => None,
    }
}

fn decompose(array: &[Value], splits: &[&str]) -> Option<Value> {
    let mut items = Vec::with_capacity(array.len());
    for item in array {
        match recursive_get(Some(item), splits) {
            Some(Value::Array(values)) => items.extend(values),
            Some(value) => items.push(value),
            None => {}
        }
    }

    if items.is_empty() {
        None
    } else {
        Some(Value::Array(items))
    }
}

impl Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self
            .data
            .iter()
            .map(|(k, v)| format!("\"{}\": {}", k, v.to_debug_string()))
            .join(", ");
        write!(f, "{{{}}}", entries)
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_json() {
            Ok(json) => write!(f, "{}", json),
            Err(_) => write!(f, "{:?}", self),
        }
    }
}

pub fn normalize(value: &str) -> String {
    value.trim_matches('"').to_string()
}

/// Creates a [Document] with JSON-like syntax.
///
/// # Examples
///
/// ```rust
/// use rtd::doc;
///
/// let empty = doc!{};
///
/// let user = doc!{
///     "name": "Alice",
///     "age": 30,
///     "address": { "city": "Oslo" },
///     "tags": ["admin", "user"]
/// };
/// assert_eq!(user.size(), 4);
/// ```
#[macro_export]
macro_rules! doc {
    ({}) => {
        $crate::collection::Document::new()
    };

    () => {
        $crate::collection::Document::new()
    };

    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::doc!($($key : $value),*)
    };

    ($($key:tt : $value:tt),* $(,)?) => {
        {
            #[allow(unused_imports)]
            use $crate::doc_value;

            let mut doc = $crate::collection::Document::new();
            $(
                doc.put($crate::collection::normalize(stringify!($key)), $crate::doc_value!($value))
                .expect(&format!("Failed to put value {} in document", stringify!($value)));
            )*
            doc
        }
    };
}

/// Helper macro to convert values for the doc! macro.
#[macro_export]
macro_rules! doc_value {
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        {
            $crate::common::Value::Document($crate::doc!{ $($key : $value),* })
        }
    };

    ([ $($value:tt),* $(,)? ]) => {
        $crate::common::Value::Array(vec![$($crate::doc_value!($value)),*])
    };

    ($value:expr) => {
        $crate::common::Value::from($value)
    };
}
