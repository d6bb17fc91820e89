use crate::common::{Value, DOC_ID};
use crate::errors::{ErrorKind, RtdError, RtdResult};
use crate::ID_GENERATOR;
use std::borrow::Borrow;
use std::fmt::{Debug, Display};

/// A unique identifier for a document within its collection.
///
/// Ids are non-empty strings stored in the `id` field of the document. When a
/// document is inserted without one, the engine generates a fresh id from a
/// snowflake generator and renders it as a decimal string, so generated ids sort
/// roughly by creation time.
///
/// # Examples
///
/// ```rust
/// use rtd::collection::DocumentId;
///
/// let generated = DocumentId::new();
/// assert!(!generated.as_str().is_empty());
///
/// let explicit = DocumentId::create_id("user-42").unwrap();
/// assert_eq!(explicit.as_str(), "user-42");
/// assert!(DocumentId::create_id("").is_err());
/// ```
#[derive(PartialEq, Eq, Ord, PartialOrd, Hash, Clone, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Generates a new unique `DocumentId`.
    pub fn new() -> Self {
        DocumentId(ID_GENERATOR.get_id().to_string())
    }

    /// Wraps a caller supplied id. Fails with [ErrorKind::InvalidId] if empty.
    pub fn create_id(value: &str) -> RtdResult<Self> {
        if value.is_empty() {
            log::error!("Document id cannot be empty");
            return Err(RtdError::new(
                "Document id cannot be empty",
                ErrorKind::InvalidId,
            ));
        }
        Ok(DocumentId(value.to_string()))
    }

    /// Extracts an id from the value of a document's `id` field.
    pub fn from_value(value: &Value) -> RtdResult<Self> {
        match value {
            Value::String(id) => DocumentId::create_id(id),
            other => {
                log::error!("Document field '{}' must be a string, found {}", DOC_ID, other.type_name());
                Err(RtdError::new(
                    &format!(
                        "Document field '{}' must be a string, found {}",
                        DOC_ID,
                        other.type_name()
                    ),
                    ErrorKind::InvalidId,
                ))
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl Borrow<str> for DocumentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Debug for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DocumentId({})", self.0)
    }
}

impl From<DocumentId> for Value {
    fn from(id: DocumentId) -> Self {
        Value::String(id.0)
    }
}

impl From<&DocumentId> for Value {
    fn from(id: &DocumentId) -> Self {
        Value::String(id.0.clone())
    }
}
