use std::fmt::Display;

use crate::collection::Document;
use crate::common::{Value, DOC_ID, FIELD_SEPARATOR, OP_INC, OP_PUSH, OP_SET, OP_UNSET};
use crate::errors::{ErrorKind, RtdError, RtdResult};

/// A single field assignment of an update.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOperation {
    /// Sets the field, creating intermediate documents as needed.
    Set { field: String, value: Value },
    /// Merges a document into the field when it already holds one, otherwise
    /// sets it.
    Merge { field: String, value: Document },
    /// Removes the field. Removing an absent field is a no-op.
    Unset { field: String },
    /// Adds a number to a numeric field. An absent field is set to the amount.
    Increment { field: String, by: Value },
    /// Appends to an array field. An absent field becomes a one-element array.
    Push { field: String, value: Value },
}

impl UpdateOperation {
    pub fn field(&self) -> &str {
        match self {
            UpdateOperation::Set { field, .. }
            | UpdateOperation::Merge { field, .. }
            | UpdateOperation::Unset { field }
            | UpdateOperation::Increment { field, .. }
            | UpdateOperation::Push { field, .. } => field,
        }
    }

    fn validate(&self) -> RtdResult<()> {
        let field = self.field();
        if field == DOC_ID || field.starts_with(&format!("{}{}", DOC_ID, FIELD_SEPARATOR)) {
            log::error!("Update cannot modify the '{}' field", DOC_ID);
            return Err(RtdError::new(
                &format!("Update cannot modify the '{}' field ({})", DOC_ID, self),
                ErrorKind::ImmutableField,
            ));
        }

        if field.split(FIELD_SEPARATOR).any(|segment| segment.is_empty()) {
            return Err(invalid_update(&format!("Invalid field path '{}'", field)));
        }

        if let UpdateOperation::Increment { by, .. } = self {
            if !by.as_number().is_some_and(f64::is_finite) {
                return Err(invalid_update(&format!(
                    "{} on '{}' expects a finite number, found {}",
                    OP_INC, field, by
                )));
            }
        }
        Ok(())
    }

    fn apply(&self, document: &mut Document) -> RtdResult<()> {
        match self {
            UpdateOperation::Set { field, value } => document.put(field.as_str(), value.clone()),
            UpdateOperation::Merge { field, value } => {
                let merged = match document.get(field) {
                    Some(Value::Document(mut current)) => {
                        current.merge(value);
                        current
                    }
                    _ => value.clone(),
                };
                document.put(field.as_str(), Value::Document(merged))
            }
            UpdateOperation::Unset { field } => document.remove(field).map(|_| ()),
            UpdateOperation::Increment { field, by } => {
                let updated = match document.get(field) {
                    None | Some(Value::Null) => by.clone(),
                    Some(current) => add(field, &current, by)?,
                };
                document.put(field.as_str(), updated)
            }
            UpdateOperation::Push { field, value } => {
                let updated = match document.get(field) {
                    None | Some(Value::Null) => Value::Array(vec![value.clone()]),
                    Some(Value::Array(mut items)) => {
                        items.push(value.clone());
                        Value::Array(items)
                    }
                    Some(other) => {
                        return Err(invalid_update(&format!(
                            "{} on '{}' expects an array, found {}",
                            OP_PUSH,
                            field,
                            other.type_name()
                        )))
                    }
                };
                document.put(field.as_str(), updated)
            }
        }
    }
}

impl Display for UpdateOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateOperation::Set { field, value } => write!(f, "{} {} = {}", OP_SET, field, value),
            UpdateOperation::Merge { field, value } => write!(f, "{} <- {}", field, value),
            UpdateOperation::Unset { field } => write!(f, "{} {}", OP_UNSET, field),
            UpdateOperation::Increment { field, by } => write!(f, "{} {} += {}", OP_INC, field, by),
            UpdateOperation::Push { field, value } => write!(f, "{} {} << {}", OP_PUSH, field, value),
        }
    }
}

fn add(field: &str, current: &Value, by: &Value) -> RtdResult<Value> {
    match (current, by) {
        (Value::Int(a), Value::Int(b)) => match a.checked_add(*b) {
            Some(sum) => Ok(Value::Int(sum)),
            None => Err(invalid_update(&format!(
                "{} on '{}' overflows: {} + {}",
                OP_INC, field, a, b
            ))),
        },
        _ => match (current.as_number(), by.as_number()) {
            (Some(a), Some(b)) if (a + b).is_finite() => Ok(Value::Float(a + b)),
            (Some(a), Some(b)) => Err(invalid_update(&format!(
                "{} on '{}' overflows: {} + {}",
                OP_INC, field, a, b
            ))),
            _ => Err(invalid_update(&format!(
                "{} on '{}' expects a numeric field, found {}",
                OP_INC,
                field,
                current.type_name()
            ))),
        },
    }
}

fn invalid_update(message: &str) -> RtdError {
    log::error!("{}", message);
    RtdError::new(message, ErrorKind::InvalidUpdate)
}

/// A parsed, validated update.
///
/// An update document takes one of two forms:
///
/// * plain: `{"name": "Bob", "address.city": "Oslo"}` sets each listed field;
///   a document value is merged into an existing document field, so
///   `{"address": {"city": "Oslo"}}` keeps the other address fields;
/// * operator: `{"$set": {..}, "$unset": {..}, "$inc": {..}, "$push": {..}}`.
///
/// Mixing the two forms, an empty update, an unknown operator, or touching the
/// `id` field is rejected at parse time.
///
/// Applying an update never modifies its input. It works on a copy and either
/// every assignment succeeds or the first failing one is reported as
/// [ErrorKind::InvalidUpdate] and nothing changes.
///
/// # Examples
///
/// ```rust
/// use rtd::doc;
/// use rtd::common::Value;
/// use rtd::update::UpdateSpec;
///
/// let spec = UpdateSpec::parse(&doc! { "$inc": { "visits": 1 }, "$set": { "seen": true } }).unwrap();
/// let updated = spec.apply(&doc! { "id": "1", "visits": 41 }).unwrap();
/// assert_eq!(updated.get("visits"), Some(Value::Int(42)));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateSpec {
    operations: Vec<UpdateOperation>,
}

impl UpdateSpec {
    pub fn new() -> Self {
        UpdateSpec::default()
    }

    /// Parses an update document.
    pub fn parse(document: &Document) -> RtdResult<UpdateSpec> {
        if document.is_empty() {
            return Err(invalid_update("Update document is empty"));
        }

        let operator_keys = document.iter().filter(|(k, _)| k.starts_with('$')).count();
        let operations = if operator_keys == 0 {
            document
                .iter()
                .map(|(field, value)| match value {
                    Value::Document(nested) => UpdateOperation::Merge {
                        field: field.clone(),
                        value: nested.clone(),
                    },
                    _ => UpdateOperation::Set {
                        field: field.clone(),
                        value: value.clone(),
                    },
                })
                .collect()
        } else if operator_keys == document.size() {
            let mut operations = Vec::new();
            for (operator, operand) in document.iter() {
                parse_operator(operator, operand, &mut operations)?;
            }
            operations
        } else {
            return Err(invalid_update(
                "Update document mixes operators with plain fields",
            ));
        };

        UpdateSpec::from_operations(operations)
    }

    /// Builds a spec from explicit operations, validating each of them.
    pub fn from_operations(operations: Vec<UpdateOperation>) -> RtdResult<UpdateSpec> {
        if operations.is_empty() {
            return Err(invalid_update("Update has no assignments"));
        }
        for operation in &operations {
            operation.validate()?;
        }
        Ok(UpdateSpec { operations })
    }

    pub fn set<T: Into<Value>>(mut self, field: &str, value: T) -> Self {
        self.operations.push(UpdateOperation::Set {
            field: field.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn unset(mut self, field: &str) -> Self {
        self.operations.push(UpdateOperation::Unset {
            field: field.to_string(),
        });
        self
    }

    pub fn inc<T: Into<Value>>(mut self, field: &str, by: T) -> Self {
        self.operations.push(UpdateOperation::Increment {
            field: field.to_string(),
            by: by.into(),
        });
        self
    }

    pub fn push<T: Into<Value>>(mut self, field: &str, value: T) -> Self {
        self.operations.push(UpdateOperation::Push {
            field: field.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn operations(&self) -> &[UpdateOperation] {
        &self.operations
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Applies every assignment, in order, to a copy of `document`.
    pub fn apply(&self, document: &Document) -> RtdResult<Document> {
        if self.operations.is_empty() {
            return Err(invalid_update("Update has no assignments"));
        }

        let mut updated = document.clone();
        for (index, operation) in self.operations.iter().enumerate() {
            operation.validate()?;
            if let Err(cause) = operation.apply(&mut updated) {
                log::error!("Update assignment #{} ({}) failed: {}", index + 1, operation, cause);
                return Err(RtdError::new_with_cause(
                    &format!(
                        "Update assignment #{} ({}) failed: {}",
                        index + 1,
                        operation,
                        cause.message()
                    ),
                    ErrorKind::InvalidUpdate,
                    cause,
                ));
            }
        }
        Ok(updated)
    }
}

fn parse_operator(operator: &str, operand: &Value, operations: &mut Vec<UpdateOperation>) -> RtdResult<()> {
    if operator == OP_UNSET {
        return parse_unset(operand, operations);
    }

    let fields = match operand {
        Value::Document(fields) => fields,
        other => {
            return Err(invalid_update(&format!(
                "{} expects a document of fields, found {}",
                operator,
                other.type_name()
            )))
        }
    };

    for (field, value) in fields.iter() {
        let field = field.clone();
        let value = value.clone();
        let operation = match operator {
            OP_SET => UpdateOperation::Set { field, value },
            OP_INC => UpdateOperation::Increment { field, by: value },
            OP_PUSH => UpdateOperation::Push { field, value },
            _ => return Err(invalid_update(&format!("Unknown update operator {}", operator))),
        };
        operations.push(operation);
    }
    Ok(())
}

fn parse_unset(operand: &Value, operations: &mut Vec<UpdateOperation>) -> RtdResult<()> {
    let mut push = |field: &str| {
        operations.push(UpdateOperation::Unset {
            field: field.to_string(),
        })
    };

    match operand {
        // {"$unset": {"a": "", "b.c": 1}}, values are ignored
        Value::Document(fields) => fields.iter().for_each(|(field, _)| push(field)),
        Value::String(field) => push(field),
        Value::Array(fields) => {
            for field in fields {
                match field {
                    Value::String(field) => push(field),
                    other => {
                        return Err(invalid_update(&format!(
                            "{} expects field names, found {}",
                            OP_UNSET,
                            other.type_name()
                        )))
                    }
                }
            }
        }
        other => {
            return Err(invalid_update(&format!(
                "{} expects a document, array or string, found {}",
                OP_UNSET,
                other.type_name()
            )))
        }
    }
    Ok(())
}
