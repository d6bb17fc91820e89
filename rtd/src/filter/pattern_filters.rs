use std::any::Any;
use std::fmt::Display;

use regex::Regex;

use crate::collection::Document;
use crate::common::Value;
use crate::errors::{ErrorKind, RtdError, RtdResult};

use super::FilterProvider;

/// Matches string fields against a regular expression.
///
/// The pattern is compiled once, when the filter is built. Non-string fields
/// never match.
pub(crate) struct RegexFilter {
    field_name: String,
    pattern: Regex,
}

impl RegexFilter {
    pub(crate) fn new(field_name: String, pattern: &str) -> RtdResult<Self> {
        match Regex::new(pattern) {
            Ok(pattern) => Ok(RegexFilter {
                field_name,
                pattern,
            }),
            Err(err) => {
                log::error!("Invalid regex pattern '{}' for field {}: {}", pattern, field_name, err);
                Err(RtdError::new(
                    &format!("Invalid regex pattern '{}' for field {}: {}", pattern, field_name, err),
                    ErrorKind::InvalidFilter,
                ))
            }
        }
    }
}

impl Display for RegexFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} regex {})", self.field_name, self.pattern.as_str())
    }
}

impl FilterProvider for RegexFilter {
    fn apply(&self, entry: &Document) -> bool {
        match entry.get(&self.field_name) {
            Some(Value::String(text)) => self.pattern.is_match(&text),
            _ => false,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Membership test.
///
/// On an array field it matches if any element equals the value; on a string
/// field with a string value it is a substring test. Anything else does not
/// match.
pub(crate) struct ContainsFilter {
    field_name: String,
    field_value: Value,
}

impl ContainsFilter {
    pub(crate) fn new(field_name: String, field_value: Value) -> Self {
        ContainsFilter {
            field_name,
            field_value,
        }
    }
}

impl Display for ContainsFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} contains {})", self.field_name, self.field_value)
    }
}

impl FilterProvider for ContainsFilter {
    fn apply(&self, entry: &Document) -> bool {
        match (entry.get(&self.field_name), &self.field_value) {
            (Some(Value::Array(items)), value) => items.contains(value),
            (Some(Value::String(text)), Value::String(needle)) => text.contains(needle.as_str()),
            _ => false,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
