use std::any::Any;
use std::cmp::Ordering;
use std::fmt::Display;

use crate::collection::Document;
use crate::common::Value;

use super::FilterProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ComparisonMode {
    Greater,
    GreaterEqual,
    Lesser,
    LesserEqual,
}

impl ComparisonMode {
    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            ComparisonMode::Greater => ordering == Ordering::Greater,
            ComparisonMode::GreaterEqual => ordering != Ordering::Less,
            ComparisonMode::Lesser => ordering == Ordering::Less,
            ComparisonMode::LesserEqual => ordering != Ordering::Greater,
        }
    }
}

impl Display for ComparisonMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComparisonMode::Greater => write!(f, ">"),
            ComparisonMode::GreaterEqual => write!(f, ">="),
            ComparisonMode::Lesser => write!(f, "<"),
            ComparisonMode::LesserEqual => write!(f, "<="),
        }
    }
}

/// Orders a field against a bound.
///
/// Only like kinds compare (numbers, strings, booleans); a missing field or an
/// incomparable pairing does not match.
pub(crate) struct ComparisonFilter {
    field_name: String,
    field_value: Value,
    mode: ComparisonMode,
}

impl ComparisonFilter {
    pub(crate) fn new(field_name: String, field_value: Value, mode: ComparisonMode) -> Self {
        ComparisonFilter {
            field_name,
            field_value,
            mode,
        }
    }
}

impl Display for ComparisonFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} {} {})", self.field_name, self.mode, self.field_value)
    }
}

impl FilterProvider for ComparisonFilter {
    fn apply(&self, entry: &Document) -> bool {
        entry
            .get(&self.field_name)
            .and_then(|value| value.compare(&self.field_value))
            .map(|ordering| self.mode.accepts(ordering))
            .unwrap_or(false)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Matches documents whose field equals one of the given values.
pub(crate) struct InFilter {
    field_name: String,
    values: Vec<Value>,
}

impl InFilter {
    pub(crate) fn new(field_name: String, values: Vec<Value>) -> Self {
        InFilter { field_name, values }
    }
}

impl Display for InFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} in {})", self.field_name, Value::Array(self.values.clone()))
    }
}

impl FilterProvider for InFilter {
    fn apply(&self, entry: &Document) -> bool {
        match entry.get(&self.field_name) {
            Some(value) => self.values.contains(&value),
            None => false,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Matches documents whose field is absent or equals none of the given values.
pub(crate) struct NotInFilter {
    field_name: String,
    values: Vec<Value>,
}

impl NotInFilter {
    pub(crate) fn new(field_name: String, values: Vec<Value>) -> Self {
        NotInFilter { field_name, values }
    }
}

impl Display for NotInFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({} not in {})",
            self.field_name,
            Value::Array(self.values.clone())
        )
    }
}

impl FilterProvider for NotInFilter {
    fn apply(&self, entry: &Document) -> bool {
        match entry.get(&self.field_name) {
            Some(value) => !self.values.contains(&value),
            None => true,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
