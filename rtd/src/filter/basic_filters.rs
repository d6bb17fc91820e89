use std::any::Any;
use std::fmt::Display;

use crate::collection::Document;
use crate::common::Value;

use super::FilterProvider;

pub(crate) struct AllFilter;

impl FilterProvider for AllFilter {
    fn apply(&self, _entry: &Document) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Display for AllFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AllFilter")
    }
}

/// Matches documents whose field equals the given value.
///
/// A missing field never matches, not even `null`: `{"a": null}` selects only
/// documents where `a` is present and explicitly null.
pub(crate) struct EqualsFilter {
    field_name: String,
    field_value: Value,
}

impl EqualsFilter {
    #[inline]
    pub(crate) fn new(field_name: String, field_value: Value) -> Self {
        EqualsFilter {
            field_name,
            field_value,
        }
    }
}

impl Display for EqualsFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} == {})", self.field_name, self.field_value)
    }
}

impl FilterProvider for EqualsFilter {
    #[inline]
    fn apply(&self, entry: &Document) -> bool {
        match entry.get(&self.field_name) {
            Some(value) => value == self.field_value,
            None => false,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Matches documents whose field is absent or differs from the given value.
pub(crate) struct NotEqualsFilter {
    field_name: String,
    field_value: Value,
}

impl NotEqualsFilter {
    #[inline]
    pub(crate) fn new(field_name: String, field_value: Value) -> Self {
        NotEqualsFilter {
            field_name,
            field_value,
        }
    }
}

impl Display for NotEqualsFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} != {})", self.field_name, self.field_value)
    }
}

impl FilterProvider for NotEqualsFilter {
    #[inline]
    fn apply(&self, entry: &Document) -> bool {
        match entry.get(&self.field_name) {
            Some(value) => value != self.field_value,
            None => true,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Matches on field presence. A field explicitly set to null is present.
pub(crate) struct ExistsFilter {
    field_name: String,
    exists: bool,
}

impl ExistsFilter {
    pub(crate) fn new(field_name: String, exists: bool) -> Self {
        ExistsFilter { field_name, exists }
    }
}

impl Display for ExistsFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} exists {})", self.field_name, self.exists)
    }
}

impl FilterProvider for ExistsFilter {
    fn apply(&self, entry: &Document) -> bool {
        entry.contains_field(&self.field_name) == self.exists
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
