use crate::common::Value;
use crate::errors::RtdResult;

use super::{
    and, ComparisonFilter, ComparisonMode, ContainsFilter, EqualsFilter, ExistsFilter, Filter,
    InFilter, NotEqualsFilter, NotInFilter, RegexFilter,
};

/// Starts a fluent filter on a field path.
///
/// # Examples
///
/// ```rust
/// use rtd::filter::field;
///
/// let filter = field("address.city").eq("Oslo").and(field("age").between(18, 65));
/// ```
pub fn field(field_name: &str) -> FluentFilter {
    FluentFilter {
        field_name: field_name.to_string(),
    }
}

pub struct FluentFilter {
    field_name: String,
}

impl FluentFilter {
    #[inline]
    pub fn eq<T: Into<Value>>(self, value: T) -> Filter {
        Filter::new(EqualsFilter::new(self.field_name, value.into()))
    }

    #[inline]
    pub fn ne<T: Into<Value>>(self, value: T) -> Filter {
        Filter::new(NotEqualsFilter::new(self.field_name, value.into()))
    }

    #[inline]
    pub fn gt<T: Into<Value>>(self, value: T) -> Filter {
        self.compare(value.into(), ComparisonMode::Greater)
    }

    #[inline]
    pub fn gte<T: Into<Value>>(self, value: T) -> Filter {
        self.compare(value.into(), ComparisonMode::GreaterEqual)
    }

    #[inline]
    pub fn lt<T: Into<Value>>(self, value: T) -> Filter {
        self.compare(value.into(), ComparisonMode::Lesser)
    }

    #[inline]
    pub fn lte<T: Into<Value>>(self, value: T) -> Filter {
        self.compare(value.into(), ComparisonMode::LesserEqual)
    }

    /// Inclusive range on both ends.
    pub fn between<T: Into<Value>>(self, lower_bound: T, upper_bound: T) -> Filter {
        and(vec![
            Filter::new(ComparisonFilter::new(
                self.field_name.clone(),
                lower_bound.into(),
                ComparisonMode::GreaterEqual,
            )),
            Filter::new(ComparisonFilter::new(
                self.field_name,
                upper_bound.into(),
                ComparisonMode::LesserEqual,
            )),
        ])
    }

    pub fn exists(self) -> Filter {
        Filter::new(ExistsFilter::new(self.field_name, true))
    }

    pub fn not_exists(self) -> Filter {
        Filter::new(ExistsFilter::new(self.field_name, false))
    }

    pub fn in_array<T: Into<Value>>(self, values: Vec<T>) -> Filter {
        Filter::new(InFilter::new(
            self.field_name,
            values.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn not_in_array<T: Into<Value>>(self, values: Vec<T>) -> Filter {
        Filter::new(NotInFilter::new(
            self.field_name,
            values.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn contains<T: Into<Value>>(self, value: T) -> Filter {
        Filter::new(ContainsFilter::new(self.field_name, value.into()))
    }

    /// Fails with `InvalidFilter` if `pattern` does not compile.
    pub fn regex(self, pattern: &str) -> RtdResult<Filter> {
        Ok(Filter::new(RegexFilter::new(self.field_name, pattern)?))
    }

    fn compare(self, value: Value, mode: ComparisonMode) -> Filter {
        Filter::new(ComparisonFilter::new(self.field_name, value, mode))
    }
}
