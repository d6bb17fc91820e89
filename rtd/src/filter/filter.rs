use crate::collection::Document;
use crate::errors::RtdResult;
use std::any::Any;
use std::fmt::Display;
use std::ops::Deref;
use std::sync::Arc;

use super::parser::parse_filter;
use super::{AllFilter, AndFilter, NotFilter, OrFilter};

/// A predicate over documents.
///
/// Evaluation is total: a filter answers `true` or `false` for every document
/// and never fails. Every structural problem (unknown operator, wrong operand
/// type, bad pattern) is rejected when the filter is built.
pub trait FilterProvider: Any + Send + Sync + Display {
    /// Returns `true` if `entry` satisfies this filter.
    fn apply(&self, entry: &Document) -> bool;

    fn as_any(&self) -> &dyn Any;
}

/// A shareable, immutable filter.
///
/// Filters are built either from a filter document with [Filter::parse] or
/// programmatically with [field](super::field) and the combinators in this
/// module.
///
/// # Examples
///
/// ```rust
/// use rtd::doc;
/// use rtd::filter::{field, Filter};
///
/// let by_doc = Filter::parse(&doc! { "age": { "$gte": 18 }, "active": true }).unwrap();
/// let fluent = field("age").gte(18).and(field("active").eq(true));
///
/// let adult = doc! { "age": 30, "active": true };
/// assert!(by_doc.apply(&adult));
/// assert!(fluent.apply(&adult));
/// ```
#[derive(Clone)]
pub struct Filter {
    inner: Arc<dyn FilterProvider>,
}

impl Filter {
    pub fn new<T: FilterProvider + 'static>(inner: T) -> Self {
        Filter {
            inner: Arc::new(inner),
        }
    }

    /// Parses a filter document.
    ///
    /// Top-level keys are implicitly AND-ed. A plain field key matches by
    /// equality; a field mapped to an operator document (`{"$gt": 5}`) applies
    /// those operators. `$and`, `$or` and `$not` combine nested filter
    /// documents. An empty document matches everything.
    pub fn parse(document: &Document) -> RtdResult<Filter> {
        parse_filter(document)
    }

    pub fn and(&self, filter: Filter) -> Self {
        Filter::new(AndFilter::new(vec![self.clone(), filter]))
    }

    pub fn or(&self, filter: Filter) -> Self {
        Filter::new(OrFilter::new(vec![self.clone(), filter]))
    }

    pub fn not(&self) -> Self {
        Filter::new(NotFilter::new(self.clone()))
    }
}

impl Display for Filter {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl std::fmt::Debug for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Filter{}", self.inner)
    }
}

impl Deref for Filter {
    type Target = Arc<dyn FilterProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// A filter matching every document.
pub fn all() -> Filter {
    Filter::new(AllFilter)
}

pub fn and(filters: Vec<Filter>) -> Filter {
    Filter::new(AndFilter::new(filters))
}

pub fn or(filters: Vec<Filter>) -> Filter {
    Filter::new(OrFilter::new(filters))
}

pub fn not(filter: Filter) -> Filter {
    Filter::new(NotFilter::new(filter))
}

pub(crate) fn is_all_filter(filter: &Filter) -> bool {
    filter.as_any().is::<AllFilter>()
}
