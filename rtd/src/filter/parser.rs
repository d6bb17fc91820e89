use crate::collection::Document;
use crate::common::{
    Value, FIELD_SEPARATOR, OP_AND, OP_CONTAINS, OP_EQ, OP_EXISTS, OP_GT, OP_GTE, OP_IN, OP_LT,
    OP_LTE, OP_NE, OP_NIN, OP_NOT, OP_OR, OP_REGEX,
};
use crate::errors::{ErrorKind, RtdError, RtdResult};

use super::{
    all, and, not, or, ComparisonFilter, ComparisonMode, ContainsFilter, EqualsFilter,
    ExistsFilter, Filter, InFilter, NotEqualsFilter, NotInFilter, RegexFilter,
};

/// Builds a [Filter] from a filter document.
pub(crate) fn parse_filter(document: &Document) -> RtdResult<Filter> {
    let mut clauses = Vec::with_capacity(document.size());
    for (key, value) in document.iter() {
        if key.starts_with('$') {
            clauses.push(parse_logical(key, value)?);
        } else {
            clauses.push(parse_field(key, value)?);
        }
    }
    Ok(combine(clauses))
}

fn combine(mut clauses: Vec<Filter>) -> Filter {
    match clauses.len() {
        0 => all(),
        1 => clauses.remove(0),
        _ => and(clauses),
    }
}

fn parse_logical(operator: &str, value: &Value) -> RtdResult<Filter> {
    match operator {
        OP_AND | OP_OR => {
            let items = match value {
                Value::Array(items) if !items.is_empty() => items,
                _ => {
                    return Err(invalid_filter(&format!(
                        "{} expects a non-empty array of filter documents",
                        operator
                    )))
                }
            };

            let mut filters = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Document(nested) => filters.push(parse_filter(nested)?),
                    other => {
                        return Err(invalid_filter(&format!(
                            "{} expects filter documents, found {}",
                            operator,
                            other.type_name()
                        )))
                    }
                }
            }

            if operator == OP_AND {
                Ok(and(filters))
            } else {
                Ok(or(filters))
            }
        }
        OP_NOT => match value {
            Value::Document(nested) => Ok(not(parse_filter(nested)?)),
            other => Err(invalid_filter(&format!(
                "{} expects a filter document, found {}",
                OP_NOT,
                other.type_name()
            ))),
        },
        _ => Err(invalid_filter(&format!(
            "Unknown top-level operator {}",
            operator
        ))),
    }
}

fn parse_field(field: &str, value: &Value) -> RtdResult<Filter> {
    if field.split(FIELD_SEPARATOR).any(|segment| segment.is_empty()) {
        return Err(invalid_filter(&format!("Invalid field path '{}'", field)));
    }

    let operators = match value {
        Value::Document(operators) if operators.iter().any(|(k, _)| k.starts_with('$')) => {
            operators
        }
        // a plain value, including a document without operators, is an equality match
        _ => return Ok(Filter::new(EqualsFilter::new(field.to_string(), value.clone()))),
    };

    if let Some((key, _)) = operators.iter().find(|(k, _)| !k.starts_with('$')) {
        return Err(invalid_filter(&format!(
            "Filter on '{}' mixes operators with plain field '{}'",
            field, key
        )));
    }

    let mut filters = Vec::with_capacity(operators.size());
    for (operator, operand) in operators.iter() {
        filters.push(parse_operator(field, operator, operand)?);
    }
    Ok(combine(filters))
}

fn parse_operator(field: &str, operator: &str, operand: &Value) -> RtdResult<Filter> {
    let field_name = field.to_string();
    match operator {
        OP_EQ => Ok(Filter::new(EqualsFilter::new(field_name, operand.clone()))),
        OP_NE => Ok(Filter::new(NotEqualsFilter::new(field_name, operand.clone()))),
        OP_GT => comparison(field, operator, operand, ComparisonMode::Greater),
        OP_GTE => comparison(field, operator, operand, ComparisonMode::GreaterEqual),
        OP_LT => comparison(field, operator, operand, ComparisonMode::Lesser),
        OP_LTE => comparison(field, operator, operand, ComparisonMode::LesserEqual),
        OP_EXISTS => match operand {
            Value::Bool(exists) => Ok(Filter::new(ExistsFilter::new(field_name, *exists))),
            other => Err(operand_error(field, operator, "a boolean", other)),
        },
        OP_IN => match operand {
            Value::Array(values) => Ok(Filter::new(InFilter::new(field_name, values.clone()))),
            other => Err(operand_error(field, operator, "an array", other)),
        },
        OP_NIN => match operand {
            Value::Array(values) => Ok(Filter::new(NotInFilter::new(field_name, values.clone()))),
            other => Err(operand_error(field, operator, "an array", other)),
        },
        OP_CONTAINS => Ok(Filter::new(ContainsFilter::new(field_name, operand.clone()))),
        OP_REGEX => match operand {
            Value::String(pattern) => Ok(Filter::new(RegexFilter::new(field_name, pattern)?)),
            other => Err(operand_error(field, operator, "a string", other)),
        },
        OP_NOT => match operand {
            // field-level negation: {"age": {"$not": {"$gt": 5}}}
            Value::Document(_) => Ok(not(parse_field(field, operand)?)),
            other => Err(operand_error(field, operator, "an operator document", other)),
        },
        _ => Err(invalid_filter(&format!(
            "Unknown operator {} on field '{}'",
            operator, field
        ))),
    }
}

fn comparison(field: &str, operator: &str, operand: &Value, mode: ComparisonMode) -> RtdResult<Filter> {
    match operand {
        Value::Int(_) | Value::Float(_) | Value::String(_) | Value::Bool(_) => Ok(Filter::new(
            ComparisonFilter::new(field.to_string(), operand.clone(), mode),
        )),
        other => Err(operand_error(field, operator, "a number, string or boolean", other)),
    }
}

fn operand_error(field: &str, operator: &str, expected: &str, found: &Value) -> RtdError {
    invalid_filter(&format!(
        "{} on '{}' expects {}, found {}",
        operator,
        field,
        expected,
        found.type_name()
    ))
}

fn invalid_filter(message: &str) -> RtdError {
    log::error!("{}", message);
    RtdError::new(message, ErrorKind::InvalidFilter)
}
