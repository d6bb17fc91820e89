use crate::common::MAX_NAME_LENGTH;
use crate::errors::{ErrorKind, RtdError, RtdResult};

/// Checks that a database or collection name is path-safe.
///
/// Names are used verbatim as directory and file names by the file store, so
/// only ASCII letters, digits, `_` and `-` are accepted.
pub fn validate_name(what: &str, name: &str) -> RtdResult<()> {
    if name.is_empty() {
        log::error!("{} name cannot be empty", what);
        return Err(RtdError::new(
            &format!("{} name cannot be empty", what),
            ErrorKind::InvalidName,
        ));
    }

    if name.len() > MAX_NAME_LENGTH {
        log::error!("{} name '{}' is longer than {} characters", what, name, MAX_NAME_LENGTH);
        return Err(RtdError::new(
            &format!(
                "{} name '{}' is longer than {} characters",
                what, name, MAX_NAME_LENGTH
            ),
            ErrorKind::InvalidName,
        ));
    }

    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        log::error!("{} name '{}' contains invalid character {:?}", what, name, c);
        return Err(RtdError::new(
            &format!("{} name '{}' contains invalid character {:?}", what, name, c),
            ErrorKind::InvalidName,
        ));
    }

    Ok(())
}
