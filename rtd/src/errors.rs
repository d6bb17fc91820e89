use backtrace::Backtrace;
use serde::{de, ser};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;

use std::sync::Arc;

/// Error kinds for rtd operations.
///
/// Every failure the engine reports carries exactly one kind so that an outer
/// transport layer can map it onto its own status signalling without parsing
/// messages.
///
/// # Examples
///
/// ```rust,ignore
/// use rtd::errors::{RtdError, ErrorKind, RtdResult};
///
/// fn example() -> RtdResult<()> {
///     Err(RtdError::new("Database 'app' not found", ErrorKind::NotFound))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    /// A database, collection or document does not exist
    NotFound,
    /// A database with the same name already exists
    AlreadyExists,
    /// An inserted document carries an id already present in its collection
    DuplicateId,
    /// An update tried to modify the identifier field
    ImmutableField,
    /// A filter expression could not be parsed
    InvalidFilter,
    /// An update spec could not be parsed or applied
    InvalidUpdate,
    /// A structural change (such as a dropped collection) raced the operation
    Conflict,

    /// A database or collection name is empty or not path-safe
    InvalidName,
    /// A document identifier is not a non-empty string
    InvalidId,
    /// A document is structurally invalid (for example an empty field name)
    InvalidDocument,
    /// The mutation gate could not be entered before the deadline
    Timeout,
    /// The engine has been closed
    StoreClosed,
    /// The engine was configured inconsistently
    ConfigError,
    /// The change-event bus rejected a subscription or a publish
    EventError,

    /// Error encoding or decoding documents
    EncodingError,
    /// Generic IO error from the storage backend
    IOError,
    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::NotFound => write!(f, "Not found"),
            ErrorKind::AlreadyExists => write!(f, "Already exists"),
            ErrorKind::DuplicateId => write!(f, "Duplicate id"),
            ErrorKind::ImmutableField => write!(f, "Immutable field"),
            ErrorKind::InvalidFilter => write!(f, "Invalid filter"),
            ErrorKind::InvalidUpdate => write!(f, "Invalid update"),
            ErrorKind::Conflict => write!(f, "Conflict"),
            ErrorKind::InvalidName => write!(f, "Invalid name"),
            ErrorKind::InvalidId => write!(f, "Invalid id"),
            ErrorKind::InvalidDocument => write!(f, "Invalid document"),
            ErrorKind::Timeout => write!(f, "Timeout"),
            ErrorKind::StoreClosed => write!(f, "Store closed"),
            ErrorKind::ConfigError => write!(f, "Configuration error"),
            ErrorKind::EventError => write!(f, "Event error"),
            ErrorKind::EncodingError => write!(f, "Encoding error"),
            ErrorKind::IOError => write!(f, "IO error"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// The entity an error is about.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Entity {
    Database(String),
    Collection {
        database: String,
        collection: String,
    },
    Document {
        database: String,
        collection: String,
        id: String,
    },
}

impl Display for Entity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Entity::Database(name) => write!(f, "database '{}'", name),
            Entity::Collection {
                database,
                collection,
            } => write!(f, "collection '{}/{}'", database, collection),
            Entity::Document {
                database,
                collection,
                id,
            } => write!(f, "document '{}/{}/{}'", database, collection, id),
        }
    }
}

/// Custom rtd error type.
///
/// `RtdError` carries a message, an [ErrorKind], the [Entity] involved when there
/// is one, and an optional cause. A backtrace is captured on construction and
/// printed by the `Debug` representation.
///
/// # Examples
///
/// ```rust,ignore
/// use rtd::errors::{RtdError, ErrorKind, Entity};
///
/// let err = RtdError::new("Database 'app' not found", ErrorKind::NotFound)
///     .with_entity(Entity::Database("app".to_string()));
/// ```
#[derive(Clone)]
pub struct RtdError {
    message: String,
    error_kind: ErrorKind,
    entity: Option<Entity>,
    cause: Option<Box<RtdError>>,
    backtrace: Arc<Backtrace>,
}

impl RtdError {
    /// Creates a new `RtdError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        RtdError {
            message: message.to_string(),
            error_kind,
            entity: None,
            cause: None,
            backtrace: Arc::new(Backtrace::new()),
        }
    }

    /// Creates a new `RtdError` with a cause error.
    ///
    /// This creates an error chain where the cause error is preserved for debugging.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: RtdError) -> Self {
        RtdError {
            message: message.to_string(),
            error_kind,
            entity: cause.entity.clone(),
            cause: Some(Box::new(cause)),
            backtrace: Arc::new(Backtrace::new()),
        }
    }

    /// Attaches the entity this error is about.
    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Attaches `entity` to an error raised without one and names it in the
    /// message. An error that already carries an entity is returned as is.
    pub fn about(mut self, entity: Entity) -> Self {
        if self.entity.is_none() {
            self.message = format!("{}: {}", entity, self.message);
            self.entity = Some(entity);
        }
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn entity(&self) -> Option<&Entity> {
        self.entity.as_ref()
    }

    pub fn cause(&self) -> Option<&RtdError> {
        self.cause.as_deref()
    }
}

impl Display for RtdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for RtdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match &self.cause {
            Some(cause) => write!(f, "[{}] {}\nCaused by: {:?}", self.error_kind, self.message, cause),
            None => write!(
                f,
                "[{}] {}\n{:?}",
                self.error_kind,
                self.message,
                self.backtrace
            ),
        }
    }
}

impl Error for RtdError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for rtd operations.
///
/// `RtdResult<T>` is shorthand for `Result<T, RtdError>`.
/// All fallible engine operations return this type.
pub type RtdResult<T> = Result<T, RtdError>;

impl de::Error for RtdError {
    fn custom<T: Display>(msg: T) -> Self {
        RtdError::new(&msg.to_string(), ErrorKind::EncodingError)
    }
}

impl ser::Error for RtdError {
    fn custom<T: Display>(msg: T) -> Self {
        RtdError::new(&msg.to_string(), ErrorKind::EncodingError)
    }
}

impl From<std::io::Error> for RtdError {
    fn from(err: std::io::Error) -> Self {
        let error_kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            _ => ErrorKind::IOError,
        };
        RtdError::new(&format!("IO error: {}", err), error_kind)
    }
}

impl From<serde_json::Error> for RtdError {
    fn from(err: serde_json::Error) -> Self {
        RtdError::new(
            &format!("Document encoding error: {}", err),
            ErrorKind::EncodingError,
        )
    }
}

impl From<std::string::FromUtf8Error> for RtdError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        RtdError::new(
            &format!("UTF-8 encoding error: {}", err),
            ErrorKind::EncodingError,
        )
    }
}
