use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;
use std::sync::Arc;

/// Error kinds for Ember operations.
///
/// Each kind names one category of failure so callers can react to it
/// without parsing messages.
///
/// # Examples
///
/// ```rust
/// use ember::errors::{EmberError, EmberResult, ErrorKind};
///
/// fn example() -> EmberResult<()> {
///     Err(EmberError::new("row not found", ErrorKind::RowNotFound))
/// }
/// assert!(example().is_err());
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // Index definition errors
    /// The requested index configuration cannot be served by the index type
    UnsupportedIndexConfiguration,

    // Value errors
    /// Geometry text or binary could not be parsed or encoded
    MalformedGeometry,
    /// A value has the wrong type for the operation
    InvalidDataType,

    // Index consistency errors
    /// An index entry expected to exist was not found
    RowNotFound,
    /// The row already has an entry in the index
    DuplicateRow,
    /// The operation is not valid in the current lifecycle state (e.g. closed)
    InvalidState,

    // IO and storage errors
    /// Generic IO error
    IOError,
    /// The file was not found
    FileNotFound,
    /// Permission denied for file operation
    PermissionDenied,
    /// File data is corrupted
    FileCorrupted,
    /// Error encoding or decoding stored data
    EncodingError,

    /// Error from an extension crate (e.g. "Spatial")
    Extension(String),

    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::UnsupportedIndexConfiguration => {
                write!(f, "Unsupported index configuration")
            }
            ErrorKind::MalformedGeometry => write!(f, "Malformed geometry"),
            ErrorKind::InvalidDataType => write!(f, "Invalid data type"),
            ErrorKind::RowNotFound => write!(f, "Row not found"),
            ErrorKind::DuplicateRow => write!(f, "Duplicate row"),
            ErrorKind::InvalidState => write!(f, "Invalid state"),
            ErrorKind::IOError => write!(f, "IO error"),
            ErrorKind::FileNotFound => write!(f, "File not found"),
            ErrorKind::PermissionDenied => write!(f, "Permission denied"),
            ErrorKind::FileCorrupted => write!(f, "File corrupted"),
            ErrorKind::EncodingError => write!(f, "Encoding error"),
            ErrorKind::Extension(name) => write!(f, "{} error", name),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Ember error type.
///
/// Carries a message, an [`ErrorKind`], an optional cause and the backtrace
/// captured where the error was created.
///
/// ```rust
/// use ember::errors::{EmberError, ErrorKind};
///
/// let cause = EmberError::new("short read", ErrorKind::IOError);
/// let err = EmberError::new_with_cause("page load failed", ErrorKind::FileCorrupted, cause);
/// assert_eq!(err.kind(), &ErrorKind::FileCorrupted);
/// ```
#[derive(Clone)]
pub struct EmberError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<EmberError>>,
    backtrace: Arc<Backtrace>,
}

impl EmberError {
    /// Creates a new `EmberError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        EmberError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: Arc::new(Backtrace::new()),
        }
    }

    /// Creates a new `EmberError` that keeps `cause` in its error chain.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: EmberError) -> Self {
        EmberError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: Arc::new(Backtrace::new()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&EmberError> {
        self.cause.as_deref()
    }
}

impl Display for EmberError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for EmberError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // message with stack trace, followed by the cause chain
        match &self.cause {
            Some(cause) => write!(f, "{}: {}\nCaused by: {:?}", self.error_kind, self.message, cause),
            None => write!(f, "{}: {}\n{:?}", self.error_kind, self.message, self.backtrace),
        }
    }
}

impl Error for EmberError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// Shorthand for `Result<T, EmberError>`.
pub type EmberResult<T> = Result<T, EmberError>;

impl From<std::io::Error> for EmberError {
    fn from(err: std::io::Error) -> Self {
        let error_kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            std::io::ErrorKind::InvalidData | std::io::ErrorKind::UnexpectedEof => {
                ErrorKind::FileCorrupted
            }
            _ => ErrorKind::IOError,
        };
        EmberError::new(&format!("IO error: {}", err), error_kind)
    }
}

impl From<std::string::FromUtf8Error> for EmberError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        EmberError::new(
            &format!("UTF-8 encoding error: {}", err),
            ErrorKind::EncodingError,
        )
    }
}

impl From<std::num::ParseIntError> for EmberError {
    fn from(err: std::num::ParseIntError) -> Self {
        EmberError::new(
            &format!("Integer parsing error: {}", err),
            ErrorKind::InvalidDataType,
        )
    }
}

impl From<std::num::ParseFloatError> for EmberError {
    fn from(err: std::num::ParseFloatError) -> Self {
        EmberError::new(
            &format!("Float parsing error: {}", err),
            ErrorKind::InvalidDataType,
        )
    }
}
