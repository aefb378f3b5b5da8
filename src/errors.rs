//
// DavError: the single error type all handlers return. Converted to an
// HTTP response exactly once, at the dispatcher's outer boundary
// (`DavHandler::handle_inner`).
//
use std::fmt;
use std::io;

use http::StatusCode;

use crate::fs::FsError;

#[derive(Debug)]
pub enum DavError {
    /// A plain status code, nothing more to say about it.
    Status(StatusCode),
    /// Like `Status`, but also ask the caller to close the connection.
    /// Used for the cases where a client might otherwise get confused
    /// about how much of the response body is left to read.
    StatusClose(StatusCode),
    /// A filesystem-level error, mapped to a status code lazily.
    FsError(FsError),
    /// An I/O error reading the request body.
    IoError(io::Error),
    /// The HTTP method is not a (recognized) WebDAV method.
    UnknownDavMethod,
    /// Malformed XML in the request body.
    XmlParseError,
}

pub type DavResult<T> = Result<T, DavError>;

impl DavError {
    /// Map this error onto the HTTP status code it should produce.
    pub fn statuscode(&self) -> StatusCode {
        match self {
            DavError::Status(s) => *s,
            DavError::StatusClose(s) => *s,
            DavError::FsError(e) => e.statuscode(),
            DavError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DavError::UnknownDavMethod => StatusCode::METHOD_NOT_ALLOWED,
            DavError::XmlParseError => StatusCode::BAD_REQUEST,
        }
    }

    /// Whether the connection should be closed after sending this error.
    pub fn must_close(&self) -> bool {
        matches!(self, DavError::StatusClose(_))
    }
}

impl fmt::Display for DavError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DavError::Status(s) | DavError::StatusClose(s) => write!(f, "davcore: {s}"),
            DavError::FsError(e) => write!(f, "davcore: filesystem error: {e}"),
            DavError::IoError(e) => write!(f, "davcore: io error: {e}"),
            DavError::UnknownDavMethod => write!(f, "davcore: unknown webdav method"),
            DavError::XmlParseError => write!(f, "davcore: malformed xml body"),
        }
    }
}

impl std::error::Error for DavError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DavError::FsError(e) => Some(e),
            DavError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StatusCode> for DavError {
    fn from(s: StatusCode) -> Self {
        DavError::Status(s)
    }
}

impl From<FsError> for DavError {
    fn from(e: FsError) -> Self {
        DavError::FsError(e)
    }
}

impl From<io::Error> for DavError {
    fn from(e: io::Error) -> Self {
        DavError::IoError(e)
    }
}
