//! Error types for validatelet
//!
//! Two families of failure are kept apart: a *rejection* means the document
//! does not match the grammar, while every other variant means the schema (or
//! its environment) could not be built. Calls that break the automaton's
//! structural invariants are not errors at all; they panic.

use std::fmt;
use thiserror::Error;

/// Result type alias using validatelet Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for validatelet operations
#[derive(Error, Debug)]
pub enum Error {
    /// The document was rejected by the grammar
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The encoded schema buffers are inconsistent
    #[error("malformed schema: {0}")]
    MalformedSchema(#[from] DecodeError),

    /// A datatype namespace referenced by the schema has no registered library
    #[error("unable to locate a datatype library for '{0}'")]
    UnresolvableDatatypeLibrary(String),

    /// A datatype or one of its parameters could not be created
    #[error("datatype error: {0}")]
    Datatype(String),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML parsing error
    #[error("XML error: {0}")]
    Xml(String),

    /// Encoded schema artifact could not be read
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True if this error is a document rejection rather than a schema or environment failure
    pub fn is_rejection(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

impl From<roxmltree::Error> for Error {
    fn from(err: roxmltree::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

/// The push event that collapsed the automaton
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectedEvent {
    /// An element start tag
    StartElement(String),
    /// A run of character data
    Text(String),
    /// An element end tag
    EndElement(String),
    /// The end of the document in a non-final state
    EndDocument,
}

impl fmt::Display for RejectedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectedEvent::StartElement(name) => write!(f, "<{}>", name),
            RejectedEvent::Text(text) => {
                let shown: String = text.chars().take(40).collect();
                if shown.len() < text.len() {
                    write!(f, "text \"{}...\"", shown)
                } else {
                    write!(f, "text \"{}\"", shown)
                }
            }
            RejectedEvent::EndElement(name) => write!(f, "</{}>", name),
            RejectedEvent::EndDocument => write!(f, "end of document"),
        }
    }
}

/// Document rejection with context
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Error message
    pub message: String,
    /// The event that was not accepted
    pub event: Option<RejectedEvent>,
    /// Path to the element that failed validation
    pub path: Option<String>,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            event: None,
            path: None,
        }
    }

    /// Set the rejected event
    pub fn with_event(mut self, event: RejectedEvent) -> Self {
        self.event = Some(event);
        self
    }

    /// Set the path where validation failed
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref event) = self.event {
            write!(f, " at {}", event)?;
        }

        if let Some(ref path) = self.path {
            write!(f, " (path: {})", path)?;
        }

        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Inconsistency found while decoding the encoded schema buffers
#[derive(Debug, Clone)]
pub struct DecodeError {
    /// Error message
    pub message: String,
    /// Name of the buffer being decoded
    pub buffer: Option<&'static str>,
    /// Offset (in 16-bit units) inside that buffer
    pub offset: Option<usize>,
}

impl DecodeError {
    /// Create a new decode error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            buffer: None,
            offset: None,
        }
    }

    /// Set the buffer name
    pub fn in_buffer(mut self, buffer: &'static str) -> Self {
        self.buffer = Some(buffer);
        self
    }

    /// Set the offset
    pub fn at(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        match (self.buffer, self.offset) {
            (Some(buffer), Some(offset)) => write!(f, " ({} buffer, offset {})", buffer, offset),
            (Some(buffer), None) => write!(f, " ({} buffer)", buffer),
            (None, Some(offset)) => write!(f, " (offset {})", offset),
            (None, None) => Ok(()),
        }
    }
}

impl std::error::Error for DecodeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new("element not allowed")
            .with_event(RejectedEvent::StartElement("b".to_string()))
            .with_path("/a/b");

        let msg = format!("{}", err);
        assert!(msg.contains("element not allowed"));
        assert!(msg.contains("<b>"));
        assert!(msg.contains("/a/b"));
    }

    #[test]
    fn test_long_text_is_shortened() {
        let event = RejectedEvent::Text("x".repeat(100));
        let msg = event.to_string();
        assert!(msg.ends_with("...\""));
        assert!(msg.len() < 60);
    }

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::new("state index out of range")
            .in_buffer("element")
            .at(12);

        let msg = format!("{}", err);
        assert!(msg.contains("state index out of range"));
        assert!(msg.contains("element buffer"));
        assert!(msg.contains("offset 12"));
    }

    #[test]
    fn test_error_conversion() {
        let err: Error = ValidationError::new("test").into();
        assert!(err.is_rejection());

        let err: Error = DecodeError::new("test").into();
        assert!(matches!(err, Error::MalformedSchema(_)));
        assert!(!err.is_rejection());
    }
}
