//! Error types for EML parsing and extraction

use thiserror::Error;

/// Errors that can occur while parsing or extracting EML content
#[derive(Error, Debug)]
pub enum EmlError {
    /// Input that must be raw EML text was empty or unusable
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Extraction was attempted on a structure without any headers
    #[error("structure has no headers")]
    MissingHeaders,

    /// A multipart boundary marker could not be determined
    #[error("malformed boundary marker: {0}")]
    MalformedBoundaryMarker(String),

    /// The extraction walk failed in an unanticipated way
    #[error("extraction failed: {0}")]
    ExtractionFailure(String),
}

/// Result type for EML parsing operations
pub type Result<T> = std::result::Result<T, EmlError>;
