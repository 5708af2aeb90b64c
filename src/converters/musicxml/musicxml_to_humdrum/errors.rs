//! Error types for MusicXML to Humdrum conversion
//!
//! Fatal errors come in two flavors: document-level (`ParseError`, the XML could
//! not be read as a partwise score) and structural (`StructuralError`, the parts
//! cannot be aligned into one grid). Recoverable anomalies are not errors; they
//! are collected as `ConversionWarning`s by the conversion context.

use std::io;
use thiserror::Error;

/// Top-level conversion error type
#[derive(Debug, Clone, Error)]
pub enum ConversionError {
    /// Fatal XML / document error
    #[error("XML parsing failed: {0}")]
    Parse(#[from] ParseError),

    /// Parts cannot be stitched into a single grid
    #[error("structural error: {0}")]
    Structural(#[from] StructuralError),

    /// Reading the input file failed
    #[error("I/O error: {0}")]
    Io(String),

    /// Conversion settings could not be loaded
    #[error("settings error: {0}")]
    Settings(String),
}

impl From<io::Error> for ConversionError {
    fn from(error: io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

/// Fatal XML parsing errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// XML is not well-formed. `offset` is a byte offset into the input.
    #[error("XML content has syntax errors: {description} (offset {offset})")]
    InvalidXml { description: String, offset: usize },

    /// MusicXML format not supported (e.g., timewise instead of partwise)
    #[error("Unsupported MusicXML format: {0}")]
    UnsupportedFormat(String),

    /// Required structural element is missing
    #[error("Missing required element: {0}")]
    MissingRequiredElement(String),

    /// A note duration could not be decoded
    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    /// A pitch element could not be decoded
    #[error("Invalid pitch: {0}")]
    InvalidPitch(String),
}

/// Violations of the cross-part alignment invariants
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("part-list declares {declared} parts but {found} part elements were matched")]
    PartCountMismatch { declared: usize, found: usize },

    #[error(
        "cannot handle parts with different measure counts: part {part_id} has {found}, expected {expected}"
    )]
    MeasureCountMismatch {
        part_id: String,
        expected: usize,
        found: usize,
    },
}
