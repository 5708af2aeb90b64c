//! Type definitions for MusicXML to Humdrum conversion
//!
//! This module defines the public API types of the conversion pipeline:
//! - Conversion result, status and warnings
//! - Conversion settings (serde-loadable)
//! - Shared musical value types (Rational time, staff scope)

use crate::converters::musicxml::musicxml_to_humdrum::errors::ConversionError;
use crate::converters::musicxml::musicxml_to_humdrum::grid::Grid;
use num_rational::Rational64;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Exact musical time, measured in quarter notes
pub type Rational = Rational64;

// ============================================================================
// PUBLIC API TYPES
// ============================================================================

/// Result of MusicXML to Humdrum conversion
#[derive(Debug, Clone)]
pub struct ConversionResult {
    /// Generated Humdrum text (one line per grid row, newline-terminated)
    pub humdrum_source: String,

    /// The time-aligned grid the text was flattened from
    pub grid: Grid,

    /// Recoverable anomalies met during conversion
    pub warnings: Vec<ConversionWarning>,
}

impl ConversionResult {
    pub fn status(&self) -> ConversionStatus {
        if self.warnings.is_empty() {
            ConversionStatus::Clean
        } else {
            ConversionStatus::WithWarnings
        }
    }
}

/// Outcome of a conversion that produced output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionStatus {
    /// Document read and converted without anomalies
    Clean,
    /// Document converted; recoverable anomalies were logged
    WithWarnings,
}

/// A recoverable anomaly. Conversion continues after recording it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionWarning {
    pub kind: WarningKind,

    /// Part ID where the anomaly appears (if in part context)
    pub part_id: Option<String>,

    /// Measure number where the anomaly appears (if in measure context)
    pub measure_number: Option<String>,

    /// Human-readable explanation
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// A part ID appears twice; the second occurrence is ignored
    DuplicatePartId,
    /// Part content whose ID is absent from the part-list
    UndeclaredPart,
    /// A part element without an id attribute
    MissingPartId,
    /// A clef/key/time field is missing and was defaulted
    MissingAttributeField,
    /// A clef/key/time field is present but unusable
    InvalidAttributeValue,
    /// A note duration could not be decoded; zero was substituted
    InvalidDuration,
    /// A note pitch could not be decoded
    InvalidPitch,
    /// A staff number points past the part's staff count
    StaffOutOfRange,
    /// A backup element moved the time cursor before the measure start
    NegativeTimeCursor,
}

/// Configuration options for conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionSettings {
    /// Emit `!!!COM:` / `!!!OTL:` reference records
    pub reference_records: bool,

    /// Emit `*partN`, `*staffN` and `*I"name` interpretation lines
    pub part_labels: bool,

    /// Emit the `==` final barline before the spine terminators
    pub final_barline: bool,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            reference_records: true,
            part_labels: true,
            final_barline: true,
        }
    }
}

impl ConversionSettings {
    /// Load settings from a JSON file. Absent fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConversionError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).map_err(|err| {
            ConversionError::Settings(format!("Could not read settings {path:?}: {err}"))
        })
    }
}

// ============================================================================
// MUSICAL VALUE TYPES
// ============================================================================

/// Which staves of a part a control element applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StaffScope {
    /// One staff, 0-based
    Staff(usize),
    /// Every staff of the part
    AllStaves,
}

impl StaffScope {
    /// Resolve a MusicXML 1-based `number` attribute.
    ///
    /// `fallback` is used when the attribute is absent or not a positive integer.
    pub fn from_number_attribute(number: Option<&str>, fallback: StaffScope) -> Self {
        match number.and_then(|n| n.trim().parse::<usize>().ok()) {
            Some(n) if n >= 1 => StaffScope::Staff(n - 1),
            _ => fallback,
        }
    }
}
