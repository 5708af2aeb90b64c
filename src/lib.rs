//! MusicXML to Humdrum conversion
//!
//! Reads partwise MusicXML scores and writes Humdrum `**kern` text. Parts are
//! modeled as measure/event timelines, merged measure by measure into a
//! time-aligned part/staff/voice grid, and the grid is flattened to spines.

pub mod converters;

// Re-export commonly used types
pub use converters::musicxml::musicxml_to_humdrum::{
    convert_musicxml_file, convert_musicxml_to_humdrum, ConversionError, ConversionResult,
    ConversionSettings, ConversionStatus, ConversionWarning, Grid, ParseError, StructuralError,
    WarningKind,
};
