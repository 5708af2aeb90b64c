//! MusicXML to Humdrum converter module
//!
//! This module converts partwise MusicXML documents to Humdrum `**kern`
//! text by way of a time-aligned grid.
//!
//! # Overview
//!
//! The converter follows a four-stage pipeline:
//! 1. **Parse**: Read MusicXML with roxmltree (zero-copy) and match the
//!    part-list with the part contents
//! 2. **Model**: Build per-part measure/event timelines in rational time
//! 3. **Merge**: Walk all parts measure by measure, grouping events that
//!    start together, and fill grid slices (interpretations, then notes)
//! 4. **Generate**: Flatten the grid to Humdrum spines
//!
//! # Basic Usage
//!
//! ```ignore
//! use musicxml_humdrum::converters::musicxml::convert_musicxml_to_humdrum;
//!
//! let musicxml = r#"<?xml version="1.0"?>
//! <score-partwise>
//!   <part-list><score-part id="P1"><part-name>Flute</part-name></score-part></part-list>
//!   <part id="P1">
//!     <measure number="1">
//!       <attributes><divisions>1</divisions></attributes>
//!       <note>
//!         <pitch><step>C</step><octave>5</octave></pitch>
//!         <duration>1</duration>
//!       </note>
//!     </measure>
//!   </part>
//! </score-partwise>"#;
//!
//! let result = convert_musicxml_to_humdrum(musicxml, None)?;
//! println!("{}", result.humdrum_source);
//! ```

pub mod errors;
pub mod types;
pub mod parser;
pub mod kern;
pub mod attributes;
pub mod model;
pub mod merge;
pub mod grid;
pub mod converter;
pub mod humdrum;

// Re-export main API
pub use errors::{ConversionError, ParseError, StructuralError};
pub use grid::Grid;
pub use types::{
    ConversionResult, ConversionSettings, ConversionStatus, ConversionWarning, WarningKind,
};

use std::path::Path;

/// Convert a MusicXML document to Humdrum.
///
/// # Arguments
///
/// * `musicxml` - partwise MusicXML document as string
/// * `settings` - Optional conversion settings (uses defaults if None)
///
/// # Returns
///
/// * `Ok(ConversionResult)` - Humdrum text, the grid, and any warnings
/// * `Err(ConversionError)` - Fatal error; nothing was produced
pub fn convert_musicxml_to_humdrum(
    musicxml: &str,
    settings: Option<ConversionSettings>,
) -> Result<ConversionResult, ConversionError> {
    use converter::{stitch_parts, ConversionContext};
    use model::Part;
    use parser::XmlDocument;

    let settings = settings.unwrap_or_default();
    let doc = XmlDocument::parse(musicxml)?;
    let mut context = ConversionContext::new();

    let sources = doc.extract_parts(&mut context)?;
    let parts: Vec<Part> = sources
        .iter()
        .enumerate()
        .map(|(index, source)| Part::from_source(source, index, &mut context))
        .collect();

    for part in &parts {
        log::debug!(
            "part {} ({}): {} staves, {} verses, {} measures, duration {}",
            part.id(),
            part.name().unwrap_or("unnamed"),
            part.staff_count(),
            part.verse_count(),
            part.measure_count(),
            part.duration().map_or_else(|| "unrepresentable".to_string(), |d| d.to_string())
        );
    }

    let mut grid = stitch_parts(&parts, &mut context)?;
    grid.title = doc.extract_title();
    grid.composer = doc.extract_composer();

    let mut humdrum_source = String::new();
    for line in grid.finalize(&settings) {
        humdrum_source.push_str(&line);
        humdrum_source.push('\n');
    }

    log::info!(
        "Converted {} parts, {} measures ({} warnings)",
        grid.part_count(),
        grid.measures.len(),
        context.warnings.len()
    );

    Ok(ConversionResult {
        humdrum_source,
        grid,
        warnings: context.warnings,
    })
}

/// Read a MusicXML file and convert it
pub fn convert_musicxml_file(
    path: &Path,
    settings: Option<ConversionSettings>,
) -> Result<ConversionResult, ConversionError> {
    let musicxml = std::fs::read_to_string(path)?;
    convert_musicxml_to_humdrum(&musicxml, settings)
}
