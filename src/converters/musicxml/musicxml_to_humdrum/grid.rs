//! Time-aligned grid of Humdrum tokens
//!
//! The grid is a list of measures, each a list of slices. A slice is one
//! output row: a time, a kind, and one cell per (part, staff, layer). Every
//! slice is created with the full part/staff layout so rows always align.

use crate::converters::musicxml::musicxml_to_humdrum::humdrum;
use crate::converters::musicxml::musicxml_to_humdrum::types::{ConversionSettings, Rational};

/// Immutable token text placed in one layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HumdrumToken {
    text: String,
}

impl HumdrumToken {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// A token with the duration it covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridVoice {
    pub token: HumdrumToken,
    pub duration: Rational,
}

/// Voice layers of one staff in one slice. `None` is a null cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridStaff {
    layers: Vec<Option<GridVoice>>,
}

impl GridStaff {
    pub fn layers(&self) -> &[Option<GridVoice>] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&GridVoice> {
        self.layers.get(index).and_then(Option::as_ref)
    }

    pub fn is_occupied(&self, index: usize) -> bool {
        self.layer(index).is_some()
    }

    /// First unoccupied layer at or after `index`
    pub fn free_layer_from(&self, index: usize) -> usize {
        (index..)
            .find(|&i| !self.is_occupied(i))
            .unwrap_or(self.layers.len())
    }

    /// Place a token, growing the layer list with null cells as needed
    pub fn set_token_layer(&mut self, index: usize, token: HumdrumToken, duration: Rational) {
        if self.layers.len() <= index {
            self.layers.resize(index + 1, None);
        }
        self.layers[index] = Some(GridVoice { token, duration });
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridPart {
    pub staves: Vec<GridStaff>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceType {
    Notes,
    Clefs,
    KeySignatures,
    TimeSignatures,
}

impl SliceType {
    pub fn is_interpretation(self) -> bool {
        !matches!(self, SliceType::Notes)
    }

    /// Token written in cells nothing was placed in
    pub fn null_token(self) -> &'static str {
        match self {
            SliceType::Notes => ".",
            _ => "*",
        }
    }
}

/// One output row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridSlice {
    pub time: Rational,
    pub kind: SliceType,
    pub parts: Vec<GridPart>,
}

impl GridSlice {
    /// Create a slice with empty cells for every staff of every part.
    ///
    /// `staff_counts[p]` is the number of staves in part `p`.
    pub fn new(time: Rational, kind: SliceType, staff_counts: &[usize]) -> Self {
        let parts = staff_counts
            .iter()
            .map(|&count| GridPart {
                staves: vec![GridStaff::default(); count],
            })
            .collect();
        GridSlice { time, kind, parts }
    }

    pub fn staff(&self, part: usize, staff: usize) -> Option<&GridStaff> {
        self.parts.get(part).and_then(|p| p.staves.get(staff))
    }

    pub fn staff_mut(&mut self, part: usize, staff: usize) -> Option<&mut GridStaff> {
        self.parts.get_mut(part).and_then(|p| p.staves.get_mut(staff))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridMeasure {
    /// The source measure's `number` attribute
    pub number: Option<String>,
    pub duration: Rational,
    pub slices: Vec<GridSlice>,
}

impl GridMeasure {
    pub fn new(number: Option<String>, duration: Rational) -> Self {
        GridMeasure {
            number,
            duration,
            slices: Vec::new(),
        }
    }
}

/// The whole converted score
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    pub measures: Vec<GridMeasure>,
    pub staff_counts: Vec<usize>,
    pub part_names: Vec<Option<String>>,
    pub title: Option<String>,
    pub composer: Option<String>,
}

impl Grid {
    pub fn new(staff_counts: Vec<usize>, part_names: Vec<Option<String>>) -> Self {
        Grid {
            measures: Vec::new(),
            staff_counts,
            part_names,
            title: None,
            composer: None,
        }
    }

    pub fn part_count(&self) -> usize {
        self.staff_counts.len()
    }

    pub fn slices(&self) -> impl Iterator<Item = &GridSlice> {
        self.measures.iter().flat_map(|m| m.slices.iter())
    }

    /// Maximum layer count of each staff over the whole grid, at least 1.
    ///
    /// Indexed as `[part][staff]`.
    pub fn layer_counts(&self) -> Vec<Vec<usize>> {
        let mut counts: Vec<Vec<usize>> = self
            .staff_counts
            .iter()
            .map(|&staves| vec![1; staves])
            .collect();

        for slice in self.slices() {
            for (part, grid_part) in slice.parts.iter().enumerate() {
                for (staff, grid_staff) in grid_part.staves.iter().enumerate() {
                    if let Some(count) = counts.get_mut(part).and_then(|p| p.get_mut(staff)) {
                        *count = (*count).max(grid_staff.layers().len());
                    }
                }
            }
        }

        counts
    }

    /// Flatten to Humdrum lines
    pub fn finalize(&self, settings: &ConversionSettings) -> Vec<String> {
        humdrum::grid_to_lines(self, settings)
    }
}
