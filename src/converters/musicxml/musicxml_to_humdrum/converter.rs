//! Grid building
//!
//! Converts the per-part timelines into the aligned [`Grid`]: one GridMeasure
//! per measure index, with the measure's now-groups turned into slices.

use crate::converters::musicxml::musicxml_to_humdrum::attributes::AttributeKind;
use crate::converters::musicxml::musicxml_to_humdrum::errors::StructuralError;
use crate::converters::musicxml::musicxml_to_humdrum::grid::{
    Grid, GridMeasure, GridSlice, HumdrumToken, SliceType,
};
use crate::converters::musicxml::musicxml_to_humdrum::merge::{NowGroup, TimelineMerge};
use crate::converters::musicxml::musicxml_to_humdrum::model::{Event, EventKind, Measure, Part};
use crate::converters::musicxml::musicxml_to_humdrum::parser::get_child;
use crate::converters::musicxml::musicxml_to_humdrum::types::{
    ConversionWarning, Rational, StaffScope, WarningKind,
};
use roxmltree::Node;

/// Conversion context that tracks the current location and collects warnings
#[derive(Debug, Default)]
pub struct ConversionContext {
    pub current_part_id: Option<String>,
    pub current_measure: Option<String>,
    pub warnings: Vec<ConversionWarning>,
}

impl ConversionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter_part(&mut self, part_id: &str) {
        self.current_part_id = Some(part_id.to_string());
        self.current_measure = None;
    }

    pub fn enter_measure(&mut self, number: Option<&str>) {
        self.current_measure = number.map(str::to_string);
    }

    pub fn leave_part(&mut self) {
        self.current_part_id = None;
        self.current_measure = None;
    }

    /// Record a recoverable anomaly at the current location
    pub fn add_warning(&mut self, kind: WarningKind, message: impl Into<String>) {
        let warning = ConversionWarning {
            kind,
            part_id: self.current_part_id.clone(),
            measure_number: self.current_measure.clone(),
            message: message.into(),
        };
        log::warn!(
            "{:?} (part {}, measure {}): {}",
            warning.kind,
            warning.part_id.as_deref().unwrap_or("-"),
            warning.measure_number.as_deref().unwrap_or("-"),
            warning.message
        );
        self.warnings.push(warning);
    }
}

// ============================================================================
// SCORE
// ============================================================================

/// Build the grid from all parts, one GridMeasure per measure index.
///
/// Every part must have the same number of measures; nothing is built
/// otherwise.
pub fn stitch_parts(parts: &[Part], context: &mut ConversionContext) -> Result<Grid, StructuralError> {
    let measure_count = parts.first().map_or(0, Part::measure_count);

    if let Some(part) = parts.iter().find(|p| p.measure_count() != measure_count) {
        return Err(StructuralError::MeasureCountMismatch {
            part_id: part.id().to_string(),
            expected: measure_count,
            found: part.measure_count(),
        });
    }

    let staff_counts: Vec<usize> = parts.iter().map(Part::staff_count).collect();
    let part_names = parts.iter().map(|p| p.name().map(str::to_string)).collect();
    let mut grid = Grid::new(staff_counts, part_names);

    for index in 0..measure_count {
        let measures: Vec<&Measure> = parts.iter().filter_map(|p| p.measure(index)).collect();
        grid.measures
            .push(insert_measure(&measures, parts, &grid.staff_counts, context));
    }

    Ok(grid)
}

/// Merge one measure index across parts into a GridMeasure
pub fn insert_measure(
    measures: &[&Measure],
    parts: &[Part],
    staff_counts: &[usize],
    context: &mut ConversionContext,
) -> GridMeasure {
    let number = measures.first().and_then(|m| m.number()).map(str::to_string);
    let duration = measures
        .iter()
        .map(|m| m.duration())
        .max()
        .unwrap_or_else(|| Rational::from_integer(0));

    let mut grid_measure = GridMeasure::new(number, duration);

    for group in TimelineMerge::new(measures) {
        log::trace!(
            "measure {}: time {} from parts {:?}",
            grid_measure.number.as_deref().unwrap_or("-"),
            group.time,
            group.parts
        );
        convert_now_events(&mut grid_measure, &group, parts, staff_counts, context);
    }

    grid_measure
}

/// Turn one now-group into interpretation slices followed by a Notes slice
pub fn convert_now_events(
    grid_measure: &mut GridMeasure,
    group: &NowGroup,
    parts: &[Part],
    staff_counts: &[usize],
    context: &mut ConversionContext,
) {
    if group.events.is_empty() {
        return;
    }

    append_zero_events(grid_measure, group, parts, staff_counts, context);

    if group.events.iter().all(|events| events.nonzerodur.is_empty()) {
        return;
    }

    append_nonzero_events(grid_measure, group, parts, staff_counts, context);
}

fn slice_type(kind: AttributeKind) -> SliceType {
    match kind {
        AttributeKind::Clef => SliceType::Clefs,
        AttributeKind::KeySignature => SliceType::KeySignatures,
        AttributeKind::TimeSignature => SliceType::TimeSignatures,
    }
}

fn enter_location(context: &mut ConversionContext, parts: &[Part], part_index: usize, measure: Option<&str>) {
    if let Some(part) = parts.get(part_index) {
        context.enter_part(part.id());
        context.enter_measure(measure);
    }
}

// ============================================================================
// INTERPRETATIONS
// ============================================================================

/// Emit clef, key signature and time signature slices for a now-group.
///
/// Only the first element of each kind per part is used; parts without one
/// get null interpretations in that slice.
pub fn append_zero_events(
    grid_measure: &mut GridMeasure,
    group: &NowGroup,
    parts: &[Part],
    staff_counts: &[usize],
    context: &mut ConversionContext,
) {
    let mut found: Vec<(usize, [Option<Node>; 3])> = Vec::new();

    for (events, &part_index) in group.events.iter().zip(&group.parts) {
        let mut first: [Option<Node>; 3] = [None; 3];
        let attributes = events
            .zerodur
            .iter()
            .filter(|event| event.kind() == EventKind::Attributes);
        for event in attributes {
            for (slot, kind) in first.iter_mut().zip(AttributeKind::ALL) {
                if slot.is_none() {
                    *slot = get_child(event.node(), kind.tag());
                }
            }
        }
        found.push((part_index, first));
    }

    for (position, kind) in AttributeKind::ALL.into_iter().enumerate() {
        if found.iter().all(|(_, first)| first[position].is_none()) {
            continue;
        }

        let mut slice = GridSlice::new(group.time, slice_type(kind), staff_counts);
        for (part_index, first) in &found {
            if let Some(node) = first[position] {
                enter_location(context, parts, *part_index, grid_measure.number.as_deref());
                insert_part_attributes(&mut slice, *part_index, node, kind, context);
            }
        }
        context.leave_part();
        grid_measure.slices.push(slice);
    }
}

/// Place one attribute element (and its same-kind siblings) into a slice.
///
/// Tokens scoped to all staves are cloned into every staff of the part.
pub fn insert_part_attributes(
    slice: &mut GridSlice,
    part_index: usize,
    node: Node,
    kind: AttributeKind,
    context: &mut ConversionContext,
) {
    let staff_count = slice.parts.get(part_index).map_or(0, |p| p.staves.len());
    let zero = Rational::from_integer(0);
    let mut next = Some(node);

    while let Some(current) = next {
        let token = kind.convert(current, context);

        match token.staff {
            StaffScope::AllStaves => {
                for staff in 0..staff_count {
                    if let Some(grid_staff) = slice.staff_mut(part_index, staff) {
                        grid_staff.set_token_layer(0, HumdrumToken::new(token.text.clone()), zero);
                    }
                }
            }
            StaffScope::Staff(staff) => match slice.staff_mut(part_index, staff) {
                Some(grid_staff) => {
                    grid_staff.set_token_layer(0, HumdrumToken::new(token.text.clone()), zero);
                }
                None => context.add_warning(
                    WarningKind::StaffOutOfRange,
                    format!(
                        "{} for staff {} but the part has {staff_count} staves",
                        kind.tag(),
                        staff + 1
                    ),
                ),
            },
        }

        next = token.next;
    }
}

// ============================================================================
// NOTES
// ============================================================================

/// Emit the Notes slice of a now-group. Nothing is emitted when no token
/// could be placed.
pub fn append_nonzero_events(
    grid_measure: &mut GridMeasure,
    group: &NowGroup,
    parts: &[Part],
    staff_counts: &[usize],
    context: &mut ConversionContext,
) {
    let mut slice = GridSlice::new(group.time, SliceType::Notes, staff_counts);
    let mut placed_any = false;

    for (events, &part_index) in group.events.iter().zip(&group.parts) {
        enter_location(context, parts, part_index, grid_measure.number.as_deref());
        let mut chord_base = None;
        for event in &events.nonzerodur {
            let target = if event.is_chord() { chord_base } else { None };
            chord_base = add_event(&mut slice, part_index, event, target, context);
            placed_any |= chord_base.is_some();
        }
    }
    context.leave_part();

    if placed_any {
        grid_measure.slices.push(slice);
    }
}

/// Place one note or rest token and return its `(staff, layer)`.
///
/// `chord_base` is where the note this chord member stacks on was placed;
/// the member joins that token. Any other collision goes to the next free
/// layer. Returns `None` when the note was skipped.
pub fn add_event(
    slice: &mut GridSlice,
    part_index: usize,
    event: &Event,
    chord_base: Option<(usize, usize)>,
    context: &mut ConversionContext,
) -> Option<(usize, usize)> {
    let text = match event.token_text() {
        Ok(text) => text,
        Err(err) => {
            context.add_warning(WarningKind::InvalidPitch, format!("{err}, note skipped"));
            return None;
        }
    };

    let staff_index = event.staff_index();
    let Some(staff) = slice.staff_mut(part_index, staff_index) else {
        context.add_warning(
            WarningKind::StaffOutOfRange,
            format!("note on staff {} outside the part", staff_index + 1),
        );
        return None;
    };

    if let Some((base_staff, base_layer)) = chord_base.filter(|&(s, _)| s == staff_index) {
        if let Some(existing) = staff.layer(base_layer) {
            let chord = HumdrumToken::new(format!("{} {}", existing.token.text(), text));
            let duration = existing.duration.max(event.duration());
            staff.set_token_layer(base_layer, chord, duration);
            return Some((base_staff, base_layer));
        }
    }

    let layer = staff.free_layer_from(event.voice_index());
    staff.set_token_layer(layer, HumdrumToken::new(text), event.duration());
    Some((staff_index, layer))
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
