//! Humdrum text generation
//!
//! Flattens a [`Grid`] into tab-separated lines. Columns run from the last
//! part to the first and, inside a part, from the last staff to the first, so
//! the lowest staff is the leftmost spine. Each staff owns one spine per voice
//! layer it ever uses; extra layers are opened with `*^` after the header and
//! closed with `*v` before the terminator.

use crate::converters::musicxml::musicxml_to_humdrum::grid::{Grid, GridSlice, GridStaff};
use crate::converters::musicxml::musicxml_to_humdrum::types::ConversionSettings;

/// One output spine position before splitting: a (part, staff) pair
#[derive(Debug, Clone, Copy)]
struct StaffColumn {
    part: usize,
    staff: usize,
    layers: usize,
    /// 1-based staff number counted from the top of the score
    staff_number: usize,
}

/// Generate the full Humdrum document as lines (no trailing newlines)
pub fn grid_to_lines(grid: &Grid, settings: &ConversionSettings) -> Vec<String> {
    let columns = staff_columns(grid);
    let mut lines = Vec::new();

    if settings.reference_records {
        if let Some(composer) = &grid.composer {
            lines.push(format!("!!!COM: {composer}"));
        }
        if let Some(title) = &grid.title {
            lines.push(format!("!!!OTL: {title}"));
        }
    }

    lines.push(join(columns.iter().map(|_| "**kern".to_string())));

    if settings.part_labels {
        lines.push(join(columns.iter().map(|c| format!("*part{}", c.part + 1))));
        lines.push(join(columns.iter().map(|c| format!("*staff{}", c.staff_number))));
        if grid.part_names.iter().any(Option::is_some) {
            lines.push(join(columns.iter().map(|c| {
                match grid.part_names.get(c.part).and_then(Option::as_deref) {
                    Some(name) => format!("*I\"{name}"),
                    None => "*".to_string(),
                }
            })));
        }
    }

    lines.extend(split_lines(&columns));

    for (index, measure) in grid.measures.iter().enumerate() {
        if index > 0 {
            let barline = barline_token(measure.number.as_deref());
            lines.push(spread_token(&columns, &barline));
        }
        for slice in &measure.slices {
            lines.push(slice_line(slice, &columns));
        }
    }

    if settings.final_barline {
        lines.push(spread_token(&columns, "=="));
    }

    lines.extend(merge_lines(&columns));
    lines.push(join(columns.iter().map(|_| "*-".to_string())));

    lines
}

/// Column layout in output order
fn staff_columns(grid: &Grid) -> Vec<StaffColumn> {
    let layer_counts = grid.layer_counts();
    let mut first_staff_number = 1;
    let mut columns = Vec::new();

    for (part, &staff_count) in grid.staff_counts.iter().enumerate() {
        for staff in 0..staff_count {
            columns.push(StaffColumn {
                part,
                staff,
                layers: layer_counts[part][staff],
                staff_number: first_staff_number + staff,
            });
        }
        first_staff_number += staff_count;
    }

    columns.reverse();
    columns
}

fn join(tokens: impl Iterator<Item = String>) -> String {
    tokens.collect::<Vec<_>>().join("\t")
}

/// The same token in every spine of every layer
fn spread_token(columns: &[StaffColumn], token: &str) -> String {
    join(
        columns
            .iter()
            .flat_map(|c| std::iter::repeat(token.to_string()).take(c.layers)),
    )
}

fn barline_token(number: Option<&str>) -> String {
    match number {
        Some(n) if !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()) => format!("={n}"),
        _ => "=".to_string(),
    }
}

/// `*^` lines: line k splits the last spine of every staff that still needs
/// more than k spines
fn split_lines(columns: &[StaffColumn]) -> Vec<String> {
    let max_layers = columns.iter().map(|c| c.layers).max().unwrap_or(1);

    (1..max_layers)
        .map(|open| {
            join(columns.iter().flat_map(|c| {
                let current = open.min(c.layers);
                (0..current).map(move |spine| {
                    if c.layers > open && spine + 1 == current {
                        "*^".to_string()
                    } else {
                        "*".to_string()
                    }
                })
            }))
        })
        .collect()
}

/// `*v` lines, one per layered staff, left to right
fn merge_lines(columns: &[StaffColumn]) -> Vec<String> {
    let mut merged: Vec<bool> = columns.iter().map(|c| c.layers == 1).collect();
    let mut lines = Vec::new();

    for target in 0..columns.len() {
        if merged[target] {
            continue;
        }
        let line = join(columns.iter().enumerate().flat_map(|(i, c)| {
            let spines = if merged[i] { 1 } else { c.layers };
            let token = if i == target { "*v" } else { "*" };
            std::iter::repeat(token.to_string()).take(spines)
        }));
        lines.push(line);
        merged[target] = true;
    }

    lines
}

fn slice_line(slice: &GridSlice, columns: &[StaffColumn]) -> String {
    let null = slice.kind.null_token();

    join(columns.iter().flat_map(|c| {
        let staff = slice.staff(c.part, c.staff);
        (0..c.layers).map(move |layer| cell_text(staff, layer, slice, null))
    }))
}

/// Interpretation tokens apply to every sub-spine of their staff, so an empty
/// layer repeats layer 0's token there.
fn cell_text(staff: Option<&GridStaff>, layer: usize, slice: &GridSlice, null: &str) -> String {
    let Some(staff) = staff else {
        return null.to_string();
    };

    let voice = staff.layer(layer).or_else(|| {
        if slice.kind.is_interpretation() {
            staff.layer(0)
        } else {
            None
        }
    });

    voice.map_or_else(|| null.to_string(), |v| v.token.text().to_string())
}
