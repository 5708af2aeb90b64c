//! `**kern` token fragments for notes and rests
//!
//! A note token is assembled as prefix + recip + pitch + postfix:
//! `([4.cc#` is a slur start, tie start, dotted quarter C#5.

use crate::converters::musicxml::musicxml_to_humdrum::errors::ParseError;
use crate::converters::musicxml::musicxml_to_humdrum::parser::{
    get_child, get_child_text, get_children,
};
use crate::converters::musicxml::musicxml_to_humdrum::types::Rational;
use roxmltree::Node;

// ============================================================================
// PITCH
// ============================================================================

const OCTAVE_RANGE: std::ops::RangeInclusive<i32> = 0..=9;
const MAX_ALTER: i32 = 3;

/// Kern pitch of a `<note>`: `r` for rests, otherwise letter case and
/// repetition encode the octave (c = C4, cc = C5, C = C3, CC = C2) followed by
/// `#` or `-` per semitone of alteration.
pub fn kern_pitch(note: Node) -> Result<String, ParseError> {
    if get_child(note, "rest").is_some() {
        return Ok("r".to_string());
    }

    let (step, octave, alter) = if let Some(pitch) = get_child(note, "pitch") {
        (
            get_child_text(pitch, "step"),
            get_child_text(pitch, "octave"),
            get_child_text(pitch, "alter"),
        )
    } else if let Some(unpitched) = get_child(note, "unpitched") {
        (
            get_child_text(unpitched, "display-step"),
            get_child_text(unpitched, "display-octave"),
            None,
        )
    } else {
        return Err(ParseError::InvalidPitch(
            "note has neither pitch, unpitched nor rest".to_string(),
        ));
    };

    let step = step
        .ok_or_else(|| ParseError::InvalidPitch("pitch missing step element".to_string()))?;
    let letter = match step.as_str() {
        "A" | "B" | "C" | "D" | "E" | "F" | "G" => step.to_ascii_lowercase(),
        _ => return Err(ParseError::InvalidPitch(format!("Invalid step: {step}"))),
    };

    let octave_str = octave
        .ok_or_else(|| ParseError::InvalidPitch("pitch missing octave element".to_string()))?;
    let octave = octave_str
        .parse::<i32>()
        .ok()
        .filter(|o| OCTAVE_RANGE.contains(o))
        .ok_or_else(|| ParseError::InvalidPitch(format!("Invalid octave: {octave_str}")))?;

    // Microtonal alterations are rounded to the nearest semitone
    let alter = match alter.and_then(|s| s.parse::<f64>().ok()) {
        Some(a) if a.is_finite() => a.round(),
        _ => 0.0,
    };
    if alter.abs() > MAX_ALTER as f64 {
        return Err(ParseError::InvalidPitch(format!("Invalid alter: {alter}")));
    }
    let alter = alter as i32;

    let mut pitch = if octave >= 4 {
        letter.repeat((octave - 3) as usize)
    } else {
        letter.to_ascii_uppercase().repeat((4 - octave) as usize)
    };

    if alter > 0 {
        pitch.push_str(&"#".repeat(alter as usize));
    } else if alter < 0 {
        pitch.push_str(&"-".repeat((-alter) as usize));
    }

    Ok(pitch)
}

// ============================================================================
// RHYTHM (RECIP)
// ============================================================================

/// Humdrum recip for a duration in quarter notes.
///
/// The recip is the reciprocal of the duration as a fraction of a whole note,
/// with dots for dotted values and `n%d` for anything else. Zero durations
/// have no recip.
pub fn recip_from_duration(duration: Rational) -> String {
    if *duration.numer() <= 0 {
        return String::new();
    }

    let value = Rational::from_integer(4) / duration;

    if let Some(recip) = simple_recip(value) {
        return recip;
    }
    if let Some(recip) = simple_recip(value * Rational::new(3, 2)) {
        return format!("{recip}.");
    }
    if let Some(recip) = simple_recip(value * Rational::new(7, 4)) {
        return format!("{recip}..");
    }

    format!("{}%{}", value.numer(), value.denom())
}

fn simple_recip(value: Rational) -> Option<String> {
    if value.is_integer() {
        Some(value.numer().to_string())
    } else if value == Rational::new(1, 2) {
        Some("0".to_string())
    } else if value == Rational::new(1, 4) {
        Some("00".to_string())
    } else {
        None
    }
}

// ============================================================================
// TIE AND SLUR MARKERS
// ============================================================================

#[derive(Debug, Default, Clone, Copy)]
struct TieState {
    start: bool,
    stop: bool,
}

fn tie_state(note: Node) -> TieState {
    let mut state = TieState::default();

    let tied = get_child(note, "notations")
        .into_iter()
        .flat_map(|notations| get_children(notations, "tied"));

    for tie in get_children(note, "tie").chain(tied) {
        match tie.attribute("type") {
            Some("start") => state.start = true,
            Some("stop") => state.stop = true,
            Some("continue") => {
                state.start = true;
                state.stop = true;
            }
            _ => {}
        }
    }

    state
}

fn count_slurs(note: Node, slur_type: &str) -> usize {
    get_child(note, "notations")
        .map(|notations| {
            get_children(notations, "slur")
                .filter(|slur| slur.attribute("type") == Some(slur_type))
                .count()
        })
        .unwrap_or(0)
}

/// Markers written before the recip: slur starts, then a tie start.
pub fn prefix_note_info(note: Node) -> String {
    let mut prefix = "(".repeat(count_slurs(note, "start"));
    let tie = tie_state(note);
    if tie.start && !tie.stop {
        prefix.push('[');
    }
    prefix
}

/// Markers written after the pitch: tie end or continuation, then slur ends.
pub fn postfix_note_info(note: Node) -> String {
    let mut postfix = String::new();
    let tie = tie_state(note);
    match (tie.start, tie.stop) {
        (true, true) => postfix.push('_'),
        (false, true) => postfix.push(']'),
        _ => {}
    }
    postfix.push_str(&")".repeat(count_slurs(note, "stop")));
    postfix
}
