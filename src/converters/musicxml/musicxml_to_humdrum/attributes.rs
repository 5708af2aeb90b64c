//! Clef, key signature and time signature extraction
//!
//! Each extractor reads one MusicXML control element (a child of
//! `<attributes>`) and produces the Humdrum interpretation token text, the staff
//! scope it applies to, and the following sibling element when that sibling is
//! of the same kind. The grid builder loops over that chain:
//!
//! ```text
//! <clef number="1"><sign>G</sign><line>2</line></clef>   → *clefG2  (staff 0)
//! <clef number="2"><sign>F</sign><line>4</line></clef>   → *clefF4  (staff 1)
//! <key><fifths>-3</fifths></key>                         → *k[b-e-a-] (all staves)
//! <time><beats>3</beats><beat-type>4</beat-type></time>  → *M3/4   (all staves)
//! ```

use crate::converters::musicxml::musicxml_to_humdrum::converter::ConversionContext;
use crate::converters::musicxml::musicxml_to_humdrum::parser::get_child_text;
use crate::converters::musicxml::musicxml_to_humdrum::types::{StaffScope, WarningKind};
use roxmltree::Node;

/// Order in which sharps appear in a key signature
const SHARP_ORDER: [&str; 7] = ["f#", "c#", "g#", "d#", "a#", "e#", "b#"];

/// Order in which flats appear in a key signature
const FLAT_ORDER: [&str; 7] = ["b-", "e-", "a-", "d-", "g-", "c-", "f-"];

/// The control elements that get their own grid slices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Clef,
    KeySignature,
    TimeSignature,
}

impl AttributeKind {
    /// Slice emission order within one time position
    pub const ALL: [AttributeKind; 3] = [
        AttributeKind::Clef,
        AttributeKind::KeySignature,
        AttributeKind::TimeSignature,
    ];

    /// MusicXML element name
    pub fn tag(self) -> &'static str {
        match self {
            AttributeKind::Clef => "clef",
            AttributeKind::KeySignature => "key",
            AttributeKind::TimeSignature => "time",
        }
    }

    /// Run the extractor for this kind
    pub fn convert<'a, 'input>(
        self,
        node: Node<'a, 'input>,
        context: &mut ConversionContext,
    ) -> AttributeToken<'a, 'input> {
        match self {
            AttributeKind::Clef => convert_clef_to_humdrum(node, context),
            AttributeKind::KeySignature => convert_key_signature_to_humdrum(node, context),
            AttributeKind::TimeSignature => convert_time_signature_to_humdrum(node, context),
        }
    }
}

/// One extracted interpretation token
#[derive(Debug, Clone)]
pub struct AttributeToken<'a, 'input> {
    /// Humdrum token text, e.g. `*clefG2`
    pub text: String,

    /// Staff (or staves) the token belongs to
    pub staff: StaffScope,

    /// Next sibling element if it is of the same kind
    pub next: Option<Node<'a, 'input>>,
}

fn next_same_kind<'a, 'input>(node: Node<'a, 'input>) -> Option<Node<'a, 'input>> {
    let tag = node.tag_name().name();
    node.next_sibling_element()
        .filter(|sibling| sibling.tag_name().name() == tag)
}

// ============================================================================
// CLEF
// ============================================================================

/// Convert `<clef>` to `*clef<sign><octave><line>`.
///
/// Without a `number` attribute a clef belongs to the first staff.
pub fn convert_clef_to_humdrum<'a, 'input>(
    clef: Node<'a, 'input>,
    context: &mut ConversionContext,
) -> AttributeToken<'a, 'input> {
    let staff = StaffScope::from_number_attribute(clef.attribute("number"), StaffScope::Staff(0));

    let sign = get_child_text(clef, "sign").unwrap_or_else(|| {
        context.add_warning(
            WarningKind::MissingAttributeField,
            "clef missing sign element, assuming G",
        );
        "G".to_string()
    });

    let text = match sign.as_str() {
        "G" | "F" | "C" => {
            let line = clef_line(clef, &sign, context);
            let octave = clef_octave_marks(clef, context);
            format!("*clef{sign}{octave}{line}")
        }
        "percussion" => "*clefX".to_string(),
        other => {
            context.add_warning(
                WarningKind::InvalidAttributeValue,
                format!("unsupported clef sign {other}, writing percussion clef"),
            );
            "*clefX".to_string()
        }
    };

    AttributeToken {
        text,
        staff,
        next: next_same_kind(clef),
    }
}

fn standard_clef_line(sign: &str) -> u32 {
    match sign {
        "F" => 4,
        "C" => 3,
        _ => 2,
    }
}

fn clef_line(clef: Node, sign: &str, context: &mut ConversionContext) -> u32 {
    let default_line = standard_clef_line(sign);
    match get_child_text(clef, "line") {
        Some(text) => text.parse().unwrap_or_else(|_| {
            context.add_warning(
                WarningKind::InvalidAttributeValue,
                format!("invalid clef line {text}, using {default_line}"),
            );
            default_line
        }),
        None => {
            context.add_warning(
                WarningKind::MissingAttributeField,
                format!("clef missing line element, using {default_line}"),
            );
            default_line
        }
    }
}

fn clef_octave_marks(clef: Node, context: &mut ConversionContext) -> &'static str {
    let Some(text) = get_child_text(clef, "clef-octave-change") else {
        return "";
    };
    match text.parse::<i32>() {
        Ok(-2) => "vv",
        Ok(-1) => "v",
        Ok(0) => "",
        Ok(1) => "^",
        Ok(2) => "^^",
        _ => {
            context.add_warning(
                WarningKind::InvalidAttributeValue,
                format!("unsupported clef-octave-change {text}"),
            );
            ""
        }
    }
}

// ============================================================================
// KEY SIGNATURE
// ============================================================================

/// Convert `<key>` to `*k[...]` listing exactly |fifths| accidentals.
///
/// Without a `number` attribute the key signature applies to every staff.
pub fn convert_key_signature_to_humdrum<'a, 'input>(
    key: Node<'a, 'input>,
    context: &mut ConversionContext,
) -> AttributeToken<'a, 'input> {
    let staff = StaffScope::from_number_attribute(key.attribute("number"), StaffScope::AllStaves);

    let fifths = match get_child_text(key, "fifths") {
        Some(text) => text.parse::<i32>().unwrap_or_else(|_| {
            context.add_warning(
                WarningKind::InvalidAttributeValue,
                format!("invalid key fifths {text}, using 0"),
            );
            0
        }),
        None => {
            context.add_warning(
                WarningKind::MissingAttributeField,
                "key missing fifths element, using 0",
            );
            0
        }
    };

    AttributeToken {
        text: key_signature_token(fifths, context),
        staff,
        next: next_same_kind(key),
    }
}

fn key_signature_token(fifths: i32, context: &mut ConversionContext) -> String {
    let count = fifths.unsigned_abs() as usize;
    if count > SHARP_ORDER.len() {
        context.add_warning(
            WarningKind::InvalidAttributeValue,
            format!("key fifths {fifths} out of range, clamping to 7"),
        );
    }

    let order = if fifths < 0 { &FLAT_ORDER } else { &SHARP_ORDER };
    let accidentals: String = order.iter().take(count).copied().collect();

    format!("*k[{accidentals}]")
}

// ============================================================================
// TIME SIGNATURE
// ============================================================================

/// Convert `<time>` to `*M<beats>/<beat-type>`.
///
/// Without a `number` attribute the time signature applies to every staff.
pub fn convert_time_signature_to_humdrum<'a, 'input>(
    time: Node<'a, 'input>,
    context: &mut ConversionContext,
) -> AttributeToken<'a, 'input> {
    let staff = StaffScope::from_number_attribute(time.attribute("number"), StaffScope::AllStaves);

    let beats = time_field(time, "beats", context);
    let beat_type = time_field(time, "beat-type", context);

    AttributeToken {
        text: format!("*M{beats}/{beat_type}"),
        staff,
        next: next_same_kind(time),
    }
}

fn time_field(time: Node, field: &str, context: &mut ConversionContext) -> u32 {
    match get_child_text(time, field) {
        Some(text) => text.parse().unwrap_or_else(|_| {
            context.add_warning(
                WarningKind::InvalidAttributeValue,
                format!("invalid time {field} {text}, using 4"),
            );
            4
        }),
        None => {
            context.add_warning(
                WarningKind::MissingAttributeField,
                format!("time missing {field} element, using 4"),
            );
            4
        }
    }
}
