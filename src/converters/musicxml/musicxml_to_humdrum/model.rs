//! Per-part timelines: parts own measures, measures own time-stamped events
//!
//! Each `<measure>` is scanned in document order with a rational time cursor.
//! Notes and rests advance the cursor by their duration, `<backup>` and
//! `<forward>` move it, and control elements (attributes, barlines,
//! directions) are recorded as zero-duration events at the cursor position.
//! All times are in quarter notes from the start of the measure.

use crate::converters::musicxml::musicxml_to_humdrum::converter::ConversionContext;
use crate::converters::musicxml::musicxml_to_humdrum::errors::ParseError;
use crate::converters::musicxml::musicxml_to_humdrum::kern;
use crate::converters::musicxml::musicxml_to_humdrum::parser::{
    get_child, get_child_text, get_children, PartSource,
};
use crate::converters::musicxml::musicxml_to_humdrum::types::{Rational, WarningKind};
use num_traits::{CheckedAdd, CheckedSub};
use roxmltree::Node;
use std::collections::{BTreeMap, HashMap};

// ============================================================================
// EVENTS
// ============================================================================

/// What a measure child element represents on the timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Note,
    Rest,
    GraceNote,
    Attributes,
    Barline,
    Direction,
    Other,
}

/// A single notated occurrence within a measure
#[derive(Debug, Clone)]
pub struct Event<'a> {
    node: Node<'a, 'a>,
    kind: EventKind,
    start_time: Rational,
    duration: Rational,
    part_index: usize,
    staff_index: usize,
    voice: String,
    voice_index: usize,
    chord: bool,
}

impl<'a> Event<'a> {
    fn control(node: Node<'a, 'a>, kind: EventKind, start_time: Rational, part_index: usize) -> Self {
        Self {
            node,
            kind,
            start_time,
            duration: Rational::from_integer(0),
            part_index,
            staff_index: 0,
            voice: String::new(),
            voice_index: 0,
            chord: false,
        }
    }

    /// Source XML element
    pub fn node(&self) -> Node<'a, 'a> {
        self.node
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn start_time(&self) -> Rational {
        self.start_time
    }

    pub fn duration(&self) -> Rational {
        self.duration
    }

    pub fn part_index(&self) -> usize {
        self.part_index
    }

    pub fn staff_index(&self) -> usize {
        self.staff_index
    }

    /// Voice layer within the staff (0-based, in order of first appearance)
    pub fn voice_index(&self) -> usize {
        self.voice_index
    }

    /// True for notes carrying `<chord/>`: they share the previous note's onset
    pub fn is_chord(&self) -> bool {
        self.chord
    }

    /// Notes and rests; everything else is zero-duration control data
    pub fn is_sounding(&self) -> bool {
        matches!(self.kind, EventKind::Note | EventKind::Rest)
    }

    pub fn kern_pitch(&self) -> Result<String, ParseError> {
        kern::kern_pitch(self.node)
    }

    pub fn recip(&self) -> String {
        kern::recip_from_duration(self.duration)
    }

    pub fn prefix_note_info(&self) -> String {
        kern::prefix_note_info(self.node)
    }

    pub fn postfix_note_info(&self) -> String {
        kern::postfix_note_info(self.node)
    }

    /// Full kern token: prefix + recip + pitch + postfix
    pub fn token_text(&self) -> Result<String, ParseError> {
        let pitch = self.kern_pitch()?;
        Ok(format!(
            "{}{}{}{}",
            self.prefix_note_info(),
            self.recip(),
            pitch,
            self.postfix_note_info()
        ))
    }
}

/// Events of one part sharing one start time
#[derive(Debug, Clone)]
pub struct SimultaneousEvents<'m, 'a> {
    pub start_time: Rational,
    /// Sounding notes and rests
    pub nonzerodur: Vec<&'m Event<'a>>,
    /// Control changes and grace notes
    pub zerodur: Vec<&'m Event<'a>>,
}

impl<'m, 'a> SimultaneousEvents<'m, 'a> {
    fn new(start_time: Rational) -> Self {
        Self {
            start_time,
            nonzerodur: Vec::new(),
            zerodur: Vec::new(),
        }
    }
}

// ============================================================================
// MEASURES
// ============================================================================

/// Running state carried from one measure to the next within a part
#[derive(Debug)]
struct PartState {
    divisions: i64,
    staff_count: usize,
    verse_count: usize,
}

impl Default for PartState {
    fn default() -> Self {
        PartState {
            divisions: 1,
            staff_count: 1,
            verse_count: 0,
        }
    }
}

/// One part's music within one measure
#[derive(Debug, Clone)]
pub struct Measure<'a> {
    part_index: usize,
    number: Option<String>,
    events: Vec<Event<'a>>,
    duration: Rational,
}

impl<'a> Measure<'a> {
    fn from_node(
        node: Node<'a, 'a>,
        part_index: usize,
        state: &mut PartState,
        context: &mut ConversionContext,
    ) -> Self {
        let number = node.attribute("number").map(str::to_string);
        context.enter_measure(number.as_deref());

        let zero = Rational::from_integer(0);
        let mut events = Vec::new();
        let mut cursor = zero;
        let mut max_time = zero;
        let mut last_onset = zero;

        for child in node.children().filter(|n| n.is_element()) {
            match child.tag_name().name() {
                "attributes" => {
                    if let Some(divisions) = get_child_text(child, "divisions").and_then(|s| s.parse().ok()) {
                        state.divisions = divisions;
                    }
                    if let Some(staves) = get_child_text(child, "staves").and_then(|s| s.parse().ok()) {
                        state.staff_count = state.staff_count.max(staves);
                    }
                    events.push(Event::control(child, EventKind::Attributes, cursor, part_index));
                }
                "note" => {
                    let event = parse_note(child, cursor, last_onset, part_index, state, context);
                    if !event.chord {
                        last_onset = cursor;
                        cursor = advance(cursor, event.duration, context);
                    }
                    events.push(event);
                }
                "backup" => match parse_duration(child, state.divisions) {
                    Ok(duration) if duration > cursor => {
                        context.add_warning(
                            WarningKind::NegativeTimeCursor,
                            format!("backup of {duration} quarter notes from {cursor} passes the measure start"),
                        );
                        cursor = zero;
                    }
                    Ok(duration) => match cursor.checked_sub(&duration) {
                        Some(moved) => cursor = moved,
                        None => context.add_warning(
                            WarningKind::InvalidDuration,
                            format!("backup of {duration} quarter notes overflows the time cursor, ignored"),
                        ),
                    },
                    Err(err) => context.add_warning(WarningKind::InvalidDuration, err.to_string()),
                },
                "forward" => match parse_duration(child, state.divisions) {
                    Ok(duration) => cursor = advance(cursor, duration, context),
                    Err(err) => context.add_warning(WarningKind::InvalidDuration, err.to_string()),
                },
                "barline" => events.push(Event::control(child, EventKind::Barline, cursor, part_index)),
                "direction" => events.push(Event::control(child, EventKind::Direction, cursor, part_index)),
                _ => events.push(Event::control(child, EventKind::Other, cursor, part_index)),
            }
            max_time = max_time.max(cursor);
        }

        Measure {
            part_index,
            number,
            events,
            duration: max_time,
        }
    }

    pub fn part_index(&self) -> usize {
        self.part_index
    }

    /// The measure's `number` attribute
    pub fn number(&self) -> Option<&str> {
        self.number.as_deref()
    }

    pub fn events(&self) -> &[Event<'a>] {
        &self.events
    }

    /// Total duration: the furthest point the time cursor reached
    pub fn duration(&self) -> Rational {
        self.duration
    }

    /// Group events by start time, ascending. Events keep document order
    /// within each bucket.
    pub fn sorted_events(&self) -> Vec<SimultaneousEvents<'_, 'a>> {
        let mut buckets: BTreeMap<Rational, SimultaneousEvents<'_, 'a>> = BTreeMap::new();

        for event in &self.events {
            let bucket = buckets
                .entry(event.start_time)
                .or_insert_with(|| SimultaneousEvents::new(event.start_time));
            if event.is_sounding() {
                bucket.nonzerodur.push(event);
            } else {
                bucket.zerodur.push(event);
            }
        }

        buckets.into_values().collect()
    }
}

/// Move the cursor forward, leaving it in place if the sum is not representable
fn advance(cursor: Rational, duration: Rational, context: &mut ConversionContext) -> Rational {
    cursor.checked_add(&duration).unwrap_or_else(|| {
        context.add_warning(
            WarningKind::InvalidDuration,
            format!("duration {duration} at {cursor} overflows the time cursor, ignored"),
        );
        cursor
    })
}

/// Parse a `<note>` starting at `cursor` (or at `last_onset` for chord notes)
fn parse_note<'a>(
    node: Node<'a, 'a>,
    cursor: Rational,
    last_onset: Rational,
    part_index: usize,
    state: &mut PartState,
    context: &mut ConversionContext,
) -> Event<'a> {
    let chord = get_child(node, "chord").is_some();
    let kind = if get_child(node, "grace").is_some() {
        EventKind::GraceNote
    } else if get_child(node, "rest").is_some() {
        EventKind::Rest
    } else {
        EventKind::Note
    };

    let duration = if kind == EventKind::GraceNote {
        Rational::from_integer(0)
    } else {
        parse_duration(node, state.divisions).unwrap_or_else(|err| {
            context.add_warning(
                WarningKind::InvalidDuration,
                format!("{err}, using zero duration"),
            );
            Rational::from_integer(0)
        })
    };

    let staff_index = get_child_text(node, "staff")
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|&n| n >= 1)
        .map_or(0, |n| n - 1);
    state.staff_count = state.staff_count.max(staff_index + 1);

    for lyric in get_children(node, "lyric") {
        let verse = lyric
            .attribute("number")
            .and_then(|n| n.parse::<usize>().ok())
            .unwrap_or(1);
        state.verse_count = state.verse_count.max(verse);
    }

    Event {
        node,
        kind,
        start_time: if chord { last_onset } else { cursor },
        duration,
        part_index,
        staff_index,
        voice: get_child_text(node, "voice").unwrap_or_else(|| "1".to_string()),
        voice_index: 0,
        chord,
    }
}

/// Largest `<duration>` or `<divisions>` value accepted. Keeps the
/// reciprocal and dotted-value arithmetic on durations within `i64`.
const MAX_DURATION_VALUE: i64 = i32::MAX as i64;

/// Duration of a `<note>`, `<backup>` or `<forward>` in quarter notes
fn parse_duration(node: Node, divisions: i64) -> Result<Rational, ParseError> {
    let element = node.tag_name().name();
    let text = get_child_text(node, "duration").ok_or_else(|| {
        ParseError::InvalidDuration(format!("{element} missing duration element"))
    })?;

    let value: i64 = text.parse().map_err(|_| {
        ParseError::InvalidDuration(format!("{element} has invalid duration value {text}"))
    })?;

    if value < 0 {
        return Err(ParseError::InvalidDuration(format!(
            "{element} has negative duration {value}"
        )));
    }
    if value > MAX_DURATION_VALUE {
        return Err(ParseError::InvalidDuration(format!(
            "{element} duration {value} is too large"
        )));
    }
    if divisions <= 0 || divisions > MAX_DURATION_VALUE {
        return Err(ParseError::InvalidDuration(format!(
            "divisions must be between 1 and {MAX_DURATION_VALUE}, found {divisions}"
        )));
    }

    Ok(Rational::new(value, divisions))
}

// ============================================================================
// PARTS
// ============================================================================

/// One instrument's timeline
#[derive(Debug, Clone)]
pub struct Part<'a> {
    index: usize,
    id: String,
    name: Option<String>,
    measures: Vec<Measure<'a>>,
    staff_count: usize,
    verse_count: usize,
}

impl<'a> Part<'a> {
    /// Build the part timeline from its `<part>` element
    pub fn from_source(source: &PartSource<'a>, index: usize, context: &mut ConversionContext) -> Self {
        context.enter_part(&source.id);

        let mut state = PartState::default();
        let mut measures: Vec<Measure<'a>> = get_children(source.content, "measure")
            .map(|node| Measure::from_node(node, index, &mut state, context))
            .collect();

        assign_voice_layers(&mut measures);
        context.leave_part();

        Part {
            index,
            id: source.id.clone(),
            name: source.name.clone(),
            measures,
            staff_count: state.staff_count,
            verse_count: state.verse_count,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn measures(&self) -> &[Measure<'a>] {
        &self.measures
    }

    pub fn measure(&self, index: usize) -> Option<&Measure<'a>> {
        self.measures.get(index)
    }

    pub fn measure_count(&self) -> usize {
        self.measures.len()
    }

    pub fn staff_count(&self) -> usize {
        self.staff_count
    }

    /// Number of lyric lines
    pub fn verse_count(&self) -> usize {
        self.verse_count
    }

    /// Sum of measure durations, `None` if it is not representable
    pub fn duration(&self) -> Option<Rational> {
        self.measures
            .iter()
            .try_fold(Rational::from_integer(0), |total, m| total.checked_add(&m.duration()))
    }
}

/// Map each staff's `<voice>` numbers to layer indices in order of first appearance
fn assign_voice_layers(measures: &mut [Measure]) {
    let mut layers: HashMap<(usize, String), usize> = HashMap::new();
    let mut next_layer: HashMap<usize, usize> = HashMap::new();

    for event in measures.iter_mut().flat_map(|m| m.events.iter_mut()) {
        if !matches!(event.kind, EventKind::Note | EventKind::Rest | EventKind::GraceNote) {
            continue;
        }
        let key = (event.staff_index, event.voice.clone());
        let layer = *layers.entry(key).or_insert_with(|| {
            let next = next_layer.entry(event.staff_index).or_insert(0);
            let layer = *next;
            *next += 1;
            layer
        });
        event.voice_index = layer;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::musicxml::musicxml_to_humdrum::parser::XmlDocument;

    fn build_parts(xml: &str, check: impl FnOnce(&[Part], &ConversionContext)) {
        let doc = XmlDocument::parse(xml).unwrap();
        let mut context = ConversionContext::new();
        let sources = doc.extract_parts(&mut context).unwrap();
        let parts: Vec<Part> = sources
            .iter()
            .enumerate()
            .map(|(i, s)| Part::from_source(s, i, &mut context))
            .collect();
        check(&parts, &context);
    }

    fn score(measures: &str) -> String {
        format!(
            r#"<score-partwise>
  <part-list><score-part id="P1"><part-name>Piano</part-name></score-part></part-list>
  <part id="P1">{measures}</part>
</score-partwise>"#
        )
    }

    #[test]
    fn test_cursor_assigns_start_times() {
        let xml = score(
            r#"<measure number="1">
  <attributes><divisions>2</divisions></attributes>
  <note><pitch><step>C</step><octave>4</octave></pitch><duration>2</duration></note>
  <note><pitch><step>D</step><octave>4</octave></pitch><duration>1</duration></note>
  <note><rest/><duration>1</duration></note>
  <barline location="right"><bar-style>light-heavy</bar-style></barline>
</measure>"#,
        );
        build_parts(&xml, |parts, context| {
            let measure = parts[0].measure(0).unwrap();
            let times: Vec<Rational> = measure.events().iter().map(|e| e.start_time()).collect();
            assert_eq!(
                times,
                vec![
                    Rational::from_integer(0),
                    Rational::from_integer(0),
                    Rational::from_integer(1),
                    Rational::new(3, 2),
                    Rational::from_integer(2),
                ]
            );
            assert_eq!(measure.events()[0].kind(), EventKind::Attributes);
            assert_eq!(measure.events()[3].kind(), EventKind::Rest);
            assert_eq!(measure.events()[4].kind(), EventKind::Barline);
            assert_eq!(measure.duration(), Rational::from_integer(2));
            assert_eq!(measure.number(), Some("1"));
            assert!(context.warnings.is_empty());
        });
    }

    #[test]
    fn test_event_durations_sum_to_measure_duration() {
        let xml = score(
            r#"<measure number="1">
  <attributes><divisions>4</divisions></attributes>
  <note><pitch><step>C</step><octave>4</octave></pitch><duration>6</duration><dot/></note>
  <note><pitch><step>D</step><octave>4</octave></pitch><duration>2</duration></note>
  <note><pitch><step>E</step><octave>4</octave></pitch><duration>8</duration></note>
</measure>"#,
        );
        build_parts(&xml, |parts, _| {
            let measure = parts[0].measure(0).unwrap();
            let total = measure
                .events()
                .iter()
                .fold(Rational::from_integer(0), |sum, e| sum + e.duration());
            assert_eq!(total, measure.duration());
            assert_eq!(total, Rational::from_integer(4));
        });
    }

    #[test]
    fn test_divisions_carry_over_between_measures() {
        let xml = score(
            r#"<measure number="1">
  <attributes><divisions>8</divisions></attributes>
  <note><pitch><step>C</step><octave>4</octave></pitch><duration>8</duration></note>
</measure>
<measure number="2">
  <note><pitch><step>C</step><octave>4</octave></pitch><duration>4</duration></note>
</measure>"#,
        );
        build_parts(&xml, |parts, _| {
            assert_eq!(parts[0].measure_count(), 2);
            assert_eq!(parts[0].measure(1).unwrap().duration(), Rational::new(1, 2));
            assert_eq!(parts[0].duration(), Some(Rational::new(3, 2)));
        });
    }

    #[test]
    fn test_chord_notes_share_onset() {
        let xml = score(
            r#"<measure number="1">
  <attributes><divisions>1</divisions></attributes>
  <note><pitch><step>C</step><octave>4</octave></pitch><duration>2</duration></note>
  <note><chord/><pitch><step>E</step><octave>4</octave></pitch><duration>2</duration></note>
  <note><pitch><step>D</step><octave>4</octave></pitch><duration>2</duration></note>
</measure>"#,
        );
        build_parts(&xml, |parts, _| {
            let events = parts[0].measure(0).unwrap().events();
            assert_eq!(events[2].start_time(), Rational::from_integer(0));
            assert!(events[2].is_chord());
            assert_eq!(events[3].start_time(), Rational::from_integer(2));
        });
    }

    #[test]
    fn test_backup_creates_second_voice() {
        let xml = score(
            r#"<measure number="1">
  <attributes><divisions>1</divisions><staves>2</staves></attributes>
  <note><pitch><step>C</step><octave>5</octave></pitch><duration>4</duration><voice>1</voice><staff>1</staff></note>
  <backup><duration>4</duration></backup>
  <note><pitch><step>E</step><octave>4</octave></pitch><duration>2</duration><voice>2</voice><staff>1</staff></note>
  <note><pitch><step>F</step><octave>4</octave></pitch><duration>2</duration><voice>2</voice><staff>1</staff></note>
  <backup><duration>4</duration></backup>
  <note><pitch><step>C</step><octave>3</octave></pitch><duration>4</duration><voice>5</voice><staff>2</staff></note>
</measure>"#,
        );
        build_parts(&xml, |parts, _| {
            let part = &parts[0];
            assert_eq!(part.staff_count(), 2);

            let notes: Vec<&Event> = part.measure(0).unwrap().events()
                .iter()
                .filter(|e| e.is_sounding())
                .collect();
            assert_eq!(notes.len(), 4);
            assert_eq!((notes[0].staff_index(), notes[0].voice_index()), (0, 0));
            assert_eq!((notes[1].staff_index(), notes[1].voice_index()), (0, 1));
            assert_eq!(notes[1].start_time(), Rational::from_integer(0));
            assert_eq!(notes[2].start_time(), Rational::from_integer(2));
            // voice 5 is the first voice seen on staff 2
            assert_eq!((notes[3].staff_index(), notes[3].voice_index()), (1, 0));
            assert_eq!(part.measure(0).unwrap().duration(), Rational::from_integer(4));
        });
    }

    #[test]
    fn test_forward_moves_cursor_without_event() {
        let xml = score(
            r#"<measure number="1">
  <attributes><divisions>1</divisions></attributes>
  <forward><duration>2</duration></forward>
  <note><pitch><step>G</step><octave>4</octave></pitch><duration>2</duration></note>
</measure>"#,
        );
        build_parts(&xml, |parts, _| {
            let events = parts[0].measure(0).unwrap().events();
            assert_eq!(events.len(), 2);
            assert_eq!(events[1].start_time(), Rational::from_integer(2));
        });
    }

    #[test]
    fn test_excessive_backup_is_clamped() {
        let xml = score(
            r#"<measure number="1">
  <note><pitch><step>G</step><octave>4</octave></pitch><duration>1</duration></note>
  <backup><duration>3</duration></backup>
  <note><pitch><step>A</step><octave>4</octave></pitch><duration>1</duration></note>
</measure>"#,
        );
        build_parts(&xml, |parts, context| {
            let events = parts[0].measure(0).unwrap().events();
            assert_eq!(events[1].start_time(), Rational::from_integer(0));
            assert_eq!(context.warnings[0].kind, WarningKind::NegativeTimeCursor);
            assert_eq!(context.warnings[0].part_id.as_deref(), Some("P1"));
            assert_eq!(context.warnings[0].measure_number.as_deref(), Some("1"));
        });
    }

    #[test]
    fn test_missing_duration_substitutes_zero() {
        let xml = score(
            r#"<measure number="3">
  <note><pitch><step>G</step><octave>4</octave></pitch></note>
  <note><pitch><step>A</step><octave>4</octave></pitch><duration>1</duration></note>
</measure>"#,
        );
        build_parts(&xml, |parts, context| {
            let events = parts[0].measure(0).unwrap().events();
            assert_eq!(events[0].duration(), Rational::from_integer(0));
            assert!(events[0].is_sounding());
            assert_eq!(events[1].start_time(), Rational::from_integer(0));
            assert_eq!(context.warnings.len(), 1);
            assert_eq!(context.warnings[0].kind, WarningKind::InvalidDuration);
            assert_eq!(context.warnings[0].measure_number.as_deref(), Some("3"));
        });
    }

    #[test]
    fn test_oversized_divisions_are_rejected() {
        let xml = score(
            r#"<measure number="1">
  <attributes><divisions>4611686018427387904</divisions></attributes>
  <note><pitch><step>C</step><octave>4</octave></pitch><duration>1</duration></note>
  <note><pitch><step>D</step><octave>4</octave></pitch><duration>1</duration></note>
</measure>"#,
        );
        build_parts(&xml, |parts, context| {
            let measure = parts[0].measure(0).unwrap();
            assert!(measure.events().iter().all(|e| e.duration() == Rational::from_integer(0)));
            assert_eq!(measure.duration(), Rational::from_integer(0));
            assert_eq!(context.warnings.len(), 2);
            assert!(context.warnings.iter().all(|w| w.kind == WarningKind::InvalidDuration));
        });
    }

    #[test]
    fn test_oversized_duration_is_rejected() {
        let xml = score(
            r#"<measure number="1">
  <note><pitch><step>C</step><octave>4</octave></pitch><duration>9223372036854775807</duration></note>
  <forward><duration>9223372036854775807</duration></forward>
  <note><pitch><step>D</step><octave>4</octave></pitch><duration>1</duration></note>
</measure>"#,
        );
        build_parts(&xml, |parts, context| {
            let events = parts[0].measure(0).unwrap().events();
            assert_eq!(events[0].duration(), Rational::from_integer(0));
            assert_eq!(events[1].start_time(), Rational::from_integer(0));
            assert_eq!(events[1].duration(), Rational::from_integer(1));
            assert_eq!(context.warnings.len(), 2);
            assert!(context.warnings.iter().all(|w| w.kind == WarningKind::InvalidDuration));
        });
    }

    #[test]
    fn test_cursor_overflow_is_ignored() {
        // pairwise coprime divisions push the cursor denominator past i64
        let xml = score(
            r#"<measure number="1">
  <attributes><divisions>2147483647</divisions></attributes>
  <note><pitch><step>C</step><octave>4</octave></pitch><duration>1</duration></note>
  <attributes><divisions>2147483646</divisions></attributes>
  <note><pitch><step>D</step><octave>4</octave></pitch><duration>1</duration></note>
  <attributes><divisions>2147483645</divisions></attributes>
  <note><pitch><step>E</step><octave>4</octave></pitch><duration>1</duration></note>
  <note><pitch><step>F</step><octave>4</octave></pitch><duration>1</duration></note>
</measure>"#,
        );
        build_parts(&xml, |parts, context| {
            let measure = parts[0].measure(0).unwrap();
            let notes: Vec<&Event> = measure.events().iter().filter(|e| e.is_sounding()).collect();
            assert_eq!(notes.len(), 4);
            // E could not advance the cursor, so F starts where E did
            assert_eq!(notes[3].start_time(), notes[2].start_time());
            assert_eq!(measure.duration(), notes[2].start_time());
            assert_eq!(context.warnings.len(), 2);
            assert!(context.warnings.iter().all(|w| w.kind == WarningKind::InvalidDuration));
        });
    }

    #[test]
    fn test_grace_notes_are_zero_duration() {
        let xml = score(
            r#"<measure number="1">
  <note><grace/><pitch><step>B</step><octave>4</octave></pitch></note>
  <note><pitch><step>C</step><octave>5</octave></pitch><duration>1</duration></note>
</measure>"#,
        );
        build_parts(&xml, |parts, context| {
            let measure = parts[0].measure(0).unwrap();
            assert_eq!(measure.events()[0].kind(), EventKind::GraceNote);
            let buckets = measure.sorted_events();
            assert_eq!(buckets.len(), 1);
            assert_eq!(buckets[0].zerodur.len(), 1);
            assert_eq!(buckets[0].nonzerodur.len(), 1);
            assert!(context.warnings.is_empty());
        });
    }

    #[test]
    fn test_sorted_events_groups_by_time() {
        let xml = score(
            r#"<measure number="1">
  <attributes><divisions>1</divisions><time><beats>2</beats><beat-type>4</beat-type></time></attributes>
  <note><pitch><step>C</step><octave>4</octave></pitch><duration>1</duration><voice>1</voice></note>
  <note><pitch><step>D</step><octave>4</octave></pitch><duration>1</duration><voice>1</voice></note>
  <backup><duration>2</duration></backup>
  <note><pitch><step>A</step><octave>3</octave></pitch><duration>2</duration><voice>2</voice></note>
  <barline location="right"/>
</measure>"#,
        );
        build_parts(&xml, |parts, _| {
            let buckets = parts[0].measure(0).unwrap().sorted_events();
            let times: Vec<Rational> = buckets.iter().map(|b| b.start_time).collect();
            assert_eq!(
                times,
                vec![Rational::from_integer(0), Rational::from_integer(1), Rational::from_integer(2)]
            );
            assert_eq!(buckets[0].zerodur.len(), 1);
            assert_eq!(buckets[0].nonzerodur.len(), 2);
            assert_eq!(buckets[1].nonzerodur.len(), 1);
            assert!(buckets[2].nonzerodur.is_empty());
            assert_eq!(buckets[2].zerodur[0].kind(), EventKind::Barline);
        });
    }

    #[test]
    fn test_verse_count() {
        let xml = score(
            r#"<measure number="1">
  <note><pitch><step>C</step><octave>4</octave></pitch><duration>1</duration>
    <lyric number="1"><text>la</text></lyric>
    <lyric number="2"><text>lo</text></lyric>
  </note>
</measure>"#,
        );
        build_parts(&xml, |parts, _| {
            assert_eq!(parts[0].verse_count(), 2);
            assert_eq!(parts[0].name(), Some("Piano"));
        });
    }

    #[test]
    fn test_token_text() {
        let xml = score(
            r#"<measure number="1">
  <attributes><divisions>2</divisions></attributes>
  <note><pitch><step>F</step><alter>1</alter><octave>5</octave></pitch><duration>3</duration><tie type="start"/></note>
</measure>"#,
        );
        build_parts(&xml, |parts, _| {
            let event = &parts[0].measure(0).unwrap().events()[1];
            assert_eq!(event.token_text().unwrap(), "[4.ff#");
        });
    }
}
