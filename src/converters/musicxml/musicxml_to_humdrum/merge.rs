//! Timeline merge of one measure across all parts
//!
//! Every part contributes its measure as a list of [`SimultaneousEvents`]
//! sorted by start time. [`TimelineMerge`] walks those lists in lockstep and
//! yields one [`NowGroup`] per distinct start time, in ascending order.

use crate::converters::musicxml::musicxml_to_humdrum::model::{Measure, SimultaneousEvents};
use crate::converters::musicxml::musicxml_to_humdrum::types::Rational;
use std::iter::Peekable;
use std::vec::IntoIter;

/// Everything that starts at one instant, across parts
#[derive(Debug)]
pub struct NowGroup<'m, 'a> {
    pub time: Rational,
    /// One entry per contributing part
    pub events: Vec<SimultaneousEvents<'m, 'a>>,
    /// Part index of each entry in `events`
    pub parts: Vec<usize>,
}

/// Iterator over the merged start times of one measure.
///
/// Parts are visited last to first when collecting a group, so `events[0]`
/// belongs to the highest-numbered part present at that time.
pub struct TimelineMerge<'m, 'a> {
    cursors: Vec<Peekable<IntoIter<SimultaneousEvents<'m, 'a>>>>,
}

impl<'m, 'a> TimelineMerge<'m, 'a> {
    /// `measures[i]` is part `i`'s measure at the current measure index
    pub fn new(measures: &[&'m Measure<'a>]) -> Self {
        let cursors = measures
            .iter()
            .map(|measure| measure.sorted_events().into_iter().peekable())
            .collect();
        TimelineMerge { cursors }
    }

    /// Earliest start time not yet consumed in any part
    fn next_time(&mut self) -> Option<Rational> {
        self.cursors
            .iter_mut()
            .filter_map(|cursor| cursor.peek().map(|group| group.start_time))
            .min()
    }

    /// True once every part's events have been consumed
    pub fn all_end(&mut self) -> bool {
        self.cursors.iter_mut().all(|cursor| cursor.peek().is_none())
    }
}

impl<'m, 'a> Iterator for TimelineMerge<'m, 'a> {
    type Item = NowGroup<'m, 'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.all_end() {
            return None;
        }
        let time = self.next_time()?;

        let mut events = Vec::new();
        let mut parts = Vec::new();
        for (index, cursor) in self.cursors.iter_mut().enumerate().rev() {
            if let Some(group) = cursor.next_if(|group| group.start_time == time) {
                events.push(group);
                parts.push(index);
            }
        }

        Some(NowGroup { time, events, parts })
    }
}
