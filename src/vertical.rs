//! Vertical moments: walk several independently timed voices in lockstep.
//!
//! Each voice is a contiguous sequence of events covering the same span.
//! [`VerticalMoments`] yields one [`VerticalSlice`] per change point, in
//! time order, holding the event each voice is sounding there.

use crate::error::{ReduceError, Result};
use crate::event::{same_time, TimedEvent};

/// The events sounding together at one change point.
#[derive(Debug, Clone)]
pub struct VerticalSlice<'a> {
    /// Latest start among the current events
    pub offset: f64,
    /// Earliest stop among the current events
    pub end: f64,
    /// One entry per voice; `None` for a voice with no events
    pub events: Vec<Option<&'a TimedEvent>>,
    /// Index of each entry within its voice
    pub indices: Vec<Option<usize>>,
}

impl VerticalSlice<'_> {
    /// The events that are present, skipping empty voices.
    pub fn present(&self) -> impl Iterator<Item = &TimedEvent> + '_ {
        self.events.iter().filter_map(|e| *e)
    }
}

/// Lockstep iterator over voices. Finite and not restartable.
#[derive(Debug)]
pub struct VerticalMoments<'a> {
    voices: &'a [Vec<TimedEvent>],
    cursors: Vec<usize>,
    started: bool,
    finished: bool,
}

impl<'a> VerticalMoments<'a> {
    /// Check the voices and set up one cursor per voice.
    ///
    /// Fails with [`ReduceError::StructuralMismatch`] when a voice has a
    /// hole or overlap between consecutive events, or when the non-empty
    /// voices do not all end at the same point.
    pub fn new(voices: &'a [Vec<TimedEvent>]) -> Result<Self> {
        let mut common_end: Option<f64> = None;
        for (v, voice) in voices.iter().enumerate() {
            for pair in voice.windows(2) {
                if !same_time(pair[0].end(), pair[1].offset) {
                    return Err(ReduceError::StructuralMismatch(format!(
                        "voice {v} is not contiguous: event ending at {} is followed by one at {}",
                        pair[0].end(),
                        pair[1].offset
                    )));
                }
            }
            let Some(last) = voice.last() else { continue };
            match common_end {
                None => common_end = Some(last.end()),
                Some(end) if !same_time(end, last.end()) => {
                    return Err(ReduceError::StructuralMismatch(format!(
                        "voice {v} ends at {} but earlier voices end at {end}",
                        last.end()
                    )));
                }
                Some(_) => {}
            }
        }

        Ok(Self {
            voices,
            cursors: vec![0; voices.len()],
            started: false,
            finished: common_end.is_none(),
        })
    }

    fn current(&self, voice: usize) -> Option<&'a TimedEvent> {
        self.voices[voice].get(self.cursors[voice])
    }

    fn at_last(&self, voice: usize) -> bool {
        self.cursors[voice] + 1 >= self.voices[voice].len()
    }

    fn earliest_stop(&self) -> Option<f64> {
        (0..self.voices.len())
            .filter_map(|v| self.current(v))
            .map(TimedEvent::end)
            .reduce(f64::min)
    }

    fn slice(&self) -> VerticalSlice<'a> {
        let events: Vec<Option<&'a TimedEvent>> = (0..self.voices.len()).map(|v| self.current(v)).collect();
        let indices = (0..self.voices.len())
            .map(|v| self.current(v).map(|_| self.cursors[v]))
            .collect();
        let offset = events.iter().flatten().map(|e| e.offset).fold(f64::MIN, f64::max);
        let end = events.iter().flatten().map(|e| e.end()).fold(f64::MAX, f64::min);
        VerticalSlice { offset, end, events, indices }
    }
}

impl<'a> Iterator for VerticalMoments<'a> {
    type Item = VerticalSlice<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if !self.started {
            self.started = true;
            return Some(self.slice());
        }

        if (0..self.voices.len()).all(|v| self.at_last(v)) {
            self.finished = true;
            return None;
        }

        let earliest = self.earliest_stop()?;
        for v in 0..self.voices.len() {
            if self.at_last(v) {
                continue;
            }
            let next = &self.voices[v][self.cursors[v] + 1];
            if same_time(next.offset, earliest) {
                self.cursors[v] += 1;
            }
        }
        Some(self.slice())
    }
}
