//! Build output measures from reduced events.
//!
//! The assembler owns the state carried from one output measure to the
//! next (the last time signature written) and fixes up each reduced
//! measure so it fills its bar exactly:
//!
//! - chords optionally rewritten into close position,
//! - gaps between events absorbed by the preceding event,
//! - the last event stretched (or clipped) to the barline,
//! - a tie started from the previous measure when the chord carries over,
//! - a time signature attached only when it changes.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ReduceError, Result};
use crate::event::{round_to, EventKind, TieState, TimedEvent, OFFSET_PLACES};
use crate::model::{Clef, Pitch, TimeSignature};
use crate::theory::{closed_position, remove_redundant_pitches};

/// One measure of the reduced part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputMeasure {
    /// Index of the source measure in the score
    pub number: usize,
    /// Present only when it differs from the previous output measure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_signature: Option<TimeSignature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clef: Option<Clef>,
    pub events: Vec<TimedEvent>,
}

impl OutputMeasure {
    /// Total length of the measure's events.
    pub fn length(&self) -> f64 {
        self.events.iter().map(|e| e.duration).sum()
    }
}

/// The bar a measure has to fill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    /// Time signature in effect in the source measure
    pub time_signature: Option<TimeSignature>,
    /// Length to fill, in quarter notes
    pub length: f64,
}

impl Bar {
    /// A full bar of `ts`.
    pub fn full(ts: TimeSignature) -> Self {
        Self { time_signature: Some(ts), length: ts.bar_length() }
    }
}

/// Voicing choices applied while assembling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyOptions {
    /// Rewrite chords into close position
    pub closed_position: bool,
    /// Octave for the bass of close-position chords
    pub force_octave: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct MeasureAssembler {
    options: AssemblyOptions,
    last_time_signature: Option<TimeSignature>,
}

impl MeasureAssembler {
    pub fn new(options: AssemblyOptions) -> Self {
        Self { options, last_time_signature: None }
    }

    /// The time signature most recently written to an output measure.
    pub fn last_time_signature(&self) -> Option<TimeSignature> {
        self.last_time_signature
    }

    /// Turn one reduced measure into an [`OutputMeasure`].
    ///
    /// `previous` is the final event of the previous output measure; it
    /// receives [`TieState::Start`] when this measure opens with the same
    /// note or chord.
    pub fn assemble(
        &mut self,
        number: usize,
        reduced: Vec<TimedEvent>,
        bar: Bar,
        previous: Option<&mut TimedEvent>,
    ) -> Result<OutputMeasure> {
        let mut events: Vec<TimedEvent> = Vec::with_capacity(reduced.len().max(1));
        let mut last_end = 0.0;

        for mut event in reduced {
            if self.options.closed_position {
                self.close_voicing(&mut event);
            }
            if let Some(last) = events.last_mut() {
                let gap = event.offset - last_end;
                if round_to(gap, OFFSET_PLACES) != 0.0 {
                    last.duration += gap;
                }
            }
            last_end = event.end();
            events.push(event);
        }

        if let Some(last) = events.last_mut() {
            let shortfall = bar.length - last_end;
            if round_to(shortfall, OFFSET_PLACES) != 0.0 {
                if shortfall < 0.0 {
                    warn!(measure = number, content = last_end, bar = bar.length, "measure runs past the barline");
                }
                last.duration += shortfall;
            }
        } else if bar.length > 0.0 {
            events.push(TimedEvent::rest(0.0, bar.length));
        }

        if let Some(bad) = events.iter().find(|e| round_to(e.duration, OFFSET_PLACES) <= 0.0) {
            return Err(ReduceError::NumericInstability(format!(
                "event at {} has length {} after filling the bar",
                bad.offset, bad.duration
            )));
        }

        if let (Some(previous), Some(first)) = (previous, events.first()) {
            if continues(previous, first) {
                previous.tie = TieState::Start;
            }
        }

        let mut time_signature = None;
        if bar.time_signature != self.last_time_signature {
            time_signature = bar.time_signature;
            self.last_time_signature = bar.time_signature;
        }

        Ok(OutputMeasure { number, time_signature, clef: None, events })
    }

    fn close_voicing(&self, event: &mut TimedEvent) {
        if let EventKind::Chord(pitches) = &mut event.kind {
            let voiced = closed_position(pitches, self.options.force_octave);
            *pitches = remove_redundant_pitches(&voiced);
        }
    }
}

/// Whether `next` sounds exactly what `previous` was sounding.
fn continues(previous: &TimedEvent, next: &TimedEvent) -> bool {
    match (&previous.kind, &next.kind) {
        (EventKind::Note(a), EventKind::Note(b)) => a.spelled_like(b),
        (EventKind::Chord(a), EventKind::Chord(b)) => {
            a.len() == b.len() && sorted(a).iter().zip(sorted(b).iter()).all(|(x, y)| x.spelled_like(y))
        }
        _ => false,
    }
}

fn sorted(pitches: &[Pitch]) -> Vec<&Pitch> {
    let mut sorted: Vec<&Pitch> = pitches.iter().collect();
    sorted.sort_by_key(|p| p.to_midi());
    sorted
}
