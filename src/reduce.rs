//! Reduce one chordified measure to its few most important chords.
//!
//! The reduction weighs every pitch-class set in the measure, keeps the
//! heaviest few, and then walks the measure once: each retained chord
//! swallows the time of everything up to the next different retained
//! chord, so the output still covers the whole measure without gaps.
//!
//! ```text
//!   C  C  F  C        weights: C = 3.0, F = 0.05
//!   |--|--|--|--|     trim at 0.3 × 3.0 drops F
//!   C-----------|     one chord for the bar
//! ```

use tracing::debug;

use crate::error::{ReduceError, Result};
use crate::event::{round_to, same_time, PitchClassKey, TieState, TimedEvent};
use crate::theory;
use crate::weights::{compute_weights, ChordScorer, ChordWeights};

/// Fractional offsets (rounded to 3 places) pulled back onto the beat.
const SYNCOPATIONS: [f64; 5] = [0.250, 0.125, 0.333, 0.063, 0.062];

/// Check the reduction parameters.
pub fn validate_parameters(max_chords: usize, trim_ratio: f64) -> Result<()> {
    if max_chords == 0 {
        return Err(ReduceError::InvalidParameter(
            "max_chords must be at least 1".to_string(),
        ));
    }
    if !trim_ratio.is_finite() || trim_ratio <= 0.0 || trim_ratio > 1.0 {
        return Err(ReduceError::InvalidParameter(format!(
            "trim ratio must be in (0, 1], got {trim_ratio}"
        )));
    }
    Ok(())
}

/// Keys that survive ranking and trimming, heaviest first.
///
/// At most `max_chords` keys are taken; a key is kept while its weight is
/// at least `trim_ratio` times the heaviest weight, and the scan stops at
/// the first key below that line.
pub fn select_chords(weights: &ChordWeights, max_chords: usize, trim_ratio: f64) -> Vec<PitchClassKey> {
    let ranked = weights.ranked();
    let Some(top) = ranked.first() else {
        return Vec::new();
    };
    let threshold = top.weight * trim_ratio;
    ranked
        .iter()
        .take(max_chords)
        .take_while(|c| c.weight >= threshold)
        .map(|c| c.key)
        .collect()
}

/// Left fold over a measure's events that keeps retained chords and folds
/// everything else into their durations.
///
/// Each [`step`](GreedyMerge::step) consumes the fold and returns the next
/// state; [`finish`](GreedyMerge::finish) closes the open chord.
#[derive(Debug, Clone, Default)]
pub struct GreedyMerge {
    output: Vec<TimedEvent>,
    current: Option<TimedEvent>,
    current_key: Option<PitchClassKey>,
    /// Time accumulated for the open chord so far
    length: f64,
}

impl GreedyMerge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(mut self, event: TimedEvent, retained: &[PitchClassKey]) -> Self {
        let key = event.pitch_class_key();
        let opens = !event.is_rest() && retained.contains(&key) && self.current_key != Some(key);
        if !opens {
            self.length += event.duration;
            return self;
        }

        let mut event = event;
        match self.current.take() {
            None => {
                if !same_time(event.offset, 0.0) {
                    self.length = event.offset;
                    event.offset = 0.0;
                }
            }
            Some(mut open) => {
                open.duration = self.length;
                self.output.push(open);
                self.length = 0.0;
            }
        }
        event.tie = TieState::None;
        for pitch in event.pitches_mut() {
            pitch.accidental_shown = None;
        }
        self.length += event.duration;
        self.current_key = Some(key);
        self.current = Some(event);
        self
    }

    pub fn finish(mut self) -> Result<Vec<TimedEvent>> {
        if let Some(mut open) = self.current.take() {
            open.duration = self.length;
            self.output.push(open);
        }
        if let Some(bad) = self.output.iter().find(|e| e.duration <= 0.0 || same_time(e.duration, 0.0)) {
            return Err(ReduceError::NumericInstability(format!(
                "retained chord at {} has length {}",
                bad.offset, bad.duration
            )));
        }
        Ok(self.output)
    }
}

/// Pull chords that start just after a beat back onto it.
///
/// When an event's fractional offset is one of the short syncopations, that
/// fraction moves from the previous event to this one. Every event keeps a
/// positive length, so a previous event left with no length is dropped
/// rather than kept empty; a negative remainder is
/// [`ReduceError::NumericInstability`].
pub fn smooth_syncopation(events: Vec<TimedEvent>) -> Result<Vec<TimedEvent>> {
    let mut out: Vec<TimedEvent> = Vec::with_capacity(events.len());

    for mut event in events {
        let floor = event.offset.floor();
        let fraction = event.offset - floor;
        let rounded = round_to(fraction, 3);
        let syncopated = SYNCOPATIONS.iter().any(|s| (rounded - s).abs() < 1e-9);

        let mut emptied = false;
        if let Some(previous) = out.last_mut().filter(|_| syncopated) {
            previous.duration -= fraction;
            event.offset = floor;
            event.duration += fraction;

            let remaining = round_to(previous.duration, 6);
            if remaining < 0.0 {
                return Err(ReduceError::NumericInstability(format!(
                    "smoothing the event at {} left its predecessor with length {}",
                    floor + fraction,
                    previous.duration
                )));
            }
            emptied = remaining == 0.0;
        }
        if emptied {
            if let Some(dropped) = out.pop() {
                debug!(offset = dropped.offset, "dropping zero-length event after smoothing");
            }
        }
        out.push(event);
    }

    Ok(out)
}

/// Merge runs of adjacent consonant chords whose combined pitches are
/// still consonant. Rests and dissonant chords break a run.
pub fn collapse_arpeggios(events: Vec<TimedEvent>) -> Vec<TimedEvent> {
    let mut out: Vec<TimedEvent> = Vec::with_capacity(events.len());

    for event in events {
        let Some(previous) = out.last_mut() else {
            out.push(event);
            continue;
        };
        let mergeable = !previous.is_rest() && !event.is_rest() && previous.is_consonant() && event.is_consonant();
        if mergeable {
            let mut union: Vec<_> = previous.pitches().iter().chain(event.pitches()).cloned().collect();
            union.sort_by_key(|p| p.to_midi());
            let union = theory::remove_redundant_pitches(&union);
            if theory::is_consonant(&union) {
                let merged = TimedEvent::chord(union, previous.offset, previous.duration + event.duration)
                    .with_beat_strength(previous.beat_strength);
                *previous = merged;
                continue;
            }
        }
        out.push(event);
    }

    out
}

/// Reduce one measure of chordified events to at most `max_chords`
/// distinct chords.
///
/// A measure with nothing to weigh (no events, or only rests) becomes a
/// single rest spanning its content.
pub fn reduce_measure<S: ChordScorer + ?Sized>(
    events: Vec<TimedEvent>,
    max_chords: usize,
    scorer: &S,
    trim_ratio: f64,
) -> Result<Vec<TimedEvent>> {
    validate_parameters(max_chords, trim_ratio)?;

    let weights = compute_weights(&events, scorer);
    let retained = select_chords(&weights, max_chords, trim_ratio);
    if retained.is_empty() {
        let length = events.iter().map(TimedEvent::end).fold(0.0, f64::max);
        if length <= 0.0 {
            return Ok(Vec::new());
        }
        return Ok(vec![TimedEvent::rest(0.0, length)]);
    }

    let merged = events
        .into_iter()
        .fold(GreedyMerge::new(), |fold, event| fold.step(event, &retained))
        .finish()?;
    smooth_syncopation(merged)
}
