//! Chord weighting: how much each pitch-class set matters in a measure.
//!
//! A [`ChordScorer`] gives every pitched event a non-negative score; scores
//! for events sharing a [`PitchClassKey`] are summed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::event::{PitchClassKey, TimedEvent};

/// Multiplier applied to dissonant events by [`WeightPolicy::Consonance`].
pub const DISSONANCE_PENALTY: f64 = 0.1;

/// Scores one event given its position among the measure's pitched events.
pub trait ChordScorer {
    fn score(&self, event: &TimedEvent, position: usize, total: usize) -> f64;
}

impl<F> ChordScorer for F
where
    F: Fn(&TimedEvent, usize, usize) -> f64,
{
    fn score(&self, event: &TimedEvent, position: usize, total: usize) -> f64 {
        self(event, position, total)
    }
}

/// The built-in scoring policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightPolicy {
    /// Duration alone.
    DurationOnly,
    /// Duration × beat strength.
    DurationBeatStrength,
    /// Duration × beat strength, but the last event of the measure leads
    /// into the barline and scores its duration alone.
    DurationBeatStrengthPosition,
    /// The positional policy, with dissonant events scaled down by
    /// [`DISSONANCE_PENALTY`].
    #[default]
    Consonance,
}

impl ChordScorer for WeightPolicy {
    fn score(&self, event: &TimedEvent, position: usize, total: usize) -> f64 {
        let is_last = position + 1 == total;
        let positional = if is_last {
            event.duration
        } else {
            event.duration * event.beat_strength
        };
        match self {
            WeightPolicy::DurationOnly => event.duration,
            WeightPolicy::DurationBeatStrength => event.duration * event.beat_strength,
            WeightPolicy::DurationBeatStrengthPosition => positional,
            WeightPolicy::Consonance => {
                let consonance = if event.is_consonant() { 1.0 } else { DISSONANCE_PENALTY };
                positional * consonance
            }
        }
    }
}

/// Accumulated weight of one pitch-class set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightedChord {
    pub key: PitchClassKey,
    pub weight: f64,
    /// Earliest offset at which the set sounds; breaks weight ties.
    pub first_offset: f64,
}

/// Weight per pitch-class set for one measure.
#[derive(Debug, Clone, Default)]
pub struct ChordWeights {
    chords: HashMap<PitchClassKey, WeightedChord>,
}

impl ChordWeights {
    pub fn get(&self, key: &PitchClassKey) -> Option<f64> {
        self.chords.get(key).map(|c| c.weight)
    }

    pub fn len(&self) -> usize {
        self.chords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chords.is_empty()
    }

    /// Plain key → weight map.
    pub fn to_map(&self) -> HashMap<PitchClassKey, f64> {
        self.chords.iter().map(|(k, c)| (*k, c.weight)).collect()
    }

    /// Heaviest first; equal weights go to the set heard first, then to the
    /// smaller key, so the order never depends on hashing.
    pub fn ranked(&self) -> Vec<WeightedChord> {
        let mut ranked: Vec<WeightedChord> = self.chords.values().copied().collect();
        ranked.sort_by(|a, b| {
            b.weight
                .total_cmp(&a.weight)
                .then(a.first_offset.total_cmp(&b.first_offset))
                .then(a.key.cmp(&b.key))
        });
        ranked
    }
}

/// Sum scores per pitch-class set over the pitched events of a measure.
///
/// Rests are not weighed and do not count towards `position`/`total`.
pub fn compute_weights<S: ChordScorer + ?Sized>(events: &[TimedEvent], scorer: &S) -> ChordWeights {
    let pitched: Vec<&TimedEvent> = events.iter().filter(|e| !e.is_rest()).collect();
    let total = pitched.len();
    let mut weights = ChordWeights::default();

    for (position, event) in pitched.into_iter().enumerate() {
        let key = event.pitch_class_key();
        let score = scorer.score(event, position, total);
        let entry = weights.chords.entry(key).or_insert(WeightedChord {
            key,
            weight: 0.0,
            first_offset: event.offset,
        });
        entry.weight += score;
        entry.first_offset = entry.first_offset.min(event.offset);
    }

    weights
}
