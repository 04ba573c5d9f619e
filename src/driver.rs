//! Score-level reduction: every measure stack of a score becomes one
//! measure of a single chordal part.
//!
//! For each measure index the driver copies the sounding content of all
//! parts out of the score, aligns sung syllables, merges the voices into
//! chords, keeps the few chords that carry the measure and assembles them
//! into an output measure. The finished part gets a clef and a notation
//! pass. The input score is only ever read.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::assemble::{AssemblyOptions, Bar, MeasureAssembler, OutputMeasure};
use crate::chordify::chordify;
use crate::error::Result;
use crate::event::TimedEvent;
use crate::extract::{content_length, voices_from_stack, DEFAULT_TIME_SIGNATURE};
use crate::lyrics::align_by_lyrics;
use crate::model::{Measure, Part, Score};
use crate::notation::{best_clef, make_notation};
use crate::reduce::{collapse_arpeggios, reduce_measure, validate_parameters};
use crate::weights::WeightPolicy;

/// Options controlling a reduction.
///
/// Missing fields take their defaults when deserialized, so a JSON object
/// such as `{"max_chords": 1}` is a complete configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReduceOptions {
    /// Most distinct chords kept per measure (at least 1)
    pub max_chords: usize,
    /// Rewrite output chords into close position
    pub closed_position: bool,
    /// Octave for the bass of close-position chords
    pub force_octave: Option<i32>,
    /// How chords are weighed against each other
    pub policy: WeightPolicy,
    /// Chords lighter than this fraction of the heaviest are dropped, in (0, 1]
    pub trim_ratio: f64,
    /// Snap attacks on a shared syllable to the strongest beat
    pub align_lyrics: bool,
    /// Merge broken chords before weighing
    pub collapse_arpeggios: bool,
    /// Allow the octave-down treble clef for mid-range parts
    pub allow_treble_8vb: bool,
    /// Name given to the output part
    pub part_name: String,
}

impl Default for ReduceOptions {
    fn default() -> Self {
        Self {
            max_chords: 2,
            closed_position: false,
            force_octave: None,
            policy: WeightPolicy::Consonance,
            trim_ratio: 0.3,
            align_lyrics: true,
            collapse_arpeggios: false,
            allow_treble_8vb: true,
            part_name: "Chord Reduction".to_string(),
        }
    }
}

/// The reduced score: one part of chords.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReducedPart {
    pub name: String,
    pub measures: Vec<OutputMeasure>,
}

impl ReducedPart {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), measures: Vec::new() }
    }

    /// Every event of the part in order.
    pub fn events(&self) -> impl Iterator<Item = &TimedEvent> + '_ {
        self.measures.iter().flat_map(|m| m.events.iter())
    }
}

/// Reduces whole scores with a fixed set of options.
#[derive(Debug, Clone)]
pub struct ChordReducer {
    options: ReduceOptions,
}

impl ChordReducer {
    /// Check the options and build a reducer.
    pub fn new(options: ReduceOptions) -> Result<Self> {
        validate_parameters(options.max_chords, options.trim_ratio)?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &ReduceOptions {
        &self.options
    }

    /// Reduce every measure stack of `score` into one part.
    ///
    /// Measure stacks are read in order until the first one without any
    /// note or rest; an empty first measure is skipped instead. Errors are
    /// tagged with the index of the measure that raised them.
    pub fn reduce_score(&self, score: &Score) -> Result<ReducedPart> {
        let mut assembler = MeasureAssembler::new(AssemblyOptions {
            closed_position: self.options.closed_position,
            force_octave: self.options.force_octave,
        });
        let mut part = ReducedPart::new(&self.options.part_name);

        for index in 0..=score.measure_count() {
            let stack = score.measure_stack(index);
            if !stack.iter().any(|(_, m)| m.has_notes_or_rests()) {
                if index == 0 {
                    continue;
                }
                break;
            }

            let previous = part.measures.last_mut().and_then(|m| m.events.last_mut());
            let measure = self
                .reduce_stack(&stack, index, &mut assembler, previous)
                .map_err(|e| e.in_measure(index))?;
            part.measures.push(measure);
        }

        let clef = best_clef(&part, self.options.allow_treble_8vb);
        if let Some(first) = part.measures.first_mut() {
            first.clef = Some(clef.clone());
        }
        make_notation(&mut part);

        info!(measures = part.measures.len(), clef = %clef.sign, "reduction finished");
        Ok(part)
    }

    fn reduce_stack(
        &self,
        stack: &[(&Part, &Measure)],
        index: usize,
        assembler: &mut MeasureAssembler,
        previous: Option<&mut TimedEvent>,
    ) -> Result<OutputMeasure> {
        let time_signature = stack.first().and_then(|(part, _)| part.time_signature_at(index));
        let implicit = stack.first().is_some_and(|(_, m)| m.implicit);

        let mut voices = voices_from_stack(stack, index);
        let content = content_length(&voices);
        if self.options.align_lyrics {
            let moved = align_by_lyrics(&mut voices)?;
            if moved > 0 {
                debug!(measure = index, moved, "aligned lyric attacks");
            }
        }

        let meter = time_signature.unwrap_or(DEFAULT_TIME_SIGNATURE);
        let mut events = chordify(&voices, Some(&meter))?;
        if self.options.collapse_arpeggios {
            events = collapse_arpeggios(events);
        }

        let reduced = reduce_measure(events, self.options.max_chords, &self.options.policy, self.options.trim_ratio)?;
        debug!(
            measure = index,
            events = reduced.len(),
            chords = ?reduced.iter().filter(|e| !e.is_rest()).map(|e| e.pitch_class_key().to_string()).collect::<Vec<_>>(),
            "reduced measure"
        );

        let length = match time_signature {
            Some(ts) if !implicit => ts.bar_length(),
            _ => content,
        };
        let bar = Bar { time_signature, length };
        assembler.assemble(index, reduced, bar, previous)
    }
}

/// Reduce `score` with `options`.
pub fn reduce_score(score: &Score, options: &ReduceOptions) -> Result<ReducedPart> {
    ChordReducer::new(options.clone())?.reduce_score(score)
}
