//! Final notation pass over a reduced part: clef choice, tie bookkeeping,
//! accidental display and written note types.

use std::collections::HashMap;

use tracing::debug;

use crate::driver::ReducedPart;
use crate::event::{TieState, WrittenType};
use crate::model::Clef;

/// Mean MIDI pitch at or above which the treble clef is used.
const TREBLE_THRESHOLD: f64 = 59.0;
/// Mean MIDI pitch at or above which the octave-down treble clef is used.
const TREBLE_8VB_THRESHOLD: f64 = 48.0;

/// Pick a clef from the mean pitch of everything in the part.
///
/// An empty part gets the treble clef.
pub fn best_clef(part: &ReducedPart, allow_treble_8vb: bool) -> Clef {
    let (sum, count) = part
        .measures
        .iter()
        .flat_map(|m| &m.events)
        .flat_map(|e| e.pitches())
        .fold((0i64, 0usize), |(sum, count), p| (sum + p.to_midi() as i64, count + 1));
    if count == 0 {
        return Clef::treble();
    }

    let mean = sum as f64 / count as f64;
    if mean >= TREBLE_THRESHOLD {
        Clef::treble()
    } else if allow_treble_8vb && mean >= TREBLE_8VB_THRESHOLD {
        Clef::treble_8vb()
    } else {
        Clef::bass()
    }
}

/// Regularise ties, accidentals and note types in place.
pub fn make_notation(part: &mut ReducedPart) {
    complete_ties(part);
    for measure in &mut part.measures {
        let mut last_alter: HashMap<(String, i32), f64> = HashMap::new();
        for event in &mut measure.events {
            let tied_over = matches!(event.tie, TieState::Stop | TieState::Continue);
            for pitch in event.pitches_mut() {
                let alter = pitch.alter.unwrap_or(0.0);
                let shown = match last_alter.get(&(pitch.step.clone(), pitch.octave)) {
                    _ if tied_over => false,
                    Some(previous) => *previous != alter,
                    None => alter != 0.0,
                };
                pitch.accidental_shown = Some(shown);
                last_alter.insert((pitch.step.clone(), pitch.octave), alter);
            }

            event.written_type = event.note_type().map(|(name, dots)| WrittenType {
                name: name.to_string(),
                dots,
            });
            if event.written_type.is_none() {
                debug!(measure = measure.number, offset = event.offset, duration = event.duration, "no single note type");
            }
        }
    }
}

/// Give every event that receives a tie its closing state.
fn complete_ties(part: &mut ReducedPart) {
    let mut incoming = false;
    for event in part.measures.iter_mut().flat_map(|m| m.events.iter_mut()) {
        if event.is_rest() {
            incoming = false;
            continue;
        }
        if incoming {
            event.tie = match event.tie {
                TieState::Start | TieState::Continue => TieState::Continue,
                TieState::None | TieState::Stop => TieState::Stop,
            };
        }
        incoming = matches!(event.tie, TieState::Start | TieState::Continue);
    }
}
