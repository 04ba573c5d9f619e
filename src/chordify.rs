//! Collapse several voices into one track of chords.

use crate::error::Result;
use crate::event::TimedEvent;
use crate::model::{Pitch, TimeSignature};
use crate::theory::{beat_strength, remove_redundant_pitches};
use crate::vertical::VerticalMoments;

/// One event per vertical moment: a chord of everything sounding there,
/// or a rest when nothing is. Pitches are ordered low to high with exact
/// unisons between voices removed.
pub fn chordify(voices: &[Vec<TimedEvent>], ts: Option<&TimeSignature>) -> Result<Vec<TimedEvent>> {
    let mut merged = Vec::new();

    for slice in VerticalMoments::new(voices)? {
        let mut pitches: Vec<Pitch> = slice.present().flat_map(|e| e.pitches().iter().cloned()).collect();
        pitches.sort_by_key(Pitch::to_midi);
        let pitches = remove_redundant_pitches(&pitches);

        let duration = slice.end - slice.offset;
        let mut event = if pitches.is_empty() {
            TimedEvent::rest(slice.offset, duration)
        } else {
            TimedEvent::chord(pitches, slice.offset, duration)
        };
        if let Some(ts) = ts {
            event.beat_strength = beat_strength(slice.offset, ts);
        }
        merged.push(event);
    }

    Ok(merged)
}
