//! Turn model measures into owned, per-voice [`TimedEvent`] sequences.
//!
//! Every note is copied out of the [`Measure`], converted from divisions
//! to quarter notes and given a beat strength, so the reduction that
//! follows works on its own data. Voices come out contiguous: holes become
//! rests and every voice of a measure stack is padded to the same length.

use std::collections::BTreeMap;

use crate::event::{same_time, EventKind, TieState, TimedEvent};
use crate::model::{Lyric, Measure, Note, Part, TimeSignature};
use crate::theory::beat_strength;

/// Meter assumed for parts that never state one.
pub const DEFAULT_TIME_SIGNATURE: TimeSignature = TimeSignature { beats: 4, beat_type: 4 };

/// Split one measure into voices keyed by (staff, voice).
///
/// Chord notes (`<chord/>`) join the event they sound with; grace notes
/// take no time and are skipped.
pub fn voices_from_measure(
    measure: &Measure,
    divisions: i32,
    ts: Option<&TimeSignature>,
) -> Vec<Vec<TimedEvent>> {
    let divisions = divisions.max(1) as f64;
    let ts = ts.unwrap_or(&DEFAULT_TIME_SIGNATURE);
    let mut by_voice: BTreeMap<(i32, i32), Vec<TimedEvent>> = BTreeMap::new();

    for note in measure.notes.iter().filter(|n| !n.grace) {
        let key = (note.staff.unwrap_or(1), note.voice.unwrap_or(1));
        let events = by_voice.entry(key).or_default();

        if note.chord {
            if let (Some(previous), Some(pitch)) = (events.last_mut(), note.pitch.as_ref()) {
                let mut pitches = previous.pitches().to_vec();
                pitches.push(pitch.clone());
                previous.kind = EventKind::Chord(pitches);
                continue;
            }
        }

        let offset = note.offset as f64 / divisions;
        let duration = note.duration as f64 / divisions;
        if duration <= 0.0 {
            continue;
        }
        let mut event = match (&note.pitch, note.rest) {
            (Some(pitch), false) => TimedEvent::note(pitch.clone(), offset, duration),
            _ => TimedEvent::rest(offset, duration),
        };
        event.beat_strength = beat_strength(offset, ts);
        event.tie = tie_state(note);
        event.lyric = first_verse(note).map(|l| l.text.clone());
        events.push(event);
    }

    by_voice
        .into_values()
        .map(|events| make_contiguous(events, ts))
        .collect()
}

/// The verse-1 syllable of a note, else whichever verse it has.
fn first_verse(note: &Note) -> Option<&Lyric> {
    note.lyrics
        .iter()
        .find(|l| l.number == 1)
        .or_else(|| note.lyrics.iter().min_by_key(|l| l.number))
}

/// All voices of every part at measure `index`, padded to a common length.
pub fn voices_from_stack(stack: &[(&Part, &Measure)], index: usize) -> Vec<Vec<TimedEvent>> {
    let mut voices: Vec<Vec<TimedEvent>> = stack
        .iter()
        .flat_map(|(part, measure)| {
            let ts = part.time_signature_at(index);
            voices_from_measure(measure, part.divisions_at(index), ts.as_ref())
        })
        .collect();
    let length = content_length(&voices);
    let ts = stack
        .first()
        .and_then(|(part, _)| part.time_signature_at(index))
        .unwrap_or(DEFAULT_TIME_SIGNATURE);
    pad_voices(&mut voices, length, &ts);
    voices
}

/// End of the latest event across all voices.
pub fn content_length(voices: &[Vec<TimedEvent>]) -> f64 {
    voices
        .iter()
        .filter_map(|v| v.last())
        .map(TimedEvent::end)
        .fold(0.0, f64::max)
}

/// Extend every voice with a trailing rest so it ends at `length`.
pub fn pad_voices(voices: &mut [Vec<TimedEvent>], length: f64, ts: &TimeSignature) {
    for voice in voices.iter_mut() {
        let end = voice.last().map_or(0.0, TimedEvent::end);
        if end < length && !same_time(end, length) {
            voice.push(TimedEvent::rest(end, length - end).with_beat_strength(beat_strength(end, ts)));
        }
    }
}

fn tie_state(note: &Note) -> TieState {
    match (note.tie_start, note.tie_stop) {
        (true, true) => TieState::Continue,
        (true, false) => TieState::Start,
        (false, true) => TieState::Stop,
        (false, false) => TieState::None,
    }
}

/// Order events, fill holes (including a late first event) with rests and
/// clip overlaps so that each event starts where the previous one ends.
fn make_contiguous(mut events: Vec<TimedEvent>, ts: &TimeSignature) -> Vec<TimedEvent> {
    events.sort_by(|a, b| a.offset.total_cmp(&b.offset));
    let mut out: Vec<TimedEvent> = Vec::with_capacity(events.len());
    let mut cursor = 0.0;

    for event in events {
        if event.offset > cursor && !same_time(event.offset, cursor) {
            let gap = TimedEvent::rest(cursor, event.offset - cursor);
            out.push(gap.with_beat_strength(beat_strength(cursor, ts)));
        } else if event.offset < cursor && !same_time(event.offset, cursor) {
            if let Some(previous) = out.last_mut() {
                previous.duration = event.offset - previous.offset;
                if previous.duration <= 0.0 || same_time(previous.duration, 0.0) {
                    out.pop();
                }
            }
        }
        cursor = event.end();
        out.push(event);
    }
    out
}
