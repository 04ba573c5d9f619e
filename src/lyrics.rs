//! Lyric alignment for vocal music.
//!
//! When every voice sings the same syllable in one vertical moment but the
//! voices attack it at different times, the attacks are snapped to the
//! metrically strongest of them before the voices are merged.

use tracing::debug;

use crate::error::Result;
use crate::event::same_time;
use crate::event::TimedEvent;
use crate::vertical::VerticalMoments;

/// A planned move of one event to a new start.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Realignment {
    voice: usize,
    index: usize,
    offset: f64,
}

/// Snap shared-syllable attacks to the strongest beat among them.
///
/// Returns how many events were moved. Each voice stays contiguous: the
/// event before a moved one is resized to meet it, and a move that would
/// leave either event without length is skipped.
pub fn align_by_lyrics(voices: &mut [Vec<TimedEvent>]) -> Result<usize> {
    let plan = plan_realignments(voices)?;
    let mut moved = 0;
    for r in plan {
        if apply(&mut voices[r.voice], r.index, r.offset) {
            moved += 1;
        } else {
            debug!(voice = r.voice, index = r.index, offset = r.offset, "lyric realignment skipped");
        }
    }
    Ok(moved)
}

fn plan_realignments(voices: &[Vec<TimedEvent>]) -> Result<Vec<Realignment>> {
    let mut plan: Vec<Realignment> = Vec::new();

    for moment in VerticalMoments::new(voices)? {
        let Some(lyrics) = moment
            .events
            .iter()
            .map(|e| e.and_then(|e| e.lyric.as_deref()))
            .collect::<Option<Vec<&str>>>()
        else {
            continue;
        };
        if lyrics.is_empty() || lyrics.iter().any(|l| *l != lyrics[0]) {
            continue;
        }

        let mut best_strength = f64::MIN;
        let mut best_offset = 0.0;
        for event in moment.present() {
            if event.beat_strength > best_strength {
                best_strength = event.beat_strength;
                best_offset = event.offset;
            }
        }

        for (voice, (event, index)) in moment.events.iter().zip(&moment.indices).enumerate() {
            let (Some(event), Some(index)) = (event, index) else { continue };
            if event.is_rest() || event.beat_strength == best_strength {
                continue;
            }
            if plan.iter().any(|r| r.voice == voice && r.index == *index) {
                continue;
            }
            plan.push(Realignment { voice, index: *index, offset: best_offset });
        }
    }

    Ok(plan)
}

fn apply(voice: &mut [TimedEvent], index: usize, offset: f64) -> bool {
    let old = voice[index].offset;
    let new_duration = voice[index].duration + (old - offset);
    if new_duration <= 0.0 || same_time(new_duration, 0.0) {
        return false;
    }
    if index == 0 {
        if !same_time(offset, old) {
            return false;
        }
    } else {
        let previous = &voice[index - 1];
        let previous_duration = offset - previous.offset;
        if previous_duration <= 0.0 || same_time(previous_duration, 0.0) {
            return false;
        }
        voice[index - 1].duration = previous_duration;
    }
    voice[index].offset = offset;
    voice[index].duration = new_duration;
    true
}
