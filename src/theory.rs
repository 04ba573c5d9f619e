//! Pitch and meter helpers the reducer consults: consonance, metrical
//! beat strength, close voicing, duplicate removal.

use crate::event::same_time;
use crate::model::{Pitch, TimeSignature};

/// Interval classes (semitones above the bass, mod 12) that make a
/// consonant dyad: minor/major third, perfect fifth, minor/major sixth.
const CONSONANT_DYADS: [u8; 5] = [3, 4, 7, 8, 9];

/// Smallest strength handed out for very fine subdivisions.
const MIN_BEAT_STRENGTH: f64 = 1.0 / 64.0;

/// Consonance of a simultaneity.
///
/// After collapsing to distinct pitch classes: a unison (or single note)
/// is consonant, a dyad is consonant when its interval above the bass is a
/// third, fifth or sixth, a three-class set is consonant when it is a major
/// or minor triad that is not in second inversion. Anything larger is
/// dissonant. An empty set (a rest) counts as consonant.
pub fn is_consonant(pitches: &[Pitch]) -> bool {
    let mut midi: Vec<i32> = pitches.iter().map(Pitch::to_midi).collect();
    midi.sort_unstable();
    let Some(&bass) = midi.first() else {
        return true;
    };

    let mut above_bass: Vec<u8> = midi.iter().map(|m| (m - bass).rem_euclid(12) as u8).collect();
    above_bass.sort_unstable();
    above_bass.dedup();

    match above_bass.len() {
        1 => true,
        2 => CONSONANT_DYADS.contains(&above_bass[1]),
        3 => match triad_root(&above_bass) {
            // Root is expressed relative to the bass; 5 means the fifth is
            // in the bass (root a fourth above it).
            Some(root) => root != 5,
            None => false,
        },
        _ => false,
    }
}

/// Root of a major or minor triad given as intervals above the bass
/// (`0` first), or `None` if the set is not such a triad.
fn triad_root(classes: &[u8]) -> Option<u8> {
    classes.iter().copied().find(|&root| {
        let third_major = (root + 4) % 12;
        let third_minor = (root + 3) % 12;
        let fifth = (root + 7) % 12;
        classes.contains(&fifth) && (classes.contains(&third_major) || classes.contains(&third_minor))
    })
}

/// Metrical weight in (0, 1] of a measure-relative offset.
///
/// The downbeat is 1.0. Beats are 0.5 in two- and three-beat meters; in
/// longer meters the beat that bisects the bar is 0.5 and the rest 0.25.
/// Each further subdivision halves the strength; compound meters divide
/// their beat into three first.
pub fn beat_strength(offset: f64, ts: &TimeSignature) -> f64 {
    let bar = ts.bar_length();
    if bar <= 0.0 {
        return 1.0;
    }
    let position = offset.rem_euclid(bar);
    if same_time(position, 0.0) || same_time(position, bar) {
        return 1.0;
    }

    let (beat_length, beat_count) = if ts.is_compound() {
        (bar / (ts.beats / 3) as f64, ts.beats / 3)
    } else {
        (bar / ts.beats.max(1) as f64, ts.beats.max(1))
    };

    if is_multiple_of(position, beat_length) {
        let beat_index = (position / beat_length).round() as i32;
        if beat_count <= 3 || (beat_count % 2 == 0 && beat_index == beat_count / 2) {
            return 0.5;
        }
        return 0.25;
    }

    let mut strength = if beat_count <= 3 { 0.5 } else { 0.25 };
    let mut unit = beat_length;
    let mut first = true;
    while strength > MIN_BEAT_STRENGTH {
        unit /= if first && ts.is_compound() { 3.0 } else { 2.0 };
        first = false;
        strength /= 2.0;
        if is_multiple_of(position, unit) {
            return strength;
        }
    }
    MIN_BEAT_STRENGTH
}

fn is_multiple_of(value: f64, unit: f64) -> bool {
    let ratio = value / unit;
    same_time(ratio, ratio.round())
}

/// Rewrite pitches into close position above the lowest pitch (moved to
/// `force_octave` when given), ordered low to high.
pub fn closed_position(pitches: &[Pitch], force_octave: Option<i32>) -> Vec<Pitch> {
    let mut sorted: Vec<Pitch> = pitches.to_vec();
    sorted.sort_by_key(Pitch::to_midi);
    let Some(mut bass) = sorted.first().cloned() else {
        return Vec::new();
    };
    if let Some(octave) = force_octave {
        bass.octave = octave;
    }
    let bass_midi = bass.to_midi();

    let mut voiced = Vec::with_capacity(sorted.len());
    voiced.push(bass);
    for pitch in sorted.into_iter().skip(1) {
        let mut p = pitch;
        while p.to_midi() < bass_midi {
            p.octave += 1;
        }
        while p.to_midi() >= bass_midi + 12 {
            p.octave -= 1;
        }
        voiced.push(p);
    }
    voiced.sort_by_key(Pitch::to_midi);
    voiced
}

/// Drop pitches that sound the same as an earlier one, keeping order.
pub fn remove_redundant_pitches(pitches: &[Pitch]) -> Vec<Pitch> {
    let mut kept: Vec<Pitch> = Vec::with_capacity(pitches.len());
    for p in pitches {
        if !kept.iter().any(|k| k.sounds_like(p)) {
            kept.push(p.clone());
        }
    }
    kept
}
