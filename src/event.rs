//! Timed events: the unit the reducer works on.
//!
//! A [`TimedEvent`] occupies `[offset, offset + duration)` in quarter notes,
//! measured from the start of its measure. Events are owned values built
//! fresh for every measure, so nothing the reducer does can reach back
//! into the source [`Score`](crate::model::Score).

use serde::{Deserialize, Serialize};

use crate::model::Pitch;
use crate::theory;

/// Decimal places used for every offset/duration equality check.
pub const OFFSET_PLACES: i32 = 6;

/// Round to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

/// Offset/duration equality after rounding to [`OFFSET_PLACES`].
pub fn same_time(a: f64, b: f64) -> bool {
    round_to(a - b, OFFSET_PLACES) == 0.0
}

/// Tie state of an event relative to its neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TieState {
    #[default]
    None,
    Start,
    Continue,
    Stop,
}

/// What sounds during an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "pitches", rename_all = "lowercase")]
pub enum EventKind {
    Note(Pitch),
    Chord(Vec<Pitch>),
    Rest,
}

/// One note, chord or rest placed in a measure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedEvent {
    pub kind: EventKind,
    /// Start, in quarter notes from the measure start
    pub offset: f64,
    /// Length in quarter notes
    pub duration: f64,
    /// Metrical weight of the start offset, in (0, 1]
    pub beat_strength: f64,
    pub tie: TieState,
    /// Lyric syllable sung on this event, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lyric: Option<String>,
    /// Written note type, filled in by notation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub written_type: Option<WrittenType>,
}

/// A note type name (`"quarter"`, `"16th"`, …) with its dot count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrittenType {
    pub name: String,
    pub dots: u8,
}

impl TimedEvent {
    pub fn note(pitch: Pitch, offset: f64, duration: f64) -> Self {
        Self::new(EventKind::Note(pitch), offset, duration)
    }

    pub fn chord(pitches: Vec<Pitch>, offset: f64, duration: f64) -> Self {
        Self::new(EventKind::Chord(pitches), offset, duration)
    }

    pub fn rest(offset: f64, duration: f64) -> Self {
        Self::new(EventKind::Rest, offset, duration)
    }

    fn new(kind: EventKind, offset: f64, duration: f64) -> Self {
        Self {
            kind,
            offset,
            duration,
            beat_strength: 1.0,
            tie: TieState::None,
            lyric: None,
            written_type: None,
        }
    }

    /// Builder-style beat strength setter.
    pub fn with_beat_strength(mut self, beat_strength: f64) -> Self {
        self.beat_strength = beat_strength;
        self
    }

    /// Builder-style lyric setter.
    pub fn with_lyric(mut self, lyric: &str) -> Self {
        self.lyric = Some(lyric.to_string());
        self
    }

    pub fn end(&self) -> f64 {
        self.offset + self.duration
    }

    pub fn is_rest(&self) -> bool {
        matches!(self.kind, EventKind::Rest)
    }

    pub fn is_note(&self) -> bool {
        matches!(self.kind, EventKind::Note(_))
    }

    pub fn is_chord(&self) -> bool {
        matches!(self.kind, EventKind::Chord(_))
    }

    /// Sounding pitches; empty for rests.
    pub fn pitches(&self) -> &[Pitch] {
        match &self.kind {
            EventKind::Note(p) => std::slice::from_ref(p),
            EventKind::Chord(ps) => ps,
            EventKind::Rest => &[],
        }
    }

    pub fn pitches_mut(&mut self) -> &mut [Pitch] {
        match &mut self.kind {
            EventKind::Note(p) => std::slice::from_mut(p),
            EventKind::Chord(ps) => ps,
            EventKind::Rest => &mut [],
        }
    }

    /// The pitch-class set identity used for weighting and selection.
    pub fn pitch_class_key(&self) -> PitchClassKey {
        PitchClassKey::from_pitches(self.pitches())
    }

    /// Whether the sounding pitches form a consonance. Rests and single
    /// notes count as consonant.
    pub fn is_consonant(&self) -> bool {
        theory::is_consonant(self.pitches())
    }

    /// Written note type and dot count for this duration, when it has one.
    pub fn note_type(&self) -> Option<(&'static str, u8)> {
        note_type_for(self.duration)
    }
}

const NOTE_TYPES: [(&str, f64); 8] = [
    ("breve", 8.0),
    ("whole", 4.0),
    ("half", 2.0),
    ("quarter", 1.0),
    ("eighth", 0.5),
    ("16th", 0.25),
    ("32nd", 0.125),
    ("64th", 0.0625),
];

/// Map a quarter-note length to a note type with up to two dots.
pub fn note_type_for(duration: f64) -> Option<(&'static str, u8)> {
    for &(name, base) in &NOTE_TYPES {
        for dots in 0..=2u8 {
            let dotted = base * (2.0 - 0.5f64.powi(dots as i32));
            if same_time(dotted, duration) {
                return Some((name, dots));
            }
        }
    }
    None
}

/// Canonical, order-independent set of pitch classes (0–11) stored as a
/// 12-bit mask. Octave and doubling never change the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct PitchClassKey(u16);

impl PitchClassKey {
    pub fn from_pitches(pitches: &[Pitch]) -> Self {
        Self::from_classes(pitches.iter().map(Pitch::pitch_class))
    }

    pub fn from_classes<I: IntoIterator<Item = u8>>(classes: I) -> Self {
        Self(classes.into_iter().fold(0u16, |mask, pc| mask | 1 << (pc % 12)))
    }

    pub fn contains(&self, pitch_class: u8) -> bool {
        pitch_class < 12 && self.0 & (1 << pitch_class) != 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Pitch classes in ascending order.
    pub fn classes(&self) -> impl Iterator<Item = u8> + '_ {
        (0u8..12).filter(move |pc| self.contains(*pc))
    }
}

impl std::fmt::Display for PitchClassKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let classes: Vec<String> = self.classes().map(|pc| pc.to_string()).collect();
        write!(f, "({})", classes.join(", "))
    }
}
