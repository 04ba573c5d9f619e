//! Data model for a score read from MusicXML.
//!
//! These structures keep the harmonic and timing content the reducer needs:
//! pitches, durations, voices, ties, lyrics, and the attributes (divisions,
//! time signature, clef) that change at measure starts.

use serde::{Deserialize, Serialize};

/// A complete musical score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Score {
    /// Title of the piece
    pub title: Option<String>,
    /// Composer name
    pub composer: Option<String>,
    /// MusicXML version (e.g., "3.1", "4.0")
    pub version: Option<String>,
    /// Musical parts (instruments)
    pub parts: Vec<Part>,
}

/// A musical part (one instrument or voice group).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    /// Part identifier (e.g., "P1")
    pub id: String,
    /// Part name (e.g., "Soprano")
    pub name: String,
    /// Ordered list of measures
    pub measures: Vec<Measure>,
}

/// A single measure (bar) of music.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Measure {
    /// Measure number
    pub number: i32,
    /// Whether this is an implicit measure (e.g., pickup/anacrusis)
    pub implicit: bool,
    /// Attributes (divisions, time, clef) — only present when they change
    pub attributes: Option<Attributes>,
    /// Notes and rests in document order, including `<backup>`/`<forward>`
    /// adjustments folded into `Note::offset`
    pub notes: Vec<Note>,
}

/// Musical attributes of a measure.
///
/// Every `<attributes>` block of a measure is merged into one value: later
/// blocks override divisions and time only when they state them, and add
/// their clefs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Attributes {
    /// Divisions per quarter note (determines duration resolution)
    pub divisions: Option<i32>,
    /// Time signature
    pub time: Option<TimeSignature>,
    /// Clef(s) — one per staff
    pub clefs: Vec<Clef>,
}

/// Time signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    /// Numerator (e.g., 3 in 3/4)
    pub beats: i32,
    /// Denominator (e.g., 4 in 3/4)
    pub beat_type: i32,
}

/// Clef definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clef {
    /// Staff number this clef belongs to (1-based; defaults to 1)
    pub number: i32,
    /// Clef sign: "G" (treble), "F" (bass), "C" (alto/tenor)
    pub sign: String,
    /// Staff line the clef sits on
    pub line: i32,
    /// Octave transposition (e.g., -1 for an octave-lower treble clef)
    pub octave_change: Option<i32>,
}

/// A single note or rest as written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Note {
    /// Pitch (None if this is a rest)
    pub pitch: Option<Pitch>,
    /// Duration in divisions
    pub duration: i32,
    /// Start position in divisions from the measure start
    pub offset: i32,
    /// Voice number (for multi-voice writing)
    pub voice: Option<i32>,
    /// Staff number (1-based; for multi-staff parts like piano)
    pub staff: Option<i32>,
    /// Whether this is a rest
    pub rest: bool,
    /// Whether this note is part of a chord with the previous note
    pub chord: bool,
    /// Whether this is a grace note (takes no time)
    pub grace: bool,
    /// Tie start / stop markers
    pub tie_start: bool,
    pub tie_stop: bool,
    /// Lyrics attached to this note
    pub lyrics: Vec<Lyric>,
}

/// A lyric syllable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lyric {
    /// Verse number
    pub number: i32,
    /// Syllable text
    pub text: String,
}

/// Pitch of a note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pitch {
    /// Note name: A, B, C, D, E, F, G
    pub step: String,
    /// Octave number (middle C = C4)
    pub octave: i32,
    /// Chromatic alteration: -1.0 = flat, 1.0 = sharp, 0.0 = natural
    pub alter: Option<f64>,
    /// Accidental display override; `None` leaves the decision to notation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accidental_shown: Option<bool>,
}

impl Score {
    /// Create a new empty score.
    pub fn new() -> Self {
        Self {
            title: None,
            composer: None,
            version: None,
            parts: Vec::new(),
        }
    }

    /// Number of measures in the first part.
    pub fn measure_count(&self) -> usize {
        self.parts.first().map_or(0, |p| p.measures.len())
    }

    /// The measures at `index` across all parts, paired with their part.
    /// Parts that are shorter than `index` are left out.
    pub fn measure_stack(&self, index: usize) -> Vec<(&Part, &Measure)> {
        self.parts
            .iter()
            .filter_map(|p| p.measures.get(index).map(|m| (p, m)))
            .collect()
    }
}

impl Default for Score {
    fn default() -> Self {
        Self::new()
    }
}

impl Part {
    /// The time signature in effect at measure `index`, found by walking
    /// the attribute changes from the start of the part.
    pub fn time_signature_at(&self, index: usize) -> Option<TimeSignature> {
        self.measures
            .iter()
            .take(index + 1)
            .filter_map(|m| m.attributes.as_ref().and_then(|a| a.time))
            .last()
    }

    /// Divisions per quarter note in effect at measure `index` (default 1).
    pub fn divisions_at(&self, index: usize) -> i32 {
        self.measures
            .iter()
            .take(index + 1)
            .filter_map(|m| m.attributes.as_ref().and_then(|a| a.divisions))
            .last()
            .unwrap_or(1)
    }
}

impl Measure {
    /// Whether the measure holds any sounding note or rest.
    pub fn has_notes_or_rests(&self) -> bool {
        self.notes.iter().any(|n| !n.grace)
    }
}

impl TimeSignature {
    pub fn new(beats: i32, beat_type: i32) -> Self {
        Self { beats, beat_type }
    }

    /// Length of a full bar in quarter notes: `(beats / beat_type) * 4`.
    pub fn bar_length(&self) -> f64 {
        if self.beat_type <= 0 {
            return 0.0;
        }
        self.beats as f64 * 4.0 / self.beat_type as f64
    }

    /// Compound meters (6/8, 9/8, 12/8, …) group their pulses in threes.
    pub fn is_compound(&self) -> bool {
        self.beats > 3 && self.beats % 3 == 0 && self.beat_type >= 8
    }
}

impl std::fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.beats, self.beat_type)
    }
}

impl Clef {
    pub fn treble() -> Self {
        Self { number: 1, sign: "G".to_string(), line: 2, octave_change: None }
    }

    pub fn treble_8vb() -> Self {
        Self { octave_change: Some(-1), ..Self::treble() }
    }

    pub fn bass() -> Self {
        Self { number: 1, sign: "F".to_string(), line: 4, octave_change: None }
    }
}

impl Pitch {
    /// Build a pitch from its spelling.
    pub fn new(step: &str, octave: i32, alter: Option<f64>) -> Self {
        Self {
            step: step.to_string(),
            octave,
            alter,
            accidental_shown: None,
        }
    }

    /// Parse names like `C4`, `F#3`, `Bb5`, `E-4`.
    pub fn from_name(name: &str) -> Option<Self> {
        let mut chars = name.chars();
        let step = chars.next()?.to_ascii_uppercase();
        if !"ABCDEFG".contains(step) {
            return None;
        }
        let rest: String = chars.collect();
        let digits_at = rest.find(|c: char| c.is_ascii_digit())?;
        let (accidentals, octave) = rest.split_at(digits_at);
        let octave = octave.parse::<i32>().ok()?;
        let mut alter = 0.0;
        for c in accidentals.chars() {
            match c {
                '#' => alter += 1.0,
                'b' | '-' => alter -= 1.0,
                _ => return None,
            }
        }
        let alter = if alter == 0.0 { None } else { Some(alter) };
        Some(Self::new(&step.to_string(), octave, alter))
    }

    /// Convert pitch to MIDI note number.
    /// Middle C (C4) = 60.
    pub fn to_midi(&self) -> i32 {
        let step_semitone = match self.step.as_str() {
            "C" => 0,
            "D" => 2,
            "E" => 4,
            "F" => 5,
            "G" => 7,
            "A" => 9,
            "B" => 11,
            _ => 0,
        };
        let alter = self.alter.unwrap_or(0.0).round() as i32;
        (self.octave + 1) * 12 + step_semitone + alter
    }

    /// Pitch class 0–11 (C = 0).
    pub fn pitch_class(&self) -> u8 {
        self.to_midi().rem_euclid(12) as u8
    }

    /// Same sounding pitch, ignoring spelling and display state.
    pub fn sounds_like(&self, other: &Pitch) -> bool {
        self.to_midi() == other.to_midi()
    }

    /// Same written pitch (step, octave, alteration), ignoring display state.
    pub fn spelled_like(&self, other: &Pitch) -> bool {
        self.step == other.step
            && self.octave == other.octave
            && self.alter.unwrap_or(0.0) == other.alter.unwrap_or(0.0)
    }

    /// Written name with octave, e.g. `F#4`.
    pub fn name_with_octave(&self) -> String {
        let accidental = match self.alter.unwrap_or(0.0).round() as i32 {
            2 => "##",
            1 => "#",
            -1 => "b",
            -2 => "bb",
            _ => "",
        };
        format!("{}{}{}", self.step, accidental, self.octave)
    }
}
