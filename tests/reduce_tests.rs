//! Integration tests — reduce whole scores through the public API.

use pretty_assertions::assert_eq;
use scorereduce::theory::beat_strength;
use scorereduce::vertical::VerticalMoments;
use scorereduce::{
    parse_musicxml, part_to_json, reduce_bytes, reduce_measure, reduce_score, Clef, Pitch, PitchClassKey,
    ReduceError, ReduceOptions, TieState, TimeSignature, TimedEvent, WeightPolicy,
};

fn chord(names: &str, offset: f64, duration: f64) -> TimedEvent {
    let ts = TimeSignature::new(4, 4);
    let pitches = names.split_whitespace().filter_map(Pitch::from_name).collect();
    TimedEvent::chord(pitches, offset, duration).with_beat_strength(beat_strength(offset, &ts))
}

fn four_quarters() -> Vec<TimedEvent> {
    vec![
        chord("C4 E4 G4 C5", 0.0, 1.0),
        chord("C4 E4 G4 C5", 1.0, 1.0),
        chord("C4 E4 F4 B4", 2.0, 1.0),
        chord("C4 E4 G4 C5", 3.0, 1.0),
    ]
}

// ─── Single measures ────────────────────────────────────────────────

#[test]
fn single_chord_by_duration() {
    let reduced = reduce_measure(four_quarters(), 1, &WeightPolicy::DurationOnly, 0.3).unwrap();
    assert_eq!(reduced.len(), 1);
    assert_eq!(reduced[0].offset, 0.0);
    assert_eq!(reduced[0].duration, 4.0);
    let names: Vec<String> = reduced[0].pitches().iter().map(Pitch::name_with_octave).collect();
    assert_eq!(names, vec!["C4", "E4", "G4", "C5"]);
}

#[test]
fn dissonant_chord_is_trimmed_by_consonance_weighting() {
    let by_duration = reduce_measure(four_quarters(), 1, &WeightPolicy::DurationOnly, 0.3).unwrap();
    let by_consonance = reduce_measure(four_quarters(), 2, &WeightPolicy::Consonance, 0.3).unwrap();
    assert_eq!(by_consonance, by_duration);
}

#[test]
fn rest_measure_is_one_rest() {
    for max_chords in 1..=4 {
        let reduced = reduce_measure(vec![TimedEvent::rest(0.0, 4.0)], max_chords, &WeightPolicy::Consonance, 0.3)
            .unwrap();
        assert_eq!(reduced.len(), 1);
        assert!(reduced[0].is_rest());
        assert_eq!(reduced[0].duration, 4.0);
    }
}

#[test]
fn whole_note_against_halves_has_two_moments() {
    let a = Pitch::from_name("C4").unwrap();
    let b1 = Pitch::from_name("G4").unwrap();
    let b2 = Pitch::from_name("A4").unwrap();
    let voices = vec![
        vec![TimedEvent::note(a, 0.0, 4.0)],
        vec![TimedEvent::note(b1, 0.0, 2.0), TimedEvent::note(b2, 2.0, 2.0)],
    ];
    let offsets: Vec<f64> = VerticalMoments::new(&voices).unwrap().map(|s| s.offset).collect();
    assert_eq!(offsets, vec![0.0, 2.0]);
}

#[test]
fn syncopated_chord_is_pulled_to_the_downbeat() {
    let events = vec![chord("C4 E4 G4", 0.0, 0.125), chord("D4 F4 A4", 0.125, 3.875)];
    let reduced = reduce_measure(events, 2, &WeightPolicy::DurationOnly, 0.01).unwrap();
    assert_eq!(reduced.len(), 1);
    assert_eq!(reduced[0].offset, 0.0);
    assert_eq!(reduced[0].duration, 4.0);
    assert_eq!(reduced[0].pitch_class_key(), PitchClassKey::from_classes([2, 5, 9]));
}

// ─── Whole scores ───────────────────────────────────────────────────

const DUET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<score-partwise version="4.0">
  <work><work-title>Duet</work-title></work>
  <part-list>
    <score-part id="P1"><part-name>Upper</part-name></score-part>
    <score-part id="P2"><part-name>Lower</part-name></score-part>
  </part-list>
  <part id="P1">
    <measure number="1">
      <attributes><divisions>1</divisions><time><beats>4</beats><beat-type>4</beat-type></time></attributes>
      <note><pitch><step>E</step><octave>4</octave></pitch><duration>4</duration><voice>1</voice><tie type="start"/></note>
    </measure>
    <measure number="2">
      <note><pitch><step>E</step><octave>4</octave></pitch><duration>4</duration><voice>1</voice><tie type="stop"/></note>
    </measure>
    <measure number="3">
      <attributes><time><beats>3</beats><beat-type>4</beat-type></time></attributes>
      <note><pitch><step>C</step><octave>4</octave></pitch><duration>3</duration><voice>1</voice></note>
    </measure>
  </part>
  <part id="P2">
    <measure number="1">
      <attributes><divisions>1</divisions><time><beats>4</beats><beat-type>4</beat-type></time></attributes>
      <note><pitch><step>C</step><octave>3</octave></pitch><duration>2</duration><voice>1</voice></note>
      <note><pitch><step>G</step><octave>3</octave></pitch><duration>2</duration><voice>1</voice></note>
    </measure>
    <measure number="2">
      <note><pitch><step>G</step><octave>3</octave></pitch><duration>4</duration><voice>1</voice></note>
    </measure>
    <measure number="3">
      <attributes><time><beats>3</beats><beat-type>4</beat-type></time></attributes>
      <note><pitch><step>C</step><octave>3</octave></pitch><duration>3</duration><voice>1</voice></note>
    </measure>
  </part>
</score-partwise>"#;

fn names(event: &TimedEvent) -> Vec<String> {
    event.pitches().iter().map(Pitch::name_with_octave).collect()
}

#[test]
fn duet_reduces_measure_by_measure() {
    let score = parse_musicxml(DUET).unwrap();
    let part = reduce_score(&score, &ReduceOptions::default()).unwrap();

    assert_eq!(part.measures.len(), 3);
    let first = &part.measures[0];
    assert_eq!(first.events.len(), 2);
    assert_eq!(names(&first.events[0]), vec!["C3", "E4"]);
    assert_eq!(names(&first.events[1]), vec!["G3", "E4"]);
    assert_eq!(part.measures[1].events.len(), 1);
    assert_eq!(part.measures[2].length(), 3.0);
}

#[test]
fn held_chord_is_tied_over_the_barline() {
    let score = parse_musicxml(DUET).unwrap();
    let part = reduce_score(&score, &ReduceOptions::default()).unwrap();

    assert_eq!(part.measures[0].events[1].tie, TieState::Start);
    assert_eq!(part.measures[1].events[0].tie, TieState::Stop);
    assert_eq!(part.measures[0].events[0].tie, TieState::None);
    assert_eq!(part.measures[2].events[0].tie, TieState::None);
}

#[test]
fn time_signature_marks_only_changes() {
    let score = parse_musicxml(DUET).unwrap();
    let part = reduce_score(&score, &ReduceOptions::default()).unwrap();
    let marks: Vec<Option<TimeSignature>> = part.measures.iter().map(|m| m.time_signature).collect();
    assert_eq!(
        marks,
        vec![Some(TimeSignature::new(4, 4)), None, Some(TimeSignature::new(3, 4))]
    );
}

#[test]
fn mid_range_part_gets_octave_treble_clef() {
    let score = parse_musicxml(DUET).unwrap();
    let part = reduce_score(&score, &ReduceOptions::default()).unwrap();
    assert_eq!(part.measures[0].clef, Some(Clef::treble_8vb()));

    let options = ReduceOptions { allow_treble_8vb: false, ..Default::default() };
    let part = reduce_score(&score, &options).unwrap();
    assert_eq!(part.measures[0].clef, Some(Clef::bass()));
}

#[test]
fn bars_are_filled_without_gaps() {
    let score = parse_musicxml(DUET).unwrap();
    let part = reduce_score(&score, &ReduceOptions { max_chords: 4, ..Default::default() }).unwrap();
    let bars = [4.0, 4.0, 3.0];
    for (measure, bar) in part.measures.iter().zip(bars) {
        assert_eq!(measure.length(), bar);
        let mut cursor = 0.0;
        for event in &measure.events {
            assert_eq!(event.offset, cursor);
            cursor = event.end();
        }
    }
}

#[test]
fn closed_position_output() {
    let score = parse_musicxml(DUET).unwrap();
    let options = ReduceOptions { closed_position: true, force_octave: Some(4), ..Default::default() };
    let part = reduce_score(&score, &options).unwrap();
    assert_eq!(names(&part.measures[0].events[0]), vec!["C4", "E4"]);
    assert_eq!(names(&part.measures[0].events[1]), vec!["G4", "E5"]);
    assert_eq!(part.measures[0].events[1].tie, TieState::Start);
}

#[test]
fn reduction_serializes_to_json() {
    let options = ReduceOptions { part_name: "Harmony".to_string(), ..Default::default() };
    let part = reduce_bytes(DUET.as_bytes(), Some("musicxml"), &options).unwrap();
    let json = part_to_json(&part).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["name"], "Harmony");
    assert_eq!(value["measures"].as_array().map(Vec::len), Some(3));
    assert_eq!(value["measures"][0]["events"][0]["kind"]["kind"], "chord");
    assert_eq!(value["measures"][1]["events"][0]["tie"], "stop");
}

#[test]
fn bad_options_are_reported() {
    let score = parse_musicxml(DUET).unwrap();
    let options = ReduceOptions { trim_ratio: 1.5, ..Default::default() };
    let err = reduce_score(&score, &options).unwrap_err();
    assert!(matches!(err, ReduceError::InvalidParameter(_)));
}

// ─── Lyrics ─────────────────────────────────────────────────────────

const CHORALE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<score-partwise version="4.0">
  <part-list>
    <score-part id="S"><part-name>Soprano</part-name></score-part>
    <score-part id="A"><part-name>Alto</part-name></score-part>
  </part-list>
  <part id="S">
    <measure number="1">
      <attributes><divisions>2</divisions><time><beats>4</beats><beat-type>4</beat-type></time></attributes>
      <note><pitch><step>E</step><octave>5</octave></pitch><duration>4</duration><voice>1</voice><lyric><text>A</text></lyric></note>
      <note><pitch><step>F</step><octave>5</octave></pitch><duration>4</duration><voice>1</voice><lyric><text>men</text></lyric></note>
    </measure>
  </part>
  <part id="A">
    <measure number="1">
      <attributes><divisions>2</divisions><time><beats>4</beats><beat-type>4</beat-type></time></attributes>
      <note><pitch><step>C</step><octave>5</octave></pitch><duration>5</duration><voice>1</voice><lyric><text>A</text></lyric></note>
      <note><pitch><step>A</step><octave>4</octave></pitch><duration>3</duration><voice>1</voice><lyric><text>men</text></lyric></note>
    </measure>
  </part>
</score-partwise>"#;

#[test]
fn late_syllable_is_aligned_before_chordifying() {
    let score = parse_musicxml(CHORALE).unwrap();
    let options = ReduceOptions { max_chords: 4, trim_ratio: 0.01, ..Default::default() };
    let aligned = reduce_score(&score, &options).unwrap();
    let spans: Vec<(f64, f64)> = aligned.measures[0].events.iter().map(|e| (e.offset, e.duration)).collect();
    assert_eq!(spans, vec![(0.0, 2.0), (2.0, 2.0)]);
    assert_eq!(names(&aligned.measures[0].events[1]), vec!["A4", "F5"]);

    let unaligned = reduce_score(&score, &ReduceOptions { align_lyrics: false, ..options }).unwrap();
    assert_eq!(unaligned.measures[0].events.len(), 3);
}
