//! Integration tests — MusicXML import and voice extraction.

use std::io::{Cursor, Write};

use pretty_assertions::assert_eq;
use scorereduce::extract::voices_from_stack;
use scorereduce::{
    parse_bytes, parse_file, parse_musicxml, reduce_score, ReduceError, ReduceOptions, TieState, TimeSignature,
};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const PIANO: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE score-partwise PUBLIC "-//Recordare//DTD MusicXML 4.0 Partwise//EN" "http://www.musicxml.org/dtds/partwise.dtd">
<score-partwise version="4.0">
  <work><work-title>Prelude</work-title></work>
  <identification><creator type="composer">Anon.</creator></identification>
  <part-list><score-part id="P1"><part-name>Piano</part-name></score-part></part-list>
  <part id="P1">
    <measure number="0" implicit="yes">
      <attributes>
        <divisions>4</divisions>
        <time><beats>3</beats><beat-type>4</beat-type></time>
        <clef number="1"><sign>G</sign><line>2</line></clef>
        <clef number="2"><sign>F</sign><line>4</line></clef>
      </attributes>
      <note><pitch><step>G</step><octave>4</octave></pitch><duration>4</duration><voice>1</voice><staff>1</staff></note>
    </measure>
    <measure number="1">
      <note><pitch><step>C</step><octave>5</octave></pitch><duration>8</duration><voice>1</voice><staff>1</staff>
        <tie type="start"/></note>
      <note><pitch><step>B</step><octave>4</octave></pitch><duration>4</duration><voice>1</voice><staff>1</staff></note>
      <backup><duration>12</duration></backup>
      <note><pitch><step>E</step><octave>4</octave></pitch><duration>4</duration><voice>2</voice><staff>1</staff></note>
      <note><pitch><step>F</step><octave>4</octave></pitch><duration>8</duration><voice>2</voice><staff>1</staff></note>
      <backup><duration>12</duration></backup>
      <note><pitch><step>C</step><octave>3</octave></pitch><duration>12</duration><voice>5</voice><staff>2</staff></note>
      <note><chord/><pitch><step>G</step><octave>3</octave></pitch><duration>12</duration><voice>5</voice><staff>2</staff></note>
    </measure>
    <measure number="2">
      <note><grace/><pitch><step>D</step><octave>5</octave></pitch><voice>1</voice><staff>1</staff></note>
      <note><pitch><step>C</step><octave>5</octave></pitch><duration>4</duration><voice>1</voice><staff>1</staff>
        <tie type="stop"/></note>
      <forward><duration>8</duration></forward>
      <backup><duration>12</duration></backup>
      <note><rest measure="yes"/><duration>12</duration><voice>5</voice><staff>2</staff></note>
    </measure>
  </part>
</score-partwise>"#;

#[test]
fn header_and_attributes() {
    let score = parse_musicxml(PIANO).unwrap();
    assert_eq!(score.title.as_deref(), Some("Prelude"));
    assert_eq!(score.composer.as_deref(), Some("Anon."));
    assert_eq!(score.version.as_deref(), Some("4.0"));
    assert_eq!(score.measure_count(), 3);

    let part = &score.parts[0];
    assert_eq!(part.name, "Piano");
    assert!(part.measures[0].implicit);
    let attrs = part.measures[0].attributes.as_ref().unwrap();
    assert_eq!(attrs.clefs.len(), 2);
    assert_eq!(attrs.clefs[1].sign, "F");
    assert_eq!(part.divisions_at(2), 4);
    assert_eq!(part.time_signature_at(2), Some(TimeSignature::new(3, 4)));
}

#[test]
fn backup_voices_become_separate_voices() {
    let score = parse_musicxml(PIANO).unwrap();
    let voices = voices_from_stack(&score.measure_stack(1), 1);
    assert_eq!(voices.len(), 3);

    let spans = |v: usize| -> Vec<(f64, f64)> { voices[v].iter().map(|e| (e.offset, e.duration)).collect() };
    assert_eq!(spans(0), vec![(0.0, 2.0), (2.0, 1.0)]);
    assert_eq!(spans(1), vec![(0.0, 1.0), (1.0, 2.0)]);
    assert_eq!(spans(2), vec![(0.0, 3.0)]);

    assert_eq!(voices[0][0].tie, TieState::Start);
    assert!(voices[2][0].is_chord());
    assert_eq!(voices[2][0].pitches().len(), 2);
    assert_eq!(voices[0][1].beat_strength, 0.5);
}

#[test]
fn grace_notes_and_forward_leave_rests() {
    let score = parse_musicxml(PIANO).unwrap();
    let voices = voices_from_stack(&score.measure_stack(2), 2);
    assert_eq!(voices.len(), 2);

    let upper = &voices[0];
    assert_eq!(upper.len(), 2, "grace note takes no time; trailing rest pads the voice");
    assert_eq!(upper[0].tie, TieState::Stop);
    assert!(upper[1].is_rest());
    assert_eq!(upper[1].offset, 1.0);
    assert_eq!(upper[1].duration, 2.0);
    assert!(voices[1][0].is_rest());
}

#[test]
fn pickup_content_is_short() {
    let score = parse_musicxml(PIANO).unwrap();
    let voices = voices_from_stack(&score.measure_stack(0), 0);
    assert_eq!(voices.len(), 1);
    assert_eq!(voices[0][0].end(), 1.0);
}

#[test]
fn bytes_are_sniffed_as_xml() {
    let score = parse_bytes(PIANO.as_bytes(), None).unwrap();
    assert_eq!(score.parts.len(), 1);
}

#[test]
fn missing_file_is_a_parse_error() {
    let err = parse_file("/nonexistent/score.musicxml").unwrap_err();
    assert!(matches!(err, ReduceError::Parse(_)));
    assert!(err.to_string().contains("Failed to read file"));
}

#[test]
fn non_archive_mxl_is_rejected() {
    let err = parse_bytes(b"PK-not-really", Some("mxl")).unwrap_err();
    assert!(matches!(err, ReduceError::Parse(_)));
}

// ─── Attribute changes inside a measure ─────────────────────────────

const CLEF_CHANGE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<score-partwise version="4.0">
  <part-list><score-part id="P1"><part-name>Cello</part-name></score-part></part-list>
  <part id="P1">
    <measure number="1">
      <attributes>
        <divisions>4</divisions>
        <time><beats>4</beats><beat-type>4</beat-type></time>
        <clef><sign>F</sign><line>4</line></clef>
      </attributes>
      <note><pitch><step>C</step><octave>4</octave></pitch><duration>8</duration><voice>1</voice></note>
      <attributes><clef><sign>G</sign><line>2</line></clef></attributes>
      <note><pitch><step>E</step><octave>4</octave></pitch><duration>8</duration><voice>1</voice></note>
    </measure>
  </part>
</score-partwise>"#;

#[test]
fn mid_measure_clef_change_keeps_divisions_and_time() {
    let score = parse_musicxml(CLEF_CHANGE).unwrap();
    let part = &score.parts[0];
    assert_eq!(part.divisions_at(0), 4);
    assert_eq!(part.time_signature_at(0), Some(TimeSignature::new(4, 4)));
    let attrs = part.measures[0].attributes.as_ref().unwrap();
    let signs: Vec<&str> = attrs.clefs.iter().map(|c| c.sign.as_str()).collect();
    assert_eq!(signs, vec!["F", "G"]);

    let voices = voices_from_stack(&score.measure_stack(0), 0);
    let spans: Vec<(f64, f64)> = voices[0].iter().map(|e| (e.offset, e.duration)).collect();
    assert_eq!(spans, vec![(0.0, 2.0), (2.0, 2.0)]);

    let reduced = reduce_score(&score, &ReduceOptions::default()).unwrap();
    assert_eq!(reduced.measures[0].length(), 4.0);
    assert_eq!(reduced.measures[0].time_signature, Some(TimeSignature::new(4, 4)));
}

// ─── Compressed archives ────────────────────────────────────────────

const CONTAINER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container><rootfiles><rootfile full-path="score/main.musicxml"/></rootfiles></container>"#;

fn mxl(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, body) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

#[test]
fn mxl_root_file_comes_from_the_container() {
    let decoy = PIANO.replace("Prelude", "Decoy");
    let data = mxl(&[
        ("META-INF/container.xml", CONTAINER),
        ("other.xml", decoy.as_str()),
        ("score/main.musicxml", PIANO),
    ]);
    let score = parse_bytes(&data, Some("mxl")).unwrap();
    assert_eq!(score.title.as_deref(), Some("Prelude"));
    assert_eq!(score.measure_count(), 3);

    let sniffed = parse_bytes(&data, None).unwrap();
    assert_eq!(sniffed.title.as_deref(), Some("Prelude"));
}

#[test]
fn mxl_without_container_uses_the_score_entry() {
    let data = mxl(&[("mimetype", "application/vnd.recordare.musicxml"), ("song.xml", PIANO)]);
    let score = parse_bytes(&data, Some("mxl")).unwrap();
    assert_eq!(score.title.as_deref(), Some("Prelude"));
    assert_eq!(score.parts[0].name, "Piano");
}
