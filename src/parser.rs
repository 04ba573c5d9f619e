//! MusicXML parser — converts MusicXML XML into the Score data model.
//!
//! Only `score-partwise` documents are read. Layout, harmony symbols,
//! barlines and directions are skipped: the reducer works on pitches,
//! durations, voices, ties and lyrics.

use roxmltree::{Document, Node};

use crate::error::{ReduceError, Result};
use crate::model::*;

/// Parse a MusicXML XML string into a Score.
pub fn parse_musicxml(xml: &str) -> Result<Score> {
    // MusicXML files include a DOCTYPE declaration, so we must allow DTDs
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    let doc = Document::parse_with_options(xml, options)
        .map_err(|e| ReduceError::Parse(format!("XML parse error: {e}")))?;
    let root = doc.root_element();

    if root.tag_name().name() != "score-partwise" {
        return Err(ReduceError::Parse(format!(
            "Unsupported root element: '{}'. Only 'score-partwise' is supported.",
            root.tag_name().name()
        )));
    }

    let mut score = Score::new();
    score.version = root.attribute("version").map(String::from);

    for child in root.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "work" => parse_work(&child, &mut score),
            "identification" => parse_identification(&child, &mut score),
            "part-list" => parse_part_list(&child, &mut score),
            "part" => parse_part(&child, &mut score),
            _ => {}
        }
    }

    Ok(score)
}

// ─── Header ──────────────────────────────────────────────────────────

fn parse_work(node: &Node, score: &mut Score) {
    for child in node.children().filter(|n| n.is_element()) {
        if child.tag_name().name() == "work-title" {
            score.title = child.text().map(|t| t.trim().to_string());
        }
    }
}

fn parse_identification(node: &Node, score: &mut Score) {
    for child in node.children().filter(|n| n.is_element()) {
        if child.tag_name().name() == "creator" && child.attribute("type") == Some("composer") {
            score.composer = child.text().map(|t| t.trim().to_string());
        }
    }
}

// ─── Part List ───────────────────────────────────────────────────────

fn parse_part_list(node: &Node, score: &mut Score) {
    for child in node.children().filter(|n| n.is_element()) {
        if child.tag_name().name() == "score-part" {
            let id = child.attribute("id").unwrap_or("").to_string();
            let name = child
                .children()
                .find(|n| n.is_element() && n.tag_name().name() == "part-name")
                .and_then(|n| n.text())
                .unwrap_or("")
                .trim()
                .to_string();
            score.parts.push(Part {
                id,
                name,
                measures: Vec::new(),
            });
        }
    }
}

// ─── Part (measures) ─────────────────────────────────────────────────

fn parse_part(node: &Node, score: &mut Score) {
    let part_id = node.attribute("id").unwrap_or("").to_string();

    // A <part> without a matching <score-part> still carries music.
    if !score.parts.iter().any(|p| p.id == part_id) {
        score.parts.push(Part {
            id: part_id.clone(),
            name: String::new(),
            measures: Vec::new(),
        });
    }
    let part = match score.parts.iter_mut().find(|p| p.id == part_id) {
        Some(p) => p,
        None => return,
    };

    for child in node.children().filter(|n| n.is_element()) {
        if child.tag_name().name() == "measure" {
            part.measures.push(parse_measure(&child));
        }
    }
}

// ─── Measure ─────────────────────────────────────────────────────────

fn parse_measure(node: &Node) -> Measure {
    let number = node
        .attribute("number")
        .and_then(|n| n.parse::<i32>().ok())
        .unwrap_or(0);
    let implicit = node.attribute("implicit") == Some("yes");

    let mut measure = Measure {
        number,
        implicit,
        attributes: None,
        notes: Vec::new(),
    };

    // Position in divisions; <backup>/<forward> move it, notes advance it.
    let mut cursor: i32 = 0;
    let mut last_onset: i32 = 0;

    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "attributes" => {
                // Later blocks (clef changes mid-measure) only override what they state.
                let block = parse_attributes(&child);
                let attrs = measure.attributes.get_or_insert_with(Attributes::default);
                if block.divisions.is_some() {
                    attrs.divisions = block.divisions;
                }
                if block.time.is_some() {
                    attrs.time = block.time;
                }
                attrs.clefs.extend(block.clefs);
            }
            "note" => {
                let mut note = parse_note(&child);
                if note.chord {
                    note.offset = last_onset;
                } else {
                    note.offset = cursor;
                    if !note.grace {
                        last_onset = cursor;
                        cursor += note.duration;
                    }
                }
                measure.notes.push(note);
            }
            "backup" => {
                cursor = (cursor - child_duration(&child)).max(0);
            }
            "forward" => {
                cursor += child_duration(&child);
            }
            _ => {}
        }
    }

    measure
}

fn child_duration(node: &Node) -> i32 {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == "duration")
        .and_then(|n| parse_i32(&n))
        .unwrap_or(0)
}

// ─── Attributes ──────────────────────────────────────────────────────

fn parse_attributes(node: &Node) -> Attributes {
    let mut attrs = Attributes::default();

    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "divisions" => attrs.divisions = parse_i32(&child),
            "time" => attrs.time = Some(parse_time(&child)),
            "clef" => attrs.clefs.push(parse_clef(&child)),
            _ => {}
        }
    }

    attrs
}

fn parse_time(node: &Node) -> TimeSignature {
    let mut ts = TimeSignature::new(4, 4);
    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "beats" => ts.beats = parse_i32(&child).unwrap_or(4),
            "beat-type" => ts.beat_type = parse_i32(&child).unwrap_or(4),
            _ => {}
        }
    }
    ts
}

fn parse_clef(node: &Node) -> Clef {
    let number = node
        .attribute("number")
        .and_then(|n| n.parse::<i32>().ok())
        .unwrap_or(1);
    let mut clef = Clef {
        number,
        ..Clef::treble()
    };
    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "sign" => {
                clef.sign = child.text().unwrap_or("G").trim().to_string();
            }
            "line" => clef.line = parse_i32(&child).unwrap_or(2),
            "clef-octave-change" => clef.octave_change = parse_i32(&child),
            _ => {}
        }
    }
    clef
}

// ─── Note ────────────────────────────────────────────────────────────

fn parse_note(node: &Node) -> Note {
    let mut note = Note::default();

    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "pitch" => note.pitch = Some(parse_pitch(&child)),
            "duration" => note.duration = parse_i32(&child).unwrap_or(0),
            "voice" => note.voice = parse_i32(&child),
            "staff" => note.staff = parse_i32(&child),
            "rest" => note.rest = true,
            "grace" => note.grace = true,
            "chord" => note.chord = true,
            "tie" => match child.attribute("type") {
                Some("start") => note.tie_start = true,
                Some("stop") => note.tie_stop = true,
                _ => {}
            },
            "lyric" => {
                if let Some(lyric) = parse_lyric(&child) {
                    note.lyrics.push(lyric);
                }
            }
            _ => {}
        }
    }

    note
}

fn parse_lyric(node: &Node) -> Option<Lyric> {
    let number = node
        .attribute("number")
        .and_then(|n| n.parse().ok())
        .unwrap_or(1);
    let text = node
        .children()
        .find(|n| n.has_tag_name("text"))
        .and_then(|n| n.text())
        .unwrap_or("")
        .trim()
        .to_string();
    if text.is_empty() {
        None
    } else {
        Some(Lyric { number, text })
    }
}

fn parse_pitch(node: &Node) -> Pitch {
    let mut pitch = Pitch::new("C", 4, None);
    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "step" => {
                pitch.step = child.text().unwrap_or("C").trim().to_string();
            }
            "octave" => pitch.octave = parse_i32(&child).unwrap_or(4),
            "alter" => pitch.alter = parse_f64(&child),
            _ => {}
        }
    }
    pitch
}

// ─── Helpers ─────────────────────────────────────────────────────────

fn parse_i32(node: &Node) -> Option<i32> {
    node.text()?.trim().parse().ok()
}

fn parse_f64(node: &Node) -> Option<f64> {
    node.text()?.trim().parse().ok()
}
