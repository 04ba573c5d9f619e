//! scorereduce — chord reduction of MusicXML scores.
//!
//! Reads uncompressed MusicXML (.musicxml) or compressed MXL (.mxl) files
//! and reduces every measure of the score to its one or two most important
//! chords, producing a single harmonic summary part.
//!
//! # Example
//! ```no_run
//! use scorereduce::{parse_file, reduce_score, ReduceOptions};
//!
//! let score = parse_file("path/to/chorale.musicxml").unwrap();
//! let reduction = reduce_score(&score, &ReduceOptions::default()).unwrap();
//! for measure in &reduction.measures {
//!     println!("{}: {} chords", measure.number, measure.events.len());
//! }
//! ```

pub mod assemble;
pub mod chordify;
pub mod driver;
pub mod error;
pub mod event;
pub mod extract;
pub mod lyrics;
pub mod model;
pub mod mxl;
pub mod notation;
pub mod parser;
pub mod reduce;
pub mod theory;
pub mod vertical;
pub mod weights;

use std::path::Path;

pub use assemble::{AssemblyOptions, Bar, MeasureAssembler, OutputMeasure};
pub use driver::{reduce_score, ChordReducer, ReduceOptions, ReducedPart};
pub use error::{ReduceError, Result};
pub use event::{EventKind, PitchClassKey, TieState, TimedEvent};
pub use model::*;
pub use mxl::parse_mxl;
pub use parser::parse_musicxml;
pub use reduce::reduce_measure;
pub use weights::{compute_weights, ChordScorer, WeightPolicy};

/// Parse a MusicXML file from a file path.
/// Automatically detects format based on file extension:
/// - `.musicxml` or `.xml` → uncompressed MusicXML
/// - `.mxl` → compressed MXL (ZIP archive)
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Score> {
    let path = path.as_ref();
    let data = std::fs::read(path)
        .map_err(|e| ReduceError::Parse(format!("Failed to read file '{}': {e}", path.display())))?;

    parse_bytes(&data, path.extension().and_then(|e| e.to_str()))
}

/// Parse MusicXML from raw bytes with an optional format hint.
/// If `extension` is None, tries to auto-detect the format.
pub fn parse_bytes(data: &[u8], extension: Option<&str>) -> Result<Score> {
    match extension {
        Some("mxl") => parse_mxl(data),
        Some("musicxml") | Some("xml") => {
            let xml = std::str::from_utf8(data)
                .map_err(|e| ReduceError::Parse(format!("Invalid UTF-8 in MusicXML file: {e}")))?;
            parse_musicxml(xml)
        }
        _ => {
            if let Ok(xml) = std::str::from_utf8(data) {
                if xml.trim_start().starts_with('<') {
                    return parse_musicxml(xml);
                }
            }
            parse_mxl(data)
        }
    }
}

/// Parse a file and reduce it in one step.
pub fn reduce_file<P: AsRef<Path>>(path: P, options: &ReduceOptions) -> Result<ReducedPart> {
    let score = parse_file(path)?;
    reduce_score(&score, options)
}

/// Parse bytes and reduce them in one step.
pub fn reduce_bytes(data: &[u8], extension: Option<&str>, options: &ReduceOptions) -> Result<ReducedPart> {
    let score = parse_bytes(data, extension)?;
    reduce_score(&score, options)
}

/// Convert a reduced part to a JSON string.
pub fn part_to_json(part: &ReducedPart) -> Result<String> {
    serde_json::to_string_pretty(part).map_err(|e| ReduceError::Parse(format!("JSON serialization error: {e}")))
}

/// Convert a parsed score to a JSON string.
pub fn score_to_json(score: &Score) -> Result<String> {
    serde_json::to_string_pretty(score).map_err(|e| ReduceError::Parse(format!("JSON serialization error: {e}")))
}
