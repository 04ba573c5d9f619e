//! MXL file handler — reads compressed MusicXML (.mxl) archives.
//!
//! An .mxl file is a ZIP archive containing:
//!   - META-INF/container.xml  — declares the root MusicXML file path
//!   - <rootfile>.xml          — the actual MusicXML content (e.g., score.xml)
//!   - (optional) other files  — images, sounds, etc.

use std::io::{Cursor, Read};
use zip::ZipArchive;

use crate::error::{ReduceError, Result};
use crate::model::Score;
use crate::parser;

/// Read and parse a .mxl file from raw bytes.
pub fn parse_mxl(data: &[u8]) -> Result<Score> {
    let xml = extract_musicxml_from_mxl(data)?;
    parser::parse_musicxml(&xml)
}

/// Extract the MusicXML content string from .mxl bytes.
pub fn extract_musicxml_from_mxl(data: &[u8]) -> Result<String> {
    let mut archive = ZipArchive::new(Cursor::new(data))
        .map_err(|e| archive_error(format!("Failed to open MXL archive: {e}")))?;

    let root_file_path = locate_root_file(&mut archive)?;

    let mut root_file = archive.by_name(&root_file_path).map_err(|e| {
        archive_error(format!("Root file '{root_file_path}' not found in archive: {e}"))
    })?;

    let mut xml = String::new();
    root_file
        .read_to_string(&mut xml)
        .map_err(|e| archive_error(format!("Failed to read '{root_file_path}': {e}")))?;

    Ok(xml)
}

fn archive_error(message: String) -> ReduceError {
    ReduceError::Parse(message)
}

/// Find the root MusicXML path: `META-INF/container.xml` first, then the
/// first `.xml`/`.musicxml` entry outside `META-INF/`.
fn locate_root_file(archive: &mut ZipArchive<Cursor<&[u8]>>) -> Result<String> {
    let container_xml = match archive.by_name("META-INF/container.xml") {
        Ok(mut container_file) => {
            let mut xml = String::new();
            container_file
                .read_to_string(&mut xml)
                .map_err(|e| archive_error(format!("Failed to read container.xml: {e}")))?;
            Some(xml)
        }
        Err(_) => None,
    };

    if let Some(xml) = container_xml {
        let doc = roxmltree::Document::parse(&xml)
            .map_err(|e| archive_error(format!("Failed to parse container.xml: {e}")))?;

        return doc
            .descendants()
            .filter(|n| n.tag_name().name() == "rootfile")
            .find_map(|n| n.attribute("full-path"))
            .map(str::to_string)
            .ok_or_else(|| archive_error("No rootfile found in container.xml".to_string()));
    }

    let names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names
        .iter()
        .find(|name| {
            !name.starts_with("META-INF/") && (name.ends_with(".xml") || name.ends_with(".musicxml"))
        })
        .cloned()
        .ok_or_else(|| archive_error(format!("No MusicXML file found in archive. Files: {names:?}")))
}
