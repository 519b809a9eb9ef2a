//! Structural splitting of markdown into heading-delimited sections.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Synthetic heading for content that precedes the first real heading.
pub const DOCUMENT_START_HEADING: &str = "Document Start";

/// Generic heading used when a document contains no headings at all.
pub const DOCUMENT_HEADING: &str = "Document";

/// A contiguous markdown region introduced by a heading line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub heading: String,
    pub body: String,
}

fn heading_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^#{1,6}\s+").expect("heading pattern is valid"))
}

/// Partitions `markdown` into heading-delimited sections.
///
/// Lines before the first heading accumulate under a synthetic
/// "Document Start" heading; a heading immediately followed by another heading
/// is kept as a section with an empty body so no heading text is lost. A
/// document without any headings becomes a single section, so non-empty input
/// never yields an empty section list.
pub fn split_by_headings(markdown: &str) -> Vec<Section> {
    let pattern = heading_pattern();
    let mut sections = Vec::new();
    let mut current_heading = DOCUMENT_START_HEADING.to_string();
    let mut heading_pending = false;
    let mut buffer: Vec<&str> = Vec::new();

    for line in markdown.lines() {
        if pattern.is_match(line) {
            if !buffer.is_empty() || heading_pending {
                sections.push(Section {
                    heading: current_heading.clone(),
                    body: buffer.join("\n").trim().to_string(),
                });
            }
            current_heading = line.trim().to_string();
            heading_pending = true;
            buffer.clear();
        } else {
            buffer.push(line);
        }
    }
    if !buffer.is_empty() || heading_pending {
        sections.push(Section {
            heading: current_heading,
            body: buffer.join("\n").trim().to_string(),
        });
    }

    if sections.is_empty() && !markdown.trim().is_empty() {
        sections.push(Section {
            heading: DOCUMENT_HEADING.to_string(),
            body: markdown.trim().to_string(),
        });
    }
    sections
}
