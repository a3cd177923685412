use std::fmt;
use regex::Regex;
use once_cell::sync::Lazy;
use log::debug;

// @module: Lenient SRT parsing and strict SRT serialization

// @const: Timeline with two timestamps, either decimal separator, 2-3 fractional digits
static TIMELINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2}):(\d{2}):(\d{2})[.,](\d{2,3})\s*-->\s*(\d{1,2}):(\d{2}):(\d{2})[.,](\d{2,3})").unwrap()
});

// @const: One or more blank (possibly whitespace-only) lines
static BLOCK_SEPARATOR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n\s*\n").unwrap()
});

// @struct: Single subtitle entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleEntry {
    // @field: Entry id, unique within a parsed file
    pub id: u64,

    // @field: Start timestamp, HH:MM:SS,mmm
    pub start_time: String,

    // @field: End timestamp, HH:MM:SS,mmm
    pub end_time: String,

    // @field: Flattened single-line text
    pub text: String,
}

impl SubtitleEntry {
    /// Creates a new subtitle entry
    pub fn new(id: u64, start_time: impl Into<String>, end_time: impl Into<String>, text: impl Into<String>) -> Self {
        SubtitleEntry {
            id,
            start_time: start_time.into(),
            end_time: end_time.into(),
            text: text.into(),
        }
    }

    /// Returns the SRT timeline line for this entry
    pub fn timeline(&self) -> String {
        format!("{} --> {}", self.start_time, self.end_time)
    }
}

impl fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}\n{}\n{}\n", self.id, self.timeline(), self.text)
    }
}

/// Result of parsing one subtitle file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SrtDocument {
    /// Accepted entries in file order
    pub entries: Vec<SubtitleEntry>,

    /// Candidate blocks that were discarded
    pub dropped_blocks: usize,
}

impl SrtDocument {
    /// Parse SRT text, keeping count of the blocks that could not be used
    ///
    /// Parsing never fails: malformed blocks are skipped. A document with no
    /// entries is for the caller to reject.
    pub fn parse(content: &str) -> Self {
        let normalized = content
            .strip_prefix('\u{FEFF}')
            .unwrap_or(content)
            .replace("\r\n", "\n")
            .replace('\r', "\n");
        let normalized = normalized.trim();

        let mut document = SrtDocument::default();
        if normalized.is_empty() {
            return document;
        }

        for block in BLOCK_SEPARATOR_REGEX.split(normalized) {
            match Self::parse_block(block, document.entries.len()) {
                Some(entry) => document.entries.push(entry),
                None => {
                    debug!("Dropping malformed subtitle block: {:?}", block);
                    document.dropped_blocks += 1;
                }
            }
        }

        document
    }

    // @returns: Entry for a block, None when it must be discarded
    fn parse_block(block: &str, accepted: usize) -> Option<SubtitleEntry> {
        let lines: Vec<&str> = block
            .split('\n')
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        if lines.len() < 3 {
            return None;
        }

        // Blocks without a numeric first line have no id line at all
        let (explicit_id, timeline_index) = match lines[0].parse::<u64>() {
            Ok(id) => (Some(id).filter(|id| *id > 0), 1),
            Err(_) => (None, 0),
        };

        let caps = TIMELINE_REGEX.captures(lines[timeline_index])?;
        let text = lines[timeline_index + 1..].join(" ");
        if text.is_empty() {
            return None;
        }

        Some(SubtitleEntry {
            id: explicit_id.unwrap_or(accepted as u64 + 1),
            start_time: normalize_timestamp(&caps, 1),
            end_time: normalize_timestamp(&caps, 5),
            text,
        })
    }

    /// Render entries as strict SRT with positional numbering
    pub fn serialize(entries: &[SubtitleEntry]) -> String {
        entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| format!("{}\n{}\n{}\n", idx + 1, entry.timeline(), entry.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// @returns: HH:MM:SS,mmm built from four capture groups starting at start_idx
fn normalize_timestamp(caps: &regex::Captures, start_idx: usize) -> String {
    let hours = &caps[start_idx];
    let minutes = &caps[start_idx + 1];
    let seconds = &caps[start_idx + 2];
    let fraction = &caps[start_idx + 3];
    format!("{:0>2}:{}:{},{:0<3}", hours, minutes, seconds, fraction)
}

/// Parse SRT text into entries, discarding malformed blocks
pub fn parse_srt(content: &str) -> Vec<SubtitleEntry> {
    SrtDocument::parse(content).entries
}

/// Serialize entries into SRT text, renumbering them from 1
pub fn serialize_srt(entries: &[SubtitleEntry]) -> String {
    SrtDocument::serialize(entries)
}
