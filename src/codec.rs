//! Filename grammar of a note and the header grammar of importable text.
//!
//! A filename has up to four segments joined by `" - "`:
//!
//! ```text
//! 170712a - Evolution, Lego bauen - Gespräch Peter, gutmann2000a 14f - 190314a.png
//! ^id       ^keywords               ^context and references            ^predecessor
//! ```
//!
//! A header is the first lines of a plain text note: keywords, a date and an
//! optional line of context and references, e.g.
//!
//! ```text
//! Modelle, Theorien
//! 12.1.2020
//! ropohl2013a 14, 121117a
//! ```

use ahash::AHashSet;
use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

use crate::check::Inconsistency;
use crate::error::{ContentError, DecodeError, EncodeError};
use crate::identity;
use crate::note::{Identity, Note, Reference};

const SEPARATOR: &str = " - ";
const MAX_SEGMENTS: usize = 4;
const FILE_EXTENSION: &str = ".txt";

/// Accepted header date layouts, tried in order. First match wins.
const DATE_FORMATS: [&str; 5] = ["%d.%m.%y", "%d.%m.%Y", "%y%m%d", "%B %d, %Y", "%m/%d/%y"];

static REFERENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-z]{2,}\d{4}[a-z]?)(?: (.+))?$").unwrap());
static INLINE_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@\d{6}[a-z]{1,3}$").unwrap());

/// A decoded note plus the defects found while decoding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub note: Note,
    pub inconsistencies: Vec<Inconsistency>,
}

#[derive(Debug, Default)]
struct Metadata {
    context: Vec<String>,
    references: Vec<Reference>,
    predecessors: Vec<Identity>,
}

impl Metadata {
    fn classify(&mut self, segment: &str) {
        for token in segment.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if let Some(identity) = Identity::parse(token) {
                self.predecessors.push(identity);
            } else if INLINE_LINK_RE.is_match(token) {
                continue;
            } else if let Some(caps) = REFERENCE_RE.captures(token) {
                self.references
                    .push(Reference::new(&caps[1], caps.get(2).map(|m| m.as_str())));
            } else {
                self.context.push(token.to_string());
            }
        }
    }

    /// Moves the classified tokens into `note`. The first predecessor wins,
    /// any further token, even a repeated one, is reported instead of linked.
    fn apply(self, note: &mut Note) -> Vec<Inconsistency> {
        note.context = self.context;
        note.references = self.references;
        note.predecessor = self.predecessors.first().cloned();

        if self.predecessors.len() > 1 {
            vec![Inconsistency::MultiplePredecessors {
                identity: note.identity.clone(),
                predecessors: self.predecessors,
            }]
        } else {
            Vec::new()
        }
    }
}

/// Decodes a filename such as `170712a - Evolution, Lego bauen.txt`.
pub fn decode(filename: &str) -> Result<Decoded, DecodeError> {
    if filename.is_empty() {
        return Err(DecodeError::EmptyInput);
    }
    let identity = Identity::prefix_of(filename)
        .ok_or_else(|| DecodeError::MissingIdentity(filename.to_string()))?;

    let segments: Vec<&str> = strip_extension(filename).split(SEPARATOR).collect();
    if segments[0] != identity.as_str() {
        return Err(DecodeError::MalformedIdentity(filename.to_string()));
    }
    if segments.len() > MAX_SEGMENTS {
        return Err(DecodeError::TooManySegments(filename.to_string()));
    }

    let mut note = Note::new(identity);
    note.name = filename.to_string();
    if let Some(keywords) = segments.get(1) {
        note.keywords = split_keywords(keywords);
    }
    if segments.len() > 2 && note.keywords.is_empty() {
        return Err(DecodeError::MissingKeyword(filename.to_string()));
    }

    let mut metadata = Metadata::default();
    if let Some(segment) = segments.get(2) {
        metadata.classify(segment);
    }
    if let Some(segment) = segments.get(3) {
        for token in segment.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let predecessor = Identity::parse(token)
                .ok_or_else(|| DecodeError::MalformedPredecessor(token.to_string()))?;
            metadata.predecessors.push(predecessor);
        }
    }

    let inconsistencies = metadata.apply(&mut note);
    Ok(Decoded {
        note,
        inconsistencies,
    })
}

/// Encodes a note into its canonical filename.
///
/// Layout: `id - keywords[ - context, references][ - predecessor].txt`,
/// where a segment is only written when it is non-empty.
pub fn encode(note: &Note) -> Result<String, EncodeError> {
    if note.keywords.is_empty() {
        return Err(EncodeError::MissingKeyword(note.identity.clone()));
    }

    let mut name = format!("{}{}{}", note.identity, SEPARATOR, note.keywords.join(", "));

    let metadata: Vec<String> = note
        .context
        .iter()
        .cloned()
        .chain(note.references.iter().map(Reference::to_string))
        .collect();
    if !metadata.is_empty() {
        name.push_str(SEPARATOR);
        name.push_str(&metadata.join(", "));
    }

    if let Some(predecessor) = &note.predecessor {
        name.push_str(SEPARATOR);
        name.push_str(predecessor.as_str());
    }

    name.push_str(FILE_EXTENSION);
    Ok(name)
}

/// Decodes the header of a text note. The identity is generated from the
/// header date and keywords so that it does not collide with `existing`.
pub fn decode_header(
    content: &str,
    existing: &AHashSet<Identity>,
) -> Result<Decoded, DecodeError> {
    if content.trim().is_empty() {
        return Err(DecodeError::EmptyInput);
    }
    let mut lines = content.lines();
    let keywords: Vec<String> = lines
        .next()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect();
    let date_line = lines
        .next()
        .ok_or_else(|| DecodeError::UnparseableDate(String::new()))?;
    let date = parse_date(date_line)?;

    let mut metadata = Metadata::default();
    if let Some(line) = lines.next() {
        metadata.classify(line);
    }

    let identity = identity::generate(date, &keywords, existing)?;
    let mut note = Note::new(identity);
    note.keywords = keywords;
    let inconsistencies = metadata.apply(&mut note);

    Ok(Decoded {
        note,
        inconsistencies,
    })
}

/// `decode_header` followed by `encode`: the filename a text note is imported under.
pub fn encode_content(
    content: &str,
    existing: &AHashSet<Identity>,
) -> Result<Decoded, ContentError> {
    let mut decoded = decode_header(content, existing)?;
    decoded.note.name = encode(&decoded.note)?;
    Ok(decoded)
}

pub fn parse_date(s: &str) -> Result<NaiveDate, DecodeError> {
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
        .ok_or_else(|| DecodeError::UnparseableDate(s.to_string()))
}

fn split_keywords(segment: &str) -> Vec<String> {
    segment
        .split(',')
        .map(str::trim_start)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

/// Drops a trailing `.txt`/`.png`/`.pdf`-like extension. A dot followed by
/// spaces or punctuation belongs to the last segment and is kept.
fn strip_extension(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(pos) if pos > 0 => {
            let ext = &filename[pos + 1..];
            let is_extension = (1..=5).contains(&ext.len())
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
                && ext.chars().any(|c| c.is_ascii_alphabetic());
            if is_extension {
                &filename[..pos]
            } else {
                filename
            }
        }
        _ => filename,
    }
}
