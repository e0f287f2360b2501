//! Splits a format file into tag sections.
//!
//! The scanner only looks at tag-marker lines (`<head>`, `<options>`, `<objects>`, `<body>`).
//! Each marker opens a half-open interval of 0-based line indices that starts at the marker
//! itself and runs to the next marker. Intervals are contiguous and appear in file order.

use crate::error::{LineMarker, ScanError};
use crate::parser;
use std::collections::HashMap;
use std::fmt;

/// Top-level section of a format file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Head,
    Options,
    Objects,
    Body,
}

impl Tag {
    pub fn marker(self) -> &'static str {
        match self {
            Tag::Head => "<head>",
            Tag::Options => "<options>",
            Tag::Objects => "<objects>",
            Tag::Body => "<body>",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

/// Lines `begin..end` belong to `tag`; `begin` is the marker line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagInterval {
    pub tag: Tag,
    pub begin: usize,
    pub end: usize,
}

impl TagInterval {
    /// Indices of the section's content lines (the marker excluded).
    pub fn content(&self) -> std::ops::Range<usize> {
        (self.begin + 1)..self.end
    }
}

/// Result of a successful scan. At most one interval per tag; `<body>` is always present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagIntervals {
    intervals: Vec<TagInterval>,
}

impl TagIntervals {
    pub fn get(&self, tag: Tag) -> Option<TagInterval> {
        self.intervals.iter().copied().find(|i| i.tag == tag)
    }

    /// Intervals in file order.
    pub fn iter(&self) -> impl Iterator<Item = &TagInterval> {
        self.intervals.iter()
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }
}

/// Text of a line with the inline comment and surrounding whitespace removed.
pub fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => line[..pos].trim(),
        None => line.trim(),
    }
}

/// True when the line holds nothing but whitespace and an optional comment.
pub fn is_blank(line: &str) -> bool {
    strip_comment(line).is_empty()
}

/// Compute the tag intervals of `lines`. Independent problems are collected before returning.
pub fn scan(lines: &[&str]) -> Result<TagIntervals, Vec<ScanError>> {
    let first = match lines.iter().position(|l| !is_blank(l)) {
        Some(i) => i,
        None => return Err(vec![ScanError::EmptyInput]),
    };

    let mut errors = Vec::new();
    let tag_at = |i: usize| parser::parse_tag(strip_comment(lines[i]));

    let start = if tag_at(first).is_some() {
        first
    } else {
        errors.push(ScanError::InvalidTagDeclaration {
            at: LineMarker::at_index(lines, first),
        });
        match (first..lines.len()).find(|&i| tag_at(i).is_some()) {
            Some(i) => i,
            None => {
                errors.push(ScanError::MissingBodyTag);
                return Err(errors);
            }
        }
    };

    let mut intervals: Vec<TagInterval> = Vec::new();
    let mut seen: HashMap<Tag, usize> = HashMap::new();
    // Section being accumulated; `None` while inside a duplicated section.
    let mut open: Option<(Tag, usize)> = None;

    for i in start..lines.len() {
        let Some(tag) = tag_at(i) else { continue };
        if let Some((open_tag, begin)) = open.take() {
            intervals.push(TagInterval {
                tag: open_tag,
                begin,
                end: i,
            });
        }
        if let Some(&previous) = seen.get(&tag) {
            errors.push(ScanError::DuplicateTag {
                tag: tag.marker().to_string(),
                first: LineMarker::at_index(lines, previous),
                duplicate: LineMarker::at_index(lines, i),
            });
            continue;
        }
        seen.insert(tag, i);
        open = Some((tag, i));
    }

    if let Some((tag, begin)) = open {
        let mut end = lines.len();
        while end > begin + 1 && is_blank(lines[end - 1]) {
            end -= 1;
        }
        intervals.push(TagInterval { tag, begin, end });
    }

    if !seen.contains_key(&Tag::Body) {
        errors.push(ScanError::MissingBodyTag);
    }

    if errors.is_empty() {
        log::debug!("scanned {} tag section(s)", intervals.len());
        Ok(TagIntervals { intervals })
    } else {
        Err(errors)
    }
}
