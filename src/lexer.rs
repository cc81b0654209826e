//! Tag splitter
//!
//! Partitions template source into literal-text and tag-content segments on
//! configurable delimiters, with byte spans into the source. Every segment
//! between open delimiters is handled the same way, including the one before
//! the first open delimiter, which gives three deliberate quirks:
//!
//! - an open delimiter with no matching close swallows the delimiter and
//!   turns the rest of the segment into literal text
//! - in a segment holding more than one close delimiter, only the text
//!   between the first and second survives; the remainder is dropped
//! - a close delimiter ahead of any open delimiter turns the text before it
//!   into a tag

use crate::ast::{Span, span};

/// One segment of a split template
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SegmentKind {
    /// Literal text between tags
    Text(String),
    /// The content of one tag, delimiters stripped
    Tag(String),
}

impl Segment {
    fn text(content: &str, offset: usize) -> Self {
        Self {
            kind: SegmentKind::Text(content.to_string()),
            span: span(offset, content.len()),
        }
    }

    fn tag(content: &str, offset: usize) -> Self {
        Self {
            kind: SegmentKind::Tag(content.to_string()),
            span: span(offset, content.len()),
        }
    }
}

/// Split a template into text and tag segments.
///
/// Empty segments are skipped, so the result never contains a zero-length
/// text or tag entry.
pub fn split(source: &str, open_tag: &str, close_tag: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut offset = 0;
    let mut first = true;

    for part in source.split(open_tag) {
        if !first {
            offset += open_tag.len();
        }
        split_part(part, offset, close_tag, &mut segments);
        offset += part.len();
        first = false;
    }

    segments
}

/// Handle one piece between open delimiters: tag content up to the first
/// close delimiter, then text up to the next close delimiter (or the end).
/// A piece with no close delimiter is all text.
fn split_part(part: &str, offset: usize, close_tag: &str, out: &mut Vec<Segment>) {
    let (code, text, text_offset) = match part.find(close_tag) {
        Some(at) => {
            let rest = &part[at + close_tag.len()..];
            let rest_offset = offset + at + close_tag.len();
            // Anything past a second close delimiter is dropped
            let text = match rest.find(close_tag) {
                Some(next) => &rest[..next],
                None => rest,
            };
            (&part[..at], text, rest_offset)
        }
        None => ("", part, offset),
    };

    if !code.is_empty() {
        out.push(Segment::tag(code, offset));
    }
    if !text.is_empty() {
        out.push(Segment::text(text, text_offset));
    }
}
