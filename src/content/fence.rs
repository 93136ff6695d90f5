//! Fenced code block scanning
//!
//! Markdown renderers silently close a fence left open at the end of a
//! document or container, swallowing the rest of the post into a code
//! sample. Blocks are found with the same CommonMark parser the renderer
//! uses, so fences inside block quotes and list items are seen too.

use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag};
use serde::Serialize;
use std::ops::Range;

use super::markdown::options;

/// A fenced code block found in a post body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fence {
    /// Line of the opening marker (1-based, relative to the scanned text)
    pub open_line: usize,
    /// Line of the closing marker, if the block is closed
    pub close_line: Option<usize>,
    /// Marker character, '`' or '~'
    pub marker: char,
    /// Number of marker characters in the opening fence
    pub width: usize,
    /// Info string after the opening marker (usually the language)
    pub info: String,
}

impl Fence {
    pub fn is_terminated(&self) -> bool {
        self.close_line.is_some()
    }

    /// The marker as written, e.g. "```"
    pub fn marker_str(&self) -> String {
        self.marker.to_string().repeat(self.width)
    }
}

/// Quote depth of the container prefix in front of a fence marker
fn quote_depth(prefix: &str) -> usize {
    prefix.chars().filter(|c| *c == '>').count()
}

/// Strip block quote markers (up to `depth`) and indentation from a line,
/// returning the rest and the number of spaces stripped after the last marker
fn strip_container(line: &str, depth: usize) -> (&str, usize) {
    let mut rest = line;
    for _ in 0..depth {
        match rest.trim_start().strip_prefix('>') {
            Some(inner) => rest = inner,
            None => break,
        }
    }
    let trimmed = rest.trim_start_matches(' ');
    (trimmed.trim_start(), rest.len() - trimmed.len())
}

fn closes(line: &str, marker: char, width: usize) -> bool {
    let run = line.chars().take_while(|c| *c == marker).count();
    // Marker chars are ASCII, so run is also a byte offset
    run >= width && line[run..].trim().is_empty()
}

/// Build a fence from the source range of a fenced code block
fn fence_at(body: &str, range: Range<usize>, info: &str) -> Option<Fence> {
    let block = &body[range.clone()];
    let offset = block.find(['`', '~'])?;
    let marker = block[offset..].chars().next()?;
    let width = block[offset..].chars().take_while(|c| *c == marker).count();

    let marker_pos = range.start + offset;
    let line_start = body[..marker_pos].rfind('\n').map_or(0, |i| i + 1);
    let prefix = &body[line_start..marker_pos];
    let depth = quote_depth(prefix);
    // Deeper indentation makes the line code, not a closing fence
    let max_indent = if depth == 0 { prefix.len() + 3 } else { usize::MAX };
    let open_line = body[..marker_pos].matches('\n').count() + 1;

    // The block ends on its closing fence, if it has one
    let block = block[offset..].trim_end_matches(['\n', '\r']);
    let close_line = block.rfind('\n').and_then(|last| {
        let (line, indent) = strip_container(block[last + 1..].trim_end_matches('\r'), depth);
        (indent <= max_indent && closes(line, marker, width))
            .then(|| open_line + block.matches('\n').count())
    });

    Some(Fence {
        open_line,
        close_line,
        marker,
        width,
        info: info.trim().to_string(),
    })
}

/// Scan a markdown body for fenced code blocks
pub fn scan(body: &str) -> Vec<Fence> {
    Parser::new_ext(body, options())
        .into_offset_iter()
        .filter_map(|(event, range)| match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                fence_at(body, range, &info)
            }
            _ => None,
        })
        .collect()
}

/// The first fence that is opened and never closed
pub fn first_unterminated(body: &str) -> Option<Fence> {
    scan(body).into_iter().find(|f| !f.is_terminated())
}
