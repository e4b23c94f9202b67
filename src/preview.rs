//! Preview rendering: highlighted, context-windowed reports of rewritten files.

use crate::config::{ContextLines, RenderStyle};
use crate::engine::MatchSpan;
use std::io::{self, Write};
use std::path::Path;

/// Renders previews with one style and context setting.
#[derive(Debug, Clone, Copy)]
pub struct Preview<'a> {
    style: &'a RenderStyle,
    context: ContextLines,
}

impl<'a> Preview<'a> {
    pub fn new(style: &'a RenderStyle, context: ContextLines) -> Self {
        Self { style, context }
    }

    /// Writes the report for one rewritten buffer.
    ///
    /// `spans` locate the replacement texts inside `buffer`. The report
    /// starts with a header naming the file and the number of matches,
    /// followed by either the whole buffer or the lines touched by a
    /// replacement plus the configured context.
    pub fn render<W: Write>(
        &self,
        out: &mut W,
        buffer: &[u8],
        spans: &[MatchSpan],
        filename: &Path,
    ) -> io::Result<()> {
        let style = self.style;
        writeln!(
            out,
            "{}{}{} ({}{}{} matches):",
            style.bold,
            filename.display(),
            style.normal,
            style.bold,
            spans.len(),
            style.normal
        )?;

        let mut text = buffer.to_vec();
        if text.last().is_some_and(|&b| b != b'\n') {
            text.push(b'\n');
        }
        let highlighted = highlight(&text, spans, style);

        let (count, hide_separators) = match self.context {
            ContextLines::WholeFile => return out.write_all(&highlighted),
            ContextLines::Lines {
                count,
                hide_separators,
            } => (count, hide_separators),
        };

        let lines = split_lines(&highlighted);
        let marked = mark_lines(&text, spans, lines.len(), count);

        for (index, line) in lines.iter().enumerate() {
            if !marked[index] {
                continue;
            }
            if !hide_separators && (index == 0 || !marked[index - 1]) {
                writeln!(out, "{}--{}--{}", style.thin, index + 1, style.normal)?;
            }
            out.write_all(line)?;
            out.write_all(b"\n")?;
        }
        Ok(())
    }
}

/// Wraps every span of `text` in the bold and normal markers.
pub fn highlight(text: &[u8], spans: &[MatchSpan], style: &RenderStyle) -> Vec<u8> {
    let mut sorted = spans.to_vec();
    sorted.sort();

    let mut out = Vec::with_capacity(text.len() + spans.len() * 8);
    let mut cursor = 0;
    for span in sorted {
        let end = span.end.min(text.len());
        if end < cursor {
            continue;
        }
        let start = span.start.max(cursor);
        out.extend_from_slice(&text[cursor..start]);
        out.extend_from_slice(style.bold.as_bytes());
        out.extend_from_slice(&text[start..end]);
        out.extend_from_slice(style.normal.as_bytes());
        cursor = end;
    }
    out.extend_from_slice(&text[cursor..]);
    out
}

/// Splits newline-terminated text into lines without their terminators.
fn split_lines(text: &[u8]) -> Vec<&[u8]> {
    let mut lines: Vec<&[u8]> = text.split(|&b| b == b'\n').collect();
    if text.is_empty() || text.ends_with(b"\n") {
        lines.pop();
    }
    lines
}

/// Marks the lines touched by a span plus `context` lines on either side.
fn mark_lines(text: &[u8], spans: &[MatchSpan], num_lines: usize, context: usize) -> Vec<bool> {
    let mut marked = vec![false; num_lines];
    if num_lines == 0 {
        return marked;
    }

    let newlines: Vec<usize> = text
        .iter()
        .enumerate()
        .filter_map(|(i, &b)| (b == b'\n').then_some(i))
        .collect();
    // number of newlines before `pos`
    let line_of = |pos: usize| newlines.partition_point(|&n| n < pos).min(num_lines - 1);

    for span in spans {
        let first = line_of(span.start);
        let last = if span.end > span.start {
            line_of(span.end - 1)
        } else {
            first
        };
        let from = first.saturating_sub(context);
        let to = last.saturating_add(context).min(num_lines - 1);
        for flag in &mut marked[from..=to] {
            *flag = true;
        }
    }
    marked
}
