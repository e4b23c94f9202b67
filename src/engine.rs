//! The substitution engine: applies an ordered rule list to a byte buffer.

use crate::rule::Rule;
use regex::bytes::{Captures, Regex};
use serde::Serialize;
use tracing::trace;

/// Location of one accepted substitution in the rewritten buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
}

impl MatchSpan {
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// The outcome of running all rules over one buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitution {
    pub output: Vec<u8>,
    pub total_matches: u64,
    /// Accepted matches per rule, in rule order.
    pub per_rule: Vec<u64>,
    /// Sorted spans of all replacement texts within `output`.
    pub spans: Vec<MatchSpan>,
}

impl Substitution {
    /// Returns true if at least one substitution was made.
    pub fn matched(&self) -> bool {
        self.total_matches > 0
    }
}

/// One replaced region: `start..end` in the input, `new_start..new_end` in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Edit {
    start: usize,
    end: usize,
    new_start: usize,
    new_end: usize,
}

/// Applies rules sequentially; each rule sees the previous rule's output.
#[derive(Debug, Clone, Copy, Default)]
pub struct Engine {
    whole_words: bool,
}

impl Engine {
    pub fn new(whole_words: bool) -> Self {
        Self { whole_words }
    }

    /// Runs every rule in order over `input`.
    ///
    /// Match counters of the rules are advanced by the number of accepted
    /// matches. Running the same rules twice over the same input yields the
    /// same output.
    pub fn apply_all(&self, rules: &mut [Rule], input: &[u8]) -> Substitution {
        let mut buffer = input.to_vec();
        let mut spans: Vec<MatchSpan> = Vec::new();
        let mut per_rule = Vec::with_capacity(rules.len());
        let mut total = 0;

        for rule in rules.iter_mut() {
            let whole_words = self.whole_words;
            let template = rule.template();
            let (output, edits) = replace_matches(rule.pattern(), &buffer, |haystack, caps| {
                let m = caps.get(0)?;
                if whole_words && !is_whole_word(haystack, m.start(), m.end()) {
                    return None;
                }
                let mut replacement = Vec::new();
                template.expand(caps, &mut replacement);
                Some(replacement)
            });

            let n = edits.len() as u64;
            trace!(rule = rule.text(), matches = n, "rule applied");
            rule.record_matches(n);
            per_rule.push(n);
            total += n;

            if edits.is_empty() {
                continue;
            }
            for span in &mut spans {
                span.start = remap(&edits, span.start, false);
                span.end = remap(&edits, span.end, true);
            }
            spans.extend(edits.iter().map(|e| MatchSpan {
                start: e.new_start,
                end: e.new_end,
            }));
            buffer = output;
        }

        spans.sort();
        Substitution {
            output: buffer,
            total_matches: total,
            per_rule,
            spans,
        }
    }
}

/// Replaces every non-overlapping leftmost match for which `replace` returns
/// replacement text. Matches it declines are kept verbatim.
fn replace_matches<F>(pattern: &Regex, haystack: &[u8], mut replace: F) -> (Vec<u8>, Vec<Edit>)
where
    F: FnMut(&[u8], &Captures<'_>) -> Option<Vec<u8>>,
{
    let mut out = Vec::with_capacity(haystack.len());
    let mut edits = Vec::new();
    let mut last = 0;

    for caps in pattern.captures_iter(haystack) {
        let Some(m) = caps.get(0) else { continue };
        let Some(replacement) = replace(haystack, &caps) else {
            continue;
        };
        out.extend_from_slice(&haystack[last..m.start()]);
        let new_start = out.len();
        out.extend_from_slice(&replacement);
        edits.push(Edit {
            start: m.start(),
            end: m.end(),
            new_start,
            new_end: out.len(),
        });
        last = m.end();
    }

    if edits.is_empty() {
        return (Vec::new(), edits);
    }
    out.extend_from_slice(&haystack[last..]);
    (out, edits)
}

/// Maps a position in a rule's input to the same position in its output.
fn remap(edits: &[Edit], pos: usize, is_end: bool) -> usize {
    let mut delta: isize = 0;
    for e in edits {
        if pos >= e.end {
            delta = e.new_end as isize - e.end as isize;
        } else if pos <= e.start {
            break;
        } else {
            // inside a region a later rule replaced
            return if is_end { e.new_end } else { e.new_start };
        }
    }
    (pos as isize + delta) as usize
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// A match is a whole word unless a word character on its edge touches
/// another word character just outside of it.
pub fn is_whole_word(haystack: &[u8], start: usize, end: usize) -> bool {
    if start == end {
        return true;
    }
    let touches_before =
        start > 0 && is_word_byte(haystack[start]) && is_word_byte(haystack[start - 1]);
    let touches_after =
        end < haystack.len() && is_word_byte(haystack[end - 1]) && is_word_byte(haystack[end]);
    !(touches_before || touches_after)
}
