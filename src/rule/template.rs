//! Replacement templates with capture-group placeholders.

use regex::bytes::Captures;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(Vec<u8>),
    /// `$&`
    WholeMatch,
    /// `$0` .. `$9`
    Group(usize),
}

/// A parsed right-hand side.
///
/// The placeholder marker defaults to `$`. `$&` expands to the whole match,
/// `$1`..`$9` to capture groups and `$$` to a literal marker. Any other use
/// of the marker is plain text. Groups that did not participate in the
/// match, or do not exist at all, expand to nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    raw: Vec<u8>,
    pieces: Vec<Piece>,
}

impl Template {
    /// Parses a decoded right-hand side using the given placeholder marker.
    pub fn parse(raw: &[u8], marker: &[u8]) -> Self {
        let mut pieces = Vec::new();
        let mut literal = Vec::new();
        let mut i = 0;

        while i < raw.len() {
            if marker.is_empty() || !raw[i..].starts_with(marker) {
                literal.push(raw[i]);
                i += 1;
                continue;
            }

            let after = i + marker.len();
            let piece = match raw.get(after) {
                Some(b'&') => Some((Piece::WholeMatch, 1)),
                Some(d @ b'0'..=b'9') => Some((Piece::Group(usize::from(d - b'0')), 1)),
                _ if raw[after..].starts_with(marker) => {
                    literal.extend_from_slice(marker);
                    i = after + marker.len();
                    continue;
                }
                _ => None,
            };

            match piece {
                Some((piece, len)) => {
                    if !literal.is_empty() {
                        pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                    }
                    pieces.push(piece);
                    i = after + len;
                }
                None => {
                    literal.extend_from_slice(marker);
                    i = after;
                }
            }
        }

        if !literal.is_empty() {
            pieces.push(Piece::Literal(literal));
        }

        Self {
            raw: raw.to_vec(),
            pieces,
        }
    }

    /// Appends the expansion of this template for one match to `out`.
    pub fn expand(&self, caps: &Captures<'_>, out: &mut Vec<u8>) {
        for piece in &self.pieces {
            match piece {
                Piece::Literal(bytes) => out.extend_from_slice(bytes),
                Piece::WholeMatch => {
                    if let Some(m) = caps.get(0) {
                        out.extend_from_slice(m.as_bytes());
                    }
                }
                Piece::Group(n) => {
                    if let Some(m) = caps.get(*n) {
                        out.extend_from_slice(m.as_bytes());
                    }
                }
            }
        }
    }

    /// Returns the decoded right-hand side this template was parsed from.
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::bytes::Regex;

    fn expand(pattern: &str, template: &str, marker: &str, input: &str) -> String {
        let re = Regex::new(pattern).unwrap();
        let caps = re.captures(input.as_bytes()).unwrap();
        let mut out = Vec::new();
        Template::parse(template.as_bytes(), marker.as_bytes()).expand(&caps, &mut out);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_whole_match_and_groups() {
        assert_eq!(expand("IMG([0-9]+)", "pic$1", "$", "IMG0042"), "pic0042");
        assert_eq!(expand("a(b)(c)", "[$&|$2$1]", "$", "abc"), "[abc|cb]");
    }

    #[test]
    fn test_missing_group_expands_to_nothing() {
        assert_eq!(expand("a(b)?", "<$1$7>", "$", "a"), "<>");
    }

    #[test]
    fn test_double_marker_is_literal() {
        assert_eq!(expand("x", "$$1", "$", "x"), "$1");
    }

    #[test]
    fn test_unknown_placeholder_is_plain_text() {
        assert_eq!(expand("x", "$x$", "$", "x"), "$x$");
    }

    #[test]
    fn test_custom_marker() {
        assert_eq!(expand("id=([0-9]+)", "numSUB1", "SUB", "id=42"), "num42");
        assert_eq!(expand("id=([0-9]+)", "$SUB1", "SUB", "id=42"), "$42");
    }
}
