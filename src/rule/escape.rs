//! C-style escape sequence decoding for rule sides and color markers.

use std::fmt::Write;

/// A recoverable problem found while decoding escape sequences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscapeIssue {
    /// `\q` and friends: kept verbatim, including the backslash.
    UnknownSequence(u8),
    /// `\x` not followed by a hex digit: kept verbatim.
    MissingHexDigits,
    /// A lone backslash at the very end: kept as a literal backslash.
    TrailingBackslash,
}

impl EscapeIssue {
    /// Returns true for issues reported as errors rather than warnings.
    pub fn is_error(&self) -> bool {
        matches!(self, EscapeIssue::TrailingBackslash)
    }
}

impl std::fmt::Display for EscapeIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EscapeIssue::UnknownSequence(c) => {
                write!(f, "unknown backslash sequence '\\{}'", expand_unprintable(&[*c]))
            }
            EscapeIssue::MissingHexDigits => write!(f, "non hex char following \\x"),
            EscapeIssue::TrailingBackslash => {
                write!(f, "unexpected end of string in escape sequence")
            }
        }
    }
}

/// Result of decoding a string with escape sequences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decoded {
    pub bytes: Vec<u8>,
    pub issues: Vec<EscapeIssue>,
}

/// Decodes `\a \b \f \n \r \t \v \\`, `\xH[H]` and `\N[N[N]]` (octal).
///
/// Decoding never fails: unknown sequences are passed through with their
/// backslash and reported in [`Decoded::issues`].
pub fn decode_escapes(s: &str) -> Decoded {
    let src = s.as_bytes();
    let mut out = Vec::with_capacity(src.len());
    let mut issues = Vec::new();
    let mut i = 0;

    while i < src.len() {
        let c = src[i];
        i += 1;
        if c != b'\\' {
            out.push(c);
            continue;
        }

        let Some(&e) = src.get(i) else {
            out.push(b'\\');
            issues.push(EscapeIssue::TrailingBackslash);
            break;
        };
        i += 1;

        match e {
            b'a' => out.push(0x07),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0c),
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'v' => out.push(0x0b),
            b'\\' => out.push(b'\\'),
            b'x' => {
                let digits = src[i..]
                    .iter()
                    .take(2)
                    .take_while(|b| b.is_ascii_hexdigit())
                    .count();
                if digits == 0 {
                    out.extend_from_slice(b"\\x");
                    issues.push(EscapeIssue::MissingHexDigits);
                } else {
                    let value = src[i..i + digits]
                        .iter()
                        .fold(0u32, |acc, b| acc * 16 + hex_value(*b));
                    out.push(value as u8);
                    i += digits;
                }
            }
            b'0'..=b'7' => {
                let more = src[i..]
                    .iter()
                    .take(2)
                    .take_while(|b| (b'0'..=b'7').contains(*b))
                    .count();
                let value = std::iter::once(&e)
                    .chain(&src[i..i + more])
                    .fold(0u32, |acc, b| acc * 8 + u32::from(b - b'0'));
                // \777 wraps like a C char
                out.push((value & 0xff) as u8);
                i += more;
            }
            other => {
                out.push(b'\\');
                out.push(other);
                issues.push(EscapeIssue::UnknownSequence(other));
            }
        }
    }

    Decoded { bytes: out, issues }
}

fn hex_value(b: u8) -> u32 {
    match b {
        b'0'..=b'9' => u32::from(b - b'0'),
        b'a'..=b'f' => u32::from(b - b'a' + 10),
        _ => u32::from(b - b'A' + 10),
    }
}

/// Renders bytes for display, turning unprintable bytes back into escapes.
pub fn expand_unprintable(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            0x07 => out.push_str("\\a"),
            0x08 => out.push_str("\\b"),
            0x0c => out.push_str("\\f"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x0b => out.push_str("\\v"),
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7e => out.push(b as char),
            _ => {
                let _ = write!(out, "\\x{b:02x}");
            }
        }
    }
    out
}
