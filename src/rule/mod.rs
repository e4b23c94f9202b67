//! Compiled `LHS=RHS` substitution rules.

pub mod escape;
pub mod template;

pub use escape::{Decoded, EscapeIssue, decode_escapes, expand_unprintable};
pub use template::Template;

use crate::error::{Result, StreplaceError};
use regex::bytes::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use tracing::{error, warn};

/// Options that control how rule text is compiled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleOptions {
    /// Separates the left from the right side, `=` by default.
    pub separator: String,
    /// Introduces placeholders in the right side, `$` by default.
    pub placeholder: String,
    /// Match the left side as a plain string instead of a regex.
    pub literal: bool,
    pub ignore_case: bool,
}

impl Default for RuleOptions {
    fn default() -> Self {
        Self {
            separator: "=".to_string(),
            placeholder: "$".to_string(),
            literal: false,
            ignore_case: false,
        }
    }
}

impl RuleOptions {
    /// Creates options with the default separator and placeholder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the rule separator.
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Sets the placeholder marker.
    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    /// Matches the left side literally.
    pub fn literal(mut self) -> Self {
        self.literal = true;
        self
    }

    /// Matches case-insensitively.
    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }
}

/// One compiled substitution rule.
#[derive(Debug, Clone)]
pub struct Rule {
    text: String,
    lhs: Vec<u8>,
    pattern: Regex,
    template: Template,
    match_count: u64,
}

impl Rule {
    /// Compiles rule text such as `IMG([0-9]+)\.jpeg=pic$1.jpg`.
    ///
    /// The separator must occur exactly once. The right side is always
    /// escape-decoded; the left side is escape-decoded in literal mode and
    /// handed to the regex engine verbatim otherwise.
    pub fn compile(text: &str, options: &RuleOptions) -> Result<Self> {
        let separator = options.separator.as_str();
        let malformed = |reason: &str| StreplaceError::MalformedRule {
            rule: text.to_string(),
            separator: separator.to_string(),
            reason: reason.to_string(),
        };

        if separator.is_empty() {
            return Err(malformed("can't be split by an empty separator"));
        }
        match text.matches(separator).count() {
            0 => return Err(malformed("is not a rule")),
            1 => {}
            _ => return Err(malformed("is ambiguous, pick a unique separator")),
        }
        let Some((lhs_text, rhs_text)) = text.split_once(separator) else {
            return Err(malformed("is not a rule"));
        };

        let (lhs, pattern_text) = if options.literal {
            let lhs = decode_reporting(text, lhs_text);
            let pattern = escape_literal(&lhs);
            (lhs, pattern)
        } else {
            (lhs_text.as_bytes().to_vec(), lhs_text.to_string())
        };
        if lhs.is_empty() {
            return Err(StreplaceError::EmptyPattern {
                rule: text.to_string(),
            });
        }

        let pattern = RegexBuilder::new(&pattern_text)
            .case_insensitive(options.ignore_case)
            .unicode(!options.literal)
            .octal(true)
            .build()?;

        let rhs = decode_reporting(text, rhs_text);
        let template = Template::parse(&rhs, options.placeholder.as_bytes());

        Ok(Self {
            text: text.to_string(),
            lhs,
            pattern,
            template,
            match_count: 0,
        })
    }

    /// Returns the rule text as given on the command line.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the compiled left side.
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// Returns the parsed right side.
    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Returns the number of accepted substitutions so far.
    pub fn match_count(&self) -> u64 {
        self.match_count
    }

    pub(crate) fn record_matches(&mut self, n: u64) {
        self.match_count += n;
    }

    /// Returns true if the right side contains ASCII control characters.
    pub fn has_control_chars(&self) -> bool {
        self.template.as_bytes().iter().any(|b| b.is_ascii_control())
    }

    /// Describes the rule as `'LHS' ==> 'RHS'` with unprintables expanded.
    pub fn describe(&self) -> String {
        format!(
            "'{}' ==> '{}'",
            expand_unprintable(&self.lhs),
            expand_unprintable(self.template.as_bytes())
        )
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

fn decode_reporting(rule: &str, side: &str) -> Vec<u8> {
    let decoded = decode_escapes(side);
    for issue in &decoded.issues {
        if issue.is_error() {
            error!(rule, "{issue}");
        } else {
            warn!(rule, "{issue}");
        }
    }
    decoded.bytes
}

/// Escapes bytes so they match literally in a non-Unicode byte regex.
pub fn escape_literal(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        if b"\\.+*?()|[]{}^$#&-~".contains(&b) {
            out.push('\\');
            out.push(b as char);
        } else if b.is_ascii_graphic() || b == b' ' {
            out.push(b as char);
        } else {
            let _ = write!(out, "\\x{b:02X}");
        }
    }
    out
}
