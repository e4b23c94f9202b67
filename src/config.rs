//! Run configuration.

use crate::error::{Result, StreplaceError};
use crate::rule::RuleOptions;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// File name extensions selected by `--html-only`.
pub const HTML_EXTENSIONS: &[&str] = &["html", "htm", "shtml", "dhtml"];

/// File name extensions selected by `--c-only`.
pub const C_EXTENSIONS: &[&str] = &[
    "c", "cc", "C", "cxx", "cpp", "h", "hh", "H", "hxx", "hpp", "i", "inc", "m", "mm", "M",
];

/// What a run is allowed to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Rewrite file contents only.
    #[default]
    Content,
    /// Rename files and directories, leave contents alone.
    RenameOnly,
    /// Rename files and directories and rewrite contents.
    RenameAndContent,
    /// Rewrite the targets of symbolic links, nothing else.
    Symlinks,
}

impl Mode {
    /// Picks the mode from the three mutually exclusive command line flags.
    pub fn from_flags(rename: bool, rename_only: bool, symlinks: bool) -> Result<Self> {
        match (rename, rename_only, symlinks) {
            (false, false, false) => Ok(Mode::Content),
            (true, false, false) => Ok(Mode::RenameAndContent),
            (false, true, false) => Ok(Mode::RenameOnly),
            (false, false, true) => Ok(Mode::Symlinks),
            _ => Err(StreplaceError::ConflictingModes(
                "--rename, --rename-only and --modify-symlinks make no sense together".into(),
            )),
        }
    }

    pub fn renames(self) -> bool {
        matches!(self, Mode::RenameOnly | Mode::RenameAndContent)
    }

    pub fn modifies_content(self) -> bool {
        matches!(self, Mode::Content | Mode::RenameAndContent)
    }

    pub fn modifies_symlinks(self) -> bool {
        matches!(self, Mode::Symlinks)
    }
}

/// How much surrounding text a preview shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContextLines {
    /// Print the whole rewritten file.
    WholeFile,
    /// Print matching lines plus `count` lines around each of them.
    Lines { count: usize, hide_separators: bool },
}

impl Default for ContextLines {
    fn default() -> Self {
        ContextLines::Lines {
            count: 1,
            hide_separators: false,
        }
    }
}

impl FromStr for ContextLines {
    type Err = String;

    /// Parses `-1`, `N` or `+N`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s == "-1" {
            return Ok(ContextLines::WholeFile);
        }
        let (digits, hide_separators) = match s.strip_prefix('+') {
            Some(rest) => (rest, true),
            None => (s, false),
        };
        let count = digits
            .parse::<usize>()
            .map_err(|_| format!("invalid context '{s}' (expected -1, N or +N)"))?;
        Ok(ContextLines::Lines {
            count,
            hide_separators,
        })
    }
}

/// Escape sequences used to highlight preview output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderStyle {
    pub bold: String,
    pub thin: String,
    pub normal: String,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            bold: "\x1b[01m".to_string(),
            thin: "\x1b[07m".to_string(),
            normal: "\x1b[00m".to_string(),
        }
    }
}

impl RenderStyle {
    /// A style without any escape sequences.
    pub fn plain() -> Self {
        Self {
            bold: String::new(),
            thin: String::new(),
            normal: String::new(),
        }
    }
}

/// Configuration for one streplace run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub recursive: bool,
    pub follow_symlinks: bool,
    /// Also descend into `.git` directories.
    pub all: bool,
    pub ignore_case: bool,
    /// Match left sides as plain strings.
    pub literal: bool,
    pub whole_words: bool,
    pub separator: String,
    pub placeholder: String,
    pub mode: Mode,
    pub dummy: bool,
    pub preview: bool,
    pub context: ContextLines,
    pub verbosity: u8,
    /// Only rewrite files with one of these extensions (empty = all).
    pub extensions: Vec<String>,
    pub ignore_errors: bool,
    /// Replace existing entries on rename, allow control chars in names.
    pub force: bool,
    /// Skip files larger than this many bytes.
    pub max_file_size: Option<u64>,
    pub style: RenderStyle,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            recursive: false,
            follow_symlinks: false,
            all: false,
            ignore_case: false,
            literal: false,
            whole_words: false,
            separator: "=".to_string(),
            placeholder: "$".to_string(),
            mode: Mode::Content,
            dummy: false,
            preview: false,
            context: ContextLines::default(),
            verbosity: 0,
            extensions: Vec::new(),
            ignore_errors: false,
            force: false,
            max_file_size: None,
            style: RenderStyle::default(),
        }
    }
}

impl Config {
    /// Creates a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recursive(mut self) -> Self {
        self.recursive = true;
        self
    }

    pub fn follow_symlinks(mut self) -> Self {
        self.follow_symlinks = true;
        self
    }

    /// Processes `.git` directories too.
    pub fn all(mut self) -> Self {
        self.all = true;
        self
    }

    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    /// Matches left sides as plain strings instead of regexes.
    pub fn literal(mut self) -> Self {
        self.literal = true;
        self
    }

    pub fn whole_words(mut self) -> Self {
        self.whole_words = true;
        self
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Runs all decision logic without touching the filesystem.
    pub fn dummy(mut self) -> Self {
        self.dummy = true;
        self
    }

    /// Renders previews of changed files; implies dummy mode.
    pub fn preview(mut self) -> Self {
        self.preview = true;
        self.dummy = true;
        self
    }

    pub fn context(mut self, context: ContextLines) -> Self {
        self.context = context;
        self
    }

    pub fn verbosity(mut self, level: u8) -> Self {
        self.verbosity = level;
        self
    }

    /// Restricts content rewriting to files with these extensions.
    pub fn only_extensions(mut self, exts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extensions.extend(exts.into_iter().map(Into::into));
        self
    }

    pub fn ignore_errors(mut self) -> Self {
        self.ignore_errors = true;
        self
    }

    pub fn force(mut self) -> Self {
        self.force = true;
        self
    }

    /// Skips files larger than `mb` megabytes; 0 means unlimited.
    pub fn max_file_size_mb(mut self, mb: u64) -> Self {
        self.max_file_size = (mb > 0).then(|| mb.saturating_mul(1 << 20));
        self
    }

    pub fn style(mut self, style: RenderStyle) -> Self {
        self.style = style;
        self
    }

    /// Returns the options used to compile rules for this run.
    pub fn rule_options(&self) -> RuleOptions {
        RuleOptions {
            separator: self.separator.clone(),
            placeholder: self.placeholder.clone(),
            literal: self.literal,
            ignore_case: self.ignore_case,
        }
    }

    /// Returns true if a file with this extension may be rewritten.
    pub fn accepts_extension(&self, ext: Option<&str>) -> bool {
        self.extensions.is_empty()
            || ext.is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }
}
