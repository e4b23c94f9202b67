//! Splits positional arguments into rules and paths.

use crate::config::Config;
use crate::error::{Result, StreplaceError};
use crate::fsio::entry_exists;
use crate::rule::Rule;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The path argument that selects the stdin/stdout filter.
pub const STDIN_PATH: &str = "-";

/// Compiled rules plus the paths to process, in command line order.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub rules: Vec<Rule>,
    pub paths: Vec<PathBuf>,
}

impl RuleSet {
    /// Returns true if the only path is `-`.
    pub fn is_stdin_filter(&self) -> bool {
        matches!(self.paths.as_slice(), [only] if only == Path::new(STDIN_PATH))
    }
}

/// Builds a [`RuleSet`] from raw positional arguments.
///
/// Until a literal `--` is seen, every argument containing the rule
/// separator is a rule. Everything else must be `-` or name an existing
/// filesystem entry.
#[derive(Debug)]
pub struct RuleSetBuilder<'a> {
    config: &'a Config,
}

impl<'a> RuleSetBuilder<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    pub fn build<S: AsRef<str>>(&self, args: &[S]) -> Result<RuleSet> {
        let options = self.config.rule_options();
        let mut rules = Vec::new();
        let mut paths = Vec::new();
        let mut allow_rules = true;

        for arg in args.iter().map(AsRef::as_ref) {
            if arg.is_empty() {
                warn!("ignoring empty argument");
                continue;
            }
            let is_rule = !options.separator.is_empty() && arg.contains(options.separator.as_str());
            if allow_rules && arg == "--" {
                allow_rules = false;
            } else if allow_rules && is_rule {
                let rule = Rule::compile(arg, &options)?;
                debug!(rule = arg, "compiled rule");
                rules.push(rule);
            } else if arg == STDIN_PATH || entry_exists(Path::new(arg)) {
                paths.push(PathBuf::from(arg));
            } else {
                return Err(StreplaceError::PathNotFound(PathBuf::from(arg)));
            }
        }

        if rules.is_empty() {
            return Err(StreplaceError::NoRules);
        }
        if self.config.mode.renames() && !self.config.force {
            if let Some(rule) = rules.iter().find(|r| r.has_control_chars()) {
                return Err(StreplaceError::ControlCharsInName {
                    rule: rule.text().to_string(),
                });
            }
        }
        Ok(RuleSet { rules, paths })
    }
}
