//! # streplace
//!
//! Rule-driven substitution in file contents, file and directory names, and
//! symbolic link targets.
//!
//! A run is described by a [`Config`](config::Config) and a list of rules of
//! the form `LHS=RHS`. The left side is a regular expression (or a plain
//! string in literal mode), the right side a template that may refer to the
//! whole match (`$&`) and capture groups (`$1` to `$9`).
//!
//! This crate provides:
//! - Rule compilation with C-style escape decoding
//! - A substitution engine that runs rules as a pipeline, with optional
//!   whole-word matching
//! - A tree walker that renames entries, rewrites files and relinks
//!   symlinks, with a dummy mode that performs every decision but writes
//!   nothing
//! - A preview renderer that highlights replacements in context
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use streplace::prelude::*;
//!
//! // Rename IMG0042.jpeg to pic0042.jpg below ./photos, without touching disk
//! let config = Config::new().recursive().mode(Mode::RenameOnly).dummy();
//! let mut set = RuleSetBuilder::new(&config)
//!     .build(&[r"IMG([0-9]+)\.jpeg=pic$1.jpg", "photos"])?;
//!
//! let mut walker = Walker::new(&config, &mut set.rules, ConsoleReporter::new(1));
//! for path in &set.paths {
//!     walker.process(path)?;
//! }
//! println!("{}", walker.statistics());
//! # Ok::<(), streplace::error::StreplaceError>(())
//! ```
//!
//! ## Rewriting Buffers
//!
//! ```rust
//! use streplace::prelude::*;
//!
//! let options = RuleOptions::new();
//! let mut rules = vec![
//!     Rule::compile("a=b", &options)?,
//!     Rule::compile("b=c", &options)?,
//! ];
//! let sub = Engine::new(false).apply_all(&mut rules, b"a");
//! assert_eq!(sub.output, b"c");
//! # Ok::<(), streplace::error::StreplaceError>(())
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod fsio;
pub mod preview;
pub mod rule;
pub mod ruleset;
pub mod walker;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::{Config, ContextLines, Mode, RenderStyle};
    pub use crate::engine::{Engine, MatchSpan, Substitution};
    pub use crate::error::{Result, StreplaceError};
    pub use crate::fsio::{DirectoryEntry, EntryType, FsOp};
    pub use crate::preview::Preview;
    pub use crate::rule::{Rule, RuleOptions, Template};
    pub use crate::ruleset::{RuleSet, RuleSetBuilder};
    pub use crate::walker::{
        ConsoleReporter, Event, RecordingReporter, Reporter, Statistics, Walker,
    };
}

pub use prelude::*;
