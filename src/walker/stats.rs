//! Run statistics.

use serde::Serialize;
use std::fmt;

/// Counters collected while walking; they only ever grow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub files_processed: u64,
    pub files_modified: u64,
    pub symlinks_processed: u64,
    pub symlinks_modified: u64,
    pub dirs_processed: u64,
    pub files_renamed: u64,
    pub dirs_renamed: u64,
    pub ignored: u64,
    pub rename_clashes: u64,
    /// Entries skipped because of I/O errors with `--ignore-errors`.
    pub errors: u64,
}

fn plural<'a>(n: u64, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 { one } else { many }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}/{} {} modified, {}/{} {} modified, {} {} processed, {} {} and {} {} renamed, {} {} ignored",
            self.files_modified,
            self.files_processed,
            plural(self.files_processed, "file", "files"),
            self.symlinks_modified,
            self.symlinks_processed,
            plural(self.symlinks_processed, "symlink", "symlinks"),
            self.dirs_processed,
            plural(self.dirs_processed, "dir", "dirs"),
            self.files_renamed,
            plural(self.files_renamed, "file", "files"),
            self.dirs_renamed,
            plural(self.dirs_renamed, "dir", "dirs"),
            self.ignored,
            plural(self.ignored, "entry", "entries"),
        )?;
        if self.rename_clashes > 0 {
            write!(f, ", {} rename {}", self.rename_clashes, plural(self.rename_clashes, "clash", "clashes"))?;
        }
        if self.errors > 0 {
            write!(f, ", {} {}", self.errors, plural(self.errors, "error", "errors"))?;
        }
        write!(f, ")")
    }
}
