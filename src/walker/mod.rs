//! The tree walker: decides per entry whether to rename it, rewrite its
//! contents or link target, or descend into it.
//!
//! Every decision is made the same way in dummy mode; only the
//! [`FsOp`]s are not executed. A rename in real mode moves the entry
//! handle to the new name before anything else touches the entry, so the
//! content pass and the recursion see the renamed path.
//!
//! ```rust,no_run
//! use streplace::prelude::*;
//!
//! let config = Config::new().recursive().dummy();
//! let mut rules = vec![Rule::compile("foo=bar", &config.rule_options())?];
//! let mut walker = Walker::new(&config, &mut rules, ConsoleReporter::new(1));
//! walker.process("src".as_ref())?;
//! println!("{}", walker.statistics());
//! # Ok::<(), streplace::error::StreplaceError>(())
//! ```

pub mod report;
pub mod stats;

pub use report::{ConsoleReporter, Event, RecordingReporter, Reporter};
pub use stats::Statistics;

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{Result, StreplaceError};
use crate::fsio::{
    DirectoryEntry, EntryType, FsOp, OtherKind, entry_exists, file_size, list_directory, os_bytes,
    os_string_from_bytes, read_symlink_target, read_whole_file,
};
use crate::preview::Preview;
use crate::rule::Rule;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Walks one or more paths, applying a rule set according to a [`Config`].
pub struct Walker<'a, R: Reporter> {
    config: &'a Config,
    rules: &'a mut [Rule],
    engine: Engine,
    reporter: R,
    stats: Statistics,
}

impl<'a, R: Reporter> Walker<'a, R> {
    pub fn new(config: &'a Config, rules: &'a mut [Rule], reporter: R) -> Self {
        Self {
            config,
            rules,
            engine: Engine::new(config.whole_words),
            reporter,
            stats: Statistics::default(),
        }
    }

    /// Processes one top-level path and everything below it.
    ///
    /// I/O failures abort the walk unless `ignore_errors` is set, in which
    /// case the failing entry is counted and skipped.
    pub fn process(&mut self, path: &Path) -> Result<()> {
        self.process_entry(DirectoryEntry::new(path))
    }

    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    /// Consumes the walker, returning its statistics and reporter.
    pub fn into_parts(self) -> (Statistics, R) {
        (self.stats, self.reporter)
    }

    fn process_entry(&mut self, mut entry: DirectoryEntry) -> Result<()> {
        match self.visit(&mut entry) {
            Err(e) if self.config.ignore_errors && e.is_io() => {
                warn!(path = %entry.path().display(), "{e}");
                self.stats.errors += 1;
                self.reporter.event(Event::Failed {
                    path: entry.path().to_path_buf(),
                    message: e.to_string(),
                });
                Ok(())
            }
            result => result,
        }
    }

    fn visit(&mut self, entry: &mut DirectoryEntry) -> Result<()> {
        let entry_type = entry.entry_type(self.config.follow_symlinks);
        debug!(path = %entry.path().display(), kind = entry_type.describe(), "visiting");

        // skipped directories are neither renamed nor entered
        if entry_type == EntryType::Directory && self.skips_directory(entry.path()) {
            self.ignore(entry.path(), "directory");
            return Ok(());
        }

        let exists = entry_type != EntryType::Other(OtherKind::NonExisting);
        if self.config.mode.renames() && exists {
            self.rename(entry, entry_type)?;
        }

        let path = entry.path();
        match entry_type {
            EntryType::Symlink => self.process_symlink(path),
            EntryType::Regular => self.process_file(path),
            EntryType::Directory => self.process_directory(path),
            EntryType::Other(_) => {
                self.ignore(path, entry_type.describe());
                Ok(())
            }
        }
    }

    fn rename(&mut self, entry: &mut DirectoryEntry, entry_type: EntryType) -> Result<()> {
        let Some(old_name) = entry.path().file_name().map(OsStr::to_os_string) else {
            return Ok(());
        };
        let old_bytes = os_bytes(&old_name);
        let sub = self.engine.apply_all(self.rules, &old_bytes);
        if !sub.matched() || sub.output == *old_bytes {
            return Ok(());
        }

        let from = entry.path().to_path_buf();
        let invalid = sub.output.is_empty()
            || sub.output.contains(&b'/')
            || sub.output == b"."
            || sub.output == b"..";
        if invalid {
            warn!(
                path = %from.display(),
                "not renaming: '{}' is not a valid file name",
                String::from_utf8_lossy(&sub.output)
            );
            return Ok(());
        }
        let to = from.with_file_name(os_string_from_bytes(sub.output));

        if entry_exists(&to) && !self.config.force {
            warn!(from = %from.display(), to = %to.display(), "name clash, not renamed");
            self.stats.rename_clashes += 1;
            self.reporter.event(Event::RenameClash { from, to });
            return Ok(());
        }

        let op = FsOp::Rename {
            from: from.clone(),
            to: to.clone(),
        };
        if self.perform(op)? {
            entry.set_path(to.clone());
        }

        match entry_type {
            EntryType::Directory => self.stats.dirs_renamed += 1,
            _ => self.stats.files_renamed += 1,
        }
        self.reporter.event(Event::Renamed { from, to });
        Ok(())
    }

    fn process_symlink(&mut self, path: &Path) -> Result<()> {
        if !self.config.mode.modifies_symlinks() {
            self.ignore(path, "symlink");
            return Ok(());
        }
        self.stats.symlinks_processed += 1;

        let target = read_symlink_target(path)?;
        let old = os_bytes(target.as_os_str()).into_owned();
        let sub = self.engine.apply_all(self.rules, &old);
        debug!(path = %path.display(), matches = sub.total_matches, "symlink scanned");
        if !sub.matched() || sub.output == old {
            return Ok(());
        }
        if sub.output.is_empty() {
            warn!(path = %path.display(), "not changing symlink: new target is empty");
            return Ok(());
        }

        let new_target = PathBuf::from(os_string_from_bytes(sub.output));
        self.perform(FsOp::Relink {
            link: path.to_path_buf(),
            target: new_target.clone(),
        })?;

        self.stats.symlinks_modified += 1;
        self.reporter.event(Event::Relinked {
            link: path.to_path_buf(),
            from: target,
            to: new_target,
        });
        Ok(())
    }

    fn process_file(&mut self, path: &Path) -> Result<()> {
        if !self.config.mode.modifies_content() {
            self.ignore(path, "file");
            return Ok(());
        }
        let extension = path.extension().and_then(OsStr::to_str);
        if !self.config.accepts_extension(extension) {
            self.ignore(path, "file");
            return Ok(());
        }
        if let Some(limit) = self.config.max_file_size {
            let size = file_size(path)?;
            if size > limit {
                debug!(path = %path.display(), size, limit, "file too large");
                self.ignore(path, "large file");
                return Ok(());
            }
        }

        self.stats.files_processed += 1;
        let contents = read_whole_file(path)?;
        let sub = self.engine.apply_all(self.rules, &contents);
        self.reporter.event(Event::Scanned {
            path: path.to_path_buf(),
            matches: sub.total_matches,
        });
        if !sub.matched() {
            return Ok(());
        }

        if self.config.preview {
            let mut report = Vec::new();
            Preview::new(&self.config.style, self.config.context)
                .render(&mut report, &sub.output, &sub.spans, path)
                .map_err(|e| StreplaceError::io(path, e))?;
            self.reporter
                .preview(&report)
                .map_err(StreplaceError::IoUnknown)?;
        }

        self.perform(FsOp::Write {
            path: path.to_path_buf(),
            contents: sub.output,
        })?;
        self.stats.files_modified += 1;
        Ok(())
    }

    fn process_directory(&mut self, path: &Path) -> Result<()> {
        if !self.config.recursive {
            self.ignore(path, "directory");
            return Ok(());
        }
        self.stats.dirs_processed += 1;
        self.reporter.event(Event::EnteredDirectory {
            path: path.to_path_buf(),
        });

        // children may be renamed while we iterate
        let children = list_directory(path, self.config.follow_symlinks)?;
        for child in children {
            self.process_entry(child)?;
        }
        Ok(())
    }

    /// Executes `op` unless in dummy mode. Returns true if it was executed.
    fn perform(&self, op: FsOp) -> Result<bool> {
        if self.config.dummy {
            debug!(op = %op.describe(), "dummy mode, not executed");
            return Ok(false);
        }
        debug!(op = %op.describe(), "executing");
        op.execute()?;
        Ok(true)
    }

    fn skips_directory(&self, path: &Path) -> bool {
        !self.config.all && path.file_name().is_some_and(|name| name == ".git")
    }

    fn ignore(&mut self, path: &Path, kind: &'static str) {
        debug!(path = %path.display(), kind, "ignored");
        self.stats.ignored += 1;
        self.reporter.event(Event::Ignored {
            path: path.to_path_buf(),
            kind,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Mode, RenderStyle};
    use std::fs;
    use tempfile::TempDir;

    fn compile(config: &Config, texts: &[&str]) -> Vec<Rule> {
        texts
            .iter()
            .map(|t| Rule::compile(t, &config.rule_options()).unwrap())
            .collect()
    }

    fn run(config: &Config, texts: &[&str], path: &Path) -> (Statistics, RecordingReporter) {
        let mut rules = compile(config, texts);
        let mut walker = Walker::new(config, &mut rules, RecordingReporter::new());
        walker.process(path).unwrap();
        walker.into_parts()
    }

    fn scanned(reporter: &RecordingReporter) -> Vec<String> {
        reporter
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Scanned { path, .. } => {
                    Some(path.file_name().unwrap().to_string_lossy().into_owned())
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_rewrites_file_contents() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("t.txt");
        fs::write(&file, "foo baz foo\n").unwrap();

        let (stats, reporter) = run(&Config::new(), &["foo=bar"], &file);

        assert_eq!(fs::read_to_string(&file).unwrap(), "bar baz bar\n");
        assert_eq!(stats.files_processed, 1);
        assert_eq!(stats.files_modified, 1);
        assert_eq!(
            reporter.events,
            vec![Event::Scanned {
                path: file,
                matches: 2
            }]
        );
    }

    #[test]
    fn test_unmatched_file_is_processed_not_modified() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("t.txt");
        fs::write(&file, "nothing\n").unwrap();

        let (stats, _) = run(&Config::new(), &["foo=bar"], &file);
        assert_eq!(stats.files_processed, 1);
        assert_eq!(stats.files_modified, 0);
    }

    #[test]
    fn test_dummy_mode_writes_nothing_but_counts_the_same() {
        let make = || {
            let dir = TempDir::new().unwrap();
            fs::create_dir(dir.path().join("foo_dir")).unwrap();
            fs::write(dir.path().join("foo_dir/foo.txt"), "foo\n").unwrap();
            fs::write(dir.path().join("other.txt"), "foo foo\n").unwrap();
            dir
        };
        let config = Config::new().recursive().mode(Mode::RenameAndContent);

        let real_dir = make();
        let (real, _) = run(&config, &["foo=bar"], real_dir.path());

        let dummy_dir = make();
        let (dummy, _) = run(&config.clone().dummy(), &["foo=bar"], dummy_dir.path());

        assert_eq!(real, dummy);
        assert_eq!(real.files_modified, 2);
        assert_eq!(real.dirs_renamed, 1);
        assert_eq!(real.files_renamed, 1);

        assert!(real_dir.path().join("bar_dir/bar.txt").exists());
        assert!(dummy_dir.path().join("foo_dir/foo.txt").exists());
        assert!(!dummy_dir.path().join("bar_dir").exists());
        assert_eq!(
            fs::read_to_string(dummy_dir.path().join("other.txt")).unwrap(),
            "foo foo\n"
        );
    }

    #[test]
    fn test_rename_only_leaves_contents() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("foo.txt");
        fs::write(&file, "foo\n").unwrap();

        let config = Config::new().mode(Mode::RenameOnly);
        let (stats, _) = run(&config, &["foo=bar"], &file);

        let renamed = dir.path().join("bar.txt");
        assert!(!file.exists());
        assert_eq!(fs::read_to_string(renamed).unwrap(), "foo\n");
        assert_eq!(stats.files_renamed, 1);
        assert_eq!(stats.files_processed, 0);
        assert_eq!(stats.ignored, 1);
    }

    #[test]
    fn test_rename_and_content_rewrites_renamed_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("foo.txt");
        fs::write(&file, "foo\n").unwrap();

        let config = Config::new().mode(Mode::RenameAndContent);
        let (stats, reporter) = run(&config, &["foo=bar"], &file);

        assert_eq!(
            fs::read_to_string(dir.path().join("bar.txt")).unwrap(),
            "bar\n"
        );
        assert_eq!(stats.files_modified, 1);
        assert_eq!(scanned(&reporter), vec!["bar.txt"]);
    }

    #[test]
    fn test_renaming_a_child_does_not_disturb_siblings() {
        let dir = TempDir::new().unwrap();
        let work = dir.path().join("work");
        fs::create_dir(&work).unwrap();
        for name in ["f1.txt", "f2.txt", "f3.txt"] {
            fs::write(work.join(name), "x\n").unwrap();
        }

        // f1 -> f9 moves to the end of the directory order
        let config = Config::new().recursive().mode(Mode::RenameAndContent);
        let (stats, reporter) = run(&config, &["f1=f9"], &work);

        assert_eq!(scanned(&reporter), vec!["f9.txt", "f2.txt", "f3.txt"]);
        assert_eq!(stats.files_processed, 3);
        assert_eq!(stats.files_renamed, 1);
        assert!(work.join("f9.txt").exists());
        assert!(!work.join("f1.txt").exists());
    }

    #[test]
    fn test_recursion_into_renamed_directory() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("foo")).unwrap();
        fs::write(dir.path().join("foo/a.txt"), "foo\n").unwrap();

        let config = Config::new().recursive().mode(Mode::RenameAndContent);
        let (stats, _) = run(&config, &["foo=bar"], dir.path());

        assert_eq!(stats.dirs_renamed, 1);
        assert_eq!(stats.dirs_processed, 2);
        assert_eq!(
            fs::read_to_string(dir.path().join("bar/a.txt")).unwrap(),
            "bar\n"
        );
    }

    #[test]
    fn test_directory_without_recursion_is_ignored() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "foo\n").unwrap();

        let (stats, reporter) = run(&Config::new(), &["foo=bar"], dir.path());

        assert_eq!(stats.ignored, 1);
        assert_eq!(stats.files_processed, 0);
        assert!(matches!(
            reporter.events[0],
            Event::Ignored {
                kind: "directory",
                ..
            }
        ));
    }

    #[test]
    fn test_git_directories_are_skipped_unless_all() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git/config"), "foo\n").unwrap();

        let config = Config::new().recursive();
        let (stats, _) = run(&config, &["foo=bar"], dir.path());
        assert_eq!(stats.files_processed, 0);
        assert_eq!(stats.ignored, 1);
        assert_eq!(
            fs::read_to_string(dir.path().join(".git/config")).unwrap(),
            "foo\n"
        );

        let (stats, _) = run(&config.clone().all(), &["foo=bar"], dir.path());
        assert_eq!(stats.files_modified, 1);
    }

    #[test]
    fn test_git_directories_are_not_renamed() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("work");
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join(".git/config"), "[core] git\n").unwrap();

        let config = Config::new().recursive().mode(Mode::RenameAndContent);
        let (stats, _) = run(&config, &["git=hg"], &root);

        assert!(root.join(".git").is_dir());
        assert!(!root.join(".hg").exists());
        assert_eq!(
            fs::read_to_string(root.join(".git/config")).unwrap(),
            "[core] git\n"
        );
        assert_eq!(stats.dirs_renamed, 0);
        assert_eq!(stats.dirs_processed, 1);
        assert_eq!(stats.files_modified, 0);
        assert_eq!(stats.ignored, 1);

        let (stats, _) = run(&config.clone().all(), &["git=hg"], &root);
        assert_eq!(stats.dirs_renamed, 1);
        assert_eq!(
            fs::read_to_string(root.join(".hg/config")).unwrap(),
            "[core] hg\n"
        );
    }

    #[test]
    fn test_rename_clash_is_skipped() {
        let dir = TempDir::new().unwrap();
        let foo = dir.path().join("foo");
        let bar = dir.path().join("bar");
        fs::write(&foo, "1").unwrap();
        fs::write(&bar, "2").unwrap();

        let config = Config::new().mode(Mode::RenameOnly);
        let (stats, reporter) = run(&config, &["foo=bar"], &foo);

        assert_eq!(stats.rename_clashes, 1);
        assert_eq!(stats.files_renamed, 0);
        assert_eq!(fs::read_to_string(&foo).unwrap(), "1");
        assert_eq!(fs::read_to_string(&bar).unwrap(), "2");
        assert!(matches!(reporter.events[0], Event::RenameClash { .. }));
    }

    #[test]
    fn test_forced_rename_replaces_destination() {
        let dir = TempDir::new().unwrap();
        let foo = dir.path().join("foo");
        let bar = dir.path().join("bar");
        fs::write(&foo, "1").unwrap();
        fs::write(&bar, "2").unwrap();

        let config = Config::new().mode(Mode::RenameOnly).force();
        let (stats, _) = run(&config, &["foo=bar"], &foo);

        assert_eq!(stats.files_renamed, 1);
        assert!(!foo.exists());
        assert_eq!(fs::read_to_string(&bar).unwrap(), "1");
    }

    #[test]
    fn test_io_errors_abort_unless_ignored() {
        let dir = TempDir::new().unwrap();
        let foo = dir.path().join("foo");
        fs::write(&foo, "1").unwrap();
        // renaming a file over a non-empty directory fails
        fs::create_dir(dir.path().join("bar")).unwrap();
        fs::write(dir.path().join("bar/keep"), "x").unwrap();

        let config = Config::new().mode(Mode::RenameOnly).force();
        let mut rules = compile(&config, &["foo=bar"]);
        let mut walker = Walker::new(&config, &mut rules, RecordingReporter::new());
        let err = walker.process(&foo).unwrap_err();
        assert!(err.is_io());

        let config = config.ignore_errors();
        let (stats, reporter) = run(&config, &["foo=bar"], &foo);
        assert_eq!(stats.errors, 1);
        assert!(matches!(reporter.events.last(), Some(Event::Failed { .. })));
        assert!(foo.exists());
    }

    #[test]
    fn test_extension_filter() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "foo\n").unwrap();
        fs::write(dir.path().join("b.md"), "foo\n").unwrap();

        let config = Config::new().recursive().only_extensions(["txt"]);
        let (stats, _) = run(&config, &["foo=bar"], dir.path());

        assert_eq!(stats.files_modified, 1);
        assert_eq!(stats.ignored, 1);
        assert_eq!(
            fs::read_to_string(dir.path().join("b.md")).unwrap(),
            "foo\n"
        );
    }

    #[test]
    fn test_max_file_size() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("big.txt");
        fs::write(&file, "foo foo foo\n").unwrap();

        let mut config = Config::new();
        config.max_file_size = Some(4);
        let (stats, _) = run(&config, &["foo=bar"], &file);

        assert_eq!(stats.ignored, 1);
        assert_eq!(stats.files_processed, 0);
    }

    #[test]
    fn test_preview_reports_without_writing() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("t.txt");
        fs::write(&file, "one\nfoo\nthree\nfour\n").unwrap();

        let config = Config::new().preview().style(RenderStyle::plain());
        let (stats, reporter) = run(&config, &["foo=bar"], &file);

        assert_eq!(stats.files_modified, 1);
        assert_eq!(
            fs::read_to_string(&file).unwrap(),
            "one\nfoo\nthree\nfour\n"
        );
        assert_eq!(reporter.previews.len(), 1);
        let report = String::from_utf8(reporter.previews[0].clone()).unwrap();
        assert!(report.ends_with("--1--\none\nbar\nthree\n"));
    }

    #[test]
    fn test_nonexistent_entry_is_ignored() {
        let dir = TempDir::new().unwrap();
        let (stats, reporter) = run(&Config::new(), &["foo=bar"], &dir.path().join("missing"));
        assert_eq!(stats.ignored, 1);
        assert!(matches!(
            reporter.events[0],
            Event::Ignored {
                kind: "non-existing entry",
                ..
            }
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_targets() {
        let dir = TempDir::new().unwrap();
        let link = dir.path().join("link");
        fs::write(dir.path().join("foo.txt"), "foo\n").unwrap();
        std::os::unix::fs::symlink("foo.txt", &link).unwrap();

        let config = Config::new().recursive().mode(Mode::Symlinks);
        let (stats, _) = run(&config, &["foo=bar"], dir.path());

        assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("bar.txt"));
        assert_eq!(stats.symlinks_processed, 1);
        assert_eq!(stats.symlinks_modified, 1);
        // regular files are left alone in symlink mode
        assert_eq!(stats.ignored, 1);
        assert_eq!(
            fs::read_to_string(dir.path().join("foo.txt")).unwrap(),
            "foo\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_relink_leaves_files_named_like_temporaries() {
        let dir = TempDir::new().unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink("foo.txt", &link).unwrap();
        let user_file = dir.path().join("link.streplace~");
        fs::write(&user_file, "user data\n").unwrap();

        let config = Config::new().mode(Mode::Symlinks);
        let (stats, _) = run(&config, &["foo=bar"], &link);

        assert_eq!(stats.symlinks_modified, 1);
        assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("bar.txt"));
        assert_eq!(fs::read_to_string(&user_file).unwrap(), "user data\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_relink_is_not_counted_as_modified() {
        let dir = TempDir::new().unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink("foo.txt", &link).unwrap();

        // a target longer than PATH_MAX can't be linked to
        let rule = format!("foo={}", "x".repeat(8192));
        let config = Config::new().mode(Mode::Symlinks).ignore_errors();
        let (stats, reporter) = run(&config, &[rule.as_str()], &link);

        assert_eq!(stats.symlinks_processed, 1);
        assert_eq!(stats.symlinks_modified, 0);
        assert_eq!(stats.errors, 1);
        assert!(
            !reporter
                .events
                .iter()
                .any(|e| matches!(e, Event::Relinked { .. }))
        );
        assert!(matches!(reporter.events.last(), Some(Event::Failed { .. })));
        assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("foo.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_ignored_in_content_mode() {
        let dir = TempDir::new().unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink("foo.txt", &link).unwrap();

        let (stats, _) = run(&Config::new(), &["foo=bar"], &link);
        assert_eq!(stats.ignored, 1);
        assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("foo.txt"));
    }
}
