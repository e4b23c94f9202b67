//! Per-entry events and where they go.

use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;

/// Something the walker did, or would do in dummy mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A regular file was read and run through the rules.
    Scanned { path: PathBuf, matches: u64 },
    EnteredDirectory { path: PathBuf },
    Renamed { from: PathBuf, to: PathBuf },
    Relinked {
        link: PathBuf,
        from: PathBuf,
        to: PathBuf,
    },
    Ignored { path: PathBuf, kind: &'static str },
    /// A rename was skipped because the destination exists.
    RenameClash { from: PathBuf, to: PathBuf },
    /// An entry failed and was skipped (`--ignore-errors`).
    Failed { path: PathBuf, message: String },
}

impl Event {
    /// The verbosity level from which this event is shown.
    pub fn min_verbosity(&self) -> u8 {
        match self {
            Event::Scanned { matches, .. } if *matches > 0 => 1,
            Event::Renamed { .. }
            | Event::Relinked { .. }
            | Event::RenameClash { .. }
            | Event::Failed { .. } => 1,
            Event::Scanned { .. } | Event::EnteredDirectory { .. } | Event::Ignored { .. } => 2,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Scanned { path, matches: 0 } => write!(f, "Processing {}", path.display()),
            Event::Scanned { path, matches } => {
                write!(f, "Processing {} ({matches})", path.display())
            }
            Event::EnteredDirectory { path } => write!(f, "Processing dir  {}", path.display()),
            Event::Renamed { from, to } => {
                write!(f, "Renaming '{}' as '{}'", from.display(), to.display())
            }
            Event::Relinked { link, from, to } => write!(
                f,
                "Changing symlink '{}' from '{}' to '{}'",
                link.display(),
                from.display(),
                to.display()
            ),
            Event::Ignored { path, kind } => write!(f, "Ignoring {kind} '{}'", path.display()),
            Event::RenameClash { from, to } => write!(
                f,
                "Name clash while renaming '{}' as '{}', not renamed",
                from.display(),
                to.display()
            ),
            Event::Failed { path, message } => {
                write!(f, "Skipping '{}': {message}", path.display())
            }
        }
    }
}

/// Receives walker events and rendered previews.
pub trait Reporter {
    fn event(&mut self, event: Event);

    fn preview(&mut self, report: &[u8]) -> io::Result<()>;
}

impl<R: Reporter + ?Sized> Reporter for &mut R {
    fn event(&mut self, event: Event) {
        (**self).event(event);
    }

    fn preview(&mut self, report: &[u8]) -> io::Result<()> {
        (**self).preview(report)
    }
}

/// Prints events filtered by verbosity, on stdout unless another writer
/// is given.
///
/// Failed event writes (a closed pipe, say) are dropped; the walk goes on.
#[derive(Debug)]
pub struct ConsoleReporter<W: Write = io::Stdout> {
    verbosity: u8,
    out: W,
}

impl ConsoleReporter {
    pub fn new(verbosity: u8) -> Self {
        Self::with_writer(verbosity, io::stdout())
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn with_writer(verbosity: u8, out: W) -> Self {
        Self { verbosity, out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn event(&mut self, event: Event) {
        if self.verbosity >= event.min_verbosity() {
            let _ = writeln!(self.out, "{event}");
        }
    }

    fn preview(&mut self, report: &[u8]) -> io::Result<()> {
        self.out.write_all(report)?;
        self.out.flush()
    }
}

/// Keeps everything in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingReporter {
    pub events: Vec<Event>,
    pub previews: Vec<Vec<u8>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the events visible at the given verbosity.
    pub fn visible(&self, verbosity: u8) -> impl Iterator<Item = &Event> {
        self.events
            .iter()
            .filter(move |e| verbosity >= e.min_verbosity())
    }
}

impl Reporter for RecordingReporter {
    fn event(&mut self, event: Event) {
        self.events.push(event);
    }

    fn preview(&mut self, report: &[u8]) -> io::Result<()> {
        self.previews.push(report.to_vec());
        Ok(())
    }
}
