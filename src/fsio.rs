//! Filesystem primitives: entry classification, whole-file I/O and the
//! mutations the walker performs (write, rename, relink).

use crate::error::{Result, StreplaceError};
use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Kinds of entries that are never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtherKind {
    BlockDevice,
    CharDevice,
    Fifo,
    Socket,
    NonExisting,
    Unknown,
}

/// The type of a directory entry, classified once per visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    Regular,
    Directory,
    Symlink,
    Other(OtherKind),
}

impl EntryType {
    /// Classifies `path`, resolving symlinks only if `follow_symlinks` is set.
    pub fn classify(path: &Path, follow_symlinks: bool) -> Self {
        let metadata = if follow_symlinks {
            fs::metadata(path)
        } else {
            fs::symlink_metadata(path)
        };
        match metadata {
            Ok(metadata) => Self::from_file_type(metadata.file_type()),
            Err(_) => EntryType::Other(OtherKind::NonExisting),
        }
    }

    /// Maps a `std` file type onto an entry type.
    pub fn from_file_type(file_type: fs::FileType) -> Self {
        if file_type.is_symlink() {
            return EntryType::Symlink;
        }
        if file_type.is_file() {
            return EntryType::Regular;
        }
        if file_type.is_dir() {
            return EntryType::Directory;
        }
        EntryType::Other(special_kind(file_type))
    }

    /// Returns a short human readable name, e.g. "file" or "fifo".
    pub fn describe(&self) -> &'static str {
        match self {
            EntryType::Regular => "file",
            EntryType::Directory => "directory",
            EntryType::Symlink => "symlink",
            EntryType::Other(OtherKind::BlockDevice) => "block device",
            EntryType::Other(OtherKind::CharDevice) => "character device",
            EntryType::Other(OtherKind::Fifo) => "fifo",
            EntryType::Other(OtherKind::Socket) => "socket",
            EntryType::Other(OtherKind::NonExisting) => "non-existing entry",
            EntryType::Other(OtherKind::Unknown) => "unknown file type",
        }
    }
}

#[cfg(unix)]
fn special_kind(file_type: fs::FileType) -> OtherKind {
    use std::os::unix::fs::FileTypeExt;

    if file_type.is_block_device() {
        OtherKind::BlockDevice
    } else if file_type.is_char_device() {
        OtherKind::CharDevice
    } else if file_type.is_fifo() {
        OtherKind::Fifo
    } else if file_type.is_socket() {
        OtherKind::Socket
    } else {
        OtherKind::Unknown
    }
}

#[cfg(not(unix))]
fn special_kind(_file_type: fs::FileType) -> OtherKind {
    OtherKind::Unknown
}

/// A path plus its lazily resolved type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    path: PathBuf,
    entry_type: Option<EntryType>,
}

impl DirectoryEntry {
    /// Creates an entry whose type is probed on first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entry_type: None,
        }
    }

    /// Creates an entry with an already known type.
    pub fn with_type(path: impl Into<PathBuf>, entry_type: EntryType) -> Self {
        Self {
            path: path.into(),
            entry_type: Some(entry_type),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Points the entry at its new name after a rename. The type is kept.
    pub fn set_path(&mut self, path: PathBuf) {
        self.path = path;
    }

    /// Returns the entry type, classifying the path on first call.
    pub fn entry_type(&mut self, follow_symlinks: bool) -> EntryType {
        *self
            .entry_type
            .get_or_insert_with(|| EntryType::classify(&self.path, follow_symlinks))
    }
}

/// Lists the children of `dir` into an owned, name-sorted snapshot.
///
/// The snapshot stays valid while the children are renamed.
pub fn list_directory(dir: &Path, follow_symlinks: bool) -> Result<Vec<DirectoryEntry>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            StreplaceError::io(path, e.into())
        })?;
        let entry = if follow_symlinks && entry.path_is_symlink() {
            DirectoryEntry::new(entry.into_path())
        } else {
            let entry_type = EntryType::from_file_type(entry.file_type());
            DirectoryEntry::with_type(entry.into_path(), entry_type)
        };
        entries.push(entry);
    }
    Ok(entries)
}

/// Returns true if anything (including a dangling symlink) exists at `path`.
pub fn entry_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

pub fn read_whole_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| StreplaceError::io(path, e))
}

pub fn write_whole_file(path: &Path, contents: &[u8]) -> Result<()> {
    fs::write(path, contents).map_err(|e| StreplaceError::io(path, e))
}

/// Returns the size of the file at `path` in bytes.
pub fn file_size(path: &Path) -> Result<u64> {
    fs::metadata(path)
        .map(|metadata| metadata.len())
        .map_err(|e| StreplaceError::io(path, e))
}

pub fn read_symlink_target(path: &Path) -> Result<PathBuf> {
    fs::read_link(path).map_err(|e| StreplaceError::io(path, e))
}

/// Returns the raw bytes of an OS string.
#[cfg(unix)]
pub fn os_bytes(s: &OsStr) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(s.as_bytes())
}

#[cfg(not(unix))]
pub fn os_bytes(s: &OsStr) -> Cow<'_, [u8]> {
    match s.to_string_lossy() {
        Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
        Cow::Owned(s) => Cow::Owned(s.into_bytes()),
    }
}

/// Builds an OS string from raw bytes.
#[cfg(unix)]
pub fn os_string_from_bytes(bytes: Vec<u8>) -> OsString {
    use std::os::unix::ffi::OsStringExt;
    OsString::from_vec(bytes)
}

#[cfg(not(unix))]
pub fn os_string_from_bytes(bytes: Vec<u8>) -> OsString {
    OsString::from(String::from_utf8_lossy(&bytes).into_owned())
}

/// A filesystem mutation decided by the walker.
///
/// In dummy mode operations are only described, never executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsOp {
    Write { path: PathBuf, contents: Vec<u8> },
    Rename { from: PathBuf, to: PathBuf },
    Relink { link: PathBuf, target: PathBuf },
}

impl FsOp {
    /// Executes the operation.
    pub fn execute(&self) -> Result<()> {
        match self {
            FsOp::Write { path, contents } => write_whole_file(path, contents),
            FsOp::Rename { from, to } => fs::rename(from, to).map_err(|e| StreplaceError::io(from, e)),
            FsOp::Relink { link, target } => relink(link, target),
        }
    }

    /// Returns a description of the operation.
    pub fn describe(&self) -> String {
        match self {
            FsOp::Write { path, contents } => {
                format!("Write {} bytes to {}", contents.len(), path.display())
            }
            FsOp::Rename { from, to } => {
                format!("Rename {} -> {}", from.display(), to.display())
            }
            FsOp::Relink { link, target } => {
                format!("Relink {} -> {}", link.display(), target.display())
            }
        }
    }
}

/// How many temporary names `relink` tries before giving up.
#[cfg(unix)]
const RELINK_ATTEMPTS: u32 = 100;

/// Returns the `attempt`th temporary name for relinking `link`:
/// `<name>.streplace~`, then `<name>.streplace~1`, `<name>.streplace~2`, ...
#[cfg(unix)]
fn temp_link_path(link: &Path, attempt: u32) -> PathBuf {
    let mut tmp_name = link.file_name().map(OsStr::to_os_string).unwrap_or_default();
    tmp_name.push(".streplace~");
    if attempt > 0 {
        tmp_name.push(attempt.to_string());
    }
    link.with_file_name(tmp_name)
}

/// Replaces the symlink at `link` so it points to `target`.
///
/// The new link is created under an unused temporary name next to the old
/// one and renamed over it, so the link never disappears. Existing entries
/// are never removed.
#[cfg(unix)]
fn relink(link: &Path, target: &Path) -> Result<()> {
    for attempt in 0..RELINK_ATTEMPTS {
        let tmp = temp_link_path(link, attempt);
        match std::os::unix::fs::symlink(target, &tmp) {
            Ok(()) => {
                return fs::rename(&tmp, link).map_err(|e| {
                    let _ = fs::remove_file(&tmp);
                    StreplaceError::io(link, e)
                });
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(StreplaceError::io(&tmp, e)),
        }
    }
    Err(StreplaceError::io(
        link,
        std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "no free temporary name for relinking",
        ),
    ))
}

#[cfg(not(unix))]
fn relink(link: &Path, _target: &Path) -> Result<()> {
    Err(StreplaceError::io(
        link,
        std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "modifying symlinks is only supported on unix",
        ),
    ))
}
