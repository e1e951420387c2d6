use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::model::list::TaskList;
use crate::parse::parse_legacy;

/// Error type for loading and saving task lists
#[derive(Debug, thiserror::Error)]
pub enum ListIoError {
    #[error("could not {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        source: io::Error,
    },
    #[error("could not decode {format} list: {message}")]
    Decode {
        format: &'static str,
        message: String,
    },
    #[error("could not encode list: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ListIoError {
    fn io(action: &'static str, path: &Path) -> impl FnOnce(io::Error) -> ListIoError {
        let path = path.to_path_buf();
        move |source| ListIoError::Io {
            action,
            path,
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// Formats
// ---------------------------------------------------------------------------

/// A decoder for one on-disk representation. Blank input is an empty list.
pub trait ListFormat {
    fn name(&self) -> &'static str;
    fn decode(&self, reader: &mut dyn Read) -> Result<TaskList, ListIoError>;
}

/// The current JSON document. The only format that is ever written.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl JsonFormat {
    pub fn encode(&self, list: &TaskList, writer: &mut dyn Write) -> Result<(), ListIoError> {
        serde_json::to_writer_pretty(&mut *writer, list)?;
        writer.write_all(b"\n").map_err(serde_json::Error::io)?;
        Ok(())
    }
}

impl ListFormat for JsonFormat {
    fn name(&self) -> &'static str {
        "json"
    }

    fn decode(&self, reader: &mut dyn Read) -> Result<TaskList, ListIoError> {
        let text = read_text(self.name(), reader)?;
        if text.trim().is_empty() {
            return Ok(TaskList::new());
        }
        serde_json::from_str(&text).map_err(|e| ListIoError::Decode {
            format: self.name(),
            message: e.to_string(),
        })
    }
}

/// The older line format. Read-only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyFormat;

impl ListFormat for LegacyFormat {
    fn name(&self) -> &'static str {
        "legacy"
    }

    fn decode(&self, reader: &mut dyn Read) -> Result<TaskList, ListIoError> {
        let text = read_text(self.name(), reader)?;
        parse_legacy(&text).map_err(|e| ListIoError::Decode {
            format: self.name(),
            message: e.to_string(),
        })
    }
}

fn read_text(format: &'static str, reader: &mut dyn Read) -> Result<String, ListIoError> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|e| ListIoError::Decode {
            format,
            message: e.to_string(),
        })?;
    Ok(text)
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// Where a list lives on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPaths {
    pub current: PathBuf,
    pub legacy: PathBuf,
}

impl ListPaths {
    pub fn new(current: impl Into<PathBuf>, legacy: impl Into<PathBuf>) -> Self {
        ListPaths {
            current: current.into(),
            legacy: legacy.into(),
        }
    }

    pub fn backup(&self) -> PathBuf {
        backup_path(&self.current)
    }
}

/// `<path>~`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push("~");
    PathBuf::from(name)
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Which file a list was loaded from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Current,
    Backup,
    Legacy,
    /// Nothing usable on disk
    Empty,
}

/// Load a list, trying the current file, its backup, then the legacy file.
///
/// Never fails: when no file is usable the result is a new empty list.
pub fn load_list(paths: &ListPaths) -> (TaskList, LoadSource) {
    let backup = paths.backup();
    let attempts: [(&Path, &dyn ListFormat, LoadSource); 3] = [
        (&paths.current, &JsonFormat, LoadSource::Current),
        (&backup, &JsonFormat, LoadSource::Backup),
        (&paths.legacy, &LegacyFormat, LoadSource::Legacy),
    ];

    for (path, format, source) in attempts {
        match load_from(path, format) {
            Ok(Some(list)) => {
                tracing::debug!(path = %path.display(), format = format.name(), "loaded task list");
                if source == LoadSource::Backup {
                    tracing::warn!(path = %path.display(), "recovered task list from backup");
                }
                return (list, source);
            }
            Ok(None) => {
                tracing::debug!(path = %path.display(), "no list file");
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable list file");
            }
        }
    }

    tracing::debug!("starting a new task list");
    (TaskList::new(), LoadSource::Empty)
}

/// Decode one file. `Ok(None)` when it does not exist.
pub fn load_from(path: &Path, format: &dyn ListFormat) -> Result<Option<TaskList>, ListIoError> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ListIoError::io("open", path)(e)),
    };
    format.decode(&mut file).map(Some)
}

// ---------------------------------------------------------------------------
// Save
// ---------------------------------------------------------------------------

/// Write `list` to `path` in JSON without ever leaving `path` missing.
///
/// The list goes to a temp file in the same directory first. The previous
/// file is then kept as `<path>~` and the temp file is renamed over `path`.
pub fn save_list(path: &Path, list: &TaskList) -> Result<(), ListIoError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(ListIoError::io("create temp file in", dir))?;
    JsonFormat.encode(list, &mut tmp)?;
    tmp.flush().map_err(ListIoError::io("write", tmp.path()))?;
    tmp.as_file()
        .sync_all()
        .map_err(ListIoError::io("sync", tmp.path()))?;

    if path.exists() {
        let backup = backup_path(path);
        replace_backup(path, &backup).map_err(ListIoError::io("back up to", &backup))?;
        tracing::debug!(path = %backup.display(), "kept previous list");
    }

    tmp.persist(path)
        .map_err(|e| ListIoError::io("replace", path)(e.error))?;
    tracing::debug!(path = %path.display(), tasks = list.count(), "saved task list");
    Ok(())
}

/// Point `backup` at the current contents of `current`.
fn replace_backup(current: &Path, backup: &Path) -> io::Result<()> {
    match fs::remove_file(backup) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    if let Err(e) = fs::hard_link(current, backup) {
        tracing::debug!(error = %e, "hard link failed, copying instead");
        fs::copy(current, backup)?;
    }
    Ok(())
}
