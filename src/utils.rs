use eyre::{Context, Result};
use rusqlite::{Connection, OpenFlags, backup::Backup};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;

/// File name of the Zotero database inside the input directory.
pub const DATABASE_FILE: &str = "zotero.sqlite";
/// Directory holding the attachment blobs, keyed by attachment key.
pub const STORAGE_DIR: &str = "storage";
/// Name of the per-item document.
pub const DOCUMENT_FILE: &str = "info.yaml";

/// How a resolved attachment lands in the item directory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AttachmentMode {
    #[default]
    Copy,
    Symlink,
}

/// Configuration required to run the import.
/// This decouples the logic from how the arguments were parsed (CLI/Config file).
#[derive(Clone, Debug)]
pub struct ImportConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Folders searched, in order, for `attachments:` relative paths.
    pub files_folders: Vec<PathBuf>,
    /// Listed as the only file when no attachment could be exported.
    pub default_file: Option<String>,
    pub excluded_types: Vec<String>,
    pub attachment_mode: AttachmentMode,
    pub snapshot: bool,
    pub quiet: bool,
}

impl ImportConfig {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            files_folders: vec![PathBuf::from(".")],
            default_file: None,
            excluded_types: vec!["note".to_string()],
            attachment_mode: AttachmentMode::Copy,
            snapshot: false,
            quiet: true,
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.input_dir.join(DATABASE_FILE)
    }

    pub fn storage_dir(&self) -> PathBuf {
        self.input_dir.join(STORAGE_DIR)
    }

    pub fn item_dir(&self, item_key: &str) -> PathBuf {
        self.output_dir.join(item_key)
    }
}

/// Open the library read-only. The same connection serves every query of a run.
pub fn open_database(path: &Path) -> Result<Connection> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .wrap_err_with(|| format!("Failed to open database: {}", path.display()))
}

/// Copy the database into a temporary file using SQLite's online backup, so
/// the import reads a consistent state even if the library is being written.
pub fn snapshot_database(db_path: &Path) -> Result<NamedTempFile> {
    let src = open_database(db_path)?;

    let tmp = NamedTempFile::new().wrap_err("Failed to create temporary file")?;
    let mut dst =
        Connection::open(tmp.path()).wrap_err("Failed to open snapshot database connection")?;

    {
        let backup = Backup::new(&src, &mut dst).wrap_err("Failed to initialize backup")?;
        backup
            .run_to_completion(1000, Duration::from_millis(5), None)
            .wrap_err("Backup did not complete successfully")?;
    }

    drop(src);
    Ok(tmp)
}
