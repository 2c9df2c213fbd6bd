use crate::query::InClause;
use crate::utils::{AttachmentMode, ImportConfig};
use eyre::{Context, Result};
use rusqlite::types::Value;
use rusqlite::{Connection, params_from_iter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Attachment content types worth exporting, with the extension papis uses
/// for them.
pub const ALLOWED_ATTACHMENTS: &[(&str, &str)] = &[
    ("application/vnd.ms-htmlhelp", "chm"),
    ("image/vnd.djvu", "djvu"),
    ("application/msword", "doc"),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "docx",
    ),
    ("application/epub+zip", "epub"),
    ("application/octet-stream", "fb2"),
    ("application/x-mobipocket-ebook", "mobi"),
    ("application/pdf", "pdf"),
    ("text/rtf", "rtf"),
    ("application/zip", "zip"),
];

pub fn attachment_extension(content_type: &str) -> Option<&'static str> {
    ALLOWED_ATTACHMENTS
        .iter()
        .find(|(mime, _)| *mime == content_type)
        .map(|(_, ext)| *ext)
}

const ATTACHMENTS_PREFIX: &str = "attachments:";
const STORAGE_PREFIX: &str = "storage:";

/// Where a stored attachment path points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentScheme<'a> {
    /// Relative to one of the configured files folders.
    Attachments(&'a str),
    /// Inside `storage/<attachment key>/`.
    Storage(&'a str),
}

impl<'a> AttachmentScheme<'a> {
    pub fn parse(stored: &'a str) -> Option<Self> {
        if let Some(rest) = stored.strip_prefix(ATTACHMENTS_PREFIX) {
            Some(Self::Attachments(rest))
        } else {
            stored.strip_prefix(STORAGE_PREFIX).map(Self::Storage)
        }
    }

    pub fn relative_path(&self) -> &'a str {
        match self {
            Self::Attachments(p) | Self::Storage(p) => p,
        }
    }

    /// Name the file gets in the item directory.
    pub fn file_name(&self) -> Option<&'a str> {
        Path::new(self.relative_path())
            .file_name()
            .and_then(|n| n.to_str())
    }
}

/// Why a single attachment could not be exported. None of these abort the item.
#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("no file found for attachment {key} (tried {tried:?})")]
    NotFound { key: String, tried: Vec<PathBuf> },

    #[error("attachment {key} already is its destination: {path}")]
    SameFile { key: String, path: PathBuf },

    #[error("IO error exporting attachment {key} from {from} to {to}: {source}")]
    Io {
        key: String,
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot export attachment {key}: {reason}")]
    Unexpected { key: String, reason: String },
}

/// A row of `itemAttachments` that passed the content type filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRow {
    pub key: String,
    pub path: Option<String>,
    pub content_type: String,
}

/// The outcome for one attachment: the exported file name or the reason
/// it was dropped.
#[derive(Debug)]
pub struct AttachmentReport {
    pub row: AttachmentRow,
    pub outcome: std::result::Result<String, AttachmentError>,
}

pub fn load_attachments(conn: &Connection, item_id: i64) -> Result<Vec<AttachmentRow>> {
    let mimes = InClause::new(ALLOWED_ATTACHMENTS.iter().map(|(mime, _)| *mime), 2);
    let mut stmt = conn
        .prepare_cached(&format!(
            "SELECT items.key, itemAttachments.path, itemAttachments.contentType
             FROM itemAttachments
             JOIN items ON items.itemID = itemAttachments.itemID
             WHERE itemAttachments.parentItemID = ?1
               AND itemAttachments.contentType IN {}
             ORDER BY itemAttachments.itemID",
            mimes.sql()
        ))
        .wrap_err("Failed to prepare attachment query")?;

    let params = std::iter::once(Value::Integer(item_id)).chain(mimes.into_values());
    let rows = stmt
        .query_map(params_from_iter(params), |row| {
            Ok(AttachmentRow {
                key: row.get(0)?,
                path: row.get(1)?,
                content_type: row.get(2)?,
            })
        })
        .wrap_err_with(|| format!("Failed to query attachments of item {}", item_id))?
        .collect::<Result<Vec<_>, _>>()
        .wrap_err("Failed to read attachment row")?;

    Ok(rows)
}

/// Export every allow-listed attachment of an item into its output
/// directory. Only the query itself can fail; per-file problems are
/// reported in the returned list.
pub fn export_attachments(
    conn: &Connection,
    item_id: i64,
    item_key: &str,
    config: &ImportConfig,
) -> Result<Vec<AttachmentReport>> {
    let item_dir = config.item_dir(item_key);
    let reports = load_attachments(conn, item_id)?
        .into_iter()
        .map(|row| {
            let outcome = export_attachment(&row, &item_dir, config);
            AttachmentReport { row, outcome }
        })
        .collect();
    Ok(reports)
}

fn export_attachment(
    row: &AttachmentRow,
    item_dir: &Path,
    config: &ImportConfig,
) -> std::result::Result<String, AttachmentError> {
    let unexpected = |reason: String| AttachmentError::Unexpected {
        key: row.key.clone(),
        reason,
    };

    let stored = row
        .path
        .as_deref()
        .ok_or_else(|| unexpected("no stored path".to_string()))?;
    let scheme = AttachmentScheme::parse(stored)
        .ok_or_else(|| unexpected(format!("unrecognized path scheme: {}", stored)))?;
    let file_name = scheme
        .file_name()
        .ok_or_else(|| unexpected(format!("path has no file name: {}", stored)))?;

    let source = resolve_source(scheme, &row.key, config)?;
    let destination = item_dir.join(file_name);
    place_file(&source, &destination, config.attachment_mode).map_err(|e| match e {
        PlaceError::SameFile => AttachmentError::SameFile {
            key: row.key.clone(),
            path: destination.clone(),
        },
        PlaceError::Io(source_err) => AttachmentError::Io {
            key: row.key.clone(),
            from: source.clone(),
            to: destination.clone(),
            source: source_err,
        },
    })?;

    debug!(
        key = %row.key,
        file = file_name,
        extension = attachment_extension(&row.content_type),
        "exported attachment"
    );
    Ok(file_name.to_string())
}

/// Find the file on disk. For folder-relative paths the first configured
/// folder that has it wins.
pub fn resolve_source(
    scheme: AttachmentScheme<'_>,
    attachment_key: &str,
    config: &ImportConfig,
) -> std::result::Result<PathBuf, AttachmentError> {
    let candidates: Vec<PathBuf> = match scheme {
        AttachmentScheme::Attachments(rel) => {
            config.files_folders.iter().map(|f| f.join(rel)).collect()
        }
        AttachmentScheme::Storage(rel) => {
            vec![config.storage_dir().join(attachment_key).join(rel)]
        }
    };

    match candidates.iter().find(|p| p.exists()) {
        Some(found) => Ok(found.clone()),
        None => Err(AttachmentError::NotFound {
            key: attachment_key.to_string(),
            tried: candidates,
        }),
    }
}

enum PlaceError {
    SameFile,
    Io(io::Error),
}

impl From<io::Error> for PlaceError {
    fn from(e: io::Error) -> Self {
        PlaceError::Io(e)
    }
}

fn place_file(source: &Path, destination: &Path, mode: AttachmentMode) -> Result<(), PlaceError> {
    // A link left by an earlier run is replaced, never written through.
    if let Ok(meta) = fs::symlink_metadata(destination)
        && meta.file_type().is_symlink()
    {
        fs::remove_file(destination)?;
    }

    if destination.exists() && is_same_file(source, destination)? {
        return Err(PlaceError::SameFile);
    }

    match mode {
        AttachmentMode::Copy => {
            fs::copy(source, destination)?;
        }
        AttachmentMode::Symlink => {
            if destination.exists() {
                fs::remove_file(destination)?;
            }
            let target = fs::canonicalize(source)?;
            symlink(&target, destination)?;
        }
    }
    Ok(())
}

/// Both paths name the same inode, hard links included.
#[cfg(unix)]
fn is_same_file(a: &Path, b: &Path) -> io::Result<bool> {
    use std::os::unix::fs::MetadataExt;
    let (a, b) = (fs::metadata(a)?, fs::metadata(b)?);
    Ok(a.dev() == b.dev() && a.ino() == b.ino())
}

#[cfg(not(unix))]
fn is_same_file(a: &Path, b: &Path) -> io::Result<bool> {
    Ok(fs::canonicalize(a)? == fs::canonicalize(b)?)
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

/// File names for the document: every exported attachment, or the default
/// file when nothing made it. Failures are logged here and dropped.
pub fn file_list(reports: &[AttachmentReport], default_file: Option<&str>) -> Vec<String> {
    let mut files = Vec::with_capacity(reports.len());
    for report in reports {
        match &report.outcome {
            Ok(name) => files.push(name.clone()),
            Err(err) => warn!(
                key = %report.row.key,
                path = report.row.path.as_deref().unwrap_or_default(),
                content_type = %report.row.content_type,
                error = %err,
                "failed to export attachment"
            ),
        }
    }
    if files.is_empty()
        && let Some(default) = default_file
    {
        files.push(default.to_string());
    }
    files
}
