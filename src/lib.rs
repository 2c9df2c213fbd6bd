//! # zotero-to-papis
//!
//! Converts a [Zotero](https://www.zotero.org) library into a
//! [papis](https://github.com/papis/papis) library.
//!
//! ## What it does
//!
//! Zotero keeps its library in a normalized SQLite database (`zotero.sqlite`)
//! next to a `storage/` tree holding the attachment files. This crate walks
//! that schema item by item and writes one folder per item, named by the
//! item's Zotero key, containing an `info.yaml` document and copies of the
//! item's attachments.
//!
//! Each document carries the item's flat fields, its creators grouped by role
//! (both as a joined `Surname, Given and ...` string and as a structured
//! `<role>_list`), its tags, the collections it belongs to (`project`) and the
//! list of exported files. A `Citation Key: <key>` line in the `extra` field,
//! as written by Better BibTeX, becomes the document's `ref`.
//!
//! The database is opened **read-only**. Every run is a fresh export:
//! existing documents under the output directory are replaced, not merged.
//!
//! ## Usage
//!
//! ```sh
//! # Export the default ~/Zotero library
//! zotero-to-papis -o ~/papers
//!
//! # Linked attachments stored relative to a base directory
//! zotero-to-papis ~/Zotero -o ~/papers --files-folder ~/Dropbox/papers
//! ```
//!
//! Preferences can be persisted in `~/.config/zotero-to-papis/config.toml`.
pub mod attachments;
pub mod citation;
pub mod creators;
pub mod document;
pub mod fields;
pub mod importer;
pub mod items;
pub mod query;
pub mod tags;
pub mod utils;

pub use document::Document;
pub use importer::{ImportSummary, execute};
pub use utils::{AttachmentMode, ImportConfig};
