use crate::attachments::{self, AttachmentReport};
use crate::citation::{self, EXTRA_FIELD};
use crate::creators;
use crate::document::Document;
use crate::fields;
use crate::items::{Item, ItemEnumerator};
use crate::tags;
use crate::utils::{ImportConfig, open_database, snapshot_database};
use eyre::{Context, Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;
use std::fs;
use tracing::{debug, info};

/// Totals of one import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub items: usize,
    pub files: usize,
    pub failed_attachments: usize,
}

/// What became of one item.
#[derive(Debug)]
pub struct ItemExport {
    pub document: Document,
    pub attachments: Vec<AttachmentReport>,
}

impl ItemExport {
    pub fn exported_files(&self) -> usize {
        self.attachments.iter().filter(|r| r.outcome.is_ok()).count()
    }

    pub fn failed_attachments(&self) -> usize {
        self.attachments.len() - self.exported_files()
    }
}

/// The main entry point: opens (or snapshots) the library and exports every item.
pub fn execute(config: &ImportConfig) -> Result<ImportSummary> {
    let db_path = config.db_path();
    if !db_path.exists() {
        return Err(eyre!("Database not found at: {}", db_path.display()));
    }

    if config.snapshot {
        let snapshot = snapshot_database(&db_path)?;
        let conn = open_database(snapshot.path())?;
        run(&conn, config)
    } else {
        let conn = open_database(&db_path)?;
        run(&conn, config)
    }
}

/// Export every non-excluded item reachable through `conn`, in id order.
pub fn run(conn: &Connection, config: &ImportConfig) -> Result<ImportSummary> {
    fs::create_dir_all(&config.output_dir).wrap_err_with(|| {
        format!(
            "Failed to create output directory: {}",
            config.output_dir.display()
        )
    })?;

    let mut items = ItemEnumerator::load(conn, &config.excluded_types)?;
    let total = items.total();

    let pb = if config.quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
            )
            .wrap_err("Invalid progress bar template")?
            .progress_chars("=>-"),
        );
        bar.println(format!("Found {} items.", total));
        bar
    };

    let mut summary = ImportSummary::default();
    while let Some(item) = items.next() {
        debug!(
            "exporting item {}/{}: {}",
            items.position(),
            total,
            item.key
        );
        pb.set_message(item.key.clone());

        let export = export_item(conn, &item, config)
            .wrap_err_with(|| format!("Failed to export item {}", item.key))?;

        summary.items += 1;
        summary.files += export.exported_files();
        summary.failed_attachments += export.failed_attachments();
        pb.inc(1);
    }

    pb.finish_and_clear();

    info!(
        items = summary.items,
        files = summary.files,
        failed_attachments = summary.failed_attachments,
        "import finished"
    );
    if !config.quiet {
        let mut line = format!(
            "Done. {} items exported, {} files attached.",
            summary.items, summary.files
        );
        if summary.failed_attachments > 0 {
            line.push_str(&format!(
                " {} attachment(s) could not be exported.",
                summary.failed_attachments
            ));
        }
        eprintln!("{}", line);
    }

    Ok(summary)
}

/// Resolve everything the item owns, merge it into one document and write it.
pub fn export_item(conn: &Connection, item: &Item, config: &ImportConfig) -> Result<ItemExport> {
    let item_dir = config.item_dir(&item.key);
    fs::create_dir_all(&item_dir)
        .wrap_err_with(|| format!("Failed to create item directory: {}", item_dir.display()))?;

    let fields = fields::get_fields(conn, item.id)?;
    let extra = fields.get(EXTRA_FIELD).and_then(|v| v.as_str());
    let item_ref = citation::resolve_ref(extra, &item.key).to_string();
    debug!(key = %item.key, item_ref = %item_ref, "exporting under ref");

    let creators = creators::get_creators(conn, item.id)?;
    let tags = tags::get_tags(conn, item.id)?;
    let collections = tags::get_collections(conn, item.id)?;
    let attachments = attachments::export_attachments(conn, item.id, &item.key, config)?;
    let files = attachments::file_list(&attachments, config.default_file.as_deref());

    let mut document = Document::from_item(item);
    document.extend(fields);
    document.extend(creators.into_entries()?);
    document.insert("tags", tags);
    document.insert("project", collections);
    document.insert("files", files);
    document.insert("ref", item_ref);

    document.write_to(&item_dir)?;

    Ok(ItemExport {
        document,
        attachments,
    })
}
