use clap::Parser;
use eyre::{Context, Result, eyre};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use zotero_to_papis::{AttachmentMode, ImportConfig, importer};

/// Convert a Zotero library into a papis library.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Folder containing "zotero.sqlite" and "storage".
    /// Defaults to ~/Zotero if not set in config.
    #[arg(value_name = "INPUT_DIR")]
    input_dir: Option<PathBuf>,

    /// Folder to write the papis library to. Created if missing.
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Folder to look in for relative ("attachments:") attachment paths.
    /// May be given several times; the first folder holding the file wins.
    #[arg(long = "files-folder", value_name = "DIR")]
    files_folders: Vec<PathBuf>,

    /// File to list in "files" when no attachment could be exported.
    #[arg(long, value_name = "NAME")]
    default_file: Option<String>,

    /// Item type to skip (e.g. "note"). May be given several times.
    #[arg(long = "exclude-type", value_name = "TYPE")]
    excluded_types: Vec<String>,

    /// Symlink attachments instead of copying them.
    #[arg(long)]
    link: bool,

    /// Read from a temporary copy of the database.
    #[arg(long)]
    snapshot: bool,

    /// Path to a specific configuration file.
    /// Defaults to $XDG_CONFIG_HOME/zotero-to-papis/config.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only report errors; no progress bar.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Deserialize, Default)]
struct FileConfig {
    input_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    files_folders: Option<Vec<PathBuf>>,
    default_file: Option<String>,
    excluded_types: Option<Vec<String>>,
    link: Option<bool>,
}

fn default_input_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|d| d.join("Zotero"))
}

fn load_file_config(explicit_path: Option<&Path>) -> Result<FileConfig> {
    let path = if let Some(p) = explicit_path {
        if !p.exists() {
            return Err(eyre!("Config file not found: {}", p.display()));
        }
        Some(p.to_path_buf())
    } else {
        dirs::config_dir()
            .map(|d| d.join("zotero-to-papis/config.toml"))
            .filter(|p| p.exists())
    };

    match path {
        None => Ok(FileConfig::default()),
        Some(p) => {
            let content = fs::read_to_string(&p)
                .wrap_err_with(|| format!("Failed to read config: {}", p.display()))?;
            toml::from_str(&content)
                .wrap_err_with(|| format!("Failed to parse config: {}", p.display()))
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    // RUST_LOG > quiet > verbose > info
    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn non_empty<T>(v: Vec<T>) -> Option<Vec<T>> {
    if v.is_empty() { None } else { Some(v) }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    debug!(?cli, "CLI arguments parsed");

    // 1. Load config file (CLI path > default path)
    let file_cfg = load_file_config(cli.config.as_deref())?;

    // 2. Resolve input_dir (CLI > Config > ~/Zotero)
    let input_dir = cli
        .input_dir
        .or(file_cfg.input_dir)
        .or_else(default_input_dir)
        .ok_or_else(|| {
            eyre!("Could not determine the Zotero folder.\nPass INPUT_DIR, or set input_dir in config.toml.")
        })?;

    // 3. Resolve output_dir (CLI > Config)
    let output_dir = cli.output.or(file_cfg.output_dir).ok_or_else(|| {
        eyre!("No output folder given.\nUse --output, or set output_dir in config.toml.")
    })?;

    // 4. Build the Import Config, keeping library defaults where nothing was given
    let mut config = ImportConfig::new(input_dir, output_dir);
    if let Some(folders) = non_empty(cli.files_folders).or(file_cfg.files_folders) {
        config.files_folders = folders;
    }
    if let Some(types) = non_empty(cli.excluded_types).or(file_cfg.excluded_types) {
        config.excluded_types = types;
    }
    config.default_file = cli.default_file.or(file_cfg.default_file);
    if cli.link || file_cfg.link.unwrap_or(false) {
        config.attachment_mode = AttachmentMode::Symlink;
    }
    config.snapshot = cli.snapshot;
    config.quiet = cli.quiet;

    // 5. Run the import
    importer::execute(&config)?;
    Ok(())
}
