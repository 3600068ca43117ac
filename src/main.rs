//! Seshat - Per-Document Editing Session Coordinator
//!
//! This is the command-line entry point. It opens documents through the
//! session coordinator, answering recovery prompts interactively, and
//! exposes the snapshot store for inspection and cleanup.

use clap::{Parser, Subcommand};
use seshat_core::prefs::PrefStore;
use seshat_core::snapshot::SnapshotStore;
use seshat_core::{
    error::{Result, SeshatError},
    hash, DocumentRef, DocumentUri, JobOutcome, LocalFileStorage, PromptChoice, PromptKind,
    PromptRequest, SeshatConfig, SessionCoordinator, StorageProvider,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, Level};
use tracing_subscriber::{self, EnvFilter};

/// Turn a user-supplied path into the canonical URI snapshots are keyed by
fn document_uri(path: &str) -> Result<DocumentUri> {
    let raw = PathBuf::from(path);
    let absolute = match std::fs::canonicalize(&raw) {
        Ok(resolved) => resolved,
        // Deleted files still need a stable URI so their snapshots resolve
        Err(_) if raw.is_absolute() => raw,
        Err(_) => std::env::current_dir()?.join(raw),
    };
    Ok(DocumentUri::from_path(&absolute))
}

/// Answer a recovery prompt from stdin
fn ask_user(request: &PromptRequest) -> PromptChoice {
    let question = match request.kind {
        PromptKind::ReloadChangedFile => format!(
            "'{}' changed on disk since its last snapshot. Reload from disk? [y/N]: ",
            request.document
        ),
        PromptKind::KeepDeletedFile => format!(
            "'{}' no longer exists on disk. Keep the recovered snapshot? [y/N]: ",
            request.document
        ),
    };
    print!("{}", question);
    if std::io::Write::flush(&mut std::io::stdout()).is_err() {
        return PromptChoice::Declined;
    }

    let mut input = String::new();
    if std::io::stdin().read_line(&mut input).is_err() {
        return PromptChoice::Declined;
    }
    if input.trim().eq_ignore_ascii_case("y") {
        PromptChoice::Confirmed
    } else {
        PromptChoice::Declined
    }
}

async fn open_document(data_dir: Option<PathBuf>, path: String, save: bool) -> Result<()> {
    let config = SeshatConfig::resolve(data_dir)?;
    let storage: Arc<dyn StorageProvider> = Arc::new(LocalFileStorage::new());
    let mut coordinator = SessionCoordinator::new(config, Arc::clone(&storage));

    let uri = document_uri(&path)?;
    let document = match storage.resolve(&uri).await {
        Ok(doc) => doc,
        // A deleted file with a surviving snapshot is still openable; the
        // coordinator raises the keep-or-discard prompt for it.
        Err(SeshatError::DocumentNotFound(missing)) => {
            if coordinator.snapshots().exists(&uri).await {
                DocumentRef::new(uri.clone())
            } else {
                return Err(SeshatError::DocumentNotFound(missing));
            }
        }
        Err(e) => return Err(e),
    };
    let name = document.name.clone();

    coordinator.open(document).await;
    let finished = coordinator.drive_until_idle(ask_user).await;

    let mut restored = false;
    for report in &finished {
        match &report.outcome {
            JobOutcome::Opened { restored: r, .. } => restored = *r,
            JobOutcome::Failed { message } => {
                eprintln!("✗ Failed to open {}: {}", name, message);
                return Err(SeshatError::Other(message.clone()));
            }
            _ => {}
        }
    }

    println!("✓ Opened {}", name);
    coordinator
        .with_editor(|shell| {
            println!("   Language: {}", shell.syntax.language().extension());
            println!("   Lines:    {}", shell.buffer.line_count());
            println!("   Chars:    {}", shell.buffer.len_chars());
        })
        .await;
    println!("   Source:   {}", if restored { "snapshot" } else { "disk" });
    let flags = coordinator.flags().snapshot();
    println!("   Undo:     {}", if flags.can_undo { "✓" } else { "✗" });

    if save {
        coordinator.save().await?;
        let saved = coordinator.drive_until_idle(ask_user).await;
        for report in &saved {
            if let JobOutcome::Failed { message } = &report.outcome {
                eprintln!("✗ Save failed: {}", message);
                return Err(SeshatError::Other(message.clone()));
            }
        }
        println!("✓ Snapshots refreshed for {}", name);
    }

    Ok(())
}

async fn show_status(data_dir: Option<PathBuf>) -> Result<()> {
    let config = SeshatConfig::resolve(data_dir)?;

    println!("╭─────────────────────────────────────────╮");
    println!("│  Seshat v{}                          │", env!("CARGO_PKG_VERSION"));
    println!("│  Editing Session Coordinator            │");
    println!("╰─────────────────────────────────────────╯");
    println!();

    println!("📁 Data");
    println!("   Data dir:  {}", config.data_dir.display());
    println!("   Snapshots: {}", config.snapshot_path().display());
    println!("   Prefs:     {}", config.prefs_path().display());
    println!();

    let prefs = PrefStore::load(config.prefs_path(), config.recent_documents_cap);
    println!("📄 Session");
    match prefs.last_active() {
        Some(uri) => println!("   Last active: {}", uri),
        None => println!("   Last active: none"),
    }
    println!("   Recent:      {} document(s)", prefs.recent().len());
    println!();

    let store = SnapshotStore::new(config.snapshot_path());
    let snapshots = store.list().await?;
    println!("📦 Snapshots");
    println!("   Count: {}", snapshots.len());
    let total: u64 = snapshots
        .iter()
        .map(|s| s.state_size + s.text_size.unwrap_or(0))
        .sum();
    println!("   Size:  {} B", total);
    println!();

    Ok(())
}

async fn list_snapshots(data_dir: Option<PathBuf>) -> Result<()> {
    let config = SeshatConfig::resolve(data_dir)?;
    let store = SnapshotStore::new(config.snapshot_path());
    let snapshots = store.list().await?;

    if snapshots.is_empty() {
        println!("No snapshots in {}", store.dir().display());
        return Ok(());
    }

    println!("Snapshots in {}:", store.dir().display());
    for info in snapshots {
        let modified = info
            .modified
            .map(|m| m.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let text = info
            .text_size
            .map(|b| format!("{} B", b))
            .unwrap_or_else(|| "missing".to_string());
        println!(
            "  {}  state {} B, text {}, modified {}",
            &info.digest[..12.min(info.digest.len())],
            info.state_size,
            text,
            modified
        );
    }
    Ok(())
}

async fn delete_snapshot(data_dir: Option<PathBuf>, path: String) -> Result<()> {
    let config = SeshatConfig::resolve(data_dir)?;
    let store = SnapshotStore::new(config.snapshot_path());
    let uri = document_uri(&path)?;

    if !store.exists(&uri).await {
        println!("✗ No snapshot for {}", path);
        return Ok(());
    }
    store.delete(&uri).await?;
    println!("✓ Deleted snapshot for {}", path);
    Ok(())
}

async fn hash_document(path: String) -> Result<()> {
    let uri = document_uri(&path)?;
    let file = uri.to_path()?;
    match hash::hash_file(&file).await? {
        Some(digest) => {
            println!("{}  {}", digest.to_hex(), path);
            println!("snapshot id: {}", hash::uri_digest(&uri));
            Ok(())
        }
        None => Err(SeshatError::DocumentNotFound(path)),
    }
}

#[derive(Parser)]
#[command(name = "seshat")]
#[command(about = "Per-document editing session coordinator", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Set log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Data directory (overrides SESHAT_DATA_DIR env var and config file)
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a document, recovering from snapshots when present
    Open {
        /// Path to the document
        path: String,

        /// Write the buffer back and refresh snapshots after opening
        #[arg(long)]
        save: bool,
    },

    /// Show data directories, session state and snapshot usage
    Status,

    /// Inspect or remove recovery snapshots
    Snapshots {
        #[command(subcommand)]
        action: SnapshotsAction,
    },

    /// Print the content hash of a file
    Hash {
        /// Path to the file
        path: String,
    },
}

#[derive(Subcommand)]
enum SnapshotsAction {
    /// List stored snapshot pairs
    List,

    /// Delete the snapshot pair for a document
    Delete {
        /// Path to the document
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::new(format!("seshat={}", level.as_str().to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // Write logs to stderr, not stdout
        .init();

    debug!("Seshat v{} starting...", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Open { path, save } => open_document(cli.data_dir, path, save).await,
        Commands::Status => show_status(cli.data_dir).await,
        Commands::Snapshots { action } => match action {
            SnapshotsAction::List => list_snapshots(cli.data_dir).await,
            SnapshotsAction::Delete { path } => delete_snapshot(cli.data_dir, path).await,
        },
        Commands::Hash { path } => hash_document(path).await,
    }
}
