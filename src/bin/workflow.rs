//! Ledger Workflow CLI
//!
//! Applies status-change batches to the governance datasets: a single
//! positional update, a batch file, or request lines on stdin. Every run
//! captures standup minutes, commits atomically, writes the updated
//! datasets, and records an audit of what changed.
//!
//! Usage:
//!   ledger-workflow issue S03.I01 in_progress alice "starting work"
//!   ledger-workflow --file standup.txt
//!   ledger-workflow < standup.txt

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{Local, Utc};
use clap::Parser;
use gov_ledger::{
    batch, ChangeRequest, EntityKind, LedgerConfig, RecordStore, Registry, RunAudit,
    TransitionEngine,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ledger-workflow")]
#[command(about = "Apply status changes to the governance ledger")]
struct Cli {
    /// Path to a config file (ledger.toml discovery otherwise)
    #[arg(short, long)]
    config: Option<String>,

    /// Batch file of change requests
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Entity kind (issue, task, sprint)
    entity: Option<String>,

    /// Record identifier
    id: Option<String>,

    /// New status
    status: Option<String>,

    /// Actor recorded in the history entry
    actor: Option<String>,

    /// Reason recorded in the history entry
    reason: Option<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = LedgerConfig::load_from(cli.config.as_deref())?;
    let sprint = config.current_sprint();

    let transactions_dir = config.transactions_dir();
    let minutes_dir = config.minutes_dir();

    // Gather the batch
    let requests = if let Some(path) = &cli.file {
        let requests = batch::read_batch(path)?;
        if config.workflow.archive_batches {
            let archived = archive_batch_file(path, &transactions_dir)?;
            println!("Batch file archived to {}", archived.display());
        }
        requests
    } else if cli.entity.is_some() {
        vec![single_request(&cli)?]
    } else {
        let mut content = String::new();
        std::io::stdin().read_to_string(&mut content)?;
        batch::parse_lines(content.lines())?
    };

    if requests.is_empty() {
        println!("No updates provided.");
        return Ok(());
    }

    // Capture standup decisions before touching the ledger
    let pending_path = save_pending_minutes(&minutes_dir, &sprint, &requests)?;
    println!("Standup decisions captured in {}", pending_path.display());

    let registry = Registry::from_path(&config.data.registry)?;
    let mut store = RecordStore::load_dir(&config.data.dir)?;

    let mut audit = RunAudit::begin(
        format!("{}_standup", sprint),
        Some(sprint.clone()),
        &registry,
        &store,
        requests.len(),
    );

    let changes = TransitionEngine::new().apply_batch(&mut store, &registry, &requests)?;

    for change in &changes {
        println!(
            "{}:{}: {} → {} at {}",
            change.kind,
            change.id,
            change.old_status,
            change.new_status,
            change.timestamp.to_rfc3339()
        );
    }

    store.save_dir(&config.data.dir)?;
    audit.complete(&store, changes);

    fs::create_dir_all(&transactions_dir)?;
    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    let audit_path = transactions_dir.join(format!("{}-audit.json", stamp));
    audit.write_json(&audit_path)?;
    println!("Audit record written to {}", audit_path.display());

    let final_minutes = finalize_minutes(&pending_path, &minutes_dir)?;
    println!("Standup minutes finalized at {}", final_minutes.display());

    Ok(())
}

fn single_request(cli: &Cli) -> anyhow::Result<ChangeRequest> {
    match (&cli.entity, &cli.id, &cli.status, &cli.actor, &cli.reason) {
        (Some(entity), Some(id), Some(status), Some(actor), Some(reason)) => {
            let kind: EntityKind = entity.parse()?;
            Ok(ChangeRequest::new(kind, id, status, actor, reason))
        }
        _ => anyhow::bail!("Need: entity id status actor reason"),
    }
}

fn archive_batch_file(path: &Path, transactions_dir: &Path) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(transactions_dir)?;
    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    let dest = transactions_dir.join(format!("{}-updates.txt", stamp));
    fs::copy(path, &dest)?;
    Ok(dest)
}

fn save_pending_minutes(
    minutes_dir: &Path,
    sprint: &str,
    requests: &[ChangeRequest],
) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(minutes_dir)?;
    let pending_path = minutes_dir.join("pending.json");
    let payload = serde_json::json!({
        "captured_at": Utc::now(),
        "sprint": sprint,
        "updates": requests,
    });
    fs::write(&pending_path, serde_json::to_string_pretty(&payload)?)?;
    Ok(pending_path)
}

fn finalize_minutes(pending_path: &Path, minutes_dir: &Path) -> anyhow::Result<PathBuf> {
    let final_path = minutes_dir.join(format!("{}.json", Local::now().format("%Y-%m-%d")));
    fs::rename(pending_path, &final_path)?;
    Ok(final_path)
}
