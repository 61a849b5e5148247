//! Ledger Validator CLI
//!
//! Validates the governance datasets against the schema registry and
//! reports dataset digests and metrics.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gov_ledger::{
    store, Checksum, DatasetMetrics, EntityKind, LedgerConfig, RecordStore, Registry, Validator,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ledger-validator")]
#[command(about = "Validate governance datasets against the schema registry")]
struct Cli {
    /// Path to a config file (ledger.toml discovery otherwise)
    #[arg(short, long)]
    config: Option<String>,

    /// Data directory override
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Registry document override
    #[arg(short, long)]
    registry: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate all datasets against the registry
    Validate {
        /// Collect every violation instead of stopping at the first
        #[arg(long)]
        all: bool,
    },

    /// Print SHA256 digests of the dataset files
    Digests,

    /// Compute dataset metrics
    Metrics {
        /// Output file (JSON); stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
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
    let mut config = LedgerConfig::load_from(cli.config.as_deref())?;
    if let Some(dir) = cli.data {
        config.data.dir = dir;
    }
    if let Some(registry) = cli.registry {
        config.data.registry = registry;
    }

    match cli.command {
        Commands::Validate { all } => {
            let registry = Registry::from_path(&config.data.registry)?;
            let store = RecordStore::load_dir(&config.data.dir)?;
            let validator = Validator::new();

            if all || config.validation.collect_all {
                let violations = validator.collect_violations(&store, &registry);
                if violations.is_empty() {
                    println!("✅ Validation passed");
                } else {
                    for violation in &violations {
                        println!("❌ {}", violation);
                    }
                    println!();
                    println!("❌ {} violation(s) found", violations.len());
                    std::process::exit(1);
                }
            } else if let Err(e) = validator.validate(&store, &registry) {
                println!("❌ VALIDATION ERROR: {}", e);
                std::process::exit(1);
            } else {
                println!(
                    "✅ Validation passed ({} sprints, {} issues, {} tasks)",
                    store.len(EntityKind::Sprint),
                    store.len(EntityKind::Issue),
                    store.len(EntityKind::Task)
                );
            }
            Ok(())
        }

        Commands::Digests => {
            for kind in EntityKind::ALL {
                let path = store::dataset_path(&config.data.dir, kind);
                let checksum = Checksum::from_file(&path)?;
                println!("{}  {}", checksum, path.display());
            }
            Ok(())
        }

        Commands::Metrics { output } => {
            let store = RecordStore::load_dir(&config.data.dir)?;
            let metrics = DatasetMetrics::compute(&store);
            let json = serde_json::to_string_pretty(&metrics)?;

            if let Some(path) = output {
                std::fs::write(&path, &json)?;
                println!("✅ Metrics written to {}", path.display());
            } else {
                println!("{}", json);
            }
            Ok(())
        }
    }
}
