use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "txsync")]
#[command(about = "Indexer history reconciliation CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> local...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Run one reconciliation pass for a script and print the result as JSON
    Reconcile {
        /// Layered config paths in merge order
        #[arg(long = "config", required = true, num_args = 1..)]
        config_paths: Vec<String>,

        /// Script identifier, `<type>:<payload hex>` (e.g. p2pkh:0011..)
        #[arg(long)]
        script: String,

        /// Height through which history is already processed
        #[arg(long)]
        processed_height: Option<i32>,

        /// Number of transactions already processed
        #[arg(long, default_value_t = 0)]
        processed_count: u64,

        /// Reject config keys nothing reads instead of warning about them
        #[arg(long, default_value_t = false)]
        strict_config: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env.local if present; silent when missing.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::ConfigHash { paths } => {
            let loaded = txs_config::load_layered_yaml(&paths)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Reconcile {
            config_paths,
            script,
            processed_height,
            processed_count,
            strict_config,
        } => {
            let args = commands::ReconcileArgs {
                config_paths,
                script,
                processed_height,
                processed_count,
                strict_config,
            };
            let result = commands::run_reconcile(args).await?;
            let out = serde_json::to_string_pretty(&result)
                .context("serialize reconciliation result failed")?;
            println!("{out}");
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
