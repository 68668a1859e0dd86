use std::env;
use std::error::Error;
use std::io;
use std::process;
use std::sync::Arc;

use gametrust_escrow::{run, Command, EscrowStore, FileStorage, StoreConfig, TracingNotifier};
use tracing_subscriber::EnvFilter;

const DEFAULT_DATA_DIR: &str = ".gametrust";

fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    if let Err(err) = run_app() {
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}

fn run_app() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = env::args().skip(1).collect();
    let command = Command::parse(&args)?;

    let config = StoreConfig::from_env()?;
    let data_dir = env::var("GAMETRUST_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string());
    let storage = FileStorage::open(&data_dir)?;
    tracing::debug!(
        data_dir = %data_dir,
        environment = config.environment.as_str(),
        "opened escrow storage"
    );

    let store = EscrowStore::new(config, Arc::new(storage)).with_notifier(Arc::new(TracingNotifier));
    run(&store, command, io::stdout().lock())
}
