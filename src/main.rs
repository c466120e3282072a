// Entrypoint for the CLI application.
// - Keeps `main` small: set up logging, create a store client and hand it
//   to the UI loop.
// - Returns `anyhow::Result` so any setup failure is reported and exits.

use charmcraft_store::{api::Client, config::StoreConfig, ui::main_menu};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they don't mix with the menu; tune with RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    // Store and storage URLs come from `CHARMCRAFT_API_URL` and
    // `CHARMCRAFT_STORAGE_URL`, see `StoreConfig::from_env`.
    let client = Client::from_config(StoreConfig::from_env())?;

    main_menu(client)?;
    Ok(())
}
