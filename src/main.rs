// Entrypoint for the CLI application.
// - Keeps `main` small: set up logging, create an API client and hand it to
//   the UI loop.
// - Returns `anyhow::Result` so configuration problems are reported with
//   context.

use anyhow::Context;
use ghost_deploy::{ui::main_menu, ApiClient};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they don't interleave with the menu. RUST_LOG
    // overrides the default level.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Site and credentials come from GHOST_* environment variables. See
    // `ClientConfig::from_env`.
    let api = ApiClient::from_env().context("Failed to configure the Admin API client")?;
    tracing::info!(site = %api.config().site_url, "client configured");

    // Start the interactive menu. This call blocks until the user exits.
    main_menu(api)?;
    Ok(())
}
