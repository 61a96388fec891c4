//! Tabularium server binary.
//!
//! Loads bootstrap settings (defaults → `tabula.toml` → `TABULA__*`
//! environment variables), initializes logging, assembles the
//! application, starts the scheduled jobs and serves until ctrl-c.

use std::sync::Arc;

use tabula_config::SettingsLoader;
use tabula_server::{App, PageDispatcher, Server, ServerConfig};
use tabula_telemetry::{init_logging, LogConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = SettingsLoader::new()
        .with_dotenv()
        .with_optional_file("tabula.toml")?
        .with_env_prefix("TABULA")
        .load()?;

    let log_config = LogConfig {
        level: settings.logging.level.clone(),
        json_format: settings.logging.format == "json",
        ..LogConfig::default()
    };
    init_logging(&log_config)?;

    let app = Arc::new(App::bootstrap(settings.clone(), PageDispatcher::new())?);
    app.scheduler.start()?;

    let server = Server::new(ServerConfig::from_settings(&settings), app.clone());
    server.shutdown_signal().listen_for_ctrl_c();
    server.run().await?;

    app.scheduler.stop().await;
    Ok(())
}
