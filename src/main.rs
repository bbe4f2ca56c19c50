use clap::Parser;
use dotenvy::dotenv;
use hutang_buddy::{
    cli::{self, Cli},
    config,
    core::DebtBook,
    errors::Result,
    sheets,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    let cli = Cli::parse();

    // 3. Load the application configuration
    let app_config = config::load_app_configuration(&cli.config)
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;

    // 4. Connect the sheet backend
    let sheet = sheets::connect(&app_config)
        .await
        .inspect_err(|e| error!("Failed to connect sheet backend: {}", e))?;
    let book = DebtBook::new(sheet, app_config.ledger_settings());

    // 5. Run the command
    let output = cli::execute(cli.command, &book)
        .await
        .inspect_err(|e| error!("{}", e))?;
    println!("{}", output.text);

    // 6. Let the StatusHutang rollup finish before exiting
    if let Some(rollup) = output.rollup {
        match rollup.await? {
            Ok(report) if report.failed.is_empty() => {
                info!(
                    "StatusHutang refreshed ({} updated, {} appended)",
                    report.updated, report.appended
                );
            }
            Ok(report) => warn!(
                "StatusHutang refresh failed for {}; run `rollup` to retry",
                report.failed.join(", ")
            ),
            Err(e) => warn!("StatusHutang refresh failed: {}; run `rollup` to retry", e),
        }
    }

    Ok(())
}
