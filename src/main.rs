//! sura-certs - certificate download entry point
//!
//! Runs the agent once and prints the final text to stdout. Logs go to
//! stderr.

use sura_certs::{app, config::Config};
use tracing::{info, info_span, Instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; real deployments set the environment directly.
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sura_certs=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env()?;
    let run_id = uuid::Uuid::new_v4();
    info!(
        %run_id,
        primary = %config.primary_model,
        alternate = %config.alternate_model,
        downloads = %config.downloads_dir.display(),
        "Loaded configuration"
    );

    let outcome = app::run(&config)
        .instrument(info_span!("run", %run_id))
        .await?;
    info!(
        %run_id,
        attempts = outcome.attempts.len(),
        succeeded = outcome.succeeded(),
        "Run finished"
    );

    println!("{}", outcome.output);
    Ok(())
}
