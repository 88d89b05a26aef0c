mod batch;
mod config;
mod engine;
mod errors;
mod instrument;
mod loader;
mod output;

#[tokio::main]
async fn main() {
    // Structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("payoff_profile starting");

    // Load config
    let cfg = match config::AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    match batch::run_batch(&cfg).await {
        Ok(summary) if summary.all_succeeded() => {
            tracing::info!(strategies = summary.succeeded, "all strategies processed");
        }
        Ok(summary) => {
            tracing::error!(
                failed = summary.failed,
                succeeded = summary.succeeded,
                "some strategies failed"
            );
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!("batch error: {e}");
            std::process::exit(1);
        }
    }
}
