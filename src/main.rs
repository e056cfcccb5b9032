//! Insider Monitor — Binary Entrypoint
//! Runs one sequential pipeline pass: fetch the filing feed, resolve and
//! extract new filings, rank them, write the report artifacts.
//!
//! Exit code is 0 even when the feed is unreachable or empty — downstream
//! consumers depend on the pipeline always "succeeding". Only setup errors
//! (unwritable state or report paths) exit non-zero.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use insider_monitor::config::Config;
use insider_monitor::fetch::HttpFetcher;
use insider_monitor::pipeline;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("insider_monitor=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = Config::from_env();
    let fetcher = match HttpFetcher::new(&cfg.user_agent, cfg.http_timeout_secs, cfg.http_retries)
    {
        Ok(f) => f,
        Err(e) => {
            tracing::error!(error = ?e, "could not build http client");
            std::process::exit(1);
        }
    };

    match pipeline::run_once(&cfg, &fetcher).await {
        Ok(summary) => {
            tracing::info!(
                new = summary.new_records,
                ranked = summary.ranked_lines,
                "done"
            );
        }
        Err(e) => {
            tracing::error!(error = ?e, "pipeline setup failure");
            std::process::exit(1);
        }
    }
}
