use tokio::time::{sleep, Duration};
use tracing::{error, info};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;

use ipv4_ticker::config::TickerConfig;

/// Formats log timestamps in the local timezone instead of UTC.
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = chrono::Local::now();
        write!(w, "{}", now.format("%Y-%m-%dT%H:%M:%S%.3f"))
    }
}

#[tokio::main]
async fn main() {
    // RUST_LOG controls the level; defaults to "info".
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_timer(LocalTimer)
        .init();

    // A missing or invalid config is fatal.
    let cfg = match TickerConfig::load() {
        Ok(c) => c,
        Err(e) => {
            error!("❌ Critical Error: Failed to load configuration: {}", e);
            return;
        }
    };

    loop {
        info!("🚀 Starting IPv4 marketplace ticker...");

        if let Err(e) = ipv4_ticker::run(&cfg).await {
            error!("⚠️ Ticker stopped: {}. Retrying in 5s...", e);
        }

        sleep(Duration::from_secs(5)).await;
    }
}
