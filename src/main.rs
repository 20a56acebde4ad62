//! Lifecycle Demo
//!
//! Periodically looks up a rotating set of keys through a cached, deferred
//! lookup and logs cache statistics until interrupted.

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lifecycle_kit::runtime::TokioScheduler;
use lifecycle_kit::{CacheOptions, CachedLookup, Deferred, ExpiringCache, Janitor, Task};

const LOOKUP_INTERVAL: Duration = Duration::from_secs(2);
const PLAYER_COUNT: u64 = 5;

/// Main entry point for the demo.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load cache options from environment variables
/// 3. Create the expiring cache with a tokio-driven sweep
/// 4. Look up keys on an interval until SIGINT/SIGTERM
/// 5. Tear everything down through a janitor
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lifecycle_kit=info,lifecycle_demo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting lifecycle demo");

    let options = CacheOptions::from_env();
    info!(
        "Options loaded: default_ttl={}s, check_interval={}s, max_keys={}",
        options.default_ttl, options.check_interval, options.max_keys
    );

    let scheduler = TokioScheduler::current()?;
    let cache = Arc::new(ExpiringCache::<bool>::new(options, &scheduler)?);
    let lookup = CachedLookup::new(cache.clone(), check_ownership);

    let mut janitor = Janitor::new();
    let stats_cache = cache.clone();
    janitor.add_task(Task::from_callback(move || {
        let stats = stats_cache.stats();
        match serde_json::to_string(&stats) {
            Ok(json) => info!(hit_rate = stats.hit_rate(), "Final cache stats: {}", json),
            Err(e) => warn!("Could not encode cache stats: {}", e),
        }
    }));

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    let mut ticker = tokio::time::interval(LOOKUP_INTERVAL);
    let mut player = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let key = format!("player:{}", player % PLAYER_COUNT);
                player += 1;
                lookup
                    .get(&key)
                    .and_then(move |owned| {
                        info!(key = %key, owned, "Lookup settled");
                        owned
                    })
                    .catch(|e: &String| warn!("Lookup failed: {}", e));
            }
            _ = &mut shutdown => break,
        }
    }

    janitor.clean();
    drop(lookup);
    match Arc::try_unwrap(cache) {
        Ok(cache) => cache.destroy(),
        Err(_) => warn!("Cache still shared at shutdown; sweep stops when the last handle drops"),
    }

    info!("Demo shutdown complete");
    Ok(())
}

/// Stand-in for a slow external check; every third player owns the item.
fn check_ownership(key: &str) -> Deferred<bool, String> {
    let key = key.to_string();
    Deferred::new(move |resolve, _| {
        let id: u64 = key
            .rsplit(':')
            .next()
            .and_then(|id| id.parse().ok())
            .ok_or_else(|| format!("Malformed key: {}", key))?;
        resolve.resolve(id % 3 == 0);
        Ok(())
    })
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
