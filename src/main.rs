// src/main.rs
// =============================================================================
// Entry point of the station sampler daemon.
//
// What happens here:
// 1. Install the log subscriber (RUST_LOG, default: info for this crate)
// 2. Parse command-line arguments / environment into a SamplerConfig
// 3. Wire the pieces together: proxies -> fetcher -> transit site -> scheduler
// 4. Run one cycle (--once) or cycle forever
//
// Exit codes: 0 = --once cycle succeeded, 2 = bad configuration or the
// supervisor gave up (only possible with --max-cycle-failures).
// =============================================================================

mod cli;
mod config;
mod fetch;
mod sampler;
mod schedule;
mod sink;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cli::Cli;
use config::{ProxySource, SamplerConfig};
use fetch::{DirectConnection, HttpFetcher, Proxy, ProxyPoolService, ProxyProvider, StaticProxy};
use sampler::TransitSite;
use schedule::Scheduler;
use sink::JsonFileSink;

#[tokio::main]
async fn main() {
    init_logging();

    let exit_code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            error!("{:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("station_sampler=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn run() -> Result<()> {
    let config = SamplerConfig::from_cli(Cli::parse()).context("invalid configuration")?;
    let scheduler = build_scheduler(&config)?;

    if config.once {
        let report = scheduler.run_once().await?;
        info!(
            "Done: {} stations from {} lines",
            report.stations, report.lines
        );
        return Ok(());
    }

    scheduler.run_forever().await
}

fn build_proxies(config: &SamplerConfig) -> Result<Arc<dyn ProxyProvider>> {
    let provider: Arc<dyn ProxyProvider> = match &config.proxy {
        ProxySource::Direct => Arc::new(DirectConnection),
        ProxySource::Static(raw) => {
            let proxy = Proxy::parse(raw).context("invalid --proxy")?;
            info!("Routing requests through {}", proxy);
            Arc::new(StaticProxy::new(proxy))
        }
        ProxySource::Pool(pool) => {
            info!("Taking proxies from pool service {}", pool);
            Arc::new(
                ProxyPoolService::new(pool.as_str(), config.request_timeout)
                    .context("could not set up proxy pool client")?,
            )
        }
    };
    Ok(provider)
}

fn build_scheduler(config: &SamplerConfig) -> Result<Scheduler> {
    let fetcher = HttpFetcher::new(build_proxies(config)?, config.request_timeout)
        .context("could not build HTTP client")?;
    let site = Arc::new(TransitSite::new(fetcher, config.base_url.as_str()));
    let sink = Arc::new(JsonFileSink::new(config.output.clone()));

    info!(
        "Sampling {} with {} workers, writing to {}",
        config.base_url,
        config.cycle.pool.concurrency,
        config.output.display()
    );

    Ok(Scheduler::new(
        site.clone(),
        site,
        sink,
        config.cycle.clone(),
    ))
}
