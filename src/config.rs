// src/config.rs
// =============================================================================
// Runtime configuration, independent of how it was supplied.
//
// main.rs builds a SamplerConfig from the parsed Cli; everything below main
// only ever sees SamplerConfig (and the settings structs inside it).
// Default carries the production values.
// =============================================================================

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;
use url::Url;

use crate::cli::Cli;
use crate::sampler::PoolSettings;
use crate::schedule::{CycleSettings, RetryPolicy};

/// Where request traffic leaves from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxySource {
    Direct,
    /// One fixed proxy URL
    Static(String),
    /// Base URL of a proxy pool service
    Pool(String),
}

#[derive(Debug, Clone)]
pub struct SamplerConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub output: PathBuf,
    pub proxy: ProxySource,
    pub cycle: CycleSettings,
    pub once: bool,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://online.nsmart.rs/sr".to_string(),
            request_timeout: Duration::from_secs(16),
            output: PathBuf::from("./scraped-data/sampled-stations.json"),
            proxy: ProxySource::Direct,
            cycle: CycleSettings::default(),
            once: false,
        }
    }
}

impl SamplerConfig {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let proxy = match (cli.proxy, cli.proxy_pool) {
            (Some(_), Some(_)) => bail!("--proxy and --proxy-pool are mutually exclusive"),
            (Some(proxy), None) => ProxySource::Static(proxy),
            (None, Some(pool)) => ProxySource::Pool(pool),
            (None, None) => ProxySource::Direct,
        };

        let retry_delay = Duration::from_millis(cli.retry_delay_ms);
        let config = Self {
            base_url: cli.base_url,
            request_timeout: Duration::from_secs(cli.timeout_secs),
            output: cli.output,
            proxy,
            cycle: CycleSettings {
                enumeration_retry: RetryPolicy::forever(retry_delay)
                    .with_max_attempts(cli.max_enumeration_attempts),
                supervisor: RetryPolicy::forever(retry_delay)
                    .with_max_attempts(cli.max_cycle_failures)
                    .logged_at(Level::ERROR),
                interval: Duration::from_secs(cli.interval_secs),
                pool: PoolSettings {
                    concurrency: cli.concurrency,
                    attempt_delay: Duration::from_millis(cli.attempt_delay_ms),
                    stagger: Duration::from_millis(cli.stagger_ms),
                    max_line_attempts: cli.max_line_attempts,
                },
            },
            once: cli.once,
        };

        config.validate()?;
        Ok(config)
    }

    /// Rejects settings that would make the sampler useless or stuck.
    pub fn validate(&self) -> Result<()> {
        let base = Url::parse(&self.base_url)
            .with_context(|| format!("invalid base URL '{}'", self.base_url))?;
        if !matches!(base.scheme(), "http" | "https") {
            bail!("base URL must be http(s), got '{}'", self.base_url);
        }

        if self.cycle.pool.concurrency == 0 {
            bail!("concurrency must be > 0");
        }
        if self.request_timeout.is_zero() {
            bail!("request timeout must be > 0");
        }

        let caps = [
            ("max-enumeration-attempts", self.cycle.enumeration_retry.max_attempts),
            ("max-cycle-failures", self.cycle.supervisor.max_attempts),
            ("max-line-attempts", self.cycle.pool.max_line_attempts),
        ];
        for (name, cap) in caps {
            if cap == Some(0) {
                bail!("{} must be > 0 when set", name);
            }
        }

        if let ProxySource::Pool(pool) = &self.proxy {
            Url::parse(pool).with_context(|| format!("invalid proxy pool URL '{}'", pool))?;
        }

        Ok(())
    }
}
