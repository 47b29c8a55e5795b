// src/fetch/error.rs
// =============================================================================
// Error types for everything that talks to the network.
//
// FetchError is the per-item taxonomy the worker pool sees:
// - Transport: the request never produced a response (network, timeout, proxy)
// - Status: a response came back but it was not 2xx
// - Parse: the page came back but its structure was not what we expected
// - NotFound: the structure was there but held no terminal station
//
// The pool treats all four the same way (put the line back in the queue);
// the distinction only matters for logging and for callers that want it.
// =============================================================================

use thiserror::Error;

use crate::sampler::LineId;

/// Failure to obtain or retire an egress proxy.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The proxy pool service could not be reached or answered badly
    #[error("proxy pool request failed: {0}")]
    Pool(#[from] reqwest::Error),

    /// The proxy descriptor could not be turned into a usable proxy URL
    #[error("invalid proxy '{proxy}': {message}")]
    Invalid { proxy: String, message: String },
}

/// Failure to fetch or interpret one page.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network error, timeout, or client construction failure
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// No proxy could be acquired for the attempt
    #[error("no proxy available: {0}")]
    Proxy(#[from] ProxyError),

    /// Upstream answered with a non-success status code
    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    /// Expected DOM structure absent or malformed
    #[error("unexpected page structure: {0}")]
    Parse(String),

    /// Page parsed fine but no terminal station could be found
    #[error("no terminal station listed for line {0}")]
    NotFound(LineId),
}

impl FetchError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// True for failures that happened before a usable page existed.
    ///
    /// These are the ones that justify retiring the proxy that was used.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            FetchError::Transport { .. } | FetchError::Proxy(_) | FetchError::Status { .. }
        )
    }

    /// Short label for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Transport { source, .. } if source.is_timeout() => "timeout",
            FetchError::Transport { .. } => "transport",
            FetchError::Proxy(_) => "proxy",
            FetchError::Status { .. } => "status",
            FetchError::Parse(_) => "parse",
            FetchError::NotFound(_) => "not-found",
        }
    }
}
