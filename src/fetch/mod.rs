// src/fetch/mod.rs
// =============================================================================
// Everything that goes over the network.
//
// Submodules:
// - error: FetchError / ProxyError taxonomy
// - proxy: ProxyProvider trait and its three implementations
// - http: HttpFetcher, which turns a URL into a Document
// =============================================================================

mod error;
mod http;
mod proxy;

#[cfg(test)]
pub(crate) mod testing;

pub use error::FetchError;
pub use http::{Document, HttpFetcher};
pub use proxy::{DirectConnection, Proxy, ProxyPoolService, ProxyProvider, StaticProxy};
