// src/fetch/http.rs
// =============================================================================
// This module turns a URL into a queryable HTML document.
//
// Each fetch:
// 1. Asks the ProxyProvider for a proxy for this one attempt
// 2. Sends a GET (through that proxy, with a timeout)
// 3. Treats anything but 2xx as a failure
// 4. Retires the proxy if the attempt failed at the transport level
//
// The body is kept as text inside a Document; the DOM is only built when
// somebody queries it. scraper's Html is not Send, so it must never live
// across an .await inside a spawned worker.
// =============================================================================

use reqwest::Client;
use scraper::{Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::error::{FetchError, ProxyError};
use super::proxy::{Proxy, ProxyProvider};

// Upstream serves a stripped page (or nothing) to obvious bots
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36";

/// A fetched HTML page.
#[derive(Debug, Clone)]
pub struct Document {
    url: String,
    html: String,
}

impl Document {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the `id` attribute of every element matching `selector`,
    /// in document order. Elements without an id yield None.
    pub fn element_ids(&self, selector: &str) -> Result<Vec<Option<String>>, FetchError> {
        let selector = Selector::parse(selector)
            .map_err(|e| FetchError::parse(format!("invalid selector '{}': {:?}", selector, e)))?;

        let document = Html::parse_document(&self.html);
        Ok(document
            .select(&selector)
            .map(|element| element.value().id().map(str::to_string))
            .collect())
    }
}

/// Fetches pages through whatever proxies the provider hands out.
#[derive(Clone)]
pub struct HttpFetcher {
    proxies: Arc<dyn ProxyProvider>,
    timeout: Duration,
    direct: Client,
}

impl HttpFetcher {
    pub fn new(proxies: Arc<dyn ProxyProvider>, timeout: Duration) -> Result<Self, FetchError> {
        let direct = Self::builder(timeout)
            .no_proxy()
            .build()
            .map_err(|source| FetchError::Transport {
                url: String::new(),
                source,
            })?;

        Ok(Self {
            proxies,
            timeout,
            direct,
        })
    }

    fn builder(timeout: Duration) -> reqwest::ClientBuilder {
        Client::builder().timeout(timeout).user_agent(USER_AGENT)
    }

    // reqwest binds proxies per client, so a proxied attempt gets its own
    fn client_for(&self, url: &str, proxy: Option<&Proxy>) -> Result<Client, FetchError> {
        let Some(proxy) = proxy else {
            return Ok(self.direct.clone());
        };

        let route = reqwest::Proxy::all(proxy.as_url()).map_err(|e| ProxyError::Invalid {
            proxy: proxy.to_string(),
            message: e.to_string(),
        })?;

        Self::builder(self.timeout)
            .proxy(route)
            .build()
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })
    }

    /// Fetches `url` and returns its HTML as a Document.
    pub async fn fetch_document(&self, url: &str) -> Result<Document, FetchError> {
        let proxy = self.proxies.acquire().await?;
        let result = self.get(url, proxy.as_ref()).await;

        if let (Err(e), Some(proxy)) = (&result, &proxy) {
            if e.is_transport() {
                debug!("Proxy {} blew on {}: {}", proxy, url, e);
                self.proxies.retire(proxy).await;
            }
        }

        result
    }

    async fn get(&self, url: &str, proxy: Option<&Proxy>) -> Result<Document, FetchError> {
        let client = self.client_for(url, proxy)?;

        let transport = |source: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            source,
        };

        let response = client.get(url).send().await.map_err(transport)?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let html = response.text().await.map_err(transport)?;
        Ok(Document::new(url, html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::proxy::DirectConnection;
    use crate::fetch::testing::FakeServer;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Hands out one fixed proxy and remembers every retirement.
    struct RecordingProxy {
        proxy: Proxy,
        retired: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ProxyProvider for RecordingProxy {
        async fn acquire(&self) -> Result<Option<Proxy>, ProxyError> {
            Ok(Some(self.proxy.clone()))
        }

        async fn retire(&self, proxy: &Proxy) {
            self.retired.lock().unwrap().push(proxy.endpoint());
        }
    }

    fn recording(server: &FakeServer) -> Arc<RecordingProxy> {
        Arc::new(RecordingProxy {
            proxy: Proxy::parse(&server.base_url()).unwrap(),
            retired: Mutex::new(Vec::new()),
        })
    }

    #[test]
    fn test_element_ids_in_document_order() {
        let doc = Document::new(
            "http://online.test",
            r#"<ul><li class="s" id="station_1">a</li><li class="s">b</li><li class="s" id="station_2">c</li></ul>"#,
        );
        let ids = doc.element_ids(".s").unwrap();
        assert_eq!(
            ids,
            vec![Some("station_1".to_string()), None, Some("station_2".to_string())]
        );
    }

    #[test]
    fn test_element_ids_bad_selector() {
        let doc = Document::new("http://online.test", "<p></p>");
        assert!(matches!(doc.element_ids("<<<"), Err(FetchError::Parse(_))));
    }

    #[tokio::test]
    async fn test_fetch_through_proxy() {
        let server = FakeServer::start(vec![(200, "<p id=\"x_1\">ok</p>".to_string())]).await;
        let proxies = recording(&server);
        let fetcher = HttpFetcher::new(proxies.clone(), Duration::from_secs(5)).unwrap();

        let doc = fetcher
            .fetch_document("http://online.test/sr/prikaz-svih-linija")
            .await
            .unwrap();

        assert_eq!(doc.element_ids("p").unwrap(), vec![Some("x_1".to_string())]);
        // The proxy sees the absolute target URL in the request line
        assert!(server.requests()[0].starts_with("GET http://online.test/sr/prikaz-svih-linija"));
        assert!(proxies.retired.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_error_status_retires_proxy() {
        let server = FakeServer::start(vec![(403, "blocked".to_string())]).await;
        let proxies = recording(&server);
        let fetcher = HttpFetcher::new(proxies.clone(), Duration::from_secs(5)).unwrap();

        let err = fetcher
            .fetch_document("http://online.test/sr/line_details/3A")
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 403, .. }));
        assert_eq!(proxies.retired.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_direct_fetch() {
        let server = FakeServer::start(vec![(200, "<html></html>".to_string())]).await;
        let fetcher = HttpFetcher::new(Arc::new(DirectConnection), Duration::from_secs(5)).unwrap();

        let url = format!("{}/sr/line_details/3A", server.base_url());
        let doc = fetcher.fetch_document(&url).await.unwrap();
        assert_eq!(doc.url(), url);
        assert!(server.requests()[0].starts_with("GET /sr/line_details/3A"));
    }

    #[tokio::test]
    async fn test_unreachable_is_transport_error() {
        // Bind then drop to get a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = HttpFetcher::new(Arc::new(DirectConnection), Duration::from_secs(2)).unwrap();
        let err = fetcher
            .fetch_document(&format!("http://{}/", addr))
            .await
            .unwrap_err();
        assert!(err.is_transport());
        assert!(matches!(err, FetchError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        // Accepts the connection and never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let fetcher =
            HttpFetcher::new(Arc::new(DirectConnection), Duration::from_millis(200)).unwrap();
        let err = fetcher
            .fetch_document(&format!("http://{}/", addr))
            .await
            .unwrap_err();

        assert!(err.is_transport());
        assert_eq!(err.kind(), "timeout");
        server.abort();
    }
}
