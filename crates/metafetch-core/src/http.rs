//! Network fetch collaborator.
//!
//! The pipeline and platform plugins never talk to `reqwest` directly; they
//! go through the [`HttpFetch`] trait so callers can inject their own client
//! (or a scripted one in tests). Redirects are never followed automatically:
//! meta identifiers rely on reading the `Location` header themselves.

use crate::{Config, Error, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderName, HeaderValue, LOCATION};
use reqwest::{Client, redirect};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8";
const ACCEPT_JSON: &str = "application/json, text/plain, */*";

/// What kind of document a request expects back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accept {
    /// A web page.
    Html,
    /// A JSON API response.
    Json,
}

impl Accept {
    const fn header_value(self) -> &'static str {
        match self {
            Self::Html => ACCEPT_HTML,
            Self::Json => ACCEPT_JSON,
        }
    }
}

/// A GET request issued by the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Absolute URL to fetch.
    pub url: String,
    /// Expected document kind.
    pub accept: Accept,
}

impl HttpRequest {
    /// Request a web page.
    pub fn html(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            accept: Accept::Html,
        }
    }

    /// Request a JSON document.
    pub fn json(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            accept: Accept::Json,
        }
    }
}

/// A fully read response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body decoded as text.
    pub body: String,
}

impl HttpResponse {
    /// Build a response with no headers.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// The raw `Location` header, if present and valid UTF-8.
    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }

    /// True for 3xx statuses.
    pub const fn is_redirect(&self) -> bool {
        self.status >= 300 && self.status < 400
    }

    /// Fail unless the status is exactly 200.
    pub fn ensure_ok(self, url: &str) -> Result<Self> {
        if self.status == 200 {
            Ok(self)
        } else {
            Err(Error::Status {
                status: self.status,
                url: url.to_string(),
            })
        }
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Network fetch primitive injected into the pipeline.
///
/// Implementations must not follow redirects and should enforce their own
/// deadlines; the core imposes none.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    /// Perform a GET request and read the whole body.
    async fn fetch(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// [`HttpFetch`] backed by a `reqwest` client.
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    /// Creates a fetcher from configuration (timeout and user agent).
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_options(config.timeout(), &config.user_agent)
    }

    /// Creates a fetcher with an explicit timeout and user agent.
    pub fn with_options(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .redirect(redirect::Policy::none())
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(Error::Network)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetcher {
    async fn fetch(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let response = self
            .client
            .get(&request.url)
            .header(ACCEPT, request.accept.header_value())
            .header(ACCEPT_LANGUAGE, "*")
            .send()
            .await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.text().await?;

        info!("Fetched {} bytes from {} ({})", body.len(), request.url, status);

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Perform one non-following request and return the absolute redirect target.
///
/// The `Location` header is resolved against `url`, so relative targets work.
/// Returns `None` when the response carries no `Location`.
pub async fn redirect_target(http: &dyn HttpFetch, url: &str) -> Result<Option<String>> {
    let response = http.fetch(&HttpRequest::html(url)).await?;
    let Some(location) = response.location() else {
        debug!(status = response.status, %url, "No redirect location");
        return Ok(None);
    };
    let target = Url::parse(url)?.join(location)?;
    debug!(%url, target = %target, "Redirect location");
    Ok(Some(target.into()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, headers, method, path},
    };

    fn fetcher() -> ReqwestFetcher {
        ReqwestFetcher::with_options(Duration::from_secs(5), "metafetch-test").unwrap()
    }

    #[tokio::test]
    async fn test_fetch_sends_accept_and_user_agent() -> anyhow::Result<()> {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .and(headers("accept", vec!["application/json", "text/plain", "*/*"]))
            .and(header("user-agent", "metafetch-test"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok":true}"#))
            .mount(&mock_server)
            .await;

        let response = fetcher()
            .fetch(&HttpRequest::json(format!("{}/api", mock_server.uri())))
            .await?;

        assert_eq!(response.status, 200);
        let value: serde_json::Value = response.json()?;
        assert_eq!(value["ok"], true);

        let received = mock_server.received_requests().await.unwrap();
        let accept = received[0].headers.get("accept").unwrap().to_str()?;
        assert_eq!(accept, ACCEPT_JSON);
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_does_not_follow_redirects() -> anyhow::Result<()> {
        // Given: A server answering with a redirect
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/short"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/long/page"))
            .mount(&mock_server)
            .await;
        let url = format!("{}/short", mock_server.uri());

        // When: Fetching it
        let client = fetcher();
        let response = client.fetch(&HttpRequest::html(&url)).await?;

        // Then: The 3xx is returned as-is
        assert_eq!(response.status, 302);
        assert!(response.is_redirect());
        assert_eq!(response.location(), Some("/long/page"));

        // And: redirect_target resolves the relative location
        let target = redirect_target(&client, &url).await?;
        assert_eq!(target, Some(format!("{}/long/page", mock_server.uri())));
        Ok(())
    }

    #[tokio::test]
    async fn test_redirect_target_without_location() -> anyhow::Result<()> {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("page"))
            .mount(&mock_server)
            .await;

        let target = redirect_target(&fetcher(), &mock_server.uri()).await?;
        assert_eq!(target, None);
        Ok(())
    }

    #[test]
    fn test_ensure_ok() {
        assert!(HttpResponse::new(200, "x").ensure_ok("u").is_ok());
        match HttpResponse::new(404, "").ensure_ok("https://example.com") {
            Err(Error::Status { status, url }) => {
                assert_eq!(status, 404);
                assert_eq!(url, "https://example.com");
            },
            other => panic!("Expected Status error, got {other:?}"),
        }
    }

    #[test]
    fn test_with_header_location() {
        let response = HttpResponse::new(301, "")
            .with_header(LOCATION, HeaderValue::from_static("https://example.com/x"));
        assert_eq!(response.location(), Some("https://example.com/x"));
    }
}
