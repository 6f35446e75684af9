//! HTTP transport over reqwest
//!
//! Rewrites the request target to the chosen host and leaves method, path,
//! query and headers as the caller built them.

use async_trait::async_trait;
use hostpool_core::config::HttpConfig;
use hostpool_core::routing::{Host, Transport};
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, Response};

/// Caller-side description of an HTTP request, without a target host
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    /// Path and query, e.g. `/search?q=x`
    pub path: String,
    pub headers: HeaderMap,
}

impl HttpRequest {
    /// A GET request for `path`
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            headers: HeaderMap::new(),
        }
    }

    /// Full URL of this request against `host`
    pub fn url_for(&self, scheme: &str, host: &Host) -> String {
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        format!("{}://{}{}", scheme, host, path)
    }
}

/// [`Transport`] that sends requests with a shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    scheme: String,
}

impl HttpTransport {
    /// Build a transport from configuration
    pub fn from_config(config: &HttpConfig) -> anyhow::Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            scheme: config.scheme.clone(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    type Request = HttpRequest;
    type Response = Response;
    type Error = reqwest::Error;

    async fn send(&self, request: HttpRequest, host: &Host) -> Result<Response, reqwest::Error> {
        let url = request.url_for(&self.scheme, host);
        self.client
            .request(request.method, url)
            .headers(request.headers)
            .send()
            .await
    }

    fn is_success(&self, response: &Response) -> bool {
        response.status().is_success()
    }
}
