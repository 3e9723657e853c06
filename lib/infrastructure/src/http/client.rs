use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context as _;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest_middleware::ClientWithMiddleware;
use reqwest_tracing::TracingMiddleware;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    #[serde(alias = "get")]
    Get,
    #[serde(alias = "post")]
    Post,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    headers: HashMap<String, String>,
    verify_tls: bool,
    timeout: Duration,
}

impl HttpClientConfig {
    pub fn new(headers: HashMap<String, String>, verify_tls: bool, timeout: Duration) -> Self {
        Self {
            headers,
            verify_tls,
            timeout,
        }
    }

    pub fn new_tracing_client(&self) -> anyhow::Result<ClientWithMiddleware> {
        let mut headers = HeaderMap::new();

        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("Invalid HTTP header name {}", name))?;
            let value =
                HeaderValue::from_str(value).with_context(|| format!("Invalid value for HTTP header {}", name))?;
            headers.insert(name, value);
        }

        if !self.verify_tls {
            tracing::warn!("TLS certificate verification is disabled");
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(!self.verify_tls)
            .timeout(self.timeout)
            .build()?;

        Ok(reqwest_middleware::ClientBuilder::new(client)
            .with(TracingMiddleware::default())
            .build())
    }
}
