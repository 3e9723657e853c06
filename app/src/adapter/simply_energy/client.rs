use derive_more::derive::{Display, Error, From};
use reqwest_middleware::ClientWithMiddleware;

use crate::port::UsageSource;
use crate::usage::UsageDocument;

use super::ResourceUrl;

#[derive(Debug, Display, Error, From)]
enum FetchError {
    #[display("request failed")]
    Transport(reqwest_middleware::Error),

    #[display("reading response body failed")]
    Body(reqwest::Error),

    #[display("response is not JSON")]
    MalformedResponse(serde_json::Error),
}

pub struct SimplyEnergyClient {
    client: ClientWithMiddleware,
    method: reqwest::Method,
    url: ResourceUrl,
}

impl SimplyEnergyClient {
    pub fn new(client: ClientWithMiddleware, method: reqwest::Method, url: ResourceUrl) -> Self {
        Self { client, method, url }
    }

    async fn request(&self, url: String) -> Result<UsageDocument, FetchError> {
        let response = self
            .client
            .request(self.method.clone(), url)
            .send()
            .await
            .map_err(without_url)?;
        let body = response.text().await.map_err(reqwest::Error::without_url)?;

        Ok(UsageDocument::new(serde_json::from_str(&body)?))
    }
}

impl UsageSource for SimplyEnergyClient {
    #[tracing::instrument(skip(self))]
    async fn fetch(&mut self, date: &str) -> Option<UsageDocument> {
        let redacted_url = self.url.redacted_for_date(date);
        tracing::info!("Updating from {}", redacted_url);

        match self.request(self.url.for_date(date)).await {
            Ok(document) => Some(document),
            Err(e @ FetchError::MalformedResponse(_)) => {
                tracing::warn!("Ignoring response of {}: {:?}", redacted_url, e);
                None
            }
            Err(e) => {
                tracing::error!("Error fetching data from {}: {:?}", redacted_url, e);
                None
            }
        }
    }
}

//the request URL carries the access token
fn without_url(e: reqwest_middleware::Error) -> reqwest_middleware::Error {
    match e {
        reqwest_middleware::Error::Reqwest(e) => reqwest_middleware::Error::Reqwest(e.without_url()),
        other => other,
    }
}
