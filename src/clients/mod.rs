/// Upstream feed clients
use crate::errors::{ApiError, ApiResult};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// HTTP client wrapper with common configuration
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new() -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("hazard-feed-service/1.0")
            .build()?;
        Ok(Self { client })
    }

    pub fn get_client(&self) -> &Client {
        &self.client
    }
}

/// NASA EONET v3 client
pub struct EonetClient {
    http_client: HttpClient,
    base_url: String,
    limit: u32,
}

impl EonetClient {
    pub fn new(base_url: String, limit: u32) -> ApiResult<Self> {
        Ok(Self {
            http_client: HttpClient::new()?,
            base_url,
            limit,
        })
    }

    /// Fetch the event list, optionally filtered by category and date range
    pub async fn fetch_events(
        &self,
        category: Option<&str>,
        start: Option<&str>,
        end: Option<&str>,
    ) -> ApiResult<Value> {
        let mut req = self
            .http_client
            .get_client()
            .get(&self.base_url)
            .query(&[("limit", self.limit.to_string())]);

        if let Some(category) = category {
            req = req.query(&[("category", category)]);
        }
        if let Some(start) = start {
            req = req.query(&[("start", start)]);
        }
        if let Some(end) = end {
            req = req.query(&[("end", end)]);
        }

        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(ApiError::UpstreamUnavailable(format!(
                "EONET list request failed with status {}",
                resp.status()
            )));
        }

        let json = resp.json().await?;
        Ok(json)
    }

    /// Fetch a single event by id
    pub async fn fetch_event(&self, id: &str) -> ApiResult<Value> {
        let url = format!("{}/{}", self.base_url, id);
        let resp = self.http_client.get_client().get(&url).send().await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(format!("event {id}")));
        }
        if !resp.status().is_success() {
            return Err(ApiError::UpstreamUnavailable(format!(
                "EONET event request failed with status {}",
                resp.status()
            )));
        }

        let json = resp.json().await?;
        Ok(json)
    }
}
