use std::{sync::Arc, time::Duration};

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_LENGTH, RETRY_AFTER},
    Client,
    StatusCode,
};
use thiserror::Error;

use super::{AccrualOutcome, AccrualResponse, AccrualSource};
use crate::db_types::OrderNumber;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);
/// Used when a 429 response carries no usable `Retry-After` header.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Error)]
pub enum AccrualClientError {
    #[error("Could not initialize the accrual client: {0}")]
    Initialization(String),
}

#[derive(Debug, Clone)]
pub struct AccrualClientConfig {
    /// Base address of the accrual service, e.g. `http://localhost:8081`. A missing scheme defaults to `http://`.
    pub address: String,
    pub timeout: Duration,
    pub default_retry_after: Duration,
}

impl AccrualClientConfig {
    pub fn new(address: &str) -> Self {
        Self { address: address.to_string(), timeout: DEFAULT_REQUEST_TIMEOUT, default_retry_after: DEFAULT_RETRY_AFTER }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_default_retry_after(mut self, delay: Duration) -> Self {
        self.default_retry_after = delay;
        self
    }
}

/// HTTP client for the accrual service. Makes exactly one request per call and never retries on its own.
#[derive(Clone)]
pub struct AccrualClient {
    base_url: String,
    default_retry_after: Duration,
    client: Arc<Client>,
}

impl AccrualClient {
    pub fn new(config: AccrualClientConfig) -> Result<Self, AccrualClientError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| AccrualClientError::Initialization(e.to_string()))?;
        let base_url = normalize_address(&config.address)?;
        info!("💸️ Accrual client will query {base_url}");
        Ok(Self { base_url, default_retry_after: config.default_retry_after, client: Arc::new(client) })
    }

    pub fn url(&self, number: &OrderNumber) -> String {
        format!("{}/api/orders/{}", self.base_url, number.as_str())
    }

    fn retry_after(&self, headers: &HeaderMap) -> Duration {
        headers
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| {
                debug!("💸️ No usable Retry-After header. Using {:?}", self.default_retry_after);
                self.default_retry_after
            })
    }
}

impl AccrualSource for AccrualClient {
    async fn fetch_accrual(&self, number: &OrderNumber) -> AccrualOutcome {
        let url = self.url(number);
        trace!("💸️ Querying {url}");
        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => return AccrualOutcome::TransientFailure(format!("Request to {url} failed: {e}")),
        };
        match response.status() {
            StatusCode::OK => match response.json::<AccrualResponse>().await {
                Ok(body) if body.order == number.as_str() => AccrualOutcome::Success(body),
                Ok(body) => AccrualOutcome::TransientFailure(format!(
                    "Asked about order {number} but the response was about order #{}",
                    body.order
                )),
                Err(e) => AccrualOutcome::TransientFailure(format!("Malformed response body for {number}: {e}")),
            },
            StatusCode::NO_CONTENT => AccrualOutcome::NotYetKnown,
            StatusCode::TOO_MANY_REQUESTS => AccrualOutcome::RateLimited(self.retry_after(response.headers())),
            status => AccrualOutcome::TransientFailure(format!("Unexpected status {status} for {number}")),
        }
    }
}

fn normalize_address(address: &str) -> Result<String, AccrualClientError> {
    let address = address.trim().trim_end_matches('/');
    if address.is_empty() {
        return Err(AccrualClientError::Initialization("The accrual service address is empty".into()));
    }
    if address.starts_with("http://") || address.starts_with("https://") {
        Ok(address.to_string())
    } else {
        Ok(format!("http://{address}"))
    }
}
