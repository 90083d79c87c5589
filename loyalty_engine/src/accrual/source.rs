use std::{fmt::Display, time::Duration};

use loyalty_common::Points;
use serde::{Deserialize, Serialize};

use crate::db_types::OrderNumber;

/// Order status as reported by the accrual service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RemoteStatus {
    Registered,
    Processing,
    Invalid,
    Processed,
}

impl Display for RemoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteStatus::Registered => write!(f, "REGISTERED"),
            RemoteStatus::Processing => write!(f, "PROCESSING"),
            RemoteStatus::Invalid => write!(f, "INVALID"),
            RemoteStatus::Processed => write!(f, "PROCESSED"),
        }
    }
}

/// The body of a successful accrual service response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccrualResponse {
    pub order: String,
    pub status: RemoteStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accrual: Option<Points>,
}

impl AccrualResponse {
    pub fn new(order: &OrderNumber, status: RemoteStatus, accrual: Option<Points>) -> Self {
        Self { order: order.as_str().to_string(), status, accrual }
    }
}

/// What a single query to the accrual service told us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccrualOutcome {
    /// The service knows the order and reported its status.
    Success(AccrualResponse),
    /// The service has not registered the order yet.
    NotYetKnown,
    /// Too many requests. No request should be made for at least the given time.
    RateLimited(Duration),
    /// Network errors, timeouts, unexpected status codes and malformed bodies.
    TransientFailure(String),
}

/// Anything that can answer "what is the accrual status of this order?".
///
/// [`AccrualClient`](super::AccrualClient) is the production implementation.
#[allow(async_fn_in_trait)]
pub trait AccrualSource {
    async fn fetch_accrual(&self, number: &OrderNumber) -> AccrualOutcome;
}
