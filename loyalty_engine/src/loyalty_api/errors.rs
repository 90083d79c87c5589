use thiserror::Error;

use crate::{db_types::OrderNumber, traits::AccountApiError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderFlowError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("No order number was given")]
    EmptyOrderNumber,
    #[error("'{0}' is not a valid order number")]
    InvalidOrderNumber(String),
    #[error("Order {0} was uploaded by another user")]
    OwnedByAnotherUser(OrderNumber),
}

impl From<AccountApiError> for OrderFlowError {
    fn from(e: AccountApiError) -> Self {
        match e {
            AccountApiError::InvalidOrderNumber(n) => OrderFlowError::InvalidOrderNumber(n),
            e => OrderFlowError::DatabaseError(e.to_string()),
        }
    }
}
