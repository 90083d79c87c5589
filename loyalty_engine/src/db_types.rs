use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use loyalty_common::{helpers::luhn_valid, Points};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------     OrderNumber       ---------------------------------------------------------
/// An order number as submitted by a user. Order numbers are strings of ASCII digits that pass the Luhn check.
///
/// The only way to obtain an `OrderNumber` from untrusted input is via [`OrderNumber::parse`] (or `FromStr`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderNumber(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{0}' is not a valid order number")]
pub struct InvalidOrderNumber(pub String);

impl OrderNumber {
    pub fn parse(value: &str) -> Result<Self, InvalidOrderNumber> {
        if luhn_valid(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(InvalidOrderNumber(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderNumber {
    type Err = InvalidOrderNumber;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
/// Order lifecycle. `New -> Processing -> {Invalid | Processed}`. `Invalid` and `Processed` are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatusType {
    /// The order has been uploaded and the accrual system has not reported on it yet.
    New,
    /// The accrual system knows about the order but has not finished calculating the reward.
    Processing,
    /// The accrual system refused to award points for this order.
    Invalid,
    /// The reward has been calculated and credited to the owner's balance.
    Processed,
}

impl OrderStatusType {
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Invalid | Self::Processed)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::New => write!(f, "NEW"),
            OrderStatusType::Processing => write!(f, "PROCESSING"),
            OrderStatusType::Invalid => write!(f, "INVALID"),
            OrderStatusType::Processed => write!(f, "PROCESSED"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "PROCESSING" => Ok(Self::Processing),
            "INVALID" => Ok(Self::Invalid),
            "PROCESSED" => Ok(Self::Processed),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to NEW");
            OrderStatusType::New
        })
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Order {
    pub number: OrderNumber,
    pub user_id: i64,
    #[sqlx(try_from = "String")]
    pub status: OrderStatusType,
    /// Points awarded for the order. Only meaningful once the order is `Processed`.
    pub accrual: Points,
    pub uploaded_at: DateTime<Utc>,
}

//--------------------------------------       NewOrder        ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub number: OrderNumber,
    pub user_id: i64,
    pub uploaded_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn new(number: OrderNumber, user_id: i64) -> Self {
        Self { number, user_id, uploaded_at: Utc::now() }
    }
}

//--------------------------------------       Balance         ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow)]
pub struct Balance {
    pub user_id: i64,
    /// Points available to spend.
    #[sqlx(rename = "current_balance")]
    pub current: Points,
    /// Lifetime total of points spent.
    #[sqlx(rename = "total_withdrawn")]
    pub withdrawn: Points,
}

impl Balance {
    pub fn empty(user_id: i64) -> Self {
        Self { user_id, ..Default::default() }
    }
}

//--------------------------------------      Withdrawal       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Withdrawal {
    pub user_id: i64,
    #[sqlx(rename = "order_number")]
    pub order: OrderNumber,
    pub sum: Points,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewWithdrawal {
    pub user_id: i64,
    pub order: OrderNumber,
    pub sum: Points,
}

impl NewWithdrawal {
    pub fn new(user_id: i64, order: OrderNumber, sum: Points) -> Self {
        Self { user_id, order, sum }
    }
}

//--------------------------------------     UserAccount       ---------------------------------------------------------
#[derive(Debug, Clone, FromRow)]
pub struct UserAccount {
    pub id: i64,
    pub login: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn order_numbers_must_pass_luhn() {
        assert!(OrderNumber::parse("12345678903").is_ok());
        assert_eq!(OrderNumber::parse("12345678901"), Err(InvalidOrderNumber("12345678901".into())));
        assert!("abc".parse::<OrderNumber>().is_err());
        assert_eq!(OrderNumber::parse("9278923470").unwrap().to_string(), "#9278923470");
    }

    #[test]
    fn status_strings() {
        for status in [
            OrderStatusType::New,
            OrderStatusType::Processing,
            OrderStatusType::Invalid,
            OrderStatusType::Processed,
        ] {
            assert_eq!(status.to_string().parse::<OrderStatusType>().unwrap(), status);
            assert_eq!(serde_json::to_string(&status).unwrap(), format!("\"{status}\""));
        }
        assert!(OrderStatusType::Processed.is_final());
        assert!(OrderStatusType::Invalid.is_final());
        assert!(!OrderStatusType::Processing.is_final());
        assert_eq!(OrderStatusType::from("bogus".to_string()), OrderStatusType::New);
    }
}
