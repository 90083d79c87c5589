//! Loyalty Engine
//!
//! The loyalty engine tracks the orders users upload, asks an external accrual service how many points each order is
//! worth, and keeps every user's points balance. It is independent of any HTTP framework.
//!
//! The library is divided into three main sections:
//! 1. Storage ([`traits`] and, with the `sqlite` feature, [`SqliteDatabase`]). The data types stored are defined in
//!    [`db_types`] and are public.
//! 2. Order reconciliation ([`mod@accrual`]). The pending order queue, the accrual service client, the rate-limit
//!    backoff and the worker that drives every order to a final state and credits the points it earns.
//! 3. The public API ([`OrderFlowApi`], [`AccountApi`], [`AuthApi`]). Request handlers should go through these rather
//!    than the storage traits.
pub mod accrual;
pub mod db_types;
mod loyalty_api;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use loyalty_api::{
    accounts_api::AccountApi,
    auth_api::AuthApi,
    errors::OrderFlowError,
    order_flow_api::{OrderFlowApi, UploadResult},
};
