//! #  Storage backend contracts
//!
//! This module defines the behaviour that a storage backend must expose in order to be used by the loyalty engine.
//!
//! * [`AccrualStore`] is the narrow interface the reconciliation worker needs: reading an order back, persisting status
//!   transitions and crediting the balance ledger.
//! * [`AccountManagement`] covers the user-facing side of the ledger: uploading orders, balances and withdrawals.
//! * [`AuthManagement`] stores user credentials.
//!
//! Each trait has its own error type. Backends convert their driver errors into these.
mod account_management;
mod accrual_store;
mod auth_management;

mod data_objects;

pub use account_management::{AccountApiError, AccountManagement};
pub use accrual_store::{AccrualStore, AccrualStoreError};
pub use auth_management::{AuthApiError, AuthManagement};
pub use data_objects::{InsertOrderResult, SettleResult};
