//! # Loyalty engine public API
//!
//! The `loyalty_api` module exposes the programmatic API of the loyalty engine. Each API wraps a storage backend that
//! implements the traits it needs, so callers never talk to the database directly.
//!
//! * [`order_flow_api`] accepts order uploads and hands new orders to the reconciliation queue.
//! * [`accounts_api`] gives access to order histories, balances and withdrawals.
//! * [`auth_api`] registers users and checks their credentials.
//!
//! ```rust,ignore
//! use loyalty_engine::{AccountApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let api = AccountApi::new(db);
//! let balance = api.balance(user_id).await?;
//! ```
pub mod accounts_api;
pub mod auth_api;
pub mod errors;
pub mod order_flow_api;
