//! # Loyalty server
//! This crate hosts the HTTP front end of the loyalty points service. It is responsible for:
//! * Registering and authenticating users.
//! * Accepting order uploads and handing new orders to the reconciliation worker.
//! * Reporting order histories, balances and withdrawals, and letting users spend their points.
//! * Running the reconciliation worker, which polls the accrual service until each order reaches a final state.
//!
//! ## Configuration
//! The server is configured via environment variables, with command line flags as fallback. See
//! [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/user/register`, `/api/user/login`: Account creation and login. Both return an access token.
//! * `/api/user/orders`: Upload an order (POST) or list your orders (GET).
//! * `/api/user/balance`, `/api/user/balance/withdraw`, `/api/user/withdrawals`: Points balance and spending.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod reconciliation_worker;
pub mod routes;
pub mod server;
