//! SQLite storage backend for the loyalty engine.
//!
//! The schema lives in `migrations/` and is embedded in the binary. Call [`SqliteDatabase::run_migrations`] once at
//! start-up.
mod errors;
mod sqlite_impl;

pub mod db;
pub use errors::SqliteDatabaseError;
pub use sqlite_impl::SqliteDatabase;
