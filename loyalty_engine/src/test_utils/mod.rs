//! Test fixtures: throwaway SQLite databases, an in-memory store with failure injection and a scripted accrual source.
mod memory_store;
mod scripted_source;

#[cfg(feature = "sqlite")]
pub mod prepare_env;

pub use memory_store::MemoryStore;
pub use scripted_source::ScriptedSource;
