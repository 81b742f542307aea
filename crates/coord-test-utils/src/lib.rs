//! # Coordinator Test Utilities
//!
//! Shared test utilities for the Quorum meeting coordinator.
//!
//! This crate provides mock implementations and test fixtures for isolated
//! coordinator testing without a real conferencing engine or record store.
//!
//! ## Modules
//!
//! - `mock_engine` - Scriptable conferencing engine (records commands,
//!   replays events, injectable command failures)
//! - `memory_store` - In-memory meeting record store with broadcast change
//!   notifications and injectable duplicate delivery
//! - `fixtures` - Pre-configured test data (participants, records, config)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use coord_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let engine = MockEngine::new();
//!     let store = MemoryStore::new();
//!     store.seed_record(fixtures::hosted_meeting("m-1", "host-token"));
//!
//!     engine.join_as("p1", "Alice");
//!
//!     // Run your test...
//! }
//! ```

pub mod fixtures;
pub mod memory_store;
pub mod mock_engine;

pub use memory_store::MemoryStore;
pub use mock_engine::MockEngine;

/// Initialize tracing for a test binary. Safe to call repeatedly.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}
