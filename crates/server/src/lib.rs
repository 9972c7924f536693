//! HTTP server for the dragnet search aggregator.
//!
//! Exposes the search, indexer, history, and config APIs over Axum.
//! The library surface exists so integration tests can assemble the
//! router in-process; the `dragnet` binary wires it to a real config.

pub mod api;
pub mod metrics;
pub mod state;

pub use api::create_router;
pub use state::AppState;
