//! The search router and dispatch engine.
//!
//! [`SearchService`] turns an inbound request into typed criteria,
//! selects the target indexers, fans the query out concurrently and
//! merges whatever comes back. A failing indexer never fails the
//! search, it just contributes nothing.

mod criteria;
mod request;
mod service;

pub use criteria::*;
pub use request::*;
pub use service::*;

use serde::Serialize;
use thiserror::Error;

use crate::indexers::Release;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Invalid category: {0}")]
    InvalidCategory(String),
}

/// The merged outcome of a search across all queried indexers.
#[derive(Debug, Default, Serialize)]
pub struct SearchResults {
    pub releases: Vec<Release>,
}
