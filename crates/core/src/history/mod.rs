//! Persistent record of every indexer query dispatched.
//!
//! Events flow from the dispatcher through a channel to a background
//! writer, which persists them via a [`HistoryStore`].

mod events;
mod handle;
mod sqlite;
mod store;
mod writer;

pub use events::*;
pub use handle::*;
pub use sqlite::*;
pub use store::*;
pub use writer::*;
