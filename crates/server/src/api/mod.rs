pub mod handlers;
pub mod history;
pub mod indexers;
pub mod routes;
pub mod search;

pub use routes::create_router;
