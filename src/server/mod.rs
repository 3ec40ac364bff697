//! HTTP service
//!
//! Route table, handlers and the startup/shutdown wrapper around them.

mod router;
mod server;

pub use router::{AppState, ResourceCaches, create_router};
pub use server::Server;
