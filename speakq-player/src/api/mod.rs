//! REST API implementation
//!
//! HTTP control surface + SSE event stream for the player.

pub mod handlers;
pub mod server;
pub mod sse;
pub mod types;

pub use server::{create_router, AppContext};
