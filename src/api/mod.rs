//! HTTP surface: health endpoints and alert management

pub mod handlers;
pub mod server;

pub use handlers::{ApiError, AppState};
pub use server::{build_router, run_server, ServerConfig};
