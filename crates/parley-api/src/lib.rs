//! Parley API crate - axum HTTP server and route handlers.
//!
//! Exposes the chat turn pipeline over REST: starting a conversation,
//! posting a message, reading history and uploading documents to the
//! memory service.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{bind_address, create_router, start_server};
pub use state::AppState;
