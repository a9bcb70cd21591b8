//! Parley storage crate - SQLite persistence for the chat log.
//!
//! Provides a WAL-mode SQLite database with migrations and a repository
//! for append-only, per-conversation ordered chat messages.

pub mod db;
pub mod migrations;
pub mod repository;

pub use db::Database;
pub use repository::MessageRepository;
