//! A line-oriented multi-user chat server.
//!
//! Clients register a unique username, then exchange chat lines and
//! `/`-commands. A single broadcaster task fans every notice out to all
//! registered sessions in one global order.

pub mod broadcast;
pub mod command;
pub mod config;
pub mod connection;
pub mod error;
pub mod message;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod types;

pub use config::{Args, ServerConfig};
pub use error::ChatError;
pub use server::Server;
