//! Web admin panel
//!
//! The HTTP face of the lifecycle manager: a roster page, one form post per
//! lifecycle operation, and a live view of the service logs.

mod admin;
mod server;

pub use server::{start_web_server, WebServerConfig};
