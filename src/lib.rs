// Public API for integration tests and potential library usage

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod cors;
pub mod error;
pub mod files;
pub mod protocol;
pub mod router;
pub mod sse;
pub mod state;
