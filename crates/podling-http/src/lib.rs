//! Podling HTTP - the worker's inbound API surface.
//!
//! This crate provides the thin axum handlers the master calls to dispatch
//! tasks and pods, query their status, and tail container logs. Handlers
//! parse and validate, then hand off to `podling_runtime::Agent`; the actual
//! work happens on a detached executor task.

pub mod error;
pub mod handlers;
pub mod response;
pub mod server;
pub mod state;
pub mod validation;

pub use error::{ApiError, Result};
pub use server::{ApiServer, Config};
pub use state::AppState;
