//! API Module
//!
//! This module exposes the chain and the validation pool over HTTP.
//! Clients request validation, sign the challenge, then register a star.

mod error;
mod server;

pub use error::ApiError;
pub use server::{AppState, Server, router};
