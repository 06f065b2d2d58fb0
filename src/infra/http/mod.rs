//! HTTP adapter for the remote reading-notes API.

mod client;
mod error;

pub use client::ApiClient;
pub use error::ApiError;
