//! Marginalia: a reading-notes client with a query cache, mutation-driven
//! invalidation, debounced search and paged list sessions.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
