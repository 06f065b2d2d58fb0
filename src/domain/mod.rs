//! Domain layer types shared by the cache, the API client and the front-end.

pub mod entities;
pub mod types;
