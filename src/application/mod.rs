//! Application services: the sync facade and the list/search state machines
//! that drive it.

pub mod error;
pub mod pagination;
pub mod search;
pub mod session;
pub mod sync;
