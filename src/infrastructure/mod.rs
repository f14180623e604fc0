//! Infrastructure layer - store, cache and process plumbing

pub mod cache;
pub mod logging;
pub mod observability;
pub mod storage;
pub mod user;
