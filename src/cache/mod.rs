//! Cache Module - time-bucketed reuse of completed executions

pub mod key;
pub mod store;

pub use key::{CacheKey, CachePolicy};
pub use store::ResultCache;
