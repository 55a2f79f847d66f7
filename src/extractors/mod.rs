//! Request extractors.

pub mod route;
pub use route::{ApiRoute, PathShape, Verb};
