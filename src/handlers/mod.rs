//! HTTP handlers.

pub mod api;
pub use api::*;
