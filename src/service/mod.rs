//! Dispatch of API requests to storage operations.

pub mod cascade;
mod dispatch;
pub use cascade::{save_children, CascadeReport};
pub use dispatch::{Action, ApiRequest, Dispatcher};
