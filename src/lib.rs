//! Recordgate: metadata-driven HTTP CRUD and search over registered record types.

pub mod case;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod migration;
pub mod response;
pub mod routes;
pub mod search;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use config::{load_schema_file, resolve, Registry, SchemaConfig, Settings, TypeDescriptor};
pub use error::{AppError, ConfigError, StoreError};
pub use migration::ensure_tables;
pub use response::{success_many, success_one, Outcome};
pub use routes::{api_routes, app, common_routes_with_ready};
pub use service::{Action, ApiRequest, Dispatcher};
pub use state::AppState;
pub use store::{ensure_database_exists, MemoryStore, PgStore, Store};
