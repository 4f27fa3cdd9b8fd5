// Library root: route groups, middleware and the application bootstrap

pub mod api;
pub mod config;
pub mod core;
pub mod database;
pub mod security;
pub mod utils;

pub use crate::config::environment::EnvironmentVariables;
pub use crate::config::state::AppState;
pub use crate::core::server::{create_app, ensure_directories, run};
