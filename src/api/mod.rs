// Route groups mounted by the application router

pub mod auth;
pub mod chat;
pub mod file;
pub mod home;
pub mod logs;
pub mod middleware;
pub mod ml_threats;
pub mod token;
