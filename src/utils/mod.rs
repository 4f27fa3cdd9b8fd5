// Start of file: /src/utils/mod.rs

/*
    * Re-exports for all utility modules like error handling,
    * response formats, input sanitizing and JSON helpers.
*/

pub mod app_error;
pub mod error_handler;
pub mod json;
pub mod response_handler;
pub mod sanitizer;

pub use app_error::AppError;
pub use response_handler::HandlerResponse;

// End of file: /src/utils/mod.rs
