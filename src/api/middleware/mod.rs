pub mod auth;
pub mod rate_limiter;
pub mod request_logger;

pub use auth::{AuthUser, RefreshUser};
pub use rate_limiter::{rate_limit_middleware, RateLimiter};
pub use request_logger::{request_logger, RequestLog};
