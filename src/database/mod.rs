pub mod files;
pub mod messages;
pub mod redis_manager;
pub mod users;

pub use files::{FileStore, StoredFile};
pub use messages::{Message, MessageStore};
pub use redis_manager::RedisService;
pub use users::{User, UserStore};
