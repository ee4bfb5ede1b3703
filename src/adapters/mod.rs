pub mod broker;
pub mod memory;
pub mod postgres;
pub mod redis_cache;
pub mod traits;

pub use broker::{DeadLetter, InProcessBroker};
pub use memory::{MemoryBalanceCache, MemoryStore};
pub use postgres::PostgresStore;
pub use redis_cache::RedisBalanceCache;
pub use traits::{
    BalanceCache, EventPublisher, MessageHandler, PensionPlanRepository, UserRepository,
    WithdrawalRepository,
};
