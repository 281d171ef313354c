// 缓存模块
// 包含限流计数器与响应缓存的数据结构和操作逻辑

pub mod keys;
pub mod models;
pub mod operations;

// 重新导出常用类型和函数，方便其他模块使用
pub use models::rate_limit::{RateLimitDecision, RateLimitRejection};
pub use models::response::CachedResponse;
pub use operations::{
    CounterStore, RedisCounterStore, RedisResponseCache, ResponseCacheStore, StoreError,
};
