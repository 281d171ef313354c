/// 缓存键模块
/// 提供各种缓存键生成函数

// 限流计数器键模块
pub mod rate_limit_keys;

// 响应缓存键模块
pub mod response_keys;

// 重新导出常用的键生成函数
pub use rate_limit_keys::rate_limit_key;
pub use response_keys::{namespace_version_key, request_fingerprint, response_cache_key};
