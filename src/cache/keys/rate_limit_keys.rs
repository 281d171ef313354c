const RATE_LIMIT_PREFIX: &str = "rate_limit"; // 限流计数器键前缀

/// 生成限流计数器键，按（作用域, 客户端标识）区分
pub fn rate_limit_key(scope: &str, identity: &str) -> String {
    format!("{}:{}:{}", RATE_LIMIT_PREFIX, scope, identity)
}
