use sha2::{Digest, Sha256};

const RESPONSE_CACHE_PREFIX: &str = "cache"; // 响应缓存键前缀
const NAMESPACE_VERSION_PREFIX: &str = "cache_version"; // 命名空间版本键前缀

/// 请求指纹：对（方法, 路径, 排序后的查询参数）做 SHA-256。
/// 查询参数按键再按值排序，参数顺序不同的等价请求命中同一条目。
pub fn request_fingerprint(method: &str, path: &str, query: Option<&str>) -> String {
    let mut pairs: Vec<&str> = query
        .unwrap_or("")
        .split('&')
        .filter(|p| !p.is_empty())
        .collect();
    pairs.sort_unstable();

    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(path.as_bytes());
    for pair in pairs {
        hasher.update(b"\n");
        hasher.update(pair.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// 生成响应缓存键，包含命名空间版本号：
/// 版本号递增即等价于按前缀批量失效，无需 KEYS 扫描
pub fn response_cache_key(namespace: &str, version: u64, fingerprint: &str) -> String {
    format!(
        "{}:{}:v{}:{}",
        RESPONSE_CACHE_PREFIX, namespace, version, fingerprint
    )
}

/// 生成命名空间版本键
pub fn namespace_version_key(namespace: &str) -> String {
    format!("{}:{}", NAMESPACE_VERSION_PREFIX, namespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reordered_query_params_share_a_fingerprint() {
        let a = request_fingerprint("GET", "/menu-items", Some("category=drinks&available=true"));
        let b = request_fingerprint("GET", "/menu-items", Some("available=true&category=drinks"));
        assert_eq!(a, b);
    }

    #[test]
    fn different_query_values_differ() {
        let a = request_fingerprint("GET", "/menu-items", Some("category=drinks"));
        let b = request_fingerprint("GET", "/menu-items", Some("category=desserts"));
        assert_ne!(a, b);
    }

    #[test]
    fn path_and_method_are_part_of_the_key() {
        let a = request_fingerprint("GET", "/menu-items", None);
        let b = request_fingerprint("GET", "/menu-items/abc", None);
        let c = request_fingerprint("HEAD", "/menu-items", None);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn missing_query_equals_empty_query() {
        let a = request_fingerprint("GET", "/menu-items", None);
        let b = request_fingerprint("GET", "/menu-items", Some(""));
        assert_eq!(a, b);
    }

    #[test]
    fn version_bump_changes_the_cache_key() {
        let fp = request_fingerprint("GET", "/menu-items", None);
        assert_ne!(
            response_cache_key("menu", 1, &fp),
            response_cache_key("menu", 2, &fp)
        );
    }
}
