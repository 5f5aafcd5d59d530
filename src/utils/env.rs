/// Get environment variable with KVSESSION_ prefix, falling back to unprefixed version
///
/// Checks `KVSESSION_{key}` first, then `{key}`, so deployments can either
/// namespace their variables or reuse existing ones such as `REDIS_URL`.
pub fn get_env_with_prefix(key: &str) -> Option<String> {
    std::env::var(format!("KVSESSION_{}", key))
        .or_else(|_| std::env::var(key))
        .ok()
}

/// Parse a boolean flag from the environment, keeping `current` when unset or invalid
pub(crate) fn env_flag(key: &str, current: bool) -> bool {
    get_env_with_prefix(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(current)
}
