/// Get environment variable with STOCKROOM_ prefix, falling back to unprefixed version
///
/// Checks `STOCKROOM_{key}` first, then `{key}`, so platform-provided variables
/// such as `PORT` or `DATABASE_URL` work without renaming.
///
/// # Examples
///
/// ```rust
/// use stockroom::utils::get_env_with_prefix;
///
/// // Checks STOCKROOM_PORT first, then PORT
/// let port = get_env_with_prefix("PORT");
/// ```
pub fn get_env_with_prefix(key: &str) -> Option<String> {
    std::env::var(format!("STOCKROOM_{}", key))
        .or_else(|_| std::env::var(key))
        .ok()
}
