//! Small string helpers shared by config, repository and the backends.

/// Trim optional text, mapping blank values to `None`.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

pub fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Join a project base URL with a service path such as `/rest/v1`.
///
/// Accepts the base with or without the path already present. Returns
/// `None` when the base is not an http(s) URL.
pub fn service_endpoint(base: &str, path: &str) -> Option<String> {
    let trimmed = base.trim().trim_end_matches('/');
    if !is_http_url(trimmed) {
        return None;
    }
    if trimmed.ends_with(path) {
        Some(trimmed.to_string())
    } else {
        Some(format!("{trimmed}{path}"))
    }
}

/// Shorten a response body for inclusion in an error message.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}

/// Case-insensitive substring test used by note and owner filters.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Current Unix timestamp in seconds.
pub fn unix_timestamp_now() -> i64 {
    chrono::Utc::now().timestamp()
}
