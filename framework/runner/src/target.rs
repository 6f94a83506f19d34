use std::env;

/// Environment variable holding the base URL of the service under test.
pub const SRE_URL_ENV: &str = "SRE_URL";

/// Environment variable holding the 1-based group number of this run.
pub const GROUP_NUMBER_ENV: &str = "GROUP_NUMBER";

/// Used when [SRE_URL_ENV] is not set or is empty.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8081";

/// Get the base URL of the service under test.
///
/// If the [`SRE_URL_ENV`] environment variable is set to a non-empty value it is used, otherwise
/// [`DEFAULT_BASE_URL`] is returned. A missing value is the expected default, not an error.
pub fn resolve_base_url() -> String {
    resolve_base_url_with(|key| env::var(key).ok())
}

/// As [resolve_base_url] but reading from the given lookup rather than the process environment.
pub fn resolve_base_url_with<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let url = lookup(SRE_URL_ENV)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    normalize_base_url(&url)
}

/// Get the group number for this run.
///
/// Reads [`GROUP_NUMBER_ENV`] and falls back to 1 if it is missing, not a number or 0.
pub fn resolve_group_number() -> u32 {
    resolve_group_number_with(|key| env::var(key).ok())
}

/// As [resolve_group_number] but reading from the given lookup rather than the process environment.
pub fn resolve_group_number_with<F>(lookup: F) -> u32
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(GROUP_NUMBER_ENV).map(|value| value.trim().parse::<u32>()) {
        Some(Ok(group_number)) if group_number >= 1 => group_number,
        Some(Ok(_)) | Some(Err(_)) => {
            log::warn!("'{GROUP_NUMBER_ENV}' is not a positive number, using group 1");
            1
        }
        None => 1,
    }
}

pub(crate) fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
