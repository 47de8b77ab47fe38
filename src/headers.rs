use std::collections::BTreeMap;

/// Header names never forwarded to drain hooks. Compared case-insensitively.
pub const SENSITIVE_HEADERS: [&str; 6] = [
    "authorization",
    "cookie",
    "set-cookie",
    "x-api-key",
    "x-auth-token",
    "proxy-authorization",
];

pub fn is_sensitive_header(name: &str) -> bool {
    SENSITIVE_HEADERS
        .iter()
        .any(|denied| denied.eq_ignore_ascii_case(name))
}

/// Drop every header on the deny-list. Names and values of the remaining
/// headers are kept verbatim.
pub fn filter_safe_headers<I, K, V>(headers: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    headers
        .into_iter()
        .filter(|(name, _)| !is_sensitive_header(name.as_ref()))
        .map(|(name, value)| (name.as_ref().to_string(), value.as_ref().to_string()))
        .collect()
}
