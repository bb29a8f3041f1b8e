//! Token extraction from the `Authorization` header.

use http::HeaderMap;
use http::header::AUTHORIZATION;

/// Extract the signature token carried as `Authorization: {prefix} {token}`.
///
/// The prefix is matched ASCII case-insensitively and must be followed by a space. Returns
/// `None` when the header is missing, uses another scheme, or carries an empty token.
///
/// # Examples
///
/// ```
/// use http::HeaderMap;
/// use sharedkey_auth::token::extract_token;
///
/// let mut headers = HeaderMap::new();
/// headers.insert("authorization", "sharedkey  abc= ".parse().unwrap());
/// assert_eq!(extract_token(&headers, "SharedKey"), Some("abc="));
/// ```
#[must_use]
pub fn extract_token<'a>(headers: &'a HeaderMap, prefix: &str) -> Option<&'a str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let bytes = value.as_bytes();
    let prefix = prefix.as_bytes();

    if bytes.len() <= prefix.len()
        || !bytes[..prefix.len()].eq_ignore_ascii_case(prefix)
        || bytes[prefix.len()] != b' '
    {
        return None;
    }

    Some(value[prefix.len() + 1..].trim()).filter(|token| !token.is_empty())
}
