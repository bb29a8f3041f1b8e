//! `WWW-Authenticate` challenge formatting.
//!
//! Parameters follow RFC 6750 section 3: `error`, `error_description` and `error_uri`, each
//! emitted as a quoted string and separated by `", "`.

/// Build the `WWW-Authenticate` value.
///
/// Empty parameters are omitted. Without parameters the bare challenge is returned.
///
/// # Examples
///
/// ```
/// use sharedkey_auth::challenge::build_challenge;
///
/// assert_eq!(build_challenge("SharedKey", None, None, None), "SharedKey");
/// assert_eq!(
///     build_challenge("SharedKey", Some("invalid_token"), Some("The signature is invalid"), None),
///     r#"SharedKey error="invalid_token", error_description="The signature is invalid""#,
/// );
/// ```
#[must_use]
pub fn build_challenge(
    challenge: &str,
    error: Option<&str>,
    error_description: Option<&str>,
    error_uri: Option<&str>,
) -> String {
    let params: Vec<String> = [
        ("error", error),
        ("error_description", error_description),
        ("error_uri", error_uri),
    ]
    .into_iter()
    .filter_map(|(name, value)| {
        value
            .filter(|v| !v.is_empty())
            .map(|v| format!("{name}={}", quote(v)))
    })
    .collect();

    if params.is_empty() {
        challenge.to_owned()
    } else {
        format!("{challenge} {}", params.join(", "))
    }
}

/// Render `value` as an HTTP quoted-string.
fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}
