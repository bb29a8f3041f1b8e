//! Canonical string construction for shared-key signatures.
//!
//! The canonical string is the exact input to HMAC-SHA256 on both the signing and the
//! verifying side:
//!
//! ```text
//! HTTPRequestMethod\n
//! ContentLength\n
//! ContentType\n
//! DateHeaderName:DateValue\n
//! AbsolutePath
//! ```
//!
//! Nothing is trimmed, lowercased or re-encoded: both sides feed the values exactly as they
//! appear on the wire. The string is hashed as ASCII, so any non-ASCII byte in a component is
//! rejected instead of being silently mangled.

use http::HeaderMap;
use http::header::{AsHeaderName, CONTENT_LENGTH, CONTENT_TYPE};

/// The signable parts of a request.
///
/// Built fresh for every request and never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalRequest<'a> {
    /// HTTP method, as sent (e.g. `POST`).
    pub method: &'a str,
    /// Body length in bytes, `0` without a body.
    pub content_length: u64,
    /// `Content-Type` header value, if any.
    pub content_type: Option<&'a str>,
    /// Name of the date header that carries the signing time.
    pub date_header_name: &'a str,
    /// Raw value of the date header.
    pub date_value: &'a str,
    /// Absolute request path, without query string or host.
    pub path: &'a str,
}

impl CanonicalRequest<'_> {
    /// Render the canonical string.
    ///
    /// # Examples
    ///
    /// ```
    /// use sharedkey_auth::canonical::CanonicalRequest;
    ///
    /// let canonical = CanonicalRequest {
    ///     method: "GET",
    ///     content_length: 0,
    ///     content_type: None,
    ///     date_header_name: "x-ts-date",
    ///     date_value: "Tue, 15 Nov 1994 08:12:31 GMT",
    ///     path: "/",
    /// };
    /// assert_eq!(canonical.build(), "GET\n0\n\nx-ts-date:Tue, 15 Nov 1994 08:12:31 GMT\n/");
    /// ```
    #[must_use]
    pub fn build(&self) -> String {
        build_canonical_string(
            self.method,
            self.content_length,
            self.content_type,
            self.date_header_name,
            self.date_value,
            self.path,
        )
    }

    /// Return the name of the first component that contains non-ASCII characters, if any.
    #[must_use]
    pub fn non_ascii_component(&self) -> Option<&'static str> {
        [
            ("method", self.method),
            ("content type", self.content_type.unwrap_or_default()),
            ("date header name", self.date_header_name),
            ("date header value", self.date_value),
            ("path", self.path),
        ]
        .into_iter()
        .find(|(_, value)| !value.is_ascii())
        .map(|(name, _)| name)
    }
}

/// Build the canonical string from its components.
///
/// An absent content type becomes an empty line, never the literal `null`.
///
/// # Examples
///
/// ```
/// use sharedkey_auth::canonical::build_canonical_string;
///
/// let canonical = build_canonical_string(
///     "POST",
///     42,
///     Some("application/json"),
///     "x-ts-date",
///     "Tue, 15 Nov 1994 08:12:31 GMT",
///     "/api/orders",
/// );
/// assert_eq!(
///     canonical,
///     "POST\n42\napplication/json\nx-ts-date:Tue, 15 Nov 1994 08:12:31 GMT\n/api/orders"
/// );
/// ```
#[must_use]
pub fn build_canonical_string(
    method: &str,
    content_length: u64,
    content_type: Option<&str>,
    date_header_name: &str,
    date_value: &str,
    path: &str,
) -> String {
    let content_type = content_type.unwrap_or_default();
    format!("{method}\n{content_length}\n{content_type}\n{date_header_name}:{date_value}\n{path}")
}

/// Read the declared body length from the `Content-Length` header.
///
/// A missing or unparseable header counts as an empty body.
#[must_use]
pub fn content_length(headers: &HeaderMap) -> u64 {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

/// Read a signed header as ASCII text.
///
/// Returns `Ok(None)` when the header is absent, and the raw bytes as the error when the
/// value carries bytes outside ASCII. Such a header is never treated as missing.
pub fn ascii_header<K: AsHeaderName>(
    headers: &HeaderMap,
    name: K,
) -> Result<Option<&str>, &[u8]> {
    match headers.get(name) {
        None => Ok(None),
        Some(value) => value.to_str().map(Some).map_err(|_| value.as_bytes()),
    }
}

/// Read the `Content-Type` header. See [`ascii_header`] for the error case.
pub fn content_type(headers: &HeaderMap) -> Result<Option<&str>, &[u8]> {
    ascii_header(headers, CONTENT_TYPE)
}
