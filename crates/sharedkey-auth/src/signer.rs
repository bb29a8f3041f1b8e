//! Client-side request signing.
//!
//! [`RequestSigner`] attaches the date header (when the caller did not) and an
//! `Authorization: {scheme} {signature}` header to outgoing requests. The
//! [`SignRequest`] extension trait plugs it into `http::Request` and, with the `reqwest`
//! feature, into `reqwest::Request`.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, KeyInit, Mac};
use http::header::{AUTHORIZATION, CONTENT_LENGTH};
use http::{HeaderMap, HeaderName, HeaderValue};
use sha2::Sha256;
use tracing::debug;

use crate::canonical::{CanonicalRequest, ascii_header, content_length, content_type};
use crate::date::{Clock, SystemClock, format_http_date};
use crate::error::SignError;
use crate::keys::SharedKey;
use crate::options::{DEFAULT_DATE_HEADER, DEFAULT_SCHEME};

type HmacSha256 = Hmac<Sha256>;

/// Compute the base64 HMAC-SHA256 signature of a canonical string.
///
/// The canonical string must be ASCII; callers check this before signing.
///
/// # Examples
///
/// ```
/// use sharedkey_auth::signer::compute_signature;
///
/// let signature = compute_signature(b"key", "The quick brown fox jumps over the lazy dog");
/// assert_eq!(signature, "97yD9DBThCSxMpjmqm+xQ+9NWaFJRhdZl0edvC0aPNg=");
/// ```
#[must_use]
pub fn compute_signature(key: &[u8], canonical: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(canonical.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

/// Settings for the signing side of the scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerOptions {
    /// Scheme written before the signature in the `Authorization` header.
    pub scheme: String,
    /// Name of the date header that carries the signing time.
    pub date_header_name: String,
}

impl Default for SignerOptions {
    fn default() -> Self {
        Self {
            scheme: DEFAULT_SCHEME.to_owned(),
            date_header_name: DEFAULT_DATE_HEADER.to_owned(),
        }
    }
}

/// Signs outgoing requests with a shared key.
///
/// # Examples
///
/// ```
/// use sharedkey_auth::{RequestSigner, SharedKey, SignRequest};
///
/// let signer = RequestSigner::new(SharedKey::from_base64("c2VjcmV0").unwrap()).unwrap();
/// let mut request = http::Request::builder()
///     .method("GET")
///     .uri("https://api.example.com/orders?page=2")
///     .body(String::new())
///     .unwrap();
/// request.sign_with(&signer).unwrap();
///
/// assert!(request.headers().contains_key("x-ts-date"));
/// let authorization = request.headers()["authorization"].to_str().unwrap();
/// assert!(authorization.starts_with("SharedKey "));
/// ```
#[derive(Debug, Clone)]
pub struct RequestSigner {
    key: SharedKey,
    scheme: String,
    date_header_name: String,
    date_header: HeaderName,
    clock: Arc<dyn Clock>,
}

impl RequestSigner {
    /// Create a signer with the default scheme and date header.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::MissingKey`] when the key is empty.
    pub fn new(key: SharedKey) -> Result<Self, SignError> {
        Self::with_options(key, SignerOptions::default())
    }

    /// Create a signer with custom options.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::MissingKey`] when the key is empty and
    /// [`SignError::InvalidHeaderValue`] when the scheme or date header name cannot be used
    /// in a header.
    pub fn with_options(key: SharedKey, options: SignerOptions) -> Result<Self, SignError> {
        if key.is_empty() {
            return Err(SignError::MissingKey);
        }
        if options.scheme.is_empty() || options.scheme.contains(char::is_whitespace) {
            return Err(SignError::InvalidHeaderValue("authorization".to_owned()));
        }
        let date_header = HeaderName::from_bytes(options.date_header_name.as_bytes())
            .map_err(|_| SignError::InvalidHeaderValue(options.date_header_name.clone()))?;

        Ok(Self {
            key,
            scheme: options.scheme,
            date_header_name: options.date_header_name,
            date_header,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the clock used when the request carries no date header.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sign a request given as method, path and mutable headers.
    ///
    /// `body_length` is the exact body size when known. It is used when the headers carry no
    /// `Content-Length`, and is then written to the headers so the server signs the same value.
    /// Returns the computed signature.
    ///
    /// # Errors
    ///
    /// Returns [`SignError`] when a signed component is not ASCII or a header value cannot be
    /// represented.
    pub fn sign_headers(
        &self,
        method: &str,
        path: &str,
        headers: &mut HeaderMap,
        body_length: Option<u64>,
    ) -> Result<String, SignError> {
        let existing = ascii_header(headers, &self.date_header)
            .map_err(|_| SignError::UnsupportedCharacters("date header value"))?
            .filter(|v| !v.is_empty())
            .map(ToOwned::to_owned);
        let date_value = match existing {
            Some(existing) => existing,
            None => {
                let now = format_http_date(self.clock.now());
                let value = HeaderValue::from_str(&now)
                    .map_err(|_| SignError::InvalidHeaderValue(self.date_header_name.clone()))?;
                headers.insert(self.date_header.clone(), value);
                now
            }
        };

        if !headers.contains_key(CONTENT_LENGTH) {
            if let Some(length) = body_length.filter(|len| *len > 0) {
                headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
            }
        }

        let canonical_request = CanonicalRequest {
            method,
            content_length: content_length(headers),
            content_type: content_type(headers)
                .map_err(|_| SignError::UnsupportedCharacters("content type"))?,
            date_header_name: &self.date_header_name,
            date_value: &date_value,
            path,
        };
        if let Some(field) = canonical_request.non_ascii_component() {
            return Err(SignError::UnsupportedCharacters(field));
        }

        let canonical = canonical_request.build();
        debug!(canonical, "built canonical string for signing");

        let signature = compute_signature(self.key.as_bytes(), &canonical);
        let authorization = HeaderValue::from_str(&format!("{} {signature}", self.scheme))
            .map_err(|_| SignError::InvalidHeaderValue("authorization".to_owned()))?;
        headers.insert(AUTHORIZATION, authorization);

        Ok(signature)
    }
}

/// Requests that can be signed in place by a [`RequestSigner`].
pub trait SignRequest {
    /// Attach the date and `Authorization` headers.
    ///
    /// # Errors
    ///
    /// Returns [`SignError`] when the request cannot be signed.
    fn sign_with(&mut self, signer: &RequestSigner) -> Result<(), SignError>;

    /// Consume the request and return it signed.
    ///
    /// # Errors
    ///
    /// Returns [`SignError`] when the request cannot be signed.
    fn signed(mut self, signer: &RequestSigner) -> Result<Self, SignError>
    where
        Self: Sized,
    {
        self.sign_with(signer)?;
        Ok(self)
    }
}

impl<B: http_body::Body> SignRequest for http::Request<B> {
    fn sign_with(&mut self, signer: &RequestSigner) -> Result<(), SignError> {
        let body_length = self.body().size_hint().exact();
        let method = self.method().as_str().to_owned();
        let path = self.uri().path().to_owned();
        signer.sign_headers(&method, &path, self.headers_mut(), body_length)?;
        Ok(())
    }
}

#[cfg(feature = "reqwest")]
impl SignRequest for reqwest::Request {
    fn sign_with(&mut self, signer: &RequestSigner) -> Result<(), SignError> {
        let body_length = self
            .body()
            .and_then(reqwest::Body::as_bytes)
            .and_then(|bytes| u64::try_from(bytes.len()).ok());
        let method = self.method().as_str().to_owned();
        let path = self.url().path().to_owned();
        signer.sign_headers(&method, &path, self.headers_mut(), body_length)?;
        Ok(())
    }
}
