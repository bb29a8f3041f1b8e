//! Shared keys and the key resolver seam.
//!
//! The verifier never decides which keys are valid. It asks a [`KeyResolver`] for the
//! candidate keys of each request and tries them in order, which is what makes
//! zero-downtime key rotation possible: during a rotation the resolver returns both the old
//! and the new key.

use std::fmt;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

/// A pre-shared key.
///
/// The key bytes never appear in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct SharedKey {
    id: Option<String>,
    bytes: Vec<u8>,
}

impl SharedKey {
    /// Create a key from raw bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            id: None,
            bytes: bytes.into(),
        }
    }

    /// Create a key from its base64 (standard alphabet) representation.
    ///
    /// # Examples
    ///
    /// ```
    /// use sharedkey_auth::SharedKey;
    ///
    /// let key = SharedKey::from_base64("c2VjcmV0").unwrap();
    /// assert_eq!(key.as_bytes(), b"secret");
    /// ```
    pub fn from_base64(encoded: &str) -> Result<Self, base64::DecodeError> {
        BASE64.decode(encoded.trim()).map(Self::new)
    }

    /// Attach an identifier, surfaced on successful validation.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// The key identifier, if any.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Whether the key has no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for SharedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedKey")
            .field("id", &self.id)
            .field("bytes", &"<redacted>")
            .finish()
    }
}

impl From<&[u8]> for SharedKey {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes)
    }
}

impl From<Vec<u8>> for SharedKey {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&str> for SharedKey {
    fn from(text: &str) -> Self {
        Self::new(text.as_bytes())
    }
}

/// Errors a key store may report.
#[derive(Debug, thiserror::Error)]
pub enum KeyResolverError {
    /// The key store could not be reached.
    #[error("key store unavailable: {0}")]
    Unavailable(String),

    /// Any other failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Trait for resolving the candidate keys of an incoming request.
///
/// Implementations may back this with a database, a secrets manager, or a static list.
/// This is the only point of the verification path allowed to perform I/O.
///
/// # Object safety
///
/// The trait uses `#[async_trait]` so it can be stored as `Arc<dyn KeyResolver>`.
#[async_trait]
pub trait KeyResolver: Send + Sync {
    /// Return the keys a request may have been signed with, in the order they are tried.
    ///
    /// # Errors
    ///
    /// Returns [`KeyResolverError`] when the key store fails. An empty list is not an error.
    async fn resolve_keys(
        &self,
        request: &http::request::Parts,
    ) -> Result<Vec<SharedKey>, KeyResolverError>;
}

/// A resolver that never returns keys.
///
/// Used when no resolver is configured, so the scheme never validates anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoKeysResolver;

#[async_trait]
impl KeyResolver for NoKeysResolver {
    async fn resolve_keys(
        &self,
        _request: &http::request::Parts,
    ) -> Result<Vec<SharedKey>, KeyResolverError> {
        Ok(Vec::new())
    }
}

/// A fixed, ordered list of keys.
///
/// Suitable for tests and for deployments that load keys from configuration at startup.
///
/// # Examples
///
/// ```
/// use sharedkey_auth::{SharedKey, StaticKeyResolver};
///
/// let resolver = StaticKeyResolver::new(vec![
///     SharedKey::from("old").with_id("2024"),
///     SharedKey::from("new").with_id("2025"),
/// ]);
/// assert_eq!(resolver.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticKeyResolver {
    keys: Vec<SharedKey>,
}

impl StaticKeyResolver {
    /// Create a resolver returning `keys` for every request.
    pub fn new(keys: impl IntoIterator<Item = SharedKey>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    /// Parse a comma separated list of base64 keys, each optionally prefixed with `id=`.
    ///
    /// # Examples
    ///
    /// ```
    /// use sharedkey_auth::StaticKeyResolver;
    ///
    /// let resolver = StaticKeyResolver::parse("primary=c2VjcmV0, bmV3").unwrap();
    /// assert_eq!(resolver.len(), 2);
    /// ```
    pub fn parse(raw: &str) -> Result<Self, base64::DecodeError> {
        let keys = raw
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| match entry.split_once('=') {
                // Base64 padding also uses '=', so only treat it as an id when the id part
                // is non-empty and the key part is not padding.
                Some((id, key)) if !id.is_empty() && !key.is_empty() && !key.starts_with('=') => {
                    SharedKey::from_base64(key).map(|k| k.with_id(id))
                }
                _ => SharedKey::from_base64(entry),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { keys })
    }

    /// Number of configured keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no keys are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[async_trait]
impl KeyResolver for StaticKeyResolver {
    async fn resolve_keys(
        &self,
        _request: &http::request::Parts,
    ) -> Result<Vec<SharedKey>, KeyResolverError> {
        Ok(self.keys.clone())
    }
}
