//! API keys wrapped so they never reach logs.

use std::fmt;

use secrecy::{ExposeSecret, SecretBox};

const REDACTED: &str = "[REDACTED]";

/// A provider credential that formats as `[REDACTED]`.
///
/// Every adapter holds its API key as a `SecretString`; the key is exposed
/// only while building the outbound request. An empty key is allowed so an
/// unconfigured provider can still be constructed and registered.
pub struct SecretString(SecretBox<str>);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretBox::new(value.into().into_boxed_str()))
    }

    /// Wrap a value read from the environment, treating blank as absent.
    pub fn non_empty(value: Option<String>) -> Option<Self> {
        let value = value?;
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| Self::new(trimmed))
    }

    /// Expose the secret value. Only call this when building a request.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.expose().is_empty()
    }
}

impl Clone for SecretString {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SecretString").field(&REDACTED).finish()
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}
