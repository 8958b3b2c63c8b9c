//! Session credentials for the metadata endpoint.
//!
//! Cookie and XSRF token are opaque values copied from a logged-in browser
//! session. They are wrapped so they never reach logs.

use secrecy::{ExposeSecret, SecretBox};
use std::fmt;

/// Cookie or token value, redacted in `Debug` output.
pub struct SecretString(SecretBox<str>);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretBox::new(value.into().into_boxed_str()))
    }

    /// Raw value, for building request headers only.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for SecretString {
    fn clone(&self) -> Self {
        Self(SecretBox::new(Box::from(self.expose())))
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Browser-session credentials replayed on every metadata request.
#[derive(Clone, Default)]
pub struct SessionCredentials {
    /// Full `cookie` header value
    pub cookie: Option<SecretString>,

    /// `x-xsrf-token` header value
    pub xsrf_token: Option<SecretString>,

    /// `x-kaggle-build-version` header value (not secret)
    pub build_version: Option<String>,
}

impl SessionCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(SecretString::new(cookie));
        self
    }

    pub fn with_xsrf_token(mut self, token: impl Into<String>) -> Self {
        self.xsrf_token = Some(SecretString::new(token));
        self
    }

    pub fn with_build_version(mut self, version: impl Into<String>) -> Self {
        self.build_version = Some(version.into());
        self
    }
}

impl fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |s: &Option<SecretString>| s.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("SessionCredentials")
            .field("cookie", &redact(&self.cookie))
            .field("xsrf_token", &redact(&self.xsrf_token))
            .field("build_version", &self.build_version)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_not_in_debug() {
        let secret = SecretString::new("ka_sessionid=abc123");
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("abc123"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_clone_keeps_value_and_redaction() {
        let secret = SecretString::new("CfDJ8-token");
        let copy = secret.clone();
        assert_eq!(copy.expose(), "CfDJ8-token");
        assert_eq!(format!("{:?}", copy), "[REDACTED]");
    }

    #[test]
    fn test_session_credentials_debug() {
        let creds = SessionCredentials::new()
            .with_cookie("ka_sessionid=abc123")
            .with_xsrf_token("CfDJ8-token")
            .with_build_version("9ce5d950");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("abc123"));
        assert!(!debug.contains("CfDJ8"));
        assert!(debug.contains("9ce5d950"));
    }
}
