//! API keys for Firecrawl, Gemini and OpenAI.
//!
//! Keys live in a `secrecy::SecretBox` and only ever print as a short hint
//! (`ApiKey(…a1b2)`), enough to tell which key a run used.

use secrecy::{ExposeSecret, SecretBox};
use std::fmt;

/// Visible tail of a key in logs and debug output.
const HINT_CHARS: usize = 4;

/// Keys shorter than this show no characters at all.
const MIN_HINTED_LEN: usize = 12;

/// An API key whose value stays out of logs.
pub struct ApiKey(SecretBox<str>);

impl ApiKey {
    /// Surrounding whitespace is dropped; keys pasted into `.env` files
    /// often carry a trailing newline or space.
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        Self(SecretBox::new(value.trim().into()))
    }

    /// First non-blank key among `vars`, tried in order.
    pub fn from_env(vars: &[&str]) -> Option<Self> {
        vars.iter()
            .filter_map(|var| std::env::var(var).ok())
            .map(Self::new)
            .find(|key| !key.is_empty())
    }

    /// The raw key. Only call this while building a request.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.expose().is_empty()
    }

    /// Last few characters of a long key, masked otherwise.
    pub fn hint(&self) -> String {
        let chars: Vec<char> = self.expose().chars().collect();
        if chars.len() < MIN_HINTED_LEN {
            return "****".to_string();
        }
        let tail: String = chars[chars.len() - HINT_CHARS..].iter().collect();
        format!("…{}", tail)
    }
}

impl Clone for ApiKey {
    fn clone(&self) -> Self {
        Self(SecretBox::new(self.expose().into()))
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({})", self.hint())
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Key plus endpoint for one external service.
#[derive(Clone)]
pub struct ServiceCredentials {
    pub api_key: ApiKey,
    pub base_url: String,
}

impl ServiceCredentials {
    pub fn new(api_key: ApiKey, base_url: impl Into<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl fmt::Debug for ServiceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceCredentials")
            .field("api_key", &self.api_key)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_shows_only_a_hint() {
        let key = ApiKey::new("fc-0123456789abcdef");
        assert_eq!(format!("{:?}", key), "ApiKey(…cdef)");
        assert_eq!(key.expose(), "fc-0123456789abcdef");

        let short = ApiKey::new("sk-tiny");
        assert_eq!(format!("{:?}", short), "ApiKey(****)");
    }

    #[test]
    fn test_key_is_trimmed() {
        let key = ApiKey::new("  AIza-key-from-dotenv\n");
        assert_eq!(key.expose(), "AIza-key-from-dotenv");
        assert!(ApiKey::new(" \t").is_empty());
    }

    #[test]
    fn test_from_env_skips_blank_vars() {
        std::env::set_var("PROPERTY_SCOUT_TEST_BLANK_KEY", "   ");
        std::env::set_var("PROPERTY_SCOUT_TEST_SECOND_KEY", "second-key-value");
        let key = ApiKey::from_env(&[
            "PROPERTY_SCOUT_TEST_UNSET_KEY",
            "PROPERTY_SCOUT_TEST_BLANK_KEY",
            "PROPERTY_SCOUT_TEST_SECOND_KEY",
        ])
        .unwrap();
        assert_eq!(key.expose(), "second-key-value");
        assert!(ApiKey::from_env(&["PROPERTY_SCOUT_TEST_UNSET_KEY"]).is_none());
    }

    #[test]
    fn test_credentials_debug_hides_key() {
        let creds = ServiceCredentials::new(ApiKey::new("AIza-secret-value"), "https://example.test/");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("AIza"));
        assert!(debug.contains("https://example.test"));
        assert_eq!(creds.base_url, "https://example.test");
    }
}
