//! Provider credentials.
//!
//! A [`CredentialLookup`] names where a provider's key may live: one key in
//! the provider JSON config, then an ordered chain of environment variables.
//! Resolving it yields an [`ApiCredential`] whose value is held in a
//! [`secrecy::SecretString`] and only leaves it when a request header is set.
//!
//! ```ignore
//! const GEMINI: CredentialLookup =
//!     CredentialLookup::new("Gemini API key", "api_key", &["GEMINI_API_KEY", "GOOGLE_API_KEY"]);
//!
//! let key = GEMINI.resolve(&provider_config)?;
//! request.header("x-goog-api-key", key.expose());
//! ```

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value as JsonValue;

use super::ProviderError;

/// Where a credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// The provider JSON config
    Config,
    /// The named environment variable
    Environment(&'static str),
    /// Passed in by the caller
    Explicit,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Config => f.write_str("provider config"),
            CredentialSource::Environment(var) => write!(f, "${}", var),
            CredentialSource::Explicit => f.write_str("caller"),
        }
    }
}

/// Where to look for one provider's credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialLookup {
    /// Human-readable name used in errors and logs
    pub name: &'static str,
    /// Key in the provider JSON config
    pub config_key: &'static str,
    /// Environment variables, first non-blank wins
    pub env_vars: &'static [&'static str],
}

impl CredentialLookup {
    pub const fn new(
        name: &'static str,
        config_key: &'static str,
        env_vars: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            config_key,
            env_vars,
        }
    }

    /// Config first, then the environment chain.
    ///
    /// Values are trimmed; blank values count as unset.
    pub fn resolve(&self, config: &JsonValue) -> Result<ApiCredential, ProviderError> {
        self.from_config(config)
            .or_else(|| self.from_environment())
            .ok_or_else(|| self.missing())
    }

    /// The environment chain alone.
    pub fn resolve_env(&self) -> Result<ApiCredential, ProviderError> {
        self.from_environment().ok_or_else(|| self.missing())
    }

    /// Whether [`CredentialLookup::resolve`] would succeed.
    pub fn is_available(&self, config: &JsonValue) -> bool {
        self.from_config(config).is_some() || self.from_environment().is_some()
    }

    /// Wrap a key supplied directly by the caller.
    pub fn explicit(&self, value: impl Into<String>) -> ApiCredential {
        ApiCredential::new(self.name, CredentialSource::Explicit, value.into())
    }

    fn from_config(&self, config: &JsonValue) -> Option<ApiCredential> {
        let value = non_blank(config[self.config_key].as_str()?)?;
        Some(ApiCredential::new(self.name, CredentialSource::Config, value))
    }

    fn from_environment(&self) -> Option<ApiCredential> {
        self.env_vars.iter().find_map(|&var| {
            let value = std::env::var(var).ok()?;
            let value = non_blank(&value)?;
            Some(ApiCredential::new(self.name, CredentialSource::Environment(var), value))
        })
    }

    fn missing(&self) -> ProviderError {
        ProviderError::NotConfigured(format!(
            "{} not set: provide '{}' in provider config or set {}",
            self.name,
            self.config_key,
            self.env_vars.join(" or ")
        ))
    }
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// A resolved API key. `Debug` and `Display` never print the value.
pub struct ApiCredential {
    name: &'static str,
    source: CredentialSource,
    secret: SecretString,
}

impl ApiCredential {
    fn new(name: &'static str, source: CredentialSource, value: String) -> Self {
        Self {
            name,
            source,
            secret: SecretString::from(value),
        }
    }

    /// The raw key, for the request header only.
    pub fn expose(&self) -> &str {
        self.secret.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.expose().is_empty()
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("name", &self.name)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (from {})", self.name, self.source)
    }
}
