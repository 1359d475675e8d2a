//! Secret handling for credentials in configuration
//!
//! The database connection string carries a password, so it is held in a
//! `secrecy::Secret` that zeroes its buffer on drop and redacts itself in
//! `Debug` output. Call `expose_secret()` only where the driver needs the
//! raw value.
//!
//! # Example
//!
//! ```rust
//! use citykml::config::{redact_connection_string, secret_string};
//! use secrecy::ExposeSecret;
//!
//! let dsn = secret_string("postgresql://citydb:pw@db:5432/berlin".to_string());
//! assert_eq!(dsn.expose_secret().as_ref(), "postgresql://citydb:pw@db:5432/berlin");
//! assert_eq!(redact_connection_string(&dsn), "postgresql://***@db:5432/berlin");
//! ```

use secrecy::{CloneableSecret, DebugSecret, ExposeSecret, Secret, SerializableSecret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// String payload that can live inside a `Secret`
#[derive(Clone, Debug, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

impl PartialEq<str> for SecretValue {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl AsRef<str> for SecretValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl SecretValue {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }

    /// Parse the secret value into another type
    pub fn parse<F: std::str::FromStr>(&self) -> Result<F, F::Err> {
        self.0.parse()
    }
}

impl Serialize for SecretValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretValue)
    }
}

/// Zeroizing, debug-redacted string
pub type SecretString = Secret<SecretValue>;

/// Wraps a plain string as a [`SecretString`]
#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}

/// Connection string with the credential part replaced by `***`
///
/// Safe to log. Strings without credentials are returned unchanged.
pub fn redact_connection_string(secret: &SecretString) -> String {
    let raw: &str = secret.expose_secret().as_ref();
    match (raw.split_once("://"), raw.rsplit_once('@')) {
        (Some((scheme, _)), Some((_, host))) => format!("{scheme}://***@{host}"),
        _ => raw.to_string(),
    }
}
