//! Stored password hash verification.
//!
//! The only supported format is the Atlassian PKCS5S2 hash:
//! `{PKCS5S2}` followed by base64 of a 16-byte salt and a 32-byte
//! PBKDF2-HMAC-SHA1 key derived with 10 000 iterations.

use std::fmt;
use std::num::NonZeroU32;

use aws_lc_rs::pbkdf2;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::error::{SqlFederationError, SqlResult};

const PKCS5S2_PREFIX: &str = "{PKCS5S2}";
const PKCS5S2_SALT_LEN: usize = 16;
const PKCS5S2_KEY_LEN: usize = 32;
const PKCS5S2_ITERATIONS: NonZeroU32 = match NonZeroU32::new(10_000) {
    Some(n) => n,
    None => unreachable!(),
};

/// Password hashing algorithm used by the external store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PasswordHashingAlgorithm {
    /// Atlassian PKCS5S2 (PBKDF2-HMAC-SHA1).
    Pkcs5S2,
    /// Any other algorithm. Every verification fails.
    Unsupported(String),
}

impl PasswordHashingAlgorithm {
    /// Selector name of the PKCS5S2 algorithm.
    pub const PKCS5S2_NAME: &'static str = "Atlassian PKCS5S2";

    /// Resolves a selector name, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unsupported algorithms.
    pub fn from_name(name: &str) -> SqlResult<Self> {
        match Self::from(name.to_string()) {
            Self::Unsupported(other) => Err(SqlFederationError::config(format!(
                "{other} is not supported"
            ))),
            algorithm => Ok(algorithm),
        }
    }

    /// Returns the selector name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Pkcs5S2 => Self::PKCS5S2_NAME,
            Self::Unsupported(name) => name,
        }
    }

    /// Returns true if stored hashes can be verified with this algorithm.
    #[must_use]
    pub const fn is_supported(&self) -> bool {
        matches!(self, Self::Pkcs5S2)
    }

    /// Checks a challenge response against a stored hash.
    ///
    /// Malformed hashes and unsupported algorithms never match.
    #[must_use]
    pub fn verify(&self, challenge: &str, stored_hash: &str) -> bool {
        match self {
            Self::Pkcs5S2 => verify_pkcs5s2(challenge, stored_hash),
            Self::Unsupported(name) => {
                tracing::warn!(algorithm = %name, "Password hashing algorithm is not supported");
                false
            }
        }
    }
}

impl From<String> for PasswordHashingAlgorithm {
    fn from(name: String) -> Self {
        let trimmed = name.trim();
        if trimmed.eq_ignore_ascii_case(Self::PKCS5S2_NAME) || trimmed.eq_ignore_ascii_case("PKCS5S2")
        {
            Self::Pkcs5S2
        } else {
            Self::Unsupported(trimmed.to_string())
        }
    }
}

impl From<PasswordHashingAlgorithm> for String {
    fn from(algorithm: PasswordHashingAlgorithm) -> Self {
        algorithm.name().to_string()
    }
}

impl fmt::Display for PasswordHashingAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Encodes a password in the Atlassian PKCS5S2 format with the given salt.
#[must_use]
pub fn pkcs5s2_hash(password: &str, salt: [u8; PKCS5S2_SALT_LEN]) -> String {
    let mut key = [0u8; PKCS5S2_KEY_LEN];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA1,
        PKCS5S2_ITERATIONS,
        &salt,
        password.as_bytes(),
        &mut key,
    );

    let mut raw = Vec::with_capacity(PKCS5S2_SALT_LEN + PKCS5S2_KEY_LEN);
    raw.extend_from_slice(&salt);
    raw.extend_from_slice(&key);

    format!("{PKCS5S2_PREFIX}{}", STANDARD.encode(raw))
}

/// Verifies a password against an Atlassian PKCS5S2 hash in constant time.
#[must_use]
pub fn verify_pkcs5s2(password: &str, stored_hash: &str) -> bool {
    let Some(encoded) = stored_hash.trim().strip_prefix(PKCS5S2_PREFIX) else {
        return false;
    };
    let Ok(raw) = STANDARD.decode(encoded) else {
        return false;
    };
    if raw.len() != PKCS5S2_SALT_LEN + PKCS5S2_KEY_LEN {
        return false;
    }

    let (salt, key) = raw.split_at(PKCS5S2_SALT_LEN);
    pbkdf2::verify(
        pbkdf2::PBKDF2_HMAC_SHA1,
        PKCS5S2_ITERATIONS,
        salt,
        password.as_bytes(),
        key,
    )
    .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALT: [u8; 16] = *b"0123456789abcdef";

    #[test]
    fn pkcs5s2_hash_has_atlassian_layout() {
        let hash = pkcs5s2_hash("secret", SALT);
        let encoded = hash.strip_prefix("{PKCS5S2}").unwrap();
        let raw = STANDARD.decode(encoded).unwrap();

        assert_eq!(raw.len(), 48);
        assert_eq!(&raw[..16], &SALT);
    }

    #[test]
    fn verify_accepts_only_the_original_password() {
        let hash = pkcs5s2_hash("secret", SALT);

        assert!(verify_pkcs5s2("secret", &hash));
        assert!(!verify_pkcs5s2("Secret", &hash));
        assert!(!verify_pkcs5s2("", &hash));
    }

    #[test]
    fn malformed_hashes_never_match() {
        assert!(!verify_pkcs5s2("secret", "secret"));
        assert!(!verify_pkcs5s2("secret", "{PKCS5S2}not base64!"));
        assert!(!verify_pkcs5s2("secret", "{PKCS5S2}c2hvcnQ="));
        assert!(!verify_pkcs5s2("secret", ""));
    }

    #[test]
    fn algorithm_names_are_case_insensitive() {
        assert_eq!(
            PasswordHashingAlgorithm::from_name("atlassian pkcs5s2").unwrap(),
            PasswordHashingAlgorithm::Pkcs5S2
        );
        assert_eq!(
            PasswordHashingAlgorithm::from_name("PKCS5S2").unwrap(),
            PasswordHashingAlgorithm::Pkcs5S2
        );
        assert!(matches!(
            PasswordHashingAlgorithm::from_name("bcrypt"),
            Err(SqlFederationError::Configuration(msg)) if msg.contains("bcrypt")
        ));
    }

    #[test]
    fn unsupported_algorithm_always_rejects() {
        let hash = pkcs5s2_hash("secret", SALT);
        let algorithm = PasswordHashingAlgorithm::from("bcrypt".to_string());

        assert!(!algorithm.is_supported());
        assert!(!algorithm.verify("secret", &hash));
        assert!(PasswordHashingAlgorithm::Pkcs5S2.verify("secret", &hash));
    }

    #[test]
    fn algorithm_serializes_as_selector_name() {
        let json = serde_json::to_string(&PasswordHashingAlgorithm::Pkcs5S2).unwrap();
        assert_eq!(json, "\"Atlassian PKCS5S2\"");

        let parsed: PasswordHashingAlgorithm = serde_json::from_str("\"md5\"").unwrap();
        assert_eq!(parsed, PasswordHashingAlgorithm::Unsupported("md5".to_string()));
    }
}
