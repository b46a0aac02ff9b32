//! Credential input handed to providers for validation.

use std::fmt;

/// Credential type tag for passwords.
pub const PASSWORD: &str = "password";

/// Credential type tag for one-time passwords.
pub const OTP: &str = "otp";

/// A credential presented by a user: a type tag plus the challenge response.
///
/// The challenge response is redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialInput {
    credential_type: String,
    challenge_response: String,
}

impl CredentialInput {
    /// Creates a credential input of the given type.
    #[must_use]
    pub fn new(credential_type: impl Into<String>, challenge_response: impl Into<String>) -> Self {
        Self {
            credential_type: credential_type.into(),
            challenge_response: challenge_response.into(),
        }
    }

    /// Creates a password credential input.
    #[must_use]
    pub fn password(password: impl Into<String>) -> Self {
        Self::new(PASSWORD, password)
    }

    /// Returns the credential type tag.
    #[must_use]
    pub fn credential_type(&self) -> &str {
        &self.credential_type
    }

    /// Returns the challenge response (e.g. the plaintext password).
    #[must_use]
    pub fn challenge_response(&self) -> &str {
        &self.challenge_response
    }
}

impl fmt::Debug for CredentialInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialInput")
            .field("credential_type", &self.credential_type)
            .field("challenge_response", &"<redacted>")
            .finish()
    }
}
