//! Credential verification
//!
//! The auth layer never compares secrets itself; it asks a
//! [`CredentialVerifier`] to produce and check stored credentials.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::config::CredentialScheme;
use crate::error::{Error, Result};

/// Produces and checks stored credentials
pub trait CredentialVerifier: Send + Sync {
    /// Turn a submitted password into the value kept in the user record
    fn seal(&self, password: &str) -> Result<String>;

    /// Check a submitted password against a stored value
    fn verify(&self, stored: &str, supplied: &str) -> bool;
}

/// Stores the password as-is
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainCredentials;

impl CredentialVerifier for PlainCredentials {
    fn seal(&self, password: &str) -> Result<String> {
        Ok(password.to_string())
    }

    fn verify(&self, stored: &str, supplied: &str) -> bool {
        // Length leaks, contents don't
        stored.len() == supplied.len()
            && stored
                .bytes()
                .zip(supplied.bytes())
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0
    }
}

/// Salted Argon2id hashes in PHC string format
#[derive(Default)]
pub struct Argon2Credentials {
    argon2: Argon2<'static>,
}

impl CredentialVerifier for Argon2Credentials {
    fn seal(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| Error::Credential(format!("Failed to hash password: {e}")))
    }

    fn verify(&self, stored: &str, supplied: &str) -> bool {
        let parsed_hash = match PasswordHash::new(stored) {
            Ok(h) => h,
            Err(_) => {
                tracing::warn!("Stored credential is not a valid password hash");
                return false;
            }
        };

        self.argon2
            .verify_password(supplied.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

/// Build the verifier for a configured scheme
pub fn verifier_for(scheme: CredentialScheme) -> Box<dyn CredentialVerifier> {
    match scheme {
        CredentialScheme::Argon2 => Box::new(Argon2Credentials::default()),
        CredentialScheme::Plain => Box::new(PlainCredentials),
    }
}
