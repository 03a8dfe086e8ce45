//! Argon2id password hashing and verification.
//!
//! Hashes are PHC strings, so the algorithm, parameters and salt travel with
//! the hash and verification always uses the parameters embedded in it.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

use crate::error::CoreError;

/// Default Argon2 iteration count.
pub const DEFAULT_TIME_COST: u32 = 3;
/// Default Argon2 memory cost in KiB.
pub const DEFAULT_MEMORY_COST_KIB: u32 = 10240;
/// Default Argon2 lane count.
pub const DEFAULT_PARALLELISM: u32 = 4;

/// Cost parameters for newly created hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Config {
    pub time_cost: u32,
    pub memory_cost_kib: u32,
    pub parallelism: u32,
}

impl Default for Argon2Config {
    fn default() -> Self {
        Self {
            time_cost: DEFAULT_TIME_COST,
            memory_cost_kib: DEFAULT_MEMORY_COST_KIB,
            parallelism: DEFAULT_PARALLELISM,
        }
    }
}

#[derive(Clone)]
pub struct CredentialService {
    argon2: Argon2<'static>,
}

impl CredentialService {
    pub fn new(config: Argon2Config) -> Result<Self, CoreError> {
        let params = Params::new(
            config.memory_cost_kib,
            config.time_cost,
            config.parallelism,
            None,
        )
        .map_err(|e| CoreError::Validation(format!("Invalid Argon2 parameters: {e}")))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a plaintext password with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String, CoreError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| CoreError::Internal(format!("Password hashing failed: {e}")))?;
        Ok(hash.to_string())
    }

    /// Check `password` against a stored hash.
    ///
    /// A malformed or foreign hash yields `false`, exactly like a wrong
    /// password.
    pub fn verify(&self, hash: &str, password: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            tracing::debug!("Stored password hash is not a PHC string");
            return false;
        };
        self.argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// Spend one hash worth of Argon2 work and report no match.
    ///
    /// Used when there is no stored hash to check against, so a lookup miss
    /// costs about as much as a wrong password.
    pub fn verify_missing(&self, password: &str) -> bool {
        if let Err(err) = self.hash(password) {
            tracing::debug!(error = %err, "Decoy hash failed");
        }
        false
    }
}
