//! Argon2id password hashing.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use domains::{DomainError, DomainResult, PasswordHasher};

/// Produces PHC strings (`$argon2id$v=19$...`) with a fresh random salt.
#[derive(Default)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Argon2id with explicit memory (KiB) and iteration costs.
    pub fn with_cost(memory_kib: u32, iterations: u32) -> DomainResult<Self> {
        let params =
            Params::new(memory_kib, iterations, 1, None).map_err(DomainError::internal)?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, plain: &str) -> DomainResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(plain.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(DomainError::internal)
    }

    fn verify(&self, plain: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };
        self.argon2
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_its_own_hashes() {
        let hasher = Argon2Hasher::new();
        let hash = hasher.hash("secret-password").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("secret-password", &hash));
        assert!(!hasher.verify("wrong-password", &hash));
    }

    #[test]
    fn salts_every_hash() {
        let hasher = Argon2Hasher::new();
        assert_ne!(hasher.hash("same").unwrap(), hasher.hash("same").unwrap());
    }

    #[test]
    fn cheap_hashes_still_verify_with_the_default_hasher() {
        let cheap = Argon2Hasher::with_cost(Params::MIN_M_COST, 1).unwrap();
        let hash = cheap.hash("secret-password").unwrap();
        assert!(Argon2Hasher::new().verify("secret-password", &hash));
        assert!(Argon2Hasher::with_cost(0, 1).is_err());
    }

    #[test]
    fn garbage_hashes_never_verify() {
        assert!(!Argon2Hasher::new().verify("anything", "not-a-phc-string"));
    }
}
