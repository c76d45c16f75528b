//! Password reset tokens.

use argon2::password_hash::rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};

use domains::ResetTokens;

const TOKEN_BYTES: usize = 32;

/// 256-bit random tokens, hex encoded. Only the SHA-256 digest is stored.
#[derive(Default)]
pub struct RandomResetTokens;

impl ResetTokens for RandomResetTokens {
    fn generate(&self) -> String {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    fn digest(&self, token: &str) -> String {
        hex::encode(Sha256::digest(token.as_bytes()))
    }
}
