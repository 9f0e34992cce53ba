/// Password hashing
///
/// PBKDF2-HMAC-SHA512 keyed with one application-wide salt. The same
/// password always yields the same hash, which is what equality-based
/// verification relies on. There is no per-user salt: switching schemes
/// would make every stored hash unverifiable.

use sha2::Sha512;

/// Length of the derived key in bytes (hex output is twice as long)
pub const HASH_BYTES: usize = 64;

/// Deterministic password hasher
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    salt: String,
    iterations: u32,
}

impl PasswordHasher {
    pub fn new(salt: impl Into<String>, iterations: u32) -> Self {
        Self {
            salt: salt.into(),
            iterations,
        }
    }

    /// Hash a password into lowercase hex
    pub fn hash(&self, password: &str) -> String {
        let mut key = [0u8; HASH_BYTES];
        pbkdf2::pbkdf2_hmac::<Sha512>(
            password.as_bytes(),
            self.salt.as_bytes(),
            self.iterations,
            &mut key,
        );
        hex::encode(key)
    }

    /// Recompute the hash and compare
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        let computed = self.hash(password);
        computed.len() == hash.len()
            && computed
                .bytes()
                .zip(hash.bytes())
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new("quiz-salt-2025", 10_000)
    }
}
