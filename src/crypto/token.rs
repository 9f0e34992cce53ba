/// Session token generation
use rand::{rngs::OsRng, RngCore};

/// Number of random bytes in a session token
pub const TOKEN_BYTES: usize = 32;

/// Generate an unguessable session token (32 random bytes, lowercase hex)
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
