/// Cryptography helpers for account credentials
///
/// Password hashing with an application-wide PBKDF2 key and random
/// session token generation.

pub mod password;
pub mod token;

pub use password::PasswordHasher;
pub use token::generate_token;
