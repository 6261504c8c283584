//! Account credentials: password hashing and signed session tokens.

pub mod password;
pub mod token;

pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenSigner};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}
