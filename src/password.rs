use log::error;

use crate::error::AccountError;

pub fn hash(raw: &str, cost: u32) -> Result<String, AccountError> {
    bcrypt::hash(raw, cost).map_err(|e| {
        error!("password hash failed: {}", e);
        AccountError::Internal(e.to_string())
    })
}

/// A malformed stored hash counts as a mismatch.
pub fn verify(raw: &str, hashed: &str) -> bool {
    bcrypt::verify(raw, hashed).unwrap_or(false)
}

/// Spends the same bcrypt work as [`verify`] when there is no stored hash
/// to check against, so a missing account answers no faster than a wrong
/// password.
pub fn verify_absent(raw: &str, cost: u32) {
    let _ = bcrypt::hash(raw, cost);
}
