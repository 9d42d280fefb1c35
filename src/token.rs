use log::error;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::AccountError;

pub const TOKEN_LENGTH: usize = 30;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

// Largest multiple of the alphabet size that fits in a byte; bytes at or
// above it are rejected so every symbol is equally likely.
const ACCEPT_BELOW: u8 = (256 / ALPHABET.len() * ALPHABET.len()) as u8;

/// Generates an opaque alphanumeric token from the OS random source.
pub fn generate() -> Result<String, AccountError> {
    generate_with(&mut OsRng)
}

fn generate_with<R: RngCore>(rng: &mut R) -> Result<String, AccountError> {
    let mut token = String::with_capacity(TOKEN_LENGTH);
    let mut buf = [0u8; TOKEN_LENGTH * 2];
    while token.len() < TOKEN_LENGTH {
        rng.try_fill_bytes(&mut buf).map_err(|e| {
            error!("random source failed: {}", e);
            AccountError::EntropyUnavailable
        })?;
        for b in buf.iter().copied().filter(|b| *b < ACCEPT_BELOW) {
            if token.len() == TOKEN_LENGTH {
                break;
            }
            token.push(ALPHABET[(b as usize) % ALPHABET.len()] as char);
        }
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenRng;

    impl RngCore for BrokenRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, _dest: &mut [u8]) {}

        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
            Err(rand::Error::new(std::io::Error::new(
                std::io::ErrorKind::Other,
                "no entropy",
            )))
        }
    }

    #[test]
    fn token_is_fixed_length_alphanumeric() {
        let token = generate().unwrap();
        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn tokens_differ() {
        let a = generate().unwrap();
        let b = generate().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn broken_source_reports_entropy_unavailable() {
        let result = generate_with(&mut BrokenRng);
        assert!(matches!(result, Err(AccountError::EntropyUnavailable)));
    }

    #[test]
    fn rejection_bound_is_a_multiple_of_the_alphabet() {
        assert_eq!(ACCEPT_BELOW as usize % ALPHABET.len(), 0);
        assert_eq!(ACCEPT_BELOW, 248);
    }
}
