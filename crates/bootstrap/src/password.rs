//! Salted one-way hashing of administrator passwords.

use secrecy::{ExposeSecret, Secret};

use crate::Result;

/// Lowest bcrypt cost this crate will hash with.
pub const MIN_COST: u32 = 10;

/// Hash `password` with bcrypt at `cost`, never below [`MIN_COST`].
pub fn hash_password(password: &Secret<String>, cost: u32) -> Result<String> {
    Ok(bcrypt::hash(password.expose_secret(), cost.max(MIN_COST))?)
}

/// Check `password` against a stored bcrypt hash. Malformed hashes never match.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_verify() {
        let hash = hash_password(&Secret::new("test123".into()), MIN_COST).unwrap();
        assert!(hash.starts_with("$2b$10$"), "{hash}");
        assert!(verify_password("test123", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn cost_is_floored() {
        let hash = hash_password(&Secret::new("test123".into()), 4).unwrap();
        assert!(hash.starts_with("$2b$10$"), "{hash}");
    }

    #[test]
    fn salted_hashes_differ() {
        let pw = Secret::new("same-password".into());
        assert_ne!(
            hash_password(&pw, MIN_COST).unwrap(),
            hash_password(&pw, MIN_COST).unwrap()
        );
    }

    #[test]
    fn malformed_hash_never_matches() {
        assert!(!verify_password("anything", "not-a-hash"));
    }
}
