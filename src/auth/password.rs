//! Password hashing with Argon2id.
//!
//! Passwords get the slow, salted treatment; single-use tokens use the fast
//! SHA-256 digest in `verification.rs` since they must be looked up by hash.

use anyhow::{Result, anyhow};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand::rngs::OsRng;

/// Hash a plaintext password with a fresh random salt.
pub fn hash(plaintext: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let digest = Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|_| anyhow!("failed to hash password"))?
        .to_string();
    Ok(digest)
}

/// Verify a plaintext password against a stored digest.
///
/// Comparison happens inside the Argon2 crate and is constant-time with
/// respect to the digest. An unparseable digest verifies as false.
#[must_use]
pub fn verify(plaintext: &str, digest: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(digest) else {
        return false;
    };
    Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::{hash, verify};
    use anyhow::Result;

    #[test]
    fn hash_and_verify_round_trip() -> Result<()> {
        let digest = hash("P@ssw0rd1")?;
        assert!(verify("P@ssw0rd1", &digest));
        assert!(!verify("p@ssw0rd1", &digest));
        Ok(())
    }

    #[test]
    fn hashes_are_salted() -> Result<()> {
        let first = hash("P@ssw0rd1")?;
        let second = hash("P@ssw0rd1")?;
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn garbage_digest_verifies_false() {
        assert!(!verify("P@ssw0rd1", "not-a-phc-string"));
        assert!(!verify("P@ssw0rd1", ""));
    }
}
