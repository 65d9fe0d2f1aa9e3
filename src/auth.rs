//! Salted password hashing for the email/password flow.
//!
//! Stored form: `sha256$<salt>$<hex digest>`.

use sha2::{Digest, Sha256};
use uuid::Uuid;

pub fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    let digest = Sha256::digest(format!("{salt}{password}").as_bytes());
    format!("sha256${}${}", salt, hex::encode(digest))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.splitn(3, '$');
    let (Some(scheme), Some(salt), Some(expected)) = (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    if scheme != "sha256" {
        return false;
    }

    let digest = Sha256::digest(format!("{salt}{password}").as_bytes());
    let actual = hex::encode(digest);

    // Byte-wise comparison over full length to avoid early exit on mismatch
    if actual.len() != expected.len() {
        return false;
    }
    actual
        .bytes()
        .zip(expected.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_verifies() {
        let stored = hash_password("securepassword");
        assert!(verify_password("securepassword", &stored));
    }

    #[test]
    fn wrong_password_fails() {
        let stored = hash_password("securepassword");
        assert!(!verify_password("other", &stored));
    }

    #[test]
    fn salts_differ_between_hashes() {
        assert_ne!(hash_password("pw"), hash_password("pw"));
    }

    #[test]
    fn malformed_stored_value_fails_closed() {
        assert!(!verify_password("pw", "not-a-hash"));
        assert!(!verify_password("pw", "md5$abc$def"));
        assert!(!verify_password("pw", ""));
    }
}
