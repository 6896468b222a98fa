use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

pub const DEFAULT_ITERATIONS: u32 = 600_000;
const SALT_LENGTH: usize = 16;
const HASH_LENGTH: usize = 32;
const SCHEME: &str = "pbkdf2-sha256";

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; HASH_LENGTH] {
    let mut hash = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut hash);
    hash
}

/// Hash a password as `pbkdf2-sha256$<iterations>$<salt hex>$<hash hex>`.
pub fn hash_password(password: &str, iterations: u32) -> String {
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    let hash = derive(password, &salt, iterations);
    format!("{SCHEME}${iterations}${}${}", hex::encode(salt), hex::encode(hash))
}

/// Check a password against a stored hash. Malformed hashes never verify.
pub fn verify_password(password: &str, encoded: &str) -> bool {
    let mut parts = encoded.split('$');
    let (Some(SCHEME), Some(iterations), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };

    let (Ok(iterations), Ok(salt), Ok(expected)) =
        (iterations.parse::<u32>(), hex::decode(salt), hex::decode(expected))
    else {
        return false;
    };
    if iterations == 0 {
        return false;
    }

    let actual = derive(password, &salt, iterations);
    actual.as_slice().ct_eq(expected.as_slice()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST: u32 = 1_000;

    #[test]
    fn hash_verifies_only_the_right_password() {
        let encoded = hash_password("test123", FAST);
        assert!(encoded.starts_with("pbkdf2-sha256$1000$"));
        assert!(verify_password("test123", &encoded));
        assert!(!verify_password("test124", &encoded));
    }

    #[test]
    fn salts_differ_between_hashes() {
        assert_ne!(hash_password("same", FAST), hash_password("same", FAST));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("x", ""));
        assert!(!verify_password("x", "plaintext"));
        assert!(!verify_password("x", "pbkdf2-sha256$abc$00$00"));
        assert!(!verify_password("x", "pbkdf2-sha256$0$00$00"));
        assert!(!verify_password("x", "md5$1000$00$00"));
    }
}
