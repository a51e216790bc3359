use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;
const ITERATIONS: u32 = 100_000;

/// Hashes a password with PBKDF2-HMAC-SHA256 into a self-describing
/// `{iterations}.{salt}.{key}` string. A fresh salt is drawn per call.
///
/// An empty or whitespace-only password is a contract violation, not a user
/// condition, and fails with an error.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    if password.trim().is_empty() {
        return Err(anyhow::anyhow!("Password must not be empty"));
    }

    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let key = derive_key(password, &salt, ITERATIONS);

    Ok(format!(
        "{}.{}.{}",
        ITERATIONS,
        BASE64.encode(salt),
        BASE64.encode(key)
    ))
}

/// Re-derives with the parameters embedded in `encoded` and compares in
/// constant time. Returns false on any malformed input; never errors.
pub fn verify_password(password: &str, encoded: &str) -> bool {
    let mut parts = encoded.splitn(3, '.');
    let (Some(iterations), Some(salt), Some(key)) = (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };

    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    if iterations == 0 {
        return false;
    }
    let Ok(salt) = BASE64.decode(salt) else {
        return false;
    };
    let Ok(stored_key) = BASE64.decode(key) else {
        return false;
    };

    let derived = derive_key(password, &salt, iterations);
    constant_time_eq(&derived, &stored_key)
}

fn derive_key(password: &str, salt: &[u8], iterations: u32) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
    key
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let pw = "S3cr3t!";
        let hash = hash_password(pw).expect("hash should succeed");
        assert!(verify_password(pw, &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn hash_rejects_blank_passwords() {
        assert!(hash_password("").is_err());
        assert!(hash_password("   \t").is_err());
    }

    #[test]
    fn encoded_form_is_self_describing() {
        let hash = hash_password("hunter22").expect("hash");
        let parts: Vec<&str> = hash.split('.').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "100000");
        assert_eq!(BASE64.decode(parts[1]).expect("salt").len(), SALT_LEN);
        assert_eq!(BASE64.decode(parts[2]).expect("key").len(), KEY_LEN);
    }

    #[test]
    fn verify_is_false_on_malformed_hashes() {
        assert!(!verify_password("pw", ""));
        assert!(!verify_password("pw", "no-dots-here"));
        assert!(!verify_password("pw", "abc.def.ghi"));
        assert!(!verify_password("pw", "0.c2FsdA==.a2V5"));
        assert!(!verify_password("pw", "100000.!!!.a2V5"));
    }

    #[test]
    fn constant_time_eq_works() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"short", b"longer"));
    }
}
