//! Crypto primitives: identity-key hashing, Argon2id passwords, secrets.
//!
//! # Purpose
//! Identities are looked up by an opaque HMAC-SHA256 of the normalized email
//! so the address never lands in an index. Passwords use Argon2id with a
//! self-describing encoded form; client secrets and session tokens are random
//! URL-safe strings. Comparisons against stored hashes are constant time.
//!
//! # Key invariants
//! - Email normalization (trim + lowercase) is identical on the provision and
//!   lookup paths; a mismatch would make identities unreachable.
//! - The encoded password hash carries its own parameters, so parameter
//!   changes only affect newly hashed passwords.
use crate::error::{Error, Result};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Normalize an email address for hashing and storage.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Compute the global identity key for an email: lowercase hex of
/// `HMAC-SHA256(key, trim(lowercase(email)))`.
pub fn email_hash(key: &str, email_plain: &str) -> String {
    let normalized = normalize_email(email_plain);
    let mut mac =
        HmacSha256::new_from_slice(key.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(normalized.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Deterministic placeholder for a missing profile picture, derived from the
/// normalized email. Rendering is left to the consuming plane.
pub fn placeholder_avatar(email_plain: &str) -> String {
    let digest = Sha256::digest(normalize_email(email_plain).as_bytes());
    format!("avatar://{}", &hex::encode(digest)[..16])
}

/// Generate an opaque credential: 32 random bytes, URL-safe base64 without
/// padding. Used for session identifiers and client secrets.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hash a client secret for storage (SHA-256, base64url).
pub fn hash_secret(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// Check a presented secret against its stored hash in constant time.
pub fn verify_secret(secret: &str, stored_hash: &str) -> bool {
    constant_time_eq(hash_secret(secret).as_bytes(), stored_hash.as_bytes())
}

/// Constant-time byte comparison. Length mismatch returns early; equal-length
/// inputs are always fully scanned.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (left, right) in a.iter().zip(b.iter()) {
        diff |= left ^ right;
    }
    diff == 0
}

/// Argon2id password hasher with tunable cost parameters.
///
/// Encoded form: `$argon2id$v=19$m=<kib>,t=<iters>,p=<lanes>$<salt>$<hash>`
/// with both base64 fields in the URL-safe alphabet, unpadded.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
    pub salt_len: usize,
    pub key_len: usize,
}

impl PasswordHasher {
    pub fn new(
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
        salt_len: usize,
        key_len: usize,
    ) -> Self {
        Self {
            memory_kib,
            iterations,
            parallelism,
            salt_len,
            key_len,
        }
    }

    pub fn from_config(config: &crate::config::Argon2Config) -> Self {
        Self::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            config.salt_len,
            config.key_len,
        )
    }

    /// Hash a password with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String> {
        let mut salt = vec![0u8; self.salt_len];
        rand::thread_rng().fill_bytes(&mut salt);

        let mut key = vec![0u8; self.key_len];
        self.derive(
            password,
            &salt,
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Version::V0x13,
            &mut key,
        )?;

        Ok(format!(
            "$argon2id$v={}$m={},t={},p={}${}${}",
            Version::V0x13 as u32,
            self.memory_kib,
            self.iterations,
            self.parallelism,
            URL_SAFE_NO_PAD.encode(&salt),
            URL_SAFE_NO_PAD.encode(&key),
        ))
    }

    /// Verify a password against an encoded hash. Rehashes with the stored
    /// parameters and compares in constant time. Errors only on malformed
    /// input, never on a plain mismatch.
    pub fn verify(&self, password: &str, encoded: &str) -> Result<bool> {
        let parts: Vec<&str> = encoded.split('$').collect();
        if parts.len() != 6 || !parts[0].is_empty() || parts[1] != "argon2id" {
            return Err(Error::invalid_input("malformed password hash"));
        }

        let version = match parse_param(parts[2], "v=")? {
            16 => Version::V0x10,
            19 => Version::V0x13,
            other => {
                return Err(Error::invalid_input(format!(
                    "unsupported argon2 version {other}"
                )));
            }
        };

        let params: Vec<&str> = parts[3].split(',').collect();
        if params.len() != 3 {
            return Err(Error::invalid_input("malformed argon2 parameters"));
        }
        let memory = parse_param(params[0], "m=")?;
        let iterations = parse_param(params[1], "t=")?;
        let parallelism = parse_param(params[2], "p=")?;

        let salt = URL_SAFE_NO_PAD
            .decode(parts[4])
            .map_err(|_| Error::invalid_input("malformed password hash salt"))?;
        let expected = URL_SAFE_NO_PAD
            .decode(parts[5])
            .map_err(|_| Error::invalid_input("malformed password hash digest"))?;

        let mut actual = vec![0u8; expected.len()];
        self.derive(
            password,
            &salt,
            memory,
            iterations,
            parallelism,
            version,
            &mut actual,
        )?;

        Ok(constant_time_eq(&actual, &expected))
    }

    fn derive(
        &self,
        password: &str,
        salt: &[u8],
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
        version: Version,
        out: &mut [u8],
    ) -> Result<()> {
        let params = Params::new(memory_kib, iterations, parallelism, Some(out.len()))
            .map_err(|err| Error::invalid_input(format!("argon2 parameters: {err}")))?;
        Argon2::new(Algorithm::Argon2id, version, params)
            .hash_password_into(password.as_bytes(), salt, out)
            .map_err(|err| Error::invalid_input(format!("argon2: {err}")))?;
        Ok(())
    }
}

fn parse_param(input: &str, prefix: &str) -> Result<u32> {
    input
        .strip_prefix(prefix)
        .and_then(|value| value.parse().ok())
        .ok_or_else(|| Error::invalid_input(format!("malformed argon2 parameter `{input}`")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_hasher() -> PasswordHasher {
        // Small costs keep the suite fast; production values come from config.
        PasswordHasher::new(32, 1, 1, 16, 32)
    }

    #[test]
    fn email_hash_normalizes_before_hashing() {
        let a = email_hash("test-key", "  User@Example.Com ");
        let b = email_hash("test-key", "user@example.com");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()));
    }

    #[test]
    fn email_hash_depends_on_key() {
        let a = email_hash("key-1", "user@example.com");
        let b = email_hash("key-2", "user@example.com");
        assert_ne!(a, b);
    }

    #[test]
    fn placeholder_avatar_is_deterministic() {
        assert_eq!(
            placeholder_avatar("User@Example.Com "),
            placeholder_avatar("user@example.com")
        );
        assert_ne!(
            placeholder_avatar("a@example.com"),
            placeholder_avatar("b@example.com")
        );
    }

    #[test]
    fn password_round_trip() {
        let hasher = test_hasher();
        let encoded = hasher.hash("secure-password").expect("hash");
        assert!(hasher.verify("secure-password", &encoded).expect("verify"));
        assert!(!hasher.verify("wrong-password", &encoded).expect("verify"));
    }

    #[test]
    fn encoded_form_is_self_describing() {
        let hasher = test_hasher();
        let encoded = hasher.hash("pw-123456").expect("hash");
        assert!(encoded.starts_with("$argon2id$v=19$m=32,t=1,p=1$"));
        // URL-safe alphabet, no padding.
        assert!(!encoded.contains('+'));
        assert!(!encoded.contains('/'));
        assert!(!encoded.contains('='), "only parameter fields may use '='");
    }

    #[test]
    fn verify_uses_stored_parameters() {
        // A hash produced under one cost must verify under a hasher
        // configured with different costs.
        let old = PasswordHasher::new(64, 2, 1, 16, 32);
        let encoded = old.hash("carried-over").expect("hash");
        let current = test_hasher();
        assert!(current.verify("carried-over", &encoded).expect("verify"));
    }

    #[test]
    fn verify_rejects_malformed_input() {
        let hasher = test_hasher();
        for bad in [
            "",
            "not-a-hash",
            "$argon2i$v=19$m=32,t=1,p=1$AAAA$AAAA",
            "$argon2id$v=19$m=32,t=1$AAAA$AAAA",
            "$argon2id$v=7$m=32,t=1,p=1$AAAA$AAAA",
            "$argon2id$v=19$m=32,t=1,p=1$!!$AAAA",
        ] {
            assert!(
                matches!(hasher.verify("pw", bad), Err(Error::InvalidInput(_))),
                "expected malformed-input error for {bad:?}"
            );
        }
    }

    #[test]
    fn salts_are_unique_per_hash() {
        let hasher = test_hasher();
        let a = hasher.hash("same-password").expect("hash");
        let b = hasher.hash("same-password").expect("hash");
        assert_ne!(a, b);
    }

    #[test]
    fn generated_tokens_are_url_safe() {
        let token = generate_token();
        // 32 bytes encode to 43 unpadded characters.
        assert_eq!(token.len(), 43);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
        assert_ne!(token, generate_token());
    }

    #[test]
    fn secret_hash_round_trip() {
        let secret = generate_token();
        let stored = hash_secret(&secret);
        assert!(verify_secret(&secret, &stored));
        assert!(!verify_secret("other-secret", &stored));
    }

    #[test]
    fn constant_time_eq_basics() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(constant_time_eq(b"", b""));
    }
}
