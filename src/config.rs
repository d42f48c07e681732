use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

// Kernel configuration sourced from environment variables, with an optional
// YAML override file for ops-managed deployments.
#[derive(Debug, Clone)]
pub struct KernelConfig {
    // Argon2id cost parameters for password hashing.
    pub argon2: Argon2Config,
    // Process-wide HMAC key deriving the global identity hash.
    pub hmac_key: String,
    // Failed-login lockout policy.
    pub lockout: LockoutConfig,
    // Session lifetime policy.
    pub session: SessionConfig,
}

#[derive(Debug, Clone)]
pub struct Argon2Config {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
    pub salt_len: usize,
    pub key_len: usize,
}

#[derive(Debug, Clone)]
pub struct LockoutConfig {
    pub max_attempts: u32,
    pub duration_secs: i64,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub lifetime_secs: i64,
    pub idle_timeout_secs: i64,
}

#[derive(Debug, Deserialize)]
struct KernelConfigOverride {
    hmac_key: Option<String>,
    argon2_memory_kib: Option<u32>,
    argon2_iterations: Option<u32>,
    argon2_parallelism: Option<u32>,
    lockout_max_attempts: Option<u32>,
    lockout_duration_secs: Option<i64>,
    session_lifetime_secs: Option<i64>,
    session_idle_timeout_secs: Option<i64>,
}

impl KernelConfig {
    pub fn from_env() -> Result<Self> {
        // Environment variables provide defaults for local development.
        // The HMAC key has a dev-only fallback; deployments must set it.
        let hmac_key =
            std::env::var("WARDEN_HMAC_KEY").unwrap_or_else(|_| "dev-insecure-key".to_string());
        let argon2 = Argon2Config {
            memory_kib: env_parse("WARDEN_ARGON2_MEMORY_KIB", 65536)?,
            iterations: env_parse("WARDEN_ARGON2_ITERATIONS", 3)?,
            parallelism: env_parse("WARDEN_ARGON2_PARALLELISM", 4)?,
            salt_len: env_parse("WARDEN_ARGON2_SALT_LEN", 16)?,
            key_len: env_parse("WARDEN_ARGON2_KEY_LEN", 32)?,
        };
        let lockout = LockoutConfig {
            max_attempts: env_parse("WARDEN_LOCKOUT_MAX_ATTEMPTS", 5)?,
            duration_secs: env_parse("WARDEN_LOCKOUT_DURATION_SECS", 15 * 60)?,
        };
        let session = SessionConfig {
            lifetime_secs: env_parse("WARDEN_SESSION_LIFETIME_SECS", 24 * 60 * 60)?,
            idle_timeout_secs: env_parse("WARDEN_SESSION_IDLE_TIMEOUT_SECS", 30 * 60)?,
        };
        Ok(Self {
            argon2,
            hmac_key,
            lockout,
            session,
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("WARDEN_CONFIG") {
            // YAML overrides allow ops-friendly config files.
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read WARDEN_CONFIG: {path}"))?;
            let override_cfg: KernelConfigOverride =
                serde_yaml::from_str(&contents).with_context(|| "parse kernel config yaml")?;
            if let Some(value) = override_cfg.hmac_key {
                config.hmac_key = value;
            }
            if let Some(value) = override_cfg.argon2_memory_kib {
                config.argon2.memory_kib = value;
            }
            if let Some(value) = override_cfg.argon2_iterations {
                config.argon2.iterations = value;
            }
            if let Some(value) = override_cfg.argon2_parallelism {
                config.argon2.parallelism = value;
            }
            if let Some(value) = override_cfg.lockout_max_attempts {
                config.lockout.max_attempts = value;
            }
            if let Some(value) = override_cfg.lockout_duration_secs {
                config.lockout.duration_secs = value;
            }
            if let Some(value) = override_cfg.session_lifetime_secs {
                config.session.lifetime_secs = value;
            }
            if let Some(value) = override_cfg.session_idle_timeout_secs {
                config.session.idle_timeout_secs = value;
            }
        }
        Ok(config)
    }
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(value) => value.parse().with_context(|| format!("parse {key}")),
        Err(_) => Ok(default),
    }
}
