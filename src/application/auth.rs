//! Admin authentication: credential storage, login throttling, sessions.
//!
//! One shared password gates the editor. The credential at rest is a
//! salted SHA-256 record kept under an obfuscated store key; until one is
//! stored, a bootstrap default gates the first login and the first success
//! persists a real record.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use metrics::counter;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use crate::domain::validate;
use crate::infra::error::InfraError;
use crate::infra::store::{LocalStore, keys};

const TOKEN_PREFIX: &str = "as";
const MIN_SECRET_LEN: usize = 32;
const BOOTSTRAP_PASSWORD: &str = "admin123";
const MAX_BACKOFF_EXPONENT: u32 = 5;

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("too many attempts; retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
    #[error("incorrect password")]
    InvalidPassword,
    #[error("password rejected: {}", .reasons.join(", "))]
    WeakPassword { reasons: Vec<String> },
    #[error(transparent)]
    Store(#[from] InfraError),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("missing session token")]
    Missing,
    #[error("invalid session token")]
    Invalid,
    #[error("expired session token")]
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CredentialRecord {
    hash: String,
    salt: String,
}

impl CredentialRecord {
    fn derive(password: &str, salt: String) -> Self {
        Self {
            hash: hex::encode(hash_with_salt(password, &salt)),
            salt,
        }
    }

    fn matches(&self, password: &str) -> bool {
        let candidate = hash_with_salt(password, &self.salt);
        match hex::decode(&self.hash) {
            Ok(stored) => stored.ct_eq(&candidate).unwrap_u8() == 1,
            Err(_) => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionIssued {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

struct SessionEntry {
    hashed_secret: Vec<u8>,
    expires_at: OffsetDateTime,
}

struct AttemptEntry {
    count: u32,
    reset_at: Instant,
    backoff: u32,
}

/// Per-client login throttle. Hitting the attempt ceiling extends the
/// lockout window exponentially, saturating at 2^4 times the base window.
pub struct LoginRateLimiter {
    max_attempts: u32,
    window: Duration,
    attempts: DashMap<String, AttemptEntry>,
}

impl LoginRateLimiter {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
            attempts: DashMap::new(),
        }
    }

    pub fn allow(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut entry = self
            .attempts
            .entry(key.to_string())
            .or_insert_with(|| AttemptEntry {
                count: 0,
                reset_at: now + self.window,
                backoff: 1,
            });

        if now > entry.reset_at {
            entry.count = 1;
            entry.reset_at = now + self.window;
            entry.backoff = 1;
            return true;
        }
        if entry.count >= self.max_attempts {
            let lockout = self.window * 2u32.saturating_pow(entry.backoff - 1);
            entry.reset_at = now + lockout;
            entry.backoff = (entry.backoff + 1).min(MAX_BACKOFF_EXPONENT);
            return false;
        }
        entry.count += 1;
        true
    }

    /// Seconds until the client may try again, rounded up.
    pub fn retry_after_secs(&self, key: &str) -> u64 {
        let Some(entry) = self.attempts.get(key) else {
            return 0;
        };
        let remaining = entry.reset_at.saturating_duration_since(Instant::now());
        remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0)
    }

    pub fn reset(&self, key: &str) {
        self.attempts.remove(key);
    }
}

pub struct AdminAuthService {
    store: Arc<LocalStore>,
    limiter: LoginRateLimiter,
    sessions: DashMap<String, SessionEntry>,
    session_ttl: Duration,
}

impl AdminAuthService {
    pub fn new(store: Arc<LocalStore>, limiter: LoginRateLimiter, session_ttl: Duration) -> Self {
        Self {
            store,
            limiter,
            sessions: DashMap::new(),
            session_ttl,
        }
    }

    /// Trade a password for a bearer session, throttled per client.
    pub fn login(&self, client: &str, password: &str) -> Result<SessionIssued, LoginError> {
        if !self.limiter.allow(client) {
            counter!("vetrina_login_denied_total", "reason" => "throttled").increment(1);
            return Err(LoginError::RateLimited {
                retry_after_secs: self.limiter.retry_after_secs(client),
            });
        }
        if !self.verify_password(password)? {
            counter!("vetrina_login_denied_total", "reason" => "password").increment(1);
            return Err(LoginError::InvalidPassword);
        }
        self.limiter.reset(client);
        Ok(self.issue_session())
    }

    pub fn change_password(&self, current: &str, new: &str) -> Result<(), LoginError> {
        if !self.verify_password(current)? {
            return Err(LoginError::InvalidPassword);
        }
        let reasons = validate::password_strength(new);
        if !reasons.is_empty() {
            return Err(LoginError::WeakPassword { reasons });
        }
        self.persist_credential(&CredentialRecord::derive(new, generate_salt()))?;
        Ok(())
    }

    pub fn authenticate(&self, token: &str) -> Result<(), SessionError> {
        let (prefix, secret) = parse_token(token).ok_or(SessionError::Invalid)?;
        let now = OffsetDateTime::now_utc();

        let expired = {
            let entry = self.sessions.get(&prefix).ok_or(SessionError::Invalid)?;
            if entry.expires_at <= now {
                true
            } else {
                let hashed = hash_secret(&secret);
                if entry.hashed_secret.ct_eq(&hashed).unwrap_u8() == 0 {
                    return Err(SessionError::Invalid);
                }
                false
            }
        };
        if expired {
            self.sessions.remove(&prefix);
            return Err(SessionError::Expired);
        }
        Ok(())
    }

    pub fn revoke(&self, token: &str) {
        if let Some((prefix, _)) = parse_token(token) {
            self.sessions.remove(&prefix);
        }
    }

    fn verify_password(&self, password: &str) -> Result<bool, LoginError> {
        match self.load_credential() {
            Some(record) => Ok(record.matches(password)),
            None => {
                // First run: the bootstrap default gates the editor until a
                // real credential exists.
                let bootstrap = CredentialRecord::derive(BOOTSTRAP_PASSWORD, generate_salt());
                if bootstrap.matches(password) {
                    self.persist_credential(&CredentialRecord::derive(password, generate_salt()))?;
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
        }
    }

    fn load_credential(&self) -> Option<CredentialRecord> {
        let raw = self.store.get_secure(keys::ADMIN_CREDENTIAL)?;
        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(
                    target = "vetrina::auth",
                    error = %err,
                    "credential record could not be decoded, treating as unset"
                );
                None
            }
        }
    }

    fn persist_credential(&self, record: &CredentialRecord) -> Result<(), InfraError> {
        let raw = serde_json::to_string(record)
            .map_err(|err| InfraError::store(format!("failed to encode credential: {err}")))?;
        self.store.set_secure(keys::ADMIN_CREDENTIAL, &raw)
    }

    fn issue_session(&self) -> SessionIssued {
        let prefix = Uuid::new_v4().simple().to_string()[..12].to_string();
        let secret = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        let token = format!("{TOKEN_PREFIX}_{prefix}_{secret}");
        let expires_at = OffsetDateTime::now_utc() + self.session_ttl;
        self.sessions.insert(
            prefix,
            SessionEntry {
                hashed_secret: hash_secret(&secret),
                expires_at,
            },
        );
        SessionIssued { token, expires_at }
    }
}

fn hash_with_salt(password: &str, salt: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(salt.as_bytes());
    hasher.finalize().to_vec()
}

fn hash_secret(secret: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.finalize().to_vec()
}

fn generate_salt() -> String {
    Uuid::new_v4().simple().to_string()
}

fn parse_token(token: &str) -> Option<(String, String)> {
    let mut parts = token.splitn(3, '_');
    if parts.next()? != TOKEN_PREFIX {
        return None;
    }
    let prefix = parts.next()?;
    let secret = parts.next()?;
    if prefix.is_empty() || secret.len() < MIN_SECRET_LEN {
        return None;
    }
    Some((prefix.to_string(), secret.to_string()))
}
