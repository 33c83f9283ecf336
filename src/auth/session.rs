//! In-memory login sessions keyed by the SHA-256 of an opaque bearer token.
//!
//! Tokens never rest in memory in the clear; a restart logs everyone out.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use base64::Engine;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub user_id: i64,
    pub username: String,
}

struct Session {
    user: SessionUser,
    expires_at: Instant,
}

pub struct SessionStore {
    sessions: HashMap<[u8; 32], Session>,
    lifetime: Duration,
}

impl SessionStore {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            lifetime,
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Open a session and return its bearer token.
    pub fn create(&mut self, user: SessionUser) -> String {
        self.purge_expired();
        let token = generate_token();
        self.sessions.insert(
            hash_token(&token),
            Session {
                user,
                expires_at: Instant::now() + self.lifetime,
            },
        );
        token
    }

    /// The session's user, if the token is known and not expired.
    pub fn validate(&mut self, token: &str) -> Option<SessionUser> {
        let key = hash_token(token);
        match self.sessions.get(&key) {
            Some(session) if session.expires_at > Instant::now() => Some(session.user.clone()),
            Some(_) => {
                self.sessions.remove(&key);
                None
            }
            None => None,
        }
    }

    pub fn revoke(&mut self, token: &str) -> bool {
        self.sessions.remove(&hash_token(token)).is_some()
    }

    pub fn purge_expired(&mut self) {
        let now = Instant::now();
        self.sessions.retain(|_, s| s.expires_at > now);
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }
}

/// SHA-256 hash of a bearer token.
pub fn hash_token(token: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

/// Random bearer token (URL-safe base64, 32 bytes of entropy).
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
