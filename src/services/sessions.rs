//! Process-wide session table.
//!
//! Tokens are 256 random bits, hex encoded, with a fixed time to live. The
//! table starts empty on every process start; nothing is persisted.

use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;

use crate::{
    error::{AppError, AppResult},
    models::Identity,
};

#[derive(Debug, Clone)]
struct Session {
    identity: Identity,
    expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Open a session for `identity` and return its bearer token
    pub fn issue(&self, identity: Identity, now: DateTime<Utc>) -> AppResult<String> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AppError::Internal("Session expiry out of range".to_string()))?;
        let token = new_token();
        let session = Session {
            identity,
            expires_at,
        };
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.clone(), session);
        Ok(token)
    }

    /// Identity behind a live token; an expired token is dropped on sight
    pub fn resolve(&self, token: &str, now: DateTime<Utc>) -> Option<Identity> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let expires_at = sessions.get(token)?.expires_at;
        if expires_at <= now {
            sessions.remove(token);
            return None;
        }
        sessions.get(token).map(|s| s.identity.clone())
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token)
            .is_some()
    }

    /// Remove every session expired at `now`, returning how many went
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn new_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
