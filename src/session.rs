//! Session-scoped token store
//!
//! Tokens, the guest flag and the cached Info payload live in a key/value
//! store owned by the host application and scoped to the caller's session.
//! [`SessionStore`] is that store's interface; [`MemorySessionStore`] is an
//! in-process implementation backed by Moka. [`TokenCache`] is the typed view
//! the client works through.

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache as MokaCache;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::config::GuestState;
use crate::eds::models::{AutocompleteSettings, Info};
use crate::error::Result;

/// Keys written to the session store
pub mod keys {
    pub const AUTH_TOKEN: &str = "EBSCO.authenticationToken";
    pub const AUTH_EXPIRY: &str = "EBSCO.authenticationExpiry";
    pub const SESSION_TOKEN: &str = "EBSCO.sessionToken";
    pub const GUEST: &str = "EBSCO.isGuest";
    pub const INFO: &str = "EBSCO.info";
    pub const AUTOCOMPLETE: &str = "EBSCO.autocomplete";
}

/// Key/value store scoped to one caller session
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn remove(&self, key: &str);
}

/// In-memory session store backed by Moka
#[derive(Clone)]
pub struct MemorySessionStore {
    cache: MokaCache<String, String>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            cache: MokaCache::builder().max_capacity(64).build(),
        }
    }

    /// Entries not touched for `idle` are evicted, like an expiring host session
    pub fn with_idle_timeout(idle: Duration) -> Self {
        Self {
            cache: MokaCache::builder()
                .max_capacity(64)
                .time_to_idle(idle)
                .build(),
        }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.cache.get(key)
    }

    fn set(&self, key: &str, value: String) {
        self.cache.insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.cache.invalidate(key);
    }
}

#[derive(Serialize, Deserialize)]
struct CachedInfo {
    /// Unix timestamp of the fetch
    cached_at: i64,
    info: Info,
}

fn now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// Typed access to the tokens kept in a [`SessionStore`]
///
/// Empty values are never written.
#[derive(Clone)]
pub struct TokenCache {
    store: Arc<dyn SessionStore>,
}

impl TokenCache {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    fn get_non_empty(&self, key: &str) -> Option<String> {
        self.store.get(key).filter(|v| !v.is_empty())
    }

    /// Cached authentication token, unless it has expired
    pub fn auth_token(&self) -> Option<String> {
        let token = self.get_non_empty(keys::AUTH_TOKEN)?;
        let expiry = self
            .get_non_empty(keys::AUTH_EXPIRY)
            .and_then(|e| e.parse::<i64>().ok());
        match expiry {
            Some(expiry) if now() >= expiry => {
                debug!("Cached authentication token has expired");
                None
            }
            _ => Some(token),
        }
    }

    /// Store an authentication token and its lifetime in seconds (0 = unknown)
    pub fn set_auth_token(&self, token: &str, timeout_secs: u64) {
        if token.is_empty() {
            return;
        }
        self.store.set(keys::AUTH_TOKEN, token.to_string());
        if timeout_secs > 0 {
            let lifetime = i64::try_from(timeout_secs).unwrap_or(i64::MAX);
            let expiry = now().saturating_add(lifetime);
            self.store.set(keys::AUTH_EXPIRY, expiry.to_string());
        } else {
            self.store.remove(keys::AUTH_EXPIRY);
        }
    }

    pub fn session_token(&self) -> Option<String> {
        self.get_non_empty(keys::SESSION_TOKEN)
    }

    /// Store a session token together with the guest state it was created for
    pub fn set_session_token(&self, token: &str, guest: GuestState) {
        if token.is_empty() {
            return;
        }
        self.store.set(keys::SESSION_TOKEN, token.to_string());
        self.store.set(keys::GUEST, guest.as_flag().to_string());
    }

    /// Guest state of the cached session
    pub fn guest_state(&self) -> Option<GuestState> {
        self.get_non_empty(keys::GUEST)
            .and_then(|flag| GuestState::from_flag(&flag))
    }

    /// Cached Info payload, if present and younger than `ttl`
    ///
    /// `ttl = None` keeps the entry for the lifetime of the session.
    pub fn info(&self, ttl: Option<Duration>) -> Option<Info> {
        let raw = self.get_non_empty(keys::INFO)?;
        let cached: CachedInfo = match serde_json::from_str(&raw) {
            Ok(cached) => cached,
            Err(e) => {
                debug!(error = %e, "Discarding unreadable cached info");
                return None;
            }
        };
        if let Some(ttl) = ttl {
            let age = now().saturating_sub(cached.cached_at);
            if age >= i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX) {
                debug!(age_secs = age, "Cached info is stale");
                return None;
            }
        }
        Some(cached.info)
    }

    pub fn set_info(&self, info: &Info) -> Result<()> {
        let entry = serde_json::to_string(&CachedInfo {
            cached_at: now(),
            info: info.clone(),
        })?;
        self.store.set(keys::INFO, entry);
        Ok(())
    }

    pub fn invalidate_info(&self) {
        self.store.remove(keys::INFO);
        info!("Cached info invalidated");
    }

    pub fn autocomplete(&self) -> Option<AutocompleteSettings> {
        self.get_non_empty(keys::AUTOCOMPLETE)
            .and_then(|raw| serde_json::from_str(&raw).ok())
    }

    pub fn set_autocomplete(&self, settings: &AutocompleteSettings) -> Result<()> {
        if !settings.is_configured() {
            return Ok(());
        }
        self.store
            .set(keys::AUTOCOMPLETE, serde_json::to_string(settings)?);
        Ok(())
    }
}
