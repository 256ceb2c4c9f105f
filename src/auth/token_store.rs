//! In-process bearer-token store.
//!
//! Tokens are opaque 128-bit random values rendered as 32-char lowercase hex.
//! They never expire on their own and are lost on process restart; a crashed
//! process forces every user to re-authenticate. The trait is the seam where
//! a multi-instance deployment would plug in a shared store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// Mapping from opaque bearer tokens to usernames.
///
/// None of the operations fail: absence is a valid lookup result and revoking
/// an unknown token is a no-op.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Generate a new globally-unique token for `username` and record the
    /// mapping. A username may own multiple simultaneous tokens until
    /// explicitly cleared.
    async fn issue(&self, username: &str) -> String;

    /// Resolve a token to its owning username, if currently valid.
    async fn lookup(&self, token: &str) -> Option<String>;

    /// Remove the mapping if present. Idempotent.
    async fn revoke(&self, token: &str);

    /// Remove every token owned by `username`.
    async fn revoke_all_for(&self, username: &str);
}

/// Single-process implementation: one lock over the whole map, so all
/// operations are serialized with respect to each other. The lock is held
/// only for O(map size) work (a linear scan during `revoke_all_for`).
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    tokens: Mutex<HashMap<String, String>>,
}

impl InMemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn issue(&self, username: &str) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let mut tokens = self.tokens.lock().unwrap();
        tokens.insert(token.clone(), username.to_string());
        token
    }

    async fn lookup(&self, token: &str) -> Option<String> {
        if token.is_empty() {
            return None;
        }
        let tokens = self.tokens.lock().unwrap();
        tokens.get(token).cloned()
    }

    async fn revoke(&self, token: &str) {
        let mut tokens = self.tokens.lock().unwrap();
        tokens.remove(token);
    }

    async fn revoke_all_for(&self, username: &str) {
        let mut tokens = self.tokens.lock().unwrap();
        tokens.retain(|_, owner| owner != username);
    }
}
