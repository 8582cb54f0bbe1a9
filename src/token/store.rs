//! Credential storage seam.
//!
//! Persistence belongs to the embedding application; the client only needs
//! to read the current pair, replace it after a refresh, and clear it when
//! the session ends.

use std::sync::Arc;

use parking_lot::RwLock;

use super::Credential;

/// Holder of the one active credential for a client instance.
pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Option<Credential>;

    fn set(&self, credential: Credential);

    fn clear(&self);

    /// Current access token, if a non-empty one is stored.
    fn access_token(&self) -> Option<String> {
        self.get()
            .and_then(|c| c.access_token().map(str::to_string))
    }

    /// Current refresh token, if a non-empty one is stored.
    fn refresh_token(&self) -> Option<String> {
        self.get()
            .and_then(|c| c.refresh_token().map(str::to_string))
    }
}

impl<T: CredentialStore + ?Sized> CredentialStore for Arc<T> {
    fn get(&self) -> Option<Credential> {
        (**self).get()
    }
    fn set(&self, credential: Credential) {
        (**self).set(credential)
    }
    fn clear(&self) {
        (**self).clear()
    }
}

/// In-memory store; the default for tests and short-lived tools.
#[derive(Default)]
pub struct MemoryCredentialStore {
    credential: RwLock<Option<Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: Credential) -> Self {
        Self {
            credential: RwLock::new(Some(credential)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Option<Credential> {
        self.credential.read().clone()
    }

    fn set(&self, credential: Credential) {
        *self.credential.write() = Some(credential);
    }

    fn clear(&self) {
        self.credential.write().take();
    }
}
