use std::sync::Arc;

use tracing::{Level, event};

use crate::token::CredentialStore;

/// Receives the single "recovery is impossible" signal from the client.
pub trait SessionManager: Send + Sync {
    fn end_session(&self);
}

impl<T: SessionManager + ?Sized> SessionManager for Arc<T> {
    fn end_session(&self) {
        (**self).end_session()
    }
}

type EndHook = Box<dyn Fn() + Send + Sync>;

/// Ends a session by clearing the credential store, then running an optional
/// hook (navigate to sign-in, drop cached views, and so on).
pub struct StoreSession {
    store: Arc<dyn CredentialStore>,
    on_end: Option<EndHook>,
}

impl StoreSession {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store, on_end: None }
    }

    pub fn on_end(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_end = Some(Box::new(hook));
        self
    }
}

impl SessionManager for StoreSession {
    fn end_session(&self) {
        self.store.clear();
        event!(Level::WARN, "session.end");
        if let Some(hook) = &self.on_end {
            hook();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::token::{Credential, MemoryCredentialStore};

    #[test]
    fn end_session_clears_store_and_runs_hook() {
        let store = Arc::new(MemoryCredentialStore::with_credential(Credential::new("A", "R")));
        let hits = Arc::new(AtomicUsize::new(0));
        let session = StoreSession::new(store.clone()).on_end({
            let hits = hits.clone();
            move || {
                hits.fetch_add(1, Ordering::SeqCst);
            }
        });

        session.end_session();

        assert!(store.get().is_none());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
