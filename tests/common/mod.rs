#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use locker_console_client::{
    ApiClient, ClientConfig, Credential, CredentialStore, MemoryCredentialStore, SessionManager,
};
use wiremock::{MockServer, Request};

/// Clears the store like a real session end, and counts how often it ran.
pub struct RecordingSession {
    store: Arc<dyn CredentialStore>,
    ended: AtomicUsize,
}

impl RecordingSession {
    pub fn count(&self) -> usize {
        self.ended.load(Ordering::SeqCst)
    }
}

impl SessionManager for RecordingSession {
    fn end_session(&self) {
        self.store.clear();
        self.ended.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct Fixture {
    pub client: ApiClient,
    pub store: Arc<MemoryCredentialStore>,
    pub session: Arc<RecordingSession>,
}

pub fn config(server: &MockServer) -> ClientConfig {
    ClientConfig::from_values(server.uri(), Some(5), None, None, None)
}

pub fn fixture(server: &MockServer, credential: Option<Credential>) -> Fixture {
    fixture_with(config(server), credential)
}

pub fn fixture_with(config: ClientConfig, credential: Option<Credential>) -> Fixture {
    let store = Arc::new(match credential {
        Some(c) => MemoryCredentialStore::with_credential(c),
        None => MemoryCredentialStore::new(),
    });
    let session = Arc::new(RecordingSession {
        store: store.clone(),
        ended: AtomicUsize::new(0),
    });
    let client = ApiClient::new(config, store.clone(), session.clone())
        .expect("client construction");
    Fixture {
        client,
        store,
        session,
    }
}

pub fn authorization(req: &Request) -> Option<String> {
    req.headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
}

/// Authorization headers of every request the server saw on `path`.
pub async fn authorizations_on(server: &MockServer, path: &str) -> Vec<Option<String>> {
    server
        .received_requests()
        .await
        .expect("request recording enabled")
        .iter()
        .filter(|req| req.url.path() == path)
        .map(authorization)
        .collect()
}
