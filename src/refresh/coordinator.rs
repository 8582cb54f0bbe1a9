use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::debug;

use crate::errors::{Error, RefreshFailure};
use crate::session::SessionManager;
use crate::telemetry::refresh::RefreshTelemetry;
use crate::token::{Credential, CredentialStore};

type Resumption = Result<String, RefreshFailure>;

struct Waiter {
    ticket: u64,
    resume: oneshot::Sender<Resumption>,
}

/// Coordination state for one client. `in_progress` and the queue only ever
/// change together, under the coordinator's lock.
#[derive(Default)]
struct RefreshState {
    in_progress: bool,
    waiters: VecDeque<Waiter>,
    telemetry: Option<RefreshTelemetry>,
}

enum Entry {
    Lead {
        refresh_token: String,
        telemetry: RefreshTelemetry,
    },
    Wait {
        ticket: u64,
        resume: oneshot::Receiver<Resumption>,
    },
    Current(String),
    Absent,
}

/// Single-flight engine for recovering from expired access tokens.
///
/// The first caller to report a 401 while idle leads a refresh cycle and runs
/// the exchange; everyone reporting a 401 while that cycle is open queues
/// behind it and is resumed, in arrival order, with the cycle's outcome.
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
    store: Arc<dyn CredentialStore>,
    session: Arc<dyn SessionManager>,
    next_ticket: AtomicU64,
    cycles_started: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new(store: Arc<dyn CredentialStore>, session: Arc<dyn SessionManager>) -> Self {
        Self {
            state: Mutex::new(RefreshState::default()),
            store,
            session,
            next_ticket: AtomicU64::new(1),
            cycles_started: AtomicU64::new(0),
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.state.lock().in_progress
    }

    pub fn pending_waiters(&self) -> usize {
        self.state.lock().waiters.len()
    }

    /// Number of exchanges this coordinator has started.
    pub fn cycles_started(&self) -> u64 {
        self.cycles_started.load(Ordering::SeqCst)
    }

    /// Recovers from a 401 on a protected call that was sent with
    /// `sent_token`, returning the access token to retry with.
    ///
    /// `exchange` runs only if this caller ends up leading a new cycle.
    pub async fn recover<F, Fut>(
        &self,
        sent_token: Option<&str>,
        exchange: F,
    ) -> Result<String, Error>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<Credential, RefreshFailure>>,
    {
        match self.enter(sent_token) {
            Entry::Current(token) => {
                debug!("credential already replaced since request was sent; retrying");
                Ok(token)
            }
            Entry::Absent => {
                self.session.end_session();
                Err(Error::SessionAbsent)
            }
            Entry::Wait { ticket, resume } => match resume.await {
                Ok(Ok(token)) => Ok(token),
                Ok(Err(failure)) => Err(Error::RefreshRejected(failure)),
                Err(_) => {
                    debug!(ticket, "waiter channel closed without resumption");
                    Err(Error::RefreshRejected(RefreshFailure::Aborted))
                }
            },
            Entry::Lead {
                refresh_token,
                telemetry,
            } => self.lead(refresh_token, telemetry, exchange).await,
        }
    }

    /// The check-and-set step. Runs entirely under the lock with no await.
    fn enter(&self, sent_token: Option<&str>) -> Entry {
        let mut state = self.state.lock();
        if state.in_progress {
            let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst);
            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(Waiter { ticket, resume: tx });
            if let Some(telemetry) = &state.telemetry {
                telemetry.emit_waiter_enqueued(ticket, state.waiters.len());
            }
            return Entry::Wait { ticket, resume: rx };
        }

        let current = self.store.get();
        if let Some(token) = current.as_ref().and_then(Credential::access_token)
            && Some(token) != sent_token
        {
            return Entry::Current(token.to_string());
        }
        let Some(refresh_token) = current
            .as_ref()
            .and_then(Credential::refresh_token)
            .map(str::to_string)
        else {
            return Entry::Absent;
        };

        let telemetry = RefreshTelemetry::new("dispatch.unauthorized");
        state.in_progress = true;
        state.telemetry = Some(telemetry.clone());
        self.cycles_started.fetch_add(1, Ordering::SeqCst);
        Entry::Lead {
            refresh_token,
            telemetry,
        }
    }

    async fn lead<F, Fut>(
        &self,
        refresh_token: String,
        telemetry: RefreshTelemetry,
        exchange: F,
    ) -> Result<String, Error>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<Credential, RefreshFailure>>,
    {
        let mut cycle = Cycle {
            coordinator: self,
            telemetry,
            started: Instant::now(),
            open: true,
        };
        cycle.telemetry.emit_start();

        match exchange(refresh_token).await {
            Ok(credential) => {
                let token = credential.access_token.clone();
                self.store.set(credential);
                cycle.close(Ok(token.clone()));
                Ok(token)
            }
            Err(failure) => {
                self.session.end_session();
                cycle.close(Err(failure.clone()));
                Err(Error::RefreshRejected(failure))
            }
        }
    }
}

/// An open refresh cycle. Closing it resets the state and resumes the queue;
/// dropping it unclosed closes it as aborted.
struct Cycle<'a> {
    coordinator: &'a RefreshCoordinator,
    telemetry: RefreshTelemetry,
    started: Instant,
    open: bool,
}

impl Cycle<'_> {
    fn close(&mut self, outcome: Resumption) {
        if !self.open {
            return;
        }
        self.open = false;

        let waiters = {
            let mut state = self.coordinator.state.lock();
            state.in_progress = false;
            state.telemetry = None;
            std::mem::take(&mut state.waiters)
        };

        let elapsed = self.started.elapsed();
        match &outcome {
            Ok(_) => self.telemetry.emit_success(elapsed, waiters.len()),
            Err(failure) => self.telemetry.emit_failure(failure, elapsed, waiters.len()),
        }
        for waiter in waiters {
            let _ = waiter.resume.send(outcome.clone());
            self.telemetry.emit_waiter_resumed(waiter.ticket, outcome.is_ok());
        }
    }
}

impl Drop for Cycle<'_> {
    fn drop(&mut self) {
        self.close(Err(RefreshFailure::Aborted));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::token::MemoryCredentialStore;

    #[derive(Default)]
    struct CountingSession(AtomicUsize);

    impl SessionManager for CountingSession {
        fn end_session(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn coordinator(
        credential: Option<Credential>,
    ) -> (RefreshCoordinator, Arc<MemoryCredentialStore>, Arc<CountingSession>) {
        let store = Arc::new(match credential {
            Some(c) => MemoryCredentialStore::with_credential(c),
            None => MemoryCredentialStore::new(),
        });
        let session = Arc::new(CountingSession::default());
        (
            RefreshCoordinator::new(store.clone(), session.clone()),
            store,
            session,
        )
    }

    #[tokio::test(flavor = "current_thread")]
    async fn leader_refreshes_and_stores_credential() {
        let (coord, store, session) = coordinator(Some(Credential::new("A1", "R1")));
        let token = coord
            .recover(Some("A1"), |refresh| async move {
                assert_eq!(refresh, "R1");
                Ok(Credential::new("A2", "R2"))
            })
            .await
            .expect("refresh succeeds");

        assert_eq!(token, "A2");
        assert_eq!(store.get(), Some(Credential::new("A2", "R2")));
        assert_eq!(session.0.load(Ordering::SeqCst), 0);
        assert!(!coord.is_refreshing());
        assert_eq!(coord.cycles_started(), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn missing_refresh_token_ends_session_without_exchange() {
        let (coord, _store, session) = coordinator(Some(Credential::new("A1", "")));
        let err = coord
            .recover(Some("A1"), |_| async { Err(RefreshFailure::Aborted) })
            .await
            .expect_err("no refresh token");

        assert!(matches!(err, Error::SessionAbsent));
        assert_eq!(session.0.load(Ordering::SeqCst), 1);
        assert_eq!(coord.cycles_started(), 0);
        assert!(!coord.is_refreshing());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn stale_token_short_circuits_to_current() {
        let (coord, _store, session) = coordinator(Some(Credential::new("A2", "R2")));
        let token = coord
            .recover(Some("A1"), |_| async { Ok(Credential::new("X", "Y")) })
            .await
            .unwrap();
        assert_eq!(token, "A2");
        assert_eq!(coord.cycles_started(), 0);
        assert_eq!(session.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn failed_exchange_ends_session_once_and_resets() {
        let (coord, _store, session) = coordinator(Some(Credential::new("A1", "R1")));
        let err = coord
            .recover(Some("A1"), |_| async {
                Err(RefreshFailure::Rejected {
                    status: 401,
                    message: "expired".into(),
                })
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::RefreshRejected(RefreshFailure::Rejected { status: 401, .. })
        ));
        assert_eq!(session.0.load(Ordering::SeqCst), 1);
        assert!(!coord.is_refreshing());
        assert_eq!(coord.pending_waiters(), 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn dropped_leader_releases_waiters_as_aborted() {
        let (coord, _store, session) = coordinator(Some(Credential::new("A1", "R1")));
        let coord = Arc::new(coord);

        let leader = tokio::spawn({
            let coord = coord.clone();
            async move { coord.recover(Some("A1"), |_| std::future::pending()).await }
        });
        while !coord.is_refreshing() {
            tokio::task::yield_now().await;
        }
        let waiter = tokio::spawn({
            let coord = coord.clone();
            async move { coord.recover(Some("A1"), |_| std::future::pending()).await }
        });
        while coord.pending_waiters() < 1 {
            tokio::task::yield_now().await;
        }

        leader.abort();
        let err = waiter.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::RefreshRejected(RefreshFailure::Aborted)));
        assert!(!coord.is_refreshing());
        assert_eq!(session.0.load(Ordering::SeqCst), 0);
    }
}
