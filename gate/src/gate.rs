//! The auth gate: session changes in, access snapshots out.
//!
//! ARCHITECTURE
//! ============
//! `AuthGate` is a cheaply cloneable handle around shared state. The derived
//! [`AccessSnapshot`] lives in a `watch` channel; the gate is its only writer
//! and every front end reads it through [`AuthGate::subscribe`].
//!
//! Each resolution pass takes a sequence number when it starts. A pass whose
//! number is lower than the most recently started pass is discarded when it
//! finishes, so a slow lookup for an old session can never overwrite the
//! result for a newer one. Passes are not cancelled; they run to completion
//! and are dropped at the end if stale.
//!
//! Within one pass the admin lookup always finishes before the client lookup
//! is issued. An admin role ends the pass without a client lookup.
//!
//! ERROR HANDLING
//! ==============
//! Credential errors from sign-in/out go back to the caller unchanged. Lookup
//! errors are retried per [`LookupRetryPolicy`], then treated as "not found"
//! (deny elevated access) with the snapshot marked `degraded`.

#[cfg(test)]
#[path = "gate_test.rs"]
mod tests;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::access::AccessSnapshot;
use crate::provider::{ClientLookup, ProviderError, RoleLookup, SessionStore};
use crate::redirect::{OAuthProvider, OAuthRedirect, OAuthRequest, RedirectPolicy};
use crate::retry::LookupRetryPolicy;
use crate::session::{Session, User};

/// Static policy knobs for a gate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatePolicy {
    pub retry: LookupRetryPolicy,
    pub redirect: RedirectPolicy,
}

/// Error returned by the sign-in/out actions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthActionError {
    #[error("email and password are required")]
    MissingCredentials,
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Result of one resolution pass.
#[derive(Clone, Debug, PartialEq)]
pub enum PassOutcome {
    /// The pass was current and its snapshot is now published.
    Applied(AccessSnapshot),
    /// A newer pass started before this one finished; its result was dropped.
    Superseded,
}

struct GateInner {
    sessions: Arc<dyn SessionStore>,
    roles: Arc<dyn RoleLookup>,
    clients: Arc<dyn ClientLookup>,
    policy: GatePolicy,
    state: watch::Sender<AccessSnapshot>,
    latest_pass: AtomicU64,
}

#[derive(Clone)]
pub struct AuthGate {
    inner: Arc<GateInner>,
}

/// Keeps the session-change listener alive. Dropping it unsubscribes.
pub struct GateHandle {
    task: JoinHandle<()>,
}

impl GateHandle {
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for GateHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl AuthGate {
    #[must_use]
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        roles: Arc<dyn RoleLookup>,
        clients: Arc<dyn ClientLookup>,
        policy: GatePolicy,
    ) -> Self {
        let (state, _) = watch::channel(AccessSnapshot::initial());
        Self {
            inner: Arc::new(GateInner {
                sessions,
                roles,
                clients,
                policy,
                state,
                latest_pass: AtomicU64::new(0),
            }),
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> AccessSnapshot {
        self.inner.state.borrow().clone()
    }

    /// Receiver that observes every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AccessSnapshot> {
        self.inner.state.subscribe()
    }

    /// Wait until a snapshot satisfies `predicate`, or give up after `timeout`.
    pub async fn wait_until<F>(&self, timeout: Duration, predicate: F) -> Option<AccessSnapshot>
    where
        F: FnMut(&AccessSnapshot) -> bool,
    {
        let mut rx = self.subscribe();
        match tokio::time::timeout(timeout, rx.wait_for(predicate)).await {
            Ok(Ok(snapshot)) => Some(snapshot.clone()),
            _ => None,
        }
    }

    /// Mount the gate: listen for session changes and resolve the current session.
    ///
    /// The subscription is taken before the initial fetch so no change between
    /// the two is lost.
    #[must_use]
    pub fn start(&self) -> GateHandle {
        let mut changes = self.inner.sessions.subscribe();
        let gate = self.clone();
        let task = tokio::spawn(async move {
            let initial = match gate.inner.sessions.get_session().await {
                Ok(session) => session,
                Err(e) => {
                    warn!(error = %e, "initial session fetch failed; starting anonymous");
                    None
                }
            };
            gate.spawn_pass(initial);

            loop {
                match changes.recv().await {
                    Ok(change) => {
                        debug!(event = ?change.event, has_session = change.session.is_some(), "session change");
                        gate.spawn_pass(change.session);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "session notifications lagged; re-fetching session");
                        match gate.inner.sessions.get_session().await {
                            Ok(session) => gate.spawn_pass(session),
                            Err(e) => warn!(error = %e, "session re-fetch failed; keeping last decision"),
                        }
                    }
                    Err(RecvError::Closed) => {
                        debug!("session store closed; gate listener exiting");
                        break;
                    }
                }
            }
        });
        GateHandle { task }
    }

    /// Run one resolution pass for `session` to completion.
    pub async fn resolve(&self, session: Option<Session>) -> PassOutcome {
        let seq = self.begin_pass(session.as_ref());
        self.finish_pass(seq, session).await
    }

    /// Verify email/password with the identity provider.
    ///
    /// State is not touched here; the provider's session-change notification
    /// triggers resolution.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthActionError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthActionError::MissingCredentials);
        }
        if let Err(e) = self.inner.sessions.sign_in_with_password(email, password).await {
            info!(%email, error = %e, "password sign-in rejected");
            return Err(e.into());
        }
        info!(%email, "password sign-in accepted");
        Ok(())
    }

    /// Phase one of the Google redirect flow: returns the consent URL.
    pub async fn sign_in_with_google(&self) -> Result<OAuthRedirect, AuthActionError> {
        let redirect: &RedirectPolicy = &self.inner.policy.redirect;
        let request = OAuthRequest {
            provider: OAuthProvider::Google,
            redirect_to: redirect.target().to_owned(),
            query_params: Vec::new(),
        };
        let target = self.inner.sessions.sign_in_with_oauth(&request).await?;
        info!(mode = %redirect.mode, redirect_to = %request.redirect_to, "oauth redirect issued");
        Ok(target)
    }

    /// Ask the provider to end the session; the resulting notification clears state.
    pub async fn sign_out(&self) -> Result<(), AuthActionError> {
        self.inner.sessions.sign_out().await?;
        info!("sign-out accepted");
        Ok(())
    }

    fn spawn_pass(&self, session: Option<Session>) {
        let seq = self.begin_pass(session.as_ref());
        let gate = self.clone();
        tokio::spawn(async move {
            gate.finish_pass(seq, session).await;
        });
    }

    fn begin_pass(&self, session: Option<&Session>) -> u64 {
        let mut seq = 0;
        self.inner.state.send_modify(|current| {
            seq = self.inner.latest_pass.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(session) = session {
                *current = AccessSnapshot::resolving(current, session.user.clone());
            }
        });
        debug!(seq, has_session = session.is_some(), "resolution pass started");
        seq
    }

    async fn finish_pass(&self, seq: u64, session: Option<Session>) -> PassOutcome {
        let snapshot = match session {
            Some(session) => self.decide(session.user).await,
            None => AccessSnapshot::anonymous(),
        };
        self.apply(seq, snapshot)
    }

    fn apply(&self, seq: u64, snapshot: AccessSnapshot) -> PassOutcome {
        let mut applied = false;
        self.inner.state.send_if_modified(|current| {
            if seq < self.inner.latest_pass.load(Ordering::SeqCst) {
                return false;
            }
            applied = true;
            if *current == snapshot {
                return false;
            }
            *current = snapshot.clone();
            true
        });

        if applied {
            debug!(seq, phase = ?snapshot.phase, has_access = snapshot.has_access, "resolution pass applied");
            PassOutcome::Applied(snapshot)
        } else {
            debug!(seq, "discarding superseded resolution pass");
            PassOutcome::Superseded
        }
    }

    async fn decide(&self, user: User) -> AccessSnapshot {
        let retry = self.inner.policy.retry;
        let user_id = user.id;
        let mut degraded: Vec<String> = Vec::new();

        let roles = &self.inner.roles;
        match retry.run("admin role", move || roles.lookup_admin_role(user_id)).await {
            Ok(Some(record)) if record.is_admin() => return AccessSnapshot::admin(user),
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, %user_id, "admin role lookup failed; treating as not admin");
                degraded.push(format!("admin role lookup failed: {e}"));
            }
        }

        let clients = &self.inner.clients;
        let snapshot = match retry
            .run("authorized client", move || clients.lookup_authorized_client(user_id))
            .await
        {
            Ok(Some(record)) if record.is_active => AccessSnapshot::client(user, record),
            Ok(Some(_)) => {
                debug!(%user_id, "inactive client record ignored");
                AccessSnapshot::unauthorized(user)
            }
            Ok(None) => AccessSnapshot::unauthorized(user),
            Err(e) => {
                warn!(error = %e, %user_id, "authorized client lookup failed; denying access");
                degraded.push(format!("authorized client lookup failed: {e}"));
                AccessSnapshot::unauthorized(user)
            }
        };

        let reason = (!degraded.is_empty()).then(|| degraded.join("; "));
        snapshot.with_degraded(reason)
    }
}
