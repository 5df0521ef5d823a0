//! In-memory collaborators and fixtures for gate tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{Notify, broadcast};
use uuid::Uuid;

use crate::access::{AuthorizedClient, RoleRecord, SubscriptionFeatures};
use crate::gate::{AuthGate, GatePolicy};
use crate::provider::{ClientLookup, LookupError, ProviderError, RoleLookup, SessionStore};
use crate::redirect::{BuildMode, OAuthRedirect, OAuthRequest, RedirectPolicy};
use crate::retry::LookupRetryPolicy;
use crate::session::{Session, SessionChange, SessionEvent, User, UserMetadata};

pub(crate) fn user(email: &str) -> User {
    User {
        id: Uuid::new_v4(),
        email: Some(email.to_owned()),
        user_metadata: UserMetadata::default(),
        app_metadata: serde_json::Map::new(),
    }
}

pub(crate) fn session_with_user(user: User) -> Session {
    Session {
        access_token: format!("access-{}", user.id),
        refresh_token: format!("refresh-{}", user.id),
        token_type: "bearer".into(),
        expires_in: 3600,
        expires_at: Some(4_000_000_000),
        user,
    }
}

pub(crate) fn session_for(email: &str) -> Session {
    session_with_user(user(email))
}

pub(crate) fn client_record(user_id: Uuid, org: &str, level: &str, active: bool) -> AuthorizedClient {
    AuthorizedClient {
        id: Some(Uuid::new_v4()),
        user_id,
        organization_name: org.to_owned(),
        subscription_level: level.to_owned(),
        subscription_features: SubscriptionFeatures::with_components(["campaign_manager", "email_marketing"]),
        is_active: active,
    }
}

pub(crate) fn dev_redirect() -> RedirectPolicy {
    RedirectPolicy {
        mode: BuildMode::Development,
        production_url: "https://mission.example.com/".into(),
        development_url: "http://localhost:3000/".into(),
    }
}

pub(crate) fn gate_with(sessions: &Arc<FakeSessions>, directory: &Arc<FakeDirectory>, retry: LookupRetryPolicy) -> AuthGate {
    AuthGate::new(
        Arc::clone(sessions) as Arc<dyn SessionStore>,
        Arc::clone(directory) as Arc<dyn RoleLookup>,
        Arc::clone(directory) as Arc<dyn ClientLookup>,
        GatePolicy { retry, redirect: dev_redirect() },
    )
}

// =============================================================================
// FakeSessions
// =============================================================================

/// Notification buffer of [`FakeSessions`]; more unread changes than this lag the listener.
pub(crate) const CHANGE_CAPACITY: usize = 16;

pub(crate) struct FakeSessions {
    current: Mutex<Option<Session>>,
    accounts: Mutex<HashMap<String, (String, Session)>>,
    sign_out_error: Mutex<Option<ProviderError>>,
    pub(crate) oauth_requests: Mutex<Vec<OAuthRequest>>,
    pub(crate) password_calls: AtomicUsize,
    pub(crate) get_session_calls: AtomicUsize,
    tx: broadcast::Sender<SessionChange>,
}

impl FakeSessions {
    pub(crate) fn new() -> Arc<Self> {
        let (tx, _) = broadcast::channel(CHANGE_CAPACITY);
        Arc::new(Self {
            current: Mutex::new(None),
            accounts: Mutex::new(HashMap::new()),
            sign_out_error: Mutex::new(None),
            oauth_requests: Mutex::new(Vec::new()),
            password_calls: AtomicUsize::new(0),
            get_session_calls: AtomicUsize::new(0),
            tx,
        })
    }

    pub(crate) fn with_current(session: Session) -> Arc<Self> {
        let fake = Self::new();
        *fake.current.lock().unwrap() = Some(session);
        fake
    }

    pub(crate) fn add_account(&self, email: &str, password: &str, session: Session) {
        self.accounts
            .lock()
            .unwrap()
            .insert(email.to_owned(), (password.to_owned(), session));
    }

    pub(crate) fn fail_sign_out(&self, error: ProviderError) {
        *self.sign_out_error.lock().unwrap() = Some(error);
    }

    pub(crate) fn emit(&self, change: SessionChange) {
        self.current.lock().unwrap().clone_from(&change.session);
        let _ = self.tx.send(change);
    }

    pub(crate) fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[async_trait]
impl SessionStore for FakeSessions {
    async fn get_session(&self) -> Result<Option<Session>, ProviderError> {
        self.get_session_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.current.lock().unwrap().clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionChange> {
        self.tx.subscribe()
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<(), ProviderError> {
        self.password_calls.fetch_add(1, Ordering::SeqCst);
        let account = self.accounts.lock().unwrap().get(email).cloned();
        match account {
            Some((expected, session)) if expected == password => {
                self.emit(SessionChange::new(SessionEvent::SignedIn, Some(session)));
                Ok(())
            }
            _ => Err(ProviderError::with_status("Invalid login credentials", 400)),
        }
    }

    async fn sign_in_with_oauth(&self, request: &OAuthRequest) -> Result<OAuthRedirect, ProviderError> {
        self.oauth_requests.lock().unwrap().push(request.clone());
        Ok(OAuthRedirect {
            url: format!(
                "https://auth.test/authorize?provider={}&redirect_to={}",
                request.provider.as_str(),
                request.redirect_to
            ),
        })
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        if let Some(error) = self.sign_out_error.lock().unwrap().clone() {
            return Err(error);
        }
        self.emit(SessionChange::signed_out());
        Ok(())
    }
}

// =============================================================================
// FakeDirectory
// =============================================================================

/// Parks the role lookup for one user until released.
pub(crate) struct Hold {
    pub(crate) entered: Notify,
    pub(crate) release: Notify,
}

#[derive(Default)]
pub(crate) struct FakeDirectory {
    admins: Mutex<HashSet<Uuid>>,
    clients: Mutex<HashMap<Uuid, AuthorizedClient>>,
    role_failures: Mutex<VecDeque<LookupError>>,
    client_failures: Mutex<VecDeque<LookupError>>,
    holds: Mutex<HashMap<Uuid, Arc<Hold>>>,
    pub(crate) role_calls: AtomicUsize,
    pub(crate) client_calls: AtomicUsize,
}

impl FakeDirectory {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn add_admin(&self, user_id: Uuid) {
        self.admins.lock().unwrap().insert(user_id);
    }

    pub(crate) fn add_client(&self, record: AuthorizedClient) {
        self.clients.lock().unwrap().insert(record.user_id, record);
    }

    pub(crate) fn fail_roles(&self, errors: impl IntoIterator<Item = LookupError>) {
        self.role_failures.lock().unwrap().extend(errors);
    }

    pub(crate) fn fail_clients(&self, errors: impl IntoIterator<Item = LookupError>) {
        self.client_failures.lock().unwrap().extend(errors);
    }

    pub(crate) fn hold(&self, user_id: Uuid) -> Arc<Hold> {
        let hold = Arc::new(Hold { entered: Notify::new(), release: Notify::new() });
        self.holds.lock().unwrap().insert(user_id, Arc::clone(&hold));
        hold
    }
}

#[async_trait]
impl RoleLookup for FakeDirectory {
    async fn lookup_admin_role(&self, user_id: Uuid) -> Result<Option<RoleRecord>, LookupError> {
        self.role_calls.fetch_add(1, Ordering::SeqCst);
        let hold = self.holds.lock().unwrap().get(&user_id).cloned();
        if let Some(hold) = hold {
            hold.entered.notify_one();
            hold.release.notified().await;
        }
        let failure = self.role_failures.lock().unwrap().pop_front();
        if let Some(error) = failure {
            return Err(error);
        }
        let is_admin = self.admins.lock().unwrap().contains(&user_id);
        Ok(is_admin.then(|| RoleRecord { role: "admin".into() }))
    }
}

#[async_trait]
impl ClientLookup for FakeDirectory {
    async fn lookup_authorized_client(&self, user_id: Uuid) -> Result<Option<AuthorizedClient>, LookupError> {
        self.client_calls.fetch_add(1, Ordering::SeqCst);
        let failure = self.client_failures.lock().unwrap().pop_front();
        if let Some(error) = failure {
            return Err(error);
        }
        let record = self.clients.lock().unwrap().get(&user_id).cloned();
        Ok(record.filter(|r| r.is_active))
    }
}
