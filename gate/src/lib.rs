//! Session-driven authorization gate for Mission Control.
//!
//! This crate owns the access decision shared by every front end: it consumes
//! identity-provider session changes, resolves the administrator role and the
//! authorized-client record for the signed-in user, and publishes a read-only
//! [`AccessSnapshot`] that the view layer branches on.
//!
//! Collaborators (session store, role lookup, client lookup) are injected as
//! trait objects, so the gate runs the same against the hosted platform and
//! against in-memory fakes.

pub mod access;
pub mod gate;
pub mod provider;
pub mod redirect;
pub mod retry;
pub mod session;
pub mod view;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use access::{AccessSnapshot, AuthorizedClient, GatePhase, RoleRecord, SubscriptionFeatures};
pub use gate::{AuthActionError, AuthGate, GateHandle, GatePolicy, PassOutcome};
pub use provider::{ClientLookup, LookupError, ProviderError, RoleLookup, SessionStore};
pub use redirect::{BuildMode, OAuthProvider, OAuthRedirect, OAuthRequest, RedirectPolicy};
pub use retry::LookupRetryPolicy;
pub use session::{Session, SessionChange, SessionEvent, User, UserMetadata};
pub use view::{AdminView, ClientSection, NavEntry, ViewBranch};
