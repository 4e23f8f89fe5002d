//! Session state and the controller that owns it.
//!
//! The controller is the single source of truth for the current identity.
//! Sign-in is passwordless: the provider emails a login link, and the
//! session itself arrives later through the provider's change stream. The
//! controller never sets `current` directly from `sign_in`/`sign_out`; it
//! only reacts to session events.

use std::sync::{Arc, RwLock};

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::Error;
use crate::remote::IdentityProvider;
use crate::sync::PinSynchronizer;
use crate::view::AuthUi;

/// An authenticated identity context.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user_id: Uuid,
    pub email: String,
    pub access_token: String,
}

/// Session transition emitted by the identity provider.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    SignedIn(Session),
    SignedOut,
}

/// Outcome of a successful sign-in request.
#[derive(Debug, Clone, PartialEq)]
pub enum SignInOutcome {
    /// A magic link was sent to the given address.
    LinkSent { email: String },
}

impl SignInOutcome {
    /// User-facing confirmation text.
    pub fn message(&self) -> String {
        match self {
            SignInOutcome::LinkSent { email } => {
                format!("Magic link sent to {email}! Check your spam folder.")
            }
        }
    }
}

pub struct SessionController {
    identity: Arc<dyn IdentityProvider>,
    /// URL the login link redirects back to.
    redirect_to: String,
    current: RwLock<Option<Session>>,
}

impl SessionController {
    pub fn new(identity: Arc<dyn IdentityProvider>, redirect_to: String) -> Arc<Self> {
        Arc::new(Self {
            identity,
            redirect_to,
            current: RwLock::new(None),
        })
    }

    /// Snapshot of the current identity.
    pub fn current_user(&self) -> Option<Session> {
        self.current.read().expect("session lock poisoned").clone()
    }

    /// Request a passwordless login link. Throttling by the provider maps
    /// to `Error::RateLimited` so callers can show the wait-period message.
    pub async fn sign_in(&self, email: &str) -> Result<SignInOutcome, Error> {
        let email = email.trim();
        if email.is_empty() {
            return Err(Error::MissingEmail);
        }

        self.identity
            .request_magic_link(email, &self.redirect_to)
            .await?;

        info!(email, "magic link requested");
        Ok(SignInOutcome::LinkSent {
            email: email.to_string(),
        })
    }

    /// Request session termination. The current user is cleared by the
    /// subsequent `SignedOut` event, not here.
    pub async fn sign_out(&self) -> Result<(), Error> {
        self.identity.sign_out().await
    }

    /// Apply a session transition. Normally driven by the provider's event
    /// stream via `spawn_listener`.
    pub fn apply_event(&self, event: &SessionEvent) {
        let mut current = self.current.write().expect("session lock poisoned");
        match event {
            SessionEvent::SignedIn(session) => {
                info!(user_id = %session.user_id, "session started");
                *current = Some(session.clone());
            }
            SessionEvent::SignedOut => {
                info!("session ended");
                *current = None;
            }
        }
    }

    /// Consume the provider's session-change stream: store the new identity,
    /// update the bound auth affordance, and refresh the pin views so
    /// ownership-dependent delete actions reflect the new viewer.
    pub fn spawn_listener(
        self: &Arc<Self>,
        sync: Arc<PinSynchronizer>,
        auth_ui: Arc<dyn AuthUi>,
    ) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        let mut events = controller.identity.subscribe();

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        controller.apply_event(&event);
                        let current = controller.current_user();
                        auth_ui.session_changed(current.as_ref());
                        if let Err(e) = sync.reconcile().await {
                            warn!("refresh after session change failed: {e}");
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "session event stream lagged");
                    }
                    Err(RecvError::Closed) => {
                        debug!("session event stream closed");
                        break;
                    }
                }
            }
        })
    }
}
