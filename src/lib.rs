//! Community map client library.
//!
//! Users drop geolocated pins describing free items, browse them on a map
//! and in a list, sign in via passwordless email links, and attach one
//! photo per pin. All durable state lives in a hosted backend; this crate
//! is the orchestration layer that keeps the local views consistent with
//! it. See `sync::PinSynchronizer` for the consistency strategy.

pub mod authoring;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod geocode;
pub mod interaction;
pub mod map;
pub mod pin;
pub mod remote;
pub mod session;
pub mod sync;
pub mod view;

pub use error::Error;

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::authoring::AuthoringFlow;
use crate::events::PinChangeBroadcaster;
use crate::geocode::AddressResolver;
use crate::interaction::MapInteraction;
use crate::map::MapSurface;
use crate::remote::{IdentityProvider, PhotoStore, PinStore};
use crate::session::SessionController;
use crate::sync::PinSynchronizer;
use crate::view::{AuthUi, ConfirmPrompt, ListSurface};

/// Everything the app is assembled from: backend capabilities, the address
/// resolver, and the surfaces a frontend provides.
pub struct AppParts {
    pub pins: Arc<dyn PinStore>,
    pub photos: Arc<dyn PhotoStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub resolver: Arc<dyn AddressResolver>,
    pub map: Arc<dyn MapSurface>,
    pub list: Arc<dyn ListSurface>,
    pub confirm: Arc<dyn ConfirmPrompt>,
    pub auth_ui: Arc<dyn AuthUi>,
    /// URL login links redirect back to.
    pub redirect_to: String,
}

/// Assembled application: the session controller, the synchronizer, the
/// authoring flow, and the map interaction layer, sharing one state graph.
pub struct App {
    pub session: Arc<SessionController>,
    pub sync: Arc<PinSynchronizer>,
    pub authoring: Arc<AuthoringFlow>,
    pub interaction: Arc<MapInteraction>,
    pub changes: PinChangeBroadcaster,
}

impl App {
    /// Assemble the app and start the session listener. Must run inside a
    /// tokio runtime.
    pub fn new(parts: AppParts) -> Self {
        let session = SessionController::new(Arc::clone(&parts.identity), parts.redirect_to);
        let sync = PinSynchronizer::new(
            Arc::clone(&parts.pins),
            Arc::clone(&parts.map),
            Arc::clone(&parts.list),
            Arc::clone(&session),
            Arc::clone(&parts.confirm),
        );
        let interaction = MapInteraction::new(
            Arc::clone(&parts.map),
            Arc::clone(&parts.resolver),
            Arc::clone(&session),
        );
        let authoring = AuthoringFlow::new(
            Arc::clone(&parts.pins),
            Arc::clone(&parts.photos),
            Arc::clone(&session),
            Arc::clone(&interaction),
            Arc::clone(&sync),
        );

        let app = Self {
            session,
            sync,
            authoring,
            interaction,
            changes: PinChangeBroadcaster::new(64),
        };
        app.session
            .spawn_listener(Arc::clone(&app.sync), Arc::clone(&parts.auth_ui));
        app
    }

    /// Initial full reconciliation on startup. A failure is reported but
    /// not fatal: the views refresh on the next change notification.
    pub async fn start(&self) {
        if let Err(e) = self.sync.reconcile().await {
            warn!("initial refresh failed: {e}");
        }
    }

    /// Pump change notifications into reconciliations. Each notification
    /// triggers a full refresh; which rebuild wins a race is irrelevant
    /// since all of them converge on the remote snapshot.
    pub fn spawn_change_pump(&self) -> JoinHandle<()> {
        let sync = Arc::clone(&self.sync);
        let mut changes = self.changes.subscribe();

        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(notification) => {
                        debug!(?notification, "remote change, refreshing");
                        if let Err(e) = sync.reconcile().await {
                            warn!("refresh after remote change failed: {e}");
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        // Missed notifications are harmless: the next
                        // reconcile shows the full remote truth anyway.
                        debug!(skipped, "change stream lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}
