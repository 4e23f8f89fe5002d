//! Map click handling and pending-location state.
//!
//! A click records the coordinate pair immediately, places the selection
//! marker, and then asks the address resolver; a slow or failing resolver
//! can never lose the selection. The selection marker is owned here, never
//! by the synchronizer, so reconciliations cannot remove it.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::warn;

use crate::geocode::{coordinate_label, AddressResolver};
use crate::map::{LatLng, MapSurface, MarkerId, LOCATE_MAX_ZOOM};
use crate::session::SessionController;
use crate::view::PopupContent;

/// The coordinate selected by the user before a pin is submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingLocation {
    pub position: LatLng,
    /// Resolved address, or the raw coordinate label as fallback.
    pub address: String,
}

/// What the frontend should do after a click.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickOutcome {
    /// Show the sign-in reminder. Non-blocking: the click was recorded
    /// either way, so the selection is not lost.
    pub needs_sign_in: bool,
    /// Address to display for the selection.
    pub address: String,
}

pub struct MapInteraction {
    map: Arc<dyn MapSurface>,
    resolver: Arc<dyn AddressResolver>,
    session: Arc<SessionController>,
    pending: Mutex<Option<PendingLocation>>,
    /// At most one marker for the not-yet-submitted selection.
    selection: Mutex<Option<MarkerId>>,
}

impl MapInteraction {
    pub fn new(
        map: Arc<dyn MapSurface>,
        resolver: Arc<dyn AddressResolver>,
        session: Arc<SessionController>,
    ) -> Arc<Self> {
        Arc::new(Self {
            map,
            resolver,
            session,
            pending: Mutex::new(None),
            selection: Mutex::new(None),
        })
    }

    /// Handle a map click: record the pending location, replace the
    /// selection marker, then resolve the address best-effort.
    pub async fn handle_click(&self, at: LatLng) -> ClickOutcome {
        let needs_sign_in = self.session.current_user().is_none();

        // Record the click before the lookup so it cannot be lost
        {
            let mut pending = self.pending.lock().await;
            *pending = Some(PendingLocation {
                position: at,
                address: coordinate_label(at.lat, at.lng),
            });
        }

        {
            let mut selection = self.selection.lock().await;
            if let Some(previous) = selection.take() {
                self.map.remove_marker(previous);
            }
            let marker = self.map.add_marker(at, PopupContent::selection());
            self.map.open_popup(marker);
            *selection = Some(marker);
        }

        let address = match self.resolver.resolve(at.lat, at.lng).await {
            Ok(address) => address,
            Err(e) => {
                warn!("address lookup failed: {e}");
                coordinate_label(at.lat, at.lng)
            }
        };

        // A newer click may have landed while the resolver ran; only
        // attach the address to the selection it belongs to.
        {
            let mut pending = self.pending.lock().await;
            if let Some(p) = pending.as_mut() {
                if p.position == at {
                    p.address = address.clone();
                }
            }
        }

        ClickOutcome {
            needs_sign_in,
            address,
        }
    }

    /// Current pending location, if any.
    pub async fn pending(&self) -> Option<PendingLocation> {
        self.pending.lock().await.clone()
    }

    /// Drop the pending location and its selection marker (after a
    /// successful submission, or an explicit form reset).
    pub async fn clear(&self) {
        *self.pending.lock().await = None;
        if let Some(marker) = self.selection.lock().await.take() {
            self.map.remove_marker(marker);
        }
    }

    /// Center the view on a device-reported position (locate-me control).
    pub fn locate(&self, at: LatLng) {
        self.map.set_view(at, LOCATE_MAX_ZOOM);
    }
}
