//! Pin synchronizer: keeps the remote record set, the map markers, and the
//! pin list mutually consistent.
//!
//! Consistency is maintained by full reconciliation, never incremental
//! patching: every local mutation and every remote change notification
//! triggers a refetch followed by a clear-and-rebuild of both views.
//! Concurrent reconciliations all converge on the remote snapshot, so the
//! only observable anomaly of a race is a redundant rebuild. The marker
//! index and both surfaces are only mutated while the rebuild lock is held,
//! which also rules out interleaved partial rebuilds.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::Error;
use crate::map::{LatLng, MapSurface, MarkerId, FOCUS_ZOOM};
use crate::pin::PinId;
use crate::remote::PinStore;
use crate::session::SessionController;
use crate::view::{
    ConfirmPrompt, ListSurface, PinCard, PopupContent, DELETE_CONFIRM_MESSAGE,
    EMPTY_LIST_MESSAGE, FETCH_FAILED_MESSAGE,
};

/// Outcome of a delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The pin was deleted and the views refreshed.
    Deleted,
    /// The user declined the confirmation; nothing was sent.
    Cancelled,
}

struct PlacedMarker {
    marker: MarkerId,
    position: LatLng,
}

pub struct PinSynchronizer {
    pins: Arc<dyn PinStore>,
    map: Arc<dyn MapSurface>,
    list: Arc<dyn ListSurface>,
    session: Arc<SessionController>,
    confirm: Arc<dyn ConfirmPrompt>,
    /// Pin id -> live marker. Fully rebuilt on every reconciliation; the
    /// lock serializes reconciliations end to end, fetch included.
    markers: Mutex<HashMap<PinId, PlacedMarker>>,
}

impl PinSynchronizer {
    pub fn new(
        pins: Arc<dyn PinStore>,
        map: Arc<dyn MapSurface>,
        list: Arc<dyn ListSurface>,
        session: Arc<SessionController>,
        confirm: Arc<dyn ConfirmPrompt>,
    ) -> Arc<Self> {
        Arc::new(Self {
            pins,
            map,
            list,
            session,
            confirm,
            markers: Mutex::new(HashMap::new()),
        })
    }

    /// Refetch the full pin set and rebuild markers and list from it.
    ///
    /// On fetch failure the existing markers and index stay untouched and
    /// the list shows an inline error; the clear-and-rebuild only commits
    /// after a successful fetch, so a transient network error never flashes
    /// an empty map. The selection marker is not in the index and therefore
    /// survives every rebuild. Returns the number of pins displayed.
    pub async fn reconcile(&self) -> Result<usize, Error> {
        let mut markers = self.markers.lock().await;

        let fetched = match self.pins.fetch_all().await {
            Ok(pins) => pins,
            Err(e) => {
                warn!("pin fetch failed: {e}");
                self.list.show_message(FETCH_FAILED_MESSAGE);
                return Err(e);
            }
        };

        self.list.clear();
        for (_, placed) in markers.drain() {
            self.map.remove_marker(placed.marker);
        }

        if fetched.is_empty() {
            self.list.show_message(EMPTY_LIST_MESSAGE);
            return Ok(0);
        }

        let viewer = self.session.current_user().map(|s| s.user_id);
        for pin in &fetched {
            let marker = self
                .map
                .add_marker(pin.position(), PopupContent::for_pin(pin, viewer));
            markers.insert(
                pin.id,
                PlacedMarker {
                    marker,
                    position: pin.position(),
                },
            );
            self.list.push_card(PinCard::from_pin(pin, viewer));
        }

        debug!(count = fetched.len(), "views rebuilt");
        Ok(fetched.len())
    }

    /// Center the map on a pin and open its popup. A stale id (removed by a
    /// reconciliation in the meantime) logs a warning and moves nothing.
    pub async fn focus_on(&self, id: PinId) {
        let markers = self.markers.lock().await;
        match markers.get(&id) {
            Some(placed) => {
                self.map.set_view(placed.position, FOCUS_ZOOM);
                self.map.open_popup(placed.marker);
            }
            None => warn!("Marker not found for pin: {id}"),
        }
    }

    /// Delete a pin after interactive confirmation, then reconcile.
    ///
    /// A declined confirmation issues no network call. Ownership is
    /// enforced server-side; on failure the views are left unchanged.
    pub async fn delete_pin(&self, id: PinId) -> Result<DeleteOutcome, Error> {
        if !self.confirm.confirm(DELETE_CONFIRM_MESSAGE) {
            return Ok(DeleteOutcome::Cancelled);
        }

        self.pins.delete(id).await?;
        self.reconcile().await?;
        Ok(DeleteOutcome::Deleted)
    }
}
