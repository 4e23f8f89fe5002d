//! Shared in-memory fakes for integration tests: a backend with call
//! counters and failure switches, recording map/list surfaces, and a
//! scriptable address resolver.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::{broadcast, Notify};
use uuid::Uuid;

use treasure_map::error::Error;
use treasure_map::geocode::AddressResolver;
use treasure_map::map::{LatLng, MapSurface, MarkerId};
use treasure_map::pin::{NewPin, Pin, PinId};
use treasure_map::remote::{IdentityProvider, PhotoStore, PinStore};
use treasure_map::session::{Session, SessionEvent};
use treasure_map::view::{AuthUi, ConfirmPrompt, ListSurface, PinCard, PopupContent};
use treasure_map::{App, AppParts};

/// Deterministic user id from a small number.
pub fn uid(n: u8) -> Uuid {
    Uuid::from_u128(n as u128)
}

pub fn session_for(user: Uuid) -> Session {
    Session {
        user_id: user,
        email: format!("user-{user}@example.com"),
        access_token: "test-token".to_string(),
    }
}

/// In-memory backend implementing all three capability traits.
pub struct FakeBackend {
    pins: Mutex<Vec<Pin>>,
    next_id: AtomicI64,
    pub fail_fetch: AtomicBool,
    pub fail_insert: AtomicBool,
    pub fail_upload: AtomicBool,
    pub rate_limited: AtomicBool,
    /// While set, `insert` parks until `release_insert` is notified,
    /// keeping a submission in flight for as long as a test needs.
    pub pause_insert: AtomicBool,
    pub release_insert: Notify,
    pub fetch_calls: AtomicUsize,
    pub insert_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub upload_calls: AtomicUsize,
    pub sign_out_calls: AtomicUsize,
    pub uploads: Mutex<Vec<String>>,
    /// (email, redirect_to) per magic-link request.
    pub magic_links: Mutex<Vec<(String, String)>>,
    session_events: broadcast::Sender<SessionEvent>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        let (session_events, _) = broadcast::channel(16);
        Arc::new(Self {
            pins: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
            fail_fetch: AtomicBool::new(false),
            fail_insert: AtomicBool::new(false),
            fail_upload: AtomicBool::new(false),
            rate_limited: AtomicBool::new(false),
            pause_insert: AtomicBool::new(false),
            release_insert: Notify::new(),
            fetch_calls: AtomicUsize::new(0),
            insert_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            upload_calls: AtomicUsize::new(0),
            sign_out_calls: AtomicUsize::new(0),
            uploads: Mutex::new(Vec::new()),
            magic_links: Mutex::new(Vec::new()),
            session_events,
        })
    }

    /// Seed one stored pin; later seeds get later creation times.
    pub fn seed(&self, title: &str, lat: f64, lng: f64, user: Uuid) -> Pin {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let pin = Pin {
            id,
            title: title.to_string(),
            description: None,
            latitude: lat,
            longitude: lng,
            photo_url: None,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
                + chrono::Duration::seconds(id),
            user_id: user,
        };
        self.pins.lock().unwrap().push(pin.clone());
        pin
    }

    pub fn stored_ids(&self) -> Vec<PinId> {
        self.pins.lock().unwrap().iter().map(|p| p.id).collect()
    }

    /// Emit a session transition to the controller's listener.
    pub fn emit(&self, event: SessionEvent) {
        let _ = self.session_events.send(event);
    }
}

#[async_trait]
impl PinStore for FakeBackend {
    async fn fetch_all(&self) -> Result<Vec<Pin>, Error> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(Error::Transport("fetch refused".to_string()));
        }
        let mut pins = self.pins.lock().unwrap().clone();
        pins.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(pins)
    }

    async fn insert(&self, pin: NewPin) -> Result<Pin, Error> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(Error::Transport("insert refused".to_string()));
        }
        if self.pause_insert.load(Ordering::SeqCst) {
            self.release_insert.notified().await;
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let stored = Pin {
            id,
            title: pin.title,
            description: pin.description,
            latitude: pin.latitude,
            longitude: pin.longitude,
            photo_url: pin.photo_url,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
                + chrono::Duration::seconds(id),
            user_id: pin.user_id,
        };
        self.pins.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn delete(&self, id: PinId) -> Result<(), Error> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.pins.lock().unwrap().retain(|p| p.id != id);
        Ok(())
    }
}

#[async_trait]
impl PhotoStore for FakeBackend {
    async fn upload(&self, path: &str, _bytes: Vec<u8>, _content_type: &str) -> Result<(), Error> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_upload.load(Ordering::SeqCst) {
            return Err(Error::Transport("upload refused".to_string()));
        }
        self.uploads.lock().unwrap().push(path.to_string());
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("https://cdn.example.com/{path}")
    }
}

#[async_trait]
impl IdentityProvider for FakeBackend {
    async fn request_magic_link(&self, email: &str, redirect_to: &str) -> Result<(), Error> {
        if self.rate_limited.load(Ordering::SeqCst) {
            return Err(Error::RateLimited);
        }
        self.magic_links
            .lock()
            .unwrap()
            .push((email.to_string(), redirect_to.to_string()));
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), Error> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        let _ = self.session_events.send(SessionEvent::SignedOut);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.session_events.subscribe()
    }
}

#[derive(Debug, Clone)]
pub struct RecordedMarker {
    pub at: LatLng,
    pub popup: PopupContent,
}

/// Map surface that records every placement, removal, and view change.
pub struct RecordingMap {
    next_id: AtomicU64,
    pub markers: Mutex<HashMap<MarkerId, RecordedMarker>>,
    pub views: Mutex<Vec<(LatLng, u8)>>,
    pub opened: Mutex<Vec<MarkerId>>,
}

impl RecordingMap {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(1),
            markers: Mutex::new(HashMap::new()),
            views: Mutex::new(Vec::new()),
            opened: Mutex::new(Vec::new()),
        })
    }

    /// Markers whose popup refers to a persisted pin.
    pub fn pin_marker_count(&self) -> usize {
        self.markers
            .lock()
            .unwrap()
            .values()
            .filter(|m| m.popup.pin_id.is_some())
            .count()
    }

    /// Markers for the not-yet-submitted selection.
    pub fn selection_marker_count(&self) -> usize {
        self.markers
            .lock()
            .unwrap()
            .values()
            .filter(|m| m.popup.pin_id.is_none())
            .count()
    }

    pub fn marker_pin_ids(&self) -> Vec<PinId> {
        self.markers
            .lock()
            .unwrap()
            .values()
            .filter_map(|m| m.popup.pin_id)
            .collect()
    }
}

impl MapSurface for RecordingMap {
    fn set_view(&self, center: LatLng, zoom: u8) {
        self.views.lock().unwrap().push((center, zoom));
    }

    fn add_marker(&self, at: LatLng, popup: PopupContent) -> MarkerId {
        let id = MarkerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.markers
            .lock()
            .unwrap()
            .insert(id, RecordedMarker { at, popup });
        id
    }

    fn remove_marker(&self, marker: MarkerId) {
        self.markers.lock().unwrap().remove(&marker);
    }

    fn open_popup(&self, marker: MarkerId) {
        self.opened.lock().unwrap().push(marker);
    }
}

/// List surface keeping cards and status messages separately observable.
pub struct RecordingList {
    pub cards: Mutex<Vec<PinCard>>,
    pub messages: Mutex<Vec<String>>,
}

impl RecordingList {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            cards: Mutex::new(Vec::new()),
            messages: Mutex::new(Vec::new()),
        })
    }

    pub fn card_ids(&self) -> Vec<PinId> {
        self.cards.lock().unwrap().iter().map(|c| c.id).collect()
    }

    pub fn last_message(&self) -> Option<String> {
        self.messages.lock().unwrap().last().cloned()
    }
}

impl ListSurface for RecordingList {
    fn clear(&self) {
        self.cards.lock().unwrap().clear();
    }

    fn push_card(&self, card: PinCard) {
        self.cards.lock().unwrap().push(card);
    }

    fn show_message(&self, text: &str) {
        self.messages.lock().unwrap().push(text.to_string());
    }
}

/// Resolver returning a fixed address, or failing when none is set.
pub struct StaticResolver {
    pub address: Option<String>,
}

#[async_trait]
impl AddressResolver for StaticResolver {
    async fn resolve(&self, _lat: f64, _lon: f64) -> Result<String, Error> {
        self.address
            .clone()
            .ok_or_else(|| Error::Geocode("resolver down".to_string()))
    }
}

pub struct AutoConfirm(pub bool);

impl ConfirmPrompt for AutoConfirm {
    fn confirm(&self, _message: &str) -> bool {
        self.0
    }
}

/// Records each session transition the controller reports.
pub struct RecordingAuthUi {
    pub transitions: Mutex<Vec<Option<Uuid>>>,
}

impl RecordingAuthUi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            transitions: Mutex::new(Vec::new()),
        })
    }
}

impl AuthUi for RecordingAuthUi {
    fn session_changed(&self, session: Option<&Session>) {
        self.transitions
            .lock()
            .unwrap()
            .push(session.map(|s| s.user_id));
    }
}

pub struct TestApp {
    pub app: App,
    pub backend: Arc<FakeBackend>,
    pub map: Arc<RecordingMap>,
    pub list: Arc<RecordingList>,
    pub auth_ui: Arc<RecordingAuthUi>,
}

/// Assemble an app over the fakes. `confirm` scripts the delete prompt,
/// `address` the resolver (None makes it fail).
pub fn build_app(confirm: bool, address: Option<&str>) -> TestApp {
    let backend = FakeBackend::new();
    let map = RecordingMap::new();
    let list = RecordingList::new();
    let auth_ui = RecordingAuthUi::new();

    let app = App::new(AppParts {
        pins: backend.clone(),
        photos: backend.clone(),
        identity: backend.clone(),
        resolver: Arc::new(StaticResolver {
            address: address.map(|s| s.to_string()),
        }),
        map: map.clone(),
        list: list.clone(),
        confirm: Arc::new(AutoConfirm(confirm)),
        auth_ui: auth_ui.clone(),
        redirect_to: "http://localhost:8080/".to_string(),
    });

    TestApp {
        app,
        backend,
        map,
        list,
        auth_ui,
    }
}

/// Put the controller into a signed-in state directly, bypassing the
/// provider event stream (for tests that don't exercise the listener).
pub fn sign_in_directly(test: &TestApp, user: Uuid) {
    test.app
        .session
        .apply_event(&SessionEvent::SignedIn(session_for(user)));
}

/// Poll until `condition` holds or a short deadline passes.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}
