//! Map surface abstraction.
//!
//! The map itself (tiles, rendering, click capture) is an external
//! collaborator; this crate only places and removes markers, moves the view,
//! and opens popups. A frontend implements `MapSurface` over whatever
//! rendering library it embeds.

use serde::{Deserialize, Serialize};

use crate::view::PopupContent;

/// Initial view center (Zurich).
pub const DEFAULT_CENTER: LatLng = LatLng {
    lat: 47.3769,
    lng: 8.5417,
};
/// Initial zoom level.
pub const DEFAULT_ZOOM: u8 = 13;
/// Zoom used when focusing a single pin from the list.
pub const FOCUS_ZOOM: u8 = 15;
/// Zoom cap for the locate-me action.
pub const LOCATE_MAX_ZOOM: u8 = 16;

/// A coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl std::fmt::Display for LatLng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}, {:.6}", self.lat, self.lng)
    }
}

/// Opaque handle for a placed marker, issued by the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerId(pub u64);

/// Rendering surface for the map pane.
///
/// All methods are infallible from the caller's perspective: a surface that
/// cannot honor a call (e.g., a detached handle) should ignore it rather
/// than fail the synchronization logic driving it.
pub trait MapSurface: Send + Sync {
    /// Center the view on `center` at `zoom`.
    fn set_view(&self, center: LatLng, zoom: u8);

    /// Place a marker with the given popup content, returning its handle.
    fn add_marker(&self, at: LatLng, popup: PopupContent) -> MarkerId;

    /// Remove a previously placed marker.
    fn remove_marker(&self, marker: MarkerId);

    /// Open the popup bound to a marker.
    fn open_popup(&self, marker: MarkerId);
}
