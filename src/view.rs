//! View construction for popups and the pin list.
//!
//! Content is built structurally (typed fields plus flags) rather than as
//! interpolated markup with inline handlers; the delete affordance is a
//! boolean the frontend binds a callback to. Every user-provided string is
//! escaped at the single render site.

use uuid::Uuid;

use crate::pin::{Pin, PinId};
use crate::session::Session;

/// Placeholder shown when a pin has no description.
pub const NO_DESCRIPTION: &str = "No description provided";
/// List message when the fetched set is empty.
pub const EMPTY_LIST_MESSAGE: &str = "No treasures found yet. Be the first to pin one!";
/// List message when a refresh fails. Markers stay as they were.
pub const FETCH_FAILED_MESSAGE: &str = "Failed to load treasures.";
/// Confirmation asked before deleting a pin.
pub const DELETE_CONFIRM_MESSAGE: &str =
    "Are you sure you want to delete this treasure? This cannot be undone.";

/// Escape text for embedding in HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Content bound to a map marker's popup.
#[derive(Debug, Clone, PartialEq)]
pub struct PopupContent {
    pub title: String,
    pub description: Option<String>,
    pub photo_url: Option<String>,
    pub date_label: Option<String>,
    /// The viewer owns this pin and may delete it. Cosmetic only; the
    /// server enforces ownership on the actual delete.
    pub deletable: bool,
    pub pin_id: Option<PinId>,
}

impl PopupContent {
    /// Popup for the not-yet-submitted pending location marker.
    pub fn selection() -> Self {
        Self {
            title: "Selected location".to_string(),
            description: None,
            photo_url: None,
            date_label: None,
            deletable: false,
            pin_id: None,
        }
    }

    /// Popup for a persisted pin, with the delete affordance resolved
    /// against the viewer's identity.
    pub fn for_pin(pin: &Pin, viewer: Option<Uuid>) -> Self {
        Self {
            title: pin.title.clone(),
            description: pin.description.clone(),
            photo_url: pin.photo_url.clone(),
            date_label: Some(pin.date_label()),
            deletable: viewer == Some(pin.user_id),
            pin_id: Some(pin.id),
        }
    }

    /// Render the popup as an HTML fragment. User-provided text is escaped
    /// here; the delete affordance renders as a data attribute for the
    /// frontend to bind, never as an inline handler.
    pub fn render_html(&self) -> String {
        let mut html = String::new();
        html.push_str("<div class=\"pin-popup\">");
        html.push_str(&format!("<h3>{}</h3>", escape_html(&self.title)));
        if let Some(url) = &self.photo_url {
            html.push_str(&format!(
                "<img src=\"{}\" alt=\"Treasure photo\">",
                escape_html(url)
            ));
        }
        html.push_str(&format!(
            "<p>{}</p>",
            escape_html(self.description.as_deref().unwrap_or(NO_DESCRIPTION))
        ));
        if let Some(date) = &self.date_label {
            html.push_str(&format!(
                "<p class=\"date\">Posted: {}</p>",
                escape_html(date)
            ));
        }
        if self.deletable {
            if let Some(id) = self.pin_id {
                html.push_str(&format!(
                    "<button class=\"delete-pin\" data-pin-id=\"{id}\">Delete Pin</button>"
                ));
            }
        }
        html.push_str("</div>");
        html
    }
}

/// One entry in the scrollable pin list.
#[derive(Debug, Clone, PartialEq)]
pub struct PinCard {
    pub id: PinId,
    pub title: String,
    pub description: String,
    /// Coordinate label, 4 decimals.
    pub coords_label: String,
    pub date_label: String,
    pub photo_url: Option<String>,
    pub deletable: bool,
}

impl PinCard {
    pub fn from_pin(pin: &Pin, viewer: Option<Uuid>) -> Self {
        Self {
            id: pin.id,
            title: pin.title.clone(),
            description: pin
                .description
                .clone()
                .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
            coords_label: format!("{:.4}, {:.4}", pin.latitude, pin.longitude),
            date_label: pin.date_label(),
            photo_url: pin.photo_url.clone(),
            deletable: viewer == Some(pin.user_id),
        }
    }
}

/// Rendering surface for the pin list container.
pub trait ListSurface: Send + Sync {
    /// Remove all cards.
    fn clear(&self);

    /// Append a card below the existing ones.
    fn push_card(&self, card: PinCard);

    /// Show a status line in the list container (empty set, fetch failure).
    fn show_message(&self, text: &str);
}

/// Interactive confirmation before destructive actions.
pub trait ConfirmPrompt: Send + Sync {
    fn confirm(&self, message: &str) -> bool;
}

/// Sign-in/sign-out affordance bound to the session state.
pub trait AuthUi: Send + Sync {
    fn session_changed(&self, session: Option<&Session>);
}
