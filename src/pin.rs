//! Pin data model.
//!
//! The authoritative copy of every pin lives in the remote row store; these
//! types mirror its wire shape. `id` and `created_at` are server-assigned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::map::LatLng;

/// Server-assigned row identifier.
pub type PinId = i64;

/// A single user-submitted record describing a free item at a location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pin {
    pub id: PinId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub user_id: Uuid,
}

impl Pin {
    pub fn position(&self) -> LatLng {
        LatLng {
            lat: self.latitude,
            lng: self.longitude,
        }
    }

    /// Date label shown in popups and list cards.
    pub fn date_label(&self) -> String {
        self.created_at.format("%Y-%m-%d").to_string()
    }
}

/// Insert payload; the server fills in `id` and `created_at`.
#[derive(Debug, Clone, Serialize)]
pub struct NewPin {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub user_id: Uuid,
}
