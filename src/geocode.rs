//! Reverse geocoding.
//!
//! Best-effort address resolution for a clicked coordinate. Failures must
//! never block pin placement; callers fall back to `coordinate_label`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::Error;

/// Public lookup service, keyless.
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

/// Six-decimal coordinate label, used wherever an address is unavailable.
pub fn coordinate_label(lat: f64, lon: f64) -> String {
    format!("{lat:.6}, {lon:.6}")
}

#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// Resolve a coordinate pair to a human-readable address.
    async fn resolve(&self, lat: f64, lon: f64) -> Result<String, Error>;
}

pub struct NominatimResolver {
    http: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    display_name: Option<String>,
}

impl NominatimResolver {
    pub fn new(http: Client) -> Self {
        Self::with_base_url(http, DEFAULT_NOMINATIM_URL)
    }

    pub fn with_base_url(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl AddressResolver for NominatimResolver {
    async fn resolve(&self, lat: f64, lon: f64) -> Result<String, Error> {
        let response = self
            .http
            .get(format!("{}/reverse", self.base_url))
            .query(&[
                ("format", "json".to_string()),
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Geocode(format!("status {}", response.status())));
        }

        let body: ReverseResponse = response
            .json()
            .await
            .map_err(|e| Error::Geocode(e.to_string()))?;

        match body.display_name {
            Some(name) if !name.is_empty() => Ok(name),
            _ => Err(Error::Geocode("no display name in response".to_string())),
        }
    }
}
