//! Capability traits for the hosted backend.
//!
//! Storage, identity, and change notification are delegated entirely to an
//! external managed service. These traits are the seam: `RestBackend`
//! implements all of them over the service's HTTP surface, and the test
//! harness implements them in memory.

pub mod feed;
pub mod rest;

pub use rest::RestBackend;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::Error;
use crate::pin::{NewPin, Pin, PinId};
use crate::session::SessionEvent;

/// Row store for the pins collection.
#[async_trait]
pub trait PinStore: Send + Sync {
    /// Fetch the complete pin set, ordered by creation time descending.
    async fn fetch_all(&self) -> Result<Vec<Pin>, Error>;

    /// Insert one pin; the server assigns `id` and `created_at`.
    async fn insert(&self, pin: NewPin) -> Result<Pin, Error>;

    /// Delete by id. Ownership is enforced server-side; a delete for a pin
    /// the caller does not own silently matches zero rows.
    async fn delete(&self, id: PinId) -> Result<(), Error>;
}

/// Blob storage for pin photos.
#[async_trait]
pub trait PhotoStore: Send + Sync {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), Error>;

    /// Stable public URL for an uploaded object.
    fn public_url(&self, path: &str) -> String;
}

/// Passwordless identity provider with a session-change stream.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Request a login link for `email`, redirecting back to `redirect_to`.
    async fn request_magic_link(&self, email: &str, redirect_to: &str) -> Result<(), Error>;

    async fn sign_out(&self) -> Result<(), Error>;

    /// Subscribe to session transitions.
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;
}
