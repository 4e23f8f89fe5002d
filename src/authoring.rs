//! Pin authoring flow: validate, upload the photo if any, insert.
//!
//! The flow is strictly ordered so no partial record can appear: every
//! validation runs before any network call, the upload completes before the
//! insert, and an upload failure aborts the submission entirely. An
//! orphaned blob is possible if the insert then fails; an orphaned pin
//! without its intended photo is not.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::error::Error;
use crate::interaction::MapInteraction;
use crate::pin::{NewPin, Pin};
use crate::remote::{PhotoStore, PinStore};
use crate::session::{Session, SessionController};
use crate::sync::PinSynchronizer;

/// Upload size limit for photos (5 MiB).
pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

/// A photo file attached to a draft.
#[derive(Debug, Clone)]
pub struct PhotoAttachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// User input for a new pin. Coordinates are not part of the draft; they
/// come from the pending location recorded by the map click.
#[derive(Debug, Clone, Default)]
pub struct PinDraft {
    pub title: String,
    pub description: String,
    pub photo: Option<PhotoAttachment>,
}

pub struct AuthoringFlow {
    pins: Arc<dyn PinStore>,
    photos: Arc<dyn PhotoStore>,
    session: Arc<SessionController>,
    interaction: Arc<MapInteraction>,
    sync: Arc<PinSynchronizer>,
    /// Submit gate; set for the whole upload+insert window.
    submitting: AtomicBool,
}

/// Re-enables the submit gate on every exit path.
struct SubmitGuard<'a>(&'a AtomicBool);

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl AuthoringFlow {
    pub fn new(
        pins: Arc<dyn PinStore>,
        photos: Arc<dyn PhotoStore>,
        session: Arc<SessionController>,
        interaction: Arc<MapInteraction>,
        sync: Arc<PinSynchronizer>,
    ) -> Arc<Self> {
        Arc::new(Self {
            pins,
            photos,
            session,
            interaction,
            sync,
            submitting: AtomicBool::new(false),
        })
    }

    /// Submit a draft. On success the pending location and selection marker
    /// are cleared and the views refreshed; on failure all input state is
    /// left intact for retry.
    pub async fn submit(&self, draft: PinDraft) -> Result<Pin, Error> {
        if self.submitting.swap(true, Ordering::SeqCst) {
            return Err(Error::SubmissionInFlight);
        }
        let _guard = SubmitGuard(&self.submitting);

        let session = self.session.current_user().ok_or(Error::SignedOut)?;
        let pending = self
            .interaction
            .pending()
            .await
            .ok_or(Error::MissingLocation)?;
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(Error::MissingTitle);
        }

        let photo_url = match draft.photo {
            Some(photo) => Some(self.upload_photo(&session, photo).await?),
            None => None,
        };

        let description = draft.description.trim();
        let pin = self
            .pins
            .insert(NewPin {
                title: title.to_string(),
                description: (!description.is_empty()).then(|| description.to_string()),
                latitude: pending.position.lat,
                longitude: pending.position.lng,
                photo_url,
                user_id: session.user_id,
            })
            .await?;

        info!(id = pin.id, "pin created");
        self.interaction.clear().await;

        // The insert already succeeded; a failed refresh here surfaces in
        // the list and resolves on the next change notification.
        if let Err(e) = self.sync.reconcile().await {
            warn!("refresh after insert failed: {e}");
        }

        Ok(pin)
    }

    /// Size-check and upload a photo, returning its public URL. The object
    /// path is namespaced by user id; the name comes from the submission
    /// time plus the original extension.
    async fn upload_photo(
        &self,
        session: &Session,
        photo: PhotoAttachment,
    ) -> Result<String, Error> {
        if photo.bytes.len() > MAX_PHOTO_BYTES {
            return Err(Error::PhotoTooLarge);
        }

        let ext = Path::new(&photo.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("jpg");
        let path = format!(
            "{}/{}.{}",
            session.user_id,
            Utc::now().timestamp_millis(),
            ext
        );

        self.photos
            .upload(&path, photo.bytes, &photo.content_type)
            .await?;
        Ok(self.photos.public_url(&path))
    }
}
