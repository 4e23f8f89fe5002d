//! Unified error type for client operations.
//!
//! Validation failures carry their user-facing message directly so the
//! frontend can show them inline without a translation table. Transport
//! failures are terminal for the action that caused them; nothing in this
//! crate retries automatically.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// No active session for an operation that requires one
    #[error("Please sign in to continue")]
    SignedOut,

    /// Pin submission without a prior map click
    #[error("Please select a location on the map")]
    MissingLocation,

    /// Pin submission with an empty title
    #[error("Please enter a title for the item")]
    MissingTitle,

    /// Sign-in attempt with an empty email address
    #[error("Please enter an email address")]
    MissingEmail,

    /// Attached photo exceeds the upload size limit
    #[error("Image size too large. Please choose an image under 5MB.")]
    PhotoTooLarge,

    /// A submission is already in flight; the submit control is disabled
    #[error("A submission is already in progress")]
    SubmissionInFlight,

    /// Identity provider reported throttling
    #[error("Too many login attempts. Please wait 60 seconds before trying again.")]
    RateLimited,

    /// Network or remote-service failure
    #[error("Backend error: {0}")]
    Transport(String),

    /// Reverse-geocode lookup failed or returned no usable address
    #[error("Address lookup failed: {0}")]
    Geocode(String),

    /// Configuration file missing, unreadable, or invalid
    #[error("Config error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(e.to_string())
    }
}

impl Error {
    /// True for errors the user can fix by changing their input,
    /// as opposed to transient backend failures.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::SignedOut
                | Error::MissingLocation
                | Error::MissingTitle
                | Error::MissingEmail
                | Error::PhotoTooLarge
        )
    }
}
