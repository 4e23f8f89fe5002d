//! HTTP implementation of the backend capability traits.
//!
//! Talks to the hosted backend's REST surface: a row API for the pins
//! table, an object API for photo storage, and an OTP auth API. Requests
//! carry the anon key plus a bearer token; the bearer is the anon key while
//! signed out and the session access token once a session is active.

use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::BackendConfig;
use crate::error::Error;
use crate::pin::{NewPin, Pin, PinId};
use crate::remote::{IdentityProvider, PhotoStore, PinStore};
use crate::session::{Session, SessionEvent};

pub struct RestBackend {
    http: Client,
    config: BackendConfig,
    access_token: RwLock<Option<String>>,
    session_events: broadcast::Sender<SessionEvent>,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: Uuid,
    email: Option<String>,
}

impl RestBackend {
    pub fn new(config: BackendConfig) -> Self {
        let (session_events, _) = broadcast::channel(16);
        Self {
            http: Client::new(),
            config,
            access_token: RwLock::new(None),
            session_events,
        }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Clone of the underlying HTTP client, shared with the change feed.
    pub fn http(&self) -> Client {
        self.http.clone()
    }

    fn bearer(&self) -> String {
        self.access_token
            .read()
            .expect("token lock poisoned")
            .clone()
            .unwrap_or_else(|| self.config.anon_key.clone())
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.config.anon_key)
            .bearer_auth(self.bearer())
    }

    /// Map a non-success response to the error taxonomy. Provider
    /// throttling (429 or a "rate limit" body) becomes `RateLimited`.
    async fn check(response: Response) -> Result<Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::TOO_MANY_REQUESTS || body.contains("rate limit") {
            return Err(Error::RateLimited);
        }
        Err(Error::Transport(format!("{status}: {body}")))
    }

    /// Adopt an access token obtained from a clicked login link: verify it
    /// against the auth API, store it, and emit the session transition.
    pub async fn resume_session(&self, access_token: &str) -> Result<Session, Error> {
        let response = self
            .http
            .get(self.config.auth_url("user"))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        let user: UserResponse = Self::check(response).await?.json().await?;

        let session = Session {
            user_id: user.id,
            email: user.email.unwrap_or_default(),
            access_token: access_token.to_string(),
        };
        *self.access_token.write().expect("token lock poisoned") =
            Some(access_token.to_string());
        let _ = self
            .session_events
            .send(SessionEvent::SignedIn(session.clone()));
        Ok(session)
    }
}

#[async_trait]
impl PinStore for RestBackend {
    async fn fetch_all(&self) -> Result<Vec<Pin>, Error> {
        let response = self
            .authed(self.http.get(self.config.rows_url()))
            .query(&[("select", "*"), ("order", "created_at.desc")])
            .send()
            .await?;
        let pins = Self::check(response).await?.json().await?;
        Ok(pins)
    }

    async fn insert(&self, pin: NewPin) -> Result<Pin, Error> {
        let response = self
            .authed(self.http.post(self.config.rows_url()))
            .header("Prefer", "return=representation")
            .json(&pin)
            .send()
            .await?;
        let mut rows: Vec<Pin> = Self::check(response).await?.json().await?;
        rows.pop()
            .ok_or_else(|| Error::Transport("insert returned no row".to_string()))
    }

    async fn delete(&self, id: PinId) -> Result<(), Error> {
        let response = self
            .authed(self.http.delete(self.config.rows_url()))
            .query(&[("id", format!("eq.{id}"))])
            .send()
            .await?;
        Self::check(response).await?;
        debug!(id, "pin deleted");
        Ok(())
    }
}

#[async_trait]
impl PhotoStore for RestBackend {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), Error> {
        let response = self
            .authed(self.http.post(self.config.storage_object_url(path)))
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await?;
        Self::check(response).await?;
        debug!(path, "photo uploaded");
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        self.config.storage_public_url(path)
    }
}

#[async_trait]
impl IdentityProvider for RestBackend {
    async fn request_magic_link(&self, email: &str, redirect_to: &str) -> Result<(), Error> {
        let response = self
            .http
            .post(self.config.auth_url("otp"))
            .header("apikey", &self.config.anon_key)
            .query(&[("redirect_to", redirect_to)])
            .json(&serde_json::json!({
                "email": email,
                "create_user": true,
            }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), Error> {
        let response = self
            .authed(self.http.post(self.config.auth_url("logout")))
            .send()
            .await?;
        Self::check(response).await?;

        *self.access_token.write().expect("token lock poisoned") = None;
        let _ = self.session_events.send(SessionEvent::SignedOut);
        info!("signed out");
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.session_events.subscribe()
    }
}
