//! Telemetry provider boundary
//!
//! The engine only ever talks to the upstream platform through the narrow
//! [`TelemetryProvider`] trait; [`HttpTelemetryProvider`] is the production
//! implementation. Everything upstream-specific (endpoints, token plumbing,
//! status-code mapping) stays behind this seam.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::trace;

use crate::{
    RawProfile, RawSnapshot, RiderId,
    config::Credentials,
    error::{ProviderError, ProviderResult},
};

/// An authenticated session with the platform.
///
/// Carries the access token and the account's own profile, which is where the
/// self rider id for auto-registration comes from.
#[derive(Debug, Clone)]
pub struct ProviderSession {
    pub access_token: String,
    pub profile: RawProfile,
}

/// Narrow interface to the upstream platform.
///
/// Implementations may fail, rate-limit, or return partial data; the poll
/// actor owns all recovery policy.
#[async_trait]
pub trait TelemetryProvider: Send + Sync {
    /// Exchange credentials for a session. An `Auth` error here is fatal at
    /// setup time and recoverable during steady-state polling.
    async fn authenticate(&self, credentials: &Credentials) -> ProviderResult<ProviderSession>;

    /// Fetch the current snapshot for one rider. The live-state part is
    /// absent whenever the rider is not in an active session.
    async fn fetch_snapshot(
        &self,
        session: &ProviderSession,
        rider_id: &RiderId,
    ) -> ProviderResult<RawSnapshot>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// reqwest-backed provider against the platform's REST API.
pub struct HttpTelemetryProvider {
    root: String,

    /// HTTP client (reused across requests for efficiency)
    client: reqwest::Client,
}

impl HttpTelemetryProvider {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        session: &ProviderSession,
        url: &str,
    ) -> ProviderResult<T> {
        trace!("requesting {url}");

        let response = self
            .client
            .get(url)
            .bearer_auth(&session.access_token)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response.json::<T>().await?),
            StatusCode::UNAUTHORIZED => Err(ProviderError::Auth(format!(
                "session rejected for {url}"
            ))),
            StatusCode::NOT_FOUND => Err(ProviderError::NotFound(url.to_string())),
            status => Err(ProviderError::Transient(format!(
                "unexpected status {status} from {url}"
            ))),
        }
    }
}

#[async_trait]
impl TelemetryProvider for HttpTelemetryProvider {
    async fn authenticate(&self, credentials: &Credentials) -> ProviderResult<ProviderSession> {
        let url = format!("{}/auth/token", self.root);
        trace!("authenticating against {url}");

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "id": credentials.id,
                "secret": credentials.secret,
            }))
            .send()
            .await?;

        let token = match response.status() {
            status if status.is_success() => response.json::<TokenResponse>().await?,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ProviderError::Auth(
                    "credentials are wrong or expired".to_string(),
                ));
            }
            status => {
                return Err(ProviderError::Transient(format!(
                    "unexpected status {status} during authentication"
                )));
            }
        };

        // Resolve the account's own profile; it anchors self-registration.
        let mut session = ProviderSession {
            access_token: token.access_token,
            profile: RawProfile::default(),
        };
        let url = format!("{}/riders/me/profile", self.root);
        session.profile = self.get_json(&session, &url).await?;

        Ok(session)
    }

    async fn fetch_snapshot(
        &self,
        session: &ProviderSession,
        rider_id: &RiderId,
    ) -> ProviderResult<RawSnapshot> {
        let url = format!("{}/riders/{rider_id}/profile", self.root);
        let profile: RawProfile = self.get_json(session, &url).await?;

        // The live state only exists while the rider is in a session; a 404
        // on the status endpoint means the session just ended, not an error.
        let live = if profile.riding {
            let url = format!("{}/riders/{rider_id}/status", self.root);
            match self.get_json(session, &url).await {
                Ok(live) => Some(live),
                Err(ProviderError::NotFound(_)) => None,
                Err(e) => return Err(e),
            }
        } else {
            None
        };

        Ok(RawSnapshot {
            profile: Some(profile),
            live,
        })
    }
}
