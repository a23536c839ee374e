use std::time::Duration;

use tokio::{sync::Mutex, time::Instant};
use tunelink::{Error, ErrorKind, Result};

use crate::model::TokenResponse;

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
/// Tokens are refreshed this long before they actually expire.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    refresh_at: Instant,
}

/// Client-credentials access token, fetched lazily and shared by every request.
#[derive(Debug)]
pub(crate) struct TokenCache {
    client_id: String,
    client_secret: String,
    token: Mutex<Option<AccessToken>>,
}

impl TokenCache {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client_id,
            client_secret,
            token: Mutex::new(None),
        }
    }

    pub async fn get(&self, client: &reqwest::Client) -> Result<String> {
        let mut token = self.token.lock().await;
        if let Some(current) = token.as_ref() {
            if Instant::now() < current.refresh_at {
                return Ok(current.value.clone());
            }
        }

        tracing::debug!("requesting spotify access token");
        let response = client
            .post(TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(Error::wrap)?;
        if !response.status().is_success() {
            let kind = match response.status() {
                reqwest::StatusCode::BAD_REQUEST | reqwest::StatusCode::UNAUTHORIZED => {
                    ErrorKind::Unauthorized
                }
                reqwest::StatusCode::TOO_MANY_REQUESTS => ErrorKind::RateLimited,
                _ => ErrorKind::Internal,
            };
            return Err(Error::new(
                kind,
                format!("spotify token request failed with {}", response.status()),
            ));
        }
        let response: TokenResponse = response.json().await.map_err(Error::wrap)?;

        let lifetime = Duration::from_secs(response.expires_in).saturating_sub(REFRESH_MARGIN);
        let fresh = AccessToken {
            value: response.access_token,
            refresh_at: Instant::now() + lifetime,
        };
        let value = fresh.value.clone();
        *token = Some(fresh);
        Ok(value)
    }

    /// Forgets the current token so the next request fetches a new one.
    pub async fn invalidate(&self) {
        *self.token.lock().await = None;
    }
}
