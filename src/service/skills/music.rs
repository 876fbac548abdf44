use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use base64::Engine;
use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::shared::error::SkillError;
use crate::shared::ports::skills::{MusicPort, SkillFuture};

const ACCOUNTS_URL: &str = "https://accounts.spotify.com/api/token";
const API_BASE: &str = "https://api.spotify.com/v1";
// Treat tokens as expired a minute early.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl SpotifyCredentials {
    pub fn from_parts(
        client_id: Option<String>,
        client_secret: Option<String>,
        refresh_token: Option<String>,
    ) -> Option<Self> {
        Some(Self {
            client_id: client_id?,
            client_secret: client_secret?,
            refresh_token: refresh_token?,
        })
    }

    fn basic_auth(&self) -> String {
        let raw = format!("{}:{}", self.client_id, self.client_secret);
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(raw)
        )
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

/// Spotify Web API playback control through a user refresh token.
#[derive(Clone)]
pub struct SpotifyPlayer {
    client: Client,
    credentials: Option<SpotifyCredentials>,
    token: Arc<Mutex<Option<(String, Instant)>>>,
}

impl SpotifyPlayer {
    pub fn new(client: Client, credentials: Option<SpotifyCredentials>) -> Self {
        Self {
            client,
            credentials,
            token: Arc::new(Mutex::new(None)),
        }
    }

    async fn access_token(&self) -> Result<String, SkillError> {
        let creds = self
            .credentials
            .as_ref()
            .ok_or(SkillError::NotConfigured("SPOTIFY_CLIENT_ID/SECRET/REFRESH_TOKEN"))?;
        let mut token = self.token.lock().await;
        if let Some((value, expires_at)) = token.as_ref() {
            if Instant::now() < *expires_at {
                return Ok(value.clone());
            }
        }
        log::debug!("[music] refreshing access token");
        let fresh = self
            .refresh(creds)
            .await
            .map_err(|e| SkillError::QueryFailed(format!("token refresh: {}", e)))?;
        let lifetime = Duration::from_secs(fresh.expires_in).saturating_sub(EXPIRY_MARGIN);
        *token = Some((fresh.access_token.clone(), Instant::now() + lifetime));
        Ok(fresh.access_token)
    }

    async fn refresh(&self, creds: &SpotifyCredentials) -> Result<TokenResponse> {
        let resp = self
            .client
            .post(ACCOUNTS_URL)
            .header("Authorization", creds.basic_auth())
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", creds.refresh_token.as_str()),
            ])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("token endpoint {}: {}", status, body);
        }
        Ok(resp.json().await?)
    }

    async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, SkillError> {
        let token = self.access_token().await?;
        Ok(self
            .client
            .request(method, format!("{}{}", API_BASE, path))
            .bearer_auth(token))
    }

    async fn send_ok(&self, builder: RequestBuilder) -> Result<Option<Value>> {
        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("spotify {}: {}", status, body);
        }
        if status.as_u16() == 204 {
            return Ok(None);
        }
        let text = resp.text().await?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// Activates the first available device when none is active.
    async fn ensure_active_device(&self) -> Result<(), SkillError> {
        let devices = self
            .send_ok(self.request(Method::GET, "/me/player/devices").await?)
            .await
            .map_err(|e| SkillError::QueryFailed(e.to_string()))?
            .unwrap_or(Value::Null);
        let devices = devices["devices"].as_array().cloned().unwrap_or_default();
        if devices.is_empty() {
            return Err(SkillError::QueryFailed(
                "no Spotify device available".to_string(),
            ));
        }
        if devices.iter().any(|d| d["is_active"].as_bool() == Some(true)) {
            return Ok(());
        }
        let id = devices[0]["id"]
            .as_str()
            .ok_or_else(|| SkillError::QueryFailed("device without id".to_string()))?
            .to_string();
        let builder = self
            .request(Method::PUT, "/me/player")
            .await?
            .json(&serde_json::json!({ "device_ids": [id] }));
        self.send_ok(builder)
            .await
            .map(|_| ())
            .map_err(|e| SkillError::QueryFailed(e.to_string()))
    }

    async fn simple_command(&self, method: Method, path: &str) -> Result<(), SkillError> {
        self.ensure_active_device().await?;
        let builder = self.request(method, path).await?;
        self.send_ok(builder)
            .await
            .map(|_| ())
            .map_err(|e| SkillError::QueryFailed(e.to_string()))
    }

    async fn play(&self, query: &str) -> Result<String, SkillError> {
        self.ensure_active_device().await?;
        let search = self
            .request(Method::GET, "/search")
            .await?
            .query(&[("q", query), ("type", "track"), ("limit", "1")]);
        let found = self
            .send_ok(search)
            .await
            .map_err(|e| SkillError::QueryFailed(e.to_string()))?
            .unwrap_or(Value::Null);
        let (uri, label) = first_track(&found).ok_or(SkillError::NoResult)?;

        let play = self
            .request(Method::PUT, "/me/player/play")
            .await?
            .json(&serde_json::json!({ "uris": [uri] }));
        self.send_ok(play)
            .await
            .map_err(|e| SkillError::QueryFailed(e.to_string()))?;
        Ok(label)
    }
}

/// `(uri, "name by artist")` of the first search hit.
fn first_track(search: &Value) -> Option<(String, String)> {
    let track = search["tracks"]["items"].as_array()?.first()?;
    let uri = track["uri"].as_str()?.to_string();
    let name = track["name"].as_str().unwrap_or_default();
    let label = match track["artists"][0]["name"].as_str() {
        Some(artist) => format!("{} by {}", name, artist),
        None => name.to_string(),
    };
    Some((uri, label))
}

impl MusicPort for SpotifyPlayer {
    fn play_track(&self, query: String) -> SkillFuture<String> {
        let this = self.clone();
        Box::pin(async move { this.play(&query).await })
    }

    fn pause(&self) -> SkillFuture<()> {
        let this = self.clone();
        Box::pin(async move { this.simple_command(Method::PUT, "/me/player/pause").await })
    }

    fn next_track(&self) -> SkillFuture<()> {
        let this = self.clone();
        Box::pin(async move { this.simple_command(Method::POST, "/me/player/next").await })
    }
}
