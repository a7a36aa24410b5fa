//! Live-status source backed by the Twitch Helix API.

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use std::time::{Duration, Instant};

use crate::config::TwitchConfig;
use crate::error::Error;

const DEFAULT_API_BASE: &str = "https://api.twitch.tv";
const DEFAULT_AUTH_BASE: &str = "https://id.twitch.tv";

/// Tokens are renewed this long before Twitch says they expire.
const TOKEN_EXPIRY_MARGIN_SECS: u64 = 60;

/// One entry of the Helix "Get Streams" response, reduced to what the
/// notifier reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StreamSnapshot {
    pub title: String,
    pub game_id: String,
    pub game_name: String,
    #[serde(rename = "type")]
    pub stream_type: String,
    pub started_at: String,
}

impl StreamSnapshot {
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.stream_type == "live"
    }
}

/// Anything that can report the current streams of the watched channel.
#[async_trait]
pub trait StreamSource: Send {
    /// Name of the watched channel, for logging.
    fn channel(&self) -> &str;

    /// Streams currently reported for the channel, in API order.
    async fn current_streams(&mut self) -> Result<Vec<StreamSnapshot>, Error>;
}

#[derive(Debug, Deserialize)]
struct HelixResponse<T> {
    data: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
struct TwitchUser {
    id: String,
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug)]
struct AppToken {
    access_token: String,
    expires_at: Instant,
}

pub struct TwitchClient {
    http: Client,
    api_base: String,
    auth_base: String,
    app_id: String,
    app_secret: String,
    login: String,
    token: Option<AppToken>,
    user: Option<TwitchUser>,
}

impl TwitchClient {
    #[must_use]
    pub fn new(config: &TwitchConfig, http: Client) -> Self {
        Self {
            http,
            api_base: DEFAULT_API_BASE.to_string(),
            auth_base: DEFAULT_AUTH_BASE.to_string(),
            app_id: config.app_id.clone(),
            app_secret: config.app_secret.clone(),
            login: config.watched_channel.clone(),
            token: None,
            user: None,
        }
    }

    /// Points the client at different API and OAuth hosts.
    #[must_use]
    pub fn with_base_urls(mut self, api_base: &str, auth_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self.auth_base = auth_base.trim_end_matches('/').to_string();
        self
    }

    /// Returns a valid app access token, requesting a new one through the
    /// client-credentials grant when none is cached or it is about to expire.
    async fn access_token(&mut self) -> Result<String, Error> {
        if let Some(token) = &self.token {
            if Instant::now() < token.expires_at {
                return Ok(token.access_token.clone());
            }
            debug!("Twitch app token expired, requesting a new one");
        }

        let response = self
            .http
            .post(format!("{}/oauth2/token", self.auth_base))
            .form(&[
                ("client_id", self.app_id.as_str()),
                ("client_secret", self.app_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::UnexpectedStatus {
                endpoint: "oauth2/token",
                status,
                body,
            });
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = token.expires_in.saturating_sub(TOKEN_EXPIRY_MARGIN_SECS);
        self.token = Instant::now()
            .checked_add(Duration::from_secs(lifetime))
            .map(|expires_at| AppToken {
                access_token: token.access_token.clone(),
                expires_at,
            });
        if self.token.is_none() {
            warn!(
                "Twitch token lifetime of {}s is out of range, not caching it",
                token.expires_in
            );
        }

        Ok(token.access_token)
    }

    async fn helix_get<T: DeserializeOwned>(
        &mut self,
        endpoint: &'static str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, Error> {
        let access_token = self.access_token().await?;

        let response = self
            .http
            .get(format!("{}/helix/{endpoint}", self.api_base))
            .query(query)
            .header("Client-Id", &self.app_id)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            // Revoked or rotated token, authenticate again on the next call.
            self.token = None;
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::UnexpectedStatus {
                endpoint,
                status,
                body,
            });
        }

        let body: HelixResponse<T> = response.json().await?;
        Ok(body.data)
    }

    async fn user_id(&mut self) -> Result<String, Error> {
        if let Some(user) = &self.user {
            return Ok(user.id.clone());
        }

        let login = self.login.clone();
        let users: Vec<TwitchUser> = self.helix_get("users", &[("login", login.as_str())]).await?;
        let user = users
            .into_iter()
            .next()
            .ok_or_else(|| Error::ChannelNotFound(login))?;

        info!(
            "Resolved Twitch channel {} to user {} ({})",
            self.login, user.display_name, user.id
        );
        let id = user.id.clone();
        self.user = Some(user);
        Ok(id)
    }
}

#[async_trait]
impl StreamSource for TwitchClient {
    fn channel(&self) -> &str {
        &self.login
    }

    async fn current_streams(&mut self) -> Result<Vec<StreamSnapshot>, Error> {
        let user_id = self.user_id().await?;
        self.helix_get("streams", &[("user_id", user_id.as_str())]).await
    }
}

/// Wraps a source and always appends a live entry, so the whole notification
/// path can be exercised without the channel actually streaming.
pub struct SyntheticLiveSource<S> {
    inner: S,
    entry: StreamSnapshot,
}

impl<S: StreamSource> SyntheticLiveSource<S> {
    #[must_use]
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            entry: StreamSnapshot {
                title: "Synthetic test stream".to_string(),
                game_id: "509658".to_string(),
                game_name: "Just Chatting".to_string(),
                stream_type: "live".to_string(),
                started_at: "2022-11-06T12:27:06Z".to_string(),
            },
        }
    }
}

#[async_trait]
impl<S: StreamSource> StreamSource for SyntheticLiveSource<S> {
    fn channel(&self) -> &str {
        self.inner.channel()
    }

    async fn current_streams(&mut self) -> Result<Vec<StreamSnapshot>, Error> {
        let mut streams = self.inner.current_streams().await?;
        streams.push(self.entry.clone());
        Ok(streams)
    }
}
