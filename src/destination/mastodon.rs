use async_trait::async_trait;
use reqwest::Client;

use super::{Destination, Notification, check_status};
use crate::config::MastodonConfig;
use crate::error::Error;

const DEFAULT_VISIBILITY: &str = "unlisted";

/// Posts statuses to a Mastodon instance.
pub struct Mastodon {
    http: Client,
    enabled: bool,
    statuses_url: String,
    access_token: String,
    visibility: String,
}

impl Mastodon {
    #[must_use]
    pub fn new(config: &MastodonConfig, http: Client) -> Self {
        let instance = config.instance.as_deref().unwrap_or_default();
        Self {
            http,
            enabled: config.enabled(),
            statuses_url: format!("{}/api/v1/statuses", instance.trim_end_matches('/')),
            access_token: config.access_token.clone().unwrap_or_default(),
            visibility: config
                .visibility
                .clone()
                .unwrap_or_else(|| DEFAULT_VISIBILITY.to_string()),
        }
    }
}

#[async_trait]
impl Destination for Mastodon {
    fn name(&self) -> &'static str {
        "Mastodon"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    async fn send(&self, notification: &Notification) -> Result<(), Error> {
        let mut request = self
            .http
            .post(&self.statuses_url)
            .bearer_auth(&self.access_token)
            .form(&[
                ("status", notification.text.as_str()),
                ("visibility", self.visibility.as_str()),
            ]);

        // Mastodon drops a second status with the same key for an hour.
        if let Some(key) = &notification.idempotency_key {
            request = request.header("Idempotency-Key", key);
        }

        check_status("mastodon statuses", request.send().await?).await?;
        Ok(())
    }
}
