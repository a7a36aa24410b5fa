use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{Destination, Notification, check_status};
use crate::config::DiscordConfig;
use crate::error::Error;

#[derive(Serialize)]
struct DiscordMessage<'a> {
    content: &'a str,
}

/// Posts to a Discord channel through an incoming webhook.
pub struct Discord {
    http: Client,
    webhook_url: Option<String>,
}

impl Discord {
    #[must_use]
    pub fn new(config: &DiscordConfig, http: Client) -> Self {
        Self {
            http,
            webhook_url: config.webhook.clone().filter(|url| !url.trim().is_empty()),
        }
    }
}

#[async_trait]
impl Destination for Discord {
    fn name(&self) -> &'static str {
        "Discord"
    }

    fn enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    async fn send(&self, notification: &Notification) -> Result<(), Error> {
        let webhook_url = self
            .webhook_url
            .as_deref()
            .ok_or_else(|| Error::Config("discord.webhook is not set".to_string()))?;

        let payload = DiscordMessage {
            content: &notification.text,
        };

        let response = self.http.post(webhook_url).json(&payload).send().await?;
        check_status("discord webhook", response).await?;
        Ok(())
    }
}
