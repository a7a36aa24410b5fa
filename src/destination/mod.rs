//! Outbound notification destinations.

pub mod discord;
pub mod mastodon;
pub mod twitter;

use async_trait::async_trait;
use reqwest::Response;

use crate::error::Error;

pub use discord::Discord;
pub use mastodon::Mastodon;
pub use twitter::Twitter;

/// Text to publish, plus an optional key that lets destinations drop a
/// repeated post for the same event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub text: String,
    pub idempotency_key: Option<String>,
}

/// A service the notifier can publish to.
#[async_trait]
pub trait Destination: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the credential that switches this destination on is present.
    fn enabled(&self) -> bool;

    async fn send(&self, notification: &Notification) -> Result<(), Error>;
}

/// Turns a non-2xx response into an error carrying the body.
pub(crate) async fn check_status(
    endpoint: &'static str,
    response: Response,
) -> Result<Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(Error::UnexpectedStatus {
        endpoint,
        status,
        body,
    })
}
