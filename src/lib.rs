//! Watches a Twitch channel and announces when it goes live (and, optionally,
//! when the streamed game changes) on Mastodon, Twitter and Discord.

pub mod config;
pub mod destination;
pub mod dispatch;
pub mod error;
pub mod state;
pub mod template;
pub mod twitch;
pub mod worker;

use reqwest::Client;
use std::time::Duration;

use crate::error::Error;

/// Builds the HTTP client shared by the Twitch source and all destinations.
///
/// Without `timeout_secs` requests may wait indefinitely.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialised.
pub fn http_client(timeout_secs: Option<u64>) -> Result<Client, Error> {
    let mut builder = Client::builder();
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    Ok(builder.build()?)
}
