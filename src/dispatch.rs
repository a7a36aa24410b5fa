use log::{error, info};
use reqwest::Client;

use crate::config::Config;
use crate::destination::{Destination, Discord, Mastodon, Notification, Twitter};

/// What happened to a notification at one destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The destination has no credential configured.
    Skipped,
    /// Dry run, the text was only logged.
    DryRun,
    Sent,
    /// The send failed, the error was logged.
    Failed(String),
}

/// Publishes notifications to every configured destination, one after the
/// other, without letting a failing destination affect the rest.
pub struct Dispatcher {
    destinations: Vec<Box<dyn Destination>>,
    dry_run: bool,
}

impl Dispatcher {
    #[must_use]
    pub fn new(destinations: Vec<Box<dyn Destination>>, dry_run: bool) -> Self {
        Self {
            destinations,
            dry_run,
        }
    }

    /// Builds the Mastodon, Twitter and Discord destinations, in that order.
    #[must_use]
    pub fn from_config(config: &Config, http: &Client) -> Self {
        Self::new(
            vec![
                Box::new(Mastodon::new(&config.mastodon, http.clone())),
                Box::new(Twitter::new(&config.twitter, http.clone())),
                Box::new(Discord::new(&config.discord, http.clone())),
            ],
            config.dry_run,
        )
    }

    /// Name and enabled flag of each destination, in dispatch order.
    #[must_use]
    pub fn summary(&self) -> Vec<(&'static str, bool)> {
        self.destinations
            .iter()
            .map(|destination| (destination.name(), destination.enabled()))
            .collect()
    }

    /// Delivers `notification` to each destination and reports the outcome
    /// per destination name. Never fails.
    pub async fn dispatch(&self, notification: &Notification) -> Vec<(&'static str, Delivery)> {
        let mut outcomes = Vec::with_capacity(self.destinations.len());

        for destination in &self.destinations {
            let name = destination.name();

            let delivery = if !destination.enabled() {
                info!("No {name} credentials given, skipping {name} posting");
                Delivery::Skipped
            } else if self.dry_run {
                info!("Would have posted on {name}:\n{}", notification.text);
                Delivery::DryRun
            } else {
                match destination.send(notification).await {
                    Ok(()) => {
                        info!("Posted notification on {name}");
                        Delivery::Sent
                    }
                    Err(e) => {
                        error!("Could not send {name} notification: {e}");
                        Delivery::Failed(e.to_string())
                    }
                }
            };

            outcomes.push((name, delivery));
        }

        outcomes
    }
}
