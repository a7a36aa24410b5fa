use log::{info, warn};
use std::time::Duration;
use tokio::{select, time::sleep};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::destination::Notification;
use crate::dispatch::Dispatcher;
use crate::error::Error;
use crate::state::{ChannelState, StreamEvent};
use crate::twitch::{StreamSnapshot, StreamSource};

/// Watches the configured channel until cancelled, announcing stream starts
/// (and game switches when a `game_switch_template` is configured).
///
/// # Errors
///
/// Any error while fetching the channel status ends the loop and is returned
/// to the caller. Failed notifications are only logged.
pub async fn run<S: StreamSource>(
    config: &Config,
    mut source: S,
    dispatcher: &Dispatcher,
    token: CancellationToken,
) -> Result<(), Error> {
    // Initial configuration logging
    info!("Watching channel {}", source.channel());
    info!("Update interval: {} seconds", config.update_interval_seconds);
    if config.dry_run {
        warn!("Dry run is enabled, notifications will only be logged");
    }
    if config.tracks_games() {
        info!("Game switch template is set, game changes will be announced");
    }
    for (name, enabled) in dispatcher.summary() {
        if enabled {
            info!("{name} notifications enabled");
        } else {
            info!("{name} notifications disabled");
        }
    }

    let interval = Duration::from_secs(config.update_interval_seconds);
    let mut state = ChannelState::default();

    // Main polling loop
    loop {
        if token.is_cancelled() {
            info!("Shutdown requested, stopping notifier");
            break;
        }

        info!("Checking channel {} to be online", source.channel());
        let (next, _) = poll_once(&mut source, &state, config, dispatcher).await?;
        state = next;

        // Interruptible sleep
        select! {
            () = sleep(interval) => {},
            () = token.cancelled() => {
                info!("Shutdown requested during sleep");
                break;
            }
        }
    }

    info!("Notifier stopped gracefully");
    Ok(())
}

/// Runs one poll cycle: fetch, compare against `state`, notify on a
/// qualifying transition. Returns the state to carry into the next cycle.
pub async fn poll_once<S: StreamSource + ?Sized>(
    source: &mut S,
    state: &ChannelState,
    config: &Config,
    dispatcher: &Dispatcher,
) -> Result<(ChannelState, Option<StreamEvent>), Error> {
    let streams = source.current_streams().await?;
    // Only the first reported stream counts.
    let stream = streams.first();

    let (next, event) = state.observe(stream, config.tracks_games());

    if let (Some(event), Some(stream)) = (event, stream) {
        match event {
            StreamEvent::Started => info!("Currently streaming, sending notifications"),
            StreamEvent::GameSwitched => info!("Game changed, sending update posts"),
        }
        dispatcher
            .dispatch(&notification_for(event, stream, config))
            .await;
    }

    Ok((next, event))
}

fn notification_for(event: StreamEvent, stream: &StreamSnapshot, config: &Config) -> Notification {
    match event {
        StreamEvent::Started => Notification {
            text: config
                .notification_template
                .render(&stream.title, &stream.game_name),
            idempotency_key: Some(stream.started_at.clone()),
        },
        StreamEvent::GameSwitched => {
            let template = config
                .game_switch_template
                .as_ref()
                .unwrap_or(&config.notification_template);
            // Switching back to an earlier game is a new post, so no key.
            Notification {
                text: template.render(&stream.title, &stream.game_name),
                idempotency_key: None,
            }
        }
    }
}
