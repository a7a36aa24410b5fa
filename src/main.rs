use log::{error, info, warn};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

use twitch_notifier::config::{Config, env_flag};
use twitch_notifier::dispatch::Dispatcher;
use twitch_notifier::twitch::{SyntheticLiveSource, TwitchClient};
use twitch_notifier::{http_client, worker};

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    info!("Starting notifier");

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let http = match http_client(config.timeout_secs) {
        Ok(http) => http,
        Err(e) => {
            error!("Failed to build HTTP client: {e}");
            return ExitCode::FAILURE;
        }
    };

    let token = CancellationToken::new();
    let shutdown = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.cancel();
        }
    });

    let dispatcher = Dispatcher::from_config(&config, &http);
    let twitch = TwitchClient::new(&config.twitch, http);

    let result = if env_flag("DEBUG").unwrap_or(false) {
        warn!("DEBUG is set, a synthetic live stream is added to every poll");
        worker::run(&config, SyntheticLiveSource::new(twitch), &dispatcher, token).await
    } else {
        worker::run(&config, twitch, &dispatcher, token).await
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Failed to check channel status: {e}");
            ExitCode::FAILURE
        }
    }
}
