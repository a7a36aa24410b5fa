use base64::{Engine, engine::general_purpose::STANDARD};
use log::info;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use url::Url;

use crate::error::Error;
use crate::template::Template;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub update_interval_seconds: u64,
    #[serde(default)]
    pub dry_run: bool,
    pub timeout_secs: Option<u64>,
    pub notification_template: Template,
    pub game_switch_template: Option<Template>,
    pub twitch: TwitchConfig,
    #[serde(default)]
    pub mastodon: MastodonConfig,
    #[serde(default)]
    pub twitter: TwitterConfig,
    #[serde(default)]
    pub discord: DiscordConfig,
}

#[derive(Debug, Deserialize)]
pub struct TwitchConfig {
    pub app_id: String,
    pub app_secret: String,
    pub watched_channel: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct MastodonConfig {
    pub instance: Option<String>,
    /// Client id of the registered application. Switches Mastodon on.
    pub client_token: Option<String>,
    /// Required alongside `client_token` so the application registration is
    /// complete, posting itself only authenticates with `access_token`.
    pub client_secret: Option<String>,
    pub access_token: Option<String>,
    pub visibility: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TwitterConfig {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub access_token: Option<String>,
    pub access_token_secret: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DiscordConfig {
    pub webhook: Option<String>,
}

/// Where the configuration document was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Base64-encoded document taken from the `CONFIG` environment variable.
    Environment(String),
    File(PathBuf),
}

const CONFIG_ENV: &str = "CONFIG";
const CONFIG_PATH_ENV: &str = "CONFIG_PATH";
const DRY_RUN_ENV: &str = "DRY_RUN";
const LOCAL_CONFIG_FILE: &str = "config.toml";

impl Config {
    /// Loads the configuration from the first available source and applies
    /// the `DRY_RUN` override.
    ///
    /// # Errors
    ///
    /// Returns an error if no source is available, the source cannot be read
    /// or decoded, or the document fails validation.
    pub fn load() -> Result<Config, Error> {
        let source = ConfigSource::resolve(
            dotenvy::var(CONFIG_ENV).ok(),
            dotenvy::var(CONFIG_PATH_ENV).ok(),
        )?;

        let mut config = match source {
            ConfigSource::Environment(encoded) => {
                info!("Using environment config");
                Config::from_base64(&encoded)?
            }
            ConfigSource::File(path) => {
                info!("Using config file {}", path.display());
                Config::from_path(path)?
            }
        };

        if let Some(dry_run) = env_flag(DRY_RUN_ENV) {
            config.dry_run = dry_run;
        }

        Ok(config)
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid
    /// configuration.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Config, Error> {
        let content = fs::read_to_string(path)?;
        Config::from_toml(&content)
    }

    /// # Errors
    ///
    /// Returns an error if `encoded` is not base64 of a UTF-8 TOML document
    /// holding a valid configuration.
    pub fn from_base64(encoded: &str) -> Result<Config, Error> {
        let decoded = STANDARD.decode(encoded.trim())?;
        Config::from_toml(&String::from_utf8(decoded)?)
    }

    /// # Errors
    ///
    /// Returns an error on TOML syntax errors, missing keys, bad templates,
    /// bad URLs or missing credentials of an enabled destination.
    pub fn from_toml(content: &str) -> Result<Config, Error> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Whether game-category changes produce their own notification.
    #[must_use]
    pub fn tracks_games(&self) -> bool {
        self.game_switch_template.is_some()
    }

    fn validate(&self) -> Result<(), Error> {
        if self.update_interval_seconds == 0 {
            return Err(Error::Config(
                "update_interval_seconds must be greater than zero".to_string(),
            ));
        }

        require("twitch.app_id", Some(&self.twitch.app_id))?;
        require("twitch.app_secret", Some(&self.twitch.app_secret))?;
        require("twitch.watched_channel", Some(&self.twitch.watched_channel))?;

        if self.mastodon.enabled() {
            let instance = require("mastodon.instance", self.mastodon.instance.as_ref())?;
            Url::parse(instance)?;
            require("mastodon.client_secret", self.mastodon.client_secret.as_ref())?;
            require("mastodon.access_token", self.mastodon.access_token.as_ref())?;
        }

        if self.twitter.enabled() {
            require("twitter.api_secret", self.twitter.api_secret.as_ref())?;
            require("twitter.access_token", self.twitter.access_token.as_ref())?;
            require(
                "twitter.access_token_secret",
                self.twitter.access_token_secret.as_ref(),
            )?;
        }

        if let Some(webhook) = present(self.discord.webhook.as_ref()) {
            Url::parse(webhook)?;
        }

        Ok(())
    }
}

impl MastodonConfig {
    #[must_use]
    pub fn enabled(&self) -> bool {
        present(self.client_token.as_ref()).is_some()
    }
}

impl TwitterConfig {
    #[must_use]
    pub fn enabled(&self) -> bool {
        present(self.api_key.as_ref()).is_some()
    }
}

impl DiscordConfig {
    #[must_use]
    pub fn enabled(&self) -> bool {
        present(self.webhook.as_ref()).is_some()
    }
}

impl ConfigSource {
    /// Picks the configuration source: the `CONFIG` variable, then an
    /// explicit path, then `./config.toml`, then the user config directory.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing is set and no user config directory exists.
    pub fn resolve(
        config_env: Option<String>,
        config_path_env: Option<String>,
    ) -> Result<ConfigSource, Error> {
        if let Some(encoded) = config_env.filter(|value| !value.trim().is_empty()) {
            return Ok(ConfigSource::Environment(encoded));
        }

        if let Some(path) = config_path_env.filter(|value| !value.trim().is_empty()) {
            return Ok(ConfigSource::File(PathBuf::from(path)));
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.is_file() {
            return Ok(ConfigSource::File(local));
        }

        dirs::config_dir()
            .map(|dir| ConfigSource::File(dir.join("twitch-notifier").join(LOCAL_CONFIG_FILE)))
            .ok_or_else(|| Error::Config("no configuration source available".to_string()))
    }
}

/// Reads a boolean switch from the environment (or `.env`).
///
/// Returns `None` when the variable is unset.
#[must_use]
pub fn env_flag(name: &str) -> Option<bool> {
    dotenvy::var(name).ok().map(|value| parse_flag(&value))
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn present(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn require<'a>(key: &str, value: Option<&'a String>) -> Result<&'a str, Error> {
    present(value).ok_or_else(|| Error::Config(format!("{key} must be set")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FULL_CONFIG: &str = r#"
        update_interval_seconds = 60
        dry_run = true
        timeout_secs = 10
        notification_template = "Live now: {title} ({game})"
        game_switch_template = "Now playing {game}"

        [twitch]
        app_id = "app"
        app_secret = "secret"
        watched_channel = "mr_poeschl"

        [mastodon]
        instance = "https://mastodon.social"
        client_token = "client"
        client_secret = "client-secret"
        access_token = "access"

        [twitter]
        api_key = "key"
        api_secret = "key-secret"
        access_token = "token"
        access_token_secret = "token-secret"

        [discord]
        webhook = "https://discord.com/api/webhooks/1234567890/abcdefg"
    "#;

    const MINIMAL_CONFIG: &str = r#"
        update_interval_seconds = 30
        notification_template = "{title}"

        [twitch]
        app_id = "app"
        app_secret = "secret"
        watched_channel = "someone"
    "#;

    #[test]
    fn test_load_config_from_toml_file() {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        write!(temp_file, "{FULL_CONFIG}").expect("Failed to write to temp file");

        let config = Config::from_path(temp_file.path()).expect("Failed to parse config");

        assert_eq!(config.update_interval_seconds, 60);
        assert!(config.dry_run);
        assert_eq!(config.timeout_secs, Some(10));
        assert_eq!(config.twitch.watched_channel, "mr_poeschl");
        assert!(config.mastodon.enabled());
        assert!(config.twitter.enabled());
        assert!(config.discord.enabled());
        assert!(config.tracks_games());
        assert_eq!(
            config.notification_template.render("Playing X", "GameA"),
            "Live now: Playing X (GameA)"
        );
    }

    #[test]
    fn test_minimal_config_disables_all_destinations() {
        let config = Config::from_toml(MINIMAL_CONFIG).unwrap();

        assert!(!config.dry_run);
        assert_eq!(config.timeout_secs, None);
        assert!(!config.mastodon.enabled());
        assert!(!config.twitter.enabled());
        assert!(!config.discord.enabled());
        assert!(!config.tracks_games());
    }

    #[test]
    fn test_load_config_from_base64() {
        let encoded = STANDARD.encode(MINIMAL_CONFIG);
        let config = Config::from_base64(&encoded).unwrap();
        assert_eq!(config.update_interval_seconds, 30);
        assert_eq!(config.twitch.watched_channel, "someone");
    }

    #[test]
    fn test_invalid_base64_is_rejected() {
        let err = Config::from_base64("not base64 at all!").unwrap_err();
        assert!(matches!(err, Error::Base64(_)));
    }

    #[test]
    fn test_empty_credential_disables_destination() {
        let content = format!("{MINIMAL_CONFIG}\n[discord]\nwebhook = \"\"\n");
        let config = Config::from_toml(&content).unwrap();
        assert!(!config.discord.enabled());
    }

    #[test]
    fn test_enabled_destination_requires_remaining_credentials() {
        let content = format!("{MINIMAL_CONFIG}\n[twitter]\napi_key = \"key\"\n");
        let err = Config::from_toml(&content).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("twitter.api_secret")));
    }

    #[test]
    fn test_enabled_mastodon_requires_client_secret() {
        let content = format!(
            "{MINIMAL_CONFIG}\n[mastodon]\ninstance = \"https://mastodon.social\"\nclient_token = \"c\"\naccess_token = \"a\"\n"
        );
        let err = Config::from_toml(&content).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("mastodon.client_secret")));
    }

    #[test]
    fn test_mastodon_instance_must_be_a_url() {
        let content = format!(
            "{MINIMAL_CONFIG}\n[mastodon]\ninstance = \"not a url\"\nclient_token = \"c\"\naccess_token = \"a\"\n"
        );
        let err = Config::from_toml(&content).unwrap_err();
        assert!(matches!(err, Error::UrlParse(_)));
    }

    #[test]
    fn test_bad_template_is_rejected_at_load() {
        let content = MINIMAL_CONFIG.replace("\"{title}\"", "\"{stream}\"");
        assert!(Config::from_toml(&content).is_err());
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let content = MINIMAL_CONFIG.replace("= 30", "= 0");
        let err = Config::from_toml(&content).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_source_prefers_environment() {
        let source =
            ConfigSource::resolve(Some("abc".to_string()), Some("/tmp/x.toml".to_string()))
                .unwrap();
        assert_eq!(source, ConfigSource::Environment("abc".to_string()));

        let source = ConfigSource::resolve(None, Some("/tmp/x.toml".to_string())).unwrap();
        assert_eq!(source, ConfigSource::File(PathBuf::from("/tmp/x.toml")));
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag("TRUE"));
        assert!(parse_flag(" yes "));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }
}
