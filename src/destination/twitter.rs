use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Serialize;
use sha1::Sha1;

use super::{Destination, Notification, check_status};
use crate::config::TwitterConfig;
use crate::error::Error;

type HmacSha1 = Hmac<Sha1>;

const DEFAULT_API_BASE: &str = "https://api.twitter.com";

#[derive(Serialize)]
struct Tweet<'a> {
    text: &'a str,
}

#[derive(Debug, Clone, Default)]
struct Credentials {
    api_key: String,
    api_secret: String,
    access_token: String,
    access_token_secret: String,
}

/// Posts tweets through the v2 API with OAuth 1.0a user context.
pub struct Twitter {
    http: Client,
    enabled: bool,
    tweets_url: String,
    credentials: Credentials,
}

impl Twitter {
    #[must_use]
    pub fn new(config: &TwitterConfig, http: Client) -> Self {
        let field = |value: &Option<String>| value.clone().unwrap_or_default();
        Self {
            http,
            enabled: config.enabled(),
            tweets_url: format!("{DEFAULT_API_BASE}/2/tweets"),
            credentials: Credentials {
                api_key: field(&config.api_key),
                api_secret: field(&config.api_secret),
                access_token: field(&config.access_token),
                access_token_secret: field(&config.access_token_secret),
            },
        }
    }

    #[must_use]
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.tweets_url = format!("{}/2/tweets", api_base.trim_end_matches('/'));
        self
    }

    fn authorization_header(&self, nonce: &str, timestamp: &str) -> String {
        let credentials = &self.credentials;
        let oauth_params = [
            ("oauth_consumer_key", credentials.api_key.as_str()),
            ("oauth_nonce", nonce),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", timestamp),
            ("oauth_token", credentials.access_token.as_str()),
            ("oauth_version", "1.0"),
        ];

        // JSON bodies are not part of the signature, only the oauth_* params.
        let signature = sign(
            "POST",
            &self.tweets_url,
            &oauth_params,
            &credentials.api_secret,
            &credentials.access_token_secret,
        );

        let fields = oauth_params
            .iter()
            .copied()
            .chain(std::iter::once(("oauth_signature", signature.as_str())))
            .map(|(key, value)| format!("{}=\"{}\"", encode(key), encode(value)))
            .collect::<Vec<_>>()
            .join(", ");

        format!("OAuth {fields}")
    }
}

#[async_trait]
impl Destination for Twitter {
    fn name(&self) -> &'static str {
        "Twitter"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    async fn send(&self, notification: &Notification) -> Result<(), Error> {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let timestamp = chrono::Utc::now().timestamp().to_string();

        let response = self
            .http
            .post(&self.tweets_url)
            .header(
                reqwest::header::AUTHORIZATION,
                self.authorization_header(&nonce, &timestamp),
            )
            .json(&Tweet {
                text: &notification.text,
            })
            .send()
            .await?;

        check_status("twitter tweets", response).await?;
        Ok(())
    }
}

fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Computes the OAuth 1.0a HMAC-SHA1 signature of a request.
fn sign(
    method: &str,
    url: &str,
    params: &[(&str, &str)],
    consumer_secret: &str,
    token_secret: &str,
) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(key, value)| (encode(key), encode(value)))
        .collect();
    encoded.sort();

    let parameter_string = encoded
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let base_string = format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(url),
        encode(&parameter_string)
    );
    let signing_key = format!("{}&{}", encode(consumer_secret), encode(token_secret));

    let mut mac =
        HmacSha1::new_from_slice(signing_key.as_bytes()).expect("HMAC accepts keys of any size");
    mac.update(base_string.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header_regex, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config() -> TwitterConfig {
        TwitterConfig {
            api_key: Some("key".to_string()),
            api_secret: Some("key-secret".to_string()),
            access_token: Some("token".to_string()),
            access_token_secret: Some("token-secret".to_string()),
        }
    }

    // Worked example from Twitter's "Creating a signature" guide.
    #[test]
    fn test_signature_matches_reference_example() {
        let params = [
            ("status", "Hello Ladies + Gentlemen, a signed OAuth request!"),
            ("include_entities", "true"),
            ("oauth_consumer_key", "xvz1evFS4wEEPTGEFPHBog"),
            ("oauth_nonce", "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg"),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", "1318622958"),
            ("oauth_token", "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb"),
            ("oauth_version", "1.0"),
        ];

        let signature = sign(
            "POST",
            "https://api.twitter.com/1.1/statuses/update.json",
            &params,
            "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw",
            "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE",
        );

        assert_eq!(signature, "hCtSmYh+iHYCEqBWrE7C7hYmtUk=");
    }

    #[test]
    fn test_authorization_header_lists_oauth_fields() {
        let twitter = Twitter::new(&config(), Client::new());
        let header = twitter.authorization_header("abc", "1700000000");

        assert!(header.starts_with("OAuth "));
        assert!(header.contains("oauth_consumer_key=\"key\""));
        assert!(header.contains("oauth_token=\"token\""));
        assert!(header.contains("oauth_nonce=\"abc\""));
        assert!(header.contains("oauth_timestamp=\"1700000000\""));
        assert!(header.contains("oauth_signature=\""));
        assert!(!header.contains("key-secret"));
    }

    #[tokio::test]
    async fn test_posts_tweet_with_signed_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .and(header_regex("Authorization", "^OAuth .*oauth_signature="))
            .and(body_json(json!({ "text": "Now playing GameB" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "data": { "id": "1", "text": "Now playing GameB" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let twitter = Twitter::new(&config(), Client::new()).with_api_base(&server.uri());
        twitter
            .send(&Notification {
                text: "Now playing GameB".to_string(),
                idempotency_key: None,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_forbidden_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("duplicate content"))
            .mount(&server)
            .await;

        let twitter = Twitter::new(&config(), Client::new()).with_api_base(&server.uri());
        let err = twitter
            .send(&Notification {
                text: "again".to_string(),
                idempotency_key: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnexpectedStatus { .. }));
    }

    #[test]
    fn test_disabled_without_api_key() {
        let mut config = config();
        config.api_key = Some(String::new());
        assert!(!Twitter::new(&config, Client::new()).enabled());
    }
}
