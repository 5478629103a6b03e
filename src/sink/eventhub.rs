//! Azure Event Hubs sink over the REST send API.
//!
//! Each publish is a `POST {base}/{hub}/messages` authorized with a Shared
//! Access Signature derived from the configured policy name and key.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use tokio::sync::OnceCell;
use tracing::info;

use super::EventSink;
use crate::config::SinkConfig;
use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

const SERVICE_BUS_SUFFIX: &str = "servicebus.windows.net";
const CONTENT_TYPE: &str = "application/atom+xml;type=entry;charset=utf-8";
const TOKEN_TTL_SECS: i64 = 3600;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

static SHARED: OnceCell<Arc<EventHubSink>> = OnceCell::const_new();

/// Event Hubs client. Cheap to share; reqwest pools connections internally.
pub struct EventHubSink {
    client: reqwest::Client,
    /// `{base}/{hub}`, also the signed resource URI.
    resource_uri: String,
    key_name: String,
    key: SecretString,
}

impl EventHubSink {
    /// Build a sink for `https://{namespace}.servicebus.windows.net/{hub}`.
    pub fn new(config: &SinkConfig) -> Result<Self> {
        let base_url = format!("https://{}", namespace_host(&config.namespace));
        Self::with_base_url(config, &base_url)
    }

    /// Build a sink against an explicit base URL (scheme and host).
    pub fn with_base_url(config: &SinkConfig, base_url: &str) -> Result<Self> {
        validate(config)?;

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            resource_uri: format!("{}/{}", base_url.trim_end_matches('/'), config.event_hub),
            key_name: config.key_name.clone(),
            key: SecretString::from(config.key.expose_secret().to_string()),
        })
    }

    /// The process-wide sink, created on first call.
    ///
    /// Concurrent first callers wait on a single initialization; later calls
    /// return the same handle. A failed initialization is not cached.
    pub async fn shared(config: &SinkConfig) -> Result<Arc<Self>> {
        SHARED
            .get_or_try_init(|| async {
                let sink = Self::new(config)?;
                info!(resource = %sink.resource_uri, "event hub sink initialized");
                Ok::<_, Error>(Arc::new(sink))
            })
            .await
            .map(Arc::clone)
    }

    pub fn resource_uri(&self) -> &str {
        &self.resource_uri
    }

    fn messages_url(&self) -> String {
        format!("{}/messages?timeout=60&api-version=2014-01", self.resource_uri)
    }

    fn authorization(&self) -> Result<String> {
        let expiry = chrono::Utc::now().timestamp() + TOKEN_TTL_SECS;
        sas_token(&self.resource_uri, &self.key_name, &self.key, expiry)
    }
}

#[async_trait]
impl EventSink for EventHubSink {
    fn name(&self) -> &str {
        "eventhub"
    }

    async fn publish(&self, payload: Vec<u8>) -> Result<()> {
        let response = self
            .client
            .post(self.messages_url())
            .header(reqwest::header::AUTHORIZATION, self.authorization()?)
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(Error::Sink(format!("event hub returned {status}: {body}")))
        }
    }
}

/// Expand a bare namespace name to its Service Bus host.
fn namespace_host(namespace: &str) -> String {
    if namespace.contains('.') {
        namespace.to_string()
    } else {
        format!("{namespace}.{SERVICE_BUS_SUFFIX}")
    }
}

fn validate(config: &SinkConfig) -> Result<()> {
    let blank = [
        ("namespace", config.namespace.as_str()),
        ("event hub name", config.event_hub.as_str()),
        ("key name", config.key_name.as_str()),
        ("key", config.key.expose_secret()),
    ]
    .into_iter()
    .find(|(_, value)| value.trim().is_empty());

    match blank {
        Some((what, _)) => Err(Error::Config(format!("event hub {what} must not be blank"))),
        None => Ok(()),
    }
}

/// Build a Shared Access Signature for `resource_uri`, valid until `expiry`
/// (unix seconds).
fn sas_token(resource_uri: &str, key_name: &str, key: &SecretString, expiry: i64) -> Result<String> {
    let encoded_uri = urlencoding::encode(resource_uri);
    let string_to_sign = format!("{encoded_uri}\n{expiry}");

    let mut mac = HmacSha256::new_from_slice(key.expose_secret().as_bytes())
        .map_err(|e| Error::Sink(format!("invalid signing key: {e}")))?;
    mac.update(string_to_sign.as_bytes());
    let signature = BASE64.encode(mac.finalize().into_bytes());

    Ok(format!(
        "SharedAccessSignature sr={encoded_uri}&sig={}&se={expiry}&skn={key_name}",
        urlencoding::encode(&signature)
    ))
}
