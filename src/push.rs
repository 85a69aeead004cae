use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::common::errors::Error;
use crate::common::NotificationPayload;

const FCM_ENDPOINT_DEFAULT: &str = "https://fcm.googleapis.com/fcm/send";

/// Push delivery port. One capability: submit one payload to one device
/// token and report the per-token result.
#[async_trait]
pub trait PushGateway {
    async fn send_to_device(
        &self,
        token: &str,
        payload: &NotificationPayload,
    ) -> Result<DeliveryReport, Error>;
}

/// Gateway response for a single device send.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliveryReport {
    #[serde(rename = "failure")]
    pub failure_count: u32,
    #[serde(default)]
    pub results: Vec<DeliveryResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliveryResult {
    pub message_id: Option<String>,
    pub error: Option<String>,
}

impl DeliveryReport {
    /// First error string the gateway reported, if any.
    pub fn first_error(&self) -> Option<&str> {
        self.results.iter().find_map(|result| result.error.as_deref())
    }
}

#[derive(Clone)]
pub struct FcmGateway {
    client: Client,
    endpoint: String,
    server_key: String,
}

#[derive(Debug, Serialize)]
struct DeviceMessage<'a> {
    to: &'a str,
    #[serde(flatten)]
    payload: &'a NotificationPayload,
}

impl FcmGateway {
    pub fn new_from_env() -> Result<Self, Error> {
        let server_key = std::env::var("FCM_SERVER_KEY")
            .map_err(|_| Error::Config("FCM_SERVER_KEY missing in env".to_string()))?;
        let endpoint = std::env::var("FCM_ENDPOINT").unwrap_or(FCM_ENDPOINT_DEFAULT.into());

        Ok(Self {
            client: Client::new(),
            endpoint,
            server_key,
        })
    }
}

#[async_trait]
impl PushGateway for FcmGateway {
    async fn send_to_device(
        &self,
        token: &str,
        payload: &NotificationPayload,
    ) -> Result<DeliveryReport, Error> {
        let message = DeviceMessage { to: token, payload };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("key={}", self.server_key))
            .json(&message)
            .send()
            .await
            .map_err(|err| Error::Gateway(Box::new(err)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Gateway(
                format!("gateway returned {}: {}", status, body).into(),
            ));
        }

        let report = response
            .json::<DeliveryReport>()
            .await
            .map_err(|err| Error::Gateway(Box::new(err)))?;

        Ok(report)
    }
}
