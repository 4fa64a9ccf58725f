pub mod dynamodb;
pub mod models;
pub mod twilio;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::debug;

use crate::{config::Config, response_store};

use self::models::{ChoreoInput, ChoreoOutput, ChoreoRequest, ChoreoResponse};

pub use self::{dynamodb::DynamoDbStore, twilio::TwilioSms};

/// Client for the hosted choreo service. Cheap to clone.
#[derive(Debug, Clone)]
pub struct TembooClient {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    http: Client,
    base_url: String,
    domain: String,
    app_key_name: String,
    app_key_value: String,
    response_dir: Option<PathBuf>,
}

impl TembooClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.choreo_timeout)
            .build()
            .context("Failed to build choreo HTTP client")?;
        Ok(Self::with_http(
            http,
            base_url(&config.temboo_account),
            &config.temboo_account,
            &config.temboo_app_key_name,
            &config.temboo_app_key_value,
            config.choreo_response_dir.clone(),
        ))
    }

    pub(crate) fn with_http(
        http: Client,
        base_url: String,
        account: &str,
        app_key_name: &str,
        app_key_value: &str,
        response_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                http,
                base_url,
                domain: format!("/{account}/master"),
                app_key_name: app_key_name.to_owned(),
                app_key_value: app_key_value.to_owned(),
                response_dir,
            }),
        }
    }

    /// Run `choreo` (e.g. `/Library/Twilio/SMSMessages/SendSMS`) with the
    /// given inputs and return its named outputs.
    pub async fn execute(&self, choreo: &str, inputs: &[ChoreoInput]) -> Result<ChoreoOutput> {
        let url = format!("{}{}", self.inner.base_url, choreo);
        debug!(url = %url, inputs = inputs.len(), "Executing choreo");

        let bytes = self
            .inner
            .http
            .post(&url)
            .basic_auth(&self.inner.app_key_name, Some(&self.inner.app_key_value))
            .header("x-temboo-domain", &self.inner.domain)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&ChoreoRequest { inputs })
            .send()
            .await
            .with_context(|| format!("Choreo request to {choreo} failed"))?
            .error_for_status()
            .with_context(|| format!("Choreo endpoint {choreo} returned error status"))?
            .bytes()
            .await
            .with_context(|| format!("Failed to read {choreo} response body"))?;

        if let Some(dir) = &self.inner.response_dir {
            response_store::save(dir, choreo_name(choreo), &bytes).await;
        }

        serde_json::from_slice::<ChoreoResponse>(&bytes)
            .with_context(|| format!("Failed to deserialize {choreo} response"))?
            .into_result()
            .with_context(|| format!("Choreo {choreo} failed"))
    }
}

fn base_url(account: &str) -> String {
    format!("https://{account}.temboolive.com/temboo-api/1.0/choreos")
}

/// Last path segment of a choreo path, used to group saved responses.
fn choreo_name(choreo: &str) -> &str {
    choreo
        .rsplit('/')
        .find(|s| !s.is_empty())
        .unwrap_or("choreo")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_embeds_account() {
        assert_eq!(
            base_url("coldroom"),
            "https://coldroom.temboolive.com/temboo-api/1.0/choreos"
        );
    }

    #[test]
    fn choreo_name_is_last_segment() {
        assert_eq!(choreo_name("/Library/Twilio/SMSMessages/SendSMS"), "SendSMS");
        assert_eq!(choreo_name("/Library/Amazon/DynamoDB/PutItem/"), "PutItem");
        assert_eq!(choreo_name(""), "choreo");
    }

    #[test]
    fn domain_header_uses_master_profile() {
        let client = TembooClient::with_http(
            Client::new(),
            base_url("coldroom"),
            "coldroom",
            "app",
            "secret",
            None,
        );
        assert_eq!(client.inner.domain, "/coldroom/master");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_error() {
        let client = TembooClient::with_http(
            Client::new(),
            "http://127.0.0.1:9".to_owned(),
            "coldroom",
            "app",
            "secret",
            None,
        );
        let err = client
            .execute("/Library/Twilio/SMSMessages/SendSMS", &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("SendSMS"), "{err}");
    }
}
