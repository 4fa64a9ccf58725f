use anyhow::Result;
use tracing::debug;

use crate::{config::Config, monitor::AlertSink};

use super::{
    models::{ChoreoInput, ChoreoOutput},
    TembooClient,
};

const SEND_SMS: &str = "/Library/Twilio/SMSMessages/SendSMS";

/// Sends alerts as SMS through the Twilio `SendSMS` choreo.
#[derive(Debug, Clone)]
pub struct TwilioSms {
    client: TembooClient,
    account_sid: String,
    auth_token: String,
    from: String,
    to: String,
}

impl TwilioSms {
    pub fn new(client: TembooClient, config: &Config) -> Self {
        Self {
            client,
            account_sid: config.twilio_account_sid.clone(),
            auth_token: config.twilio_auth_token.clone(),
            from: config.twilio_from.clone(),
            to: config.alert_to.clone(),
        }
    }

    fn inputs(&self, message: &str) -> Vec<ChoreoInput> {
        vec![
            ChoreoInput::new("AccountSID", &self.account_sid),
            ChoreoInput::new("AuthToken", &self.auth_token),
            ChoreoInput::new("From", &self.from),
            ChoreoInput::new("To", &self.to),
            ChoreoInput::new("Body", message),
        ]
    }
}

impl AlertSink for TwilioSms {
    async fn send_alert(&self, message: &str) -> Result<()> {
        let out = self.client.execute(SEND_SMS, &self.inputs(message)).await?;
        debug!(
            to = %self.to,
            execution_id = ?out.execution_id,
            http_code = http_code(&out),
            "SMS sent"
        );
        Ok(())
    }
}

/// Status code Twilio answered the choreo with, `"unknown"` when absent.
fn http_code(out: &ChoreoOutput) -> &str {
    out.get_str("HTTP_CODE").unwrap_or("unknown")
}
