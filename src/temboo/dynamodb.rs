use anyhow::{Context, Result};
use serde_json::json;
use tracing::debug;

use crate::{config::Config, monitor::logger::LogRecord, monitor::RecordStore};

use super::{models::ChoreoInput, TembooClient};

const PUT_ITEM: &str = "/Library/Amazon/DynamoDB/PutItem";

/// Writes periodic records to a DynamoDB table through the `PutItem` choreo.
#[derive(Debug, Clone)]
pub struct DynamoDbStore {
    client: TembooClient,
    access_key_id: String,
    secret_access_key: String,
    region: String,
    table: String,
}

impl DynamoDbStore {
    pub fn new(client: TembooClient, config: &Config) -> Self {
        Self {
            client,
            access_key_id: config.aws_access_key_id.clone(),
            secret_access_key: config.aws_secret_access_key.clone(),
            region: config.aws_region.clone(),
            table: config.dynamodb_table.clone(),
        }
    }

    fn inputs(&self, record: &LogRecord) -> Result<Vec<ChoreoInput>> {
        let item = serde_json::to_string(&item_json(record))
            .context("Failed to serialize DynamoDB item")?;
        Ok(vec![
            ChoreoInput::new("AWSAccessKeyId", &self.access_key_id),
            ChoreoInput::new("AWSSecretKeyId", &self.secret_access_key),
            ChoreoInput::new("AWSRegion", &self.region),
            ChoreoInput::new("TableName", &self.table),
            ChoreoInput::new("Item", item),
        ])
    }
}

impl RecordStore for DynamoDbStore {
    async fn put_item(&self, record: &LogRecord) -> Result<()> {
        let inputs = self.inputs(record)?;
        let out = self.client.execute(PUT_ITEM, &inputs).await?;
        debug!(
            table = %self.table,
            execution_id = ?out.execution_id,
            "DynamoDB item written"
        );
        Ok(())
    }
}

/// DynamoDB attribute-value encoding of a record. Numbers travel as strings.
pub(crate) fn item_json(record: &LogRecord) -> serde_json::Value {
    json!({
        "Timestamp": { "S": record.timestamp },
        "Temperature": { "N": format!("{:.2}", record.temperature_c) },
        "DoorClosed": { "BOOL": record.door_closed },
    })
}
