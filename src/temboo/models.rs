use std::collections::HashMap;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Request
//
//   POST /temboo-api/1.0/choreos/Library/...
//   { "inputs": [ { "name": "TableName", "value": "readings" }, ... ] }
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChoreoInput {
    pub name: String,
    pub value: String,
}

impl ChoreoInput {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChoreoRequest<'a> {
    pub inputs: &'a [ChoreoInput],
}

// ---------------------------------------------------------------------------
// Response envelope
//
// Success:
//   { "execution": { "id": "...", "status": "SUCCESS" }, "output": { "Response": "..." } }
//
// Failure:
//   { "execution": { "id": "...", "status": "ERROR", "lasterror": "..." }, "output": {} }
//
// Some choreo failures come back with only a top-level `error` string.
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct Execution {
    pub id: Option<String>,
    pub status: String,
    #[serde(rename = "lasterror")]
    pub last_error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChoreoResponse {
    pub execution: Option<Execution>,
    #[serde(default)]
    pub output: HashMap<String, serde_json::Value>,
    pub error: Option<String>,
}

/// Named outputs of a successful choreo execution.
#[derive(Debug, Default)]
pub struct ChoreoOutput {
    pub execution_id: Option<String>,
    pub values: HashMap<String, serde_json::Value>,
}

impl ChoreoOutput {
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(|v| v.as_str())
    }
}

impl ChoreoResponse {
    /// Convert into `anyhow::Result`, mapping any non-`SUCCESS` execution to
    /// an error.
    pub fn into_result(self) -> anyhow::Result<ChoreoOutput> {
        if let Some(error) = self.error {
            return Err(anyhow!("Choreo error: {error}"));
        }
        let execution = self
            .execution
            .ok_or_else(|| anyhow!("Choreo response: execution field is missing"))?;
        if execution.status != "SUCCESS" {
            return Err(anyhow!(
                "Choreo execution {} finished with status={}, error={}",
                execution.id.as_deref().unwrap_or("(no id)"),
                execution.status,
                execution.last_error.as_deref().unwrap_or("(no message)")
            ));
        }
        Ok(ChoreoOutput {
            execution_id: execution.id,
            values: self.output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_inputs_in_order() {
        let inputs = [
            ChoreoInput::new("TableName", "readings"),
            ChoreoInput::new("AWSRegion", "us-east-1"),
        ];
        let json = serde_json::to_value(ChoreoRequest { inputs: &inputs }).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "inputs": [
                    { "name": "TableName", "value": "readings" },
                    { "name": "AWSRegion", "value": "us-east-1" },
                ]
            })
        );
    }

    #[test]
    fn success_response_yields_outputs() {
        let raw = r#"{
            "execution": { "id": "abc-123", "status": "SUCCESS" },
            "output": { "Response": "{\"sid\":\"SM1\"}", "HTTP_CODE": "201" }
        }"#;
        let out = serde_json::from_str::<ChoreoResponse>(raw)
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(out.execution_id.as_deref(), Some("abc-123"));
        assert_eq!(out.get_str("HTTP_CODE"), Some("201"));
        assert_eq!(out.get_str("Missing"), None);
    }

    #[test]
    fn error_status_is_an_error() {
        let raw = r#"{
            "execution": { "id": "abc-124", "status": "ERROR", "lasterror": "The table does not exist" },
            "output": {}
        }"#;
        let err = serde_json::from_str::<ChoreoResponse>(raw)
            .unwrap()
            .into_result()
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("status=ERROR"), "{msg}");
        assert!(msg.contains("The table does not exist"), "{msg}");
    }

    #[test]
    fn top_level_error_is_an_error() {
        let raw = r#"{ "error": "Authentication failed" }"#;
        let err = serde_json::from_str::<ChoreoResponse>(raw)
            .unwrap()
            .into_result()
            .unwrap_err();
        assert!(err.to_string().contains("Authentication failed"));
    }

    #[test]
    fn missing_execution_is_an_error() {
        let err = serde_json::from_str::<ChoreoResponse>("{}")
            .unwrap()
            .into_result()
            .unwrap_err();
        assert!(err.to_string().contains("execution field is missing"));
    }
}
