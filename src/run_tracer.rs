//! Run tracing
//!
//! Each question's run is reported to a LangSmith-compatible runs API so
//! model behaviour can be inspected after the fact. Reporting is
//! best-effort: a failed upload is logged and the answer is unaffected.

use crate::config::TracingConfig;
use crate::error::{AssistantError, Result};
use crate::state::PipelineState;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// One finished pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub id: Uuid,
    pub name: String,
    pub run_type: String,
    pub session_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub inputs: serde_json::Value,
    pub outputs: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl RunRecord {
    pub fn new(
        project: &str,
        question: &str,
        started: DateTime<Utc>,
        outcome: std::result::Result<&PipelineState, &AssistantError>,
    ) -> Self {
        let (outputs, error) = match outcome {
            Ok(state) => (serde_json::to_value(state).ok(), None),
            Err(e) => (None, Some(e.to_string())),
        };

        Self {
            id: Uuid::new_v4(),
            name: "retailx_workflow".to_string(),
            run_type: "chain".to_string(),
            session_name: project.to_string(),
            start_time: started,
            end_time: Utc::now(),
            inputs: serde_json::json!({ "question": question }),
            outputs,
            error,
        }
    }
}

/// Destination for finished runs.
#[async_trait]
pub trait RunSink: Send + Sync {
    async fn record(&self, run: &RunRecord) -> Result<()>;
}

/// Posts runs to `{endpoint}/runs`.
pub struct LangSmithTracer {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl LangSmithTracer {
    pub fn new(config: &TracingConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()
            .map_err(|e| AssistantError::Tracing(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn runs_url(&self) -> String {
        format!("{}/runs", self.endpoint)
    }
}

#[async_trait]
impl RunSink for LangSmithTracer {
    async fn record(&self, run: &RunRecord) -> Result<()> {
        let response = self
            .http
            .post(self.runs_url())
            .header("x-api-key", &self.api_key)
            .json(run)
            .send()
            .await
            .map_err(|e| AssistantError::Tracing(format!("Run trace upload failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::Tracing(format!(
                "Run trace rejected ({}): {}",
                status, body
            )));
        }
        Ok(())
    }
}
