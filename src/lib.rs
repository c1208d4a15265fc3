//! RetailX assistant: answers plain-text questions about the RetailX
//! dataset by asking a language model to judge, query and explain.

pub mod config;
pub mod dataset;
pub mod error;
pub mod execution;
pub mod llm;
pub mod prompts;
pub mod run_tracer;
pub mod state;
pub mod workflow;

pub use error::{AssistantError, Result};
pub use state::{PipelineState, Stage};
pub use workflow::{Workflow, FALLBACK_ANSWER};

use config::AppConfig;
use execution::SqliteStore;
use llm::LlmClient;
use run_tracer::LangSmithTracer;
use std::sync::Arc;

/// Wire the production model client, dataset store and run tracer.
pub fn build_workflow(config: &AppConfig) -> Result<Workflow> {
    let model = Arc::new(LlmClient::from_config(&config.llm));
    let store = Arc::new(SqliteStore::open(&config.db_path)?);
    let workflow = Workflow::new(model, store);

    if config.tracing.enabled {
        let tracer = Arc::new(LangSmithTracer::new(&config.tracing)?);
        Ok(workflow.with_tracer(tracer, config.tracing.project.clone()))
    } else {
        Ok(workflow)
    }
}
