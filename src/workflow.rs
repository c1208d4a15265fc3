//! Question-answering workflow
//!
//! Four stages run in order over one [`PipelineState`]:
//! 1. check whether the question is answerable from the data description,
//! 2. write a query,
//! 3. execute it against the dataset store,
//! 4. compose an answer from the query and its result.
//!
//! A negative judgment in stage 1 ends the run without an answer. Query
//! execution failures do not end the run: the failure text is handed to
//! stage 4 in place of the result so the model can explain it.

use crate::dataset::DB_DESCRIPTION;
use crate::error::{AssistantError, Result};
use crate::execution::{FailureKind, QueryStore};
use crate::llm::{extract_json_object, strip_code_fence, LanguageModel};
use crate::prompts;
use crate::run_tracer::{RunRecord, RunSink};
use crate::state::{PipelineState, Stage};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub const FALLBACK_ANSWER: &str =
    "Sorry, I couldn't answer that question based on the available data.";

/// Structured answerability judgment returned by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judgment {
    pub reasoning: String,
    pub can_answer: bool,
}

/// Parse the answerability response. Anything other than a JSON object
/// with a string `reasoning` and a boolean `can_answer` is an error.
pub fn parse_judgment(response: &str) -> Result<Judgment> {
    let json = extract_json_object(response).ok_or_else(|| {
        AssistantError::MalformedResponse(format!(
            "no JSON object in answerability response: {}",
            response.trim()
        ))
    })?;

    serde_json::from_str(json).map_err(|e| {
        AssistantError::MalformedResponse(format!(
            "invalid answerability judgment: {}. Response: {}",
            e,
            response.trim()
        ))
    })
}

/// Hands finished runs to a sink in the background.
struct RunUploader {
    sink: Arc<dyn RunSink>,
    project: String,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl RunUploader {
    fn submit(&self, run: RunRecord) {
        let sink = Arc::clone(&self.sink);
        let handle = tokio::spawn(async move {
            if let Err(e) = sink.record(&run).await {
                warn!("Failed to record run {}: {}", run.id, e);
            }
        });

        if let Ok(mut pending) = self.pending.lock() {
            pending.retain(|h| !h.is_finished());
            pending.push(handle);
        }
    }

    fn take_pending(&self) -> Vec<JoinHandle<()>> {
        self.pending
            .lock()
            .map(|mut pending| std::mem::take(&mut *pending))
            .unwrap_or_default()
    }
}

pub struct Workflow {
    model: Arc<dyn LanguageModel>,
    store: Arc<dyn QueryStore>,
    db_description: String,
    tracer: Option<RunUploader>,
}

impl Workflow {
    pub fn new(model: Arc<dyn LanguageModel>, store: Arc<dyn QueryStore>) -> Self {
        Self {
            model,
            store,
            db_description: DB_DESCRIPTION.to_string(),
            tracer: None,
        }
    }

    /// Replace the schema text shown to the model.
    pub fn with_description(mut self, db_description: impl Into<String>) -> Self {
        self.db_description = db_description.into();
        self
    }

    /// Report every run to `sink` under `project`.
    pub fn with_tracer(mut self, sink: Arc<dyn RunSink>, project: impl Into<String>) -> Self {
        self.tracer = Some(RunUploader {
            sink,
            project: project.into(),
            pending: Mutex::new(Vec::new()),
        });
        self
    }

    /// Stage 1: answerability judgment
    pub async fn check_if_can_answer(&self, state: &mut PipelineState) -> Result<()> {
        let prompt = prompts::can_answer_prompt(&self.db_description, state.question());
        let response = self.model.complete(&prompt).await?;
        let judgment = parse_judgment(&response)?;

        info!(
            "Answerability: can_answer={} ({})",
            judgment.can_answer, judgment.reasoning
        );
        state.record_judgment(judgment.reasoning, judgment.can_answer)
    }

    /// Stage 2: query generation
    pub async fn write_query(&self, state: &mut PipelineState) -> Result<()> {
        let prompt = prompts::write_query_prompt(&self.db_description, state.question());
        let response = self.model.complete(&prompt).await?;
        let query = strip_code_fence(&response).to_string();

        info!("Generated query: {}", query);
        state.record_query(query)
    }

    /// Stage 3: execution. Failures become the result text.
    pub fn execute_query(&self, state: &mut PipelineState) -> Result<()> {
        let result = match self.store.run_query(state.require_query()?) {
            Ok(table) => {
                info!("Query returned {} rows", table.row_count());
                table.to_markdown()
            }
            Err(failure) => {
                match failure.kind {
                    FailureKind::Rejected => warn!("Query rejected by dataset store: {}", failure),
                    FailureKind::Unavailable => error!("Dataset store unavailable: {}", failure),
                }
                failure.to_string()
            }
        };
        state.record_result(result)
    }

    /// Stage 4: answer composition. The model's text is kept verbatim.
    pub async fn write_answer(&self, state: &mut PipelineState) -> Result<()> {
        let prompt = prompts::write_answer_prompt(
            state.question(),
            state.require_query()?,
            state.require_query_result()?,
        );
        let answer = self.model.complete(&prompt).await?;

        debug!("Composed answer: {}", answer);
        state.record_answer(answer)
    }

    async fn run_stages(&self, question: &str) -> Result<PipelineState> {
        let mut state = PipelineState::new(question);

        self.check_if_can_answer(&mut state).await?;
        if state.route()? == Stage::Unanswerable {
            info!("Question judged unanswerable, stopping");
            return Ok(state);
        }

        self.write_query(&mut state).await?;
        self.execute_query(&mut state)?;
        self.write_answer(&mut state).await?;
        Ok(state)
    }

    /// Run one question through the pipeline and return its final state.
    pub async fn run(&self, question: &str) -> Result<PipelineState> {
        info!("Processing question: {}", question);
        let started = Utc::now();
        let outcome = self.run_stages(question).await;

        if let Some(tracer) = &self.tracer {
            tracer.submit(RunRecord::new(
                &tracer.project,
                question,
                started,
                outcome.as_ref(),
            ));
        }

        outcome
    }

    /// Wait up to `wait` for run uploads still in flight.
    pub async fn flush_traces(&self, wait: Duration) {
        let handles = match &self.tracer {
            Some(tracer) => tracer.take_pending(),
            None => return,
        };
        if handles.is_empty() {
            return;
        }

        let count = handles.len();
        let drain = async {
            for handle in handles {
                let _ = handle.await;
            }
        };
        if tokio::time::timeout(wait, drain).await.is_err() {
            warn!("Gave up waiting for {} run trace upload(s)", count);
        }
    }

    /// Answer a question, folding every outcome into user-facing text.
    pub async fn process_question(&self, question: &str) -> String {
        match self.run(question).await {
            Ok(state) => state
                .answer()
                .map(str::to_string)
                .unwrap_or_else(|| FALLBACK_ANSWER.to_string()),
            Err(e) => {
                error!("Run failed: {}", e);
                format!("An error occurred: {}", e)
            }
        }
    }
}
