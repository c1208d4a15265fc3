//! Pipeline state: the record one question accumulates as it moves
//! through the stages. Every field is written at most once.

use crate::error::{AssistantError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    Checked,
    /// Terminal: the question is out of scope for the dataset
    Unanswerable,
    QueryWritten,
    Executed,
    /// Terminal: an answer has been composed
    Answered,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Unanswerable | Stage::Answered)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Start => "start",
            Stage::Checked => "checked",
            Stage::Unanswerable => "unanswerable",
            Stage::QueryWritten => "query_written",
            Stage::Executed => "executed",
            Stage::Answered => "answered",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    question: String,
    plan: Option<String>,
    can_answer: Option<bool>,
    query: Option<String>,
    query_result: Option<String>,
    answer: Option<String>,
    stage: Stage,
}

fn write_once<T>(slot: &mut Option<T>, field: &str, value: T) -> Result<()> {
    if slot.is_some() {
        return Err(AssistantError::Pipeline(format!("`{}` was already set for this run", field)));
    }
    *slot = Some(value);
    Ok(())
}

fn require<'a, T>(slot: &'a Option<T>, field: &str) -> Result<&'a T> {
    slot.as_ref()
        .ok_or_else(|| AssistantError::Pipeline(format!("`{}` read before it was set", field)))
}

impl PipelineState {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            plan: None,
            can_answer: None,
            query: None,
            query_result: None,
            answer: None,
            stage: Stage::Start,
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn plan(&self) -> Option<&str> {
        self.plan.as_deref()
    }

    pub fn can_answer(&self) -> Option<bool> {
        self.can_answer
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn query_result(&self) -> Option<&str> {
        self.query_result.as_deref()
    }

    pub fn answer(&self) -> Option<&str> {
        self.answer.as_deref()
    }

    fn expect_stage(&self, expected: Stage, action: &str) -> Result<()> {
        if self.stage != expected {
            return Err(AssistantError::Pipeline(format!(
                "cannot {} from stage `{}` (expected `{}`)",
                action, self.stage, expected
            )));
        }
        Ok(())
    }

    /// Record the answerability judgment and take the branch.
    pub fn record_judgment(&mut self, plan: String, can_answer: bool) -> Result<()> {
        self.expect_stage(Stage::Start, "record the judgment")?;
        write_once(&mut self.plan, "plan", plan)?;
        write_once(&mut self.can_answer, "can_answer", can_answer)?;
        self.stage = Stage::Checked;
        Ok(())
    }

    /// Leave `Checked`: onward when answerable, otherwise to the terminal stage.
    pub fn route(&mut self) -> Result<Stage> {
        self.expect_stage(Stage::Checked, "route")?;
        let can_answer = *require(&self.can_answer, "can_answer")?;
        if !can_answer {
            self.stage = Stage::Unanswerable;
        }
        Ok(self.stage)
    }

    pub fn record_query(&mut self, query: String) -> Result<()> {
        self.expect_stage(Stage::Checked, "record a query")?;
        if self.can_answer != Some(true) {
            return Err(AssistantError::Pipeline(
                "query written for a question judged unanswerable".to_string(),
            ));
        }
        write_once(&mut self.query, "query", query)?;
        self.stage = Stage::QueryWritten;
        Ok(())
    }

    pub fn record_result(&mut self, query_result: String) -> Result<()> {
        self.expect_stage(Stage::QueryWritten, "record a query result")?;
        write_once(&mut self.query_result, "query_result", query_result)?;
        self.stage = Stage::Executed;
        Ok(())
    }

    pub fn record_answer(&mut self, answer: String) -> Result<()> {
        self.expect_stage(Stage::Executed, "record an answer")?;
        write_once(&mut self.answer, "answer", answer)?;
        self.stage = Stage::Answered;
        Ok(())
    }

    pub fn require_query(&self) -> Result<&str> {
        require(&self.query, "query").map(String::as_str)
    }

    pub fn require_query_result(&self) -> Result<&str> {
        require(&self.query_result, "query_result").map(String::as_str)
    }
}
