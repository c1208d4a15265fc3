use async_trait::async_trait;
use retailx_assistant::execution::{QueryFailure, QueryStore, QueryTable, SqliteStore};
use retailx_assistant::llm::LanguageModel;
use retailx_assistant::run_tracer::{RunRecord, RunSink};
use retailx_assistant::{AssistantError, Stage, Workflow, FALLBACK_ANSWER};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Deterministic model stand-in. Responds by prompt kind and remembers
/// every prompt it was sent.
struct ScriptedModel {
    judgment: String,
    query: String,
    answer: String,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    fn new(judgment: &str, query: &str, answer: &str) -> Self {
        Self {
            judgment: judgment.to_string(),
            query: query.to_string(),
            answer: answer.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn count(&self, marker: &str) -> usize {
        self.prompts().iter().filter(|p| p.ends_with(marker)).count()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> retailx_assistant::Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if prompt.ends_with("JSON Response:") {
            Ok(self.judgment.clone())
        } else if prompt.ends_with("SQL Query:") {
            Ok(self.query.clone())
        } else if prompt.ends_with("Answer:") {
            Ok(self.answer.clone())
        } else {
            Err(AssistantError::Llm(format!("unexpected prompt: {}", prompt)))
        }
    }
}

/// Sample-data store that counts execution attempts.
struct CountingStore {
    inner: SqliteStore,
    executions: AtomicUsize,
}

impl CountingStore {
    fn new() -> Self {
        Self {
            inner: SqliteStore::in_memory_with_sample_data().unwrap(),
            executions: AtomicUsize::new(0),
        }
    }

    fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }
}

impl QueryStore for CountingStore {
    fn run_query(&self, sql: &str) -> Result<QueryTable, QueryFailure> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        self.inner.run_query(sql)
    }
}

/// Store whose backing database cannot be reached.
struct OfflineStore;

impl QueryStore for OfflineStore {
    fn run_query(&self, sql: &str) -> Result<QueryTable, QueryFailure> {
        Err(QueryFailure::unavailable(sql, "unable to open database file"))
    }
}

#[derive(Default)]
struct RecordingSink {
    runs: Mutex<Vec<RunRecord>>,
}

#[async_trait]
impl RunSink for RecordingSink {
    async fn record(&self, run: &RunRecord) -> retailx_assistant::Result<()> {
        self.runs.lock().unwrap().push(run.clone());
        Ok(())
    }
}

struct FailingSink;

#[async_trait]
impl RunSink for FailingSink {
    async fn record(&self, _run: &RunRecord) -> retailx_assistant::Result<()> {
        Err(AssistantError::Tracing("tracing service down".to_string()))
    }
}

/// Sink whose uploads never complete.
struct HangingSink;

#[async_trait]
impl RunSink for HangingSink {
    async fn record(&self, _run: &RunRecord) -> retailx_assistant::Result<()> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }
}

const USA_JUDGMENT: &str =
    r#"{"reasoning": "The Retail table has a Country column, so customers can be counted per country.", "can_answer": true}"#;
const USA_QUERY: &str = "SELECT COUNT(DISTINCT Customer_ID) AS customers FROM Retail WHERE Country = 'USA'";
const USA_ANSWER: &str = "There are 50 customers in the USA.";

fn setup(model: ScriptedModel) -> (Arc<ScriptedModel>, Arc<CountingStore>, Workflow) {
    let model = Arc::new(model);
    let store = Arc::new(CountingStore::new());
    let workflow = Workflow::new(model.clone(), store.clone());
    (model, store, workflow)
}

#[tokio::test]
async fn test_usa_customer_count() {
    let (model, store, workflow) = setup(ScriptedModel::new(USA_JUDGMENT, USA_QUERY, USA_ANSWER));

    let state = workflow.run("How many customers are in the USA?").await.unwrap();

    assert_eq!(state.stage(), Stage::Answered);
    assert_eq!(state.can_answer(), Some(true));
    assert!(state.plan().unwrap().contains("Country column"));
    assert_eq!(state.query(), Some(USA_QUERY));
    assert_eq!(
        state.query_result(),
        Some("|   | customers |\n|--:|----------:|\n| 0 |        50 |")
    );
    assert_eq!(state.answer(), Some(USA_ANSWER));

    // exactly one generation, one execution, one composition
    assert_eq!(model.count("JSON Response:"), 1);
    assert_eq!(model.count("SQL Query:"), 1);
    assert_eq!(model.count("Answer:"), 1);
    assert_eq!(store.executions(), 1);

    // the composer saw the question, the query and the rendered table
    let answer_prompt = model.prompts().last().cloned().unwrap();
    assert!(answer_prompt.contains("User Question: How many customers are in the USA?"));
    assert!(answer_prompt.contains(&format!("SQL Query: {}", USA_QUERY)));
    assert!(answer_prompt.contains("| 0 |        50 |"));
}

#[tokio::test]
async fn test_checker_and_generator_see_data_description() {
    let (model, _store, workflow) = setup(ScriptedModel::new(USA_JUDGMENT, USA_QUERY, USA_ANSWER));
    workflow.run("How many customers are in the USA?").await.unwrap();

    let prompts = model.prompts();
    assert!(prompts[0].contains("- Country: Customer's country of residence"));
    assert!(prompts[1].contains("- Country: Customer's country of residence"));
}

#[tokio::test]
async fn test_unanswerable_question_stops_after_check() {
    let (model, store, workflow) = setup(ScriptedModel::new(
        r#"{"reasoning": "The dataset has no weather information.", "can_answer": false}"#,
        "SELECT 1",
        "unused",
    ));

    let state = workflow.run("What is the weather today?").await.unwrap();
    assert_eq!(state.stage(), Stage::Unanswerable);
    assert_eq!(state.can_answer(), Some(false));
    assert_eq!(state.query(), None);
    assert_eq!(state.query_result(), None);
    assert_eq!(state.answer(), None);

    assert_eq!(model.prompts().len(), 1);
    assert_eq!(store.executions(), 0);

    let (_, _, workflow) = setup(ScriptedModel::new(
        r#"{"reasoning": "No weather data.", "can_answer": false}"#,
        "SELECT 1",
        "unused",
    ));
    assert_eq!(workflow.process_question("What is the weather today?").await, FALLBACK_ANSWER);
}

#[tokio::test]
async fn test_execution_failure_reaches_composer() {
    let (model, store, workflow) = setup(ScriptedModel::new(
        r#"{"reasoning": "Spend per customer is available.", "can_answer": true}"#,
        "SELECT SUM(Loyalty_Points) FROM Retail",
        "Sorry, I couldn't compute that: the data has no loyalty points field.",
    ));

    let answer = workflow.process_question("How many loyalty points do customers have?").await;
    assert_eq!(answer, "Sorry, I couldn't compute that: the data has no loyalty points field.");
    assert_eq!(store.executions(), 1);

    let answer_prompt = model.prompts().last().cloned().unwrap();
    assert!(answer_prompt.contains(
        "Query Result:\nExecution failed on sql 'SELECT SUM(Loyalty_Points) FROM Retail':"
    ));
    assert!(answer_prompt.contains("no such column: Loyalty_Points"));
}

#[tokio::test]
async fn test_malformed_judgment_aborts_run() {
    let (model, store, workflow) = setup(ScriptedModel::new(
        "Yes, I think this can be answered.",
        USA_QUERY,
        USA_ANSWER,
    ));

    let err = workflow.run("How many customers are in the USA?").await.unwrap_err();
    assert!(matches!(err, AssistantError::MalformedResponse(_)));
    assert_eq!(model.prompts().len(), 1);
    assert_eq!(store.executions(), 0);

    let rendered = workflow.process_question("How many customers are in the USA?").await;
    assert!(rendered.starts_with("An error occurred: Malformed model response:"));
}

#[tokio::test]
async fn test_fenced_query_is_unwrapped() {
    let (_, _, workflow) = setup(ScriptedModel::new(
        USA_JUDGMENT,
        "```sql\nSELECT COUNT(*) FROM Retail WHERE Country = 'Canada'\n```",
        "There are 50 customers in Canada.",
    ));

    let state = workflow.run("How many customers are in Canada?").await.unwrap();
    assert_eq!(state.query(), Some("SELECT COUNT(*) FROM Retail WHERE Country = 'Canada'"));
    assert!(state.query_result().unwrap().ends_with("| 0 |       50 |"));
}

#[tokio::test]
async fn test_identical_questions_yield_identical_trajectories() {
    let (_, _, workflow) = setup(ScriptedModel::new(USA_JUDGMENT, USA_QUERY, USA_ANSWER));

    let first = workflow.run("How many customers are in the USA?").await.unwrap();
    let second = workflow.run("How many customers are in the USA?").await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_runs_are_traced() {
    let model = Arc::new(ScriptedModel::new(USA_JUDGMENT, USA_QUERY, USA_ANSWER));
    let store = Arc::new(CountingStore::new());
    let sink = Arc::new(RecordingSink::default());
    let workflow = Workflow::new(model, store).with_tracer(sink.clone(), "RetailX_AI_Assistant");

    workflow.run("How many customers are in the USA?").await.unwrap();
    workflow.flush_traces(Duration::from_secs(5)).await;

    let runs = sink.runs.lock().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].session_name, "RetailX_AI_Assistant");
    assert_eq!(runs[0].inputs["question"], "How many customers are in the USA?");
    assert_eq!(runs[0].outputs.as_ref().unwrap()["answer"], USA_ANSWER);
    assert!(runs[0].error.is_none());
}

#[tokio::test]
async fn test_tracing_failure_does_not_affect_answer() {
    let model = Arc::new(ScriptedModel::new(USA_JUDGMENT, USA_QUERY, USA_ANSWER));
    let store = Arc::new(CountingStore::new());
    let workflow = Workflow::new(model, store).with_tracer(Arc::new(FailingSink), "p");

    assert_eq!(workflow.process_question("How many customers are in the USA?").await, USA_ANSWER);
}

#[tokio::test]
async fn test_hanging_trace_upload_does_not_hold_answer() {
    let model = Arc::new(ScriptedModel::new(USA_JUDGMENT, USA_QUERY, USA_ANSWER));
    let store = Arc::new(CountingStore::new());
    let workflow = Workflow::new(model, store).with_tracer(Arc::new(HangingSink), "p");

    let answer = tokio::time::timeout(
        Duration::from_secs(2),
        workflow.process_question("How many customers are in the USA?"),
    )
    .await
    .expect("answer withheld by trace upload");
    assert_eq!(answer, USA_ANSWER);

    // flushing gives up after its deadline
    tokio::time::timeout(
        Duration::from_secs(2),
        workflow.flush_traces(Duration::from_millis(50)),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_single_line_fenced_query_keeps_select() {
    let (_, store, workflow) = setup(ScriptedModel::new(
        USA_JUDGMENT,
        "```SELECT COUNT(*) FROM Retail WHERE Country = 'USA'```",
        USA_ANSWER,
    ));

    let state = workflow.run("How many customers are in the USA?").await.unwrap();
    assert_eq!(state.query(), Some("SELECT COUNT(*) FROM Retail WHERE Country = 'USA'"));
    assert!(state.query_result().unwrap().ends_with("| 0 |       50 |"));
    assert_eq!(store.executions(), 1);
}

#[tokio::test]
async fn test_unavailable_store_failure_reaches_composer() {
    let model = Arc::new(ScriptedModel::new(
        USA_JUDGMENT,
        USA_QUERY,
        "The data store is offline right now, so I can't count customers.",
    ));
    let workflow = Workflow::new(model.clone(), Arc::new(OfflineStore));

    let state = workflow.run("How many customers are in the USA?").await.unwrap();
    assert_eq!(state.stage(), Stage::Answered);

    let expected = format!(
        "Execution failed on sql '{}': unable to open database file",
        USA_QUERY
    );
    assert_eq!(state.query_result(), Some(expected.as_str()));

    let answer_prompt = model.prompts().last().cloned().unwrap();
    assert!(answer_prompt.contains(&expected));
    assert_eq!(
        state.answer(),
        Some("The data store is offline right now, so I can't count customers.")
    );
}

#[tokio::test]
async fn test_custom_description_reaches_prompts() {
    let model = Arc::new(ScriptedModel::new(USA_JUDGMENT, USA_QUERY, USA_ANSWER));
    let store = Arc::new(CountingStore::new());
    let workflow = Workflow::new(model.clone(), store)
        .with_description("Table: Retail\nColumns:\n- Country: where the customer lives");

    workflow.run("How many customers are in the USA?").await.unwrap();

    let prompts = model.prompts();
    assert!(prompts[0].contains("- Country: where the customer lives"));
    assert!(prompts[1].contains("- Country: where the customer lives"));
    assert!(!prompts[0].contains("Customer's country of residence"));
}
