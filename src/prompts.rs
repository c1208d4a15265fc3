//! Prompt templates for the three model-backed pipeline stages.

/// Answerability judgment. The model must answer with a JSON object
/// carrying `reasoning` and `can_answer`.
pub const CAN_ANSWER_TEMPLATE: &str = r#"Given the following database description and user question, determine if the question can be answered using the available data. Return a JSON with 'reasoning' and 'can_answer' keys.

Database Description:
{db_description}

User Question: {question}

JSON Response:"#;

pub const WRITE_QUERY_TEMPLATE: &str = r#"Given the following database description and user question, write an SQL query to answer the question.

Database Description:
{db_description}

User Question: {question}

SQL Query:"#;

pub const WRITE_ANSWER_TEMPLATE: &str = r#"Given the user question, SQL query, and query result, provide a human-readable answer.

User Question: {question}
SQL Query: {query}
Query Result:
{result}

Answer:"#;

/// Substitute `{name}` placeholders in a single pass, so values that
/// themselves contain braces are never re-expanded.
fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len() + vars.iter().map(|(_, v)| v.len()).sum::<usize>());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let substituted = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (close, *value))
        });

        match substituted {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

pub fn can_answer_prompt(db_description: &str, question: &str) -> String {
    render(
        CAN_ANSWER_TEMPLATE,
        &[("db_description", db_description), ("question", question)],
    )
}

pub fn write_query_prompt(db_description: &str, question: &str) -> String {
    render(
        WRITE_QUERY_TEMPLATE,
        &[("db_description", db_description), ("question", question)],
    )
}

pub fn write_answer_prompt(question: &str, query: &str, result: &str) -> String {
    render(
        WRITE_ANSWER_TEMPLATE,
        &[("question", question), ("query", query), ("result", result)],
    )
}
