//! Process configuration
//!
//! Credentials and endpoints come from the environment, optionally seeded
//! from a `.env` file. Both credentials are mandatory: a process that cannot
//! reach the model or the run-tracing service refuses to start.

use crate::error::{AssistantError, Result};
use std::path::PathBuf;
use tracing::error;

pub const LLAMA_API_KEY: &str = "LLAMA_API_KEY";
pub const LANGSMITH_API_KEY: &str = "LANGSMITH_API_KEY";
pub const RETAILX_DB_PATH: &str = "RETAILX_DB_PATH";

pub 
const DEFAULT_LLM_BASE_URL: &str = "https://api.llama-api.com";
const DEFAULT_LLM_MODEL: &str = "llama3-70b";
const DEFAULT_TRACING_ENDPOINT: &str = "https://api.smith.langchain.com";
const DEFAULT_TRACING_PROJECT: &str = "RetailX_AI_Assistant";
const DEFAULT_DB_PATH: &str = "retail.db";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Model service settings
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

/// Run-tracing service settings
#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub api_key: String,
    pub endpoint: String,
    pub project: String,
    pub enabled: bool,
}

/// Dataset location from `RETAILX_DB_PATH`, falling back to `retail.db`.
pub fn resolve_db_path<F>(lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    lookup(RETAILX_DB_PATH)
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH))
}

/// [`resolve_db_path`] over the process environment.
pub fn db_path_from_env() -> PathBuf {
    resolve_db_path(|key| std::env::var(key).ok())
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub tracing: TracingConfig,
    pub db_path: PathBuf,
    pub bind_addr: String,
}

impl AppConfig {
    /// Load `.env` (if any) and read the process environment.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let llama_key = get(LLAMA_API_KEY);
        let langsmith_key = get(LANGSMITH_API_KEY);

        if llama_key.is_none() {
            error!("{} not found in environment or .env file", LLAMA_API_KEY);
        }
        if langsmith_key.is_none() {
            error!("{} not found in environment or .env file", LANGSMITH_API_KEY);
        }

        let (llama_key, langsmith_key) = match (llama_key, langsmith_key) {
            (Some(l), Some(s)) => (l, s),
            _ => {
                return Err(AssistantError::Config(
                    "API keys not set. Please check your .env file.".to_string(),
                ))
            }
        };

        let enabled = get("LANGCHAIN_TRACING_V2")
            .map(|v| !matches!(v.to_lowercase().as_str(), "false" | "0" | "no" | "off"))
            .unwrap_or(true);

        Ok(Self {
            llm: LlmConfig {
                api_key: llama_key,
                base_url: get("LLAMA_BASE_URL").unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
                model: get("LLAMA_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            },
            tracing: TracingConfig {
                api_key: langsmith_key,
                endpoint: get("LANGCHAIN_ENDPOINT")
                    .unwrap_or_else(|| DEFAULT_TRACING_ENDPOINT.to_string()),
                project: get("LANGCHAIN_PROJECT")
                    .unwrap_or_else(|| DEFAULT_TRACING_PROJECT.to_string()),
                enabled,
            },
            db_path: resolve_db_path(&lookup),
            bind_addr: get("RETAILX_BIND").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        })
    }
}
