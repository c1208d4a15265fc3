use anyhow::Result;
use clap::{Parser, Subcommand};
use retailx_assistant::config::{self, AppConfig};
use retailx_assistant::dataset;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "retailx")]
#[command(about = "RetailX AI Assistant: ask questions about customers, products, and sales")]
struct Args {
    /// Path to the SQLite dataset (or set RETAILX_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer a question about the dataset
    Ask {
        /// The question in plain English
        question: String,
    },
    /// Create or recreate the dataset with sample data
    InitDb,
    /// Print the schema description given to the model
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    match args.command {
        Command::Ask { question } => {
            let mut config = AppConfig::load()?;
            if let Some(db) = args.db {
                config.db_path = db;
            }

            if question.trim().is_empty() {
                println!("Please enter a question.");
                return Ok(());
            }

            let workflow = retailx_assistant::build_workflow(&config)?;
            let answer = workflow.process_question(&question).await;
            println!("Answer: {}", answer);
            workflow.flush_traces(Duration::from_secs(10)).await;
        }
        Command::InitDb => {
            dotenv::dotenv().ok();
            let path = args.db.unwrap_or_else(config::db_path_from_env);
            let rows = dataset::initialize_database(&path)?;
            info!("Wrote {} rows to {}", rows, path.display());
            println!("Database initialized with sample data.");
        }
        Command::Schema => {
            println!("{}", dataset::DB_DESCRIPTION.trim());
        }
    }

    Ok(())
}
