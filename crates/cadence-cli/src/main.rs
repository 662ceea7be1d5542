//! cadence: conversational task coach

mod actions;
mod config;

use std::sync::Arc;

use anyhow::anyhow;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use cadence_agent::{
    AgentRuntime, Coach, FileCheckpointer, InMemoryStore, InMemoryTaskService, PsychProfile,
    TurnRequest, User,
};
use cadence_ai::{providers::OpenAiProvider, Retry, RetryConfig};

use actions::ActionExecutor;
use config::Config;

#[derive(Parser)]
#[command(name = "cadence", about = "Conversational task coach", version)]
struct Args {
    /// User id for the conversation
    #[arg(long, default_value = "demo-user")]
    user: String,

    /// Thread id; a fresh one is generated when omitted
    #[arg(long)]
    thread: Option<String>,

    /// Task id the message refers to
    #[arg(long)]
    task: Option<String>,

    /// Override the responder model
    #[arg(long)]
    model: Option<String>,

    /// Write a default config file and exit
    #[arg(long)]
    init_config: bool,

    /// One-shot message; starts an interactive session when omitted
    message: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if args.init_config {
        let path = Config::init()?;
        println!("Config file: {}", path.display());
        println!("{}", config::example_config());
        return Ok(());
    }

    let config = Config::load();
    let api_key = config.api_key().ok_or_else(|| {
        anyhow!(
            "no API key found; set OPENAI_API_KEY or api_keys.openai in {}",
            Config::config_path().display()
        )
    })?;

    let mut provider = OpenAiProvider::new(api_key);
    if let Some(base_url) = &config.base_url {
        provider = provider.with_base_url(base_url);
    }
    let reasoning = Arc::new(Retry::new(provider, RetryConfig::default()));

    let tasks = Arc::new(InMemoryTaskService::new());
    tasks.put_user(demo_user(&args.user));

    let runtime = AgentRuntime::new(
        config.runtime_config(args.model.clone()),
        reasoning,
        tasks.clone(),
        Arc::new(FileCheckpointer::default()),
        Arc::new(InMemoryStore::new()),
    )?;
    let executor = ActionExecutor::new(tasks);

    let thread_id = args
        .thread
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    if let Some(message) = &args.message {
        run_turn(&runtime, &executor, &args, &thread_id, message).await;
        return Ok(());
    }

    println!("cadence — thread {thread_id} (Ctrl-D or /quit to exit)");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" || line == "/exit" {
            break;
        }
        run_turn(&runtime, &executor, &args, &thread_id, line).await;
    }

    Ok(())
}

async fn run_turn(
    runtime: &AgentRuntime,
    executor: &ActionExecutor,
    args: &Args,
    thread_id: &str,
    message: &str,
) {
    let response = runtime
        .process_turn(TurnRequest {
            user_id: args.user.clone(),
            message: message.to_string(),
            thread_id: thread_id.to_string(),
            task_id: args.task.clone(),
        })
        .await;

    if let Some(error) = &response.error {
        eprintln!("warning: {error}");
    }
    println!("{}", response.response);

    if !response.action_items.is_empty() {
        match executor.execute(&args.user, &response.action_items).await {
            Ok(outcomes) => {
                for outcome in outcomes {
                    println!("  · {outcome}");
                }
            }
            Err(e) => eprintln!("action execution failed: {e}"),
        }
    }
}

/// The in-memory task store starts empty, but the coach reads the user's
/// profile, so seed one for the session user.
fn demo_user(user_id: &str) -> User {
    User {
        id: user_id.to_string(),
        email: format!("{user_id}@localhost"),
        name: Some(user_id.to_string()),
        psych_profile: Some(PsychProfile {
            productivity_time: Some("morning".to_string()),
            task_approach: Some("small steps".to_string()),
            difficulty_preference: Some("easy first".to_string()),
            coach: Some(Coach {
                name: "Sam".to_string(),
                coaching_style: Some("supportive".to_string()),
                directness: Some(6),
                encouragement_level: Some(8),
            }),
        }),
    }
}
