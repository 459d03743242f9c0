use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gateway_agents::{AgentSettings, ChatAgent};
use gateway_core::intent::MAX_NUMBERED_LABELS;
use gateway_core::{AiResponse, ChatRequest, IntentionSetting};
use gateway_observability::{init_tracing, AppMetrics};
use gateway_upstream::{
    GeminiClient, ScriptedGenerator, Upstream, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL,
};
use serde_json::{json, Value};

#[derive(Debug, Parser)]
#[command(name = "gateway")]
#[command(about = "Intent Gateway CLI")]
struct Cli {
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, env = "GATEWAY_GEMINI_MODEL", default_value = DEFAULT_GEMINI_MODEL)]
    model: String,

    #[arg(long, env = "GATEWAY_GEMINI_BASE_URL", default_value = DEFAULT_GEMINI_BASE_URL)]
    base_url: String,

    #[arg(long, default_value_t = 120)]
    timeout_seconds: u64,

    /// Print the request that would be sent upstream instead of calling Gemini.
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Send a single prompt, optionally classifying it against intentions.
    Ask {
        #[arg(long, conflicts_with = "messages")]
        input: Option<String>,
        /// JSON file holding an array of {role, content} messages.
        #[arg(long)]
        messages: Option<PathBuf>,
        #[arg(long)]
        system: Option<String>,
        #[arg(long)]
        temperature: Option<f64>,
        #[arg(long = "intention")]
        intentions: Vec<String>,
        #[arg(long)]
        intention_else: Option<String>,
    },
    /// Interactive chat; the history lives only for this session.
    Chat {
        #[arg(long)]
        system: Option<String>,
        #[arg(long)]
        temperature: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing("gateway_cli");
    let cli = Cli::parse();

    let agent = build_agent(&cli)?;
    let api_key = cli
        .api_key
        .clone()
        .or_else(|| cli.dry_run.then(|| "dry-run".to_string()));

    match cli.command {
        Command::Ask {
            input,
            messages,
            system,
            temperature,
            intentions,
            intention_else,
        } => {
            if intentions.len() > MAX_NUMBERED_LABELS {
                anyhow::bail!("at most {MAX_NUMBERED_LABELS} --intention values are supported");
            }

            let message_list = messages
                .map(|path| read_messages(&path))
                .transpose()?;
            let intention_setting = (!intentions.is_empty() || intention_else.is_some())
                .then(|| IntentionSetting::from_labels(intentions, intention_else));

            let response = agent
                .respond(ChatRequest {
                    input: input.map(Value::String),
                    message_list,
                    apikey: api_key,
                    system_instruction: system,
                    temperature,
                    intention_setting,
                })
                .await;

            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(exit_code(&response))
        }
        Command::Chat {
            system,
            temperature,
        } => {
            run_chat(agent, api_key, system, temperature).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_chat(
    agent: ChatAgent<Upstream>,
    api_key: Option<String>,
    system: Option<String>,
    temperature: Option<f64>,
) -> Result<()> {
    let mut history: Vec<Value> = Vec::new();

    println!("Intent Gateway chat mode. type 'exit' to quit.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        let message = line.trim();
        if message.eq_ignore_ascii_case("exit") || message.eq_ignore_ascii_case("quit") {
            break;
        }

        if message.is_empty() {
            continue;
        }

        history.push(json!({ "role": "user", "content": message }));

        let response = agent
            .respond(ChatRequest {
                message_list: Some(Value::Array(history.clone())),
                apikey: api_key.clone(),
                system_instruction: system.clone(),
                temperature,
                ..ChatRequest::default()
            })
            .await;

        match (response.success, response.response) {
            (true, Some(text)) => {
                println!("\n{text}\n");
                history.push(json!({ "role": "assistant", "content": text }));
            }
            _ => {
                history.pop();
                let error = response.error.unwrap_or_default();
                match response.details {
                    Some(details) => eprintln!("\n{error}: {details}\n"),
                    None => eprintln!("\n{error}\n"),
                }
            }
        }
    }

    Ok(())
}

fn build_agent(cli: &Cli) -> Result<ChatAgent<Upstream>> {
    let upstream = if cli.dry_run {
        Upstream::scripted(ScriptedGenerator::echo())
    } else {
        Upstream::gemini(GeminiClient::with_timeouts(
            cli.base_url.as_str(),
            Duration::from_secs(6),
            Duration::from_secs(cli.timeout_seconds),
        )?)
    };

    let settings = AgentSettings {
        model: cli.model.clone(),
        ..AgentSettings::default()
    };

    Ok(ChatAgent::new(
        Arc::new(upstream),
        settings,
        AppMetrics::shared(),
    ))
}

fn read_messages(path: &PathBuf) -> Result<Value> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading messages from {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("messages file {} is not valid JSON", path.display()))
}

fn exit_code(response: &AiResponse) -> ExitCode {
    if response.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
