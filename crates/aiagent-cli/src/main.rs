//! # aiagent-cli
//!
//! Command-line interface for aiagent.

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use aiagent_agent::AgentError;
use aiagent_core::error::format_error_with_suggestion;
use aiagent_core::{Error, ProviderOverrides, Settings};
use aiagent_providers::{LlmProvider, ProviderRegistry};

mod commands;
mod logging;

/// Application context containing shared state.
pub struct AppContext {
    pub settings: Settings,
    pub registry: ProviderRegistry,
    provider_override: Option<String>,
    model_override: Option<String>,
}

impl AppContext {
    /// Name of the provider this invocation uses.
    pub fn provider_name(&self) -> &str {
        self.provider_override
            .as_deref()
            .unwrap_or(self.settings.default_llm_provider.as_str())
    }

    /// Resolve the selected provider, applying `--model`.
    pub fn provider(&self) -> anyhow::Result<Box<dyn LlmProvider>> {
        let mut overrides = ProviderOverrides::none();
        if let Some(model) = &self.model_override {
            overrides = overrides.model(model.clone());
        }
        Ok(self
            .registry
            .resolve(&self.settings, self.provider_name(), overrides)?)
    }
}

/// aiagent - chat with hosted or local LLMs
#[derive(Parser)]
#[command(name = "aiagent")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Provider to use (ollama, gemini)
    #[arg(long, global = true)]
    provider: Option<String>,

    /// Model to use instead of the provider's default
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a question and get a one-sentence answer
    Ask {
        /// The question
        prompt: String,
    },
    /// Stream jokes from an agent that decides how many to tell
    Stream {
        /// Request for the joker agent
        #[arg(default_value = "Please tell me 5 jokes.")]
        prompt: String,
    },
    /// Stream a response through the conversation facade
    Chat {
        /// The user message
        prompt: String,
        /// User the conversation belongs to
        #[arg(long, default_value_t = 1)]
        user_id: u64,
        /// Conversation id
        #[arg(long, default_value_t = 1)]
        conversation_id: u64,
    },
    /// List available providers
    Providers,
    /// Diagnose configuration and provider reachability
    Doctor,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", describe_error(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::load()?;
    let _log_guard = logging::init(&settings, cli.verbose)?;
    settings.log_warnings();

    let ctx = AppContext {
        settings,
        registry: ProviderRegistry::builtin(),
        provider_override: cli.provider,
        model_override: cli.model,
    };

    match cli.command {
        Commands::Ask { prompt } => commands::ask::run(&ctx, &prompt).await?,
        Commands::Stream { prompt } => commands::stream::run(&ctx, &prompt).await?,
        Commands::Chat {
            prompt,
            user_id,
            conversation_id,
        } => commands::chat::run(&ctx, &prompt, user_id, conversation_id).await?,
        Commands::Providers => commands::providers::run(&ctx),
        Commands::Doctor => commands::doctor::run(&ctx).await?,
    }

    Ok(())
}

/// Render an error for the terminal, with a recovery hint when one applies.
fn describe_error(e: &anyhow::Error) -> String {
    let core = e.downcast_ref::<Error>().or_else(|| match e.downcast_ref::<AgentError>() {
        Some(AgentError::Provider(inner)) => Some(inner),
        _ => None,
    });

    match core {
        Some(err) => format_error_with_suggestion(err),
        None => format!("{:#}", e),
    }
}
