use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use prompt_enhancer::cli;

#[derive(Parser)]
#[command(name = "prompt-enhancer", version)]
#[command(about = "Rewrite rough prompts into the structure each target LLM prefers", long_about = None)]
struct Cli {
    /// Path to config file (defaults to ./prompt-enhancer.toml or ~/.config/prompt-enhancer/config.toml)
    #[arg(long)]
    config: Option<String>,

    /// Override LLM provider (anthropic, openai, gemini)
    #[arg(long)]
    provider: Option<String>,

    /// Override LLM model (e.g., "claude-haiku-4-5-20251001", "gpt-4o")
    #[arg(long)]
    model: Option<String>,

    /// Target LLM to enhance for (Claude, ChatGPT, Gemini, Perplexity)
    #[arg(short, long)]
    target: Option<String>,

    /// Use mock LLM client for testing
    #[arg(long)]
    dry_run: bool,

    /// Show info-level logs (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Logs go to stderr so they never interleave with the wizard's output
    let default_level = if cli.verbose { "info" } else { "warn" };
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    cli::interactive::run(cli.config, cli.provider, cli.model, cli.target, cli.dry_run).await
}
