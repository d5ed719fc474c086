//! Recon console runner
//!
//! Runs a single geolocation session on one image and prints the agent's
//! progress to stdout.

mod console;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use geolocator::RECON_PROMPT;
use recon_core::{AgentBuilder, SessionOutcome};
use recon_runtime::{GeminiProvider, ReconConfig};

use crate::console::ConsoleSink;

#[derive(Parser)]
#[command(name = "recon", about = "Geolocate a photo with a tool-using Gemini agent")]
struct Cli {
    /// Image to geolocate (prompted for when omitted)
    image: Option<String>,

    /// Override MODEL_NAME
    #[arg(long)]
    model: Option<String>,

    /// Override RECON_MAX_TURNS
    #[arg(long)]
    max_turns: Option<usize>,
}

/// Strip whitespace and surrounding double quotes from a pasted path
fn clean_path_input(raw: &str) -> String {
    raw.trim().trim_matches('"').to_string()
}

fn prompt_for_path() -> io::Result<String> {
    print!("Enter path to image file: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so they never interleave with session output
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = ReconConfig::from_env();
    if config.validate().is_err() {
        println!("Error: Please set GEMINI_API_KEY and TAVILY_API_KEY in .env");
        std::process::exit(1);
    }
    if let Some(model) = cli.model {
        config.model = model;
    }
    if let Some(max_turns) = cli.max_turns {
        config.max_turns = max_turns.max(1);
    }

    let raw = match cli.image {
        Some(path) => path,
        None => prompt_for_path()?,
    };
    let image_path = PathBuf::from(clean_path_input(&raw));
    if !image_path.is_file() {
        println!("File not found.");
        return Ok(());
    }

    let provider = Arc::new(GeminiProvider::from_recon(&config)?);
    let tools = geolocator::tavily_toolbox(
        config.tavily_api_key.as_deref().unwrap_or_default(),
        &config.tavily_base_url,
        config.http_timeout,
    )?;
    let agent = AgentBuilder::new()
        .provider(provider)
        .tools(tools)
        .system_prompt(RECON_PROMPT)
        .model(config.model.clone())
        .max_turns(config.max_turns)
        .coordinate_space(config.coordinate_space)
        .retention(config.retention)
        .build()?;

    match agent.run(&image_path, &ConsoleSink).await {
        SessionOutcome::BudgetExhausted => {
            tracing::info!(max_turns = config.max_turns, "stopped at the turn budget");
        }
        SessionOutcome::Aborted(reason) => tracing::warn!("session aborted: {}", reason),
        SessionOutcome::Terminated(_) => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_path_input() {
        assert_eq!(clean_path_input("\"C:\\photos\\street.jpg\"\n"), "C:\\photos\\street.jpg");
        assert_eq!(clean_path_input("  ./pics/alley.png \n"), "./pics/alley.png");
        assert_eq!(clean_path_input("plain.jpg"), "plain.jpg");
    }

    #[test]
    fn test_cli_parses_positional_image() {
        let cli = Cli::try_parse_from(["recon", "street.jpg", "--max-turns", "4"]).unwrap();
        assert_eq!(cli.image.as_deref(), Some("street.jpg"));
        assert_eq!(cli.max_turns, Some(4));
        assert!(cli.model.is_none());
    }
}
