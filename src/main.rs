use std::time::Instant;

use agent_scrub::{ScrubRequest, Scrubber, Settings};
use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;

#[derive(Parser)]
#[command(name = "agent-scrub", about = "Scrub an agent or agency profile page into structured contact data")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrub one profile page and print the result as JSON
    Scrub {
        /// Profile page URL
        url: String,
        /// Photo URL to leave out of the candidates (repeatable)
        #[arg(short = 'x', long = "exclude")]
        exclude: Vec<String>,
        /// Include the reconciliation trace
        #[arg(long)]
        debug: bool,
        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Show which enrichments are configured
    Config,
}

fn print_json(value: &serde_json::Value, pretty: bool) -> anyhow::Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{out}");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load().context("loading settings")?;

    match cli.command {
        Commands::Scrub {
            url,
            exclude,
            debug,
            pretty,
        } => {
            let scrubber = Scrubber::new(settings).context("building HTTP client")?;
            let request = ScrubRequest::new(url).exclude(exclude).with_debug(debug);
            match scrubber.scrub(&request).await {
                Ok(profile) => {
                    print_json(&serde_json::to_value(&profile)?, pretty)?;
                    info!("Done in {:.1}s", t0.elapsed().as_secs_f64());
                }
                Err(e) => {
                    print_json(&json!({ "error": e.to_string() }), pretty)?;
                    return Err(e.into());
                }
            }
        }
        Commands::Config => {
            let status = json!({
                "placesLookup": settings.places.api_key().is_some(),
                "logoSearch": settings.logo.secret_key().is_some(),
                "logoToken": settings.logo.publishable_key().is_some(),
                "fetchTimeoutMs": settings.fetch_timeout_ms,
                "lookupTimeoutMs": settings.lookup_timeout_ms,
                "maxHtmlBytes": settings.max_html_bytes,
                "userAgent": settings.user_agent,
            });
            print_json(&status, true)?;
        }
    }

    Ok(())
}
