mod ai;
mod config;
mod digest;
mod email;
mod models;
mod pipeline;
mod rank;
mod scheduler;
mod search;
mod tailor;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ai::{create_provider, resolve_model};
use config::{Config, SmtpConfig};
use email::{Mailer, SmtpMailer};
use pipeline::{collect_listings, Pipeline, RunOutcome};
use scheduler::{DigestScheduler, RunFn};
use search::JSearchClient;

#[derive(Parser)]
#[command(name = "jobdigest")]
#[command(about = "Daily job digest - search, rank, tailor and email the best openings")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline once, now
    Run {
        /// Print the digest HTML instead of emailing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Run the pipeline on the weekday schedule until interrupted
    Schedule,

    /// Only search and deduplicate listings, then print them
    Search,
}

fn build_pipeline(config: &Config, send: bool) -> Result<Pipeline> {
    let spec = resolve_model(&config.model)?;
    let provider = create_provider(&spec, config)?;
    let search = JSearchClient::new(config.rapidapi_key.clone())?;
    let mailer: Option<Box<dyn Mailer>> = if send {
        Some(Box::new(SmtpMailer::new(SmtpConfig::from_env()?)))
    } else {
        None
    };
    Ok(Pipeline::new(config.clone(), Box::new(search), provider, mailer))
}

fn fallback_filter() -> EnvFilter {
    EnvFilter::new(format!("{}=info", env!("CARGO_PKG_NAME")))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback_filter()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Run { dry_run } => {
            let pipeline = build_pipeline(&config, !dry_run)?;
            match pipeline.run()? {
                RunOutcome::Rendered { html, .. } => println!("{}", html),
                RunOutcome::Sent { jobs } => println!("Digest with {} jobs sent.", jobs),
                RunOutcome::NoListings => println!("No listings found. Nothing sent."),
                RunOutcome::NoMatches => println!("No matching jobs. Nothing sent."),
            }
        }

        Commands::Schedule => {
            let pipeline = Arc::new(build_pipeline(&config, true)?);
            let run: Arc<RunFn> = Arc::new(move || pipeline.run());
            let scheduler = Arc::new(DigestScheduler::new(run));

            info!("Starting job digest scheduler ({})", config.schedule);
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(scheduler::run_forever(scheduler, &config.schedule))?;
        }

        Commands::Search => {
            let search = JSearchClient::new(config.rapidapi_key.clone())?;
            let listings = collect_listings(&search, &config);
            if listings.is_empty() {
                println!("No listings found.");
            } else {
                println!("{:<4} {:<32} {:<22} {:<22} {:>10}", "#", "TITLE", "COMPANY", "LOCATION", "POSTED");
                println!("{}", "-".repeat(94));
                for (i, job) in listings.iter().enumerate() {
                    let posted = job
                        .posted_at
                        .map(|dt| dt.format("%Y-%m-%d").to_string())
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{:<4} {:<32} {:<22} {:<22} {:>10}",
                        i + 1,
                        truncate(&job.title, 30),
                        truncate(&job.company, 20),
                        truncate(&job.location, 20),
                        posted
                    );
                }
            }
        }
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Recruiter", 20), "Recruiter");
        assert_eq!(truncate("Senior Talent Acquisition Partner", 12), "Senior Ta...");
        assert_eq!(truncate("Müller & Söhne GmbH", 8), "Mülle...");
    }

    #[test]
    fn test_fallback_filter_is_crate_info() {
        assert_eq!(fallback_filter().to_string(), "jobdigest=info");
    }

    #[test]
    fn test_cli_parses_dry_run() {
        let cli = Cli::try_parse_from(["jobdigest", "run", "--dry-run"]).unwrap();
        assert!(matches!(cli.command, Commands::Run { dry_run: true }));

        let cli = Cli::try_parse_from(["jobdigest", "schedule"]).unwrap();
        assert!(matches!(cli.command, Commands::Schedule));
    }
}
