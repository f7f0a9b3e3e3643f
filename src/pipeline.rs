use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use std::fs;
use std::path::Path;
use std::thread;
use tracing::{info, warn};

use crate::ai::AIProvider;
use crate::config::Config;
use crate::digest::{render_digest, subject_line};
use crate::email::Mailer;
use crate::models::{Listing, TailoredResult};
use crate::rank::select_top_jobs;
use crate::search::{fetch_listings, Deduplicator, SearchApi};
use crate::tailor::{suggest_contacts, tailor_cv};

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    NoListings,
    NoMatches,
    Sent { jobs: usize },
    Rendered { jobs: usize, html: String },
}

pub struct Pipeline {
    config: Config,
    search: Box<dyn SearchApi>,
    provider: Box<dyn AIProvider>,
    mailer: Option<Box<dyn Mailer>>,
}

/// Runs every configured search and returns the unique listings, normalized.
pub fn collect_listings(search: &dyn SearchApi, config: &Config) -> Vec<Listing> {
    let mut dedup = Deduplicator::new();

    for (i, spec) in config.searches.iter().enumerate() {
        if i > 0 && !config.search_pause.is_zero() {
            thread::sleep(config.search_pause);
        }
        info!("Searching: '{}' in '{}'", spec.keywords, spec.location);
        let batch = fetch_listings(search, &spec.keywords, &spec.location, config.results_per_search);
        let added = dedup.extend(batch);
        info!(added, "Search complete");
    }

    info!("Fetched {} unique raw jobs across all searches", dedup.unique_count());
    dedup.into_listings().iter().map(Listing::from_raw).collect()
}

fn load_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

impl Pipeline {
    /// Without a mailer every run is a dry run that returns the rendered digest.
    pub fn new(
        config: Config,
        search: Box<dyn SearchApi>,
        provider: Box<dyn AIProvider>,
        mailer: Option<Box<dyn Mailer>>,
    ) -> Self {
        Self {
            config,
            search,
            provider,
            mailer,
        }
    }

    pub fn run(&self) -> Result<RunOutcome> {
        self.run_on(Local::now().date_naive())
    }

    pub fn run_on(&self, date: NaiveDate) -> Result<RunOutcome> {
        info!(model = self.provider.model_name(), "Job digest run starting");
        let cv = load_text(&self.config.cv_path)?;
        let preferences = load_text(&self.config.preferences_path)?;

        let listings = collect_listings(self.search.as_ref(), &self.config);
        if listings.is_empty() {
            warn!("No listings found today. Skipping email.");
            return Ok(RunOutcome::NoListings);
        }

        let top_jobs = select_top_jobs(self.provider.as_ref(), &listings, &cv, &preferences)?;
        info!("Selected {} top jobs", top_jobs.len());
        if top_jobs.is_empty() {
            warn!("No matching jobs found today. Skipping email.");
            return Ok(RunOutcome::NoMatches);
        }

        let total = top_jobs.len();
        let mut results = Vec::with_capacity(total);
        for (i, ranked) in top_jobs.into_iter().enumerate() {
            let job = &ranked.listing;
            info!("Tailoring CV for job {}/{}: {} @ {}", i + 1, total, job.title, job.company);
            let tailored_cv = tailor_cv(self.provider.as_ref(), &cv, job)?;
            info!("Getting contacts for job {}/{}", i + 1, total);
            let contacts = suggest_contacts(self.provider.as_ref(), job, &preferences)?;
            results.push(TailoredResult {
                ranked,
                tailored_cv,
                contacts,
            });
        }

        let html = render_digest(&results, date);

        match &self.mailer {
            Some(mailer) => {
                mailer.send(&subject_line(date), &html)?;
                info!("Done, digest with {} jobs sent", total);
                Ok(RunOutcome::Sent { jobs: total })
            }
            None => Ok(RunOutcome::Rendered { jobs: total, html }),
        }
    }
}
