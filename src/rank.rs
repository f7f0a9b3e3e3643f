use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::ai::{parse_model_json, AIProvider};
use crate::models::{Listing, RankedListing};

pub const MAX_SELECTED: usize = 10;
const RANKING_MAX_TOKENS: u32 = 1000;

#[derive(Debug, Deserialize)]
struct RankingEntry {
    index: i64,
    score: f64,
    #[serde(default)]
    reason: String,
}

fn ranking_prompt(listings: &[Listing], cv: &str, preferences: &str) -> String {
    let job_list = listings
        .iter()
        .enumerate()
        .map(|(i, job)| {
            format!(
                "[JOB {}]\nTitle: {}\nCompany: {}\nLocation: {}\nURL: {}\nDescription: {}",
                i + 1,
                job.title,
                job.company,
                job.location,
                job.url,
                job.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are a career advisor. Based on the CV and job preferences below,\n\
        select and rank the TOP {MAX_SELECTED} most relevant jobs from the list.\n\
        Return ONLY a JSON array of objects with keys: index (1-based from the list), score (0-100), reason (1 sentence).\n\n\
        CV:\n{cv}\n\n\
        PREFERENCES:\n{preferences}\n\n\
        JOBS:\n{job_list}\n\n\
        Return ONLY valid JSON, no other text."
    )
}

/// Asks the model to score every listing against the CV and preferences, and
/// returns at most ten of them, best first. Makes no call for an empty set.
pub fn select_top_jobs(
    provider: &dyn AIProvider,
    listings: &[Listing],
    cv: &str,
    preferences: &str,
) -> Result<Vec<RankedListing>> {
    if listings.is_empty() {
        return Ok(Vec::new());
    }

    let prompt = ranking_prompt(listings, cv, preferences);
    let response = provider
        .complete(&prompt, RANKING_MAX_TOKENS)
        .context("Ranking request failed")?;
    let entries: Vec<RankingEntry> =
        parse_model_json(&response).context("Could not parse ranking response")?;
    debug!(entries = entries.len(), "Ranking response parsed");

    Ok(select_ranked(entries, listings))
}

fn select_ranked(entries: Vec<RankingEntry>, listings: &[Listing]) -> Vec<RankedListing> {
    let mut valid: Vec<(RankingEntry, &Listing)> = entries
        .into_iter()
        .filter_map(|entry| {
            let listing = usize::try_from(entry.index)
                .ok()
                .and_then(|i| i.checked_sub(1))
                .and_then(|i| listings.get(i));
            if listing.is_none() {
                warn!(
                    index = entry.index,
                    listings = listings.len(),
                    "Skipping ranking entry with out-of-range index"
                );
            }
            listing.map(|listing| (entry, listing))
        })
        .collect();

    valid.sort_by(|(a, _), (b, _)| b.score.total_cmp(&a.score));
    valid.truncate(MAX_SELECTED);

    valid
        .into_iter()
        .map(|(entry, listing)| RankedListing {
            listing: listing.clone(),
            score: entry.score.clamp(0.0, 100.0).round() as u8,
            reason: entry.reason.trim().to_string(),
        })
        .collect()
}
