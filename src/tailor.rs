use anyhow::{anyhow, Context, Result};
use tracing::warn;

use crate::ai::{parse_model_json, AIProvider};
use crate::models::{ContactSuggestion, Listing};

const TAILOR_MAX_TOKENS: u32 = 1500;
const CONTACTS_MAX_TOKENS: u32 = 600;
pub const CONTACTS_PER_JOB: usize = 2;

/// Rewrites the CV for one listing: reorder and emphasise, never invent.
pub fn tailor_cv(provider: &dyn AIProvider, cv: &str, job: &Listing) -> Result<String> {
    let prompt = format!(
        "You are an expert CV writer. Rewrite the candidate's CV to better match the job description below.\n\
        Keep the same structure but:\n\
        - Reorder and emphasise relevant experience and skills\n\
        - Use keywords from the job description naturally\n\
        - Keep it truthful, do not invent experience\n\
        - Output clean plain text, ready to copy-paste\n\n\
        JOB TITLE: {} at {}\n\
        JOB DESCRIPTION:\n{}\n\n\
        ORIGINAL CV:\n{}\n\n\
        Output the tailored CV only.",
        job.title, job.company, job.description, cv
    );

    let tailored = provider
        .complete(&prompt, TAILOR_MAX_TOKENS)
        .with_context(|| format!("CV tailoring failed for '{}' at {}", job.title, job.company))?;

    let tailored = tailored.trim();
    if tailored.is_empty() {
        return Err(anyhow!(
            "Model returned an empty CV for '{}' at {}",
            job.title,
            job.company
        ));
    }
    Ok(tailored.to_string())
}

/// Asks for two kinds of people to contact about a listing, with outreach templates.
pub fn suggest_contacts(
    provider: &dyn AIProvider,
    job: &Listing,
    preferences: &str,
) -> Result<Vec<ContactSuggestion>> {
    let prompt = format!(
        "For the job below, suggest {CONTACTS_PER_JOB} types of LinkedIn profiles the candidate should message\n\
        to get a referral or warm intro. For each, provide:\n\
        - profile_type: their likely job title\n\
        - why: 1 sentence on why they're valuable to contact\n\
        - search_tip: a LinkedIn search query to find them\n\
        - message_template: a 2-sentence outreach message template\n\n\
        JOB: {} at {} ({})\n\
        CANDIDATE PREFERENCES: {}\n\n\
        Return ONLY valid JSON array with {CONTACTS_PER_JOB} objects.",
        job.title, job.company, job.location, preferences
    );

    let response = provider
        .complete(&prompt, CONTACTS_MAX_TOKENS)
        .with_context(|| format!("Contact suggestion failed for '{}' at {}", job.title, job.company))?;

    let mut contacts: Vec<ContactSuggestion> = parse_model_json(&response)
        .with_context(|| format!("Could not parse contact suggestions for '{}'", job.title))?;

    if contacts.len() != CONTACTS_PER_JOB {
        warn!(
            job = %job.title,
            returned = contacts.len(),
            "Model returned an unexpected number of contact suggestions"
        );
    }
    contacts.truncate(CONTACTS_PER_JOB);
    Ok(contacts)
}
