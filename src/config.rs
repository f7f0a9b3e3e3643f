use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::time::Duration;

/// A single (keywords, location) pair to query the listing API with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSpec {
    pub keywords: String,
    pub location: String,
}

impl SearchSpec {
    pub fn new(keywords: &str, location: &str) -> Self {
        Self {
            keywords: keywords.to_string(),
            location: location.to_string(),
        }
    }
}

const DEFAULT_SEARCHES: [(&str, &str); 3] = [
    ("HR People Operations Marketing", "Milan Italy"),
    ("Talent Acquisition Content", "Milan Italy"),
    ("HR Marketing remote", "Europe"),
];

pub const DEFAULT_SCHEDULE: &str = "0 0 8 * * MON-FRI";

/// Runtime configuration, built once at startup and passed down by reference.
#[derive(Debug, Clone)]
pub struct Config {
    pub rapidapi_key: String,
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub model: String,
    pub cv_path: PathBuf,
    pub preferences_path: PathBuf,
    pub searches: Vec<SearchSpec>,
    pub results_per_search: usize,
    pub search_pause: Duration,
    pub schedule: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let searches = match optional_env("JOB_SEARCHES") {
            Some(raw) => parse_searches(&raw)?,
            None => default_searches(),
        };

        Ok(Config {
            rapidapi_key: require_env("RAPIDAPI_KEY")?,
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            openai_api_key: optional_env("OPENAI_API_KEY"),
            model: optional_env("LLM_MODEL").unwrap_or_else(|| "sonnet".to_string()),
            cv_path: PathBuf::from(optional_env("CV_PATH").unwrap_or_else(|| "cv.txt".to_string())),
            preferences_path: PathBuf::from(
                optional_env("PREFERENCES_PATH").unwrap_or_else(|| "preferences.txt".to_string()),
            ),
            searches,
            results_per_search: parse_env("RESULTS_PER_SEARCH", 15)?,
            search_pause: Duration::from_secs(parse_env("SEARCH_PAUSE_SECS", 5)?),
            schedule: optional_env("DIGEST_SCHEDULE").unwrap_or_else(|| DEFAULT_SCHEDULE.to_string()),
        })
    }
}

/// Mail relay settings. Loaded separately so a dry run needs no mail credentials.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    pub to: String,
}

impl SmtpConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let username = require_env("SMTP_USER")?;
        Ok(SmtpConfig {
            host: optional_env("SMTP_HOST").unwrap_or_else(|| "smtp.gmail.com".to_string()),
            port: parse_env("SMTP_PORT", 587)?,
            password: require_env("SMTP_PASSWORD")?,
            from: optional_env("FROM_EMAIL").unwrap_or_else(|| username.clone()),
            to: require_env("TO_EMAIL")?,
            username,
        })
    }
}

pub fn default_searches() -> Vec<SearchSpec> {
    DEFAULT_SEARCHES
        .iter()
        .map(|(keywords, location)| SearchSpec::new(keywords, location))
        .collect()
}

/// Parses `keywords|location;keywords|location` into search pairs.
pub fn parse_searches(raw: &str) -> Result<Vec<SearchSpec>> {
    let mut searches = Vec::new();

    for entry in raw.split(';') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }

        let (keywords, location) = entry
            .split_once('|')
            .ok_or_else(|| anyhow!("Search '{}' must look like 'keywords|location'", entry))?;
        let (keywords, location) = (keywords.trim(), location.trim());
        if keywords.is_empty() || location.is_empty() {
            return Err(anyhow!("Search '{}' has an empty keywords or location part", entry));
        }

        searches.push(SearchSpec::new(keywords, location));
    }

    if searches.is_empty() {
        return Err(anyhow!("JOB_SEARCHES is set but contains no searches"));
    }
    Ok(searches)
}

fn require_env(key: &str) -> Result<String> {
    optional_env(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_searches() {
        let searches = default_searches();
        assert_eq!(searches.len(), 3);
        assert_eq!(searches[0], SearchSpec::new("HR People Operations Marketing", "Milan Italy"));
        assert_eq!(searches[2].location, "Europe");
    }

    #[test]
    fn test_parse_searches() {
        let searches = parse_searches("Rust developer | Berlin; Platform engineer|Remote ;").unwrap();
        assert_eq!(
            searches,
            vec![
                SearchSpec::new("Rust developer", "Berlin"),
                SearchSpec::new("Platform engineer", "Remote"),
            ]
        );
    }

    #[test]
    fn test_parse_searches_rejects_missing_location() {
        let err = parse_searches("Rust developer").unwrap_err();
        assert!(err.to_string().contains("keywords|location"));

        assert!(parse_searches("Rust developer|  ").is_err());
        assert!(parse_searches(" ; ").is_err());
    }
}
