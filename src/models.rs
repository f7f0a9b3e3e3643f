use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

pub const DESCRIPTION_MAX_CHARS: usize = 3000;

/// A listing exactly as the search provider returned it. Any field may be
/// missing or have an unexpected type.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct RawListing(pub Map<String, Value>);

impl RawListing {
    /// Returns a non-empty string field, treating other types as missing.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Key used to drop duplicates across searches: provider id, then apply link.
    pub fn identity_key(&self) -> String {
        self.key_part("job_id")
            .or_else(|| self.key_part("job_apply_link"))
            .unwrap_or_default()
    }

    // Providers may send ids as numbers.
    fn key_part(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub title: String,
    pub company: String,
    pub location: String,
    pub url: String,
    pub description: String,
    pub posted_at: Option<DateTime<Utc>>,
}

impl Listing {
    pub fn from_raw(raw: &RawListing) -> Self {
        let location = [raw.field("job_city"), raw.field("job_country")]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            title: raw.field("job_title").unwrap_or("Unknown").to_string(),
            company: raw.field("employer_name").unwrap_or("Unknown").to_string(),
            location: if location.is_empty() { "Unknown".to_string() } else { location },
            url: raw
                .field("job_apply_link")
                .or_else(|| raw.field("job_google_link"))
                .unwrap_or_default()
                .to_string(),
            description: raw
                .field("job_description")
                .unwrap_or_default()
                .chars()
                .take(DESCRIPTION_MAX_CHARS)
                .collect(),
            posted_at: raw
                .field("job_posted_at_datetime_utc")
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedListing {
    pub listing: Listing,
    pub score: u8, // 0-100
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContactSuggestion {
    pub profile_type: String,
    pub why: String,
    pub search_tip: String,
    pub message_template: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TailoredResult {
    pub ranked: RankedListing,
    pub tailored_cv: String,
    pub contacts: Vec<ContactSuggestion>,
}
