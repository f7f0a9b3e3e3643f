use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, error};

use crate::models::RawListing;

const JSEARCH_URL: &str = "https://jsearch.p.rapidapi.com/search";
const JSEARCH_HOST: &str = "jsearch.p.rapidapi.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(40);

/// Date filters tried in order, most recent first.
pub const DATE_TIERS: [&str; 2] = ["3days", "week"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub keywords: String,
    pub location: String,
    pub date_posted: String,
}

impl SearchQuery {
    fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("query", format!("{} jobs", self.keywords)),
            ("page", "1".to_string()),
            ("num_pages", "2".to_string()),
            ("date_posted", self.date_posted.clone()),
            ("employment_types", "FULLTIME,PARTTIME,CONTRACTOR".to_string()),
            ("location", self.location.clone()),
            ("radius", "100".to_string()),
        ]
    }
}

pub trait SearchApi: Send + Sync {
    fn search(&self, query: &SearchQuery) -> Result<Vec<RawListing>>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<RawListing>,
}

/// JSearch listing API on RapidAPI.
#[derive(Debug)]
pub struct JSearchClient {
    api_key: String,
    client: reqwest::blocking::Client,
}

impl JSearchClient {
    pub fn new(api_key: String) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client for listing search")?;
        Ok(Self { api_key, client })
    }
}

impl SearchApi for JSearchClient {
    fn search(&self, query: &SearchQuery) -> Result<Vec<RawListing>> {
        let response = self
            .client
            .get(JSEARCH_URL)
            .header("X-RapidAPI-Key", &self.api_key)
            .header("X-RapidAPI-Host", JSEARCH_HOST)
            .query(&query.params())
            .send()
            .context("Failed to send request to listing search API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(anyhow!(
                "Listing search failed with status {}: {}",
                status,
                error_text
            ));
        }

        let body: SearchResponse = response
            .json()
            .context("Failed to parse listing search response")?;
        Ok(body.data)
    }
}

/// Fetches listings for one (keywords, location) pair, widening the date
/// filter once if the recent tier is empty. Errors end the pair with no results.
pub fn fetch_listings(
    api: &dyn SearchApi,
    keywords: &str,
    location: &str,
    limit: usize,
) -> Vec<RawListing> {
    for date_posted in DATE_TIERS {
        let query = SearchQuery {
            keywords: keywords.to_string(),
            location: location.to_string(),
            date_posted: date_posted.to_string(),
        };

        let mut listings = match api.search(&query) {
            Ok(listings) => listings,
            Err(e) => {
                error!(keywords, location, date_posted, "Job fetch error: {:#}", e);
                return Vec::new();
            }
        };

        debug!(keywords, location, date_posted, count = listings.len(), "Search tier returned");
        if !listings.is_empty() {
            listings.truncate(limit);
            return listings;
        }
    }

    Vec::new()
}

/// Run-scoped set of listings, keeping the first occurrence of each identity key.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
    listings: Vec<RawListing>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a batch in arrival order and returns how many were new.
    pub fn extend(&mut self, batch: impl IntoIterator<Item = RawListing>) -> usize {
        let before = self.listings.len();
        for listing in batch {
            if self.seen.insert(listing.identity_key()) {
                self.listings.push(listing);
            }
        }
        self.listings.len() - before
    }

    pub fn unique_count(&self) -> usize {
        self.listings.len()
    }

    pub fn into_listings(self) -> Vec<RawListing> {
        self.listings
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    pub(crate) fn raw(id: &str, title: &str) -> RawListing {
        serde_json::from_value(json!({
            "job_id": id,
            "job_title": title,
            "employer_name": format!("{title} Co"),
            "job_apply_link": format!("https://jobs.example/{id}"),
        }))
        .unwrap()
    }

    /// Canned responses keyed by (keywords, date_posted); anything else is empty.
    #[derive(Default)]
    pub(crate) struct FakeSearch {
        pub responses: HashMap<(String, String), Result<Vec<RawListing>, String>>,
        pub calls: Mutex<Vec<SearchQuery>>,
    }

    impl FakeSearch {
        pub fn with(mut self, keywords: &str, date_posted: &str, listings: Vec<RawListing>) -> Self {
            self.responses
                .insert((keywords.to_string(), date_posted.to_string()), Ok(listings));
            self
        }

        pub fn failing(mut self, keywords: &str, date_posted: &str) -> Self {
            self.responses.insert(
                (keywords.to_string(), date_posted.to_string()),
                Err("connection reset".to_string()),
            );
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl SearchApi for FakeSearch {
        fn search(&self, query: &SearchQuery) -> Result<Vec<RawListing>> {
            self.calls.lock().unwrap().push(query.clone());
            match self
                .responses
                .get(&(query.keywords.clone(), query.date_posted.clone()))
            {
                Some(Ok(listings)) => Ok(listings.clone()),
                Some(Err(msg)) => Err(anyhow!(msg.clone())),
                None => Ok(Vec::new()),
            }
        }
    }

    #[test]
    fn test_query_params() {
        let query = SearchQuery {
            keywords: "HR Marketing remote".to_string(),
            location: "Europe".to_string(),
            date_posted: "week".to_string(),
        };
        let params: HashMap<_, _> = query.params().into_iter().collect();
        assert_eq!(params["query"], "HR Marketing remote jobs");
        assert_eq!(params["date_posted"], "week");
        assert_eq!(params["location"], "Europe");
        assert_eq!(params["num_pages"], "2");
        assert_eq!(params["radius"], "100");
    }

    #[test]
    fn test_fetch_uses_recent_tier_when_it_has_results() {
        let api = FakeSearch::default()
            .with("hr", "3days", vec![raw("1", "A")])
            .with("hr", "week", vec![raw("2", "B")]);

        let listings = fetch_listings(&api, "hr", "Milan", 15);
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].identity_key(), "1");
        assert_eq!(api.call_count(), 1);
    }

    #[test]
    fn test_fetch_falls_back_to_wider_tier() {
        let api = FakeSearch::default().with("hr", "week", vec![raw("2", "B")]);

        let listings = fetch_listings(&api, "hr", "Milan", 15);
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].identity_key(), "2");

        let calls = api.calls.lock().unwrap();
        let tiers: Vec<_> = calls.iter().map(|q| q.date_posted.as_str()).collect();
        assert_eq!(tiers, vec!["3days", "week"]);
    }

    #[test]
    fn test_fetch_truncates_to_limit() {
        let batch = (0..20).map(|i| raw(&i.to_string(), "T")).collect();
        let api = FakeSearch::default().with("hr", "3days", batch);

        assert_eq!(fetch_listings(&api, "hr", "Milan", 15).len(), 15);
    }

    #[test]
    fn test_fetch_error_returns_empty_without_wider_tier() {
        let api = FakeSearch::default()
            .failing("hr", "3days")
            .with("hr", "week", vec![raw("2", "B")]);

        assert!(fetch_listings(&api, "hr", "Milan", 15).is_empty());
        assert_eq!(api.call_count(), 1);
    }

    #[test]
    fn test_fetch_both_tiers_empty() {
        let api = FakeSearch::default();
        assert!(fetch_listings(&api, "hr", "Milan", 15).is_empty());
        assert_eq!(api.call_count(), 2);
    }

    #[test]
    fn test_dedup_preserves_first_seen_order() {
        let mut dedup = Deduplicator::new();
        assert_eq!(dedup.extend(vec![raw("1", "first"), raw("2", "B"), raw("1", "again")]), 2);
        assert_eq!(dedup.extend(vec![raw("3", "C"), raw("2", "B again")]), 1);

        let listings = dedup.into_listings();
        let keys: Vec<_> = listings.iter().map(|l| l.identity_key()).collect();
        assert_eq!(keys, vec!["1", "2", "3"]);
        assert_eq!(listings[0].field("job_title"), Some("first"));
    }

    #[test]
    fn test_dedup_never_emits_duplicate_keys() {
        let mut dedup = Deduplicator::new();
        let ids = ["a", "b", "a", "c", "b", "b", "d", "a"];
        dedup.extend(ids.iter().map(|id| raw(id, "T")));

        let keys: Vec<_> = dedup.into_listings().iter().map(|l| l.identity_key()).collect();
        let unique: HashSet<_> = keys.iter().collect();
        assert_eq!(keys.len(), unique.len());
        assert_eq!(keys, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_dedup_keeps_distinct_numeric_ids() {
        let numeric = |id: u64| -> RawListing {
            serde_json::from_value(json!({ "job_id": id, "job_title": "T" })).unwrap()
        };
        let mut dedup = Deduplicator::new();
        assert_eq!(dedup.extend(vec![numeric(101), numeric(202), numeric(101)]), 2);

        let keys: Vec<_> = dedup.into_listings().iter().map(|l| l.identity_key()).collect();
        assert_eq!(keys, vec!["101", "202"]);
    }
}
