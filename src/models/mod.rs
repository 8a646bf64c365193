use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};

/// Outcome of the most recent scrape of a target
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeStatus {
    #[default]
    None,
    Success,
    Failed,
}

/// One monitored listing source, as stored in the registry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScrapeTarget {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub status: ScrapeStatus,
    #[serde(default)]
    pub information: Option<Value>,
    /// Fields owned by whoever manages the registry (ids, timestamps, ...),
    /// carried through rewrites untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ScrapeTarget {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            status: ScrapeStatus::None,
            information: None,
            extra: Map::new(),
        }
    }
}

/// What the orchestrator needs to plan a run: no payload, just the key and label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRef {
    pub url: String,
    pub title: Option<String>,
}

/// Status + payload written back to the registry for one URL
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeResult {
    pub status: ScrapeStatus,
    pub information: Option<Value>,
}

impl ScrapeResult {
    pub fn success(information: Value) -> Self {
        Self {
            status: ScrapeStatus::Success,
            information: Some(information),
        }
    }

    pub fn failed() -> Self {
        Self {
            status: ScrapeStatus::Failed,
            information: None,
        }
    }
}

/// Property information resolved from a page's embedded data.
///
/// Each variant corresponds to one known location of listing data in the
/// embedded blob, so the payload always comes from a recognized shape.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyInformation {
    /// `props.pageProps.component.searchResult`, projected
    SearchResult {
        listings: Value,
        api_token: Option<String>,
        total_results: Option<u64>,
    },
    /// `props.pageProps.component.listing`
    Listing(Value),
    /// `props.pageProps.searchResults`
    SearchResults(Value),
    /// `props.pageProps.initialState.listings`
    InitialStateListings(Value),
    /// `props.pageProps.dehydratedState.queries`
    DehydratedQueries(Value),
}

impl PropertyInformation {
    pub fn strategy_name(&self) -> &'static str {
        match self {
            PropertyInformation::SearchResult { .. } => "search_result",
            PropertyInformation::Listing(_) => "component_listing",
            PropertyInformation::SearchResults(_) => "search_results",
            PropertyInformation::InitialStateListings(_) => "initial_state_listings",
            PropertyInformation::DehydratedQueries(_) => "dehydrated_queries",
        }
    }

    /// The opaque JSON payload stored in the registry
    pub fn to_payload(&self) -> Value {
        match self {
            PropertyInformation::SearchResult {
                listings,
                api_token,
                total_results,
            } => json!({
                "listings": listings,
                "apiToken": api_token,
                "totalResults": total_results,
            }),
            PropertyInformation::Listing(value)
            | PropertyInformation::SearchResults(value)
            | PropertyInformation::InitialStateListings(value)
            | PropertyInformation::DehydratedQueries(value) => value.clone(),
        }
    }
}

/// A listing pin from a metro search page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListingPin {
    pub id: Value,
    #[serde(rename = "rentalId", deserialize_with = "string_or_number")]
    pub rental_id: String,
}

/// Rental ids show up both as strings and as bare numbers
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) if !s.is_empty() => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a non-empty string or number, got {}",
            other
        ))),
    }
}
