//! Locates property information in the embedded data blob.
//!
//! The listing site moves its data around between releases, so resolution
//! tries a fixed, ordered list of known locations. The first one present wins,
//! even when a later one would also match. Unknown shapes resolve to nothing.

use crate::models::PropertyInformation;
use serde_json::Value;
use tracing::{debug, warn};

pub(crate) const SEARCH_RESULT_PATH: &[&str] = &["props", "pageProps", "component", "searchResult"];
pub(crate) const API_TOKEN_PATH: &[&str] = &["runtimeConfig", "al_api_token_desktop"];

type Strategy = fn(&Value) -> Option<PropertyInformation>;

/// Resolution strategies in confidence order
const STRATEGIES: &[(&str, Strategy)] = &[
    ("search_result", search_result),
    ("component_listing", component_listing),
    ("search_results", search_results),
    ("initial_state_listings", initial_state_listings),
    ("dehydrated_queries", dehydrated_queries),
];

/// Walk `path` key by key. A JSON `null` at the end counts as absent.
pub(crate) fn lookup<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(root, |value, key| value.get(*key))
        .filter(|value| !value.is_null())
}

fn search_result(root: &Value) -> Option<PropertyInformation> {
    let result = lookup(root, SEARCH_RESULT_PATH)?;

    Some(PropertyInformation::SearchResult {
        listings: result
            .get("listings")
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new())),
        api_token: lookup(root, API_TOKEN_PATH)
            .and_then(Value::as_str)
            .map(str::to_string),
        total_results: result.get("totalResults").and_then(Value::as_u64),
    })
}

fn component_listing(root: &Value) -> Option<PropertyInformation> {
    lookup(root, &["props", "pageProps", "component", "listing"])
        .cloned()
        .map(PropertyInformation::Listing)
}

fn search_results(root: &Value) -> Option<PropertyInformation> {
    lookup(root, &["props", "pageProps", "searchResults"])
        .cloned()
        .map(PropertyInformation::SearchResults)
}

fn initial_state_listings(root: &Value) -> Option<PropertyInformation> {
    lookup(root, &["props", "pageProps", "initialState", "listings"])
        .cloned()
        .map(PropertyInformation::InitialStateListings)
}

fn dehydrated_queries(root: &Value) -> Option<PropertyInformation> {
    lookup(root, &["props", "pageProps", "dehydratedState", "queries"])
        .cloned()
        .map(PropertyInformation::DehydratedQueries)
}

/// Resolve already-parsed embedded data
pub fn resolve_value(root: &Value) -> Option<PropertyInformation> {
    STRATEGIES.iter().find_map(|(name, strategy)| {
        let info = strategy(root)?;
        debug!("Resolved property information via {}", name);
        Some(info)
    })
}

/// Parse and resolve embedded data text. Unparseable text resolves to `None`.
pub fn resolve(blob: &str) -> Option<PropertyInformation> {
    match serde_json::from_str::<Value>(blob) {
        Ok(root) => resolve_value(&root),
        Err(e) => {
            warn!("Embedded data is not valid JSON: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn primary_path_is_projected() {
        let blob = json!({
            "props": {"pageProps": {"component": {"searchResult": {
                "listings": [{"id": 7, "price": 2100}],
                "totalResults": 1,
                "listingPins": []
            }}}},
            "runtimeConfig": {"al_api_token_desktop": "tok-123"}
        })
        .to_string();

        let info = resolve(&blob).unwrap();
        assert_eq!(
            info,
            PropertyInformation::SearchResult {
                listings: json!([{"id": 7, "price": 2100}]),
                api_token: Some("tok-123".to_string()),
                total_results: Some(1),
            }
        );
    }

    #[test]
    fn fallback_paths_are_tried_in_order() {
        let blob = json!({"props": {"pageProps": {
            "searchResults": {"first": true},
            "initialState": {"listings": [1, 2]},
        }}})
        .to_string();

        assert_eq!(
            resolve(&blob),
            Some(PropertyInformation::SearchResults(json!({"first": true})))
        );
    }

    #[test]
    fn earlier_path_wins_over_later_one() {
        let blob = json!({"props": {"pageProps": {
            "component": {"listing": {"name": "The Aster"}},
            "dehydratedState": {"queries": [{"state": {}}]},
        }}})
        .to_string();

        let info = resolve(&blob).unwrap();
        assert_eq!(info.strategy_name(), "component_listing");
        assert_eq!(info.to_payload(), json!({"name": "The Aster"}));
    }

    #[test]
    fn null_values_do_not_match() {
        let blob = json!({"props": {"pageProps": {
            "component": {"searchResult": null, "listing": null},
            "dehydratedState": {"queries": []},
        }}})
        .to_string();

        assert_eq!(
            resolve(&blob),
            Some(PropertyInformation::DehydratedQueries(json!([])))
        );
    }

    #[test]
    fn unknown_shape_is_not_found() {
        let blob = json!({"props": {"pageProps": {"somethingElse": {"listings": [1]}}}}).to_string();
        assert_eq!(resolve(&blob), None);
    }

    #[test]
    fn invalid_or_empty_text_is_not_found() {
        assert_eq!(resolve(""), None);
        assert_eq!(resolve("{not json"), None);
    }

    #[test]
    fn traversal_does_not_index_into_arrays() {
        let root = json!({"props": [{"pageProps": {}}]});
        assert!(lookup(&root, &["props", "pageProps"]).is_none());
    }

    #[test]
    fn resolution_is_deterministic() {
        let blob = json!({"props": {"pageProps": {"initialState": {"listings": [{"a": 1}]}}}})
            .to_string();
        assert_eq!(resolve(&blob), resolve(&blob));
    }
}
