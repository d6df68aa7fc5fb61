//! Real search backend: the Brave Web Search REST API.
//!
//! The teacher crate scrapes rendered SERP HTML per engine (`tools/search/engines/brave.rs`);
//! this adapter targets Brave's JSON search API instead, since the parent spec calls for a
//! single `search(query, max_results)` operation rather than a multi-engine SERP-scraping
//! stack — a real HTTP JSON client is the idiomatic fit and avoids pulling in an HTML-parsing
//! dependency for a single call site.

use async_trait::async_trait;

use super::{SearchProvider, SearchResult};

const ENDPOINT: &str = "https://api.search.brave.com/res/v1/web/search";

pub struct BraveSearch {
    http: reqwest::Client,
    api_key: String,
}

impl BraveSearch {
    pub fn new(http: reqwest::Client, api_key: String) -> Self {
        Self { http, api_key }
    }
}

#[async_trait]
impl SearchProvider for BraveSearch {
    async fn search(&self, query: &str, max_results: usize) -> Vec<SearchResult> {
        let count = max_results.clamp(1, 20);
        let resp = self
            .http
            .get(ENDPOINT)
            .header("X-Subscription-Token", &self.api_key)
            .header("Accept", "application/json")
            .query(&[("q", query), ("count", &count.to_string())])
            .send()
            .await;

        let resp = match resp {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::warn!(status = %r.status(), %query, "search request failed");
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!(error = %e, %query, "search request errored");
                return Vec::new();
            }
        };

        let body: serde_json::Value = match resp.json().await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, %query, "search response was not JSON");
                return Vec::new();
            }
        };

        body.get("web")
            .and_then(|w| w.get("results"))
            .and_then(|r| r.as_array())
            .map(|arr| {
                arr.iter()
                    .take(max_results)
                    .filter_map(|v| {
                        let url = v.get("url")?.as_str()?.to_string();
                        let title = v.get("title").and_then(|t| t.as_str()).unwrap_or_default().to_string();
                        let snippet = v
                            .get("description")
                            .and_then(|d| d.as_str())
                            .unwrap_or_default()
                            .to_string();
                        Some(SearchResult { title, url, snippet })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}
