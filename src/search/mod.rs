//! Search adapter (§4.3).
//!
//! Grounded in the shape of the teacher's engine wrappers (`tools/search/engines/*.rs`),
//! reduced to the single operation the parent spec calls for: `search(query, max_results)`.

mod brave;
mod mock;

pub use brave::BraveSearch;
pub use mock::MockSearch;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

pub const INTER_QUERY_DELAY: Duration = Duration::from_millis(1_500);

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Issue one free-text query. Failure returns an empty sequence and logs; quote
    /// characters are stripped from the query before dispatch.
    async fn search(&self, query: &str, max_results: usize) -> Vec<SearchResult>;
}

/// Issues `queries` serially against `provider`, waiting [`INTER_QUERY_DELAY`] between
/// adjacent queries, and returns a mapping from each query string to its results.
pub async fn execute_searches(
    provider: &dyn SearchProvider,
    queries: &[String],
    per_query: usize,
) -> HashMap<String, Vec<SearchResult>> {
    let mut out = HashMap::with_capacity(queries.len());
    for (i, q) in queries.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(INTER_QUERY_DELAY).await;
        }
        let stripped = q.replace(['"', '\''], "");
        let results = provider.search(&stripped, per_query).await;
        out.insert(q.clone(), results);
    }
    out
}
