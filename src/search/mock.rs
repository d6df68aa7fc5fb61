//! Deterministic in-memory search provider for tests and the demo binary.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{SearchProvider, SearchResult};

#[derive(Default)]
pub struct MockSearch {
    fixtures: Mutex<HashMap<String, Vec<SearchResult>>>,
}

impl MockSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results(self, query: impl Into<String>, results: Vec<SearchResult>) -> Self {
        self.fixtures.lock().unwrap().insert(query.into(), results);
        self
    }
}

#[async_trait]
impl SearchProvider for MockSearch {
    async fn search(&self, query: &str, max_results: usize) -> Vec<SearchResult> {
        let fixtures = self.fixtures.lock().unwrap();
        fixtures
            .get(query)
            .map(|v| v.iter().take(max_results).cloned().collect())
            .unwrap_or_default()
    }
}
