//! Per-session research accumulator (§3, §4.6).
//!
//! Ported from `backend/services/context_state.py`'s field set and setter/getter contract,
//! with the registry's wire representation pinned by `to_dict`/`from_dict` there
//! (`source_registry` keys are strings on the wire, integers in memory).

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::search::SearchResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dossier {
    pub point: String,
    pub dossier: String,
    pub sources: Vec<String>,
    pub point_number: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressSummary {
    pub session_id: String,
    pub session_title: String,
    pub current_step: u8,
    pub queries_count: usize,
    pub urls_count: usize,
    pub plan_points_count: usize,
    pub dossiers_completed: usize,
    pub total_sources: usize,
    pub total_learnings: usize,
}

/// Wire-format mirror of [`ContextState`]; `source_registry` keys are strings here and
/// integers in the in-memory form, matching the original's `to_dict`/`from_dict`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ContextStateWire {
    session_id: String,
    #[serde(default)]
    session_title: String,
    #[serde(default)]
    original_query: String,
    #[serde(default)]
    current_step: u8,
    #[serde(default)]
    queries: Vec<String>,
    #[serde(default)]
    urls: Vec<String>,
    #[serde(default)]
    search_results: HashMap<String, Vec<SearchResult>>,
    #[serde(default)]
    clarification_questions: Vec<String>,
    #[serde(default)]
    clarification_answers: Vec<String>,
    #[serde(default)]
    plan_points: Vec<String>,
    #[serde(default)]
    plan_version: u32,
    #[serde(default)]
    dossiers: Vec<Dossier>,
    #[serde(default)]
    key_learnings: Vec<String>,
    #[serde(default)]
    source_registry: BTreeMap<String, String>,
    #[serde(default = "default_source_counter")]
    source_counter: u32,
    #[serde(default = "default_language")]
    language: String,
    #[serde(default)]
    academic_mode: bool,
}

fn default_source_counter() -> u32 {
    1
}

fn default_language() -> String {
    "en".to_string()
}

#[derive(Debug, Clone)]
pub struct ContextState {
    pub session_id: String,
    pub session_title: String,
    pub original_query: String,
    pub current_step: u8,

    pub queries: Vec<String>,

    pub urls: Vec<String>,
    pub search_results: HashMap<String, Vec<SearchResult>>,

    pub clarification_questions: Vec<String>,
    pub clarification_answers: Vec<String>,

    pub plan_points: Vec<String>,
    pub plan_version: u32,

    pub dossiers: Vec<Dossier>,
    pub key_learnings: Vec<String>,

    pub source_registry: BTreeMap<u32, String>,
    pub source_counter: u32,

    pub language: String,
    pub academic_mode: bool,
}

impl Default for ContextState {
    fn default() -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            session_title: String::new(),
            original_query: String::new(),
            current_step: 0,
            queries: Vec::new(),
            urls: Vec::new(),
            search_results: HashMap::new(),
            clarification_questions: Vec::new(),
            clarification_answers: Vec::new(),
            plan_points: Vec::new(),
            plan_version: 0,
            dossiers: Vec::new(),
            key_learnings: Vec::new(),
            source_registry: BTreeMap::new(),
            source_counter: 1,
            language: "en".to_string(),
            academic_mode: false,
        }
    }
}

impl ContextState {
    pub fn new() -> Self {
        Self::default()
    }

    // === SETTERS ===

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.original_query = query.into();
        tracing::debug!(query = %self.original_query, "set original query");
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.session_title = title.into();
        tracing::debug!(title = %self.session_title, "set session title");
    }

    pub fn set_queries(&mut self, queries: Vec<String>) {
        tracing::debug!(count = queries.len(), "set search queries");
        self.queries = queries;
    }

    pub fn set_urls(&mut self, urls: Vec<String>) {
        tracing::debug!(count = urls.len(), "set selected urls");
        self.urls = urls;
    }

    pub fn set_search_results(&mut self, results: HashMap<String, Vec<SearchResult>>) {
        let total: usize = results.values().map(|v| v.len()).sum();
        tracing::debug!(queries = results.len(), results = total, "set search results");
        self.search_results = results;
    }

    pub fn add_clarification(&mut self, questions: Vec<String>) {
        tracing::debug!(count = questions.len(), "added clarification questions");
        self.clarification_questions = questions;
    }

    pub fn add_answers(&mut self, answers: Vec<String>) {
        tracing::debug!(count = answers.len(), "added user answers");
        self.clarification_answers = answers;
    }

    /// Replaces the plan, incrementing `plan_version`.
    pub fn set_plan(&mut self, plan_points: Vec<String>) {
        self.plan_points = plan_points;
        self.plan_version += 1;
        tracing::debug!(version = self.plan_version, points = self.plan_points.len(), "set research plan");
    }

    // === KEY LEARNINGS (append-only) ===

    pub fn update_key_learnings(&mut self, learnings: &[String]) {
        for l in learnings {
            let trimmed = l.trim();
            if !trimmed.is_empty() {
                self.key_learnings.push(trimmed.to_string());
            }
        }
    }

    pub fn get_previous_learnings(&self, limit: usize) -> String {
        if self.key_learnings.is_empty() {
            return "None yet".to_string();
        }
        let start = self.key_learnings.len().saturating_sub(limit);
        self.key_learnings[start..].iter().map(|l| format!("- {l}")).collect::<Vec<_>>().join("\n")
    }

    pub fn get_all_learnings(&self) -> Vec<String> {
        self.key_learnings.clone()
    }

    // === SOURCE REGISTRY ===

    /// Registers URLs into the global citation registry, preserving dedup: re-registering an
    /// already-known URL reuses its existing number. Returns the mapping for exactly the
    /// URLs provided (new or existing).
    pub fn register_sources(&mut self, urls: &[String]) -> BTreeMap<u32, String> {
        let mut out = BTreeMap::new();
        for url in urls {
            let existing = self.source_registry.iter().find(|(_, u)| *u == url).map(|(n, _)| *n);
            let n = match existing {
                Some(n) => n,
                None => {
                    let n = self.source_counter;
                    self.source_registry.insert(n, url.clone());
                    self.source_counter += 1;
                    n
                }
            };
            out.insert(n, url.clone());
        }
        tracing::debug!(new = out.len(), total = self.source_registry.len(), "registered sources");
        out
    }

    pub fn get_source_url(&self, citation_num: u32) -> Option<&str> {
        self.source_registry.get(&citation_num).map(|s| s.as_str())
    }

    pub fn get_all_sources(&self) -> BTreeMap<u32, String> {
        self.source_registry.clone()
    }

    // === DOSSIER MANAGEMENT ===

    pub fn add_dossier(&mut self, point: impl Into<String>, dossier_text: impl Into<String>, sources: Vec<String>, learnings: &[String]) {
        let point_number = self.dossiers.len() + 1;
        self.dossiers.push(Dossier { point: point.into(), dossier: dossier_text.into(), sources: sources.clone(), point_number });
        self.register_sources(&sources);
        self.update_key_learnings(learnings);
    }

    // === LLM FORMATTING ===

    /// Emits named sections in fixed order, omitting any whose underlying collection is
    /// empty (§4.6, invariant 8 in §8).
    pub fn format_for_llm(&self) -> String {
        let mut lines = Vec::new();

        lines.push("=== YOUR TASK ===".to_string());
        lines.push(self.original_query.clone());
        lines.push(String::new());

        if !self.queries.is_empty() {
            lines.push("=== SEARCH QUERIES ===".to_string());
            for (i, q) in self.queries.iter().enumerate() {
                lines.push(format!("{}. {}", i + 1, q));
            }
            lines.push(String::new());
        }

        if !self.urls.is_empty() {
            lines.push("=== SELECTED SOURCES ===".to_string());
            for (i, u) in self.urls.iter().enumerate() {
                lines.push(format!("{}. {}", i + 1, u));
            }
            lines.push(String::new());
        }

        if !self.clarification_questions.is_empty() {
            lines.push("=== FOLLOW-UP QUESTIONS ===".to_string());
            for (i, q) in self.clarification_questions.iter().enumerate() {
                lines.push(format!("{}. {}", i + 1, q));
            }
            lines.push(String::new());
        }

        if !self.clarification_answers.is_empty() {
            lines.push("=== USER ANSWERS ===".to_string());
            for (i, a) in self.clarification_answers.iter().enumerate() {
                lines.push(format!("{}. {}", i + 1, a));
            }
            lines.push(String::new());
        }

        if !self.plan_points.is_empty() {
            lines.push(format!("=== RESEARCH PLAN (v{}) ===", self.plan_version));
            for (i, p) in self.plan_points.iter().enumerate() {
                lines.push(format!("({}) {}", i + 1, p));
            }
            lines.push(String::new());
        }

        if !self.key_learnings.is_empty() {
            lines.push("=== KEY LEARNINGS ===".to_string());
            let start = self.key_learnings.len().saturating_sub(5);
            for l in &self.key_learnings[start..] {
                lines.push(format!("- {l}"));
            }
            lines.push(String::new());
        }

        lines.join("\n")
    }

    pub fn format_plan_for_user(&self) -> String {
        if self.plan_points.is_empty() {
            return "No research plan available.".to_string();
        }
        let mut lines = vec!["**Research Plan:**".to_string(), String::new()];
        for (i, p) in self.plan_points.iter().enumerate() {
            lines.push(format!("({}) {}", i + 1, p));
        }
        lines.join("\n")
    }

    pub fn format_dossiers_for_synthesis(&self) -> String {
        if self.dossiers.is_empty() {
            return "No dossiers available.".to_string();
        }
        let mut parts = Vec::new();
        for (i, d) in self.dossiers.iter().enumerate() {
            parts.push(format!("=== DOSSIER {}: {} ===", i + 1, d.point));
            parts.push(d.dossier.clone());
            parts.push(String::new());
        }
        parts.join("\n")
    }

    pub fn format_sources_for_report(&self) -> String {
        if self.source_registry.is_empty() {
            return "No sources registered.".to_string();
        }
        let mut lines = vec!["## Sources".to_string(), String::new()];
        for (num, url) in &self.source_registry {
            lines.push(format!("[{num}] {url}"));
        }
        lines.join("\n")
    }

    // === SERIALIZATION (lossless to_dict/from_dict) ===

    pub fn to_json(&self) -> serde_json::Value {
        let wire = ContextStateWire {
            session_id: self.session_id.clone(),
            session_title: self.session_title.clone(),
            original_query: self.original_query.clone(),
            current_step: self.current_step,
            queries: self.queries.clone(),
            urls: self.urls.clone(),
            search_results: self.search_results.clone(),
            clarification_questions: self.clarification_questions.clone(),
            clarification_answers: self.clarification_answers.clone(),
            plan_points: self.plan_points.clone(),
            plan_version: self.plan_version,
            dossiers: self.dossiers.clone(),
            key_learnings: self.key_learnings.clone(),
            source_registry: self.source_registry.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
            source_counter: self.source_counter,
            language: self.language.clone(),
            academic_mode: self.academic_mode,
        };
        serde_json::to_value(wire).expect("ContextState always serializes")
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let wire: ContextStateWire = serde_json::from_value(value)?;
        Ok(Self {
            session_id: wire.session_id,
            session_title: wire.session_title,
            original_query: wire.original_query,
            current_step: wire.current_step,
            queries: wire.queries,
            urls: wire.urls,
            search_results: wire.search_results,
            clarification_questions: wire.clarification_questions,
            clarification_answers: wire.clarification_answers,
            plan_points: wire.plan_points,
            plan_version: wire.plan_version,
            dossiers: wire.dossiers,
            key_learnings: wire.key_learnings,
            source_registry: wire.source_registry.into_iter().filter_map(|(k, v)| k.parse::<u32>().ok().map(|n| (n, v))).collect(),
            source_counter: wire.source_counter,
            language: wire.language,
            academic_mode: wire.academic_mode,
        })
    }

    // === UTILITIES ===

    /// Resets state for a new research session, keeping `session_id`.
    pub fn reset(&mut self) {
        let session_id = self.session_id.clone();
        *self = Self { session_id, ..Self::default() };
    }

    pub fn get_progress(&self) -> ProgressSummary {
        ProgressSummary {
            session_id: self.session_id.clone(),
            session_title: self.session_title.clone(),
            current_step: self.current_step,
            queries_count: self.queries.len(),
            urls_count: self.urls.len(),
            plan_points_count: self.plan_points.len(),
            dossiers_completed: self.dossiers.len(),
            total_sources: self.source_registry.len(),
            total_learnings: self.key_learnings.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_sources_dedups_and_reuses_numbers() {
        // Scenario S2
        let mut state = ContextState::new();
        let first = state.register_sources(&["A".to_string(), "B".to_string()]);
        assert_eq!(first.get(&1), Some(&"A".to_string()));
        assert_eq!(first.get(&2), Some(&"B".to_string()));

        let second = state.register_sources(&["B".to_string(), "C".to_string(), "A".to_string()]);
        assert_eq!(second.get(&2), Some(&"B".to_string()));
        assert_eq!(second.get(&3), Some(&"C".to_string()));
        assert_eq!(second.get(&1), Some(&"A".to_string()));

        assert_eq!(state.source_registry.get(&1), Some(&"A".to_string()));
        assert_eq!(state.source_registry.get(&2), Some(&"B".to_string()));
        assert_eq!(state.source_registry.get(&3), Some(&"C".to_string()));
        assert_eq!(state.source_counter, 4);
    }

    #[test]
    fn registering_same_list_twice_is_idempotent() {
        let mut state = ContextState::new();
        let urls = vec!["A".to_string(), "B".to_string()];
        let first = state.register_sources(&urls);
        let counter_after_first = state.source_counter;
        let second = state.register_sources(&urls);
        assert_eq!(first, second);
        assert_eq!(state.source_counter, counter_after_first);
    }

    #[test]
    fn to_json_from_json_round_trips() {
        let mut state = ContextState::new();
        state.set_query("what is battery recycling");
        state.set_title("Battery Recycling Overview");
        state.set_queries(vec!["q1".to_string()]);
        state.register_sources(&["https://a.example".to_string()]);
        state.update_key_learnings(&["learned something".to_string()]);
        state.set_plan(vec!["point one".to_string()]);

        let json = state.to_json();
        // source_registry keys must be strings on the wire.
        assert!(json["source_registry"].as_object().unwrap().contains_key("1"));

        let restored = ContextState::from_json(json).unwrap();
        assert_eq!(restored.session_id, state.session_id);
        assert_eq!(restored.original_query, state.original_query);
        assert_eq!(restored.source_registry, state.source_registry);
        assert_eq!(restored.plan_version, state.plan_version);
        assert_eq!(restored.key_learnings, state.key_learnings);
    }

    #[test]
    fn format_for_llm_omits_empty_sections_in_fixed_order() {
        let mut state = ContextState::new();
        state.set_query("question");
        let formatted = state.format_for_llm();
        assert!(formatted.contains("=== YOUR TASK ==="));
        assert!(!formatted.contains("=== SEARCH QUERIES ==="));

        state.set_queries(vec!["q1".to_string()]);
        let formatted = state.format_for_llm();
        let task_pos = formatted.find("=== YOUR TASK ===").unwrap();
        let queries_pos = formatted.find("=== SEARCH QUERIES ===").unwrap();
        assert!(task_pos < queries_pos);
    }

    #[test]
    fn previous_learnings_reports_none_yet_when_empty() {
        let state = ContextState::new();
        assert_eq!(state.get_previous_learnings(5), "None yet");
    }

    #[test]
    fn reset_keeps_session_id() {
        let mut state = ContextState::new();
        let id = state.session_id.clone();
        state.set_query("q");
        state.register_sources(&["a".to_string()]);
        state.reset();
        assert_eq!(state.session_id, id);
        assert_eq!(state.original_query, "");
        assert!(state.source_registry.is_empty());
        assert_eq!(state.source_counter, 1);
    }
}
