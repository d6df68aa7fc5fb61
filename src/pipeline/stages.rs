//! Stages 1-4 (§4.7): overview, search-and-pick, clarify, plan. Each is all-or-nothing — a
//! failure never partially mutates the passed `ContextState` (§7, §8 invariant 4).

use crate::context::ContextState;
use crate::error::{Result, StateError};
use crate::fetch::BatchFetch;
use crate::llm::LlmClient;
use crate::parsers::{parse_overview, parse_pick_urls, parse_plan, regex_url_scrape};
use crate::prompts;
use crate::search::{execute_searches, SearchProvider};

const PICK_URLS_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(60);
const CLARIFY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(60);
const PLAN_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(90);
const CLARIFY_MAX_URLS: usize = 15;
const CLARIFY_CHARS_PER_PAGE: usize = 3_000;
const SEARCH_RESULTS_PER_QUERY: usize = 15;

fn format_search_results(results: &std::collections::HashMap<String, Vec<crate::search::SearchResult>>) -> String {
    let mut lines = Vec::new();
    for (query, hits) in results {
        lines.push(format!("Query: {query}"));
        for h in hits {
            lines.push(format!("- {} — {}\n  {}", h.title, h.url, h.snippet));
        }
    }
    lines.join("\n")
}

/// `overview(user_query) -> (title, queries)`. No precondition beyond a well-formed query.
pub async fn overview(state: &mut ContextState, llm: &LlmClient, user_query: &str) -> Result<(String, Vec<String>)> {
    let (system, user) = prompts::overview_prompt(user_query, &state.language);
    let result = llm.call(&[system, user], llm.work_model(), 1_000, std::time::Duration::from_secs(60)).await;
    if let Some(err) = LlmClient::transport_error(&result) {
        return Err(err);
    }
    let text = result.content.unwrap_or_default();
    let (title, queries) = parse_overview(&text);

    state.set_query(user_query);
    state.set_title(title.clone());
    state.set_queries(queries.clone());
    state.current_step = 1;
    Ok((title, queries))
}

/// `search_and_pick(queries) -> urls`. Precondition: `queries` present.
pub async fn search_and_pick(
    state: &mut ContextState,
    llm: &LlmClient,
    search: &dyn SearchProvider,
) -> Result<Vec<String>> {
    if state.queries.is_empty() {
        return Err(StateError::PreconditionUnmet("search_and_pick requires queries".to_string()).into());
    }

    let results = execute_searches(search, &state.queries, SEARCH_RESULTS_PER_QUERY).await;
    let formatted = format_search_results(&results);

    let (system, user) = prompts::pick_urls_prompt(&state.format_for_llm(), &formatted);
    let result = llm.call(&[system, user], llm.work_model(), 1_500, PICK_URLS_TIMEOUT).await;
    if let Some(err) = LlmClient::transport_error(&result) {
        return Err(err);
    }
    let text = result.content.unwrap_or_default();

    let (mut urls, _rejections) = parse_pick_urls(&text);
    if urls.is_empty() {
        urls = regex_url_scrape(&text);
    }

    state.set_search_results(results);
    state.set_urls(urls.clone());
    state.current_step = 2;
    Ok(urls)
}

/// `clarify(urls) -> clarification_text`. Precondition: `urls` present. Read-only/advisory
/// (§9 open question a): this stage never commits questions to state itself.
pub async fn clarify(
    state: &ContextState,
    llm: &LlmClient,
    fetcher: &dyn BatchFetch,
) -> Result<String> {
    if state.urls.is_empty() {
        return Err(StateError::PreconditionUnmet("clarify requires urls".to_string()).into());
    }

    let batch: Vec<String> = state.urls.iter().take(CLARIFY_MAX_URLS).cloned().collect();
    let pages = fetcher.fetch_batch(&batch).await;

    let mut formatted = String::new();
    for (url, content) in &pages {
        let capped: String = content.chars().take(CLARIFY_CHARS_PER_PAGE).collect();
        formatted.push_str(&format!("=== {url} ===\n{capped}\n\n"));
    }

    let (system, user) = prompts::clarify_prompt(&state.format_for_llm(), &formatted);
    let result = llm.call(&[system, user], llm.work_model(), 800, CLARIFY_TIMEOUT).await;
    if let Some(err) = LlmClient::transport_error(&result) {
        return Err(err);
    }
    Ok(result.content.unwrap_or_default())
}

/// `plan(answers, questions, academic_mode) -> plan_points`. Precondition: `original_query`
/// present.
pub async fn plan(
    state: &mut ContextState,
    llm: &LlmClient,
    questions: Option<Vec<String>>,
    answers: Option<Vec<String>>,
    academic_mode: bool,
) -> Result<Vec<String>> {
    if state.original_query.is_empty() {
        return Err(StateError::PreconditionUnmet("plan requires original_query".to_string()).into());
    }

    if let Some(q) = questions {
        state.add_clarification(q);
    }
    if let Some(a) = answers {
        state.add_answers(a);
    }
    state.academic_mode = academic_mode;

    let (system, user) = prompts::plan_prompt(&state.format_for_llm(), academic_mode);
    let result = llm.call(&[system, user], llm.work_model(), 2_500, PLAN_TIMEOUT).await;
    if let Some(err) = LlmClient::transport_error(&result) {
        return Err(err);
    }
    let text = result.content.unwrap_or_default();
    let points = parse_plan(&text);

    state.set_plan(points.clone());
    state.current_step = 4;
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Provider;
    use crate::search::MockSearch;

    fn llm_with_base(base_url: String) -> LlmClient {
        LlmClient::new(
            reqwest::Client::new(),
            Provider::OpenRouter,
            Some("key".to_string()),
            base_url,
            "work-model".to_string(),
            "final-model".to_string(),
        )
    }

    #[tokio::test]
    async fn search_and_pick_rejects_without_queries() {
        let mut state = ContextState::new();
        let llm = llm_with_base("https://example.invalid".to_string());
        let search = MockSearch::new();
        let err = search_and_pick(&mut state, &llm, &search).await.unwrap_err();
        assert!(matches!(err, crate::error::ResearchError::State(_)));
    }

    #[tokio::test]
    async fn plan_rejects_without_original_query() {
        let mut state = ContextState::new();
        let llm = llm_with_base("https://example.invalid".to_string());
        let err = plan(&mut state, &llm, None, None, false).await.unwrap_err();
        assert!(matches!(err, crate::error::ResearchError::State(_)));
    }
}
