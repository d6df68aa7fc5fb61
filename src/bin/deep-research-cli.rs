//! Demo binary exercising the full pipeline against a real LLM provider with a mock search
//! backend and an in-process stub fetcher, so the crate is runnable end to end without a
//! Chromium install. Swap `EchoNavigator`/`MockSearch` for `fetch::browser::BrowserPool` and
//! `search::BraveSearch` for a production run.

use async_trait::async_trait;
use deep_research::context::ContextState;
use deep_research::fetch::{Extract, NavError, NavResult, Navigator, PageFetcher};
use deep_research::llm::LlmClient;
use deep_research::pipeline;

struct EchoNavigator;

#[async_trait]
impl Navigator for EchoNavigator {
    async fn navigate(&self, url: &str, _extract: Extract) -> Result<NavResult, NavError> {
        Ok(NavResult {
            content_type: Some("text/html".to_string()),
            content: format!(
                "Placeholder content for {url}. Replace EchoNavigator with a real \
                 Navigator (e.g. deep_research::fetch::browser::BrowserPool) for live fetches."
            ),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let query = std::env::args().nth(1).unwrap_or_else(|| "What is battery recycling?".to_string());

    let settings = deep_research::config::load_settings();
    let llm = LlmClient::from_settings(reqwest::Client::new(), &settings)?;

    let mut state = ContextState::new();
    let search = deep_research::search::MockSearch::new();
    let fetcher = PageFetcher::new(EchoNavigator);

    let (_title, queries) = pipeline::overview(&mut state, &llm, &query).await?;
    tracing::info!(?queries, "overview stage complete");

    let _urls = pipeline::search_and_pick(&mut state, &llm, &search).await?;
    let _clarification = pipeline::clarify(&state, &llm, &fetcher).await?;
    let plan_points = pipeline::plan(&mut state, &llm, None, None, settings.academic_mode_default).await?;
    tracing::info!(points = plan_points.len(), "plan stage complete");

    let (tx, mut rx) = tokio::sync::mpsc::channel::<deep_research::pipeline::events::ResearchEvent>(32);

    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            println!("{}", event.to_ndjson_line());
        }
    });

    pipeline::run_deep_research(&mut state, &llm, &search, &fetcher, tx).await?;
    printer.await.ok();

    Ok(())
}
