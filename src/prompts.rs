//! Prompt templates.
//!
//! Wording is not part of the core (§6: "prompt wording is an input to the core, not part of
//! it"). These builders exist so the crate is runnable end to end; the core only ever binds
//! to the anchor strings in [`crate::parsers`], never to the prose around them.

use crate::llm::Message;

pub fn overview_prompt(user_query: &str, language: &str) -> (Message, Message) {
    let system = Message::system(
        "You are a research planning assistant. Given a user's question, propose a short \
         session title and a handful of search queries that would surface the best starting \
         material.\n\n\
         Respond in exactly this format:\n\n\
         === SESSION TITLE ===\n\
         <a concise title>\n\
         === QUERIES ===\n\
         query 1: <search query>\n\
         query 2: <search query>\n\
         ...(up to 10)",
    );
    let user = Message::user(format!(
        "Respond in language '{language}'.\n\nUser question:\n{user_query}"
    ));
    (system, user)
}

pub fn pick_urls_prompt(context: &str, search_results: &str) -> (Message, Message) {
    let system = Message::system(
        "You choose which search results are worth fetching in full. Pick only sources that \
         will materially inform the research.\n\n\
         Respond in exactly this format:\n\n\
         url 1: <url>\n\
         url 2: <url>\n\
         ...(up to 20)\n\
         rejected: <reason a result was skipped>\n\
         ...(up to 10)",
    );
    let user = Message::user(format!("{context}\n\n=== SEARCH RESULTS ===\n{search_results}"));
    (system, user)
}

pub fn clarify_prompt(context: &str, pages: &str) -> (Message, Message) {
    let system = Message::system(
        "Given the gathered sources, ask any clarifying questions that would sharpen the \
         research plan. It is fine to ask none if the request is already unambiguous.",
    );
    let user = Message::user(format!("{context}\n\n=== FETCHED PAGES ===\n{pages}"));
    (system, user)
}

pub fn plan_prompt(context: &str, academic_mode: bool) -> (Message, Message) {
    let style = if academic_mode {
        "Use an academic research structure: literature review, methodology, findings, gaps."
    } else {
        "Use a practical, results-oriented structure."
    };
    let system = Message::system(format!(
        "You turn a research question into a numbered research plan. {style}\n\n\
         Respond with one block per point:\n\n\
         (1) <first research objective>\n\n\
         (2) <second research objective>\n\n\
         ...",
    ));
    let user = Message::user(context.to_string());
    (system, user)
}

pub fn think_prompt(user_query: &str, current_point: &str, previous_learnings: &str) -> (Message, Message) {
    let system = Message::system(
        "You are a research strategist. Decide what information is still needed for the \
         current point and draft concrete search queries — plain keyword phrases, never URLs \
         or `site:` filters.\n\n\
         Respond in exactly this format:\n\n\
         === THINKING ===\n\
         <your reasoning>\n\
         === SEARCHES ===\n\
         search 1 (Category): <query>\n\
         ...(up to 10)",
    );
    let user = Message::user(format!(
        "Main task: {user_query}\nCurrent point: {current_point}\n\n\
         Previously established learnings (do not re-search these):\n{previous_learnings}"
    ));
    (system, user)
}

pub fn dossier_prompt(
    user_query: &str,
    current_point: &str,
    thinking: &str,
    scraped_content: &str,
    academic_mode: bool,
) -> (Message, Message) {
    let style = if academic_mode {
        "Write in an academic register with an evidence table."
    } else {
        "Write in a clear, direct register."
    };
    let system = Message::system(format!(
        "You write a dossier covering one research point, citing sources inline as `[N]` \
         where N is the position of the source in the list below. {style}\n\n\
         End with:\n\n\
         ## 💡 KEY LEARNINGS\n\
         - <bullet>\n\
         ...\n\n\
         === SOURCES ===\n\
         [1] <url> - <one-line description>\n\
         ...\n\
         === END SOURCES ===",
    ));
    let user = Message::user(format!(
        "Main task: {user_query}\nCurrent point: {current_point}\n\nResearch notes:\n{thinking}\n\n\
         === SCRAPED CONTENT ===\n{scraped_content}"
    ));
    (system, user)
}

pub fn final_synthesis_prompt(context: &str, dossiers: &str, academic_mode: bool, language: &str) -> (Message, Message) {
    let style = if academic_mode { "an academic report" } else { "a clear long-form report" };
    let system = Message::system(format!(
        "You synthesize all dossiers into {style}, in language '{language}', preserving `[N]` \
         citations from the dossiers verbatim.\n\n\
         End with:\n\n\
         === SOURCES ===\n\
         [1] <url> - <one-line description>\n\
         ...\n\
         === END SOURCES ===",
    ));
    let user = Message::user(format!("{context}\n\n=== DOSSIERS ===\n{dossiers}"));
    (system, user)
}
