//! Pipeline stages (§4.7) and the deep-research loop (§4.8).

mod citation;
mod deep_research;
pub mod events;
mod stages;

pub use citation::renumber_citations;
pub use deep_research::run_deep_research;
pub use events::ResearchEvent;
pub use stages::{clarify, overview, plan, search_and_pick};
