mod state;

pub use state::{ContextState, Dossier, ProgressSummary};
