//! Session persistence (§6): `load`/`save`/`delete`/`list` over `ContextState`.
//!
//! Grounded in the teacher's `features/session_store.rs` idiom — JSON files under a
//! home-directory root, read/written with `std::fs`, logged with `tracing` — adapted from
//! per-domain cookie jars to per-session `ContextState` snapshots.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;

use crate::context::ContextState;
use crate::error::{ResearchError, Result};

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub title: String,
    pub phase: u8,
    pub academic_mode: bool,
    pub total_sources: usize,
    pub created_at: String,
    pub updated_at: String,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, session_id: &str) -> Result<ContextState>;
    async fn save(&self, state: &ContextState) -> Result<()>;
    async fn delete(&self, session_id: &str) -> Result<()>;
    async fn list(&self) -> Result<Vec<SessionSummary>>;
}

/// JSON-file-per-session store rooted at [`crate::config::sessions_dir`].
pub struct FileSessionStore {
    root: PathBuf,
}

impl FileSessionStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Uses the standard `~/.deep-research/sessions` root (or its env override).
    pub fn from_default_root() -> Result<Self> {
        let root = crate::config::sessions_dir().ok_or_else(|| {
            ResearchError::Config(crate::error::ConfigError::MissingPromptBinding(
                "could not resolve home directory for session storage".to_string(),
            ))
        })?;
        Ok(Self::new(root))
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        self.root.join(format!("{session_id}.json"))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self, session_id: &str) -> Result<ContextState> {
        let path = self.path_for(session_id);
        let contents = std::fs::read_to_string(&path).map_err(|e| {
            ResearchError::State(crate::error::StateError::PreconditionUnmet(format!(
                "no session file at {}: {e}",
                path.display()
            )))
        })?;
        let value: serde_json::Value = serde_json::from_str(&contents).map_err(|e| {
            ResearchError::State(crate::error::StateError::PreconditionUnmet(format!(
                "malformed session file {}: {e}",
                path.display()
            )))
        })?;
        let state = ContextState::from_json(value).map_err(|e| {
            ResearchError::State(crate::error::StateError::PreconditionUnmet(format!(
                "malformed session state {}: {e}",
                path.display()
            )))
        })?;
        tracing::debug!(session_id, path = %path.display(), "loaded session");
        Ok(state)
    }

    async fn save(&self, state: &ContextState) -> Result<()> {
        std::fs::create_dir_all(&self.root).map_err(|e| {
            ResearchError::Transport(crate::error::TransportError::Network(format!(
                "could not create sessions dir {}: {e}",
                self.root.display()
            )))
        })?;
        let path = self.path_for(&state.session_id);
        let json = serde_json::to_string_pretty(&state.to_json()).expect("ContextState always serializes");
        std::fs::write(&path, json).map_err(|e| {
            ResearchError::Transport(crate::error::TransportError::Network(format!(
                "could not write session file {}: {e}",
                path.display()
            )))
        })?;
        tracing::debug!(session_id = %state.session_id, path = %path.display(), "saved session");
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        let path = self.path_for(session_id);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(session_id, path = %path.display(), "deleted session");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ResearchError::Transport(crate::error::TransportError::Network(format!(
                "could not delete session file {}: {e}",
                path.display()
            )))),
        }
    }

    async fn list(&self) -> Result<Vec<SessionSummary>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(ResearchError::Transport(crate::error::TransportError::Network(format!(
                    "could not list sessions dir {}: {e}",
                    self.root.display()
                ))))
            }
        };

        let mut out = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Ok(contents) = std::fs::read_to_string(&path) else { continue };
            let Ok(value) = serde_json::from_str::<serde_json::Value>(&contents) else { continue };
            let Ok(state) = ContextState::from_json(value) else { continue };
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .map(|t| chrono::DateTime::<chrono::Utc>::from(t).to_rfc3339())
                .unwrap_or_default();
            out.push(SessionSummary {
                id: state.session_id.clone(),
                title: state.session_title.clone(),
                phase: state.current_step,
                academic_mode: state.academic_mode,
                total_sources: state.source_registry.len(),
                created_at: modified.clone(),
                updated_at: modified,
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("deep-research-test-{}", uuid::Uuid::new_v4()));
        p
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let store = FileSessionStore::new(temp_root());
        let mut state = ContextState::new();
        state.set_query("round trip test");
        store.save(&state).await.unwrap();

        let loaded = store.load(&state.session_id).await.unwrap();
        assert_eq!(loaded.session_id, state.session_id);
        assert_eq!(loaded.original_query, "round trip test");

        std::fs::remove_dir_all(store_root_for_test(&store)).ok();
    }

    #[tokio::test]
    async fn delete_is_idempotent_on_missing_session() {
        let store = FileSessionStore::new(temp_root());
        store.delete("nonexistent").await.unwrap();
    }

    #[tokio::test]
    async fn list_returns_saved_sessions() {
        let store = FileSessionStore::new(temp_root());
        let mut a = ContextState::new();
        a.set_title("session a");
        let mut b = ContextState::new();
        b.set_title("session b");
        store.save(&a).await.unwrap();
        store.save(&b).await.unwrap();

        let summaries = store.list().await.unwrap();
        assert_eq!(summaries.len(), 2);

        std::fs::remove_dir_all(store_root_for_test(&store)).ok();
    }

    fn store_root_for_test(store: &FileSessionStore) -> &PathBuf {
        &store.root
    }
}
