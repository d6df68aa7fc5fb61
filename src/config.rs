//! File-based settings with environment-variable fallback, following the same
//! precedence chain as the teacher crate's `ShadowConfig` (JSON field → env var → default).

use std::path::Path;

/// Per-provider section of `deep-research.json`.
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct ProviderSection {
    pub provider: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub work_model: Option<String>,
    pub final_model: Option<String>,
}

impl ProviderSection {
    /// Provider name: JSON field → `DEEP_RESEARCH_PROVIDER` env var → `openrouter`.
    pub fn resolve_provider(&self) -> String {
        if let Some(p) = &self.provider {
            if !p.trim().is_empty() {
                return p.clone();
            }
        }
        std::env::var("DEEP_RESEARCH_PROVIDER")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "openrouter".to_string())
    }

    /// API key: JSON field → `DEEP_RESEARCH_API_KEY` env var → `None`.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(k) = &self.api_key {
            return Some(k.trim().to_string());
        }
        std::env::var("DEEP_RESEARCH_API_KEY")
            .ok()
            .filter(|v| !v.trim().is_empty())
    }

    /// Base URL override: JSON field → `DEEP_RESEARCH_BASE_URL` env var → provider default.
    pub fn resolve_base_url(&self, provider: &str) -> String {
        if let Some(u) = &self.base_url {
            if !u.trim().is_empty() {
                return u.clone();
            }
        }
        std::env::var("DEEP_RESEARCH_BASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| crate::llm::default_base_url(provider).to_string())
    }

    /// Work model: JSON field → `DEEP_RESEARCH_WORK_MODEL` env var → default.
    pub fn resolve_work_model(&self) -> String {
        if let Some(m) = &self.work_model {
            if !m.trim().is_empty() {
                return m.clone();
            }
        }
        std::env::var("DEEP_RESEARCH_WORK_MODEL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "google/gemini-2.5-flash-lite-preview-09-2025".to_string())
    }

    /// Final model: JSON field → `DEEP_RESEARCH_FINAL_MODEL` env var → default.
    pub fn resolve_final_model(&self) -> String {
        if let Some(m) = &self.final_model {
            if !m.trim().is_empty() {
                return m.clone();
            }
        }
        std::env::var("DEEP_RESEARCH_FINAL_MODEL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "anthropic/claude-sonnet-4.5".to_string())
    }
}

/// Top-level config loaded from `deep-research.json`.
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct Settings {
    #[serde(default)]
    pub llm: ProviderSection,
    /// Academic-mode default, overridable per session.
    #[serde(default)]
    pub academic_mode_default: bool,
}

/// Load `deep-research.json` from standard locations.
///
/// Search order (first found wins):
/// 1. `DEEP_RESEARCH_CONFIG` env var path
/// 2. `./deep-research.json` (process cwd)
/// 3. `../deep-research.json` (one level up)
///
/// Missing file → `Settings::default()` (silent, all env-var fallbacks apply).
/// Parse error → log a warning, return `Settings::default()`.
pub fn load_settings() -> Settings {
    let candidates: Vec<std::path::PathBuf> = {
        let mut v = vec![
            std::path::PathBuf::from("deep-research.json"),
            std::path::PathBuf::from("../deep-research.json"),
        ];
        if let Ok(env_path) = std::env::var("DEEP_RESEARCH_CONFIG") {
            v.insert(0, std::path::PathBuf::from(env_path));
        }
        v
    };

    for path in &candidates {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Settings>(&contents) {
                Ok(cfg) => {
                    tracing::info!("deep-research.json loaded from {}", path.display());
                    return cfg;
                }
                Err(e) => {
                    tracing::warn!(
                        "deep-research.json parse error at {}: {} — using defaults",
                        path.display(),
                        e
                    );
                    return Settings::default();
                }
            },
            Err(_) => continue,
        }
    }

    Settings::default()
}

/// Home-directory root for file-based session persistence: `~/.deep-research/sessions`.
pub fn sessions_dir() -> Option<std::path::PathBuf> {
    if let Ok(v) = std::env::var("DEEP_RESEARCH_SESSIONS_DIR") {
        let p = std::path::PathBuf::from(v);
        return Some(p);
    }
    let home = dirs::home_dir()?;
    Some(home.join(".deep-research").join("sessions"))
}

/// Optional override for the Chromium-family browser executable.
pub fn chrome_executable_override() -> Option<String> {
    let p = std::env::var("CHROME_EXECUTABLE").ok()?;
    let p = p.trim();
    if p.is_empty() {
        return None;
    }
    if Path::new(p).exists() {
        Some(p.to_string())
    } else {
        None
    }
}
