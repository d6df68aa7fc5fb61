//! Wire surface for stage 5 (§6): newline-delimited JSON, one [`ResearchEvent`] per line.

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Status,
    Sources,
    PointComplete,
    SynthesisStart,
    Done,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResearchEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ResearchEvent {
    pub fn status(message: impl Into<String>) -> Self {
        Self { kind: EventKind::Status, message: message.into(), data: None }
    }

    pub fn sources(message: impl Into<String>, urls: &[String]) -> Self {
        Self {
            kind: EventKind::Sources,
            message: message.into(),
            data: Some(serde_json::json!({ "urls": urls })),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn point_complete(
        point_title: &str,
        point_number: usize,
        total_points: usize,
        key_learnings: &[String],
        dossier_full: &str,
        sources: &[String],
        citations: Option<&std::collections::HashMap<u32, u32>>,
        skipped: bool,
    ) -> Self {
        let mut data = serde_json::json!({
            "point_title": point_title,
            "point_number": point_number,
            "total_points": total_points,
            "key_learnings": key_learnings,
            "dossier_full": dossier_full,
            "sources": sources,
            "skipped": skipped,
        });
        if let Some(c) = citations {
            data["citations"] = serde_json::to_value(
                c.iter().map(|(k, v)| (k.to_string(), *v)).collect::<std::collections::HashMap<String, u32>>(),
            )
            .unwrap();
        }
        Self { kind: EventKind::PointComplete, message: format!("completed point {point_number}/{total_points}"), data: Some(data) }
    }

    pub fn synthesis_start(dossier_count: usize, total_sources: usize) -> Self {
        Self {
            kind: EventKind::SynthesisStart,
            message: "synthesizing final report".to_string(),
            data: Some(serde_json::json!({ "dossier_count": dossier_count, "total_sources": total_sources })),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn done(
        final_document: &str,
        total_points: usize,
        total_sources: usize,
        duration_seconds: f64,
        source_registry: &std::collections::BTreeMap<u32, String>,
        session_id: &str,
        context_snapshot: Value,
    ) -> Self {
        Self {
            kind: EventKind::Done,
            message: "research complete".to_string(),
            data: Some(serde_json::json!({
                "final_document": final_document,
                "total_points": total_points,
                "total_sources": total_sources,
                "duration_seconds": duration_seconds,
                "source_registry": source_registry.iter().map(|(k, v)| (k.to_string(), v.clone())).collect::<std::collections::HashMap<String, String>>(),
                "session_id": session_id,
                "context": context_snapshot,
            })),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { kind: EventKind::Error, message: message.into(), data: None }
    }

    /// Serializes this event as one NDJSON line (including the trailing newline).
    pub fn to_ndjson_line(&self) -> String {
        let mut s = serde_json::to_string(self).expect("event always serializes");
        s.push('\n');
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_event_omits_data_field() {
        let e = ResearchEvent::status("starting");
        let v = serde_json::to_value(&e).unwrap();
        assert!(v.get("data").is_none());
        assert_eq!(v["type"], "status");
    }

    #[test]
    fn point_complete_carries_skipped_flag() {
        let e = ResearchEvent::point_complete("point one", 1, 3, &[], "", &[], None, true);
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["data"]["skipped"], true);
    }
}
