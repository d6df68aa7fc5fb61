use std::collections::BTreeMap;

use super::cap_input;
use super::dossier::parse_sources_block;

const SOURCES_START: &str = "=== SOURCES ===";

/// Parses the final-synthesis response: the report text (everything before the sources
/// block) and the same `{N: descriptor}` source block the dossier parser uses.
pub fn parse_synthesis(text: &str) -> (String, BTreeMap<u32, String>) {
    let text = cap_input(text);
    let report = match text.find(SOURCES_START) {
        Some(pos) => text[..pos].trim().to_string(),
        None => text.trim().to_string(),
    };
    let sources = parse_sources_block(text);
    (report, sources)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_report_from_sources() {
        let text = "\
# Final Report

Battery recycling is accelerating [1][2].

=== SOURCES ===
[1] https://example.com/a - Report
[2] https://example.com/b - Filing
=== END SOURCES ===
";
        let (report, sources) = parse_synthesis(text);
        assert!(report.starts_with("# Final Report"));
        assert!(!report.contains("SOURCES"));
        assert_eq!(sources.len(), 2);
    }

    #[test]
    fn no_sources_block_returns_whole_text_as_report() {
        let (report, sources) = parse_synthesis("Just a report with no sources.");
        assert_eq!(report, "Just a report with no sources.");
        assert!(sources.is_empty());
    }
}
