use std::collections::BTreeMap;

use regex::Regex;

use super::cap_input;

const SOURCES_START: &str = "=== SOURCES ===";
const SOURCES_END: &str = "=== END SOURCES ===";
const KEY_LEARNINGS_ANCHOR: &str = "## 💡 KEY LEARNINGS";
const KEY_LEARNINGS_LEGACY_ANCHOR: &str = "=== KEY LEARNINGS ===";

/// Parses the `[N] url - description` lines between `=== SOURCES ===` and
/// `=== END SOURCES ===`. `N` is accepted in `1..99999`; shared by the dossier and final
/// synthesis parsers.
pub(crate) fn parse_sources_block(text: &str) -> BTreeMap<u32, String> {
    let Some(start) = text.find(SOURCES_START) else {
        return BTreeMap::new();
    };
    let rest = &text[start + SOURCES_START.len()..];
    let end = rest.find(SOURCES_END).unwrap_or(rest.len());
    let block = &rest[..end];

    let line_re = Regex::new(r"^\[(\d+)\]\s*(.+)$").unwrap();
    let mut out = BTreeMap::new();
    for line in block.lines() {
        let line = line.trim();
        if let Some(caps) = line_re.captures(line) {
            if let Ok(n) = caps[1].parse::<u32>() {
                if (1..99_999).contains(&n) {
                    out.insert(n, caps[2].trim().to_string());
                }
            }
        }
    }
    out
}

/// Parses a dossier response: the dossier text up to the key-learnings anchor (new-style
/// `## 💡 KEY LEARNINGS` or legacy `=== KEY LEARNINGS ===`), the key learnings that follow,
/// and the `{N: descriptor}` source block.
pub fn parse_dossier(text: &str) -> (String, Vec<String>, BTreeMap<u32, String>) {
    let text = cap_input(text);

    let learnings_pos = text
        .find(KEY_LEARNINGS_ANCHOR)
        .map(|p| (p, KEY_LEARNINGS_ANCHOR.len()))
        .or_else(|| text.find(KEY_LEARNINGS_LEGACY_ANCHOR).map(|p| (p, KEY_LEARNINGS_LEGACY_ANCHOR.len())));

    let (dossier_text, learnings_section) = match learnings_pos {
        Some((pos, anchor_len)) => (text[..pos].trim().to_string(), &text[pos + anchor_len..]),
        None => (text.trim().to_string(), ""),
    };

    let sources_cut = learnings_section.find(SOURCES_START).unwrap_or(learnings_section.len());
    let learnings_body = &learnings_section[..sources_cut];

    let key_learnings: Vec<String> = learnings_body
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with('-') || l.starts_with('*'))
        .map(|l| l.trim_start_matches(['-', '*']).trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();

    let sources = parse_sources_block(text);

    (dossier_text, key_learnings, sources)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dossier_with_new_style_anchor() {
        let text = "\
This is the dossier body with [1] and [2] citations.

## 💡 KEY LEARNINGS
- Recycling yields improved 12% YoY
- Regulatory pressure is the dominant driver

=== SOURCES ===
[1] https://example.com/a - Industry report
[2] https://example.com/b - Regulatory filing
=== END SOURCES ===
";
        let (dossier, learnings, sources) = parse_dossier(text);
        assert!(dossier.contains("dossier body"));
        assert!(!dossier.contains("KEY LEARNINGS"));
        assert_eq!(learnings.len(), 2);
        assert_eq!(sources.get(&1).unwrap(), "https://example.com/a - Industry report");
        assert_eq!(sources.get(&2).unwrap(), "https://example.com/b - Regulatory filing");
    }

    #[test]
    fn parses_legacy_anchor() {
        let text = "Body text.\n=== KEY LEARNINGS ===\n- one thing learned\n";
        let (dossier, learnings, _) = parse_dossier(text);
        assert_eq!(dossier, "Body text.");
        assert_eq!(learnings, vec!["one thing learned"]);
    }

    #[test]
    fn missing_sources_block_yields_empty_map() {
        let (_, _, sources) = parse_dossier("just a dossier, no sources section");
        assert!(sources.is_empty());
    }
}
