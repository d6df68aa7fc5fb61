use regex::Regex;

use super::cap_input;

const TITLE_ANCHOR: &str = "=== SESSION TITLE ===";
const QUERIES_ANCHOR: &str = "=== QUERIES ===";

/// Parses `=== SESSION TITLE ===` then `=== QUERIES ===` with `query N: ...` lines.
pub fn parse_overview(text: &str) -> (String, Vec<String>) {
    let text = cap_input(text);

    let title = text
        .find(TITLE_ANCHOR)
        .map(|start| &text[start + TITLE_ANCHOR.len()..])
        .and_then(|rest| rest.find(QUERIES_ANCHOR).map(|end| &rest[..end]).or(Some(rest)))
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    let queries_section = match text.find(QUERIES_ANCHOR) {
        Some(start) => &text[start + QUERIES_ANCHOR.len()..],
        None => return (title, Vec::new()),
    };

    let query_re = Regex::new(r"(?i)^query\s+(\d+)\s*:\s*(.+)$").unwrap();
    let mut queries = Vec::new();
    for line in queries_section.lines() {
        let line = line.trim();
        if let Some(caps) = query_re.captures(line) {
            queries.push(caps[2].trim().to_string());
        }
    }

    (title, queries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_title_and_queries() {
        let text = "\
=== SESSION TITLE ===
The Future of Battery Recycling
=== QUERIES ===
query 1: lithium battery recycling methods
query 2: EV battery second life
";
        let (title, queries) = parse_overview(text);
        assert_eq!(title, "The Future of Battery Recycling");
        assert_eq!(queries, vec!["lithium battery recycling methods", "EV battery second life"]);
    }

    #[test]
    fn does_not_cap_query_count() {
        let mut text = String::from("=== SESSION TITLE ===\nT\n=== QUERIES ===\n");
        for i in 1..=15 {
            text.push_str(&format!("query {i}: q{i}\n"));
        }
        let (_, queries) = parse_overview(&text);
        assert_eq!(queries.len(), 15);
    }

    #[test]
    fn missing_anchors_yields_empty() {
        let (title, queries) = parse_overview("no anchors here");
        assert_eq!(title, "");
        assert!(queries.is_empty());
    }
}
