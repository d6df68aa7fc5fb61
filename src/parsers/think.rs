use regex::Regex;

use super::cap_input;

const THINKING_ANCHOR: &str = "=== THINKING ===";
const SEARCHES_ANCHOR: &str = "=== SEARCHES ===";
const MAX_SEARCHES: usize = 10;

/// Parses `=== THINKING ===` then `=== SEARCHES ===` with `search N (Category)?: ...` lines.
/// Drops any proposed query that is itself an http(s) URL or carries a `site:` prefix.
pub fn parse_think(text: &str) -> (String, Vec<String>) {
    let text = cap_input(text);

    let thinking = match text.find(THINKING_ANCHOR) {
        Some(start) => {
            let rest = &text[start + THINKING_ANCHOR.len()..];
            match rest.find(SEARCHES_ANCHOR) {
                Some(end) => rest[..end].trim().to_string(),
                None => rest.trim().to_string(),
            }
        }
        None => String::new(),
    };

    let searches_section = match text.find(SEARCHES_ANCHOR) {
        Some(start) => &text[start + SEARCHES_ANCHOR.len()..],
        None => return (thinking, Vec::new()),
    };

    let search_re = Regex::new(r"(?i)^search\s+\d+\s*(?:\([^)]*\))?\s*:\s*(.+)$").unwrap();
    let mut queries = Vec::new();
    for line in searches_section.lines() {
        let line = line.trim();
        let Some(caps) = search_re.captures(line) else { continue };
        let candidate = caps[1].trim();
        if candidate.starts_with("http://") || candidate.starts_with("https://") {
            continue;
        }
        if candidate.to_ascii_lowercase().starts_with("site:") {
            continue;
        }
        queries.push(candidate.to_string());
        if queries.len() >= MAX_SEARCHES {
            break;
        }
    }

    (thinking, queries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_thinking_and_searches_with_category() {
        let text = "\
=== THINKING ===
Need to cover regulatory and technical angles.
=== SEARCHES ===
search 1 (Regulatory): EU battery directive 2023
search 2: recycling plant capacity 2025
search 3: https://example.com/already-known
search 4: site:reddit.com battery recycling
";
        let (thinking, queries) = parse_think(text);
        assert_eq!(thinking, "Need to cover regulatory and technical angles.");
        assert_eq!(queries, vec!["EU battery directive 2023", "recycling plant capacity 2025"]);
    }

    #[test]
    fn empty_searches_section_yields_empty_list() {
        let (_, queries) = parse_think("=== THINKING ===\nnothing to add\n=== SEARCHES ===\n");
        assert!(queries.is_empty());
    }
}
