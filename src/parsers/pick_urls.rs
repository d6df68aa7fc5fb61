use regex::Regex;

use super::cap_input;
use crate::validate::validate_url;

const MAX_URLS: usize = 20;
const MAX_REJECTIONS: usize = 10;

/// Parses `url N: <url>` lines for selections and `rejected: <reason>` lines for
/// rejections. URLs are SSRF-filtered; if the structured parser yields none, callers should
/// fall back to a regex URL scrape of the raw response (handled by the caller, not here,
/// since that fallback degrades to unanchored extraction).
pub fn parse_pick_urls(text: &str) -> (Vec<String>, Vec<String>) {
    let text = cap_input(text);

    let url_re = Regex::new(r"(?i)^url\s+\d+\s*:\s*(\S+)").unwrap();
    let rejected_re = Regex::new(r"(?i)^rejected\s*:\s*(.+)$").unwrap();

    let mut urls = Vec::new();
    let mut rejections = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if urls.len() < MAX_URLS {
            if let Some(caps) = url_re.captures(line) {
                let candidate = caps[1].trim().to_string();
                if validate_url(&candidate) {
                    urls.push(candidate);
                }
                continue;
            }
        }
        if rejections.len() < MAX_REJECTIONS {
            if let Some(caps) = rejected_re.captures(line) {
                rejections.push(caps[1].trim().to_string());
            }
        }
    }

    (urls, rejections)
}

/// Fallback regex URL scrape over raw (unanchored) text, used when the structured parser
/// above yields no URLs.
pub fn regex_url_scrape(text: &str) -> Vec<String> {
    let url_re = Regex::new(r#"https?://[^\s"'<>\)\]]+"#).unwrap();
    url_re
        .find_iter(cap_input(text))
        .map(|m| m.as_str().trim_end_matches(['.', ',', ')']).to_string())
        .filter(|u| validate_url(u))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_urls_and_rejections() {
        let text = "\
url 1: https://example.com/a
url 2: https://example.com/b
rejected: paywalled content
rejected: low quality source
";
        let (urls, rejections) = parse_pick_urls(text);
        assert_eq!(urls, vec!["https://example.com/a", "https://example.com/b"]);
        assert_eq!(rejections, vec!["paywalled content", "low quality source"]);
    }

    #[test]
    fn filters_unsafe_urls() {
        let text = "url 1: http://127.0.0.1/\nurl 2: https://example.com/ok\n";
        let (urls, _) = parse_pick_urls(text);
        assert_eq!(urls, vec!["https://example.com/ok"]);
    }

    #[test]
    fn fallback_scrape_finds_bare_urls() {
        let text = "Some commentary mentioning https://example.com/article and http://localhost/bad.";
        let urls = regex_url_scrape(text);
        assert_eq!(urls, vec!["https://example.com/article"]);
    }
}
