use regex::Regex;

use super::cap_input;

/// Parses `(N) ...` blocks separated by blank lines; falls back to `N. ...` lines when no
/// parenthesized points are found.
pub fn parse_plan(text: &str) -> Vec<String> {
    let text = cap_input(text);

    // The `regex` crate has no look-ahead, so block boundaries are found by locating every
    // `(N)` start-of-block marker and slicing the text between consecutive starts instead.
    let marker_re = Regex::new(r"(?m)^\s*\((\d+)\)\s*").unwrap();
    let starts: Vec<(usize, usize, u32)> = marker_re
        .captures_iter(text)
        .filter_map(|c| {
            let whole = c.get(0).unwrap();
            let n = c[1].parse::<u32>().ok()?;
            Some((whole.start(), whole.end(), n))
        })
        .collect();

    let mut points: Vec<(u32, String)> = Vec::with_capacity(starts.len());
    for (i, &(_, body_start, n)) in starts.iter().enumerate() {
        let body_end = starts.get(i + 1).map(|&(s, _, _)| s).unwrap_or(text.len());
        points.push((n, text[body_start..body_end].trim().to_string()));
    }

    if points.is_empty() {
        let line_re = Regex::new(r"(?m)^\s*(\d+)\.\s*(.+)$").unwrap();
        points = line_re
            .captures_iter(text)
            .filter_map(|c| {
                let n = c[1].parse::<u32>().ok()?;
                Some((n, c[2].trim().to_string()))
            })
            .collect();
    }

    points.sort_by_key(|(n, _)| *n);
    points.into_iter().map(|(_, p)| p).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_parenthesized_blocks() {
        let text = "\
(1) Survey current recycling technologies and their throughput.

(2) Assess regulatory drivers in the EU and US.

(3) Identify leading commercial players and their capacity plans.
";
        let points = parse_plan(text);
        assert_eq!(points.len(), 3);
        assert!(points[0].starts_with("Survey current recycling"));
        assert!(points[2].starts_with("Identify leading"));
    }

    #[test]
    fn falls_back_to_numbered_lines() {
        let text = "1. First point here.\n2. Second point here.\n";
        let points = parse_plan(text);
        assert_eq!(points, vec!["First point here.", "Second point here."]);
    }

    #[test]
    fn no_matches_yields_empty() {
        assert!(parse_plan("nothing structured here").is_empty());
    }
}
