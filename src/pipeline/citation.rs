//! Single-pass global citation renumbering (§4.8f, §9).
//!
//! Rewrites local `[i]` tokens to their global citation numbers by table lookup in one pass,
//! rather than successive textual substitutions, which can alias (`[1]→[3]` then `[3]→[1]`).

use std::collections::HashMap;

use regex::Regex;

fn citation_re() -> Regex {
    Regex::new(r"\[(\d+)\]").unwrap()
}

/// Replaces every exact `[i]` token with `[g]` per `local_to_global`, leaving any `[i]` with
/// no entry untouched. Matches only the full bracketed number — `[1]` never matches inside
/// `[12]` since the digit group is greedy and anchored by the surrounding brackets.
pub fn renumber_citations(text: &str, local_to_global: &HashMap<u32, u32>) -> String {
    citation_re()
        .replace_all(text, |caps: &regex::Captures| {
            let local: u32 = caps[1].parse().unwrap_or(0);
            match local_to_global.get(&local) {
                Some(global) => format!("[{global}]"),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renumbers_citations_per_scenario_s3() {
        let mut map = HashMap::new();
        map.insert(1, 4);
        map.insert(2, 5);
        let text = "see [1] and [2]";
        assert_eq!(renumber_citations(text, &map), "see [4] and [5]");
    }

    #[test]
    fn rewrite_does_not_disturb_adjacent_numbers() {
        let mut map = HashMap::new();
        map.insert(1, 12);
        let text = "refs [1] [10] [11] [13]";
        assert_eq!(renumber_citations(text, &map), "refs [12] [10] [11] [13]");
    }

    #[test]
    fn single_pass_avoids_transitive_aliasing() {
        // [1] -> [3] and [3] -> [1] must not cascade: the second rule never gets applied to
        // the output of the first since this is one pass over the original text.
        let mut map = HashMap::new();
        map.insert(1, 3);
        map.insert(3, 1);
        let text = "[1] and [3]";
        assert_eq!(renumber_citations(text, &map), "[3] and [1]");
    }

    #[test]
    fn untouched_when_no_mapping_present() {
        let map = HashMap::new();
        assert_eq!(renumber_citations("[5] stays", &map), "[5] stays");
    }
}
