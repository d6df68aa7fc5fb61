//! Structured-text parsers (§4.5).
//!
//! All parsers are defensive: input length is capped before any regex runs (the original's
//! catastrophic-backtracking hazard note in §9), parsing is anchor-bounded rather than
//! greedy, and outputs are length-capped. Prompt wording itself is out of scope — these
//! parsers bind only to the anchor strings below.

mod dossier;
mod overview;
mod pick_urls;
mod plan;
mod synthesis;
mod think;

pub use dossier::parse_dossier;
pub use overview::parse_overview;
pub use pick_urls::{parse_pick_urls, regex_url_scrape};
pub use plan::parse_plan;
pub use synthesis::parse_synthesis;
pub use think::parse_think;

/// Input cap applied before any parser runs a regex over the text.
pub const MAX_PARSE_INPUT: usize = 500_000;

pub(crate) fn cap_input(input: &str) -> &str {
    if input.len() > MAX_PARSE_INPUT {
        let boundary = (0..=MAX_PARSE_INPUT).rev().find(|&i| input.is_char_boundary(i)).unwrap_or(0);
        &input[..boundary]
    } else {
        input
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caps_without_splitting_a_multi_byte_char_at_the_boundary() {
        // Pad so the cap falls in the middle of a 4-byte emoji, regardless of where exactly.
        let mut s = "a".repeat(MAX_PARSE_INPUT - 2);
        s.push('💡');
        s.push_str(&"b".repeat(1_000));
        let capped = cap_input(&s);
        assert!(capped.len() <= MAX_PARSE_INPUT);
        assert!(s.is_char_boundary(capped.len()));
    }
}
