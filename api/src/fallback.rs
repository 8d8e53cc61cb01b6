//! Deterministic one-line summaries. No I/O, always non-empty.

use crate::analyze::Hint;
use crate::{MatchRecord, TIE_VERB, Winner};

pub const NO_MATCH_PROMPT: &str = "No match data provided";
pub const UNAVAILABLE_SUMMARY: &str = "Summary unavailable";
pub const UPCOMING_SUMMARY: &str = "Upcoming match";
pub const FETCH_FAILED_SUMMARY: &str = "Failed to fetch match data";

/// "Blue alliance dominates Red", "Red alliance edges out Blue", ...
/// Without a winner the phrase reads "Blue alliance ties Red".
pub fn winner_phrase(record: &MatchRecord) -> String {
    let verb = record.margin_bucket().verb();
    match record.winner {
        Winner::Blue => format!("Blue alliance {verb} Red"),
        Winner::Red => format!("Red alliance {verb} Blue"),
        Winner::Tie | Winner::Unset => format!("Blue alliance {TIE_VERB} Red"),
    }
}

/// `"<winner phrase>: <blue> - <red>[ (factor: <hint>)]"`, or
/// `"Upcoming match"` until both scores are known.
pub fn fallback_summary(record: &MatchRecord, first_hint: Option<Hint>) -> String {
    if !record.is_played() {
        return UPCOMING_SUMMARY.to_owned();
    }
    let mut line = format!(
        "{}: {} - {}",
        winner_phrase(record),
        record.blue.score_text(),
        record.red.score_text()
    );
    if let Some(hint) = first_hint {
        line.push_str(&format!(" (factor: {})", hint.as_str()));
    }
    line
}
