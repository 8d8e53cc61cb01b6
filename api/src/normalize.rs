//! Turns a match record into everything the summary pipeline needs:
//! the provider prompt, the deterministic fallback line and ranked factors.

use crate::analyze::{Hint, decisive_hints};
use crate::fallback::{self, NO_MATCH_PROMPT, UNAVAILABLE_SUMMARY};
use crate::{Alliance, Factor, MatchRecord, ScoreBreakdown};
use serde_json::json;

/// Factors returned to callers and embedded in the prompt.
pub const MAX_FACTORS: usize = 8;
/// Factors that receive an `impactRank`.
pub const RANKED_FACTORS: usize = 3;

pub const STRUCTURED_JSON_PREFIX: &str = "STRUCTURED_JSON=";

#[derive(Debug, Clone, Default)]
pub struct NormalizedMatch {
    pub prompt_text: String,
    pub fallback_summary: String,
    pub factors: Vec<Factor>, // at most MAX_FACTORS, ranked
    pub hints: Vec<Hint>,
}

/// Total: any record, however sparse, yields a non-empty prompt and
/// fallback line. A missing record is a handled case, not an error.
pub fn normalize(record: Option<&MatchRecord>) -> NormalizedMatch {
    let Some(record) = record else {
        return NormalizedMatch {
            prompt_text: NO_MATCH_PROMPT.to_owned(),
            fallback_summary: UNAVAILABLE_SUMMARY.to_owned(),
            ..Default::default()
        };
    };

    let margin = record.margin();
    let mut factors = extract_factors(&record.blue.breakdown, &record.red.breakdown);
    // Hints look at every factor, not just the ones that make the cut.
    let hints = decisive_hints(&factors, record.winner, margin);
    factors.truncate(MAX_FACTORS);

    let structured = json!({
        "meta": {
            "key": record.key,
            "level": record.comp_level.label(),
            "winner": record.winner.as_str(),
            "margin": margin,
            "marginBucket": record.margin_bucket().as_str(),
        },
        "alliances": {
            "blue": alliance_json(&record.blue),
            "red": alliance_json(&record.red),
        },
        "factors": factors,
        "decisiveHints": hints,
    });

    let prompt_text = format!(
        "{}\n{STRUCTURED_JSON_PREFIX}{structured}",
        base_description(record)
    );

    NormalizedMatch {
        prompt_text,
        fallback_summary: fallback::fallback_summary(record, hints.first().copied()),
        factors,
        hints,
    }
}

/// Build factors from fields scalar on both alliances, skipping aggregate
/// `total*` keys. Sorted by descending |diff| (stable, so equal diffs keep
/// key order); the top `RANKED_FACTORS` get an impact rank.
pub fn extract_factors(blue: &ScoreBreakdown, red: &ScoreBreakdown) -> Vec<Factor> {
    let mut factors: Vec<Factor> = blue
        .fields
        .iter()
        .filter(|(name, _)| !is_total(name))
        .filter_map(|(name, &b)| red.get(name).map(|r| Factor::new(name.as_str(), b, r)))
        .collect();

    factors.sort_by(|a, b| b.diff.abs().total_cmp(&a.diff.abs()));

    for (rank, factor) in factors.iter_mut().take(RANKED_FACTORS).enumerate() {
        factor.impact_rank = Some(rank as u8 + 1);
    }
    factors
}

fn is_total(name: &str) -> bool {
    name.get(..5)
        .map(|prefix| prefix.eq_ignore_ascii_case("total"))
        .unwrap_or(false)
}

fn base_description(record: &MatchRecord) -> String {
    let key = if record.key.is_empty() { "(no key)" } else { record.key.as_str() };
    format!(
        "{} {key}. Blue alliance ({}) scored {}; Red alliance ({}) scored {}. Winner: {}.",
        capitalize(record.comp_level.label()),
        record.blue.roster(),
        record.blue.score_text(),
        record.red.roster(),
        record.red.score_text(),
        record.winner.as_str(),
    )
}

fn alliance_json(alliance: &Alliance) -> serde_json::Value {
    json!({ "teams": alliance.teams, "score": alliance.score })
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}
