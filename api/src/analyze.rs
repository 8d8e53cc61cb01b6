//! Decides which breakdown factors plausibly explain a match result.

use crate::{Factor, Winner};
use serde::Serialize;

/// Fraction of the margin a foul factor must cover to count.
const FOUL_SHARE: f64 = 0.5;
/// Fraction of the margin an auto or endgame factor must cover to count.
const PHASE_SHARE: f64 = 0.35;

/// Breakdown keys that carry foul points, 2019–2025 seasons.
const FOUL_KEYS: [&str; 2] = ["foulpoints", "penaltypoints"];
const AUTO_KEYS: [&str; 1] = ["autopoints"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactorCategory {
    Foul,
    Auto,
    Endgame,
    Other,
}

impl FactorCategory {
    /// Classify a breakdown key. Endgame keys change name every season
    /// (`endGamePoints`, `endGameTotalStagePoints`, `endGameBargePoints`),
    /// so they are matched by shape rather than by a fixed list.
    pub fn classify(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if FOUL_KEYS.contains(&lower.as_str()) {
            FactorCategory::Foul
        } else if AUTO_KEYS.contains(&lower.as_str()) {
            FactorCategory::Auto
        } else if lower.starts_with("endgame") && lower.ends_with("points") {
            FactorCategory::Endgame
        } else {
            FactorCategory::Other
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Hint {
    #[serde(rename = "penalties")]
    Penalties,
    #[serde(rename = "auto performance")]
    AutoPerformance,
    #[serde(rename = "endgame execution")]
    EndgameExecution,
}

impl Hint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Hint::Penalties => "penalties",
            Hint::AutoPerformance => "auto performance",
            Hint::EndgameExecution => "endgame execution",
        }
    }
}

/// Checked in this order; the first hit is the one the fallback line shows.
const CHECKS: [(FactorCategory, f64, Hint); 3] = [
    (FactorCategory::Foul, FOUL_SHARE, Hint::Penalties),
    (FactorCategory::Auto, PHASE_SHARE, Hint::AutoPerformance),
    (FactorCategory::Endgame, PHASE_SHARE, Hint::EndgameExecution),
];

/// Derive decisive hints from factors ranked by descending |diff|.
///
/// Each category is judged on its highest-ranked factor. A factor only
/// counts when it points the same way as the result and covers the required
/// share of the margin. Unplayed matches (no margin) and ties produce nothing.
pub fn decisive_hints(factors: &[Factor], winner: Winner, margin: Option<i64>) -> Vec<Hint> {
    let Some(margin) = margin else {
        return Vec::new();
    };
    let margin = margin as f64;

    CHECKS
        .iter()
        .filter_map(|&(category, share, hint)| {
            let factor = factors
                .iter()
                .find(|f| FactorCategory::classify(&f.name) == category)?;
            let decisive = favors_winner(factor, winner) && factor.diff.abs() >= margin * share;
            decisive.then_some(hint)
        })
        .collect()
}

fn favors_winner(factor: &Factor, winner: Winner) -> bool {
    match winner {
        Winner::Blue => factor.diff > 0.0,
        Winner::Red => factor.diff < 0.0,
        Winner::Tie | Winner::Unset => false,
    }
}
