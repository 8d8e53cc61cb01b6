pub mod analyze;
pub mod client;
pub mod fallback;
pub mod normalize;
pub mod provider;
pub mod summary;
pub mod tba;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Domain types: clean model, independent of TBA wire format
// ---------------------------------------------------------------------------

/// A single competition match, already mapped out of the upstream JSON.
#[derive(Debug, Clone, Default)]
pub struct MatchRecord {
    pub key: String,
    pub comp_level: CompLevel,
    pub blue: Alliance,
    pub red: Alliance,
    pub winner: Winner,
}

impl MatchRecord {
    /// Absolute score difference, `None` until both alliances have a score.
    pub fn margin(&self) -> Option<i64> {
        let blue = self.blue.score?;
        let red = self.red.score?;
        Some((blue - red).abs())
    }

    pub fn margin_bucket(&self) -> MarginBucket {
        MarginBucket::from_margin(self.margin())
    }

    pub fn is_played(&self) -> bool {
        self.blue.score.is_some() && self.red.score.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Alliance {
    pub teams: Vec<String>, // team numbers, "frc" prefix already stripped
    pub score: Option<i64>, // None = not yet played
    pub breakdown: ScoreBreakdown,
}

impl Alliance {
    pub fn roster(&self) -> String {
        if self.teams.is_empty() {
            "-".to_owned()
        } else {
            self.teams.join(", ")
        }
    }

    pub fn score_text(&self) -> String {
        self.score.map(|s| s.to_string()).unwrap_or_else(|| "-".to_owned())
    }
}

/// Season-specific scoring detail for one alliance.
///
/// Field names change every season, so this is an open map. Only scalar
/// fields survive mapping: numbers as-is, booleans as 1.0 / 0.0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreBreakdown {
    pub fields: BTreeMap<String, f64>,
}

impl ScoreBreakdown {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.fields.get(name).copied()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompLevel {
    Qualification,
    EighthFinal,
    QuarterFinal,
    SemiFinal,
    Final,
    #[default]
    Unknown,
}

impl CompLevel {
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "qm" => CompLevel::Qualification,
            "ef" => CompLevel::EighthFinal,
            "qf" => CompLevel::QuarterFinal,
            "sf" => CompLevel::SemiFinal,
            "f" => CompLevel::Final,
            _ => CompLevel::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CompLevel::Qualification => "qualification match",
            CompLevel::EighthFinal => "eighth-final playoff match",
            CompLevel::QuarterFinal => "quarterfinal match",
            CompLevel::SemiFinal => "semifinal match",
            CompLevel::Final => "finals match",
            CompLevel::Unknown => "match",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Winner {
    Blue,
    Red,
    Tie,
    #[default]
    Unset,
}

impl Winner {
    pub fn as_str(&self) -> &'static str {
        match self {
            Winner::Blue => "blue",
            Winner::Red => "red",
            Winner::Tie => "tie",
            Winner::Unset => "unset",
        }
    }
}

/// Verb for a match with no winner to name.
pub const TIE_VERB: &str = "ties";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarginBucket {
    Narrow,
    Moderate,
    Decisive,
    Dominant,
    Pending, // match not played yet
}

impl MarginBucket {
    pub fn from_margin(margin: Option<i64>) -> Self {
        match margin {
            None => MarginBucket::Pending,
            Some(m) if m <= 5 => MarginBucket::Narrow,
            Some(m) if m <= 25 => MarginBucket::Moderate,
            Some(m) if m <= 50 => MarginBucket::Decisive,
            Some(_) => MarginBucket::Dominant,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarginBucket::Narrow => "narrow",
            MarginBucket::Moderate => "moderate",
            MarginBucket::Decisive => "decisive",
            MarginBucket::Dominant => "dominant",
            MarginBucket::Pending => "pending",
        }
    }

    /// Verb used in the "<winner> <verb> <loser>" phrase.
    pub fn verb(&self) -> &'static str {
        match self {
            MarginBucket::Narrow => "edges out",
            MarginBucket::Moderate => "prevails over",
            MarginBucket::Decisive => "defeats",
            MarginBucket::Dominant => "dominates",
            MarginBucket::Pending => TIE_VERB,
        }
    }
}

/// One comparable breakdown field, present and scalar on both alliances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Factor {
    pub name: String,
    pub blue: f64,
    pub red: f64,
    pub diff: f64, // blue - red
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact_rank: Option<u8>,
}

impl Factor {
    pub fn new(name: impl Into<String>, blue: f64, red: f64) -> Self {
        Self { name: name.into(), blue, red, diff: blue - red, impact_rank: None }
    }
}

/// Response of one summary pipeline pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSummaryResult {
    pub summary: String,
    pub model: String, // provider name, or "fallback"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_used: Option<String>,
    pub fallback_used: bool,
    pub factors: Vec<Factor>,
}
