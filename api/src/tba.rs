/// The Blue Alliance raw wire types: serde shapes for match JSON.
/// Endpoint: https://www.thebluealliance.com/api/v3/match/{key}
///
/// Every field goes through `lenient`: a missing or mistyped value becomes
/// `None` instead of failing the whole document. Callers post hand-built
/// match objects too, so nothing here can be trusted to match the schema.
use crate::{Alliance, CompLevel, MatchRecord, ScoreBreakdown, Winner};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

#[derive(Deserialize, Default, Debug)]
pub struct TbaMatch {
    #[serde(default, deserialize_with = "lenient")]
    pub key: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub comp_level: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub alliances: Option<TbaAlliances>,
    /// "blue", "red", or "" (tie / not played).
    #[serde(default, deserialize_with = "lenient")]
    pub winning_alliance: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub score_breakdown: Option<TbaScoreBreakdowns>,
}

#[derive(Deserialize, Default, Debug)]
pub struct TbaAlliances {
    #[serde(default, deserialize_with = "lenient")]
    pub blue: Option<TbaAlliance>,
    #[serde(default, deserialize_with = "lenient")]
    pub red: Option<TbaAlliance>,
}

#[derive(Deserialize, Default, Debug)]
pub struct TbaAlliance {
    #[serde(default, deserialize_with = "lenient")]
    pub team_keys: Option<Vec<Value>>,
    /// -1 until the match is played.
    #[serde(default, deserialize_with = "lenient")]
    pub score: Option<f64>,
}

#[derive(Deserialize, Default, Debug)]
pub struct TbaScoreBreakdowns {
    #[serde(default, deserialize_with = "lenient")]
    pub blue: Option<Map<String, Value>>,
    #[serde(default, deserialize_with = "lenient")]
    pub red: Option<Map<String, Value>>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Serde hook for request bodies carrying an inline match object.
/// Anything that is not a JSON object counts as "no match supplied".
pub fn lenient_match<'de, D>(deserializer: D) -> Result<Option<MatchRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<TbaMatch> = lenient(deserializer)?;
    Ok(raw.map(map_match))
}

/// Map an arbitrary JSON document to a match record. Never fails: a value
/// that is not an object yields an empty record.
pub fn match_from_value(value: Value) -> MatchRecord {
    map_match(serde_json::from_value(value).unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Mapping: TBA wire types → clean domain types
// ---------------------------------------------------------------------------

fn map_match(raw: TbaMatch) -> MatchRecord {
    let alliances = raw.alliances.unwrap_or_default();
    let breakdowns = raw.score_breakdown.unwrap_or_default();

    let blue = map_alliance(alliances.blue.unwrap_or_default(), breakdowns.blue);
    let red = map_alliance(alliances.red.unwrap_or_default(), breakdowns.red);

    let winner = match raw.winning_alliance.as_deref().map(str::trim) {
        Some("blue") => Winner::Blue,
        Some("red") => Winner::Red,
        _ => match (blue.score, red.score) {
            (Some(b), Some(r)) if b == r => Winner::Tie,
            _ => Winner::Unset,
        },
    };

    MatchRecord {
        key: raw.key.unwrap_or_default(),
        comp_level: raw
            .comp_level
            .as_deref()
            .map(CompLevel::from_tag)
            .unwrap_or_default(),
        blue,
        red,
        winner,
    }
}

fn map_alliance(raw: TbaAlliance, breakdown: Option<Map<String, Value>>) -> Alliance {
    let teams = raw
        .team_keys
        .unwrap_or_default()
        .iter()
        .filter_map(team_number)
        .collect();

    let score = raw
        .score
        .filter(|s| s.is_finite() && *s >= 0.0)
        .map(|s| s.round() as i64);

    Alliance {
        teams,
        score,
        breakdown: breakdown.map(map_breakdown).unwrap_or_default(),
    }
}

fn team_number(key: &Value) -> Option<String> {
    let raw = match key {
        Value::String(s) => s.trim().to_owned(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let number = raw
        .strip_prefix("frc")
        .or_else(|| raw.strip_prefix("FRC"))
        .unwrap_or(&raw);
    if number.is_empty() {
        None
    } else {
        Some(number.to_owned())
    }
}

fn map_breakdown(raw: Map<String, Value>) -> ScoreBreakdown {
    let fields = raw
        .into_iter()
        .filter_map(|(name, value)| {
            let scalar = match value {
                Value::Number(n) => n.as_f64(),
                Value::Bool(b) => Some(if b { 1.0 } else { 0.0 }),
                _ => None,
            };
            scalar.map(|v| (name, v))
        })
        .collect();
    ScoreBreakdown { fields }
}
