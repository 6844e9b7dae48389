//! OpenLigaDB adapter. No auth, one response per league season.
//!
//! Field casing differs between dumps (`MatchID` vs `matchID`), so matches are
//! read as loose JSON and looked up case-insensitively.

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use serde_json::Value as JsonValue;
use tracing::info;

use super::flatten::{Flattened, Flattener};
use super::http::{HttpSettings, HttpSource};
use super::normalize::{join_key, parse_timestamp};
use crate::error::AdapterError;
use crate::warehouse::schema::MATCHES;
use crate::warehouse::Record;

pub const DEFAULT_BASE_URL: &str = "https://api.openligadb.de";
pub const SOURCE: &str = "openligadb";

/// `resultTypeID` of the full-time score.
const FINAL_RESULT: i64 = 2;

pub struct OpenLigaDb {
    http: HttpSource,
}

impl OpenLigaDb {
    pub fn new(base_url: &str, settings: &HttpSettings) -> Result<Self, AdapterError> {
        Ok(Self {
            http: HttpSource::new(SOURCE, base_url, HeaderMap::new(), settings)?,
        })
    }

    /// All matches of a league season (`bl1`, 2023 = season 2023/24) -> `matches`.
    pub async fn match_data(&self, league: &str, season: i32) -> Result<Flattened, AdapterError> {
        let path = format!("getmatchdata/{}/{}", league, season);
        let payload: JsonValue = self.http.get_json(&path, &[]).await?;

        let matches = payload.as_array().map(Vec::as_slice).unwrap_or_default();
        info!(league, season, matches = matches.len(), "Fetched OpenLigaDB matches");
        flatten_matches(matches, season, Utc::now()).require_rows(&format!("{}:{}", SOURCE, path))
    }
}

fn flatten_matches(matches: &[JsonValue], season: i32, now: DateTime<Utc>) -> Flattened {
    let mut out = Flattener::new(MATCHES);
    for m in matches {
        let Some(match_id) = field(m, "matchID").and_then(as_i64) else {
            out.drop("missing match id");
            continue;
        };
        let team1 = field(m, "team1");
        let team2 = field(m, "team2");
        let home_id = team1.and_then(|t| field(t, "teamId")).and_then(as_i64);
        let away_id = team2.and_then(|t| field(t, "teamId")).and_then(as_i64);
        let (Some(home_id), Some(away_id)) = (home_id, away_id) else {
            out.drop("missing team ids");
            continue;
        };
        let home_name = team1.and_then(|t| text(t, "teamName")).unwrap_or_default();
        let away_name = team2.and_then(|t| text(t, "teamName")).unwrap_or_default();

        // `matchDateTime` is Berlin wall-clock time; only the UTC member is used.
        let kickoff = text(m, "matchDateTimeUTC").and_then(parse_timestamp);
        let finished = field(m, "matchIsFinished")
            .and_then(JsonValue::as_bool)
            .unwrap_or(false);
        let status = match kickoff {
            _ if finished => "FT",
            Some(k) if k <= now => "LIVE",
            _ => "NS",
        };
        let (home_goals, away_goals) = final_score(m);
        let venue = field(m, "location").and_then(|l| {
            text(l, "locationStadium").or_else(|| text(l, "locationCity"))
        });

        out.push(
            Record::new()
                .set("match_id", match_id)
                .set("league_id", field(m, "leagueId").and_then(as_i64))
                .set("season", season)
                .set(
                    "matchday",
                    field(m, "group")
                        .and_then(|g| field(g, "groupOrderID"))
                        .and_then(as_i64),
                )
                .set("kickoff_ts", kickoff)
                .set("home_id", home_id)
                .set("away_id", away_id)
                .set("home_team", home_name)
                .set("away_team", away_name)
                .set("home_goals", home_goals)
                .set("away_goals", away_goals)
                .set("venue", venue)
                .set("status", status)
                .set("join_key", join_key(kickoff, home_name, away_name))
                .set("updated_ts", now),
        );
    }
    out.finish()
}

/// Full-time score, falling back to the latest result reported.
fn final_score(m: &JsonValue) -> (Option<i64>, Option<i64>) {
    let results = field(m, "matchResults")
        .and_then(JsonValue::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let result = results
        .iter()
        .find(|r| field(r, "resultTypeID").and_then(as_i64) == Some(FINAL_RESULT))
        .or_else(|| results.last());
    match result {
        Some(r) => (
            field(r, "pointsTeam1").and_then(as_i64),
            field(r, "pointsTeam2").and_then(as_i64),
        ),
        None => (None, None),
    }
}

fn field<'a>(obj: &'a JsonValue, name: &str) -> Option<&'a JsonValue> {
    obj.as_object()?
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v)
        .filter(|v| !v.is_null())
}

fn text<'a>(obj: &'a JsonValue, name: &str) -> Option<&'a str> {
    field(obj, name)
        .and_then(JsonValue::as_str)
        .filter(|s| !s.is_empty())
}

fn as_i64(v: &JsonValue) -> Option<i64> {
    match v {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
