//! Small text helpers shared by the adapters: team-name folding, the fuzzy
//! cross-provider join key, round parsing and lenient timestamp parsing.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Fold a team name for cross-provider matching.
///
/// Lowercases, turns every run of non-alphanumerics into one space and drops
/// `fc`/`sc` tokens after the first word ("Chelsea FC" and "Chelsea" agree).
pub fn normalize_team(name: &str) -> String {
    let lowered = name.to_lowercase();
    let tokens: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    tokens
        .iter()
        .enumerate()
        .filter(|(i, t)| *i == 0 || !matches!(**t, "fc" | "sc"))
        .map(|(_, t)| *t)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `YYYY-MM-DD|home|away` on the UTC kickoff date. An unknown kickoff leaves
/// the date part empty.
pub fn join_key(kickoff: Option<DateTime<Utc>>, home: &str, away: &str) -> String {
    let date = kickoff
        .map(|k| k.format("%Y-%m-%d").to_string())
        .unwrap_or_default();
    format!("{}|{}|{}", date, normalize_team(home), normalize_team(away))
}

/// "Regular Season - 12" -> 12. Cup rounds like "Final" have no matchday.
pub fn parse_matchday(round: &str) -> Option<i64> {
    let tail = round.rsplit('-').next()?.trim();
    if tail.is_empty() || !tail.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    tail.parse().ok()
}

/// RFC 3339 timestamps as-is; offset-less ones are taken to be UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
