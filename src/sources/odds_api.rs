//! The Odds API v4 adapter: one head-to-head snapshot per sport key.

use chrono::{DateTime, Datelike, Utc};
use reqwest::header::HeaderMap;
use serde::Deserialize;
use tracing::info;

use super::flatten::{Flattened, Flattener};
use super::http::{HttpSettings, HttpSource};
use super::normalize::join_key;
use crate::error::AdapterError;
use crate::warehouse::schema::ODDS_H2H;
use crate::warehouse::Record;

pub const DEFAULT_BASE_URL: &str = "https://api.the-odds-api.com/v4";
pub const SOURCE: &str = "the-odds-api";

/// The Odds API event structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct OddsApiEvent {
    pub id: String,
    pub sport_key: String,
    pub sport_title: String,
    pub commence_time: Option<DateTime<Utc>>,
    pub home_team: String,
    pub away_team: String,
    pub bookmakers: Vec<Bookmaker>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Bookmaker {
    pub key: String,
    pub title: String,
    pub last_update: Option<DateTime<Utc>>,
    pub markets: Vec<Market>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Market {
    pub key: String,
    pub last_update: Option<DateTime<Utc>>,
    pub outcomes: Vec<Outcome>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Outcome {
    pub name: String,
    /// Decimal odds.
    pub price: Option<f64>,
}

pub struct OddsApi {
    http: HttpSource,
    api_key: String,
    regions: String,
}

impl OddsApi {
    pub fn new(
        api_key: &str,
        base_url: &str,
        regions: &str,
        settings: &HttpSettings,
    ) -> Result<Self, AdapterError> {
        Ok(Self {
            http: HttpSource::new(SOURCE, base_url, HeaderMap::new(), settings)?,
            api_key: api_key.to_string(),
            regions: regions.to_string(),
        })
    }

    /// Current match-result odds for every upcoming event of `sport_key` -> `odds_h2h`.
    pub async fn h2h(&self, sport_key: &str) -> Result<Flattened, AdapterError> {
        let path = format!("sports/{}/odds", sport_key);
        let events: Vec<OddsApiEvent> = self
            .http
            .get_json(
                &path,
                &[
                    ("apiKey", self.api_key.clone()),
                    ("regions", self.regions.clone()),
                    ("markets", "h2h".to_string()),
                    ("oddsFormat", "decimal".to_string()),
                    ("dateFormat", "iso".to_string()),
                ],
            )
            .await?;

        info!("Fetched {} events from The Odds API for {}", events.len(), sport_key);
        flatten_h2h(&events, Utc::now()).require_rows(&format!("{}:{}", SOURCE, path))
    }
}

/// One row per event x bookmaker x h2h market with the three prices side by side.
fn flatten_h2h(events: &[OddsApiEvent], now: DateTime<Utc>) -> Flattened {
    let mut out = Flattener::new(ODDS_H2H);
    for event in events {
        if event.id.is_empty() {
            out.drop("missing event id");
            continue;
        }
        let key = join_key(event.commence_time, &event.home_team, &event.away_team);

        for bookmaker in &event.bookmakers {
            for market in bookmaker.markets.iter().filter(|m| m.key == "h2h") {
                let (home, draw, away) = split_prices(event, market);
                let bookmaker_key = if bookmaker.key.is_empty() {
                    &bookmaker.title
                } else {
                    &bookmaker.key
                };
                out.push(
                    Record::new()
                        .set("event_id", event.id.as_str())
                        .set("bookmaker", non_empty(bookmaker_key))
                        .set("market", market.key.as_str())
                        .set("bookmaker_title", non_empty(&bookmaker.title))
                        .set("sport_key", event.sport_key.as_str())
                        .set("sport_title", event.sport_title.as_str())
                        .set("commence_time", event.commence_time)
                        .set("season", event.commence_time.map(|t| t.year()))
                        .set("home_team", event.home_team.as_str())
                        .set("away_team", event.away_team.as_str())
                        .set("price_home", home)
                        .set("price_draw", draw)
                        .set("price_away", away)
                        .set("last_update", market.last_update.or(bookmaker.last_update))
                        .set("join_key", key.as_str())
                        .set("updated_ts", now),
                );
            }
        }
    }
    out.finish()
}

/// Outcomes are named after the teams, with "Draw" for the third way.
fn split_prices(event: &OddsApiEvent, market: &Market) -> (Option<f64>, Option<f64>, Option<f64>) {
    let (mut home, mut draw, mut away) = (None, None, None);
    for outcome in &market.outcomes {
        let name = outcome.name.as_str();
        if name == event.home_team || name == "Home" {
            home = outcome.price;
        } else if name == event.away_team || name == "Away" {
            away = outcome.price;
        } else if matches!(name, "Draw" | "Tie" | "X") {
            draw = outcome.price;
        }
    }
    (home, draw, away)
}

fn non_empty(s: &str) -> Option<&str> {
    Some(s).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::Value;
    use chrono::TimeZone;
    use serde_json::json;

    fn events() -> Vec<OddsApiEvent> {
        serde_json::from_value(json!([
            {
                "id": "e912304de2b2ce35b473ce2ecd3d1502",
                "sport_key": "soccer_epl",
                "sport_title": "EPL",
                "commence_time": "2024-08-16T19:00:00Z",
                "home_team": "Manchester United",
                "away_team": "Fulham",
                "bookmakers": [{
                    "key": "unibet_eu",
                    "title": "Unibet",
                    "last_update": "2024-08-16T10:00:00Z",
                    "markets": [{
                        "key": "h2h",
                        "outcomes": [
                            {"name": "Fulham", "price": 5.6},
                            {"name": "Manchester United", "price": 1.6},
                            {"name": "Draw", "price": 4.2}
                        ]
                    }, {
                        "key": "totals",
                        "outcomes": [{"name": "Over", "price": 1.9, "point": 2.5}]
                    }]
                }]
            },
            {"sport_key": "soccer_epl", "home_team": "Nobody", "away_team": "Noone"}
        ]))
        .unwrap()
    }

    #[test]
    fn h2h_prices_land_side_by_side() {
        let now = Utc.with_ymd_and_hms(2024, 8, 16, 12, 0, 0).unwrap();
        let out = flatten_h2h(&events(), now);

        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.drop_reasons["missing event id"], 1);
        let col = |name: &str| out.rows.column(name).unwrap().values[0].clone();
        assert_eq!(col("bookmaker"), Value::Text("unibet_eu".into()));
        assert_eq!(col("price_home"), Value::Float(1.6));
        assert_eq!(col("price_draw"), Value::Float(4.2));
        assert_eq!(col("price_away"), Value::Float(5.6));
        assert_eq!(col("season"), Value::Integer(2024));
        assert_eq!(col("join_key"), Value::Text("2024-08-16|manchester united|fulham".into()));
        // The market carries no timestamp of its own here.
        assert_eq!(
            col("last_update"),
            Value::Timestamp(Utc.with_ymd_and_hms(2024, 8, 16, 10, 0, 0).unwrap())
        );
    }
}
