//! API-Football v3 adapter.
//!
//! Header-token auth (`x-apisports-key`), a `{errors, results, paging,
//! response}` envelope on every endpoint and page-number pagination on
//! `/players` and `/odds`.

use std::marker::PhantomData;

use chrono::{DateTime, NaiveDate, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use super::flatten::{Flattened, Flattener};
use super::http::{HttpSettings, HttpSource};
use super::normalize::{parse_matchday, parse_timestamp};
use crate::error::AdapterError;
use crate::warehouse::schema::{
    DIM_LEAGUE, DIM_PLAYER, DIM_TEAM, FACT_FIXTURES, FACT_INJURIES, FACT_ODDS, FACT_PLAYER_STATS,
    FACT_PLAYER_STATS_MATCH, FACT_STANDINGS_SNAPSHOT,
};
use crate::warehouse::{Record, Value};

pub const DEFAULT_BASE_URL: &str = "https://v3.football.api-sports.io";
pub const SOURCE: &str = "api-football";

/// Bet names kept by [`ApiFootball::odds`] unless configured otherwise.
pub const DEFAULT_MARKETS: &[&str] = &["match winner", "goals over/under", "both teams score"];

pub struct ApiFootball {
    http: HttpSource,
    markets: Vec<String>,
}

impl ApiFootball {
    pub fn new(api_key: &str, base_url: &str, settings: &HttpSettings) -> Result<Self, AdapterError> {
        let mut token = HeaderValue::from_str(api_key).map_err(|e| AdapterError::Client {
            source_name: SOURCE.to_string(),
            reason: format!("invalid API key header: {}", e),
        })?;
        token.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert("x-apisports-key", token);

        Ok(Self {
            http: HttpSource::new(SOURCE, base_url, headers, settings)?,
            markets: DEFAULT_MARKETS.iter().map(|m| m.to_string()).collect(),
        })
    }

    /// Restrict `/odds` to these bet names (case-insensitive). Empty keeps every market.
    pub fn with_markets(mut self, markets: Vec<String>) -> Self {
        self.markets = markets.into_iter().map(|m| m.to_lowercase()).collect();
        self
    }

    async fn call<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<Envelope<T>, AdapterError> {
        let envelope: Envelope<T> = self.http.get_json(endpoint, params).await?;
        if has_errors(&envelope.errors) {
            return Err(AdapterError::Api {
                endpoint: label(endpoint),
                params: params_label(params),
                errors: envelope.errors,
            });
        }
        debug!(
            endpoint,
            results = envelope.results.unwrap_or(envelope.response.len() as i64),
            "api-football response"
        );
        Ok(envelope)
    }

    /// Every league the provider knows -> `dim_league`.
    pub async fn leagues(&self) -> Result<Flattened, AdapterError> {
        let items: Vec<LeagueItem> = self.call("leagues", &[]).await?.response;
        flatten_leagues(&items).require_rows(&label("leagues"))
    }

    pub async fn teams(&self, league_id: i64, season: i32) -> Result<Flattened, AdapterError> {
        let items: Vec<TeamItem> = self.call("teams", &season_params(league_id, season)).await?.response;
        flatten_teams(&items).require_rows(&label("teams"))
    }

    pub async fn fixtures(&self, league_id: i64, season: i32) -> Result<Flattened, AdapterError> {
        let items: Vec<FixtureItem> = self
            .call("fixtures", &season_params(league_id, season))
            .await?
            .response;
        flatten_fixtures(&items, league_id, season, Utc::now()).require_rows(&label("fixtures"))
    }

    /// Per-player statistics of one fixture -> `fact_player_stats_match`.
    pub async fn fixture_players(
        &self,
        fixture_id: i64,
        league_id: i64,
        season: i32,
    ) -> Result<Flattened, AdapterError> {
        let items: Vec<FixtureTeamPlayers> = self
            .call("fixtures/players", &[("fixture", fixture_id.to_string())])
            .await?
            .response;
        flatten_fixture_players(&items, fixture_id, league_id, season, Utc::now())
            .require_rows(&label("fixtures/players"))
    }

    pub async fn standings(&self, league_id: i64, season: i32) -> Result<Flattened, AdapterError> {
        let items: Vec<StandingsItem> = self
            .call("standings", &season_params(league_id, season))
            .await?
            .response;
        flatten_standings(&items, league_id, season, Utc::now()).require_rows(&label("standings"))
    }

    pub async fn injuries(&self, league_id: i64, season: i32) -> Result<Flattened, AdapterError> {
        let items: Vec<InjuryItem> = self
            .call("injuries", &season_params(league_id, season))
            .await?
            .response;
        flatten_injuries(&items, league_id, season, Utc::now()).require_rows(&label("injuries"))
    }

    /// Paged season statistics. Each page yields `dim_player` and `fact_player_stats` rows.
    pub fn players(&self, league_id: i64, season: i32) -> PlayerPages<'_> {
        PlayerPages {
            pages: Pages::new(self, "players", season_params(league_id, season)),
            tally: Tally::default(),
            league_id,
            season,
        }
    }

    /// Paged pre-match odds -> `fact_odds`, limited to the configured markets.
    pub fn odds(&self, league_id: i64, season: i32) -> OddsPages<'_> {
        OddsPages {
            pages: Pages::new(self, "odds", season_params(league_id, season)),
            tally: Tally::default(),
            markets: &self.markets,
            league_id,
            season,
        }
    }
}

fn season_params(league_id: i64, season: i32) -> Vec<(&'static str, String)> {
    vec![("league", league_id.to_string()), ("season", season.to_string())]
}

fn label(endpoint: &str) -> String {
    format!("{}:{}", SOURCE, endpoint)
}

fn params_label(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// The provider reports plan, quota and parameter problems with HTTP 200 and
/// a non-empty `errors` member, either an object or an array.
fn has_errors(errors: &JsonValue) -> bool {
    match errors {
        JsonValue::Null | JsonValue::Bool(false) => false,
        JsonValue::Array(a) => !a.is_empty(),
        JsonValue::Object(o) => !o.is_empty(),
        JsonValue::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

/// Walks a page-numbered endpoint. Ends on an empty page or once the
/// reported page count is reached; an empty first page is an error.
struct Pages<'a, T> {
    api: &'a ApiFootball,
    endpoint: &'static str,
    params: Vec<(&'static str, String)>,
    next: Option<u32>,
    _item: PhantomData<T>,
}

impl<'a, T: DeserializeOwned> Pages<'a, T> {
    fn new(api: &'a ApiFootball, endpoint: &'static str, params: Vec<(&'static str, String)>) -> Self {
        Self {
            api,
            endpoint,
            params,
            next: Some(1),
            _item: PhantomData,
        }
    }

    async fn next_page(&mut self) -> Result<Option<Vec<T>>, AdapterError> {
        let Some(page) = self.next else {
            return Ok(None);
        };
        let mut params = self.params.clone();
        params.push(("page", page.to_string()));

        let envelope: Envelope<T> = self.api.call(self.endpoint, &params).await?;
        if envelope.response.is_empty() {
            self.next = None;
            if page == 1 {
                return Err(AdapterError::NoUsableRows {
                    endpoint: label(self.endpoint),
                    received: 0,
                    dropped: 0,
                });
            }
            return Ok(None);
        }

        let Paging { current, total } = envelope.paging;
        self.next = match (current, total) {
            (Some(current), Some(total)) if current >= total => None,
            _ => Some(page + 1),
        };
        info!(
            endpoint = self.endpoint,
            page,
            total = total.unwrap_or(0),
            items = envelope.response.len(),
            "Fetched page"
        );
        Ok(Some(envelope.response))
    }
}

#[derive(Debug)]
pub struct PlayerPage {
    pub players: Flattened,
    pub stats: Flattened,
}

/// Usable rows seen across every page of one walk. A walk that ends
/// without any is the same failure as a single empty response.
#[derive(Debug, Default)]
struct Tally {
    received: usize,
    kept: usize,
    dropped: usize,
}

impl Tally {
    fn add(&mut self, flat: &Flattened) {
        self.received += flat.received;
        self.kept += flat.rows.len();
        self.dropped += flat.dropped;
    }

    fn require_rows(&self, endpoint: &str) -> Result<(), AdapterError> {
        if self.kept == 0 {
            return Err(AdapterError::NoUsableRows {
                endpoint: label(endpoint),
                received: self.received,
                dropped: self.dropped,
            });
        }
        Ok(())
    }
}

pub struct PlayerPages<'a> {
    pages: Pages<'a, PlayerItem>,
    tally: Tally,
    league_id: i64,
    season: i32,
}

impl PlayerPages<'_> {
    /// The next page, `None` once the walk is done. Fails at the end of a
    /// walk that produced no player rows.
    pub async fn next(&mut self) -> Result<Option<PlayerPage>, AdapterError> {
        let Some(items) = self.pages.next_page().await? else {
            self.tally.require_rows("players")?;
            return Ok(None);
        };
        let page = flatten_players(&items, self.league_id, self.season, Utc::now());
        self.tally.add(&page.players);
        Ok(Some(page))
    }
}

pub struct OddsPages<'a> {
    pages: Pages<'a, OddsItem>,
    tally: Tally,
    markets: &'a [String],
    league_id: i64,
    season: i32,
}

impl OddsPages<'_> {
    pub async fn next(&mut self) -> Result<Option<Flattened>, AdapterError> {
        let Some(items) = self.pages.next_page().await? else {
            self.tally.require_rows("odds")?;
            return Ok(None);
        };
        let flat = flatten_odds(&items, self.markets, self.league_id, self.season, Utc::now());
        self.tally.add(&flat);
        Ok(Some(flat))
    }
}

// Flattening. Pure functions over decoded payloads.

fn flatten_leagues(items: &[LeagueItem]) -> Flattened {
    let mut out = Flattener::new(DIM_LEAGUE);
    for item in items {
        out.push(
            Record::new()
                .set("league_id", item.league.id)
                .set("league_name", item.league.name.clone())
                .set("league_type", item.league.kind.clone())
                .set("country_name", item.country.name.clone())
                .set("country_code", item.country.code.clone()),
        );
    }
    out.finish()
}

fn flatten_teams(items: &[TeamItem]) -> Flattened {
    let mut out = Flattener::new(DIM_TEAM);
    for item in items {
        out.push(
            Record::new()
                .set("team_id", item.team.id)
                .set("team_name", item.team.name.clone())
                .set("team_code", item.team.code.clone())
                .set("country_name", item.team.country.clone())
                .set("founded", item.team.founded)
                .set("venue_name", item.venue.name.clone()),
        );
    }
    out.finish()
}

fn flatten_fixtures(items: &[FixtureItem], league_id: i64, season: i32, now: DateTime<Utc>) -> Flattened {
    let mut out = Flattener::new(FACT_FIXTURES);
    for item in items {
        let f = &item.fixture;
        out.push(
            Record::new()
                .set("fixture_id", f.id)
                .set("league_id", item.league.id.unwrap_or(league_id))
                .set("season", item.league.season.unwrap_or(season))
                .set("round", item.league.round.clone())
                .set("matchday", item.league.round.as_deref().and_then(parse_matchday))
                .set("date_utc", f.date.as_deref().and_then(parse_timestamp))
                .set("venue_id", f.venue.id)
                .set("venue_name", f.venue.name.clone())
                .set("status_short", f.status.short.clone())
                .set("home_team_id", item.teams.home.id)
                .set("away_team_id", item.teams.away.id)
                .set("home_goals", item.goals.home)
                .set("away_goals", item.goals.away)
                .set("referee", f.referee.clone())
                .set("updated_ts", now),
        );
    }
    out.finish()
}

fn flatten_players(items: &[PlayerItem], league_id: i64, season: i32, now: DateTime<Utc>) -> PlayerPage {
    let mut players = Flattener::new(DIM_PLAYER);
    let mut stats = Flattener::new(FACT_PLAYER_STATS);

    for item in items {
        let p = &item.player;
        let birth_date = p
            .birth
            .date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
        players.push(
            Record::new()
                .set("player_id", p.id)
                .set("player_name", p.name.clone())
                .set("firstname", p.firstname.clone())
                .set("lastname", p.lastname.clone())
                .set("nationality", p.nationality.clone())
                .set("birth_date", birth_date)
                .set("height", p.height.clone())
                .set("weight", p.weight.clone()),
        );

        if item.statistics.is_empty() {
            stats.drop("no statistics");
        }
        // A player who moved mid-season has one block per club.
        for s in &item.statistics {
            let record = Record::new()
                .set("league_id", league_id)
                .set("season", season)
                .set("team_id", s.team.id)
                .set("player_id", p.id)
                .set("appearances", s.games.appearences)
                .set("lineups", s.games.lineups)
                .set("minutes", s.games.minutes)
                .set("rating", s.games.rating.clone());
            stats.push(
                stat_fields(record, s)
                    .set("source", SOURCE)
                    .set("updated_ts", now),
            );
        }
    }

    PlayerPage {
        players: players.finish(),
        stats: stats.finish(),
    }
}

fn flatten_fixture_players(
    items: &[FixtureTeamPlayers],
    fixture_id: i64,
    league_id: i64,
    season: i32,
    now: DateTime<Utc>,
) -> Flattened {
    let mut out = Flattener::new(FACT_PLAYER_STATS_MATCH);
    for team in items {
        for entry in &team.players {
            let Some(s) = entry.statistics.first() else {
                out.drop("no statistics");
                continue;
            };
            let record = Record::new()
                .set("fixture_id", fixture_id)
                .set("league_id", league_id)
                .set("season", season)
                .set("team_id", team.team.id)
                .set("player_id", entry.player.id)
                .set("player_name", entry.player.name.clone())
                .set("team_name", team.team.name.clone())
                .set("position", s.games.position.clone())
                .set("number", s.games.number)
                .set("is_captain", s.games.captain)
                .set("minutes", s.games.minutes)
                .set("rating", s.games.rating.clone());
            out.push(
                stat_fields(record, s)
                    .set("saves", s.goals.saves)
                    .set("passes_accuracy", s.passes.accuracy)
                    .set("blocks", s.tackles.blocks)
                    .set("offsides", s.offsides)
                    .set("updated_ts", now),
            );
        }
    }
    out.finish()
}

/// Counting stats common to season and per-fixture player rows.
fn stat_fields(record: Record, s: &Statistics) -> Record {
    record
        .set("shots_total", s.shots.total)
        .set("shots_on", s.shots.on)
        .set("goals", s.goals.total)
        .set("assists", s.goals.assists)
        .set("passes_total", s.passes.total)
        .set("passes_key", s.passes.key)
        .set("tackles", s.tackles.total)
        .set("interceptions", s.tackles.interceptions)
        .set("duels_total", s.duels.total)
        .set("duels_won", s.duels.won)
        .set("dribbles_attempts", s.dribbles.attempts)
        .set("dribbles_success", s.dribbles.success)
        .set("fouls_committed", s.fouls.committed)
        .set("fouls_drawn", s.fouls.drawn)
        .set("yellow", s.cards.yellow)
        .set("red", s.cards.red)
}

/// One snapshot per matchday; the matchday is the most games any team has played.
fn flatten_standings(items: &[StandingsItem], league_id: i64, season: i32, now: DateTime<Utc>) -> Flattened {
    let mut out = Flattener::new(FACT_STANDINGS_SNAPSHOT);
    for item in items {
        let rows = item.league.standings.iter().flatten();
        let matchday = rows.clone().filter_map(|r| r.all.played.0).max();
        for r in rows {
            out.push(
                Record::new()
                    .set("league_id", item.league.id.unwrap_or(league_id))
                    .set("season", item.league.season.unwrap_or(season))
                    .set("matchday", matchday)
                    .set("team_id", r.team.id)
                    .set("team_name", r.team.name.clone())
                    .set("rank", r.rank)
                    .set("points", r.points)
                    .set("played", r.all.played)
                    .set("wins", r.all.win)
                    .set("draws", r.all.draw)
                    .set("losses", r.all.lose)
                    .set("gf", r.all.goals.scored)
                    .set("ga", r.all.goals.against)
                    .set("gd", r.goals_diff)
                    .set("form", r.form.clone())
                    .set("snapshot_ts", now),
            );
        }
    }
    out.finish()
}

/// The report date of an injury is the fixture it was reported for, unless
/// the payload carries an explicit start.
fn flatten_injuries(items: &[InjuryItem], league_id: i64, season: i32, now: DateTime<Utc>) -> Flattened {
    let mut out = Flattener::new(FACT_INJURIES);
    for item in items {
        let start_date = item
            .start
            .as_deref()
            .or(item.fixture.date.as_deref())
            .and_then(parse_timestamp)
            .map(|ts| ts.date_naive());
        out.push(
            Record::new()
                .set("league_id", league_id)
                .set("season", season)
                .set("team_id", item.team.id)
                .set("player_id", item.player.id)
                .set("player_name", item.player.name.clone())
                .set("status", item.player.kind.clone())
                .set("reason", item.player.reason.clone())
                .set("start_date", start_date)
                .set("fixture_id", item.fixture.id)
                .set("updated_ts", now),
        );
    }
    out.finish()
}

fn flatten_odds(
    items: &[OddsItem],
    markets: &[String],
    league_id: i64,
    season: i32,
    now: DateTime<Utc>,
) -> Flattened {
    let mut out = Flattener::new(FACT_ODDS);
    for item in items {
        let last_update = item.update.as_deref().and_then(parse_timestamp);
        for bookmaker in &item.bookmakers {
            for bet in &bookmaker.bets {
                let market_key = bet.name.as_deref().unwrap_or_default().to_lowercase();
                if !markets.is_empty() && !markets.contains(&market_key) {
                    continue;
                }
                for quote in &bet.values {
                    out.push(
                        Record::new()
                            .set("fixture_id", item.fixture.id)
                            .set("league_id", league_id)
                            .set("season", season)
                            .set("bookmaker_id", bookmaker.id)
                            .set("bookmaker_name", bookmaker.name.clone())
                            .set("market_key", market_key.clone())
                            .set("selection", quote.value.clone())
                            .set("value", quote.odd)
                            .set("last_update", last_update)
                            .set("updated_ts", now),
                    );
                }
            }
        }
    }
    out.finish()
}

// Wire format. Every struct tolerates missing members.

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    errors: JsonValue,
    #[serde(default)]
    results: Option<i64>,
    #[serde(default)]
    paging: Paging,
    #[serde(default = "Vec::new")]
    response: Vec<T>,
}

#[derive(Debug, Deserialize, Default, Clone, Copy)]
#[serde(default)]
struct Paging {
    current: Option<u32>,
    total: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct IdName {
    id: Option<i64>,
    name: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct LeagueItem {
    league: LeagueInfo,
    country: CountryInfo,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct LeagueInfo {
    id: Option<i64>,
    name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    season: Option<i32>,
    round: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CountryInfo {
    name: Option<String>,
    code: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct TeamItem {
    team: TeamInfo,
    venue: IdName,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct TeamInfo {
    id: Option<i64>,
    name: Option<String>,
    code: Option<String>,
    country: Option<String>,
    founded: Int,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FixtureItem {
    fixture: FixtureInfo,
    league: LeagueInfo,
    teams: HomeAway<IdName>,
    goals: HomeAway<Int>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FixtureInfo {
    id: Option<i64>,
    referee: Option<String>,
    date: Option<String>,
    venue: IdName,
    status: FixtureStatus,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FixtureStatus {
    short: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct HomeAway<T: Default> {
    home: T,
    away: T,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct PlayerItem {
    player: PlayerInfo,
    statistics: Vec<Statistics>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct PlayerInfo {
    id: Option<i64>,
    name: Option<String>,
    firstname: Option<String>,
    lastname: Option<String>,
    nationality: Option<String>,
    birth: Birth,
    height: Option<String>,
    weight: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct Birth {
    date: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FixtureTeamPlayers {
    team: IdName,
    players: Vec<FixturePlayer>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FixturePlayer {
    player: IdName,
    statistics: Vec<Statistics>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct Statistics {
    team: IdName,
    games: Games,
    offsides: Int,
    shots: Shots,
    goals: Goals,
    passes: Passes,
    tackles: Tackles,
    duels: Duels,
    dribbles: Dribbles,
    fouls: Fouls,
    cards: Cards,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct Games {
    // Sic: the provider misspells it.
    appearences: Int,
    lineups: Int,
    minutes: Int,
    number: Int,
    position: Option<String>,
    rating: Text,
    captain: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct Shots {
    total: Int,
    on: Int,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct Goals {
    total: Int,
    assists: Int,
    saves: Int,
}

#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(default)]
struct Passes {
    total: Int,
    key: Int,
    accuracy: Int,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct Tackles {
    total: Int,
    blocks: Int,
    interceptions: Int,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct Duels {
    total: Int,
    won: Int,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct Dribbles {
    attempts: Int,
    success: Int,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct Fouls {
    drawn: Int,
    committed: Int,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct Cards {
    yellow: Int,
    red: Int,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct StandingsItem {
    league: StandingsLeague,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct StandingsLeague {
    id: Option<i64>,
    season: Option<i32>,
    /// One table per group; most leagues have a single group.
    standings: Vec<Vec<StandingRow>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct StandingRow {
    rank: Int,
    team: IdName,
    points: Int,
    #[serde(rename = "goalsDiff")]
    goals_diff: Int,
    form: Option<String>,
    all: StandingRecord,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct StandingRecord {
    played: Int,
    win: Int,
    draw: Int,
    lose: Int,
    goals: GoalsForAgainst,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct GoalsForAgainst {
    #[serde(rename = "for")]
    scored: Int,
    against: Int,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct InjuryItem {
    player: InjuredPlayer,
    team: IdName,
    fixture: FixtureRef,
    start: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct InjuredPlayer {
    id: Option<i64>,
    name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FixtureRef {
    id: Option<i64>,
    date: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct OddsItem {
    fixture: FixtureRef,
    update: Option<String>,
    bookmakers: Vec<OddsBookmaker>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct OddsBookmaker {
    id: Option<i64>,
    name: Option<String>,
    bets: Vec<Bet>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct Bet {
    name: Option<String>,
    values: Vec<Quote>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct Quote {
    value: Text,
    odd: Decimal,
}

/// An integer the provider sometimes sends as a string ("68", "75%").
#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Int(Option<i64>);

/// Text the provider sometimes sends as a bare number.
#[derive(Debug, Default, Clone, PartialEq)]
struct Text(Option<String>);

/// Decimal odds, sent as strings ("1.85").
#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Decimal(Option<f64>);

impl<'de> Deserialize<'de> for Int {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Ok(Int(Option::<JsonValue>::deserialize(d)?.and_then(|v| match v {
            JsonValue::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            JsonValue::String(s) => s.trim().trim_end_matches('%').parse().ok(),
            _ => None,
        })))
    }
}

impl<'de> Deserialize<'de> for Text {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Ok(Text(Option::<JsonValue>::deserialize(d)?.and_then(|v| match v {
            JsonValue::String(s) => Some(s),
            JsonValue::Number(n) => Some(n.to_string()),
            _ => None,
        })))
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Ok(Decimal(Option::<JsonValue>::deserialize(d)?.and_then(|v| match v {
            JsonValue::Number(n) => n.as_f64(),
            JsonValue::String(s) => s.trim().parse().ok(),
            _ => None,
        })))
    }
}

impl From<Int> for Value {
    fn from(v: Int) -> Self {
        v.0.into()
    }
}

impl From<Text> for Value {
    fn from(v: Text) -> Self {
        v.0.into()
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        v.0.into()
    }
}
