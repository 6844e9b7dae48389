//! Declared warehouse tables and their natural keys.
//!
//! The DDL declares each natural key as the table's primary key; adapters
//! upsert through the same [`TableSpec`] so the conflict target always matches.

/// A declared table and the columns identifying one of its rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    pub name: &'static str,
    pub key: &'static [&'static str],
}

pub const DIM_LEAGUE: TableSpec = TableSpec {
    name: "dim_league",
    key: &["league_id"],
};

pub const DIM_TEAM: TableSpec = TableSpec {
    name: "dim_team",
    key: &["team_id"],
};

pub const DIM_PLAYER: TableSpec = TableSpec {
    name: "dim_player",
    key: &["player_id"],
};

pub const FACT_FIXTURES: TableSpec = TableSpec {
    name: "fact_fixtures",
    key: &["fixture_id"],
};

pub const FACT_PLAYER_STATS: TableSpec = TableSpec {
    name: "fact_player_stats",
    key: &["league_id", "season", "team_id", "player_id"],
};

pub const FACT_PLAYER_STATS_MATCH: TableSpec = TableSpec {
    name: "fact_player_stats_match",
    key: &["fixture_id", "player_id", "team_id"],
};

pub const FACT_STANDINGS_SNAPSHOT: TableSpec = TableSpec {
    name: "fact_standings_snapshot",
    key: &["league_id", "season", "matchday", "team_id"],
};

// Keyed on the start date so an injury spell is one row no matter how often it is re-read.
pub const FACT_INJURIES: TableSpec = TableSpec {
    name: "fact_injuries",
    key: &["league_id", "season", "team_id", "player_id", "start_date"],
};

// Latest quote per selection; `last_update` is a value, not part of the key.
pub const FACT_ODDS: TableSpec = TableSpec {
    name: "fact_odds",
    key: &["fixture_id", "bookmaker_id", "market_key", "selection"],
};

/// Run ledger. `scope` names what a work item covered: `39/2024`, a sport key, `bl1/2023`.
pub const INGEST_LOG: TableSpec = TableSpec {
    name: "ingest_log",
    key: &["run_id", "source", "endpoint", "scope"],
};

/// Tables created on demand by the upsert engine.
pub const ODDS_H2H: TableSpec = TableSpec {
    name: "odds_h2h",
    key: &["event_id", "bookmaker", "market"],
};

pub const MATCHES: TableSpec = TableSpec {
    name: "matches",
    key: &["match_id"],
};

pub const DECLARED: &[TableSpec] = &[
    DIM_LEAGUE,
    DIM_TEAM,
    DIM_PLAYER,
    FACT_FIXTURES,
    FACT_PLAYER_STATS,
    FACT_PLAYER_STATS_MATCH,
    FACT_STANDINGS_SNAPSHOT,
    FACT_INJURIES,
    FACT_ODDS,
    INGEST_LOG,
];

pub(crate) const DDL: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS dim_league (
        league_id INTEGER PRIMARY KEY,
        league_name VARCHAR,
        league_type VARCHAR,
        country_name VARCHAR,
        country_code VARCHAR
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS dim_team (
        team_id INTEGER PRIMARY KEY,
        team_name VARCHAR,
        team_code VARCHAR,
        country_name VARCHAR,
        founded INTEGER,
        venue_name VARCHAR
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS dim_player (
        player_id INTEGER PRIMARY KEY,
        player_name VARCHAR,
        firstname VARCHAR,
        lastname VARCHAR,
        nationality VARCHAR,
        birth_date DATE,
        height VARCHAR,
        weight VARCHAR
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS fact_fixtures (
        fixture_id INTEGER PRIMARY KEY,
        league_id INTEGER,
        season INTEGER,
        round VARCHAR,
        matchday INTEGER,
        date_utc TIMESTAMPTZ,
        venue_id INTEGER,
        venue_name VARCHAR,
        status_short VARCHAR,
        home_team_id INTEGER,
        away_team_id INTEGER,
        home_goals INTEGER,
        away_goals INTEGER,
        referee VARCHAR,
        updated_ts TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS fact_player_stats (
        league_id INTEGER NOT NULL,
        season INTEGER NOT NULL,
        team_id INTEGER NOT NULL,
        player_id INTEGER NOT NULL,
        appearances INTEGER,
        lineups INTEGER,
        minutes INTEGER,
        rating VARCHAR,
        shots_total INTEGER,
        shots_on INTEGER,
        goals INTEGER,
        assists INTEGER,
        passes_total INTEGER,
        passes_key INTEGER,
        tackles INTEGER,
        interceptions INTEGER,
        duels_total INTEGER,
        duels_won INTEGER,
        dribbles_attempts INTEGER,
        dribbles_success INTEGER,
        fouls_committed INTEGER,
        fouls_drawn INTEGER,
        yellow INTEGER,
        red INTEGER,
        source VARCHAR,
        updated_ts TIMESTAMPTZ,
        PRIMARY KEY (league_id, season, team_id, player_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS fact_player_stats_match (
        fixture_id INTEGER NOT NULL,
        league_id INTEGER,
        season INTEGER,
        team_id INTEGER NOT NULL,
        player_id INTEGER NOT NULL,
        player_name VARCHAR,
        team_name VARCHAR,
        position VARCHAR,
        number INTEGER,
        is_captain BOOLEAN,
        minutes INTEGER,
        rating VARCHAR,
        shots_total INTEGER,
        shots_on INTEGER,
        goals INTEGER,
        assists INTEGER,
        saves INTEGER,
        passes_total INTEGER,
        passes_key INTEGER,
        passes_accuracy INTEGER,
        tackles INTEGER,
        interceptions INTEGER,
        blocks INTEGER,
        duels_total INTEGER,
        duels_won INTEGER,
        dribbles_attempts INTEGER,
        dribbles_success INTEGER,
        fouls_committed INTEGER,
        fouls_drawn INTEGER,
        yellow INTEGER,
        red INTEGER,
        offsides INTEGER,
        updated_ts TIMESTAMPTZ,
        PRIMARY KEY (fixture_id, player_id, team_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS fact_standings_snapshot (
        league_id INTEGER NOT NULL,
        season INTEGER NOT NULL,
        matchday INTEGER NOT NULL,
        team_id INTEGER NOT NULL,
        team_name VARCHAR,
        rank INTEGER,
        points INTEGER,
        played INTEGER,
        wins INTEGER,
        draws INTEGER,
        losses INTEGER,
        gf INTEGER,
        ga INTEGER,
        gd INTEGER,
        form VARCHAR,
        snapshot_ts TIMESTAMPTZ,
        PRIMARY KEY (league_id, season, matchday, team_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS fact_injuries (
        league_id INTEGER NOT NULL,
        season INTEGER NOT NULL,
        team_id INTEGER NOT NULL,
        player_id INTEGER NOT NULL,
        player_name VARCHAR,
        status VARCHAR,
        reason VARCHAR,
        start_date DATE NOT NULL,
        fixture_id INTEGER,
        updated_ts TIMESTAMPTZ,
        PRIMARY KEY (league_id, season, team_id, player_id, start_date)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS fact_odds (
        fixture_id INTEGER NOT NULL,
        league_id INTEGER,
        season INTEGER,
        bookmaker_id INTEGER NOT NULL,
        bookmaker_name VARCHAR,
        market_key VARCHAR NOT NULL,
        selection VARCHAR NOT NULL,
        value DOUBLE,
        last_update TIMESTAMPTZ,
        updated_ts TIMESTAMPTZ,
        PRIMARY KEY (fixture_id, bookmaker_id, market_key, selection)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS ingest_log (
        run_id VARCHAR NOT NULL,
        source VARCHAR NOT NULL,
        endpoint VARCHAR NOT NULL,
        scope VARCHAR NOT NULL,
        league_id INTEGER,
        season INTEGER,
        status VARCHAR,
        "rows" INTEGER,
        dropped INTEGER,
        error_kind VARCHAR,
        error VARCHAR,
        finished_ts TIMESTAMPTZ,
        PRIMARY KEY (run_id, source, endpoint, scope)
    )
    "#,
];
