//! End-to-end ingestion runs against mocked providers and a temporary
//! warehouse file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::{json, Value as JsonValue};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use football_warehouse::{ingest, Config, Warehouse};

// ============================================================================
// TEST HELPERS
// ============================================================================

/// Config for a run against `server` writing to `db_path`, plus overrides.
fn config(server: &MockServer, db_path: &Path, vars: &[(&str, &str)]) -> Config {
    let uri = server.uri();
    let mut env: HashMap<String, String> = [
        ("API_FOOTBALL_BASE_URL", uri.as_str()),
        ("ODDS_API_BASE_URL", uri.as_str()),
        ("OPENLIGADB_BASE_URL", uri.as_str()),
        ("REQUEST_DELAY_MS", "0"),
        ("BACKOFF_MS", "1"),
        ("MAX_ATTEMPTS", "2"),
        ("OLDB_LEAGUE", ""),
        ("LEAGUES", "Premier League:39"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    env.insert(
        "WAREHOUSE_DB_PATH".to_string(),
        db_path.display().to_string(),
    );
    for (k, v) in vars {
        env.insert(k.to_string(), v.to_string());
    }

    // An empty secrets directory keeps file-based keys out of the picture.
    let secrets = tempfile::tempdir().unwrap();
    Config::from_lookup(|name| env.get(name).cloned(), secrets.path()).unwrap()
}

fn db_path(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("warehouse.sqlite")
}

fn envelope(response: JsonValue) -> JsonValue {
    json!({
        "errors": [],
        "results": response.as_array().map(|a| a.len()).unwrap_or(0),
        "paging": {"current": 1, "total": 1},
        "response": response
    })
}

async fn mount_leagues(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/leagues"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([{
            "league": {"id": 39, "name": "Premier League", "type": "League"},
            "country": {"name": "England", "code": "GB"}
        }]))))
        .expect(1)
        .mount(server)
        .await;
}

fn standing(rank: i64, team_id: i64, name: &str, points: i64) -> JsonValue {
    json!({
        "rank": rank,
        "team": {"id": team_id, "name": name},
        "points": points,
        "goalsDiff": 10,
        "form": "WWDLW",
        "all": {"played": 38, "win": 20, "draw": 8, "lose": 10, "goals": {"for": 60, "against": 50}}
    })
}

async fn scalar_i64(wh: &mut Warehouse, sql: &str) -> i64 {
    sqlx::query_scalar(sql).fetch_one(wh.connection()).await.unwrap()
}

// ============================================================================
// API-FOOTBALL RUNS
// ============================================================================

/// A season outside the plan is recorded as failed and the run carries on.
#[tokio::test]
async fn a_restricted_season_is_logged_and_skipped() {
    let server = MockServer::start().await;
    mount_leagues(&server).await;

    Mock::given(method("GET"))
        .and(path("/standings"))
        .and(query_param("season", "2022"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": {"plan": "Free plans do not have access to this season, try from 2023 to 2025."},
            "results": 0,
            "response": []
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/standings"))
        .and(query_param("season", "2023"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([{
            "league": {
                "id": 39,
                "season": 2023,
                "standings": [[
                    standing(1, 50, "Manchester City", 91),
                    standing(2, 42, "Arsenal", 89)
                ]]
            }
        }]))))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cfg = config(
        &server,
        &db_path(&dir),
        &[
            ("API_FOOTBALL_KEY", "test-key"),
            ("SEASONS", "2022-2023"),
            ("INGEST_ENDPOINTS", "standings"),
        ],
    );

    let summary = ingest::run(&cfg).await.unwrap();

    assert_eq!(summary.succeeded, 2, "leagues and the 2023 standings");
    assert_eq!(summary.failed.len(), 1);
    let failed = &summary.failed[0];
    assert_eq!(failed.source, "api-football");
    assert_eq!(failed.endpoint, "standings");
    assert_eq!(failed.scope, "39/2022");
    assert_eq!(failed.kind, "api");
    assert_eq!(summary.rows_by_table["dim_league"], 1);
    assert_eq!(summary.rows_by_table["fact_standings_snapshot"], 2);

    let mut wh = Warehouse::open(db_path(&dir)).await.unwrap();
    assert_eq!(
        scalar_i64(&mut wh, "SELECT COUNT(*) FROM fact_standings_snapshot WHERE matchday = 38").await,
        2
    );
    assert_eq!(
        scalar_i64(&mut wh, "SELECT points FROM fact_standings_snapshot WHERE team_id = 50").await,
        91
    );
    assert_eq!(scalar_i64(&mut wh, "SELECT COUNT(*) FROM ingest_log").await, 3);

    let ledger: (String, String, i64, i64) = sqlx::query_as(
        "SELECT status, error_kind, league_id, season FROM ingest_log WHERE scope = '39/2022'",
    )
    .fetch_one(wh.connection())
    .await
    .unwrap();
    assert_eq!(ledger, ("failed".into(), "api".into(), 39, 2022));

    let run_id: String = sqlx::query_scalar("SELECT DISTINCT run_id FROM ingest_log")
        .fetch_one(wh.connection())
        .await
        .unwrap();
    assert_eq!(run_id, summary.run_id.to_string());
    wh.close().await.unwrap();
}

/// Per-fixture player stats are only requested for finished fixtures.
#[tokio::test]
async fn fixture_players_follow_finished_fixtures() {
    let server = MockServer::start().await;
    mount_leagues(&server).await;

    Mock::given(method("GET"))
        .and(path("/fixtures"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([
            {
                "fixture": {
                    "id": 1001,
                    "referee": "M. Oliver",
                    "date": "2024-08-16T19:00:00+00:00",
                    "venue": {"id": 556, "name": "Old Trafford"},
                    "status": {"short": "FT"}
                },
                "league": {"id": 39, "season": 2024, "round": "Regular Season - 1"},
                "teams": {"home": {"id": 33, "name": "Manchester United"}, "away": {"id": 36, "name": "Fulham"}},
                "goals": {"home": 1, "away": 0}
            },
            {
                "fixture": {
                    "id": 1002,
                    "date": "2030-08-17T14:00:00+00:00",
                    "venue": {"id": 494, "name": "Portman Road"},
                    "status": {"short": "NS"}
                },
                "league": {"id": 39, "season": 2024, "round": "Regular Season - 38"},
                "teams": {"home": {"id": 57, "name": "Ipswich"}, "away": {"id": 40, "name": "Liverpool"}},
                "goals": {"home": null, "away": null}
            }
        ]))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fixtures/players"))
        .and(query_param("fixture", "1001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([{
            "team": {"id": 33, "name": "Manchester United"},
            "players": [{
                "player": {"id": 1485, "name": "Bruno Fernandes"},
                "statistics": [{
                    "games": {"minutes": 90, "number": 8, "position": "M", "rating": "7.5", "captain": true},
                    "goals": {"total": 0, "assists": 1, "saves": null},
                    "passes": {"total": 61, "key": 3, "accuracy": "52"}
                }]
            }]
        }]))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fixtures/players"))
        .and(query_param("fixture", "1002"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([]))))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cfg = config(
        &server,
        &db_path(&dir),
        &[
            ("API_FOOTBALL_KEY", "test-key"),
            ("SEASONS", "2024"),
            // Listed out of order on purpose; fixtures still run first.
            ("INGEST_ENDPOINTS", "fixture_players,fixtures"),
        ],
    );

    let summary = ingest::run(&cfg).await.unwrap();
    assert!(summary.failed.is_empty(), "failures: {:?}", summary.failed);
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.rows_by_table["fact_fixtures"], 2);
    assert_eq!(summary.rows_by_table["fact_player_stats_match"], 1);

    let mut wh = Warehouse::open(db_path(&dir)).await.unwrap();
    assert_eq!(wh.fixture_ids(39, 2024, true).await.unwrap(), vec![1001]);
    assert_eq!(wh.fixture_ids(39, 2024, false).await.unwrap(), vec![1001, 1002]);

    let row: (i64, i64, i64, i64) = sqlx::query_as(
        "SELECT fixture_id, team_id, minutes, CAST(is_captain AS INTEGER) \
         FROM fact_player_stats_match WHERE player_id = 1485",
    )
    .fetch_one(wh.connection())
    .await
    .unwrap();
    assert_eq!(row, (1001, 33, 90, 1));
    assert_eq!(
        scalar_i64(&mut wh, "SELECT matchday FROM fact_fixtures WHERE fixture_id = 1002").await,
        38
    );
    wh.close().await.unwrap();
}

/// Without fixtures in the store there is nothing to fetch player stats for.
#[tokio::test]
async fn fixture_players_without_fixtures_fail_the_item() {
    let server = MockServer::start().await;
    mount_leagues(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let cfg = config(
        &server,
        &db_path(&dir),
        &[
            ("API_FOOTBALL_KEY", "test-key"),
            ("SEASONS", "2024"),
            ("INGEST_ENDPOINTS", "fixture_players"),
        ],
    );

    let summary = ingest::run(&cfg).await.unwrap();
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].endpoint, "fixture_players");
    assert_eq!(summary.failed[0].kind, "other");
}

/// Odds pages whose every quote lacks a fixture id leave nothing to store.
#[tokio::test]
async fn odds_with_no_usable_rows_fail_the_item() {
    let server = MockServer::start().await;
    mount_leagues(&server).await;

    Mock::given(method("GET"))
        .and(path("/odds"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([{
            "fixture": {"id": null},
            "bookmakers": [{
                "id": 8,
                "name": "Bet365",
                "bets": [{"id": 1, "name": "Match Winner", "values": [{"value": "Home", "odd": "1.60"}]}]
            }]
        }]))))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cfg = config(
        &server,
        &db_path(&dir),
        &[
            ("API_FOOTBALL_KEY", "test-key"),
            ("SEASONS", "2024"),
            ("INGEST_ENDPOINTS", "odds"),
        ],
    );

    let summary = ingest::run(&cfg).await.unwrap();
    assert_eq!(summary.succeeded, 1, "leagues only");
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].endpoint, "odds");
    assert_eq!(summary.failed[0].kind, "no_rows");
    assert!(!summary.rows_by_table.contains_key("fact_odds"));

    let mut wh = Warehouse::open(db_path(&dir)).await.unwrap();
    let ledger: (String, String, i64, i64) = sqlx::query_as(
        "SELECT status, error_kind, \"rows\", dropped FROM ingest_log WHERE endpoint = 'odds'",
    )
    .fetch_one(wh.connection())
    .await
    .unwrap();
    assert_eq!(ledger, ("failed".into(), "no_rows".into(), 0, 1));
    wh.close().await.unwrap();
}

/// Pages committed before a failing page stay stored and are counted.
#[tokio::test]
async fn a_failure_mid_way_through_players_keeps_the_committed_count() {
    let server = MockServer::start().await;
    mount_leagues(&server).await;

    Mock::given(method("GET"))
        .and(path("/players"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [],
            "results": 1,
            "paging": {"current": 1, "total": 2},
            "response": [{
                "player": {"id": 276, "name": "Neymar"},
                "statistics": [{
                    "team": {"id": 33, "name": "Manchester United"},
                    "games": {"appearences": 30, "minutes": 2500}
                }]
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/players"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": {"rateLimit": "Too many requests. Your rate limit is 10 requests per minute."},
            "results": 0,
            "response": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cfg = config(
        &server,
        &db_path(&dir),
        &[
            ("API_FOOTBALL_KEY", "test-key"),
            ("SEASONS", "2024"),
            ("INGEST_ENDPOINTS", "players"),
        ],
    );

    let summary = ingest::run(&cfg).await.unwrap();
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].kind, "api");
    assert_eq!(summary.rows_by_table["dim_player"], 1);
    assert_eq!(summary.rows_by_table["fact_player_stats"], 1);

    let mut wh = Warehouse::open(db_path(&dir)).await.unwrap();
    assert_eq!(scalar_i64(&mut wh, "SELECT COUNT(*) FROM dim_player").await, 1);
    let ledger: (String, i64) =
        sqlx::query_as("SELECT status, \"rows\" FROM ingest_log WHERE scope = '39/2024'")
            .fetch_one(wh.connection())
            .await
            .unwrap();
    assert_eq!(ledger, ("failed".into(), 2));
    wh.close().await.unwrap();
}

// ============================================================================
// ODDS API AND OPENLIGADB RUNS
// ============================================================================

#[tokio::test]
async fn odds_and_openligadb_run_without_api_football() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sports/soccer_epl/odds"))
        .and(query_param("apiKey", "odds-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "e912304de2b2ce35b473ce2ecd3d1502",
            "sport_key": "soccer_epl",
            "sport_title": "EPL",
            "commence_time": "2024-08-16T19:00:00Z",
            "home_team": "Manchester United",
            "away_team": "Fulham",
            "bookmakers": [{
                "key": "pinnacle",
                "title": "Pinnacle",
                "last_update": "2024-08-16T10:00:00Z",
                "markets": [{"key": "h2h", "outcomes": [
                    {"name": "Manchester United", "price": 1.62},
                    {"name": "Fulham", "price": 5.4},
                    {"name": "Draw", "price": 4.3}
                ]}]
            }]
        }])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sports/soccer_germany_bundesliga/odds"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/getmatchdata/bl1/2023"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "matchID": 66500,
            "matchDateTimeUTC": "2023-08-18T18:30:00Z",
            "leagueId": 4608,
            "group": {"groupOrderID": 1},
            "team1": {"teamId": 40, "teamName": "FC Bayern München"},
            "team2": {"teamId": 1, "teamName": "Werder Bremen"},
            "matchIsFinished": true,
            "matchResults": [{"resultTypeID": 2, "pointsTeam1": 4, "pointsTeam2": 0}]
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cfg = config(
        &server,
        &db_path(&dir),
        &[
            ("THE_ODDS_API_KEY", "odds-key"),
            ("ODDS_SPORT_KEYS", "soccer_epl,soccer_germany_bundesliga"),
            ("OLDB_LEAGUE", "bl1"),
            ("OLDB_SEASONS", "2023"),
        ],
    );
    assert!(cfg.api_football_key.is_none());

    let summary = ingest::run(&cfg).await.unwrap();

    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].source, "the-odds-api");
    assert_eq!(summary.failed[0].scope, "soccer_germany_bundesliga");
    assert_eq!(summary.failed[0].kind, "transport");
    assert_eq!(summary.rows_by_table["odds_h2h"], 1);
    assert_eq!(summary.rows_by_table["matches"], 1);
    assert!(!summary.rows_by_table.contains_key("dim_league"));

    let mut wh = Warehouse::open(db_path(&dir)).await.unwrap();
    let key: String = sqlx::query_scalar("SELECT join_key FROM matches WHERE match_id = 66500")
        .fetch_one(wh.connection())
        .await
        .unwrap();
    assert_eq!(key, "2023-08-18|fc bayern münchen|werder bremen");

    let ledger: Vec<(String, String, Option<i64>, Option<i64>)> = sqlx::query_as(
        "SELECT source, status, league_id, season FROM ingest_log ORDER BY source, scope",
    )
    .fetch_all(wh.connection())
    .await
    .unwrap();
    assert_eq!(
        ledger,
        vec![
            ("openligadb".to_string(), "ok".to_string(), None, Some(2023)),
            ("the-odds-api".to_string(), "ok".to_string(), None, None),
            ("the-odds-api".to_string(), "failed".to_string(), None, None),
        ]
    );
    wh.close().await.unwrap();
}

/// Replaying a run leaves one row per natural key.
#[tokio::test]
async fn a_second_run_upserts_instead_of_duplicating() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/getmatchdata/bl1/2023"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "matchID": 66500,
                "team1": {"teamId": 40, "teamName": "FC Bayern München"},
                "team2": {"teamId": 1, "teamName": "Werder Bremen"},
                "matchIsFinished": true
            },
            {
                "matchID": 66501,
                "team1": {"teamId": 7, "teamName": "Borussia Dortmund"},
                "team2": {"teamId": 16, "teamName": "1. FC Köln"},
                "matchIsFinished": false
            }
        ])))
        .expect(2)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cfg = config(
        &server,
        &db_path(&dir),
        &[("OLDB_LEAGUE", "bl1"), ("OLDB_SEASONS", "2023")],
    );

    let first = ingest::run(&cfg).await.unwrap();
    let second = ingest::run(&cfg).await.unwrap();
    assert_ne!(first.run_id, second.run_id);

    let mut wh = Warehouse::open(db_path(&dir)).await.unwrap();
    assert_eq!(scalar_i64(&mut wh, "SELECT COUNT(*) FROM matches").await, 2);
    // One ledger row per run.
    assert_eq!(scalar_i64(&mut wh, "SELECT COUNT(*) FROM ingest_log").await, 2);
    wh.close().await.unwrap();
}
