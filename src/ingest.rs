//! One ingestion run: leagues x seasons x endpoints against API-Football,
//! then Odds API snapshots, then OpenLigaDB fixtures.
//!
//! Every work item is independent. A failure is logged, written to the run
//! ledger and the loop moves on; only the store itself can abort a run.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AdapterError, StoreError};
use crate::sources::{api_football, odds_api, openligadb, ApiFootball, Flattened, OddsApi, OpenLigaDb};
use crate::warehouse::schema::INGEST_LOG;
use crate::warehouse::{Record, RowSet, Warehouse};

/// An API-Football endpoint ingested per league season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Teams,
    Players,
    Fixtures,
    FixturePlayers,
    Standings,
    Injuries,
    Odds,
}

impl Endpoint {
    /// Execution order. Per-fixture player stats read the fixtures stored before them.
    pub const ALL: [Endpoint; 7] = [
        Endpoint::Teams,
        Endpoint::Players,
        Endpoint::Fixtures,
        Endpoint::FixturePlayers,
        Endpoint::Standings,
        Endpoint::Injuries,
        Endpoint::Odds,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::Teams => "teams",
            Endpoint::Players => "players",
            Endpoint::Fixtures => "fixtures",
            Endpoint::FixturePlayers => "fixture_players",
            Endpoint::Standings => "standings",
            Endpoint::Injuries => "injuries",
            Endpoint::Odds => "odds",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Endpoint {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut wanted = s.trim().to_lowercase().replace(['-', '/'], "_");
        // The provider's own path for per-fixture player stats.
        if wanted == "fixtures_players" {
            wanted = Endpoint::FixturePlayers.name().to_string();
        }
        Endpoint::ALL
            .into_iter()
            .find(|e| e.name() == wanted)
            .ok_or_else(|| anyhow!("unknown endpoint {:?}", s))
    }
}

/// A work item that did not complete.
#[derive(Debug, Clone)]
pub struct FailedItem {
    pub source: &'static str,
    pub endpoint: String,
    pub scope: String,
    pub kind: &'static str,
    pub error: String,
}

#[derive(Debug)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub succeeded: usize,
    pub failed: Vec<FailedItem>,
    pub rows_by_table: BTreeMap<String, usize>,
}

/// Ingest everything `config` asks for into the warehouse at `config.db_path`.
pub async fn run(config: &Config) -> Result<RunSummary> {
    let mut warehouse = Warehouse::open(&config.db_path)
        .await
        .with_context(|| format!("Failed to open warehouse {}", config.db_path.display()))?;

    if let Err(e) = warehouse.ensure_schema().await {
        if let Err(close_err) = warehouse.close().await {
            warn!("Failed to close warehouse: {}", close_err);
        }
        return Err(e).context("Failed to apply warehouse schema");
    }

    let location = warehouse.location().to_string();
    let mut run = Run::new(&mut warehouse);
    info!(run_id = %run.run_id, warehouse = %location, "Starting ingestion run");
    let start = Instant::now();

    run.api_football(config).await;
    run.odds_snapshots(config).await;
    run.openligadb(config).await;

    let summary = run.finish();
    if let Err(e) = warehouse.close().await {
        warn!("Failed to close warehouse: {}", e);
    }

    info!(
        run_id = %summary.run_id,
        succeeded = summary.succeeded,
        failed = summary.failed.len(),
        "Ingestion run finished in {:?}",
        start.elapsed()
    );
    Ok(summary)
}

/// What a work item covered, for logs and the ledger.
struct WorkItem {
    source: &'static str,
    endpoint: String,
    scope: String,
    league_id: Option<i64>,
    season: Option<i32>,
}

impl WorkItem {
    fn season(source: &'static str, endpoint: &str, league_id: i64, season: i32) -> Self {
        Self {
            source,
            endpoint: endpoint.to_string(),
            scope: format!("{}/{}", league_id, season),
            league_id: Some(league_id),
            season: Some(season),
        }
    }

    fn scoped(source: &'static str, endpoint: &str, scope: &str) -> Self {
        Self {
            source,
            endpoint: endpoint.to_string(),
            scope: scope.to_string(),
            league_id: None,
            season: None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Written {
    rows: usize,
    dropped: usize,
}

impl std::ops::AddAssign for Written {
    fn add_assign(&mut self, other: Self) {
        self.rows += other.rows;
        self.dropped += other.dropped;
    }
}

struct Run<'w> {
    warehouse: &'w mut Warehouse,
    run_id: Uuid,
    succeeded: usize,
    failed: Vec<FailedItem>,
    rows_by_table: BTreeMap<String, usize>,
}

impl<'w> Run<'w> {
    fn new(warehouse: &'w mut Warehouse) -> Self {
        Self {
            warehouse,
            run_id: Uuid::new_v4(),
            succeeded: 0,
            failed: Vec::new(),
            rows_by_table: BTreeMap::new(),
        }
    }

    fn finish(self) -> RunSummary {
        RunSummary {
            run_id: self.run_id,
            succeeded: self.succeeded,
            failed: self.failed,
            rows_by_table: self.rows_by_table,
        }
    }

    async fn api_football(&mut self, config: &Config) {
        let Some(key) = config.api_football_key.as_deref() else {
            warn!("API_FOOTBALL_KEY not set; skipping API-Football");
            return;
        };
        let api = match ApiFootball::new(key, &config.api_football_base_url, &config.http) {
            Ok(api) => api.with_markets(config.odds_markets.clone()),
            Err(e) => {
                let item = WorkItem::scoped(api_football::SOURCE, "client", "all");
                self.record(item, Written::default(), Err(e.into())).await;
                return;
            }
        };

        let item = WorkItem::scoped(api_football::SOURCE, "leagues", "all");
        let mut written = Written::default();
        let result = match api.leagues().await {
            Ok(flat) => self.write(&flat, &mut written).await,
            Err(e) => Err(e.into()),
        };
        self.record(item, written, result).await;

        for league in &config.leagues {
            for &season in &config.seasons {
                info!("== {} ({}) {} ==", league.name, league.id, season);
                for endpoint in Endpoint::ALL.into_iter().filter(|e| config.endpoints.contains(e)) {
                    let item = WorkItem::season(api_football::SOURCE, endpoint.name(), league.id, season);
                    let mut written = Written::default();
                    let result = self
                        .season_endpoint(&api, endpoint, league.id, season, &mut written)
                        .await;
                    self.record(item, written, result).await;
                }
            }
        }
    }

    async fn season_endpoint(
        &mut self,
        api: &ApiFootball,
        endpoint: Endpoint,
        league_id: i64,
        season: i32,
        written: &mut Written,
    ) -> Result<()> {
        match endpoint {
            Endpoint::Teams => self.write(&api.teams(league_id, season).await?, written).await,
            Endpoint::Fixtures => self.write(&api.fixtures(league_id, season).await?, written).await,
            Endpoint::Standings => self.write(&api.standings(league_id, season).await?, written).await,
            Endpoint::Injuries => self.write(&api.injuries(league_id, season).await?, written).await,
            Endpoint::Players => {
                let mut pages = api.players(league_id, season);
                while let Some(page) = pages.next().await? {
                    self.write(&page.players, written).await?;
                    self.write(&page.stats, written).await?;
                }
                Ok(())
            }
            Endpoint::Odds => {
                let mut pages = api.odds(league_id, season);
                while let Some(page) = pages.next().await? {
                    self.write(&page, written).await?;
                }
                Ok(())
            }
            Endpoint::FixturePlayers => self.fixture_players(api, league_id, season, written).await,
        }
    }

    /// One request per finished fixture already in the store. Single fixtures
    /// may fail without failing the item; all of them failing does.
    async fn fixture_players(
        &mut self,
        api: &ApiFootball,
        league_id: i64,
        season: i32,
        written: &mut Written,
    ) -> Result<()> {
        let fixture_ids = self.warehouse.fixture_ids(league_id, season, true).await?;
        if fixture_ids.is_empty() {
            bail!(
                "no finished fixtures stored for league {} season {}; ingest fixtures first",
                league_id,
                season
            );
        }

        let mut last_error = None;
        let mut failures = 0;
        for (i, &fixture_id) in fixture_ids.iter().enumerate() {
            match api.fixture_players(fixture_id, league_id, season).await {
                Ok(flat) => self.write(&flat, written).await?,
                Err(e) => {
                    warn!("fixture {} player stats failed: {}", fixture_id, e);
                    failures += 1;
                    last_error = Some(e);
                }
            }
            if (i + 1) % 50 == 0 {
                info!("[players/match] {}/{} fixtures processed", i + 1, fixture_ids.len());
            }
        }

        match last_error {
            Some(e) if failures == fixture_ids.len() => Err(e.into()),
            _ => Ok(()),
        }
    }

    async fn odds_snapshots(&mut self, config: &Config) {
        let Some(key) = config.odds_api_key.as_deref() else {
            warn!("THE_ODDS_API_KEY not set; skipping Odds API snapshots");
            return;
        };
        let api = match OddsApi::new(key, &config.odds_api_base_url, &config.odds_regions, &config.http) {
            Ok(api) => api,
            Err(e) => {
                let item = WorkItem::scoped(odds_api::SOURCE, "client", "all");
                self.record(item, Written::default(), Err(e.into())).await;
                return;
            }
        };

        for sport_key in &config.odds_sport_keys {
            let item = WorkItem::scoped(odds_api::SOURCE, "h2h", sport_key);
            let mut written = Written::default();
            let result = match api.h2h(sport_key).await {
                Ok(flat) => self.write(&flat, &mut written).await,
                Err(e) => Err(e.into()),
            };
            self.record(item, written, result).await;
        }
    }

    async fn openligadb(&mut self, config: &Config) {
        if config.oldb_league.is_empty() {
            return;
        }
        let api = match OpenLigaDb::new(&config.openligadb_base_url, &config.http) {
            Ok(api) => api,
            Err(e) => {
                let item = WorkItem::scoped(openligadb::SOURCE, "client", "all");
                self.record(item, Written::default(), Err(e.into())).await;
                return;
            }
        };

        for &season in &config.oldb_seasons {
            let mut item = WorkItem::scoped(
                openligadb::SOURCE,
                "matchdata",
                &format!("{}/{}", config.oldb_league, season),
            );
            item.season = Some(season);
            let mut written = Written::default();
            let result = match api.match_data(&config.oldb_league, season).await {
                Ok(flat) => self.write(&flat, &mut written).await,
                Err(e) => Err(e.into()),
            };
            self.record(item, written, result).await;
        }
    }

    /// Upsert one flattened response, adding what was committed to `written`.
    async fn write(&mut self, flat: &Flattened, written: &mut Written) -> Result<()> {
        let rows = self.warehouse.write(&flat.rows).await?;
        if rows > 0 {
            *self
                .rows_by_table
                .entry(flat.rows.table().to_string())
                .or_insert(0) += rows;
        }
        *written += Written {
            rows,
            dropped: flat.dropped,
        };
        Ok(())
    }

    /// Log the outcome of a work item and write it to the ledger. `written`
    /// holds what was committed before a failure, if any.
    async fn record(&mut self, item: WorkItem, written: Written, result: Result<()>) {
        let mut entry = Record::new()
            .set("run_id", self.run_id.to_string())
            .set("source", item.source)
            .set("endpoint", item.endpoint.as_str())
            .set("scope", item.scope.as_str())
            .set("league_id", item.league_id)
            .set("season", item.season)
            .set("rows", written.rows as i64)
            .set("dropped", written.dropped as i64);

        match result {
            Ok(()) => {
                info!(
                    "[{}] {} {}: upserted {} rows ({} dropped)",
                    item.source, item.endpoint, item.scope, written.rows, written.dropped
                );
                self.succeeded += 1;
                entry = entry
                    .set("status", "ok")
                    .set("error_kind", None::<String>)
                    .set("error", None::<String>);
            }
            Err(e) => {
                let kind = error_kind(&e);
                error!(
                    "[{}] {} {} failed ({}) after {} rows: {:#}",
                    item.source, item.endpoint, item.scope, kind, written.rows, e
                );
                entry = entry
                    .set("status", "failed")
                    .set("error_kind", kind)
                    .set("error", format!("{:#}", e));
                self.failed.push(FailedItem {
                    source: item.source,
                    endpoint: item.endpoint,
                    scope: item.scope,
                    kind,
                    error: format!("{:#}", e),
                });
            }
        }

        let entry = entry.set("finished_ts", Utc::now());
        let ledger = RowSet::from_records(INGEST_LOG.name, INGEST_LOG.key, vec![entry]);
        if let Err(e) = self.warehouse.write(&ledger).await {
            warn!("Failed to write run ledger entry: {}", e);
        }
    }
}

fn error_kind(e: &anyhow::Error) -> &'static str {
    if let Some(adapter) = e.downcast_ref::<AdapterError>() {
        adapter.kind()
    } else if e.downcast_ref::<StoreError>().is_some() {
        "store"
    } else {
        "other"
    }
}
