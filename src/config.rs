//! Run configuration, read from the environment (optionally seeded from a
//! `.env` file by `main`). API keys may also come from `/run/secrets/*`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

use crate::ingest::Endpoint;
use crate::sources::{api_football, odds_api, openligadb, HttpSettings};

const SECRETS_DIR: &str = "/run/secrets";

const DEFAULT_LEAGUES: &str = "England:39,France:61,Germany:78,Italy:135,Spain:140";
const DEFAULT_SEASONS: &str = "2023-2025";
const DEFAULT_ENDPOINTS: &str = "teams,fixtures,fixture_players,players,standings,injuries";
const DEFAULT_SPORT_KEYS: &str = "soccer_epl,soccer_france_ligue_one,soccer_germany_bundesliga,\
                                  soccer_italy_serie_a,soccer_spain_la_liga";

/// A league to ingest, as known to API-Football.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct League {
    pub name: String,
    pub id: i64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    /// API-Football is skipped when no key is configured.
    pub api_football_key: Option<String>,
    /// The Odds API is skipped when no key is configured.
    pub odds_api_key: Option<String>,
    pub leagues: Vec<League>,
    pub seasons: Vec<i32>,
    pub endpoints: Vec<Endpoint>,
    /// API-Football bet names kept by the odds endpoint.
    pub odds_markets: Vec<String>,
    pub odds_sport_keys: Vec<String>,
    pub odds_regions: String,
    /// OpenLigaDB is skipped when empty.
    pub oldb_league: String,
    pub oldb_seasons: Vec<i32>,
    pub http: HttpSettings,
    pub api_football_base_url: String,
    pub odds_api_base_url: String,
    pub openligadb_base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok(), Path::new(SECRETS_DIR))
    }

    /// Build from any variable source; `secrets_dir` holds file-based keys.
    pub fn from_lookup<F>(lookup: F, secrets_dir: &Path) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string());
        let or_default = |name: &str, default: &str| var(name).unwrap_or_else(|| default.to_string());

        let api_football_key = api_key(
            &var,
            &["API_FOOTBALL_KEY", "APIFOOTBALL_KEY"],
            &secrets_dir.join("api_football_key"),
        )?;
        let odds_api_key = api_key(
            &var,
            &["THE_ODDS_API_KEY", "ODDS_API_KEY"],
            &secrets_dir.join("odds_api_key"),
        )?;

        let seasons = parse_seasons(&or_default("SEASONS", DEFAULT_SEASONS)).context("SEASONS")?;
        let oldb_seasons = match var("OLDB_SEASONS") {
            Some(v) => parse_seasons(&v).context("OLDB_SEASONS")?,
            None => seasons.clone(),
        };

        let odds_markets = match var("ODDS_MARKETS") {
            Some(v) => parse_list(&v).into_iter().map(|m| m.to_lowercase()).collect(),
            None => api_football::DEFAULT_MARKETS.iter().map(|m| m.to_string()).collect(),
        };

        let http = HttpSettings {
            timeout: Duration::from_secs(number(&var, "HTTP_TIMEOUT_SECONDS", 30)?),
            request_delay: Duration::from_millis(number(&var, "REQUEST_DELAY_MS", 250)?),
            max_attempts: number(&var, "MAX_ATTEMPTS", 3)?,
            backoff: Duration::from_millis(number(&var, "BACKOFF_MS", 1000)?),
        };
        if http.max_attempts == 0 {
            bail!("MAX_ATTEMPTS must be at least 1");
        }

        Ok(Self {
            db_path: PathBuf::from(or_default("WAREHOUSE_DB_PATH", "warehouse.sqlite")),
            api_football_key,
            odds_api_key,
            leagues: parse_leagues(&or_default("LEAGUES", DEFAULT_LEAGUES)).context("LEAGUES")?,
            seasons,
            endpoints: parse_endpoints(&or_default("INGEST_ENDPOINTS", DEFAULT_ENDPOINTS))
                .context("INGEST_ENDPOINTS")?,
            odds_markets,
            odds_sport_keys: parse_list(&or_default("ODDS_SPORT_KEYS", DEFAULT_SPORT_KEYS)),
            odds_regions: or_default("ODDS_REGIONS", "eu"),
            oldb_league: or_default("OLDB_LEAGUE", "bl1"),
            oldb_seasons,
            http,
            api_football_base_url: or_default("API_FOOTBALL_BASE_URL", api_football::DEFAULT_BASE_URL),
            odds_api_base_url: or_default("ODDS_API_BASE_URL", odds_api::DEFAULT_BASE_URL),
            openligadb_base_url: or_default("OPENLIGADB_BASE_URL", openligadb::DEFAULT_BASE_URL),
        })
    }
}

/// First non-empty variable among `names`, else the secret file, else none.
fn api_key<F>(var: &F, names: &[&str], secret_file: &Path) -> Result<Option<String>>
where
    F: Fn(&str) -> Option<String>,
{
    let found = names
        .iter()
        .find_map(|name| var(name).filter(|v| !v.is_empty()).map(|v| (*name, v)));
    let (name, key) = match found {
        Some(found) => found,
        None if secret_file.exists() => (names[0], read_secret_file(secret_file)?),
        None => return Ok(None),
    };

    // Prevent accidental use of sample/placeholder keys
    let key_lower = key.to_lowercase();
    if key.is_empty()
        || key_lower.contains("change_me")
        || key_lower.contains("your_")
        || key_lower.starts_with("sample")
        || key_lower.starts_with('<')
    {
        return Err(anyhow!(
            "{} appears to be a placeholder value; replace with your real key",
            name
        ));
    }
    Ok(Some(key))
}

fn read_secret_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .with_context(|| format!("Failed to read secret file {}", path.display()))
}

fn number<F, T>(var: &F, name: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(name).filter(|v| !v.is_empty()) {
        Some(v) => v.parse().with_context(|| format!("{} must be a number, got {:?}", name, v)),
        None => Ok(default),
    }
}

pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// `Name:id` pairs; a bare id names the league after itself.
pub fn parse_leagues(raw: &str) -> Result<Vec<League>> {
    parse_list(raw)
        .into_iter()
        .map(|item| {
            let (name, id) = match item.rsplit_once(':') {
                Some((name, id)) => (name.trim().to_string(), id.trim()),
                None => (item.clone(), item.as_str()),
            };
            let id = id
                .parse()
                .with_context(|| format!("invalid league id in {:?}", item))?;
            Ok(League { name, id })
        })
        .collect()
}

/// `2023-2025` (inclusive range) or `2021,2023`.
pub fn parse_seasons(raw: &str) -> Result<Vec<i32>> {
    let raw = raw.trim();
    if let Some((from, to)) = raw.split_once('-') {
        let from: i32 = from.trim().parse().with_context(|| format!("invalid season range {:?}", raw))?;
        let to: i32 = to.trim().parse().with_context(|| format!("invalid season range {:?}", raw))?;
        if from > to {
            bail!("season range {:?} runs backwards", raw);
        }
        return Ok((from..=to).collect());
    }
    parse_list(raw)
        .iter()
        .map(|s| s.parse().with_context(|| format!("invalid season {:?}", s)))
        .collect()
}

pub fn parse_endpoints(raw: &str) -> Result<Vec<Endpoint>> {
    let mut endpoints = Vec::new();
    for name in parse_list(raw) {
        let endpoint: Endpoint = name.parse()?;
        if !endpoints.contains(&endpoint) {
            endpoints.push(endpoint);
        }
    }
    Ok(endpoints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)], secrets_dir: &Path) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned(), secrets_dir)
    }

    #[test]
    fn defaults_cover_the_five_big_leagues() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(&[], dir.path()).unwrap();

        assert_eq!(cfg.db_path, PathBuf::from("warehouse.sqlite"));
        assert_eq!(cfg.leagues.len(), 5);
        assert_eq!(cfg.leagues[0], League { name: "England".into(), id: 39 });
        assert_eq!(cfg.seasons, vec![2023, 2024, 2025]);
        assert_eq!(cfg.oldb_seasons, cfg.seasons);
        assert!(cfg.api_football_key.is_none());
        assert!(cfg.odds_api_key.is_none());
        assert!(!cfg.endpoints.contains(&Endpoint::Odds));
        assert_eq!(cfg.http.max_attempts, 3);
        assert_eq!(cfg.http.request_delay, Duration::from_millis(250));
        assert_eq!(cfg.odds_sport_keys.len(), 5);
    }

    #[test]
    fn keys_come_from_aliases_or_secret_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("odds_api_key"), "abc123\n").unwrap();

        let cfg = config(&[("APIFOOTBALL_KEY", "k-1")], dir.path()).unwrap();
        assert_eq!(cfg.api_football_key.as_deref(), Some("k-1"));
        assert_eq!(cfg.odds_api_key.as_deref(), Some("abc123"));
    }

    #[test]
    fn placeholder_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = config(&[("API_FOOTBALL_KEY", "your_api_key_here")], dir.path()).unwrap_err();
        assert!(err.to_string().contains("API_FOOTBALL_KEY"));
    }

    #[test]
    fn overrides_are_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(
            &[
                ("LEAGUES", "Bundesliga:78, 39"),
                ("SEASONS", "2021,2023"),
                ("INGEST_ENDPOINTS", "standings, odds,standings"),
                ("OLDB_SEASONS", "2022"),
                ("REQUEST_DELAY_MS", "0"),
                ("MAX_ATTEMPTS", "5"),
            ],
            dir.path(),
        )
        .unwrap();

        assert_eq!(
            cfg.leagues,
            vec![
                League { name: "Bundesliga".into(), id: 78 },
                League { name: "39".into(), id: 39 },
            ]
        );
        assert_eq!(cfg.seasons, vec![2021, 2023]);
        assert_eq!(cfg.endpoints, vec![Endpoint::Standings, Endpoint::Odds]);
        assert_eq!(cfg.oldb_seasons, vec![2022]);
        assert_eq!(cfg.http.request_delay, Duration::ZERO);
        assert_eq!(cfg.http.max_attempts, 5);
    }

    #[test]
    fn bad_values_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(config(&[("SEASONS", "2025-2023")], dir.path()).is_err());
        assert!(config(&[("LEAGUES", "England:abc")], dir.path()).is_err());
        assert!(config(&[("INGEST_ENDPOINTS", "lineups")], dir.path()).is_err());
        assert!(config(&[("MAX_ATTEMPTS", "0")], dir.path()).is_err());
        assert!(config(&[("BACKOFF_MS", "soon")], dir.path()).is_err());
    }
}
