//! Source adapters: one configured client per provider, each flattening its
//! provider's JSON into row-sets for the warehouse.

pub mod api_football;
pub mod flatten;
pub mod http;
pub mod normalize;
pub mod odds_api;
pub mod openligadb;

pub use api_football::ApiFootball;
pub use flatten::{Flattened, Flattener};
pub use http::{HttpSettings, HttpSource};
pub use odds_api::OddsApi;
pub use openligadb::OpenLigaDb;
