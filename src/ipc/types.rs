use std::sync::Arc;

use serde::Deserialize;

use crate::config::Config;
use crate::seed::SeedCache;
use crate::session::Session;
use crate::store::TableStore;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub config: Config,
    pub store: Option<Arc<dyn TableStore>>,
    pub seeds: SeedCache,
    pub session: Option<Session>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: None,
            seeds: SeedCache::default(),
            session: None,
        }
    }
}
