// src/state.rs

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::{cache::DetailCache, config::Config};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub cache: DetailCache,
    pub config: Config,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for DetailCache {
    fn from_ref(state: &AppState) -> Self {
        state.cache.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
