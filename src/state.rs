use std::sync::Arc;

use crate::config::Config;
use crate::db::DbPool;

/// Shared by every handler. The pool is the only handle to persistent state;
/// sessions and login failures live in the database rather than in here.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: DbPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }
}
