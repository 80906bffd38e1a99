use std::sync::Arc;

use dashmap::DashMap;
use storage::models::RallyId;
use storage::{Database, StandingsEngine};
use tokio::sync::Mutex;

/// Shared handler state: the results store and the in-memory engine.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub engine: Arc<StandingsEngine>,
    /// One lock per rally, held while it is loaded from the database so that
    /// concurrent first requests hydrate it once.
    hydration: Arc<DashMap<RallyId, Arc<Mutex<()>>>>,
}

impl AppState {
    pub fn new(db: Database, engine: StandingsEngine) -> Self {
        Self {
            db,
            engine: Arc::new(engine),
            hydration: Arc::new(DashMap::new()),
        }
    }

    pub fn hydration_lock(&self, rally_id: &RallyId) -> Arc<Mutex<()>> {
        Arc::clone(self.hydration.entry(rally_id.clone()).or_default().value())
    }

    pub fn release_hydration_lock(&self, rally_id: &RallyId) {
        self.hydration.remove(rally_id);
    }
}
