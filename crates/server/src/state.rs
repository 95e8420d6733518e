// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;

use coach_db::Database;
use coach_types::UserResolver;

use crate::catalog::Catalog;
use crate::connections::{ConnectionRegistry, WsSink};
use crate::notifier::PlanUpdateNotifier;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub db: Database,
    /// Live event connections, per user.
    pub connections: Arc<ConnectionRegistry<WsSink>>,
    pub notifier: PlanUpdateNotifier<WsSink>,
    pub identity: UserResolver,
    pub catalog: Arc<Catalog>,
}

impl AppState {
    pub fn new(db: Database, identity: UserResolver, catalog: Catalog) -> Arc<Self> {
        let connections = Arc::new(ConnectionRegistry::new());
        Arc::new(Self {
            db,
            notifier: PlanUpdateNotifier::new(connections.clone()),
            connections,
            identity,
            catalog: Arc::new(catalog),
        })
    }
}
