//! User to conversation-session mapping.
//!
//! The backend-of-record holds the authoritative id on today's plan; this
//! directory is a write-through cache in front of it. Calls for the same
//! user are serialised by a per-user async lock so a missing session is
//! created at most once; different users never contend.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use dashmap::DashMap;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::agent::DeleteOutcome;
use crate::error::GatewayError;

/// Durable side of the mapping (today's plan on the coach backend).
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    async fn stored_session_id(&self, user: &str) -> Result<Option<String>, GatewayError>;
    async fn store_session_id(&self, user: &str, session_id: &str) -> Result<(), GatewayError>;
}

/// Owner of the sessions themselves (the agent runtime).
#[async_trait]
pub trait SessionRuntime: Send + Sync + 'static {
    async fn create_session(
        &self,
        user: &str,
        state: &serde_json::Value,
    ) -> Result<String, GatewayError>;
    async fn delete_session(
        &self,
        user: &str,
        session_id: &str,
    ) -> Result<DeleteOutcome, GatewayError>;
}

/// Current UTC day. Injectable so tests can cross midnight.
pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub session_id: String,
    /// True when the session did not exist before this call.
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviousSession {
    Deleted(String),
    /// The runtime no longer knew this id.
    NotFound(String),
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetOutcome {
    pub session_id: String,
    pub previous: PreviousSession,
}

#[derive(Debug, Clone)]
struct CachedSession {
    day: NaiveDate,
    session_id: String,
}

pub struct SessionDirectory<St, Rt> {
    store: St,
    runtime: Rt,
    cache: DashMap<String, CachedSession>,
    locks: DashMap<String, Arc<Mutex<()>>>,
    first_name: Option<String>,
    today: Clock,
}

impl<St: SessionStore, Rt: SessionRuntime> SessionDirectory<St, Rt> {
    pub fn new(store: St, runtime: Rt, first_name: Option<String>) -> Self {
        Self::with_clock(store, runtime, first_name, Arc::new(|| Utc::now().date_naive()))
    }

    pub fn with_clock(store: St, runtime: Rt, first_name: Option<String>, today: Clock) -> Self {
        Self {
            store,
            runtime,
            cache: DashMap::new(),
            locks: DashMap::new(),
            first_name,
            today,
        }
    }

    pub fn runtime(&self) -> &Rt {
        &self.runtime
    }

    /// Session id for `user` today: cache, then backend, then a new session.
    pub async fn resolve(&self, user: &str) -> Result<Resolved, GatewayError> {
        let today = (self.today)();
        if let Some(session_id) = self.cached(user, today) {
            return Ok(Resolved {
                session_id,
                created: false,
            });
        }

        let lock = self.user_lock(user);
        let _guard = lock.lock().await;

        // Another caller may have filled the cache while we waited.
        if let Some(session_id) = self.cached(user, today) {
            return Ok(Resolved {
                session_id,
                created: false,
            });
        }

        if let Some(session_id) = self.store.stored_session_id(user).await? {
            debug!(user, session_id = %session_id, "session id read from backend");
            self.remember(user, today, &session_id);
            return Ok(Resolved {
                session_id,
                created: false,
            });
        }

        let session_id = self.create_and_persist(user, today).await?;
        Ok(Resolved {
            session_id,
            created: true,
        })
    }

    /// Replace the user's session with a fresh one.
    pub async fn reset(&self, user: &str) -> Result<ResetOutcome, GatewayError> {
        let today = (self.today)();
        let lock = self.user_lock(user);
        let _guard = lock.lock().await;

        let current = match self.cached(user, today) {
            Some(session_id) => Some(session_id),
            None => self.store.stored_session_id(user).await?,
        };

        let previous = match current {
            Some(session_id) => match self.runtime.delete_session(user, &session_id).await? {
                DeleteOutcome::Deleted => PreviousSession::Deleted(session_id),
                DeleteOutcome::NotFound => PreviousSession::NotFound(session_id),
            },
            None => PreviousSession::None,
        };
        self.cache.remove(user);

        let session_id = self.create_and_persist(user, today).await?;
        info!(user, session_id = %session_id, "session reset");
        Ok(ResetOutcome {
            session_id,
            previous,
        })
    }

    /// Persist first, then cache: the cache never holds an id the backend lacks.
    async fn create_and_persist(&self, user: &str, today: NaiveDate) -> Result<String, GatewayError> {
        let state = json!({ "user:first_name": self.first_name_for(user) });
        let session_id = self.runtime.create_session(user, &state).await?;
        self.store.store_session_id(user, &session_id).await?;
        self.remember(user, today, &session_id);
        info!(user, session_id = %session_id, "session created");
        Ok(session_id)
    }

    fn cached(&self, user: &str, today: NaiveDate) -> Option<String> {
        self.cache
            .get(user)
            .filter(|entry| entry.day == today)
            .map(|entry| entry.session_id.clone())
    }

    /// One entry per user, so yesterday's entry is replaced here.
    fn remember(&self, user: &str, day: NaiveDate, session_id: &str) {
        self.cache.insert(
            user.to_string(),
            CachedSession {
                day,
                session_id: session_id.to_string(),
            },
        );
    }

    fn user_lock(&self, user: &str) -> Arc<Mutex<()>> {
        Arc::clone(&self.locks.entry(user.to_string()).or_default())
    }

    fn first_name_for(&self, user: &str) -> String {
        match &self.first_name {
            Some(name) => name.clone(),
            None => first_name_from_email(user),
        }
    }
}

/// `"jean.dupont@x.com"` → `"Jean"`.
pub fn first_name_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let first = local.split(['.', '_', '-', '+']).next().unwrap_or_default();
    let mut chars = first.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
