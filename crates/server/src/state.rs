//! Application state shared across handlers.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use sqlx::PgPool;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::services::EmailService;
use crate::services::import::ImportSummary;

/// Lifecycle of one background import run, keyed by job id.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImportJobStatus {
    Running,
    Completed { summary: ImportSummary },
    Failed { message: String },
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    email: Option<EmailService>,
    import_jobs: RwLock<HashMap<Uuid, ImportJobStatus>>,
    /// Advisory lock so only one import runs at a time.
    import_lock: Arc<Mutex<()>>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: ServerConfig, pool: PgPool, email: Option<EmailService>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                email,
                import_jobs: RwLock::new(HashMap::new()),
                import_lock: Arc::new(Mutex::new(())),
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get the email service, if SMTP is configured.
    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }

    /// The in-memory import job registry.
    #[must_use]
    pub fn import_jobs(&self) -> &RwLock<HashMap<Uuid, ImportJobStatus>> {
        &self.inner.import_jobs
    }

    /// Handle to the single-run import lock.
    #[must_use]
    pub fn import_lock(&self) -> Arc<Mutex<()>> {
        Arc::clone(&self.inner.import_lock)
    }
}
