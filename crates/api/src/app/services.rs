//! Store selection and the service bundle shared by every handler.

use ledger_infra::{InMemoryLedgerStore, LedgerService, LedgerStore, PostgresLedgerStore, StoreError};

use crate::config::ApiConfig;

/// Services handed to handlers through an `Extension`.
#[derive(Debug)]
pub struct AppServices<S> {
    ledger: LedgerService<S>,
}

impl<S: LedgerStore> AppServices<S> {
    pub fn new(store: S) -> Self {
        Self {
            ledger: LedgerService::new(store),
        }
    }

    pub fn ledger(&self) -> &LedgerService<S> {
        &self.ledger
    }

    pub fn store(&self) -> &S {
        self.ledger.store()
    }
}

/// The backing store picked from configuration.
pub enum ConfiguredStore {
    InMemory(InMemoryLedgerStore),
    Postgres(PostgresLedgerStore),
}

/// Connect and migrate Postgres when `DATABASE_URL` is set, otherwise fall
/// back to an in-memory store.
pub async fn configured_store(config: &ApiConfig) -> Result<ConfiguredStore, StoreError> {
    match config.database_url.as_deref() {
        Some(url) => {
            let store = PostgresLedgerStore::connect(url, config.db_max_connections).await?;
            store.migrate().await?;
            tracing::info!(max_connections = config.db_max_connections, "using postgres ledger store");
            Ok(ConfiguredStore::Postgres(store))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; ledger data lives in memory only");
            Ok(ConfiguredStore::InMemory(InMemoryLedgerStore::new()))
        }
    }
}
