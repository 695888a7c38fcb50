use crate::error::Result;
use crate::exec::{Executor, QueryNode, QueryResult};
use crate::query::Builder;
use crate::schema::Schema;
use crate::storage::{Config, DefaultStorage, MemoryStorage, StorageBackend};
use std::sync::Arc;
use std::time::Instant;

/// Handle to one store. Cloning is cheap; all clones share the same
/// backend.
#[derive(Clone)]
pub struct Session {
    storage: Arc<dyn StorageBackend>,
}

impl Session {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    /// Opens a persistent session backed by the default storage engine.
    pub fn open(cfg: &Config) -> Result<Self> {
        let storage = DefaultStorage::open(cfg)?;
        Ok(Self::new(Arc::new(storage)))
    }

    /// An in-memory session, mainly for tests and embedding.
    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Starts a query against a table.
    pub fn table(&self, name: &str) -> Builder {
        Builder::new(self.clone(), name)
    }

    pub fn schema(&self) -> Schema {
        Schema::new(self.storage.clone())
    }

    pub fn storage(&self) -> Arc<dyn StorageBackend> {
        self.storage.clone()
    }

    /// Executes a query tree and logs it with its elapsed time.
    pub async fn run(&self, node: &QueryNode) -> Result<QueryResult> {
        let start = Instant::now();
        let mut executor = Executor::new(self.storage.clone());
        let result = executor.run(node).await?;
        log::debug!(
            "query executed in {:.2}ms: {node}",
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(result)
    }
}
