use crate::ast::Document;
use async_trait::async_trait;
use rocksdb::{
    BlockBasedOptions, ColumnFamilyDescriptor, DB, DBCompactionStyle, DBCompressionType,
    DBWithThreadMode, IteratorMode, MultiThreaded, Options, WriteBatch,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::spawn_blocking;
use tokio_stream::wrappers::ReceiverStream;

/// Reserved table holding engine metadata such as index markers.
pub const META_TABLE: &str = "__meta__";

#[derive(Debug)]
pub enum StorageError {
    BackendError(rocksdb::Error),
    InvalidDocument(rmp_serde::decode::Error),
    EncodeError(rmp_serde::encode::Error),
    MissingTable(String),
    InvalidTableName(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BackendError(e) => write!(f, "Storage backend error: {e}"),
            Self::InvalidDocument(e) => write!(f, "Invalid document: {e}"),
            Self::EncodeError(e) => write!(f, "Document encoding error: {e}"),
            Self::MissingTable(name) => write!(f, "Missing table: {name}"),
            Self::InvalidTableName(name) => write!(f, "Invalid table name: {name}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::BackendError(e) => Some(e),
            Self::InvalidDocument(e) => Some(e),
            Self::EncodeError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rocksdb::Error> for StorageError {
    fn from(e: rocksdb::Error) -> Self {
        Self::BackendError(e)
    }
}

impl From<rmp_serde::decode::Error> for StorageError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        Self::InvalidDocument(e)
    }
}

impl From<rmp_serde::encode::Error> for StorageError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Self::EncodeError(e)
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Table-oriented key/value storage. Keys are canonical identity strings;
/// values are whole documents.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn list_tables(&self) -> Result<Vec<String>>;
    async fn table_exists(&self, table: &str) -> Result<bool>;
    async fn create_table(&self, table: &str) -> Result<()>;
    async fn drop_table(&self, table: &str) -> Result<()>;
    async fn put(&self, table: &str, key: &str, doc: &Document) -> Result<()>;
    async fn put_batch(&self, table: &str, docs: &[(String, Document)]) -> Result<()>;
    async fn get(&self, table: &str, key: &str) -> Result<Option<Document>>;
    async fn scan_table(&self, table: &str) -> Result<ReceiverStream<Result<Document>>>;
    async fn delete(&self, table: &str, key: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: String,
    pub write_buffer_size_mb: usize,
    pub max_write_buffer_number: i32,
    pub max_background_jobs: i32,
    pub parallelism: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            write_buffer_size_mb: 64,
            max_write_buffer_number: 3,
            max_background_jobs: 4,
            parallelism: num_cpus::get() as i32,
        }
    }
}

/// RocksDB-backed storage. Each table maps to a column family; documents
/// are MessagePack-encoded under their identity key.
pub struct DefaultStorage {
    inner: Arc<DBWithThreadMode<MultiThreaded>>,
    schema_lock: Mutex<()>,
    path: String,
    opts: Options,
}

impl DefaultStorage {
    pub fn open(cfg: &Config) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        // Write buffer settings
        opts.set_write_buffer_size(cfg.write_buffer_size_mb * 1024 * 1024);
        opts.set_max_write_buffer_number(cfg.max_write_buffer_number);

        // Compaction settings
        opts.set_max_background_jobs(cfg.max_background_jobs);
        opts.set_compaction_style(DBCompactionStyle::Level);

        // Parallelism
        opts.increase_parallelism(cfg.parallelism);
        opts.set_allow_concurrent_memtable_write(true);

        opts.set_compression_type(DBCompressionType::Zstd);

        let mut block_opts = BlockBasedOptions::default();
        block_opts.set_block_size(16 * 1024);
        block_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&block_opts);

        let cfs_on_disk = DB::list_cf(&opts, &cfg.data_dir)
            .unwrap_or_else(|_| vec![META_TABLE.to_string()]);

        let descriptors = cfs_on_disk
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db: DBWithThreadMode<MultiThreaded> =
            DBWithThreadMode::open_cf_descriptors(&opts, &cfg.data_dir, descriptors)?;

        let storage = Self {
            inner: Arc::new(db),
            schema_lock: Mutex::new(()),
            path: cfg.data_dir.clone(),
            opts,
        };

        if storage.inner.cf_handle(META_TABLE).is_none() {
            storage.inner.create_cf(META_TABLE, &Options::default())?;
        }

        Ok(storage)
    }
}

#[async_trait]
impl StorageBackend for DefaultStorage {
    async fn list_tables(&self) -> Result<Vec<String>> {
        let opts = self.opts.clone();
        let path = self.path.clone();

        spawn_blocking(move || {
            let tables = DB::list_cf(&opts, &path)
                .unwrap_or_default()
                .into_iter()
                .filter(|cf| cf != "default" && cf != META_TABLE)
                .collect();
            Ok(tables)
        })
        .await
        .unwrap()
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        Ok(self.inner.cf_handle(table).is_some())
    }

    async fn create_table(&self, table: &str) -> Result<()> {
        if table == META_TABLE || table == "default" {
            return Err(StorageError::InvalidTableName(format!(
                "{table} is a reserved name"
            )));
        }

        let _guard = self.schema_lock.lock().unwrap();
        self.inner.create_cf(table, &Options::default())?;
        self.inner
            .cf_handle(table)
            .ok_or_else(|| StorageError::MissingTable(table.to_string()))?;
        Ok(())
    }

    async fn drop_table(&self, table: &str) -> Result<()> {
        if table == META_TABLE || table == "default" {
            return Err(StorageError::InvalidTableName(format!(
                "{table} is a reserved name"
            )));
        }

        let _guard = self.schema_lock.lock().unwrap();
        self.inner.drop_cf(table)?;
        Ok(())
    }

    async fn put(&self, table: &str, key: &str, doc: &Document) -> Result<()> {
        let db = self.inner.clone();
        let table = table.to_string();
        let key = key.to_string();
        let doc = rmp_serde::to_vec(doc)?;

        spawn_blocking(move || {
            let cf = db
                .cf_handle(&table)
                .ok_or_else(|| StorageError::MissingTable(table.clone()))?;

            db.put_cf(&cf, key, doc)?;
            Ok(())
        })
        .await
        .unwrap()
    }

    async fn put_batch(&self, table: &str, docs: &[(String, Document)]) -> Result<()> {
        let db = self.inner.clone();
        let table = table.to_string();
        let docs: Vec<(String, Vec<u8>)> = docs
            .iter()
            .map(|(k, d)| Ok((k.clone(), rmp_serde::to_vec(d)?)))
            .collect::<Result<_>>()?;

        spawn_blocking(move || {
            let cf = db
                .cf_handle(&table)
                .ok_or_else(|| StorageError::MissingTable(table.clone()))?;

            let mut batch = WriteBatch::default();

            for (key, doc) in docs {
                batch.put_cf(&cf, key, doc);
            }

            db.write(batch)?;
            Ok(())
        })
        .await
        .unwrap()
    }

    async fn get(&self, table: &str, key: &str) -> Result<Option<Document>> {
        let db = self.inner.clone();
        let table = table.to_string();
        let key = key.to_string();

        spawn_blocking(move || {
            let cf = db
                .cf_handle(&table)
                .ok_or_else(|| StorageError::MissingTable(table.clone()))?;

            match db.get_cf(&cf, key)? {
                Some(val) => Ok(Some(parse_doc(val.as_slice())?)),
                None => Ok(None),
            }
        })
        .await
        .unwrap()
    }

    async fn scan_table(&self, table: &str) -> Result<ReceiverStream<Result<Document>>> {
        let db = self.inner.clone();
        let table = table.to_string();

        if db.cf_handle(&table).is_none() {
            return Err(StorageError::MissingTable(table));
        }

        let (tx, rx) = mpsc::channel(16);

        spawn_blocking(move || {
            let Some(cf) = db.cf_handle(&table) else {
                let _ = tx.blocking_send(Err(StorageError::MissingTable(table)));
                return;
            };

            for res in db.iterator_cf(&cf, IteratorMode::Start) {
                let doc = res
                    .map_err(StorageError::BackendError)
                    .and_then(|(_, v)| parse_doc(v.as_ref()));

                if tx.blocking_send(doc).is_err() {
                    break;
                }
            }
        });

        Ok(ReceiverStream::new(rx))
    }

    async fn delete(&self, table: &str, key: &str) -> Result<()> {
        let db = self.inner.clone();
        let table = table.to_string();
        let key = key.to_string();

        spawn_blocking(move || {
            let cf = db
                .cf_handle(&table)
                .ok_or_else(|| StorageError::MissingTable(table.clone()))?;

            db.delete_cf(&cf, key)?;
            Ok(())
        })
        .await
        .unwrap()
    }
}

/// In-memory storage used by tests and the embedded session. Tables are
/// ordered maps so scans are deterministic.
pub struct MemoryStorage {
    tables: RwLock<HashMap<String, BTreeMap<String, Document>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        let mut tables = HashMap::new();
        tables.insert(META_TABLE.to_string(), BTreeMap::new());
        Self {
            tables: RwLock::new(tables),
        }
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn list_tables(&self) -> Result<Vec<String>> {
        let tables = self.tables.read().unwrap();
        let mut names: Vec<String> = tables
            .keys()
            .filter(|name| name.as_str() != META_TABLE)
            .cloned()
            .collect();
        names.sort();
        Ok(names)
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        Ok(self.tables.read().unwrap().contains_key(table))
    }

    async fn create_table(&self, table: &str) -> Result<()> {
        if table == META_TABLE {
            return Err(StorageError::InvalidTableName(format!(
                "{table} is a reserved name"
            )));
        }
        self.tables
            .write()
            .unwrap()
            .entry(table.to_string())
            .or_default();
        Ok(())
    }

    async fn drop_table(&self, table: &str) -> Result<()> {
        if table == META_TABLE {
            return Err(StorageError::InvalidTableName(format!(
                "{table} is a reserved name"
            )));
        }
        let mut tables = self.tables.write().unwrap();
        tables
            .remove(table)
            .ok_or_else(|| StorageError::MissingTable(table.to_string()))?;
        Ok(())
    }

    async fn put(&self, table: &str, key: &str, doc: &Document) -> Result<()> {
        let mut tables = self.tables.write().unwrap();
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| StorageError::MissingTable(table.to_string()))?;
        rows.insert(key.to_string(), doc.clone());
        Ok(())
    }

    async fn put_batch(&self, table: &str, docs: &[(String, Document)]) -> Result<()> {
        let mut tables = self.tables.write().unwrap();
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| StorageError::MissingTable(table.to_string()))?;
        for (key, doc) in docs {
            rows.insert(key.clone(), doc.clone());
        }
        Ok(())
    }

    async fn get(&self, table: &str, key: &str) -> Result<Option<Document>> {
        let tables = self.tables.read().unwrap();
        let rows = tables
            .get(table)
            .ok_or_else(|| StorageError::MissingTable(table.to_string()))?;
        Ok(rows.get(key).cloned())
    }

    async fn scan_table(&self, table: &str) -> Result<ReceiverStream<Result<Document>>> {
        let docs: Vec<Document> = {
            let tables = self.tables.read().unwrap();
            let rows = tables
                .get(table)
                .ok_or_else(|| StorageError::MissingTable(table.to_string()))?;
            rows.values().cloned().collect()
        };

        let (tx, rx) = mpsc::channel(docs.len().max(1));
        for doc in docs {
            // Capacity covers every row, so try_send cannot fail here.
            let _ = tx.try_send(Ok(doc));
        }
        Ok(ReceiverStream::new(rx))
    }

    async fn delete(&self, table: &str, key: &str) -> Result<()> {
        let mut tables = self.tables.write().unwrap();
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| StorageError::MissingTable(table.to_string()))?;
        rows.remove(key);
        Ok(())
    }
}

fn parse_doc(data: &[u8]) -> Result<Document> {
    let doc = rmp_serde::from_slice(data).map_err(StorageError::InvalidDocument)?;
    Ok(doc)
}
