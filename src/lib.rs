pub mod ast;
pub mod error;
pub mod exec;
pub mod filter;
pub mod query;
pub mod schema;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use ast::{BinOp, Datum, Document, Expr, SortField, UnOp};
pub use error::QueryError;
pub use exec::{ExecStats, Executor, QueryNode, QueryResult, WriteOutcome};
pub use filter::{Combinator, Operator, WhereClause, compile};
pub use query::Builder;
pub use schema::Schema;
pub use session::Session;
pub use storage::{Config, DefaultStorage, MemoryStorage, StorageBackend, StorageError};
