//! RowSQL Core
//!
//! A small SQL engine over volatile, row-oriented in-memory tables.
//! Statements flow through the [`sql::lexer`], the recursive-descent
//! [`sql::parser`] and the [`sql::executor`], which mutates or queries a
//! [`storage::Database`].
//!
//! ```
//! use rowsql::Engine;
//!
//! let mut engine = Engine::new();
//! engine.execute("CREATE TABLE users (id INTEGER NOT NULL, name TEXT)")?;
//! engine.execute("INSERT INTO users VALUES (1, 'Alice'), (2, 'Bob')")?;
//!
//! let result = engine.execute("SELECT name FROM users ORDER BY id DESC LIMIT 1")?;
//! assert_eq!(result.rows[0][0].as_str(), Some("Bob"));
//! # Ok::<(), rowsql::Error>(())
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod observability;
pub mod sql;
pub mod storage;

pub use config::{ConfigBuilder, EngineConfig, Profile};
pub use engine::{Engine, SharedEngine};
pub use error::{Error, ErrorKind, Result};
pub use observability::{init_tracing, ExecutionStats};
pub use sql::{DataType, QueryResult, Row, Value};
pub use storage::{Database, Table};
