//! Engine - the single entry point from SQL text to a result set.
//!
//! An [`Engine`] owns one [`Database`] and drives every statement through
//! tokenize, parse and execute on the calling thread. It does no locking of
//! its own; hosts that share an engine across threads wrap it in a
//! [`SharedEngine`].

use crate::config::EngineConfig;
use crate::error::Result;
use crate::observability::ExecutionStats;
use crate::sql::executor::{ExecutionBackend, QueryExecutor};
use crate::sql::lexer::Lexer;
use crate::sql::parser::Parser;
use crate::sql::types::{QueryResult, Row};
use crate::storage::Database;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, warn};

pub struct Engine {
    database: Database,
    config: EngineConfig,
    backend: Option<Box<dyn ExecutionBackend>>,
    last_error: Option<String>,
    stats: ExecutionStats,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            database: Database::new(),
            config,
            backend: None,
            last_error: None,
            stats: ExecutionStats::new(),
        }
    }

    /// Registers an acceleration backend consulted for SELECT plans.
    pub fn set_backend(&mut self, backend: Box<dyn ExecutionBackend>) {
        info!(backend = backend.name(), "Registered execution backend");
        self.backend = Some(backend);
    }

    pub fn clear_backend(&mut self) -> Option<Box<dyn ExecutionBackend>> {
        self.backend.take()
    }

    /// Tokenizes, parses and executes one statement.
    pub fn execute(&mut self, sql: &str) -> Result<QueryResult> {
        if self.config.logging.log_statements {
            info!(sql = %sql, "Executing statement");
        }

        match self.run(sql) {
            Ok(result) => {
                self.stats.record_success(&result);
                self.last_error = None;
                Ok(result)
            }
            Err(e) => {
                warn!(error = %e, kind = ?e.kind(), "Statement failed");
                self.stats.record_failure();
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Executes one statement, reporting failure as an empty row set plus a
    /// message. The message is also kept for [`Engine::last_error`].
    pub fn execute_rows(&mut self, sql: &str) -> (Vec<Row>, Option<String>) {
        match self.execute(sql) {
            Ok(result) => (result.rows, None),
            Err(e) => (Vec::new(), Some(e.to_string())),
        }
    }

    fn run(&mut self, sql: &str) -> Result<QueryResult> {
        let tokens = Lexer::new(sql)
            .strict(self.config.lexer.reject_invalid_tokens)
            .tokenize()?;
        let statement = Parser::from_tokens(tokens).parse()?;

        QueryExecutor::new(&mut self.database, &self.config.execution)
            .with_backend(self.backend.as_deref())
            .execute(&statement)
    }

    /// Message of the most recent failed statement, cleared on success.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stats(&self) -> &ExecutionStats {
        &self.stats
    }

    pub fn into_shared(self) -> SharedEngine {
        Arc::new(Mutex::new(self))
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// An engine whose statements are serialized by one lock.
pub type SharedEngine = Arc<Mutex<Engine>>;
