//! SQLite storage implementation

use super::flush::{self, FlushState, FlushStats};
use super::stager::Stager;
use crate::query::Query;
use crate::schema::SchemaRegistry;
use crate::value::{TempId, Value};
use crate::{Error, Result};
use rusqlite::{params_from_iter, Connection};
use std::path::Path;
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed fact store.
///
/// Owns the connection, the stager and the flush engine state. Single
/// writer: nothing here is shared across threads.
pub struct Database<'r> {
    conn: Connection,
    registry: &'r SchemaRegistry,
    stager: Stager,
    state: FlushState,
    /// Queue that broke the last failed cycle, if the error named one
    failed_table: Option<String>,
}

impl<'r> Database<'r> {
    /// Open a database file (creates if doesn't exist) and create the schema
    pub fn open(path: &Path, registry: &'r SchemaRegistry) -> Result<Self> {
        let db = Self::connect(path, registry)?;
        db.create_schema()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory(registry: &'r SchemaRegistry) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self::with_connection(conn, registry)?;
        db.create_schema()?;
        Ok(db)
    }

    /// Open and configure without touching the schema, for auditing a store
    pub fn connect(path: &Path, registry: &'r SchemaRegistry) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn, registry)
    }

    fn with_connection(conn: Connection, registry: &'r SchemaRegistry) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        // In-memory stores report "memory"; only file stores can switch to WAL
        let journal: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!(journal = %journal, "store opened");
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self {
            conn,
            registry,
            stager: Stager::default(),
            state: FlushState::Idle,
            failed_table: None,
        })
    }

    pub fn registry(&self) -> &'r SchemaRegistry {
        self.registry
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn set_batch_size(&mut self, batch_size: usize) {
        self.stager.set_batch_size(batch_size);
    }

    pub fn batch_size(&self) -> usize {
        self.stager.batch_size()
    }

    pub fn state(&self) -> FlushState {
        self.state
    }

    // ========== Schema ==========

    /// Create every table, index and view. Idempotent.
    pub fn create_schema(&self) -> Result<()> {
        let mut sql = String::new();
        for table in self.registry.tables() {
            sql.push_str(&table.create_table_sql());
            sql.push_str(";\n");
            for index in table.create_indexes_sql() {
                sql.push_str(&index);
                sql.push_str(";\n");
            }
        }
        for view in self.registry.views() {
            sql.push_str(&view.create_view_sql());
            sql.push_str(";\n");
        }
        self.execute_scoped("create_schema", &sql)?;
        tracing::debug!(tables = self.registry.len(), views = self.registry.views().len(), "schema created");
        Ok(())
    }

    /// Run a statement batch under its own savepoint. Outside a transaction
    /// the savepoint is the transaction; inside one, the caller keeps
    /// ownership of the commit. A failing statement undoes the whole batch.
    fn execute_scoped(&self, savepoint: &str, batch: &str) -> Result<()> {
        self.conn.execute_batch(&format!("SAVEPOINT {savepoint}"))?;
        let outcome = self
            .conn
            .execute_batch(batch)
            .and_then(|()| self.conn.execute_batch(&format!("RELEASE {savepoint}")));
        if let Err(e) = outcome {
            if !self.conn.is_autocommit() {
                let undo = format!("ROLLBACK TO {savepoint}; RELEASE {savepoint}");
                if let Err(undo_err) = self.conn.execute_batch(&undo) {
                    tracing::warn!(savepoint, error = %undo_err, "could not roll back savepoint");
                }
            }
            return Err(e.into());
        }
        Ok(())
    }

    // ========== Staging ==========

    /// Queue a row for `table`, positional to its non-identity columns.
    ///
    /// The table name is checked now; the row shape when the queue is flushed.
    pub fn stage(&mut self, table: &str, row: Vec<Value>) -> Result<()> {
        self.check_stageable(table)?;
        self.stager.append(table, row);
        self.state = FlushState::Staging;
        Ok(())
    }

    /// Queue a row for an identity-assigning parent under `placeholder`.
    /// Rows staged for child tables may reference the placeholder before the
    /// parent has been inserted.
    pub fn stage_parent(&mut self, table: &str, placeholder: TempId, row: Vec<Value>) -> Result<()> {
        let schema = self.check_stageable(table)?;
        if !schema.assigns_identities {
            return Err(Error::Placeholder(format!(
                "table '{table}' does not assign identities and cannot take placeholder {placeholder}"
            )));
        }
        self.stager.append_parent(table, placeholder, row)?;
        self.state = FlushState::Staging;
        Ok(())
    }

    fn check_stageable(&self, table: &str) -> Result<&'r crate::TableSchema> {
        if self.state == FlushState::Failed {
            return Err(Error::CycleFailed);
        }
        self.registry.get(table).ok_or_else(|| {
            Error::contract(format!("Cannot stage rows for unknown table '{table}'"))
        })
    }

    pub fn pending_rows(&self) -> usize {
        self.stager.pending_rows()
    }

    pub fn pending_for(&self, table: &str) -> usize {
        self.stager.rows(table).len()
    }

    /// True once any queue has reached the batch size
    pub fn should_flush(&self) -> bool {
        self.stager.should_flush()
    }

    /// Drop the queue for `table`. After a failed cycle this leaves the
    /// failed state once the queue that broke it is gone; when the failure
    /// named no table, only once every queue is gone.
    pub fn clear(&mut self, table: &str) {
        let dropped = self.stager.clear(table);
        if dropped > 0 {
            tracing::debug!(table, rows = dropped, "cleared queue");
        }
        if self.state == FlushState::Failed {
            let culprit_pending = match &self.failed_table {
                Some(t) => !self.stager.rows(t).is_empty(),
                None => !self.stager.is_empty(),
            };
            if culprit_pending {
                return;
            }
        }
        self.settle_state();
    }

    pub fn clear_all(&mut self) {
        let dropped = self.stager.clear_all();
        if dropped > 0 {
            tracing::debug!(rows = dropped, "cleared all queues");
        }
        self.settle_state();
    }

    fn settle_state(&mut self) {
        self.failed_table = None;
        self.state = if self.stager.is_empty() {
            FlushState::Idle
        } else {
            FlushState::Staging
        };
    }

    // ========== Flush ==========

    /// Drain every queue into the store in flush order.
    ///
    /// The cycle runs inside a savepoint; when no transaction is open one is
    /// started with `BEGIN IMMEDIATE` and committed on success. On failure
    /// nothing from the cycle survives, the queues keep their rows for
    /// inspection, and the engine refuses further work until
    /// [`clear`](Self::clear), [`clear_all`](Self::clear_all) or
    /// [`rollback`](Self::rollback) is called.
    pub fn flush(&mut self) -> Result<FlushStats> {
        if self.state == FlushState::Failed {
            return Err(Error::CycleFailed);
        }
        if self.stager.is_empty() {
            return Ok(FlushStats::default());
        }

        let owns_transaction = self.conn.is_autocommit();
        if owns_transaction {
            self.conn.execute_batch("BEGIN IMMEDIATE")?;
        }
        if let Err(e) = self.conn.execute_batch("SAVEPOINT flush_cycle") {
            self.abort_cycle(owns_transaction, false);
            return Err(e.into());
        }

        let outcome = flush::run_cycle(&self.conn, self.registry, &self.stager).and_then(|stats| {
            self.conn.execute_batch("RELEASE flush_cycle")?;
            if owns_transaction {
                self.conn.execute_batch("COMMIT")?;
            }
            Ok(stats)
        });

        match outcome {
            Ok(stats) => {
                self.stager.clear_all();
                self.state = FlushState::Committed;
                tracing::info!(
                    rows = stats.total_rows(),
                    tables = stats.tables.len(),
                    placeholders = stats.placeholders_resolved,
                    "flush committed"
                );
                Ok(stats)
            }
            Err(e) => {
                self.abort_cycle(owns_transaction, true);
                self.state = FlushState::Failed;
                self.failed_table = e.failed_table().map(str::to_string);
                Err(e)
            }
        }
    }

    fn abort_cycle(&self, owns_transaction: bool, savepoint_open: bool) {
        if savepoint_open && !self.conn.is_autocommit() {
            if let Err(e) = self.conn.execute_batch("ROLLBACK TO flush_cycle; RELEASE flush_cycle") {
                tracing::warn!(error = %e, "could not roll back flush savepoint");
            }
        }
        if owns_transaction && !self.conn.is_autocommit() {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                tracing::warn!(error = %e, "could not roll back flush transaction");
            }
        }
    }

    // ========== Transactions ==========

    /// Begin an outer transaction spanning several flush cycles
    pub fn begin_transaction(&mut self) -> Result<()> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    /// Commit the outer transaction
    pub fn commit(&mut self) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    /// Roll back the outer transaction, if any, and drop every queue
    pub fn rollback(&mut self) -> Result<()> {
        let dropped = self.stager.clear_all();
        self.state = FlushState::Idle;
        self.failed_table = None;
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        tracing::debug!(rows = dropped, "rolled back");
        Ok(())
    }

    // ========== Reads ==========

    /// Execute a statement produced by the query builder
    pub fn fetch(&self, query: &Query) -> Result<Vec<Vec<Value>>> {
        let mut stmt = self.conn.prepare(&query.sql)?;
        let width = stmt.column_count();
        let rows = stmt
            .query_map(params_from_iter(query.params.iter()), |row| {
                (0..width)
                    .map(|i| row.get_ref(i).map(Value::from))
                    .collect::<rusqlite::Result<Vec<Value>>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Row count per registered table, in registration order
    pub fn table_counts(&self) -> Result<Vec<(String, usize)>> {
        self.registry
            .tables()
            .map(|t| -> Result<(String, usize)> {
                let sql = format!("SELECT COUNT(*) FROM {}", t.name);
                let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
                Ok((t.name.clone(), count as usize))
            })
            .collect()
    }

    /// Delete every row, children before parents
    pub fn clear_tables(&self) -> Result<()> {
        let mut sql = String::new();
        for table in self.registry.external_tables() {
            sql.push_str(&format!("DELETE FROM {table};\n"));
        }
        for entry in self.registry.flush_order().iter().rev() {
            sql.push_str(&format!("DELETE FROM {};\n", entry.table));
        }
        self.execute_scoped("clear_tables", &sql)
    }
}
