//! Safe wrapper around a database connection.

use std::ffi::CString;
use std::os::raw::{c_char, c_int, c_void};
use std::path::Path;

use log::{debug, warn};
use zeroize::Zeroize;

use crate::cipher;
use crate::config::Config;
use crate::error::{DbError, DbResult};
use crate::ffi;
use crate::row::{Row, RowShape};
use crate::statement::{Statement, StepResult};
use crate::transaction::{Transaction, TransactionBehavior};
use crate::value::Value;

/// A database connection.
///
/// Closed when dropped, or explicitly with [`Connection::close`]. It is
/// `Send` but **not** `Sync`: one thread at a time. Share a connection
/// across tasks through [`Server`](crate::Server).
pub struct Connection {
    /// Raw `sqlite3*` handle. Null only after an explicit close.
    db: *mut c_void,
    path: String,
}

// Safety: the handle is opened with SQLITE_OPEN_FULLMUTEX and the wrapper is
// not Sync, so moving it to another thread cannot create concurrent access.
unsafe impl Send for Connection {}

impl Connection {
    /// Opens (or creates) a database as described by `config`, applying the
    /// cipher key and connection settings.
    ///
    /// # Errors
    ///
    /// Engine errors while opening, keying or configuring.
    pub fn open(config: Config) -> DbResult<Self> {
        let conn = Self::open_raw(&config.path, config.read_only)?;
        let timeout_ms = c_int::try_from(config.busy_timeout.as_millis()).unwrap_or(c_int::MAX);
        unsafe { ffi::sqlite3_busy_timeout(conn.db, timeout_ms) };

        if let Some(key) = &config.key {
            cipher::apply_key(&conn, key)?;
        }
        cipher::configure_connection(&conn, &config)?;
        debug!(
            "opened {} (read_only={}, keyed={})",
            conn.path,
            config.read_only,
            config.key.is_some()
        );
        Ok(conn)
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Engine errors while opening.
    pub fn open_in_memory() -> DbResult<Self> {
        Self::open(Config::memory())
    }

    fn open_raw(path: &Path, read_only: bool) -> DbResult<Self> {
        let path_str = path.to_string_lossy().into_owned();
        let c_path = CString::new(path_str.as_bytes())
            .map_err(|e| DbError::new(ffi::SQLITE_CANTOPEN, format!("invalid path: {e}")))?;

        let flags = if read_only {
            ffi::SQLITE_OPEN_READONLY | ffi::SQLITE_OPEN_FULLMUTEX
        } else {
            ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE | ffi::SQLITE_OPEN_FULLMUTEX
        };

        let mut db: *mut c_void = std::ptr::null_mut();
        let rc = unsafe { ffi::sqlite3_open_v2(c_path.as_ptr(), &mut db, flags, std::ptr::null()) };
        if rc != ffi::SQLITE_OK {
            // A handle is usually allocated even on failure; it carries the
            // message and must still be closed.
            let msg = if db.is_null() {
                ffi::error_string(rc)
            } else {
                let m = Self::errmsg_raw(db);
                unsafe {
                    ffi::sqlite3_close_v2(db);
                }
                m
            };
            return Err(DbError::new(rc, msg));
        }
        Ok(Self { db, path: path_str })
    }

    /// Closes the connection, reporting engine errors that `Drop` would
    /// swallow.
    ///
    /// # Errors
    ///
    /// The engine refused to close the handle.
    pub fn close(mut self) -> DbResult<()> {
        let rc = unsafe { ffi::sqlite3_close(self.db) };
        if rc != ffi::SQLITE_OK {
            // Drop falls back to close_v2, which defers until the handle is idle.
            return Err(DbError::new(rc, self.errmsg()));
        }
        self.db = std::ptr::null_mut();
        debug!("closed {}", self.path);
        Ok(())
    }

    /// Path the connection was opened with.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    // ── execute_batch ───────────────────────────────────────────────────

    /// Executes one or more SQL statements separated by semicolons.
    ///
    /// No result rows are returned. Suitable for DDL, PRAGMAs, and
    /// multi-statement scripts.
    ///
    /// # Errors
    ///
    /// The first engine error in the script.
    pub fn execute_batch(&self, sql: &str) -> DbResult<()> {
        let c_sql = CString::new(sql)
            .map_err(|e| DbError::new(ffi::SQLITE_ERROR, format!("nul in SQL: {e}")))?;
        self.exec(&c_sql)
    }

    /// Like [`execute_batch`](Self::execute_batch) but zeroizes the internal
    /// C string buffer afterwards. Use for SQL containing key material.
    pub(crate) fn execute_batch_zeroized(&self, sql: &str) -> DbResult<()> {
        let c_sql = CString::new(sql)
            .map_err(|_| DbError::new(ffi::SQLITE_ERROR, "nul in SQL"))?;
        let result = self.exec(&c_sql);
        c_sql.into_bytes_with_nul().zeroize();
        result
    }

    fn exec(&self, c_sql: &CString) -> DbResult<()> {
        let mut errmsg: *mut c_char = std::ptr::null_mut();
        let rc = unsafe {
            ffi::sqlite3_exec(
                self.db,
                c_sql.as_ptr(),
                std::ptr::null(),
                std::ptr::null_mut(),
                &mut errmsg,
            )
        };
        if rc != ffi::SQLITE_OK {
            let msg = if errmsg.is_null() {
                self.errmsg()
            } else {
                let s = unsafe { ffi::owned_string(errmsg) }.unwrap_or_default();
                unsafe {
                    ffi::sqlite3_free(errmsg.cast());
                }
                s
            };
            return Err(DbError::new(rc, msg));
        }
        Ok(())
    }

    // ── prepare ─────────────────────────────────────────────────────────

    /// Prepares a single SQL statement and captures its column descriptors.
    ///
    /// # Errors
    ///
    /// Engine errors such as a syntax error or an unknown table.
    pub fn prepare(&self, sql: &str) -> DbResult<Statement<'_>> {
        let c_sql = CString::new(sql)
            .map_err(|e| DbError::new(ffi::SQLITE_ERROR, format!("nul in SQL: {e}")))?;
        let mut stmt: *mut c_void = std::ptr::null_mut();
        let rc = unsafe {
            ffi::sqlite3_prepare_v2(self.db, c_sql.as_ptr(), -1, &mut stmt, std::ptr::null_mut())
        };
        if rc != ffi::SQLITE_OK {
            return Err(DbError::new(rc, self.errmsg()));
        }
        if stmt.is_null() {
            // Empty input or a lone comment compiles to nothing.
            return Err(DbError::new(ffi::SQLITE_MISUSE, "no SQL statement to prepare"));
        }
        debug!("prepared: {sql}");
        Ok(unsafe { Statement::from_raw(stmt, self.db) })
    }

    // ── execute / query ─────────────────────────────────────────────────

    /// Prepares, binds and runs a single statement.
    ///
    /// Returns the number of rows changed.
    ///
    /// # Errors
    ///
    /// Engine errors from any step.
    pub fn execute(&self, sql: &str, params: &[Value]) -> DbResult<usize> {
        let mut stmt = self.prepare(sql)?;
        stmt.bind(params)?;
        stmt.execute()
    }

    /// Prepares, binds and fetches every row in the requested shape.
    ///
    /// # Errors
    ///
    /// Engine errors from any step, or a column coercion failure.
    pub fn query(&self, sql: &str, params: &[Value], shape: RowShape) -> DbResult<Vec<Row>> {
        let mut stmt = self.prepare(sql)?;
        stmt.bind(params)?;
        stmt.fetch_all(shape)
    }

    /// Prepares and executes a statement, mapping exactly one result row.
    ///
    /// # Errors
    ///
    /// `SQLITE_DONE` when no row is returned; otherwise engine errors or
    /// the mapper's error.
    pub fn query_row<T>(
        &self,
        sql: &str,
        params: &[Value],
        mapper: impl FnOnce(&Statement<'_>) -> DbResult<T>,
    ) -> DbResult<T> {
        self.query_row_optional(sql, params, mapper)?
            .ok_or_else(|| DbError::new(ffi::SQLITE_DONE, "query returned no rows"))
    }

    /// Like [`query_row`](Self::query_row) but returns `Ok(None)` when no row
    /// is returned.
    ///
    /// # Errors
    ///
    /// Engine errors or the mapper's error.
    pub fn query_row_optional<T>(
        &self,
        sql: &str,
        params: &[Value],
        mapper: impl FnOnce(&Statement<'_>) -> DbResult<T>,
    ) -> DbResult<Option<T>> {
        let mut stmt = self.prepare(sql)?;
        stmt.bind(params)?;
        match stmt.step()? {
            StepResult::Row => mapper(&stmt).map(Some),
            StepResult::Done => Ok(None),
        }
    }

    // ── Schema ───────────────────────────────────────────────────────────

    /// Creates a table from `(column, declared type)` pairs.
    ///
    /// Identifiers are quoted; declared types are inserted verbatim so
    /// annotations such as `DECIMAL(3,2)` or `PRIMARY KEY` survive.
    ///
    /// # Errors
    ///
    /// Engine errors, e.g. when the table already exists.
    pub fn create_table(&self, name: &str, columns: &[(&str, &str)]) -> DbResult<()> {
        let defs = columns
            .iter()
            .map(|(column, decl)| format!("{} {decl}", quote_identifier(column)))
            .collect::<Vec<_>>()
            .join(", ");
        self.execute_batch(&format!(
            "CREATE TABLE {} ({defs});",
            quote_identifier(name)
        ))
    }

    // ── Transactions ─────────────────────────────────────────────────────

    /// Begins a deferred transaction.
    ///
    /// # Errors
    ///
    /// Engine errors, e.g. a transaction is already open.
    pub fn transaction(&self) -> DbResult<Transaction<'_>> {
        Transaction::begin(self, TransactionBehavior::Deferred)
    }

    /// Begins an immediate transaction (acquires a RESERVED lock right away).
    ///
    /// # Errors
    ///
    /// Engine errors, e.g. `SQLITE_BUSY` when another writer holds the lock.
    pub fn transaction_immediate(&self) -> DbResult<Transaction<'_>> {
        Transaction::begin(self, TransactionBehavior::Immediate)
    }

    // ── Metadata ────────────────────────────────────────────────────────

    /// Returns the rowid of the most recent successful INSERT.
    #[must_use]
    pub fn last_insert_rowid(&self) -> i64 {
        unsafe { ffi::sqlite3_last_insert_rowid(self.db) }
    }

    /// Returns the number of rows changed by the most recent statement.
    #[must_use]
    pub fn changes(&self) -> usize {
        usize::try_from(unsafe { ffi::sqlite3_changes(self.db) }).unwrap_or(0)
    }

    // ── Error helpers ───────────────────────────────────────────────────

    fn errmsg(&self) -> String {
        Self::errmsg_raw(self.db)
    }

    fn errmsg_raw(db: *mut c_void) -> String {
        unsafe { ffi::owned_string(ffi::sqlite3_errmsg(db)) }
            .unwrap_or_else(|| "unknown error".to_string())
    }
}

/// Double-quotes an identifier, doubling embedded quotes.
fn quote_identifier(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if !self.db.is_null() {
            let rc = unsafe { ffi::sqlite3_close_v2(self.db) };
            if rc != ffi::SQLITE_OK {
                warn!("closing {} returned {rc}", self.path);
            }
            self.db = std::ptr::null_mut();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::quote_identifier;

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quote_identifier("users"), "\"users\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }
}
