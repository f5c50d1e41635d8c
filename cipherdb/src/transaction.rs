//! Scoped transactions.

use log::warn;

use crate::connection::Connection;
use crate::error::DbResult;
use crate::row::{Row, RowShape};
use crate::statement::Statement;
use crate::value::Value;

/// Locking behaviour of `BEGIN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionBehavior {
    /// `BEGIN DEFERRED`: locks are taken on first access.
    #[default]
    Deferred,
    /// `BEGIN IMMEDIATE`: acquires a RESERVED lock immediately.
    Immediate,
}

impl TransactionBehavior {
    const fn begin_sql(self) -> &'static str {
        match self {
            Self::Deferred => "BEGIN DEFERRED;",
            Self::Immediate => "BEGIN IMMEDIATE;",
        }
    }
}

/// An open transaction.
///
/// Rolls back on drop unless [`commit`](Self::commit) or
/// [`rollback`](Self::rollback) consumed it.
pub struct Transaction<'conn> {
    conn: &'conn Connection,
    finished: bool,
}

impl<'conn> Transaction<'conn> {
    pub(crate) fn begin(conn: &'conn Connection, behavior: TransactionBehavior) -> DbResult<Self> {
        conn.execute_batch(behavior.begin_sql())?;
        Ok(Self {
            conn,
            finished: false,
        })
    }

    /// Commits the transaction.
    ///
    /// # Errors
    ///
    /// Engine errors from `COMMIT`, e.g. a deferred constraint failure. The
    /// transaction is then rolled back on drop.
    pub fn commit(mut self) -> DbResult<()> {
        self.conn.execute_batch("COMMIT;")?;
        self.finished = true;
        Ok(())
    }

    /// Rolls the transaction back.
    ///
    /// # Errors
    ///
    /// Engine errors from `ROLLBACK`.
    pub fn rollback(mut self) -> DbResult<()> {
        self.finished = true;
        self.conn.execute_batch("ROLLBACK;")
    }

    // ── Delegated Connection methods ────────────────────────────────────

    /// See [`Connection::execute_batch`].
    ///
    /// # Errors
    ///
    /// As for the connection.
    pub fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.conn.execute_batch(sql)
    }

    /// See [`Connection::execute`].
    ///
    /// # Errors
    ///
    /// As for the connection.
    pub fn execute(&self, sql: &str, params: &[Value]) -> DbResult<usize> {
        self.conn.execute(sql, params)
    }

    /// See [`Connection::query`].
    ///
    /// # Errors
    ///
    /// As for the connection.
    pub fn query(&self, sql: &str, params: &[Value], shape: RowShape) -> DbResult<Vec<Row>> {
        self.conn.query(sql, params, shape)
    }

    /// See [`Connection::query_row`].
    ///
    /// # Errors
    ///
    /// As for the connection.
    pub fn query_row<T>(
        &self,
        sql: &str,
        params: &[Value],
        mapper: impl FnOnce(&Statement<'_>) -> DbResult<T>,
    ) -> DbResult<T> {
        self.conn.query_row(sql, params, mapper)
    }

    /// See [`Connection::query_row_optional`].
    ///
    /// # Errors
    ///
    /// As for the connection.
    pub fn query_row_optional<T>(
        &self,
        sql: &str,
        params: &[Value],
        mapper: impl FnOnce(&Statement<'_>) -> DbResult<T>,
    ) -> DbResult<Option<T>> {
        self.conn.query_row_optional(sql, params, mapper)
    }

    /// See [`Connection::prepare`].
    ///
    /// # Errors
    ///
    /// As for the connection.
    pub fn prepare(&self, sql: &str) -> DbResult<Statement<'conn>> {
        self.conn.prepare(sql)
    }

    /// See [`Connection::last_insert_rowid`].
    #[must_use]
    pub fn last_insert_rowid(&self) -> i64 {
        self.conn.last_insert_rowid()
    }

    /// See [`Connection::changes`].
    #[must_use]
    pub fn changes(&self) -> usize {
        self.conn.changes()
    }
}

impl std::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(err) = self.conn.execute_batch("ROLLBACK;") {
                warn!("rollback on drop failed: {err}");
            }
        }
    }
}
