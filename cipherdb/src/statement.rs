//! Safe wrapper around a prepared statement.

use std::marker::PhantomData;
use std::os::raw::{c_int, c_void};

use log::trace;

use crate::coerce;
use crate::column::{Column, ColumnType};
use crate::connection::Connection;
use crate::error::{DbError, DbResult};
use crate::ffi;
use crate::row::{self, Row, RowShape};
use crate::value::{RawValue, Value};

/// Result of a single `sqlite3_step` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// A result row is available (`SQLITE_ROW`).
    Row,
    /// The statement has finished executing (`SQLITE_DONE`).
    Done,
}

/// A prepared statement.
///
/// Created via [`Connection::prepare`] and finalized when dropped. Column
/// descriptors are read once at preparation and stay fixed across
/// rebinding and re-execution.
pub struct Statement<'conn> {
    /// Raw `sqlite3_stmt*` handle.
    stmt: *mut c_void,
    /// Raw `sqlite3*` handle, kept for error messages and change counts.
    db: *mut c_void,
    columns: Vec<Column>,
    _conn: PhantomData<&'conn Connection>,
}

impl<'conn> Statement<'conn> {
    /// Wraps a raw statement and captures its column descriptors.
    ///
    /// # Safety
    ///
    /// `stmt` must be a valid, non-null `sqlite3_stmt*` prepared on `db`,
    /// and `db` must outlive `'conn`.
    pub(crate) unsafe fn from_raw(stmt: *mut c_void, db: *mut c_void) -> Self {
        debug_assert!(!stmt.is_null());
        let count = ffi::sqlite3_column_count(stmt);
        let columns = (0..count)
            .map(|i| {
                let name = ffi::owned_string(ffi::sqlite3_column_name(stmt, i))
                    .unwrap_or_else(|| format!("column{i}"));
                let decl = ffi::owned_string(ffi::sqlite3_column_decltype(stmt, i));
                Column::new(name, decl.as_deref())
            })
            .collect();
        Self {
            stmt,
            db,
            columns,
            _conn: PhantomData,
        }
    }

    // ── Metadata ────────────────────────────────────────────────────────

    /// Result column descriptors.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Result column names, in order.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    /// Result column coercion categories, in order.
    #[must_use]
    pub fn column_types(&self) -> Vec<&ColumnType> {
        self.columns.iter().map(Column::kind).collect()
    }

    /// Number of result columns.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Number of `?` parameters the statement expects.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        let count = unsafe { ffi::sqlite3_bind_parameter_count(self.stmt) };
        usize::try_from(count).unwrap_or(0)
    }

    // ── Binding ─────────────────────────────────────────────────────────

    /// Binds `values` to the parameters (1-indexed) after coercing each one.
    ///
    /// The statement is reset and earlier bindings are cleared first, so a
    /// statement can be re-bound after it has been stepped.
    ///
    /// # Errors
    ///
    /// `SQLITE_RANGE` if the number of values differs from the parameter
    /// count; otherwise any engine bind error.
    pub fn bind(&mut self, values: &[Value]) -> DbResult<()> {
        let expected = self.parameter_count();
        if values.len() != expected {
            return Err(DbError::new(
                ffi::SQLITE_RANGE,
                format!("expected {expected} parameters, got {}", values.len()),
            ));
        }
        // The reset code repeats the last step's error, which is irrelevant
        // to a fresh binding.
        unsafe {
            ffi::sqlite3_reset(self.stmt);
            ffi::sqlite3_clear_bindings(self.stmt);
        }
        trace!("binding {} parameters", values.len());
        for (i, value) in values.iter().enumerate() {
            let idx = c_int::try_from(i + 1)
                .map_err(|_| DbError::new(ffi::SQLITE_RANGE, "parameter index overflow"))?;
            self.bind_raw(idx, &coerce::encode(value))?;
        }
        Ok(())
    }

    fn bind_raw(&self, idx: c_int, raw: &RawValue) -> DbResult<()> {
        let rc = match raw {
            RawValue::Integer(v) => unsafe { ffi::sqlite3_bind_int64(self.stmt, idx, *v) },
            RawValue::Float(v) => unsafe { ffi::sqlite3_bind_double(self.stmt, idx, *v) },
            RawValue::Text(v) => {
                let len = byte_len(v.as_bytes())?;
                unsafe {
                    ffi::sqlite3_bind_text(
                        self.stmt,
                        idx,
                        v.as_ptr().cast(),
                        len,
                        ffi::SQLITE_TRANSIENT,
                    )
                }
            }
            RawValue::Blob(v) => {
                let len = byte_len(v)?;
                unsafe {
                    ffi::sqlite3_bind_blob(
                        self.stmt,
                        idx,
                        v.as_ptr().cast(),
                        len,
                        ffi::SQLITE_TRANSIENT,
                    )
                }
            }
            RawValue::Null => unsafe { ffi::sqlite3_bind_null(self.stmt, idx) },
        };
        if rc != ffi::SQLITE_OK {
            return Err(self.last_error(rc));
        }
        Ok(())
    }

    // ── Stepping ────────────────────────────────────────────────────────

    /// Executes a single step.
    ///
    /// # Errors
    ///
    /// Any engine error raised while stepping.
    pub fn step(&mut self) -> DbResult<StepResult> {
        let rc = unsafe { ffi::sqlite3_step(self.stmt) };
        match rc {
            ffi::SQLITE_ROW => Ok(StepResult::Row),
            ffi::SQLITE_DONE => Ok(StepResult::Done),
            _ => Err(self.last_error(rc)),
        }
    }

    /// Resets the statement so it can be stepped again. Bindings are kept.
    ///
    /// # Errors
    ///
    /// The error of the most recent failed step, as reported by the engine.
    pub fn reset(&mut self) -> DbResult<()> {
        let rc = unsafe { ffi::sqlite3_reset(self.stmt) };
        if rc != ffi::SQLITE_OK {
            return Err(self.last_error(rc));
        }
        Ok(())
    }

    /// Runs a statement that produces no rows to completion.
    ///
    /// Returns the number of rows changed.
    ///
    /// # Errors
    ///
    /// Any engine error raised while stepping.
    pub fn execute(&mut self) -> DbResult<usize> {
        while self.step()? == StepResult::Row {}
        Ok(self.changes())
    }

    // ── Fetching ────────────────────────────────────────────────────────

    /// Steps to completion and returns every row, coerced and shaped.
    ///
    /// # Errors
    ///
    /// Engine errors while stepping, or a column coercion failure.
    pub fn fetch_all(&mut self, shape: RowShape) -> DbResult<Vec<Row>> {
        let mut raw_rows = Vec::new();
        while self.step()? == StepResult::Row {
            raw_rows.push(self.read_raw_row());
        }
        trace!("fetched {} rows", raw_rows.len());
        row::materialize(&self.columns, raw_rows, shape)
    }

    /// Steps once and returns the row, or `None` when the statement is done.
    ///
    /// # Errors
    ///
    /// Engine errors while stepping, or a column coercion failure.
    pub fn fetch_one(&mut self, shape: RowShape) -> DbResult<Option<Row>> {
        match self.step()? {
            StepResult::Row => Row::from_raw(&self.columns, self.read_raw_row(), shape).map(Some),
            StepResult::Done => Ok(None),
        }
    }

    /// Reads every column of the current row in its storage class.
    #[must_use]
    pub fn read_raw_row(&self) -> Vec<RawValue> {
        (0..self.columns.len()).map(|i| self.column_raw(i)).collect()
    }

    // ── Column reading ──────────────────────────────────────────────────

    /// Reads a column of the current row in its storage class.
    #[must_use]
    pub fn column_raw(&self, idx: usize) -> RawValue {
        match self.column_type(idx) {
            ffi::SQLITE_INTEGER => RawValue::Integer(self.column_i64(idx)),
            ffi::SQLITE_FLOAT => RawValue::Float(self.column_f64(idx)),
            ffi::SQLITE_TEXT => RawValue::Text(self.column_text(idx)),
            ffi::SQLITE_BLOB => RawValue::Blob(self.column_blob(idx)),
            _ => RawValue::Null,
        }
    }

    /// Reads a column as `i64`.
    #[must_use]
    pub fn column_i64(&self, idx: usize) -> i64 {
        unsafe { ffi::sqlite3_column_int64(self.stmt, col(idx)) }
    }

    /// Reads a column as `f64`.
    #[must_use]
    pub fn column_f64(&self, idx: usize) -> f64 {
        unsafe { ffi::sqlite3_column_double(self.stmt, col(idx)) }
    }

    /// Reads a column as a blob. Returns an empty `Vec` for NULL.
    #[must_use]
    pub fn column_blob(&self, idx: usize) -> Vec<u8> {
        unsafe {
            let ptr = ffi::sqlite3_column_blob(self.stmt, col(idx));
            let len = ffi::sqlite3_column_bytes(self.stmt, col(idx));
            match usize::try_from(len) {
                Ok(len) if !ptr.is_null() && len > 0 => {
                    std::slice::from_raw_parts(ptr.cast::<u8>(), len).to_vec()
                }
                _ => Vec::new(),
            }
        }
    }

    /// Reads a column as UTF-8 text. Returns an empty string for NULL.
    #[must_use]
    pub fn column_text(&self, idx: usize) -> String {
        unsafe {
            // Text pointer first, then byte count, as the engine documents.
            let ptr = ffi::sqlite3_column_text(self.stmt, col(idx));
            let len = ffi::sqlite3_column_bytes(self.stmt, col(idx));
            match usize::try_from(len) {
                Ok(len) if !ptr.is_null() => {
                    let bytes = std::slice::from_raw_parts(ptr.cast::<u8>(), len);
                    String::from_utf8_lossy(bytes).into_owned()
                }
                _ => String::new(),
            }
        }
    }

    /// Returns the storage class of column `idx` in the current row.
    #[must_use]
    pub fn column_type(&self, idx: usize) -> c_int {
        unsafe { ffi::sqlite3_column_type(self.stmt, col(idx)) }
    }

    /// Returns `true` if the column is SQL NULL.
    #[must_use]
    pub fn is_column_null(&self, idx: usize) -> bool {
        self.column_type(idx) == ffi::SQLITE_NULL
    }

    // ── Helpers ─────────────────────────────────────────────────────────

    fn changes(&self) -> usize {
        usize::try_from(unsafe { ffi::sqlite3_changes(self.db) }).unwrap_or(0)
    }

    fn last_error(&self, code: c_int) -> DbError {
        let message = unsafe { ffi::owned_string(ffi::sqlite3_errmsg(self.db)) }
            .unwrap_or_else(|| ffi::error_string(code));
        DbError::new(code, message)
    }
}

/// Column indexes beyond `c_int` cannot exist; SQLite caps columns at 32767.
fn col(idx: usize) -> c_int {
    c_int::try_from(idx).unwrap_or(c_int::MAX)
}

fn byte_len(bytes: &[u8]) -> DbResult<c_int> {
    c_int::try_from(bytes.len()).map_err(|_| DbError::new(ffi::SQLITE_TOOBIG, "value too large"))
}

impl std::fmt::Debug for Statement<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("columns", &self.columns)
            .finish_non_exhaustive()
    }
}

impl Drop for Statement<'_> {
    fn drop(&mut self) {
        if !self.stmt.is_null() {
            unsafe {
                ffi::sqlite3_finalize(self.stmt);
            }
            self.stmt = std::ptr::null_mut();
        }
    }
}
