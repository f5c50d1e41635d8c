//! Encrypted `SQLite` access with typed value coercion.
//!
//! `cipherdb` wraps the `SQLite` C API of `sqlite3mc` (SQLite3 Multiple
//! Ciphers) behind safe types and adds a thin typed layer on top:
//!
//! * [`Connection`] opens plain or encrypted databases, prepares statements
//!   and offers one-call `execute`/`query` helpers.
//! * [`Statement`] binds host [`Value`]s and fetches rows. Columns whose
//!   declared type is `DATE`, `TIME`, `DATETIME`, `DECIMAL(p,s)` or
//!   `BOOLEAN` come back as [`Date`], [`Time`], [`DateTime`], [`Decimal`]
//!   and `bool` rather than raw text and numbers.
//! * [`Row`]s come in two shapes, ordered pairs or a map ([`RowShape`]).
//! * [`Server`] owns one connection on a worker thread and serializes
//!   requests from concurrent tasks, with an optional per-request timeout.
//!
//! Every fallible call returns [`DbResult`]. Terse call sites can use
//! [`OrRaise::or_raise`] to panic with the error message instead.
//!
//! The raw symbols are resolved at compile time:
//!
//! * **Native** (`not(wasm32)`): linked against the `sqlite3mc` static library
//!   compiled from the downloaded amalgamation by `build.rs`.
//! * **WASM** (`wasm32`): delegated to `sqlite-wasm-rs` (with the `sqlite3mc`
//!   feature) which ships its own WASM-compiled `sqlite3mc`.
//!
//! The `ffi` module is the **only** file that declares C types; everything
//! else goes through the safe wrappers.
//!
//! ```rust,no_run
//! use cipherdb::{params, Connection, OrRaise, RowShape};
//!
//! let conn = Connection::open_in_memory().or_raise();
//! conn.create_table("t", &[("id", "INTEGER PRIMARY KEY"), ("price", "DECIMAL(3,2)")])
//!     .or_raise();
//! conn.execute("INSERT INTO t (id, price) VALUES (?, ?)", params![1, 1.123])
//!     .or_raise();
//! let rows = conn.query("SELECT * FROM t", &[], RowShape::Map).or_raise();
//! assert_eq!(rows.len(), 1);
//! ```

mod ffi;

pub mod cipher;
pub mod coerce;
pub mod column;
pub mod config;
mod connection;
pub mod decimal;
pub mod error;
pub mod logger;
pub mod row;
#[cfg(not(target_arch = "wasm32"))]
pub mod server;
mod statement;
pub mod temporal;
mod transaction;
pub mod value;

pub use column::{Column, ColumnType};
pub use config::{Config, JournalMode, Key};
pub use connection::Connection;
pub use decimal::Decimal;
pub use error::{DbError, DbResult, ErrorCategory, ErrorCode, OrRaise};
pub use row::{Row, RowShape};
#[cfg(not(target_arch = "wasm32"))]
pub use server::Server;
pub use statement::{Statement, StepResult};
pub use temporal::{Date, DateTime, Time};
pub use transaction::{Transaction, TransactionBehavior};
pub use value::{RawValue, Value};

/// Version string of the linked `sqlite3mc` engine.
#[must_use]
pub fn sqlite_version() -> String {
    ffi::version()
}

#[cfg(test)]
mod tests;
