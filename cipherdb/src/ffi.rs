//! Raw FFI bindings to sqlite3mc, resolved at compile time via `cfg`.
//!
//! On native targets the symbols come from the sqlite3mc static library
//! compiled by `build.rs`. On `wasm32` targets they come from
//! `sqlite-wasm-rs`, which ships its own WASM-compiled sqlite3mc.
//!
//! All handle types are `*mut c_void` so that backend crate types
//! (`sqlite3`, `sqlite3_stmt`) never leak into the safe wrappers.

#![allow(non_camel_case_types, dead_code, unsafe_code)]

use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_void};

// ── Result codes ────────────────────────────────────────────────────────

pub const SQLITE_OK: c_int = 0;
pub const SQLITE_ERROR: c_int = 1;
pub const SQLITE_INTERNAL: c_int = 2;
pub const SQLITE_PERM: c_int = 3;
pub const SQLITE_ABORT: c_int = 4;
pub const SQLITE_BUSY: c_int = 5;
pub const SQLITE_LOCKED: c_int = 6;
pub const SQLITE_NOMEM: c_int = 7;
pub const SQLITE_READONLY: c_int = 8;
pub const SQLITE_INTERRUPT: c_int = 9;
pub const SQLITE_IOERR: c_int = 10;
pub const SQLITE_CORRUPT: c_int = 11;
pub const SQLITE_NOTFOUND: c_int = 12;
pub const SQLITE_FULL: c_int = 13;
pub const SQLITE_CANTOPEN: c_int = 14;
pub const SQLITE_SCHEMA: c_int = 17;
pub const SQLITE_TOOBIG: c_int = 18;
pub const SQLITE_CONSTRAINT: c_int = 19;
pub const SQLITE_MISMATCH: c_int = 20;
pub const SQLITE_MISUSE: c_int = 21;
pub const SQLITE_AUTH: c_int = 23;
pub const SQLITE_RANGE: c_int = 25;
pub const SQLITE_NOTADB: c_int = 26;
pub const SQLITE_ROW: c_int = 100;
pub const SQLITE_DONE: c_int = 101;

// Column storage classes
pub const SQLITE_INTEGER: c_int = 1;
pub const SQLITE_FLOAT: c_int = 2;
pub const SQLITE_TEXT: c_int = 3;
pub const SQLITE_BLOB: c_int = 4;
pub const SQLITE_NULL: c_int = 5;

// Open flags
pub const SQLITE_OPEN_READONLY: c_int = 0x0000_0001;
pub const SQLITE_OPEN_READWRITE: c_int = 0x0000_0002;
pub const SQLITE_OPEN_CREATE: c_int = 0x0000_0004;
pub const SQLITE_OPEN_URI: c_int = 0x0000_0040;
pub const SQLITE_OPEN_FULLMUTEX: c_int = 0x0001_0000;

// Destructor sentinel (transient = -1 means SQLite copies the data)
pub const SQLITE_TRANSIENT: isize = -1;

// ── Native backend ──────────────────────────────────────────────────────

#[cfg(not(target_arch = "wasm32"))]
mod imp {
    use super::*;

    type sqlite3 = c_void;
    type sqlite3_stmt = c_void;

    extern "C" {
        // Connection lifecycle
        pub fn sqlite3_open_v2(
            filename: *const c_char,
            pp_db: *mut *mut sqlite3,
            flags: c_int,
            z_vfs: *const c_char,
        ) -> c_int;

        pub fn sqlite3_close(db: *mut sqlite3) -> c_int;
        pub fn sqlite3_close_v2(db: *mut sqlite3) -> c_int;

        pub fn sqlite3_busy_timeout(db: *mut sqlite3, ms: c_int) -> c_int;

        // Execution
        pub fn sqlite3_exec(
            db: *mut sqlite3,
            sql: *const c_char,
            callback: *const c_void,
            arg: *mut c_void,
            errmsg: *mut *mut c_char,
        ) -> c_int;

        pub fn sqlite3_free(ptr: *mut c_void);

        // Prepared statements
        pub fn sqlite3_prepare_v2(
            db: *mut sqlite3,
            z_sql: *const c_char,
            n_byte: c_int,
            pp_stmt: *mut *mut sqlite3_stmt,
            pz_tail: *mut *const c_char,
        ) -> c_int;

        pub fn sqlite3_step(stmt: *mut sqlite3_stmt) -> c_int;
        pub fn sqlite3_reset(stmt: *mut sqlite3_stmt) -> c_int;
        pub fn sqlite3_clear_bindings(stmt: *mut sqlite3_stmt) -> c_int;
        pub fn sqlite3_finalize(stmt: *mut sqlite3_stmt) -> c_int;

        // Parameter binding
        pub fn sqlite3_bind_int64(stmt: *mut sqlite3_stmt, index: c_int, value: i64) -> c_int;

        pub fn sqlite3_bind_double(stmt: *mut sqlite3_stmt, index: c_int, value: f64) -> c_int;

        pub fn sqlite3_bind_blob(
            stmt: *mut sqlite3_stmt,
            index: c_int,
            value: *const c_void,
            n: c_int,
            destructor: isize,
        ) -> c_int;

        pub fn sqlite3_bind_text(
            stmt: *mut sqlite3_stmt,
            index: c_int,
            value: *const c_char,
            n: c_int,
            destructor: isize,
        ) -> c_int;

        pub fn sqlite3_bind_null(stmt: *mut sqlite3_stmt, index: c_int) -> c_int;

        pub fn sqlite3_bind_parameter_count(stmt: *mut sqlite3_stmt) -> c_int;

        // Column metadata
        pub fn sqlite3_column_count(stmt: *mut sqlite3_stmt) -> c_int;
        pub fn sqlite3_column_name(stmt: *mut sqlite3_stmt, i_col: c_int) -> *const c_char;
        pub fn sqlite3_column_decltype(stmt: *mut sqlite3_stmt, i_col: c_int) -> *const c_char;

        // Column reading
        pub fn sqlite3_column_type(stmt: *mut sqlite3_stmt, i_col: c_int) -> c_int;
        pub fn sqlite3_column_int64(stmt: *mut sqlite3_stmt, i_col: c_int) -> i64;
        pub fn sqlite3_column_double(stmt: *mut sqlite3_stmt, i_col: c_int) -> f64;
        pub fn sqlite3_column_blob(stmt: *mut sqlite3_stmt, i_col: c_int) -> *const c_void;
        pub fn sqlite3_column_text(stmt: *mut sqlite3_stmt, i_col: c_int) -> *const c_char;
        pub fn sqlite3_column_bytes(stmt: *mut sqlite3_stmt, i_col: c_int) -> c_int;

        // Error reporting
        pub fn sqlite3_errmsg(db: *mut sqlite3) -> *const c_char;
        pub fn sqlite3_errcode(db: *mut sqlite3) -> c_int;
        pub fn sqlite3_errstr(code: c_int) -> *const c_char;

        // Changes
        pub fn sqlite3_changes(db: *mut sqlite3) -> c_int;
        pub fn sqlite3_last_insert_rowid(db: *mut sqlite3) -> i64;

        // Version
        pub fn sqlite3_libversion() -> *const c_char;
    }
}

// ── WASM backend ────────────────────────────────────────────────────────

#[cfg(target_arch = "wasm32")]
mod imp {
    //! Thin wrappers around `sqlite_wasm_rs` that normalise pointer types
    //! to `*mut c_void` so callers are backend-agnostic.

    use super::*;

    use sqlite_wasm_rs as wasm;

    // ── Connection lifecycle ────────────────────────────────────────────

    pub unsafe fn sqlite3_open_v2(
        filename: *const c_char,
        pp_db: *mut *mut c_void,
        flags: c_int,
        z_vfs: *const c_char,
    ) -> c_int {
        let pp = pp_db.cast::<*mut wasm::sqlite3>();
        wasm::sqlite3_open_v2(filename.cast(), pp, flags, z_vfs.cast())
    }

    pub unsafe fn sqlite3_close(db: *mut c_void) -> c_int {
        wasm::sqlite3_close(db.cast())
    }

    pub unsafe fn sqlite3_close_v2(db: *mut c_void) -> c_int {
        wasm::sqlite3_close_v2(db.cast())
    }

    pub unsafe fn sqlite3_busy_timeout(db: *mut c_void, ms: c_int) -> c_int {
        wasm::sqlite3_busy_timeout(db.cast(), ms)
    }

    pub unsafe fn sqlite3_exec(
        db: *mut c_void,
        sql: *const c_char,
        callback: *const c_void,
        arg: *mut c_void,
        errmsg: *mut *mut c_char,
    ) -> c_int {
        wasm::sqlite3_exec(
            db.cast(),
            sql.cast(),
            std::mem::transmute(callback),
            arg,
            errmsg.cast(),
        )
    }

    pub unsafe fn sqlite3_free(ptr: *mut c_void) {
        wasm::sqlite3_free(ptr);
    }

    // ── Prepared statements ─────────────────────────────────────────────

    pub unsafe fn sqlite3_prepare_v2(
        db: *mut c_void,
        z_sql: *const c_char,
        n_byte: c_int,
        pp_stmt: *mut *mut c_void,
        pz_tail: *mut *const c_char,
    ) -> c_int {
        let pp = pp_stmt.cast::<*mut wasm::sqlite3_stmt>();
        wasm::sqlite3_prepare_v2(db.cast(), z_sql.cast(), n_byte, pp, pz_tail.cast())
    }

    pub unsafe fn sqlite3_step(stmt: *mut c_void) -> c_int {
        wasm::sqlite3_step(stmt.cast())
    }

    pub unsafe fn sqlite3_reset(stmt: *mut c_void) -> c_int {
        wasm::sqlite3_reset(stmt.cast())
    }

    pub unsafe fn sqlite3_clear_bindings(stmt: *mut c_void) -> c_int {
        wasm::sqlite3_clear_bindings(stmt.cast())
    }

    pub unsafe fn sqlite3_finalize(stmt: *mut c_void) -> c_int {
        wasm::sqlite3_finalize(stmt.cast())
    }

    // ── Parameter binding ───────────────────────────────────────────────

    pub unsafe fn sqlite3_bind_int64(stmt: *mut c_void, index: c_int, value: i64) -> c_int {
        wasm::sqlite3_bind_int64(stmt.cast(), index, value)
    }

    pub unsafe fn sqlite3_bind_double(stmt: *mut c_void, index: c_int, value: f64) -> c_int {
        wasm::sqlite3_bind_double(stmt.cast(), index, value)
    }

    pub unsafe fn sqlite3_bind_blob(
        stmt: *mut c_void,
        index: c_int,
        value: *const c_void,
        n: c_int,
        destructor: isize,
    ) -> c_int {
        wasm::sqlite3_bind_blob(stmt.cast(), index, value, n, destructor)
    }

    pub unsafe fn sqlite3_bind_text(
        stmt: *mut c_void,
        index: c_int,
        value: *const c_char,
        n: c_int,
        destructor: isize,
    ) -> c_int {
        wasm::sqlite3_bind_text(stmt.cast(), index, value.cast(), n, destructor)
    }

    pub unsafe fn sqlite3_bind_null(stmt: *mut c_void, index: c_int) -> c_int {
        wasm::sqlite3_bind_null(stmt.cast(), index)
    }

    pub unsafe fn sqlite3_bind_parameter_count(stmt: *mut c_void) -> c_int {
        wasm::sqlite3_bind_parameter_count(stmt.cast())
    }

    // ── Column metadata ─────────────────────────────────────────────────

    pub unsafe fn sqlite3_column_count(stmt: *mut c_void) -> c_int {
        wasm::sqlite3_column_count(stmt.cast())
    }

    pub unsafe fn sqlite3_column_name(stmt: *mut c_void, i_col: c_int) -> *const c_char {
        wasm::sqlite3_column_name(stmt.cast(), i_col).cast()
    }

    pub unsafe fn sqlite3_column_decltype(stmt: *mut c_void, i_col: c_int) -> *const c_char {
        wasm::sqlite3_column_decltype(stmt.cast(), i_col).cast()
    }

    // ── Column reading ──────────────────────────────────────────────────

    pub unsafe fn sqlite3_column_type(stmt: *mut c_void, i_col: c_int) -> c_int {
        wasm::sqlite3_column_type(stmt.cast(), i_col)
    }

    pub unsafe fn sqlite3_column_int64(stmt: *mut c_void, i_col: c_int) -> i64 {
        wasm::sqlite3_column_int64(stmt.cast(), i_col)
    }

    pub unsafe fn sqlite3_column_double(stmt: *mut c_void, i_col: c_int) -> f64 {
        wasm::sqlite3_column_double(stmt.cast(), i_col)
    }

    pub unsafe fn sqlite3_column_blob(stmt: *mut c_void, i_col: c_int) -> *const c_void {
        wasm::sqlite3_column_blob(stmt.cast(), i_col)
    }

    pub unsafe fn sqlite3_column_text(stmt: *mut c_void, i_col: c_int) -> *const c_char {
        wasm::sqlite3_column_text(stmt.cast(), i_col).cast()
    }

    pub unsafe fn sqlite3_column_bytes(stmt: *mut c_void, i_col: c_int) -> c_int {
        wasm::sqlite3_column_bytes(stmt.cast(), i_col)
    }

    // ── Error reporting ─────────────────────────────────────────────────

    pub unsafe fn sqlite3_errmsg(db: *mut c_void) -> *const c_char {
        wasm::sqlite3_errmsg(db.cast()).cast()
    }

    pub unsafe fn sqlite3_errcode(db: *mut c_void) -> c_int {
        wasm::sqlite3_errcode(db.cast())
    }

    pub unsafe fn sqlite3_errstr(code: c_int) -> *const c_char {
        wasm::sqlite3_errstr(code).cast()
    }

    // ── Changes ─────────────────────────────────────────────────────────

    pub unsafe fn sqlite3_changes(db: *mut c_void) -> c_int {
        wasm::sqlite3_changes(db.cast())
    }

    pub unsafe fn sqlite3_last_insert_rowid(db: *mut c_void) -> i64 {
        wasm::sqlite3_last_insert_rowid(db.cast())
    }

    // ── Version ─────────────────────────────────────────────────────────

    pub unsafe fn sqlite3_libversion() -> *const c_char {
        wasm::sqlite3_libversion().cast()
    }
}

pub use imp::*;

// ── Safe helpers ────────────────────────────────────────────────────────

/// Copies a possibly-null C string owned by SQLite into a Rust `String`.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that stays valid
/// for the duration of the call.
pub unsafe fn owned_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }
}

/// Returns the English description SQLite gives for a result code.
pub fn error_string(code: c_int) -> String {
    unsafe { owned_string(sqlite3_errstr(code)) }.unwrap_or_else(|| "unknown error".to_string())
}

/// Returns the linked SQLite library version, e.g. `"3.51.2"`.
pub fn version() -> String {
    unsafe { owned_string(sqlite3_libversion()) }.unwrap_or_else(|| "unknown".to_string())
}
