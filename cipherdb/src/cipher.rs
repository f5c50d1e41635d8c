//! `sqlite3mc` encryption configuration.
//!
//! # Encryption flow
//!
//! `sqlite3mc` (SQLite3 Multiple Ciphers) encrypts every database page at
//! rest. Encryption is transparent to SQL: once a connection is keyed, the
//! pager decrypts on read and encrypts on write.
//!
//! Opening a keyed database runs:
//!
//! 1. **Open** -- `sqlite3_open_v2`. The file is opaque until keyed.
//! 2. **Key** -- `PRAGMA key`. Raw keys are passed hex-encoded as
//!    `x'<hex>'` so no KDF runs; passphrases go through the cipher's KDF.
//! 3. **Verify** -- a read from `sqlite_master`. A wrong key makes the
//!    decrypted header fail the magic check and the engine returns
//!    `SQLITE_NOTADB`, surfaced here with a clearer message.
//! 4. **Configure** -- foreign keys, journal mode, `synchronous=FULL` and
//!    `secure_delete` for keyed databases.
//!
//! The default cipher is ChaCha20-Poly1305, compiled into the amalgamation.

use std::path::Path;

use log::{debug, warn};
use secrecy::ExposeSecret;
use zeroize::Zeroizing;

use crate::config::{Config, JournalMode, Key};
use crate::connection::Connection;
use crate::error::{DbError, DbResult};

/// Opens a database with a raw 32-byte key.
///
/// This is the common open sequence: open -> key -> verify -> configure
/// (WAL, foreign keys, secure delete).
///
/// # Errors
///
/// Engine errors while opening, or a verification failure when the key
/// does not match the file.
pub fn open_encrypted(path: &Path, key: [u8; 32], read_only: bool) -> DbResult<Connection> {
    let key = Zeroizing::new(key);
    Connection::open(Config::file(path).read_only(read_only).key(Key::raw(*key)))
}

/// Applies the key to a freshly opened connection and verifies it.
pub(crate) fn apply_key(conn: &Connection, key: &Key) -> DbResult<()> {
    let pragma = key_pragma("key", key);
    conn.execute_batch_zeroized(&pragma)?;

    conn.execute_batch("SELECT count(*) FROM sqlite_master;")
        .map_err(|e| match e {
            DbError::Engine { code, message } => DbError::Engine {
                code,
                message: format!(
                    "encryption key verification failed (is the key correct?): {message}"
                ),
            },
            other => other,
        })?;
    debug!("cipher key verified");
    Ok(())
}

/// Changes the key of an open, keyed database. An unkeyed database becomes
/// encrypted.
///
/// `sqlite3mc` cannot rekey in WAL mode, so the journal is switched to
/// `DELETE` for the duration and restored afterwards.
///
/// # Errors
///
/// Engine errors from the journal switch or the rekey itself.
pub fn rekey(conn: &Connection, key: &Key) -> DbResult<()> {
    let previous = journal_mode(conn)?;
    let in_wal = previous.eq_ignore_ascii_case("wal");
    if in_wal {
        conn.execute_batch("PRAGMA journal_mode = DELETE;")?;
    }

    let pragma = key_pragma("rekey", key);
    let result = conn.execute_batch_zeroized(&pragma);

    if in_wal {
        if let Err(err) = conn.execute_batch("PRAGMA journal_mode = WAL;") {
            warn!("failed to restore WAL journal after rekey: {err}");
        }
    }
    result?;
    debug!("cipher key changed");
    Ok(())
}

/// Applies connection settings from `config`.
///
/// - `foreign_keys = ON` -- enforces referential integrity.
/// - `journal_mode` -- as configured (skipped for read-only handles).
/// - `synchronous = FULL` -- with WAL, every commit is fsynced.
/// - `secure_delete = ON` -- keyed databases overwrite freed content.
pub(crate) fn configure_connection(conn: &Connection, config: &Config) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    if let Some(mode) = config.journal_mode.filter(|_| !config.read_only) {
        conn.execute_batch(&format!("PRAGMA journal_mode = {};", mode.as_str()))?;
        if mode == JournalMode::Wal {
            conn.execute_batch("PRAGMA synchronous = FULL;")?;
        }
    }
    if config.key.is_some() {
        conn.execute_batch("PRAGMA secure_delete = ON;")?;
    }
    Ok(())
}

/// Runs `PRAGMA integrity_check` and returns whether the database is healthy.
///
/// # Errors
///
/// Engine errors while running the check.
pub fn integrity_check(conn: &Connection) -> DbResult<bool> {
    let result = conn.query_row("PRAGMA integrity_check;", &[], |stmt| {
        Ok(stmt.column_text(0))
    })?;
    Ok(result.trim() == "ok")
}

fn journal_mode(conn: &Connection) -> DbResult<String> {
    conn.query_row("PRAGMA journal_mode;", &[], |stmt| Ok(stmt.column_text(0)))
}

/// Builds `PRAGMA <name> = ...` for the key. Every intermediate copy of the
/// key material is zeroized on drop.
fn key_pragma(name: &str, key: &Key) -> Zeroizing<String> {
    match key {
        Key::Raw(bytes) => {
            let key_hex = Zeroizing::new(hex::encode(bytes.expose_secret()));
            Zeroizing::new(format!("PRAGMA {name} = \"x'{}'\";", key_hex.as_str()))
        }
        Key::Passphrase(passphrase) => {
            let escaped = Zeroizing::new(passphrase.expose_secret().replace('\'', "''"));
            Zeroizing::new(format!("PRAGMA {name} = '{}';", escaped.as_str()))
        }
    }
}
