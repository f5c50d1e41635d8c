//! Connection configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{SecretBox, SecretString};

/// Path that opens a private in-memory database.
pub const MEMORY_PATH: &str = ":memory:";

/// Default time the engine retries a locked database before `SQLITE_BUSY`.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Cipher key material for `sqlite3mc`.
#[derive(Debug)]
pub enum Key {
    /// 32 raw key bytes, passed as `x'<hex>'` so no KDF runs.
    Raw(SecretBox<[u8; 32]>),
    /// A passphrase, stretched by the cipher's configured KDF.
    Passphrase(SecretString),
}

impl Key {
    /// Wraps raw key bytes.
    #[must_use]
    pub fn raw(bytes: [u8; 32]) -> Self {
        Self::Raw(SecretBox::new(Box::new(bytes)))
    }

    /// Wraps a passphrase.
    #[must_use]
    pub fn passphrase(passphrase: impl Into<String>) -> Self {
        Self::Passphrase(SecretString::from(passphrase.into()))
    }
}

/// SQLite journal mode applied after opening.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalMode {
    /// Rollback journal deleted at commit.
    Delete,
    /// Write-ahead log; readers proceed during writes.
    Wal,
    /// Journal kept in memory.
    Memory,
}

impl JournalMode {
    /// The PRAGMA keyword.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Delete => "DELETE",
            Self::Wal => "WAL",
            Self::Memory => "MEMORY",
        }
    }
}

/// How to open a [`Connection`](crate::Connection).
#[derive(Debug)]
pub struct Config {
    /// Database file, or [`MEMORY_PATH`].
    pub path: PathBuf,
    /// Open without write access; the file must exist.
    pub read_only: bool,
    /// Busy-handler timeout.
    pub busy_timeout: Duration,
    /// Cipher key; `None` opens an unencrypted database.
    pub key: Option<Key>,
    /// Journal mode to switch to; `None` keeps the engine default.
    pub journal_mode: Option<JournalMode>,
}

impl Default for Config {
    fn default() -> Self {
        Self::memory()
    }
}

impl Config {
    /// A file database with WAL journaling.
    #[must_use]
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            read_only: false,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            key: None,
            journal_mode: Some(JournalMode::Wal),
        }
    }

    /// A private in-memory database.
    #[must_use]
    pub fn memory() -> Self {
        Self {
            path: PathBuf::from(MEMORY_PATH),
            read_only: false,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            key: None,
            journal_mode: None,
        }
    }

    /// Sets read-only access.
    #[must_use]
    pub const fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Sets the busy timeout.
    #[must_use]
    pub const fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Sets the cipher key.
    #[must_use]
    pub fn key(mut self, key: Key) -> Self {
        self.key = Some(key);
        self
    }

    /// Sets the journal mode.
    #[must_use]
    pub const fn journal_mode(mut self, mode: Option<JournalMode>) -> Self {
        self.journal_mode = mode;
        self
    }

    /// `true` when the path names an in-memory database.
    #[must_use]
    pub fn is_memory(&self) -> bool {
        self.path.as_os_str() == MEMORY_PATH
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_is_default() {
        let config = Config::default();
        assert!(config.is_memory());
        assert_eq!(config.journal_mode, None);
        assert_eq!(config.busy_timeout, DEFAULT_BUSY_TIMEOUT);
    }

    #[test]
    fn builder_sets_fields() {
        let config = Config::file("/tmp/x.db")
            .read_only(true)
            .busy_timeout(Duration::from_millis(250))
            .key(Key::passphrase("hunter2"));
        assert!(!config.is_memory());
        assert!(config.read_only);
        assert_eq!(config.journal_mode, Some(JournalMode::Wal));
        assert!(matches!(config.key, Some(Key::Passphrase(_))));
    }

    #[test]
    fn key_debug_is_redacted() {
        let rendered = format!("{:?}", Key::passphrase("hunter2"));
        assert!(!rendered.contains("hunter2"));
    }
}
