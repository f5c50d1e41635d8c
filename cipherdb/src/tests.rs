//! Unit tests for the connection, statement and cipher wrappers.

use super::*;

fn temp_db_path(dir: &tempfile::TempDir) -> std::path::PathBuf {
    dir.path().join("cipherdb-test.sqlite")
}

#[test]
fn test_open_in_memory() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, val TEXT);")
        .expect("create table");
    conn.execute(
        "INSERT INTO t (id, val) VALUES (?1, ?2)",
        params![1_i64, "hello"],
    )
    .expect("insert");
    let result = conn
        .query_row("SELECT val FROM t WHERE id = ?1", params![1_i64], |stmt| {
            Ok(stmt.column_text(0))
        })
        .expect("query");
    assert_eq!(result, "hello");
}

#[test]
fn test_query_row_optional_none() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY);")
        .expect("create table");
    let result = conn
        .query_row_optional("SELECT id FROM t WHERE id = 999", &[], |stmt| {
            Ok(stmt.column_i64(0))
        })
        .expect("query");
    assert!(result.is_none());

    let err = conn
        .query_row("SELECT id FROM t WHERE id = 999", &[], |stmt| Ok(stmt.column_i64(0)))
        .expect_err("no row");
    assert_eq!(err.category(), Some(ErrorCategory::NoRows));
}

#[test]
fn test_transaction_commit() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY);")
        .expect("create table");
    {
        let tx = conn.transaction().expect("begin tx");
        tx.execute("INSERT INTO t (id) VALUES (?1)", params![42_i64])
            .expect("insert");
        assert_eq!(tx.last_insert_rowid(), 42);
        tx.commit().expect("commit");
    }
    let result = conn
        .query_row("SELECT id FROM t WHERE id = 42", &[], |stmt| {
            Ok(stmt.column_i64(0))
        })
        .expect("query");
    assert_eq!(result, 42);
}

#[test]
fn test_transaction_rollback_on_drop() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY);")
        .expect("create table");
    {
        let tx = conn.transaction_immediate().expect("begin tx");
        tx.execute("INSERT INTO t (id) VALUES (?1)", params![99_i64])
            .expect("insert");
        // Dropped without commit.
    }
    let result = conn
        .query_row_optional("SELECT id FROM t WHERE id = 99", &[], |stmt| {
            Ok(stmt.column_i64(0))
        })
        .expect("query");
    assert!(result.is_none());
}

#[test]
fn test_transaction_explicit_rollback() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY);")
        .expect("create table");
    let tx = conn.transaction().expect("begin tx");
    tx.execute("INSERT INTO t (id) VALUES (1)", &[]).expect("insert");
    tx.rollback().expect("rollback");

    let rows = conn.query("SELECT id FROM t", &[], RowShape::Pairs).expect("query");
    assert!(rows.is_empty());
    // A new transaction can start, so the old one is really closed.
    conn.transaction().expect("begin again").commit().expect("commit");
}

#[test]
fn test_blob_round_trip() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, data BLOB);")
        .expect("create table");
    let data = vec![0xDE, 0xAD, 0xBE, 0xEF];
    conn.execute(
        "INSERT INTO t (id, data) VALUES (?1, ?2)",
        params![1_i64, data.as_slice()],
    )
    .expect("insert");
    let rows = conn
        .query("SELECT data FROM t WHERE id = 1", &[], RowShape::Pairs)
        .expect("query");
    assert_eq!(rows[0].get("data"), Some(&Value::Blob(data)));
}

#[test]
fn test_null_handling() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, val TEXT, born DATE);")
        .expect("create table");
    conn.execute(
        "INSERT INTO t (id, val, born) VALUES (?1, ?2, ?3)",
        params![1_i64, Value::Null, None::<Date>],
    )
    .expect("insert");
    let result = conn
        .query_row("SELECT val FROM t WHERE id = 1", &[], |stmt| {
            Ok(stmt.is_column_null(0))
        })
        .expect("query");
    assert!(result);

    let rows = conn.query("SELECT born FROM t", &[], RowShape::Map).expect("query");
    assert_eq!(rows[0].get("born"), Some(&Value::Null));
}

#[test]
fn test_bind_arity_mismatch() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let err = conn
        .execute("SELECT ?1, ?2", params![1_i64])
        .expect_err("arity");
    assert_eq!(err.category(), Some(ErrorCategory::Binding));
}

#[test]
fn test_engine_error_is_surfaced_unchanged() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let err = conn
        .query("SELECT * FROM missing", &[], RowShape::Pairs)
        .expect_err("missing table");
    assert_eq!(err.code(), Some(ErrorCode(1)));
    assert!(err.to_string().contains("no such table: missing"));
}

#[test]
fn test_constraint_category() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY);")
        .expect("create table");
    conn.execute("INSERT INTO t (id) VALUES (1)", &[]).expect("insert");
    let err = conn
        .execute("INSERT INTO t (id) VALUES (1)", &[])
        .expect_err("duplicate");
    assert_eq!(err.category(), Some(ErrorCategory::Constraint));
}

#[test]
fn test_statement_rebind_keeps_columns() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    conn.create_table("t", &[("id", "INTEGER PRIMARY KEY"), ("on", "BOOLEAN")])
        .expect("create table");
    conn.execute(r#"INSERT INTO t (id, "on") VALUES (1, 1), (2, 0)"#, &[])
        .expect("insert");

    let mut stmt = conn
        .prepare(r#"SELECT id, "on" FROM t WHERE id = ?"#)
        .expect("prepare");
    assert_eq!(stmt.column_names(), vec!["id", "on"]);
    assert_eq!(stmt.parameter_count(), 1);

    stmt.bind(params![1_i64]).expect("bind");
    let first = stmt.fetch_all(RowShape::Pairs).expect("fetch");
    stmt.bind(params![2_i64]).expect("rebind");
    let second = stmt.fetch_all(RowShape::Pairs).expect("fetch");

    assert_eq!(stmt.column_types()[1], &ColumnType::Boolean);
    assert_eq!(first[0].get("on"), Some(&Value::Boolean(true)));
    assert_eq!(second[0].get("on"), Some(&Value::Boolean(false)));
}

#[test]
fn test_fetch_one_steps_a_row_at_a_time() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let mut stmt = conn
        .prepare("SELECT 1 AS n UNION ALL SELECT 2")
        .expect("prepare");
    let a = stmt.fetch_one(RowShape::Pairs).expect("first");
    let b = stmt.fetch_one(RowShape::Pairs).expect("second");
    let c = stmt.fetch_one(RowShape::Pairs).expect("done");
    assert_eq!(a.and_then(|r| r.get("n").cloned()), Some(Value::Integer(1)));
    assert_eq!(b.and_then(|r| r.get("n").cloned()), Some(Value::Integer(2)));
    assert!(c.is_none());
}

#[test]
fn test_prepare_empty_sql_is_misuse() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let err = conn.prepare("  -- nothing").expect_err("empty");
    assert_eq!(err.category(), Some(ErrorCategory::Misuse));
}

#[test]
fn test_explicit_close() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    conn.close().expect("close");
}

#[test]
fn test_cipher_encrypted_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = temp_db_path(&dir);
    let key = [0xABu8; 32];

    {
        let conn = cipher::open_encrypted(&path, key, false).expect("open encrypted");
        conn.execute_batch("CREATE TABLE secret (id INTEGER PRIMARY KEY, val TEXT);")
            .expect("create table");
        conn.execute("INSERT INTO secret (id, val) VALUES (1, 'top-secret')", &[])
            .expect("insert");
    }

    {
        let conn = cipher::open_encrypted(&path, key, false).expect("reopen encrypted");
        let val = conn
            .query_row("SELECT val FROM secret WHERE id = 1", &[], |stmt| {
                Ok(stmt.column_text(0))
            })
            .expect("query");
        assert_eq!(val, "top-secret");
    }

    let wrong = cipher::open_encrypted(&path, [0xCDu8; 32], false).expect_err("wrong key");
    assert_eq!(wrong.category(), Some(ErrorCategory::NotADatabase));
    assert!(wrong.to_string().contains("key verification failed"));
}

#[test]
fn test_plaintext_is_not_on_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = temp_db_path(&dir);
    {
        let conn = Connection::open(
            Config::file(&path)
                .journal_mode(Some(JournalMode::Delete))
                .key(Key::passphrase("correct horse")),
        )
        .expect("open");
        conn.execute_batch("CREATE TABLE t (v TEXT); INSERT INTO t VALUES ('needle-in-file');")
            .expect("write");
    }
    let bytes = std::fs::read(&path).expect("read file");
    let needle = b"needle-in-file";
    assert!(!bytes.windows(needle.len()).any(|w| w == needle));
}

#[test]
fn test_rekey() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = temp_db_path(&dir);
    {
        let conn = cipher::open_encrypted(&path, [1u8; 32], false).expect("open");
        conn.execute_batch("CREATE TABLE t (v INTEGER); INSERT INTO t VALUES (7);")
            .expect("write");
        cipher::rekey(&conn, &Key::raw([2u8; 32])).expect("rekey");
    }
    assert!(cipher::open_encrypted(&path, [1u8; 32], false).is_err());
    let conn = cipher::open_encrypted(&path, [2u8; 32], false).expect("new key");
    let v = conn
        .query_row("SELECT v FROM t", &[], |stmt| Ok(stmt.column_i64(0)))
        .expect("query");
    assert_eq!(v, 7);
}

#[test]
fn test_read_only_rejects_writes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = temp_db_path(&dir);
    {
        let conn = Connection::open(Config::file(&path)).expect("open");
        conn.execute_batch("CREATE TABLE t (v INTEGER);").expect("create");
    }
    let conn = Connection::open(Config::file(&path).read_only(true)).expect("open read-only");
    let err = conn
        .execute("INSERT INTO t VALUES (1)", &[])
        .expect_err("read-only");
    assert_eq!(err.category(), Some(ErrorCategory::ReadOnly));
}

#[test]
fn test_integrity_check() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let ok = cipher::integrity_check(&conn).expect("check");
    assert!(ok);
}

#[test]
fn test_sqlite_version() {
    assert!(sqlite_version().starts_with('3'));
}
