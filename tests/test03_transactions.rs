#![cfg(feature = "sqlite")]

use sql_cache_dal::prelude::*;
use tempfile::TempDir;

fn file_dal(dir: &TempDir, name: &str) -> Result<Dal, Box<dyn std::error::Error>> {
    let path = dir.path().join(name).to_string_lossy().into_owned();
    let config = DalConfig::builder()
        .alias("primary", ConnectionParams::sqlite(path))
        .cache(CacheSettings::disabled())
        .build();
    let mut dal = Dal::new(config);
    dal.connect("primary")?;
    Ok(dal)
}

#[test]
fn transaction_pins_one_connection_across_operations()
-> Result<(), Box<dyn std::error::Error>> {
    // An in-memory database evaporates when its connection closes, so state
    // surviving across operations proves they shared a single connection.
    let config = DalConfig::builder()
        .alias("primary", ConnectionParams::sqlite(":memory:"))
        .cache(CacheSettings::disabled())
        .build();
    let mut dal = Dal::new(config);
    dal.connect("primary")?;

    dal.start_transaction()?;
    assert!(dal.in_transaction());
    assert!(dal.is_connected());

    dal.execute_batch("CREATE TABLE t (n INTEGER)")?;
    let first = dal.query("INSERT INTO t (n) VALUES (1)", StatementKind::Insert)?;
    assert_eq!(first.rows_affected, Some(1));
    let second = dal.query("INSERT INTO t (n) VALUES (2)", StatementKind::Insert)?;
    assert_eq!(second.rows_affected, Some(1));
    assert!(dal.is_connected());

    let rows = dal.query("SELECT n FROM t ORDER BY n", StatementKind::Select)?;
    assert_eq!(rows.row_count(), 2);

    dal.commit()?;
    assert!(!dal.in_transaction());
    assert!(!dal.is_connected());

    // Fresh connection, fresh in-memory database: the table is gone.
    assert!(matches!(
        dal.query("SELECT n FROM t", StatementKind::Select),
        Err(DalError::QueryError { .. })
    ));
    Ok(())
}

#[test]
fn connection_is_released_after_each_operation_outside_transactions()
-> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let mut dal = file_dal(&dir, "release.db")?;

    dal.execute_batch("CREATE TABLE t (n INTEGER)")?;
    assert!(!dal.is_connected());
    dal.query("INSERT INTO t (n) VALUES (1)", StatementKind::Insert)?;
    assert!(!dal.is_connected());
    dal.query("SELECT n FROM t", StatementKind::Select)?;
    assert!(!dal.is_connected());
    Ok(())
}

#[test]
fn rollback_discards_and_commit_persists() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let mut dal = file_dal(&dir, "txn.db")?;
    dal.execute_batch("CREATE TABLE entries (n INTEGER)")?;

    dal.start_transaction()?;
    dal.query("INSERT INTO entries (n) VALUES (1)", StatementKind::Insert)?;
    dal.rollback()?;
    let after_rollback = dal.query("SELECT n FROM entries", StatementKind::Select)?;
    assert_eq!(after_rollback.row_count(), 0);

    dal.start_transaction()?;
    dal.query("INSERT INTO entries (n) VALUES (2)", StatementKind::Insert)?;
    dal.commit()?;
    let after_commit = dal.query("SELECT n FROM entries", StatementKind::Select)?;
    assert_eq!(after_commit.row_count(), 1);
    Ok(())
}

#[test]
fn transaction_misuse_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let mut dal = file_dal(&dir, "misuse.db")?;

    assert!(matches!(dal.commit(), Err(DalError::ConnectionError(_))));
    assert!(matches!(dal.rollback(), Err(DalError::ConnectionError(_))));

    dal.start_transaction()?;
    assert!(matches!(
        dal.start_transaction(),
        Err(DalError::ConnectionError(_))
    ));
    dal.rollback()?;
    Ok(())
}

#[test]
fn retargeting_mid_transaction_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let other_path = dir.path().join("other.db").to_string_lossy().into_owned();
    let main_path = dir.path().join("main.db").to_string_lossy().into_owned();
    let config = DalConfig::builder()
        .alias("primary", ConnectionParams::sqlite(main_path))
        .alias("secondary", ConnectionParams::sqlite(other_path))
        .cache(CacheSettings::disabled())
        .build();
    let mut dal = Dal::new(config);
    dal.connect("primary")?;

    dal.start_transaction()?;
    assert!(matches!(
        dal.connect("secondary"),
        Err(DalError::ConnectionError(_))
    ));
    // Staying on the same alias is fine.
    dal.connect("primary")?;
    dal.commit()?;
    // And after the transaction the retarget goes through.
    dal.connect("secondary")?;
    Ok(())
}
