#![cfg(feature = "sqlite")]

use std::thread::sleep;
use std::time::Duration;

use sql_cache_dal::prelude::*;
use tempfile::TempDir;

fn dal_with_cache(dir: &TempDir, name: &str) -> Result<Dal, Box<dyn std::error::Error>> {
    let path = dir.path().join(name).to_string_lossy().into_owned();
    let config = DalConfig::builder()
        .alias("primary", ConnectionParams::sqlite(path))
        .cache(CacheSettings::in_process())
        .build();
    let mut dal = Dal::new(config);
    dal.connect("primary")?;
    Ok(dal)
}

#[test]
fn first_call_misses_second_hits() -> Result<(), Box<dyn std::error::Error>> {
    let config = DalConfig::builder()
        .alias("primary", ConnectionParams::sqlite(":memory:"))
        .cache(CacheSettings::in_process())
        .build();
    let mut dal = Dal::new(config);
    dal.connect("primary")?;

    let first = dal.query_with_cache("SELECT 1+1 AS sum", 120)?;
    assert_eq!(first.status, QueryStatus::Ok);
    assert_eq!(first.cache_state, Some(CacheState::Miss));
    assert_eq!(first.row_count(), 1);
    assert_eq!(
        first.first_row().expect("row").get("sum"),
        Some(&RowValues::Int(2))
    );

    let second = dal.query_with_cache("SELECT 1+1 AS sum", 120)?;
    assert_eq!(second.cache_state, Some(CacheState::Hit));
    assert_eq!(
        second.first_row().expect("row").get("sum"),
        Some(&RowValues::Int(2))
    );
    // The hit never opened a connection.
    assert!(!dal.is_connected());
    Ok(())
}

#[test]
fn entries_expire_after_their_ttl() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let mut dal = dal_with_cache(&dir, "expiry.db")?;

    let first = dal.query_with_cache("SELECT 1+1 AS sum", 1)?;
    assert_eq!(first.cache_state, Some(CacheState::Miss));
    let second = dal.query_with_cache("SELECT 1+1 AS sum", 1)?;
    assert_eq!(second.cache_state, Some(CacheState::Hit));

    sleep(Duration::from_millis(1200));
    let third = dal.query_with_cache("SELECT 1+1 AS sum", 1)?;
    assert_eq!(third.cache_state, Some(CacheState::Miss));
    assert_eq!(
        third.first_row().expect("row").get("sum"),
        Some(&RowValues::Int(2))
    );
    Ok(())
}

#[test]
fn hits_do_not_touch_the_database() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let mut dal = dal_with_cache(&dir, "stale.db")?;
    dal.execute_batch("CREATE TABLE counters (n INTEGER); INSERT INTO counters (n) VALUES (1);")?;

    let sql = "SELECT n FROM counters";
    let first = dal.query_with_cache(sql, 120)?;
    assert_eq!(first.cache_state, Some(CacheState::Miss));
    assert_eq!(first.first_row().expect("row").get("n"), Some(&RowValues::Int(1)));

    // Change the data under the cache's feet.
    let update = dal.query("UPDATE counters SET n = 2", StatementKind::Update)?;
    assert_eq!(update.rows_affected, Some(1));

    // Still served from cache: zero database queries, old value.
    let cached = dal.query_with_cache(sql, 120)?;
    assert_eq!(cached.cache_state, Some(CacheState::Hit));
    assert_eq!(cached.first_row().expect("row").get("n"), Some(&RowValues::Int(1)));

    // Invalidate and re-read: fresh value from the database.
    assert!(dal.uncache_object(&sql_cache_dal::keys::query_key(sql)));
    let fresh = dal.query_with_cache(sql, 120)?;
    assert_eq!(fresh.cache_state, Some(CacheState::Miss));
    assert_eq!(fresh.first_row().expect("row").get("n"), Some(&RowValues::Int(2)));
    Ok(())
}

#[test]
fn errors_are_never_cached() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let mut dal = dal_with_cache(&dir, "errors.db")?;

    let sql = "SELECT n FROM not_yet_created";
    assert!(matches!(
        dal.query_with_cache(sql, 120),
        Err(DalError::QueryError { .. })
    ));
    // Second attempt re-queries the database instead of replaying a cached
    // failure.
    assert!(matches!(
        dal.query_with_cache(sql, 120),
        Err(DalError::QueryError { .. })
    ));

    dal.execute_batch(
        "CREATE TABLE not_yet_created (n INTEGER); INSERT INTO not_yet_created (n) VALUES (42);",
    )?;
    let recovered = dal.query_with_cache(sql, 120)?;
    assert_eq!(recovered.cache_state, Some(CacheState::Miss));
    assert_eq!(
        recovered.first_row().expect("row").get("n"),
        Some(&RowValues::Int(42))
    );
    Ok(())
}

#[test]
fn disabled_cache_tags_results_disabled() -> Result<(), Box<dyn std::error::Error>> {
    let config = DalConfig::builder()
        .alias("primary", ConnectionParams::sqlite(":memory:"))
        .cache(CacheSettings::disabled())
        .build();
    let mut dal = Dal::new(config);
    dal.connect("primary")?;

    for _ in 0..2 {
        let envelope = dal.query_with_cache("SELECT 1+1 AS sum", 120)?;
        assert_eq!(envelope.cache_state, Some(CacheState::Disabled));
        assert_eq!(
            envelope.first_row().expect("row").get("sum"),
            Some(&RowValues::Int(2))
        );
    }
    Ok(())
}

#[test]
fn generic_object_cache_round_trips() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let mut dal = dal_with_cache(&dir, "objects.db")?;

    assert!(dal.cache_object("greeting", &"hello".to_string(), 60));
    assert_eq!(
        dal.get_cached_object::<String>("greeting").as_deref(),
        Some("hello")
    );
    assert!(dal.uncache_object("greeting"));
    assert_eq!(dal.get_cached_object::<String>("greeting"), None);
    assert!(!dal.uncache_object("greeting"));
    Ok(())
}
