#![cfg(feature = "sqlite")]

use sql_cache_dal::prelude::*;

fn memory_dal() -> Result<Dal, Box<dyn std::error::Error>> {
    let config = DalConfig::builder()
        .alias("primary", ConnectionParams::sqlite(":memory:"))
        .cache(CacheSettings::in_process())
        .build();
    let mut dal = Dal::new(config);
    dal.connect("primary")?;
    Ok(dal)
}

#[test]
fn json_document_preserves_the_wire_keys() -> Result<(), Box<dyn std::error::Error>> {
    let mut dal = memory_dal()?;
    let formatted = dal.query_with_cache_as("SELECT 1+1 AS sum", 120, ResultFormat::Json)?;
    let doc: serde_json::Value =
        serde_json::from_str(formatted.as_document().expect("json document"))?;

    assert_eq!(doc["result"], "ok");
    assert_eq!(doc["cache"], "miss");
    assert_eq!(doc["rows"][0]["sum"], 2);

    let again = dal.query_with_cache_as("SELECT 1+1 AS sum", 120, ResultFormat::Json)?;
    let doc: serde_json::Value = serde_json::from_str(again.as_document().expect("json"))?;
    assert_eq!(doc["cache"], "hit");
    assert_eq!(doc["rows"][0]["sum"], 2);
    Ok(())
}

#[test]
fn json_mutation_envelope_has_write_keys_only() -> Result<(), Box<dyn std::error::Error>> {
    let mut dal = memory_dal()?;
    dal.start_transaction()?;
    dal.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT, v TEXT)")?;
    let envelope = dal.query("INSERT INTO t (v) VALUES ('x')", StatementKind::Insert)?;
    dal.commit()?;

    let formatted = format_envelope(&envelope, ResultFormat::Json)?;
    let doc: serde_json::Value = serde_json::from_str(formatted.as_document().expect("json"))?;
    assert_eq!(doc["result"], "ok");
    assert_eq!(doc["rows_affected"], 1);
    assert_eq!(doc["insertid"], 1);
    assert!(doc.get("rows").is_none());
    assert!(doc.get("cache").is_none());
    Ok(())
}

#[test]
fn xml_document_escapes_values() -> Result<(), Box<dyn std::error::Error>> {
    let mut dal = memory_dal()?;
    let formatted = dal.query_with_cache_as(
        "SELECT 'a & b <tag>' AS msg",
        60,
        ResultFormat::Xml,
    )?;
    let doc = formatted.as_document().expect("xml document");

    assert!(doc.starts_with("<xml><result>ok</result><cache>miss</cache>"));
    assert!(doc.contains("<rows><row><msg>a &amp; b &lt;tag&gt;</msg></row></rows>"));
    assert!(doc.ends_with("</xml>"));
    Ok(())
}

#[test]
fn xml_strips_control_characters() -> Result<(), Box<dyn std::error::Error>> {
    let mut dal = memory_dal()?;
    let formatted = dal.query_with_cache_as(
        "SELECT 'line' || char(10) || 'break' AS msg",
        60,
        ResultFormat::Xml,
    )?;
    let doc = formatted.as_document().expect("xml document");
    assert!(doc.contains("<msg>linebreak</msg>"));
    Ok(())
}

#[test]
fn structured_format_passes_the_envelope_through() -> Result<(), Box<dyn std::error::Error>> {
    let mut dal = memory_dal()?;
    let envelope = dal.query_with_cache("SELECT 1 AS one", 60)?;
    match format_envelope(&envelope, ResultFormat::Structured)? {
        Formatted::Structured(same) => {
            assert_eq!(same.row_count(), 1);
            assert_eq!(same.cache_state, envelope.cache_state);
        }
        other => panic!("expected structured, got {other:?}"),
    }
    Ok(())
}

#[test]
fn error_envelopes_format_too() -> Result<(), Box<dyn std::error::Error>> {
    let mut dal = memory_dal()?;
    let err = dal
        .query("SELECT x FROM missing", StatementKind::Select)
        .unwrap_err();
    let envelope = ResultEnvelope::for_error(&err);

    let formatted = format_envelope(&envelope, ResultFormat::Json)?;
    let doc: serde_json::Value = serde_json::from_str(formatted.as_document().expect("json"))?;
    assert_eq!(doc["result"], "error");
    assert_eq!(doc["error"]["statement"], "SELECT x FROM missing");

    let xml = format_envelope(&envelope, ResultFormat::Xml)?;
    assert!(xml.as_document().expect("xml").contains("<result>error</result>"));
    Ok(())
}
