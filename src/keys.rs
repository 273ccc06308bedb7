//! Cache-key derivation.
//!
//! Keys are SHA-256 hex digests of the statement text, optionally folded
//! with the bound parameter name/value pairs in bind order. Collision
//! resistance is for correctness only; nothing here is a secret.

use sha2::{Digest, Sha256};

use crate::types::BoundParam;

fn hex_digest(hasher: Sha256) -> String {
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<String>()
}

/// Key for an ad-hoc statement: identical text always yields the identical
/// key.
#[must_use]
pub fn query_key(sql: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(sql.as_bytes());
    hex_digest(hasher)
}

/// Key for a prepared statement: the statement text plus each bound
/// `[name|value]` pair, folded in bind order, so the same statement bound
/// with different values never collides.
#[must_use]
pub fn statement_key(sql: &str, params: &[BoundParam]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(sql.as_bytes());
    hasher.update(b"-");
    for param in params {
        hasher.update(format!("[{}|{}]", param.bare_name(), param.value).as_bytes());
    }
    hex_digest(hasher)
}

/// Key for a pluggable-backend read: the backend name plus the canonical
/// JSON form of the query spec.
#[must_use]
pub fn backend_key(backend: &str, query_spec: &serde_json::Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(backend.as_bytes());
    hasher.update(b":");
    hasher.update(query_spec.to_string().as_bytes());
    hex_digest(hasher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RowValues;

    #[test]
    fn query_keys_are_deterministic_and_distinct() {
        assert_eq!(query_key("SELECT 1"), query_key("SELECT 1"));
        assert_ne!(query_key("SELECT 1"), query_key("SELECT 2"));
        assert_eq!(query_key("SELECT 1").len(), 64);
    }

    #[test]
    fn statement_keys_fold_bound_values() {
        let sql = "SELECT :a + :b AS sum";
        let first = vec![
            BoundParam::new(":a", RowValues::Int(1)),
            BoundParam::new(":b", RowValues::Int(14)),
        ];
        let second = vec![
            BoundParam::new(":a", RowValues::Int(2)),
            BoundParam::new(":b", RowValues::Int(2)),
        ];
        assert_eq!(statement_key(sql, &first), statement_key(sql, &first));
        assert_ne!(statement_key(sql, &first), statement_key(sql, &second));
        assert_ne!(statement_key(sql, &first), query_key(sql));
    }

    #[test]
    fn colon_prefix_does_not_change_the_key() {
        let sql = "SELECT :a";
        let with = vec![BoundParam::new(":a", RowValues::Int(1))];
        let without = vec![BoundParam::new("a", RowValues::Int(1))];
        assert_eq!(statement_key(sql, &with), statement_key(sql, &without));
    }
}
