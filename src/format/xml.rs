use crate::results::ResultEnvelope;
use crate::types::{QueryStatus, RowValues};

/// Entity-escape a value for XML output, dropping ASCII control characters
/// (they are illegal in XML and tend to turn up in scraped text).
fn xml_encode(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\u{0}'..='\u{1f}' => {}
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn value_text(value: &RowValues) -> String {
    match value {
        RowValues::Null => String::new(),
        other => other.to_string(),
    }
}

/// Render an envelope as an XML document:
/// `<xml><result>…</result>…<rows><row><field>value</field>…</row>…</rows></xml>`.
///
/// Column names become element names and are emitted as-is; values are
/// entity-escaped with control characters stripped.
pub(crate) fn render(envelope: &ResultEnvelope) -> String {
    let mut out = String::from("<xml>");

    let status = match envelope.status {
        QueryStatus::Ok => "ok",
        QueryStatus::Error => "error",
    };
    out.push_str(&format!("<result>{status}</result>"));
    if let Some(state) = envelope.cache_state {
        out.push_str(&format!("<cache>{}</cache>", state.as_str()));
    }
    if let Some(rows_affected) = envelope.rows_affected {
        out.push_str(&format!("<rows_affected>{rows_affected}</rows_affected>"));
    }
    if let Some(insert_id) = envelope.insert_id {
        out.push_str(&format!("<insertid>{insert_id}</insertid>"));
    }
    if let Some(detail) = &envelope.error_detail {
        out.push_str(&format!("<error>{}</error>", xml_encode(&detail.message)));
    }

    if let Some(rows) = &envelope.rows {
        out.push_str("<rows>");
        for row in rows {
            out.push_str("<row>");
            for (column, value) in row.iter() {
                out.push_str(&format!(
                    "<{column}>{}</{column}>",
                    xml_encode(&value_text(value))
                ));
            }
            out.push_str("</row>");
        }
        out.push_str("</rows>");
    }

    out.push_str("</xml>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_entities_and_strips_control_chars() {
        assert_eq!(xml_encode("a & b <tag> c"), "a &amp; b &lt;tag&gt; c");
        assert_eq!(xml_encode("line\r\nbreak\u{7}"), "linebreak");
    }
}
