//! Multi-source identifier extraction (C2): derive candidate resource ids
//! from the request path, headers, and body (JSON/XML).

use crate::error::MockError;
use crate::routing::{extract_extension_id, Segment};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde_json_path::JsonPath;

/// GET/HEAD/PUT/DELETE id extraction: the trailing path segment, when it
/// strictly extends the pattern and doesn't collide with the section name
/// (spec §4.2).
pub fn extract_path_id<'a>(
    segments: &[Segment],
    path: &[&'a str],
    section_name: &str,
) -> Option<&'a str> {
    extract_extension_id(segments, path, section_name)
}

/// POST id extraction: headers, then body selectors, then path fallback —
/// deduplicated preserving first occurrence (spec §4.2).
pub fn extract_post_ids(
    headers: &http::HeaderMap,
    header_id_names: &[String],
    body_id_paths: &[String],
    content_type: &str,
    body: &[u8],
    segments: &[Segment],
    path: &[&str],
    section_name: &str,
) -> Result<Vec<String>, MockError> {
    let mut ids: Vec<String> = Vec::new();

    for name in header_id_names {
        if let Some(v) = headers.get(name.as_str()).and_then(|v| v.to_str().ok()) {
            push_unique(&mut ids, v.to_string());
        }
    }

    if !body_id_paths.is_empty() && !body.is_empty() {
        let ct = content_type.to_ascii_lowercase();
        if ct.contains("json") {
            for v in json_body_values(body, body_id_paths)? {
                push_unique(&mut ids, v);
            }
        } else if ct.contains("xml") {
            for v in xml_body_values(body, body_id_paths)? {
                push_unique(&mut ids, v);
            }
        }
    }

    if ids.is_empty() {
        if let Some(id) = extract_extension_id(segments, path, section_name) {
            ids.push(id.to_string());
        }
    }

    Ok(ids)
}

fn push_unique(ids: &mut Vec<String>, value: String) {
    if !ids.contains(&value) {
        ids.push(value);
    }
}

/// Translate a JSON-Pointer-like shorthand (`/id`, `/details/upc`) into a
/// `$.<path>` JSONPath expression.
fn shorthand_to_jsonpath(selector: &str) -> String {
    let trimmed = selector.trim_start_matches('/');
    if trimmed.is_empty() {
        "$".to_string()
    } else {
        format!("$.{}", trimmed.replace('/', "."))
    }
}

fn json_body_values(body: &[u8], paths: &[String]) -> Result<Vec<String>, MockError> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| MockError::BadRequest(format!("failed to parse JSON body: {e}")))?;
    let mut out = Vec::new();
    for selector in paths {
        let expr = shorthand_to_jsonpath(selector);
        let Ok(path) = JsonPath::parse(&expr) else {
            continue;
        };
        for node in path.query(&value).all() {
            out.push(json_value_to_id_string(node));
        }
    }
    Ok(out)
}

fn json_value_to_id_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn xml_body_values(body: &[u8], paths: &[String]) -> Result<Vec<String>, MockError> {
    let normalized_selectors: Vec<String> = paths
        .iter()
        .map(|p| p.trim_start_matches('/').to_string())
        .collect();

    let mut reader = Reader::from_reader(body);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut buf = Vec::new();
    let mut hits: Vec<(String, String)> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                stack.push(name);
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                stack.push(name);
                stack.pop();
            }
            Ok(Event::Text(t)) => {
                if let Ok(text) = t.unescape() {
                    let text = text.trim();
                    if !text.is_empty() && !stack.is_empty() {
                        hits.push((stack.join("/"), text.to_string()));
                    }
                }
            }
            Ok(Event::End(_)) => {
                stack.pop();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(MockError::BadRequest(format!(
                    "failed to parse XML body: {e}"
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    let mut out = Vec::new();
    for selector in &normalized_selectors {
        let suffix = format!("/{selector}");
        for (path, text) in &hits {
            if path == selector || path.ends_with(&suffix) {
                out.push(text.clone());
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_body_values_single_path() {
        let body = br#"{"id":"999","name":"n"}"#;
        let out = json_body_values(body, &["/id".to_string()]).unwrap();
        assert_eq!(out, vec!["999".to_string()]);
    }

    #[test]
    fn json_body_values_nested_multi_path() {
        let body = br#"{"id":"prod456","details":{"upc":"987654321"},"internalCode":"INT789"}"#;
        let out = json_body_values(
            body,
            &[
                "/id".to_string(),
                "/details/upc".to_string(),
                "/internalCode".to_string(),
            ],
        )
        .unwrap();
        assert_eq!(
            out,
            vec![
                "prod456".to_string(),
                "987654321".to_string(),
                "INT789".to_string()
            ]
        );
    }

    #[test]
    fn json_body_values_invalid_json_errors() {
        let err = json_body_values(b"not json", &["/id".to_string()]).unwrap_err();
        assert!(matches!(err, MockError::BadRequest(_)));
    }

    #[test]
    fn xml_body_values_nested_path() {
        let body = br#"<root><details><upc>123</upc></details></root>"#;
        let out = xml_body_values(body, &["/details/upc".to_string()]).unwrap();
        assert_eq!(out, vec!["123".to_string()]);
    }

    #[test]
    fn extract_post_ids_dedups_preserving_first_occurrence() {
        let mut headers = http::HeaderMap::new();
        headers.insert("x-id", "abc".parse().unwrap());
        let body = br#"{"id":"abc"}"#;
        let segments = vec![Segment::Literal("users".into()), Segment::Star];
        let path = vec!["users"];
        let ids = extract_post_ids(
            &headers,
            &["x-id".to_string()],
            &["/id".to_string()],
            "application/json",
            body,
            &segments,
            &path,
            "users",
        )
        .unwrap();
        assert_eq!(ids, vec!["abc".to_string()]);
    }

    #[test]
    fn extract_post_ids_falls_back_to_path_when_empty() {
        let headers = http::HeaderMap::new();
        let segments = vec![Segment::Literal("users".into()), Segment::Star];
        let path = vec!["users", "42"];
        let ids = extract_post_ids(
            &headers,
            &[],
            &[],
            "application/json",
            b"",
            &segments,
            &path,
            "users",
        )
        .unwrap();
        assert_eq!(ids, vec!["42".to_string()]);
    }
}
