//! Request/response transformation pipeline (C5).
//!
//! Modeled on the teacher's `HeaderOp`/`HeaderOpAction` and `Filter` enums:
//! a small closed set of pre-compiled ops run in sequence over a value.

use crate::error::MockError;
use serde_json::Value;
use std::sync::Arc;

/// Wall-clock abstraction so `AddTimestamp` is testable without calling
/// `SystemTime::now()` from a non-deterministic assertion.
pub trait Clock: Send + Sync {
    fn now_rfc3339(&self) -> String;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_rfc3339(&self) -> String {
        time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
    }
}

#[derive(Clone)]
pub struct FixedClock(pub String);

impl Clock for FixedClock {
    fn now_rfc3339(&self) -> String {
        self.0.clone()
    }
}

/// A single compiled transform op, built once from
/// `crate::config::TransformOpConfig`.
#[derive(Debug, Clone)]
pub enum TransformOp {
    SetField { path: String, value: Value },
    RemoveField { path: String },
    UppercaseField { path: String },
    LowercaseField { path: String },
    AddTimestamp { field: String },
}

impl TransformOp {
    pub fn compile(cfg: &crate::config::TransformOpConfig) -> Self {
        use crate::config::TransformOpConfig as C;
        match cfg {
            C::SetField { path, value } => TransformOp::SetField {
                path: path.clone(),
                value: value.clone(),
            },
            C::RemoveField { path } => TransformOp::RemoveField { path: path.clone() },
            C::UppercaseField { path } => TransformOp::UppercaseField { path: path.clone() },
            C::LowercaseField { path } => TransformOp::LowercaseField { path: path.clone() },
            C::AddTimestamp { field } => TransformOp::AddTimestamp {
                field: field.clone(),
            },
        }
    }

    fn apply(&self, value: &mut Value, clock: &dyn Clock) -> Result<(), MockError> {
        match self {
            TransformOp::SetField { path, value: v } => {
                set_at(value, path, v.clone());
                Ok(())
            }
            TransformOp::RemoveField { path } => {
                remove_at(value, path);
                Ok(())
            }
            TransformOp::UppercaseField { path } => {
                if let Some(s) = get_at_mut(value, path).and_then(Value::as_str) {
                    let upper = s.to_uppercase();
                    set_at(value, path, Value::String(upper));
                }
                Ok(())
            }
            TransformOp::LowercaseField { path } => {
                if let Some(s) = get_at_mut(value, path).and_then(Value::as_str) {
                    let lower = s.to_lowercase();
                    set_at(value, path, Value::String(lower));
                }
                Ok(())
            }
            TransformOp::AddTimestamp { field } => {
                set_at(value, field, Value::String(clock.now_rfc3339()));
                Ok(())
            }
        }
    }
}

fn get_at_mut<'a>(value: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    let mut current = value;
    for part in path.split('.') {
        current = current.get_mut(part)?;
    }
    Some(current)
}

fn set_at(value: &mut Value, path: &str, new_value: Value) {
    let parts: Vec<&str> = path.split('.').collect();
    let mut current = value;
    for part in &parts[..parts.len() - 1] {
        if !current.is_object() {
            *current = Value::Object(Default::default());
        }
        current = current
            .as_object_mut()
            .unwrap()
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Default::default()));
    }
    if !current.is_object() {
        *current = Value::Object(Default::default());
    }
    current
        .as_object_mut()
        .unwrap()
        .insert(parts[parts.len() - 1].to_string(), new_value);
}

fn remove_at(value: &mut Value, path: &str) {
    let parts: Vec<&str> = path.split('.').collect();
    let mut current = value;
    for part in &parts[..parts.len() - 1] {
        match current.get_mut(part) {
            Some(next) => current = next,
            None => return,
        }
    }
    if let Some(obj) = current.as_object_mut() {
        obj.remove(parts[parts.len() - 1]);
    }
}

/// Run a pipeline of transform ops over a body. An empty pipeline passes
/// the body through unchanged regardless of content type. A non-empty
/// pipeline requires a JSON body; failure to parse is `TransformFailed`
/// (spec §4.5: "any error aborts the whole request").
pub fn apply_pipeline(
    ops: &[TransformOp],
    content_type: &str,
    body: &[u8],
    clock: &Arc<dyn Clock>,
) -> Result<Vec<u8>, MockError> {
    if ops.is_empty() {
        return Ok(body.to_vec());
    }
    if !content_type.to_ascii_lowercase().contains("json") {
        return Err(MockError::TransformFailed(
            "transform requires a JSON body".to_string(),
        ));
    }
    let mut value: Value = serde_json::from_slice(body)
        .map_err(|e| MockError::TransformFailed(format!("invalid JSON body: {e}")))?;
    for op in ops {
        op.apply(&mut value, clock.as_ref())?;
    }
    serde_json::to_vec(&value).map_err(|e| MockError::TransformFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock("2024-01-01T00:00:00Z".to_string()))
    }

    #[test]
    fn set_field_inserts_value() {
        let ops = vec![TransformOp::SetField {
            path: "status".into(),
            value: Value::String("active".into()),
        }];
        let out = apply_pipeline(&ops, "application/json", br#"{"id":1}"#, &clock()).unwrap();
        let v: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(v["status"], "active");
    }

    #[test]
    fn remove_field_drops_key() {
        let ops = vec![TransformOp::RemoveField {
            path: "secret".into(),
        }];
        let out = apply_pipeline(&ops, "application/json", br#"{"id":1,"secret":"x"}"#, &clock())
            .unwrap();
        let v: Value = serde_json::from_slice(&out).unwrap();
        assert!(v.get("secret").is_none());
    }

    #[test]
    fn uppercase_and_lowercase() {
        let ops = vec![
            TransformOp::UppercaseField { path: "a".into() },
            TransformOp::LowercaseField { path: "b".into() },
        ];
        let out =
            apply_pipeline(&ops, "application/json", br#"{"a":"hi","b":"HI"}"#, &clock()).unwrap();
        let v: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(v["a"], "HI");
        assert_eq!(v["b"], "hi");
    }

    #[test]
    fn add_timestamp_uses_injected_clock() {
        let ops = vec![TransformOp::AddTimestamp {
            field: "createdAt".into(),
        }];
        let out = apply_pipeline(&ops, "application/json", br#"{}"#, &clock()).unwrap();
        let v: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(v["createdAt"], "2024-01-01T00:00:00Z");
    }

    #[test]
    fn non_json_body_with_ops_fails() {
        let ops = vec![TransformOp::SetField {
            path: "x".into(),
            value: Value::Null,
        }];
        let err = apply_pipeline(&ops, "text/plain", b"hello", &clock()).unwrap_err();
        assert!(matches!(err, MockError::TransformFailed(_)));
    }

    #[test]
    fn empty_pipeline_passes_through_non_json() {
        let out = apply_pipeline(&[], "text/plain", b"hello", &clock()).unwrap();
        assert_eq!(out, b"hello");
    }
}
