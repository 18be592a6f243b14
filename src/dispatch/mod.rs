//! Per-method request dispatcher (C6): composes C1 (path matcher), C2 (id
//! extractor), C3 (resource store), C4 (scenario store), and C5
//! (transformation pipeline) into the public HTTP surface's state machine.

use crate::error::MockError;
use crate::extract::{extract_path_id, extract_post_ids};
use crate::metrics::Metrics;
use crate::routing::{normalize_path, split_path};
use crate::scenario::ScenarioStore;
use crate::section::{CompiledSection, SectionTable};
use crate::store::ResourceStore;
use crate::transform::{self, Clock};
use std::sync::Arc;

pub struct AppState {
    pub sections: SectionTable,
    pub store: ResourceStore,
    pub scenarios: ScenarioStore,
    pub metrics: Metrics,
    pub clock: Arc<dyn Clock>,
}

#[derive(Debug, Clone)]
pub struct DispatchResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub location: Option<String>,
    pub body: Vec<u8>,
}

impl DispatchResponse {
    fn error(err: MockError) -> Self {
        Self {
            status: err.status().as_u16(),
            content_type: Some("text/plain".to_string()),
            location: None,
            body: err.to_string().into_bytes(),
        }
    }
}

/// Entry point used by the HTTP adapter (C8) for everything outside
/// `/_uni/`. Never returns an error — all `MockError`s are converted to a
/// response here, the single place that does so (spec §7).
pub fn dispatch(
    state: &AppState,
    method: &str,
    raw_path: &str,
    headers: &http::HeaderMap,
    content_type: &str,
    body: &[u8],
) -> DispatchResponse {
    let path = normalize_path(raw_path);

    if !matches!(method, "GET" | "HEAD" | "POST" | "PUT" | "DELETE") {
        let resp = DispatchResponse {
            status: 405,
            content_type: Some("text/plain".to_string()),
            location: None,
            body: b"method not allowed".to_vec(),
        };
        state.metrics.record(&path, resp.status);
        return resp;
    }

    let response = dispatch_inner(state, method, &path, headers, content_type, body)
        .unwrap_or_else(DispatchResponse::error);
    state.metrics.record(&path, response.status);
    response
}

fn dispatch_inner(
    state: &AppState,
    method: &str,
    path: &str,
    headers: &http::HeaderMap,
    content_type: &str,
    body: &[u8],
) -> Result<DispatchResponse, MockError> {
    if let Some(scenario) = state.scenarios.match_request(method, path) {
        let body = scenario
            .data
            .as_ref()
            .map(|d| serde_json::to_vec(d).unwrap_or_default())
            .unwrap_or_default();
        return Ok(DispatchResponse {
            status: scenario.status_code.unwrap_or(200),
            content_type: scenario.content_type.clone(),
            location: scenario.location.clone(),
            body,
        });
    }

    let segments = split_path(path);
    let section = state
        .sections
        .match_path(&segments)
        .ok_or_else(|| MockError::NoMatchingSection(path.to_string()))?;

    match method {
        "GET" => dispatch_get(state, section, &segments, false),
        "HEAD" => dispatch_get(state, section, &segments, true),
        "POST" => dispatch_post(state, section, path, &segments, headers, content_type, body),
        "PUT" => dispatch_put(state, section, path, &segments, content_type, body),
        "DELETE" => dispatch_delete(state, section, path, &segments),
        _ => unreachable!("unsupported methods are rejected in dispatch()"),
    }
}

fn base_path_of(segments: &[&str]) -> String {
    if segments.len() <= 1 {
        String::new()
    } else {
        format!("/{}", segments[..segments.len() - 1].join("/"))
    }
}

fn apply_response_transforms(
    state: &AppState,
    section: &CompiledSection,
    resource: &crate::store::Resource,
) -> Result<Vec<u8>, MockError> {
    transform::apply_pipeline(
        &section.response_transforms,
        &resource.content_type,
        &resource.body,
        &state.clock,
    )
}

fn dispatch_get(
    state: &AppState,
    section: &CompiledSection,
    segments: &[&str],
    head_only: bool,
) -> Result<DispatchResponse, MockError> {
    if let Some(id) = extract_path_id(section.pattern.segments(), segments, &section.name) {
        let base_path = base_path_of(segments);
        let resource = state
            .store
            .get(&section.name, section.strict_path, &base_path, id)
            .ok_or(MockError::NotFound)?;
        let body = apply_response_transforms(state, section, &resource)?;
        return Ok(DispatchResponse {
            status: 200,
            content_type: Some(resource.content_type.clone()),
            location: None,
            body: if head_only { Vec::new() } else { body },
        });
    }

    let base = section.pattern.literal_prefix();
    let resources = state.store.get_by_path(&base).unwrap_or_default();
    let mut items = Vec::with_capacity(resources.len());
    for r in &resources {
        if !r.content_type.to_ascii_lowercase().contains("json") {
            continue;
        }
        let body = apply_response_transforms(state, section, r)?;
        let value: serde_json::Value =
            serde_json::from_slice(&body).map_err(|e| MockError::Internal(e.to_string()))?;
        items.push(value);
    }
    if items.is_empty() {
        return Err(MockError::NotFound);
    }
    let body = serde_json::to_vec(&serde_json::Value::Array(items))
        .map_err(|e| MockError::Internal(e.to_string()))?;
    Ok(DispatchResponse {
        status: 200,
        content_type: Some("application/json".to_string()),
        location: None,
        body: if head_only { Vec::new() } else { body },
    })
}

fn dispatch_post(
    state: &AppState,
    section: &CompiledSection,
    path: &str,
    segments: &[&str],
    headers: &http::HeaderMap,
    content_type: &str,
    body: &[u8],
) -> Result<DispatchResponse, MockError> {
    let ids = extract_post_ids(
        headers,
        &section.header_id_names,
        &section.body_id_paths,
        content_type,
        body,
        section.pattern.segments(),
        segments,
        &section.name,
    )?;
    let transformed_body =
        transform::apply_pipeline(&section.request_transforms, content_type, body, &state.clock)?;
    let resource = state.store.create(
        &section.name,
        section.strict_path,
        path,
        ids,
        content_type.to_string(),
        transformed_body,
    )?;

    let location = format!("{}/{}", path, resource.primary_id());
    let include_body = section.return_body || !section.response_transforms.is_empty();
    let (response_body, response_content_type) = if include_body {
        (
            apply_response_transforms(state, section, &resource)?,
            Some(resource.content_type.clone()),
        )
    } else {
        (Vec::new(), None)
    };

    Ok(DispatchResponse {
        status: 201,
        content_type: response_content_type,
        location: Some(location),
        body: response_body,
    })
}

fn dispatch_put(
    state: &AppState,
    section: &CompiledSection,
    path: &str,
    segments: &[&str],
    content_type: &str,
    body: &[u8],
) -> Result<DispatchResponse, MockError> {
    let id = extract_path_id(section.pattern.segments(), segments, &section.name)
        .ok_or_else(|| MockError::BadRequest("missing id in path".to_string()))?
        .to_string();

    let transformed_body =
        transform::apply_pipeline(&section.request_transforms, content_type, body, &state.clock)?;
    let base_path = base_path_of(segments);

    let resource = if section.strict_path {
        if state
            .store
            .get(&section.name, true, &base_path, &id)
            .is_none()
        {
            return Err(MockError::NotFound);
        }
        state.store.update(
            &section.name,
            true,
            &base_path,
            &id,
            path,
            content_type.to_string(),
            transformed_body,
        )?
    } else {
        match state.store.update(
            &section.name,
            false,
            &base_path,
            &id,
            path,
            content_type.to_string(),
            transformed_body.clone(),
        ) {
            Ok(r) => r,
            Err(MockError::NotFound) => state.store.upsert(
                &section.name,
                false,
                path,
                vec![id.clone()],
                content_type.to_string(),
                transformed_body,
            )?,
            Err(e) => return Err(e),
        }
    };

    let include_body = section.return_body || !section.response_transforms.is_empty();
    let (response_body, response_content_type) = if include_body {
        (
            apply_response_transforms(state, section, &resource)?,
            Some(resource.content_type.clone()),
        )
    } else {
        (Vec::new(), None)
    };

    Ok(DispatchResponse {
        status: 200,
        content_type: response_content_type,
        location: None,
        body: response_body,
    })
}

fn dispatch_delete(
    state: &AppState,
    section: &CompiledSection,
    _path: &str,
    segments: &[&str],
) -> Result<DispatchResponse, MockError> {
    let id = extract_path_id(section.pattern.segments(), segments, &section.name)
        .ok_or(MockError::NotFound)?;
    let base_path = base_path_of(segments);

    if section.strict_path
        && state
            .store
            .get(&section.name, true, &base_path, id)
            .is_none()
    {
        return Err(MockError::NotFound);
    }

    state
        .store
        .delete(&section.name, section.strict_path, &base_path, id)?;

    if section.return_body {
        Ok(DispatchResponse {
            status: 204,
            content_type: Some("application/json".to_string()),
            location: None,
            body: b"{}".to_vec(),
        })
    } else {
        Ok(DispatchResponse {
            status: 204,
            content_type: None,
            location: None,
            body: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, SectionConfig, TransformConfig};
    use crate::transform::SystemClock;
    use indexmap::IndexMap;

    fn state_with(sections: Vec<(&str, SectionConfig)>) -> AppState {
        let mut raw = IndexMap::new();
        for (name, cfg) in sections {
            raw.insert(name.to_string(), cfg);
        }
        let mut cfg = AppConfig::default();
        cfg.sections = raw;
        AppState {
            sections: SectionTable::compile(&cfg.sections).unwrap(),
            store: ResourceStore::new(),
            scenarios: ScenarioStore::new(),
            metrics: Metrics::new(),
            clock: Arc::new(SystemClock),
        }
    }

    fn section(pattern: &str, strict: bool, body_id_paths: Vec<&str>) -> SectionConfig {
        SectionConfig {
            path_pattern: pattern.to_string(),
            case_sensitive: true,
            strict_path: strict,
            return_body: false,
            header_id_names: vec![],
            body_id_paths: body_id_paths.into_iter().map(String::from).collect(),
            transformations: TransformConfig::default(),
        }
    }

    fn headers() -> http::HeaderMap {
        http::HeaderMap::new()
    }

    #[test]
    fn scenario_1_post_then_get_by_body_id() {
        let state = state_with(vec![("users", section("/users/*", false, vec!["/id"]))]);
        let resp = dispatch(
            &state,
            "POST",
            "/users",
            &headers(),
            "application/json",
            br#"{"id":"999","name":"n"}"#,
        );
        assert_eq!(resp.status, 201);
        assert_eq!(resp.location, Some("/users/999".to_string()));

        let resp = dispatch(&state, "GET", "/users/999", &headers(), "application/json", b"");
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, br#"{"id":"999","name":"n"}"#.to_vec());
    }

    #[test]
    fn scenario_2_multi_id_aliasing() {
        let state = state_with(vec![(
            "products",
            section("/products/*", false, vec!["/id", "/details/upc", "/internalCode"]),
        )]);
        let resp = dispatch(
            &state,
            "POST",
            "/products",
            &headers(),
            "application/json",
            br#"{"id":"prod456","details":{"upc":"987654321"},"internalCode":"INT789"}"#,
        );
        assert_eq!(resp.status, 201);

        for path in ["/products/prod456", "/products/987654321", "/products/INT789"] {
            let r = dispatch(&state, "GET", path, &headers(), "application/json", b"");
            assert_eq!(r.status, 200, "path {path}");
        }
    }

    #[test]
    fn scenario_3_strict_path_isolation() {
        let state = state_with(vec![("users", section("/users/**", true, vec!["/id"]))]);
        let resp = dispatch(
            &state,
            "POST",
            "/users/subpath",
            &headers(),
            "application/json",
            br#"{"id":1}"#,
        );
        assert_eq!(resp.status, 201);

        let miss = dispatch(&state, "GET", "/users/1", &headers(), "application/json", b"");
        assert_eq!(miss.status, 404);

        let hit = dispatch(
            &state,
            "GET",
            "/users/subpath/1",
            &headers(),
            "application/json",
            b"",
        );
        assert_eq!(hit.status, 200);
    }

    #[test]
    fn scenario_4_flexible_put_and_delete() {
        let state = state_with(vec![("users", section("/users/**", false, vec!["/id"]))]);
        dispatch(
            &state,
            "POST",
            "/users/subpath",
            &headers(),
            "application/json",
            br#"{"id":1}"#,
        );
        let put = dispatch(
            &state,
            "PUT",
            "/users/1",
            &headers(),
            "application/json",
            br#"{"id":1,"status":"a"}"#,
        );
        assert_eq!(put.status, 200);
        let del = dispatch(&state, "DELETE", "/users/1", &headers(), "application/json", b"");
        assert_eq!(del.status, 204);
        let get = dispatch(&state, "GET", "/users/1", &headers(), "application/json", b"");
        assert_eq!(get.status, 404);
    }

    #[test]
    fn scenario_5_strict_put_no_upsert() {
        let state = state_with(vec![("admin", section("/admin/users/*", true, vec!["/id"]))]);
        let put_before = dispatch(
            &state,
            "PUT",
            "/admin/users/999",
            &headers(),
            "application/json",
            br#"{"id":"999"}"#,
        );
        assert_eq!(put_before.status, 404);

        let post = dispatch(
            &state,
            "POST",
            "/admin/users",
            &headers(),
            "application/json",
            br#"{"id":"999"}"#,
        );
        assert_eq!(post.status, 201);

        let put_after = dispatch(
            &state,
            "PUT",
            "/admin/users/999",
            &headers(),
            "application/json",
            br#"{"id":"999"}"#,
        );
        assert_eq!(put_after.status, 200);
    }

    #[test]
    fn scenario_6_collection_get_returns_insertion_order_array() {
        let state = state_with(vec![("users", section("/users/*", false, vec!["/id"]))]);
        for body in [
            br#"{"id":"1"}"#.to_vec(),
            br#"{"id":"2"}"#.to_vec(),
            br#"{"id":"3"}"#.to_vec(),
        ] {
            let r = dispatch(&state, "POST", "/users", &headers(), "application/json", &body);
            assert_eq!(r.status, 201);
        }
        let list = dispatch(&state, "GET", "/users", &headers(), "application/json", b"");
        assert_eq!(list.status, 200);
        let v: serde_json::Value = serde_json::from_slice(&list.body).unwrap();
        assert_eq!(v.as_array().unwrap().len(), 3);
        assert_eq!(v[0]["id"], "1");
        assert_eq!(v[1]["id"], "2");
        assert_eq!(v[2]["id"], "3");
    }

    #[test]
    fn unsupported_method_is_405() {
        let state = state_with(vec![("users", section("/users/*", false, vec!["/id"]))]);
        let resp = dispatch(&state, "PATCH", "/users/1", &headers(), "application/json", b"");
        assert_eq!(resp.status, 405);
    }

    #[test]
    fn no_matching_section_is_404() {
        let state = state_with(vec![("users", section("/users/*", false, vec!["/id"]))]);
        let resp = dispatch(&state, "GET", "/unknown/1", &headers(), "application/json", b"");
        assert_eq!(resp.status, 404);
    }
}
