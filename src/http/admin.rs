//! Admin surface under `/_uni/`: health, metrics, and scenario CRUD.
//! Modeled on the teacher's `server::admin::handle_admin` path dispatch.

use super::{empty_body, full_body, ResponseBody};
use crate::config::ScenarioConfig;
use crate::dispatch::AppState;
use crate::scenario::Scenario;
use hyper::{Response, StatusCode};
use uuid::Uuid;

pub fn handle_admin(state: &AppState, method: &str, path: &str, body: &[u8]) -> Response<ResponseBody> {
    match path {
        "/_uni/health" => health(state, method),
        "/_uni/metrics" => metrics(state, method),
        p if p == "/_uni/scenarios" || p.starts_with("/_uni/scenarios/") => {
            scenarios(state, method, p, body)
        }
        _ => json_response(StatusCode::NOT_FOUND, &serde_json::json!({"error": "not found"})),
    }
}

fn health(state: &AppState, method: &str) -> Response<ResponseBody> {
    if method != "GET" {
        return method_not_allowed();
    }
    json_response(
        StatusCode::OK,
        &serde_json::json!({"status": "ok", "uptime": state.metrics.uptime_secs()}),
    )
}

fn metrics(state: &AppState, method: &str) -> Response<ResponseBody> {
    if method != "GET" {
        return method_not_allowed();
    }
    json_response(StatusCode::OK, &state.metrics.snapshot())
}

fn scenarios(state: &AppState, method: &str, path: &str, body: &[u8]) -> Response<ResponseBody> {
    let uuid_part = path.strip_prefix("/_uni/scenarios").unwrap_or("");
    let uuid: Option<Uuid> = uuid_part
        .strip_prefix('/')
        .filter(|s| !s.is_empty())
        .and_then(|s| Uuid::parse_str(s).ok());

    match (method, uuid) {
        ("GET", None) => {
            let list: Vec<_> = state.scenarios.list().into_iter().map(scenario_to_json).collect();
            json_response(StatusCode::OK, &serde_json::Value::Array(list))
        }
        ("GET", Some(id)) => match state.scenarios.get(id) {
            Some(s) => json_response(StatusCode::OK, &scenario_to_json(s)),
            None => json_response(StatusCode::NOT_FOUND, &serde_json::json!({"error": "not found"})),
        },
        ("POST", _) => match parse_scenario_config(body) {
            Ok(cfg) => {
                let scenario = scenario_from_config(cfg, Uuid::nil());
                match state.scenarios.create(scenario, true) {
                    Ok(s) => {
                        let location = format!("/_uni/scenarios/{}", s.uuid);
                        Response::builder()
                            .status(StatusCode::CREATED)
                            .header(http::header::LOCATION, location)
                            .header(http::header::CONTENT_TYPE, "application/json")
                            .body(full_body(serde_json::to_vec(&scenario_to_json(s)).unwrap_or_default()))
                            .unwrap_or_else(|_| method_not_allowed())
                    }
                    Err(e) => json_response(e.status(), &serde_json::json!({"error": e.to_string()})),
                }
            }
            Err(resp) => resp,
        },
        ("PUT", Some(id)) => match parse_scenario_config(body) {
            Ok(cfg) => {
                let scenario = scenario_from_config(cfg, id);
                match state.scenarios.update(id, scenario) {
                    Ok(s) => json_response(StatusCode::OK, &scenario_to_json(s)),
                    Err(e) => json_response(e.status(), &serde_json::json!({"error": e.to_string()})),
                }
            }
            Err(resp) => resp,
        },
        ("DELETE", Some(id)) => match state.scenarios.delete(id) {
            Ok(()) => Response::builder()
                .status(StatusCode::NO_CONTENT)
                .body(empty_body())
                .unwrap_or_else(|_| method_not_allowed()),
            Err(e) => json_response(e.status(), &serde_json::json!({"error": e.to_string()})),
        },
        _ => method_not_allowed(),
    }
}

fn parse_scenario_config(body: &[u8]) -> Result<ScenarioConfig, Response<ResponseBody>> {
    serde_json::from_slice(body).map_err(|e| {
        json_response(
            StatusCode::BAD_REQUEST,
            &serde_json::json!({"error": format!("invalid request: {e}")}),
        )
    })
}

fn scenario_from_config(cfg: ScenarioConfig, fallback_uuid: Uuid) -> Scenario {
    Scenario {
        uuid: cfg.uuid.unwrap_or(fallback_uuid),
        request_path: cfg.request_path,
        status_code: cfg.status_code,
        content_type: cfg.content_type,
        location: cfg.location,
        data: cfg.data,
    }
}

fn scenario_to_json(s: Scenario) -> serde_json::Value {
    serde_json::json!({
        "uuid": s.uuid,
        "requestPath": s.request_path,
        "statusCode": s.status_code,
        "contentType": s.content_type,
        "location": s.location,
        "data": s.data,
    })
}

fn method_not_allowed() -> Response<ResponseBody> {
    json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &serde_json::json!({"error": "method not allowed"}),
    )
}

fn json_response(status: StatusCode, value: &serde_json::Value) -> Response<ResponseBody> {
    Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(full_body(serde_json::to_vec(value).unwrap_or_default()))
        .unwrap_or_else(|_| {
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(empty_body())
                .expect("static response is well-formed")
        })
}
