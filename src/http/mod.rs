//! HTTP adapter (C8): parses the incoming request once into an immutable
//! form, invokes the dispatcher (C6) or the admin surface, and serializes
//! the response. HEAD is derived from GET inside the dispatcher.

pub mod admin;

use crate::dispatch::{self, AppState};
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::convert::Infallible;
use std::sync::Arc;

pub type ResponseBody = BoxBody<Bytes, Infallible>;

pub fn full_body(bytes: Vec<u8>) -> ResponseBody {
    Full::new(Bytes::from(bytes))
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> ResponseBody {
    Empty::new().map_err(|never| match never {}).boxed()
}

/// Buffers the request body (so the id extractor can read it) and routes
/// to the admin surface or the dispatcher based on path.
pub async fn handle(
    state: Arc<AppState>,
    req: Request<Incoming>,
) -> Result<Response<ResponseBody>, Infallible> {
    let method = req.method().as_str().to_string();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(|q| q.to_string());
    let full_path = match &query {
        Some(q) => format!("{path}?{q}"),
        None => path.clone(),
    };
    let headers = req.headers().clone();
    let content_type = headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let body_bytes = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => {
            return Ok(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to read request body",
            ))
        }
    };

    if path.starts_with("/_uni/") {
        return Ok(admin::handle_admin(&state, &method, &path, &body_bytes));
    }

    let resp = dispatch::dispatch(&state, &method, &full_path, &headers, &content_type, &body_bytes);
    Ok(build_response(resp, method == "HEAD"))
}

fn build_response(resp: dispatch::DispatchResponse, _head: bool) -> Response<ResponseBody> {
    let mut builder = Response::builder().status(
        StatusCode::from_u16(resp.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
    );
    if let Some(ct) = &resp.content_type {
        builder = builder.header(http::header::CONTENT_TYPE, ct.as_str());
    }
    if let Some(loc) = &resp.location {
        builder = builder.header(http::header::LOCATION, loc.as_str());
    }
    let body = if resp.body.is_empty() {
        empty_body()
    } else {
        full_body(resp.body)
    };
    builder.body(body).unwrap_or_else(|_| {
        Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .body(empty_body())
            .expect("static response is well-formed")
    })
}

fn error_response(status: StatusCode, reason: &str) -> Response<ResponseBody> {
    Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, "text/plain")
        .body(full_body(reason.as_bytes().to_vec()))
        .unwrap_or_else(|_| {
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(empty_body())
                .expect("static response is well-formed")
        })
}
