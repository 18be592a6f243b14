use std::fmt;

/// Expected error kinds surfaced by the section engine.
///
/// The dispatcher (`src/dispatch/mod.rs`) is the single place that matches
/// on these variants and turns them into an HTTP response — no other
/// module builds a response from an error directly.
#[derive(Debug)]
pub enum MockError {
    /// No configured section matched the request path.
    NoMatchingSection(String),
    /// A store lookup (by id or by path) found nothing.
    NotFound,
    /// A `Create` collided with an existing composite key.
    Conflict(String),
    /// Malformed request: bad JSON/XML body, missing id on PUT, etc.
    BadRequest(String),
    /// A request- or response-side transformation failed.
    TransformFailed(String),
    /// Any other unexpected internal error.
    Internal(String),
}

impl fmt::Display for MockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MockError::NoMatchingSection(path) => write!(f, "no section matches path '{}'", path),
            MockError::NotFound => write!(f, "resource not found"),
            MockError::Conflict(id) => write!(f, "conflicting id '{}'", id),
            MockError::BadRequest(msg) => write!(f, "invalid request: {}", msg),
            MockError::TransformFailed(msg) => write!(f, "transform failed: {}", msg),
            MockError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for MockError {}

impl MockError {
    /// HTTP status this error maps to at the dispatch boundary.
    pub fn status(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            MockError::NoMatchingSection(_) => StatusCode::NOT_FOUND,
            MockError::NotFound => StatusCode::NOT_FOUND,
            MockError::Conflict(_) => StatusCode::CONFLICT,
            MockError::BadRequest(_) => StatusCode::BAD_REQUEST,
            MockError::TransformFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            MockError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
