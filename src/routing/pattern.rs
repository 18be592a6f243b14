//! Path-pattern compilation and matching (section selection, C1).

use crate::error::MockError;

/// A single compiled pattern segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    /// Matches exactly one path segment.
    Star,
    /// Matches zero or more trailing path segments. Only legal as the
    /// final segment of a pattern.
    DoubleStar,
}

/// A pattern compiled once at config-load time.
#[derive(Debug, Clone)]
pub struct Pattern {
    segments: Vec<Segment>,
    case_sensitive: bool,
}

impl Pattern {
    pub fn compile(raw: &str, case_sensitive: bool) -> Result<Self, MockError> {
        let segments = compile_segments(raw)?;
        Ok(Self {
            segments,
            case_sensitive,
        })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Whether `path` (already split on `/`) matches this pattern for the
    /// purpose of section selection. The trailing wildcard segment, if
    /// any, is optional — this lets a pattern like `/users/*` select both
    /// the collection path `/users` and an item path `/users/123`.
    pub fn matches(&self, path: &[&str]) -> bool {
        match_segments(&self.segments, path, self.case_sensitive)
    }

    /// The literal prefix of the pattern, joined with `/`, used as the
    /// collection base path for `GetByPath` on a GET against the section
    /// root (spec §4.6).
    pub fn literal_prefix(&self) -> String {
        let prefix: Vec<&str> = self
            .segments
            .iter()
            .take_while(|s| matches!(s, Segment::Literal(_)))
            .map(|s| match s {
                Segment::Literal(s) => s.as_str(),
                _ => unreachable!(),
            })
            .collect();
        format!("/{}", prefix.join("/"))
    }
}

fn compile_segments(raw: &str) -> Result<Vec<Segment>, MockError> {
    let parts: Vec<&str> = raw.split('/').filter(|s| !s.is_empty()).collect();
    let mut segments = Vec::with_capacity(parts.len());
    for (i, part) in parts.iter().enumerate() {
        let seg = match *part {
            "**" => {
                if i != parts.len() - 1 {
                    return Err(MockError::Internal(format!(
                        "pattern '{}': '**' is only legal as the final segment",
                        raw
                    )));
                }
                Segment::DoubleStar
            }
            "*" => Segment::Star,
            lit => Segment::Literal(lit.to_string()),
        };
        segments.push(seg);
    }
    Ok(segments)
}

fn match_segments(segments: &[Segment], path: &[&str], case_sensitive: bool) -> bool {
    if segments.is_empty() {
        return path.is_empty();
    }
    let last_idx = segments.len() - 1;
    let mut ri = 0usize;
    for seg in &segments[..last_idx] {
        if ri >= path.len() {
            return false;
        }
        match seg {
            Segment::Literal(lit) => {
                if !segment_eq(path[ri], lit, case_sensitive) {
                    return false;
                }
            }
            Segment::Star => {}
            Segment::DoubleStar => unreachable!("DoubleStar is only legal as the final segment"),
        }
        ri += 1;
    }

    let remaining = path.len() - ri;
    match &segments[last_idx] {
        Segment::Literal(lit) => remaining == 1 && segment_eq(path[ri], lit, case_sensitive),
        Segment::Star => remaining == 0 || remaining == 1,
        Segment::DoubleStar => true,
    }
}

fn segment_eq(path_seg: &str, pattern_seg: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        path_seg == pattern_seg
    } else {
        path_seg.eq_ignore_ascii_case(pattern_seg)
    }
}

/// Split a request path into non-empty segments, stripping any query
/// string first (mirrors the teacher's `split_uri_segments` ignoring the
/// query string before tree matching).
pub fn split_path(path: &str) -> Vec<&str> {
    let path = path.split('?').next().unwrap_or("");
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Strip a trailing slash from a path, leaving `"/"` as `""` is not
/// produced — an empty path stays empty, `"/a/"` becomes `"/a"`.
pub fn normalize_path(path: &str) -> String {
    let path = path.split('?').next().unwrap_or("");
    if path.len() > 1 && path.ends_with('/') {
        path.trim_end_matches('/').to_string()
    } else {
        path.to_string()
    }
}

/// Given compiled pattern segments and the already-split request path
/// segments, derive the identifier occupying the final "extension" slot,
/// per spec §4.2 GET/HEAD/PUT/DELETE id-extraction rules. Returns `None`
/// for a pure collection request, or when the trailing segment equals
/// `section_name` (never treated as an id).
pub fn extract_extension_id<'a>(
    segments: &[Segment],
    path: &[&'a str],
    section_name: &str,
) -> Option<&'a str> {
    let p_len = segments.len();
    let r_len = path.len();
    let candidate = match segments.last() {
        Some(Segment::DoubleStar) if r_len > p_len.saturating_sub(1) => path.last().copied(),
        Some(Segment::Star) if r_len == p_len => path.last().copied(),
        Some(Segment::Literal(_)) | None
            if !segments.iter().any(|s| !matches!(s, Segment::Literal(_))) && r_len > p_len =>
        {
            path.last().copied()
        }
        _ => None,
    };
    candidate.filter(|id| *id != section_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(p: &str) -> Vec<&str> {
        split_path(p)
    }

    #[test]
    fn star_matches_single_segment_but_not_two() {
        let pat = Pattern::compile("/a/*", true).unwrap();
        assert!(pat.matches(&split("/a/x")));
        assert!(!pat.matches(&split("/a/x/y")));
        assert!(pat.matches(&split("/a")));
    }

    #[test]
    fn double_star_matches_any_depth() {
        let pat = Pattern::compile("/a/**", true).unwrap();
        assert!(pat.matches(&split("/a")));
        assert!(pat.matches(&split("/a/x")));
        assert!(pat.matches(&split("/a/x/y")));
    }

    #[test]
    fn double_star_not_last_is_config_error() {
        assert!(Pattern::compile("/a/**/b", true).is_err());
    }

    #[test]
    fn case_insensitive_literal() {
        let pat = Pattern::compile("/Users/*", false).unwrap();
        assert!(pat.matches(&split("/users/1")));
    }

    #[test]
    fn case_sensitive_literal_rejects_mismatch() {
        let pat = Pattern::compile("/Users/*", true).unwrap();
        assert!(!pat.matches(&split("/users/1")));
    }

    #[test]
    fn extension_id_rejects_section_name() {
        let pat = Pattern::compile("/users/*", true).unwrap();
        let path = split("/users/users");
        assert_eq!(
            extract_extension_id(pat.segments(), &path, "users"),
            None
        );
    }

    #[test]
    fn extension_id_from_double_star() {
        let pat = Pattern::compile("/users/**", true).unwrap();
        let path = split("/users/subpath/1");
        assert_eq!(
            extract_extension_id(pat.segments(), &path, "users"),
            Some("1")
        );
    }

    #[test]
    fn literal_prefix_for_collection_lookup() {
        let pat = Pattern::compile("/users/*", true).unwrap();
        assert_eq!(pat.literal_prefix(), "/users");
    }
}
