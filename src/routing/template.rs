//! Route templates as metric labels.
//!
//! Routes are registered in axum syntax (`/users/{id}`) but reported in the
//! colon form (`/users/:id`). Raw request paths never become labels.

use axum::extract::MatchedPath;

use crate::observability::metrics::UNKNOWN_ROUTE;

/// Convert `{name}` and `{*name}` segments to `:name` and `*name`.
pub fn normalize(template: &str) -> String {
    template
        .split('/')
        .map(|segment| {
            match segment
                .strip_prefix('{')
                .and_then(|s| s.strip_suffix('}'))
            {
                Some(name) if name.starts_with('*') => name.to_string(),
                Some(name) => format!(":{name}"),
                None => segment.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Label for a request: its normalized template, or `unknown` when nothing matched.
pub fn route_label(matched: Option<&MatchedPath>) -> String {
    matched
        .map(|m| normalize(m.as_str()))
        .unwrap_or_else(|| UNKNOWN_ROUTE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_parameters() {
        assert_eq!(normalize("/api/v1/users/{id}"), "/api/v1/users/:id");
        assert_eq!(normalize("/files/{*path}"), "/files/*path");
        assert_eq!(normalize("/health"), "/health");
        assert_eq!(normalize("/"), "/");
    }

    #[test]
    fn unmatched_is_unknown() {
        assert_eq!(route_label(None), "unknown");
    }
}
