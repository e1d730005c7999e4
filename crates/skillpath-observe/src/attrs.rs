//! Span attribute names.
//!
//! All constants are string slices usable as `{ CONST } = value` field names
//! in `tracing::span!` and `tracing::info_span!`.
//!
//! Span naming convention: `"{surface} {operation}"` (e.g., `"http complete_skill"`).

/// Opaque id of the learner a request acts for.
pub const LEARNER_ID: &str = "skillpath.learner.id";

/// Learning path id.
pub const PATH_ID: &str = "skillpath.path.id";

/// Skill id.
pub const SKILL_ID: &str = "skillpath.skill.id";

/// The operation being performed (e.g., "start_skill", "get_path_snapshot").
pub const OPERATION: &str = "skillpath.operation";

/// Per-request correlation id assigned at the HTTP edge.
pub const REQUEST_ID: &str = "skillpath.request.id";

/// HTTP method of an API request.
pub const HTTP_METHOD: &str = "http.request.method";

/// Matched route or raw path of an API request.
pub const HTTP_ROUTE: &str = "http.route";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_names_are_namespaced_and_unique() {
        let names = [LEARNER_ID, PATH_ID, SKILL_ID, OPERATION, REQUEST_ID, HTTP_METHOD, HTTP_ROUTE];
        let mut seen = std::collections::HashSet::new();
        for name in names {
            assert!(name.contains('.'), "{name} should be namespaced");
            assert!(seen.insert(name), "{name} is duplicated");
        }
    }
}
