use regex::Regex;
use thiserror::Error;

/// Failure to compile a configured normalization pattern.
#[derive(Debug, Error)]
#[error("invalid endpoint rule pattern `{pattern}`: {source}")]
pub struct RuleError {
    pub pattern: String,
    #[source]
    source: regex::Error,
}

/// Ordered endpoint-normalization rules. The first rule whose pattern
/// matches replaces the raw path with its templated form; unmatched paths
/// pass through unchanged. Declaration order resolves overlapping
/// patterns, so it must be preserved exactly as configured.
#[derive(Debug)]
pub struct EndpointRules {
    rules: Vec<(Regex, String)>,
}

impl EndpointRules {
    pub fn new<I, P, R>(pairs: I) -> Result<Self, RuleError>
    where
        I: IntoIterator<Item = (P, R)>,
        P: AsRef<str>,
        R: Into<String>,
    {
        let mut rules = Vec::new();
        for (pattern, replacement) in pairs {
            let pattern = pattern.as_ref();
            let regex = Regex::new(pattern).map_err(|source| RuleError {
                pattern: pattern.to_string(),
                source,
            })?;
            rules.push((regex, replacement.into()));
        }
        Ok(Self { rules })
    }

    /// The rule set for the target API's identifier-bearing paths. Matches
    /// hex object ids, hyphenated UUIDs, and an alphanumeric fallback per
    /// resource, in that order.
    pub fn default_rules() -> Self {
        Self::new([
            (r"/api/v1/forms/[a-fA-F0-9]{24}$", "/api/v1/forms/{id}"),
            (r"/api/v1/forms/[a-fA-F0-9-]{36}$", "/api/v1/forms/{id}"),
            (r"/api/v1/forms/[a-zA-Z0-9]+$", "/api/v1/forms/{id}"),
            (
                r"/api/v1/organizations/[a-fA-F0-9]{24}$",
                "/api/v1/organizations/{id}",
            ),
            (
                r"/api/v1/organizations/[a-fA-F0-9-]{36}$",
                "/api/v1/organizations/{id}",
            ),
            (
                r"/api/v1/organizations/[a-zA-Z0-9]+$",
                "/api/v1/organizations/{id}",
            ),
        ])
        .expect("default endpoint rules are valid")
    }

    pub fn normalize<'a>(&'a self, endpoint: &'a str) -> &'a str {
        for (regex, replacement) in &self.rules {
            if regex.is_match(endpoint) {
                return replacement;
            }
        }
        endpoint
    }

    /// Aggregation key for the per-endpoint breakdown.
    pub fn key(&self, method: &str, endpoint: &str) -> String {
        format!("{} {}", method, self.normalize(endpoint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_ids_collapse_to_one_template() {
        let rules = EndpointRules::default_rules();
        assert_eq!(
            rules.normalize("/api/v1/forms/64f1a2b3c4d5e6f7a8b9c0d1"),
            "/api/v1/forms/{id}"
        );
        assert_eq!(
            rules.normalize("/api/v1/forms/aaaaaaaaaaaaaaaaaaaaaaaa"),
            "/api/v1/forms/{id}"
        );
    }

    #[test]
    fn test_uuid_and_alphanumeric_fallback() {
        let rules = EndpointRules::default_rules();
        assert_eq!(
            rules.normalize("/api/v1/organizations/64f1a2b3-c4d5-e6f7-a8b9-c0d1e2f3a4b5"),
            "/api/v1/organizations/{id}"
        );
        assert_eq!(
            rules.normalize("/api/v1/organizations/myOrg42"),
            "/api/v1/organizations/{id}"
        );
    }

    #[test]
    fn test_unmatched_path_passes_through() {
        let rules = EndpointRules::default_rules();
        assert_eq!(rules.normalize("/api/v1/forms"), "/api/v1/forms");
        assert_eq!(
            rules.normalize("/api/v1/auth/register"),
            "/api/v1/auth/register"
        );
    }

    #[test]
    fn test_first_declared_rule_wins() {
        // Both rules match a 4-hex suffix; declaration order decides.
        let rules = EndpointRules::new([
            (r"/things/[a-f0-9]+$", "/things/{hex}"),
            (r"/things/[a-z0-9]+$", "/things/{any}"),
        ])
        .unwrap();
        assert_eq!(rules.normalize("/things/beef"), "/things/{hex}");
        assert_eq!(rules.normalize("/things/zzz9"), "/things/{any}");
    }

    #[test]
    fn test_stats_path_matches_alphanumeric_fallback() {
        // Known overlap in the default set: the alphanumeric fallback also
        // captures the literal `stats` segment.
        let rules = EndpointRules::default_rules();
        assert_eq!(rules.normalize("/api/v1/forms/stats"), "/api/v1/forms/{id}");
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let err = EndpointRules::new([(r"/broken/[", "/broken/{id}")]).unwrap_err();
        assert!(err.pattern.contains("/broken/["));
    }

    #[test]
    fn test_breakdown_key_includes_method() {
        let rules = EndpointRules::default_rules();
        assert_eq!(
            rules.key("GET", "/api/v1/forms/64f1a2b3c4d5e6f7a8b9c0d1"),
            "GET /api/v1/forms/{id}"
        );
    }
}
