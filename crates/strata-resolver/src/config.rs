use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Member scopes kept per session. `None` keeps all of them.
    pub scope_cache_capacity: Option<usize>,
    /// Structure entries kept per session. `None` keeps all of them.
    pub structure_cache_capacity: Option<usize>,
    /// Longest dependency chain a single request may follow.
    pub max_depth: usize,
    /// Consult the modification trackers when a request first touches a session.
    pub check_modifications: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            scope_cache_capacity: Some(512),
            structure_cache_capacity: Some(1024),
            max_depth: 512,
            check_modifications: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let config: ResolverConfig =
            serde_json::from_str(r#"{ "scope_cache_capacity": null, "max_depth": 8 }"#).unwrap();

        assert_eq!(config.scope_cache_capacity, None);
        assert_eq!(config.structure_cache_capacity, Some(1024));
        assert_eq!(config.max_depth, 8);
        assert!(config.check_modifications);
    }
}
