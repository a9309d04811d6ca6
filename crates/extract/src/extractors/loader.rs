// ABOUTME: Loads site profiles from embedded or user-supplied JSON.
// ABOUTME: Provides builtin_registry() to assemble the default ExtractorRegistry.

//! Site profile loader.
//!
//! The shipped profiles live in `data/site_profiles.json` and are embedded at
//! compile time. Additional profiles can be parsed from any JSON string with
//! the same shape.

use std::sync::Arc;

use crate::error::ExtractError;
use crate::extractors::engine::ProfileExtractor;
use crate::extractors::profile::SiteProfile;
use crate::registry::ExtractorRegistry;
use crate::transport::Transport;

/// Embedded JSON containing the shipped site profiles.
const BUILTIN_PROFILES_JSON: &str = include_str!("../../data/site_profiles.json");

/// Parses a JSON array of site profiles.
pub fn load_profiles_from_str(json: &str) -> Result<Vec<SiteProfile>, ExtractError> {
    serde_json::from_str(json).map_err(|e| {
        ExtractError::parse(
            "",
            "LoadProfiles",
            Some(anyhow::anyhow!("invalid site profile JSON: {}", e)),
        )
    })
}

/// Parses the embedded site profiles.
pub fn load_builtin_profiles() -> Result<Vec<SiteProfile>, ExtractError> {
    load_profiles_from_str(BUILTIN_PROFILES_JSON)
}

/// Registry with the generic profile as default and every shipped profile bound.
pub fn builtin_registry(transport: Arc<dyn Transport>) -> Result<ExtractorRegistry, ExtractError> {
    let mut registry = ExtractorRegistry::new();
    registry.register_default(Arc::new(ProfileExtractor::new(
        SiteProfile::generic(),
        Arc::clone(&transport),
    )));
    for profile in load_builtin_profiles()? {
        registry.register_profile(profile, Arc::clone(&transport));
    }
    tracing::debug!(domains = registry.len(), "Builtin extractor registry loaded");
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::compiled::get_or_compile;

    #[test]
    fn test_builtin_profiles_parse() {
        let profiles = load_builtin_profiles().unwrap();
        assert!(profiles.len() >= 5);
        assert!(profiles.iter().all(|p| !p.content_selectors.is_empty()));
    }

    #[test]
    fn test_builtin_selectors_compile() {
        for profile in load_builtin_profiles().unwrap() {
            for css in profile.selectors() {
                assert!(
                    get_or_compile(css).is_some(),
                    "{}: selector {:?} does not compile",
                    profile.name,
                    css
                );
            }
        }
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = load_profiles_from_str("{not json").unwrap_err();
        assert!(err.is_parse());
    }
}
