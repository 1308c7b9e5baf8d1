use indexmap::IndexMap;

use crate::error::RouteError;

/// Narrows the candidate set by model-name prefix
///
/// Used when `routing.strategy = "model_based"`: the first mapping
/// prefix (in declaration order) that the model starts with designates
/// the provider. Matching is literal, never regex.
pub struct ModelFilter {
    mapping: IndexMap<String, String>,
    default_provider: Option<String>,
}

impl ModelFilter {
    /// Create a filter from the configured mapping and fallback
    pub fn new(mapping: IndexMap<String, String>, default_provider: Option<String>) -> Self {
        Self {
            mapping,
            default_provider,
        }
    }

    /// Resolve a model name to a provider name
    ///
    /// `known` reports whether a provider name is currently routable;
    /// mapped-but-unknown names fall through to the default provider.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedModel` when neither a mapping prefix nor a
    /// usable default applies.
    pub fn resolve(
        &self,
        model: &str,
        known: impl Fn(&str) -> bool,
    ) -> Result<&str, RouteError> {
        let matched = self
            .mapping
            .iter()
            .find(|(prefix, _)| model.starts_with(prefix.as_str()))
            .map(|(_, provider)| provider.as_str());

        if let Some(provider) = matched {
            if known(provider) {
                return Ok(provider);
            }
            tracing::warn!(
                model,
                provider,
                "model mapping targets unavailable provider, using default"
            );
        }

        match self.default_provider.as_deref() {
            Some(default) if known(default) => Ok(default),
            _ => Err(RouteError::UnsupportedModel(model.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(pairs: &[(&str, &str)], default: Option<&str>) -> ModelFilter {
        let mapping = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        ModelFilter::new(mapping, default.map(str::to_owned))
    }

    #[test]
    fn prefix_match_designates_provider() {
        let filter = filter(&[("claude-", "anthropic"), ("GLM-", "zai")], None);
        assert_eq!(
            filter.resolve("claude-sonnet-4-5", |_| true).unwrap(),
            "anthropic"
        );
        assert_eq!(filter.resolve("GLM-4.7", |_| true).unwrap(), "zai");
    }

    #[test]
    fn first_match_in_declaration_order_wins() {
        let filter = filter(&[("claude", "first"), ("claude-sonnet", "second")], None);
        assert_eq!(filter.resolve("claude-sonnet-4-5", |_| true).unwrap(), "first");
    }

    #[test]
    fn unknown_target_falls_through_to_default() {
        let filter = filter(&[("claude-", "gone")], Some("fallback"));
        assert_eq!(
            filter.resolve("claude-sonnet-4-5", |p| p == "fallback").unwrap(),
            "fallback"
        );
    }

    #[test]
    fn unmatched_model_uses_default() {
        let filter = filter(&[("claude-", "anthropic")], Some("anthropic"));
        assert_eq!(filter.resolve("gpt-4o", |_| true).unwrap(), "anthropic");
    }

    #[test]
    fn no_match_and_no_default_is_unsupported() {
        let filter = filter(&[("claude-", "anthropic")], None);
        let err = filter.resolve("gpt-4o", |_| true).unwrap_err();
        assert!(matches!(err, RouteError::UnsupportedModel(m) if m == "gpt-4o"));
    }

    #[test]
    fn matching_is_literal_not_regex() {
        let filter = filter(&[("claude.*", "anthropic")], None);
        assert!(filter.resolve("claude-sonnet-4-5", |_| true).is_err());
    }
}
