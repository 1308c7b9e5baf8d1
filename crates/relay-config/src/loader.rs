use std::collections::HashSet;
use std::path::Path;

use crate::provider::ProviderKind;
use crate::routing::RoutingStrategy;
use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        let expanded = crate::env::expand_env(&raw)
            .map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self =
            toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if no provider is usable, provider names
    /// collide, a cloud provider is missing its required fields, or
    /// routing references an unknown provider
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_providers()?;
        self.validate_routing()?;
        Ok(())
    }

    fn validate_providers(&self) -> anyhow::Result<()> {
        if !self.providers.iter().any(|p| p.enabled) {
            anyhow::bail!("at least one enabled provider must be configured");
        }

        let mut names = HashSet::new();
        for provider in &self.providers {
            if !names.insert(provider.name.as_str()) {
                anyhow::bail!("duplicate provider name '{}'", provider.name);
            }

            match provider.kind {
                ProviderKind::Bedrock => {
                    if provider.aws_region.is_none() {
                        anyhow::bail!("provider '{}' requires aws_region", provider.name);
                    }
                }
                ProviderKind::Vertex => {
                    if provider.gcp_project_id.is_none() || provider.gcp_region.is_none() {
                        anyhow::bail!(
                            "provider '{}' requires gcp_project_id and gcp_region",
                            provider.name
                        );
                    }
                }
                ProviderKind::Azure => {
                    if provider.azure_resource_name.is_none() {
                        anyhow::bail!("provider '{}' requires azure_resource_name", provider.name);
                    }
                }
                ProviderKind::Anthropic | ProviderKind::Zai | ProviderKind::Ollama => {}
            }
        }

        Ok(())
    }

    fn validate_routing(&self) -> anyhow::Result<()> {
        if self.routing.failover_timeout_ms == 0 {
            anyhow::bail!("routing.failover_timeout_ms must be greater than 0");
        }

        if self.routing.strategy != RoutingStrategy::ModelBased {
            return Ok(());
        }

        let known: HashSet<&str> = self.providers.iter().map(|p| p.name.as_str()).collect();

        for (prefix, target) in &self.routing.model_mapping {
            if !known.contains(target.as_str()) {
                anyhow::bail!("model_mapping prefix '{prefix}' targets unknown provider '{target}'");
            }
        }

        if let Some(ref default) = self.routing.default_provider
            && !known.contains(default.as_str())
        {
            anyhow::bail!("routing.default_provider references unknown provider '{default}'");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    const MINIMAL: &str = r#"
[[providers]]
name = "main"
type = "anthropic"
api_key = "sk-ant-test"
"#;

    fn parse(toml_str: &str) -> anyhow::Result<Config> {
        let config: Config = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn minimal_config_is_valid() {
        let config = parse(MINIMAL).unwrap();
        assert_eq!(config.providers.len(), 1);
        assert_eq!(config.providers[0].name, "main");
        assert!(config.providers[0].enabled);
    }

    #[test]
    fn load_expands_env_placeholders() {
        temp_env::with_var("RELAY_LOADER_KEY", Some("sk-expanded"), || {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            write!(
                file,
                "[[providers]]\nname = \"main\"\ntype = \"anthropic\"\napi_key = \"{{{{ env.RELAY_LOADER_KEY }}}}\"\n"
            )
            .unwrap();

            let config = Config::load(file.path()).unwrap();
            assert_eq!(config.providers.len(), 1);
        });
    }

    #[test]
    fn empty_provider_list_is_rejected() {
        let err = parse("[server]\n").unwrap_err();
        assert!(err.to_string().contains("at least one enabled provider"));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let toml_str = r#"
[[providers]]
name = "dup"
type = "anthropic"

[[providers]]
name = "dup"
type = "zai"
"#;
        let err = parse(toml_str).unwrap_err();
        assert!(err.to_string().contains("duplicate provider name"));
    }

    #[test]
    fn bedrock_requires_region() {
        let toml_str = r#"
[[providers]]
name = "aws"
type = "bedrock"
"#;
        let err = parse(toml_str).unwrap_err();
        assert!(err.to_string().contains("aws_region"));
    }

    #[test]
    fn model_mapping_must_target_known_provider() {
        let toml_str = r#"
[routing]
strategy = "model_based"
model_mapping = { "claude-" = "nonexistent" }

[[providers]]
name = "main"
type = "anthropic"
"#;
        let err = parse(toml_str).unwrap_err();
        assert!(err.to_string().contains("unknown provider 'nonexistent'"));
    }

    #[test]
    fn model_based_with_valid_mapping_passes() {
        let toml_str = r#"
[routing]
strategy = "model_based"
default_provider = "main"

[routing.model_mapping]
"claude-" = "main"

[[providers]]
name = "main"
type = "anthropic"
"#;
        let config = parse(toml_str).unwrap();
        assert_eq!(config.routing.model_mapping.len(), 1);
    }
}
