//! Config assembly for tests
//!
//! Builds relay configuration from TOML fragments, the same path
//! production configs take.

use relay_config::Config;

/// Fluent builder over TOML fragments
pub struct ConfigBuilder {
    routing: String,
    health: String,
    auth: String,
    providers: Vec<String>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            routing: String::new(),
            health: String::new(),
            auth: String::new(),
            providers: Vec::new(),
        }
    }

    /// Set the `[routing]` section body
    pub fn routing(mut self, toml_body: &str) -> Self {
        self.routing = toml_body.to_owned();
        self
    }

    /// Set the `[health]` sections body
    pub fn health(mut self, toml_body: &str) -> Self {
        self.health = toml_body.to_owned();
        self
    }

    /// Set the `[auth]` section body
    pub fn auth(mut self, toml_body: &str) -> Self {
        self.auth = toml_body.to_owned();
        self
    }

    /// Add one `[[providers]]` entry body
    pub fn provider(mut self, toml_body: &str) -> Self {
        self.providers.push(toml_body.to_owned());
        self
    }

    /// Assemble and validate the config
    pub fn build(self) -> anyhow::Result<Config> {
        let mut text = String::new();

        if !self.routing.is_empty() {
            text.push_str("[routing]\n");
            text.push_str(&self.routing);
            text.push('\n');
        }
        if !self.health.is_empty() {
            text.push_str(&self.health);
            text.push('\n');
        }
        if !self.auth.is_empty() {
            text.push_str("[auth]\n");
            text.push_str(&self.auth);
            text.push('\n');
        }
        for provider in &self.providers {
            text.push_str("[[providers]]\n");
            text.push_str(provider);
            text.push('\n');
        }

        let config: Config = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }
}
