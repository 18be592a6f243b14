pub mod types;

#[cfg(test)]
mod tests;

pub use types::*;

use anyhow::Result;
use std::path::Path;

impl AppConfig {
    /// Load configuration from a file (if it exists) and apply environment
    /// variable overrides. When the file does not exist, built-in defaults
    /// are used — allowing the server to start with zero configuration.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config: AppConfig = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            match path.extension().and_then(|e| e.to_str()) {
                Some("toml") => toml::from_str(&content)?,
                Some("json") => serde_json::from_str(&content)?,
                Some(ext) => anyhow::bail!("unsupported config format: .{ext}, use .toml or .json"),
                None => anyhow::bail!("config file has no extension, use .toml or .json"),
            }
        } else {
            tracing::info!(
                "config file not found at {}, using defaults",
                path.display()
            );
            AppConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        tracing::info!(sections = config.sections.len(), "loaded configuration");
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("UNIMOCK_LISTEN") {
            self.listen = Some(v);
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, section) in &self.sections {
            if section.path_pattern.is_empty() {
                anyhow::bail!("section '{name}' has an empty path_pattern");
            }
            // Compiling here surfaces the '**' non-trailing config error
            // (spec.md §9 open question (a)) at load time rather than on
            // first request.
            crate::routing::Pattern::compile(&section.path_pattern, section.case_sensitive)
                .map_err(|e| anyhow::anyhow!("section '{name}': {e}"))?;
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        self.listen
            .clone()
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
    }
}
