// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Harness configuration
//!
//! Layers, later ones winning key by key: built-in defaults, the user file
//! (`<config dir>/spacey/harness.toml`), the project file
//! (`./spacey-harness.toml` or `--config`), then environment variables.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use spacey_resolve::{DEFAULT_EXTENSIONS, ResolverOptions, SourceFieldPolicy};
use spacey_sandbox::SandboxConfig;
use std::path::{Path, PathBuf};

/// Project config file name
pub const PROJECT_CONFIG: &str = "spacey-harness.toml";

/// Resolver section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Extensions probed in order
    pub extensions: Vec<String>,
    /// `source` field selection
    pub source: SourceFieldPolicy,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            source: SourceFieldPolicy::default(),
        }
    }
}

/// Sandbox section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxSection {
    /// Executor options
    #[serde(flatten)]
    pub options: SandboxConfig,
    /// Log filter used when `--verbose` is not given
    pub log_level: String,
}

impl Default for SandboxSection {
    fn default() -> Self {
        Self {
            options: SandboxConfig::default(),
            log_level: "warn".to_string(),
        }
    }
}

/// Configuration for the harness binary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Module resolution
    pub resolver: ResolverConfig,
    /// Bundle execution
    pub sandbox: SandboxSection,
}

impl HarnessConfig {
    /// Load every layer; `explicit` replaces the project file and must exist
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(user) = user_config_path() {
            if user.exists() {
                config.merge_from_file(&user)?;
            }
        }

        match explicit {
            Some(path) if !path.exists() => bail!("config file not found: {}", path.display()),
            Some(path) => config.merge_from_file(path)?,
            None => {
                let project = PathBuf::from(PROJECT_CONFIG);
                if project.exists() {
                    config.merge_from_file(&project)?;
                }
            }
        }

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Overlay the keys present in a TOML file
    pub fn merge_from_file(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let overlay: toml::Table = content
            .parse()
            .with_context(|| format!("invalid TOML in {}", path.display()))?;
        self.merge(overlay)
            .with_context(|| format!("invalid configuration in {}", path.display()))
    }

    fn merge(&mut self, overlay: toml::Table) -> Result<()> {
        let mut base = toml::Value::try_from(&*self)?;
        merge_values(&mut base, toml::Value::Table(overlay));
        *self = base.try_into()?;
        Ok(())
    }

    /// Apply `SPACEY_BUILD_ENV` and `SPACEY_LOG`
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(build_env) = var("SPACEY_BUILD_ENV") {
            self.resolver.source.production = build_env == "production";
        }
        if let Some(level) = var("SPACEY_LOG") {
            self.sandbox.log_level = level;
        }
    }

    /// Options for a resolver
    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions::default()
            .with_extensions(&self.resolver.extensions)
            .with_source_policy(self.resolver.source.clone())
    }

    /// Options for a sandbox
    pub fn sandbox_config(&self) -> SandboxConfig {
        self.sandbox.options.clone()
    }
}

fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("spacey").join("harness.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::default();
        assert_eq!(config.resolver.extensions, vec![".js", ".json", ".node"]);
        assert_eq!(config.resolver.source.internal_prefix, "@spacey/");
        assert_eq!(config.sandbox.options.output_global, "output");
        assert_eq!(config.sandbox.options.loader_prefix, "parcelRequire");
        assert_eq!(config.sandbox.options.max_require_depth, 256);
        assert_eq!(config.sandbox.log_level, "warn");
    }

    #[test]
    fn test_layers_merge_key_by_key() {
        let dir = TempDir::new().unwrap();
        let user = dir.path().join("user.toml");
        let project = dir.path().join("project.toml");
        std::fs::write(
            &user,
            "[resolver]\nextensions = [\".ts\", \".js\"]\n\n[sandbox]\nmax_require_depth = 16\n",
        )
        .unwrap();
        std::fs::write(
            &project,
            "[resolver.source]\ninternal_prefix = \"@acme/\"\n\n[sandbox]\noutput_global = \"result\"\n",
        )
        .unwrap();

        let mut config = HarnessConfig::default();
        config.merge_from_file(&user).unwrap();
        config.merge_from_file(&project).unwrap();

        assert_eq!(config.resolver.extensions, vec![".ts", ".js"]);
        assert_eq!(config.resolver.source.internal_prefix, "@acme/");
        assert!(!config.resolver.source.production);
        assert_eq!(config.sandbox.options.max_require_depth, 16);
        assert_eq!(config.sandbox.options.output_global, "result");
        assert_eq!(config.sandbox.options.loader_prefix, "parcelRequire");
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[sandbox]\nmax_require_depth = \"deep\"\n").unwrap();

        let mut config = HarnessConfig::default();
        assert!(config.merge_from_file(&path).is_err());
        assert!(HarnessConfig::load(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn test_environment_overrides() {
        let vars: HashMap<&str, &str> =
            [("SPACEY_BUILD_ENV", "production"), ("SPACEY_LOG", "debug")].into();
        let mut config = HarnessConfig::default();
        config.apply_env(|key| vars.get(key).map(|v| v.to_string()));

        assert!(config.resolver.source.production);
        assert_eq!(config.sandbox.log_level, "debug");
        assert!(config.resolver_options().source_policy.production);
    }
}
