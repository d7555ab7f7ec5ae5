//! Settings shared by every crate.
//!
//! Defaults are overlaid by `config.toml`, then the overlay file picked by
//! `RUST_ENV`, then `APP_`-prefixed environment variables. Configured paths
//! go through [`resolve_with_base`] before use.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_from(Path::new("."), &env_name)
    }

    /// Loads `config.toml` and the environment overlay found in `dir`.
    pub fn load_from(dir: &Path, env_name: &str) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(CompendiumSettings::default()))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{}': {}", key, e)))
    }

    pub fn settings(&self) -> Result<CompendiumSettings> {
        self.figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompendiumSettings {
    pub data: DataSettings,
    /// Commit order matters: each source is resolved against the ones before it.
    pub sources: Vec<SourceSettings>,
    pub search: SearchSettings,
    pub resolver: ResolverSettings,
    pub limiter: LimiterSettings,
}

impl CompendiumSettings {
    pub fn validate(&self) -> Result<()> {
        if self.resolver.candidates == 0 {
            return Err(Error::InvalidConfig("resolver.candidates must be at least 1".into()));
        }
        if !(self.limiter.tasks_per_second > 0.0) {
            return Err(Error::InvalidConfig("limiter.tasks_per_second must be positive".into()));
        }
        if self.limiter.max_concurrent == 0 {
            return Err(Error::InvalidConfig("limiter.max_concurrent must be at least 1".into()));
        }
        let mut seen = std::collections::HashSet::new();
        for source in &self.sources {
            if !seen.insert(source.name.as_str()) {
                return Err(Error::InvalidConfig(format!("duplicate source '{}'", source.name)));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub index_dir: String,
    pub dump_dir: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self { index_dir: "indexes".to_string(), dump_dir: "dumps".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSettings {
    pub name: String,
    /// `.jsonl` file or directory of shards, relative to `data.dump_dir`.
    pub dump: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub default_limit: usize,
}

impl Default for SearchSettings {
    fn default() -> Self { Self { default_limit: 10 } }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    pub candidates: usize,
    pub release_window_days: i64,
    pub name_phrase_score: f32,
    pub release_boost: f32,
    pub developer_boost: f32,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            candidates: 5,
            release_window_days: 14,
            name_phrase_score: 100_000.0,
            release_boost: 10.0,
            developer_boost: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterSettings {
    pub tasks_per_second: f64,
    pub max_concurrent: usize,
    pub backoff_unit_secs: f64,
}

impl Default for LimiterSettings {
    fn default() -> Self {
        Self { tasks_per_second: 4.0, max_concurrent: 6, backoff_unit_secs: 1.0 }
    }
}

/// Expands `~` and `$VAR`/`${VAR}` in a configured path. When a variable is
/// unset the variables are left as written.
pub fn expand_path(raw: impl AsRef<str>) -> PathBuf {
    let raw = raw.as_ref();
    let with_vars = shellexpand::env(raw).unwrap_or(Cow::Borrowed(raw));
    PathBuf::from(shellexpand::tilde(&with_vars).into_owned())
}

/// Relative paths land under `base`; absolute ones are kept as expanded.
pub fn resolve_with_base(base: &Path, configured: impl AsRef<str>) -> PathBuf {
    let path = expand_path(configured);
    if path.is_relative() { base.join(path) } else { path }
}
