//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `cvrank.toml` + `cvrank.<env>.toml` + `APP_*` env vars.
//! Provides helpers to expand `~` and `${VAR}` and to resolve relative paths
//! against a known base directory.
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};

/// How many ranked results a query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopN {
    All,
    Count(usize),
}

impl FromStr for TopN {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(TopN::All);
        }
        s.parse::<usize>()
            .map(TopN::Count)
            .map_err(|_| Error::InvalidQuery(format!("top must be ALL or a count, got '{s}'")))
    }
}

impl fmt::Display for TopN {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopN::All => f.write_str("ALL"),
            TopN::Count(n) => write!(f, "{n}"),
        }
    }
}

impl Serialize for TopN {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            TopN::All => serializer.serialize_str("ALL"),
            TopN::Count(n) => serializer.serialize_u64(*n as u64),
        }
    }
}

impl<'de> Deserialize<'de> for TopN {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Count(u64),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Count(n) => Ok(TopN::Count(n as usize)),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub archive_dir: String,
    pub matrix_dir: String,
}

impl Default for DataSettings {
    fn default() -> Self { Self { archive_dir: "source/archive".to_string(), matrix_dir: "source/matrix".to_string() } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    Hash,
    Model,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub backend: EmbeddingBackend,
    pub dim: usize,
    pub model_dir: Option<String>,
    pub max_len: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self { Self { backend: EmbeddingBackend::Hash, dim: 1024, model_dir: None, max_len: 256 } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingSettings {
    pub default_top: TopN,
    pub chunk_words: usize,
    pub chunk_overlap_words: usize,
}

impl Default for RankingSettings {
    fn default() -> Self { Self { default_top: TopN::Count(20), chunk_words: 96, chunk_overlap_words: 38 } }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub embedding: EmbeddingSettings,
    pub ranking: RankingSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.embedding.dim == 0 {
            return Err(Error::InvalidConfig("embedding.dim must be positive".to_string()));
        }
        if self.embedding.max_len == 0 {
            return Err(Error::InvalidConfig("embedding.max_len must be positive".to_string()));
        }
        if self.ranking.chunk_words == 0 || self.ranking.chunk_overlap_words >= self.ranking.chunk_words {
            return Err(Error::InvalidConfig(format!(
                "ranking.chunk_overlap_words ({}) must be smaller than ranking.chunk_words ({})",
                self.ranking.chunk_overlap_words, self.ranking.chunk_words
            )));
        }
        if self.ranking.default_top == TopN::Count(0) {
            return Err(Error::InvalidConfig("ranking.default_top must be ALL or at least 1".to_string()));
        }
        if self.embedding.backend == EmbeddingBackend::Model && self.embedding.model_dir.is_none() {
            return Err(Error::InvalidConfig("embedding.model_dir is required for the model backend".to_string()));
        }
        Ok(())
    }

    pub fn archive_dir(&self) -> PathBuf { expand_path(&self.data.archive_dir) }
    pub fn matrix_dir(&self) -> PathBuf { expand_path(&self.data.matrix_dir) }
    pub fn model_dir(&self) -> Option<PathBuf> { self.embedding.model_dir.as_deref().map(expand_path) }
}

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_for_env(&env_name)
    }

    pub fn load_for_env(env_name: &str) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("cvrank.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("cvrank.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("cvrank.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("cvrank.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));
        Ok(Self { figment })
    }

    pub fn from_figment(figment: Figment) -> Self { Self { figment } }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{key}': {e}")))
    }

    /// Typed settings, validated.
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self.figment.extract().map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
