// src/config.rs

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;
use std::{fs, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

#[derive(Error, Debug)]
pub(crate) enum ConfigError {
    #[error("IO error reading config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error in config file: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("YAML parsing error in config file: {0}")]
    YamlParse(#[from] serde_yaml::Error),
    #[error("JSON parsing error in config file: {0}")]
    JsonParse(#[from] serde_json::Error),
    #[error("config file not found: {0}")]
    FileNotFound(String),
    #[error("unrecognized config file extension: {0}")]
    UnknownFormat(String),
}

fn default_baseurl() -> String {
    "/".to_string()
}
fn default_output_dir() -> String {
    "public".to_string()
}
fn default_content_dir() -> String {
    "content".to_string()
}
fn default_assets_dir() -> String {
    "assets".to_string()
}
fn default_theme() -> String {
    "default".to_string()
}
fn default_true() -> bool {
    true
}
fn default_per_page() -> usize {
    10
}
fn default_max_workers() -> usize {
    num_cpus::get()
}
fn default_site_wide_formats() -> Vec<String> {
    vec!["index_json".to_string()]
}
fn default_taxonomies() -> Vec<String> {
    vec!["tags".to_string(), "categories".to_string()]
}
fn default_health_profile() -> HealthProfile {
    HealthProfile::Writer
}
fn default_preprocess_mode() -> PreprocessMode {
    PreprocessMode::Auto
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum PreprocessMode {
    Auto,
    All,
    Smart,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum HealthProfile {
    Writer,
    ThemeDev,
    Dev,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub(crate) struct PaginationConfig {
    #[serde(default = "default_per_page")]
    pub per_page: usize,
}
impl Default for PaginationConfig {
    fn default() -> Self {
        PaginationConfig {
            per_page: default_per_page(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub(crate) struct PreprocessingConfig {
    #[serde(default)]
    pub skip_patterns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub(crate) struct SearchConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}
impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig { enabled: true }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub(crate) struct OutputFormatsConfig {
    #[serde(default = "default_site_wide_formats")]
    pub site_wide: Vec<String>,
}
impl Default for OutputFormatsConfig {
    fn default() -> Self {
        OutputFormatsConfig {
            site_wide: default_site_wide_formats(),
        }
    }
}

fn default_rss_limit() -> usize {
    20
}

/// `config.rss` (§4.14): which section's entries to publish as
/// `/rss.xml`, defaulting to the root blog section if unset.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub(crate) struct RssConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_rss_limit")]
    pub limit: usize,
    #[serde(default)]
    pub section: Option<String>,
}
impl Default for RssConfig {
    fn default() -> Self {
        RssConfig {
            enabled: true,
            limit: default_rss_limit(),
            section: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub(crate) struct HealthConfig {
    #[serde(default = "default_health_profile")]
    pub profile: HealthProfile,
    #[serde(default)]
    pub strict: bool,
}
impl Default for HealthConfig {
    fn default() -> Self {
        HealthConfig {
            profile: default_health_profile(),
            strict: false,
        }
    }
}

/// A single entry in `config.menu.<name>` (§6).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub(crate) struct MenuEntryConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub weight: i64,
    #[serde(default)]
    pub parent: Option<String>,
}

/// Recognized configuration keys (§6), deep-merged with defaults at load
/// time: every field either carries a `#[serde(default...)]` or is itself
/// a `Default`-implementing sub-struct, so a partially-specified user file
/// inherits the rest.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub(crate) struct Config {
    #[serde(default = "default_baseurl")]
    pub baseurl: String,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_content_dir")]
    pub content_dir: String,
    #[serde(default = "default_assets_dir")]
    pub assets_dir: String,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_true")]
    pub pretty_urls: bool,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub strict_mode: bool,
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default = "default_true")]
    pub cache_enabled: bool,
    #[serde(default = "default_preprocess_mode")]
    pub preprocess_mode: PreprocessMode,
    #[serde(default)]
    pub preprocessing: PreprocessingConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub output_formats: OutputFormatsConfig,
    #[serde(default)]
    pub menu: HashMap<String, Vec<MenuEntryConfig>>,
    #[serde(default = "default_taxonomies")]
    pub taxonomies: Vec<String>,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub rss: RssConfig,
    /// Custom variables accessible in templates, carried from the teacher's
    /// `Config::dynamic`.
    #[serde(default)]
    pub dynamic: HashMap<String, String>,
    /// Static files copied verbatim to the output root (favicon.ico, …),
    /// carried from the teacher's `RootStaticConfig`.
    #[serde(default)]
    pub root_static: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            baseurl: default_baseurl(),
            title: String::new(),
            output_dir: default_output_dir(),
            content_dir: default_content_dir(),
            assets_dir: default_assets_dir(),
            theme: default_theme(),
            pretty_urls: true,
            pagination: PaginationConfig::default(),
            strict_mode: false,
            max_workers: default_max_workers(),
            cache_enabled: true,
            preprocess_mode: default_preprocess_mode(),
            preprocessing: PreprocessingConfig::default(),
            search: SearchConfig::default(),
            output_formats: OutputFormatsConfig::default(),
            menu: HashMap::new(),
            taxonomies: default_taxonomies(),
            health: HealthConfig::default(),
            rss: RssConfig::default(),
            dynamic: HashMap::new(),
            root_static: HashMap::new(),
        }
    }
}

enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

fn sniff_format(path: &Path) -> Result<ConfigFormat, ConfigError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => Ok(ConfigFormat::Toml),
        Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
        Some("json") => Ok(ConfigFormat::Json),
        other => Err(ConfigError::UnknownFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

/// Load and deep-merge the effective configuration from `path`. TOML is
/// the primary, first-class format (as in the teacher); YAML and JSON are
/// accepted by extension per §6 ("YAML and JSON must also parse").
#[instrument(fields(path = %path.display()))]
pub(crate) fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            ConfigError::FileNotFound(path.display().to_string())
        } else {
            e.into()
        }
    })?;

    let config: Config = match sniff_format(path)? {
        ConfigFormat::Toml => toml::from_str(&raw)?,
        ConfigFormat::Yaml => serde_yaml::from_str(&raw)?,
        ConfigFormat::Json => serde_json::from_str(&raw)?,
    };

    info!("config::loaded");
    Ok(config)
}

impl Config {
    pub(crate) fn content_dir_path(&self, root: &Path) -> PathBuf {
        root.join(&self.content_dir)
    }
    pub(crate) fn output_dir_path(&self, root: &Path) -> PathBuf {
        root.join(&self.output_dir)
    }
    pub(crate) fn assets_dir_path(&self, root: &Path) -> PathBuf {
        root.join(&self.assets_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_in_missing_keys() {
        let cfg: Config = toml::from_str(r#"title = "My Site""#).unwrap();
        assert_eq!(cfg.title, "My Site");
        assert_eq!(cfg.baseurl, "/");
        assert_eq!(cfg.output_dir, "public");
        assert_eq!(cfg.pagination.per_page, 10);
        assert!(cfg.pretty_urls);
        assert_eq!(cfg.taxonomies, vec!["tags", "categories"]);
    }

    #[test]
    fn yaml_and_json_parse_equivalently() {
        let toml_cfg: Config = toml::from_str(
            r#"title = "S"
baseurl = "/x/""#,
        )
        .unwrap();
        let yaml_cfg: Config = serde_yaml::from_str("title: S\nbaseurl: /x/\n").unwrap();
        let json_cfg: Config = serde_json::from_str(r#"{"title": "S", "baseurl": "/x/"}"#).unwrap();
        assert_eq!(toml_cfg.title, yaml_cfg.title);
        assert_eq!(toml_cfg.baseurl, json_cfg.baseurl);
    }

    #[test]
    fn sniffs_format_by_extension() {
        assert!(matches!(
            sniff_format(Path::new("bengal.toml")).unwrap(),
            ConfigFormat::Toml
        ));
        assert!(matches!(
            sniff_format(Path::new("bengal.yaml")).unwrap(),
            ConfigFormat::Yaml
        ));
        assert!(matches!(
            sniff_format(Path::new("bengal.json")).unwrap(),
            ConfigFormat::Json
        ));
        assert!(sniff_format(Path::new("bengal.ini")).is_err());
    }
}
