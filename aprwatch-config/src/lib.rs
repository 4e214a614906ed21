//! Loader for aprwatch configuration with YAML + environment overlays.
//!
//! Precedence, lowest first: built-in defaults, the YAML file (optional),
//! `APRWATCH__`-prefixed environment variables (`__` separates nesting, e.g.
//! `APRWATCH__BROWSER__HEADLESS=false`). `${VAR}` placeholders inside string
//! values are expanded after merging.
//!
//! ```yaml
//! browser:
//!   webdriver_url: http://localhost:9515
//!   ready_timeout_ms: 20000
//! farms:
//!   base_url: https://app.ref.finance
//!   targets:
//!     - id: 3514-r
//!       output_field: linearApr
//!       route: { kind: per_target, prefix: v2farms }
//!       addressing: { strategy: attribute_substring, attribute: data-farm-id }
//! feed:
//!   mappings:
//!     - { pool_id: 11, name: xTRI_stNEAR }
//! ```
use aprwatch_common::{FeedMapping, Target};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const ENV_PREFIX: &str = "APRWATCH";

/// Default configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "aprwatch.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error(transparent)]
    Source(#[from] ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AprwatchConfig {
    pub version: Option<String>,
    pub browser: BrowserConfig,
    pub farms: FarmsConfig,
    pub feed: FeedConfig,
}

/// WebDriver session settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub webdriver_url: String,
    pub headless: bool,
    /// Bound on waiting for a page's readiness selector.
    pub ready_timeout_ms: u64,
    pub window_width: u32,
    pub window_height: u32,
    pub user_agent: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            headless: true,
            ready_timeout_ms: 20_000,
            window_width: 1920,
            window_height: 1080,
            user_agent: None,
        }
    }
}

impl BrowserConfig {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }
}

/// Browser-rendered farm pages and where their results go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FarmsConfig {
    pub base_url: String,
    pub output: PathBuf,
    /// Diagnostic capture written when an extraction fails.
    pub screenshot: PathBuf,
    /// Nested node holding the percentage text inside a farm panel.
    pub label_selector: String,
    pub targets: Vec<Target>,
}

impl Default for FarmsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://app.ref.finance".to_string(),
            output: PathBuf::from("farm-apr.json"),
            screenshot: PathBuf::from("farm-failure.png"),
            label_selector: r#"div[data-type="info"]"#.to_string(),
            targets: vec![
                Target::new("1889", "octStNearApr"),
                Target::new("1923", "metaStNearApr"),
                Target::new("535", "wNearStNearApr"),
            ],
        }
    }
}

/// The public JSON feed and the pools read from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub url: String,
    pub output: PathBuf,
    pub timeout_ms: u64,
    pub mappings: Vec<FeedMapping>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: "https://cdn.trisolaris.io/datav2.json".to_string(),
            output: PathBuf::from("feed-apr.json"),
            timeout_ms: 15_000,
            mappings: vec![
                FeedMapping::new(11, "xTRI_stNEAR"),
                FeedMapping::new(5, "TRI_wNEAR"),
                FeedMapping::new(12, "stNEAR_wNear"),
            ],
        }
    }
}

impl FeedConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn url(&self) -> Result<Url, ConfigLoadError> {
        parse_url("feed.url", &self.url)
    }
}

impl FarmsConfig {
    pub fn base_url(&self) -> Result<Url, ConfigLoadError> {
        parse_url("farms.base_url", &self.base_url)
    }
}

fn parse_url(key: &str, raw: &str) -> Result<Url, ConfigLoadError> {
    Url::parse(raw).map_err(|e| ConfigLoadError::Invalid(format!("{key} {raw:?}: {e}")))
}

impl AprwatchConfig {
    /// Reject configurations that would silently overwrite results.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.browser.ready_timeout_ms == 0 {
            return Err(ConfigLoadError::Invalid(
                "browser.ready_timeout_ms must be positive".into(),
            ));
        }

        let base_url = self.farms.base_url()?;
        self.feed.url()?;

        let mut fields = HashSet::new();
        for target in &self.farms.targets {
            if target.id.trim().is_empty() {
                return Err(ConfigLoadError::Invalid("farm target with empty id".into()));
            }
            if target.output_field.trim().is_empty() {
                return Err(ConfigLoadError::Invalid(format!(
                    "farm target {} has an empty output_field",
                    target.id
                )));
            }
            if !fields.insert(target.output_field.as_str()) {
                return Err(ConfigLoadError::Invalid(format!(
                    "duplicate farm output_field {}",
                    target.output_field
                )));
            }
            target.url(&base_url).map_err(|e| {
                ConfigLoadError::Invalid(format!("farm target {}: {e}", target.id))
            })?;
        }

        let mut names = HashSet::new();
        for mapping in &self.feed.mappings {
            if mapping.name.trim().is_empty() {
                return Err(ConfigLoadError::Invalid(format!(
                    "feed mapping for pool {} has an empty name",
                    mapping.pool_id
                )));
            }
            if !names.insert(mapping.name.as_str()) {
                return Err(ConfigLoadError::Invalid(format!(
                    "duplicate feed mapping name {}",
                    mapping.name
                )));
            }
        }
        Ok(())
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hiding the `config` crate wiring (YAML + env overrides).
pub struct AprwatchConfigLoader {
    files: Vec<(PathBuf, bool)>,
    inline: Vec<String>,
    env: bool,
}

impl Default for AprwatchConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl AprwatchConfigLoader {
    /// Start from built-in defaults with `APRWATCH__` env overrides enabled.
    ///
    /// ```
    /// use aprwatch_config::AprwatchConfigLoader;
    ///
    /// let config = AprwatchConfigLoader::new()
    ///     .without_env()
    ///     .with_yaml_str("browser:\n  headless: false")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert!(!config.browser.headless);
    /// assert_eq!(config.browser.ready_timeout_ms, 20_000);
    /// assert_eq!(config.farms.targets.len(), 3);
    /// ```
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            inline: Vec::new(),
            env: true,
        }
    }

    /// Attach a file that must exist; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files.push((path.as_ref().to_path_buf(), true));
        self
    }

    /// Attach a file that is read only when present.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files.push((path.as_ref().to_path_buf(), false));
        self
    }

    /// Merge an inline YAML snippet (tests and CLI).
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.inline.push(yaml.to_string());
        self
    }

    /// Ignore `APRWATCH__*` environment variables.
    pub fn without_env(mut self) -> Self {
        self.env = false;
        self
    }

    /// Merge all sources, expand `${VAR}` placeholders, deserialize and validate.
    ///
    /// ```
    /// use aprwatch_config::AprwatchConfigLoader;
    /// use aprwatch_common::{AddressingKind, PageRoute};
    ///
    /// let config = AprwatchConfigLoader::new()
    ///     .without_env()
    ///     .with_yaml_str(r#"
    /// farms:
    ///   targets:
    ///     - id: 3514-r
    ///       output_field: linearApr
    ///       route: { kind: per_target, prefix: v2farms }
    ///       addressing: { strategy: attribute_substring }
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// let target = &config.farms.targets[0];
    /// assert_eq!(target.id, "3514-r");
    /// assert_eq!(target.route, PageRoute::PerTarget { prefix: "v2farms".into() });
    /// assert!(matches!(target.addressing, AddressingKind::AttributeSubstring { .. }));
    /// ```
    pub fn load(self) -> Result<AprwatchConfig, ConfigLoadError> {
        let mut builder = Config::builder();
        for (path, required) in &self.files {
            builder = builder.add_source(File::from(path.as_path()).required(*required));
        }
        for yaml in &self.inline {
            builder = builder.add_source(File::from_str(yaml, config::FileFormat::Yaml));
        }
        if self.env {
            builder = builder.add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );
        }
        let cfg = builder.build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: AprwatchConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;
        typed.validate()?;
        Ok(typed)
    }
}
