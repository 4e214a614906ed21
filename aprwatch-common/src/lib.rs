//! Common types and utilities shared across aprwatch crates.
//!
//! This crate defines the scrape target model, the feed mapping model,
//! observability helpers, and the shared error type used throughout the
//! workspace. It stays dependency-light so every crate can depend on it.
//!
//! # Overview
//!
//! - [`Target`]: one farm whose APR is read from a rendered page
//! - [`PageRoute`] and [`AddressingKind`]: where a target lives and how its
//!   marker node is addressed on that page
//! - [`Addressing`]: the resolved addressing strategy handed to the locator
//! - [`FeedMapping`]: a `(pool id, output name)` pair for the JSON feed
//! - [`observability`]: centralised tracing/logging initialisation
//! - [`AprError`] and [`Result`]: shared error handling
//!
//! # Examples
//!
//! ```rust
//! use aprwatch_common::{Addressing, PageRoute, Target};
//!
//! let target = Target::new("3514-r", "linearApr")
//!     .with_route(PageRoute::PerTarget { prefix: "v2farms".into() });
//! let base = url::Url::parse("https://app.ref.finance").unwrap();
//!
//! assert_eq!(
//!     target.url(&base).unwrap().as_str(),
//!     "https://app.ref.finance/v2farms/3514-r"
//! );
//! assert_eq!(target.addressing(), Addressing::ByElementId("3514-r".into()));
//! ```
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

pub mod observability;

/// Attribute carrying the farm routing token on per-farm page layouts.
pub const DEFAULT_FARM_ATTRIBUTE: &str = "data-farm-id";

/// One farm listing whose APR is read from a browser-rendered page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    /// Pool id (`1889`) or routing token (`3514-r`).
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Key the extracted value is stored under in the output artifact.
    pub output_field: String,
    #[serde(default)]
    pub route: PageRoute,
    #[serde(default)]
    pub addressing: AddressingKind,
    /// Overrides the readiness selector derived from the addressing strategy.
    #[serde(default)]
    pub ready_selector: Option<String>,
}

impl Target {
    /// Target on the shared listing page, addressed by element id.
    pub fn new(id: impl Into<String>, output_field: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            output_field: output_field.into(),
            route: PageRoute::default(),
            addressing: AddressingKind::default(),
            ready_selector: None,
        }
    }

    pub fn with_route(mut self, route: PageRoute) -> Self {
        self.route = route;
        self
    }

    pub fn with_addressing(mut self, addressing: AddressingKind) -> Self {
        self.addressing = addressing;
        self
    }

    pub fn with_ready_selector(mut self, selector: impl Into<String>) -> Self {
        self.ready_selector = Some(selector.into());
        self
    }

    /// Resolve the configured strategy kind against this target's key.
    pub fn addressing(&self) -> Addressing {
        match &self.addressing {
            AddressingKind::ElementId => Addressing::ByElementId(self.id.clone()),
            AddressingKind::AttributeSubstring { attribute } => Addressing::ByAttributeSubstring {
                attribute: attribute.clone(),
                key: self.id.clone(),
            },
        }
    }

    /// Page to open for this target, relative to the site's base URL.
    pub fn url(&self, base: &Url) -> std::result::Result<Url, url::ParseError> {
        let mut base = base.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        match &self.route {
            PageRoute::Shared { path } => base.join(path.trim_start_matches('/')),
            PageRoute::PerTarget { prefix } => {
                let prefix = prefix.trim_matches('/');
                if prefix.is_empty() {
                    base.join(&self.id)
                } else {
                    base.join(&format!("{prefix}/{}", self.id))
                }
            }
        }
    }
}

/// Which page a target's data is rendered on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageRoute {
    /// One listing page showing every farm, e.g. `farms`.
    Shared { path: String },
    /// One page per farm at `<prefix>/<id>`, e.g. `v2farms/3514-r`.
    PerTarget { prefix: String },
}

impl Default for PageRoute {
    fn default() -> Self {
        Self::Shared {
            path: "farms".to_string(),
        }
    }
}

/// Addressing strategy as written in configuration; the key comes from the target id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum AddressingKind {
    #[default]
    ElementId,
    AttributeSubstring {
        #[serde(default = "default_farm_attribute")]
        attribute: String,
    },
}

fn default_farm_attribute() -> String {
    DEFAULT_FARM_ATTRIBUTE.to_string()
}

/// How the farm info panel for a target is found in the DOM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Addressing {
    /// Marker element whose `id` equals the pool id.
    ByElementId(String),
    /// Marker element whose `attribute` value embeds `key` as a whole token.
    ByAttributeSubstring { attribute: String, key: String },
}

impl Addressing {
    /// The key the strategy matches against.
    pub fn key(&self) -> &str {
        match self {
            Self::ByElementId(id) => id,
            Self::ByAttributeSubstring { key, .. } => key,
        }
    }
}

/// A `(pool id, output name)` pair looked up in the JSON feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedMapping {
    pub pool_id: u64,
    pub name: String,
}

impl FeedMapping {
    pub fn new(pool_id: u64, name: impl Into<String>) -> Self {
        Self {
            pool_id,
            name: name.into(),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
    })
}

/// Error types used across the aprwatch workspace.
#[derive(thiserror::Error, Debug)]
pub enum AprError {
    /// The WebDriver session could not be created.
    #[error("browser session failed to start: {0}")]
    SessionLaunch(String),

    /// An output artifact could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An output record could not be serialized.
    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Convenient alias for results that use [`AprError`].
pub type Result<T> = std::result::Result<T, AprError>;
