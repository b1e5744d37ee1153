//! Configuration for the catalog module.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use catalog_query::QueryLimits;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};

/// Environment variable prefix; nested keys are separated by `__`,
/// e.g. `CATALOG__QUERY__MAX_LIMIT=200`.
pub const ENV_PREFIX: &str = "CATALOG__";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CatalogConfig {
    /// Largest aggregate weight a single order may carry (default: 5.0).
    pub max_order_weight: f64,

    /// Unit weight per item description. Unknown descriptions weigh 0.
    pub unit_weights: BTreeMap<String, f64>,

    /// Extra attempts when the per-shop order number is already taken.
    pub order_sequence_retries: u32,

    pub query: QueryLimits,

    pub channels: ChannelConfig,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        let unit_weights = [
            ("0.5g", 0.5),
            ("1g", 1.0),
            ("2.5g", 2.5),
            ("5g", 5.0),
            ("joint", 0.4),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v))
        .collect();

        Self {
            max_order_weight: 5.0,
            unit_weights,
            order_sequence_retries: 3,
            query: QueryLimits::default(),
            channels: ChannelConfig::default(),
        }
    }
}

/// Notification channel names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ChannelConfig {
    pub completed_orders: String,
    pub pending_orders: String,
    pub products: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            completed_orders: "orders.completed".to_owned(),
            pending_orders: "orders.pending".to_owned(),
            products: "products".to_owned(),
        }
    }
}

impl CatalogConfig {
    /// Layered provider: defaults, then the optional YAML file, then
    /// `CATALOG__*` environment variables.
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(CatalogConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load from defaults, `path` and the environment.
    ///
    /// # Errors
    /// Returns an error if a layer fails to parse or carries unknown keys.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Self::from_figment(&Self::figment(path))
    }

    /// # Errors
    /// Returns an error if the figment does not extract into a valid config.
    pub fn from_figment(figment: &Figment) -> anyhow::Result<Self> {
        let cfg: Self = figment
            .extract()
            .context("failed to extract catalog config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// # Errors
    /// Returns an error for a non-positive weight limit or a negative unit
    /// weight.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.max_order_weight.is_finite() && self.max_order_weight > 0.0) {
            anyhow::bail!(
                "max_order_weight must be a positive number, got {}",
                self.max_order_weight
            );
        }
        if let Some((desc, w)) = self
            .unit_weights
            .iter()
            .find(|(_, w)| !(w.is_finite() && **w >= 0.0))
        {
            anyhow::bail!("unit weight for {desc:?} must be non-negative, got {w}");
        }
        Ok(())
    }

    /// Unit weight of an item description; lookup ignores case and
    /// surrounding whitespace.
    #[must_use]
    pub fn unit_weight(&self, description: &str) -> f64 {
        let key = description.trim();
        self.unit_weights
            .get(key)
            .or_else(|| {
                self.unit_weights
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(key))
                    .map(|(_, w)| w)
            })
            .copied()
            .unwrap_or(0.0)
    }
}
