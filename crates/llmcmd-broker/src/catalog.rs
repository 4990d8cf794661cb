//! Quota & pricing resolver: resolves per-model weighted-unit weights from
//! a local catalog, with a three-tier fallback.

use llmcmd_core::{ModelWeights, PricingSource};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// On-disk pricing catalog shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingCatalog {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub unit: String,
    pub default_model: String,
    pub weights: HashMap<String, ModelWeights>,
}

impl PricingCatalog {
    /// An empty catalog; every lookup falls through to the conservative
    /// fallback weights. Used when no catalog file is configured.
    pub fn empty() -> Self {
        Self {
            version: 1,
            currency: "usd".to_string(),
            unit: "weighted_unit".to_string(),
            default_model: String::new(),
            weights: HashMap::new(),
        }
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Resolution order: (1) direct hit, (2) the catalog's configured
    /// default model, (3) the conservative built-in fallback.
    pub fn resolve(&self, model: &str) -> (ModelWeights, PricingSource) {
        if let Some(weights) = self.weights.get(model) {
            return (*weights, PricingSource::Config);
        }
        if let Some(weights) = self.weights.get(&self.default_model) {
            return (*weights, PricingSource::Default);
        }
        (ModelWeights::CONSERVATIVE_FALLBACK, PricingSource::Fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_hit_returns_config_source() {
        let mut weights = HashMap::new();
        weights.insert(
            "gpt-5".to_string(),
            ModelWeights { input: 1.0, cached: 0.1, output: 3.0 },
        );
        let catalog = PricingCatalog {
            version: 1,
            currency: "usd".to_string(),
            unit: "weighted_unit".to_string(),
            default_model: "gpt-5".to_string(),
            weights,
        };
        let (w, source) = catalog.resolve("gpt-5");
        assert_eq!(w.output, 3.0);
        assert_eq!(source, PricingSource::Config);
    }

    #[test]
    fn unknown_model_falls_back_to_default() {
        let mut weights = HashMap::new();
        weights.insert(
            "gpt-5".to_string(),
            ModelWeights { input: 1.0, cached: 0.1, output: 3.0 },
        );
        let catalog = PricingCatalog {
            version: 1,
            currency: "usd".to_string(),
            unit: "weighted_unit".to_string(),
            default_model: "gpt-5".to_string(),
            weights,
        };
        let (w, source) = catalog.resolve("unknown-model");
        assert_eq!(w.output, 3.0);
        assert_eq!(source, PricingSource::Default);
    }

    #[test]
    fn empty_catalog_uses_conservative_fallback() {
        let catalog = PricingCatalog::empty();
        let (w, source) = catalog.resolve("anything");
        assert_eq!(w, ModelWeights::CONSERVATIVE_FALLBACK);
        assert_eq!(source, PricingSource::Fallback);
    }

    #[test]
    fn parses_from_json() {
        let json = r#"{
            "version": 1,
            "currency": "usd",
            "unit": "weighted_unit",
            "default_model": "gpt-5",
            "weights": { "gpt-5": {"input": 1.0, "cached": 0.25, "output": 4.0} }
        }"#;
        let catalog = PricingCatalog::from_json(json).unwrap();
        assert_eq!(catalog.default_model, "gpt-5");
        assert_eq!(catalog.weights.len(), 1);
    }
}
