//! Loads the local pricing catalog file referenced by `RuntimeConfig` (or
//! falls back to an empty catalog) into a `llmcmd_broker::PricingCatalog`.

use llmcmd_broker::PricingCatalog;
use llmcmd_core::EngineError;
use std::path::Path;

pub fn load_pricing_catalog(path: Option<&Path>) -> Result<PricingCatalog, EngineError> {
    let Some(path) = path else {
        return Ok(PricingCatalog::empty());
    };
    match std::fs::read_to_string(path) {
        Ok(text) => PricingCatalog::from_json(&text).map_err(|e| {
            EngineError::ConfigError(format!("malformed pricing catalog '{}': {e}", path.display()))
        }),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "pricing catalog not found, using conservative fallback weights");
            Ok(PricingCatalog::empty())
        }
        Err(err) => Err(EngineError::ConfigError(format!(
            "cannot read pricing catalog '{}': {err}",
            path.display()
        ))),
    }
}
