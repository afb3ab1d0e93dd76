use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use types::{OptimizerConfig, SeedMode};

pub const SEED_ENV: &str = "DEFENSE__SEED";

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

/// Builds the run configuration. The seed comes from `flag_seed`, else from
/// the config file, else from `env_seed`.
pub fn load_config(
    file: Option<&Path>,
    flag_seed: Option<SeedMode>,
    env_seed: Option<String>,
) -> Result<OptimizerConfig> {
    let mut doc: Value = match file {
        Some(path) => read_json(path)?,
        None => Value::Object(Default::default()),
    };
    let Some(obj) = doc.as_object_mut() else {
        bail!("configuration must be a JSON object");
    };

    if let Some(seed) = flag_seed {
        obj.insert("seed".into(), Value::String(seed.to_string()));
    } else if !obj.contains_key("seed") {
        if let Some(env) = env_seed {
            let seed: SeedMode = env
                .parse()
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("invalid {SEED_ENV}"))?;
            obj.insert("seed".into(), Value::String(seed.to_string()));
        }
    }
    if !obj.contains_key("seed") {
        bail!("no seed mode given: pass --seed, set \"seed\" in the config file, or export {SEED_ENV}");
    }
    serde_json::from_value(doc).context("invalid optimizer configuration")
}
