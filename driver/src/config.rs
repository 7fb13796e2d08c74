use anyhow::Context;
use biocore::session::SessionConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Driver-level configuration: where to find the hardware plus the full
/// session configuration handed to the core.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub port: Option<String>,
    pub baud: u32,
    pub read_timeout_ms: u64,
    pub session: SessionConfig,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud: 230_400,
            read_timeout_ms: 100,
            session: SessionConfig::default(),
        }
    }
}

impl DriverConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading driver config {}", path_ref.display()))?;
        let config: DriverConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing driver config {}", path_ref.display()))?;
        Ok(config)
    }
}
