use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::optimizer::UpgradeTargets;
use crate::scenario::{
    default_throughput_curve, CellConfig, CurvePoint, ScenarioEngine, ScenarioInput,
    ThresholdTable, DEFAULT_CHUNK_SIZE_MB, DEFAULT_MEMORY_OVERHEAD_PCT, DEFAULT_TARGET_VCPU_RATIO,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub thresholds: ThresholdTable,
    #[serde(default)]
    pub inventory: InventoryConfig,
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    #[serde(default = "default_overhead_pct")]
    pub overhead_pct: f64,
    #[serde(default = "default_chunk_size_mb")]
    pub chunk_size_mb: u32,
    #[serde(default = "default_target_vcpu_ratio")]
    pub target_vcpu_ratio: f64,
    #[serde(default = "default_true")]
    pub enable_throughput: bool,
    #[serde(default = "default_throughput_curve")]
    pub throughput_curve: Vec<CurvePoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct InventoryConfig {
    /// Inventory file loaded when `--inventory` is not given.
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptimizerConfig {
    #[serde(default = "default_upgrade_utilization_pct")]
    pub cell_utilization_pct: f64,
    #[serde(default = "default_upgrade_utilization_pct")]
    pub host_memory_utilization_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub inventory_path: Option<PathBuf>,
    pub overhead_pct: Option<f64>,
    pub target_vcpu_ratio: Option<f64>,
}

impl Config {
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config/capacity-oracle/config.toml")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        let parsed: Self = toml::from_str(&data)
            .with_context(|| format!("failed parsing TOML config: {}", path.display()))?;
        Ok(parsed)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(path) = overrides.inventory_path {
            self.inventory.path = path.display().to_string();
        }
        if let Some(overhead) = overrides.overhead_pct {
            self.engine.overhead_pct = overhead;
        }
        if let Some(ratio) = overrides.target_vcpu_ratio {
            self.engine.target_vcpu_ratio = ratio;
        }
    }

    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating config directory: {}", parent.display())
            })?;
        }
        fs::write(path, Self::default_template())
            .with_context(|| format!("failed writing config template: {}", path.display()))
    }

    pub fn resolved_inventory_path(&self) -> Option<PathBuf> {
        let raw = self.inventory.path.trim();
        if raw.is_empty() {
            None
        } else {
            Some(expand_tilde(raw))
        }
    }

    pub fn scenario_engine(&self) -> ScenarioEngine {
        ScenarioEngine::new(self.thresholds.clone())
    }

    /// A scenario for `proposed` carrying the configured engine defaults.
    pub fn scenario_input(&self, proposed: CellConfig) -> ScenarioInput {
        ScenarioInput::new(proposed)
            .with_overhead_pct(self.engine.overhead_pct)
            .with_chunk_size_mb(self.engine.chunk_size_mb)
            .with_target_vcpu_ratio(self.engine.target_vcpu_ratio)
            .with_throughput_enabled(self.engine.enable_throughput)
            .with_curve(self.engine.throughput_curve.clone())
    }

    pub fn upgrade_targets(&self) -> UpgradeTargets {
        UpgradeTargets {
            cell_utilization_pct: self.optimizer.cell_utilization_pct,
            host_memory_utilization_pct: self.optimizer.host_memory_utilization_pct,
            vcpu_ratio: self.engine.target_vcpu_ratio,
        }
    }

    pub fn default_template() -> String {
        let template = r#"[engine]
overhead_pct = 7.0
chunk_size_mb = 4096
target_vcpu_ratio = 4.0
enable_throughput = true
throughput_curve = [
  { cells = 1, throughput = 284 },
  { cells = 3, throughput = 1964 },
  { cells = 9, throughput = 1932 },
  { cells = 100, throughput = 1389 },
  { cells = 210, throughput = 104 },
]

[thresholds.memory_utilization]
warning = 80.0
critical = 90.0

[thresholds.disk_utilization]
warning = 80.0
critical = 90.0

[thresholds.constraint_utilization]
warning = 75.0
critical = 85.0

[thresholds.vcpu_ratio]
warning = 4.0
critical = 8.0

[thresholds.free_chunks]
warning = 20.0
critical = 10.0

[thresholds.fault_impact]
warning = 25.0
critical = 50.0

[thresholds.throughput_pct]
warning = 80.0
critical = 50.0

[thresholds.blast_radius_pct]
warning = 10.0
critical = 20.0

[inventory]
path = ""

[optimizer]
cell_utilization_pct = 70.0
host_memory_utilization_pct = 70.0

[server]
host = "127.0.0.1"
port = 8080

[logging]
format = "text"
"#;
        template.to_string()
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            thresholds: ThresholdTable::default(),
            inventory: InventoryConfig::default(),
            optimizer: OptimizerConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            overhead_pct: default_overhead_pct(),
            chunk_size_mb: default_chunk_size_mb(),
            target_vcpu_ratio: default_target_vcpu_ratio(),
            enable_throughput: true,
            throughput_curve: default_throughput_curve(),
        }
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            cell_utilization_pct: default_upgrade_utilization_pct(),
            host_memory_utilization_pct: default_upgrade_utilization_pct(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_overhead_pct() -> f64 {
    DEFAULT_MEMORY_OVERHEAD_PCT
}

fn default_chunk_size_mb() -> u32 {
    DEFAULT_CHUNK_SIZE_MB
}

fn default_target_vcpu_ratio() -> f64 {
    DEFAULT_TARGET_VCPU_RATIO
}

fn default_upgrade_utilization_pct() -> f64 {
    70.0
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_matches_defaults() {
        let parsed: Config =
            toml::from_str(&Config::default_template()).expect("template should parse");
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn missing_sections_fall_back() {
        let parsed: Config = toml::from_str("[server]\nport = 9090\n").expect("partial config");
        assert_eq!(parsed.server.port, 9090);
        assert_eq!(parsed.server.host, "127.0.0.1");
        assert_eq!(parsed.engine.chunk_size_mb, 4096);
        assert_eq!(parsed.logging.format, LogFormat::Text);
        assert!(parsed.resolved_inventory_path().is_none());
    }

    #[test]
    fn overrides_replace_config_values() {
        let mut config = Config::default();
        config.apply_overrides(ConfigOverrides {
            inventory_path: Some(PathBuf::from("/tmp/inventory.json")),
            overhead_pct: Some(5.0),
            target_vcpu_ratio: None,
        });
        assert_eq!(
            config.resolved_inventory_path(),
            Some(PathBuf::from("/tmp/inventory.json"))
        );
        let input = config.scenario_input(CellConfig::new(4, 32, 100, 10));
        assert_eq!(input.overhead_pct, 5.0);
        assert_eq!(input.target_vcpu_ratio, 4.0);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let config = Config::load(Some(Path::new("/nonexistent/capacity-oracle.toml")))
            .expect("missing file should not error");
        assert_eq!(config, Config::default());
    }
}
