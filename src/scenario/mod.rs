//! Capacity scenario engine.
//!
//! Everything under this module is pure: inputs are borrowed, outputs are freshly
//! allocated, and nothing here touches the network, the filesystem or global state.

pub mod bottleneck;
pub mod constraints;
pub mod engine;
pub mod fixes;
pub mod planning;
pub mod snapshot;
pub mod throughput;
pub mod thresholds;
pub mod validation;
pub mod warnings;

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infrastructure::HostOverride;

pub use engine::{compare, ScenarioEngine};
pub use planning::{plan, PlanResult};
pub use thresholds::{Band, ThresholdTable};
pub use validation::ValidationError;

pub const DEFAULT_MEMORY_OVERHEAD_PCT: f64 = 7.0;
pub const DEFAULT_DISK_OVERHEAD_PCT: f64 = 0.01;
pub const DEFAULT_CHUNK_SIZE_MB: u32 = 4096;
pub const DEFAULT_TARGET_VCPU_RATIO: f64 = 4.0;

pub const DEFAULT_THROUGHPUT_CURVE: [CurvePoint; 5] = [
    CurvePoint::new(1, 284),
    CurvePoint::new(3, 1964),
    CurvePoint::new(9, 1932),
    CurvePoint::new(100, 1389),
    CurvePoint::new(210, 104),
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Memory,
    Cpu,
    Disk,
}

impl Resource {
    /// Tie-break order for bottleneck selection.
    pub const ALL: [Resource; 3] = [Resource::Memory, Resource::Cpu, Resource::Disk];

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Cpu => "cpu",
            Self::Disk => "disk",
        }
    }
}

impl Display for Resource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_slug())
    }
}

#[derive(Debug, Error)]
#[error("unknown resource: {0}")]
pub struct ResourceParseError(pub String);

impl FromStr for Resource {
    type Err = ResourceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" | "ram" => Ok(Self::Memory),
            "cpu" | "vcpu" => Ok(Self::Cpu),
            "disk" | "storage" => Ok(Self::Disk),
            _ => Err(ResourceParseError(s.to_string())),
        }
    }
}

/// Shape and count of the cells in one pool.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CellConfig {
    #[serde(default)]
    pub cpu: u32,
    #[serde(default)]
    pub memory_gb: u32,
    #[serde(default)]
    pub disk_gb: u32,
    #[serde(default)]
    pub count: u32,
}

impl CellConfig {
    pub fn new(cpu: u32, memory_gb: u32, disk_gb: u32, count: u32) -> Self {
        Self {
            cpu,
            memory_gb,
            disk_gb,
            count,
        }
    }

    pub fn total_memory_gb(&self) -> u64 {
        u64::from(self.memory_gb) * u64::from(self.count)
    }

    pub fn total_vcpus(&self) -> u64 {
        u64::from(self.cpu) * u64::from(self.count)
    }

    /// Size label such as `4×32`.
    pub fn label(&self) -> String {
        format!("{}×{}", self.cpu, self.memory_gb)
    }
}

/// A hypothetical application added on top of the existing demand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AdditionalWorkload {
    #[serde(default)]
    pub name: String,
    pub instances: u32,
    pub memory_gb: u32,
    #[serde(default)]
    pub disk_gb: u32,
}

impl AdditionalWorkload {
    pub fn total_memory_gb(&self) -> u64 {
        u64::from(self.instances) * u64::from(self.memory_gb)
    }

    pub fn total_disk_gb(&self) -> u64 {
        u64::from(self.instances) * u64::from(self.disk_gb)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurvePoint {
    pub cells: u32,
    pub throughput: u32,
}

impl CurvePoint {
    pub const fn new(cells: u32, throughput: u32) -> Self {
        Self { cells, throughput }
    }
}

pub fn default_throughput_curve() -> Vec<CurvePoint> {
    DEFAULT_THROUGHPUT_CURVE.to_vec()
}

/// Caller-supplied description of the proposed layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioInput {
    pub proposed: CellConfig,
    #[serde(default = "default_selected_resources")]
    pub selected_resources: Vec<Resource>,
    #[serde(default = "default_overhead_pct")]
    pub overhead_pct: f64,
    /// Falls back to the infrastructure's configured reservation when absent.
    #[serde(default)]
    pub ha_admission_pct: Option<f64>,
    #[serde(default = "default_throughput_curve")]
    pub throughput_curve: Vec<CurvePoint>,
    #[serde(default = "default_true")]
    pub enable_throughput: bool,
    #[serde(default = "default_target_vcpu_ratio")]
    pub target_vcpu_ratio: f64,
    #[serde(default = "default_chunk_size_mb")]
    pub chunk_size_mb: u32,
    #[serde(default)]
    pub additional_workload: Option<AdditionalWorkload>,
    #[serde(default)]
    pub hosts: Option<HostOverride>,
}

impl ScenarioInput {
    pub fn new(proposed: CellConfig) -> Self {
        Self {
            proposed,
            selected_resources: default_selected_resources(),
            overhead_pct: DEFAULT_MEMORY_OVERHEAD_PCT,
            ha_admission_pct: None,
            throughput_curve: default_throughput_curve(),
            enable_throughput: true,
            target_vcpu_ratio: DEFAULT_TARGET_VCPU_RATIO,
            chunk_size_mb: DEFAULT_CHUNK_SIZE_MB,
            additional_workload: None,
            hosts: None,
        }
    }

    pub fn with_ha_admission_pct(mut self, pct: f64) -> Self {
        self.ha_admission_pct = Some(pct);
        self
    }

    pub fn with_resources(mut self, resources: Vec<Resource>) -> Self {
        self.selected_resources = resources;
        self
    }

    pub fn with_overhead_pct(mut self, pct: f64) -> Self {
        self.overhead_pct = pct;
        self
    }

    pub fn with_curve(mut self, curve: Vec<CurvePoint>) -> Self {
        self.throughput_curve = curve;
        self
    }

    pub fn with_throughput_enabled(mut self, enabled: bool) -> Self {
        self.enable_throughput = enabled;
        self
    }

    pub fn with_target_vcpu_ratio(mut self, ratio: f64) -> Self {
        self.target_vcpu_ratio = ratio;
        self
    }

    pub fn with_chunk_size_mb(mut self, chunk_size_mb: u32) -> Self {
        self.chunk_size_mb = chunk_size_mb;
        self
    }

    pub fn with_workload(mut self, workload: AdditionalWorkload) -> Self {
        self.additional_workload = Some(workload);
        self
    }

    pub fn with_hosts(mut self, hosts: HostOverride) -> Self {
        self.hosts = Some(hosts);
        self
    }

    pub fn is_selected(&self, resource: Resource) -> bool {
        self.selected_resources.contains(&resource)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ThroughputStatus {
    Optimal,
    Degraded,
    Critical,
    Disabled,
    Unknown,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CpuRiskLevel {
    Conservative,
    Moderate,
    Aggressive,
}

/// Derived metrics for one side of a comparison.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CapacitySnapshot {
    pub cell_count: u32,
    pub cell_cpu: u32,
    pub cell_memory_gb: u32,
    pub cell_disk_gb: u32,
    pub app_capacity_gb: f64,
    /// Not clamped: values above 100 mean demand exceeds capacity.
    pub utilization_pct: f64,
    pub disk_capacity_gb: f64,
    pub disk_utilization_pct: f64,
    pub n1_utilization_pct: f64,
    /// Negative when staging is already over-subscribed.
    pub free_chunks: i64,
    pub chunk_size_mb: u32,
    pub fault_impact: f64,
    pub instances_per_cell: f64,
    pub blast_radius_pct: f64,
    pub estimated_throughput: u32,
    pub throughput_status: ThroughputStatus,
    pub total_vcpus: u64,
    pub total_pcpus: u64,
    pub vcpu_ratio: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_risk_level: Option<CpuRiskLevel>,
    pub max_cells_by_memory: u64,
    pub max_cells_by_cpu: u64,
    pub cpu_headroom_cells: i64,
}

impl CapacitySnapshot {
    pub fn cell_config(&self) -> CellConfig {
        CellConfig::new(
            self.cell_cpu,
            self.cell_memory_gb,
            self.cell_disk_gb,
            self.cell_count,
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    HaAdmission,
    NMinusOne,
}

impl Display for ConstraintKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HaAdmission => write!(f, "HA Admission Control"),
            Self::NMinusOne => write!(f, "N-1"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CapacityConstraint {
    pub reserved_gb: f64,
    pub usable_gb: f64,
    pub utilization_pct: f64,
    /// Whole hosts' worth of memory held back (HA admission only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_equivalent: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConstraintAnalysis {
    pub ha_admission: CapacityConstraint,
    pub n_minus_one: CapacityConstraint,
    pub limiting_constraint: ConstraintKind,
    pub limiting_label: String,
    pub insufficient_ha_warning: bool,
}

impl ConstraintAnalysis {
    pub fn limiting(&self) -> &CapacityConstraint {
        match self.limiting_constraint {
            ConstraintKind::HaAdmission => &self.ha_admission,
            ConstraintKind::NMinusOne => &self.n_minus_one,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BottleneckAnalysis {
    pub max_cells_by_memory: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cells_by_cpu: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cells_by_disk: Option<u64>,
    pub bottleneck: Resource,
    pub bottleneck_cells: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_headroom_cells: Option<i64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResilienceChange {
    Improved,
    Reduced,
    #[serde(rename = "none")]
    Unchanged,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Delta {
    pub capacity_change_gb: f64,
    pub disk_capacity_change_gb: f64,
    pub utilization_change_pct: f64,
    pub disk_utilization_change_pct: f64,
    pub resilience_change: ResilienceChange,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WarningMetric {
    OverCapacity,
    MemoryUtilization,
    DiskUtilization,
    ConstraintUtilization,
    VcpuRatio,
    FreeChunks,
    FaultImpact,
    Throughput,
    BlastRadius,
    HaReservation,
    Redundancy,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConfigField {
    CellCount,
    CellMemoryGb,
    CellCpu,
    CellDiskGb,
    HostCount,
    HaAdmissionPct,
}

impl Display for ConfigField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::CellCount => "cell_count",
            Self::CellMemoryGb => "cell_memory_gb",
            Self::CellCpu => "cell_cpu",
            Self::CellDiskGb => "cell_disk_gb",
            Self::HostCount => "host_count",
            Self::HaAdmissionPct => "ha_admission_pct",
        };
        write!(f, "{label}")
    }
}

/// A configuration field that differs between the current and proposed layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigChange {
    pub field: ConfigField,
    pub previous: f64,
    pub proposed: f64,
    pub delta: f64,
    pub delta_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FixSuggestion {
    pub description: String,
    pub field: ConfigField,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Warning {
    pub severity: Severity,
    pub metric: WarningMetric,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<ConfigChange>,
    #[serde(default)]
    pub fixes: Vec<FixSuggestion>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Good,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioComparison {
    pub current: CapacitySnapshot,
    pub proposed: CapacitySnapshot,
    pub delta: Delta,
    pub constraints: ConstraintAnalysis,
    pub bottleneck: BottleneckAnalysis,
    pub changes: Vec<ConfigChange>,
    pub warnings: Vec<Warning>,
}

impl ScenarioComparison {
    pub fn overall_status(&self) -> OverallStatus {
        let critical = self.proposed.utilization_pct > thresholds::OVER_CAPACITY_PCT
            || self
                .warnings
                .iter()
                .any(|w| w.severity == Severity::Critical);
        if critical {
            OverallStatus::Critical
        } else if self.warnings.iter().any(|w| w.severity == Severity::Warning) {
            OverallStatus::Warning
        } else {
            OverallStatus::Good
        }
    }

    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.warnings
            .iter()
            .filter(|w| w.severity == severity)
            .count()
    }
}

/// Division that yields 0 instead of inf/NaN for an empty denominator.
pub(crate) fn ratio_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

fn default_selected_resources() -> Vec<Resource> {
    Resource::ALL.to_vec()
}

fn default_overhead_pct() -> f64 {
    DEFAULT_MEMORY_OVERHEAD_PCT
}

fn default_target_vcpu_ratio() -> f64 {
    DEFAULT_TARGET_VCPU_RATIO
}

fn default_chunk_size_mb() -> u32 {
    DEFAULT_CHUNK_SIZE_MB
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn parses_resource_aliases() {
        assert_eq!(Resource::from_str("MEM").unwrap(), Resource::Memory);
        assert_eq!(Resource::from_str(" vcpu ").unwrap(), Resource::Cpu);
        assert!(Resource::from_str("gpu").is_err());
    }

    #[test]
    fn scenario_input_fills_defaults_from_json() {
        let input: ScenarioInput = serde_json::from_str(
            r#"{"proposed": {"cpu": 4, "memory_gb": 64, "disk_gb": 200, "count": 235}}"#,
        )
        .expect("minimal scenario input should parse");
        assert_eq!(input.overhead_pct, 7.0);
        assert_eq!(input.chunk_size_mb, 4096);
        assert_eq!(input.selected_resources.len(), 3);
        assert_eq!(input.throughput_curve.len(), 5);
        assert!(input.enable_throughput);
        assert!(input.ha_admission_pct.is_none());
    }

    #[test]
    fn rejects_negative_cell_count_at_parse_time() {
        let parsed = serde_json::from_str::<ScenarioInput>(
            r#"{"proposed": {"cpu": 4, "memory_gb": 32, "count": -3}}"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn resilience_unchanged_serializes_as_none() {
        let value = serde_json::to_value(ResilienceChange::Unchanged).unwrap();
        assert_eq!(value, serde_json::json!("none"));
    }

    #[test]
    fn cell_label_uses_cpu_by_memory() {
        assert_eq!(CellConfig::new(4, 32, 100, 10).label(), "4×32");
    }
}
