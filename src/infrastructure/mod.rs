//! Infrastructure inventory and the aggregate view the scenario engine consumes.

pub mod aggregate;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scenario::CellConfig;

pub use aggregate::load_inventory;

/// One physical cluster as reported by an inventory source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ClusterSpec {
    pub name: String,
    pub host_count: u32,
    /// Per-host memory. Takes precedence over `memory_gb` when set.
    #[serde(default)]
    pub memory_gb_per_host: Option<u64>,
    /// Cluster-wide memory; split evenly across hosts when per-host is absent.
    #[serde(default)]
    pub memory_gb: Option<u64>,
    #[serde(default)]
    pub cpu_cores_per_host: Option<u32>,
    #[serde(default)]
    pub cpu_cores: Option<u64>,
    #[serde(default)]
    pub ha_admission_pct: f64,
    #[serde(default)]
    pub cell_count: u32,
    #[serde(default)]
    pub cell_memory_gb: u32,
    #[serde(default)]
    pub cell_cpu: u32,
    #[serde(default)]
    pub cell_disk_gb: u32,
    #[serde(default)]
    pub datastore_gb: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct InventoryInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub clusters: Vec<ClusterSpec>,
    #[serde(default)]
    pub platform_overhead_gb: u64,
    #[serde(default)]
    pub total_app_memory_gb: u64,
    #[serde(default)]
    pub total_app_disk_gb: u64,
    #[serde(default)]
    pub total_app_instances: u64,
}

/// Fleet-wide totals used by every calculator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct InfrastructureAggregate {
    pub total_hosts: u32,
    pub total_memory_gb: u64,
    pub total_cpu_cores: u64,
    pub largest_host_memory_gb: u64,
    pub cpu_cores_per_host: u32,
    pub n1_memory_gb: u64,
    pub ha_admission_pct: f64,
    pub platform_overhead_gb: u64,
    pub total_app_memory_gb: u64,
    pub total_app_disk_gb: u64,
    pub total_app_instances: u64,
    pub total_disk_gb: u64,
    /// Cell layout currently deployed.
    pub cell: CellConfig,
}

impl InfrastructureAggregate {
    pub fn avg_instance_memory_mb(&self) -> f64 {
        if self.total_app_instances == 0 {
            return 0.0;
        }
        self.total_app_memory_gb as f64 * 1024.0 / self.total_app_instances as f64
    }

    pub fn total_pcpus(&self) -> u64 {
        self.total_cpu_cores
    }
}

/// Per-scenario host changes applied on top of the inventory.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct HostOverride {
    #[serde(default)]
    pub host_count: Option<u32>,
    #[serde(default)]
    pub memory_gb_per_host: Option<u64>,
    #[serde(default)]
    pub cpu_cores_per_host: Option<u32>,
}

impl HostOverride {
    pub fn is_empty(&self) -> bool {
        self.host_count.is_none()
            && self.memory_gb_per_host.is_none()
            && self.cpu_cores_per_host.is_none()
    }
}

/// An aggregate plus bookkeeping for the server's shared state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InfrastructureSnapshot {
    pub version: u64,
    pub name: String,
    pub captured_at: DateTime<Utc>,
    pub cluster_count: usize,
    pub aggregate: InfrastructureAggregate,
}

impl InfrastructureSnapshot {
    pub fn new(version: u64, inventory: &InventoryInput) -> Self {
        Self {
            version,
            name: inventory.name.clone(),
            captured_at: Utc::now(),
            cluster_count: inventory.clusters.len(),
            aggregate: InfrastructureAggregate::from_inventory(inventory),
        }
    }
}
