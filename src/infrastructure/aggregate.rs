use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::scenario::CellConfig;

use super::{ClusterSpec, HostOverride, InfrastructureAggregate, InventoryInput};

impl ClusterSpec {
    pub fn memory_gb_per_host(&self) -> u64 {
        match (self.memory_gb_per_host, self.memory_gb) {
            (Some(per_host), _) => per_host,
            (None, Some(total)) if self.host_count > 0 => total / u64::from(self.host_count),
            _ => 0,
        }
    }

    pub fn total_memory_gb(&self) -> u64 {
        match (self.memory_gb_per_host, self.memory_gb) {
            (Some(per_host), _) => per_host.saturating_mul(u64::from(self.host_count)),
            (None, Some(total)) => total,
            (None, None) => 0,
        }
    }

    pub fn cpu_cores_per_host(&self) -> u32 {
        match (self.cpu_cores_per_host, self.cpu_cores) {
            (Some(per_host), _) => per_host,
            (None, Some(total)) if self.host_count > 0 => {
                u32::try_from(total / u64::from(self.host_count)).unwrap_or(u32::MAX)
            }
            _ => 0,
        }
    }

    pub fn total_cpu_cores(&self) -> u64 {
        match (self.cpu_cores_per_host, self.cpu_cores) {
            (Some(per_host), _) => u64::from(per_host).saturating_mul(u64::from(self.host_count)),
            (None, Some(total)) => total,
            (None, None) => 0,
        }
    }
}

impl InfrastructureAggregate {
    pub fn from_inventory(inventory: &InventoryInput) -> Self {
        let clusters = &inventory.clusters;

        let total_hosts = clusters
            .iter()
            .map(|c| c.host_count)
            .fold(0_u32, u32::saturating_add);
        let total_memory_gb = clusters
            .iter()
            .map(ClusterSpec::total_memory_gb)
            .fold(0_u64, u64::saturating_add);
        let total_cpu_cores = clusters
            .iter()
            .map(ClusterSpec::total_cpu_cores)
            .fold(0_u64, u64::saturating_add);
        let largest_host_memory_gb = clusters
            .iter()
            .filter(|c| c.host_count > 0)
            .map(ClusterSpec::memory_gb_per_host)
            .max()
            .unwrap_or(0);
        let cpu_cores_per_host = clusters
            .iter()
            .filter(|c| c.host_count > 0)
            .map(ClusterSpec::cpu_cores_per_host)
            .max()
            .unwrap_or(0);
        let ha_admission_pct = clusters
            .iter()
            .map(|c| c.ha_admission_pct)
            .fold(0.0_f64, f64::max);
        let total_disk_gb = clusters
            .iter()
            .filter_map(|c| c.datastore_gb)
            .fold(0_u64, u64::saturating_add);

        // Cell shape comes from the first cluster that actually runs cells.
        let shape = clusters
            .iter()
            .find(|c| c.cell_memory_gb > 0)
            .map(|c| (c.cell_cpu, c.cell_memory_gb, c.cell_disk_gb))
            .unwrap_or((0, 0, 0));
        let cell_count = clusters
            .iter()
            .map(|c| c.cell_count)
            .fold(0_u32, u32::saturating_add);

        let aggregate = Self {
            total_hosts,
            total_memory_gb,
            total_cpu_cores,
            largest_host_memory_gb,
            cpu_cores_per_host,
            n1_memory_gb: total_memory_gb.saturating_sub(largest_host_memory_gb),
            ha_admission_pct,
            platform_overhead_gb: inventory.platform_overhead_gb,
            total_app_memory_gb: inventory.total_app_memory_gb,
            total_app_disk_gb: inventory.total_app_disk_gb,
            total_app_instances: inventory.total_app_instances,
            total_disk_gb,
            cell: CellConfig::new(shape.0, shape.1, shape.2, cell_count),
        };
        debug!(
            hosts = aggregate.total_hosts,
            memory_gb = aggregate.total_memory_gb,
            cells = aggregate.cell.count,
            "aggregated inventory"
        );
        aggregate
    }

    /// Returns a copy with host-level overrides applied. Totals are rescaled
    /// as if every host matched the override shape.
    pub fn with_hosts(&self, hosts: &HostOverride) -> Self {
        if hosts.is_empty() {
            return self.clone();
        }
        let host_count = hosts.host_count.unwrap_or(self.total_hosts);
        let memory_per_host = hosts
            .memory_gb_per_host
            .unwrap_or_else(|| average(self.total_memory_gb, self.total_hosts, self.largest_host_memory_gb));
        let cores_per_host = hosts.cpu_cores_per_host.map(u64::from).unwrap_or_else(|| {
            average(
                self.total_cpu_cores,
                self.total_hosts,
                u64::from(self.cpu_cores_per_host),
            )
        });

        let total_memory_gb = memory_per_host.saturating_mul(u64::from(host_count));
        let largest_host_memory_gb = hosts
            .memory_gb_per_host
            .unwrap_or(self.largest_host_memory_gb);

        Self {
            total_hosts: host_count,
            total_memory_gb,
            total_cpu_cores: cores_per_host.saturating_mul(u64::from(host_count)),
            largest_host_memory_gb,
            cpu_cores_per_host: hosts.cpu_cores_per_host.unwrap_or(self.cpu_cores_per_host),
            n1_memory_gb: total_memory_gb.saturating_sub(largest_host_memory_gb),
            ..self.clone()
        }
    }
}

fn average(total: u64, count: u32, fallback: u64) -> u64 {
    if count == 0 {
        fallback
    } else {
        total / u64::from(count)
    }
}

/// Reads an inventory document, JSON or TOML by extension.
pub fn load_inventory(path: &Path) -> Result<InventoryInput> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed reading inventory: {}", path.display()))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let inventory = if is_toml {
        toml::from_str(&data)
            .with_context(|| format!("failed parsing TOML inventory: {}", path.display()))?
    } else {
        serde_json::from_str(&data)
            .with_context(|| format!("failed parsing JSON inventory: {}", path.display()))?
    };
    Ok(inventory)
}
