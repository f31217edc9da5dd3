use crate::infrastructure::InfrastructureAggregate;

use super::throughput::ThroughputEstimate;
use super::thresholds::ThresholdTable;
use super::{
    ratio_or_zero, AdditionalWorkload, BottleneckAnalysis, CapacitySnapshot, CellConfig,
    ThroughputStatus, DEFAULT_DISK_OVERHEAD_PCT,
};

/// Application demand placed on a cell pool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Demand {
    pub memory_gb: f64,
    pub disk_gb: f64,
    pub instances: f64,
}

impl Demand {
    pub fn existing(infra: &InfrastructureAggregate) -> Self {
        Self {
            memory_gb: infra.total_app_memory_gb as f64,
            disk_gb: infra.total_app_disk_gb as f64,
            instances: infra.total_app_instances as f64,
        }
    }

    pub fn with_workload(self, workload: Option<&AdditionalWorkload>) -> Self {
        match workload {
            Some(extra) => Self {
                memory_gb: self.memory_gb + extra.total_memory_gb() as f64,
                disk_gb: self.disk_gb + extra.total_disk_gb() as f64,
                instances: self.instances + f64::from(extra.instances),
            },
            None => self,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SnapshotParams<'a> {
    pub overhead_pct: f64,
    pub disk_overhead_pct: f64,
    pub chunk_size_mb: u32,
    pub thresholds: &'a ThresholdTable,
}

impl<'a> SnapshotParams<'a> {
    pub fn new(overhead_pct: f64, chunk_size_mb: u32, thresholds: &'a ThresholdTable) -> Self {
        Self {
            overhead_pct,
            disk_overhead_pct: DEFAULT_DISK_OVERHEAD_PCT,
            chunk_size_mb,
            thresholds,
        }
    }
}

/// Usable app memory of a pool once per-cell overhead is taken out.
pub fn app_capacity_gb(cell: &CellConfig, overhead_pct: f64) -> f64 {
    f64::from(cell.memory_gb) * (1.0 - overhead_pct / 100.0) * f64::from(cell.count)
}

pub fn disk_capacity_gb(cell: &CellConfig, disk_overhead_pct: f64) -> f64 {
    f64::from(cell.disk_gb) * (1.0 - disk_overhead_pct / 100.0) * f64::from(cell.count)
}

pub fn free_chunks(capacity_gb: f64, used_gb: f64, chunk_size_mb: u32) -> i64 {
    if chunk_size_mb == 0 {
        return 0;
    }
    ((capacity_gb * 1024.0 - used_gb * 1024.0) / f64::from(chunk_size_mb)).floor() as i64
}

pub fn calculate_snapshot(
    cell: &CellConfig,
    infra: &InfrastructureAggregate,
    demand: &Demand,
    params: &SnapshotParams<'_>,
) -> CapacitySnapshot {
    let capacity = app_capacity_gb(cell, params.overhead_pct);
    let disk_capacity = disk_capacity_gb(cell, params.disk_overhead_pct);
    let count = f64::from(cell.count);
    let cell_memory_total = cell.total_memory_gb() as f64;
    let instances_per_cell = ratio_or_zero(demand.instances, count);

    let total_vcpus = cell.total_vcpus();
    let total_pcpus = infra.total_pcpus();
    let vcpu_ratio = ratio_or_zero(total_vcpus as f64, total_pcpus as f64);
    let cpu_risk_level =
        (total_pcpus > 0).then(|| params.thresholds.cpu_risk_level(vcpu_ratio));

    CapacitySnapshot {
        cell_count: cell.count,
        cell_cpu: cell.cpu,
        cell_memory_gb: cell.memory_gb,
        cell_disk_gb: cell.disk_gb,
        app_capacity_gb: capacity,
        utilization_pct: ratio_or_zero(100.0 * demand.memory_gb, capacity),
        disk_capacity_gb: disk_capacity,
        disk_utilization_pct: ratio_or_zero(100.0 * demand.disk_gb, disk_capacity),
        n1_utilization_pct: ratio_or_zero(
            100.0 * (cell_memory_total + infra.platform_overhead_gb as f64),
            infra.n1_memory_gb as f64,
        ),
        free_chunks: free_chunks(capacity, demand.memory_gb, params.chunk_size_mb),
        chunk_size_mb: params.chunk_size_mb,
        fault_impact: instances_per_cell,
        instances_per_cell,
        blast_radius_pct: ratio_or_zero(100.0, count),
        estimated_throughput: 0,
        throughput_status: ThroughputStatus::Unknown,
        total_vcpus,
        total_pcpus,
        vcpu_ratio,
        cpu_risk_level,
        max_cells_by_memory: 0,
        max_cells_by_cpu: 0,
        cpu_headroom_cells: 0,
    }
}

impl CapacitySnapshot {
    pub fn with_throughput(mut self, estimate: ThroughputEstimate) -> Self {
        self.estimated_throughput = estimate.throughput;
        self.throughput_status = estimate.status;
        self
    }

    pub fn with_bottleneck(mut self, analysis: &BottleneckAnalysis) -> Self {
        self.max_cells_by_memory = analysis.max_cells_by_memory;
        self.max_cells_by_cpu = analysis.max_cells_by_cpu.unwrap_or(0);
        self.cpu_headroom_cells = analysis.cpu_headroom_cells.unwrap_or(0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::CpuRiskLevel;

    fn infra() -> InfrastructureAggregate {
        InfrastructureAggregate {
            total_hosts: 15,
            total_memory_gb: 30_000,
            total_cpu_cores: 960,
            largest_host_memory_gb: 2_000,
            cpu_cores_per_host: 64,
            n1_memory_gb: 28_000,
            ha_admission_pct: 25.0,
            total_app_memory_gb: 10_000,
            total_app_disk_gb: 20_000,
            total_app_instances: 5_000,
            cell: CellConfig::new(4, 32, 100, 470),
            ..InfrastructureAggregate::default()
        }
    }

    fn snapshot_for(cell: CellConfig, infra: &InfrastructureAggregate) -> CapacitySnapshot {
        let thresholds = ThresholdTable::default();
        let params = SnapshotParams::new(7.0, 4096, &thresholds);
        calculate_snapshot(&cell, infra, &Demand::existing(infra), &params)
    }

    #[test]
    fn computes_capacity_and_utilization() {
        let infra = infra();
        let snap = snapshot_for(infra.cell, &infra);
        let expected_capacity = 32.0 * 0.93 * 470.0;
        assert!((snap.app_capacity_gb - expected_capacity).abs() < 1e-6);
        assert!((snap.utilization_pct - 100.0 * 10_000.0 / expected_capacity).abs() < 1e-6);
        assert!((snap.n1_utilization_pct - 100.0 * 15_040.0 / 28_000.0).abs() < 1e-6);
        assert_eq!(snap.total_vcpus, 1880);
        assert!((snap.vcpu_ratio - 1880.0 / 960.0).abs() < 1e-9);
        assert_eq!(snap.cpu_risk_level, Some(CpuRiskLevel::Conservative));
        assert!((snap.blast_radius_pct - 100.0 / 470.0).abs() < 1e-9);
    }

    #[test]
    fn free_chunks_floor_and_go_negative() {
        assert_eq!(free_chunks(100.0, 50.0, 4096), 12);
        assert_eq!(free_chunks(10.0, 18.0, 4096), -2);
        assert_eq!(free_chunks(10.0, 1.0, 0), 0);
    }

    #[test]
    fn empty_pool_does_not_divide_by_zero() {
        let infra = infra();
        let snap = snapshot_for(CellConfig::new(4, 32, 100, 0), &infra);
        assert_eq!(snap.app_capacity_gb, 0.0);
        assert_eq!(snap.utilization_pct, 0.0);
        assert_eq!(snap.fault_impact, 0.0);
        assert_eq!(snap.blast_radius_pct, 0.0);
        assert!(snap.utilization_pct.is_finite());
    }

    #[test]
    fn missing_cpu_inventory_omits_risk_level() {
        let mut infra = infra();
        infra.total_cpu_cores = 0;
        let snap = snapshot_for(infra.cell, &infra);
        assert_eq!(snap.vcpu_ratio, 0.0);
        assert_eq!(snap.cpu_risk_level, None);
    }

    #[test]
    fn utilization_is_not_clamped() {
        let mut infra = infra();
        infra.total_app_memory_gb = 20_000;
        let snap = snapshot_for(CellConfig::new(4, 32, 100, 100), &infra);
        assert!(snap.utilization_pct > 100.0);
        assert!(snap.free_chunks < 0);
    }

    #[test]
    fn additional_workload_raises_demand() {
        let infra = infra();
        let workload = AdditionalWorkload {
            name: "batch".to_string(),
            instances: 100,
            memory_gb: 4,
            disk_gb: 1,
        };
        let demand = Demand::existing(&infra).with_workload(Some(&workload));
        assert_eq!(demand.memory_gb, 10_400.0);
        assert_eq!(demand.instances, 5_100.0);
    }
}
