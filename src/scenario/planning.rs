use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::infrastructure::InfrastructureAggregate;

use super::bottleneck::{max_cells_by_cpu, max_cells_by_memory};
use super::constraints::analyze_constraints;
use super::engine::ScenarioEngine;
use super::validation::{validate_cell_shape, validate_infrastructure, ValidationError};
use super::{ratio_or_zero, CellConfig, Resource, DEFAULT_TARGET_VCPU_RATIO};

/// How many cells of one shape the infrastructure can hold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanResult {
    pub cell: CellConfig,
    pub max_cells_by_memory: u64,
    pub max_cells_by_cpu: u64,
    pub deployable_cells: u64,
    pub bottleneck: Resource,
    pub limiting_label: String,
    pub memory_used_gb: u64,
    pub memory_available_gb: f64,
    pub memory_utilization_pct: f64,
    pub vcpus_used: u64,
    pub vcpus_available: f64,
    pub cpu_utilization_pct: f64,
    /// Deployable cells beyond what currently runs.
    pub headroom_cells: i64,
}

impl ScenarioEngine {
    pub fn plan(
        &self,
        infra: &InfrastructureAggregate,
        cell: &CellConfig,
        target_vcpu_ratio: f64,
    ) -> Result<PlanResult, ValidationError> {
        validate_cell_shape(cell)?;
        validate_infrastructure(infra)?;
        if !target_vcpu_ratio.is_finite() || target_vcpu_ratio <= 0.0 {
            return Err(ValidationError::VcpuRatioNotPositive(target_vcpu_ratio));
        }

        let constraints = analyze_constraints(infra, cell, infra.ha_admission_pct);
        let usable = constraints.limiting().usable_gb;
        let by_memory = max_cells_by_memory(usable, cell.memory_gb);
        let by_cpu = max_cells_by_cpu(infra.total_pcpus(), target_vcpu_ratio, cell.cpu);

        // Without CPU inventory only memory can bind.
        let (deployable, bottleneck) = match by_cpu {
            Some(cpu) if cpu < by_memory => (cpu, Resource::Cpu),
            _ => (by_memory, Resource::Memory),
        };

        let memory_used_gb = deployable * u64::from(cell.memory_gb);
        let vcpus_used = deployable * u64::from(cell.cpu);
        let vcpus_available = infra.total_pcpus() as f64 * target_vcpu_ratio;

        let result = PlanResult {
            cell: CellConfig {
                count: u32::try_from(deployable).unwrap_or(u32::MAX),
                ..*cell
            },
            max_cells_by_memory: by_memory,
            max_cells_by_cpu: by_cpu.unwrap_or(0),
            deployable_cells: deployable,
            bottleneck,
            limiting_label: constraints.limiting_label.clone(),
            memory_used_gb,
            memory_available_gb: usable.max(0.0),
            memory_utilization_pct: ratio_or_zero(100.0 * memory_used_gb as f64, usable),
            vcpus_used,
            vcpus_available,
            cpu_utilization_pct: ratio_or_zero(100.0 * vcpus_used as f64, vcpus_available),
            headroom_cells: deployable as i64 - i64::from(infra.cell.count),
        };
        debug!(
            cell = %cell.label(),
            deployable = result.deployable_cells,
            bottleneck = %result.bottleneck,
            "plan computed"
        );
        Ok(result)
    }
}

/// Plans with default thresholds and a 4:1 vCPU target.
pub fn plan(
    infra: &InfrastructureAggregate,
    cell: &CellConfig,
) -> Result<PlanResult, ValidationError> {
    ScenarioEngine::default().plan(infra, cell, DEFAULT_TARGET_VCPU_RATIO)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infra(pcpus: u64) -> InfrastructureAggregate {
        InfrastructureAggregate {
            total_hosts: 15,
            total_memory_gb: 30_000,
            total_cpu_cores: pcpus,
            largest_host_memory_gb: 2_000,
            cpu_cores_per_host: 64,
            n1_memory_gb: 28_000,
            ha_admission_pct: 25.0,
            cell: CellConfig::new(4, 32, 100, 470),
            ..InfrastructureAggregate::default()
        }
    }

    #[test]
    fn memory_bound_plan() {
        let result = plan(&infra(960), &CellConfig::new(4, 32, 100, 0)).expect("plan");
        assert_eq!(result.max_cells_by_memory, 703);
        assert_eq!(result.max_cells_by_cpu, 960);
        assert_eq!(result.deployable_cells, 703);
        assert_eq!(result.bottleneck, Resource::Memory);
        assert_eq!(result.headroom_cells, 233);
        assert_eq!(result.memory_used_gb, 703 * 32);
        assert!(result.memory_utilization_pct <= 100.0);
    }

    #[test]
    fn cpu_bound_plan() {
        let result = plan(&infra(200), &CellConfig::new(8, 32, 100, 0)).expect("plan");
        assert_eq!(result.max_cells_by_cpu, 100);
        assert_eq!(result.deployable_cells, 100);
        assert_eq!(result.bottleneck, Resource::Cpu);
        assert_eq!(result.cpu_utilization_pct, 100.0);
        assert_eq!(result.cell.count, 100);
    }

    #[test]
    fn no_cpu_inventory_plans_on_memory() {
        let result = plan(&infra(0), &CellConfig::new(4, 64, 100, 0)).expect("plan");
        assert_eq!(result.max_cells_by_cpu, 0);
        assert_eq!(result.deployable_cells, 351);
        assert_eq!(result.bottleneck, Resource::Memory);
        assert_eq!(result.cpu_utilization_pct, 0.0);
    }

    #[test]
    fn rejects_zero_sized_cells() {
        assert!(plan(&infra(960), &CellConfig::new(0, 32, 0, 0)).is_err());
    }
}
