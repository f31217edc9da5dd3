use super::{BottleneckAnalysis, CellConfig, ConstraintAnalysis, Resource};

#[derive(Debug, Clone, Copy)]
pub struct BottleneckParams<'a> {
    pub total_pcpus: u64,
    pub target_vcpu_ratio: f64,
    pub disk_budget_gb: u64,
    pub selected: &'a [Resource],
}

pub fn max_cells_by_memory(usable_gb: f64, cell_memory_gb: u32) -> u64 {
    if cell_memory_gb == 0 || usable_gb <= 0.0 {
        return 0;
    }
    (usable_gb / f64::from(cell_memory_gb)).floor() as u64
}

/// `None` when there is no CPU inventory to size against.
pub fn max_cells_by_cpu(total_pcpus: u64, target_vcpu_ratio: f64, cell_cpu: u32) -> Option<u64> {
    if total_pcpus == 0 || cell_cpu == 0 {
        return None;
    }
    Some((total_pcpus as f64 * target_vcpu_ratio / f64::from(cell_cpu)).floor() as u64)
}

pub fn max_cells_by_disk(disk_budget_gb: u64, cell_disk_gb: u32) -> Option<u64> {
    if disk_budget_gb == 0 || cell_disk_gb == 0 {
        return None;
    }
    Some(disk_budget_gb / u64::from(cell_disk_gb))
}

pub fn analyze_bottleneck(
    cell: &CellConfig,
    constraints: &ConstraintAnalysis,
    params: &BottleneckParams<'_>,
) -> BottleneckAnalysis {
    let by_memory = max_cells_by_memory(constraints.limiting().usable_gb, cell.memory_gb);
    let by_cpu = max_cells_by_cpu(params.total_pcpus, params.target_vcpu_ratio, cell.cpu);
    let by_disk = if params.selected.contains(&Resource::Disk) {
        max_cells_by_disk(params.disk_budget_gb, cell.disk_gb)
    } else {
        None
    };

    let mut bottleneck = Resource::Memory;
    let mut bottleneck_cells: Option<u64> = None;
    for resource in Resource::ALL {
        if !params.selected.contains(&resource) {
            continue;
        }
        let limit = match resource {
            Resource::Memory => Some(by_memory),
            Resource::Cpu => by_cpu,
            Resource::Disk => by_disk,
        };
        if let Some(cells) = limit {
            // Strict comparison keeps the earlier resource on ties.
            if bottleneck_cells.map_or(true, |best| cells < best) {
                bottleneck = resource;
                bottleneck_cells = Some(cells);
            }
        }
    }

    BottleneckAnalysis {
        max_cells_by_memory: by_memory,
        max_cells_by_cpu: by_cpu,
        max_cells_by_disk: by_disk,
        bottleneck,
        bottleneck_cells: bottleneck_cells.unwrap_or(by_memory),
        cpu_headroom_cells: by_cpu.map(|max| max as i64 - i64::from(cell.count)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{CapacityConstraint, ConstraintKind};

    fn constraints(usable_gb: f64) -> ConstraintAnalysis {
        let side = CapacityConstraint {
            reserved_gb: 0.0,
            usable_gb,
            utilization_pct: 0.0,
            n_equivalent: None,
        };
        ConstraintAnalysis {
            ha_admission: side.clone(),
            n_minus_one: side,
            limiting_constraint: ConstraintKind::HaAdmission,
            limiting_label: "HA 0% (≈N-0)".to_string(),
            insufficient_ha_warning: false,
        }
    }

    fn params(pcpus: u64, selected: &[Resource]) -> BottleneckParams<'_> {
        BottleneckParams {
            total_pcpus: pcpus,
            target_vcpu_ratio: 4.0,
            disk_budget_gb: 0,
            selected,
        }
    }

    #[test]
    fn memory_limits_large_fleet() {
        let cell = CellConfig::new(4, 32, 100, 470);
        let analysis = analyze_bottleneck(&cell, &constraints(22_500.0), &params(960, &Resource::ALL));
        assert_eq!(analysis.max_cells_by_memory, 703);
        assert_eq!(analysis.max_cells_by_cpu, Some(960));
        assert_eq!(analysis.bottleneck, Resource::Memory);
        assert_eq!(analysis.bottleneck_cells, 703);
        assert_eq!(analysis.cpu_headroom_cells, Some(490));
    }

    #[test]
    fn tie_prefers_memory() {
        // 3200 GB / 32 = 100 cells; 100 pCPU × 4 / 4 = 100 cells.
        let cell = CellConfig::new(4, 32, 100, 10);
        let analysis = analyze_bottleneck(&cell, &constraints(3_200.0), &params(100, &Resource::ALL));
        assert_eq!(analysis.max_cells_by_memory, 100);
        assert_eq!(analysis.max_cells_by_cpu, Some(100));
        assert_eq!(analysis.bottleneck, Resource::Memory);
    }

    #[test]
    fn cpu_wins_when_scarcer() {
        let cell = CellConfig::new(8, 32, 100, 10);
        let analysis = analyze_bottleneck(&cell, &constraints(3_200.0), &params(50, &Resource::ALL));
        assert_eq!(analysis.bottleneck, Resource::Cpu);
        assert_eq!(analysis.bottleneck_cells, 25);
        assert_eq!(analysis.cpu_headroom_cells, Some(15));
    }

    #[test]
    fn unselected_resources_are_ignored() {
        let cell = CellConfig::new(8, 32, 100, 10);
        let analysis =
            analyze_bottleneck(&cell, &constraints(3_200.0), &params(50, &[Resource::Memory]));
        assert_eq!(analysis.bottleneck, Resource::Memory);
        assert_eq!(analysis.bottleneck_cells, 100);
    }

    #[test]
    fn missing_cpu_inventory_falls_back_to_memory() {
        let cell = CellConfig::new(4, 32, 100, 10);
        let analysis = analyze_bottleneck(&cell, &constraints(3_200.0), &params(0, &[Resource::Cpu]));
        assert_eq!(analysis.max_cells_by_cpu, None);
        assert_eq!(analysis.cpu_headroom_cells, None);
        assert_eq!(analysis.bottleneck, Resource::Memory);
        assert_eq!(analysis.bottleneck_cells, 100);
    }

    #[test]
    fn disk_budget_can_bind() {
        let cell = CellConfig::new(4, 32, 200, 10);
        let mut p = params(960, &Resource::ALL);
        p.disk_budget_gb = 4_000;
        let analysis = analyze_bottleneck(&cell, &constraints(3_200.0), &p);
        assert_eq!(analysis.max_cells_by_disk, Some(20));
        assert_eq!(analysis.bottleneck, Resource::Disk);
    }
}
