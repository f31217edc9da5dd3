use crate::infrastructure::InfrastructureAggregate;
use crate::optimizer::utilization::rank_resources;
use crate::optimizer::{
    ImpactLevel, RecommendationReport, UpgradeKind, UpgradeRecommendation, UpgradeTargets,
};
use crate::scenario::Resource;

/// Suggested when utilization is already under target.
const MIN_CELLS_TO_ADD: u32 = 2;
const MIN_HOSTS_TO_ADD: u32 = 1;

pub fn build_recommendations(
    infra: &InfrastructureAggregate,
    targets: &UpgradeTargets,
) -> RecommendationReport {
    let ranking = rank_resources(infra);
    let mut recommendations = Vec::new();

    if let Some(resource) = ranking.constraining {
        recommendations.extend(add_cells(infra, resource, targets));
        recommendations.extend(resize_cells(infra, resource));
        recommendations.extend(add_hosts(infra, resource, targets));
    }
    for (idx, recommendation) in recommendations.iter_mut().enumerate() {
        recommendation.priority = idx + 1;
    }

    RecommendationReport {
        ranking,
        recommendations,
    }
}

fn recommendation(
    kind: UpgradeKind,
    resource: Resource,
    title: &str,
    description: String,
    impact: String,
) -> UpgradeRecommendation {
    let impact_level = match kind {
        UpgradeKind::AddCells => ImpactLevel::High,
        UpgradeKind::ResizeCells => ImpactLevel::Medium,
        UpgradeKind::AddHosts => ImpactLevel::Low,
    };
    UpgradeRecommendation {
        priority: 0,
        kind,
        resource,
        title: title.to_string(),
        description,
        impact,
        impact_level,
        cells_to_add: None,
        hosts_to_add: None,
        new_cell_memory_gb: None,
        new_cell_cpu: None,
        new_cell_disk_gb: None,
    }
}

/// Extra units needed so `used` sits at `target_pct` of capacity.
fn units_to_target(used: u64, capacity: u64, per_unit: u64, target_pct: f64) -> u32 {
    let utilization = used as f64 / capacity as f64 * 100.0;
    if utilization <= target_pct {
        return MIN_CELLS_TO_ADD;
    }
    let needed = used as f64 * 100.0 / target_pct - capacity as f64;
    let units = (needed / per_unit as f64).floor() as u64 + 1;
    u32::try_from(units).unwrap_or(u32::MAX).max(1)
}

fn add_cells(
    infra: &InfrastructureAggregate,
    resource: Resource,
    targets: &UpgradeTargets,
) -> Option<UpgradeRecommendation> {
    let cell = infra.cell;
    let (cells, impact) = match resource {
        Resource::Memory => {
            if cell.memory_gb == 0 || cell.count == 0 {
                return None;
            }
            let cells = units_to_target(
                infra.total_app_memory_gb,
                cell.total_memory_gb(),
                u64::from(cell.memory_gb),
                targets.cell_utilization_pct,
            );
            let gain = u64::from(cells) * u64::from(cell.memory_gb);
            (cells, format!("Increases cell memory capacity by {gain} GB"))
        }
        Resource::Cpu => {
            if infra.total_pcpus() == 0 || cell.cpu == 0 {
                return None;
            }
            // More cells raise the vCPU count; offered only as a spreading option.
            let gain = MIN_CELLS_TO_ADD * cell.cpu;
            (
                MIN_CELLS_TO_ADD,
                format!("Adds {gain} vCPUs (raises the overcommit ratio)"),
            )
        }
        Resource::Disk => {
            if cell.disk_gb == 0 || cell.count == 0 {
                return None;
            }
            let capacity = u64::from(cell.disk_gb) * u64::from(cell.count);
            let cells = units_to_target(
                infra.total_app_disk_gb,
                capacity,
                u64::from(cell.disk_gb),
                targets.cell_utilization_pct,
            );
            let gain = u64::from(cells) * u64::from(cell.disk_gb);
            (cells, format!("Increases cell disk capacity by {gain} GB"))
        }
    };

    let mut rec = recommendation(
        UpgradeKind::AddCells,
        resource,
        "Add cells",
        format!("Add {cells} more {} cells to increase capacity", cell.label()),
        impact,
    );
    rec.cells_to_add = Some(cells);
    Some(rec)
}

fn resize_cells(infra: &InfrastructureAggregate, resource: Resource) -> Option<UpgradeRecommendation> {
    let cell = infra.cell;
    if cell.count == 0 {
        return None;
    }
    let rec = match resource {
        Resource::Memory => {
            let memory = cell.memory_gb.saturating_mul(2);
            let mut rec = recommendation(
                UpgradeKind::ResizeCells,
                resource,
                "Resize cells",
                format!("Increase cell memory from {} GB to {memory} GB", cell.memory_gb),
                format!(
                    "Doubles memory per cell (total {} GB → {} GB)",
                    cell.total_memory_gb(),
                    u64::from(memory) * u64::from(cell.count)
                ),
            );
            rec.new_cell_memory_gb = Some(memory);
            rec.new_cell_cpu = Some(cell.cpu);
            rec
        }
        Resource::Cpu => {
            let cpu = cell.cpu.saturating_add(2);
            let mut rec = recommendation(
                UpgradeKind::ResizeCells,
                resource,
                "Resize cells",
                format!("Increase cell vCPU from {} to {cpu}", cell.cpu),
                "More vCPU per cell for better parallelism".to_string(),
            );
            rec.new_cell_memory_gb = Some(cell.memory_gb);
            rec.new_cell_cpu = Some(cpu);
            rec
        }
        Resource::Disk => {
            let disk = cell.disk_gb.saturating_mul(2);
            let mut rec = recommendation(
                UpgradeKind::ResizeCells,
                resource,
                "Resize cells",
                format!("Increase cell disk from {} GB to {disk} GB", cell.disk_gb),
                "Doubles ephemeral disk per cell".to_string(),
            );
            rec.new_cell_disk_gb = Some(disk);
            rec
        }
    };
    Some(rec)
}

fn add_hosts(
    infra: &InfrastructureAggregate,
    resource: Resource,
    targets: &UpgradeTargets,
) -> Option<UpgradeRecommendation> {
    let (hosts, impact) = match resource {
        Resource::Memory => {
            let per_host = infra.largest_host_memory_gb;
            if per_host == 0 {
                return None;
            }
            let cell_memory = infra.cell.total_memory_gb() as f64;
            let utilization = if infra.total_memory_gb == 0 {
                0.0
            } else {
                cell_memory / infra.total_memory_gb as f64 * 100.0
            };
            let hosts = if utilization <= targets.host_memory_utilization_pct {
                MIN_HOSTS_TO_ADD
            } else {
                let needed = (cell_memory * 100.0 / targets.host_memory_utilization_pct
                    / per_host as f64)
                    .floor() as u64
                    + 1;
                hosts_beyond(needed, infra.total_hosts)
            };
            let gain = u64::from(hosts) * per_host;
            (
                hosts,
                format!("Adds {gain} GB of physical memory and improves HA headroom"),
            )
        }
        Resource::Cpu => {
            let cores = infra.cpu_cores_per_host;
            if cores == 0 || infra.total_pcpus() == 0 {
                return None;
            }
            let vcpus = infra.cell.total_vcpus() as f64;
            let ratio = vcpus / infra.total_pcpus() as f64;
            let hosts = if ratio <= targets.vcpu_ratio {
                MIN_HOSTS_TO_ADD
            } else {
                let needed = (vcpus / targets.vcpu_ratio / f64::from(cores)).floor() as u64 + 1;
                hosts_beyond(needed, infra.total_hosts)
            };
            let gain = hosts * cores;
            (
                hosts,
                format!("Adds {gain} physical cores, reducing vCPU overcommit"),
            )
        }
        Resource::Disk => (
            MIN_HOSTS_TO_ADD,
            "Adds physical capacity and improves HA resilience".to_string(),
        ),
    };

    let mut rec = recommendation(
        UpgradeKind::AddHosts,
        resource,
        "Add physical hosts",
        format!("Add {hosts} physical host(s) to the fleet"),
        impact,
    );
    rec.hosts_to_add = Some(hosts);
    Some(rec)
}

fn hosts_beyond(needed: u64, current: u32) -> u32 {
    let extra = needed.saturating_sub(u64::from(current));
    u32::try_from(extra).unwrap_or(u32::MAX).max(MIN_HOSTS_TO_ADD)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::CellConfig;

    fn memory_bound() -> InfrastructureAggregate {
        InfrastructureAggregate {
            total_hosts: 4,
            total_memory_gb: 4_096,
            largest_host_memory_gb: 1_024,
            total_cpu_cores: 256,
            cpu_cores_per_host: 64,
            total_app_memory_gb: 900,
            cell: CellConfig::new(4, 32, 0, 32),
            ..InfrastructureAggregate::default()
        }
    }

    #[test]
    fn memory_constraint_yields_three_paths() {
        let report = build_recommendations(&memory_bound(), &UpgradeTargets::default());
        assert_eq!(report.ranking.constraining, Some(Resource::Memory));
        let kinds: Vec<UpgradeKind> = report.recommendations.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![UpgradeKind::AddCells, UpgradeKind::ResizeCells, UpgradeKind::AddHosts]
        );
        let priorities: Vec<usize> = report.recommendations.iter().map(|r| r.priority).collect();
        assert_eq!(priorities, vec![1, 2, 3]);
        // 900 GB at 70% needs 1285.7 GB; 1024 deployed, so 9 more 32 GB cells.
        assert_eq!(report.recommendations[0].cells_to_add, Some(9));
        assert_eq!(report.recommendations[1].new_cell_memory_gb, Some(64));
        assert_eq!(report.recommendations[2].hosts_to_add, Some(1));
    }

    #[test]
    fn cpu_constraint_targets_ratio() {
        let infra = InfrastructureAggregate {
            total_hosts: 2,
            total_memory_gb: 2_048,
            largest_host_memory_gb: 1_024,
            total_cpu_cores: 64,
            cpu_cores_per_host: 32,
            total_app_memory_gb: 100,
            cell: CellConfig::new(8, 32, 0, 40),
            ..InfrastructureAggregate::default()
        };
        let report = build_recommendations(&infra, &UpgradeTargets::default());
        assert_eq!(report.ranking.constraining, Some(Resource::Cpu));
        let hosts = report
            .recommendations
            .iter()
            .find(|r| r.kind == UpgradeKind::AddHosts)
            .expect("host recommendation");
        // 320 vCPU at 4:1 needs 80 cores = 3 hosts of 32; 2 present.
        assert_eq!(hosts.hosts_to_add, Some(1));
        let resize = &report.recommendations[1];
        assert_eq!(resize.new_cell_cpu, Some(10));
    }

    #[test]
    fn empty_inventory_has_no_recommendations() {
        let report =
            build_recommendations(&InfrastructureAggregate::default(), &UpgradeTargets::default());
        assert!(report.recommendations.is_empty());
    }
}
