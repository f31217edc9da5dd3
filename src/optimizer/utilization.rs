use crate::infrastructure::InfrastructureAggregate;
use crate::optimizer::{ResourceRanking, ResourceUtilization};
use crate::scenario::Resource;

/// Current utilization per resource, highest first.
pub fn rank_resources(infra: &InfrastructureAggregate) -> ResourceRanking {
    let mut resources = resource_list(infra);
    // Stable: equal utilization keeps memory, cpu, disk order.
    resources.sort_by(|a, b| b.used_pct.total_cmp(&a.used_pct));
    for (idx, resource) in resources.iter_mut().enumerate() {
        resource.is_constraining = idx == 0;
    }

    let constraining = resources.first().map(|r| r.resource);
    let summary = match resources.first() {
        Some(top) => format!(
            "{} is the constraint at {:.1}% utilization; address {} capacity before other resources.",
            top.resource, top.used_pct, top.resource
        ),
        None => "No resources to analyze.".to_string(),
    };
    ResourceRanking {
        resources,
        constraining,
        summary,
    }
}

fn resource_list(infra: &InfrastructureAggregate) -> Vec<ResourceUtilization> {
    let mut resources = Vec::new();

    let cell_memory = infra.cell.total_memory_gb();
    if cell_memory > 0 {
        resources.push(entry(
            Resource::Memory,
            infra.total_app_memory_gb,
            cell_memory,
            "GB",
        ));
    }

    let pcpus = infra.total_pcpus();
    if pcpus > 0 {
        resources.push(entry(Resource::Cpu, infra.cell.total_vcpus(), pcpus, "cores"));
    }

    let cell_disk = u64::from(infra.cell.disk_gb) * u64::from(infra.cell.count);
    if cell_disk > 0 {
        resources.push(entry(Resource::Disk, infra.total_app_disk_gb, cell_disk, "GB"));
    }

    resources
}

fn entry(resource: Resource, used: u64, capacity: u64, unit: &str) -> ResourceUtilization {
    ResourceUtilization {
        resource,
        used_pct: used as f64 / capacity as f64 * 100.0,
        used,
        capacity,
        unit: unit.to_string(),
        is_constraining: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::CellConfig;

    #[test]
    fn ranks_highest_utilization_first() {
        let infra = InfrastructureAggregate {
            total_cpu_cores: 100,
            total_app_memory_gb: 800,
            total_app_disk_gb: 900,
            cell: CellConfig::new(4, 32, 100, 40),
            ..InfrastructureAggregate::default()
        };
        let ranking = rank_resources(&infra);
        let order: Vec<Resource> = ranking.resources.iter().map(|r| r.resource).collect();
        // cpu 160%, memory 62.5%, disk 22.5%
        assert_eq!(order, vec![Resource::Cpu, Resource::Memory, Resource::Disk]);
        assert!(ranking.resources[0].is_constraining);
        assert!(!ranking.resources[1].is_constraining);
        assert_eq!(ranking.constraining, Some(Resource::Cpu));
        assert!(ranking.summary.starts_with("cpu is the constraint"));
    }

    #[test]
    fn ties_keep_memory_first() {
        let infra = InfrastructureAggregate {
            total_cpu_cores: 160,
            total_app_memory_gb: 1280,
            cell: CellConfig::new(4, 32, 0, 40),
            ..InfrastructureAggregate::default()
        };
        let ranking = rank_resources(&infra);
        assert_eq!(ranking.constraining, Some(Resource::Memory));
        assert_eq!(ranking.resources.len(), 2);
    }

    #[test]
    fn empty_inventory_has_no_constraint() {
        let ranking = rank_resources(&InfrastructureAggregate::default());
        assert!(ranking.resources.is_empty());
        assert_eq!(ranking.constraining, None);
        assert_eq!(ranking.summary, "No resources to analyze.");
    }
}
