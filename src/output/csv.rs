use anyhow::Result;

use crate::optimizer::UpgradeRecommendation;
use crate::scenario::{CapacitySnapshot, PlanResult, ScenarioComparison, Warning};

fn snapshot_record(side: &str, snapshot: &CapacitySnapshot) -> Vec<String> {
    vec![
        side.to_string(),
        snapshot.cell_count.to_string(),
        snapshot.cell_cpu.to_string(),
        snapshot.cell_memory_gb.to_string(),
        format!("{:.2}", snapshot.app_capacity_gb),
        format!("{:.2}", snapshot.utilization_pct),
        format!("{:.2}", snapshot.disk_utilization_pct),
        format!("{:.2}", snapshot.n1_utilization_pct),
        snapshot.free_chunks.to_string(),
        format!("{:.2}", snapshot.instances_per_cell),
        format!("{:.2}", snapshot.blast_radius_pct),
        format!("{:.2}", snapshot.vcpu_ratio),
        snapshot.estimated_throughput.to_string(),
        format!("{:?}", snapshot.throughput_status).to_lowercase(),
    ]
}

pub fn comparison_to_csv(result: &ScenarioComparison) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "side",
        "cells",
        "cell_cpu",
        "cell_memory_gb",
        "app_capacity_gb",
        "utilization_pct",
        "disk_utilization_pct",
        "n1_utilization_pct",
        "free_chunks",
        "instances_per_cell",
        "blast_radius_pct",
        "vcpu_ratio",
        "throughput",
        "throughput_status",
    ])?;
    writer.write_record(snapshot_record("current", &result.current))?;
    writer.write_record(snapshot_record("proposed", &result.proposed))?;
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

pub fn warnings_to_csv(warnings: &[Warning]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["severity", "metric", "message", "fixes"])?;
    for warning in warnings {
        let fixes = warning
            .fixes
            .iter()
            .map(|f| f.description.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        writer.write_record([
            warning.severity.to_string(),
            format!("{:?}", warning.metric),
            warning.message.clone(),
            fixes,
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

pub fn plans_to_csv(plans: &[PlanResult]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "cell_cpu",
        "cell_memory_gb",
        "max_cells_by_memory",
        "max_cells_by_cpu",
        "deployable_cells",
        "bottleneck",
        "memory_utilization_pct",
        "cpu_utilization_pct",
        "headroom_cells",
    ])?;
    for plan in plans {
        writer.write_record([
            plan.cell.cpu.to_string(),
            plan.cell.memory_gb.to_string(),
            plan.max_cells_by_memory.to_string(),
            plan.max_cells_by_cpu.to_string(),
            plan.deployable_cells.to_string(),
            plan.bottleneck.as_slug().to_string(),
            format!("{:.2}", plan.memory_utilization_pct),
            format!("{:.2}", plan.cpu_utilization_pct),
            plan.headroom_cells.to_string(),
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

pub fn recommendations_to_csv(items: &[UpgradeRecommendation]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["priority", "kind", "resource", "title", "description", "impact"])?;
    for item in items {
        writer.write_record([
            item.priority.to_string(),
            format!("{:?}", item.kind),
            item.resource.as_slug().to_string(),
            item.title.clone(),
            item.description.clone(),
            item.impact.clone(),
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{ConfigField, FixSuggestion, Severity, WarningMetric};

    #[test]
    fn warnings_join_fixes_in_one_column() {
        let warnings = vec![Warning {
            severity: Severity::Critical,
            metric: WarningMetric::OverCapacity,
            message: "Over capacity, by 10 GB".to_string(),
            change: None,
            fixes: vec![
                FixSuggestion {
                    description: "Add 1 cell".to_string(),
                    field: ConfigField::CellCount,
                    value: 11.0,
                },
                FixSuggestion {
                    description: "Increase cell memory".to_string(),
                    field: ConfigField::CellMemoryGb,
                    value: 64.0,
                },
            ],
        }];
        let csv = warnings_to_csv(&warnings).expect("csv");
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "severity,metric,message,fixes");
        assert_eq!(
            lines[1],
            "critical,OverCapacity,\"Over capacity, by 10 GB\",Add 1 cell; Increase cell memory"
        );
    }
}
