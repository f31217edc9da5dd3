use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Row, Table};

use crate::check::CheckReport;
use crate::infrastructure::InfrastructureAggregate;
use crate::optimizer::{ResourceRanking, UpgradeRecommendation};
use crate::scenario::{
    CapacitySnapshot, OverallStatus, PlanResult, ScenarioComparison, Severity, ThroughputStatus,
    Warning,
};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn severity_cell(severity: Severity) -> Cell {
    let cell = Cell::new(severity.to_string().to_uppercase());
    match severity {
        Severity::Critical => cell.fg(Color::Red),
        Severity::Warning => cell.fg(Color::Yellow),
        Severity::Info => cell.fg(Color::Cyan),
    }
}

fn throughput_label(snapshot: &CapacitySnapshot) -> String {
    match snapshot.throughput_status {
        ThroughputStatus::Disabled => "disabled".to_string(),
        ThroughputStatus::Unknown => "-".to_string(),
        status => format!("{} ({:?})", snapshot.estimated_throughput, status).to_lowercase(),
    }
}

pub fn render_comparison_table(result: &ScenarioComparison) -> String {
    let mut table = new_table();
    table.set_header(vec!["Metric", "Current", "Proposed", "Change"]);

    let current = &result.current;
    let proposed = &result.proposed;
    let rows: Vec<(&str, String, String, String)> = vec![
        (
            "Cells",
            format!("{} × {}", current.cell_count, current.cell_config().label()),
            format!("{} × {}", proposed.cell_count, proposed.cell_config().label()),
            format!(
                "{:+}",
                i64::from(proposed.cell_count) - i64::from(current.cell_count)
            ),
        ),
        (
            "App capacity (GB)",
            format!("{:.0}", current.app_capacity_gb),
            format!("{:.0}", proposed.app_capacity_gb),
            format!("{:+.0}", result.delta.capacity_change_gb),
        ),
        (
            "Memory utilization",
            format!("{:.1}%", current.utilization_pct),
            format!("{:.1}%", proposed.utilization_pct),
            format!("{:+.1}", result.delta.utilization_change_pct),
        ),
        (
            "Disk utilization",
            format!("{:.1}%", current.disk_utilization_pct),
            format!("{:.1}%", proposed.disk_utilization_pct),
            format!("{:+.1}", result.delta.disk_utilization_change_pct),
        ),
        (
            "N-1 utilization",
            format!("{:.1}%", current.n1_utilization_pct),
            format!("{:.1}%", proposed.n1_utilization_pct),
            format!(
                "{:+.1}",
                proposed.n1_utilization_pct - current.n1_utilization_pct
            ),
        ),
        (
            "Free chunks",
            current.free_chunks.to_string(),
            proposed.free_chunks.to_string(),
            format!("{:+}", proposed.free_chunks - current.free_chunks),
        ),
        (
            "Instances per cell",
            format!("{:.1}", current.instances_per_cell),
            format!("{:.1}", proposed.instances_per_cell),
            format!("{:?}", result.delta.resilience_change).to_lowercase(),
        ),
        (
            "Blast radius",
            format!("{:.2}%", current.blast_radius_pct),
            format!("{:.2}%", proposed.blast_radius_pct),
            format!(
                "{:+.2}",
                proposed.blast_radius_pct - current.blast_radius_pct
            ),
        ),
        (
            "vCPU:pCPU",
            format!("{:.2}:1", current.vcpu_ratio),
            format!("{:.2}:1", proposed.vcpu_ratio),
            proposed
                .cpu_risk_level
                .map(|level| format!("{level:?}").to_lowercase())
                .unwrap_or_else(|| "-".to_string()),
        ),
        (
            "Throughput",
            throughput_label(current),
            throughput_label(proposed),
            format!(
                "{:+}",
                i64::from(proposed.estimated_throughput) - i64::from(current.estimated_throughput)
            ),
        ),
    ];
    for (metric, before, after, change) in rows {
        table.add_row(vec![metric.to_string(), before, after, change]);
    }

    let status = match result.overall_status() {
        OverallStatus::Good => "GOOD",
        OverallStatus::Warning => "WARNING",
        OverallStatus::Critical => "CRITICAL",
    };
    let mut out = table.to_string();
    out.push_str(&format!(
        "\nLimiting constraint: {} ({:.1}% utilized)\nBottleneck: {} (max {} cells)\nStatus: {status}",
        result.constraints.limiting_label,
        result.constraints.limiting().utilization_pct,
        result.bottleneck.bottleneck,
        result.bottleneck.bottleneck_cells,
    ));
    if !result.warnings.is_empty() {
        out.push('\n');
        out.push_str(&render_warnings_table(&result.warnings));
    }
    out
}

pub fn render_warnings_table(warnings: &[Warning]) -> String {
    let mut table = new_table();
    table.set_header(vec!["Severity", "Warning", "Suggested fixes"]);
    for warning in warnings {
        let fixes = warning
            .fixes
            .iter()
            .map(|f| f.description.clone())
            .collect::<Vec<_>>()
            .join("\n");
        table.add_row(Row::from(vec![
            severity_cell(warning.severity),
            Cell::new(&warning.message),
            Cell::new(if fixes.is_empty() { "-".to_string() } else { fixes }),
        ]));
    }
    table.to_string()
}

pub fn render_plan_table(plans: &[PlanResult]) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "Cell size",
        "Max (memory)",
        "Max (CPU)",
        "Deployable",
        "Bottleneck",
        "Memory used",
        "vCPU used",
        "Headroom",
    ]);
    for plan in plans {
        table.add_row(vec![
            plan.cell.label(),
            plan.max_cells_by_memory.to_string(),
            if plan.max_cells_by_cpu == 0 {
                "-".to_string()
            } else {
                plan.max_cells_by_cpu.to_string()
            },
            plan.deployable_cells.to_string(),
            plan.bottleneck.to_string(),
            format!(
                "{} GB ({:.1}%)",
                plan.memory_used_gb, plan.memory_utilization_pct
            ),
            format!("{} ({:.1}%)", plan.vcpus_used, plan.cpu_utilization_pct),
            format!("{:+}", plan.headroom_cells),
        ]);
    }
    table.to_string()
}

pub fn render_ranking_table(ranking: &ResourceRanking) -> String {
    let mut table = new_table();
    table.set_header(vec!["Resource", "Used", "Capacity", "Utilization", "Constraining"]);
    for resource in &ranking.resources {
        let flag = if resource.is_constraining {
            Cell::new("YES").fg(Color::Red)
        } else {
            Cell::new("no")
        };
        table.add_row(Row::from(vec![
            Cell::new(resource.resource.to_string()),
            Cell::new(format!("{} {}", resource.used, resource.unit)),
            Cell::new(format!("{} {}", resource.capacity, resource.unit)),
            Cell::new(format!("{:.1}%", resource.used_pct)),
            flag,
        ]));
    }
    format!("{table}\n{}", ranking.summary)
}

pub fn render_recommendations_table(items: &[UpgradeRecommendation]) -> String {
    let mut table = new_table();
    table.set_header(vec!["Priority", "Title", "Resource", "Impact", "Description"]);
    for item in items {
        table.add_row(vec![
            item.priority.to_string(),
            item.title.clone(),
            item.resource.to_string(),
            format!("{:?}: {}", item.impact_level, item.impact),
            item.description.clone(),
        ]);
    }
    table.to_string()
}

pub fn render_infrastructure_table(infra: &InfrastructureAggregate) -> String {
    let mut table = new_table();
    table.set_header(vec!["Field", "Value"]);
    let rows = [
        ("Hosts", infra.total_hosts.to_string()),
        ("Host memory", format!("{} GB", infra.total_memory_gb)),
        ("N-1 memory", format!("{} GB", infra.n1_memory_gb)),
        ("Physical cores", infra.total_cpu_cores.to_string()),
        ("HA admission", format!("{:.0}%", infra.ha_admission_pct)),
        (
            "Cells",
            format!("{} × {}", infra.cell.count, infra.cell.label()),
        ),
        ("App memory", format!("{} GB", infra.total_app_memory_gb)),
        ("App instances", infra.total_app_instances.to_string()),
    ];
    for (field, value) in rows {
        table.add_row(vec![field.to_string(), value]);
    }
    table.to_string()
}

pub fn render_check_report(report: &CheckReport) -> String {
    let mut out = String::new();
    for check in &report.checks {
        let symbol = if check.passed { "✓" } else { "✗" };
        out.push_str(&format!(
            "{symbol} {}: {:.0}{} (threshold: {:.0}{})\n",
            check.name, check.value, check.unit, check.threshold, check.unit
        ));
    }
    let failed = report.failed_count();
    if failed > 0 {
        out.push_str(&format!("\nFAILED: {failed} check(s) exceeded threshold"));
    } else {
        out.push_str(&format!(
            "\nPASSED: All {} check(s) within thresholds",
            report.checks.len()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::{CheckResult, CheckStatus};

    #[test]
    fn check_report_lists_each_check() {
        let report = CheckReport {
            status: CheckStatus::Failed,
            checks: vec![
                CheckResult {
                    name: "N-1 capacity".to_string(),
                    value: 91.2,
                    threshold: 85.0,
                    unit: "%".to_string(),
                    passed: false,
                },
                CheckResult {
                    name: "Memory utilization".to_string(),
                    value: 40.0,
                    threshold: 90.0,
                    unit: "%".to_string(),
                    passed: true,
                },
            ],
        };
        let rendered = render_check_report(&report);
        assert!(rendered.starts_with("✗ N-1 capacity: 91% (threshold: 85%)"));
        assert!(rendered.ends_with("FAILED: 1 check(s) exceeded threshold"));
    }
}
