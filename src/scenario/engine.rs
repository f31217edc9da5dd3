use tracing::debug;

use crate::infrastructure::InfrastructureAggregate;

use super::bottleneck::{analyze_bottleneck, BottleneckParams};
use super::constraints::analyze_constraints;
use super::snapshot::{calculate_snapshot, Demand, SnapshotParams};
use super::thresholds::ThresholdTable;
use super::throughput;
use super::validation::{validate_infrastructure, validate_input, ValidationError};
use super::warnings::{compute_delta, detect_changes, generate_warnings, LayoutSide, WarningContext};
use super::{
    BottleneckAnalysis, CapacitySnapshot, CellConfig, ConstraintAnalysis, ScenarioComparison,
    ScenarioInput,
};

/// Runs current-vs-proposed comparisons against a fixed threshold table.
#[derive(Debug, Clone, Default)]
pub struct ScenarioEngine {
    thresholds: ThresholdTable,
}

struct SideResult {
    snapshot: CapacitySnapshot,
    constraints: ConstraintAnalysis,
    bottleneck: BottleneckAnalysis,
}

impl ScenarioEngine {
    pub fn new(thresholds: ThresholdTable) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &ThresholdTable {
        &self.thresholds
    }

    pub fn compare(
        &self,
        infra: &InfrastructureAggregate,
        input: &ScenarioInput,
    ) -> Result<ScenarioComparison, ValidationError> {
        validate_input(input)?;
        validate_infrastructure(infra)?;

        let proposed_infra = match &input.hosts {
            Some(hosts) => infra.with_hosts(hosts),
            None => infra.clone(),
        };
        let current_ha = infra.ha_admission_pct;
        let proposed_ha = input.ha_admission_pct.unwrap_or(current_ha);

        let current_demand = Demand::existing(infra);
        let proposed_demand = current_demand.with_workload(input.additional_workload.as_ref());

        let current = self.evaluate_side(&infra.cell, infra, current_demand, current_ha, input);
        let proposed = self.evaluate_side(
            &input.proposed,
            &proposed_infra,
            proposed_demand,
            proposed_ha,
            input,
        );

        let changes = detect_changes(
            LayoutSide {
                cell: &infra.cell,
                infra,
                ha_admission_pct: current_ha,
            },
            LayoutSide {
                cell: &input.proposed,
                infra: &proposed_infra,
                ha_admission_pct: proposed_ha,
            },
        );
        let ctx = WarningContext {
            proposed_cell: &input.proposed,
            infra: &proposed_infra,
            constraints: &proposed.constraints,
            changes: &changes,
            demand: proposed_demand,
            input,
            ha_admission_pct: proposed_ha,
            thresholds: &self.thresholds,
        };
        let warnings = generate_warnings(&current.snapshot, &proposed.snapshot, &ctx);
        let delta = compute_delta(&current.snapshot, &proposed.snapshot);

        debug!(
            proposed = %input.proposed.label(),
            cells = input.proposed.count,
            limiting = %proposed.constraints.limiting_label,
            bottleneck = %proposed.bottleneck.bottleneck,
            warnings = warnings.len(),
            "scenario compared"
        );

        Ok(ScenarioComparison {
            current: current.snapshot,
            proposed: proposed.snapshot,
            delta,
            constraints: proposed.constraints,
            bottleneck: proposed.bottleneck,
            changes,
            warnings,
        })
    }

    fn evaluate_side(
        &self,
        cell: &CellConfig,
        infra: &InfrastructureAggregate,
        demand: Demand,
        ha_admission_pct: f64,
        input: &ScenarioInput,
    ) -> SideResult {
        let params = SnapshotParams::new(input.overhead_pct, input.chunk_size_mb, &self.thresholds);
        let constraints = analyze_constraints(infra, cell, ha_admission_pct);
        let bottleneck = analyze_bottleneck(
            cell,
            &constraints,
            &BottleneckParams {
                total_pcpus: infra.total_pcpus(),
                target_vcpu_ratio: input.target_vcpu_ratio,
                disk_budget_gb: infra.total_disk_gb,
                selected: &input.selected_resources,
            },
        );
        let estimate = throughput::evaluate(
            &input.throughput_curve,
            cell.count,
            input.enable_throughput,
            &self.thresholds,
        );
        let snapshot = calculate_snapshot(cell, infra, &demand, &params)
            .with_throughput(estimate)
            .with_bottleneck(&bottleneck);
        SideResult {
            snapshot,
            constraints,
            bottleneck,
        }
    }
}

/// Compares with the default threshold table.
pub fn compare(
    infra: &InfrastructureAggregate,
    input: &ScenarioInput,
) -> Result<ScenarioComparison, ValidationError> {
    ScenarioEngine::default().compare(infra, input)
}
