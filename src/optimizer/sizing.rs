use crate::infrastructure::InfrastructureAggregate;
use crate::scenario::{CellConfig, PlanResult, ScenarioEngine, ValidationError};

/// Common cell shapes as (vCPU, memory GB).
pub const SIZING_PRESETS: [(u32, u32); 6] = [
    (4, 32),
    (4, 64),
    (8, 64),
    (8, 128),
    (16, 128),
    (16, 256),
];

/// Plans every preset and keeps those that fit at least one cell.
pub fn sizing_options(
    engine: &ScenarioEngine,
    infra: &InfrastructureAggregate,
    target_vcpu_ratio: f64,
) -> Result<Vec<PlanResult>, ValidationError> {
    let mut options = Vec::new();
    for (cpu, memory_gb) in SIZING_PRESETS {
        let cell = CellConfig::new(cpu, memory_gb, infra.cell.disk_gb, 0);
        let plan = engine.plan(infra, &cell, target_vcpu_ratio)?;
        if plan.deployable_cells > 0 {
            options.push(plan);
        }
    }
    Ok(options)
}
