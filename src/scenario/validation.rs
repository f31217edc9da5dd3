use thiserror::Error;

use crate::infrastructure::InfrastructureAggregate;

use super::{CellConfig, CurvePoint, ScenarioInput};

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("selected_resources must name at least one resource")]
    NoResourcesSelected,
    #[error("throughput curve needs at least 2 points, got {0}")]
    CurveTooShort(usize),
    #[error("throughput curve cell counts must be strictly increasing (point {index}: {cells} after {previous})")]
    CurveNotIncreasing {
        index: usize,
        previous: u32,
        cells: u32,
    },
    #[error("overhead_pct must be in [0, 100), got {0}")]
    OverheadOutOfRange(f64),
    #[error("ha_admission_pct must be in [0, 100], got {0}")]
    HaPctOutOfRange(f64),
    #[error("target_vcpu_ratio must be positive, got {0}")]
    VcpuRatioNotPositive(f64),
    #[error("chunk_size_mb must be positive")]
    ChunkSizeZero,
    #[error("proposed cell {field} must be at least 1")]
    EmptyCellShape { field: &'static str },
}

pub fn validate_input(input: &ScenarioInput) -> Result<(), ValidationError> {
    if input.selected_resources.is_empty() {
        return Err(ValidationError::NoResourcesSelected);
    }
    if input.enable_throughput {
        validate_curve(&input.throughput_curve)?;
    }
    validate_overhead(input.overhead_pct)?;
    if let Some(pct) = input.ha_admission_pct {
        validate_ha_pct(pct)?;
    }
    if !input.target_vcpu_ratio.is_finite() || input.target_vcpu_ratio <= 0.0 {
        return Err(ValidationError::VcpuRatioNotPositive(input.target_vcpu_ratio));
    }
    if input.chunk_size_mb == 0 {
        return Err(ValidationError::ChunkSizeZero);
    }
    validate_cell_shape(&input.proposed)
}

pub fn validate_curve(curve: &[CurvePoint]) -> Result<(), ValidationError> {
    if curve.len() < 2 {
        return Err(ValidationError::CurveTooShort(curve.len()));
    }
    for (index, pair) in curve.windows(2).enumerate() {
        if pair[1].cells <= pair[0].cells {
            return Err(ValidationError::CurveNotIncreasing {
                index: index + 1,
                previous: pair[0].cells,
                cells: pair[1].cells,
            });
        }
    }
    Ok(())
}

pub fn validate_overhead(pct: f64) -> Result<(), ValidationError> {
    if !pct.is_finite() || !(0.0..100.0).contains(&pct) {
        return Err(ValidationError::OverheadOutOfRange(pct));
    }
    Ok(())
}

pub fn validate_ha_pct(pct: f64) -> Result<(), ValidationError> {
    if !pct.is_finite() || !(0.0..=100.0).contains(&pct) {
        return Err(ValidationError::HaPctOutOfRange(pct));
    }
    Ok(())
}

pub fn validate_cell_shape(cell: &CellConfig) -> Result<(), ValidationError> {
    if cell.memory_gb == 0 {
        return Err(ValidationError::EmptyCellShape { field: "memory_gb" });
    }
    if cell.cpu == 0 {
        return Err(ValidationError::EmptyCellShape { field: "cpu" });
    }
    Ok(())
}

pub fn validate_infrastructure(infra: &InfrastructureAggregate) -> Result<(), ValidationError> {
    validate_ha_pct(infra.ha_admission_pct)
}
