//! Pass/fail threshold gate for CI pipelines.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scenario::CapacitySnapshot;

pub const EXIT_PASSED: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

#[derive(Debug, Error, PartialEq)]
pub enum CheckError {
    #[error("--n1-threshold must be between 0 and 100, got {0}")]
    N1ThresholdOutOfRange(f64),
    #[error("--memory-threshold must be between 0 and 100, got {0}")]
    MemoryThresholdOutOfRange(f64),
    #[error("no infrastructure data: pass --inventory or set [inventory] path")]
    NoInventory,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CheckThresholds {
    pub n1_pct: f64,
    pub memory_pct: f64,
}

impl Default for CheckThresholds {
    fn default() -> Self {
        Self {
            n1_pct: 85.0,
            memory_pct: 90.0,
        }
    }
}

impl CheckThresholds {
    pub fn validate(&self) -> Result<(), CheckError> {
        if !(0.0..=100.0).contains(&self.n1_pct) {
            return Err(CheckError::N1ThresholdOutOfRange(self.n1_pct));
        }
        if !(0.0..=100.0).contains(&self.memory_pct) {
            return Err(CheckError::MemoryThresholdOutOfRange(self.memory_pct));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckResult {
    pub name: String,
    pub value: f64,
    pub threshold: f64,
    pub unit: String,
    pub passed: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Passed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckReport {
    pub status: CheckStatus,
    pub checks: Vec<CheckResult>,
}

impl CheckReport {
    pub fn failed_count(&self) -> usize {
        self.checks.iter().filter(|c| !c.passed).count()
    }

    pub fn exit_code(&self) -> i32 {
        match self.status {
            CheckStatus::Passed => EXIT_PASSED,
            CheckStatus::Failed => EXIT_FAILED,
        }
    }
}

fn check(name: &str, value: f64, threshold: f64) -> CheckResult {
    CheckResult {
        name: name.to_string(),
        value,
        threshold,
        unit: "%".to_string(),
        passed: value <= threshold,
    }
}

/// Gates the deployed layout on N-1 headroom and cell memory utilization.
pub fn evaluate_checks(current: &CapacitySnapshot, thresholds: &CheckThresholds) -> CheckReport {
    let checks = vec![
        check("N-1 capacity", current.n1_utilization_pct, thresholds.n1_pct),
        check(
            "Memory utilization",
            current.utilization_pct,
            thresholds.memory_pct,
        ),
    ];
    let status = if checks.iter().all(|c| c.passed) {
        CheckStatus::Passed
    } else {
        CheckStatus::Failed
    };
    CheckReport { status, checks }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::InfrastructureAggregate;
    use crate::scenario::snapshot::{calculate_snapshot, Demand, SnapshotParams};
    use crate::scenario::{CellConfig, ThresholdTable};

    fn snapshot(app_memory_gb: u64) -> CapacitySnapshot {
        let infra = InfrastructureAggregate {
            total_hosts: 4,
            total_memory_gb: 4_000,
            largest_host_memory_gb: 1_000,
            n1_memory_gb: 3_000,
            total_app_memory_gb: app_memory_gb,
            cell: CellConfig::new(4, 32, 0, 80),
            ..InfrastructureAggregate::default()
        };
        let thresholds = ThresholdTable::default();
        let params = SnapshotParams::new(7.0, 4096, &thresholds);
        calculate_snapshot(&infra.cell, &infra, &Demand::existing(&infra), &params)
    }

    #[test]
    fn passes_within_thresholds() {
        // 2560 GB of cells on 3000 GB N-1: 85.3%.
        let report = evaluate_checks(
            &snapshot(1_000),
            &CheckThresholds {
                n1_pct: 90.0,
                memory_pct: 90.0,
            },
        );
        assert_eq!(report.status, CheckStatus::Passed);
        assert_eq!(report.exit_code(), EXIT_PASSED);
    }

    #[test]
    fn fails_when_any_check_exceeds() {
        let report = evaluate_checks(&snapshot(1_000), &CheckThresholds::default());
        assert_eq!(report.status, CheckStatus::Failed);
        assert_eq!(report.failed_count(), 1);
        assert!(!report.checks[0].passed);
        assert!(report.checks[1].passed);
        assert_eq!(report.exit_code(), EXIT_FAILED);
    }

    #[test]
    fn rejects_out_of_range_thresholds() {
        let bad = CheckThresholds {
            n1_pct: 120.0,
            memory_pct: 90.0,
        };
        assert_eq!(bad.validate(), Err(CheckError::N1ThresholdOutOfRange(120.0)));
        assert!(CheckThresholds::default().validate().is_ok());
    }
}
