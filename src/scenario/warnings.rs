use crate::infrastructure::InfrastructureAggregate;

use super::fixes;
use super::snapshot::Demand;
use super::thresholds::{ThresholdTable, OVER_CAPACITY_PCT};
use super::throughput;
use super::{
    ratio_or_zero, CapacitySnapshot, CellConfig, ConfigChange, ConfigField, ConstraintAnalysis,
    ConstraintKind, Delta, FixSuggestion, Resource, ResilienceChange, ScenarioInput, Severity,
    ThroughputStatus, Warning, WarningMetric, DEFAULT_DISK_OVERHEAD_PCT,
};

pub const MAX_FIXES_PER_WARNING: usize = 2;

/// Pools shrinking by at least this share get an informational note.
const REDUNDANCY_DROP_PCT: f64 = 50.0;

pub fn compute_delta(current: &CapacitySnapshot, proposed: &CapacitySnapshot) -> Delta {
    Delta {
        capacity_change_gb: proposed.app_capacity_gb - current.app_capacity_gb,
        disk_capacity_change_gb: proposed.disk_capacity_gb - current.disk_capacity_gb,
        utilization_change_pct: proposed.utilization_pct - current.utilization_pct,
        disk_utilization_change_pct: proposed.disk_utilization_pct - current.disk_utilization_pct,
        resilience_change: classify_resilience(current, proposed),
    }
}

pub fn classify_resilience(
    current: &CapacitySnapshot,
    proposed: &CapacitySnapshot,
) -> ResilienceChange {
    if proposed.cell_count > current.cell_count && proposed.fault_impact < current.fault_impact {
        ResilienceChange::Improved
    } else if proposed.cell_count < current.cell_count
        && proposed.fault_impact > current.fault_impact
    {
        ResilienceChange::Reduced
    } else {
        ResilienceChange::Unchanged
    }
}

/// One side of a comparison as far as change detection cares.
#[derive(Debug, Clone, Copy)]
pub struct LayoutSide<'a> {
    pub cell: &'a CellConfig,
    pub infra: &'a InfrastructureAggregate,
    pub ha_admission_pct: f64,
}

pub fn detect_changes(current: LayoutSide<'_>, proposed: LayoutSide<'_>) -> Vec<ConfigChange> {
    let pairs = [
        (
            ConfigField::CellCount,
            f64::from(current.cell.count),
            f64::from(proposed.cell.count),
        ),
        (
            ConfigField::CellMemoryGb,
            f64::from(current.cell.memory_gb),
            f64::from(proposed.cell.memory_gb),
        ),
        (
            ConfigField::CellCpu,
            f64::from(current.cell.cpu),
            f64::from(proposed.cell.cpu),
        ),
        (
            ConfigField::CellDiskGb,
            f64::from(current.cell.disk_gb),
            f64::from(proposed.cell.disk_gb),
        ),
        (
            ConfigField::HostCount,
            f64::from(current.infra.total_hosts),
            f64::from(proposed.infra.total_hosts),
        ),
        (
            ConfigField::HaAdmissionPct,
            current.ha_admission_pct,
            proposed.ha_admission_pct,
        ),
    ];
    pairs
        .into_iter()
        .filter(|(_, previous, next)| previous != next)
        .map(|(field, previous, next)| ConfigChange {
            field,
            previous,
            proposed: next,
            delta: next - previous,
            delta_pct: ratio_or_zero(100.0 * (next - previous), previous),
        })
        .collect()
}

/// Everything the warning rules need about the proposed side.
#[derive(Debug, Clone, Copy)]
pub struct WarningContext<'a> {
    pub proposed_cell: &'a CellConfig,
    pub infra: &'a InfrastructureAggregate,
    pub constraints: &'a ConstraintAnalysis,
    pub changes: &'a [ConfigChange],
    pub demand: Demand,
    pub input: &'a ScenarioInput,
    pub ha_admission_pct: f64,
    pub thresholds: &'a ThresholdTable,
}

pub fn generate_warnings(
    current: &CapacitySnapshot,
    proposed: &CapacitySnapshot,
    ctx: &WarningContext<'_>,
) -> Vec<Warning> {
    let mut warnings: Vec<Warning> = [
        ctx.over_capacity(proposed),
        ctx.memory_utilization(proposed),
        ctx.disk_utilization(proposed),
        ctx.constraint_utilization(),
        ctx.ha_reservation(),
        ctx.vcpu_ratio(proposed),
        ctx.free_chunks(proposed),
        ctx.fault_impact(proposed),
        ctx.throughput(proposed),
        ctx.blast_radius(proposed),
        ctx.redundancy(current, proposed),
    ]
    .into_iter()
    .flatten()
    .collect();
    rank_warnings(&mut warnings);
    warnings
}

/// Critical first; insertion order is kept within a severity.
pub fn rank_warnings(warnings: &mut [Warning]) {
    warnings.sort_by(|a, b| b.severity.cmp(&a.severity));
}

fn fix(field: ConfigField, value: f64, description: String) -> FixSuggestion {
    FixSuggestion {
        description,
        field,
        value,
    }
}

impl WarningContext<'_> {
    fn change_for(&self, fields: &[ConfigField]) -> Option<ConfigChange> {
        fields
            .iter()
            .find_map(|field| self.changes.iter().find(|c| c.field == *field))
            .cloned()
    }

    fn warning(
        &self,
        severity: Severity,
        metric: WarningMetric,
        message: String,
        related: &[ConfigField],
        mut fixes: Vec<FixSuggestion>,
    ) -> Warning {
        fixes.truncate(MAX_FIXES_PER_WARNING);
        Warning {
            severity,
            metric,
            message,
            change: self.change_for(related),
            fixes,
        }
    }

    fn memory_fixes(&self, target_pct: f64) -> Vec<FixSuggestion> {
        let cell = self.proposed_cell;
        let overhead = self.input.overhead_pct;
        let mut out = Vec::new();
        if let Some(cells) =
            fixes::cells_for_memory_utilization(self.demand.memory_gb, cell.memory_gb, overhead, target_pct)
        {
            if cells > u64::from(cell.count) {
                out.push(fix(
                    ConfigField::CellCount,
                    cells as f64,
                    format!("Increase cell count to {cells} to bring memory utilization to {target_pct:.0}%"),
                ));
            }
        }
        if let Some(memory) =
            fixes::cell_memory_for_memory_utilization(self.demand.memory_gb, cell.count, overhead, target_pct)
        {
            if memory > u64::from(cell.memory_gb) {
                out.push(fix(
                    ConfigField::CellMemoryGb,
                    memory as f64,
                    format!("Increase cell memory to {memory} GB to bring memory utilization to {target_pct:.0}%"),
                ));
            }
        }
        out
    }

    fn over_capacity(&self, proposed: &CapacitySnapshot) -> Option<Warning> {
        if proposed.utilization_pct <= OVER_CAPACITY_PCT {
            return None;
        }
        let target = self
            .thresholds
            .memory_utilization
            .rising_target(Severity::Critical);
        Some(self.warning(
            Severity::Critical,
            WarningMetric::OverCapacity,
            format!(
                "Insufficient capacity: app demand is {:.1}% of cell capacity ({:.0} GB needed, {:.0} GB available)",
                proposed.utilization_pct, self.demand.memory_gb, proposed.app_capacity_gb
            ),
            &[ConfigField::CellCount, ConfigField::CellMemoryGb],
            self.memory_fixes(target),
        ))
    }

    fn memory_utilization(&self, proposed: &CapacitySnapshot) -> Option<Warning> {
        // Over-capacity already reports this pool.
        if proposed.utilization_pct > OVER_CAPACITY_PCT {
            return None;
        }
        let band = self.thresholds.memory_utilization;
        let severity = band.rising(proposed.utilization_pct)?;
        let message = match severity {
            Severity::Critical => format!(
                "Cell memory utilization critically high ({:.1}%)",
                proposed.utilization_pct
            ),
            _ => format!(
                "Cell memory utilization elevated ({:.1}%)",
                proposed.utilization_pct
            ),
        };
        Some(self.warning(
            severity,
            WarningMetric::MemoryUtilization,
            message,
            &[ConfigField::CellCount, ConfigField::CellMemoryGb],
            self.memory_fixes(band.rising_target(severity)),
        ))
    }

    fn disk_utilization(&self, proposed: &CapacitySnapshot) -> Option<Warning> {
        if !self.input.is_selected(Resource::Disk) || proposed.disk_capacity_gb <= 0.0 {
            return None;
        }
        let band = self.thresholds.disk_utilization;
        let severity = band.rising(proposed.disk_utilization_pct)?;
        let target = band.rising_target(severity);
        let cell = self.proposed_cell;
        let usable_share = 1.0 - DEFAULT_DISK_OVERHEAD_PCT / 100.0;

        let mut suggestions = Vec::new();
        if let Some(cells) = fixes::units_for_utilization(
            self.demand.disk_gb,
            f64::from(cell.disk_gb) * usable_share,
            target,
        ) {
            if cells > u64::from(cell.count) {
                suggestions.push(fix(
                    ConfigField::CellCount,
                    cells as f64,
                    format!("Increase cell count to {cells} to bring disk utilization to {target:.0}%"),
                ));
            }
        }
        if let Some(disk) = fixes::units_for_utilization(
            self.demand.disk_gb,
            f64::from(cell.count) * usable_share,
            target,
        ) {
            if disk > u64::from(cell.disk_gb) {
                suggestions.push(fix(
                    ConfigField::CellDiskGb,
                    disk as f64,
                    format!("Increase cell disk to {disk} GB to bring disk utilization to {target:.0}%"),
                ));
            }
        }

        let level = if severity == Severity::Critical {
            "critically high"
        } else {
            "elevated"
        };
        Some(self.warning(
            severity,
            WarningMetric::DiskUtilization,
            format!(
                "Cell disk utilization {level} ({:.1}%)",
                proposed.disk_utilization_pct
            ),
            &[ConfigField::CellCount, ConfigField::CellDiskGb],
            suggestions,
        ))
    }

    fn constraint_utilization(&self) -> Option<Warning> {
        let limiting = self.constraints.limiting();
        let band = self.thresholds.constraint_utilization;
        let severity = band.rising(limiting.utilization_pct)?;
        let target = band.rising_target(severity);
        let cell = self.proposed_cell;
        let platform = self.infra.platform_overhead_gb as f64;
        let kind = self.constraints.limiting_constraint;

        let message = match (kind, severity) {
            (ConstraintKind::HaAdmission, Severity::Critical) => format!(
                "Exceeds HA Admission Control capacity ({}): {:.1}% of usable memory committed",
                self.constraints.limiting_label, limiting.utilization_pct
            ),
            (ConstraintKind::HaAdmission, _) => format!(
                "Approaching HA Admission Control limit ({}): {:.1}% of usable memory committed",
                self.constraints.limiting_label, limiting.utilization_pct
            ),
            (ConstraintKind::NMinusOne, Severity::Critical) => format!(
                "Exceeds N-1 capacity safety margin: {:.1}% of usable memory committed",
                limiting.utilization_pct
            ),
            (ConstraintKind::NMinusOne, _) => format!(
                "Approaching N-1 capacity limit: {:.1}% of usable memory committed",
                limiting.utilization_pct
            ),
        };

        let mut suggestions = Vec::new();
        match fixes::cells_for_constraint_utilization(limiting.usable_gb, platform, cell.memory_gb, target) {
            Some(cells) if cells >= 1 && cells < u64::from(cell.count) => {
                suggestions.push(fix(
                    ConfigField::CellCount,
                    cells as f64,
                    format!("Reduce cell count to {cells} to return to {target:.0}% {kind} utilization"),
                ));
            }
            _ => {
                if let Some(memory) = fixes::cell_memory_for_constraint_utilization(
                    limiting.usable_gb,
                    platform,
                    cell.count,
                    target,
                ) {
                    if memory >= 1 && memory < u64::from(cell.memory_gb) {
                        suggestions.push(fix(
                            ConfigField::CellMemoryGb,
                            memory as f64,
                            format!("Reduce cell memory to {memory} GB to return to {target:.0}% {kind} utilization"),
                        ));
                    }
                }
            }
        }
        let required = cell.total_memory_gb() as f64 + platform;
        if let Some(hosts) = fixes::hosts_for_constraint_utilization(
            required,
            target,
            self.infra.largest_host_memory_gb,
            self.ha_admission_pct,
        ) {
            if hosts > self.infra.total_hosts {
                let added = hosts - self.infra.total_hosts;
                suggestions.push(fix(
                    ConfigField::HostCount,
                    f64::from(hosts),
                    format!("Add {added} hosts ({hosts} total) to return to {target:.0}% {kind} utilization"),
                ));
            }
        }

        Some(self.warning(
            severity,
            WarningMetric::ConstraintUtilization,
            message,
            &[
                ConfigField::CellCount,
                ConfigField::CellMemoryGb,
                ConfigField::HostCount,
                ConfigField::HaAdmissionPct,
            ],
            suggestions,
        ))
    }

    fn ha_reservation(&self) -> Option<Warning> {
        if !self.constraints.insufficient_ha_warning {
            return None;
        }
        let hosts = self.infra.total_hosts;
        let minimum = 100.0 / f64::from(hosts.max(1));
        let suggestions = fixes::ha_pct_for_single_host_tolerance(hosts)
            .map(|pct| {
                vec![fix(
                    ConfigField::HaAdmissionPct,
                    pct,
                    format!("Increase HA% to {pct:.0}% to tolerate a single host failure"),
                )]
            })
            .unwrap_or_default();
        Some(self.warning(
            Severity::Warning,
            WarningMetric::HaReservation,
            format!(
                "HA Admission Control reserves {:.1}%, less than one host ({minimum:.1}% of {hosts} hosts)",
                self.ha_admission_pct
            ),
            &[ConfigField::HaAdmissionPct, ConfigField::HostCount],
            suggestions,
        ))
    }

    fn vcpu_ratio(&self, proposed: &CapacitySnapshot) -> Option<Warning> {
        if !self.input.is_selected(Resource::Cpu) || proposed.total_pcpus == 0 {
            return None;
        }
        let band = self.thresholds.vcpu_ratio;
        let ratio = proposed.vcpu_ratio;
        let requested = self.input.target_vcpu_ratio;
        let (severity, message, target) = match band.exceeding(ratio) {
            Some(Severity::Critical) => (
                Severity::Critical,
                format!("Aggressive vCPU:pCPU ratio ({ratio:.1}:1)"),
                requested.min(band.critical),
            ),
            Some(severity) => (
                severity,
                format!("Moderate vCPU:pCPU ratio ({ratio:.1}:1)"),
                requested.min(band.warning),
            ),
            None if ratio > requested => (
                Severity::Warning,
                format!("vCPU:pCPU ratio {ratio:.1}:1 exceeds target {requested:.1}:1"),
                requested,
            ),
            None => return None,
        };

        let cell = self.proposed_cell;
        let mut suggestions = Vec::new();
        if let Some(cells) = fixes::cells_for_vcpu_ratio(proposed.total_pcpus, target, cell.cpu) {
            if cells >= 1 && cells < u64::from(cell.count) {
                suggestions.push(fix(
                    ConfigField::CellCount,
                    cells as f64,
                    format!("Reduce cell count to {cells} to reach a {target:.1}:1 vCPU:pCPU ratio"),
                ));
            }
        }
        if let Some(hosts) =
            fixes::hosts_for_vcpu_ratio(proposed.total_vcpus, target, self.infra.cpu_cores_per_host)
        {
            if hosts > self.infra.total_hosts {
                let added = hosts - self.infra.total_hosts;
                suggestions.push(fix(
                    ConfigField::HostCount,
                    f64::from(hosts),
                    format!("Add {added} hosts ({hosts} total) to reach a {target:.1}:1 vCPU:pCPU ratio"),
                ));
            }
        }
        Some(self.warning(
            severity,
            WarningMetric::VcpuRatio,
            message,
            &[ConfigField::CellCount, ConfigField::CellCpu, ConfigField::HostCount],
            suggestions,
        ))
    }

    fn free_chunks(&self, proposed: &CapacitySnapshot) -> Option<Warning> {
        let band = self.thresholds.free_chunks;
        let severity = band.falling(proposed.free_chunks as f64)?;
        let target = band.falling_target(severity);
        let cell = self.proposed_cell;
        let overhead = self.input.overhead_pct;
        let chunk = self.input.chunk_size_mb;

        let mut suggestions = Vec::new();
        if let Some(cells) =
            fixes::cells_for_free_chunks(self.demand.memory_gb, target, chunk, cell.memory_gb, overhead)
        {
            if cells > u64::from(cell.count) {
                suggestions.push(fix(
                    ConfigField::CellCount,
                    cells as f64,
                    format!("Increase cell count to {cells} to keep {target:.0} free staging chunks"),
                ));
            }
        }
        if let Some(memory) =
            fixes::cell_memory_for_free_chunks(self.demand.memory_gb, target, chunk, cell.count, overhead)
        {
            if memory > u64::from(cell.memory_gb) {
                suggestions.push(fix(
                    ConfigField::CellMemoryGb,
                    memory as f64,
                    format!("Increase cell memory to {memory} GB to keep {target:.0} free staging chunks"),
                ));
            }
        }

        let message = match severity {
            Severity::Critical => format!(
                "Critically low staging capacity ({} free {} MB chunks)",
                proposed.free_chunks, chunk
            ),
            _ => format!(
                "Low staging capacity ({} free {} MB chunks)",
                proposed.free_chunks, chunk
            ),
        };
        Some(self.warning(
            severity,
            WarningMetric::FreeChunks,
            message,
            &[ConfigField::CellCount, ConfigField::CellMemoryGb],
            suggestions,
        ))
    }

    fn fault_impact(&self, proposed: &CapacitySnapshot) -> Option<Warning> {
        let band = self.thresholds.fault_impact;
        let severity = band.rising(proposed.fault_impact)?;
        let limit = match severity {
            Severity::Critical => band.critical,
            _ => band.warning,
        };
        let suggestions = fixes::cells_for_fault_impact(self.demand.instances, limit)
            .filter(|cells| *cells > u64::from(self.proposed_cell.count))
            .map(|cells| {
                vec![fix(
                    ConfigField::CellCount,
                    cells as f64,
                    format!("Increase cell count to {cells} to keep fewer than {limit:.0} instances per cell"),
                )]
            })
            .unwrap_or_default();
        Some(self.warning(
            severity,
            WarningMetric::FaultImpact,
            format!(
                "Each cell failure displaces ~{:.0} app instances",
                proposed.fault_impact
            ),
            &[ConfigField::CellCount],
            suggestions,
        ))
    }

    fn throughput(&self, proposed: &CapacitySnapshot) -> Option<Warning> {
        let severity = match proposed.throughput_status {
            ThroughputStatus::Critical => Severity::Critical,
            ThroughputStatus::Degraded => Severity::Warning,
            _ => return None,
        };
        let band = self.thresholds.throughput_pct;
        let target_pct = band.falling_target(severity);
        let curve = &self.input.throughput_curve;
        let target = f64::from(throughput::peak(curve)) * target_pct / 100.0;

        let suggestions = fixes::max_cells_for_throughput(curve, target)
            .filter(|cells| *cells >= 1 && *cells < proposed.cell_count)
            .map(|cells| {
                vec![fix(
                    ConfigField::CellCount,
                    f64::from(cells),
                    format!("Reduce cell count to {cells} to keep throughput above {target_pct:.0}% of peak"),
                )]
            })
            .unwrap_or_default();

        let message = match severity {
            Severity::Critical => format!(
                "Cell count ({}) causes severe scheduling degradation (~{} estimated throughput)",
                proposed.cell_count, proposed.estimated_throughput
            ),
            _ => format!(
                "Cell count ({}) may increase scheduling latency (~{} estimated throughput)",
                proposed.cell_count, proposed.estimated_throughput
            ),
        };
        Some(self.warning(
            severity,
            WarningMetric::Throughput,
            message,
            &[ConfigField::CellCount],
            suggestions,
        ))
    }

    fn blast_radius(&self, proposed: &CapacitySnapshot) -> Option<Warning> {
        if proposed.cell_count == 0 {
            return None;
        }
        let band = self.thresholds.blast_radius_pct;
        let severity = band.rising(proposed.blast_radius_pct)?;
        let limit = match severity {
            Severity::Critical => band.critical,
            _ => band.warning,
        };
        let suggestions = fixes::cells_for_blast_radius(limit)
            .filter(|cells| *cells > u64::from(proposed.cell_count))
            .map(|cells| {
                vec![fix(
                    ConfigField::CellCount,
                    cells as f64,
                    format!("Increase cell count to {cells} to keep single cell failure impact under {limit:.0}%"),
                )]
            })
            .unwrap_or_default();
        Some(self.warning(
            severity,
            WarningMetric::BlastRadius,
            format!(
                "Single cell failure impact: {:.1}% of capacity",
                proposed.blast_radius_pct
            ),
            &[ConfigField::CellCount],
            suggestions,
        ))
    }

    fn redundancy(&self, current: &CapacitySnapshot, proposed: &CapacitySnapshot) -> Option<Warning> {
        if current.cell_count == 0 || proposed.cell_count >= current.cell_count {
            return None;
        }
        let drop_pct = 100.0 * f64::from(current.cell_count - proposed.cell_count)
            / f64::from(current.cell_count);
        if drop_pct < REDUNDANCY_DROP_PCT {
            return None;
        }
        Some(self.warning(
            Severity::Info,
            WarningMetric::Redundancy,
            format!(
                "Cell count reduced by {drop_pct:.0}% ({} → {})",
                current.cell_count, proposed.cell_count
            ),
            &[ConfigField::CellCount],
            Vec::new(),
        ))
    }
}
