use crate::infrastructure::InfrastructureAggregate;

use super::{ratio_or_zero, CapacityConstraint, CellConfig, ConstraintAnalysis, ConstraintKind};

/// Compares HA admission control against an N-1 reservation and picks the tighter one.
pub fn analyze_constraints(
    infra: &InfrastructureAggregate,
    cell: &CellConfig,
    ha_admission_pct: f64,
) -> ConstraintAnalysis {
    let total = infra.total_memory_gb as f64;
    let host_memory = infra.largest_host_memory_gb as f64;
    let demand = cell.total_memory_gb() as f64 + infra.platform_overhead_gb as f64;

    let ha_reserved = total * ha_admission_pct / 100.0;
    let ha_usable = total - ha_reserved;
    let n_equivalent = if host_memory > 0.0 {
        (ha_reserved / host_memory).floor() as u32
    } else {
        0
    };
    let ha_admission = CapacityConstraint {
        reserved_gb: ha_reserved,
        usable_gb: ha_usable,
        utilization_pct: ratio_or_zero(100.0 * demand, ha_usable),
        n_equivalent: Some(n_equivalent),
    };

    let n1_usable = total - host_memory;
    let n_minus_one = CapacityConstraint {
        reserved_gb: host_memory,
        usable_gb: n1_usable,
        utilization_pct: ratio_or_zero(100.0 * demand, n1_usable),
        n_equivalent: None,
    };

    // Ties resolve to HA admission.
    let limiting_constraint = if ha_usable <= n1_usable {
        ConstraintKind::HaAdmission
    } else {
        ConstraintKind::NMinusOne
    };
    let limiting_label = match limiting_constraint {
        ConstraintKind::HaAdmission => {
            format!("HA {}% (≈N-{})", format_pct(ha_admission_pct), n_equivalent)
        }
        ConstraintKind::NMinusOne => "N-1".to_string(),
    };

    ConstraintAnalysis {
        ha_admission,
        n_minus_one,
        limiting_constraint,
        limiting_label,
        insufficient_ha_warning: insufficient_ha(ha_admission_pct, infra.total_hosts),
    }
}

/// True when the HA reservation is smaller than a single host's share.
pub fn insufficient_ha(ha_admission_pct: f64, host_count: u32) -> bool {
    host_count > 0 && ha_admission_pct < 100.0 / f64::from(host_count)
}

fn format_pct(pct: f64) -> String {
    if pct.fract() == 0.0 {
        format!("{pct:.0}")
    } else {
        format!("{pct:.1}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fleet(hosts: u32, per_host: u64) -> InfrastructureAggregate {
        InfrastructureAggregate {
            total_hosts: hosts,
            total_memory_gb: u64::from(hosts) * per_host,
            largest_host_memory_gb: per_host,
            n1_memory_gb: u64::from(hosts.saturating_sub(1)) * per_host,
            ..InfrastructureAggregate::default()
        }
    }

    #[test]
    fn ha_reservation_limits_large_fleet() {
        let infra = fleet(15, 2000);
        let analysis = analyze_constraints(&infra, &CellConfig::new(4, 32, 0, 470), 25.0);
        assert_eq!(analysis.ha_admission.usable_gb, 22_500.0);
        assert_eq!(analysis.n_minus_one.usable_gb, 28_000.0);
        assert_eq!(analysis.limiting_constraint, ConstraintKind::HaAdmission);
        assert_eq!(analysis.ha_admission.n_equivalent, Some(3));
        assert_eq!(analysis.limiting_label, "HA 25% (≈N-3)");
        assert!((analysis.limiting().utilization_pct - 100.0 * 15_040.0 / 22_500.0).abs() < 1e-9);
        assert!(!analysis.insufficient_ha_warning);
    }

    #[test]
    fn n_minus_one_limits_with_small_reservation() {
        let infra = fleet(4, 1000);
        let analysis = analyze_constraints(&infra, &CellConfig::new(4, 32, 0, 10), 10.0);
        assert_eq!(analysis.limiting_constraint, ConstraintKind::NMinusOne);
        assert_eq!(analysis.limiting_label, "N-1");
        assert!(analysis.insufficient_ha_warning);
    }

    #[test]
    fn equal_usable_prefers_ha() {
        let infra = fleet(4, 1000);
        let analysis = analyze_constraints(&infra, &CellConfig::new(4, 32, 0, 10), 25.0);
        assert_eq!(analysis.ha_admission.usable_gb, analysis.n_minus_one.usable_gb);
        assert_eq!(analysis.limiting_constraint, ConstraintKind::HaAdmission);
    }

    #[test]
    fn zero_hosts_is_degenerate_not_fatal() {
        let infra = fleet(0, 0);
        let analysis = analyze_constraints(&infra, &CellConfig::new(4, 32, 0, 10), 25.0);
        assert_eq!(analysis.ha_admission.utilization_pct, 0.0);
        assert_eq!(analysis.n_minus_one.utilization_pct, 0.0);
        assert_eq!(analysis.ha_admission.n_equivalent, Some(0));
        assert!(!analysis.insufficient_ha_warning);
    }

    #[test]
    fn single_host_needs_full_reservation() {
        assert!(insufficient_ha(99.0, 1));
        assert!(!insufficient_ha(100.0, 1));
        assert!(!insufficient_ha(34.0, 3));
    }
}
