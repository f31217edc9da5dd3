use serde::{Deserialize, Serialize};

use super::thresholds::ThresholdTable;
use super::{CurvePoint, ThroughputStatus};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThroughputEstimate {
    pub throughput: u32,
    pub status: ThroughputStatus,
}

pub fn peak(curve: &[CurvePoint]) -> u32 {
    curve.iter().map(|p| p.throughput).max().unwrap_or(0)
}

/// Piecewise-linear estimate. Below the first point the first value holds;
/// past the last point throughput decays with `1 / cells`.
pub fn estimate(curve: &[CurvePoint], cells: u32) -> u32 {
    let (Some(first), Some(last)) = (curve.first(), curve.last()) else {
        return 0;
    };
    if cells <= first.cells {
        return first.throughput;
    }
    for pair in curve.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if cells == b.cells {
            return b.throughput;
        }
        if cells < b.cells {
            let span = f64::from(b.cells - a.cells);
            let offset = f64::from(cells - a.cells);
            let slope = f64::from(b.throughput) - f64::from(a.throughput);
            let value = f64::from(a.throughput) + slope * offset / span;
            return value.round().max(0.0) as u32;
        }
    }
    let decayed = f64::from(last.throughput) * f64::from(last.cells) / f64::from(cells);
    decayed.max(1.0).round() as u32
}

pub fn evaluate(
    curve: &[CurvePoint],
    cell_count: u32,
    enabled: bool,
    thresholds: &ThresholdTable,
) -> ThroughputEstimate {
    if !enabled {
        return ThroughputEstimate {
            throughput: 0,
            status: ThroughputStatus::Disabled,
        };
    }
    if cell_count == 0 {
        return ThroughputEstimate {
            throughput: 0,
            status: ThroughputStatus::Unknown,
        };
    }
    let throughput = estimate(curve, cell_count);
    ThroughputEstimate {
        throughput,
        status: thresholds.throughput_status(throughput, peak(curve)),
    }
}

/// Largest cell count whose estimate still reaches `target`.
pub fn max_cells_for_throughput(curve: &[CurvePoint], target: f64) -> Option<u32> {
    let last = curve.last()?;
    // The tail never drops below 1, so a target at or under 1 has no bound.
    if target <= 1.0 {
        return None;
    }
    let reaches = |cells: u32| f64::from(estimate(curve, cells)) >= target;

    if f64::from(last.throughput) >= target {
        // round(L * C / cells) >= k holds while cells <= L * C / (k - 0.5).
        let needed = target.ceil() - 0.5;
        let guess = (f64::from(last.throughput) * f64::from(last.cells) / needed).floor();
        let mut cells = (guess.min(f64::from(u32::MAX - 1)) as u32).max(last.cells);
        for _ in 0..2 {
            if cells < u32::MAX - 1 && reaches(cells + 1) {
                cells += 1;
            }
        }
        for _ in 0..2 {
            if cells > last.cells && !reaches(cells) {
                cells -= 1;
            }
        }
        return Some(cells);
    }

    for pair in curve.windows(2).rev() {
        let (a, b) = (pair[0], pair[1]);
        if f64::from(a.throughput) < target {
            continue;
        }
        let drop = f64::from(a.throughput) - f64::from(b.throughput);
        let span = f64::from(b.cells - a.cells);
        let guess = f64::from(a.cells) + (f64::from(a.throughput) - target) * span / drop;
        let mut cells = (guess.floor() as u32).clamp(a.cells, b.cells - 1);
        while cells + 1 < b.cells && reaches(cells + 1) {
            cells += 1;
        }
        while cells > a.cells && !reaches(cells) {
            cells -= 1;
        }
        return Some(cells);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::default_throughput_curve;

    #[test]
    fn exact_points_return_curve_values() {
        let curve = default_throughput_curve();
        assert_eq!(estimate(&curve, 3), 1964);
        assert_eq!(estimate(&curve, 9), 1932);
        assert_eq!(estimate(&curve, 210), 104);
    }

    #[test]
    fn interpolates_between_points() {
        let curve = default_throughput_curve();
        let value = estimate(&curve, 50);
        assert!((1686..=1690).contains(&value), "got {value}");
        let table = ThresholdTable::default();
        let result = evaluate(&curve, 50, true, &table);
        assert_eq!(result.status, ThroughputStatus::Optimal);
    }

    #[test]
    fn extrapolates_past_last_point() {
        let curve = default_throughput_curve();
        assert_eq!(estimate(&curve, 500), 44);
        let result = evaluate(&curve, 500, true, &ThresholdTable::default());
        assert_eq!(result.status, ThroughputStatus::Critical);
        assert_eq!(estimate(&curve, 1_000_000), 1);
    }

    #[test]
    fn clamps_below_first_point() {
        let curve = vec![CurvePoint::new(5, 300), CurvePoint::new(10, 400)];
        assert_eq!(estimate(&curve, 1), 300);
    }

    #[test]
    fn disabled_and_empty_pools() {
        let curve = default_throughput_curve();
        let table = ThresholdTable::default();
        assert_eq!(
            evaluate(&curve, 100, false, &table),
            ThroughputEstimate {
                throughput: 0,
                status: ThroughputStatus::Disabled
            }
        );
        assert_eq!(evaluate(&curve, 0, true, &table).status, ThroughputStatus::Unknown);
    }

    #[test]
    fn zero_peak_is_unknown() {
        let curve = vec![CurvePoint::new(1, 0), CurvePoint::new(2, 0)];
        let result = evaluate(&curve, 2, true, &ThresholdTable::default());
        assert_eq!(result.status, ThroughputStatus::Unknown);
    }

    #[test]
    fn inverse_finds_largest_pool_above_target() {
        let curve = default_throughput_curve();
        // 80% of the 1964 peak.
        assert_eq!(max_cells_for_throughput(&curve, 1571.2), Some(69));
        assert!(estimate(&curve, 69) as f64 >= 1571.2);
        assert!((estimate(&curve, 70) as f64) < 1571.2);
    }

    #[test]
    fn inverse_uses_tail_when_target_is_low() {
        let curve = default_throughput_curve();
        let cells = max_cells_for_throughput(&curve, 50.0).expect("tail should satisfy target");
        assert!(estimate(&curve, cells) >= 50);
        assert!(estimate(&curve, cells + 1) < 50);
        assert_eq!(max_cells_for_throughput(&curve, 5_000.0), None);
    }

    #[test]
    fn curve_with_zero_point_dips_then_recovers() {
        let curve = vec![
            CurvePoint::new(1, 2),
            CurvePoint::new(2, 0),
            CurvePoint::new(3, 2),
        ];
        assert_eq!(peak(&curve), 2);
        assert_eq!(estimate(&curve, 1), 2);
        assert_eq!(estimate(&curve, 2), 0);
        assert_eq!(estimate(&curve, 3), 2);
        assert_eq!(estimate(&curve, 6), 1);
        assert_eq!(estimate(&curve, u32::MAX), 1);

        let table = ThresholdTable::default();
        assert_eq!(evaluate(&curve, 2, true, &table).status, ThroughputStatus::Critical);
        assert_eq!(evaluate(&curve, 3, true, &table).status, ThroughputStatus::Optimal);
        assert_eq!(evaluate(&curve, 6, true, &table).status, ThroughputStatus::Degraded);
    }

    #[test]
    fn inverse_has_no_bound_for_targets_the_tail_always_meets() {
        let curve = vec![
            CurvePoint::new(1, 2),
            CurvePoint::new(2, 0),
            CurvePoint::new(3, 2),
        ];
        assert_eq!(max_cells_for_throughput(&curve, 1.0), None);
        assert_eq!(max_cells_for_throughput(&curve, 0.5), None);
        assert_eq!(max_cells_for_throughput(&default_throughput_curve(), 1.0), None);

        // Half of the peak of 2 rounds up to an estimate of 2 at four cells.
        assert_eq!(max_cells_for_throughput(&curve, 1.5), Some(4));
        assert_eq!(estimate(&curve, 5), 1);
    }

    #[test]
    fn inverse_tail_lands_on_last_reaching_pool() {
        let curve = default_throughput_curve();
        for target in [2.0, 3.0, 7.5, 44.0, 103.0, 104.0] {
            let cells = max_cells_for_throughput(&curve, target).expect("tail reaches target");
            assert!(f64::from(estimate(&curve, cells)) >= target, "target {target}");
            assert!(f64::from(estimate(&curve, cells + 1)) < target, "target {target}");
        }
    }
}
