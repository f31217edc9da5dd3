use serde::{Deserialize, Serialize};

use super::{CpuRiskLevel, Severity, ThroughputStatus};

/// Demand above this share of app capacity can not be placed at all.
pub const OVER_CAPACITY_PCT: f64 = 100.0;

/// Warning/critical bounds for one metric.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Band {
    pub warning: f64,
    pub critical: f64,
}

impl Band {
    pub const fn new(warning: f64, critical: f64) -> Self {
        Self { warning, critical }
    }

    /// Higher is worse; the bound itself already counts.
    pub fn rising(&self, value: f64) -> Option<Severity> {
        if value >= self.critical {
            Some(Severity::Critical)
        } else if value >= self.warning {
            Some(Severity::Warning)
        } else {
            None
        }
    }

    /// Higher is worse; the bound itself is still acceptable.
    pub fn exceeding(&self, value: f64) -> Option<Severity> {
        if value > self.critical {
            Some(Severity::Critical)
        } else if value > self.warning {
            Some(Severity::Warning)
        } else {
            None
        }
    }

    /// Lower is worse; the bound itself is still acceptable.
    pub fn falling(&self, value: f64) -> Option<Severity> {
        if value < self.critical {
            Some(Severity::Critical)
        } else if value < self.warning {
            Some(Severity::Warning)
        } else {
            None
        }
    }

    /// Value a fix should aim for on a higher-is-worse metric.
    pub fn rising_target(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Critical => self.critical - 1.0,
            _ => self.warning - 1.0,
        }
    }

    /// Value a fix should aim for on a lower-is-worse metric.
    pub fn falling_target(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Critical => self.critical,
            _ => self.warning,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThresholdTable {
    pub memory_utilization: Band,
    pub disk_utilization: Band,
    pub constraint_utilization: Band,
    pub vcpu_ratio: Band,
    pub free_chunks: Band,
    pub fault_impact: Band,
    pub throughput_pct: Band,
    pub blast_radius_pct: Band,
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self {
            memory_utilization: Band::new(80.0, 90.0),
            disk_utilization: Band::new(80.0, 90.0),
            constraint_utilization: Band::new(75.0, 85.0),
            vcpu_ratio: Band::new(4.0, 8.0),
            free_chunks: Band::new(20.0, 10.0),
            fault_impact: Band::new(25.0, 50.0),
            throughput_pct: Band::new(80.0, 50.0),
            blast_radius_pct: Band::new(10.0, 20.0),
        }
    }
}

impl ThresholdTable {
    pub fn cpu_risk_level(&self, vcpu_ratio: f64) -> CpuRiskLevel {
        match self.vcpu_ratio.exceeding(vcpu_ratio) {
            None => CpuRiskLevel::Conservative,
            Some(Severity::Critical) => CpuRiskLevel::Aggressive,
            Some(_) => CpuRiskLevel::Moderate,
        }
    }

    /// Classifies an estimate as a share of the curve's peak.
    pub fn throughput_status(&self, throughput: u32, peak: u32) -> ThroughputStatus {
        if peak == 0 {
            return ThroughputStatus::Unknown;
        }
        let pct = 100.0 * f64::from(throughput) / f64::from(peak);
        match self.throughput_pct.falling(pct) {
            None => ThroughputStatus::Optimal,
            Some(Severity::Critical) => ThroughputStatus::Critical,
            Some(_) => ThroughputStatus::Degraded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rising_band_is_inclusive_at_bounds() {
        let band = Band::new(80.0, 90.0);
        assert_eq!(band.rising(79.9), None);
        assert_eq!(band.rising(80.0), Some(Severity::Warning));
        assert_eq!(band.rising(90.0), Some(Severity::Critical));
    }

    #[test]
    fn cpu_risk_uses_strict_bounds() {
        let table = ThresholdTable::default();
        assert_eq!(table.cpu_risk_level(4.0), CpuRiskLevel::Conservative);
        assert_eq!(table.cpu_risk_level(4.01), CpuRiskLevel::Moderate);
        assert_eq!(table.cpu_risk_level(8.0), CpuRiskLevel::Moderate);
        assert_eq!(table.cpu_risk_level(8.5), CpuRiskLevel::Aggressive);
    }

    #[test]
    fn throughput_status_from_peak_share() {
        let table = ThresholdTable::default();
        assert_eq!(table.throughput_status(1964, 1964), ThroughputStatus::Optimal);
        assert_eq!(table.throughput_status(1389, 1964), ThroughputStatus::Degraded);
        assert_eq!(table.throughput_status(44, 1964), ThroughputStatus::Critical);
        assert_eq!(table.throughput_status(10, 0), ThroughputStatus::Unknown);
    }

    #[test]
    fn partial_table_keeps_defaults() {
        let table: ThresholdTable =
            toml::from_str("[memory_utilization]\nwarning = 70.0\ncritical = 85.0\n")
                .expect("partial threshold table should parse");
        assert_eq!(table.memory_utilization.warning, 70.0);
        assert_eq!(table.blast_radius_pct, Band::new(10.0, 20.0));
    }
}
