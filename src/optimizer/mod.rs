pub mod sizing;
pub mod upgrades;
pub mod utilization;

use serde::{Deserialize, Serialize};

use crate::scenario::Resource;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceUtilization {
    pub resource: Resource,
    pub used_pct: f64,
    pub used: u64,
    pub capacity: u64,
    pub unit: String,
    pub is_constraining: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceRanking {
    pub resources: Vec<ResourceUtilization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraining: Option<Resource>,
    pub summary: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeKind {
    AddCells,
    ResizeCells,
    AddHosts,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ImpactLevel {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpgradeRecommendation {
    pub priority: usize,
    pub kind: UpgradeKind,
    pub resource: Resource,
    pub title: String,
    pub description: String,
    pub impact: String,
    pub impact_level: ImpactLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cells_to_add: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosts_to_add: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_cell_memory_gb: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_cell_cpu: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_cell_disk_gb: Option<u32>,
}

/// Utilization levels the upgrade paths aim for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct UpgradeTargets {
    pub cell_utilization_pct: f64,
    pub host_memory_utilization_pct: f64,
    pub vcpu_ratio: f64,
}

impl Default for UpgradeTargets {
    fn default() -> Self {
        Self {
            cell_utilization_pct: 70.0,
            host_memory_utilization_pct: 70.0,
            vcpu_ratio: 4.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationReport {
    pub ranking: ResourceRanking,
    pub recommendations: Vec<UpgradeRecommendation>,
}
