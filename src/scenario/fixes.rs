//! Inverse solvers: given a target metric value, find the configuration that reaches it.
//!
//! Each solver returns `None` when the target can not be reached by changing only
//! the one variable it solves for (zero-sized cells, a 100% reservation, ...).

pub use super::bottleneck::max_cells_by_cpu as cells_for_vcpu_ratio;
pub use super::throughput::max_cells_for_throughput;

/// Ceil that ignores float noise just above an integer.
fn ceil_units(value: f64) -> u64 {
    (value - 1e-9).ceil().max(0.0) as u64
}

/// Units of `per_unit_capacity` needed so `demand` lands at `target_pct`.
pub fn units_for_utilization(demand: f64, per_unit_capacity: f64, target_pct: f64) -> Option<u64> {
    if per_unit_capacity <= 0.0 || target_pct <= 0.0 {
        return None;
    }
    Some(ceil_units(demand * 100.0 / target_pct / per_unit_capacity))
}

pub fn cells_for_memory_utilization(
    demand_gb: f64,
    cell_memory_gb: u32,
    overhead_pct: f64,
    target_pct: f64,
) -> Option<u64> {
    let per_cell = f64::from(cell_memory_gb) * (1.0 - overhead_pct / 100.0);
    units_for_utilization(demand_gb, per_cell, target_pct)
}

pub fn cell_memory_for_memory_utilization(
    demand_gb: f64,
    cell_count: u32,
    overhead_pct: f64,
    target_pct: f64,
) -> Option<u64> {
    let per_gb = f64::from(cell_count) * (1.0 - overhead_pct / 100.0);
    units_for_utilization(demand_gb, per_gb, target_pct)
}

/// Most cells of `cell_memory_gb` that keep the limiting constraint at `target_pct`.
pub fn cells_for_constraint_utilization(
    usable_gb: f64,
    platform_overhead_gb: f64,
    cell_memory_gb: u32,
    target_pct: f64,
) -> Option<u64> {
    if cell_memory_gb == 0 {
        return None;
    }
    let budget = usable_gb * target_pct / 100.0 - platform_overhead_gb;
    if budget <= 0.0 {
        return Some(0);
    }
    Some((budget / f64::from(cell_memory_gb)).floor() as u64)
}

/// Largest cell memory that keeps the limiting constraint at `target_pct`.
pub fn cell_memory_for_constraint_utilization(
    usable_gb: f64,
    platform_overhead_gb: f64,
    cell_count: u32,
    target_pct: f64,
) -> Option<u64> {
    if cell_count == 0 {
        return None;
    }
    let budget = usable_gb * target_pct / 100.0 - platform_overhead_gb;
    if budget <= 0.0 {
        return Some(0);
    }
    Some((budget / f64::from(cell_count)).floor() as u64)
}

/// Hosts of `memory_per_host_gb` needed so `required_gb` fits at `target_pct`
/// under both the HA reservation and an N-1 reservation.
pub fn hosts_for_constraint_utilization(
    required_gb: f64,
    target_pct: f64,
    memory_per_host_gb: u64,
    ha_admission_pct: f64,
) -> Option<u32> {
    if memory_per_host_gb == 0 || target_pct <= 0.0 || ha_admission_pct >= 100.0 {
        return None;
    }
    let host = memory_per_host_gb as f64;
    let needed_usable = required_gb * 100.0 / target_pct;
    let by_ha = ceil_units(needed_usable / (host * (1.0 - ha_admission_pct / 100.0)));
    let by_n1 = ceil_units(needed_usable / host) + 1;
    u32::try_from(by_ha.max(by_n1)).ok()
}

/// Smallest whole HA percentage that still covers one host failure.
pub fn ha_pct_for_single_host_tolerance(host_count: u32) -> Option<f64> {
    if host_count == 0 {
        return None;
    }
    Some((100.0 / f64::from(host_count)).ceil())
}

pub fn hosts_for_vcpu_ratio(total_vcpus: u64, target_ratio: f64, cores_per_host: u32) -> Option<u32> {
    if cores_per_host == 0 || target_ratio <= 0.0 {
        return None;
    }
    let hosts = ceil_units(total_vcpus as f64 / (target_ratio * f64::from(cores_per_host)));
    u32::try_from(hosts).ok()
}

fn staging_need_mb(used_gb: f64, target_chunks: f64, chunk_size_mb: u32) -> f64 {
    used_gb * 1024.0 + target_chunks * f64::from(chunk_size_mb)
}

pub fn cells_for_free_chunks(
    used_gb: f64,
    target_chunks: f64,
    chunk_size_mb: u32,
    cell_memory_gb: u32,
    overhead_pct: f64,
) -> Option<u64> {
    let per_cell_mb = f64::from(cell_memory_gb) * (1.0 - overhead_pct / 100.0) * 1024.0;
    units_for_utilization(staging_need_mb(used_gb, target_chunks, chunk_size_mb), per_cell_mb, 100.0)
}

pub fn cell_memory_for_free_chunks(
    used_gb: f64,
    target_chunks: f64,
    chunk_size_mb: u32,
    cell_count: u32,
    overhead_pct: f64,
) -> Option<u64> {
    let per_gb_mb = f64::from(cell_count) * (1.0 - overhead_pct / 100.0) * 1024.0;
    units_for_utilization(staging_need_mb(used_gb, target_chunks, chunk_size_mb), per_gb_mb, 100.0)
}

/// Fewest cells that keep instances per cell strictly under `limit`.
pub fn cells_for_fault_impact(instances: f64, limit: f64) -> Option<u64> {
    if limit <= 0.0 {
        return None;
    }
    Some((instances / limit).floor() as u64 + 1)
}

/// Fewest cells that keep a single cell's share strictly under `limit_pct`.
pub fn cells_for_blast_radius(limit_pct: f64) -> Option<u64> {
    if limit_pct <= 0.0 {
        return None;
    }
    Some((100.0 / limit_pct).floor() as u64 + 1)
}
