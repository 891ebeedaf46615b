//! Per-node load and cluster load balance.
//!
//! Balance is judged on allocation rate alone: the coefficient of
//! variation (stddev / mean) of per-node allocation maps linearly onto a
//! 0-100 score, saturating once the spread reaches the mean. Hotspot and
//! idle detection uses the weighted load score instead, against a fixed
//! band around the mean load.

use tracing::debug;

use crate::config::LoadConfig;
use crate::types::{LoadBalanceStats, LoadBalanceSummary, NodeLoad, NodeSnapshot};

pub const REBALANCE_HOTSPOTS: &str =
    "Hotspot nodes detected with high GPU load. Consider rebalancing workloads.";
pub const DRAIN_IDLE: &str = "Idle nodes detected with low GPU utilization. \
    Consider consolidating workloads or draining nodes.";
pub const HIGH_VARIANCE: &str =
    "High variance in node allocation. Consider implementing pod scheduling strategies.";
pub const LOW_ALLOCATION: &str =
    "Overall cluster GPU allocation is low. Consider optimizing resource requests.";
pub const WELL_BALANCED: &str = "Cluster load is well balanced. No immediate action needed.";

/// Score returned for a cluster without nodes.
pub const EMPTY_CLUSTER_BALANCE: f64 = 100.0;

/// Weighted load of one node.
pub fn node_load(node: &NodeSnapshot, config: &LoadConfig) -> NodeLoad {
    let allocation_rate = node.allocation_fraction() * 100.0;
    let utilization_rate = node.utilization_percent;

    NodeLoad {
        node_name: node.name.clone(),
        allocation_rate,
        utilization_rate,
        load_score: allocation_rate * config.allocation_weight
            + utilization_rate * config.utilization_weight,
    }
}

/// Analyze load balance across `nodes`.
pub fn analyze_load_balance(nodes: &[NodeSnapshot], config: &LoadConfig) -> LoadBalanceSummary {
    let loads: Vec<NodeLoad> = nodes.iter().map(|n| node_load(n, config)).collect();

    let statistics = load_stats(&loads);
    let score = balance_score(&statistics, loads.len());
    let (hotspot_nodes, idle_nodes) = hotspots_and_idle(&loads, config.hotspot_band);
    let recommendations = recommendations(
        &statistics,
        loads.len(),
        !hotspot_nodes.is_empty(),
        !idle_nodes.is_empty(),
        config,
    );

    debug!(
        nodes = loads.len(),
        score,
        hotspots = hotspot_nodes.len(),
        idle = idle_nodes.len(),
        "load balance analyzed"
    );

    LoadBalanceSummary {
        load_balance_score: score,
        node_load_distribution: loads,
        hotspot_nodes,
        idle_nodes,
        recommendations,
        statistics,
    }
}

/// Mean, population variance, stddev and range of allocation rates.
/// All zero for an empty set.
pub fn load_stats(loads: &[NodeLoad]) -> LoadBalanceStats {
    if loads.is_empty() {
        return LoadBalanceStats::default();
    }

    let n = loads.len() as f64;
    let mean = loads.iter().map(|l| l.allocation_rate).sum::<f64>() / n;
    let variance = loads
        .iter()
        .map(|l| (l.allocation_rate - mean).powi(2))
        .sum::<f64>()
        / n;
    let max = loads
        .iter()
        .map(|l| l.allocation_rate)
        .fold(f64::NEG_INFINITY, f64::max);
    let min = loads
        .iter()
        .map(|l| l.allocation_rate)
        .fold(f64::INFINITY, f64::min);

    LoadBalanceStats {
        avg_allocation_rate: mean,
        stddev_allocation: variance.sqrt(),
        max_allocation: max,
        min_allocation: min,
        variance,
    }
}

/// `100 * (1 - min(CV, 1))`, or [`EMPTY_CLUSTER_BALANCE`] without nodes.
pub fn balance_score(stats: &LoadBalanceStats, node_count: usize) -> f64 {
    if node_count == 0 {
        return EMPTY_CLUSTER_BALANCE;
    }

    let cv = if stats.avg_allocation_rate > 0.0 {
        stats.stddev_allocation / stats.avg_allocation_rate
    } else {
        0.0
    };

    100.0 * (1.0 - cv.min(1.0))
}

/// Split nodes whose load is more than `band` points above or below the
/// mean load. A cluster whose loads all sit inside the band reports none,
/// however saturated or empty individual nodes are.
pub fn hotspots_and_idle(loads: &[NodeLoad], band: f64) -> (Vec<String>, Vec<String>) {
    let mut hotspots = Vec::new();
    let mut idle = Vec::new();

    if loads.is_empty() {
        return (hotspots, idle);
    }

    let mean = loads.iter().map(|l| l.load_score).sum::<f64>() / loads.len() as f64;

    for load in loads {
        if load.load_score > mean + band {
            hotspots.push(load.node_name.clone());
        } else if load.load_score < mean - band {
            idle.push(load.node_name.clone());
        }
    }

    (hotspots, idle)
}

fn recommendations(
    stats: &LoadBalanceStats,
    node_count: usize,
    has_hotspots: bool,
    has_idle: bool,
    config: &LoadConfig,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if has_hotspots {
        recommendations.push(REBALANCE_HOTSPOTS.to_string());
    }

    if has_idle {
        recommendations.push(DRAIN_IDLE.to_string());
    }

    if stats.stddev_allocation > config.high_stddev {
        recommendations.push(HIGH_VARIANCE.to_string());
    }

    // An empty cluster has no allocation to optimize.
    if node_count > 0 && stats.avg_allocation_rate < config.low_mean_allocation {
        recommendations.push(LOW_ALLOCATION.to_string());
    }

    if recommendations.is_empty() {
        recommendations.push(WELL_BALANCED.to_string());
    }

    recommendations
}
