//! Prometheus text exposition format.
//!
//! Renders the latest diagnostics as gauges with a `cluster` label, and a
//! `node` label for per-node series. Both names come from clients, so label
//! values are escaped.

use gpulens_diag::{ClusterFragmentationSummary, LoadBalanceSummary};

/// Render diagnostics into Prometheus text format.
///
/// Help and type lines are always emitted; a missing summary just leaves
/// its series without samples.
pub fn render_prometheus(
    cluster: &str,
    fragmentation: Option<&ClusterFragmentationSummary>,
    load: Option<&LoadBalanceSummary>,
) -> String {
    let cluster = escape_label_value(cluster);
    let mut out = String::new();

    out.push_str(
        "# HELP gpulens_cluster_fragmentation_score Mean node fragmentation score (0-100).\n",
    );
    out.push_str("# TYPE gpulens_cluster_fragmentation_score gauge\n");
    if let Some(f) = fragmentation {
        out.push_str(&format!(
            "gpulens_cluster_fragmentation_score{{cluster=\"{}\"}} {:.2}\n",
            cluster, f.cluster_fragmentation_score
        ));
    }

    out.push_str("# HELP gpulens_node_fragmentation_score Node fragmentation score (0-100).\n");
    out.push_str("# TYPE gpulens_node_fragmentation_score gauge\n");
    for n in fragmentation.iter().flat_map(|f| &f.node_fragmentations) {
        out.push_str(&format!(
            "gpulens_node_fragmentation_score{{cluster=\"{}\",node=\"{}\",status=\"{}\"}} {:.2}\n",
            cluster,
            escape_label_value(&n.node_name),
            n.status,
            n.fragmentation_score
        ));
    }

    out.push_str("# HELP gpulens_nodes Number of GPU nodes per fragmentation status.\n");
    out.push_str("# TYPE gpulens_nodes gauge\n");
    if let Some(f) = fragmentation {
        for (status, count) in [
            ("healthy", f.summary.healthy_nodes),
            ("fragmented", f.summary.fragmented_nodes),
            ("critical", f.summary.critical_nodes),
        ] {
            out.push_str(&format!(
                "gpulens_nodes{{cluster=\"{}\",status=\"{}\"}} {}\n",
                cluster, status, count
            ));
        }
    }

    out.push_str("# HELP gpulens_wasted_gpus Free GPUs stranded on unhealthy nodes.\n");
    out.push_str("# TYPE gpulens_wasted_gpus gauge\n");
    if let Some(f) = fragmentation {
        out.push_str(&format!(
            "gpulens_wasted_gpus{{cluster=\"{}\"}} {}\n",
            cluster, f.summary.total_wasted_gpus
        ));
    }

    out.push_str("# HELP gpulens_load_balance_score Cluster load-balance score (0-100).\n");
    out.push_str("# TYPE gpulens_load_balance_score gauge\n");
    if let Some(l) = load {
        out.push_str(&format!(
            "gpulens_load_balance_score{{cluster=\"{}\"}} {:.2}\n",
            cluster, l.load_balance_score
        ));
    }

    out.push_str(
        "# HELP gpulens_node_load_score Weighted node load (allocation and utilization).\n",
    );
    out.push_str("# TYPE gpulens_node_load_score gauge\n");
    for n in load.iter().flat_map(|l| &l.node_load_distribution) {
        out.push_str(&format!(
            "gpulens_node_load_score{{cluster=\"{}\",node=\"{}\"}} {:.2}\n",
            cluster,
            escape_label_value(&n.node_name),
            n.load_score
        ));
    }

    out
}

/// Escape `\`, `"` and newlines in a label value.
fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}
