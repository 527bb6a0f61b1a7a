//! Terminal rendering of a confidence report.

use colored::Colorize;

use crate::tree::payload::{ConfidenceReport, NodePayload};
use crate::tree::{NodeColor, Shape};

fn glyph(shape: Shape) -> &'static str {
    match shape {
        Shape::Square => "■",
        Shape::Triangle => "▲",
        Shape::Circle => "●",
    }
}

fn colored_confidence(node: &NodePayload) -> String {
    let text = format!("{:>3}%", node.confidence_percent);
    match node.color {
        NodeColor::Green => text.green().to_string(),
        NodeColor::Red => text.red().to_string(),
        NodeColor::Grey => text.dimmed().to_string(),
    }
}

/// Render a confidence report as a compact tree listing.
pub fn render_report(report: &ConfidenceReport) -> String {
    let mut out = String::new();
    out.push_str("=== Confidence Tree ===\n");
    out.push_str(&format!(
        "overall {}  line {}  end {}  nodes {}/{}\n",
        report.overall_confidence,
        report.line_confidence,
        report.end_confidence,
        report.caps.global_nodes_used,
        report.caps.max_nodes_global,
    ));

    for node in &report.nodes {
        let move_text = node.move_from_parent.as_deref().unwrap_or("-");
        let pref = node
            .preference_number
            .map(|p| format!(" pref={}", p))
            .unwrap_or_default();
        out.push_str(&format!(
            "  {}{} {} {:<24} {:<6} ply={}{}\n",
            "  ".repeat(node.ply_from_s0),
            glyph(node.shape),
            colored_confidence(node),
            node.id,
            move_text,
            node.ply_from_s0,
            pref,
        ));
    }

    out.push_str(&format!(
        "stats: pv_length={} triangles={} red={} alternatives={} extensions={}\n",
        report.stats.pv_length,
        report.stats.triangles,
        report.stats.red_pv_nodes,
        report.stats.alternatives,
        report.stats.extensions,
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::payload::neutral_report;

    #[test]
    fn test_render_neutral_report() {
        let rendered = render_report(&neutral_report(120));
        assert!(rendered.contains("=== Confidence Tree ==="));
        assert!(rendered.contains("overall 100"));
        assert!(rendered.contains("nodes 0/120"));
    }
}
