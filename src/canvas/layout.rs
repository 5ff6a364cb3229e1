//! Auto-layout: nodes in a row beside their milestone.
//!
//! For every milestone in sequence order, its linked nodes (in sequence order)
//! are placed left-to-right starting `layout_offset_x` to the milestone's right,
//! `layout_spacing_x` apart, on the milestone's row. Unlinked nodes and nodes
//! with a dangling milestone link stay where they are.

use crate::config::CanvasConfig;
use crate::model::{Cycle, NodeId, Point};

/// Compute target positions (unsnapped) for every linked node.
pub fn milestone_rows(cycle: &Cycle, cfg: &CanvasConfig) -> Vec<(NodeId, Point)> {
    let mut placements = Vec::new();
    for milestone in cycle.ordered_milestones() {
        for (col, node) in cycle.linked_nodes(milestone.id).into_iter().enumerate() {
            let p = Point::new(
                milestone.position.x + cfg.layout_offset_x + col as f64 * cfg.layout_spacing_x,
                milestone.position.y,
            );
            placements.push((node.id, p));
        }
    }
    placements
}
