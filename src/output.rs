//! Output types for the host's renderer.
//!
//! These structs are serialized to JSON and sent to the frontend after every
//! change. Rendering is a pure function of this projection.

use serde::Serialize;

use crate::canvas::{CanvasController, EntityRef};
use crate::model::{AnchorDirection, ConnectionId, EcNode, Milestone, MilestoneId, NodeId, Phase, Point};

/// A milestone ready to draw
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneOutput {
    pub id: MilestoneId,
    /// Title, or `Milestone #n` when blank
    pub title: String,
    pub phase: Option<Phase>,
    pub position: Point,
    pub is_achieved: bool,
    pub selected: bool,
}

/// A node (EC) ready to draw
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeOutput {
    pub id: NodeId,
    pub sequence_number: i64,
    pub day: String,
    pub learning_objective: String,
    pub position: Point,
    /// Linked milestone, only if it still exists
    pub milestone_id: Option<MilestoneId>,
    pub selected: bool,
}

/// A connection with both anchor points resolved
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionOutput {
    pub id: ConnectionId,
    pub from: NodeId,
    pub to: NodeId,
    pub from_direction: AnchorDirection,
    pub to_direction: AnchorDirection,
    pub start: Point,
    pub end: Point,
}

/// The line drawn while a connection drag is in progress
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RubberBand {
    pub start: Point,
    /// Absent until the pointer first moves
    pub end: Option<Point>,
}

/// The combined output sent to the frontend
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasOutput {
    pub milestones: Vec<MilestoneOutput>,
    pub nodes: Vec<NodeOutput>,
    pub connections: Vec<ConnectionOutput>,
    pub selection: Option<EntityRef>,
    pub pan: Point,
    pub zoom: f64,
    pub connection_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rubber_band: Option<RubberBand>,
}

fn milestone_output(m: &Milestone, selection: Option<EntityRef>) -> MilestoneOutput {
    MilestoneOutput {
        id: m.id,
        title: m.display_title(),
        phase: m.phase,
        position: m.position,
        is_achieved: m.is_achieved,
        selected: selection == Some(EntityRef::Milestone(m.id)),
    }
}

fn node_output(ctl: &CanvasController, n: &EcNode) -> NodeOutput {
    NodeOutput {
        id: n.id,
        sequence_number: n.sequence_number,
        day: n.day.clone(),
        learning_objective: n.learning_objective.clone(),
        position: n.position,
        milestone_id: ctl.cycle().milestone_of(n).map(|m| m.id),
        selected: ctl.selection() == Some(EntityRef::Node(n.id)),
    }
}

impl CanvasOutput {
    /// Project the controller's current state.
    pub fn capture(ctl: &CanvasController) -> Self {
        let cycle = ctl.cycle();
        let selection = ctl.selection();

        let milestones = cycle
            .ordered_milestones()
            .into_iter()
            .map(|m| milestone_output(m, selection))
            .collect();

        let nodes = cycle
            .ordered_nodes()
            .into_iter()
            .map(|n| node_output(ctl, n))
            .collect();

        // Endpoints always exist: deleting a node cascades its connections.
        let connections = cycle
            .connections()
            .iter()
            .filter_map(|c| {
                Some(ConnectionOutput {
                    id: c.id,
                    from: c.from_node_id,
                    to: c.to_node_id,
                    from_direction: c.from_direction,
                    to_direction: c.to_direction,
                    start: ctl.anchor_point(c.from_node_id, c.from_direction)?,
                    end: ctl.anchor_point(c.to_node_id, c.to_direction)?,
                })
            })
            .collect();

        let rubber_band = ctl.gesture().rubber_band().and_then(|(from, direction, end)| {
            Some(RubberBand { start: ctl.anchor_point(from, direction)?, end })
        });

        Self {
            milestones,
            nodes,
            connections,
            selection,
            pan: ctl.pan(),
            zoom: ctl.zoom_scale(),
            connection_mode: ctl.gesture().is_mode_active(),
            rubber_band,
        }
    }
}
