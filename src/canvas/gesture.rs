// Connection gesture state machine.
//
//   Idle --toggle--> ModeActive --start_drag--> Dragging
//   Dragging --pointer_move--> Dragging           (rubber band only)
//   Dragging --release--> ModeActive               (may yield a connection)
//   Dragging --cancel--> ModeActive
//   ModeActive/Dragging --toggle--> Idle           (drag discarded first)
//
// The machine never touches the graph. `release` hands back a
// `ConnectionRequest` and the controller commits it.

use serde::Serialize;

use crate::model::{AnchorDirection, Cycle, NodeId, Point};
use super::hit_test::HitTester;

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    ModeActive,
    Dragging {
        from: NodeId,
        direction: AnchorDirection,
        /// Last pointer position, None until the first move.
        end: Option<Point>,
    },
}

/// A connection the gesture resolved on release.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRequest {
    pub from: NodeId,
    pub to: NodeId,
    pub from_direction: AnchorDirection,
    pub to_direction: AnchorDirection,
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionGesture {
    state: GestureState,
}

impl ConnectionGesture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    /// Connection mode is on (with or without a drag in progress).
    pub fn is_mode_active(&self) -> bool {
        !matches!(self.state, GestureState::Idle)
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, GestureState::Dragging { .. })
    }

    /// Flip connection mode. Returns the new mode.
    pub fn toggle_mode(&mut self) -> bool {
        let on = !self.is_mode_active();
        self.set_mode(on);
        on
    }

    pub fn set_mode(&mut self, on: bool) {
        self.state = if on {
            match self.state {
                GestureState::Idle => GestureState::ModeActive,
                other => other,
            }
        } else {
            GestureState::Idle
        };
    }

    /// Begin dragging from one of a node's anchors. Only valid in ModeActive.
    pub fn start_drag(&mut self, from: NodeId, direction: AnchorDirection) -> bool {
        if self.state != GestureState::ModeActive {
            return false;
        }
        self.state = GestureState::Dragging { from, direction, end: None };
        true
    }

    pub fn pointer_move(&mut self, point: Point) {
        if let GestureState::Dragging { end, .. } = &mut self.state {
            *end = Some(point);
        }
    }

    /// Finish the drag at `point`. Returns the connection to create if a node
    /// other than the source lies under the release point.
    pub fn release(&mut self, point: Point, cycle: &Cycle, hit: &HitTester) -> Option<ConnectionRequest> {
        let GestureState::Dragging { from, direction, .. } = self.state else {
            return None;
        };
        self.state = GestureState::ModeActive;

        let target = hit.node_at(cycle, point)?;
        if target.id == from {
            return None;
        }
        Some(ConnectionRequest {
            from,
            to: target.id,
            from_direction: direction,
            to_direction: closest_direction(point, target.position),
        })
    }

    /// Discard an in-progress drag. Returns true if there was one.
    pub fn cancel(&mut self) -> bool {
        if self.is_dragging() {
            self.state = GestureState::ModeActive;
            true
        } else {
            false
        }
    }

    /// Source node, source anchor and current pointer while dragging.
    pub fn rubber_band(&self) -> Option<(NodeId, AnchorDirection, Option<Point>)> {
        match self.state {
            GestureState::Dragging { from, direction, end } => Some((from, direction, end)),
            _ => None,
        }
    }
}

/// Which side of a node at `center` faces `point`.
/// Horizontal wins only when strictly dominant; ties fall to top/bottom.
pub fn closest_direction(point: Point, center: Point) -> AnchorDirection {
    let dx = point.x - center.x;
    let dy = point.y - center.y;
    if dx.abs() > dy.abs() {
        if dx > 0.0 { AnchorDirection::Right } else { AnchorDirection::Left }
    } else if dy > 0.0 {
        AnchorDirection::Bottom
    } else {
        AnchorDirection::Top
    }
}
