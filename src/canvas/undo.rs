//! Bounded linear undo over structural edits.
//!
//! Each recorded action carries exactly what is needed to invert it: entity
//! snapshots for adds and deletes, the old position for moves. There is no
//! redo; an undone action is gone.

use std::collections::VecDeque;

use crate::model::{Cycle, EcNode, Milestone, MilestoneId, NodeId, Point, RemovedMilestone, RemovedNode};

pub const UNDO_CAPACITY: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub enum UndoAction {
    AddNode(EcNode),
    DeleteNode(RemovedNode),
    AddMilestone(Milestone),
    DeleteMilestone(RemovedMilestone),
    MoveNode { id: NodeId, old: Point, new: Point },
    MoveMilestone { id: MilestoneId, old: Point, new: Point },
}

impl UndoAction {
    pub fn label(&self) -> &'static str {
        match self {
            UndoAction::AddNode(_) => "add node",
            UndoAction::DeleteNode(_) => "delete node",
            UndoAction::AddMilestone(_) => "add milestone",
            UndoAction::DeleteMilestone(_) => "delete milestone",
            UndoAction::MoveNode { .. } => "move node",
            UndoAction::MoveMilestone { .. } => "move milestone",
        }
    }

    /// Apply the inverse of this action to the graph.
    pub fn revert(self, cycle: &mut Cycle) {
        match self {
            UndoAction::AddNode(node) => {
                cycle.remove_node(node.id);
            }
            UndoAction::DeleteNode(removed) => cycle.restore_node(removed),
            UndoAction::AddMilestone(milestone) => {
                cycle.remove_milestone(milestone.id);
            }
            UndoAction::DeleteMilestone(removed) => cycle.restore_milestone(removed),
            UndoAction::MoveNode { id, old, .. } => {
                cycle.set_node_position(id, old);
            }
            UndoAction::MoveMilestone { id, old, .. } => {
                cycle.set_milestone_position(id, old);
            }
        }
    }
}

/// Push/pop at the back, evict from the front once over capacity.
#[derive(Debug, Clone)]
pub struct UndoStack {
    actions: VecDeque<UndoAction>,
    capacity: usize,
    /// Nesting depth of suppressed sections (undo replay, bulk resets).
    suppressed: usize,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(UNDO_CAPACITY)
    }
}

impl UndoStack {
    pub fn new(capacity: usize) -> Self {
        Self {
            actions: VecDeque::with_capacity(capacity.min(UNDO_CAPACITY)),
            capacity: capacity.max(1),
            suppressed: 0,
        }
    }

    /// Record an action. Returns false if recording is currently suppressed.
    pub fn push(&mut self, action: UndoAction) -> bool {
        if self.is_suppressed() {
            return false;
        }
        self.actions.push_back(action);
        while self.actions.len() > self.capacity {
            self.actions.pop_front();
        }
        true
    }

    pub fn pop(&mut self) -> Option<UndoAction> {
        self.actions.pop_back()
    }

    /// Pop the most recent action and revert it on `cycle`.
    /// Recording is suppressed while the inverse is applied.
    pub fn undo(&mut self, cycle: &mut Cycle) -> Option<&'static str> {
        let action = self.pop()?;
        let label = action.label();
        self.suppress();
        action.revert(cycle);
        self.resume();
        Some(label)
    }

    pub fn suppress(&mut self) {
        self.suppressed += 1;
    }

    pub fn resume(&mut self) {
        self.suppressed = self.suppressed.saturating_sub(1);
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed > 0
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        !self.actions.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent action, if any.
    pub fn peek(&self) -> Option<&UndoAction> {
        self.actions.back()
    }
}
