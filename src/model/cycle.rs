//! The graph store: a cycle's milestones, nodes and connections.
//!
//! All graph mutation goes through the methods here. Lookups by a missing id
//! are no-ops; connections are cascaded away with their endpoint nodes, while
//! `milestone_id` and `next_ec_id` references are left dangling and resolve to
//! "no link" on lookup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entities::{Connection, EcNode, Milestone};
use super::types::{AnchorDirection, ConnectionId, CycleId, MilestoneId, NodeId, Point, ProjectId};

/// A node removed from the graph together with everything needed to put it
/// back exactly where it was.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedNode {
    pub index: usize,
    pub node: EcNode,
    /// Connections cascaded away, with their former indices (ascending).
    pub connections: Vec<(usize, Connection)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemovedMilestone {
    pub index: usize,
    pub milestone: Milestone,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cycle {
    pub id: CycleId,
    pub name: String,
    milestones: Vec<Milestone>,
    nodes: Vec<EcNode>,
    connections: Vec<Connection>,
    #[serde(rename = "createdDate")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "modifiedDate")]
    pub modified_at: DateTime<Utc>,
}

impl Default for Cycle {
    fn default() -> Self {
        Self::new("New Exploratory Cycle")
    }
}

impl Cycle {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: CycleId::new(),
            name: name.into(),
            milestones: Vec::new(),
            nodes: Vec::new(),
            connections: Vec::new(),
            created_at: now,
            modified_at: now,
        }
    }

    fn touch(&mut self) {
        self.modified_at = Utc::now();
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    /// Nodes in insertion order.
    pub fn nodes(&self) -> &[EcNode] {
        &self.nodes
    }

    /// Milestones in insertion order.
    pub fn milestones(&self) -> &[Milestone] {
        &self.milestones
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn node(&self, id: NodeId) -> Option<&EcNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn milestone(&self, id: MilestoneId) -> Option<&Milestone> {
        self.milestones.iter().find(|m| m.id == id)
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == id)
    }

    /// Nodes sorted by sequence number; ties keep insertion order.
    pub fn ordered_nodes(&self) -> Vec<&EcNode> {
        let mut nodes: Vec<&EcNode> = self.nodes.iter().collect();
        nodes.sort_by_key(|n| n.sequence_number);
        nodes
    }

    /// Milestones sorted by sequence number; ties keep insertion order.
    pub fn ordered_milestones(&self) -> Vec<&Milestone> {
        let mut milestones: Vec<&Milestone> = self.milestones.iter().collect();
        milestones.sort_by_key(|m| m.sequence_number);
        milestones
    }

    /// Every connection with `node` as either endpoint.
    pub fn connections_for(&self, node: NodeId) -> Vec<&Connection> {
        self.connections.iter().filter(|c| c.touches(node)).collect()
    }

    /// Nodes linked to a milestone, in sequence order.
    pub fn linked_nodes(&self, milestone: MilestoneId) -> Vec<&EcNode> {
        let mut nodes: Vec<&EcNode> = self
            .nodes
            .iter()
            .filter(|n| n.milestone_id == Some(milestone))
            .collect();
        nodes.sort_by_key(|n| n.sequence_number);
        nodes
    }

    /// Resolve a node's milestone link. Dangling ids resolve to `None`.
    pub fn milestone_of(&self, node: &EcNode) -> Option<&Milestone> {
        node.milestone_id.and_then(|id| self.milestone(id))
    }

    /// Resolve a node's "next EC" link. Dangling ids resolve to `None`.
    pub fn next_ec_of(&self, node: &EcNode) -> Option<&EcNode> {
        node.next_ec_id.and_then(|id| self.node(id))
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.milestones.is_empty() && self.connections.is_empty()
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    pub fn add_node(&mut self, node: EcNode) {
        self.nodes.push(node);
        self.touch();
    }

    /// Replace the node with the same id.
    /// Returns true if the node was found and replaced.
    pub fn update_node(&mut self, node: EcNode) -> bool {
        match self.nodes.iter_mut().find(|n| n.id == node.id) {
            Some(slot) => {
                *slot = node;
                self.touch();
                true
            }
            None => false,
        }
    }

    /// Remove a node and every connection that references it.
    pub fn remove_node(&mut self, id: NodeId) -> Option<RemovedNode> {
        let index = self.nodes.iter().position(|n| n.id == id)?;
        let node = self.nodes.remove(index);

        let mut connections = Vec::new();
        let mut kept = Vec::with_capacity(self.connections.len());
        for (i, conn) in std::mem::take(&mut self.connections).into_iter().enumerate() {
            if conn.touches(id) {
                connections.push((i, conn));
            } else {
                kept.push(conn);
            }
        }
        self.connections = kept;
        self.touch();

        Some(RemovedNode { index, node, connections })
    }

    /// Put a removed node (and its cascaded connections) back at their former
    /// indices, clamped to the current collection lengths.
    pub fn restore_node(&mut self, removed: RemovedNode) {
        let index = removed.index.min(self.nodes.len());
        self.nodes.insert(index, removed.node);
        for (i, conn) in removed.connections {
            let i = i.min(self.connections.len());
            self.connections.insert(i, conn);
        }
        self.touch();
    }

    /// Write a node's position. Returns the previous position if found.
    pub fn set_node_position(&mut self, id: NodeId, position: Point) -> Option<Point> {
        let node = self.nodes.iter_mut().find(|n| n.id == id)?;
        let old = std::mem::replace(&mut node.position, position);
        self.touch();
        Some(old)
    }

    /// Rewrite node sequence numbers densely as 0..n in current order.
    pub fn renumber_nodes(&mut self) {
        let order: Vec<NodeId> = self.ordered_nodes().iter().map(|n| n.id).collect();
        for (seq, id) in order.into_iter().enumerate() {
            if let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) {
                node.sequence_number = seq as i64;
            }
        }
        self.touch();
    }

    // ------------------------------------------------------------------
    // Milestones
    // ------------------------------------------------------------------

    pub fn add_milestone(&mut self, milestone: Milestone) {
        self.milestones.push(milestone);
        self.touch();
    }

    /// Replace the milestone with the same id.
    /// Returns true if the milestone was found and replaced.
    pub fn update_milestone(&mut self, milestone: Milestone) -> bool {
        match self.milestones.iter_mut().find(|m| m.id == milestone.id) {
            Some(slot) => {
                *slot = milestone;
                self.touch();
                true
            }
            None => false,
        }
    }

    /// Remove a milestone. Nodes linked to it keep their (now dangling)
    /// `milestone_id`.
    pub fn remove_milestone(&mut self, id: MilestoneId) -> Option<RemovedMilestone> {
        let index = self.milestones.iter().position(|m| m.id == id)?;
        let milestone = self.milestones.remove(index);
        self.touch();
        Some(RemovedMilestone { index, milestone })
    }

    pub fn restore_milestone(&mut self, removed: RemovedMilestone) {
        let index = removed.index.min(self.milestones.len());
        self.milestones.insert(index, removed.milestone);
        self.touch();
    }

    /// Write a milestone's position. Returns the previous position if found.
    pub fn set_milestone_position(&mut self, id: MilestoneId, position: Point) -> Option<Point> {
        let milestone = self.milestones.iter_mut().find(|m| m.id == id)?;
        let old = std::mem::replace(&mut milestone.position, position);
        self.touch();
        Some(old)
    }

    /// Flip a milestone's achieved flag. Returns the new value if found.
    pub fn toggle_milestone_achieved(&mut self, id: MilestoneId) -> Option<bool> {
        let milestone = self.milestones.iter_mut().find(|m| m.id == id)?;
        milestone.is_achieved = !milestone.is_achieved;
        let achieved = milestone.is_achieved;
        self.touch();
        Some(achieved)
    }

    // ------------------------------------------------------------------
    // Connections
    // ------------------------------------------------------------------

    /// Append a new connection. Self-loops and duplicate edges are allowed.
    pub fn add_connection(
        &mut self,
        from: NodeId,
        to: NodeId,
        from_direction: AnchorDirection,
        to_direction: AnchorDirection,
    ) -> ConnectionId {
        let conn = Connection::new(from, to, from_direction, to_direction);
        let id = conn.id;
        self.connections.push(conn);
        self.touch();
        id
    }

    /// Returns true if a connection was removed.
    pub fn remove_connection(&mut self, id: ConnectionId) -> bool {
        let before = self.connections.len();
        self.connections.retain(|c| c.id != id);
        let removed = self.connections.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    // ------------------------------------------------------------------
    // Bulk
    // ------------------------------------------------------------------

    /// Replace all collections at once.
    pub fn replace_contents(&mut self, milestones: Vec<Milestone>, nodes: Vec<EcNode>) {
        self.milestones = milestones;
        self.nodes = nodes;
        self.connections.clear();
        self.touch();
    }
}

/// Top-level aggregate: one curriculum challenge and its cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub challenge_statement: String,
    pub challenge_description: String,
    pub target_learners: String,
    pub duration: String,
    pub overall_success_criteria: String,
    pub exploratory_cycle: Cycle,
    #[serde(rename = "createdDate")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "modifiedDate")]
    pub modified_at: DateTime<Utc>,
}

impl Default for Project {
    fn default() -> Self {
        Self::new("New Challenge")
    }
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ProjectId::new(),
            name: name.into(),
            challenge_statement: String::new(),
            challenge_description: String::new(),
            target_learners: String::new(),
            duration: String::new(),
            overall_success_criteria: String::new(),
            exploratory_cycle: Cycle::default(),
            created_at: now,
            modified_at: now,
        }
    }

    pub fn cycle(&self) -> &Cycle {
        &self.exploratory_cycle
    }

    /// Mutable access to the cycle; marks the project modified.
    pub fn cycle_mut(&mut self) -> &mut Cycle {
        self.modified_at = Utc::now();
        &mut self.exploratory_cycle
    }
}
