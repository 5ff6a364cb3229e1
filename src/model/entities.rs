use serde::{Deserialize, Serialize};

use super::types::{AnchorDirection, ConnectionId, MilestoneId, NodeId, Phase, Point};

/// A goal or checkpoint in the curriculum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub id: MilestoneId,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub phase: Option<Phase>,
    /// How to know the milestone is achieved
    pub success_criteria: String,
    pub deliverable: String,
    pub artifacts: String,
    pub mentor_guidelines: String,
    /// Canonical ordering; not guaranteed unique after import.
    pub sequence_number: i64,
    pub position: Point,
    pub is_achieved: bool,
}

impl Milestone {
    /// Blank milestone with a fresh id.
    pub fn new(sequence_number: i64, position: Point) -> Self {
        Self {
            id: MilestoneId::new(),
            title: String::new(),
            description: String::new(),
            phase: None,
            success_criteria: String::new(),
            deliverable: String::new(),
            artifacts: String::new(),
            mentor_guidelines: String::new(),
            sequence_number,
            position,
            is_achieved: false,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Title for display, falling back to `Milestone #n` when blank.
    pub fn display_title(&self) -> String {
        if self.title.is_empty() {
            format!("Milestone #{}", self.sequence_number + 1)
        } else {
            self.title.clone()
        }
    }
}

/// An exploratory cycle ("EC"): one question → activity → finding → synthesis
/// iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcNode {
    pub id: NodeId,
    pub position: Point,
    pub sequence_number: i64,

    pub day: String,
    pub learning_objective: String,
    pub artifact: String,
    pub mentor_tasks: String,

    pub guiding_questions: String,
    pub guiding_activities: String,
    pub findings: String,
    pub synthesis: String,

    pub duration: String,
    /// Weak reference; may dangle after the milestone is removed.
    #[serde(default)]
    pub milestone_id: Option<MilestoneId>,
    /// EC to try next if this one does not achieve its milestone. Weak.
    #[serde(default, rename = "nextECId")]
    pub next_ec_id: Option<NodeId>,

    /// Editor UI state only.
    #[serde(default)]
    pub last_selected_tab: Option<String>,
}

impl EcNode {
    /// Blank node with a fresh id.
    pub fn new(sequence_number: i64, position: Point) -> Self {
        Self {
            id: NodeId::new(),
            position,
            sequence_number,
            day: String::new(),
            learning_objective: String::new(),
            artifact: String::new(),
            mentor_tasks: String::new(),
            guiding_questions: String::new(),
            guiding_activities: String::new(),
            findings: String::new(),
            synthesis: String::new(),
            duration: String::new(),
            milestone_id: None,
            next_ec_id: None,
            last_selected_tab: None,
        }
    }

    pub fn linked_to(mut self, milestone: MilestoneId) -> Self {
        self.milestone_id = Some(milestone);
        self
    }
}

/// Directed edge between two nodes. Endpoints are weak references; the graph
/// deletes the connection when either endpoint node goes away.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: ConnectionId,
    pub from_node_id: NodeId,
    pub to_node_id: NodeId,
    pub from_direction: AnchorDirection,
    pub to_direction: AnchorDirection,
}

impl Connection {
    pub fn new(
        from: NodeId,
        to: NodeId,
        from_direction: AnchorDirection,
        to_direction: AnchorDirection,
    ) -> Self {
        Self {
            id: ConnectionId::new(),
            from_node_id: from,
            to_node_id: to,
            from_direction,
            to_direction,
        }
    }

    pub fn touches(&self, node: NodeId) -> bool {
        self.from_node_id == node || self.to_node_id == node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_json_field_names() {
        let mut node = EcNode::new(3, Point::new(1.0, 2.0));
        node.next_ec_id = Some(NodeId::new());
        let value = serde_json::to_value(&node).unwrap();

        assert!(value.get("sequenceNumber").is_some());
        assert!(value.get("learningObjective").is_some());
        assert!(value.get("nextECId").is_some());
        assert_eq!(value["position"], serde_json::json!([1.0, 2.0]));
    }

    #[test]
    fn test_node_optional_fields_default_when_missing() {
        let json = format!(
            r#"{{"id":"{}","position":[0,0],"sequenceNumber":0,"day":"","learningObjective":"",
            "artifact":"","mentorTasks":"","guidingQuestions":"","guidingActivities":"",
            "findings":"","synthesis":"","duration":""}}"#,
            NodeId::new()
        );
        let node: EcNode = serde_json::from_str(&json).unwrap();
        assert_eq!(node.milestone_id, None);
        assert_eq!(node.next_ec_id, None);
        assert_eq!(node.last_selected_tab, None);
    }

    #[test]
    fn test_milestone_display_title() {
        let m = Milestone::new(1, Point::ZERO);
        assert_eq!(m.display_title(), "Milestone #2");
        assert_eq!(m.with_title("Use Cases").display_title(), "Use Cases");
    }

    #[test]
    fn test_connection_touches() {
        let (a, b, c) = (NodeId::new(), NodeId::new(), NodeId::new());
        let conn = Connection::new(a, b, AnchorDirection::Right, AnchorDirection::Left);
        assert!(conn.touches(a));
        assert!(conn.touches(b));
        assert!(!conn.touches(c));
    }
}
