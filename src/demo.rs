//! Demo curriculum: a fifteen-day app-development challenge.

use crate::config::CanvasConfig;
use crate::model::{EcNode, Milestone, Phase, Point};

/// (title, phase, description, success criteria)
const MILESTONES: &[(&str, Phase, &str, &str)] = &[
    (
        "Apple Technology Goldenbell",
        Phase::Engage,
        "Learn about Apple's ecosystem and development tools",
        "Complete technology quiz with 80% accuracy",
    ),
    (
        "Technology Choice",
        Phase::Engage,
        "Choose the appropriate technology stack for the project",
        "Document technology choices with justification",
    ),
    (
        "Challenge Statement / Team building",
        Phase::Engage,
        "Define the challenge and form development teams",
        "Written challenge statement and team roles defined",
    ),
    (
        "Deep understanding of technology",
        Phase::Investigate,
        "Gain comprehensive knowledge of chosen technologies",
        "Create technical documentation and proof of concept",
    ),
    (
        "Use Cases",
        Phase::Investigate,
        "Identify and document user scenarios",
        "Minimum 5 detailed use cases documented",
    ),
    (
        "Solution Concept",
        Phase::Investigate,
        "Design the solution architecture",
        "Architecture diagram and technical specification",
    ),
    (
        "Feature List",
        Phase::Act,
        "Define all features to be implemented",
        "Prioritized feature list with acceptance criteria",
    ),
    (
        "1st Sprint Review",
        Phase::Act,
        "Review progress of first development sprint",
        "Working demo of core features",
    ),
    (
        "2nd Sprint Review",
        Phase::Act,
        "Review progress of second development sprint",
        "Integration of major features completed",
    ),
    (
        "Final Review",
        Phase::Act,
        "Final project presentation and review",
        "Complete product demo and documentation",
    ),
];

/// (day, learning objective, milestone index, guiding question, guiding activity)
const CYCLES: &[(&str, &str, usize, &str, &str)] = &[
    ("Day 1", "Today learners understand the basics of the Apple ecosystem", 0,
     "What makes Apple's ecosystem unique?",
     "Explore Xcode and create first Hello World app"),
    ("Day 2", "Today learners pick up the fundamentals of Swift", 0,
     "How does Swift differ from other programming languages?",
     "Complete Swift playground exercises"),
    ("Day 3", "Today learners choose their tools and frameworks", 1,
     "Which frameworks best suit our project needs?",
     "Research and compare different Apple frameworks"),
    ("Day 4", "Today learners form teams and define roles", 2,
     "What are our team's strengths and how can we leverage them?",
     "Team building activities and role assignment"),
    ("Day 5", "Today learners pin down the challenge", 2,
     "What problem are we solving and for whom?",
     "Write challenge statement and user personas"),
    ("Day 6", "Today learners study their chosen technology in depth", 3,
     "How do we implement core features using our chosen technology?",
     "Build technical prototypes and experiments"),
    ("Day 7", "Today learners write user scenarios", 4,
     "How will users interact with our solution?",
     "Create user journey maps and scenarios"),
    ("Day 8", "Today learners design the solution architecture", 5,
     "How should we structure our application?",
     "Design system architecture and data flow"),
    ("Day 9", "Today learners list the features to build", 6,
     "What features are essential vs. nice-to-have?",
     "Create and prioritize product backlog"),
    ("Day 10", "Today learners start the first sprint", 7,
     "What can we achieve in this sprint?",
     "Sprint planning and task breakdown"),
    ("Day 11", "Today learners implement the core features", 7,
     "How do we ensure code quality?",
     "Implement features with unit tests"),
    ("Day 12", "Today learners run the second sprint", 8,
     "How do we integrate different components?",
     "Feature integration and system testing"),
    ("Day 13", "Today learners polish the UI/UX", 8,
     "How can we make the user experience better?",
     "User testing and interface refinement"),
    ("Day 14", "Today learners prepare the final presentation", 9,
     "How do we effectively demonstrate our solution?",
     "Prepare presentation and demo"),
    ("Day 15", "Today learners wrap up and look back", 9,
     "What did we learn and how can we improve?",
     "Final review and retrospective"),
];

/// Build the demo milestones and their linked nodes.
pub fn demo_curriculum(cfg: &CanvasConfig) -> (Vec<Milestone>, Vec<EcNode>) {
    let milestones: Vec<Milestone> = MILESTONES
        .iter()
        .enumerate()
        .map(|(i, &(title, phase, description, criteria))| {
            let mut m = Milestone::new(i as i64, cfg.default_milestone_position(i)).with_title(title);
            m.phase = Some(phase);
            m.description = description.to_string();
            m.success_criteria = criteria.to_string();
            m.deliverable = format!("Deliverable for {title}");
            m.artifacts = "Artifacts and evidence of completion".to_string();
            m.mentor_guidelines = format!(
                "Mentors should guide learners through {} and provide feedback on their progress.",
                title.to_lowercase()
            );
            m
        })
        .collect();

    let nodes = CYCLES
        .iter()
        .enumerate()
        .map(|(i, &(day, objective, milestone, question, activity))| {
            let position = Point::new(400.0 + (i % 5) as f64 * 250.0, 300.0 + (i / 5) as f64 * 200.0);
            let mut n = EcNode::new(i as i64, position).linked_to(milestones[milestone].id);
            n.day = day.to_string();
            n.learning_objective = objective.to_string();
            n.artifact = format!("Artifact for {day}");
            n.mentor_tasks = "Guide learners through activities and provide feedback".to_string();
            n.guiding_questions = question.to_string();
            n.guiding_activities = activity.to_string();
            n.findings = "Key discoveries and insights from today's activities".to_string();
            n.synthesis = "Summary of learning outcomes and connections to previous knowledge".to_string();
            n.duration = "90 minutes".to_string();
            n
        })
        .collect();

    (milestones, nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_shape() {
        let (milestones, nodes) = demo_curriculum(&CanvasConfig::default());
        assert_eq!(milestones.len(), 10);
        assert_eq!(nodes.len(), 15);

        let engage = milestones.iter().filter(|m| m.phase == Some(Phase::Engage)).count();
        let act = milestones.iter().filter(|m| m.phase == Some(Phase::Act)).count();
        assert_eq!((engage, act), (3, 4));
        assert_eq!(milestones[9].position, Point::new(200.0, 2900.0));

        // Every node links to a real milestone.
        assert!(nodes.iter().all(|n| {
            n.milestone_id.is_some_and(|id| milestones.iter().any(|m| m.id == id))
        }));
    }
}
