//! Tabular curriculum export/import (CSV).
//!
//! Export writes one row per node in sequence order using the fixed column
//! schema below. Import is forgiving: headers are matched by keyword, any
//! other non-empty header is taken as a milestone column, and rows link to
//! the first milestone column they fill in (or to the milestone named in their
//! `Milestone` cell, which is what export writes).

use std::collections::HashMap;

use tracing::{debug, info};

use crate::config::CanvasConfig;
use crate::error::TableError;
use crate::model::{Cycle, EcNode, Milestone, MilestoneId, Phase, Point};

/// Export column order.
pub const EXPORT_HEADERS: [&str; 14] = [
    "Phase",
    "Day",
    "Learning Objective",
    "Milestone",
    "Artifact/Deliverable",
    "Success Criteria",
    "Mentor Tasks",
    "Mentoring Guidelines",
    "Guiding Questions",
    "Guiding Activities",
    "Findings",
    "Synthesis",
    "Duration",
    "EC Number",
];

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
enum Column {
    Phase,
    Day,
    LearningObjective,
    Milestone,
    Artifact,
    SuccessCriteria,
    MentorTasks,
    MentoringGuidelines,
    GuidingQuestions,
    GuidingActivities,
    Findings,
    Synthesis,
    Duration,
    EcNumber,
}

/// Header keyword registry: (keyword, column).
/// Checked in order, so keywords that contain others must come first.
const HEADER_KEYWORDS: &[(&str, Column)] = &[
    ("mentoring guidelines", Column::MentoringGuidelines),
    ("mentor tasks", Column::MentorTasks),
    ("멘토의 할일", Column::MentorTasks),
    ("learning objective", Column::LearningObjective),
    ("오늘 러너들은", Column::LearningObjective),
    ("success criteria", Column::SuccessCriteria),
    ("key gqs", Column::GuidingQuestions),
    ("guiding questions", Column::GuidingQuestions),
    ("key gas", Column::GuidingActivities),
    ("guiding activities", Column::GuidingActivities),
    ("ec number", Column::EcNumber),
    ("milestone", Column::Milestone),
    ("artifact", Column::Artifact),
    ("deliverable", Column::Artifact),
    ("findings", Column::Findings),
    ("synthesis", Column::Synthesis),
    ("duration", Column::Duration),
    ("phase", Column::Phase),
    ("day", Column::Day),
];

fn classify_header(header: &str) -> Option<Column> {
    let normalized = header.trim().to_lowercase();
    HEADER_KEYWORDS
        .iter()
        .find(|(kw, _)| normalized.contains(*kw))
        .map(|(_, col)| *col)
}

// ============================================================================
// Export
// ============================================================================

/// One row of strings per node, in sequence order, without the header.
pub fn export_rows(cycle: &Cycle) -> Vec<Vec<String>> {
    cycle
        .ordered_nodes()
        .into_iter()
        .map(|node| {
            let milestone = cycle.milestone_of(node);
            vec![
                milestone.and_then(|m| m.phase).map(|p| p.as_str().to_string()).unwrap_or_default(),
                node.day.clone(),
                node.learning_objective.clone(),
                milestone.map(|m| m.display_title()).unwrap_or_default(),
                node.artifact.clone(),
                milestone.map(|m| m.success_criteria.clone()).unwrap_or_default(),
                node.mentor_tasks.clone(),
                milestone.map(|m| m.mentor_guidelines.clone()).unwrap_or_default(),
                node.guiding_questions.clone(),
                node.guiding_activities.clone(),
                node.findings.clone(),
                node.synthesis.clone(),
                node.duration.clone(),
                format!("#{}", node.sequence_number + 1),
            ]
        })
        .collect()
}

/// Header plus one record per node.
pub fn export_csv(cycle: &Cycle) -> Result<String, TableError> {
    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    wtr.write_record(EXPORT_HEADERS)?;
    for row in export_rows(cycle) {
        wtr.write_record(&row)?;
    }
    let bytes = wtr.into_inner().map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

// ============================================================================
// Parsing
// ============================================================================

/// Split CSV text into records. Rows may differ in length.
pub fn read_records(text: &str) -> Result<Vec<Vec<String>>, TableError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.trim_start_matches('\u{feff}').as_bytes());
    rdr.records()
        .map(|record| -> Result<Vec<String>, TableError> {
            Ok(record?.iter().map(str::to_string).collect())
        })
        .collect()
}

// ============================================================================
// Import
// ============================================================================

/// Records produced by an import, ready to install as a whole graph.
#[derive(Debug, Clone, Default)]
pub struct TableImport {
    pub milestones: Vec<Milestone>,
    pub nodes: Vec<EcNode>,
    /// Non-fatal problems, one line each.
    pub warnings: Vec<String>,
}

struct MilestoneSet<'a> {
    cfg: &'a CanvasConfig,
    milestones: Vec<Milestone>,
    by_title: HashMap<String, usize>,
}

impl<'a> MilestoneSet<'a> {
    fn new(cfg: &'a CanvasConfig) -> Self {
        Self { cfg, milestones: Vec::new(), by_title: HashMap::new() }
    }

    /// Index of the milestone with this title, creating it if needed.
    fn get_or_create(&mut self, title: &str) -> usize {
        if let Some(&i) = self.by_title.get(title) {
            return i;
        }
        let seq = self.milestones.len();
        let milestone = Milestone::new(seq as i64, self.cfg.default_milestone_position(seq)).with_title(title);
        debug!(title, "created milestone from table");
        self.milestones.push(milestone);
        self.by_title.insert(title.to_string(), seq);
        seq
    }
}

pub fn import_csv(text: &str, cfg: &CanvasConfig) -> Result<TableImport, TableError> {
    let records = read_records(text)?;
    let Some((header, rows)) = records.split_first() else {
        return Err(TableError::Empty);
    };
    if rows.is_empty() {
        return Err(TableError::Empty);
    }

    let mut columns: Vec<(usize, Column)> = Vec::new();
    let mut milestone_columns: Vec<(usize, String)> = Vec::new();
    for (i, h) in header.iter().enumerate() {
        let title = h.trim();
        if title.is_empty() {
            continue;
        }
        match classify_header(title) {
            Some(col) => columns.push((i, col)),
            None => milestone_columns.push((i, title.to_string())),
        }
    }

    let mut set = MilestoneSet::new(cfg);
    for (_, title) in &milestone_columns {
        set.get_or_create(title);
    }

    let mut import = TableImport::default();
    let data_rows = rows.iter().filter(|r| r.iter().any(|f| !f.trim().is_empty()));

    for (row_index, fields) in data_rows.enumerate() {
        let cell = |i: usize| fields.get(i).map(|f| f.trim()).unwrap_or("");
        // Several headers may feed one field; their cells are concatenated.
        let get = |col: Column| -> String {
            columns.iter().filter(|(_, c)| *c == col).map(|(i, _)| cell(*i)).collect()
        };

        let phase_label = get(Column::Phase);
        let phase = Phase::from_label(&phase_label);
        if phase.is_none() && !phase_label.is_empty() {
            import.warnings.push(format!("row {}: unknown phase '{}'", row_index + 2, phase_label));
        }
        let success_criteria = get(Column::SuccessCriteria);
        let mentor_guidelines = get(Column::MentoringGuidelines);

        let linked = milestone_columns
            .iter()
            .find(|(i, _)| !cell(*i).is_empty())
            .map(|(_, title)| title.clone())
            .or_else(|| {
                let named = get(Column::Milestone);
                (!named.is_empty()).then_some(named)
            })
            .map(|title| set.get_or_create(&title));

        let milestone_id: Option<MilestoneId> = linked.map(|i| {
            let m = &mut set.milestones[i];
            if m.success_criteria.is_empty() && !success_criteria.is_empty() {
                m.success_criteria = success_criteria.clone();
                m.mentor_guidelines = mentor_guidelines.clone();
                m.phase = phase;
            }
            m.id
        });

        let mut node = EcNode::new(row_index as i64, Point::new(400.0 + row_index as f64 * 100.0, 300.0));
        node.day = get(Column::Day);
        node.learning_objective = get(Column::LearningObjective);
        node.artifact = get(Column::Artifact);
        node.mentor_tasks = get(Column::MentorTasks);
        node.guiding_questions = get(Column::GuidingQuestions);
        node.guiding_activities = get(Column::GuidingActivities);
        node.findings = get(Column::Findings);
        node.synthesis = get(Column::Synthesis);
        node.duration = get(Column::Duration);
        node.milestone_id = milestone_id;
        import.nodes.push(node);
    }

    import.milestones = set.milestones;
    info!(
        milestones = import.milestones.len(),
        nodes = import.nodes.len(),
        warnings = import.warnings.len(),
        "imported table"
    );
    Ok(import)
}
