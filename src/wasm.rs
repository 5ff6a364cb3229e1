//! WASM bindings for the ecdesigner-core library.
//!
//! A `CanvasHandle` wraps one controller backed by an in-memory store; the JS
//! host persists project snapshots itself. Mutating calls return the fresh
//! `CanvasOutput` as JSON. Recoverable failures are logged to the console and
//! leave the canvas unchanged.

use wasm_bindgen::prelude::*;
use serde::Serialize;

use crate::canvas::{CanvasController, EditDraft, EntityRef, KeyCommand, KeyOutcome, PointerEvent};
use crate::config::CanvasConfig;
use crate::model::{AnchorDirection, EcNode, Milestone, MilestoneId, NodeId, Point, Project};
use crate::output::CanvasOutput;
use crate::store::MemoryStore;
use crate::table;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console, js_name = log)]
    pub fn console_log(s: &str);

    #[wasm_bindgen(js_namespace = console, js_name = error)]
    pub fn console_error(s: &str);
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        console_error(&format!("Error serializing output: {}", e));
        "{}".to_string()
    })
}

#[wasm_bindgen]
pub struct CanvasHandle {
    inner: CanvasController,
}

#[wasm_bindgen]
impl CanvasHandle {
    /// Create a canvas over a serialized project, or a new one if
    /// `project_json` is empty. `config_json` may be empty for defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(project_json: &str, config_json: &str) -> CanvasHandle {
        let config = if config_json.trim().is_empty() {
            CanvasConfig::default()
        } else {
            CanvasConfig::from_json(config_json).unwrap_or_else(|e| {
                console_error(&format!("Error reading config: {}", e));
                CanvasConfig::default()
            })
        };
        let mut inner = CanvasController::new(Project::default(), Box::new(MemoryStore::new()), config);
        if !project_json.trim().is_empty() {
            match serde_json::from_str::<Project>(project_json) {
                Ok(project) => inner.load_project(project),
                Err(e) => console_error(&format!("Error reading project: {}", e)),
            }
        }
        CanvasHandle { inner }
    }

    /// Current render projection as JSON
    pub fn output(&self) -> String {
        to_json(&CanvasOutput::capture(&self.inner))
    }

    /// Full project as JSON, for the host to persist
    pub fn project_json(&self) -> String {
        to_json(&self.inner.project_snapshot())
    }

    /// Replace the current project. Returns the output (unchanged on error).
    pub fn load_project(&mut self, project_json: &str) -> String {
        match serde_json::from_str::<Project>(project_json) {
            Ok(project) => self.inner.load_project(project),
            Err(e) => console_error(&format!("Error reading project: {}", e)),
        }
        self.output()
    }

    /// Feed a pointer event: `{"type":"down","at":[x,y]}` etc.
    pub fn pointer(&mut self, event_json: &str) -> String {
        match serde_json::from_str::<PointerEvent>(event_json) {
            Ok(event) => {
                self.inner.handle_pointer(event);
            }
            Err(e) => console_error(&format!("Error reading pointer event: {}", e)),
        }
        self.output()
    }

    /// Abort any in-flight drag (window blur, pointer capture lost).
    pub fn cancel_pointer(&mut self) -> String {
        self.inner.cancel_pointer();
        self.output()
    }

    /// Feed a key command. Returns the `KeyOutcome` as JSON; the host shows a
    /// confirmation for `confirmDelete` and then calls `delete_selected`.
    pub fn key(&mut self, command_json: &str) -> String {
        match serde_json::from_str::<KeyCommand>(command_json) {
            Ok(command) => to_json(&self.inner.handle_key(command)),
            Err(e) => {
                console_error(&format!("Error reading key command: {}", e));
                to_json(&KeyOutcome::Ignored)
            }
        }
    }

    pub fn add_node(&mut self, x: f64, y: f64) -> String {
        self.inner.add_node_at(Point::new(x, y));
        self.output()
    }

    /// Add a milestone at its default stacked position
    pub fn add_milestone(&mut self) -> String {
        self.inner.add_milestone_at(None);
        self.output()
    }

    pub fn delete_selected(&mut self) -> String {
        self.inner.delete_selected();
        self.output()
    }

    pub fn undo(&mut self) -> String {
        self.inner.undo();
        self.output()
    }

    pub fn auto_layout(&mut self) -> String {
        self.inner.auto_layout();
        self.output()
    }

    pub fn toggle_connection_mode(&mut self) -> String {
        self.inner.toggle_connection_mode();
        self.output()
    }

    /// Start a connection from an anchor ("top", "bottom", "left", "right").
    pub fn start_connection(&mut self, node_id: &str, direction: &str) -> String {
        let anchor = AnchorDirection::ALL.into_iter().find(|d| d.as_str() == direction);
        match (node_id.parse::<NodeId>(), anchor) {
            (Ok(node), Some(anchor)) => {
                if !self.inner.start_connection(node, anchor) {
                    console_error(&format!("Cannot start connection from '{}'", node_id));
                }
            }
            _ => console_error(&format!("Invalid anchor '{}' on '{}'", direction, node_id)),
        }
        self.output()
    }

    /// Draft copy of a node or milestone as JSON, or empty if it does not exist.
    pub fn begin_edit(&self, entity_id: &str) -> String {
        let Some(target) = self.resolve(entity_id) else {
            return String::new();
        };
        match self.inner.begin_edit(target) {
            Some(EditDraft::Node(node)) => to_json(&node),
            Some(EditDraft::Milestone(milestone)) => to_json(&milestone),
            None => String::new(),
        }
    }

    /// Write back an edited node.
    pub fn commit_node(&mut self, node_json: &str) -> String {
        match serde_json::from_str::<EcNode>(node_json) {
            Ok(node) => {
                if !self.inner.commit_edit(EditDraft::Node(node)) {
                    console_error("Edited node no longer exists");
                }
            }
            Err(e) => console_error(&format!("Error reading node: {}", e)),
        }
        self.output()
    }

    /// Write back an edited milestone.
    pub fn commit_milestone(&mut self, milestone_json: &str) -> String {
        match serde_json::from_str::<Milestone>(milestone_json) {
            Ok(milestone) => {
                if !self.inner.commit_edit(EditDraft::Milestone(milestone)) {
                    console_error("Edited milestone no longer exists");
                }
            }
            Err(e) => console_error(&format!("Error reading milestone: {}", e)),
        }
        self.output()
    }

    pub fn populate_demo_data(&mut self) -> String {
        self.inner.populate_demo_data();
        self.output()
    }

    /// CSV text of the current cycle, or empty on error.
    pub fn export_csv(&self) -> String {
        table::export_csv(self.inner.cycle()).unwrap_or_else(|e| {
            console_error(&format!("Error exporting table: {}", e));
            String::new()
        })
    }

    /// Replace the graph with a CSV table. Returns the output (unchanged on error).
    pub fn import_csv(&mut self, text: &str) -> String {
        match table::import_csv(text, self.inner.config()) {
            Ok(import) => {
                for warning in &import.warnings {
                    console_log(warning);
                }
                if let Err(e) = self.inner.import_table(import) {
                    console_error(&format!("Error saving imported project: {}", e));
                }
            }
            Err(e) => console_error(&format!("Error importing table: {}", e)),
        }
        self.output()
    }
}

impl CanvasHandle {
    fn resolve(&self, entity_id: &str) -> Option<EntityRef> {
        if let Ok(id) = entity_id.parse::<NodeId>() {
            if self.inner.cycle().node(id).is_some() {
                return Some(EntityRef::Node(id));
            }
        }
        let id = entity_id.parse::<MilestoneId>().ok()?;
        self.inner.cycle().milestone(id).map(|m| EntityRef::Milestone(m.id))
    }
}
