//! ecdesigner-core: canvas interaction and graph-state engine for laying out
//! milestones and exploratory cycles (ECs) of a curriculum.
//!
//! The controller in [`canvas`] owns the graph and turns pointer and key input
//! into edits; [`output`] projects its state for rendering and [`wasm`]
//! exposes it to a JavaScript host.

pub mod canvas;
pub mod config;
pub mod demo;
pub mod error;
pub mod model;
pub mod output;
pub mod store;
pub mod table;
pub mod wasm;

pub use canvas::{CanvasController, ChangeKind, EditDraft, EntityRef, KeyCommand, KeyOutcome, PointerEvent};
pub use config::CanvasConfig;
pub use error::{ConfigError, StoreError, TableError};
pub use model::{Connection, Cycle, EcNode, Milestone, Point, Project};
pub use output::CanvasOutput;
pub use store::{JsonFileStore, MemoryStore, ProjectStore};
