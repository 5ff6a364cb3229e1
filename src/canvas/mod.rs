//! Canvas interaction engine.
//!
//! `CanvasController` is the only thing a host talks to. It owns the current
//! project, the selection, the pan/zoom view transform, the undo stack and the
//! connection gesture, and turns raw pointer and key input into graph edits.
//! Everything runs synchronously on the caller's thread.

pub mod autosave;
pub mod gesture;
pub mod input;
pub mod layout;
pub mod observer;
pub mod snap;
pub mod undo;

pub use autosave::AutoSave;
pub use gesture::{closest_direction, ConnectionGesture, ConnectionRequest, GestureState};
pub use hit_test::{anchor_at, EntityRef, HitTester};
pub use input::{KeyCommand, KeyOutcome, PointerEvent};
pub use observer::{ChangeKind, Observers, SubscriptionId};
pub use snap::{snap_to_grid, GridSnapper};
pub use undo::{UndoAction, UndoStack};

use std::time::Duration;

use tracing::{debug, info, trace, warn};
use web_time::Instant;

use crate::config::CanvasConfig;
use crate::demo::demo_curriculum;
use crate::error::StoreError;
use crate::model::{
    AnchorDirection, ConnectionId, Cycle, EcNode, Milestone, MilestoneId, NodeId, Point, Project,
    ProjectId,
};
use crate::store::ProjectStore;
use crate::table::TableImport;

/// What the pointer is doing between Down and Up (outside connection mode).
#[derive(Debug, Copy, Clone, PartialEq)]
enum PointerDrag {
    Idle,
    /// Dragging an entity; `origin` is where it sat before the drag.
    Entity { target: EntityRef, origin: Point },
    /// Pressed on empty canvas, not yet past the pan threshold.
    PendingPan { start: Point },
    Panning { last: Point },
}

/// A detached copy of an entity handed out for form editing.
#[derive(Debug, Clone, PartialEq)]
pub enum EditDraft {
    Node(EcNode),
    Milestone(Milestone),
}

impl EditDraft {
    pub fn target(&self) -> EntityRef {
        match self {
            EditDraft::Node(n) => EntityRef::Node(n.id),
            EditDraft::Milestone(m) => EntityRef::Milestone(m.id),
        }
    }
}

pub struct CanvasController {
    config: CanvasConfig,
    project: Project,
    store: Box<dyn ProjectStore>,
    snapper: GridSnapper,
    hit: HitTester,
    undo: UndoStack,
    gesture: ConnectionGesture,
    /// At most one entity is selected, node or milestone.
    selection: Option<EntityRef>,
    pan: Point,
    zoom_scale: f64,
    drag: PointerDrag,
    observers: Observers,
    autosave: AutoSave,
}

impl CanvasController {
    pub fn new(project: Project, store: Box<dyn ProjectStore>, config: CanvasConfig) -> Self {
        Self {
            snapper: GridSnapper::new(config.grid_size),
            hit: HitTester::new(config.hit_radius),
            undo: UndoStack::new(config.undo_capacity),
            autosave: AutoSave::new(Duration::from_millis(config.autosave_delay_ms)),
            config,
            project,
            store,
            gesture: ConnectionGesture::new(),
            selection: None,
            pan: Point::ZERO,
            zoom_scale: 1.0,
            drag: PointerDrag::Idle,
            observers: Observers::default(),
        }
    }

    /// Open the store's last-opened project, else its first, else a new one.
    pub fn open(store: Box<dyn ProjectStore>, config: CanvasConfig) -> Result<Self, StoreError> {
        let projects = store.load_all()?;
        let remembered = store
            .last_opened()
            .and_then(|id| projects.iter().find(|p| p.id == id))
            .or_else(|| projects.first())
            .cloned();

        let mut controller = Self::new(Project::default(), store, config);
        match remembered {
            Some(project) => controller.load_project(project),
            None => info!("no saved projects, starting a new one"),
        }
        Ok(controller)
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn cycle(&self) -> &Cycle {
        self.project.cycle()
    }

    pub fn selection(&self) -> Option<EntityRef> {
        self.selection
    }

    pub fn selected_node(&self) -> Option<NodeId> {
        match self.selection {
            Some(EntityRef::Node(id)) => Some(id),
            _ => None,
        }
    }

    pub fn selected_milestone(&self) -> Option<MilestoneId> {
        match self.selection {
            Some(EntityRef::Milestone(id)) => Some(id),
            _ => None,
        }
    }

    pub fn pan(&self) -> Point {
        self.pan
    }

    pub fn zoom_scale(&self) -> f64 {
        self.zoom_scale
    }

    pub fn gesture(&self) -> &ConnectionGesture {
        &self.gesture
    }

    pub fn undo_stack(&self) -> &UndoStack {
        &self.undo
    }

    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    /// Screen (view) space to canvas space.
    pub fn screen_to_canvas(&self, screen: Point) -> Point {
        screen - self.pan
    }

    /// Canvas position of one of a node's anchor circles.
    pub fn anchor_point(&self, node: NodeId, direction: AnchorDirection) -> Option<Point> {
        self.cycle()
            .node(node)
            .map(|n| n.position + direction.offset(self.config.anchor_offset))
    }

    fn exists(&self, target: EntityRef) -> bool {
        self.position_of(target).is_some()
    }

    fn position_of(&self, target: EntityRef) -> Option<Point> {
        match target {
            EntityRef::Node(id) => self.cycle().node(id).map(|n| n.position),
            EntityRef::Milestone(id) => self.cycle().milestone(id).map(|m| m.position),
        }
    }

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    pub fn subscribe(&mut self, callback: impl FnMut(ChangeKind) + 'static) -> SubscriptionId {
        self.observers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    fn changed(&mut self, kind: ChangeKind) {
        if kind.is_structural() {
            self.autosave.mark_dirty(Instant::now());
        }
        self.observers.notify(kind);
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    /// Add a blank node at `point` (not snapped) and select it.
    pub fn add_node_at(&mut self, point: Point) -> NodeId {
        let node = EcNode::new(self.cycle().nodes().len() as i64, point);
        let id = node.id;
        self.project.cycle_mut().add_node(node.clone());
        self.undo.push(UndoAction::AddNode(node));
        self.selection = Some(EntityRef::Node(id));
        debug!(node = %id, x = point.x, y = point.y, "added node");
        self.changed(ChangeKind::Graph);
        self.changed(ChangeKind::Selection);
        id
    }

    /// Add a blank milestone and select it. Without a point, milestones stack
    /// down from the configured origin by their index.
    pub fn add_milestone_at(&mut self, point: Option<Point>) -> MilestoneId {
        let index = self.cycle().milestones().len();
        let position = point.unwrap_or_else(|| self.config.default_milestone_position(index));
        let milestone = Milestone::new(index as i64, position);
        let id = milestone.id;
        self.project.cycle_mut().add_milestone(milestone.clone());
        self.undo.push(UndoAction::AddMilestone(milestone));
        self.selection = Some(EntityRef::Milestone(id));
        debug!(milestone = %id, x = position.x, y = position.y, "added milestone");
        self.changed(ChangeKind::Graph);
        self.changed(ChangeKind::Selection);
        id
    }

    // ------------------------------------------------------------------
    // Moves
    // ------------------------------------------------------------------

    /// Snap `raw` and write it. Returns true if the position changed.
    pub fn move_node_to(&mut self, id: NodeId, raw: Point) -> bool {
        let moved = self.apply_move(EntityRef::Node(id), raw);
        if moved {
            self.changed(ChangeKind::Graph);
        }
        moved
    }

    /// Snap `raw` and write it. Returns true if the position changed.
    pub fn move_milestone_to(&mut self, id: MilestoneId, raw: Point) -> bool {
        let moved = self.apply_move(EntityRef::Milestone(id), raw);
        if moved {
            self.changed(ChangeKind::Graph);
        }
        moved
    }

    fn apply_move(&mut self, target: EntityRef, raw: Point) -> bool {
        let snapped = self.snapper.snap(raw);
        match self.position_of(target) {
            Some(old) if old != snapped => {
                self.write_position(target, snapped);
                self.record_move(target, old, snapped);
                true
            }
            _ => false,
        }
    }

    /// Position write with no undo record.
    fn write_position(&mut self, target: EntityRef, position: Point) -> Option<Point> {
        let cycle = self.project.cycle_mut();
        match target {
            EntityRef::Node(id) => cycle.set_node_position(id, position),
            EntityRef::Milestone(id) => cycle.set_milestone_position(id, position),
        }
    }

    /// Write only if the position differs. True if something moved.
    fn place(&mut self, target: EntityRef, position: Point) -> bool {
        if self.position_of(target).is_none_or(|current| current == position) {
            return false;
        }
        self.write_position(target, position).is_some()
    }

    fn record_move(&mut self, target: EntityRef, old: Point, new: Point) {
        let action = match target {
            EntityRef::Node(id) => UndoAction::MoveNode { id, old, new },
            EntityRef::Milestone(id) => UndoAction::MoveMilestone { id, old, new },
        };
        self.undo.push(action);
    }

    // ------------------------------------------------------------------
    // Deletion and edits
    // ------------------------------------------------------------------

    /// Delete whichever entity is selected. Returns true if something was deleted.
    pub fn delete_selected(&mut self) -> bool {
        match self.selection {
            Some(EntityRef::Node(id)) => self.delete_node(id),
            Some(EntityRef::Milestone(id)) => self.delete_milestone(id),
            None => false,
        }
    }

    /// Delete a node and its connections.
    pub fn delete_node(&mut self, id: NodeId) -> bool {
        let Some(removed) = self.project.cycle_mut().remove_node(id) else {
            return false;
        };
        debug!(node = %id, cascaded = removed.connections.len(), "deleted node");
        self.undo.push(UndoAction::DeleteNode(removed));
        self.forget(EntityRef::Node(id));
        self.changed(ChangeKind::Graph);
        true
    }

    /// Delete a milestone. Linked nodes keep their milestone id.
    pub fn delete_milestone(&mut self, id: MilestoneId) -> bool {
        let Some(removed) = self.project.cycle_mut().remove_milestone(id) else {
            return false;
        };
        debug!(milestone = %id, "deleted milestone");
        self.undo.push(UndoAction::DeleteMilestone(removed));
        self.forget(EntityRef::Milestone(id));
        self.changed(ChangeKind::Graph);
        true
    }

    /// Connections are not undoable.
    pub fn delete_connection(&mut self, id: ConnectionId) -> bool {
        let removed = self.project.cycle_mut().remove_connection(id);
        if removed {
            debug!(connection = %id, "deleted connection");
            self.changed(ChangeKind::Graph);
        }
        removed
    }

    /// Drop selection, drag and gesture state that point at a removed entity.
    fn forget(&mut self, target: EntityRef) {
        if self.selection == Some(target) {
            self.selection = None;
            self.changed(ChangeKind::Selection);
        }
        if matches!(self.drag, PointerDrag::Entity { target: t, .. } if t == target) {
            self.drag = PointerDrag::Idle;
        }
        if let (EntityRef::Node(id), Some((from, _, _))) = (target, self.gesture.rubber_band()) {
            if from == id {
                self.gesture.cancel();
                self.changed(ChangeKind::View);
            }
        }
    }

    /// Replace a node's fields by id. Not undoable.
    pub fn update_node(&mut self, node: EcNode) -> bool {
        let updated = self.project.cycle_mut().update_node(node);
        if updated {
            self.changed(ChangeKind::Graph);
        }
        updated
    }

    /// Replace a milestone's fields by id. Not undoable.
    pub fn update_milestone(&mut self, milestone: Milestone) -> bool {
        let updated = self.project.cycle_mut().update_milestone(milestone);
        if updated {
            self.changed(ChangeKind::Graph);
        }
        updated
    }

    pub fn toggle_milestone_achieved(&mut self, id: MilestoneId) -> Option<bool> {
        let achieved = self.project.cycle_mut().toggle_milestone_achieved(id)?;
        self.changed(ChangeKind::Graph);
        Some(achieved)
    }

    pub fn renumber_nodes(&mut self) {
        self.project.cycle_mut().renumber_nodes();
        self.changed(ChangeKind::Graph);
    }

    // ------------------------------------------------------------------
    // Edit sessions
    // ------------------------------------------------------------------

    pub fn begin_edit(&self, target: EntityRef) -> Option<EditDraft> {
        match target {
            EntityRef::Node(id) => self.cycle().node(id).cloned().map(EditDraft::Node),
            EntityRef::Milestone(id) => self.cycle().milestone(id).cloned().map(EditDraft::Milestone),
        }
    }

    /// Write a draft back. The entity keeps its current canvas position, so a
    /// move made while the form was open survives. No-op if the entity is gone.
    pub fn commit_edit(&mut self, draft: EditDraft) -> bool {
        let Some(position) = self.position_of(draft.target()) else {
            debug!("edited entity no longer exists, discarding draft");
            return false;
        };
        match draft {
            EditDraft::Node(mut node) => {
                node.position = position;
                self.update_node(node)
            }
            EditDraft::Milestone(mut milestone) => {
                milestone.position = position;
                self.update_milestone(milestone)
            }
        }
    }

    // ------------------------------------------------------------------
    // Selection and view
    // ------------------------------------------------------------------

    /// Select whatever lies under the canvas point; empty space clears.
    pub fn select_at(&mut self, point: Point) -> Option<EntityRef> {
        let hit = self.hit.hit_test(self.cycle(), point);
        self.set_selection(hit);
        hit
    }

    pub fn select_node(&mut self, id: NodeId) -> bool {
        self.select_existing(EntityRef::Node(id))
    }

    pub fn select_milestone(&mut self, id: MilestoneId) -> bool {
        self.select_existing(EntityRef::Milestone(id))
    }

    fn select_existing(&mut self, target: EntityRef) -> bool {
        if !self.exists(target) {
            return false;
        }
        self.set_selection(Some(target));
        true
    }

    pub fn clear_selection(&mut self) {
        self.set_selection(None);
    }

    fn set_selection(&mut self, selection: Option<EntityRef>) {
        if self.selection != selection {
            self.selection = selection;
            self.changed(ChangeKind::Selection);
        }
    }

    /// Unbounded; the canvas has no edges.
    pub fn pan_by(&mut self, delta: Point) {
        self.pan = self.pan + delta;
        trace!(x = self.pan.x, y = self.pan.y, "pan");
        self.changed(ChangeKind::View);
    }

    pub fn reset_pan(&mut self) {
        self.pan = Point::ZERO;
        self.changed(ChangeKind::View);
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom_scale + self.config.zoom_step);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom_scale - self.config.zoom_step);
    }

    pub fn reset_zoom(&mut self) {
        self.set_zoom(1.0);
    }

    fn set_zoom(&mut self, scale: f64) {
        // Two decimals so repeated steps land exactly on the bounds.
        let scale = (scale * 100.0).round() / 100.0;
        self.zoom_scale = scale.clamp(self.config.zoom_min, self.config.zoom_max);
        self.changed(ChangeKind::View);
    }

    // ------------------------------------------------------------------
    // Undo and layout
    // ------------------------------------------------------------------

    /// Revert the most recent action. Returns false if there was none.
    pub fn undo(&mut self) -> bool {
        if !self.undo.can_undo() {
            return false;
        }
        // An entity mid-drag goes back to its origin before the pop.
        self.cancel_pointer();
        let Some(label) = self.undo.undo(self.project.cycle_mut()) else {
            return false;
        };
        debug!(action = label, remaining = self.undo.len(), "undo");
        if let Some(target) = self.selection {
            if !self.exists(target) {
                self.forget(target);
            }
        }
        self.changed(ChangeKind::Graph);
        true
    }

    /// Lay linked nodes out in rows beside their milestones. Not undoable;
    /// clears the undo stack.
    pub fn auto_layout(&mut self) {
        let placements = layout::milestone_rows(self.cycle(), &self.config);
        self.undo.suppress();
        let moved = placements
            .into_iter()
            .filter(|&(id, p)| self.apply_move(EntityRef::Node(id), p))
            .count();
        self.undo.resume();
        self.undo.clear();
        info!(moved, "auto layout");
        self.changed(ChangeKind::Graph);
    }

    // ------------------------------------------------------------------
    // Connection gesture
    // ------------------------------------------------------------------

    pub fn toggle_connection_mode(&mut self) -> bool {
        let on = self.gesture.toggle_mode();
        debug!(on, "connection mode");
        self.changed(ChangeKind::View);
        on
    }

    /// Start dragging a connection from one of a node's anchors.
    pub fn start_connection(&mut self, from: NodeId, direction: AnchorDirection) -> bool {
        if self.cycle().node(from).is_none() || !self.gesture.start_drag(from, direction) {
            return false;
        }
        self.changed(ChangeKind::View);
        true
    }

    pub fn update_connection_end_point(&mut self, point: Point) {
        if self.gesture.is_dragging() {
            self.gesture.pointer_move(point);
            self.changed(ChangeKind::View);
        }
    }

    /// Release the drag at a canvas point, committing a connection if a node
    /// other than the source lies under it.
    pub fn finish_connection(&mut self, point: Point) -> Option<ConnectionId> {
        if !self.gesture.is_dragging() {
            return None;
        }
        let request = self.gesture.release(point, self.project.cycle(), &self.hit);
        let Some(req) = request else {
            self.changed(ChangeKind::View);
            return None;
        };
        let id = self
            .project
            .cycle_mut()
            .add_connection(req.from, req.to, req.from_direction, req.to_direction);
        debug!(
            connection = %id,
            from = %req.from,
            to = %req.to,
            to_direction = req.to_direction.as_str(),
            "connected"
        );
        self.changed(ChangeKind::Graph);
        Some(id)
    }

    pub fn cancel_connection(&mut self) -> bool {
        let cancelled = self.gesture.cancel();
        if cancelled {
            self.changed(ChangeKind::View);
        }
        cancelled
    }

    // ------------------------------------------------------------------
    // Raw input
    // ------------------------------------------------------------------

    /// Dispatch a screen-space pointer event. Returns true if it did anything.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> bool {
        match event {
            PointerEvent::Down { at } => self.pointer_down(at),
            PointerEvent::Move { at } => self.pointer_move(at),
            PointerEvent::Up { at } => self.pointer_up(at),
            PointerEvent::DoubleClick { at } => {
                let point = self.screen_to_canvas(at);
                if self.gesture.is_mode_active() || self.hit.hit_test(self.cycle(), point).is_some() {
                    return false;
                }
                self.add_node_at(point);
                true
            }
            PointerEvent::Scroll { delta } => {
                self.pan_by(delta);
                true
            }
        }
    }

    fn pointer_down(&mut self, at: Point) -> bool {
        let point = self.screen_to_canvas(at);

        if self.gesture.is_dragging() {
            // Tapping empty canvas abandons the connection.
            return self.hit.hit_test(self.cycle(), point).is_none() && self.cancel_connection();
        }
        if self.gesture.is_mode_active() {
            let anchor = anchor_at(
                self.cycle(),
                point,
                self.config.anchor_offset,
                self.config.anchor_radius,
            );
            return match anchor {
                Some((node, direction)) => self.start_connection(node, direction),
                None => false,
            };
        }

        match self.hit.hit_test(self.cycle(), point) {
            Some(target) => {
                self.set_selection(Some(target));
                if let Some(origin) = self.position_of(target) {
                    self.drag = PointerDrag::Entity { target, origin };
                }
            }
            None => {
                self.set_selection(None);
                self.drag = PointerDrag::PendingPan { start: at };
            }
        }
        true
    }

    fn pointer_move(&mut self, at: Point) -> bool {
        if self.gesture.is_dragging() {
            self.update_connection_end_point(self.screen_to_canvas(at));
            return true;
        }
        match self.drag {
            PointerDrag::Idle => false,
            PointerDrag::Entity { target, .. } => {
                // Live feedback only; the undo record is written on release.
                let snapped = self.snapper.snap(self.screen_to_canvas(at));
                if self.place(target, snapped) {
                    trace!(x = snapped.x, y = snapped.y, "drag");
                    self.changed(ChangeKind::Graph);
                }
                true
            }
            PointerDrag::PendingPan { start } => {
                if start.distance(at) > self.config.pan_threshold {
                    self.drag = PointerDrag::Panning { last: at };
                    self.pan_by(at - start);
                }
                true
            }
            PointerDrag::Panning { last } => {
                self.drag = PointerDrag::Panning { last: at };
                self.pan_by(at - last);
                true
            }
        }
    }

    fn pointer_up(&mut self, at: Point) -> bool {
        if self.gesture.is_dragging() {
            self.finish_connection(self.screen_to_canvas(at));
            return true;
        }
        match std::mem::replace(&mut self.drag, PointerDrag::Idle) {
            PointerDrag::Idle => false,
            PointerDrag::Entity { target, origin } => {
                let snapped = self.snapper.snap(self.screen_to_canvas(at));
                self.place(target, snapped);
                if snapped != origin && self.exists(target) {
                    self.record_move(target, origin, snapped);
                    debug!(x = snapped.x, y = snapped.y, "drag finished");
                    self.changed(ChangeKind::Graph);
                }
                true
            }
            PointerDrag::PendingPan { .. } => true,
            PointerDrag::Panning { .. } => true,
        }
    }

    /// Abort whatever the pointer was doing. A dragged entity goes back to
    /// where it started. Returns true if anything was in flight.
    pub fn cancel_pointer(&mut self) -> bool {
        let connection = self.cancel_connection();
        match std::mem::replace(&mut self.drag, PointerDrag::Idle) {
            PointerDrag::Entity { target, origin } => {
                if self.place(target, origin) {
                    self.changed(ChangeKind::Graph);
                }
                true
            }
            PointerDrag::PendingPan { .. } | PointerDrag::Panning { .. } => true,
            PointerDrag::Idle => connection,
        }
    }

    pub fn handle_key(&mut self, key: KeyCommand) -> KeyOutcome {
        match key {
            // Deleting is confirmed by the UI before it calls delete_selected.
            KeyCommand::Delete => match self.selection {
                Some(target) => KeyOutcome::ConfirmDelete(target),
                None => KeyOutcome::Ignored,
            },
            KeyCommand::Undo => {
                if self.undo() { KeyOutcome::Handled } else { KeyOutcome::Ignored }
            }
            KeyCommand::ZoomIn => {
                self.zoom_in();
                KeyOutcome::Handled
            }
            KeyCommand::ZoomOut => {
                self.zoom_out();
                KeyOutcome::Handled
            }
            KeyCommand::ResetZoom => {
                self.reset_zoom();
                KeyOutcome::Handled
            }
            KeyCommand::Escape => {
                if self.cancel_pointer() { KeyOutcome::Handled } else { KeyOutcome::Ignored }
            }
            KeyCommand::ToggleConnectionMode => {
                self.toggle_connection_mode();
                KeyOutcome::Handled
            }
        }
    }

    // ------------------------------------------------------------------
    // Projects and bulk resets
    // ------------------------------------------------------------------

    /// Install a project wholesale, discarding undo history, then lay it out.
    pub fn load_project(&mut self, project: Project) {
        info!(project = %project.id, name = %project.name, "loading project");
        self.project = project;
        self.reset_interaction();
        self.auto_layout();
        self.changed(ChangeKind::Reset);
    }

    /// Load a project from the store by id. Returns false if the store has no
    /// such project.
    pub fn load_project_by_id(&mut self, id: ProjectId) -> Result<bool, StoreError> {
        let found = self.store.load_all()?.into_iter().find(|p| p.id == id);
        match found {
            Some(project) => {
                self.load_project(project);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn new_project(&mut self, name: impl Into<String>) -> ProjectId {
        let project = Project::new(name);
        let id = project.id;
        self.load_project(project);
        id
    }

    pub fn rename_project(&mut self, name: impl Into<String>) {
        self.project.name = name.into();
        self.project.modified_at = chrono::Utc::now();
        self.changed(ChangeKind::Graph);
    }

    /// A copy of the whole project for the host to persist.
    pub fn project_snapshot(&self) -> Project {
        self.project.clone()
    }

    /// Upsert the current project and remember it as last opened.
    pub fn save_current_project(&mut self) -> Result<(), StoreError> {
        self.store.quick_save(&self.project)?;
        self.autosave.clear();
        info!(project = %self.project.id, "saved project");
        Ok(())
    }

    /// Save if the debounce delay has passed since the last structural change.
    /// Returns true if a save happened.
    pub fn poll_autosave(&mut self, now: Instant) -> Result<bool, StoreError> {
        if !self.autosave.poll(now) {
            return Ok(false);
        }
        if let Err(e) = self.save_current_project() {
            // Keep the change pending so the next poll retries.
            self.autosave.mark_dirty(now);
            return Err(e);
        }
        Ok(true)
    }

    pub fn list_projects(&self) -> Result<Vec<Project>, StoreError> {
        self.store.load_all()
    }

    /// Delete a stored project. Deleting the open project switches to a new one.
    pub fn delete_project(&mut self, id: ProjectId) -> Result<bool, StoreError> {
        let deleted = self.store.delete(id)?;
        if id == self.project.id {
            self.new_project("New Challenge");
            // Nothing to save until the user edits it.
            self.autosave.clear();
        }
        Ok(deleted)
    }

    /// Replace the graph with imported records and save.
    pub fn import_table(&mut self, import: TableImport) -> Result<(), StoreError> {
        for warning in &import.warnings {
            warn!(%warning, "table import");
        }
        info!(
            milestones = import.milestones.len(),
            nodes = import.nodes.len(),
            "importing table"
        );
        self.project
            .cycle_mut()
            .replace_contents(import.milestones, import.nodes);
        self.reset_interaction();
        self.auto_layout();
        self.changed(ChangeKind::Reset);
        self.save_current_project()
    }

    /// Replace the graph with the demo curriculum.
    pub fn populate_demo_data(&mut self) {
        let (milestones, nodes) = demo_curriculum(&self.config);
        self.project.cycle_mut().replace_contents(milestones, nodes);
        self.reset_interaction();
        self.auto_layout();
        info!("populated demo data");
        self.changed(ChangeKind::Reset);
    }

    fn reset_interaction(&mut self) {
        self.undo.clear();
        self.selection = None;
        self.drag = PointerDrag::Idle;
        self.gesture.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn controller() -> CanvasController {
        CanvasController::new(
            Project::new("Test"),
            Box::new(MemoryStore::new()),
            CanvasConfig::default(),
        )
    }

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn test_add_node_selects_and_undo_removes() {
        let mut c = controller();
        let id = c.add_node_at(p(13.0, 27.0));

        let node = c.cycle().node(id).unwrap();
        assert_eq!(node.position, p(13.0, 27.0));
        assert_eq!(node.sequence_number, 0);
        assert_eq!(c.selected_node(), Some(id));

        assert!(c.undo());
        assert!(c.cycle().nodes().is_empty());
        assert_eq!(c.selection(), None);
        assert!(!c.undo());
    }

    #[test]
    fn test_milestone_default_positions_and_soft_delete() {
        let mut c = controller();
        let first = c.add_milestone_at(None);
        let second = c.add_milestone_at(None);
        assert_eq!(c.cycle().milestone(first).unwrap().position, p(200.0, 200.0));
        assert_eq!(c.cycle().milestone(second).unwrap().position, p(200.0, 500.0));

        let node_id = c.add_node_at(p(50.0, 50.0));
        assert_eq!(c.cycle().node(node_id).unwrap().sequence_number, 0);

        let mut node = c.cycle().node(node_id).unwrap().clone();
        node.milestone_id = Some(first);
        assert!(c.update_node(node));

        assert!(c.delete_milestone(first));
        assert_eq!(c.cycle().milestones().len(), 1);
        let node = c.cycle().node(node_id).unwrap();
        assert_eq!(node.milestone_id, Some(first));
        assert!(c.cycle().milestone_of(node).is_none());
    }

    #[test]
    fn test_undo_capacity_evicts_oldest() {
        let mut c = controller();
        for i in 0..51 {
            c.add_node_at(p(i as f64 * 10.0, 0.0));
        }
        for _ in 0..50 {
            assert!(c.undo());
        }
        assert!(!c.undo());
        assert_eq!(c.cycle().nodes().len(), 1);
        assert_eq!(c.cycle().nodes()[0].position, p(0.0, 0.0));
    }

    #[test]
    fn test_move_snaps_and_skips_noop() {
        let mut c = controller();
        let id = c.add_node_at(p(0.0, 0.0));
        let before = c.undo_stack().len();

        assert!(c.move_node_to(id, p(13.0, 21.0)));
        assert_eq!(c.cycle().node(id).unwrap().position, p(16.0, 24.0));
        assert_eq!(c.undo_stack().len(), before + 1);

        // Same grid cell: nothing recorded.
        assert!(!c.move_node_to(id, p(17.0, 23.0)));
        assert_eq!(c.undo_stack().len(), before + 1);

        assert!(c.undo());
        assert_eq!(c.cycle().node(id).unwrap().position, p(0.0, 0.0));
    }

    #[test]
    fn test_move_missing_entity_is_noop() {
        let mut c = controller();
        assert!(!c.move_node_to(NodeId::new(), p(8.0, 8.0)));
        assert!(!c.move_milestone_to(MilestoneId::new(), p(8.0, 8.0)));
        assert!(!c.delete_node(NodeId::new()));
        assert!(!c.can_undo());
    }

    #[test]
    fn test_selection_is_exclusive() {
        let mut c = controller();
        let node = c.add_node_at(p(0.0, 0.0));
        let milestone = c.add_milestone_at(Some(p(400.0, 0.0)));
        assert_eq!(c.selected_node(), None);
        assert_eq!(c.selected_milestone(), Some(milestone));

        assert_eq!(c.select_at(p(5.0, 5.0)), Some(EntityRef::Node(node)));
        assert_eq!(c.selected_milestone(), None);

        assert!(c.select_milestone(milestone));
        assert_eq!(c.selected_node(), None);

        assert_eq!(c.select_at(p(1000.0, 1000.0)), None);
        assert_eq!(c.selection(), None);
    }

    #[test]
    fn test_delete_selected_and_undo_restores_connections() {
        let mut c = controller();
        let a = c.add_node_at(p(0.0, 0.0));
        let b = c.add_node_at(p(300.0, 0.0));
        c.toggle_connection_mode();
        assert!(c.start_connection(a, AnchorDirection::Right));
        let conn = c.finish_connection(p(270.0, 0.0)).unwrap();

        c.toggle_connection_mode();
        c.select_node(a);
        assert!(c.delete_selected());
        assert_eq!(c.selection(), None);
        assert!(c.cycle().connections().is_empty());

        assert!(c.undo());
        assert_eq!(c.cycle().nodes()[0].id, a);
        assert_eq!(c.cycle().connection(conn).map(|x| (x.from_node_id, x.to_node_id)), Some((a, b)));
    }

    #[test]
    fn test_connection_release_left_of_target() {
        let mut c = controller();
        let a = c.add_node_at(p(0.0, 0.0));
        let b = c.add_node_at(p(300.0, 0.0));

        assert!(!c.start_connection(a, AnchorDirection::Right));
        c.toggle_connection_mode();
        assert!(c.start_connection(a, AnchorDirection::Right));
        c.update_connection_end_point(p(200.0, 5.0));

        let id = c.finish_connection(p(265.0, 10.0)).unwrap();
        let conn = c.cycle().connection(id).unwrap();
        assert_eq!(conn.from_node_id, a);
        assert_eq!(conn.to_node_id, b);
        assert_eq!(conn.to_direction, AnchorDirection::Left);
        assert_eq!(c.gesture().state(), GestureState::ModeActive);

        assert!(c.delete_connection(id));
        assert!(c.cycle().connections().is_empty());
        assert_eq!(c.select_at(p(300.0, 0.0)), Some(EntityRef::Node(b)));
    }

    #[test]
    fn test_connection_to_self_or_nothing() {
        let mut c = controller();
        let a = c.add_node_at(p(0.0, 0.0));
        c.toggle_connection_mode();

        c.start_connection(a, AnchorDirection::Top);
        assert_eq!(c.finish_connection(p(0.0, 0.0)), None);
        c.start_connection(a, AnchorDirection::Top);
        assert_eq!(c.finish_connection(p(900.0, 900.0)), None);
        assert!(c.cycle().connections().is_empty());
        assert_eq!(c.gesture().state(), GestureState::ModeActive);
    }

    #[test]
    fn test_bulk_resets_clear_undo() {
        let mut c = controller();
        let m = c.add_milestone_at(None);
        let n = c.add_node_at(p(0.0, 0.0));
        let mut node = c.cycle().node(n).unwrap().clone();
        node.milestone_id = Some(m);
        c.update_node(node);

        assert!(c.can_undo());
        c.auto_layout();
        assert!(!c.can_undo());
        assert!(!c.undo());
        assert_eq!(c.cycle().node(n).unwrap().position, p(552.0, 200.0));

        c.add_node_at(p(0.0, 0.0));
        c.load_project(Project::new("Other"));
        assert!(!c.undo());
        assert!(c.cycle().is_empty());

        c.add_node_at(p(0.0, 0.0));
        let import = TableImport {
            milestones: vec![Milestone::new(0, p(200.0, 200.0))],
            nodes: vec![EcNode::new(0, p(0.0, 0.0))],
            warnings: Vec::new(),
        };
        c.import_table(import).unwrap();
        assert!(!c.undo());
        assert_eq!(c.cycle().nodes().len(), 1);
        assert_eq!(c.list_projects().unwrap().len(), 1);
    }

    #[test]
    fn test_pointer_drag_records_single_move() {
        let mut c = controller();
        let id = c.add_node_at(p(100.0, 100.0));
        c.clear_selection();
        let before = c.undo_stack().len();

        assert!(c.handle_pointer(PointerEvent::Down { at: p(110.0, 95.0) }));
        assert_eq!(c.selected_node(), Some(id));
        c.handle_pointer(PointerEvent::Move { at: p(150.0, 130.0) });
        assert_eq!(c.cycle().node(id).unwrap().position, p(152.0, 128.0));
        c.handle_pointer(PointerEvent::Move { at: p(201.0, 161.0) });
        c.handle_pointer(PointerEvent::Up { at: p(201.0, 161.0) });

        assert_eq!(c.cycle().node(id).unwrap().position, p(200.0, 160.0));
        assert_eq!(c.undo_stack().len(), before + 1);
        assert_eq!(
            c.undo_stack().peek(),
            Some(&UndoAction::MoveNode { id, old: p(100.0, 100.0), new: p(200.0, 160.0) })
        );

        c.undo();
        assert_eq!(c.cycle().node(id).unwrap().position, p(100.0, 100.0));
    }

    #[test]
    fn test_pointer_click_without_move_records_nothing() {
        let mut c = controller();
        c.add_node_at(p(96.0, 96.0));
        let before = c.undo_stack().len();
        c.handle_pointer(PointerEvent::Down { at: p(97.0, 97.0) });
        c.handle_pointer(PointerEvent::Up { at: p(97.0, 97.0) });
        assert_eq!(c.undo_stack().len(), before);
    }

    #[test]
    fn test_pan_starts_after_threshold() {
        let mut c = controller();
        c.handle_pointer(PointerEvent::Down { at: p(500.0, 500.0) });
        c.handle_pointer(PointerEvent::Move { at: p(503.0, 502.0) });
        assert_eq!(c.pan(), Point::ZERO);

        c.handle_pointer(PointerEvent::Move { at: p(510.0, 500.0) });
        assert_eq!(c.pan(), p(10.0, 0.0));
        c.handle_pointer(PointerEvent::Move { at: p(520.0, 480.0) });
        c.handle_pointer(PointerEvent::Up { at: p(520.0, 480.0) });
        assert_eq!(c.pan(), p(20.0, -20.0));

        // Panned view: screen (20, -20) is canvas origin.
        assert_eq!(c.screen_to_canvas(p(20.0, -20.0)), Point::ZERO);
        c.handle_pointer(PointerEvent::Scroll { delta: p(-20.0, 20.0) });
        assert_eq!(c.pan(), Point::ZERO);
    }

    #[test]
    fn test_cancel_pointer_restores_dragged_entity() {
        let mut c = controller();
        let m = c.add_milestone_at(None);
        let before = c.undo_stack().len();

        c.handle_pointer(PointerEvent::Down { at: p(200.0, 200.0) });
        c.handle_pointer(PointerEvent::Move { at: p(400.0, 400.0) });
        assert_eq!(c.cycle().milestone(m).unwrap().position, p(400.0, 400.0));

        assert!(c.cancel_pointer());
        assert_eq!(c.cycle().milestone(m).unwrap().position, p(200.0, 200.0));
        assert_eq!(c.undo_stack().len(), before);
        assert!(!c.handle_pointer(PointerEvent::Up { at: p(400.0, 400.0) }));
    }

    #[test]
    fn test_undo_mid_drag_returns_entity_to_origin() {
        let mut c = controller();
        let a = c.add_node_at(p(0.0, 0.0));
        let b = c.add_node_at(p(400.0, 0.0));

        c.handle_pointer(PointerEvent::Down { at: p(0.0, 0.0) });
        c.handle_pointer(PointerEvent::Move { at: p(200.0, 200.0) });
        assert_eq!(c.cycle().node(a).unwrap().position, p(200.0, 200.0));

        assert!(c.undo());
        assert_eq!(c.cycle().node(a).unwrap().position, p(0.0, 0.0));
        assert!(c.cycle().node(b).is_none());

        // The drag is over; releasing does not record a move.
        assert!(!c.handle_pointer(PointerEvent::Up { at: p(200.0, 200.0) }));
        assert_eq!(c.cycle().node(a).unwrap().position, p(0.0, 0.0));
        assert!(c.undo());
        assert!(c.cycle().nodes().is_empty());
        assert!(!c.can_undo());
    }

    #[test]
    fn test_click_does_not_touch_modified_date() {
        let mut c = controller();
        c.add_node_at(p(96.0, 96.0));
        let modified = c.project().modified_at;
        let cycle_modified = c.cycle().modified_at;

        c.handle_pointer(PointerEvent::Down { at: p(97.0, 97.0) });
        c.handle_pointer(PointerEvent::Move { at: p(98.0, 98.0) });
        c.handle_pointer(PointerEvent::Up { at: p(97.0, 97.0) });
        assert_eq!(c.project().modified_at, modified);
        assert_eq!(c.cycle().modified_at, cycle_modified);

        c.handle_pointer(PointerEvent::Down { at: p(97.0, 97.0) });
        assert!(c.cancel_pointer());
        assert_eq!(c.project().modified_at, modified);
    }

    #[test]
    fn test_delete_milestone_undo_restores_index() {
        let mut c = controller();
        for _ in 0..3 {
            c.add_milestone_at(None);
        }
        let order: Vec<MilestoneId> = c.cycle().milestones().iter().map(|m| m.id).collect();

        assert!(c.delete_milestone(order[1]));
        assert_eq!(c.cycle().milestones().len(), 2);
        assert!(c.undo());
        let restored: Vec<MilestoneId> = c.cycle().milestones().iter().map(|m| m.id).collect();
        assert_eq!(restored, order);
        assert_eq!(c.cycle().milestone(order[1]).unwrap().position, p(200.0, 500.0));

        let added = c.add_milestone_at(Some(p(40.0, 40.0)));
        assert!(c.undo());
        assert!(c.cycle().milestone(added).is_none());
        let remaining: Vec<MilestoneId> = c.cycle().milestones().iter().map(|m| m.id).collect();
        assert_eq!(remaining, order);
    }

    #[test]
    fn test_pointer_connection_gesture() {
        let mut c = controller();
        let a = c.add_node_at(p(0.0, 0.0));
        let b = c.add_node_at(p(0.0, 300.0));
        c.handle_key(KeyCommand::ToggleConnectionMode);

        // Bottom anchor of A sits 50 below its center.
        assert!(c.handle_pointer(PointerEvent::Down { at: p(2.0, 48.0) }));
        c.handle_pointer(PointerEvent::Move { at: p(0.0, 200.0) });
        assert_eq!(
            c.gesture().rubber_band(),
            Some((a, AnchorDirection::Bottom, Some(p(0.0, 200.0))))
        );
        c.handle_pointer(PointerEvent::Up { at: p(5.0, 270.0) });

        let conn = &c.cycle().connections()[0];
        assert_eq!((conn.from_node_id, conn.to_node_id), (a, b));
        assert_eq!(conn.to_direction, AnchorDirection::Top);
    }

    #[test]
    fn test_pointer_down_on_empty_canvas_cancels_connection_drag() {
        let mut c = controller();
        let a = c.add_node_at(p(0.0, 0.0));
        c.toggle_connection_mode();
        c.start_connection(a, AnchorDirection::Left);
        assert!(c.handle_pointer(PointerEvent::Down { at: p(800.0, 800.0) }));
        assert_eq!(c.gesture().state(), GestureState::ModeActive);
    }

    #[test]
    fn test_double_click_adds_node_on_empty_canvas() {
        let mut c = controller();
        assert!(c.handle_pointer(PointerEvent::DoubleClick { at: p(40.0, 40.0) }));
        assert_eq!(c.cycle().nodes().len(), 1);
        assert!(!c.handle_pointer(PointerEvent::DoubleClick { at: p(45.0, 45.0) }));
        assert_eq!(c.cycle().nodes().len(), 1);
    }

    #[test]
    fn test_delete_key_asks_for_confirmation() {
        let mut c = controller();
        assert_eq!(c.handle_key(KeyCommand::Delete), KeyOutcome::Ignored);
        let id = c.add_node_at(p(0.0, 0.0));
        assert_eq!(c.handle_key(KeyCommand::Delete), KeyOutcome::ConfirmDelete(EntityRef::Node(id)));
        assert_eq!(c.cycle().nodes().len(), 1);
        assert_eq!(c.handle_key(KeyCommand::Undo), KeyOutcome::Handled);
        assert_eq!(c.handle_key(KeyCommand::Undo), KeyOutcome::Ignored);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut c = controller();
        for _ in 0..30 {
            c.zoom_in();
        }
        assert_eq!(c.zoom_scale(), 3.0);
        for _ in 0..30 {
            c.handle_key(KeyCommand::ZoomOut);
        }
        assert_eq!(c.zoom_scale(), 0.5);
        c.reset_zoom();
        c.zoom_in();
        assert_eq!(c.zoom_scale(), 1.1);
    }

    #[test]
    fn test_observers_see_changes() {
        let mut c = controller();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let sub = c.subscribe(move |k| sink.borrow_mut().push(k));

        c.add_node_at(p(0.0, 0.0));
        c.pan_by(p(1.0, 1.0));
        assert!(c.unsubscribe(sub));
        c.zoom_in();

        assert_eq!(
            *seen.borrow(),
            vec![ChangeKind::Graph, ChangeKind::Selection, ChangeKind::View]
        );
    }

    #[test]
    fn test_autosave_after_quiet_period() {
        let mut c = controller();
        assert!(!c.poll_autosave(Instant::now() + Duration::from_secs(10)).unwrap());

        c.add_node_at(p(0.0, 0.0));
        assert!(!c.poll_autosave(Instant::now()).unwrap());
        assert!(c.poll_autosave(Instant::now() + Duration::from_secs(3)).unwrap());

        let saved = c.list_projects().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].cycle().nodes().len(), 1);
        assert!(!c.poll_autosave(Instant::now() + Duration::from_secs(10)).unwrap());
    }

    struct FailingStore;

    impl ProjectStore for FailingStore {
        fn load_all(&self) -> Result<Vec<Project>, StoreError> {
            Ok(Vec::new())
        }

        fn save_all(&mut self, _projects: &[Project]) -> Result<(), StoreError> {
            Err(StoreError::Write { path: "projects.json".into(), source: std::io::Error::other("disk full") })
        }

        fn last_opened(&self) -> Option<ProjectId> {
            None
        }

        fn set_last_opened(&mut self, _id: ProjectId) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[test]
    fn test_autosave_retries_after_failed_save() {
        let mut c = CanvasController::new(Project::new("Test"), Box::new(FailingStore), CanvasConfig::default());
        let t0 = Instant::now();
        c.add_node_at(p(0.0, 0.0));

        assert!(c.poll_autosave(t0 + Duration::from_secs(3)).is_err());
        // Still pending: not due again until another quiet period passes.
        assert!(!c.poll_autosave(t0 + Duration::from_secs(4)).unwrap());
        assert!(c.poll_autosave(t0 + Duration::from_secs(6)).is_err());
    }

    #[test]
    fn test_open_prefers_last_opened() {
        let mut store = MemoryStore::with_projects(vec![Project::new("A"), Project::new("B")]);
        let b_id = store.load_all().unwrap()[1].id;
        store.set_last_opened(b_id).unwrap();

        let c = CanvasController::open(Box::new(store), CanvasConfig::default()).unwrap();
        assert_eq!(c.project().id, b_id);

        let c = CanvasController::open(Box::new(MemoryStore::new()), CanvasConfig::default()).unwrap();
        assert_eq!(c.project().name, "New Challenge");
    }

    #[test]
    fn test_project_lifecycle() {
        let mut c = controller();
        c.add_node_at(p(0.0, 0.0));
        c.rename_project("Renamed");
        c.save_current_project().unwrap();
        let first = c.project().id;

        let second = c.new_project("Second");
        assert!(c.cycle().is_empty());
        c.save_current_project().unwrap();
        assert_eq!(c.list_projects().unwrap().len(), 2);

        assert!(c.load_project_by_id(first).unwrap());
        assert_eq!(c.project().name, "Renamed");
        assert_eq!(c.project_snapshot().cycle().nodes().len(), 1);

        assert!(c.delete_project(first).unwrap());
        assert_ne!(c.project().id, first);
        let left: Vec<ProjectId> = c.list_projects().unwrap().iter().map(|p| p.id).collect();
        assert_eq!(left, vec![second]);
        assert!(!c.load_project_by_id(first).unwrap());
    }

    #[test]
    fn test_edit_session_keeps_current_position() {
        let mut c = controller();
        let id = c.add_node_at(p(0.0, 0.0));
        let Some(EditDraft::Node(mut draft)) = c.begin_edit(EntityRef::Node(id)) else {
            panic!("expected a node draft");
        };
        draft.learning_objective = "Sketch a prototype".to_string();

        c.move_node_to(id, p(80.0, 80.0));
        assert!(c.commit_edit(EditDraft::Node(draft.clone())));
        let node = c.cycle().node(id).unwrap();
        assert_eq!(node.learning_objective, "Sketch a prototype");
        assert_eq!(node.position, p(80.0, 80.0));

        c.delete_node(id);
        assert!(!c.commit_edit(EditDraft::Node(draft)));
        assert!(c.begin_edit(EntityRef::Node(id)).is_none());
    }

    #[test]
    fn test_demo_data_is_laid_out_and_not_undoable() {
        let mut c = controller();
        c.add_node_at(p(0.0, 0.0));
        c.populate_demo_data();
        assert_eq!(c.cycle().milestones().len(), 10);
        assert_eq!(c.cycle().nodes().len(), 15);
        assert!(!c.can_undo());

        let first = c.cycle().ordered_milestones()[0].id;
        let row: Vec<Point> = c.cycle().linked_nodes(first).iter().map(|n| n.position).collect();
        assert_eq!(row, vec![p(552.0, 200.0), p(768.0, 200.0)]);
    }

    #[test]
    fn test_toggle_achieved_and_anchor_point() {
        let mut c = controller();
        let m = c.add_milestone_at(None);
        assert_eq!(c.toggle_milestone_achieved(m), Some(true));
        assert_eq!(c.toggle_milestone_achieved(MilestoneId::new()), None);

        let n = c.add_node_at(p(100.0, 100.0));
        assert_eq!(c.anchor_point(n, AnchorDirection::Left), Some(p(50.0, 100.0)));
        assert_eq!(c.anchor_point(NodeId::new(), AnchorDirection::Left), None);
    }
}
