//! Project persistence.
//!
//! The controller is handed a `ProjectStore` at construction and never reaches
//! for global state. `JsonFileStore` keeps every project in one JSON array on
//! disk, with the last-opened project id in a sidecar file; `MemoryStore`
//! backs tests and the wasm host (which persists snapshots itself).

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::StoreError;
use crate::model::{Project, ProjectId};

pub trait ProjectStore {
    fn load_all(&self) -> Result<Vec<Project>, StoreError>;
    fn save_all(&mut self, projects: &[Project]) -> Result<(), StoreError>;
    fn last_opened(&self) -> Option<ProjectId>;
    fn set_last_opened(&mut self, id: ProjectId) -> Result<(), StoreError>;

    /// Insert or replace one project by id and remember it as last opened.
    fn quick_save(&mut self, project: &Project) -> Result<(), StoreError> {
        let mut projects = self.load_all()?;
        match projects.iter_mut().find(|p| p.id == project.id) {
            Some(slot) => *slot = project.clone(),
            None => projects.push(project.clone()),
        }
        self.save_all(&projects)?;
        self.set_last_opened(project.id)
    }

    /// Returns true if a project was removed.
    fn delete(&mut self, id: ProjectId) -> Result<bool, StoreError> {
        let mut projects = self.load_all()?;
        let before = projects.len();
        projects.retain(|p| p.id != id);
        if projects.len() == before {
            return Ok(false);
        }
        self.save_all(&projects)?;
        Ok(true)
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    projects: Vec<Project>,
    last_opened: Option<ProjectId>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_projects(projects: Vec<Project>) -> Self {
        Self { projects, last_opened: None }
    }
}

impl ProjectStore for MemoryStore {
    fn load_all(&self) -> Result<Vec<Project>, StoreError> {
        Ok(self.projects.clone())
    }

    fn save_all(&mut self, projects: &[Project]) -> Result<(), StoreError> {
        self.projects = projects.to_vec();
        Ok(())
    }

    fn last_opened(&self) -> Option<ProjectId> {
        self.last_opened
    }

    fn set_last_opened(&mut self, id: ProjectId) -> Result<(), StoreError> {
        self.last_opened = Some(id);
        Ok(())
    }
}

pub const PROJECTS_FILE: &str = "ecDesignerProjects.json";
pub const LAST_OPENED_FILE: &str = "ecDesignerLastOpened";

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    projects_path: PathBuf,
    last_opened_path: PathBuf,
}

impl JsonFileStore {
    /// Store files inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            projects_path: dir.join(PROJECTS_FILE),
            last_opened_path: dir.join(LAST_OPENED_FILE),
        }
    }

    pub fn projects_path(&self) -> &Path {
        &self.projects_path
    }
}

impl ProjectStore for JsonFileStore {
    /// A missing file is an empty store (first run).
    fn load_all(&self) -> Result<Vec<Project>, StoreError> {
        let data = match fs::read_to_string(&self.projects_path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Read { path: self.projects_path.clone(), source });
            }
        };
        let projects: Vec<Project> = serde_json::from_str(&data)?;
        info!(count = projects.len(), path = %self.projects_path.display(), "loaded projects");
        Ok(projects)
    }

    fn save_all(&mut self, projects: &[Project]) -> Result<(), StoreError> {
        let data = serde_json::to_string_pretty(projects)?;
        if let Some(parent) = self.projects_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| StoreError::Write { path: parent.to_path_buf(), source })?;
        }
        write_atomic(&self.projects_path, data.as_bytes())?;
        info!(count = projects.len(), "saved projects");
        Ok(())
    }

    fn last_opened(&self) -> Option<ProjectId> {
        let raw = fs::read_to_string(&self.last_opened_path).ok()?;
        match raw.trim().parse() {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, "ignoring malformed last-opened project id");
                None
            }
        }
    }

    fn set_last_opened(&mut self, id: ProjectId) -> Result<(), StoreError> {
        write_atomic(&self.last_opened_path, id.to_string().as_bytes())
    }
}

/// Write to a sibling temp file, then rename over `path`. A crash mid-write
/// leaves the previous file intact.
fn write_atomic(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, data).map_err(|source| StoreError::Write { path: tmp.clone(), source })?;
    fs::rename(&tmp, path).map_err(|source| StoreError::Write { path: path.to_path_buf(), source })
}
