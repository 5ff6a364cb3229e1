mod types;
mod entities;
mod cycle;

pub use types::*;
pub use entities::{Connection, EcNode, Milestone};
pub use cycle::{Cycle, Project, RemovedMilestone, RemovedNode};
