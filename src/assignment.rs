//! Task assignments and the bootstrap of a first session from one.
//!
//! Assignments, tasks and projects are written by project management; this
//! crate reads them, and creates an assignment only when the labeling page is
//! opened for a pair that has none.

pub mod assignment_store;
pub mod bootstrap;
pub mod types;

pub use assignment_store::AssignmentStore;
pub use bootstrap::assignment_to_session;
pub use types::{decode_record, Assignment, Category, Project, ProjectOptions, Task, TaskItem};
