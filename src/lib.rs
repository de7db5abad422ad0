//! Persistence and resolution core of an image/video annotation server.
//!
//! A labeling session is stored as an append-only series of versions per
//! (project, task, worker). The crate resolves the current version,
//! bootstraps the first one from a task assignment, and flattens the latest
//! versions of a project into an export.

pub mod assignment;
pub mod configuration;
pub mod controller;
pub mod error_handling;
pub mod export;
pub mod session_management;
pub mod session_state;
pub mod storage;
pub mod web_interface;

pub use controller::Controller;
pub use session_management::SubmissionResolver;
pub use session_state::Session;
