//! Application services for task paths, assignment, and lifecycle.

mod assignment;
mod error;
mod lifecycle;
mod path;

pub use assignment::AssignmentResolver;
pub use error::{NotFoundTarget, TaskServiceError, TaskServiceResult};
pub use lifecycle::{CreateTaskRequest, TaskMutation, TaskService, UpdateTaskRequest};
pub use path::PathManager;
