//! Domain model for tasks, their ancestry, assignment, and sharing.
//!
//! The task domain keeps every infrastructure concern outside its boundary:
//! identities come from the directory context, persistence goes through the
//! ports in [`crate::task::ports`].

mod actor;
mod assignee;
mod error;
mod ids;
mod path;
mod task;
mod viewer;
mod workflow;

pub use actor::{Actor, ActorId, ActorRole};
pub use assignee::{Assignee, AssigneeFields, AssigneeType};
pub use error::{ParseKindError, ParseTaskPathError, ParseWorkflowStateTypeError, TaskDomainError};
pub use ids::{TaskId, WorkflowStateId};
pub use path::{PATH_SEPARATOR, TaskPath};
pub use task::{NewTask, PersistedTaskData, Task};
pub use viewer::ViewerGrant;
pub use workflow::{WorkflowState, WorkflowStateType};
