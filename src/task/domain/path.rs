//! Materialized ancestry paths.
//!
//! A path lists every ancestor of a task, oldest first, followed by the task
//! itself. Paths are written once when a task is created and never
//! recomputed, which keeps ancestor lookups and descendant prefix scans
//! cheap.

use super::{ParseTaskPathError, TaskId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Separator used in the encoded path form.
pub const PATH_SEPARATOR: &str = ".";

/// Ordered ancestry of a task, self included as the final segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskPath {
    ancestors: Vec<TaskId>,
    task_id: TaskId,
}

impl TaskPath {
    /// Path of a top-level task.
    #[must_use]
    pub const fn root(task_id: TaskId) -> Self {
        Self {
            ancestors: Vec::new(),
            task_id,
        }
    }

    /// Path of a new child of the task owning this path.
    #[must_use]
    pub fn child(&self, task_id: TaskId) -> Self {
        let mut ancestors = self.ancestors.clone();
        ancestors.push(self.task_id);
        Self { ancestors, task_id }
    }

    /// The task owning this path.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// The immediate parent, if any.
    #[must_use]
    pub fn parent_id(&self) -> Option<TaskId> {
        self.ancestors.last().copied()
    }

    /// Ancestor identifiers excluding the task itself, oldest first.
    #[must_use]
    pub fn ancestor_ids(&self) -> &[TaskId] {
        &self.ancestors
    }

    /// Number of ancestors. Top-level tasks have depth zero.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.ancestors.len()
    }

    /// All segments including the task itself, oldest first.
    pub fn segments(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.ancestors
            .iter()
            .copied()
            .chain(std::iter::once(self.task_id))
    }

    /// Returns `true` when `self` lies strictly below `ancestor`.
    #[must_use]
    pub fn is_descendant_of(&self, ancestor: &Self) -> bool {
        self.ancestors.len() > ancestor.ancestors.len()
            && self.ancestors.starts_with(&ancestor.ancestors)
            && self.ancestors.get(ancestor.ancestors.len()) == Some(&ancestor.task_id)
    }

    /// Encodes the path as dot-separated hyphenated UUIDs.
    #[must_use]
    pub fn encode(&self) -> String {
        self.segments()
            .map(|segment| segment.to_string())
            .collect::<Vec<_>>()
            .join(PATH_SEPARATOR)
    }

    /// Prefix shared by the encoded paths of every descendant.
    #[must_use]
    pub fn descendant_prefix(&self) -> String {
        format!("{}{PATH_SEPARATOR}", self.encode())
    }
}

impl FromStr for TaskPath {
    type Err = ParseTaskPathError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut segments = value
            .split(PATH_SEPARATOR)
            .map(|segment| {
                Uuid::parse_str(segment)
                    .map(TaskId::from_uuid)
                    .map_err(|_| ParseTaskPathError(value.to_owned()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let task_id = segments
            .pop()
            .ok_or_else(|| ParseTaskPathError(value.to_owned()))?;
        Ok(Self {
            ancestors: segments,
            task_id,
        })
    }
}

impl TryFrom<String> for TaskPath {
    type Error = ParseTaskPathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TaskPath> for String {
    fn from(path: TaskPath) -> Self {
        path.encode()
    }
}

impl fmt::Display for TaskPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}
