//! Error types for control graph construction.

use sl_core::ComponentId;
use thiserror::Error;

/// Result type for control system operations.
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors that can occur while building or configuring the control graph.
///
/// Evaluation itself never returns an error.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    /// Invalid argument provided to a control function.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error(transparent)]
    Core(#[from] sl_core::SlError),

    /// The dataflow graph contains an algebraic loop.
    #[error(transparent)]
    Cycle(#[from] CycleError),
}

/// A block taking part in a dependency cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleMember {
    pub id: ComponentId,
    /// Display name, as shown to the user.
    pub name: String,
}

/// Dependency cycle report.
///
/// `members` lists every block on at least one cycle, in insertion order.
/// `loops` groups them by strongly connected component.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error(
    "Algebraic loop between blocks: {}. Break the feedback path so each block is evaluated after its inputs.",
    member_names(.members)
)]
pub struct CycleError {
    pub members: Vec<CycleMember>,
    pub loops: Vec<Vec<ComponentId>>,
}

impl CycleError {
    pub fn contains(&self, id: &str) -> bool {
        self.members.iter().any(|m| m.id.as_str() == id)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|m| m.name.as_str())
    }
}

fn member_names(members: &[CycleMember]) -> String {
    members
        .iter()
        .map(|m| m.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
