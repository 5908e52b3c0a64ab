use crate::algorithms::drawing::LineCheck;
use crate::validate::Problem;
use thiserror::Error;

/// Everything an editing operation can refuse to do.
///
/// The `Display` text is what the editor shows in its status line.
#[derive(Debug, Error)]
pub enum EditError {
    #[error("could not tell which sector the new shape belongs to")]
    AmbiguousParent,
    #[error("invalid sector split: {0}")]
    InvalidSplit(String),
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),
    #[error("the map has a problem: {0}")]
    ValidatorProblem(Problem),
    #[error("nothing to undo")]
    NoHistory,
    #[error("finish {0} first")]
    OperationInProgress(&'static str),
    #[error("that point cannot be used: {0}")]
    RejectedNode(LineCheck),
    #[error("those sectors are not neighbors")]
    NotNeighbors,
    #[error("that move would make edges cross")]
    IntersectingMove,
    #[error("no drawing in progress")]
    NotDrawing,
    #[error("invalid {kind} id {id}")]
    InvalidId { kind: &'static str, id: u32 },
    #[error("map data rejected: {0}")]
    Limits(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("bad configuration: {0}")]
    Config(String),
}

impl EditError {
    /// Stable machine-readable code, used by bindings.
    pub fn code(&self) -> &'static str {
        match self {
            EditError::AmbiguousParent => "ambiguous_parent",
            EditError::InvalidSplit(_) => "invalid_split",
            EditError::DegenerateGeometry(_) => "degenerate_geometry",
            EditError::ValidatorProblem(_) => "validator_problem",
            EditError::NoHistory => "no_history",
            EditError::OperationInProgress(_) => "operation_in_progress",
            EditError::RejectedNode(_) => "rejected_node",
            EditError::NotNeighbors => "not_neighbors",
            EditError::IntersectingMove => "intersecting_move",
            EditError::NotDrawing => "not_drawing",
            EditError::InvalidId { .. } => "invalid_id",
            EditError::Limits(_) => "limits",
            EditError::Io(_) => "io",
            EditError::Serialization(_) => "serialization",
            EditError::Config(_) => "config",
        }
    }
}

pub type EditResult<T> = Result<T, EditError>;

#[inline]
pub(crate) fn degenerate(msg: impl Into<String>) -> EditError {
    EditError::DegenerateGeometry(msg.into())
}

#[inline]
pub(crate) fn invalid_split(msg: impl Into<String>) -> EditError {
    EditError::InvalidSplit(msg.into())
}
