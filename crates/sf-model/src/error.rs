//! Model-structure and dependency error types.

use std::path::PathBuf;

use sf_core::EquationId;

/// Model structure construction and validation errors.
#[derive(Debug)]
pub enum ModelError {
    /// Two equation blocks share an id.
    DuplicateEquation { id: EquationId },

    /// Two variables share a name.
    DuplicateVariable { name: String },

    /// A variable or a block references an empty name.
    EmptyName { id: Option<EquationId> },

    /// A block lists an inner equation that doesn't exist.
    UnknownInner { id: EquationId, inner: EquationId },

    /// A block lists itself as an inner equation.
    SelfInner { id: EquationId },

    /// The model file could not be read.
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The model file is not valid JSON for the expected layout.
    Syntax(serde_json::Error),
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::DuplicateEquation { id } => {
                write!(f, "Equation {} is defined more than once", id)
            }
            ModelError::DuplicateVariable { name } => {
                write!(f, "Variable '{}' is defined more than once", name)
            }
            ModelError::EmptyName { id: Some(id) } => {
                write!(f, "Equation {} references an empty variable name", id)
            }
            ModelError::EmptyName { id: None } => {
                write!(f, "A variable has an empty name")
            }
            ModelError::UnknownInner { id, inner } => {
                write!(f, "Equation {} lists unknown inner equation {}", id, inner)
            }
            ModelError::SelfInner { id } => {
                write!(f, "Equation {} lists itself as an inner equation", id)
            }
            ModelError::Read { path, .. } => {
                write!(f, "Failed to read model structure: {}", path.display())
            }
            ModelError::Syntax(err) => write!(f, "Malformed model structure: {}", err),
        }
    }
}

impl std::error::Error for ModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModelError::Read { source, .. } => Some(source),
            ModelError::Syntax(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Syntax(err)
    }
}

pub type DependencyResult<T> = Result<T, DependencyError>;

/// Per-equation resolution failures. None of these abort a batch.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DependencyError {
    /// The model does not expose a well-formed non-linear block for this id
    /// (stale id after model regeneration, or wrong block kind).
    #[error("Cannot resolve dependencies of equation {id}: {reason}")]
    Unresolvable { id: EquationId, reason: String },

    /// The block has no unknowns, so it is not an iterative system.
    #[error("Equation {id} has no iteration variables")]
    NoIterationVariables { id: EquationId },
}

impl DependencyError {
    pub fn id(&self) -> EquationId {
        match self {
            DependencyError::Unresolvable { id, .. } => *id,
            DependencyError::NoIterationVariables { id } => *id,
        }
    }
}
