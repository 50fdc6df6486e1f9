//! Model-structure validation logic.

use std::collections::HashSet;

use sf_core::EquationId;

use crate::error::ModelError;
use crate::model::{EquationBlock, VariableDef};

/// Validate the model structure: unique names and ids, inner references exist.
pub(crate) fn validate_structure(
    variables: &[VariableDef],
    equations: &[EquationBlock],
) -> Result<(), ModelError> {
    let mut names: HashSet<&str> = HashSet::new();
    for var in variables {
        if var.name.trim().is_empty() {
            return Err(ModelError::EmptyName { id: None });
        }
        if !names.insert(var.name.as_str()) {
            return Err(ModelError::DuplicateVariable {
                name: var.name.clone(),
            });
        }
    }

    let mut ids: HashSet<EquationId> = HashSet::new();
    for eq in equations {
        if !ids.insert(eq.id) {
            return Err(ModelError::DuplicateEquation { id: eq.id });
        }
    }

    for eq in equations {
        let mut referenced = eq.defines.iter().chain(&eq.uses).chain(&eq.unknowns);
        if referenced.any(|name| name.trim().is_empty()) {
            return Err(ModelError::EmptyName { id: Some(eq.id) });
        }

        for &inner in &eq.inner {
            if inner == eq.id {
                return Err(ModelError::SelfInner { id: eq.id });
            }
            if !ids.contains(&inner) {
                return Err(ModelError::UnknownInner { id: eq.id, inner });
            }
        }
    }

    Ok(())
}
