//! Core model-structure data types.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sf_core::EquationId;

use crate::builder::ModelBuilder;
use crate::error::ModelError;
use crate::indexing::EquationIndex;

/// How the model compiler evaluates an equation block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// Iteratively solved system of equations.
    Nonlinear,
    /// Linear system solved directly.
    Linear,
    /// Explicit assignment `x := f(...)`.
    #[default]
    Assignment,
    /// Anything else (algorithms, when-equations, ...).
    Other,
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            BlockKind::Nonlinear => "non-linear",
            BlockKind::Linear => "linear",
            BlockKind::Assignment => "assignment",
            BlockKind::Other => "other",
        };
        f.write_str(text)
    }
}

/// A model variable with its start attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDef {
    pub name: String,
    /// Start (nominal initial guess) value declared in the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<f64>,
}

/// One equation block of the compiled model.
///
/// `uses` lists every variable the block's residual or assignment references,
/// `defines` the variables it assigns explicitly, `unknowns` the iteration
/// variables of a system, and `inner` the equations evaluated as part of
/// solving this block (torn equations).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquationBlock {
    pub id: EquationId,
    #[serde(default)]
    pub kind: BlockKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defines: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uses: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unknowns: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inner: Vec<EquationId>,
}

/// The validated, immutable equation structure of one model.
#[derive(Debug, Clone)]
pub struct ModelStructure {
    pub(crate) name: String,
    pub(crate) variables: Vec<VariableDef>,
    pub(crate) equations: Vec<EquationBlock>,
    pub(crate) index: EquationIndex,
    pub(crate) start_values: HashMap<String, f64>,
}

impl ModelStructure {
    /// Model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return all declared variables.
    pub fn variables(&self) -> &[VariableDef] {
        &self.variables
    }

    /// Return all equation blocks in declaration order.
    pub fn equations(&self) -> &[EquationBlock] {
        &self.equations
    }

    /// Get an equation block by id.
    pub fn equation(&self, id: EquationId) -> Option<&EquationBlock> {
        self.index.slot(id).map(|slot| &self.equations[slot])
    }

    /// Declared start value of a variable, if any.
    pub fn start_value(&self, name: &str) -> Option<f64> {
        self.start_values.get(name).copied()
    }

    /// Ids of every non-linear system, ascending.
    pub fn nonlinear_ids(&self) -> Vec<EquationId> {
        let mut ids: Vec<EquationId> = self
            .equations
            .iter()
            .filter(|eq| eq.kind == BlockKind::Nonlinear)
            .map(|eq| eq.id)
            .collect();
        ids.sort();
        ids
    }
}

#[derive(Debug, Deserialize)]
struct RawModel {
    name: String,
    #[serde(default)]
    variables: Vec<VariableDef>,
    #[serde(default)]
    equations: Vec<EquationBlock>,
}

/// Parse and validate a model structure document.
pub fn parse_model(content: &str) -> Result<ModelStructure, ModelError> {
    let raw: RawModel = serde_json::from_str(content)?;
    let mut builder = ModelBuilder::new(raw.name);
    for var in raw.variables {
        builder.add_variable(var.name, var.start);
    }
    for block in raw.equations {
        builder.push_equation(block);
    }
    builder.build()
}

/// Read, parse and validate a model structure file.
pub fn load_model(path: &Path) -> Result<ModelStructure, ModelError> {
    let content = std::fs::read_to_string(path).map_err(|source| ModelError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_model(&content)
}
