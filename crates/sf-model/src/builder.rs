//! Incremental model-structure builder.

use std::collections::HashMap;

use sf_core::EquationId;

use crate::error::ModelError;
use crate::indexing::EquationIndex;
use crate::model::{BlockKind, EquationBlock, ModelStructure, VariableDef};
use crate::validate;

/// Builder for constructing a model structure incrementally.
///
/// Use `add_variable` and `add_equation` to build up the model,
/// then call `build()` to validate and freeze it into an immutable `ModelStructure`.
#[derive(Debug)]
pub struct ModelBuilder {
    name: String,
    variables: Vec<VariableDef>,
    equations: Vec<EquationBlock>,
}

impl ModelBuilder {
    /// Create a new empty builder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: Vec::new(),
            equations: Vec::new(),
        }
    }

    /// Declare a variable with an optional start value.
    pub fn add_variable(&mut self, name: impl Into<String>, start: Option<f64>) -> &mut Self {
        self.variables.push(VariableDef {
            name: name.into(),
            start,
        });
        self
    }

    /// Add an empty equation block and return a handle to fill it in.
    pub fn add_equation(&mut self, id: EquationId, kind: BlockKind) -> EquationBuilder<'_> {
        self.equations.push(EquationBlock {
            id,
            kind,
            defines: Vec::new(),
            uses: Vec::new(),
            unknowns: Vec::new(),
            inner: Vec::new(),
        });
        let last = self.equations.len() - 1;
        EquationBuilder {
            block: &mut self.equations[last],
        }
    }

    /// Add a fully described block.
    pub fn push_equation(&mut self, block: EquationBlock) -> &mut Self {
        self.equations.push(block);
        self
    }

    /// Build and validate the model, returning an immutable `ModelStructure`.
    pub fn build(self) -> Result<ModelStructure, ModelError> {
        validate::validate_structure(&self.variables, &self.equations)?;

        let index = EquationIndex::from_ids(self.equations.iter().map(|eq| eq.id))
            .map_err(|id| ModelError::DuplicateEquation { id })?;

        let start_values: HashMap<String, f64> = self
            .variables
            .iter()
            .filter_map(|v| v.start.map(|s| (v.name.clone(), s)))
            .collect();

        Ok(ModelStructure {
            name: self.name,
            variables: self.variables,
            equations: self.equations,
            index,
            start_values,
        })
    }
}

/// Handle for filling in one equation block.
pub struct EquationBuilder<'a> {
    block: &'a mut EquationBlock,
}

impl EquationBuilder<'_> {
    /// Variables assigned explicitly by this block.
    pub fn defines<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.block.defines.extend(names.into_iter().map(Into::into));
        self
    }

    /// Variables referenced by this block.
    pub fn uses<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.block.uses.extend(names.into_iter().map(Into::into));
        self
    }

    /// Iteration variables of a system.
    pub fn unknowns<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.block.unknowns.extend(names.into_iter().map(Into::into));
        self
    }

    /// Equations evaluated while solving this block.
    pub fn inner(self, ids: impl IntoIterator<Item = EquationId>) -> Self {
        self.block.inner.extend(ids);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_basic() {
        let mut builder = ModelBuilder::new("m");
        builder.add_variable("x", Some(1.0)).add_variable("y", None);
        builder
            .add_equation(EquationId::new(1), BlockKind::Assignment)
            .defines(["x"])
            .uses(["y"]);

        assert_eq!(builder.variables.len(), 2);
        assert_eq!(builder.equations.len(), 1);
        assert_eq!(builder.equations[0].defines, vec!["x"]);
    }

    #[test]
    fn builder_build_simple() {
        let mut builder = ModelBuilder::new("m");
        builder
            .add_equation(EquationId::new(7), BlockKind::Nonlinear)
            .uses(["a"])
            .unknowns(["b"]);
        let model = builder.build().unwrap();
        assert_eq!(model.equations().len(), 1);
        assert!(model.equation(EquationId::new(7)).is_some());
        assert!(model.equation(EquationId::new(8)).is_none());
    }

    #[test]
    fn builder_rejects_duplicate_ids() {
        let mut builder = ModelBuilder::new("m");
        builder.add_equation(EquationId::new(1), BlockKind::Assignment);
        builder.add_equation(EquationId::new(1), BlockKind::Nonlinear);
        assert!(matches!(
            builder.build().unwrap_err(),
            ModelError::DuplicateEquation { .. }
        ));
    }
}
