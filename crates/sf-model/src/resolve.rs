//! Dependency resolution for non-linear equation systems.
//!
//! For one system this determines the external variables it reads
//! (`using_vars`), the unknowns it iterates on (`iteration_variables`) and
//! the equations it evaluates as a side effect of solving (`inner_equations`).

use std::collections::{BTreeSet, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use sf_core::EquationId;

use crate::error::{DependencyError, DependencyResult};
use crate::model::{BlockKind, ModelStructure};

/// Input/output description of one non-linear system.
///
/// Invariants: `using_vars` and `iteration_variables` are disjoint and free of
/// duplicates; `iteration_variables` is non-empty; `initial_guess` is aligned
/// with `iteration_variables`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfilingInfo {
    pub id: EquationId,
    /// External variables read as fixed inputs, in training-column order
    pub using_vars: Vec<String>,
    /// Unknowns determined by the iterative solve, in output-column order
    pub iteration_variables: Vec<String>,
    /// Equations whose evaluation is subsumed by solving this system
    pub inner_equations: BTreeSet<EquationId>,
    /// Start value per iteration variable; the fixed initial-guess policy
    pub initial_guess: Vec<f64>,
}

impl ProfilingInfo {
    pub fn input_dim(&self) -> usize {
        self.using_vars.len()
    }

    pub fn output_dim(&self) -> usize {
        self.iteration_variables.len()
    }

    /// Column names of the training matrix: inputs then outputs.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.using_vars
            .iter()
            .chain(&self.iteration_variables)
            .map(String::as_str)
    }
}

/// Resolve the inputs and outputs of one non-linear system.
pub fn resolve(id: EquationId, model: &ModelStructure) -> DependencyResult<ProfilingInfo> {
    let block = model
        .equation(id)
        .ok_or_else(|| DependencyError::Unresolvable {
            id,
            reason: format!("not present in model '{}'", model.name()),
        })?;

    if block.kind != BlockKind::Nonlinear {
        return Err(DependencyError::Unresolvable {
            id,
            reason: format!("block is {}, not a non-linear system", block.kind),
        });
    }

    let iteration_variables = dedup_in_order(block.unknowns.iter());
    if iteration_variables.is_empty() {
        return Err(DependencyError::NoIterationVariables { id });
    }

    let inner_equations = inner_closure(id, model);

    // Everything computed while solving the system is internal to it.
    let mut assigned: HashSet<&str> = iteration_variables.iter().map(String::as_str).collect();
    assigned.extend(block.defines.iter().map(String::as_str));
    for inner_id in &inner_equations {
        if let Some(inner) = model.equation(*inner_id) {
            assigned.extend(inner.defines.iter().map(String::as_str));
            assigned.extend(inner.unknowns.iter().map(String::as_str));
        }
    }

    let referenced = block.uses.iter().chain(
        inner_equations
            .iter()
            .filter_map(|inner_id| model.equation(*inner_id))
            .flat_map(|inner| inner.uses.iter()),
    );
    let using_vars = dedup_in_order(referenced.filter(|name| !assigned.contains(name.as_str())));

    let initial_guess = iteration_variables
        .iter()
        .map(|name| model.start_value(name).unwrap_or(0.0))
        .collect();

    tracing::debug!(
        equation = %id,
        inputs = using_vars.len(),
        outputs = iteration_variables.len(),
        inner = inner_equations.len(),
        "resolved dependencies"
    );

    Ok(ProfilingInfo {
        id,
        using_vars,
        iteration_variables,
        inner_equations,
        initial_guess,
    })
}

/// Resolve several systems, keeping each outcome separate.
pub fn resolve_all(
    ids: &[EquationId],
    model: &ModelStructure,
) -> Vec<(EquationId, DependencyResult<ProfilingInfo>)> {
    ids.iter().map(|&id| (id, resolve(id, model))).collect()
}

/// A system dropped because a larger resolved system already solves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldedEquation {
    pub id: EquationId,
    pub parent: EquationId,
}

/// Drop systems that are inner equations of another resolved system.
///
/// Systems with more inner equations claim first (input order breaks ties),
/// so a parent always survives its children, and mutually nested systems
/// keep exactly one representative. Retained systems keep their input order.
pub fn fold_nested(infos: Vec<ProfilingInfo>) -> (Vec<ProfilingInfo>, Vec<FoldedEquation>) {
    let mut claim_order: Vec<usize> = (0..infos.len()).collect();
    claim_order.sort_by(|&a, &b| {
        infos[b]
            .inner_equations
            .len()
            .cmp(&infos[a].inner_equations.len())
            .then(a.cmp(&b))
    });

    let mut parent_of: Vec<Option<EquationId>> = vec![None; infos.len()];
    let mut retained: Vec<usize> = Vec::new();
    for &slot in &claim_order {
        let id = infos[slot].id;
        let parent = retained
            .iter()
            .map(|&r| &infos[r])
            .find(|candidate| candidate.inner_equations.contains(&id))
            .map(|candidate| candidate.id);
        match parent {
            Some(parent) => parent_of[slot] = Some(parent),
            None => retained.push(slot),
        }
    }

    let mut kept = Vec::with_capacity(retained.len());
    let mut folded = Vec::new();
    for (info, parent) in infos.into_iter().zip(parent_of) {
        match parent {
            Some(parent) => {
                tracing::info!(equation = %info.id, parent = %parent, "folded nested system");
                folded.push(FoldedEquation {
                    id: info.id,
                    parent,
                });
            }
            None => kept.push(info),
        }
    }
    (kept, folded)
}

/// Transitive closure of `inner`, excluding the root itself.
fn inner_closure(root: EquationId, model: &ModelStructure) -> BTreeSet<EquationId> {
    let mut seen = BTreeSet::new();
    let mut queue: VecDeque<EquationId> = VecDeque::from([root]);
    while let Some(current) = queue.pop_front() {
        let Some(block) = model.equation(current) else {
            continue;
        };
        for &inner in &block.inner {
            if inner != root && seen.insert(inner) {
                queue.push_back(inner);
            }
        }
    }
    seen
}

fn dedup_in_order<'a>(names: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    names
        .filter(|name| seen.insert(name.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ModelBuilder;

    fn simple_loop() -> ModelStructure {
        let mut builder = ModelBuilder::new("simpleLoop");
        builder.add_variable("y", Some(0.5)).add_variable("x", None);
        builder
            .add_equation(EquationId::new(13), BlockKind::Assignment)
            .defines(["x"])
            .uses(["r", "s", "y"]);
        builder
            .add_equation(EquationId::new(14), BlockKind::Nonlinear)
            .uses(["s", "r", "x", "y"])
            .unknowns(["y"])
            .inner([EquationId::new(13)]);
        builder
            .add_equation(EquationId::new(15), BlockKind::Linear)
            .uses(["x"]);
        builder
            .add_equation(EquationId::new(16), BlockKind::Nonlinear)
            .uses(["x"]);
        builder.build().unwrap()
    }

    #[test]
    fn resolves_simple_loop() {
        let model = simple_loop();
        let info = resolve(EquationId::new(14), &model).unwrap();
        assert_eq!(info.using_vars, vec!["s", "r"]);
        assert_eq!(info.iteration_variables, vec!["y"]);
        assert_eq!(info.initial_guess, vec![0.5]);
        assert_eq!(
            info.inner_equations.iter().copied().collect::<Vec<_>>(),
            vec![EquationId::new(13)]
        );
        assert_eq!(info.columns().collect::<Vec<_>>(), vec!["s", "r", "y"]);
    }

    #[test]
    fn missing_id_is_unresolvable() {
        let err = resolve(EquationId::new(99), &simple_loop()).unwrap_err();
        assert!(matches!(err, DependencyError::Unresolvable { .. }));
        assert_eq!(err.id(), EquationId::new(99));
    }

    #[test]
    fn non_system_block_is_unresolvable() {
        let err = resolve(EquationId::new(15), &simple_loop()).unwrap_err();
        assert!(matches!(err, DependencyError::Unresolvable { .. }));
    }

    #[test]
    fn system_without_unknowns_is_dropped() {
        let err = resolve(EquationId::new(16), &simple_loop()).unwrap_err();
        assert_eq!(
            err,
            DependencyError::NoIterationVariables {
                id: EquationId::new(16)
            }
        );
    }

    #[test]
    fn missing_start_defaults_to_zero() {
        let mut builder = ModelBuilder::new("m");
        builder
            .add_equation(EquationId::new(1), BlockKind::Nonlinear)
            .uses(["a"])
            .unknowns(["b", "c", "b"]);
        builder.add_variable("c", Some(2.0));
        let info = resolve(EquationId::new(1), &builder.build().unwrap()).unwrap();
        assert_eq!(info.iteration_variables, vec!["b", "c"]);
        assert_eq!(info.initial_guess, vec![0.0, 2.0]);
    }

    #[test]
    fn fold_keeps_parent_and_drops_child() {
        let mut builder = ModelBuilder::new("m");
        builder
            .add_equation(EquationId::new(1), BlockKind::Nonlinear)
            .uses(["a"])
            .unknowns(["b"]);
        builder
            .add_equation(EquationId::new(2), BlockKind::Nonlinear)
            .uses(["c"])
            .unknowns(["d"])
            .inner([EquationId::new(1)]);
        let model = builder.build().unwrap();

        // Child listed first: it is still folded into its parent.
        let infos = vec![
            resolve(EquationId::new(1), &model).unwrap(),
            resolve(EquationId::new(2), &model).unwrap(),
        ];
        let (kept, folded) = fold_nested(infos);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, EquationId::new(2));
        assert_eq!(
            folded,
            vec![FoldedEquation {
                id: EquationId::new(1),
                parent: EquationId::new(2)
            }]
        );
    }

    #[test]
    fn fold_keeps_one_of_mutually_nested_pair() {
        let mut builder = ModelBuilder::new("m");
        builder
            .add_equation(EquationId::new(1), BlockKind::Nonlinear)
            .uses(["a"])
            .unknowns(["b"])
            .inner([EquationId::new(2)]);
        builder
            .add_equation(EquationId::new(2), BlockKind::Nonlinear)
            .uses(["c"])
            .unknowns(["d"])
            .inner([EquationId::new(1)]);
        let model = builder.build().unwrap();
        let infos = vec![
            resolve(EquationId::new(1), &model).unwrap(),
            resolve(EquationId::new(2), &model).unwrap(),
        ];
        let (kept, folded) = fold_nested(infos);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, EquationId::new(1));
        assert_eq!(folded.len(), 1);
    }
}
