//! Adapter from [`Cnf`] to the `varisat` CDCL solver.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use varisat::{ExtendFormula, Lit, Solver};

use pcs_util::errors::{PcsError, PcsResult};

use crate::cnf::{Clause, Cnf, Variable};

/// The variables a satisfying assignment sets to true.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Model {
    true_variables: BTreeSet<Variable>,
}

impl Model {
    pub fn is_true(&self, variable: &Variable) -> bool {
        self.true_variables.contains(variable)
    }

    pub fn true_variables(&self) -> impl Iterator<Item = &Variable> {
        self.true_variables.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SatOutcome {
    Satisfiable(Model),
    Unsatisfiable,
}

/// An incremental solver session: clauses can be added between solves.
pub struct SatEngine {
    solver: Solver<'static>,
    variables: IndexMap<Variable, isize>,
}

impl SatEngine {
    pub fn new(cnf: &Cnf) -> Self {
        let mut engine = Self {
            solver: Solver::new(),
            variables: IndexMap::new(),
        };
        for clause in cnf.clauses() {
            engine.add_clause(clause);
        }
        engine
    }

    pub fn add_clause(&mut self, clause: &Clause) {
        let lits: Vec<Lit> = clause
            .literals()
            .iter()
            .map(|literal| {
                let index = self.index_of(literal.variable());
                Lit::from_dimacs(if literal.is_negated() { -index } else { index })
            })
            .collect();
        self.solver.add_clause(&lits);
    }

    fn index_of(&mut self, variable: &Variable) -> isize {
        if let Some(&index) = self.variables.get(variable) {
            return index;
        }
        let index = self.variables.len() as isize + 1;
        self.variables.insert(variable.clone(), index);
        index
    }

    pub fn solve(&mut self) -> PcsResult<SatOutcome> {
        let satisfiable = self.solver.solve().map_err(|e| PcsError::Solver {
            message: e.to_string(),
        })?;
        if !satisfiable {
            return Ok(SatOutcome::Unsatisfiable);
        }

        let lits = self.solver.model().ok_or_else(|| PcsError::Solver {
            message: "solver reported SAT without a model".to_string(),
        })?;
        let true_variables = lits
            .into_iter()
            .filter(|lit| lit.is_positive())
            .filter_map(|lit| {
                let index = lit.to_dimacs();
                self.variables
                    .get_index(index as usize - 1)
                    .map(|(variable, _)| variable.clone())
            })
            .collect();
        Ok(SatOutcome::Satisfiable(Model { true_variables }))
    }
}

/// Solve `cnf` once.
pub fn solve(cnf: &Cnf) -> PcsResult<SatOutcome> {
    SatEngine::new(cnf).solve()
}
