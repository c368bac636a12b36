//! Boolean formulas in conjunctive normal form.
//!
//! Only the shapes the SAT encoding needs exist here: literals, clauses
//! (disjunctions), and the exactly-one building blocks `at_most_one` and
//! `at_least_one`. Every other constraint is written as an implication
//! `¬a ∨ b`.

use std::fmt::{self, Write as _};
use std::ops::Not;

use indexmap::{IndexMap, IndexSet};

use pcs_core::package::{parse_version, Package};
use pcs_util::errors::{PcsError, PcsResult};

/// A Boolean variable. Package variables are named `name#version`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable(String);

impl Variable {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The variable meaning "`package` is selected".
    pub fn package(package: &Package) -> Self {
        Self(format!("{}#{}", package.name, package.version))
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Recover the package of a variable built with [`Variable::package`].
    pub fn to_package(&self) -> PcsResult<Package> {
        let (name, version) = self.0.rsplit_once('#').ok_or_else(|| PcsError::Solver {
            message: format!("`{}` is not a package variable", self.0),
        })?;
        Ok(Package::new(name, parse_version(name, version)?))
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A variable or its negation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Literal {
    Pos(Variable),
    Neg(Variable),
}

impl Literal {
    pub fn variable(&self) -> &Variable {
        match self {
            Literal::Pos(v) | Literal::Neg(v) => v,
        }
    }

    pub fn is_negated(&self) -> bool {
        matches!(self, Literal::Neg(_))
    }
}

impl From<Variable> for Literal {
    fn from(v: Variable) -> Self {
        Literal::Pos(v)
    }
}

impl Not for Variable {
    type Output = Literal;

    fn not(self) -> Literal {
        Literal::Neg(self)
    }
}

impl Not for Literal {
    type Output = Literal;

    fn not(self) -> Literal {
        match self {
            Literal::Pos(v) => Literal::Neg(v),
            Literal::Neg(v) => Literal::Pos(v),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Pos(v) => write!(f, "{v}"),
            Literal::Neg(v) => write!(f, "¬{v}"),
        }
    }
}

/// A disjunction of literals. The empty clause is unsatisfiable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Clause(Vec<Literal>);

impl Clause {
    pub fn unit(literal: impl Into<Literal>) -> Self {
        Self(vec![literal.into()])
    }

    pub fn literals(&self) -> &[Literal] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(Literal::to_string).collect();
        write!(f, "({})", parts.join(" ∨ "))
    }
}

/// `l1 ∨ l2 ∨ ...`
pub fn or<I, L>(literals: I) -> Clause
where
    I: IntoIterator<Item = L>,
    L: Into<Literal>,
{
    Clause(literals.into_iter().map(Into::into).collect())
}

/// `c1 ∧ c2 ∧ ...`
pub fn and<I: IntoIterator<Item = Clause>>(clauses: I) -> Cnf {
    let mut cnf = Cnf::new();
    cnf.extend(clauses);
    cnf
}

/// Pairwise `¬vi ∨ ¬vj` for every `i < j`.
pub fn at_most_one(variables: &[Variable]) -> Vec<Clause> {
    let mut clauses = Vec::new();
    for (i, a) in variables.iter().enumerate() {
        for b in &variables[i + 1..] {
            clauses.push(or([!a.clone(), !b.clone()]));
        }
    }
    clauses
}

/// `v1 ∨ v2 ∨ ...`; unsatisfiable when `variables` is empty.
pub fn at_least_one(variables: &[Variable]) -> Clause {
    or(variables.iter().cloned())
}

/// A conjunction of clauses. Adding a clause already present is a no-op.
#[derive(Debug, Clone, Default)]
pub struct Cnf {
    clauses: IndexSet<Clause>,
}

impl Cnf {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a clause, returning false if it was already present.
    pub fn push(&mut self, clause: Clause) -> bool {
        self.clauses.insert(clause)
    }

    pub fn clauses(&self) -> impl Iterator<Item = &Clause> {
        self.clauses.iter()
    }

    pub fn contains(&self, clause: &Clause) -> bool {
        self.clauses.contains(clause)
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Every variable, numbered from 1 in order of first appearance.
    pub fn variables(&self) -> IndexMap<&Variable, usize> {
        let mut table = IndexMap::new();
        for literal in self.clauses.iter().flat_map(Clause::literals) {
            let next = table.len() + 1;
            table.entry(literal.variable()).or_insert(next);
        }
        table
    }

    /// Render as DIMACS, with the variable table as leading comments.
    pub fn to_dimacs(&self) -> String {
        let table = self.variables();
        let mut out = String::new();
        for (variable, index) in &table {
            let _ = writeln!(out, "c {index} {variable}");
        }
        let _ = writeln!(out, "p cnf {} {}", table.len(), self.clauses.len());
        for clause in &self.clauses {
            for literal in clause.literals() {
                let index = table[literal.variable()];
                if literal.is_negated() {
                    let _ = write!(out, "-{index} ");
                } else {
                    let _ = write!(out, "{index} ");
                }
            }
            out.push_str("0\n");
        }
        out
    }
}

impl Extend<Clause> for Cnf {
    fn extend<I: IntoIterator<Item = Clause>>(&mut self, iter: I) {
        for clause in iter {
            self.clauses.insert(clause);
        }
    }
}

impl PartialEq for Cnf {
    /// Equal when both hold the same clause set, in any order.
    fn eq(&self, other: &Self) -> bool {
        self.clauses.len() == other.clauses.len()
            && self.clauses.iter().all(|c| other.clauses.contains(c))
    }
}

impl Eq for Cnf {}

impl fmt::Display for Cnf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.clauses.iter().map(Clause::to_string).collect();
        f.write_str(&parts.join(" ∧ "))
    }
}
