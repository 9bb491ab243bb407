//! CNF formulas.
use std::cmp::max;
use std::fmt;

use crate::lit::Lit;

/// A formula in conjunctive normal form.
///
/// Stores the literals of all clauses in a single buffer. Clause `i` ends at `clause_ends[i]` and
/// starts where clause `i - 1` ends.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct CnfFormula {
    var_count: usize,
    literals: Vec<Lit>,
    clause_ends: Vec<usize>,
}

impl CnfFormula {
    /// Create an empty CNF formula.
    pub fn new() -> CnfFormula {
        CnfFormula::default()
    }

    /// Number of variables in the formula.
    ///
    /// This is the largest variable id present, unless raised by [`set_var_count`].
    ///
    /// [`set_var_count`]: CnfFormula::set_var_count
    pub fn var_count(&self) -> usize {
        self.var_count
    }

    /// Raise the number of variables, e.g. to account for variables occuring in no clause.
    pub fn set_var_count(&mut self, count: usize) {
        self.var_count = max(self.var_count, count)
    }

    /// Number of clauses.
    pub fn len(&self) -> usize {
        self.clause_ends.len()
    }

    /// Whether the formula has no clauses.
    pub fn is_empty(&self) -> bool {
        self.clause_ends.is_empty()
    }

    /// Appends a clause.
    pub fn add_clause(&mut self, literals: impl IntoIterator<Item = Lit>) {
        for lit in literals {
            self.var_count = max(self.var_count, lit.var().id());
            self.literals.push(lit);
        }
        self.clause_ends.push(self.literals.len());
    }

    /// Iterator over all clauses.
    pub fn iter(&self) -> impl Iterator<Item = &[Lit]> {
        let literals = &self.literals;
        let starts = std::iter::once(0).chain(self.clause_ends.iter().cloned());
        starts
            .zip(self.clause_ends.iter().cloned())
            .map(move |(start, end)| &literals[start..end])
    }
}

impl<F, C, L> From<F> for CnfFormula
where
    F: IntoIterator<Item = C>,
    C: IntoIterator<Item = L>,
    L: std::borrow::Borrow<Lit>,
{
    fn from(clauses: F) -> CnfFormula {
        let mut formula = CnfFormula::new();
        for clause in clauses {
            formula.add_clause(clause.into_iter().map(|lit| *lit.borrow()));
        }
        formula
    }
}

impl fmt::Debug for CnfFormula {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} vars ", self.var_count)?;
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(any(test, feature = "proptest-strategies"))]
#[doc(hidden)]
pub mod strategy {
    use super::*;

    use proptest::{collection::SizeRange, prelude::*, *};

    use crate::lit::strategy::lit;

    /// Random formulas over the variables `1..=vars`.
    pub fn cnf_formula(
        vars: impl Strategy<Value = usize>,
        clauses: impl Into<SizeRange>,
        clause_len: impl Into<SizeRange>,
    ) -> impl Strategy<Value = CnfFormula> {
        let clauses = clauses.into();
        let clause_len = clause_len.into();

        vars.prop_flat_map(move |vars| {
            collection::vec(
                collection::vec(lit(1..vars + 1), clause_len.clone()),
                clauses.clone(),
            )
            .prop_map(move |clauses| {
                let mut formula = CnfFormula::from(clauses);
                formula.set_var_count(vars);
                formula
            })
        })
    }
}
