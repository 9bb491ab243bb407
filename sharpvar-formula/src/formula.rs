//! Formulas loaded for model counting.
use std::cmp::max;

use crate::cnf::CnfFormula;
use crate::lit::{ClauseId, Lit, Var};

/// A formula split into the shapes the counting core works with.
///
/// Clauses are normalized when added: duplicate literals are removed and tautologies are dropped.
/// What remains is sorted by length:
///
/// * unit clauses are kept as a list of literals, assigning them is up to the caller,
/// * binary clauses become per-literal link lists,
/// * clauses with three or more literals are stored in a single literal pool and receive
///   consecutive [`ClauseId`]s.
#[derive(Default, Clone, Debug)]
pub struct Formula {
    var_count: usize,
    /// For each literal code, the other literal of every binary clause containing that literal.
    binary_links: Vec<Vec<Lit>>,
    binary_count: usize,
    long_literals: Vec<Lit>,
    /// End of each long clause within `long_literals`.
    long_ends: Vec<usize>,
    unit_clauses: Vec<Lit>,
    has_empty_clause: bool,
    tmp: Vec<Lit>,
}

impl Formula {
    /// Create an empty formula.
    pub fn new() -> Formula {
        Formula::default()
    }

    /// Create a formula with the clauses of a CNF formula.
    pub fn from_cnf(cnf: &CnfFormula) -> Formula {
        let mut formula = Formula::new();
        formula.set_var_count(cnf.var_count());
        for clause in cnf.iter() {
            formula.add_clause(clause);
        }
        formula
    }

    /// Number of variables.
    pub fn var_count(&self) -> usize {
        self.var_count
    }

    /// Raise the number of variables.
    pub fn set_var_count(&mut self, count: usize) {
        self.var_count = max(self.var_count, count);
        self.binary_links.resize((self.var_count + 1) * 2, vec![]);
    }

    /// Add a clause.
    pub fn add_clause(&mut self, lits: &[Lit]) {
        let mut clause = std::mem::replace(&mut self.tmp, vec![]);
        clause.clear();
        clause.extend_from_slice(lits);
        clause.sort_unstable();
        clause.dedup();

        let tautology = clause.windows(2).any(|pair| pair[0] == !pair[1]);

        if let Some(max_var) = clause.iter().map(|lit| lit.var().id()).max() {
            self.set_var_count(max_var);
        }

        if !tautology {
            match clause[..] {
                [] => self.has_empty_clause = true,
                [unit] => self.unit_clauses.push(unit),
                [a, b] => {
                    self.binary_links[a.code()].push(b);
                    self.binary_links[b.code()].push(a);
                    self.binary_count += 1;
                }
                _ => {
                    // Keep the input order, which decides the watched literals.
                    let start = self.long_literals.len();
                    for &lit in lits {
                        if !self.long_literals[start..].contains(&lit) {
                            self.long_literals.push(lit);
                        }
                    }
                    self.long_ends.push(self.long_literals.len());
                }
            }
        }

        self.tmp = clause;
    }

    /// Other literals of the binary clauses containing `lit`.
    pub fn binary_links(&self, lit: Lit) -> &[Lit] {
        self.binary_links
            .get(lit.code())
            .map(|links| &links[..])
            .unwrap_or(&[])
    }

    /// Number of binary clauses.
    pub fn binary_count(&self) -> usize {
        self.binary_count
    }

    /// Number of clauses with three or more literals.
    pub fn long_count(&self) -> usize {
        self.long_ends.len()
    }

    /// Clauses with three or more literals together with their ids.
    pub fn long_clauses(&self) -> impl Iterator<Item = (ClauseId, &[Lit])> {
        let literals = &self.long_literals;
        let starts = std::iter::once(0).chain(self.long_ends.iter().cloned());
        starts
            .zip(self.long_ends.iter().cloned())
            .enumerate()
            .map(move |(index, (start, end))| (ClauseId::from_index(index), &literals[start..end]))
    }

    /// Total number of literals stored in long clauses.
    pub fn long_literal_count(&self) -> usize {
        self.long_literals.len()
    }

    /// Literals of unit clauses.
    pub fn unit_clauses(&self) -> &[Lit] {
        &self.unit_clauses
    }

    /// Whether an empty clause was added, making the formula unsatisfiable.
    pub fn has_empty_clause(&self) -> bool {
        self.has_empty_clause
    }

    /// All variables in increasing order.
    pub fn vars(&self) -> impl Iterator<Item = Var> {
        (1..=self.var_count).map(Var::from_id)
    }
}
