//! Current partial assignment.
use sharpvar_formula::{Lit, Var};

/// Truth values of all variables.
///
/// The search driving the decomposition owns the assignment. Decomposition passes only read it.
#[derive(Default)]
pub struct Assignment {
    assignment: Vec<Option<bool>>,
}

impl Assignment {
    /// Unassign everything and resize for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.assignment.clear();
        self.assignment.resize(count, None);
    }

    /// Number of variables.
    pub fn var_count(&self) -> usize {
        self.assignment.len()
    }

    /// Current partial assignment indexed by variable index.
    pub fn assignment(&self) -> &[Option<bool>] {
        &self.assignment
    }

    pub fn lit_value(&self, lit: Lit) -> Option<bool> {
        self.assignment[lit.var().index()].map(|b| b ^ lit.is_negative())
    }

    pub fn lit_is_true(&self, lit: Lit) -> bool {
        self.assignment[lit.var().index()] == Some(lit.is_positive())
    }

    /// Whether a variable is unassigned.
    pub fn var_is_active(&self, var: Var) -> bool {
        self.assignment[var.index()].is_none()
    }

    /// Make a literal true.
    pub fn assign_lit(&mut self, lit: Lit) {
        self.assignment[lit.var().index()] = Some(lit.is_positive());
    }

    /// Remove the value of a variable.
    pub fn unassign_var(&mut self, var: Var) {
        self.assignment[var.index()] = None;
    }
}
