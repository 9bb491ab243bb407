//! Per-pass membership state of variables and clauses.
use sharpvar_formula::{ClauseId, Var};

use crate::component::Component;

/// State of a variable during a decomposition pass.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum VarState {
    /// Not an active variable of the current super-component.
    Nil,
    /// Active in the super-component, not yet reached by the current search.
    Unseen,
    /// Reached by the current search.
    Seen,
    /// Part of a component already found in this pass, or an isolated variable.
    InOtherComponent,
}

/// State of a long clause during a decomposition pass.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ClauseState {
    /// Not part of the super-component or satisfied by a variable outside of it.
    Nil,
    /// In the super-component, not yet reached by the current search.
    Unseen,
    /// Reached by the current search, some literals are assigned.
    Seen,
    /// Reached by the current search, all literals are unassigned.
    SeenAllActive,
    /// Part of a component already found in this pass.
    InOtherComponent,
}

/// Membership state of all variables and clauses for one decomposition pass.
///
/// The archetype is reset before decomposing each super-component. Nothing carries over between
/// passes.
#[derive(Default)]
pub struct Archetype {
    vars: Vec<VarState>,
    clauses: Vec<ClauseState>,
}

impl Archetype {
    /// Update structures for new variable and long clause counts.
    pub fn set_counts(&mut self, var_count: usize, clause_count: usize) {
        self.vars.clear();
        self.vars.resize(var_count, VarState::Nil);
        self.clauses.clear();
        self.clauses.resize(clause_count, ClauseState::Nil);
    }

    /// Reset every variable and clause to [`VarState::Nil`] and [`ClauseState::Nil`].
    pub fn re_initialize(&mut self) {
        for state in self.vars.iter_mut() {
            *state = VarState::Nil;
        }
        for state in self.clauses.iter_mut() {
            *state = ClauseState::Nil;
        }
    }

    pub fn var_state(&self, var: Var) -> VarState {
        self.vars[var.index()]
    }

    pub fn clause_state(&self, clause: ClauseId) -> ClauseState {
        self.clauses[clause.index()]
    }

    /// Whether the variable is outside the current scope.
    #[inline]
    pub fn var_nil(&self, var: Var) -> bool {
        self.var_state(var) == VarState::Nil
    }

    #[inline]
    pub fn var_unseen(&self, var: Var) -> bool {
        self.var_state(var) == VarState::Unseen
    }

    #[inline]
    pub fn set_var_unseen(&mut self, var: Var) {
        self.vars[var.index()] = VarState::Unseen;
    }

    #[inline]
    pub fn set_var_seen(&mut self, var: Var) {
        debug_assert_eq!(self.vars[var.index()], VarState::Unseen);
        self.vars[var.index()] = VarState::Seen;
    }

    #[inline]
    pub fn set_var_in_other_component(&mut self, var: Var) {
        self.vars[var.index()] = VarState::InOtherComponent;
    }

    #[inline]
    pub fn clause_unseen(&self, clause: ClauseId) -> bool {
        self.clause_state(clause) == ClauseState::Unseen
    }

    #[inline]
    pub fn set_clause_unseen(&mut self, clause: ClauseId) {
        self.clauses[clause.index()] = ClauseState::Unseen;
    }

    #[inline]
    pub fn set_clause_nil(&mut self, clause: ClauseId) {
        self.clauses[clause.index()] = ClauseState::Nil;
    }

    /// Mark a clause as reached, remembering whether all its literals were unassigned.
    #[inline]
    pub fn set_clause_seen(&mut self, clause: ClauseId, all_lits_active: bool) {
        self.clauses[clause.index()] = if all_lits_active {
            ClauseState::SeenAllActive
        } else {
            ClauseState::Seen
        };
    }

    /// Package the seen variables and clauses of the super-component as a new component.
    ///
    /// Returns the component together with its cache view, which lacks the clauses seen with all
    /// literals active. Those clauses are implied by the variable set. All packaged variables and
    /// clauses move to the `InOtherComponent` state.
    pub fn make_component_from_state(
        &mut self,
        super_component: &Component,
        size: usize,
    ) -> (Component, Component) {
        let mut vars = Vec::with_capacity(size);
        let mut clauses = vec![];
        let mut cached_clauses = vec![];

        for &var in super_component.vars() {
            if self.vars[var.index()] == VarState::Seen {
                vars.push(var);
                self.vars[var.index()] = VarState::InOtherComponent;
            }
        }

        for &clause in super_component.clauses() {
            match self.clauses[clause.index()] {
                ClauseState::Seen => cached_clauses.push(clause),
                ClauseState::SeenAllActive => (),
                _ => continue,
            }
            clauses.push(clause);
            self.clauses[clause.index()] = ClauseState::InOtherComponent;
        }

        debug_assert_eq!(vars.len(), size);

        let cache_view = Component::new(vars.clone(), cached_clauses);
        (Component::new(vars, clauses), cache_view)
    }
}
