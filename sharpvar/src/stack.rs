//! Decision stack levels.
use num_bigint::BigUint;
use num_traits::Zero;

/// Bookkeeping of one decision level of the counting search.
///
/// A level decomposes one super-component. The components found for it occupy the live component
/// stack from [`remaining_components_ofs`](StackLevel::remaining_components_ofs) upwards and are
/// processed from the top of the stack down. Model counts are accumulated separately for both
/// branches of the level's decision.
#[derive(Clone, Debug)]
pub struct StackLevel {
    super_component: usize,
    remaining_components_ofs: usize,
    unprocessed_components_end: usize,
    /// Product of the counts included so far, zero while nothing was included.
    branch_model_count: [BigUint; 2],
    branch_found_unsat: [bool; 2],
    active_branch: usize,
}

impl StackLevel {
    /// Create a level for the super-component at the given stack index.
    ///
    /// `remaining_components_ofs` is the size of the live component stack when the level starts.
    pub fn new(super_component: usize, remaining_components_ofs: usize) -> StackLevel {
        StackLevel {
            super_component,
            remaining_components_ofs,
            unprocessed_components_end: remaining_components_ofs,
            branch_model_count: [BigUint::zero(), BigUint::zero()],
            branch_found_unsat: [false, false],
            active_branch: 0,
        }
    }

    /// Stack index of the decomposed super-component.
    pub fn super_component(&self) -> usize {
        self.super_component
    }

    /// Stack index of the first component found for this level.
    pub fn remaining_components_ofs(&self) -> usize {
        self.remaining_components_ofs
    }

    /// End of the components not yet processed.
    pub fn unprocessed_components_end(&self) -> usize {
        self.unprocessed_components_end
    }

    pub fn set_unprocessed_components_end(&mut self, end: usize) {
        debug_assert!(end >= self.remaining_components_ofs);
        self.unprocessed_components_end = end;
    }

    pub fn has_unprocessed_components(&self) -> bool {
        self.unprocessed_components_end > self.remaining_components_ofs
    }

    /// Mark the current component as processed.
    pub fn next_unprocessed_component(&mut self) {
        debug_assert!(self.has_unprocessed_components());
        self.unprocessed_components_end -= 1;
    }

    /// Stack index of the component to process next.
    pub fn current_remaining_component(&self) -> usize {
        debug_assert!(self.has_unprocessed_components());
        self.unprocessed_components_end - 1
    }

    /// Forget all components found for this level.
    pub fn reset_remaining_comps(&mut self) {
        self.unprocessed_components_end = self.remaining_components_ofs;
    }

    /// Multiply the active branch's count by the model count of an independent part.
    ///
    /// Including zero marks the active branch as unsatisfiable. Inclusions into an unsatisfiable
    /// branch are ignored.
    pub fn include_solution(&mut self, solutions: &BigUint) {
        let branch = self.active_branch;
        if self.branch_found_unsat[branch] {
            return;
        }
        if solutions.is_zero() {
            self.branch_found_unsat[branch] = true;
            self.branch_model_count[branch] = BigUint::zero();
        } else if self.branch_model_count[branch].is_zero() {
            self.branch_model_count[branch] = solutions.clone();
        } else {
            self.branch_model_count[branch] *= solutions;
        }
    }

    /// Whether the active branch has no models.
    pub fn branch_found_unsat(&self) -> bool {
        self.branch_found_unsat[self.active_branch]
    }

    /// Switch to the second branch.
    pub fn change_branch(&mut self) {
        debug_assert!(!self.is_second_branch());
        self.active_branch = 1;
    }

    pub fn is_second_branch(&self) -> bool {
        self.active_branch == 1
    }

    /// Sum of the counts of both branches.
    pub fn total_model_count(&self) -> BigUint {
        &self.branch_model_count[0] + &self.branch_model_count[1]
    }
}
