//! Components and the stack of live components.
use std::ops::{Index, IndexMut};

use sharpvar_formula::{ClauseId, Var};

use crate::cache::CacheEntryId;

/// A set of variables and long clauses independent of the rest of the formula under the current
/// assignment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Component {
    vars: Vec<Var>,
    clauses: Vec<ClauseId>,
    id: Option<CacheEntryId>,
}

impl Component {
    pub fn new(vars: Vec<Var>, clauses: Vec<ClauseId>) -> Component {
        Component {
            vars,
            clauses,
            id: None,
        }
    }

    /// Member variables.
    pub fn vars(&self) -> &[Var] {
        &self.vars
    }

    /// Member long clauses.
    pub fn clauses(&self) -> &[ClauseId] {
        &self.clauses
    }

    pub fn num_variables(&self) -> usize {
        self.vars.len()
    }

    pub fn num_clauses(&self) -> usize {
        self.clauses.len()
    }

    /// Cache entry of this component, if it was stored.
    pub fn id(&self) -> Option<CacheEntryId> {
        self.id
    }

    pub fn set_id(&mut self, id: CacheEntryId) {
        self.id = Some(id);
    }
}

/// Live components, addressed by their position.
///
/// A decision level owns the block of components pushed while decomposing its super-component.
/// Blocks are released in stack order.
#[derive(Default, Debug)]
pub struct ComponentStack {
    components: Vec<Component>,
}

impl ComponentStack {
    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Component> {
        self.components.get(index)
    }

    pub fn push(&mut self, component: Component) {
        self.components.push(component);
    }

    /// Remove all components.
    pub fn clear(&mut self) {
        self.components.clear();
    }

    /// Remove and return the components starting at `len`.
    pub fn drain_from(&mut self, len: usize) -> std::vec::Drain<'_, Component> {
        let len = len.min(self.components.len());
        self.components.drain(len..)
    }

    /// Order the components starting at `start` by decreasing variable count.
    ///
    /// The order of components of the same size is unspecified.
    pub fn sort_block_descending(&mut self, start: usize) {
        self.components[start..].sort_unstable_by_key(|component| {
            std::cmp::Reverse(component.num_variables())
        });
    }
}

impl Index<usize> for ComponentStack {
    type Output = Component;

    fn index(&self, index: usize) -> &Component {
        &self.components[index]
    }
}

impl IndexMut<usize> for ComponentStack {
    fn index_mut(&mut self, index: usize) -> &mut Component {
        &mut self.components[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component_of_size(size: usize) -> Component {
        Component::new((1..=size).map(Var::from_id).collect(), vec![])
    }

    #[test]
    fn block_is_sorted_largest_first() {
        let mut stack = ComponentStack::default();
        stack.push(component_of_size(1));
        for &size in [2, 5, 3, 4].iter() {
            stack.push(component_of_size(size));
        }

        stack.sort_block_descending(1);

        let sizes: Vec<usize> = (0..stack.len())
            .map(|index| stack[index].num_variables())
            .collect();
        assert_eq!(sizes, vec![1, 5, 4, 3, 2]);
    }

    #[test]
    fn drain_releases_top_block() {
        let mut stack = ComponentStack::default();
        for size in 1..=4 {
            stack.push(component_of_size(size));
        }

        let released: Vec<usize> = stack.drain_from(2).map(|c| c.num_variables()).collect();

        assert_eq!(released, vec![3, 4]);
        assert_eq!(stack.len(), 2);
        assert!(stack.get(2).is_none());
    }
}
