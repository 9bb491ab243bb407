//! Component manager used by a model counting search.
use partial_ref::{IntoPartialRefMut, PartialRef};

use log::info;
use num_bigint::BigUint;
use thiserror::Error;

use sharpvar_formula::{Formula, Lit, Var};

use crate::adjacency::AdjacencyIndex;
use crate::cache::{CacheStatistics, ComponentCache};
use crate::component::Component;
use crate::config::{ComponentConfig, ComponentConfigUpdate};
use crate::context::{set_counts, CacheP, ComponentStackP, ConfigP, Context};
use crate::decompose;
use crate::pack::{PackError, PackedComponent, PackingScheme};
use crate::search;
use crate::stack::StackLevel;

/// Errors reported by the [`ComponentManager`].
#[derive(Debug, Error)]
pub enum ComponentError {
    #[error("Could not pack component: {0}")]
    Pack(#[from] PackError),
    #[error("Variable {var} is out of range for a formula with {var_count} variables")]
    VariableOutOfRange { var: usize, var_count: usize },
    #[error("Component index {index} is out of range for a stack of {len} components")]
    ComponentOutOfRange { index: usize, len: usize },
    #[error("No formula was loaded")]
    NotInitialized,
    #[error("Formula needs {len} clause links, at most {max} are supported")]
    ClausePoolTooLarge { len: usize, max: usize },
}

/// Component decomposition and caching for a model counting search.
///
/// The search calling into the manager owns the decision stack. For every decision level it
/// creates a [`StackLevel`] and repeatedly asks for the next component of that level using
/// [`find_next_remaining_component_of`](ComponentManager::find_next_remaining_component_of).
#[derive(Default)]
pub struct ComponentManager {
    ctx: Box<Context>,
}

impl ComponentManager {
    /// Create a new component manager.
    pub fn new() -> ComponentManager {
        ComponentManager::default()
    }

    /// Change the configuration.
    ///
    /// Changed cache limits apply to the current cache immediately.
    pub fn config(&mut self, update: &ComponentConfigUpdate) {
        self.ctx.config.apply(update);
        let config = self.ctx.config.clone();
        self.ctx.cache.set_limits(&config);
    }

    /// The current configuration.
    pub fn current_config(&self) -> &ComponentConfig {
        &self.ctx.config
    }

    /// Load a formula, replacing all previous state.
    ///
    /// All variables start unassigned. Unit clauses of the formula are not assigned by the
    /// manager. Afterwards the component stack holds the root component containing all variables
    /// and long clauses.
    pub fn initialize(&mut self, formula: &Formula) -> Result<(), ComponentError> {
        let adjacency = AdjacencyIndex::build(formula)?;
        let var_count = adjacency.max_variable_id();
        let clause_count = adjacency.max_clause_id();

        let scheme = PackingScheme::new(var_count, clause_count)?;

        info!(
            "Packing {} bits per variable, {} bits per clause, {} bits per size",
            scheme.bits_per_variable(),
            scheme.bits_per_clause(),
            scheme.bits_of_data_size()
        );

        let mut root = Component::new(adjacency.vars().collect(), adjacency.clause_ids().collect());
        let packed = PackedComponent::encode(&scheme, &root)?;

        self.ctx.adjacency = adjacency;

        let mut ctx = self.ctx.into_partial_ref_mut();
        set_counts(ctx.borrow(), var_count, clause_count);

        let config = ctx.part(ConfigP);
        let mut cache = ComponentCache::new(scheme, config);
        if config.perform_component_caching {
            root.set_id(cache.store_as_entry(packed, None));
        }
        *ctx.part_mut(CacheP) = cache;

        let stack = ctx.part_mut(ComponentStackP);
        stack.clear();
        stack.push(root);

        Ok(())
    }

    /// Number of variables of the loaded formula.
    pub fn var_count(&self) -> usize {
        self.ctx.assignment.var_count()
    }

    fn check_var(&self, var: Var) -> Result<(), ComponentError> {
        let var_count = self.var_count();
        if var.index() < var_count {
            Ok(())
        } else {
            Err(ComponentError::VariableOutOfRange {
                var: var.id(),
                var_count,
            })
        }
    }

    fn check_initialized(&self) -> Result<(), ComponentError> {
        if self.ctx.component_stack.is_empty() {
            Err(ComponentError::NotInitialized)
        } else {
            Ok(())
        }
    }

    /// Make a literal true.
    pub fn assign(&mut self, lit: Lit) -> Result<(), ComponentError> {
        self.check_var(lit.var())?;
        self.ctx.assignment.assign_lit(lit);
        Ok(())
    }

    /// Remove the value of a variable.
    pub fn unassign(&mut self, var: Var) -> Result<(), ComponentError> {
        self.check_var(var)?;
        self.ctx.assignment.unassign_var(var);
        Ok(())
    }

    /// Current value of a literal.
    pub fn lit_value(&self, lit: Lit) -> Result<Option<bool>, ComponentError> {
        self.check_var(lit.var())?;
        Ok(self.ctx.assignment.lit_value(lit))
    }

    /// Frequency score of a variable in the latest decomposition.
    pub fn score_of(&self, var: Var) -> Result<u32, ComponentError> {
        self.check_var(var)?;
        Ok(self.ctx.search.score_of(var))
    }

    /// Stack level of the root component.
    pub fn root_level(&self) -> Result<StackLevel, ComponentError> {
        self.check_initialized()?;
        Ok(StackLevel::new(0, 1))
    }

    fn check_level(&self, level: &StackLevel) -> Result<(), ComponentError> {
        self.check_initialized()?;
        self.check_index(level.super_component())
    }

    fn check_index(&self, index: usize) -> Result<(), ComponentError> {
        let len = self.ctx.component_stack.len();
        if index < len {
            Ok(())
        } else {
            Err(ComponentError::ComponentOutOfRange { index, len })
        }
    }

    /// Prepare decomposing the super-component of a level.
    pub fn setup_analysis_context(&mut self, level: &StackLevel) -> Result<(), ComponentError> {
        self.check_level(level)?;
        let mut ctx = self.ctx.into_partial_ref_mut();
        search::setup_analysis_context(ctx.borrow(), level.super_component());
        Ok(())
    }

    /// Find the next component of a level.
    ///
    /// Returns `true` when [`current_remaining_component_of`] is a component still to be counted.
    /// When `false` is returned all components of the level's active branch are accounted for.
    ///
    /// [`current_remaining_component_of`]: ComponentManager::current_remaining_component_of
    pub fn find_next_remaining_component_of(
        &mut self,
        level: &mut StackLevel,
    ) -> Result<bool, ComponentError> {
        self.check_level(level)?;
        let mut ctx = self.ctx.into_partial_ref_mut();
        Ok(decompose::find_next_remaining_component_of(ctx.borrow(), level)?)
    }

    /// Decompose the super-component of a level.
    pub fn record_remaining_comps_for(
        &mut self,
        level: &mut StackLevel,
    ) -> Result<(), ComponentError> {
        self.check_level(level)?;
        let mut ctx = self.ctx.into_partial_ref_mut();
        Ok(decompose::record_remaining_comps_for(ctx.borrow(), level)?)
    }

    /// Release all components of a level.
    pub fn clean_remaining_components_of(&mut self, level: &StackLevel) {
        let mut ctx = self.ctx.into_partial_ref_mut();
        decompose::clean_remaining_components_of(ctx.borrow(), level);
    }

    /// Cache the model count of the component at `stack_index`.
    pub fn cache_model_count_of(
        &mut self,
        stack_index: usize,
        model_count: BigUint,
    ) -> Result<(), ComponentError> {
        self.check_index(stack_index)?;
        let mut ctx = self.ctx.into_partial_ref_mut();
        decompose::cache_model_count_of(ctx.borrow(), stack_index, model_count);
        Ok(())
    }

    pub fn super_component_of(&self, level: &StackLevel) -> Result<&Component, ComponentError> {
        self.component(level.super_component())
    }

    pub fn current_remaining_component_of(
        &self,
        level: &StackLevel,
    ) -> Result<&Component, ComponentError> {
        if !level.has_unprocessed_components() {
            return Err(ComponentError::ComponentOutOfRange {
                index: level.unprocessed_components_end(),
                len: self.component_stack_size(),
            });
        }
        self.component(level.current_remaining_component())
    }

    /// Number of live components.
    pub fn component_stack_size(&self) -> usize {
        self.ctx.component_stack.len()
    }

    /// Live component at a stack index.
    pub fn component(&self, index: usize) -> Result<&Component, ComponentError> {
        self.check_initialized()?;
        self.check_index(index)?;
        Ok(&self.ctx.component_stack[index])
    }

    pub fn cache_statistics(&self) -> CacheStatistics {
        self.ctx.cache.statistics()
    }

    /// The component cache.
    pub fn cache(&self) -> &ComponentCache {
        &self.ctx.cache
    }

    /// Current partial assignment indexed by variable index.
    pub fn assignment(&self) -> &[Option<bool>] {
        self.ctx.assignment.assignment()
    }
}
