//! Splitting super-components into independent components.
use partial_ref::{partial, PartialRef};

use log::{debug, trace};
use num_bigint::BigUint;
use num_traits::One;

use crate::context::{
    AdjacencyP, ArchetypeP, AssignmentP, CacheP, ComponentStackP, ConfigP, Context, SearchP,
};
use crate::pack::{PackError, PackedComponent};
use crate::search::{explore_remaining_component_of, setup_analysis_context};
use crate::stack::StackLevel;

/// Make the next unprocessed component of a level current.
///
/// Decomposes the level's super-component if that didn't happen yet. Returns `true` when an
/// unprocessed component is available at [`StackLevel::current_remaining_component`]. Otherwise
/// the level's active branch is known to be satisfiable and `false` is returned.
pub fn find_next_remaining_component_of(
    mut ctx: partial!(
        Context,
        mut ArchetypeP,
        mut CacheP,
        mut ComponentStackP,
        mut SearchP,
        AdjacencyP,
        AssignmentP
    ),
    level: &mut StackLevel,
) -> Result<bool, PackError> {
    if ctx.part(ComponentStackP).len() <= level.remaining_components_ofs() {
        record_remaining_comps_for(ctx.borrow(), level)?;
    }

    if level.has_unprocessed_components() {
        return Ok(true);
    }

    level.include_solution(&BigUint::one());
    Ok(false)
}

/// Find all components of a level's super-component.
///
/// Isolated variables and components with a cached model count are included into the level's
/// count directly. All other components are stored in the cache and pushed onto the component
/// stack, so that the smallest component is processed first.
pub fn record_remaining_comps_for(
    mut ctx: partial!(
        Context,
        mut ArchetypeP,
        mut CacheP,
        mut ComponentStackP,
        mut SearchP,
        AdjacencyP,
        AssignmentP
    ),
    level: &mut StackLevel,
) -> Result<(), PackError> {
    let super_index = level.super_component();
    let new_comps_start = ctx.part(ComponentStackP).len();

    setup_analysis_context(ctx.borrow(), super_index);

    let super_id = ctx.part(ComponentStackP)[super_index].id();
    let super_size = ctx.part(ComponentStackP)[super_index].num_variables();

    let mut trivial = 0;
    let mut hits = 0;

    for position in 0..super_size {
        let var = ctx.part(ComponentStackP)[super_index].vars()[position];

        // Unseen variables are active and not yet part of a component.
        if !ctx.part(ArchetypeP).var_unseen(var) {
            continue;
        }

        if !explore_remaining_component_of(ctx.borrow(), level, var) {
            trivial += 1;
            continue;
        }

        let size = ctx.part(SearchP).worklist().len();

        let (stack, mut ctx) = ctx.split_part_mut(ComponentStackP);
        let (mut component, cache_view) = ctx
            .part_mut(ArchetypeP)
            .make_component_from_state(&stack[super_index], size);

        let cache = ctx.part_mut(CacheP);
        let packed = PackedComponent::encode(cache.scheme(), &cache_view)?;

        if cache.manage_new_component(level, &packed) {
            hits += 1;
            continue;
        }

        if cache.perform_caching() {
            component.set_id(cache.store_as_entry(packed, super_id));
        }
        trace!(
            "new component {:?} with {} variables and {} clauses",
            component.id(),
            component.num_variables(),
            component.num_clauses()
        );
        stack.push(component);
    }

    let stack = ctx.part_mut(ComponentStackP);
    level.set_unprocessed_components_end(stack.len());
    stack.sort_block_descending(new_comps_start);

    debug!(
        "split component {} into {} components, {} cache hits, {} isolated variables",
        super_index,
        stack.len() - new_comps_start,
        hits,
        trivial
    );

    Ok(())
}

/// Release all components found for a level.
///
/// Cache entries of solved components become eligible for eviction, those of unsolved components
/// are removed.
pub fn clean_remaining_components_of(
    mut ctx: partial!(Context, mut CacheP, mut ComponentStackP),
    level: &StackLevel,
) {
    let (stack, mut ctx) = ctx.split_part_mut(ComponentStackP);
    let cache = ctx.part_mut(CacheP);

    for component in stack.drain_from(level.remaining_components_ofs()) {
        if let Some(id) = component.id() {
            cache.release_entry(id);
        }
    }
}

/// Store the model count of the component at `stack_index` in the cache.
pub fn cache_model_count_of(
    mut ctx: partial!(Context, mut CacheP, ComponentStackP, ConfigP),
    stack_index: usize,
    model_count: BigUint,
) {
    if !ctx.part(ConfigP).perform_component_caching {
        return;
    }
    if let Some(id) = ctx.part(ComponentStackP)[stack_index].id() {
        ctx.part_mut(CacheP).store_value_of(id, model_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;
    use proptest::{collection, prelude::*};

    use sharpvar_formula::cnf::strategy::cnf_formula;
    use sharpvar_formula::test::blocked_formula;
    use sharpvar_formula::{CnfFormula, Formula, Var};

    use crate::adjacency::AdjacencyIndex;
    use crate::cache::{CacheStatistics, ComponentCache};
    use crate::component::Component;
    use crate::config::ComponentConfig;
    use crate::context::set_counts;
    use crate::pack::PackingScheme;

    fn context_for(formula: &Formula) -> Box<Context> {
        context_with(formula, ComponentConfig::default())
    }

    fn context_with(formula: &Formula, config: ComponentConfig) -> Box<Context> {
        let mut ctx = Box::new(Context::default());
        ctx.adjacency = AdjacencyIndex::build(formula).unwrap();
        {
            let mut ctx = ctx.into_partial_ref_mut();
            set_counts(ctx.borrow(), formula.var_count(), formula.long_count());
        }
        let scheme = PackingScheme::new(
            ctx.adjacency.max_variable_id(),
            ctx.adjacency.max_clause_id(),
        )
        .unwrap();
        ctx.cache = ComponentCache::new(scheme, &config);
        ctx.config = config;
        let root = Component::new(formula.vars().collect(), ctx.adjacency.clause_ids().collect());
        ctx.component_stack.push(root);
        ctx
    }

    fn var_sets(ctx: &Context, start: usize) -> Vec<Vec<Var>> {
        (start..ctx.component_stack.len())
            .map(|index| {
                let mut vars = ctx.component_stack[index].vars().to_vec();
                vars.sort();
                vars
            })
            .collect()
    }

    #[test]
    fn binary_clauses_split_into_pairs() {
        let mut ctx = context_for(&Formula::from_cnf(&cnf_formula![
            1, 2;
            3, 4;
        ]));
        let mut level = StackLevel::new(0, 1);

        let mut ctx_ref = ctx.into_partial_ref_mut();
        assert!(find_next_remaining_component_of(ctx_ref.borrow(), &mut level).unwrap());

        let mut sets = var_sets(&ctx, 1);
        sets.sort();
        assert_eq!(sets, vec![vars![1, 2].to_vec(), vars![3, 4].to_vec()]);
        assert_eq!(level.current_remaining_component(), 2);
    }

    #[test]
    fn smallest_component_is_processed_first() {
        let mut cnf = cnf_formula![
            1, 2, 3;
            3, 4;
            5, 6;
        ];
        cnf.set_var_count(7);
        let mut ctx = context_for(&Formula::from_cnf(&cnf));
        let mut level = StackLevel::new(0, 1);

        let mut ctx_ref = ctx.into_partial_ref_mut();
        assert!(find_next_remaining_component_of(ctx_ref.borrow(), &mut level).unwrap());

        // Variable 7 is isolated.
        assert_eq!(level.total_model_count(), BigUint::from(2u32));
        assert_eq!(
            var_sets(&ctx, 1),
            vec![vars![1, 2, 3, 4].to_vec(), vars![5, 6].to_vec()]
        );
        assert_eq!(level.current_remaining_component(), 2);
    }

    #[test]
    fn solved_components_are_not_pushed_again() {
        let formula = Formula::from_cnf(&cnf_formula![
            1, 2, 3;
            -1, -2, -3;
        ]);
        let mut ctx = context_for(&formula);

        let mut first = StackLevel::new(0, 1);
        {
            let mut ctx = ctx.into_partial_ref_mut();
            assert!(find_next_remaining_component_of(ctx.borrow(), &mut first).unwrap());
            cache_model_count_of(ctx.borrow(), 1, BigUint::from(6u32));
            clean_remaining_components_of(ctx.borrow(), &first);
        }

        assert_eq!(ctx.cache.statistics().stored, 1);
        assert_eq!(ctx.component_stack.len(), 1);

        let mut second = StackLevel::new(0, 1);
        {
            let mut ctx = ctx.into_partial_ref_mut();
            assert!(!find_next_remaining_component_of(ctx.borrow(), &mut second).unwrap());
        }

        assert_eq!(second.total_model_count(), BigUint::from(6u32));
        assert_eq!(ctx.cache.statistics().hits, 1);
    }

    #[test]
    fn cleanup_keeps_only_solved_entries() {
        let formula = Formula::from_cnf(&cnf_formula![
            1, 2;
            3, 4, 5;
        ]);
        let mut ctx = context_for(&formula);
        let mut level = StackLevel::new(0, 1);

        let mut ctx_ref = ctx.into_partial_ref_mut();
        find_next_remaining_component_of(ctx_ref.borrow(), &mut level).unwrap();
        let smaller = ctx_ref.part(ComponentStackP)[2].id().unwrap();
        let larger = ctx_ref.part(ComponentStackP)[1].id().unwrap();

        cache_model_count_of(ctx_ref.borrow(), 2, BigUint::from(3u32));
        clean_remaining_components_of(ctx_ref.borrow(), &level);

        assert_eq!(ctx.component_stack.len(), 1);
        assert!(ctx.cache.entry(smaller).unwrap().is_deletable());
        assert!(!ctx.cache.has_entry(larger));
        assert_eq!(ctx.cache.statistics().discarded, 1);
    }

    #[test]
    fn disabled_caching_stores_no_entries() {
        let formula = Formula::from_cnf(&cnf_formula![
            1, 2;
            3, 4;
        ]);
        let mut ctx = context_with(
            &formula,
            ComponentConfig {
                perform_component_caching: false,
                ..ComponentConfig::default()
            },
        );
        let mut level = StackLevel::new(0, 1);

        let mut ctx_ref = ctx.into_partial_ref_mut();
        assert!(find_next_remaining_component_of(ctx_ref.borrow(), &mut level).unwrap());
        for index in 1..3 {
            assert_eq!(ctx_ref.part(ComponentStackP)[index].id(), None);
        }
        cache_model_count_of(ctx_ref.borrow(), 2, BigUint::from(3u32));
        clean_remaining_components_of(ctx_ref.borrow(), &level);

        assert!(ctx.cache.is_empty());
        assert_eq!(ctx.cache.statistics(), CacheStatistics::default());
    }

    /// Check the components found for `level` starting at stack index `start`.
    ///
    /// Only relies on the assignment, so it also holds when propagation is incomplete.
    fn check_decomposition(
        ctx: &Context,
        formula: &Formula,
        level: &StackLevel,
        start: usize,
    ) -> Result<(), TestCaseError> {
        let stack = &ctx.component_stack;
        let assignment = &ctx.assignment;
        let super_component = &stack[level.super_component()];

        let active =
            |var: Var| super_component.vars().contains(&var) && assignment.var_is_active(var);

        let mut owner = vec![None; formula.var_count()];
        for index in start..stack.len() {
            for &var in stack[index].vars() {
                prop_assert!(active(var));
                prop_assert_eq!(owner[var.index()], None);
                owner[var.index()] = Some(index);
            }
        }

        let trivial = super_component
            .vars()
            .iter()
            .filter(|&&var| active(var) && owner[var.index()].is_none())
            .count();
        prop_assert_eq!(level.total_model_count(), BigUint::from(1u32) << trivial);

        let mut clause_owner = vec![None; formula.long_count()];
        for index in start..stack.len() {
            for &clause in stack[index].clauses() {
                prop_assert!(super_component.clauses().contains(&clause));
                prop_assert_eq!(clause_owner[clause.index()], None);
                clause_owner[clause.index()] = Some(index);
            }
        }

        for &clause in super_component.clauses() {
            let lits = ctx.adjacency.clause(clause);
            if lits.iter().any(|&lit| assignment.lit_is_true(lit)) {
                prop_assert_eq!(clause_owner[clause.index()], None);
                continue;
            }
            let active_vars: Vec<Var> = lits
                .iter()
                .map(|lit| lit.var())
                .filter(|&var| active(var))
                .collect();
            if active_vars.len() >= 2 {
                prop_assert!(clause_owner[clause.index()].is_some());
                for var in active_vars {
                    prop_assert_eq!(owner[var.index()], clause_owner[clause.index()]);
                }
            }
        }

        for &var in super_component.vars() {
            if !active(var) {
                continue;
            }
            for &polarity in [false, true].iter() {
                for other in formula.binary_links(var.lit(polarity)) {
                    if active(other.var()) {
                        prop_assert!(owner[var.index()].is_some());
                        prop_assert_eq!(owner[var.index()], owner[other.var().index()]);
                    }
                }
            }
        }

        Ok(())
    }

    fn check_partition(cnf: &CnfFormula) -> Result<(), TestCaseError> {
        let formula = Formula::from_cnf(cnf);
        let mut ctx = context_for(&formula);
        let mut level = StackLevel::new(0, 1);
        level.include_solution(&BigUint::one());

        {
            let mut ctx = ctx.into_partial_ref_mut();
            record_remaining_comps_for(ctx.borrow(), &mut level)?;
        }

        let mut owner = vec![None; formula.var_count()];
        for index in 1..ctx.component_stack.len() {
            for var in ctx.component_stack[index].vars() {
                prop_assert_eq!(owner[var.index()], None);
                owner[var.index()] = Some(index);
            }
        }

        let trivial = owner.iter().filter(|owner| owner.is_none()).count();
        prop_assert_eq!(level.total_model_count(), BigUint::from(1u32) << trivial);

        for clause in cnf.iter() {
            let mut owners: Vec<_> = clause.iter().map(|lit| owner[lit.var().index()]).collect();
            owners.dedup();
            if clause.iter().any(|lit| clause.contains(&!*lit)) {
                continue;
            }
            let distinct_vars = {
                let mut vars: Vec<_> = clause.iter().map(|lit| lit.var()).collect();
                vars.sort();
                vars.dedup();
                vars.len()
            };
            if distinct_vars > 1 {
                prop_assert_eq!(owners.len(), 1);
                prop_assert!(owners[0].is_some());
            }
        }

        let mut clause_owner = vec![false; formula.long_count()];
        for index in 1..ctx.component_stack.len() {
            for clause in ctx.component_stack[index].clauses() {
                prop_assert!(!clause_owner[clause.index()]);
                clause_owner[clause.index()] = true;
            }
        }
        prop_assert!(clause_owner.iter().all(|&owned| owned));

        Ok(())
    }

    proptest! {
        #[test]
        fn components_partition_variables(cnf in cnf_formula(1..40usize, 0..40, 2..5)) {
            check_partition(&cnf)?;
        }

        #[test]
        fn blocks_are_separated(
            cnf in blocked_formula(2..6usize, 1..8usize, 0..10usize, 2..4usize),
        ) {
            check_partition(&cnf)?;
        }

        #[test]
        fn partial_assignments_split_consistently(
            cnf in cnf_formula(1..30usize, 0..40, 2..5),
            outer in collection::vec(any::<Option<bool>>(), 30),
            inner in collection::vec(any::<Option<bool>>(), 30),
        ) {
            let formula = Formula::from_cnf(&cnf);
            let mut ctx = context_for(&formula);

            for var in formula.vars() {
                if let Some(value) = outer[var.index()] {
                    ctx.assignment.assign_lit(var.lit(value));
                }
            }

            let mut level = StackLevel::new(0, 1);
            level.include_solution(&BigUint::one());
            {
                let mut ctx = ctx.into_partial_ref_mut();
                record_remaining_comps_for(ctx.borrow(), &mut level)?;
            }
            check_decomposition(&ctx, &formula, &level, 1)?;

            // Assign more variables of one component and decompose it again.
            if level.has_unprocessed_components() {
                let index = level.current_remaining_component();
                for var in ctx.component_stack[index].vars().to_vec() {
                    if let Some(value) = inner[var.index()] {
                        ctx.assignment.assign_lit(var.lit(value));
                    }
                }

                let start = ctx.component_stack.len();
                let mut nested = StackLevel::new(index, start);
                nested.include_solution(&BigUint::one());
                {
                    let mut ctx = ctx.into_partial_ref_mut();
                    record_remaining_comps_for(ctx.borrow(), &mut nested)?;
                }
                check_decomposition(&ctx, &formula, &nested, start)?;
            }
        }

        #[test]
        fn decomposition_is_deterministic(cnf in cnf_formula(1..30usize, 0..30, 2..5)) {
            let formula = Formula::from_cnf(&cnf);
            let mut ctx = context_for(&formula);

            let mut sets = vec![];
            for _ in 0..2 {
                let mut level = StackLevel::new(0, 1);
                {
                    let mut ctx = ctx.into_partial_ref_mut();
                    record_remaining_comps_for(ctx.borrow(), &mut level)?;
                }
                sets.push(var_sets(&ctx, 1));
                let mut ctx = ctx.into_partial_ref_mut();
                clean_remaining_components_of(ctx.borrow(), &level);
            }

            prop_assert_eq!(&sets[0], &sets[1]);
        }
    }
}
