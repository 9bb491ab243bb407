//! Search for the component containing a variable.
use partial_ref::{partial, PartialRef};

use num_bigint::BigUint;

use sharpvar_formula::Var;

use crate::context::{AdjacencyP, ArchetypeP, AssignmentP, ComponentStackP, Context, SearchP};
use crate::stack::StackLevel;

/// Worklist and variable frequency scores of the component search.
#[derive(Default)]
pub struct ComponentSearch {
    /// Variables found by the current search, in the order they were found.
    worklist: Vec<Var>,
    /// Number of clause links of each variable seen during the current pass.
    scores: Vec<u32>,
}

impl ComponentSearch {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.worklist.clear();
        self.scores.clear();
        self.scores.resize(count, 0);
    }

    /// Variables of the component found by the last search.
    pub fn worklist(&self) -> &[Var] {
        &self.worklist
    }

    /// Frequency score of a variable.
    ///
    /// Counts the binary and long clause links of the variable within the components found since
    /// the last setup of the analysis context.
    pub fn score_of(&self, var: Var) -> u32 {
        self.scores[var.index()]
    }
}

/// Bind the archetype to a super-component and mark its active parts as unseen.
///
/// Resets the frequency score of every active variable of the super-component.
pub fn setup_analysis_context(
    mut ctx: partial!(Context, mut ArchetypeP, mut SearchP, AssignmentP, ComponentStackP),
    super_component: usize,
) {
    let (search, mut ctx) = ctx.split_part_mut(SearchP);
    let (archetype, ctx) = ctx.split_part_mut(ArchetypeP);
    let assignment = ctx.part(AssignmentP);
    let component = &ctx.part(ComponentStackP)[super_component];

    archetype.re_initialize();

    for &var in component.vars() {
        if assignment.var_is_active(var) {
            archetype.set_var_unseen(var);
            search.scores[var.index()] = 0;
        }
    }

    for &clause in component.clauses() {
        archetype.set_clause_unseen(clause);
    }
}

/// Collect the component containing `seed` into the worklist.
///
/// Marks all reached variables and clauses as seen. Long clauses satisfied by a variable outside
/// the super-component are marked nil instead and all changes made while scanning them are undone.
pub fn record_component_of(
    mut ctx: partial!(Context, mut ArchetypeP, mut SearchP, AdjacencyP, AssignmentP),
    seed: Var,
) {
    let (search, mut ctx) = ctx.split_part_mut(SearchP);
    let (archetype, ctx) = ctx.split_part_mut(ArchetypeP);
    let adjacency = ctx.part(AdjacencyP);
    let assignment = ctx.part(AssignmentP);

    let worklist = &mut search.worklist;
    let scores = &mut search.scores;

    worklist.clear();
    worklist.push(seed);
    archetype.set_var_seen(seed);

    // The worklist grows while we process it.
    let mut position = 0;
    while position < worklist.len() {
        let var = worklist[position];
        position += 1;

        for &other in adjacency.binary_links(var) {
            if archetype.var_unseen(other) {
                archetype.set_var_seen(other);
                worklist.push(other);
                scores[var.index()] += 1;
                scores[other.index()] += 1;
            }
        }

        'clauses: for &clause in adjacency.occurrences(var) {
            if !archetype.clause_unseen(clause) {
                continue;
            }

            let satisfied_by_watch = adjacency
                .header(clause)
                .watched()
                .iter()
                .any(|&lit| archetype.var_nil(lit.var()) && assignment.lit_is_true(lit));

            if satisfied_by_watch {
                archetype.set_clause_nil(clause);
                continue;
            }

            let lits = adjacency.clause(clause);
            let rollback_len = worklist.len();
            let mut all_lits_active = true;

            for (scanned, &lit) in lits.iter().enumerate() {
                let lit_var = lit.var();
                if archetype.var_nil(lit_var) {
                    all_lits_active = false;
                    if assignment.lit_is_true(lit) {
                        // Nil variables never change state during a scan, so these are exactly
                        // the literals counted so far.
                        for &counted in lits[..scanned].iter() {
                            if !archetype.var_nil(counted.var()) {
                                scores[counted.var().index()] -= 1;
                            }
                        }
                        for &added in worklist[rollback_len..].iter() {
                            archetype.set_var_unseen(added);
                        }
                        worklist.truncate(rollback_len);
                        archetype.set_clause_nil(clause);
                        continue 'clauses;
                    }
                } else {
                    scores[lit_var.index()] += 1;
                    if archetype.var_unseen(lit_var) {
                        archetype.set_var_seen(lit_var);
                        worklist.push(lit_var);
                    }
                }
            }

            archetype.set_clause_seen(clause, all_lits_active);
            scores[var.index()] += 1;
        }
    }
}

/// Search the component of `seed`, handling isolated variables directly.
///
/// If `seed` turns out to be isolated it contributes a factor of two to the level's model count
/// and is moved out of the pass. Returns whether a component with more than one variable was
/// found, which is then left in the worklist.
pub fn explore_remaining_component_of(
    mut ctx: partial!(Context, mut ArchetypeP, mut SearchP, AdjacencyP, AssignmentP),
    level: &mut StackLevel,
    seed: Var,
) -> bool {
    record_component_of(ctx.borrow(), seed);

    if ctx.part(SearchP).worklist.len() == 1 {
        level.include_solution(&BigUint::from(2u32));
        ctx.part_mut(ArchetypeP).set_var_in_other_component(seed);
        false
    } else {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use sharpvar_formula::{ClauseId, CnfFormula, Formula};

    use crate::adjacency::AdjacencyIndex;
    use crate::archetype::{ClauseState, VarState};
    use crate::component::Component;
    use crate::context::set_counts;

    fn context_for(cnf: &CnfFormula) -> Box<Context> {
        let formula = Formula::from_cnf(cnf);
        let mut ctx = Box::new(Context::default());
        ctx.adjacency = AdjacencyIndex::build(&formula).unwrap();
        {
            let mut ctx = ctx.into_partial_ref_mut();
            set_counts(ctx.borrow(), formula.var_count(), formula.long_count());
        }
        let root = Component::new(formula.vars().collect(), ctx.adjacency.clause_ids().collect());
        ctx.component_stack.push(root);
        ctx
    }

    fn scores(ctx: &Context) -> Vec<u32> {
        ctx.adjacency
            .vars()
            .map(|var| ctx.search.score_of(var))
            .collect()
    }

    #[test]
    fn binary_clauses_form_two_components() {
        let mut ctx = context_for(&cnf_formula![
            1, 2;
            3, 4;
        ]);
        let mut ctx = ctx.into_partial_ref_mut();

        setup_analysis_context(ctx.borrow(), 0);

        record_component_of(ctx.borrow(), var!(1));
        assert_eq!(ctx.part(SearchP).worklist(), &vars![1, 2]);

        record_component_of(ctx.borrow(), var!(3));
        assert_eq!(ctx.part(SearchP).worklist(), &vars![3, 4]);

        for &var in vars![1, 2, 3, 4].iter() {
            assert_eq!(ctx.part(SearchP).score_of(var), 1);
        }
    }

    #[test]
    fn satisfied_clause_is_rolled_back() {
        let mut ctx = context_for(&cnf_formula![
            1, 2, 3;
        ]);
        ctx.assignment.assign_lit(lit!(3));

        let mut ctx_ref = ctx.into_partial_ref_mut();
        setup_analysis_context(ctx_ref.borrow(), 0);
        record_component_of(ctx_ref.borrow(), var!(1));

        assert_eq!(ctx.search.worklist(), &vars![1]);
        assert_eq!(ctx.archetype.var_state(var!(2)), VarState::Unseen);
        assert_eq!(ctx.archetype.var_state(var!(3)), VarState::Nil);
        assert_eq!(
            ctx.archetype.clause_state(ClauseId::from_id(1)),
            ClauseState::Nil
        );
        assert_eq!(scores(&ctx), vec![0, 0, 0]);
    }

    #[test]
    fn rollback_keeps_earlier_progress() {
        let mut ctx = context_for(&cnf_formula![
            1, 2, 3;
            1, 4, 5;
        ]);
        ctx.assignment.assign_lit(lit!(3));

        let mut ctx_ref = ctx.into_partial_ref_mut();
        setup_analysis_context(ctx_ref.borrow(), 0);
        record_component_of(ctx_ref.borrow(), var!(1));

        assert_eq!(ctx.search.worklist(), &vars![1, 4, 5]);
        assert_eq!(ctx.archetype.var_state(var!(2)), VarState::Unseen);
        assert_eq!(
            ctx.archetype.clause_state(ClauseId::from_id(2)),
            ClauseState::SeenAllActive
        );
        assert_eq!(scores(&ctx), vec![2, 0, 0, 1, 1]);
    }

    #[test]
    fn watched_true_literal_skips_scan() {
        let mut ctx = context_for(&cnf_formula![
            3, 1, 2;
        ]);
        ctx.assignment.assign_lit(lit!(3));

        let mut ctx_ref = ctx.into_partial_ref_mut();
        setup_analysis_context(ctx_ref.borrow(), 0);
        record_component_of(ctx_ref.borrow(), var!(1));

        assert_eq!(ctx.search.worklist(), &vars![1]);
        assert_eq!(ctx.archetype.var_state(var!(2)), VarState::Unseen);
        assert_eq!(
            ctx.archetype.clause_state(ClauseId::from_id(1)),
            ClauseState::Nil
        );
        assert_eq!(scores(&ctx), vec![0, 0, 0]);
    }

    #[test]
    fn false_literals_keep_clause_alive() {
        let mut ctx = context_for(&cnf_formula![
            1, -3, 2;
        ]);
        ctx.assignment.assign_lit(lit!(3));

        let mut ctx_ref = ctx.into_partial_ref_mut();
        setup_analysis_context(ctx_ref.borrow(), 0);
        record_component_of(ctx_ref.borrow(), var!(1));

        assert_eq!(ctx.search.worklist(), &vars![1, 2]);
        assert_eq!(
            ctx.archetype.clause_state(ClauseId::from_id(1)),
            ClauseState::Seen
        );
        assert_eq!(scores(&ctx), vec![2, 1, 0]);
    }

    #[test]
    fn isolated_variable_doubles_level_count() {
        let mut cnf = cnf_formula![
            1, 2;
        ];
        cnf.set_var_count(3);
        let mut ctx = context_for(&cnf);

        let mut level = StackLevel::new(0, 1);

        let mut ctx_ref = ctx.into_partial_ref_mut();
        setup_analysis_context(ctx_ref.borrow(), 0);

        assert!(!explore_remaining_component_of(
            ctx_ref.borrow(),
            &mut level,
            var!(3)
        ));
        assert!(explore_remaining_component_of(
            ctx_ref.borrow(),
            &mut level,
            var!(1)
        ));

        assert_eq!(
            ctx.archetype.var_state(var!(3)),
            VarState::InOtherComponent
        );
        assert_eq!(level.total_model_count(), BigUint::from(2u32));
    }
}
