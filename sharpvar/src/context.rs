//! Central data structure of the component core.
use partial_ref::{part, partial, PartialRef, PartialRefTarget};

use crate::adjacency::AdjacencyIndex;
use crate::archetype::Archetype;
use crate::assignment::Assignment;
use crate::cache::ComponentCache;
use crate::component::ComponentStack;
use crate::config::ComponentConfig;
use crate::search::ComponentSearch;

/// Part declarations for the [`Context`] struct.
pub mod parts {
    use super::*;

    part!(pub AdjacencyP: AdjacencyIndex);
    part!(pub ArchetypeP: Archetype);
    part!(pub AssignmentP: Assignment);
    part!(pub CacheP: ComponentCache);
    part!(pub ComponentStackP: ComponentStack);
    part!(pub ConfigP: ComponentConfig);
    part!(pub SearchP: ComponentSearch);
}

pub use parts::*;

/// Central data structure of the component core.
///
/// This struct contains all data kept between decomposition passes. Functions operating on multiple
/// fields of the context use partial references provided by the `partial_ref` crate. This documents
/// the data dependencies and makes the borrow checker happy without the overhead of passing
/// individual references.
#[derive(PartialRefTarget, Default)]
pub struct Context {
    #[part(AdjacencyP)]
    pub adjacency: AdjacencyIndex,
    #[part(ArchetypeP)]
    pub archetype: Archetype,
    #[part(AssignmentP)]
    pub assignment: Assignment,
    #[part(CacheP)]
    pub cache: ComponentCache,
    #[part(ComponentStackP)]
    pub component_stack: ComponentStack,
    #[part(ConfigP)]
    pub config: ComponentConfig,
    #[part(SearchP)]
    pub search: ComponentSearch,
}

/// Update structures for new variable and long clause counts.
///
/// All per-variable and per-clause state is reset.
pub fn set_counts(
    mut ctx: partial!(Context, mut ArchetypeP, mut AssignmentP, mut SearchP),
    var_count: usize,
    clause_count: usize,
) {
    ctx.part_mut(ArchetypeP).set_counts(var_count, clause_count);
    ctx.part_mut(AssignmentP).set_var_count(var_count);
    ctx.part_mut(SearchP).set_var_count(var_count);
}
