//! Variable adjacency through binary and long clauses.
//!
//! For every variable the index keeps one record listing the variables it shares a binary clause
//! with, followed by the long clauses it occurs in. Records are stored back to back in two typed
//! pools, one for each kind of link, so traversing all links of a variable touches two contiguous
//! chunks of memory.
use log::info;

use sharpvar_formula::lit::LitIdx;
use sharpvar_formula::{ClauseId, Formula, Lit, Var};

use crate::manager::ComponentError;

/// Metadata of a long clause in the clause pool.
#[derive(Copy, Clone, Debug)]
pub struct ClauseHeader {
    offset: LitIdx,
    len: LitIdx,
    watched: [Lit; 2],
}

impl ClauseHeader {
    /// Position of the clause's first literal in the literal pool.
    pub fn offset(&self) -> usize {
        self.offset as usize
    }

    /// Number of literals.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// The two watched literals, these are the first two literals of the clause.
    pub fn watched(&self) -> [Lit; 2] {
        self.watched
    }
}

/// Start of a variable's record in both link pools.
///
/// A record ends where the record of the next variable starts.
#[derive(Copy, Clone, Default, Debug)]
struct LinkRecord {
    binary_start: LitIdx,
    occurrence_start: LitIdx,
}

/// Pools are addressed using [`LitIdx`] offsets.
fn check_pool_size(len: usize) -> Result<(), ComponentError> {
    let max = LitIdx::max_value() as usize;
    if len > max {
        Err(ComponentError::ClausePoolTooLarge { len, max })
    } else {
        Ok(())
    }
}

/// Binary links and long clause occurrences of all variables.
#[derive(Default)]
pub struct AdjacencyIndex {
    /// One record per variable index plus a final end marker.
    records: Vec<LinkRecord>,
    binary_pool: Vec<Var>,
    occurrence_pool: Vec<ClauseId>,
    clause_literals: Vec<Lit>,
    clause_headers: Vec<ClauseHeader>,
}

impl AdjacencyIndex {
    /// Build the index for a formula.
    pub fn build(formula: &Formula) -> Result<AdjacencyIndex, ComponentError> {
        let var_count = formula.var_count();

        check_pool_size(formula.long_literal_count())?;
        check_pool_size(formula.binary_count() * 2)?;

        let mut binary_counts = vec![0usize; var_count];
        let mut occurrence_counts = vec![0usize; var_count];

        for var in formula.vars() {
            for &polarity in [false, true].iter() {
                binary_counts[var.index()] += formula.binary_links(var.lit(polarity)).len();
            }
        }

        let mut clause_literals = Vec::with_capacity(formula.long_literal_count());
        let mut clause_headers = Vec::with_capacity(formula.long_count());

        for (id, lits) in formula.long_clauses() {
            debug_assert_eq!(id.index(), clause_headers.len());
            clause_headers.push(ClauseHeader {
                offset: clause_literals.len() as LitIdx,
                len: lits.len() as LitIdx,
                watched: [lits[0], lits[1]],
            });
            clause_literals.extend_from_slice(lits);
            for &lit in lits {
                occurrence_counts[lit.var().index()] += 1;
            }
        }

        let mut records = Vec::with_capacity(var_count + 1);
        let mut binary_start = 0;
        let mut occurrence_start = 0;
        for index in 0..var_count {
            records.push(LinkRecord {
                binary_start: binary_start as LitIdx,
                occurrence_start: occurrence_start as LitIdx,
            });
            binary_start += binary_counts[index];
            occurrence_start += occurrence_counts[index];
        }
        records.push(LinkRecord {
            binary_start: binary_start as LitIdx,
            occurrence_start: occurrence_start as LitIdx,
        });

        let mut binary_pool = Vec::with_capacity(binary_start);
        for var in formula.vars() {
            for &polarity in [false, true].iter() {
                binary_pool.extend(formula.binary_links(var.lit(polarity)).iter().map(|l| l.var()));
            }
        }

        // Fill occurrence records front to back, reusing the counts as insertion positions.
        let mut occurrence_pool = vec![ClauseId::from_id(1); occurrence_start];
        for (index, count) in occurrence_counts.iter_mut().enumerate() {
            *count = records[index].occurrence_start as usize;
        }
        for (id, lits) in formula.long_clauses() {
            for &lit in lits {
                let position = &mut occurrence_counts[lit.var().index()];
                occurrence_pool[*position] = id;
                *position += 1;
            }
        }

        info!(
            "Indexed {} variables, {} binary clauses and {} long clauses",
            var_count,
            formula.binary_count(),
            clause_headers.len()
        );

        Ok(AdjacencyIndex {
            records,
            binary_pool,
            occurrence_pool,
            clause_literals,
            clause_headers,
        })
    }

    /// Largest variable id, equal to the number of variables.
    pub fn max_variable_id(&self) -> usize {
        self.records.len().saturating_sub(1)
    }

    /// Largest long clause id, equal to the number of long clauses.
    pub fn max_clause_id(&self) -> usize {
        self.clause_headers.len()
    }

    /// Variables sharing a binary clause with `var`.
    ///
    /// A variable is listed once per binary clause.
    pub fn binary_links(&self, var: Var) -> &[Var] {
        let start = self.records[var.index()].binary_start as usize;
        let end = self.records[var.index() + 1].binary_start as usize;
        &self.binary_pool[start..end]
    }

    /// Long clauses containing `var`, in increasing id order.
    pub fn occurrences(&self, var: Var) -> &[ClauseId] {
        let start = self.records[var.index()].occurrence_start as usize;
        let end = self.records[var.index() + 1].occurrence_start as usize;
        &self.occurrence_pool[start..end]
    }

    /// Metadata of a long clause.
    pub fn header(&self, clause: ClauseId) -> &ClauseHeader {
        &self.clause_headers[clause.index()]
    }

    /// Literals of a long clause.
    pub fn clause(&self, clause: ClauseId) -> &[Lit] {
        let header = self.header(clause);
        &self.clause_literals[header.offset()..][..header.len()]
    }

    /// All variables in increasing order.
    pub fn vars(&self) -> impl Iterator<Item = Var> {
        (1..=self.max_variable_id()).map(Var::from_id)
    }

    /// All long clause ids in increasing order.
    pub fn clause_ids(&self) -> impl Iterator<Item = ClauseId> {
        (1..=self.max_clause_id()).map(ClauseId::from_id)
    }
}
