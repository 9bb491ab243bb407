//! Sharpvar is the component decomposition and component caching core of a [#SAT][sharp-sat]
//! model counter.
//!
//! A model counting search assigns variables and asks the [`ComponentManager`] to split the
//! remaining formula into independent [components][Component]. The model count of a formula is the
//! product of the model counts of its components. Counts of solved components are kept in a cache
//! keyed by a compact bit packed encoding of the component, so that a component reappearing under
//! a different assignment doesn't need to be counted again.
//!
//! [sharp-sat]: https://en.wikipedia.org/wiki/Sharp-SAT

#[cfg(test)]
#[macro_use]
extern crate sharpvar_formula;

pub mod cache;
pub mod component;
pub mod config;
pub mod manager;
pub mod pack;
pub mod stack;

mod adjacency;
mod archetype;
mod assignment;
mod context;
mod decompose;
mod search;


pub use sharpvar_formula::{cnf, lit, ClauseId, CnfFormula, Formula, Lit, Var};

pub use cache::{CacheEntryId, CacheStatistics, ComponentCache};
pub use component::Component;
pub use config::{ComponentConfig, ComponentConfigUpdate};
pub use manager::{ComponentError, ComponentManager};
pub use pack::{PackError, PackedComponent, PackingScheme};
pub use stack::StackLevel;
