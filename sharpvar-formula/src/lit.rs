//! Variables, literals and clause ids.
//!
//! Variables and clauses are identified by dense 1-based ids. The id 0 is reserved as the "no more
//! entries" value. It is never a valid id, which lets `Option<Var>` and `Option<ClauseId>` take
//! no more space than the ids themselves.
use std::num::NonZeroU32;
use std::{fmt, ops};

/// The backing type used to represent ids and literal codes.
pub type LitIdx = u32;

/// A boolean variable.
///
/// The id of a variable is the positive number denoting it in the DIMACS CNF format.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Var {
    id: NonZeroU32,
}

impl Var {
    /// Creates a variable from its 1-based id.
    ///
    /// Panics for the reserved id 0 and for ids past `Var::max_id()`.
    #[inline]
    pub fn from_id(id: usize) -> Var {
        assert!(id <= Var::max_id(), "variable id {} is too large", id);
        match NonZeroU32::new(id as LitIdx) {
            Some(id) => Var { id },
            None => panic!("variable id 0 is reserved"),
        }
    }

    /// Creates a variable from a 0-based index, i.e. the variable with id `index + 1`.
    #[inline]
    pub fn from_index(index: usize) -> Var {
        Var::from_id(index + 1)
    }

    /// Creates a variable from a DIMACS number. Same as [`Var::from_id`].
    #[inline]
    pub fn from_dimacs(number: isize) -> Var {
        debug_assert!(number > 0);
        Var::from_id(number as usize)
    }

    /// The 1-based id of this variable.
    #[inline]
    pub fn id(self) -> usize {
        self.id.get() as usize
    }

    /// The 0-based index of this variable.
    #[inline]
    pub fn index(self) -> usize {
        self.id() - 1
    }

    /// The DIMACS number of this variable.
    #[inline]
    pub fn to_dimacs(self) -> isize {
        self.id() as isize
    }

    /// The largest supported variable id.
    ///
    /// Two bits of the backing type stay free, so a literal code of any variable fits.
    pub const fn max_id() -> usize {
        (LitIdx::max_value() >> 2) as usize
    }

    /// The literal of this variable with the given polarity (`true` is positive).
    #[inline]
    pub fn lit(self, polarity: bool) -> Lit {
        Lit::from_var(self, polarity)
    }

    /// The positive literal of this variable.
    #[inline]
    pub fn positive(self) -> Lit {
        Lit::from_var(self, true)
    }

    /// The negative literal of this variable.
    #[inline]
    pub fn negative(self) -> Lit {
        Lit::from_var(self, false)
    }
}

impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A boolean literal, a variable or its negation.
///
/// Represented by its code: twice the variable id, plus one for negative literals. Codes 0 and 1
/// are never used, so vectors indexed by literal code have `2 * (max_id + 1)` entries.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Lit {
    code: LitIdx,
}

impl Lit {
    /// Creates a literal from a variable and a polarity (`true` is positive).
    #[inline]
    pub fn from_var(var: Var, polarity: bool) -> Lit {
        Lit {
            code: (var.id.get() << 1) | (!polarity as LitIdx),
        }
    }

    /// Creates a literal from its code.
    #[inline]
    pub fn from_code(code: usize) -> Lit {
        assert!(code >= 2, "literal code {} does not denote a variable", code);
        debug_assert!(code >> 1 <= Var::max_id());
        Lit {
            code: code as LitIdx,
        }
    }

    /// Creates a literal from a non-zero DIMACS number.
    #[inline]
    pub fn from_dimacs(number: isize) -> Lit {
        Lit::from_var(Var::from_dimacs(number.abs()), number > 0)
    }

    /// The DIMACS number of this literal.
    #[inline]
    pub fn to_dimacs(self) -> isize {
        let number = self.var().to_dimacs();
        if self.is_negative() {
            -number
        } else {
            number
        }
    }

    /// The literal's variable.
    #[inline]
    pub fn var(self) -> Var {
        Var::from_id((self.code >> 1) as usize)
    }

    /// Whether this is a negated variable.
    #[inline]
    pub fn is_negative(self) -> bool {
        self.code & 1 != 0
    }

    /// Whether this is a non-negated variable.
    #[inline]
    pub fn is_positive(self) -> bool {
        !self.is_negative()
    }

    /// The code of this literal.
    #[inline]
    pub fn code(self) -> usize {
        self.code as usize
    }
}

impl ops::Not for Lit {
    type Output = Lit;

    #[inline]
    fn not(self) -> Lit {
        Lit {
            code: self.code ^ 1,
        }
    }
}

impl ops::BitXor<bool> for Lit {
    type Output = Lit;

    #[inline]
    fn bitxor(self, rhs: bool) -> Lit {
        Lit {
            code: self.code ^ (rhs as LitIdx),
        }
    }
}

impl From<Var> for Lit {
    #[inline]
    fn from(var: Var) -> Lit {
        var.positive()
    }
}

impl fmt::Debug for Lit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_dimacs())
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Id of a long clause.
///
/// Long clause ids are assigned densely, starting at 1, in the order the clauses are loaded. They
/// are independent of where a clause's literals are stored.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ClauseId {
    id: NonZeroU32,
}

impl ClauseId {
    /// Creates a clause id from its 1-based value.
    #[inline]
    pub fn from_id(id: usize) -> ClauseId {
        assert!(id <= LitIdx::max_value() as usize, "clause id {} is too large", id);
        match NonZeroU32::new(id as LitIdx) {
            Some(id) => ClauseId { id },
            None => panic!("clause id 0 is reserved"),
        }
    }

    /// Creates the clause id for a 0-based clause index.
    #[inline]
    pub fn from_index(index: usize) -> ClauseId {
        ClauseId::from_id(index + 1)
    }

    /// The 1-based value of this id.
    #[inline]
    pub fn id(self) -> usize {
        self.id.get() as usize
    }

    /// The 0-based index of this clause.
    #[inline]
    pub fn index(self) -> usize {
        self.id() - 1
    }
}

impl fmt::Debug for ClauseId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "c{}", self.id)
    }
}

impl fmt::Display for ClauseId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(any(test, feature = "proptest-strategies"))]
#[doc(hidden)]
pub mod strategy {
    use super::*;
    use proptest::{prelude::*, *};

    /// Variables with ids in the given 1-based range.
    pub fn var(id: impl Strategy<Value = usize>) -> impl Strategy<Value = Var> {
        id.prop_map(Var::from_id)
    }

    pub fn lit(id: impl Strategy<Value = usize>) -> impl Strategy<Value = Lit> {
        (var(id), bool::ANY).prop_map(|(var, polarity)| var.lit(polarity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_one_based() {
        let var = Var::from_index(0);
        assert_eq!(var.id(), 1);
        assert_eq!(var.index(), 0);
        assert_eq!(var, var!(1));
        assert_eq!(ClauseId::from_index(4).id(), 5);
    }

    #[test]
    fn literal_codes() {
        let lit = lit!(-3);
        assert_eq!(lit.code(), 7);
        assert_eq!(lit.var(), var!(3));
        assert!(lit.is_negative());
        assert_eq!(!lit, lit!(3));
        assert_eq!(Lit::from_code(6), lit!(3));
        assert_eq!(lit ^ true, lit!(3));
        assert_eq!(lit ^ false, lit);
    }

    #[test]
    fn option_is_free() {
        assert_eq!(
            std::mem::size_of::<Option<Var>>(),
            std::mem::size_of::<LitIdx>()
        );
        assert_eq!(
            std::mem::size_of::<Option<ClauseId>>(),
            std::mem::size_of::<LitIdx>()
        );
    }

    #[test]
    #[should_panic(expected = "reserved")]
    fn zero_is_reserved() {
        Var::from_id(0);
    }
}
