//! Bit packed component keys.
//!
//! A component is identified in the cache by its sorted variable and clause ids, written with a
//! fixed number of bits per value. The widths are derived once from the largest ids of the loaded
//! formula.
use thiserror::Error;

use sharpvar_formula::{ClauseId, Var};

use crate::component::Component;

const WORD_BITS: u32 = 32;

/// Errors while packing or unpacking component keys.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PackError {
    #[error("Value {value} does not fit into {bits} bits")]
    ValueTooWide { value: u32, bits: u32 },
    #[error("Unexpected end of packed data")]
    UnexpectedEnd,
    #[error("Packed data contains the invalid id {value}")]
    InvalidId { value: u32 },
    #[error(
        "Too many variables ({max_variable_id}) and clauses ({max_clause_id}) for packed components"
    )]
    TooManyIds {
        max_variable_id: usize,
        max_clause_id: usize,
    },
}

/// Number of bits needed to store values up to `max`.
fn bits_for(max: u64) -> u32 {
    64 - max.leading_zeros()
}

/// Field widths used for all packed components of a formula.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PackingScheme {
    bits_per_variable: u32,
    bits_per_clause: u32,
    bits_of_data_size: u32,
}

impl PackingScheme {
    /// Widths for a formula with the given largest ids.
    ///
    /// Fails if the total number of ids doesn't fit into a word.
    pub fn new(max_variable_id: usize, max_clause_id: usize) -> Result<PackingScheme, PackError> {
        let scheme = PackingScheme {
            bits_per_variable: bits_for(max_variable_id as u64),
            bits_per_clause: bits_for(max_clause_id as u64),
            bits_of_data_size: bits_for(max_variable_id as u64 + max_clause_id as u64),
        };
        if scheme.bits_of_data_size > WORD_BITS {
            return Err(PackError::TooManyIds {
                max_variable_id,
                max_clause_id,
            });
        }
        Ok(scheme)
    }

    pub fn bits_per_variable(&self) -> u32 {
        self.bits_per_variable
    }

    pub fn bits_per_clause(&self) -> u32 {
        self.bits_per_clause
    }

    pub fn bits_of_data_size(&self) -> u32 {
        self.bits_of_data_size
    }
}

/// Appends fixed width values to a word buffer, least significant bits first.
#[derive(Default)]
pub struct BitWriter {
    words: Vec<u32>,
    /// Bits used in the last word, 0 if it is full.
    end_of_bits: u32,
}

impl BitWriter {
    pub fn new() -> BitWriter {
        BitWriter::default()
    }

    /// Append `value` using `bits` bits.
    pub fn write(&mut self, value: u32, bits: u32) -> Result<(), PackError> {
        debug_assert!(bits <= WORD_BITS);
        if bits < WORD_BITS && value >> bits != 0 {
            return Err(PackError::ValueTooWide { value, bits });
        }
        if bits == 0 {
            return Ok(());
        }

        if self.end_of_bits == 0 {
            self.words.push(0);
        }
        let last = self.words.len() - 1;
        self.words[last] |= value << self.end_of_bits;

        let end = self.end_of_bits + bits;
        if end > WORD_BITS {
            let written = WORD_BITS - self.end_of_bits;
            self.words.push(value >> written);
            self.end_of_bits = end - WORD_BITS;
        } else {
            self.end_of_bits = end % WORD_BITS;
        }
        Ok(())
    }

    /// The written words, the last one padded with zeros.
    pub fn finish(self) -> Vec<u32> {
        self.words
    }
}

/// Reads fixed width values written by a [`BitWriter`].
pub struct BitReader<'a> {
    words: &'a [u32],
    position: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(words: &'a [u32]) -> BitReader<'a> {
        BitReader { words, position: 0 }
    }

    /// Read the next value of width `bits`.
    pub fn read(&mut self, bits: u32) -> Result<u32, PackError> {
        debug_assert!(bits <= WORD_BITS);
        if bits == 0 {
            return Ok(0);
        }
        if self.position + bits as usize > self.words.len() * WORD_BITS as usize {
            return Err(PackError::UnexpectedEnd);
        }

        let word = self.position / WORD_BITS as usize;
        let offset = (self.position % WORD_BITS as usize) as u32;

        let mut value = self.words[word] >> offset;
        let taken = WORD_BITS - offset;
        if taken < bits {
            value |= self.words[word + 1] << taken;
        }
        if bits < WORD_BITS {
            value &= (1 << bits) - 1;
        }

        self.position += bits as usize;
        Ok(value)
    }
}

/// Cache key of a component.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackedComponent {
    words: Vec<u32>,
    hash: u32,
}

impl PackedComponent {
    /// Pack the variable and clause ids of a component.
    ///
    /// The ids are sorted first, so the key only depends on the sets of ids.
    pub fn encode(
        scheme: &PackingScheme,
        component: &Component,
    ) -> Result<PackedComponent, PackError> {
        let mut vars: Vec<u32> = component.vars().iter().map(|var| var.id() as u32).collect();
        let mut clauses: Vec<u32> = component
            .clauses()
            .iter()
            .map(|clause| clause.id() as u32)
            .collect();
        vars.sort_unstable();
        clauses.sort_unstable();

        let mut writer = BitWriter::new();
        writer.write(vars.len() as u32, scheme.bits_of_data_size)?;
        writer.write(clauses.len() as u32, scheme.bits_of_data_size)?;

        let mut hash_vars = 0u32;
        for &var in vars.iter() {
            writer.write(var, scheme.bits_per_variable)?;
            hash_vars = hash_vars.wrapping_mul(3).wrapping_add(var);
        }

        let mut hash_clauses = 0u32;
        for &clause in clauses.iter() {
            writer.write(clause, scheme.bits_per_clause)?;
            hash_clauses = hash_clauses.wrapping_mul(3).wrapping_add(clause);
        }

        let hash = hash_vars
            .wrapping_add(hash_clauses << 11)
            .wrapping_add(hash_clauses >> 21);

        Ok(PackedComponent {
            words: writer.finish(),
            hash,
        })
    }

    /// Unpack the sorted variable and clause ids.
    pub fn decode(&self, scheme: &PackingScheme) -> Result<Component, PackError> {
        let mut reader = BitReader::new(&self.words);
        let var_count = reader.read(scheme.bits_of_data_size)?;
        let clause_count = reader.read(scheme.bits_of_data_size)?;

        let mut vars = Vec::with_capacity(var_count as usize);
        for _ in 0..var_count {
            let value = reader.read(scheme.bits_per_variable)?;
            if value == 0 {
                return Err(PackError::InvalidId { value });
            }
            vars.push(Var::from_id(value as usize));
        }

        let mut clauses = Vec::with_capacity(clause_count as usize);
        for _ in 0..clause_count {
            let value = reader.read(scheme.bits_per_clause)?;
            if value == 0 {
                return Err(PackError::InvalidId { value });
            }
            clauses.push(ClauseId::from_id(value as usize));
        }

        Ok(Component::new(vars, clauses))
    }

    pub fn hash(&self) -> u32 {
        self.hash
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Heap memory used by the packed data.
    pub fn byte_size(&self) -> usize {
        self.words.len() * std::mem::size_of::<u32>()
    }
}
