//! Clause allocator.
use std::mem::transmute;
use std::slice;

use glimsat_formula::lit::LitIdx;
use glimsat_formula::Lit;

use super::{Clause, ClauseHeader, HEADER_LEN};

/// Integer type used to store offsets into the [`ClauseAlloc`] buffer.
type ClauseOffset = u32;

/// Bump allocator for clause storage.
///
/// All clauses live in a single contiguous buffer of [`LitIdx`] words. Individual clauses cannot
/// be freed; deallocation just sets the deleted flag in the clause header. Space is reclaimed by
/// copying the remaining clauses into a fresh `ClauseAlloc` (see
/// [`collect_garbage`](super::gc::collect_garbage)).
///
/// When the buffer is full it is reallocated with the growing strategy of [`Vec`]. External
/// references ([`ClauseRef`]) are offsets into the buffer, not addresses, so they stay valid when
/// the buffer moves.
///
/// **Safety**: using the safe methods is memory safe even when clause storage invariants are
/// violated, e.g. when a `ClauseRef` of a different allocator is passed. Code in this crate may
/// rely on such invariants for correctness, but never for memory safety.
#[derive(Default)]
pub struct ClauseAlloc {
    buffer: Vec<LitIdx>,
}

impl ClauseAlloc {
    /// Create an empty clause allocator.
    pub fn new() -> ClauseAlloc {
        ClauseAlloc::default()
    }

    /// Create a clause allocator with preallocated capacity.
    pub fn with_capacity(capacity: usize) -> ClauseAlloc {
        ClauseAlloc {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Allocate space for and add a new clause.
    ///
    /// Clauses have a minimal size of 3, as unit and binary clauses are represented implicitly.
    /// This is enforced at the allocator level so accesses to the first literals of a clause need
    /// no extra bound checks.
    ///
    /// The length field of the header is set to the size of the given slice. The returned
    /// [`ClauseRef`] can be used to access the new clause.
    pub fn add_clause(&mut self, mut header: ClauseHeader, lits: &[Lit]) -> ClauseRef {
        let offset = self.buffer.len();

        assert!(
            lits.len() >= 3,
            "ClauseAlloc can only store ternary and larger clauses"
        );

        assert!(
            offset <= (ClauseOffset::max_value() as usize),
            "Exceeded ClauseAlloc's maximal buffer size"
        );

        header.set_len(lits.len());

        self.buffer.extend_from_slice(&header.data);

        let lit_idx_slice = unsafe {
            // This is safe as Lit and LitIdx have the same representation
            slice::from_raw_parts(lits.as_ptr() as *const LitIdx, lits.len())
        };

        self.buffer.extend_from_slice(lit_idx_slice);

        ClauseRef {
            offset: offset as ClauseOffset,
        }
    }

    /// Access the header of a clause.
    pub fn header(&self, cref: ClauseRef) -> &ClauseHeader {
        let offset = cref.offset as usize;
        assert!(
            offset + HEADER_LEN <= self.buffer.len(),
            "ClauseRef out of bounds"
        );
        unsafe {
            let header_ptr = self.buffer.as_ptr().add(offset) as *const ClauseHeader;
            &*header_ptr
        }
    }

    /// Mutate the header of a clause.
    pub fn header_mut(&mut self, cref: ClauseRef) -> &mut ClauseHeader {
        let offset = cref.offset as usize;
        assert!(
            offset + HEADER_LEN <= self.buffer.len(),
            "ClauseRef out of bounds"
        );
        unsafe {
            let header_ptr = self.buffer.as_mut_ptr().add(offset) as *mut ClauseHeader;
            &mut *header_ptr
        }
    }

    /// Access a clause.
    pub fn clause(&self, cref: ClauseRef) -> &Clause {
        let len = self.header(cref).len();

        let offset = cref.offset as usize;
        let end = offset + HEADER_LEN + len;
        assert!(end <= self.buffer.len(), "ClauseRef out of bounds");
        unsafe {
            transmute::<&[LitIdx], &Clause>(slice::from_raw_parts(
                self.buffer.as_ptr().add(offset),
                len + HEADER_LEN,
            ))
        }
    }

    /// Mutate a clause.
    pub fn clause_mut(&mut self, cref: ClauseRef) -> &mut Clause {
        let len = self.header(cref).len();

        let offset = cref.offset as usize;
        let end = offset + HEADER_LEN + len;
        assert!(end <= self.buffer.len(), "ClauseRef out of bounds");
        unsafe {
            transmute::<&mut [LitIdx], &mut Clause>(slice::from_raw_parts_mut(
                self.buffer.as_mut_ptr().add(offset),
                len + HEADER_LEN,
            ))
        }
    }

    /// Current buffer size in multiples of [`LitIdx`].
    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }
}

/// Compact reference to a clause.
///
/// Used with a [`ClauseAlloc`] to access the clause.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub struct ClauseRef {
    offset: ClauseOffset,
}

#[cfg(test)]
mod tests {
    use super::*;

    use glimsat_formula::{cnf::strategy::*, CnfFormula};

    use proptest::*;

    proptest! {
        #[test]
        fn roundtrip_from_cnf_formula(input in cnf_formula(1..100usize, 0..1000, 3..30)) {

            let mut clause_alloc = ClauseAlloc::new();
            let mut clause_refs = vec![];

            for clause_lits in input.iter() {
                let header = ClauseHeader::new();
                clause_refs.push(clause_alloc.add_clause(header, clause_lits));
            }

            let mut recovered = CnfFormula::new();

            for cref in clause_refs {
                let clause = clause_alloc.clause(cref);
                prop_assert_eq!(clause.header().len(), clause.lits().len());
                recovered.add_clause(clause.lits());
            }

            // Ignore difference caused by unused vars
            recovered.set_var_count(input.var_count());

            prop_assert_eq!(input, recovered);
        }

        #[test]
        fn clause_mutation(input in cnf_formula(1..100usize, 0..1000, 3..30)) {

            let mut clause_alloc = ClauseAlloc::new();
            let mut clause_refs = vec![];

            for clause_lits in input.iter() {
                let header = ClauseHeader::new();
                clause_refs.push(clause_alloc.add_clause(header, clause_lits));
            }

            for &cref in clause_refs.iter() {
                let clause = clause_alloc.clause_mut(cref);
                clause.lits_mut().reverse();
            }

            for &cref in clause_refs.iter() {
                let clause_len = clause_alloc.clause(cref).lits().len();
                if clause_len > 3 {
                    clause_alloc.header_mut(cref).set_len(clause_len - 1);
                }
            }

            for (&cref, lits) in clause_refs.iter().zip(input.iter()) {
                let expected = if lits.len() > 3 {
                    lits[1..].iter().rev()
                } else {
                    lits.iter().rev()
                };
                prop_assert!(clause_alloc.clause(cref).lits().iter().eq(expected));
            }
        }
    }
}
