//! Database for long clauses.
use partial_ref::{partial, PartialRef};

use glimsat_formula::Lit;

use crate::context::{
    BinaryClausesP, ClauseAllocP, ClauseDbP, Context, ProofP, TmpDataP, WatchlistsP,
};
use crate::proof::ProofStep;

use super::{ClauseAlloc, ClauseHeader, ClauseRef, HEADER_LEN};

/// Database for long clauses.
///
/// Deletion from the `clauses` field can be delayed, so the deleted flag of the header needs to
/// be checked when iterating. The clause counts are always up to date.
#[derive(Default)]
pub struct ClauseDb {
    /// May contain deleted clauses, see above.
    pub(super) clauses: Vec<ClauseRef>,
    /// Number of live irredundant clauses.
    pub(super) irredundant_count: usize,
    /// Number of live redundant clauses.
    pub(super) redundant_count: usize,
    /// Size of deleted but not yet collected clauses.
    pub(super) garbage_size: usize,
}

impl ClauseDb {
    /// The number of live irredundant clauses.
    pub fn irredundant_count(&self) -> usize {
        self.irredundant_count
    }

    /// The number of live redundant clauses.
    pub fn redundant_count(&self) -> usize {
        self.redundant_count
    }

    /// The long clauses of the database, including not yet collected deleted clauses.
    pub fn clauses(&self) -> &[ClauseRef] {
        &self.clauses
    }
}

/// Add a long clause to the database.
///
/// The first two literals become the watched literals.
pub fn add_clause(
    mut ctx: partial!(Context, mut ClauseAllocP, mut ClauseDbP, mut WatchlistsP),
    header: ClauseHeader,
    lits: &[Lit],
) -> ClauseRef {
    let redundant = header.redundant();

    let cref = ctx.part_mut(ClauseAllocP).add_clause(header, lits);

    let db = ctx.part_mut(ClauseDbP);
    db.clauses.push(cref);
    if redundant {
        db.redundant_count += 1;
    } else {
        db.irredundant_count += 1;
    }

    let watchlists = ctx.part_mut(WatchlistsP);
    if watchlists.enabled() {
        watchlists.watch_clause(cref, [lits[0], lits[1]]);
    }

    cref
}

/// Delete a long clause from the database.
///
/// The clause memory is reclaimed during the next garbage collection. The watchlists are
/// invalidated and rebuilt before the next propagation.
pub fn delete_clause<'a>(
    mut ctx: partial!(
        Context<'a>,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ProofP<'a>,
        mut WatchlistsP,
    ),
    cref: ClauseRef,
) {
    {
        let (alloc, mut ctx) = ctx.split_part_mut(ClauseAllocP);

        let clause = alloc.clause_mut(cref);

        debug_assert!(
            !clause.header().deleted(),
            "delete_clause for already deleted clause"
        );

        ctx.part_mut(ProofP).add_step(&ProofStep::DeleteClause {
            clause: clause.lits(),
        });

        let header = clause.header_mut();
        header.set_deleted(true);

        let db = ctx.part_mut(ClauseDbP);
        if header.redundant() {
            db.redundant_count -= 1;
        } else {
            db.irredundant_count -= 1;
        }
        db.garbage_size += header.len() + HEADER_LEN;
    }

    ctx.part_mut(WatchlistsP).disable();
}

/// Run a filter over all live clauses, deleting every clause for which it returns `false`.
///
/// The filter may shrink the clause in place. Proof steps and watchlist invalidation are the
/// caller's responsibility.
pub fn filter_clauses(
    mut ctx: partial!(Context, mut ClauseAllocP, mut ClauseDbP),
    mut filter: impl FnMut(&mut ClauseAlloc, ClauseRef) -> bool,
) {
    let (db, mut ctx) = ctx.split_part_mut(ClauseDbP);
    let alloc = ctx.part_mut(ClauseAllocP);

    let mut garbage_size = 0;
    let mut deleted_irredundant = 0;
    let mut deleted_redundant = 0;

    db.clauses.retain(|&cref| {
        if alloc.header(cref).deleted() {
            return false;
        }
        if filter(alloc, cref) {
            true
        } else {
            let header = alloc.header_mut(cref);
            header.set_deleted(true);
            if header.redundant() {
                deleted_redundant += 1;
            } else {
                deleted_irredundant += 1;
            }
            garbage_size += header.len() + HEADER_LEN;
            false
        }
    });

    db.garbage_size += garbage_size;
    db.irredundant_count -= deleted_irredundant;
    db.redundant_count -= deleted_redundant;
}

/// Create a copy of a clause with one literal removed and delete the original.
///
/// The glue of the new clause is capped at one less than its size. Returns `None` when the
/// shortened clause became binary and moved to the implicit binary storage. Callers must ensure
/// the removed literal cannot satisfy the clause.
pub fn strengthen_clause<'a>(
    mut ctx: partial!(
        Context<'a>,
        mut BinaryClausesP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ProofP<'a>,
        mut TmpDataP,
        mut WatchlistsP,
    ),
    cref: ClauseRef,
    omit: Lit,
) -> Option<ClauseRef> {
    let (tmp, mut ctx) = ctx.split_part_mut(TmpDataP);

    let glue;
    {
        let clause = ctx.part(ClauseAllocP).clause(cref);
        debug_assert!(clause.lits().contains(&omit));
        glue = clause.header().glue();
        tmp.lits.clear();
        tmp.lits
            .extend(clause.lits().iter().cloned().filter(|&lit| lit != omit));
    }
    let lits = &tmp.lits[..];

    ctx.part_mut(ProofP)
        .add_step(&ProofStep::AddClause { clause: lits });

    let new_cref = if lits.len() == 2 {
        ctx.part_mut(BinaryClausesP)
            .add_binary_clause([lits[0], lits[1]]);
        None
    } else {
        let mut header = ClauseHeader::new();
        header.set_redundant(ctx.part(ClauseAllocP).header(cref).redundant());
        header.set_glue(glue.min(lits.len() - 1));
        Some(add_clause(ctx.borrow(), header, lits))
    };

    delete_clause(ctx.borrow(), cref);

    new_cref
}

/// Recreate a clause as an irredundant clause of glue zero and delete the original.
///
/// This exempts the clause from all future reductions.
pub fn persist_clause<'a>(
    mut ctx: partial!(
        Context<'a>,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ProofP<'a>,
        mut TmpDataP,
        mut WatchlistsP,
    ),
    cref: ClauseRef,
) -> ClauseRef {
    let (tmp, mut ctx) = ctx.split_part_mut(TmpDataP);

    {
        let clause = ctx.part(ClauseAllocP).clause(cref);
        tmp.lits.clear();
        tmp.lits.extend_from_slice(clause.lits());
    }
    let lits = &tmp.lits[..];

    ctx.part_mut(ProofP)
        .add_step(&ProofStep::AddClause { clause: lits });

    let new_cref = add_clause(ctx.borrow(), ClauseHeader::new(), lits);

    delete_clause(ctx.borrow(), cref);

    new_cref
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use glimsat_formula::{lit::Lit, lits};

    #[test]
    fn adds_and_deletes_update_counts() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        let clauses = [
            &lits![1, 2, 3][..],
            &lits![4, -5, 6][..],
            &lits![-2, 3, -4][..],
            &lits![-3, 5, 2, 7][..],
        ];

        let redundant = [false, true, true, false];

        let mut crefs = vec![];

        for (&clause, &redundant) in clauses.iter().zip(redundant.iter()) {
            let mut header = ClauseHeader::new();
            header.set_redundant(redundant);
            let cref = add_clause(ctx.borrow(), header, clause);
            crefs.push(cref);
        }

        assert_eq!(ctx.part(ClauseDbP).irredundant_count(), 2);
        assert_eq!(ctx.part(ClauseDbP).redundant_count(), 2);

        delete_clause(ctx.borrow(), crefs[0]);
        delete_clause(ctx.borrow(), crefs[2]);

        assert_eq!(ctx.part(ClauseDbP).irredundant_count(), 1);
        assert_eq!(ctx.part(ClauseDbP).redundant_count(), 1);
        assert!(ctx.part(ClauseDbP).garbage_size > 0);
    }

    #[test]
    fn strengthen_keeps_remaining_lits() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        let mut header = ClauseHeader::new();
        header.set_glue(3);
        let cref = add_clause(ctx.borrow(), header, &lits![1, 2, 3, 4]);

        let new_cref =
            strengthen_clause(ctx.borrow(), cref, Lit::from_dimacs(2)).expect("clause stays long");

        let clause = ctx.part(ClauseAllocP).clause(new_cref);
        assert_eq!(clause.lits(), &lits![1, 3, 4][..]);
        assert_eq!(clause.header().glue(), 2);
        assert!(ctx.part(ClauseAllocP).header(cref).deleted());
    }

    #[test]
    fn strengthen_to_binary_moves_clause() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        crate::context::set_var_count(ctx.borrow(), 4);

        let cref = add_clause(ctx.borrow(), ClauseHeader::new(), &lits![1, -2, 3]);

        let result = strengthen_clause(ctx.borrow(), cref, Lit::from_dimacs(-2));

        assert!(result.is_none());
        assert_eq!(ctx.part(BinaryClausesP).count(), 1);
        assert!(ctx.part(ClauseAllocP).header(cref).deleted());
    }
}
