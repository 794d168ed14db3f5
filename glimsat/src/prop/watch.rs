//! Watchlists to detect clauses that became unit.
//!
//! Every long clause is watched through two of its literals, kept in positions 0 and 1 of the
//! clause. The watches live in the watchlists of the negations of the watched literals, so they
//! are scanned exactly when a watched literal becomes false. A clause only needs inspection at
//! that point: as long as both watched literals are non-false the clause can neither be unit nor
//! conflicting. Unassigning variables cannot invalidate this, so backtracking never has to touch
//! the watchlists.
//!
//! Each watch also carries a blocking literal of the clause. When the blocking literal is true
//! the clause is satisfied and the clause body does not have to be accessed at all (Sörensson
//! and Eén, "MINISAT 2.1 and MINISAT++ 1.0 — SAT Race 2008 Editions").
//!
//! The watchlists can be invalidated as a whole, which is used when clauses are deleted or moved
//! by garbage collection. They are then rebuilt from the clause database before the next
//! propagation.
use partial_ref::{partial, PartialRef};

use glimsat_formula::Lit;

use crate::clause::ClauseRef;
use crate::context::{ClauseAllocP, ClauseDbP, Context, WatchlistsP};

/// A watch on a long clause.
#[derive(Copy, Clone)]
pub struct Watch {
    /// Clause that has the referring literal in position 0 or 1.
    pub cref: ClauseRef,
    /// A literal of the clause different from the referring literal.
    pub blocking: Lit,
}

/// Watchlists to detect clauses that became unit.
#[derive(Default)]
pub struct Watchlists {
    /// Watches of long clauses, indexed by the code of the falsified literal.
    watches: Vec<Vec<Watch>>,
    /// Whether the watches are up to date with the clause database.
    enabled: bool,
}

impl Watchlists {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.watches.resize(count * 2, vec![]);
    }

    /// Start watching a clause.
    ///
    /// `lits` have to be the first two literals of the given clause.
    pub fn watch_clause(&mut self, cref: ClauseRef, lits: [Lit; 2]) {
        for i in 0..2 {
            let watch = Watch {
                cref,
                blocking: lits[i ^ 1],
            };
            self.watches[(!lits[i]).code()].push(watch);
        }
    }

    /// Return watches for a given literal.
    pub fn watched_by_mut(&mut self, lit: Lit) -> &mut Vec<Watch> {
        &mut self.watches[lit.code()]
    }

    /// Make a literal watch a clause.
    pub fn add_watch(&mut self, lit: Lit, watch: Watch) {
        self.watches[lit.code()].push(watch)
    }

    /// Whether the watches are up to date.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Invalidate the watches.
    ///
    /// They are rebuilt from the clause database before the next propagation.
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    fn clear(&mut self) {
        for watch_list in self.watches.iter_mut() {
            watch_list.clear();
        }
    }
}

/// Rebuild the watchlists from the clause database.
///
/// Requires every live clause to have non-false literals in positions 0 and 1 or to be satisfied
/// at level 0. This holds whenever the watchlists were invalidated, as that only happens during
/// level 0 simplification and garbage collection.
pub fn enable_watchlists(
    mut ctx: partial!(Context, mut WatchlistsP, ClauseAllocP, ClauseDbP),
) {
    let (watchlists, mut ctx) = ctx.split_part_mut(WatchlistsP);

    watchlists.clear();

    let (db, ctx) = ctx.split_part(ClauseDbP);
    let alloc = ctx.part(ClauseAllocP);

    for &cref in db.clauses().iter() {
        let clause = alloc.clause(cref);
        if clause.header().deleted() {
            continue;
        }
        let lits = clause.lits();
        watchlists.watch_clause(cref, [lits[0], lits[1]]);
    }

    watchlists.enabled = true;
}
