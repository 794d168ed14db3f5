//! Propagation of long clauses.
use std::mem::take;

use partial_ref::{partial, PartialRef};

use glimsat_formula::Lit;

use crate::context::{AssignmentP, ClauseAllocP, Context, ImplGraphP, TrailP, WatchlistsP};

use super::enqueue_assignment;
use super::{Conflict, Reason, Watch};

/// Propagate all literals implied by long clauses watched through the given literal.
///
/// On conflict the clause propagating the conflicting assignment is returned.
///
/// See [`prop::watch`](crate::prop::watch) for the invariants this has to uphold. The watch list
/// of the literal is compacted in place; watches of clauses that found a replacement watch move
/// to another list, everything else stays. When a conflict is found the unprocessed suffix of
/// the list is preserved so that every clause stays reachable through its watches.
pub fn propagate_long(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ClauseAllocP,
        mut ImplGraphP,
        mut TrailP,
        mut WatchlistsP,
    ),
    lit: Lit,
) -> Result<(), Conflict> {
    // Detach the watch list of this literal. New watches are only ever added for other literals
    // (the replacement watch cannot be the propagating literal, see below), so nothing is lost by
    // writing the compacted list back at the end.
    let mut watch_list = take(ctx.part_mut(WatchlistsP).watched_by_mut(lit));

    let false_lit = !lit;

    let mut read = 0;
    let mut write = 0;
    let mut conflict = None;

    'watchers: while read < watch_list.len() {
        let watch = watch_list[read];
        read += 1;

        // If the blocking literal is already true the watched clause is satisfied without
        // looking at it.
        if ctx.part(AssignmentP).lit_is_true(watch.blocking) {
            watch_list[write] = watch;
            write += 1;
            continue;
        }

        let cref = watch.cref;

        // Bring the falsified literal into position 1, so position 0 holds the other watched
        // literal. Propagating clauses keep their propagated literal in position 0.
        let first = {
            let lits = ctx.part_mut(ClauseAllocP).clause_mut(cref).lits_mut();
            if lits[0] == false_lit {
                lits.swap(0, 1);
            }
            lits[0]
        };

        // The replacement watch uses the other watched literal as blocking literal. It either
        // overwrites the current watch or moves to the watch list of a replacement literal.
        let new_watch = Watch {
            cref,
            blocking: first,
        };

        // Unless we already checked it as the blocking literal, the other watched literal can
        // satisfy the clause as well.
        if first != watch.blocking && ctx.part(AssignmentP).lit_is_true(first) {
            watch_list[write] = new_watch;
            write += 1;
            continue;
        }

        // Look for a non-false unwatched literal to take over this watch.
        let mut replacement = None;
        {
            let lits = ctx.part(ClauseAllocP).clause(cref).lits();
            for (pos, &rest_lit) in lits.iter().enumerate().skip(2) {
                if !ctx.part(AssignmentP).lit_is_false(rest_lit) {
                    replacement = Some((pos, rest_lit));
                    break;
                }
            }
        }

        if let Some((pos, rest_lit)) = replacement {
            let lits = ctx.part_mut(ClauseAllocP).clause_mut(cref).lits_mut();
            lits[1] = rest_lit;
            lits[pos] = false_lit;

            // rest_lit is non-false while lit is true, so they cannot watch the same list
            debug_assert_ne!(!rest_lit, lit);
            ctx.part_mut(WatchlistsP).add_watch(!rest_lit, new_watch);
            continue 'watchers;
        }

        // No replacement found, the clause is unit or conflicting and stays watched as is.
        watch_list[write] = new_watch;
        write += 1;

        if ctx.part(AssignmentP).lit_is_false(first) {
            // Keep all unprocessed watches so every clause stays reachable.
            while read < watch_list.len() {
                watch_list[write] = watch_list[read];
                write += 1;
                read += 1;
            }
            conflict = Some(Conflict::Long(cref));
            break;
        }

        enqueue_assignment(ctx.borrow(), first, Reason::Long(cref));
    }

    watch_list.truncate(write);
    *ctx.part_mut(WatchlistsP).watched_by_mut(lit) = watch_list;

    match conflict {
        None => Ok(()),
        Some(conflict) => Err(conflict),
    }
}
