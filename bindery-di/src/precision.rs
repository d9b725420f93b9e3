//! Precision is the partial order used to pick the most specific of several applicable bindings.
//! Types take priority over names, instances take priority over targets - the evaluation order of
//! [more_precise_than2] is what makes this work.

use crate::resource::Resourced;
use itertools::Itertools;
use std::cmp::Ordering;

/// Values which can be compared by how specific they are.
pub trait PreciserThan<T: ?Sized = Self> {
    /// Returns `true` if `self` is strictly more specific than `other`. Incomparable values
    /// return `false` in both directions.
    fn more_precise_than(&self, other: &T) -> bool;
}

/// Orders more precise values first. Incomparable values are considered equal.
pub fn compare_precision<T: PreciserThan>(one: &T, other: &T) -> Ordering {
    if one.more_precise_than(other) {
        Ordering::Less
    } else if other.more_precise_than(one) {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

/// Two level comparison: the first pair decides, unless neither of them is more precise than the
/// other, in which case the second pair decides.
pub fn more_precise_than2<T: PreciserThan, T2: PreciserThan>(
    one: &T,
    other: &T,
    snd_one: &T2,
    snd_other: &T2,
) -> bool {
    // sequence is important
    one.more_precise_than(other)
        || (!other.more_precise_than(one) && snd_one.more_precise_than(snd_other))
}

/// Sorts resourced values into a deterministic global order: grouped by raw type name, more
/// precise resources before less precise ones, source order otherwise.
pub fn sort_by_precision<T: Resourced>(items: Vec<T>) -> Vec<T> {
    // precision is only a partial order, so rank by the number of dominated items, which is
    // consistent with it and total
    let dominated = items
        .iter()
        .map(|item| {
            items
                .iter()
                .filter(|other| item.resource().more_precise_than(other.resource()))
                .count()
        })
        .collect_vec();

    items
        .into_iter()
        .zip(dominated)
        .enumerate()
        .sorted_by(|(index, (item, dominated)), (other_index, (other, other_dominated))| {
            item.resource()
                .ty()
                .name()
                .cmp(other.resource().ty().name())
                .then_with(|| other_dominated.cmp(dominated))
                .then_with(|| index.cmp(other_index))
        })
        .map(|(_, (item, _))| item)
        .collect()
}

/// Picks the single most precise candidate. Fails with both rivals when the best candidate does
/// not strictly dominate every other one.
pub fn most_precise<'a, T: Resourced>(
    candidates: &[&'a T],
) -> Result<Option<&'a T>, (&'a T, &'a T)> {
    let Some((first, rest)) = candidates.split_first() else {
        return Ok(None);
    };

    let best = rest.iter().copied().fold(*first, |best, candidate| {
        if candidate.resource().more_precise_than(best.resource()) {
            candidate
        } else {
            best
        }
    });

    match candidates.iter().find(|candidate| {
        !std::ptr::eq(**candidate, best) && !best.resource().more_precise_than(candidate.resource())
    }) {
        Some(rival) => Err((best, *rival)),
        None => Ok(Some(best)),
    }
}
