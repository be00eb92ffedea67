//! Ordering of package-level variable initializers.
//!
//! Initializers run in declaration order unless one reads a variable
//! initialized later, in which case it is moved after that variable.
//!
//! # Algorithm
//!
//! Items sit in a working list. The front item `v` scans the rest of the
//! list for the first item `w` it requires. When found, `v` is moved to just
//! after `w` and the items already waiting on `w`, and `w`'s waiting count
//! grows; the next scan of `w` skips its waiters, which all depend on it.
//! When nothing is found, `v` is ready and leaves the list. Items that
//! require nothing never move, so they keep their declaration order.
//!
//! `requires` must be transitive for the result to be a topological
//! order. Mutual requirement is a cycle: both items are reported and
//! leave the list without being ordered. A longer loop is reported once,
//! through the first pair found; its other members then require
//! themselves only through that pair and leave the list unreported.

mod deps;

pub(crate) use deps::InitDeps;

/// Result of [`sort_inits`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Schedule<K> {
    /// Items in initialization order.
    pub order: Vec<K>,
    /// `(v, w)` pairs whose initializers require each other, in
    /// discovery order. Neither item appears in `order`, nor does any
    /// other item on a loop through the pair.
    pub cyclic: Vec<(K, K)>,
    /// Items whose initializer requires the item itself. Their
    /// initializers are skipped.
    pub self_referential: Vec<K>,
}

struct Pending<K> {
    key: K,
    /// Items moved directly behind this one because they require it.
    waiting: usize,
}

/// Order `items` so that every item comes after the items it requires.
///
/// `has_init` tells whether an item has an initializer expression; an item
/// with only a pre-init block legitimately assigns itself and is not
/// checked for self-reference.
pub fn sort_inits<K: Copy>(
    items: impl IntoIterator<Item = K>,
    mut has_init: impl FnMut(K) -> bool,
    mut requires: impl FnMut(K, K) -> bool,
) -> Schedule<K> {
    let mut list: Vec<Pending<K>> = items
        .into_iter()
        .map(|key| Pending { key, waiting: 0 })
        .collect();
    let mut schedule = Schedule {
        order: Vec::with_capacity(list.len()),
        cyclic: Vec::new(),
        self_referential: Vec::new(),
    };
    let mut in_cycle: Vec<K> = Vec::new();

    while let Some(front) = list.first() {
        let (v, skip) = (front.key, front.waiting);
        let found = list
            .iter()
            .enumerate()
            .skip(1 + skip)
            .find(|(_, w)| requires(v, w.key))
            .map(|(i, _)| i);

        match found {
            None => {
                list.remove(0);
                if in_cycle.iter().any(|&c| requires(v, c) && requires(c, v)) {
                    continue;
                }
                if has_init(v) && requires(v, v) {
                    schedule.self_referential.push(v);
                } else {
                    schedule.order.push(v);
                }
            }
            Some(i) if requires(list[i].key, v) => {
                schedule.cyclic.push((v, list[i].key));
                in_cycle.extend([v, list[i].key]);
                list.remove(i);
                list.remove(0);
            }
            Some(i) => {
                let at = i + list[i].waiting;
                list[i].waiting += 1;
                let moved = list.remove(0);
                let at = at.min(list.len());
                list.insert(at, moved);
            }
        }
    }
    schedule
}
