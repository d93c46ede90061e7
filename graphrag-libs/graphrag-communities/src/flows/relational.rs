use std::{
    collections::{BTreeMap, HashMap},
    hash::Hash,
    ops::AddAssign,
};

/// Row accounting for a single inner join.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinStats {
    pub matched: usize,
    pub unmatched_left: usize,
    pub unmatched_right: usize,
}

impl AddAssign for JoinStats {
    fn add_assign(&mut self, other: Self) {
        self.matched += other.matched;
        self.unmatched_left += other.unmatched_left;
        self.unmatched_right += other.unmatched_right;
    }
}

/// Inner join of two row slices on equal keys.
///
/// Every `(left, right)` pair whose keys are equal is emitted, in left-row order and,
/// for a given left row, in right-row order. Rows with no partner on the other side are
/// excluded from the output and only show up in the returned [`JoinStats`].
pub fn inner_join<'l, 'r, L, R, K, FL, FR>(
    left: &'l [L],
    right: &'r [R],
    left_key: FL,
    right_key: FR,
) -> (Vec<(&'l L, &'r R)>, JoinStats)
where
    K: Eq + Hash,
    FL: Fn(&'l L) -> K,
    FR: Fn(&'r R) -> K,
{
    let mut index: HashMap<K, Vec<usize>> = HashMap::new();
    for (idx, row) in right.iter().enumerate() {
        index.entry(right_key(row)).or_default().push(idx);
    }

    let mut right_matched = vec![false; right.len()];
    let mut joined = Vec::new();
    let mut unmatched_left = 0;

    for row in left {
        match index.get(&left_key(row)) {
            Some(positions) => {
                for &idx in positions {
                    right_matched[idx] = true;
                    joined.push((row, &right[idx]));
                }
            }
            None => unmatched_left += 1,
        }
    }

    let stats = JoinStats {
        matched: joined.len(),
        unmatched_left,
        unmatched_right: right_matched.iter().filter(|matched| !**matched).count(),
    };

    (joined, stats)
}

/// Single-pass group-by. `merge` folds each row into its group's accumulator, which
/// starts from `A::default()`. Groups come back ordered by key.
pub fn group_by<T, K, A, FK, FM>(rows: impl IntoIterator<Item = T>, key: FK, mut merge: FM) -> BTreeMap<K, A>
where
    K: Ord,
    A: Default,
    FK: Fn(&T) -> K,
    FM: FnMut(&mut A, T),
{
    let mut groups: BTreeMap<K, A> = BTreeMap::new();
    for row in rows {
        let accumulator = groups.entry(key(&row)).or_default();
        merge(accumulator, row);
    }
    groups
}
