use std::ops::{BitOr, Sub};

use tracing::trace;

use crate::{Error, RangeSet};

#[inline]
fn touches(max: i32, next_min: i32) -> bool {
    i64::from(next_min) <= i64::from(max) + 1
}

impl RangeSet {
    /// Members of either set, as a new unlocked set. Linear in the number of
    /// ranges of both inputs.
    #[must_use]
    pub fn union(&self, other: &RangeSet) -> RangeSet {
        let mut result = Vec::with_capacity(self.slots.len().max(other.slots.len()));
        let mut self_it = self.slots.iter().peekable();
        let mut other_it = other.slots.iter().peekable();
        let mut cur_merged: Option<(i32, i32)> = None;

        loop {
            let next = match (self_it.peek(), other_it.peek()) {
                (Some(l), Some(r)) if l.min <= r.min => self_it.next(),
                (Some(_), Some(_)) => other_it.next(),
                (Some(_), None) => self_it.next(),
                (None, Some(_)) => other_it.next(),
                (None, None) => None,
            };
            let Some(next) = next else {
                break;
            };
            match cur_merged.as_mut() {
                None => cur_merged = Some((next.min, next.max)),
                Some(merged) if touches(merged.1, next.min) => {
                    merged.1 = merged.1.max(next.max);
                }
                Some(merged) => {
                    result.push(*merged);
                    *merged = (next.min, next.max);
                }
            }
        }
        if let Some(last) = cur_merged {
            result.push(last);
        }
        RangeSet::from_sorted_disjoint(result)
    }

    /// Members of `self` that are not in `other`, as a new unlocked set.
    #[must_use]
    pub fn difference(&self, other: &RangeSet) -> RangeSet {
        let mut result = Vec::with_capacity(self.slots.len());
        let mut a_iter = self.slots.iter().map(|slot| (slot.min, slot.max));
        let mut b_iter = other.slots.iter().peekable();

        let Some(mut current_a) = a_iter.next() else {
            return RangeSet::new();
        };

        loop {
            let Some(b) = b_iter.peek() else {
                result.push(current_a);
                result.extend(a_iter);
                break;
            };
            // b entirely below current_a
            if b.max < current_a.0 {
                b_iter.next();
                continue;
            }
            // b entirely above, current_a survives whole
            if b.min > current_a.1 {
                result.push(current_a);
                match a_iter.next() {
                    Some(next) => {
                        current_a = next;
                        continue;
                    }
                    None => break,
                }
            }
            if b.min > current_a.0 {
                result.push((current_a.0, b.min - 1));
            }
            // b may still cover the next range of a, so it is not consumed here
            match b.max.checked_add(1) {
                Some(new_min) if new_min <= current_a.1 => current_a = (new_min, current_a.1),
                _ => match a_iter.next() {
                    Some(next) => current_a = next,
                    None => break,
                },
            }
        }
        RangeSet::from_sorted_disjoint(result)
    }

    /// Adds every member of `other` to this set.
    pub fn union_with(&mut self, other: &RangeSet) -> Result<(), Error> {
        self.check_writable()?;
        if other.is_empty() {
            return Ok(());
        }
        self.invalidate_ranks();
        if self.is_empty() {
            self.slots = other.slots.clone();
            self.count = other.count;
            return Ok(());
        }
        if prefer_point_edits(self.slots.len(), other.slots.len()) {
            for slot in &other.slots {
                self.insert_span(slot.min, slot.max);
            }
        } else {
            trace!(
                ranges = self.slots.len(),
                other_ranges = other.slots.len(),
                "merging range lists"
            );
            let merged = self.union(other);
            self.slots = merged.slots;
            self.count = merged.count;
        }
        Ok(())
    }

    /// Removes every member of `other` from this set.
    pub fn difference_with(&mut self, other: &RangeSet) -> Result<(), Error> {
        self.check_writable()?;
        if self.is_empty() || other.is_empty() {
            return Ok(());
        }
        self.invalidate_ranks();
        if prefer_point_edits(self.slots.len(), other.slots.len()) {
            for slot in &other.slots {
                self.erase_span(slot.min, slot.max);
            }
        } else {
            let remaining = self.difference(other);
            self.slots = remaining.slots;
            self.count = remaining.count;
        }
        Ok(())
    }
}

/// Whether applying `other_len` binary-searched edits beats a linear merge
/// of both lists.
#[inline]
fn prefer_point_edits(self_len: usize, other_len: usize) -> bool {
    let insert_cost_estimate = other_len * self_len.max(1).ilog2() as usize;
    let merge_cost_estimate = self_len + other_len;
    insert_cost_estimate < merge_cost_estimate && other_len < self_len
}

impl BitOr<&RangeSet> for &RangeSet {
    type Output = RangeSet;

    #[inline]
    fn bitor(self, rhs: &RangeSet) -> RangeSet {
        self.union(rhs)
    }
}

impl Sub<&RangeSet> for &RangeSet {
    type Output = RangeSet;

    #[inline]
    fn sub(self, rhs: &RangeSet) -> RangeSet {
        self.difference(rhs)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Error, RangeSet};
    use std::ops::RangeInclusive;

    fn range_set(ranges: &[RangeInclusive<i32>]) -> RangeSet {
        RangeSet::from_ranges(ranges.iter().map(|rng| (*rng.start(), *rng.end()))).unwrap()
    }

    #[test]
    fn test_union_both_empty() {
        let set1 = range_set(&[]);
        let set2 = range_set(&[]);
        assert_eq!(set1.union(&set2), range_set(&[]));
    }

    #[test]
    fn test_union_with_empty_set() {
        let set1 = range_set(&[10..=20, 30..=40]);
        let set2 = range_set(&[]);
        let expected = range_set(&[10..=20, 30..=40]);
        assert_eq!(set1.union(&set2), expected);
        assert_eq!(set2.union(&set1), expected);
    }

    #[test]
    fn test_union_interleaved_non_overlapping() {
        let set1 = range_set(&[10..=20, 50..=60]);
        let set2 = range_set(&[30..=40, 70..=80]);
        let expected = range_set(&[10..=20, 30..=40, 50..=60, 70..=80]);
        assert_eq!(&set1 | &set2, expected);
        assert_eq!((&set1 | &set2).len(), 44);
    }

    #[test]
    fn test_union_adjacent() {
        let set1 = range_set(&[10..=20]);
        let set2 = range_set(&[21..=30]);
        let union = set1.union(&set2);
        assert_eq!(union, range_set(&[10..=30]));
        assert_eq!(union.range_count(), 1);
    }

    #[test]
    fn test_union_complex_merge_and_gaps() {
        let set1 = range_set(&[10..=20, 30..=40, 60..=70]);
        let set2 = range_set(&[15..=35, 65..=75]);
        let expected = range_set(&[10..=40, 60..=75]);
        assert_eq!(set1.union(&set2), expected);
        assert_eq!(set2.union(&set1), expected);
    }

    #[test]
    fn test_union_at_domain_edges() {
        let set1 = range_set(&[i32::MIN..=0]);
        let set2 = range_set(&[1..=i32::MAX]);
        let union = set1.union(&set2);
        assert_eq!(union.range_count(), 1);
        assert_eq!(union.len(), 1u64 << 32);
    }

    #[test]
    fn test_union_result_ranks() {
        let set1 = range_set(&[1..=3]);
        let set2 = range_set(&[10..=12]);
        let union = set1.union(&set2);
        assert_eq!(union.rank_of(11), Some(4));
    }

    #[test]
    fn test_difference_empty() {
        let set_a = range_set(&[10..=20]);
        let set_b = range_set(&[]);
        assert_eq!(set_a.difference(&set_b), range_set(&[10..=20]));
        assert_eq!(set_b.difference(&set_a), range_set(&[]));
    }

    #[test]
    fn test_difference_splits_and_carves() {
        let set_a = range_set(&[10..=20]);
        assert_eq!(&set_a - &range_set(&[5..=15]), range_set(&[16..=20]));
        assert_eq!(&set_a - &range_set(&[15..=25]), range_set(&[10..=14]));
        assert_eq!(
            &set_a - &range_set(&[13..=17]),
            range_set(&[10..=12, 18..=20])
        );
        assert_eq!(&set_a - &range_set(&[5..=25]), range_set(&[]));
    }

    #[test]
    fn test_difference_multiple_holes() {
        let set_a = range_set(&[0..=100]);
        let set_b = range_set(&[10..=20, 40..=50, 80..=90]);
        let expected = range_set(&[0..=9, 21..=39, 51..=79, 91..=100]);
        let diff = set_a.difference(&set_b);
        assert_eq!(diff, expected);
        assert_eq!(diff.len(), 68);
    }

    #[test]
    fn test_difference_b_bridges_gap_in_a() {
        let set_a = range_set(&[0..=50, 60..=100]);
        let set_b = range_set(&[40..=70]);
        assert_eq!(set_a.difference(&set_b), range_set(&[0..=39, 71..=100]));
    }

    #[test]
    fn test_difference_up_to_i32_max() {
        let set_a = range_set(&[0..=10, 20..=30]);
        let set_b = range_set(&[5..=i32::MAX]);
        assert_eq!(set_a.difference(&set_b), range_set(&[0..=4]));
    }

    #[test]
    fn test_union_with_and_difference_with() {
        let mut set = range_set(&[0..=10, 20..=30, 40..=50, 60..=70]);
        set.union_with(&range_set(&[11..=19])).unwrap();
        assert_eq!(set, range_set(&[0..=30, 40..=50, 60..=70]));
        set.difference_with(&range_set(&[5..=45])).unwrap();
        assert_eq!(set, range_set(&[0..=4, 46..=50, 60..=70]));
        assert_eq!(set.rank_of(60), Some(10));

        let mut empty = RangeSet::new();
        empty.union_with(&set).unwrap();
        assert_eq!(empty, set);
        assert_eq!(empty.len(), set.len());
    }

    #[test]
    fn test_in_place_algebra_matches_pure_algebra() {
        let a = range_set(&[0..=3, 8..=12, 20..=22, 30..=31]);
        let b = range_set(&[2..=9, 13..=19, 25..=40]);

        let mut union = a.clone();
        union.union_with(&b).unwrap();
        assert_eq!(union, a.union(&b));

        let mut diff = a.clone();
        diff.difference_with(&b).unwrap();
        assert_eq!(diff, a.difference(&b));
    }

    #[test]
    fn test_in_place_algebra_respects_lock() {
        let mut set = range_set(&[0..=10]);
        set.lock();
        let other = range_set(&[20..=30]);
        assert_eq!(set.union_with(&other), Err(Error::ReadOnly));
        assert_eq!(set.difference_with(&other), Err(Error::ReadOnly));
        assert_eq!(set, range_set(&[0..=10]));

        let union = &set | &other;
        assert!(!union.is_read_only());
        assert_eq!(union, range_set(&[0..=10, 20..=30]));
    }
}
