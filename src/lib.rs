use std::{
    cell::Cell,
    fmt,
    hash::{Hash, Hasher},
    ops::RangeInclusive,
};

use thiserror::Error;
use tracing::{debug, trace};

mod iter;
mod ops;
#[cfg(feature = "serde")]
mod serde_impl;

pub use iter::{Iter, Ranges};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("the end of the range must be >= the beginning (got {begin}..={end})")]
    InvalidRange { begin: i32, end: i32 },
    #[error("this set is read-only")]
    ReadOnly,
    #[error("destination holds {available} slots but {needed} are required")]
    BufferTooSmall { needed: u64, available: u64 },
}

/// inclusive
///
/// A snapshot of one stored run of consecutive integers. Values handed out by
/// [`RangeSet::ranges`] are copies, so editing them never touches the set.
/// Equality and hashing look at the bounds only.
#[derive(Debug, Copy, Clone)]
pub struct Range {
    min: i32,
    max: i32,
    previous_items_count: u64,
}

impl Range {
    #[inline]
    pub(crate) fn new(min: i32, max: i32) -> Self {
        debug_assert!(min <= max);
        Range {
            min,
            max,
            previous_items_count: 0,
        }
    }

    pub fn try_new(min: i32, max: i32) -> Result<Self, Error> {
        if max < min {
            return Err(Error::InvalidRange {
                begin: min,
                end: max,
            });
        }
        Ok(Range::new(min, max))
    }

    #[inline]
    pub fn single(value: i32) -> Self {
        Range::new(value, value)
    }

    #[inline]
    pub fn min(&self) -> i32 {
        self.min
    }

    #[inline]
    pub fn max(&self) -> i32 {
        self.max
    }

    /// Number of integers in this range. Never zero.
    #[inline]
    pub fn len(&self) -> u64 {
        span_len(self.min, self.max)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    #[inline]
    pub fn contains(&self, value: i32) -> bool {
        self.min <= value && value <= self.max
    }

    /// Number of set members stored in all ranges below this one, i.e. the
    /// rank of [`Range::min`] within the owning set.
    #[inline]
    pub fn previous_items_count(&self) -> u64 {
        self.previous_items_count
    }
}

impl PartialEq for Range {
    fn eq(&self, other: &Self) -> bool {
        self.min == other.min && self.max == other.max
    }
}

impl Eq for Range {}

impl Hash for Range {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.min, self.max).hash(state);
    }
}

impl TryFrom<(i32, i32)> for Range {
    type Error = Error;

    #[inline]
    fn try_from(rng: (i32, i32)) -> Result<Self, Error> {
        Range::try_new(rng.0, rng.1)
    }
}

impl TryFrom<RangeInclusive<i32>> for Range {
    type Error = Error;

    #[inline]
    fn try_from(rng: RangeInclusive<i32>) -> Result<Self, Error> {
        Range::try_new(*rng.start(), *rng.end())
    }
}

#[inline]
pub(crate) fn span_len(min: i32, max: i32) -> u64 {
    (i64::from(max) - i64::from(min) + 1) as u64
}

/// A stored range. `previous` is a lazily refreshed cache, valid only while
/// the owning set is not dirty.
#[derive(Debug, Clone)]
pub(crate) struct Slot {
    pub(crate) min: i32,
    pub(crate) max: i32,
    previous: Cell<u64>,
}

impl Slot {
    #[inline]
    fn new(min: i32, max: i32) -> Self {
        Slot {
            min,
            max,
            previous: Cell::new(0),
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> u64 {
        span_len(self.min, self.max)
    }

    #[inline]
    pub(crate) fn snapshot(&self) -> Range {
        Range {
            min: self.min,
            max: self.max,
            previous_items_count: self.previous.get(),
        }
    }
}

/// Outcome of a binary search over the stored ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Search {
    /// Index of the range containing the value.
    Found(usize),
    /// Index where a singleton range holding the value would be inserted.
    NotFound(usize),
}

/// Stored ranges touched by a `[begin, end]` query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Overlap {
    Span { first: usize, last: usize },
    Gap(usize),
}

/// Sorted set of `i32` values stored as maximal runs of consecutive integers.
///
/// Memory is proportional to the number of runs, not the number of members,
/// so "everything from 10_000 to 999_999 except a few holes" costs a handful
/// of ranges.
#[derive(Default, Clone)]
pub struct RangeSet {
    slots: Vec<Slot>,
    count: u64,
    ranks_dirty: Cell<bool>,
    locked: bool,
}

impl fmt::Debug for RangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut set_builder = f.debug_set();
        for slot in &self.slots {
            set_builder.entry(&(slot.min..=slot.max));
        }
        set_builder.finish()
    }
}

impl PartialEq for RangeSet {
    fn eq(&self, other: &Self) -> bool {
        self.count == other.count
            && self.slots.len() == other.slots.len()
            && self
                .slots
                .iter()
                .zip(&other.slots)
                .all(|(a, b)| a.min == b.min && a.max == b.max)
    }
}

impl Eq for RangeSet {}

impl RangeSet {
    pub fn new() -> Self {
        Default::default()
    }

    /// Empty set with room for `ranges` stored runs.
    pub fn with_capacity(ranges: usize) -> Self {
        RangeSet {
            slots: Vec::with_capacity(ranges),
            ..Default::default()
        }
    }

    /// Builds a set from `(min, max)` pairs given in any order. Overlapping
    /// and adjacent pairs are merged; an inverted pair is rejected.
    pub fn from_ranges<I>(pairs: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (i32, i32)>,
    {
        let mut set = RangeSet::new();
        for (begin, end) in pairs {
            check_range(begin, end)?;
            set.insert_span(begin, end);
        }
        Ok(set)
    }

    /// Wraps ranges that are already sorted, disjoint and non-adjacent.
    pub(crate) fn from_sorted_disjoint(slots: Vec<(i32, i32)>) -> Self {
        let count = slots.iter().map(|&(min, max)| span_len(min, max)).sum();
        RangeSet {
            slots: slots
                .into_iter()
                .map(|(min, max)| Slot::new(min, max))
                .collect(),
            count,
            ranks_dirty: Cell::new(true),
            locked: false,
        }
    }

    /// Number of integers in the set.
    #[inline]
    pub fn len(&self) -> u64 {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of stored ranges.
    #[inline]
    pub fn range_count(&self) -> usize {
        self.slots.len()
    }

    pub fn first(&self) -> Option<i32> {
        self.slots.first().map(|slot| slot.min)
    }

    pub fn last(&self) -> Option<i32> {
        self.slots.last().map(|slot| slot.max)
    }

    #[inline]
    pub fn is_read_only(&self) -> bool {
        self.locked
    }

    /// One-way freeze. Every mutator fails with [`Error::ReadOnly`] afterwards.
    ///
    /// The rank cache is refreshed through `&self`, so a locked set is still
    /// `!Sync`; share it across threads behind a mutex or send a clone.
    pub fn lock(&mut self) {
        if !self.locked {
            debug!(ranges = self.slots.len(), len = self.count, "range set locked");
        }
        self.locked = true;
    }

    pub fn contains(&self, item: i32) -> bool {
        matches!(self.find_range(item), Search::Found(_))
    }

    /// Zero-based position of `item` in the ascending enumeration of the set,
    /// or `None` if `item` is not a member.
    pub fn rank_of(&self, item: i32) -> Option<u64> {
        let Search::Found(index) = self.find_range(item) else {
            return None;
        };
        self.ensure_ranks_fresh();
        let slot = &self.slots[index];
        Some(slot.previous.get() + span_len(slot.min, item) - 1)
    }

    /// Member at zero-based position `rank`; the inverse of [`RangeSet::rank_of`].
    pub fn get(&self, rank: u64) -> Option<i32> {
        if rank >= self.count {
            return None;
        }
        self.ensure_ranks_fresh();
        let index = self
            .slots
            .partition_point(|slot| slot.previous.get() + slot.len() <= rank);
        let slot = self.slots.get(index)?;
        let value = i64::from(slot.min) + (rank - slot.previous.get()) as i64;
        i32::try_from(value).ok()
    }

    /// Adds `item`, returning whether it was newly inserted.
    pub fn add(&mut self, item: i32) -> Result<bool, Error> {
        self.check_writable()?;
        self.invalidate_ranks();
        Ok(self.insert_one(item))
    }

    /// Adds every integer in `[begin, end]`.
    pub fn add_range(&mut self, begin: i32, end: i32) -> Result<(), Error> {
        self.check_writable()?;
        check_range(begin, end)?;
        self.invalidate_ranks();
        self.insert_span(begin, end);
        Ok(())
    }

    /// Adds every item of `items`.
    pub fn add_all<I>(&mut self, items: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = i32>,
    {
        self.check_writable()?;
        self.invalidate_ranks();
        for item in items {
            self.insert_one(item);
        }
        Ok(())
    }

    /// Removes `item`, returning whether it was a member.
    pub fn remove(&mut self, item: i32) -> Result<bool, Error> {
        self.check_writable()?;
        self.invalidate_ranks();
        let Search::Found(index) = self.find_range(item) else {
            return Ok(false);
        };
        let slot = &mut self.slots[index];
        if slot.min == slot.max {
            self.slots.remove(index);
        } else if item == slot.min {
            slot.min += 1;
        } else if item == slot.max {
            slot.max -= 1;
        } else {
            // strictly interior, so item - 1 and item + 1 cannot overflow
            let upper = Slot::new(item + 1, slot.max);
            slot.max = item - 1;
            trace!(item, index, "splitting range");
            self.slots.insert(index + 1, upper);
        }
        self.count -= 1;
        Ok(true)
    }

    /// Removes every integer in `[begin, end]`, trimming partially covered
    /// ranges at either end.
    pub fn remove_range(&mut self, begin: i32, end: i32) -> Result<(), Error> {
        self.check_writable()?;
        check_range(begin, end)?;
        self.invalidate_ranks();
        self.erase_span(begin, end);
        Ok(())
    }

    /// Empties the set, keeping its allocation.
    pub fn clear(&mut self) -> Result<(), Error> {
        self.check_writable()?;
        self.slots.clear();
        self.count = 0;
        self.ranks_dirty.set(false);
        Ok(())
    }

    /// Ascending iterator over the members.
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(&self.slots, self.count)
    }

    /// Ascending snapshots of the stored ranges, each annotated with
    /// [`Range::previous_items_count`].
    pub fn ranges(&self) -> Ranges<'_> {
        self.ensure_ranks_fresh();
        Ranges::new(&self.slots)
    }

    /// Writes every member in ascending order into `dest`, starting at
    /// `dest_index`. Nothing is written if the members do not fit.
    pub fn copy_to(&self, dest: &mut [i32], dest_index: usize) -> Result<(), Error> {
        let tail = dest.get_mut(dest_index..).unwrap_or_default();
        let available = tail.len() as u64;
        if self.count > available {
            return Err(Error::BufferTooSmall {
                needed: self.count,
                available,
            });
        }
        for (out, value) in tail.iter_mut().zip(self.iter()) {
            *out = value;
        }
        Ok(())
    }

    pub fn to_vec(&self) -> Vec<i32> {
        self.iter().collect()
    }

    fn check_writable(&self) -> Result<(), Error> {
        if self.locked {
            debug!("rejected mutation of a locked range set");
            return Err(Error::ReadOnly);
        }
        Ok(())
    }

    /// Called by every mutator once its preconditions hold.
    #[inline]
    pub(crate) fn invalidate_ranks(&self) {
        self.ranks_dirty.set(true);
    }

    /// Called by every reader that needs `previous_items_count`.
    pub(crate) fn ensure_ranks_fresh(&self) {
        if !self.ranks_dirty.get() {
            return;
        }
        let mut previous_items_count = 0;
        for slot in &self.slots {
            slot.previous.set(previous_items_count);
            previous_items_count += slot.len();
        }
        debug_assert_eq!(previous_items_count, self.count);
        self.ranks_dirty.set(false);
        debug!(ranges = self.slots.len(), "recomputed range ranks");
    }

    /// Binary search for the range holding `value`.
    fn find_range(&self, value: i32) -> Search {
        let found = self.slots.binary_search_by(|slot| {
            if slot.max < value {
                std::cmp::Ordering::Less
            } else if slot.min > value {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Equal
            }
        });
        match found {
            Ok(index) => Search::Found(index),
            Err(index) => Search::NotFound(index),
        }
    }

    /// First and last stored ranges sharing a member with `[begin, end]`, or
    /// the insertion point when none do.
    fn find_overlap(&self, begin: i32, end: i32) -> Overlap {
        let first = match self.find_range(begin) {
            Search::Found(index) => index,
            Search::NotFound(index) => {
                if index >= self.slots.len() || end < self.slots[index].min {
                    return Overlap::Gap(index);
                }
                index
            }
        };
        // slots[first].min <= end, so a miss lands strictly after `first`
        let last = match self.find_range(end) {
            Search::Found(index) => index,
            Search::NotFound(index) => index - 1,
        };
        Overlap::Span { first, last }
    }

    pub(crate) fn insert_one(&mut self, item: i32) -> bool {
        match self.find_range(item) {
            Search::Found(_) => false,
            Search::NotFound(index) => {
                self.add_non_overlapping_range(index, item, item);
                true
            }
        }
    }

    pub(crate) fn insert_span(&mut self, begin: i32, end: i32) {
        match self.find_overlap(begin, end) {
            Overlap::Gap(index) => self.add_non_overlapping_range(index, begin, end),
            Overlap::Span { first, last } => {
                let begin = begin.min(self.slots[first].min);
                let end = end.max(self.slots[last].max);
                self.splice_out(first, last);
                self.add_non_overlapping_range(first, begin, end);
            }
        }
    }

    pub(crate) fn erase_span(&mut self, begin: i32, end: i32) {
        let Overlap::Span { first, last } = self.find_overlap(begin, end) else {
            return;
        };
        let prefix_min = Some(self.slots[first].min).filter(|&min| min < begin);
        let suffix_max = Some(self.slots[last].max).filter(|&max| end < max);
        self.splice_out(first, last);
        // suffix first so both pieces can go in at `first`
        if let Some(max) = suffix_max {
            self.add_non_overlapping_range(first, end + 1, max);
        }
        if let Some(min) = prefix_min {
            self.add_non_overlapping_range(first, min, begin - 1);
        }
    }

    /// Drops `slots[first..=last]`, returning the number of members removed.
    fn splice_out(&mut self, first: usize, last: usize) -> u64 {
        let removed: u64 = self.slots.drain(first..=last).map(|slot| slot.len()).sum();
        self.count -= removed;
        self.invalidate_ranks();
        trace!(first, last, removed, "spliced out ranges");
        removed
    }

    /// Inserts `[begin, end]`, which must not share a member with any stored
    /// range, at `index`, merging it with an adjacent neighbour on either side.
    fn add_non_overlapping_range(&mut self, index: usize, begin: i32, end: i32) {
        self.count += span_len(begin, end);
        self.invalidate_ranks();

        let below = index
            .checked_sub(1)
            .filter(|&i| self.slots[i].max.checked_add(1) == Some(begin));
        let above = Some(index)
            .filter(|&i| i < self.slots.len() && end.checked_add(1) == Some(self.slots[i].min));

        match (below, above) {
            (Some(below), Some(above)) => {
                self.slots[below].max = self.slots[above].max;
                self.slots.remove(above);
                trace!(begin, end, "bridged two ranges");
            }
            (Some(below), None) => self.slots[below].max = end,
            (None, Some(above)) => self.slots[above].min = begin,
            (None, None) => self.slots.insert(index, Slot::new(begin, end)),
        }
    }
}

#[inline]
fn check_range(begin: i32, end: i32) -> Result<(), Error> {
    if end < begin {
        return Err(Error::InvalidRange { begin, end });
    }
    Ok(())
}

impl FromIterator<i32> for RangeSet {
    fn from_iter<I: IntoIterator<Item = i32>>(iter: I) -> Self {
        let mut set = RangeSet::new();
        for item in iter {
            set.insert_one(item);
        }
        set
    }
}

impl FromIterator<Range> for RangeSet {
    fn from_iter<I: IntoIterator<Item = Range>>(iter: I) -> Self {
        let mut set = RangeSet::new();
        for rng in iter {
            set.insert_span(rng.min, rng.max);
        }
        set
    }
}

impl<'a> IntoIterator for &'a RangeSet {
    type Item = i32;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
