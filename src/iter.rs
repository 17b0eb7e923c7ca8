use std::{iter::FusedIterator, slice};

use crate::{Range, Slot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    Start,
    At { range: usize, value: i32 },
    Done,
}

/// Ascending iterator over the members of a [`RangeSet`](crate::RangeSet).
///
/// Walking the whole set costs one step per member, not per range.
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    slots: &'a [Slot],
    cursor: Cursor,
    len: u64,
    yielded: u64,
}

impl<'a> Iter<'a> {
    pub(crate) fn new(slots: &'a [Slot], len: u64) -> Self {
        Iter {
            slots,
            cursor: Cursor::Start,
            len,
            yielded: 0,
        }
    }

    /// Rewinds to the smallest member.
    pub fn reset(&mut self) {
        self.cursor = Cursor::Start;
        self.yielded = 0;
    }

    fn advance(&self) -> Cursor {
        match self.cursor {
            Cursor::Start => match self.slots.first() {
                Some(slot) => Cursor::At {
                    range: 0,
                    value: slot.min,
                },
                None => Cursor::Done,
            },
            Cursor::At { range, value } if value == self.slots[range].max => {
                match self.slots.get(range + 1) {
                    Some(next) => Cursor::At {
                        range: range + 1,
                        value: next.min,
                    },
                    None => Cursor::Done,
                }
            }
            // value < max, no overflow
            Cursor::At { range, value } => Cursor::At {
                range,
                value: value + 1,
            },
            Cursor::Done => Cursor::Done,
        }
    }
}

impl Iterator for Iter<'_> {
    type Item = i32;

    fn next(&mut self) -> Option<i32> {
        self.cursor = self.advance();
        match self.cursor {
            Cursor::At { value, .. } => {
                self.yielded += 1;
                Some(value)
            }
            _ => None,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.yielded;
        match usize::try_from(remaining) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}

impl FusedIterator for Iter<'_> {}

/// Ascending snapshots of the stored ranges.
#[derive(Debug, Clone)]
pub struct Ranges<'a>(slice::Iter<'a, Slot>);

impl<'a> Ranges<'a> {
    pub(crate) fn new(slots: &'a [Slot]) -> Self {
        Ranges(slots.iter())
    }
}

impl Iterator for Ranges<'_> {
    type Item = Range;

    #[inline]
    fn next(&mut self) -> Option<Range> {
        self.0.next().map(Slot::snapshot)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl DoubleEndedIterator for Ranges<'_> {
    #[inline]
    fn next_back(&mut self) -> Option<Range> {
        self.0.next_back().map(Slot::snapshot)
    }
}

impl ExactSizeIterator for Ranges<'_> {}

impl FusedIterator for Ranges<'_> {}
