//! Multi-column tuple ranges.
//!
//! A [`Range`] holds two parallel cut vectors, `start` and `stop`, one cut
//! per key column. A tuple is a member iff [`Range::above_start`] and
//! [`Range::below_stop`] both hold; each is evaluated column by column and
//! the first column whose cut discriminates decides. Tuples *between* the
//! bounds need not satisfy every per-column predicate — a multi-column range
//! is not an interval in the lexicographic order, which is also why range
//! scans place their start cursor with a per-node linear scan: the membership
//! predicate is not monotone across a sorted node, so a general binary search
//! would be unsound. Single-column point lookups are monotone and get a
//! binary search ([`search_point`]).
//!
//! NULL ordering: NULLs sort after every value. A `Value` cut therefore
//! never admits NULL; a `Null` cut admits only NULL; `NotNull` admits any
//! value ([`split_nulls_from_range`] uses it to make the non-NULL branch of
//! a split explicit).

use crate::format::Node;
use crate::tuple::{raw_field, TupleDesc};
use std::cmp::Ordering;
use std::fmt;

/// One column's bound within a [`Range`].
#[derive(Clone, Debug, PartialEq)]
pub enum RangeCut {
    /// Matches anything, including NULL.
    NonBinding,
    /// Matches only NULL.
    Null,
    /// Matches any non-NULL value.
    NotNull,
    /// Bounds the column at an encoded value.
    Value { value: Vec<u8>, inclusive: bool },
}

impl RangeCut {
    /// True for the cut that binds nothing.
    pub fn non_binding(&self) -> bool {
        matches!(self, RangeCut::NonBinding)
    }

    /// Ordering of two cuts on one column, used to sort and merge ranges.
    /// NULL cuts order last; unbound cuts never order below anything.
    fn less(&self, other: &RangeCut, desc: &TupleDesc, i: usize) -> bool {
        let self_null = matches!(self, RangeCut::Null);
        let other_null = matches!(other, RangeCut::Null);
        if self_null || other_null {
            return !self_null && other_null;
        }
        let (value, inclusive) = match self {
            RangeCut::Value { value, inclusive } => (value, *inclusive),
            _ => return false,
        };
        let (other_value, other_inclusive) = match other {
            RangeCut::Value { value, inclusive } => (value, *inclusive),
            _ => return false,
        };
        match desc.compare_values(i, value, other_value) {
            Ordering::Equal => !inclusive || !other_inclusive,
            ord => ord == Ordering::Less,
        }
    }
}

/// A contiguous range of tuples between two compound bounds.
#[derive(Clone, Debug, PartialEq)]
pub struct Range {
    pub start: Vec<RangeCut>,
    pub stop: Vec<RangeCut>,
    pub desc: TupleDesc,
}

impl Range {
    /// True iff `tuple` is at or above the range's start bound.
    pub fn above_start(&self, tuple: &[u8]) -> bool {
        for (i, cut) in self.start.iter().enumerate() {
            let field = raw_field(tuple, i);
            match cut {
                RangeCut::NonBinding => continue,
                RangeCut::Null => return field.is_none(),
                RangeCut::NotNull => {
                    if field.is_none() {
                        return false;
                    }
                }
                RangeCut::Value { value, inclusive } => {
                    let Some(field) = field else {
                        // NULLs order last: above any start value, but a
                        // value-bound start never admits them
                        return false;
                    };
                    match self.desc.compare_values(i, value, field) {
                        Ordering::Less => continue,
                        Ordering::Equal if *inclusive => continue,
                        _ => return false,
                    }
                }
            }
        }
        true
    }

    /// True iff `tuple` is at or below the range's stop bound.
    pub fn below_stop(&self, tuple: &[u8]) -> bool {
        for (i, cut) in self.stop.iter().enumerate() {
            if !self.stop_cut_admits(i, cut, tuple) {
                return false;
            }
            // a Null cut that matched decides membership outright
            if matches!(cut, RangeCut::Null) {
                return true;
            }
        }
        true
    }

    /// Whether the column-0 stop cut alone still admits `tuple`. Forward
    /// iteration halts when this fails: keys are sorted on column 0 first,
    /// so nothing later can re-enter the range.
    pub fn column_zero_in_stop(&self, tuple: &[u8]) -> bool {
        match self.stop.first() {
            Some(cut) => self.stop_cut_admits(0, cut, tuple),
            None => true,
        }
    }

    fn stop_cut_admits(&self, i: usize, cut: &RangeCut, tuple: &[u8]) -> bool {
        let field = raw_field(tuple, i);
        match cut {
            RangeCut::NonBinding => true,
            RangeCut::Null => field.is_none(),
            RangeCut::NotNull => field.is_some(),
            RangeCut::Value { value, inclusive } => {
                let Some(field) = field else {
                    return false;
                };
                match self.desc.compare_values(i, value, field) {
                    Ordering::Greater => true,
                    Ordering::Equal => *inclusive,
                    Ordering::Less => false,
                }
            }
        }
    }

    /// True iff this range is an inclusive point bound on a single column —
    /// the one shape whose start search is monotone.
    pub fn is_single_column_point(&self) -> bool {
        if self.desc.field_count() != 1 {
            return false;
        }
        match (self.start.first(), self.stop.first()) {
            (
                Some(RangeCut::Value { value: lo, inclusive: true }),
                Some(RangeCut::Value { value: hi, inclusive: true }),
            ) => self.desc.compare_values(0, lo, hi) == Ordering::Equal,
            _ => false,
        }
    }

    fn less(&self, other: &Range) -> bool {
        debug_assert_eq!(self.start.len(), other.start.len());
        for (i, left) in self.start.iter().enumerate() {
            if left.less(&other.start[i], &self.desc, i) {
                return true;
            }
        }
        false
    }

    /// Column-0 overlap test: two ranges overlap iff neither's stop is
    /// strictly below the other's start.
    fn overlaps(&self, other: &Range) -> bool {
        if self.stop[0].less(&other.start[0], &self.desc, 0) {
            return false;
        }
        if other.stop[0].less(&self.start[0], &self.desc, 0) {
            return false;
        }
        true
    }

    /// Cut-wise union: the min of each start pair, the max of each stop pair.
    fn merge(&self, other: &Range) -> Range {
        debug_assert_eq!(self.start.len(), other.start.len());
        debug_assert_eq!(self.stop.len(), other.stop.len());

        let start = self
            .start
            .iter()
            .zip(&other.start)
            .enumerate()
            .map(|(i, (left, right))| {
                if left.non_binding() || right.non_binding() {
                    return RangeCut::NonBinding;
                }
                if right.less(left, &self.desc, i) {
                    right.clone()
                } else {
                    left.clone()
                }
            })
            .collect();

        let stop = self
            .stop
            .iter()
            .zip(&other.stop)
            .enumerate()
            .map(|(i, (left, right))| {
                if left.non_binding() || right.non_binding() {
                    return RangeCut::NonBinding;
                }
                if right.less(left, &self.desc, i) {
                    left.clone()
                } else {
                    right.clone()
                }
            })
            .collect();

        Range {
            start,
            stop,
            desc: other.desc.clone(),
        }
    }
}

impl fmt::Display for Range {
    /// Renders like `( tuple[0] >= 1, tuple[1] < 5 )` for logs and assertions.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "( ")?;
        let mut seen_one = false;
        for (cuts, ops) in [(&self.start, [">", ">="]), (&self.stop, ["<", "<="])] {
            for (i, cut) in cuts.iter().enumerate() {
                if cut.non_binding() {
                    continue;
                }
                if seen_one {
                    write!(f, ", ")?;
                }
                seen_one = true;
                match cut {
                    RangeCut::Null => write!(f, "tuple[{i}] == NULL")?,
                    RangeCut::NotNull => write!(f, "tuple[{i}] != NULL")?,
                    RangeCut::Value { value, inclusive } => {
                        let op = ops[*inclusive as usize];
                        write!(f, "tuple[{i}] {op} {}", self.desc.format_value(i, value))?;
                    }
                    RangeCut::NonBinding => unreachable!(),
                }
            }
        }
        write!(f, " )")
    }
}

// ============================================================================
// Constructors
// ============================================================================

fn inclusive_bound(tuple: &[u8], desc: &TupleDesc) -> Vec<RangeCut> {
    (0..desc.field_count())
        .map(|i| match raw_field(tuple, i) {
            Some(v) => RangeCut::Value {
                value: v.to_vec(),
                inclusive: true,
            },
            None => RangeCut::NonBinding,
        })
        .collect()
}

fn exclusive_bound(tuple: &[u8], desc: &TupleDesc) -> Vec<RangeCut> {
    let mut cuts = inclusive_bound(tuple, desc);
    if let Some(RangeCut::Value { inclusive, .. }) = cuts.last_mut() {
        *inclusive = false;
    }
    cuts
}

fn unbound(desc: &TupleDesc) -> Vec<RangeCut> {
    vec![RangeCut::NonBinding; desc.field_count()]
}

/// Tuples strictly greater than `start`.
pub fn greater_range(start: &[u8], desc: TupleDesc) -> Range {
    Range {
        start: exclusive_bound(start, &desc),
        stop: unbound(&desc),
        desc,
    }
}

/// Tuples greater than or equal to `start`.
pub fn greater_or_equal_range(start: &[u8], desc: TupleDesc) -> Range {
    Range {
        start: inclusive_bound(start, &desc),
        stop: unbound(&desc),
        desc,
    }
}

/// Tuples strictly less than `stop`.
pub fn lesser_range(stop: &[u8], desc: TupleDesc) -> Range {
    Range {
        start: unbound(&desc),
        stop: exclusive_bound(stop, &desc),
        desc,
    }
}

/// Tuples less than or equal to `stop`.
pub fn lesser_or_equal_range(stop: &[u8], desc: TupleDesc) -> Range {
    Range {
        start: unbound(&desc),
        stop: inclusive_bound(stop, &desc),
        desc,
    }
}

/// Tuples strictly between `start` and `stop`.
pub fn open_range(start: &[u8], stop: &[u8], desc: TupleDesc) -> Range {
    Range {
        start: exclusive_bound(start, &desc),
        stop: exclusive_bound(stop, &desc),
        desc,
    }
}

/// Tuples in `(start, stop]`.
pub fn open_start_range(start: &[u8], stop: &[u8], desc: TupleDesc) -> Range {
    Range {
        start: exclusive_bound(start, &desc),
        stop: inclusive_bound(stop, &desc),
        desc,
    }
}

/// Tuples in `[start, stop)`.
pub fn open_stop_range(start: &[u8], stop: &[u8], desc: TupleDesc) -> Range {
    Range {
        start: inclusive_bound(start, &desc),
        stop: exclusive_bound(stop, &desc),
        desc,
    }
}

/// Tuples in `[start, stop]`.
pub fn closed_range(start: &[u8], stop: &[u8], desc: TupleDesc) -> Range {
    Range {
        start: inclusive_bound(start, &desc),
        stop: inclusive_bound(stop, &desc),
        desc,
    }
}

// ============================================================================
// Sorting, merging, null splitting
// ============================================================================

/// Sort ranges by start bound under the descriptor's comparator.
pub fn sort_ranges(mut ranges: Vec<Range>) -> Vec<Range> {
    ranges.sort_by(|a, b| {
        if a.less(b) {
            Ordering::Less
        } else if b.less(a) {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    });
    ranges
}

/// Coalesce overlapping or adjacent ranges. The result covers the same
/// tuple set and is pairwise disjoint on column 0.
pub fn merge_overlapping_ranges(ranges: Vec<Range>) -> Vec<Range> {
    if ranges.len() <= 1 {
        return ranges;
    }
    let ranges = sort_ranges(ranges);

    let mut merged = Vec::with_capacity(ranges.len());
    let mut iter = ranges.into_iter();
    let mut acc = iter.next().unwrap();
    for range in iter {
        if acc.overlaps(&range) {
            acc = acc.merge(&range);
        } else {
            merged.push(acc);
            acc = range;
        }
    }
    merged.push(acc);
    merged
}

/// Split a range on every nullable column that could match both NULL and
/// non-NULL values, producing one range intersected with "is NULL" and one
/// with "is not NULL" per such column. Empty intersections (NULL branches
/// of non-nullable columns) are never produced.
///
/// Storage does not keep a column's NULLs adjacent to its values in
/// secondary layouts, so physical scans need each branch spelled out.
pub fn split_nulls_from_range(range: Range) -> Vec<Range> {
    let mut result = vec![range];
    let columns = result[0].start.len().min(result[0].stop.len());
    for i in 0..columns {
        let splittable = {
            let r = &result[0];
            r.desc.field(i).nullable && r.start[i].non_binding() && r.stop[i].non_binding()
        };
        if !splittable {
            continue;
        }
        let mut split = Vec::with_capacity(result.len() * 2);
        for r in result {
            let mut with_null = r.clone();
            with_null.start[i] = RangeCut::Null;
            with_null.stop[i] = RangeCut::Null;
            let mut without_null = r;
            without_null.start[i] = RangeCut::NotNull;
            without_null.stop[i] = RangeCut::NotNull;
            split.push(with_null);
            split.push(without_null);
        }
        result = split;
    }
    result
}

/// [`split_nulls_from_range`] over a batch.
pub fn split_nulls_from_ranges(ranges: Vec<Range>) -> Vec<Range> {
    ranges.into_iter().flat_map(split_nulls_from_range).collect()
}

// ============================================================================
// In-node searches
// ============================================================================

/// Index of the first key in `node` satisfying [`Range::above_start`].
///
/// Linear by necessity: the predicate is not monotone over a sorted node
/// once more than one column binds.
pub(crate) fn search_above_start(node: &Node, range: &Range) -> usize {
    for idx in 0..node.count() {
        if range.above_start(node.key(idx)) {
            return idx;
        }
    }
    node.count()
}

/// Monotone binary search for a single-column point bound: index of the
/// first key whose column 0 is ≥ the bound.
pub(crate) fn search_point(node: &Node, range: &Range) -> usize {
    debug_assert!(range.is_single_column_point());
    let RangeCut::Value { value, .. } = &range.start[0] else {
        return 0;
    };
    let mut lo = 0usize;
    let mut hi = node.count();
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if range.desc.compare_field(value, 0, node.key(mid)) == Ordering::Greater {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}
