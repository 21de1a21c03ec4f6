use service::Segment;

use std::collections::BTreeSet;

/// A region between two adjacent splits, `(split[i], split[i + 1])`.
pub type SplitRange = (usize, usize);

/// Sorted, deduplicated boundary indices of `segments`.
pub fn get_split(segments: &[Segment]) -> Vec<usize> {
    segments
        .iter()
        .flat_map(|segment| [segment.start_idx, segment.end_idx])
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn regions(splits: &[usize]) -> impl Iterator<Item = SplitRange> + '_ {
    splits.windows(2).map(|pair| (pair[0], pair[1]))
}

/// `(first, last)` of a sorted split set.
pub fn bounds(splits: &[usize]) -> Option<(usize, usize)> {
    Some((*splits.first()?, *splits.last()?))
}

/// Position of `value` in a sorted split set.
pub fn offset_of(splits: &[usize], value: usize) -> Option<usize> {
    splits.binary_search(&value).ok()
}

/// Splits within `[lo, hi]`.
pub fn within(splits: &[usize], lo: usize, hi: usize) -> Vec<usize> {
    splits
        .iter()
        .copied()
        .filter(|&point| point >= lo && point <= hi)
        .collect()
}

pub fn contains_range(splits: &[usize], (start, end): SplitRange) -> bool {
    offset_of(splits, start).is_some() && offset_of(splits, end).is_some()
}

/// Outer span of a contiguous run of regions.
pub fn span(ranges: &[SplitRange]) -> Option<SplitRange> {
    Some((ranges.first()?.0, ranges.last()?.1))
}
