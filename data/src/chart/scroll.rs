//! Wheel zoom, brush and window helpers shared by the detail and overview charts.

use super::Series;
use super::scale::{Layout, Margin};

use service::Segment;

/// Segments of padding kept around a focused result fragment.
const FOCUS_PADDING: usize = 4;

/// Index step for one wheel notch: a tenth of the visible window.
pub fn wheel_step(range: Option<(usize, usize)>, len: usize) -> i64 {
    let total = match range {
        Some((start, end)) => end.abs_diff(start),
        None => len,
    };
    ((total as f64 / 10.0).round() as i64).max(1)
}

/// Cursor x mapped to `[-1, 1]` across the inner plot width.
pub fn wheel_position(cursor_x: f32, outer_width: f32, margin: Margin) -> f32 {
    let inner = (outer_width - margin.left - margin.right).max(1.0);
    let relative = ((cursor_x - margin.left) / inner).clamp(0.0, 1.0);
    relative * 2.0 - 1.0
}

/// Grows (positive `step`) or shrinks the window, splitting the change
/// between both ends by where the cursor sits. Windows narrower than two
/// indices are rejected.
pub fn scrolled(range: Option<(usize, usize)>, len: usize, step: i64, position: f32) -> Option<(usize, usize)> {
    if len == 0 {
        return None;
    }
    let last = len as i64 - 1;
    let (start, end) = match range {
        Some((s, e)) if (s, e) != (0, 0) => (s as i64, e as i64),
        _ => (0, last),
    };

    let left_ratio = 0.5 + f64::from(position.clamp(-1.0, 1.0)) * 0.5;
    let right_ratio = 1.0 - left_ratio;

    let new_start = ((start as f64 - step as f64 * left_ratio).round() as i64).max(0);
    let new_end = ((end as f64 + step as f64 * right_ratio).round() as i64).min(last);

    if (new_start - new_end).abs() < 2 {
        return None;
    }
    let (lo, hi) = (new_start.min(new_end), new_start.max(new_end));
    Some((lo as usize, hi as usize))
}

/// Pixel span of a brush to the indices whose x falls inside it.
pub fn brush_to_indices(layout: &Layout, series: &Series, x0: f32, x1: f32) -> Option<(usize, usize)> {
    let (a, b) = (layout.x.invert(x0), layout.x.invert(x1));
    let (lo, hi) = (a.min(b), a.max(b));

    let first = series.x.partition_point(|x| *x < lo);
    let end = series.x.partition_point(|x| *x <= hi);
    (first < end).then(|| (first, end - 1))
}

/// Window around a result fragment, padded by a few segments on each side.
pub fn focus_window(level_segments: &[Segment], fragment: &[Segment]) -> Option<(usize, usize)> {
    let (first, last) = (fragment.first()?, fragment.last()?);
    if level_segments.is_empty() {
        return Some((first.start_idx, last.end_idx));
    }

    let r1 = level_segments
        .iter()
        .position(|seg| seg.start_idx == first.start_idx)
        .unwrap_or(0);
    let r2 = level_segments
        .iter()
        .position(|seg| seg.end_idx == last.end_idx)
        .unwrap_or(level_segments.len() - 1);

    let lo = &level_segments[r1.saturating_sub(FOCUS_PADDING)];
    let hi = &level_segments[(r2 + FOCUS_PADDING).min(level_segments.len() - 1)];
    Some((lo.start_idx.min(first.start_idx), hi.end_idx.max(last.end_idx)))
}

/// Outer span of the segments overlapping `[start, end]` by more than half
/// their own length.
pub fn select_by_overlap(segments: &[Segment], start: usize, end: usize) -> Option<(usize, usize)> {
    let picked: Vec<&Segment> = segments
        .iter()
        .filter(|seg| {
            let span = seg.end_idx.saturating_sub(seg.start_idx) as f64;
            let overlap = end.min(seg.end_idx).saturating_sub(start.max(seg.start_idx)) as f64;
            overlap > span / 2.0
        })
        .collect();

    Some((picked.first()?.start_idx, picked.last()?.end_idx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::scale::Viewport;
    use service::Unit;

    fn seg(start_idx: usize, end_idx: usize) -> Segment {
        Segment {
            start_idx,
            end_idx,
            ..Segment::default()
        }
    }

    #[test]
    fn step_is_a_tenth_of_window() {
        assert_eq!(wheel_step(None, 1_000), 100);
        assert_eq!(wheel_step(Some((100, 150)), 1_000), 5);
        assert_eq!(wheel_step(Some((10, 12)), 1_000), 1);
    }

    #[test]
    fn centered_scroll_grows_both_sides() {
        assert_eq!(scrolled(Some((100, 200)), 1_000, 10, 0.0), Some((95, 205)));
        assert_eq!(scrolled(Some((100, 200)), 1_000, -10, 0.0), Some((105, 195)));
    }

    #[test]
    fn cursor_at_left_edge_moves_right_end_only() {
        assert_eq!(scrolled(Some((100, 200)), 1_000, 10, -1.0), Some((100, 210)));
        assert_eq!(scrolled(Some((100, 200)), 1_000, 10, 1.0), Some((90, 200)));
    }

    #[test]
    fn empty_range_means_whole_series_and_clamps() {
        assert_eq!(scrolled(None, 100, 10, 0.0), Some((0, 99)));
        assert_eq!(scrolled(Some((0, 0)), 100, -10, 0.0), Some((5, 94)));
    }

    #[test]
    fn too_narrow_window_is_rejected() {
        assert_eq!(scrolled(Some((50, 53)), 100, -2, 0.0), None);
        assert_eq!(scrolled(None, 0, 1, 0.0), None);
    }

    #[test]
    fn wheel_position_is_normalized() {
        let margin = Margin::DETAIL;
        assert_eq!(wheel_position(0.0, 565.0, margin), -1.0);
        assert_eq!(wheel_position(300.0, 565.0, margin), 0.0);
        assert_eq!(wheel_position(1_000.0, 565.0, margin), 1.0);
    }

    #[test]
    fn brush_maps_pixels_to_indices() {
        let series = Series {
            name: "v".to_string(),
            x: (0..101).map(f64::from).collect(),
            y: (0..101).map(f64::from).collect(),
            unit: Unit::Number,
        };
        let layout = Layout::fit(&series, None, &Viewport::new(100.0, 40.0, Margin::NONE)).unwrap();

        assert_eq!(brush_to_indices(&layout, &series, 20.5, 40.2), Some((21, 40)));
        assert_eq!(brush_to_indices(&layout, &series, 40.2, 20.5), Some((21, 40)));
        assert_eq!(brush_to_indices(&layout, &series, 20.2, 20.4), None);
    }

    #[test]
    fn focus_pads_by_four_segments() {
        let level: Vec<Segment> = (0..20).map(|i| seg(i * 10, i * 10 + 10)).collect();

        let fragment = [seg(100, 110), seg(110, 120)];
        assert_eq!(focus_window(&level, &fragment), Some((60, 160)));

        let near_start = [seg(10, 20)];
        assert_eq!(focus_window(&level, &near_start), Some((0, 60)));

        assert_eq!(focus_window(&level, &[]), None);
    }

    #[test]
    fn overlap_selection_needs_more_than_half() {
        let segments = [seg(0, 10), seg(10, 20), seg(20, 30)];
        assert_eq!(select_by_overlap(&segments, 6, 24), Some((10, 20)));
        assert_eq!(select_by_overlap(&segments, 0, 30), Some((0, 30)));
        assert_eq!(select_by_overlap(&segments, 12, 14), None);
    }
}
