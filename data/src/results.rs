//! Query result listing: fragments, their attributes, filters, ranking and
//! paging, and focusing one fragment on the detail chart.

use crate::chart::scale::{format_number, format_time};
use crate::chart::scroll::focus_window;
use crate::chart::split::get_split;

use rustc_hash::FxHashMap;
use service::{ApproximationResults, Segment, Unit};
use std::cmp::Ordering;
use std::fmt;

const FIRST_PAGE: usize = 10;
const PAGE: usize = 10;
const PAGE_AFTER_SORT: usize = 20;

/// One matching run of consecutive segments.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub index: usize,
    pub source: String,
    pub level: usize,
    pub segments: Vec<Segment>,
}

impl Fragment {
    pub fn span(&self) -> Option<(usize, usize)> {
        Some((self.segments.first()?.start_idx, self.segments.last()?.end_idx))
    }

    pub fn splits(&self) -> Vec<usize> {
        get_split(&self.segments)
    }
}

/// Flattens results source by source, level by level.
pub fn fragments(results: &ApproximationResults) -> Vec<Fragment> {
    results
        .iter()
        .flat_map(|(source, levels)| {
            levels.iter().flat_map(move |(level, lists)| {
                lists.iter().map(move |segments| (source, *level, segments))
            })
        })
        .enumerate()
        .map(|(index, (source, level, segments))| Fragment {
            index,
            source: source.clone(),
            level,
            segments: segments.clone(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentAttribute {
    Slope,
    RelativeSlope,
    Duration,
    Score,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    AverageScore,
    Duration,
    Level,
    StartTime,
    EndTime,
    MinValue,
    MaxValue,
    /// Attribute of the n-th segment of a fragment.
    Segment(usize, SegmentAttribute),
}

impl Attribute {
    const GLOBAL: [Attribute; 7] = [
        Attribute::AverageScore,
        Attribute::Duration,
        Attribute::Level,
        Attribute::StartTime,
        Attribute::EndTime,
        Attribute::MinValue,
        Attribute::MaxValue,
    ];

    /// Permanent attributes are always listed, the rest only on demand.
    pub fn is_permanent(self) -> bool {
        matches!(
            self,
            Attribute::AverageScore
                | Attribute::Duration
                | Attribute::Level
                | Attribute::Segment(_, SegmentAttribute::Slope | SegmentAttribute::Score)
        )
    }

    pub fn fixed_range(self) -> Option<(f64, f64)> {
        match self {
            Attribute::AverageScore | Attribute::Segment(_, SegmentAttribute::Score) => {
                Some((0.0, 1.0))
            }
            _ => None,
        }
    }

    pub fn value(self, fragment: &Fragment, unit: Unit) -> Option<f64> {
        let segments = &fragment.segments;
        let (first, last) = (segments.first()?, segments.last()?);

        match self {
            Attribute::AverageScore => {
                let total: f64 = segments.iter().map(|s| s.score.unwrap_or(0.0)).sum();
                Some(total / segments.len() as f64)
            }
            Attribute::Duration => match (first.start_time, last.end_time) {
                (Some(start), Some(end)) => Some((end - start) / unit.seconds()),
                _ => Some(last.end_idx.saturating_sub(first.start_idx) as f64),
            },
            Attribute::Level => Some(fragment.level as f64),
            Attribute::StartTime => first.start_time,
            Attribute::EndTime => last.end_time,
            Attribute::MinValue => segments
                .iter()
                .map(|s| s.min_value.unwrap_or(s.start_value.min(s.end_value)))
                .reduce(f64::min),
            Attribute::MaxValue => segments
                .iter()
                .map(|s| s.max_value.unwrap_or(s.start_value.max(s.end_value)))
                .reduce(f64::max),
            Attribute::Segment(n, attribute) => {
                let segment = segments.get(n)?;
                match attribute {
                    SegmentAttribute::Slope => Some(segment.slope * unit.seconds()),
                    SegmentAttribute::RelativeSlope => segment.relative_slope,
                    SegmentAttribute::Duration => Some(match segment.duration {
                        Some(duration) => duration / unit.seconds(),
                        None => segment.end_idx.saturating_sub(segment.start_idx) as f64,
                    }),
                    SegmentAttribute::Score => segment.score,
                }
            }
        }
    }

    pub fn format(self, value: f64, unit: Unit) -> String {
        match self {
            Attribute::StartTime | Attribute::EndTime if unit.is_time() => {
                format_time((value * 1000.0) as i64, unit)
            }
            Attribute::StartTime | Attribute::EndTime | Attribute::Level => format_number(value),
            Attribute::Duration | Attribute::Segment(_, SegmentAttribute::Duration) => {
                if unit.is_time() {
                    format!("{} {unit}", format_number(value))
                } else {
                    format_number(value)
                }
            }
            Attribute::Segment(_, SegmentAttribute::RelativeSlope) => format!("{value:.2}%"),
            _ => format!("{value:.2}"),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::AverageScore => write!(f, "average score"),
            Attribute::Duration => write!(f, "duration"),
            Attribute::Level => write!(f, "level"),
            Attribute::StartTime => write!(f, "start time"),
            Attribute::EndTime => write!(f, "end time"),
            Attribute::MinValue => write!(f, "min value"),
            Attribute::MaxValue => write!(f, "max value"),
            Attribute::Segment(n, attribute) => {
                let name = match attribute {
                    SegmentAttribute::Slope => "slope",
                    SegmentAttribute::RelativeSlope => "relative slope",
                    SegmentAttribute::Duration => "duration",
                    SegmentAttribute::Score => "score",
                };
                write!(f, "{name} #{}", n + 1)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Ascending,
    Descending,
}

/// Filtered, ranked and paged view over the fragments of one result.
#[derive(Debug, Clone)]
pub struct ResultsView {
    fragments: Vec<Fragment>,
    unit: Unit,
    filters: FxHashMap<Attribute, (f64, f64)>,
    sort: Vec<(Attribute, Order)>,
    count: usize,
}

impl Default for ResultsView {
    fn default() -> Self {
        Self {
            fragments: Vec::new(),
            unit: Unit::default(),
            filters: FxHashMap::default(),
            sort: Vec::new(),
            count: FIRST_PAGE,
        }
    }
}

impl ResultsView {
    pub fn new(results: &ApproximationResults, unit: Unit) -> Self {
        Self {
            fragments: fragments(results),
            unit,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn fragment(&self, index: usize) -> Option<&Fragment> {
        self.fragments.iter().find(|f| f.index == index)
    }

    /// Every attribute a fragment of this result can have.
    pub fn attributes(&self) -> Vec<Attribute> {
        let longest = self.fragments.iter().map(|f| f.segments.len()).max().unwrap_or(0);
        let per_segment = (0..longest).flat_map(|n| {
            [
                SegmentAttribute::Slope,
                SegmentAttribute::RelativeSlope,
                SegmentAttribute::Duration,
                SegmentAttribute::Score,
            ]
            .map(|attribute| Attribute::Segment(n, attribute))
        });

        Attribute::GLOBAL.into_iter().chain(per_segment).collect()
    }

    /// Attributes shown as columns: the permanent ones and any in use.
    pub fn columns(&self) -> Vec<Attribute> {
        self.attributes()
            .into_iter()
            .filter(|a| {
                a.is_permanent()
                    || self.filters.contains_key(a)
                    || self.sort.iter().any(|(key, _)| key == a)
            })
            .collect()
    }

    /// Slider bounds for an attribute.
    pub fn extent(&self, attribute: Attribute) -> Option<(f64, f64)> {
        attribute.fixed_range().or_else(|| {
            self.fragments
                .iter()
                .filter_map(|f| attribute.value(f, self.unit))
                .fold(None, |acc, v| match acc {
                    None => Some((v, v)),
                    Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
                })
        })
    }

    pub fn filter(&self, attribute: Attribute) -> Option<(f64, f64)> {
        self.filters.get(&attribute).copied()
    }

    pub fn set_filter(&mut self, attribute: Attribute, bounds: Option<(f64, f64)>) {
        match bounds {
            Some(bounds) => {
                self.filters.insert(attribute, bounds);
            }
            None => {
                self.filters.remove(&attribute);
            }
        }
    }

    pub fn sort_order(&self, attribute: Attribute) -> Option<Order> {
        self.sort
            .iter()
            .find_map(|(key, order)| (*key == attribute).then_some(*order))
    }

    /// Cycles a sort key through ascending, descending and off. New keys
    /// rank after existing ones.
    pub fn toggle_sort(&mut self, attribute: Attribute) {
        match self.sort.iter().position(|(key, _)| *key == attribute) {
            None => self.sort.push((attribute, Order::Ascending)),
            Some(pos) if self.sort[pos].1 == Order::Ascending => {
                self.sort[pos].1 = Order::Descending;
            }
            Some(pos) => {
                self.sort.remove(pos);
            }
        }
        self.count = PAGE_AFTER_SORT;
    }

    fn passes(&self, fragment: &Fragment) -> bool {
        self.filters.iter().all(|(attribute, (min, max))| {
            attribute
                .value(fragment, self.unit)
                .map(|v| (v * 100.0).round() / 100.0)
                .is_some_and(|v| v >= *min && v <= *max)
        })
    }

    fn compare(&self, a: &Fragment, b: &Fragment) -> Ordering {
        self.sort
            .iter()
            .map(|(attribute, order)| {
                let (va, vb) = (attribute.value(a, self.unit), attribute.value(b, self.unit));
                match (va, vb) {
                    (Some(va), Some(vb)) => {
                        let ord = va.total_cmp(&vb);
                        match order {
                            Order::Ascending => ord,
                            Order::Descending => ord.reverse(),
                        }
                    }
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
            })
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    /// Fragments passing every filter, ranked.
    pub fn matching(&self) -> Vec<&Fragment> {
        let mut out: Vec<&Fragment> = self.fragments.iter().filter(|f| self.passes(f)).collect();
        out.sort_by(|a, b| self.compare(a, b));
        out
    }

    /// The current page of [`Self::matching`].
    pub fn visible(&self) -> Vec<&Fragment> {
        let mut out = self.matching();
        out.truncate(self.count);
        out
    }

    /// Grows the page, `false` when everything is already shown.
    pub fn load_more(&mut self) -> bool {
        if self.count >= self.matching().len() {
            return false;
        }
        self.count += PAGE;
        true
    }
}

/// Where the detail chart goes when a fragment is focused.
#[derive(Debug, Clone, PartialEq)]
pub struct Focus {
    pub source: String,
    pub level: usize,
    pub window: (usize, usize),
    pub splits: Vec<usize>,
}

/// `level_segments` are the approximation of the fragment's source at the
/// fragment's level.
pub fn focus(fragment: &Fragment, level_segments: &[Segment]) -> Option<Focus> {
    let window = focus_window(level_segments, &fragment.segments)?;
    Some(Focus {
        source: fragment.source.clone(),
        level: fragment.level,
        window,
        splits: fragment.splits(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seg(start_idx: usize, end_idx: usize, score: Option<f64>) -> Segment {
        Segment {
            start_idx,
            end_idx,
            start_value: 1.0,
            end_value: 3.0,
            slope: 0.5,
            score,
            ..Segment::default()
        }
    }

    fn results() -> ApproximationResults {
        serde_json::from_value(json!({
            "b": { "1": [
                [{ "start_idx": 0, "end_idx": 4, "slope": 1.0, "start_value": 0.0, "end_value": 4.0, "score": 0.9 }],
            ]},
            "a": { "0": [
                [{ "start_idx": 0, "end_idx": 2, "slope": 1.0, "start_value": 0.0, "end_value": 2.0, "score": 0.5 }],
                [{ "start_idx": 5, "end_idx": 9, "slope": 1.0, "start_value": 2.0, "end_value": 6.0, "score": 0.7 }],
            ]},
        }))
        .unwrap()
    }

    #[test]
    fn fragments_flatten_in_source_order() {
        let all = fragments(&results());
        let keys: Vec<(usize, &str, usize)> = all
            .iter()
            .map(|f| (f.index, f.source.as_str(), f.level))
            .collect();
        assert_eq!(keys, vec![(0, "a", 0), (1, "a", 0), (2, "b", 1)]);
        assert_eq!(all[1].span(), Some((5, 9)));
    }

    #[test]
    fn average_score_counts_missing_as_zero() {
        let fragment = Fragment {
            index: 0,
            source: "a".to_string(),
            level: 0,
            segments: vec![seg(0, 2, Some(0.8)), seg(2, 4, None)],
        };
        let value = Attribute::AverageScore.value(&fragment, Unit::Number);
        assert_eq!(value, Some(0.4));
        assert_eq!(Attribute::MaxValue.value(&fragment, Unit::Number), Some(3.0));
        assert_eq!(
            Attribute::Segment(1, SegmentAttribute::Slope).value(&fragment, Unit::Minute),
            Some(30.0)
        );
        assert_eq!(Attribute::Segment(2, SegmentAttribute::Slope).value(&fragment, Unit::Number), None);
    }

    #[test]
    fn durations_and_times_format_with_unit() {
        assert_eq!(Attribute::Duration.format(3.0, Unit::Day), "3 day");
        assert_eq!(Attribute::StartTime.format(0.0, Unit::Day), "1970/01/01");
        assert_eq!(
            Attribute::Segment(0, SegmentAttribute::RelativeSlope).format(12.345, Unit::Number),
            "12.35%"
        );
        assert_eq!(Attribute::AverageScore.format(0.5, Unit::Number), "0.50");
    }

    #[test]
    fn sort_cycles_and_stays_stable() {
        let mut view = ResultsView::new(&results(), Unit::Number);
        let order = |view: &ResultsView| view.matching().iter().map(|f| f.index).collect::<Vec<_>>();

        view.toggle_sort(Attribute::AverageScore);
        assert_eq!(view.sort_order(Attribute::AverageScore), Some(Order::Ascending));
        assert_eq!(order(&view), vec![0, 1, 2]);

        view.toggle_sort(Attribute::AverageScore);
        assert_eq!(order(&view), vec![2, 1, 0]);

        view.toggle_sort(Attribute::AverageScore);
        assert_eq!(view.sort_order(Attribute::AverageScore), None);
        assert_eq!(order(&view), vec![0, 1, 2]);

        // Ties on level keep the flattened order.
        view.toggle_sort(Attribute::Level);
        assert_eq!(order(&view), vec![0, 1, 2]);
    }

    #[test]
    fn filters_compare_rounded_values() {
        let mut view = ResultsView::new(&results(), Unit::Number);
        view.set_filter(Attribute::AverageScore, Some((0.6, 1.0)));
        let kept: Vec<usize> = view.matching().iter().map(|f| f.index).collect();
        assert_eq!(kept, vec![1, 2]);
        assert!(view.columns().contains(&Attribute::AverageScore));

        view.set_filter(Attribute::AverageScore, None);
        assert_eq!(view.matching().len(), 3);
        assert_eq!(view.extent(Attribute::MaxValue), Some((2.0, 6.0)));
        assert_eq!(view.extent(Attribute::AverageScore), Some((0.0, 1.0)));
    }

    #[test]
    fn paging_grows_until_everything_is_shown() {
        let lists: Vec<_> = (0..25)
            .map(|i| vec![json!({ "start_idx": i, "end_idx": i + 1, "slope": 0.0, "start_value": 0.0, "end_value": 0.0 })])
            .collect();
        let results: ApproximationResults =
            serde_json::from_value(json!({ "a": { "0": lists } })).unwrap();

        let mut view = ResultsView::new(&results, Unit::Number);
        assert_eq!(view.visible().len(), 10);
        assert!(view.load_more());
        assert!(view.load_more());
        assert_eq!(view.visible().len(), 25);
        assert!(!view.load_more());

        view.toggle_sort(Attribute::Level);
        assert_eq!(view.visible().len(), 20);
    }

    #[test]
    fn focus_pads_window_and_carries_splits() {
        let level: Vec<Segment> = (0..12).map(|i| seg(i * 10, i * 10 + 10, None)).collect();
        let fragment = Fragment {
            index: 0,
            source: "a".to_string(),
            level: 2,
            segments: level[5..7].to_vec(),
        };

        let focus = focus(&fragment, &level).unwrap();
        assert_eq!(focus.window, (10, 110));
        assert_eq!(focus.splits, vec![50, 60, 70]);
        assert_eq!(focus.level, 2);
    }
}
