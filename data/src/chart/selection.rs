//! Pointer and modifier handling for split-region selection.
//!
//! A [`Gesture`] is owned by one chart. The canvas feeds it the region under
//! the pointer and it answers with an [`Outcome`]; it never touches pixels.

use super::split::{self, SplitRange};

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionKind {
    SingleSegment,
    SegmentGroup,
    SingleRelation,
    GroupRelation,
    Global,
}

impl SelectionKind {
    pub fn is_relation(self) -> bool {
        matches!(self, SelectionKind::SingleRelation | SelectionKind::GroupRelation)
    }

    /// Whether opening a popover of this kind asks the backend for comparator hints.
    pub fn wants_comparison(self) -> bool {
        self.is_relation() || self == SelectionKind::Global
    }
}

impl fmt::Display for SelectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SelectionKind::SingleSegment => "SingleSegment",
            SelectionKind::SegmentGroup => "SegmentGroup",
            SelectionKind::SingleRelation => "SingleRelation",
            SelectionKind::GroupRelation => "GroupRelation",
            SelectionKind::Global => "Global",
        };
        f.write_str(s)
    }
}

/// Contiguous regions picked by the user, plus the two sides of a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub kind: SelectionKind,
    pub ranges: Vec<SplitRange>,
    pub groups: Option<[Vec<SplitRange>; 2]>,
}

impl Selection {
    /// A plain selection inside `envelope`. Spanning every envelope region
    /// (and more than one) makes it global.
    pub fn regions(ranges: Vec<SplitRange>, envelope: &[usize]) -> Option<Selection> {
        let kind = match ranges.len() {
            0 => return None,
            1 => SelectionKind::SingleSegment,
            n if n + 1 == envelope.len() => SelectionKind::Global,
            _ => SelectionKind::SegmentGroup,
        };

        Some(Selection {
            kind,
            ranges,
            groups: None,
        })
    }

    /// Two sides in any order; they are stored left to right.
    pub fn relation(a: Vec<SplitRange>, b: Vec<SplitRange>) -> Option<Selection> {
        let (first, second) = match (a.first(), b.first()) {
            (Some(sa), Some(sb)) if sa.0 <= sb.0 => (a, b),
            (Some(_), Some(_)) => (b, a),
            _ => return None,
        };

        let kind = if first.len() > 1 || second.len() > 1 {
            SelectionKind::GroupRelation
        } else {
            SelectionKind::SingleRelation
        };

        let ranges = first.iter().chain(second.iter()).copied().collect();
        Some(Selection {
            kind,
            ranges,
            groups: Some([first, second]),
        })
    }

    /// Rebuilds the selection covering `spans`, cutting each span at `envelope`.
    pub fn from_spans(kind: SelectionKind, spans: &[SplitRange], envelope: &[usize]) -> Option<Selection> {
        let cut = |(start, end): SplitRange| -> Vec<SplitRange> {
            let points = split::within(envelope, start, end);
            split::regions(&points).collect()
        };

        match (kind.is_relation(), spans) {
            (true, [a, b]) => {
                let mut selection = Selection::relation(cut(*a), cut(*b))?;
                selection.kind = kind;
                Some(selection)
            }
            (false, [span]) => {
                let ranges = cut(*span);
                if ranges.is_empty() {
                    return None;
                }
                Some(Selection {
                    kind,
                    ranges,
                    groups: None,
                })
            }
            _ => None,
        }
    }

    pub fn span(&self) -> Option<SplitRange> {
        split::span(&self.ranges)
    }

    pub fn contains(&self, range: SplitRange) -> bool {
        self.ranges.contains(&range)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Primary,
    Secondary,
}

/// Split sets the gesture resolves against.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    /// Every split of the active level.
    pub candidates: &'a [usize],
    /// Splits currently selected for refinement.
    pub envelope: &'a [usize],
    /// Accepted splits, or the ones the user authored. Empty while authoring.
    pub splits: &'a [usize],
}

impl Context<'_> {
    fn is_authoring(&self) -> bool {
        self.splits.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    None,
    DragStarted,
    /// The user drew their own splits; they also become the envelope.
    Authored(Vec<usize>),
    /// The envelope was extended or shrunk.
    Envelope(Vec<usize>),
    /// One relation side is staged, any popover should close.
    Staged,
    Open(Selection),
}

/// Regions a drag in progress would select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub ranges: Vec<SplitRange>,
    pub relation: bool,
    pub authoring: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Drag {
    anchor: SplitRange,
    current: SplitRange,
}

#[derive(Debug, Clone, Default)]
pub struct Gesture {
    drag: Option<Drag>,
    modifier: bool,
    segment_ids: Vec<SplitRange>,
    relation_ids: Vec<SplitRange>,
}

impl Gesture {
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// The staged side of a pending relation.
    pub fn staged(&self) -> &[SplitRange] {
        &self.relation_ids
    }

    pub fn begin(&mut self, region: SplitRange, button: Button, ctx: &Context) -> Outcome {
        if ctx.is_authoring() {
            return match button {
                Button::Primary => self.start_drag(region),
                Button::Secondary => Outcome::None,
            };
        }

        let Some((min, max)) = split::bounds(ctx.envelope) else {
            return Outcome::None;
        };
        let (start, end) = region;

        match button {
            Button::Primary if start >= min && end <= max => self.start_drag(region),
            Button::Primary => {
                let (left, right) = (start.min(min), end.max(max));
                Outcome::Envelope(split::within(ctx.candidates, left, right))
            }
            Button::Secondary => {
                let Some((default_min, default_max)) = split::bounds(ctx.splits) else {
                    return Outcome::None;
                };

                let (left, right) = if start >= default_max {
                    (default_min.min(min), start)
                } else if end <= default_min {
                    (end, default_max.max(max))
                } else {
                    return Outcome::None;
                };

                let envelope = split::within(ctx.candidates, left, right);
                if envelope.len() < 2 || envelope == ctx.envelope {
                    return Outcome::None;
                }
                Outcome::Envelope(envelope)
            }
        }
    }

    fn start_drag(&mut self, region: SplitRange) -> Outcome {
        self.drag = Some(Drag {
            anchor: region,
            current: region,
        });
        Outcome::DragStarted
    }

    pub fn update(&mut self, region: SplitRange) {
        if let Some(drag) = &mut self.drag {
            drag.current = region;
        }
    }

    /// Releases the drag. `None` means the pointer left every region, the
    /// last hovered one is used instead.
    pub fn end(&mut self, region: Option<SplitRange>, ctx: &Context) -> Outcome {
        let Some(mut drag) = self.drag.take() else {
            return Outcome::None;
        };
        if let Some(region) = region {
            drag.current = region;
        }

        if ctx.is_authoring() {
            let (lo, hi) = drag.outer();
            let splits = split::within(ctx.candidates, lo, hi);
            return if splits.len() >= 2 {
                Outcome::Authored(splits)
            } else {
                Outcome::None
            };
        }

        let ranges = drag_ranges(&drag, ctx);
        if ranges.is_empty() {
            return Outcome::None;
        }

        if self.modifier {
            self.segment_ids.clear();
            if self.relation_ids.is_empty() || overlaps(&self.relation_ids, &ranges) {
                self.relation_ids = ranges;
                return Outcome::Staged;
            }

            let staged = std::mem::take(&mut self.relation_ids);
            return Selection::relation(staged, ranges).map_or(Outcome::None, Outcome::Open);
        }

        self.relation_ids.clear();
        self.segment_ids = ranges.clone();
        Selection::regions(ranges, ctx.envelope).map_or(Outcome::None, Outcome::Open)
    }

    pub fn cancel(&mut self) {
        self.drag = None;
    }

    /// Shift/Ctrl transitions. Pressing turns the current plain selection into
    /// a staged relation side; releasing with a side still staged turns it
    /// back into a plain selection.
    pub fn set_modifier(&mut self, pressed: bool, ctx: &Context) -> Outcome {
        if pressed == self.modifier {
            return Outcome::None;
        }
        self.modifier = pressed;

        if pressed {
            if self.segment_ids.is_empty() {
                return Outcome::None;
            }
            self.relation_ids = std::mem::take(&mut self.segment_ids);
            return Outcome::Staged;
        }

        if self.relation_ids.is_empty() {
            return Outcome::None;
        }

        let Some((min, max)) = split::bounds(ctx.envelope) else {
            self.relation_ids.clear();
            return Outcome::None;
        };
        let ranges: Vec<SplitRange> = std::mem::take(&mut self.relation_ids)
            .into_iter()
            .filter(|(s, e)| *s >= min && *e <= max)
            .collect();

        self.segment_ids = ranges.clone();
        Selection::regions(ranges, ctx.envelope).map_or(Outcome::None, Outcome::Open)
    }

    /// Forgets the drag and both selections. Modifier state is kept since
    /// the key may still be held.
    pub fn reset(&mut self) {
        self.drag = None;
        self.segment_ids.clear();
        self.relation_ids.clear();
    }

    /// Forgets the plain selection after its popover is dismissed.
    pub fn clear_selection(&mut self) {
        self.segment_ids.clear();
    }

    pub fn preview(&self, ctx: &Context) -> Option<Preview> {
        let drag = self.drag.as_ref()?;

        if ctx.is_authoring() {
            let (lo, hi) = drag.outer();
            let points = split::within(ctx.candidates, lo, hi);
            return Some(Preview {
                ranges: split::regions(&points).collect(),
                relation: false,
                authoring: true,
            });
        }

        Some(Preview {
            ranges: drag_ranges(drag, ctx),
            relation: self.modifier,
            authoring: false,
        })
    }
}

impl Drag {
    fn outer(&self) -> SplitRange {
        (
            self.anchor.0.min(self.current.0),
            self.anchor.1.max(self.current.1),
        )
    }
}

/// Candidate regions between anchor and current, clamped to the envelope.
fn drag_ranges(drag: &Drag, ctx: &Context) -> Vec<SplitRange> {
    let Some((min, max)) = split::bounds(ctx.envelope) else {
        return Vec::new();
    };
    let (lo, hi) = drag.outer();
    let (lo, hi) = (lo.max(min), hi.min(max));

    split::regions(ctx.candidates)
        .filter(|(s, e)| *s >= lo && *e <= hi)
        .collect()
}

fn overlaps(a: &[SplitRange], b: &[SplitRange]) -> bool {
    match (split::span(a), split::span(b)) {
        (Some((a0, a1)), Some((b0, b1))) => a0 < b1 && b0 < a1,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPLITS: [usize; 4] = [0, 20, 50, 99];

    fn ctx() -> Context<'static> {
        Context {
            candidates: &SPLITS,
            envelope: &SPLITS,
            splits: &SPLITS,
        }
    }

    fn click(gesture: &mut Gesture, region: SplitRange) -> Outcome {
        assert_eq!(gesture.begin(region, Button::Primary, &ctx()), Outcome::DragStarted);
        gesture.end(Some(region), &ctx())
    }

    fn opened(outcome: Outcome) -> Selection {
        match outcome {
            Outcome::Open(selection) => selection,
            other => panic!("expected a popover, got {other:?}"),
        }
    }

    #[test]
    fn adjacent_pair_is_a_single_segment() {
        let mut gesture = Gesture::default();
        let selection = opened(click(&mut gesture, (20, 50)));

        assert_eq!(selection.kind, SelectionKind::SingleSegment);
        assert_eq!(selection.ranges, vec![(20, 50)]);
    }

    #[test]
    fn drag_across_regions_is_a_group() {
        let splits = [0, 10, 20, 50, 99];
        let ctx = Context {
            candidates: &splits,
            envelope: &splits,
            splits: &splits,
        };
        let mut gesture = Gesture::default();
        gesture.begin((20, 50), Button::Primary, &ctx);
        gesture.update((10, 20));
        let selection = opened(gesture.end(None, &ctx));

        assert_eq!(selection.kind, SelectionKind::SegmentGroup);
        assert_eq!(selection.ranges, vec![(10, 20), (20, 50)]);
    }

    #[test]
    fn drag_over_whole_envelope_is_global() {
        let mut gesture = Gesture::default();
        gesture.begin((0, 20), Button::Primary, &ctx());
        let selection = opened(gesture.end(Some((50, 99)), &ctx()));

        assert_eq!(selection.kind, SelectionKind::Global);
        assert_eq!(selection.ranges.len(), 3);
    }

    #[test]
    fn drag_is_clamped_to_envelope() {
        let envelope = [20, 50, 99];
        let ctx = Context {
            candidates: &SPLITS,
            envelope: &envelope,
            splits: &SPLITS,
        };
        let mut gesture = Gesture::default();
        gesture.begin((50, 99), Button::Primary, &ctx);
        gesture.update((0, 20));

        let preview = gesture.preview(&ctx).unwrap();
        assert_eq!(preview.ranges, vec![(20, 50), (50, 99)]);

        let selection = opened(gesture.end(None, &ctx));
        assert_eq!(selection.kind, SelectionKind::Global);
    }

    #[test]
    fn relation_sides_are_stored_left_to_right() {
        let mut gesture = Gesture::default();
        gesture.set_modifier(true, &ctx());

        assert_eq!(click(&mut gesture, (50, 99)), Outcome::Staged);
        assert_eq!(gesture.staged(), &[(50, 99)]);

        let selection = opened(click(&mut gesture, (0, 20)));
        assert_eq!(selection.kind, SelectionKind::SingleRelation);
        assert_eq!(selection.groups, Some([vec![(0, 20)], vec![(50, 99)]]));
        assert!(gesture.staged().is_empty());
    }

    #[test]
    fn wider_side_makes_a_group_relation() {
        let mut gesture = Gesture::default();
        gesture.set_modifier(true, &ctx());
        click(&mut gesture, (0, 20));

        gesture.begin((20, 50), Button::Primary, &ctx());
        let selection = opened(gesture.end(Some((50, 99)), &ctx()));
        assert_eq!(selection.kind, SelectionKind::GroupRelation);
    }

    #[test]
    fn overlapping_second_side_restages() {
        let mut gesture = Gesture::default();
        gesture.set_modifier(true, &ctx());
        click(&mut gesture, (0, 20));

        gesture.begin((0, 20), Button::Primary, &ctx());
        assert_eq!(gesture.end(Some((20, 50)), &ctx()), Outcome::Staged);
        assert_eq!(gesture.staged(), &[(0, 20), (20, 50)]);
    }

    #[test]
    fn modifier_press_and_release_round_trip() {
        let mut gesture = Gesture::default();
        opened(click(&mut gesture, (20, 50)));

        assert_eq!(gesture.set_modifier(true, &ctx()), Outcome::Staged);
        assert_eq!(gesture.staged(), &[(20, 50)]);

        let selection = opened(gesture.set_modifier(false, &ctx()));
        assert_eq!(selection.ranges, vec![(20, 50)]);
        assert!(gesture.staged().is_empty());

        // repeated key-up events are ignored
        assert_eq!(gesture.set_modifier(false, &ctx()), Outcome::None);
    }

    #[test]
    fn release_outside_regions_uses_last_hover() {
        let mut gesture = Gesture::default();
        gesture.begin((0, 20), Button::Primary, &ctx());
        gesture.update((20, 50));
        let selection = opened(gesture.end(None, &ctx()));
        assert_eq!(selection.ranges, vec![(0, 20), (20, 50)]);
    }

    #[test]
    fn drag_outside_every_split_is_a_no_op() {
        let envelope: [usize; 0] = [];
        let ctx = Context {
            candidates: &SPLITS,
            envelope: &envelope,
            splits: &SPLITS,
        };
        let mut gesture = Gesture::default();
        assert_eq!(gesture.begin((0, 20), Button::Primary, &ctx), Outcome::None);
        assert!(!gesture.is_dragging());
        assert_eq!(gesture.end(Some((0, 20)), &ctx), Outcome::None);
    }

    #[test]
    fn left_click_outside_extends_envelope() {
        let envelope = [20, 50];
        let ctx = Context {
            candidates: &SPLITS,
            envelope: &envelope,
            splits: &SPLITS,
        };
        let mut gesture = Gesture::default();
        assert_eq!(
            gesture.begin((50, 99), Button::Primary, &ctx),
            Outcome::Envelope(vec![20, 50, 99])
        );
    }

    #[test]
    fn right_click_past_accepted_bounds_adjusts_envelope() {
        let candidates = [0, 10, 20, 50, 70, 99];
        let accepted = [10, 20, 50];

        let wide = [0, 10, 20, 50, 70, 99];
        let ctx = Context {
            candidates: &candidates,
            envelope: &wide,
            splits: &accepted,
        };
        let mut gesture = Gesture::default();
        // shrink toward the clicked region on either side
        assert_eq!(
            gesture.begin((70, 99), Button::Secondary, &ctx),
            Outcome::Envelope(vec![0, 10, 20, 50, 70])
        );
        assert_eq!(
            gesture.begin((0, 10), Button::Secondary, &ctx),
            Outcome::Envelope(vec![10, 20, 50, 70, 99])
        );

        let narrow = [10, 20, 50];
        let ctx = Context {
            envelope: &narrow,
            ..ctx
        };
        // grow to meet a region on the right
        assert_eq!(gesture.begin((0, 10), Button::Secondary, &ctx), Outcome::None);
        assert_eq!(
            gesture.begin((70, 99), Button::Secondary, &ctx),
            Outcome::Envelope(vec![10, 20, 50, 70])
        );
        // inside the accepted bounds nothing happens
        assert_eq!(gesture.begin((10, 20), Button::Secondary, &ctx), Outcome::None);
    }

    #[test]
    fn authoring_drag_yields_candidate_splits() {
        let none: [usize; 0] = [];
        let ctx = Context {
            candidates: &SPLITS,
            envelope: &none,
            splits: &none,
        };
        let mut gesture = Gesture::default();
        assert_eq!(gesture.begin((20, 50), Button::Primary, &ctx), Outcome::DragStarted);
        gesture.update((50, 99));

        let preview = gesture.preview(&ctx).unwrap();
        assert!(preview.authoring);
        assert_eq!(preview.ranges, vec![(20, 50), (50, 99)]);

        assert_eq!(gesture.end(None, &ctx), Outcome::Authored(vec![20, 50, 99]));
    }

    #[test]
    fn cancel_drops_the_drag() {
        let mut gesture = Gesture::default();
        gesture.begin((0, 20), Button::Primary, &ctx());
        gesture.cancel();
        assert!(!gesture.is_dragging());
        assert_eq!(gesture.end(Some((0, 20)), &ctx()), Outcome::None);
    }

    #[test]
    fn spans_rebuild_relation_groups() {
        let splits = [0, 10, 20, 50, 99];
        let selection =
            Selection::from_spans(SelectionKind::GroupRelation, &[(50, 99), (0, 20)], &splits).unwrap();
        assert_eq!(
            selection.groups,
            Some([vec![(0, 10), (10, 20)], vec![(50, 99)]])
        );
        assert_eq!(selection.span(), Some((0, 99)));
    }
}
