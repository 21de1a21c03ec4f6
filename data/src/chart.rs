pub mod intention;
pub mod popover;
pub mod render;
pub mod scale;
pub mod scroll;
pub mod selection;
pub mod split;
pub mod submit;

use intention::{IntentionError, IntentionKey, IntentionModel};
use popover::{Anchor, ChoiceRow, PopoverController, PopoverState, Ticket};
use render::Interaction;
use selection::{Button, Context, Gesture, Outcome, Selection};
use split::SplitRange;
use submit::SubmitGate;

use service::adapter::query::{Comparison, ComparisonRequest};
use service::{Intentions, RawDataset, Segment, Source, Unit};
use uuid::Uuid;

/// One value column of a dataset, against its x values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Series {
    pub name: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub unit: Unit,
}

impl Series {
    pub fn from_dataset(dataset: &RawDataset, column: &str) -> Option<Series> {
        let column = dataset.column(column)?;
        let x = (0..dataset.x.len())
            .map(|idx| dataset.x.get(idx).unwrap_or(f64::NAN))
            .collect();

        Some(Series {
            name: column.name.clone(),
            x,
            y: column.values.clone(),
            unit: dataset.unit,
        })
    }

    pub fn len(&self) -> usize {
        self.x.len().min(self.y.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Body of a refinement request, minus the query it refines.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitRequest {
    pub segments: Vec<Segment>,
    pub intentions: Intentions,
    pub refining: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    EnvelopeChanged(Vec<usize>),
    Cancelled,
    Submit(SubmitRequest),
    Comparison {
        ticket: Ticket,
        request: ComparisonRequest,
    },
    IntentionsInvalidated {
        dropped: usize,
    },
}

/// Selection and intention state of one interactive chart.
#[derive(Debug, Clone)]
pub struct SplitChart {
    id: Uuid,
    segments: Vec<Segment>,
    candidates: Vec<usize>,
    envelope: Vec<usize>,
    accepted: Vec<usize>,
    authored: Vec<usize>,
    gesture: Gesture,
    hovered: Option<SplitRange>,
    intentions: IntentionModel,
    popover: PopoverController,
    submit: SubmitGate,
}

impl Default for SplitChart {
    fn default() -> Self {
        Self::new()
    }
}

impl SplitChart {
    pub fn new() -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            segments: Vec::new(),
            candidates: Vec::new(),
            envelope: Vec::new(),
            accepted: Vec::new(),
            authored: Vec::new(),
            gesture: Gesture::default(),
            hovered: None,
            intentions: IntentionModel::default(),
            popover: PopoverController::new(id),
            submit: SubmitGate::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn candidates(&self) -> &[usize] {
        &self.candidates
    }

    pub fn envelope(&self) -> &[usize] {
        &self.envelope
    }

    pub fn accepted(&self) -> &[usize] {
        &self.accepted
    }

    pub fn intentions(&self) -> &IntentionModel {
        &self.intentions
    }

    pub fn popover(&self) -> Option<&PopoverState> {
        self.popover.state()
    }

    pub fn is_requesting(&self) -> bool {
        self.submit.is_requesting()
    }

    pub fn is_dragging(&self) -> bool {
        self.gesture.is_dragging()
    }

    /// What the render pass needs to draw the interactive layer.
    pub fn interaction(&self) -> Interaction<'_> {
        Interaction {
            envelope: &self.envelope,
            preview: self.gesture.preview(&context(
                &self.candidates,
                &self.envelope,
                &self.accepted,
                &self.authored,
            )),
            staged: self.gesture.staged(),
            popover: self.popover.state(),
            intentions: &self.intentions,
            requesting: self.submit.is_requesting(),
            submit_label: self.submit.label(),
            submit_width: self.submit.button_width(),
        }
    }

    /// Replaces the segments of the active level. A different split set
    /// forgets the selection, the accepted splits and every intention.
    pub fn set_segments(&mut self, segments: Vec<Segment>) -> Vec<Event> {
        let candidates = split::get_split(&segments);
        self.segments = segments;
        if candidates == self.candidates {
            return Vec::new();
        }

        log::debug!(
            "Chart {} has {} candidate splits",
            self.id,
            candidates.len()
        );
        self.candidates = candidates;
        self.gesture.reset();
        self.hovered = None;
        self.popover.close();
        self.accepted.clear();
        self.authored.clear();
        self.envelope.clear();
        self.submit.sync(false);

        let dropped = self.intentions.len();
        self.intentions.clear();
        invalidated(dropped).into_iter().collect()
    }

    /// Accepted splits from outside, e.g. a focused result fragment. They
    /// also become the envelope.
    pub fn set_accepted(&mut self, splits: Vec<usize>) -> Vec<Event> {
        self.accepted = splits.clone();
        self.authored.clear();
        self.submit.sync(!self.accepted.is_empty());
        self.set_envelope(splits)
    }

    fn set_envelope(&mut self, envelope: Vec<usize>) -> Vec<Event> {
        if envelope == self.envelope {
            return Vec::new();
        }

        let dropped = self.intentions.remap(&self.envelope, &envelope);
        self.envelope = envelope;
        self.popover.retarget(&self.envelope, &self.intentions);

        let mut events = vec![Event::EnvelopeChanged(self.envelope.clone())];
        events.extend(invalidated(dropped));
        events
    }

    pub fn pointer_down(&mut self, region: SplitRange, button: Button) -> Vec<Event> {
        if self.submit.is_requesting() {
            return Vec::new();
        }
        self.hovered = Some(region);
        self.popover.close();

        let ctx = context(&self.candidates, &self.envelope, &self.accepted, &self.authored);
        let outcome = self.gesture.begin(region, button, &ctx);
        self.apply(outcome)
    }

    pub fn pointer_moved(&mut self, region: Option<SplitRange>) {
        if let Some(region) = region {
            self.hovered = Some(region);
            self.gesture.update(region);
        }
    }

    /// Ends a drag. Released outside every region, the last hovered one
    /// counts.
    pub fn pointer_up(&mut self, region: Option<SplitRange>) -> Vec<Event> {
        let region = region.or(self.hovered);
        let ctx = context(&self.candidates, &self.envelope, &self.accepted, &self.authored);
        let outcome = self.gesture.end(region, &ctx);
        self.apply(outcome)
    }

    pub fn set_modifier(&mut self, pressed: bool) -> Vec<Event> {
        let ctx = context(&self.candidates, &self.envelope, &self.accepted, &self.authored);
        let outcome = self.gesture.set_modifier(pressed, &ctx);
        self.apply(outcome)
    }

    /// Escape or a context-menu click: drops the drag, the selection and the
    /// popover.
    pub fn clear_selection(&mut self) {
        self.gesture.reset();
        self.popover.close();
    }

    /// Cancel button: clears the envelope and the accepted and drawn splits.
    pub fn cancel(&mut self) -> Vec<Event> {
        if self.submit.is_requesting() {
            return Vec::new();
        }
        self.clear_selection();
        self.accepted.clear();
        self.authored.clear();
        self.submit.sync(false);

        let mut events = self.set_envelope(Vec::new());
        events.push(Event::Cancelled);
        events
    }

    /// Reopens the popover of an annotation bracket.
    pub fn open_annotation(&mut self, key: IntentionKey, level: usize) -> Vec<Event> {
        let Some(choices) = self.intentions.find(&key) else {
            return Vec::new();
        };
        let kind = choices.kind();
        let Some(selection) = key
            .spans(&self.envelope)
            .and_then(|spans| Selection::from_spans(kind, &spans, &self.envelope))
        else {
            return Vec::new();
        };

        self.gesture.reset();
        self.open_popover(selection, Anchor::Annotation { level })
    }

    pub fn toggle_choice(&mut self, key: &str) -> bool {
        self.popover.toggle(key)
    }

    pub fn confirm_popover(&mut self) -> Result<Option<IntentionKey>, IntentionError> {
        let key = self.popover.confirm(&mut self.intentions)?;
        if let Some(key) = key {
            log::debug!("Chart {} stored intention for {key}", self.id);
            self.gesture.clear_selection();
        }
        Ok(key)
    }

    pub fn delete_popover(&mut self) -> bool {
        self.gesture.clear_selection();
        self.popover.delete(&mut self.intentions)
    }

    pub fn close_popover(&mut self) {
        self.gesture.clear_selection();
        self.popover.close();
    }

    pub fn apply_comparison(&mut self, ticket: Ticket, comparison: Comparison) -> bool {
        self.popover.apply_comparison(ticket, comparison)
    }

    pub fn choice_rows(&self, unit: Unit) -> Vec<ChoiceRow> {
        self.popover.describe(&self.segments, unit)
    }

    /// Packages the envelope and every intention into a refinement request.
    /// Rejected while one is already in flight.
    pub fn submit(&mut self) -> Vec<Event> {
        let Some((lo, hi)) = split::bounds(&self.envelope) else {
            return Vec::new();
        };
        let Some(refining) = self.submit.try_begin() else {
            return Vec::new();
        };

        let accepted = split::bounds(&self.accepted);
        let segments = self
            .segments
            .iter()
            .filter(|seg| seg.is_within(lo, hi))
            .map(|seg| Segment {
                source: match accepted {
                    Some((a, b)) if seg.is_within(a, b) => Source::Result,
                    _ => Source::User,
                },
                ..seg.clone()
            })
            .collect();

        self.gesture.reset();
        self.popover.close();

        vec![Event::Submit(SubmitRequest {
            segments,
            intentions: self.intentions.to_wire(),
            refining,
        })]
    }

    /// Settles the in-flight request. On success the envelope becomes the
    /// accepted splits and the intentions are spent.
    pub fn finish_submit(&mut self, accepted: bool) {
        self.submit.finish(accepted);
        if !accepted {
            return;
        }

        self.accepted = self.envelope.clone();
        self.authored.clear();
        self.intentions.clear();
        self.gesture.reset();
        self.popover.close();
        self.submit.sync(!self.accepted.is_empty());
    }

    fn apply(&mut self, outcome: Outcome) -> Vec<Event> {
        match outcome {
            Outcome::None | Outcome::DragStarted => Vec::new(),
            Outcome::Authored(splits) => {
                self.authored = splits.clone();
                self.popover.close();
                self.set_envelope(splits)
            }
            Outcome::Envelope(splits) => self.set_envelope(splits),
            Outcome::Staged => {
                self.popover.close();
                Vec::new()
            }
            Outcome::Open(selection) => self.open_popover(selection, Anchor::Regions),
        }
    }

    fn open_popover(&mut self, selection: Selection, anchor: Anchor) -> Vec<Event> {
        let Some(ticket) = self
            .popover
            .open(selection, anchor, &self.envelope, &self.intentions)
        else {
            return Vec::new();
        };

        self.popover
            .comparison_request(&self.segments, &self.envelope)
            .map(|request| vec![Event::Comparison { ticket, request }])
            .unwrap_or_default()
    }
}

/// Gesture context over the chart's split sets. Accepted splits win over
/// the ones the user drew while authoring.
fn context<'a>(
    candidates: &'a [usize],
    envelope: &'a [usize],
    accepted: &'a [usize],
    authored: &'a [usize],
) -> Context<'a> {
    Context {
        candidates,
        envelope,
        splits: if accepted.is_empty() { authored } else { accepted },
    }
}

fn invalidated(dropped: usize) -> Option<Event> {
    (dropped > 0).then(|| {
        log::warn!("{dropped} intention(s) no longer match the selected splits");
        Event::IntentionsInvalidated { dropped }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use intention::ChoiceSet;
    use selection::SelectionKind;
    use service::{SingleChoice, SingleRelationChoice};

    fn seg(start_idx: usize, end_idx: usize) -> Segment {
        Segment {
            start_idx,
            end_idx,
            ..Segment::default()
        }
    }

    /// Series `0..99` split at `[0, 20, 50, 99]`, with those splits accepted.
    fn chart() -> SplitChart {
        let mut chart = SplitChart::new();
        chart.set_segments(vec![seg(0, 20), seg(20, 50), seg(50, 99)]);
        chart.set_accepted(vec![0, 20, 50, 99]);
        chart
    }

    fn click(chart: &mut SplitChart, region: SplitRange) -> Vec<Event> {
        chart.pointer_down(region, Button::Primary);
        chart.pointer_up(Some(region))
    }

    #[test]
    fn single_region_commit_opens_single_segment() {
        let mut chart = chart();
        assert!(click(&mut chart, (20, 50)).is_empty());

        let state = chart.popover().unwrap();
        assert_eq!(state.selection.kind, SelectionKind::SingleSegment);
        assert_eq!(state.key, IntentionKey::Single(1));

        assert!(chart.toggle_choice("slope"));
        assert_eq!(chart.confirm_popover(), Ok(Some(IntentionKey::Single(1))));

        let wire = chart.intentions().to_wire();
        assert_eq!(wire.single_segment_intentions.len(), 1);
        assert_eq!(wire.single_segment_intentions[0].id, 1);
        assert_eq!(wire.single_segment_intentions[0].single_choices, vec![SingleChoice::Slope]);
    }

    #[test]
    fn dragging_across_regions_opens_group() {
        let mut chart = chart();
        chart.pointer_down((0, 20), Button::Primary);
        chart.pointer_moved(Some((20, 50)));
        chart.pointer_up(None);

        let state = chart.popover().unwrap();
        assert_eq!(state.selection.kind, SelectionKind::SegmentGroup);
        assert_eq!(state.key, IntentionKey::Group([0, 1]));
    }

    #[test]
    fn modifier_drags_build_a_relation() {
        let mut chart = chart();
        chart.set_modifier(true);
        assert!(click(&mut chart, (0, 20)).is_empty());
        assert!(!chart.interaction().staged.is_empty());

        let events = click(&mut chart, (50, 99));
        assert!(matches!(
            events.as_slice(),
            [Event::Comparison { request, .. }] if request.ids == Some(vec![[0, 20], [50, 99]])
        ));

        chart.toggle_choice("start_value");
        assert_eq!(
            chart.confirm_popover(),
            Ok(Some(IntentionKey::SingleRelation(0, 2)))
        );
        assert_eq!(
            chart.intentions().find(&IntentionKey::SingleRelation(0, 2)),
            Some(&ChoiceSet::SingleRelation(vec![SingleRelationChoice::StartValue]))
        );
    }

    #[test]
    fn stale_comparison_is_not_applied() {
        let mut chart = chart();
        chart.set_modifier(true);
        click(&mut chart, (0, 20));
        let first = match click(&mut chart, (50, 99)).pop() {
            Some(Event::Comparison { ticket, .. }) => ticket,
            other => panic!("expected a comparison request, got {other:?}"),
        };

        click(&mut chart, (0, 20));
        click(&mut chart, (20, 50));
        assert!(chart.popover().is_some());

        assert!(!chart.apply_comparison(first, Comparison::default()));
        assert_eq!(chart.popover().and_then(|s| s.comparison.as_ref()), None);
    }

    #[test]
    fn second_submit_is_rejected() {
        let mut chart = chart();
        let events = chart.submit();
        assert!(matches!(events.as_slice(), [Event::Submit(req)] if req.refining));
        assert!(chart.is_requesting());

        assert!(chart.submit().is_empty());
        assert!(chart.pointer_down((20, 50), Button::Primary).is_empty());
        assert!(!chart.is_dragging());
        assert!(chart.cancel().is_empty());
    }

    #[test]
    fn submission_marks_segments_outside_accepted_as_user() {
        let mut chart = SplitChart::new();
        chart.set_segments(vec![seg(0, 20), seg(20, 50), seg(50, 99)]);
        chart.set_accepted(vec![20, 50]);
        chart.pointer_down((50, 99), Button::Primary);
        assert_eq!(chart.envelope(), &[20, 50, 99]);

        let Some(Event::Submit(request)) = chart.submit().pop() else {
            panic!("expected a submit request");
        };
        let sources: Vec<Source> = request.segments.iter().map(|s| s.source).collect();
        assert_eq!(sources, vec![Source::Result, Source::User]);
    }

    #[test]
    fn failed_submit_keeps_state() {
        let mut chart = chart();
        click(&mut chart, (20, 50));
        chart.toggle_choice("slope");
        chart.confirm_popover().unwrap();

        chart.submit();
        chart.finish_submit(false);
        assert!(!chart.is_requesting());
        assert_eq!(chart.intentions().len(), 1);

        chart.submit();
        chart.finish_submit(true);
        assert!(chart.intentions().is_empty());
        assert_eq!(chart.accepted(), &[0, 20, 50, 99]);
    }

    #[test]
    fn authoring_draws_splits_into_the_envelope() {
        let mut chart = SplitChart::new();
        chart.set_segments(vec![seg(0, 20), seg(20, 50), seg(50, 99)]);
        assert_eq!(chart.interaction().submit_label, "Author");

        chart.pointer_down((0, 20), Button::Primary);
        chart.pointer_moved(Some((20, 50)));
        let events = chart.pointer_up(None);

        assert_eq!(events, vec![Event::EnvelopeChanged(vec![0, 20, 50])]);
        assert!(chart.popover().is_none());
    }

    #[test]
    fn right_click_shrinks_and_invalidates() {
        let mut chart = SplitChart::new();
        chart.set_segments((0..10).map(|i| seg(i * 10, i * 10 + 10)).collect());
        chart.set_accepted(vec![30, 40, 50, 60]);
        chart.pointer_down((0, 10), Button::Primary);
        assert_eq!(chart.envelope(), &[0, 10, 20, 30, 40, 50, 60]);

        click(&mut chart, (0, 10));
        chart.toggle_choice("slope");
        chart.confirm_popover().unwrap();
        click(&mut chart, (40, 50));
        chart.toggle_choice("duration");
        chart.confirm_popover().unwrap();

        let events = chart.pointer_down((10, 20), Button::Secondary);
        assert_eq!(
            events,
            vec![
                Event::EnvelopeChanged(vec![20, 30, 40, 50, 60]),
                Event::IntentionsInvalidated { dropped: 1 },
            ]
        );
        assert!(chart.intentions().find(&IntentionKey::Single(2)).is_some());
    }

    #[test]
    fn new_level_drops_everything() {
        let mut chart = chart();
        click(&mut chart, (20, 50));
        chart.toggle_choice("slope");
        chart.confirm_popover().unwrap();

        let events = chart.set_segments(vec![seg(0, 50), seg(50, 99)]);
        assert_eq!(events, vec![Event::IntentionsInvalidated { dropped: 1 }]);
        assert!(chart.envelope().is_empty());
        assert!(chart.accepted().is_empty());
    }

    #[test]
    fn cancel_clears_envelope() {
        let mut chart = chart();
        let events = chart.cancel();
        assert_eq!(
            events,
            vec![Event::EnvelopeChanged(vec![]), Event::Cancelled]
        );
        assert!(chart.accepted().is_empty());
        assert_eq!(chart.interaction().submit_label, "Author");
    }

    #[test]
    fn annotation_click_reopens_with_choices() {
        let mut chart = chart();
        click(&mut chart, (20, 50));
        chart.toggle_choice("duration");
        chart.confirm_popover().unwrap();

        chart.open_annotation(IntentionKey::Single(1), 0);
        let state = chart.popover().unwrap();
        assert!(state.existing);
        assert_eq!(state.anchor, Anchor::Annotation { level: 0 });
        assert_eq!(state.choices, ChoiceSet::Single(vec![SingleChoice::Duration]));
    }

    #[test]
    fn new_drag_discards_open_popover() {
        let mut chart = chart();
        click(&mut chart, (20, 50));
        assert!(chart.popover().is_some());

        chart.pointer_down((0, 20), Button::Primary);
        chart.pointer_moved(Some((20, 50)));
        assert!(chart.popover().is_none());
        assert!(chart.interaction().preview.is_some());

        chart.pointer_up(None);
        let state = chart.popover().unwrap();
        assert_eq!(state.selection.kind, SelectionKind::SegmentGroup);
    }

    #[test]
    fn escape_cancels_drag_and_popover() {
        let mut chart = chart();
        click(&mut chart, (20, 50));
        chart.pointer_down((0, 20), Button::Primary);
        assert!(chart.is_dragging());

        chart.clear_selection();
        assert!(!chart.is_dragging());
        assert!(chart.popover().is_none());
        assert!(chart.pointer_up(Some((0, 20))).is_empty());
    }
}
