use super::intention::{ChoiceSet, IntentionError, IntentionKey, IntentionModel};
use super::selection::{Selection, SelectionKind};
use super::split::{self, SplitRange};

use service::adapter::query::{Comparison, ComparisonRequest};
use service::intention::title_case;
use service::{Segment, Unit};
use uuid::Uuid;

/// Identifies the popover a comparison request was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub chart: Uuid,
    pub generation: u64,
}

/// Where the popover is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Above the highlighted regions.
    Regions,
    /// Next to an annotation bracket on the given row.
    Annotation { level: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PopoverState {
    pub selection: Selection,
    pub key: IntentionKey,
    pub choices: ChoiceSet,
    /// An intention with this key already exists, so it can be deleted.
    pub existing: bool,
    pub anchor: Anchor,
    pub comparison: Option<Comparison>,
    pub ticket: Ticket,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceRow {
    pub key: &'static str,
    pub label: String,
    pub hint: Option<String>,
    pub checked: bool,
}

#[derive(Debug, Clone)]
pub struct PopoverController {
    state: Option<PopoverState>,
    generation: u64,
    chart: Uuid,
}

impl PopoverController {
    pub fn new(chart: Uuid) -> Self {
        Self {
            state: None,
            generation: 0,
            chart,
        }
    }

    pub fn state(&self) -> Option<&PopoverState> {
        self.state.as_ref()
    }

    /// Opens for `selection`, pre-checked from any intention with the same key.
    /// Returns a ticket when the popover wants comparator hints.
    pub fn open(
        &mut self,
        selection: Selection,
        anchor: Anchor,
        envelope: &[usize],
        model: &IntentionModel,
    ) -> Option<Ticket> {
        self.close();

        let Some(key) = IntentionKey::from_selection(&selection, envelope) else {
            log::debug!("Selection {:?} is outside the envelope", selection.ranges);
            return None;
        };

        let (choices, existing) = match model.find(&key) {
            Some(choices) => (choices.clone(), true),
            None => (ChoiceSet::empty(selection.kind), false),
        };

        let ticket = Ticket {
            chart: self.chart,
            generation: self.generation,
        };
        let wants_comparison = selection.kind.wants_comparison();

        self.state = Some(PopoverState {
            selection,
            key,
            choices,
            existing,
            anchor,
            comparison: None,
            ticket,
        });

        wants_comparison.then_some(ticket)
    }

    pub fn toggle(&mut self, key: &str) -> bool {
        self.state
            .as_mut()
            .is_some_and(|state| state.choices.toggle_key(key))
    }

    /// Writes the checked choices into `model` and closes. With nothing
    /// checked the popover stays open and the model is untouched.
    pub fn confirm(&mut self, model: &mut IntentionModel) -> Result<Option<IntentionKey>, IntentionError> {
        let Some(state) = &self.state else {
            return Ok(None);
        };

        model.upsert(state.key, state.choices.clone())?;
        let key = state.key;
        self.close();
        Ok(Some(key))
    }

    /// Removes the intention behind the popover, if any, and closes.
    pub fn delete(&mut self, model: &mut IntentionModel) -> bool {
        let removed = self
            .state
            .as_ref()
            .is_some_and(|state| model.remove(&state.key));
        self.close();
        removed
    }

    pub fn close(&mut self) {
        self.state = None;
        self.generation += 1;
    }

    /// Re-keys the open popover after the envelope moved. Closes it when the
    /// selection is no longer addressable inside `envelope`.
    pub fn retarget(&mut self, envelope: &[usize], model: &IntentionModel) -> bool {
        let Some(state) = &mut self.state else {
            return false;
        };

        let inside = match (split::bounds(envelope), state.selection.span()) {
            (Some((lo, hi)), Some((start, end))) => start >= lo && end <= hi,
            _ => false,
        };
        let still_global = state.selection.kind != SelectionKind::Global
            || state.selection.ranges.len() + 1 == envelope.len();

        match IntentionKey::from_selection(&state.selection, envelope) {
            Some(key) if inside && still_global => {
                state.key = key;
                state.existing = model.find(&key).is_some();
                true
            }
            _ => {
                self.close();
                false
            }
        }
    }

    /// Applies a comparison result if `ticket` still names the open popover.
    pub fn apply_comparison(&mut self, ticket: Ticket, comparison: Comparison) -> bool {
        match &mut self.state {
            Some(state) if state.ticket == ticket => {
                state.comparison = Some(comparison);
                true
            }
            _ => {
                log::debug!(
                    "Discarding stale comparison for generation {} (now {})",
                    ticket.generation,
                    self.generation
                );
                false
            }
        }
    }

    /// Body for the comparison endpoint: every segment inside the envelope,
    /// plus the two sides for relations.
    pub fn comparison_request(&self, segments: &[Segment], envelope: &[usize]) -> Option<ComparisonRequest> {
        let state = self.state.as_ref()?;
        if !state.selection.kind.wants_comparison() {
            return None;
        }

        let (lo, hi) = split::bounds(envelope)?;
        let segments = segments
            .iter()
            .filter(|seg| seg.is_within(lo, hi))
            .cloned()
            .collect();

        let ids = match &state.selection.groups {
            Some(groups) => Some(
                groups
                    .iter()
                    .map(|side| split::span(side).map(|(s, e)| [s, e]))
                    .collect::<Option<Vec<_>>>()?,
            ),
            None => None,
        };

        Some(ComparisonRequest { segments, ids })
    }

    /// One row per offered attribute with its current value as a hint.
    pub fn describe(&self, segments: &[Segment], unit: Unit) -> Vec<ChoiceRow> {
        let Some(state) = &self.state else {
            return Vec::new();
        };
        let kind = state.selection.kind;
        let fmt = Hints {
            unit,
            comparison: state.comparison.as_ref(),
        };

        let subject = Subject::of(&state.selection, segments);

        ChoiceSet::available(kind)
            .into_iter()
            .map(|key| ChoiceRow {
                key,
                label: title_case(key),
                hint: subject.as_ref().and_then(|s| fmt.hint(kind, key, s)),
                checked: state.choices.contains_key(key),
            })
            .collect()
    }
}

/// Values the hints are computed from.
#[derive(Debug, Clone, PartialEq)]
enum Subject {
    One(Composite),
    Pair(Composite, Composite),
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Composite {
    slope: Option<f64>,
    relative_slope: Option<f64>,
    start_value: Option<f64>,
    end_value: Option<f64>,
    duration: Option<f64>,
}

impl Composite {
    /// A lone segment is used as is; several collapse into their outer
    /// values and summed duration.
    fn of(span: SplitRange, segments: &[Segment]) -> Option<Composite> {
        let inside: Vec<&Segment> = segments
            .iter()
            .filter(|seg| seg.is_within(span.0, span.1))
            .collect();

        match inside.as_slice() {
            [] => None,
            [seg] => Some(Composite {
                slope: Some(seg.slope),
                relative_slope: seg.relative_slope,
                start_value: Some(seg.start_value),
                end_value: Some(seg.end_value),
                duration: seg.duration,
            }),
            [first, .., last] => Some(Composite {
                start_value: Some(first.start_value),
                end_value: Some(last.end_value),
                duration: Some(inside.iter().filter_map(|seg| seg.duration).sum()),
                ..Composite::default()
            }),
        }
    }

    fn duration_only(self) -> Composite {
        Composite {
            duration: self.duration,
            ..Composite::default()
        }
    }
}

impl Subject {
    fn of(selection: &Selection, segments: &[Segment]) -> Option<Subject> {
        match &selection.groups {
            Some([a, b]) => {
                let left = Composite::of(split::span(a)?, segments)?;
                let right = Composite::of(split::span(b)?, segments)?;
                let single_sides = a.len() == 1 && b.len() == 1;

                Some(if single_sides {
                    Subject::Pair(left, right)
                } else {
                    Subject::Pair(left.duration_only(), right.duration_only())
                })
            }
            None => Composite::of(selection.span()?, segments).map(Subject::One),
        }
    }
}

struct Hints<'a> {
    unit: Unit,
    comparison: Option<&'a Comparison>,
}

impl Hints<'_> {
    fn slope(&self, slope: f64) -> String {
        format!("{:.4}", slope * self.unit.seconds())
    }

    fn duration(&self, seconds: f64) -> String {
        format!("{:.2}", seconds / self.unit.seconds())
    }

    fn hint(&self, kind: SelectionKind, key: &str, subject: &Subject) -> Option<String> {
        let unit = self.unit;

        match (kind, subject) {
            (SelectionKind::SingleSegment, Subject::One(seg)) => match key {
                "slope" => Some(format!("({}/{unit})", self.slope(seg.slope?))),
                "relative_slope" => Some(format!("({:.4}%)", seg.relative_slope?)),
                "duration" => Some(format!("({} {unit})", self.duration(seg.duration?))),
                _ => None,
            },
            (SelectionKind::SegmentGroup, Subject::One(seg)) => match key {
                "duration" => Some(format!("({} {unit})", self.duration(seg.duration?))),
                _ => None,
            },
            (SelectionKind::Global, Subject::One(seg)) => match key {
                "duration" => Some(format!("({} {unit})", self.duration(seg.duration?))),
                "compare_start_end_value" => {
                    let cmp = self.comparison?.get(key)?;
                    Some(format!("({:.2}{cmp}{:.2})", seg.start_value?, seg.end_value?))
                }
                _ => None,
            },
            (SelectionKind::SingleRelation, Subject::Pair(a, b)) => {
                let cmp = self.comparison?.get(key)?;
                match key {
                    "slope" => Some(format!(
                        "({}{cmp}{})[/{unit}]",
                        self.slope(a.slope?),
                        self.slope(b.slope?)
                    )),
                    "duration" => Some(format!(
                        "({}{cmp}{})[{unit}]",
                        self.duration(a.duration?),
                        self.duration(b.duration?)
                    )),
                    "start_value" => Some(format!("({:.2}{cmp}{:.2})", a.start_value?, b.start_value?)),
                    "end_value" => Some(format!("({:.2}{cmp}{:.2})", a.end_value?, b.end_value?)),
                    "relative_slope" => Some(format!(
                        "({:.4}%{cmp}{:.4}%)",
                        a.relative_slope?, b.relative_slope?
                    )),
                    _ => None,
                }
            }
            (SelectionKind::GroupRelation, Subject::Pair(a, b)) => match key {
                "duration" => {
                    let cmp = self.comparison?.get(key)?;
                    Some(format!(
                        "({} {cmp} {} {unit})",
                        self.duration(a.duration?),
                        self.duration(b.duration?)
                    ))
                }
                _ => None,
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use service::{Comparator, SingleChoice, SingleRelationChoice};

    const SPLITS: [usize; 4] = [0, 20, 50, 99];

    fn segment(start_idx: usize, end_idx: usize, slope: f64, duration: f64) -> Segment {
        Segment {
            start_idx,
            end_idx,
            slope,
            start_value: start_idx as f64,
            end_value: end_idx as f64,
            duration: Some(duration),
            relative_slope: Some(1.5),
            ..Segment::default()
        }
    }

    fn segments() -> Vec<Segment> {
        vec![
            segment(0, 20, 1.0, 86_400.0 * 2.0),
            segment(20, 50, -0.5, 86_400.0 * 3.0),
            segment(50, 99, 0.0, 86_400.0 * 5.0),
        ]
    }

    fn controller() -> PopoverController {
        PopoverController::new(Uuid::nil())
    }

    #[test]
    fn confirm_then_reopen_restores_choices() {
        let mut model = IntentionModel::default();
        let mut popover = controller();
        let relation = Selection::relation(vec![(0, 20)], vec![(50, 99)]).unwrap();

        popover.open(relation.clone(), Anchor::Regions, &SPLITS, &model);
        assert!(popover.toggle("start_value"));
        assert_eq!(popover.confirm(&mut model), Ok(Some(IntentionKey::SingleRelation(0, 2))));
        assert!(popover.state().is_none());

        let wire = model.to_wire();
        assert_eq!(wire.single_relation_intentions[0].id1, 0);
        assert_eq!(wire.single_relation_intentions[0].id2, 2);

        // picked right side first this time
        let reversed = Selection::relation(vec![(50, 99)], vec![(0, 20)]).unwrap();
        popover.open(reversed, Anchor::Regions, &SPLITS, &model);
        let state = popover.state().unwrap();
        assert!(state.existing);
        assert_eq!(
            state.choices,
            ChoiceSet::SingleRelation(vec![SingleRelationChoice::StartValue])
        );
    }

    #[test]
    fn confirm_without_choices_keeps_popover_open() {
        let mut model = IntentionModel::default();
        let mut popover = controller();
        popover.open(
            Selection::regions(vec![(20, 50)], &SPLITS).unwrap(),
            Anchor::Regions,
            &SPLITS,
            &model,
        );

        assert!(popover.state().is_some_and(|s| s.choices.is_empty()));
        assert_eq!(popover.confirm(&mut model), Err(IntentionError::EmptyChoices));
        assert!(popover.state().is_some());
        assert!(model.is_empty());
    }

    #[test]
    fn scenario_single_segment_slope() {
        let mut model = IntentionModel::default();
        let mut popover = controller();
        let ticket = popover.open(
            Selection::regions(vec![(20, 50)], &SPLITS).unwrap(),
            Anchor::Regions,
            &SPLITS,
            &model,
        );
        assert!(ticket.is_none());

        popover.toggle("slope");
        popover.confirm(&mut model).unwrap();

        let wire = model.to_wire();
        assert_eq!(wire.single_segment_intentions.len(), 1);
        assert_eq!(wire.single_segment_intentions[0].id, 1);
        assert_eq!(
            wire.single_segment_intentions[0].single_choices,
            vec![SingleChoice::Slope]
        );
    }

    #[test]
    fn delete_removes_existing() {
        let mut model = IntentionModel::default();
        model
            .upsert(IntentionKey::Single(1), ChoiceSet::Single(vec![SingleChoice::Duration]))
            .unwrap();

        let mut popover = controller();
        popover.open(
            Selection::regions(vec![(20, 50)], &SPLITS).unwrap(),
            Anchor::Regions,
            &SPLITS,
            &model,
        );
        assert!(popover.state().unwrap().existing);
        assert!(popover.delete(&mut model));
        assert!(model.is_empty());
        assert!(popover.state().is_none());
    }

    #[test]
    fn stale_comparison_is_discarded() {
        let model = IntentionModel::default();
        let mut popover = controller();

        let first = popover
            .open(
                Selection::relation(vec![(0, 20)], vec![(50, 99)]).unwrap(),
                Anchor::Regions,
                &SPLITS,
                &model,
            )
            .unwrap();
        let second = popover
            .open(
                Selection::relation(vec![(0, 20)], vec![(20, 50)]).unwrap(),
                Anchor::Regions,
                &SPLITS,
                &model,
            )
            .unwrap();
        assert_ne!(first, second);

        let mut result = Comparison::default();
        result.insert("slope".to_string(), Comparator::Greater);

        assert!(!popover.apply_comparison(first, result.clone()));
        assert!(popover.state().unwrap().comparison.is_none());

        assert!(popover.apply_comparison(second, result.clone()));
        popover.close();
        assert!(!popover.apply_comparison(second, result));
    }

    #[test]
    fn comparison_request_carries_sides() {
        let model = IntentionModel::default();
        let mut popover = controller();
        popover.open(
            Selection::relation(vec![(0, 20)], vec![(50, 99)]).unwrap(),
            Anchor::Regions,
            &SPLITS,
            &model,
        );

        let request = popover.comparison_request(&segments(), &SPLITS).unwrap();
        assert_eq!(request.segments.len(), 3);
        assert_eq!(request.ids, Some(vec![[0, 20], [50, 99]]));

        popover.open(
            Selection::regions(vec![(0, 20), (20, 50), (50, 99)], &SPLITS).unwrap(),
            Anchor::Regions,
            &SPLITS,
            &model,
        );
        let request = popover.comparison_request(&segments(), &SPLITS).unwrap();
        assert!(request.ids.is_none());
    }

    #[test]
    fn hints_scale_by_unit() {
        let model = IntentionModel::default();
        let mut popover = controller();
        popover.open(
            Selection::regions(vec![(0, 20)], &SPLITS).unwrap(),
            Anchor::Regions,
            &SPLITS,
            &model,
        );

        let rows = popover.describe(&segments(), Unit::Day);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].label, "Slope");
        assert_eq!(rows[0].hint.as_deref(), Some("(86400.0000/day)"));
        assert_eq!(rows[1].hint.as_deref(), Some("(1.5000%)"));
        assert_eq!(rows[2].hint.as_deref(), Some("(2.00 day)"));
    }

    #[test]
    fn relation_hints_wait_for_comparison() {
        let model = IntentionModel::default();
        let mut popover = controller();
        let ticket = popover
            .open(
                Selection::relation(vec![(0, 20)], vec![(20, 50)]).unwrap(),
                Anchor::Regions,
                &SPLITS,
                &model,
            )
            .unwrap();

        assert!(popover
            .describe(&segments(), Unit::Day)
            .iter()
            .all(|row| row.hint.is_none()));

        let mut result = Comparison::default();
        result.insert("start_value".to_string(), Comparator::Less);
        result.insert("duration".to_string(), Comparator::Less);
        popover.apply_comparison(ticket, result);

        let rows = popover.describe(&segments(), Unit::Day);
        let hint = |key: &str| {
            rows.iter()
                .find(|row| row.key == key)
                .and_then(|row| row.hint.clone())
        };
        assert_eq!(hint("start_value").as_deref(), Some("(0.00<20.00)"));
        assert_eq!(hint("duration").as_deref(), Some("(2.00<3.00)[day]"));
        assert_eq!(hint("slope"), None);
    }

    #[test]
    fn retarget_follows_envelope_or_closes() {
        let model = IntentionModel::default();
        let mut popover = controller();
        popover.open(
            Selection::regions(vec![(50, 99)], &SPLITS).unwrap(),
            Anchor::Regions,
            &SPLITS,
            &model,
        );

        assert!(popover.retarget(&[20, 50, 99], &model));
        assert_eq!(popover.state().map(|s| s.key), Some(IntentionKey::Single(1)));

        assert!(!popover.retarget(&[0, 20, 50], &model));
        assert!(popover.state().is_none());
    }
}
