use super::selection::{Selection, SelectionKind};
use super::split::{self, SplitRange};

use service::intention::Choice;
use service::{
    GlobalChoice, GroupChoice, GroupRelationChoice, GroupRelationIntention, Intentions,
    SegmentGroupIntention, SingleChoice, SingleRelationChoice, SingleRelationIntention,
    SingleSegmentIntention,
};

/// Identity of an intention: offsets into the envelope split set.
///
/// Groups are `[offset of first segment, offset of last segment]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntentionKey {
    Single(usize),
    Group([usize; 2]),
    SingleRelation(usize, usize),
    GroupRelation([usize; 2], [usize; 2]),
    Global,
}

impl IntentionKey {
    pub fn from_selection(selection: &Selection, envelope: &[usize]) -> Option<Self> {
        let group = |ranges: &[SplitRange]| -> Option<[usize; 2]> {
            let first = split::offset_of(envelope, ranges.first()?.0)?;
            let last = split::offset_of(envelope, ranges.last()?.0)?;
            Some([first, last])
        };

        match selection.kind {
            SelectionKind::SingleSegment => {
                Some(IntentionKey::Single(split::offset_of(envelope, selection.ranges.first()?.0)?))
            }
            SelectionKind::SegmentGroup => Some(IntentionKey::Group(group(&selection.ranges)?)),
            SelectionKind::Global => Some(IntentionKey::Global),
            SelectionKind::SingleRelation => {
                let [a, b] = selection.groups.as_ref()?;
                let id1 = split::offset_of(envelope, a.first()?.0)?;
                let id2 = split::offset_of(envelope, b.first()?.0)?;
                Some(IntentionKey::SingleRelation(id1.min(id2), id1.max(id2)))
            }
            SelectionKind::GroupRelation => {
                let [a, b] = selection.groups.as_ref()?;
                let (g1, g2) = (group(a)?, group(b)?);
                Some(if g1[0] <= g2[0] {
                    IntentionKey::GroupRelation(g1, g2)
                } else {
                    IntentionKey::GroupRelation(g2, g1)
                })
            }
        }
    }

    pub fn kind(&self) -> SelectionKind {
        match self {
            IntentionKey::Single(_) => SelectionKind::SingleSegment,
            IntentionKey::Group(_) => SelectionKind::SegmentGroup,
            IntentionKey::SingleRelation(..) => SelectionKind::SingleRelation,
            IntentionKey::GroupRelation(..) => SelectionKind::GroupRelation,
            IntentionKey::Global => SelectionKind::Global,
        }
    }

    /// Series index spans covered in `envelope`, one per side.
    pub fn spans(&self, envelope: &[usize]) -> Option<Vec<SplitRange>> {
        let single = |id: usize| Some((*envelope.get(id)?, *envelope.get(id + 1)?));
        let group = |[lo, hi]: [usize; 2]| Some((*envelope.get(lo)?, *envelope.get(hi + 1)?));

        match *self {
            IntentionKey::Single(id) => Some(vec![single(id)?]),
            IntentionKey::Group(ids) => Some(vec![group(ids)?]),
            IntentionKey::SingleRelation(a, b) => Some(vec![single(a)?, single(b)?]),
            IntentionKey::GroupRelation(a, b) => Some(vec![group(a)?, group(b)?]),
            IntentionKey::Global => split::bounds(envelope)
                .filter(|_| envelope.len() >= 2)
                .map(|b| vec![b]),
        }
    }

    /// Same regions addressed in `new`, if all of them survive there.
    fn remap(&self, old: &[usize], new: &[usize]) -> Option<Self> {
        if let IntentionKey::Global = self {
            return (new.len() >= 2).then_some(IntentionKey::Global);
        }

        let spans = self.spans(old)?;
        if !spans.iter().all(|range| split::contains_range(new, *range)) {
            return None;
        }

        let moved = |offset: usize| split::offset_of(new, *old.get(offset)?);
        let moved_group = |[lo, hi]: [usize; 2]| Some([moved(lo)?, moved(hi)?]);

        Some(match *self {
            IntentionKey::Single(id) => IntentionKey::Single(moved(id)?),
            IntentionKey::Group(ids) => IntentionKey::Group(moved_group(ids)?),
            IntentionKey::SingleRelation(a, b) => IntentionKey::SingleRelation(moved(a)?, moved(b)?),
            IntentionKey::GroupRelation(a, b) => {
                IntentionKey::GroupRelation(moved_group(a)?, moved_group(b)?)
            }
            IntentionKey::Global => IntentionKey::Global,
        })
    }
}

impl std::fmt::Display for IntentionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntentionKey::Single(id) => write!(f, "segment {id}"),
            IntentionKey::Group([lo, hi]) => write!(f, "group {lo}..={hi}"),
            IntentionKey::SingleRelation(a, b) => write!(f, "relation {a}/{b}"),
            IntentionKey::GroupRelation([a0, a1], [b0, b1]) => {
                write!(f, "group relation {a0}..={a1}/{b0}..={b1}")
            }
            IntentionKey::Global => write!(f, "global"),
        }
    }
}

/// Checked attributes, typed by selection kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoiceSet {
    Single(Vec<SingleChoice>),
    Group(Vec<GroupChoice>),
    SingleRelation(Vec<SingleRelationChoice>),
    GroupRelation(Vec<GroupRelationChoice>),
    Global(Vec<GlobalChoice>),
}

impl ChoiceSet {
    pub fn empty(kind: SelectionKind) -> Self {
        match kind {
            SelectionKind::SingleSegment => ChoiceSet::Single(Vec::new()),
            SelectionKind::SegmentGroup => ChoiceSet::Group(Vec::new()),
            SelectionKind::SingleRelation => ChoiceSet::SingleRelation(Vec::new()),
            SelectionKind::GroupRelation => ChoiceSet::GroupRelation(Vec::new()),
            SelectionKind::Global => ChoiceSet::Global(Vec::new()),
        }
    }

    pub fn kind(&self) -> SelectionKind {
        match self {
            ChoiceSet::Single(_) => SelectionKind::SingleSegment,
            ChoiceSet::Group(_) => SelectionKind::SegmentGroup,
            ChoiceSet::SingleRelation(_) => SelectionKind::SingleRelation,
            ChoiceSet::GroupRelation(_) => SelectionKind::GroupRelation,
            ChoiceSet::Global(_) => SelectionKind::Global,
        }
    }

    /// Every attribute offered for `kind`, in display order.
    pub fn available(kind: SelectionKind) -> Vec<&'static str> {
        fn keys<C: Choice>() -> Vec<&'static str> {
            C::ALL.iter().map(Choice::as_str).collect()
        }

        match kind {
            SelectionKind::SingleSegment => keys::<SingleChoice>(),
            SelectionKind::SegmentGroup => keys::<GroupChoice>(),
            SelectionKind::SingleRelation => keys::<SingleRelationChoice>(),
            SelectionKind::GroupRelation => keys::<GroupRelationChoice>(),
            SelectionKind::Global => keys::<GlobalChoice>(),
        }
    }

    pub fn keys(&self) -> Vec<&'static str> {
        fn keys<C: Choice>(list: &[C]) -> Vec<&'static str> {
            list.iter().map(Choice::as_str).collect()
        }

        match self {
            ChoiceSet::Single(list) => keys(list),
            ChoiceSet::Group(list) => keys(list),
            ChoiceSet::SingleRelation(list) => keys(list),
            ChoiceSet::GroupRelation(list) => keys(list),
            ChoiceSet::Global(list) => keys(list),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ChoiceSet::Single(list) => list.len(),
            ChoiceSet::Group(list) => list.len(),
            ChoiceSet::SingleRelation(list) => list.len(),
            ChoiceSet::GroupRelation(list) => list.len(),
            ChoiceSet::Global(list) => list.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.keys().contains(&key)
    }

    /// Adds or removes the attribute named `key`. Unknown keys are ignored.
    pub fn toggle_key(&mut self, key: &str) -> bool {
        fn toggle<C: Choice>(list: &mut Vec<C>, key: &str) -> bool {
            let Some(choice) = C::from_key(key) else {
                return false;
            };
            match list.iter().position(|c| *c == choice) {
                Some(pos) => {
                    list.remove(pos);
                }
                None => list.push(choice),
            }
            true
        }

        match self {
            ChoiceSet::Single(list) => toggle(list, key),
            ChoiceSet::Group(list) => toggle(list, key),
            ChoiceSet::SingleRelation(list) => toggle(list, key),
            ChoiceSet::GroupRelation(list) => toggle(list, key),
            ChoiceSet::Global(list) => toggle(list, key),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IntentionError {
    #[error("Select at least one attribute")]
    EmptyChoices,
    #[error("{choices} attributes cannot describe a {key} selection")]
    KindMismatch {
        key: SelectionKind,
        choices: SelectionKind,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intention {
    pub key: IntentionKey,
    pub choices: ChoiceSet,
}

/// Authored intentions of one chart, at most one per key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntentionModel {
    entries: Vec<Intention>,
}

impl IntentionModel {
    pub fn upsert(&mut self, key: IntentionKey, choices: ChoiceSet) -> Result<(), IntentionError> {
        if choices.kind() != key.kind() {
            return Err(IntentionError::KindMismatch {
                key: key.kind(),
                choices: choices.kind(),
            });
        }
        if choices.is_empty() {
            return Err(IntentionError::EmptyChoices);
        }

        match self.entries.iter_mut().find(|entry| entry.key == key) {
            Some(entry) => entry.choices = choices,
            None => self.entries.push(Intention { key, choices }),
        }
        Ok(())
    }

    pub fn remove(&mut self, key: &IntentionKey) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.key != *key);
        before != self.entries.len()
    }

    pub fn find(&self, key: &IntentionKey) -> Option<&ChoiceSet> {
        self.entries
            .iter()
            .find(|entry| entry.key == *key)
            .map(|entry| &entry.choices)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Intention> {
        self.entries.iter()
    }

    /// Moves every key from the `old` envelope to `new`. Entries whose
    /// regions are not all present in `new` are dropped; returns how many.
    pub fn remap(&mut self, old: &[usize], new: &[usize]) -> usize {
        let before = self.entries.len();

        self.entries = std::mem::take(&mut self.entries)
            .into_iter()
            .filter_map(|entry| {
                entry.key.remap(old, new).map(|key| Intention {
                    key,
                    choices: entry.choices,
                })
            })
            .collect();

        before - self.entries.len()
    }

    pub fn to_wire(&self) -> Intentions {
        let mut wire = Intentions::default();

        for Intention { key, choices } in &self.entries {
            match (key, choices) {
                (IntentionKey::Single(id), ChoiceSet::Single(list)) => {
                    wire.single_segment_intentions.push(SingleSegmentIntention {
                        id: *id,
                        single_choices: list.clone(),
                    });
                }
                (IntentionKey::Group(ids), ChoiceSet::Group(list)) => {
                    wire.segment_group_intentions.push(SegmentGroupIntention {
                        ids: *ids,
                        group_choices: list.clone(),
                    });
                }
                (IntentionKey::SingleRelation(id1, id2), ChoiceSet::SingleRelation(list)) => {
                    wire.single_relation_intentions.push(SingleRelationIntention {
                        id1: *id1,
                        id2: *id2,
                        relation_choices: list.clone(),
                    });
                }
                (IntentionKey::GroupRelation(group1, group2), ChoiceSet::GroupRelation(list)) => {
                    wire.group_relation_intentions.push(GroupRelationIntention {
                        group1: *group1,
                        group2: *group2,
                        relation_choices: list.clone(),
                    });
                }
                (IntentionKey::Global, ChoiceSet::Global(list)) => {
                    wire.global_intentions = list.clone();
                }
                _ => log::warn!("Skipping intention {key} with mismatched choices"),
            }
        }

        wire
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPLITS: [usize; 4] = [0, 20, 50, 99];

    fn single(ranges: Vec<SplitRange>) -> Selection {
        Selection::regions(ranges, &SPLITS).unwrap()
    }

    #[test]
    fn single_segment_key_is_split_offset() {
        let key = IntentionKey::from_selection(&single(vec![(20, 50)]), &SPLITS).unwrap();
        assert_eq!(key, IntentionKey::Single(1));

        let mut model = IntentionModel::default();
        model
            .upsert(key, ChoiceSet::Single(vec![SingleChoice::Slope]))
            .unwrap();

        let wire = model.to_wire();
        assert_eq!(
            wire.single_segment_intentions,
            vec![SingleSegmentIntention {
                id: 1,
                single_choices: vec![SingleChoice::Slope],
            }]
        );
    }

    #[test]
    fn group_key_addresses_first_and_last_segment() {
        let splits = [0, 10, 20, 50, 99];
        let selection = Selection::regions(vec![(10, 20), (20, 50)], &splits).unwrap();
        let key = IntentionKey::from_selection(&selection, &splits).unwrap();

        assert_eq!(key, IntentionKey::Group([1, 2]));
        assert_eq!(key.spans(&splits), Some(vec![(10, 50)]));
    }

    #[test]
    fn relation_keys_are_canonical() {
        let forward = Selection::relation(vec![(0, 20)], vec![(50, 99)]).unwrap();
        let reverse = Selection::relation(vec![(50, 99)], vec![(0, 20)]).unwrap();

        let a = IntentionKey::from_selection(&forward, &SPLITS).unwrap();
        let b = IntentionKey::from_selection(&reverse, &SPLITS).unwrap();
        assert_eq!(a, IntentionKey::SingleRelation(0, 2));
        assert_eq!(a, b);

        let splits = [0, 10, 20, 50, 99];
        let groups = Selection::relation(vec![(20, 50), (50, 99)], vec![(0, 10), (10, 20)]).unwrap();
        assert_eq!(
            IntentionKey::from_selection(&groups, &splits),
            Some(IntentionKey::GroupRelation([0, 1], [2, 3]))
        );
    }

    #[test]
    fn upsert_replaces_in_place() {
        let mut model = IntentionModel::default();
        let key = IntentionKey::Single(1);

        model
            .upsert(key, ChoiceSet::Single(vec![SingleChoice::Slope]))
            .unwrap();
        model
            .upsert(key, ChoiceSet::Single(vec![SingleChoice::Duration]))
            .unwrap();

        assert_eq!(model.len(), 1);
        assert_eq!(
            model.find(&key),
            Some(&ChoiceSet::Single(vec![SingleChoice::Duration]))
        );
    }

    #[test]
    fn removing_missing_key_is_a_no_op() {
        let mut model = IntentionModel::default();
        model
            .upsert(IntentionKey::Global, ChoiceSet::Global(vec![GlobalChoice::Duration]))
            .unwrap();

        assert!(!model.remove(&IntentionKey::Single(3)));
        assert_eq!(model.len(), 1);
        assert!(model.remove(&IntentionKey::Global));
        assert!(model.is_empty());
    }

    #[test]
    fn rejects_empty_and_mismatched_choices() {
        let mut model = IntentionModel::default();
        assert_eq!(
            model.upsert(IntentionKey::Single(0), ChoiceSet::Single(Vec::new())),
            Err(IntentionError::EmptyChoices)
        );
        assert!(matches!(
            model.upsert(
                IntentionKey::Single(0),
                ChoiceSet::Group(vec![GroupChoice::Duration])
            ),
            Err(IntentionError::KindMismatch { .. })
        ));
        assert!(model.is_empty());
    }

    #[test]
    fn relation_wire_shape() {
        let mut model = IntentionModel::default();
        model
            .upsert(
                IntentionKey::SingleRelation(0, 2),
                ChoiceSet::SingleRelation(vec![SingleRelationChoice::StartValue]),
            )
            .unwrap();

        let wire = model.to_wire();
        assert_eq!(
            wire.single_relation_intentions,
            vec![SingleRelationIntention {
                id1: 0,
                id2: 2,
                relation_choices: vec![SingleRelationChoice::StartValue],
            }]
        );
        assert!(wire.single_segment_intentions.is_empty());
    }

    #[test]
    fn remap_follows_split_values() {
        let old = [20, 50, 99];
        let new = [0, 20, 50, 99];

        let mut model = IntentionModel::default();
        model
            .upsert(IntentionKey::Single(0), ChoiceSet::Single(vec![SingleChoice::Slope]))
            .unwrap();
        model
            .upsert(
                IntentionKey::SingleRelation(0, 1),
                ChoiceSet::SingleRelation(vec![SingleRelationChoice::Slope]),
            )
            .unwrap();
        model
            .upsert(IntentionKey::Global, ChoiceSet::Global(vec![GlobalChoice::Duration]))
            .unwrap();

        assert_eq!(model.remap(&old, &new), 0);
        assert!(model.find(&IntentionKey::Single(1)).is_some());
        assert!(model.find(&IntentionKey::SingleRelation(1, 2)).is_some());
        assert!(model.find(&IntentionKey::Global).is_some());
    }

    #[test]
    fn remap_drops_regions_outside_new_envelope() {
        let old = [0, 20, 50, 99];
        let new = [0, 20, 50];

        let mut model = IntentionModel::default();
        model
            .upsert(IntentionKey::Single(0), ChoiceSet::Single(vec![SingleChoice::Slope]))
            .unwrap();
        model
            .upsert(IntentionKey::Group([1, 2]), ChoiceSet::Group(vec![GroupChoice::Duration]))
            .unwrap();

        assert_eq!(model.remap(&old, &new), 1);
        assert_eq!(model.len(), 1);
        assert!(model.find(&IntentionKey::Single(0)).is_some());

        assert_eq!(model.remap(&new, &[]), 1);
        assert!(model.is_empty());
    }

    #[test]
    fn toggling_choices_by_key() {
        let mut choices = ChoiceSet::empty(SelectionKind::SingleRelation);
        assert!(choices.toggle_key("start_value"));
        assert!(choices.toggle_key("slope"));
        assert!(choices.toggle_key("start_value"));
        assert!(!choices.toggle_key("compare_start_end_value"));

        assert_eq!(choices.keys(), vec!["slope"]);
        assert_eq!(
            ChoiceSet::available(SelectionKind::Global),
            vec!["duration", "compare_start_end_value"]
        );
    }
}
