use serde::{Deserialize, Serialize};

/// Attribute a user can attach to a selection when refining a query.
pub trait Choice: Copy + Eq + std::fmt::Debug + 'static {
    const ALL: &'static [Self];

    fn as_str(&self) -> &'static str;

    fn from_key(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == s)
    }

    fn label(&self) -> String {
        title_case(self.as_str())
    }
}

/// "relative_slope" → "Relative Slope"
pub fn title_case(key: &str) -> String {
    key.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

macro_rules! choice_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $s)]
                $variant,
            )+
        }

        impl Choice for $name {
            const ALL: &'static [Self] = &[$($name::$variant),+];

            fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $s),+
                }
            }
        }
    };
}

choice_enum!(SingleChoice {
    Slope => "slope",
    RelativeSlope => "relative_slope",
    Duration => "duration",
});

choice_enum!(GroupChoice {
    Duration => "duration",
});

choice_enum!(SingleRelationChoice {
    Slope => "slope",
    StartValue => "start_value",
    EndValue => "end_value",
    Duration => "duration",
    RelativeSlope => "relative_slope",
});

choice_enum!(GroupRelationChoice {
    Duration => "duration",
});

choice_enum!(GlobalChoice {
    Duration => "duration",
    CompareStartEndValue => "compare_start_end_value",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleSegmentIntention {
    pub id: usize,
    pub single_choices: Vec<SingleChoice>,
}

/// `ids` are the offsets of the first and last segment of the group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentGroupIntention {
    pub ids: [usize; 2],
    pub group_choices: Vec<GroupChoice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleRelationIntention {
    pub id1: usize,
    pub id2: usize,
    pub relation_choices: Vec<SingleRelationChoice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRelationIntention {
    pub group1: [usize; 2],
    pub group2: [usize; 2],
    pub relation_choices: Vec<GroupRelationChoice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Intentions {
    pub single_segment_intentions: Vec<SingleSegmentIntention>,
    pub segment_group_intentions: Vec<SegmentGroupIntention>,
    pub single_relation_intentions: Vec<SingleRelationIntention>,
    pub group_relation_intentions: Vec<GroupRelationIntention>,
    pub global_intentions: Vec<GlobalChoice>,
}

impl Intentions {
    pub fn is_empty(&self) -> bool {
        self.single_segment_intentions.is_empty()
            && self.segment_group_intentions.is_empty()
            && self.single_relation_intentions.is_empty()
            && self.group_relation_intentions.is_empty()
            && self.global_intentions.is_empty()
    }
}
