use crate::segment::TrendCategory;
use crate::unit::Unit;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = "<=")]
    NoGreater,
    #[serde(rename = ">=")]
    NoLess,
    #[serde(rename = "~=")]
    ApproximatelyEqual,
}

impl Comparator {
    pub fn symbol(self) -> &'static str {
        match self {
            Comparator::Greater => ">",
            Comparator::Less => "<",
            Comparator::Equal => "=",
            Comparator::NoGreater => "<=",
            Comparator::NoLess => ">=",
            Comparator::ApproximatelyEqual => "~=",
        }
    }
}

impl std::fmt::Display for Comparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdCondition {
    pub value: f64,
    pub inclusive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScopeCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<ThresholdCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<ThresholdCondition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SingleAttribute {
    Slope,
    StartValue,
    EndValue,
    Duration,
    RelativeSlope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupAttribute {
    Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub category: TrendCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slope_scope_condition: Option<ScopeCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_slope_scope_condition: Option<ScopeCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_condition: Option<ScopeCondition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleRelation {
    pub id1: usize,
    pub id2: usize,
    pub attribute: SingleAttribute,
    pub comparator: Comparator,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendGroup {
    pub ids: [usize; 2],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_condition: Option<ScopeCondition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRelation {
    pub group1: [usize; 2],
    pub group2: [usize; 2],
    pub comparator: Comparator,
    pub attribute: GroupAttribute,
}

/// Structured query executed by the backend.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuerySpec {
    pub targets: Vec<String>,
    pub trends: Vec<Trend>,
    pub single_relations: Vec<SingleRelation>,
    pub trend_groups: Vec<TrendGroup>,
    pub group_relations: Vec<GroupRelation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_condition: Option<ScopeCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_scope_condition: Option<ScopeCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value_scope_condition: Option<ScopeCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value_scope_condition: Option<ScopeCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparator_between_start_end_value: Option<Comparator>,
}

/// A literal span of the original query text that produced some field.
/// `index` picks among repeated occurrences of the same text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSource {
    pub text: String,
    pub index: usize,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryWithSource {
    pub text_source_id: i64,
    pub category: TrendCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScopeWithSource {
    pub text_source_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<ThresholdCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<ThresholdCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendWithSource {
    pub category: CategoryWithSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slope_scope_condition: Option<ScopeWithSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_slope_scope_condition: Option<ScopeWithSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_condition: Option<ScopeWithSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleRelationWithSource {
    pub text_source_id: i64,
    pub id1: usize,
    pub id2: usize,
    pub attribute: SingleAttribute,
    pub comparator: Comparator,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendGroupWithSource {
    pub ids: [usize; 2],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_condition: Option<ScopeWithSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRelationWithSource {
    pub text_source_id: i64,
    pub group1: [usize; 2],
    pub group2: [usize; 2],
    pub comparator: Comparator,
    pub attribute: GroupAttribute,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetWithSource {
    pub text_source_id: i64,
    pub target: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparatorWithSource {
    pub text_source_id: i64,
    pub comparator: Comparator,
}

/// Parsed query that remembers which span of text produced each field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuerySpecWithSource {
    pub original_text: String,
    pub text_sources: Vec<TextSource>,
    #[serde(default)]
    pub targets: Vec<TargetWithSource>,
    #[serde(default)]
    pub trends: Vec<TrendWithSource>,
    #[serde(default)]
    pub single_relations: Vec<SingleRelationWithSource>,
    #[serde(default)]
    pub trend_groups: Vec<TrendGroupWithSource>,
    #[serde(default)]
    pub group_relations: Vec<GroupRelationWithSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_condition: Option<ScopeWithSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_scope_condition: Option<ScopeWithSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value_scope_condition: Option<ScopeWithSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value_scope_condition: Option<ScopeWithSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparator_between_start_end_value: Option<ComparatorWithSource>,
}

impl QuerySpecWithSource {
    pub fn text_source(&self, id: i64) -> Option<&TextSource> {
        usize::try_from(id).ok().and_then(|i| self.text_sources.get(i))
    }

    pub fn is_disabled(&self, id: i64) -> bool {
        self.text_source(id).is_some_and(|s| s.disabled)
    }

    /// Flips the disabled flag of one text source. Unknown ids are ignored.
    pub fn toggle_source(&mut self, id: i64) -> bool {
        match usize::try_from(id)
            .ok()
            .and_then(|i| self.text_sources.get_mut(i))
        {
            Some(source) => {
                source.disabled = !source.disabled;
                true
            }
            None => false,
        }
    }

    /// Executable query: disabled provenance is dropped, unit-bearing
    /// thresholds are converted to seconds.
    pub fn format(&self) -> QuerySpec {
        let divide = |a: f64, b: f64| a / b;
        let multiply = |a: f64, b: f64| a * b;

        QuerySpec {
            targets: self
                .targets
                .iter()
                .filter(|t| !self.is_disabled(t.text_source_id))
                .map(|t| t.target.clone())
                .collect(),
            trends: self
                .trends
                .iter()
                .map(|trend| Trend {
                    category: if self.is_disabled(trend.category.text_source_id) {
                        TrendCategory::Arbitrary
                    } else {
                        trend.category.category
                    },
                    slope_scope_condition: self.scope(trend.slope_scope_condition, divide),
                    relative_slope_scope_condition: self
                        .scope(trend.relative_slope_scope_condition, multiply),
                    duration_condition: self.scope(trend.duration_condition, multiply),
                })
                .collect(),
            single_relations: self
                .single_relations
                .iter()
                .filter(|r| !self.is_disabled(r.text_source_id))
                .map(|r| SingleRelation {
                    id1: r.id1,
                    id2: r.id2,
                    attribute: r.attribute,
                    comparator: r.comparator,
                })
                .collect(),
            trend_groups: self
                .trend_groups
                .iter()
                .map(|g| TrendGroup {
                    ids: g.ids,
                    duration_condition: self.scope(g.duration_condition, multiply),
                })
                .collect(),
            group_relations: self
                .group_relations
                .iter()
                .filter(|r| !self.is_disabled(r.text_source_id))
                .map(|r| GroupRelation {
                    group1: r.group1,
                    group2: r.group2,
                    comparator: r.comparator,
                    attribute: r.attribute,
                })
                .collect(),
            duration_condition: self.scope(self.duration_condition, multiply),
            time_scope_condition: self.scope(self.time_scope_condition, multiply),
            max_value_scope_condition: self.scope(self.max_value_scope_condition, multiply),
            min_value_scope_condition: self.scope(self.min_value_scope_condition, multiply),
            comparator_between_start_end_value: self
                .comparator_between_start_end_value
                .map(|c| c.comparator),
        }
    }

    fn scope(
        &self,
        scope: Option<ScopeWithSource>,
        convert: impl Fn(f64, f64) -> f64,
    ) -> Option<ScopeCondition> {
        let scope = scope?;
        if self.is_disabled(scope.text_source_id) {
            return None;
        }

        let threshold = |t: Option<ThresholdCondition>| {
            t.map(|t| match scope.unit {
                Some(unit) => ThresholdCondition {
                    value: convert(t.value, unit.seconds()),
                    inclusive: t.inclusive,
                },
                None => t,
            })
        };

        Some(ScopeCondition {
            max: threshold(scope.max),
            min: threshold(scope.min),
        })
    }
}
