use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Came back from a query result.
    #[default]
    Result,
    /// Drawn or extended by the user.
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendCategory {
    Flat,
    Up,
    Down,
    Arbitrary,
}

impl std::fmt::Display for TrendCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TrendCategory::Flat => "flat",
            TrendCategory::Up => "up",
            TrendCategory::Down => "down",
            TrendCategory::Arbitrary => "arbitrary",
        };
        write!(f, "{s}")
    }
}

/// One approximated trend, `[start_idx, end_idx]` inclusive into the series.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Segment {
    #[serde(default)]
    pub source: Source,
    pub start_idx: usize,
    pub end_idx: usize,
    pub slope: f64,
    pub start_value: f64,
    pub end_value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    /// Seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,
    /// Percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_slope: Option<f64>,
    /// Seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<TrendCategory>,
}

impl Segment {
    pub fn range(&self) -> (usize, usize) {
        (self.start_idx, self.end_idx)
    }

    pub fn is_within(&self, start: usize, end: usize) -> bool {
        self.start_idx >= start && self.end_idx <= end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApproximationSegments {
    pub approximation_level: usize,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApproximationSegmentsContainer {
    pub source: String,
    pub approximation_segments_list: Vec<ApproximationSegments>,
    pub max_approximation_level: usize,
}

impl ApproximationSegmentsContainer {
    pub fn segments_at(&self, level: usize) -> &[Segment] {
        self.approximation_segments_list
            .iter()
            .find(|item| item.approximation_level == level)
            .map_or(&[], |item| item.segments.as_slice())
    }
}

/// Query matches: source column → approximation level → matched fragments.
pub type ApproximationResults = BTreeMap<String, BTreeMap<usize, Vec<Vec<Segment>>>>;
