//! Loaded dataset, its approximations and what part of it is on screen.

use crate::chart::Series;
use crate::chart::scroll;
use crate::chart::split::SplitRange;

use service::{
    ApproximationResults, ApproximationSegmentsContainer, QuerySpecWithSource, RawDataset, Segment,
};

#[derive(Debug, Clone, Default)]
pub struct DatasetState {
    dataset: Option<RawDataset>,
    containers: Vec<ApproximationSegmentsContainer>,
    series: Option<Series>,
    level: usize,
    /// Detail window, whole series when `None`.
    range: Option<(usize, usize)>,
    /// Brush on the overview chart.
    brush: Option<(usize, usize)>,
    query_results: Option<ApproximationResults>,
}

impl DatasetState {
    pub fn dataset(&self) -> Option<&RawDataset> {
        self.dataset.as_ref()
    }

    /// Replaces the dataset and forgets everything derived from the old one.
    pub fn set_dataset(&mut self, dataset: RawDataset) {
        log::info!(
            "Loaded dataset {} with {} rows and {} value columns",
            dataset.filename.as_deref().unwrap_or("<local>"),
            dataset.len(),
            dataset.columns.len()
        );
        *self = Self {
            dataset: Some(dataset),
            ..Self::default()
        };
    }

    pub fn sources(&self) -> Vec<&str> {
        self.dataset
            .iter()
            .flat_map(|dataset| dataset.columns.iter().map(|c| c.name.as_str()))
            .collect()
    }

    pub fn containers(&self) -> &[ApproximationSegmentsContainer] {
        &self.containers
    }

    /// Stores the approximations; the first one is shown if no series is yet.
    pub fn set_containers(&mut self, containers: Vec<ApproximationSegmentsContainer>) {
        self.containers = containers;
        if self.series.is_none()
            && let Some(first) = self.containers.first().map(|c| c.source.clone())
        {
            self.set_source(&first);
        }
        self.level = self.level.min(self.max_level());
    }

    pub fn series(&self) -> Option<&Series> {
        self.series.as_ref()
    }

    pub fn source(&self) -> Option<&str> {
        self.series.as_ref().map(|s| s.name.as_str())
    }

    /// Shows another value column. Unknown columns are ignored.
    pub fn set_source(&mut self, name: &str) -> bool {
        if self.source() == Some(name) {
            return false;
        }
        let Some(series) = self
            .dataset
            .as_ref()
            .and_then(|dataset| Series::from_dataset(dataset, name))
        else {
            log::warn!("No value column named {name}");
            return false;
        };

        self.series = Some(series);
        self.range = None;
        self.brush = None;
        self.level = self.level.min(self.max_level());
        true
    }

    pub fn container(&self) -> Option<&ApproximationSegmentsContainer> {
        let source = self.source()?;
        self.containers.iter().find(|c| c.source == source)
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn max_level(&self) -> usize {
        self.container().map_or(0, |c| c.max_approximation_level)
    }

    pub fn set_level(&mut self, level: usize) -> bool {
        let level = level.min(self.max_level());
        let changed = level != self.level;
        self.level = level;
        changed
    }

    /// Segments of the shown series at the current level.
    pub fn segments(&self) -> &[Segment] {
        self.segments_of(self.source(), self.level)
    }

    pub fn segments_of(&self, source: Option<&str>, level: usize) -> &[Segment] {
        source
            .and_then(|source| self.containers.iter().find(|c| c.source == source))
            .map_or(&[], |container| container.segments_at(level))
    }

    pub fn range(&self) -> Option<(usize, usize)> {
        self.range
    }

    pub fn brush(&self) -> Option<(usize, usize)> {
        self.brush
    }

    /// Moves the detail window. With `commit` the overview brush follows.
    pub fn set_range(&mut self, range: Option<(usize, usize)>, commit: bool) {
        self.range = range;
        if commit {
            self.brush = range;
        }
    }

    /// Applies one wheel step to the detail window.
    pub fn scroll(&mut self, step: i64, position: f32) -> bool {
        let len = self.series.as_ref().map_or(0, Series::len);
        match scroll::scrolled(self.range, len, step, position) {
            Some(range) => {
                self.set_range(Some(range), true);
                true
            }
            None => false,
        }
    }

    pub fn query_results(&self) -> Option<&ApproximationResults> {
        self.query_results.as_ref()
    }

    pub fn set_query_results(&mut self, results: Option<ApproximationResults>) {
        self.query_results = results;
    }

    pub fn has_query_results(&self) -> bool {
        self.query_results.as_ref().is_some_and(|r| !r.is_empty())
    }

    /// Matching fragments of the shown series at the current level.
    pub fn result_spans(&self) -> Vec<Vec<SplitRange>> {
        let Some(source) = self.source() else {
            return Vec::new();
        };
        self.query_results
            .as_ref()
            .and_then(|results| results.get(source))
            .and_then(|levels| levels.get(&self.level))
            .map(|fragments| {
                fragments
                    .iter()
                    .map(|segments| segments.iter().map(Segment::range).collect())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Whether `source` may be interacted with: the query names no explicit
/// target, or names this one.
pub fn is_target(query: Option<&QuerySpecWithSource>, source: &str) -> bool {
    let mut named = query
        .into_iter()
        .flat_map(|query| query.targets.iter())
        .filter(|target| target.text_source_id >= 0)
        .peekable();

    named.peek().is_none() || named.any(|target| target.target == source)
}
