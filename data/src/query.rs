//! Natural-language query text and the provenance of its parsed fields.

pub mod glyph;

use crate::config::theme::category_color;

use iced_core::Color;
use regex::Regex;
use rustc_hash::FxHashMap;
use service::QuerySpecWithSource;

/// Alpha applied to text source colors wherever they are drawn.
const SOURCE_ALPHA: f32 = 0.8;
const DISABLED_COLOR: Color = Color::from_rgb8(0xee, 0xee, 0xee);

/// Text source id to its color.
pub type ColorMap = FxHashMap<i64, Color>;

/// One categorical color per text source, in order.
pub fn color_map(query: Option<&QuerySpecWithSource>) -> ColorMap {
    query
        .map(|query| {
            (0..query.text_sources.len())
                .map(|idx| (idx as i64, category_color(idx)))
                .collect()
        })
        .unwrap_or_default()
}

pub fn source_color(colors: &ColorMap, id: i64) -> Option<Color> {
    colors.get(&id).map(|color| color.scale_alpha(SOURCE_ALPHA))
}

/// A text source located in the query text. `start` is a byte offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Highlight {
    pub start: usize,
    pub len: usize,
    pub source_id: i64,
    pub color: Color,
    pub disabled: bool,
}

/// Locates every colored text source inside `text`. A source matching
/// several times picks its recorded occurrence, or the last one when the
/// text has fewer. Overlapping highlights keep the leftmost.
pub fn highlights(text: &str, query: &QuerySpecWithSource, colors: &ColorMap) -> Vec<Highlight> {
    let mut found: Vec<Highlight> = query
        .text_sources
        .iter()
        .enumerate()
        .filter_map(|(idx, source)| {
            let id = idx as i64;
            let color = source_color(colors, id)?;
            if source.text.is_empty() {
                return None;
            }

            let pattern = match Regex::new(&regex::escape(&source.text)) {
                Ok(pattern) => pattern,
                Err(e) => {
                    log::warn!("Cannot search for text source {id}: {e}");
                    return None;
                }
            };
            let matches: Vec<usize> = pattern.find_iter(text).map(|m| m.start()).collect();
            let start = *matches.get(source.index).or(matches.last())?;

            Some(Highlight {
                start,
                len: source.text.len(),
                source_id: id,
                color: if source.disabled { DISABLED_COLOR } else { color },
                disabled: source.disabled,
            })
        })
        .collect();

    found.sort_by_key(|h| h.start);

    let mut end = 0;
    found.retain(|h| {
        let keep = h.start >= end;
        if keep {
            end = h.start + h.len;
        }
        keep
    });
    found
}

#[derive(Debug, Clone, PartialEq)]
pub enum Piece<'a> {
    Plain(&'a str),
    Source(&'a str, &'a Highlight),
}

/// Splits `text` into plain runs and highlighted sources.
pub fn pieces<'a>(text: &'a str, highlights: &'a [Highlight]) -> Vec<Piece<'a>> {
    let mut out = Vec::new();
    let mut last = 0;

    for highlight in highlights {
        let end = highlight.start + highlight.len;
        let (Some(before), Some(inner)) = (text.get(last..highlight.start), text.get(highlight.start..end)) else {
            continue;
        };
        if !before.is_empty() {
            out.push(Piece::Plain(before));
        }
        out.push(Piece::Source(inner, highlight));
        last = end;
    }

    if let Some(rest) = text.get(last..)
        && !rest.is_empty()
    {
        out.push(Piece::Plain(rest));
    }
    out
}

/// Query text, the current parsed query and the one last executed.
#[derive(Debug, Clone, Default)]
pub struct QueryState {
    pub text: String,
    query: Option<QuerySpecWithSource>,
    original: Option<QuerySpecWithSource>,
    colors: ColorMap,
}

impl QueryState {
    pub fn query(&self) -> Option<&QuerySpecWithSource> {
        self.query.as_ref()
    }

    pub fn original(&self) -> Option<&QuerySpecWithSource> {
        self.original.as_ref()
    }

    pub fn colors(&self) -> &ColorMap {
        &self.colors
    }

    /// Trimmed query text, `None` when there is nothing to send.
    pub fn submittable_text(&self) -> Option<&str> {
        let text = self.text.trim();
        (!text.is_empty()).then_some(text)
    }

    /// Whether the text was edited since it was last parsed.
    pub fn needs_parse(&self) -> bool {
        self.query
            .as_ref()
            .is_none_or(|query| query.original_text.trim() != self.text.trim())
    }

    /// The first query set after a reset is remembered as the original.
    pub fn set_query(&mut self, query: Option<QuerySpecWithSource>) {
        if self.original.is_none() {
            self.original = query.clone();
        }
        self.colors = color_map(query.as_ref());
        self.query = query;
    }

    pub fn reset_original(&mut self) {
        self.original = None;
    }

    /// The query just executed becomes the reference for result colors.
    pub fn mark_executed(&mut self) {
        self.original = self.query.clone();
    }

    /// A refinement result replaces both the text and the query.
    pub fn replace(&mut self, refined: QuerySpecWithSource) {
        self.set_query(None);
        self.text = refined.original_text.clone();
        self.set_query(Some(refined));
    }

    pub fn toggle_source(&mut self, id: i64) -> bool {
        self.query
            .as_mut()
            .is_some_and(|query| query.toggle_source(id))
    }

    pub fn is_original(&self) -> bool {
        self.query == self.original
    }

    /// Color of each trend by position, only while the results on screen
    /// still belong to the current query.
    pub fn trend_colors(&self) -> Vec<Option<Color>> {
        let Some(query) = self.query.as_ref().filter(|_| self.is_original()) else {
            return Vec::new();
        };
        query
            .trends
            .iter()
            .map(|trend| source_color(&self.colors, trend.category.text_source_id))
            .collect()
    }

    pub fn highlights(&self) -> Vec<Highlight> {
        match &self.query {
            Some(query) => highlights(&self.text, query, &self.colors),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query(text: &str, sources: &[(&str, usize)]) -> QuerySpecWithSource {
        let text_sources: Vec<_> = sources
            .iter()
            .map(|(text, index)| json!({ "text": text, "index": index }))
            .collect();

        serde_json::from_value(json!({
            "original_text": text,
            "text_sources": text_sources,
            "trends": [
                { "category": { "text_source_id": 0, "category": "up" } },
                { "category": { "text_source_id": 1, "category": "flat" } },
            ],
        }))
        .unwrap()
    }

    #[test]
    fn highlights_pick_recorded_occurrence() {
        let text = "rise then flat then rise";
        let q = query(text, &[("rise", 1), ("flat", 0)]);
        let colors = color_map(Some(&q));

        let found = highlights(text, &q, &colors);
        let spans: Vec<(usize, i64)> = found.iter().map(|h| (h.start, h.source_id)).collect();
        assert_eq!(spans, vec![(10, 1), (20, 0)]);

        let pieces = pieces(text, &found);
        assert_eq!(pieces[0], Piece::Plain("rise then "));
        assert!(matches!(pieces[1], Piece::Source("flat", _)));
        assert!(matches!(pieces.last(), Some(Piece::Source("rise", _))));
    }

    #[test]
    fn occurrence_past_the_end_uses_the_last() {
        let text = "a.b and a.b";
        let q = query(text, &[("a.b", 5)]);
        let colors = color_map(Some(&q));

        let found = highlights(text, &q, &colors);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].start, 8);
    }

    #[test]
    fn disabled_sources_are_greyed() {
        let text = "sharp rise";
        let mut state = QueryState {
            text: text.to_string(),
            ..QueryState::default()
        };
        state.set_query(Some(query(text, &[("rise", 0)])));

        assert!(state.toggle_source(0));
        let found = state.highlights();
        assert!(found[0].disabled);
        assert_eq!(found[0].color, DISABLED_COLOR);
        assert!(!state.is_original());
    }

    #[test]
    fn trend_colors_only_for_the_executed_query() {
        let text = "rise then flat";
        let mut state = QueryState::default();
        state.set_query(Some(query(text, &[("rise", 0), ("flat", 0)])));

        let colors = state.trend_colors();
        assert_eq!(colors.len(), 2);
        assert_eq!(colors[0], Some(category_color(0).scale_alpha(SOURCE_ALPHA)));

        state.set_query(Some(query("rise", &[("rise", 0)])));
        assert!(state.trend_colors().is_empty());

        state.mark_executed();
        assert_eq!(state.trend_colors().len(), 2);
    }

    #[test]
    fn refinement_replaces_text_and_original() {
        let mut state = QueryState::default();
        state.text = "rise".to_string();
        state.set_query(Some(query("rise", &[("rise", 0)])));
        state.reset_original();

        state.replace(query("rise then flat", &[("rise", 0), ("flat", 0)]));
        assert_eq!(state.text, "rise then flat");
        assert!(state.is_original());
        assert!(!state.needs_parse());
    }

    #[test]
    fn blank_text_is_not_submittable() {
        let mut state = QueryState::default();
        state.text = "   ".to_string();
        assert_eq!(state.submittable_text(), None);
        assert!(state.needs_parse());
    }
}
