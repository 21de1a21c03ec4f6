//! Compact drawing of a parsed query. Trends are chained left to right, one
//! stroke each, and relations are routed in lanes above the strokes (values
//! and slopes) or below them (durations).

use super::{ColorMap, DISABLED_COLOR, source_color};
use crate::chart::intention::{IntentionKey, IntentionModel};
use crate::chart::render::{Align, DrawCommand, DrawLayer, Stroke};

use iced_core::{Color, Point, Rectangle, Size, Vector};
use service::query::{ScopeWithSource, SingleAttribute, TrendWithSource};
use service::{Comparator, QuerySpecWithSource, TrendCategory, Unit};

/// Width of one trend, and its rise when not flat.
const CELL: f32 = 32.0;
const LANE_STEP: f32 = 8.0;
const DURATION_STEP: f32 = 10.0;
const FONT: f32 = 8.0;
const ARC: f32 = CELL / 5.0;
const PADDING: f32 = 10.0;
const MAX_SCALE: f32 = 2.5;
const HIT_SLOP: f32 = 3.0;
const DEFAULT_COLOR: Color = Color::from_rgb8(0xcc, 0xcc, 0xcc);

/// Clickable part of the glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pick {
    Trend(usize),
    Relation(usize),
    GroupRelation(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Item {
    pub pick: Pick,
    pub bounds: Rectangle,
    /// An intention addresses the same trends.
    pub annotated: bool,
}

pub struct GlyphInput<'a> {
    pub query: &'a QuerySpecWithSource,
    pub colors: &'a ColorMap,
    pub intentions: &'a IntentionModel,
    pub selected: Option<Pick>,
}

impl GlyphInput<'_> {
    fn color(&self, id: i64) -> Color {
        if id < 0 {
            return DEFAULT_COLOR;
        }
        match self.query.text_source(id) {
            Some(source) if !source.disabled => {
                source_color(self.colors, id).unwrap_or(DEFAULT_COLOR)
            }
            _ => DISABLED_COLOR,
        }
    }

    /// Color of a condition, or `fallback` when it has no text source.
    fn condition_color(&self, scope: Option<&ScopeWithSource>, fallback: Color) -> Color {
        match scope.map(|scope| self.color(scope.text_source_id)) {
            Some(color) if color != DEFAULT_COLOR => color,
            _ => fallback,
        }
    }
}

/// Glyph fitted to a canvas, with its hit targets.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub layer: DrawLayer,
    items: Vec<Item>,
}

impl Glyph {
    pub fn build(input: &GlyphInput, size: Size) -> Option<Self> {
        let query = input.query;
        if query.trends.is_empty() {
            return None;
        }

        let strokes = chain(&query.trends);
        let (top, bottom) = strokes
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), (a, b)| {
                (lo.min(a.y).min(b.y), hi.max(a.y).max(b.y))
            });
        let (top, bottom) = (top - 5.0, bottom + 5.0);

        let mut sketch = Sketch::default();
        for (index, trend) in query.trends.iter().enumerate() {
            sketch.trend(input, index, trend, strokes[index]);
        }

        let below = bottom + sketch.durations(input, bottom) as f32 * DURATION_STEP;
        let (mut above_lanes, mut below_lanes) = (Lanes::default(), Lanes::default());

        for (index, relation) in query.single_relations.iter().enumerate() {
            let (id1, id2) = (relation.id1, relation.id2);
            let (Some(a), Some(b)) = (strokes.get(id1), strokes.get(id2)) else {
                continue;
            };
            if id1 == id2 {
                continue;
            }

            let anchors = match relation.attribute {
                SingleAttribute::StartValue => Some((a.0, b.0)),
                SingleAttribute::EndValue => Some((a.1, b.1)),
                SingleAttribute::Slope | SingleAttribute::RelativeSlope => {
                    let offset = if relation.attribute == SingleAttribute::RelativeSlope {
                        ARC * 1.5
                    } else {
                        ARC
                    };
                    let anchor = |(start, end): (Point, Point)| {
                        let lift = if end.y < start.y { ARC / 2.0 } else { 0.0 };
                        Point::new(start.x + offset, start.y - lift)
                    };
                    Some((anchor(*a), anchor(*b)))
                }
                SingleAttribute::Duration => None,
            };

            let pick = Pick::Relation(index);
            let link = Link {
                label: if id1 > id2 {
                    flipped(relation.comparator)
                } else {
                    relation.comparator
                },
                color: input.color(relation.text_source_id),
                selected: input.selected == Some(pick),
                annotated: input
                    .intentions
                    .find(&IntentionKey::SingleRelation(id1.min(id2), id1.max(id2)))
                    .is_some(),
                pick,
            };

            match anchors {
                Some((from, to)) => {
                    let level = above_lanes.claim(from.x, to.x);
                    let lane = top - level as f32 * LANE_STEP - LANE_STEP / 2.0;
                    sketch.dot(from, link.color);
                    sketch.dot(to, link.color);
                    sketch.link(from, to, lane, &link);
                }
                None => {
                    let from = Point::new(cell_center(id1), below);
                    let to = Point::new(cell_center(id2), below);
                    let level = below_lanes.claim(from.x, to.x);
                    sketch.link(from, to, below + (level + 1) as f32 * LANE_STEP, &link);
                }
            }
        }

        for (index, relation) in query.group_relations.iter().enumerate() {
            let n = query.trends.len();
            let [g1, g2] = [relation.group1, relation.group2];
            if g1.iter().chain(&g2).any(|&id| id >= n) {
                continue;
            }

            let center = |[lo, hi]: [usize; 2]| (lo as f32 * CELL + (hi + 1) as f32 * CELL) / 2.0;
            let (from, to) = (Point::new(center(g1), below), Point::new(center(g2), below));
            let (first, second) = if g1[0] <= g2[0] { (g1, g2) } else { (g2, g1) };

            let pick = Pick::GroupRelation(index);
            let link = Link {
                label: if g1[0] > g2[0] {
                    flipped(relation.comparator)
                } else {
                    relation.comparator
                },
                color: input.color(relation.text_source_id),
                selected: input.selected == Some(pick),
                annotated: input
                    .intentions
                    .find(&IntentionKey::GroupRelation(first, second))
                    .is_some(),
                pick,
            };

            let level = below_lanes.claim(from.x, to.x);
            sketch.link(from, to, below + (level + 1) as f32 * LANE_STEP, &link);
        }

        sketch.fit(size)
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Relations are drawn over trends and win where both are hit.
    pub fn pick_at(&self, point: Point) -> Option<Pick> {
        self.items
            .iter()
            .rev()
            .find(|item| inflate(item.bounds, HIT_SLOP).contains(point))
            .map(|item| item.pick)
    }
}

/// One line summary of a picked trend or relation.
pub fn describe(query: &QuerySpecWithSource, pick: Pick) -> Option<String> {
    match pick {
        Pick::Trend(index) => {
            let trend = query.trends.get(index)?;
            let mut parts = vec![format!("Trend {index}: {}", trend.category.category)];

            let conditions = [
                ("slope", &trend.slope_scope_condition),
                ("relative slope", &trend.relative_slope_scope_condition),
                ("duration", &trend.duration_condition),
            ];
            for (name, scope) in conditions {
                if let Some(range) = scope.as_ref().and_then(scope_text) {
                    parts.push(format!("{name} {range}"));
                }
            }
            Some(parts.join(", "))
        }
        Pick::Relation(index) => {
            let relation = query.single_relations.get(index)?;
            Some(format!(
                "Trend {} {} {} trend {}",
                relation.id1,
                attribute_name(relation.attribute),
                relation.comparator,
                relation.id2
            ))
        }
        Pick::GroupRelation(index) => {
            let relation = query.group_relations.get(index)?;
            let [a0, a1] = relation.group1;
            let [b0, b1] = relation.group2;
            Some(format!(
                "Trends {a0}-{a1} duration {} trends {b0}-{b1}",
                relation.comparator
            ))
        }
    }
}

/// Start and end of every trend stroke. Each trend starts where the
/// previous one ended; flat and arbitrary trends stay level.
fn chain(trends: &[TrendWithSource]) -> Vec<(Point, Point)> {
    let mut strokes: Vec<(Point, Point)> = Vec::with_capacity(trends.len());

    for (index, trend) in trends.iter().enumerate() {
        let category = trend.category.category;
        let x = index as f32 * CELL;

        let start_y = match strokes.last() {
            Some((_, end)) => end.y,
            None => match category {
                TrendCategory::Up => CELL,
                TrendCategory::Down => 0.0,
                TrendCategory::Flat | TrendCategory::Arbitrary => CELL / 2.0,
            },
        };
        let end_y = match category {
            TrendCategory::Up => start_y - CELL,
            TrendCategory::Down => start_y + CELL,
            TrendCategory::Flat | TrendCategory::Arbitrary => start_y,
        };

        strokes.push((Point::new(x, start_y), Point::new(x + CELL, end_y)));
    }

    strokes
}

/// Horizontal spans stacked into the lowest free level.
#[derive(Debug, Default)]
struct Lanes {
    levels: Vec<Vec<(f32, f32)>>,
}

impl Lanes {
    fn claim(&mut self, a: f32, b: f32) -> usize {
        let span = (a.min(b), a.max(b));
        let overlaps = |(lo, hi): &(f32, f32)| span.0.max(*lo) < span.1.min(*hi);

        let level = self
            .levels
            .iter()
            .position(|taken| !taken.iter().any(overlaps))
            .unwrap_or(self.levels.len());
        if level == self.levels.len() {
            self.levels.push(Vec::new());
        }
        self.levels[level].push(span);
        level
    }

    fn depth(&self) -> usize {
        self.levels.len()
    }
}

struct Link {
    label: Comparator,
    color: Color,
    selected: bool,
    annotated: bool,
    pick: Pick,
}

#[derive(Default)]
struct Sketch {
    commands: Vec<DrawCommand>,
    items: Vec<Item>,
}

impl Sketch {
    fn trend(&mut self, input: &GlyphInput, index: usize, trend: &TrendWithSource, stroke: (Point, Point)) {
        let (start, end) = stroke;
        let pick = Pick::Trend(index);
        let selected = input.selected == Some(pick);
        let annotated = input.intentions.find(&IntentionKey::Single(index)).is_some();
        let color = emphasis(input.color(trend.category.text_source_id), selected);
        let bounds = span_bounds(start, end);

        if selected {
            self.commands.push(DrawCommand::Rect {
                bounds,
                fill: color.scale_alpha(0.3),
                radius: 0.0,
            });
        }

        let width = if annotated { 3.5 } else { 2.5 };
        let line = match trend.category.category {
            TrendCategory::Arbitrary => Stroke::dashed(color, width, [3.0, 3.0]),
            _ => Stroke::solid(color, width),
        };
        self.commands.push(DrawCommand::Line {
            from: start,
            to: end,
            stroke: line,
        });
        self.commands.push(DrawCommand::Circle {
            center: end,
            radius: width * 0.9,
            fill: color,
        });

        let slope_scope = trend.slope_scope_condition.as_ref().filter(|s| is_bounded(s));
        let relative_scope = trend
            .relative_slope_scope_condition
            .as_ref()
            .filter(|s| is_bounded(s));
        let related = |attribute: SingleAttribute| {
            input.query.single_relations.iter().any(|relation| {
                relation.attribute == attribute && (relation.id1 == index || relation.id2 == index)
            })
        };
        let slope = slope_scope.is_some() || related(SingleAttribute::Slope);
        let relative = relative_scope.is_some() || related(SingleAttribute::RelativeSlope);

        if slope || relative {
            self.commands.push(DrawCommand::Line {
                from: start,
                to: Point::new(start.x + ARC * 1.8, start.y),
                stroke: Stroke::dashed(color, 1.0, [2.0, 2.0]),
            });
        }
        if slope {
            let stroke = Stroke::solid(input.condition_color(slope_scope, color), 2.0);
            self.arc(start, end, ARC, stroke);
        }
        if relative {
            let radius = if slope { ARC * 1.5 } else { ARC };
            let stroke = Stroke::dashed(input.condition_color(relative_scope, color), 2.0, [2.0, 2.0]);
            self.arc(start, end, radius, stroke);
        }

        let labels = [("slope", slope_scope), ("rel. slope", relative_scope)];
        let rising = end.y < start.y;
        let line_height = FONT * 1.1;
        for (row, (name, scope)) in labels
            .into_iter()
            .filter_map(|(name, scope)| Some((name, scope?)))
            .enumerate()
        {
            let Some(range) = scope_text(scope) else {
                continue;
            };
            let y = if rising {
                start.y - row as f32 * line_height - 2.0
            } else {
                start.y + (row + 1) as f32 * line_height
            };
            self.commands.push(DrawCommand::Text {
                content: format!("{name}: {range}"),
                position: Point::new(start.x + ARC * 1.5 + FONT / 3.0, y),
                color: input.condition_color(Some(scope), color),
                size: FONT * 0.9,
                align_x: Align::Start,
                align_y: Align::End,
            });
        }

        self.items.push(Item {
            pick,
            bounds,
            annotated,
        });
    }

    /// Duration conditions of trends, groups and the whole query as
    /// bars under the strokes. Returns how many rows they take.
    fn durations(&mut self, input: &GlyphInput, bottom: f32) -> usize {
        let query = input.query;
        let n = query.trends.len();

        let trends = query.trends.iter().enumerate().filter_map(|(index, trend)| {
            let scope = trend.duration_condition.as_ref()?;
            Some((index, index, scope))
        });
        let groups = query.trend_groups.iter().filter_map(|group| {
            let scope = group.duration_condition.as_ref()?;
            let [lo, hi] = group.ids;
            (lo <= hi && hi < n).then_some((lo, hi, scope))
        });
        let global = query.duration_condition.as_ref().map(|scope| (0, n - 1, scope));

        let mut lanes = Lanes::default();
        for (lo, hi, scope) in trends.chain(groups).chain(global) {
            let Some(range) = scope_text(scope) else {
                continue;
            };
            let (from, to) = (lo as f32 * CELL, (hi + 1) as f32 * CELL);
            let level = lanes.claim(from, to);
            let y = bottom + level as f32 * DURATION_STEP + 4.0;
            let color = input.color(scope.text_source_id);

            let mid = (from + to) / 2.0;
            let gap = range.chars().count() as f32 * FONT / 4.0;
            let stroke = Stroke::solid(color, 1.5);
            self.commands.push(DrawCommand::Line {
                from: Point::new(from, y),
                to: Point::new((mid - gap).max(from), y),
                stroke,
            });
            self.commands.push(DrawCommand::Line {
                from: Point::new((mid + gap).min(to), y),
                to: Point::new(to, y),
                stroke,
            });
            self.dot(Point::new(from, y), color);
            self.dot(Point::new(to, y), color);
            self.commands.push(DrawCommand::Text {
                content: range,
                position: Point::new(mid, y),
                color,
                size: FONT,
                align_x: Align::Center,
                align_y: Align::Center,
            });
        }

        lanes.depth()
    }

    /// Dashed connector from `a` down or up to `lane`, across and back.
    fn link(&mut self, a: Point, b: Point, lane: f32, link: &Link) {
        let (from, to) = if a.x <= b.x { (a, b) } else { (b, a) };
        let color = emphasis(link.color, link.selected);
        let width = if link.annotated || link.selected { 3.0 } else { 2.0 };
        let stroke = Stroke::dashed(color, width, [4.0, 4.0]);

        let label = link.label.symbol();
        let mid = (from.x + to.x) / 2.0;
        let gap = label.chars().count() as f32 * FONT * 0.5 + 2.0;

        self.commands.push(DrawCommand::Path {
            points: vec![from, Point::new(from.x, lane), Point::new(mid - gap, lane)],
            stroke,
        });
        self.commands.push(DrawCommand::Path {
            points: vec![Point::new(mid + gap, lane), Point::new(to.x, lane), to],
            stroke,
        });
        self.commands.push(DrawCommand::Text {
            content: label.to_string(),
            position: Point::new(mid, lane),
            color,
            size: FONT * 1.5,
            align_x: Align::Center,
            align_y: Align::Center,
        });

        self.items.push(Item {
            pick: link.pick,
            bounds: Rectangle::new(
                Point::new(from.x, lane - LANE_STEP / 2.0),
                Size::new(to.x - from.x, LANE_STEP),
            ),
            annotated: link.annotated,
        });
    }

    fn dot(&mut self, center: Point, fill: Color) {
        self.commands.push(DrawCommand::Circle {
            center,
            radius: 2.0,
            fill,
        });
    }

    /// Arc around `start` from the horizontal to the stroke direction.
    fn arc(&mut self, start: Point, end: Point, radius: f32, stroke: Stroke) {
        const STEPS: usize = 8;
        let angle = (end.y - start.y).atan2(end.x - start.x);

        let points = (0..=STEPS)
            .map(|step| {
                let a = angle * step as f32 / STEPS as f32;
                Point::new(start.x + radius * a.cos(), start.y + radius * a.sin())
            })
            .collect();
        self.commands.push(DrawCommand::Path { points, stroke });
    }

    /// Scales and centers everything into `size`.
    fn fit(self, size: Size) -> Option<Glyph> {
        let extent = extent(&self.commands)?;
        let (width, height) = (size.width - 2.0 * PADDING, size.height - 2.0 * PADDING);
        if width <= 0.0 || height <= 0.0 {
            return None;
        }

        let scale = (width / extent.width.max(1.0))
            .min(height / extent.height.max(1.0))
            .min(MAX_SCALE);
        let offset = Vector::new(
            PADDING + (width - extent.width * scale) / 2.0 - extent.x * scale,
            PADDING + (height - extent.height * scale) / 2.0 - extent.y * scale,
        );
        let map = |p: Point| Point::new(p.x * scale + offset.x, p.y * scale + offset.y);

        let commands = self
            .commands
            .into_iter()
            .map(|command| match command {
                DrawCommand::Line { from, to, stroke } => DrawCommand::Line {
                    from: map(from),
                    to: map(to),
                    stroke,
                },
                DrawCommand::Path { points, stroke } => DrawCommand::Path {
                    points: points.into_iter().map(map).collect(),
                    stroke,
                },
                DrawCommand::Area {
                    points,
                    baseline,
                    fill,
                } => DrawCommand::Area {
                    points: points.into_iter().map(map).collect(),
                    baseline: baseline * scale + offset.y,
                    fill,
                },
                DrawCommand::Rect {
                    bounds,
                    fill,
                    radius,
                } => DrawCommand::Rect {
                    bounds: scale_rect(bounds, scale, offset),
                    fill,
                    radius,
                },
                DrawCommand::Text {
                    content,
                    position,
                    color,
                    size,
                    align_x,
                    align_y,
                } => DrawCommand::Text {
                    content,
                    position: map(position),
                    color,
                    size,
                    align_x,
                    align_y,
                },
                DrawCommand::Circle {
                    center,
                    radius,
                    fill,
                } => DrawCommand::Circle {
                    center: map(center),
                    radius,
                    fill,
                },
            })
            .collect();

        let items = self
            .items
            .into_iter()
            .map(|item| Item {
                bounds: scale_rect(item.bounds, scale, offset),
                ..item
            })
            .collect();

        Some(Glyph {
            layer: DrawLayer {
                clip: None,
                commands,
            },
            items,
        })
    }
}

fn extent(commands: &[DrawCommand]) -> Option<Rectangle> {
    let mut points = Vec::new();
    for command in commands {
        match command {
            DrawCommand::Line { from, to, .. } => points.extend([*from, *to]),
            DrawCommand::Path { points: path, .. } | DrawCommand::Area { points: path, .. } => {
                points.extend(path.iter().copied());
            }
            DrawCommand::Rect { bounds, .. } => points.extend([
                bounds.position(),
                Point::new(bounds.x + bounds.width, bounds.y + bounds.height),
            ]),
            DrawCommand::Text { position, .. } => points.push(*position),
            DrawCommand::Circle { center, radius, .. } => points.extend([
                Point::new(center.x - radius, center.y - radius),
                Point::new(center.x + radius, center.y + radius),
            ]),
        }
    }

    let first = *points.first()?;
    let (min, max) = points.iter().fold((first, first), |(min, max), p| {
        (
            Point::new(min.x.min(p.x), min.y.min(p.y)),
            Point::new(max.x.max(p.x), max.y.max(p.y)),
        )
    });
    Some(Rectangle::new(min, Size::new(max.x - min.x, max.y - min.y)))
}

/// Bounding box of a stroke, at least one lane tall.
fn span_bounds(a: Point, b: Point) -> Rectangle {
    let (top, bottom) = (a.y.min(b.y), a.y.max(b.y));
    let pad = ((LANE_STEP - (bottom - top)) / 2.0).max(0.0);
    Rectangle::new(
        Point::new(a.x.min(b.x), top - pad),
        Size::new((b.x - a.x).abs(), bottom - top + 2.0 * pad),
    )
}

fn scale_rect(rect: Rectangle, scale: f32, offset: Vector) -> Rectangle {
    Rectangle::new(
        Point::new(rect.x * scale + offset.x, rect.y * scale + offset.y),
        Size::new(rect.width * scale, rect.height * scale),
    )
}

fn inflate(rect: Rectangle, by: f32) -> Rectangle {
    Rectangle::new(
        Point::new(rect.x - by, rect.y - by),
        Size::new(rect.width + 2.0 * by, rect.height + 2.0 * by),
    )
}

fn cell_center(index: usize) -> f32 {
    (index as f32 + 0.5) * CELL
}

fn emphasis(color: Color, selected: bool) -> Color {
    if selected { Color { a: 1.0, ..color } } else { color }
}

/// Comparator read right to left.
fn flipped(comparator: Comparator) -> Comparator {
    match comparator {
        Comparator::Greater => Comparator::Less,
        Comparator::Less => Comparator::Greater,
        Comparator::NoGreater => Comparator::NoLess,
        Comparator::NoLess => Comparator::NoGreater,
        Comparator::Equal | Comparator::ApproximatelyEqual => comparator,
    }
}

fn is_bounded(scope: &ScopeWithSource) -> bool {
    scope.min.is_some() || scope.max.is_some()
}

fn scope_text(scope: &ScopeWithSource) -> Option<String> {
    let lower = scope
        .min
        .map(|min| format!("{}{}", if min.inclusive { '[' } else { '(' }, min.value));
    let upper = scope
        .max
        .map(|max| format!("{}{}", max.value, if max.inclusive { ']' } else { ')' }));
    if lower.is_none() && upper.is_none() {
        return None;
    }

    let range = format!(
        "{}, {}",
        lower.unwrap_or_else(|| "(-∞".to_string()),
        upper.unwrap_or_else(|| "+∞)".to_string())
    );
    Some(match scope.unit {
        Some(unit) if unit != Unit::Number => format!("{range} {unit}s"),
        _ => range,
    })
}

fn attribute_name(attribute: SingleAttribute) -> &'static str {
    match attribute {
        SingleAttribute::Slope => "slope",
        SingleAttribute::StartValue => "start value",
        SingleAttribute::EndValue => "end value",
        SingleAttribute::Duration => "duration",
        SingleAttribute::RelativeSlope => "relative slope",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::intention::ChoiceSet;
    use crate::query::color_map;
    use serde_json::json;
    use service::{SingleChoice, SingleRelationChoice};

    const SIZE: Size = Size::new(320.0, 200.0);

    fn query() -> QuerySpecWithSource {
        serde_json::from_value(json!({
            "original_text": "rise steeply, stay flat, then fall below the start",
            "text_sources": [
                { "text": "rise", "index": 0 },
                { "text": "steeply", "index": 0 },
                { "text": "flat", "index": 0 },
                { "text": "fall", "index": 0 },
                { "text": "below the start", "index": 0 },
            ],
            "trends": [
                {
                    "category": { "text_source_id": 0, "category": "up" },
                    "slope_scope_condition": {
                        "text_source_id": 1,
                        "min": { "value": 0.5, "inclusive": true },
                    },
                },
                { "category": { "text_source_id": 2, "category": "flat" } },
                { "category": { "text_source_id": 3, "category": "down" } },
            ],
            "single_relations": [
                {
                    "text_source_id": 4,
                    "id1": 2,
                    "id2": 0,
                    "attribute": "end_value",
                    "comparator": "<",
                },
            ],
        }))
        .unwrap()
    }

    fn glyph(query: &QuerySpecWithSource, intentions: &IntentionModel, selected: Option<Pick>) -> Glyph {
        let colors = color_map(Some(query));
        let input = GlyphInput {
            query,
            colors: &colors,
            intentions,
            selected,
        };
        Glyph::build(&input, SIZE).unwrap()
    }

    #[test]
    fn trends_chain_end_to_start() {
        let strokes = chain(&query().trends);
        assert_eq!(
            strokes,
            vec![
                (Point::new(0.0, CELL), Point::new(CELL, 0.0)),
                (Point::new(CELL, 0.0), Point::new(2.0 * CELL, 0.0)),
                (Point::new(2.0 * CELL, 0.0), Point::new(3.0 * CELL, CELL)),
            ]
        );
    }

    #[test]
    fn overlapping_spans_take_new_lanes() {
        let mut lanes = Lanes::default();
        assert_eq!(lanes.claim(0.0, 64.0), 0);
        assert_eq!(lanes.claim(96.0, 32.0), 1);
        // touching spans share a lane
        assert_eq!(lanes.claim(64.0, 128.0), 0);
        assert_eq!(lanes.depth(), 2);
    }

    #[test]
    fn every_item_is_picked_at_its_center() {
        let glyph = glyph(&query(), &IntentionModel::default(), None);
        let picks: Vec<Pick> = glyph.items().iter().map(|item| item.pick).collect();
        assert_eq!(
            picks,
            vec![Pick::Trend(0), Pick::Trend(1), Pick::Trend(2), Pick::Relation(0)]
        );

        for item in glyph.items() {
            assert_eq!(glyph.pick_at(item.bounds.center()), Some(item.pick));
        }
        assert_eq!(glyph.pick_at(Point::new(1.0, 1.0)), None);
    }

    #[test]
    fn glyph_fits_inside_the_canvas() {
        let glyph = glyph(&query(), &IntentionModel::default(), None);
        let bounds = Rectangle::new(Point::ORIGIN, SIZE);

        for item in glyph.items() {
            assert!(bounds.contains(item.bounds.position()));
        }
    }

    #[test]
    fn relations_read_left_to_right() {
        let glyph = glyph(&query(), &IntentionModel::default(), None);
        let labels: Vec<&str> = glyph
            .layer
            .commands
            .iter()
            .filter_map(|command| match command {
                DrawCommand::Text { content, .. } => Some(content.as_str()),
                _ => None,
            })
            .collect();

        // trend 2 < trend 0 is drawn from trend 0
        assert!(labels.contains(&">"));
        assert!(!labels.contains(&"<"));
        assert!(labels.contains(&"slope: [0.5, +∞)"));
    }

    #[test]
    fn intentions_mark_their_trends_and_relations() {
        let mut intentions = IntentionModel::default();
        intentions
            .upsert(IntentionKey::Single(1), ChoiceSet::Single(vec![SingleChoice::Slope]))
            .unwrap();
        intentions
            .upsert(
                IntentionKey::SingleRelation(0, 2),
                ChoiceSet::SingleRelation(vec![SingleRelationChoice::EndValue]),
            )
            .unwrap();

        let glyph = glyph(&query(), &intentions, None);
        let annotated: Vec<Pick> = glyph
            .items()
            .iter()
            .filter(|item| item.annotated)
            .map(|item| item.pick)
            .collect();
        assert_eq!(annotated, vec![Pick::Trend(1), Pick::Relation(0)]);
    }

    #[test]
    fn selected_trend_is_shaded() {
        let shaded = |glyph: &Glyph| {
            glyph
                .layer
                .commands
                .iter()
                .any(|command| matches!(command, DrawCommand::Rect { .. }))
        };

        assert!(!shaded(&glyph(&query(), &IntentionModel::default(), None)));
        assert!(shaded(&glyph(
            &query(),
            &IntentionModel::default(),
            Some(Pick::Trend(2))
        )));
    }

    #[test]
    fn out_of_range_relations_are_skipped() {
        let mut q = query();
        q.single_relations[0].id1 = 7;
        let glyph = glyph(&q, &IntentionModel::default(), None);
        assert_eq!(glyph.items().len(), 3);
    }

    #[test]
    fn empty_queries_and_tiny_canvases_draw_nothing() {
        let colors = ColorMap::default();
        let intentions = IntentionModel::default();
        let empty = QuerySpecWithSource::default();
        let input = GlyphInput {
            query: &empty,
            colors: &colors,
            intentions: &intentions,
            selected: None,
        };
        assert!(Glyph::build(&input, SIZE).is_none());

        let q = query();
        let input = GlyphInput { query: &q, ..input };
        assert!(Glyph::build(&input, Size::new(12.0, 12.0)).is_none());
    }

    #[test]
    fn describe_names_conditions_and_relations() {
        let q = query();
        assert_eq!(
            describe(&q, Pick::Trend(0)).as_deref(),
            Some("Trend 0: up, slope [0.5, +∞)")
        );
        assert_eq!(
            describe(&q, Pick::Relation(0)).as_deref(),
            Some("Trend 2 end value < trend 0")
        );
        assert_eq!(describe(&q, Pick::GroupRelation(0)), None);
    }
}
