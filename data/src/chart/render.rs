//! Render pass for the split chart.
//!
//! [`build`] is a pure function of the chart state: it lays out the series,
//! emits an ordered list of [`DrawCommand`]s per layer and the hit targets the
//! canvas needs to turn pointer input back into chart gestures. Nothing here
//! knows about the widget toolkit beyond `iced_core` geometry and colors.

use super::Series;
use super::intention::{IntentionKey, IntentionModel};
use super::popover::{Anchor, PopoverState};
use super::scale::{Layout, Viewport, format_number, format_x};
use super::selection::{Preview, SelectionKind};
use super::split::{self, SplitRange};
use crate::config::theme::darken;

use iced_core::{Color, Point, Rectangle, Size};
use service::Segment;

/// Vertical distance between stacked annotation rows.
pub const ANNOTATION_STEP: f32 = 8.0;
const ANNOTATION_TICK: f32 = 3.0;
const ANNOTATION_SLACK: f32 = 4.0;

const AXIS_ARROW: f32 = 10.0;
const AXIS_TICK: f32 = 6.0;
const AXIS_TEXT_SIZE: f32 = 10.0;
const TEXT_SIZE: f32 = 12.0;

const BUTTON_GAP: f32 = 10.0;
const BUTTON_RADIUS: f32 = 4.0;
const CANCEL_OFFSET: f32 = 32.0;
const CANCEL_WIDTH: f32 = 60.0;
const BUTTON_HEIGHT: f32 = 24.0;
/// Button opacity while a refinement request is in flight.
const REQUESTING_ALPHA: f32 = 0.6;

const TOOLTIP_CHAR_PX: f32 = 6.5;
const TOOLTIP_LINE: f32 = 16.0;
const TOOLTIP_PADDING: f32 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartPalette {
    pub axis: Color,
    pub text: Color,
    pub line: Color,
    pub relation_fill: Color,
    pub selection_fill: Color,
    pub envelope_fill: Color,
    pub annotation: Color,
    pub relation_annotation: Color,
    pub primary: Color,
    pub on_primary: Color,
    pub danger: Color,
    pub result_default: Color,
    pub brush: Color,
    pub highlight: Color,
    pub active: Color,
    pub tooltip_background: Color,
    pub tooltip_text: Color,
}

impl Default for ChartPalette {
    fn default() -> Self {
        Self {
            axis: Color::from_rgb8(0x66, 0x66, 0x66),
            text: Color::BLACK,
            line: Color::BLACK,
            relation_fill: Color::from_rgba8(0x00, 0x80, 0x00, 0.2),
            selection_fill: Color::from_rgba8(0x18, 0x90, 0xff, 0.2),
            envelope_fill: Color::from_rgba8(0x33, 0x33, 0x33, 17.0 / 255.0),
            annotation: Color::BLACK,
            relation_annotation: Color::from_rgb8(0xbb, 0xbb, 0xbb),
            primary: Color::from_rgb8(0x18, 0x90, 0xff),
            on_primary: Color::WHITE,
            danger: Color::from_rgb8(0xff, 0x4d, 0x4f),
            result_default: Color::from_rgb8(0x66, 0x66, 0x66),
            brush: Color::from_rgba8(0x54, 0x6b, 0xb6, 0.2),
            highlight: Color::from_rgba8(0x82, 0xc4, 0xff, 0.6),
            active: Color::from_rgba8(0x82, 0xc4, 0xff, 0.2),
            tooltip_background: Color::from_rgba8(0, 0, 0, 0.75),
            tooltip_text: Color::WHITE,
        }
    }
}

impl ChartPalette {
    /// Greyed-out variant for result thumbnails.
    pub fn thumbnail() -> Self {
        Self {
            axis: Color::from_rgb8(0xc5, 0xc5, 0xc5),
            line: Color::from_rgb8(0xa6, 0xa6, 0xa6),
            ..Self::default()
        }
    }

    /// Follows the text and accent colors of an iced palette.
    pub fn from_palette(palette: &iced_core::theme::Palette) -> Self {
        let defaults = Self::default();
        Self {
            axis: palette.text.scale_alpha(0.6),
            text: palette.text,
            line: palette.text,
            relation_fill: palette.success.scale_alpha(0.2),
            selection_fill: palette.primary.scale_alpha(0.2),
            envelope_fill: palette.text.scale_alpha(17.0 / 255.0),
            annotation: palette.text,
            relation_annotation: palette.text.scale_alpha(0.35),
            primary: palette.primary,
            danger: palette.danger,
            result_default: palette.text.scale_alpha(0.6),
            ..defaults
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub width: f32,
    /// Dash and gap lengths, solid when `None`.
    pub dash: Option<[f32; 2]>,
}

impl Stroke {
    pub fn solid(color: Color, width: f32) -> Self {
        Self {
            color,
            width,
            dash: None,
        }
    }

    pub fn dashed(color: Color, width: f32, dash: [f32; 2]) -> Self {
        Self {
            color,
            width,
            dash: Some(dash),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Start,
    Center,
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Line {
        from: Point,
        to: Point,
        stroke: Stroke,
    },
    /// Open polyline.
    Path {
        points: Vec<Point>,
        stroke: Stroke,
    },
    /// Polyline closed down to a horizontal baseline.
    Area {
        points: Vec<Point>,
        baseline: f32,
        fill: Color,
    },
    Rect {
        bounds: Rectangle,
        fill: Color,
        radius: f32,
    },
    Text {
        content: String,
        position: Point,
        color: Color,
        size: f32,
        align_x: Align,
        align_y: Align,
    },
    Circle {
        center: Point,
        radius: f32,
        fill: Color,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DrawLayer {
    pub clip: Option<Rectangle>,
    pub commands: Vec<DrawCommand>,
}

impl DrawLayer {
    fn clipped(clip: Rectangle) -> Self {
        Self {
            clip: Some(clip),
            commands: Vec::new(),
        }
    }

    fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    fn line(&mut self, from: Point, to: Point, stroke: Stroke) {
        self.push(DrawCommand::Line { from, to, stroke });
    }

    fn rect(&mut self, bounds: Rectangle, fill: Color) {
        self.push(DrawCommand::Rect {
            bounds,
            fill,
            radius: 0.0,
        });
    }

    fn text(&mut self, content: impl Into<String>, position: Point, color: Color, size: f32, align: (Align, Align)) {
        self.push(DrawCommand::Text {
            content: content.into(),
            position,
            color,
            size,
            align_x: align.0,
            align_y: align.1,
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionHit {
    pub range: SplitRange,
    pub bounds: Rectangle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationHit {
    pub key: IntentionKey,
    pub spans: Vec<SplitRange>,
    pub level: usize,
    pub bounds: Rectangle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ButtonHit {
    pub bounds: Rectangle,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonKind {
    Submit,
    Cancel,
}

/// State of the interactive layer, borrowed from the owning chart.
#[derive(Debug, Clone)]
pub struct Interaction<'a> {
    pub envelope: &'a [usize],
    pub preview: Option<Preview>,
    pub staged: &'a [SplitRange],
    pub popover: Option<&'a PopoverState>,
    pub intentions: &'a IntentionModel,
    pub requesting: bool,
    pub submit_label: String,
    pub submit_width: f32,
}

/// Result fragments drawn over the series; colors are picked by the
/// position of a segment inside its fragment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultsOverlay {
    pub fragments: Vec<Vec<SplitRange>>,
    pub colors: Vec<Option<Color>>,
}

#[derive(Debug, Clone, Copy)]
pub struct Hover<'a> {
    pub cursor: Point,
    pub segments: &'a [Segment],
}

#[derive(Debug, Clone)]
pub struct RenderInput<'a> {
    pub series: &'a Series,
    pub range: Option<(usize, usize)>,
    pub viewport: Viewport,
    pub palette: &'a ChartPalette,
    pub title: Option<&'a str>,
    pub axes: bool,
    pub active: bool,
    /// Shades the extent of the data.
    pub shade_range: bool,
    /// Fills the area below the line.
    pub fill: bool,
    pub candidates: &'a [usize],
    /// Accepted splits; results matching them are drawn thicker.
    pub accepted: &'a [usize],
    pub results: Option<&'a ResultsOverlay>,
    pub brush: Option<(usize, usize)>,
    pub interaction: Option<Interaction<'a>>,
    pub hover: Option<Hover<'a>>,
}

impl<'a> RenderInput<'a> {
    pub fn new(series: &'a Series, viewport: Viewport, palette: &'a ChartPalette) -> Self {
        Self {
            series,
            range: None,
            viewport,
            palette,
            title: None,
            axes: true,
            active: false,
            shade_range: false,
            fill: false,
            candidates: &[],
            accepted: &[],
            results: None,
            brush: None,
            interaction: None,
            hover: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub size: Size,
    pub layout: Layout,
    pub layers: Vec<DrawLayer>,
    pub regions: Vec<RegionHit>,
    pub annotations: Vec<AnnotationHit>,
    pub submit: Option<ButtonHit>,
    pub cancel: Option<ButtonHit>,
    pub popover_anchor: Option<Point>,
}

impl Scene {
    pub fn region_at(&self, point: Point) -> Option<SplitRange> {
        self.regions
            .iter()
            .find(|hit| hit.bounds.contains(point))
            .map(|hit| hit.range)
    }

    pub fn annotation_at(&self, point: Point) -> Option<&AnnotationHit> {
        self.annotations
            .iter()
            .find(|hit| hit.bounds.contains(point))
    }

    /// Enabled button under `point`.
    pub fn button_at(&self, point: Point) -> Option<ButtonKind> {
        let hit = |button: &Option<ButtonHit>| {
            button.is_some_and(|b| b.enabled && b.bounds.contains(point))
        };

        if hit(&self.submit) {
            Some(ButtonKind::Submit)
        } else if hit(&self.cancel) {
            Some(ButtonKind::Cancel)
        } else {
            None
        }
    }
}

/// `None` when the series has nothing to draw in the requested window.
pub fn build(input: &RenderInput) -> Option<Scene> {
    let series = input.series;
    let palette = input.palette;
    let layout = Layout::fit(series, input.range, &input.viewport)?;
    let inner = layout.inner_bounds();
    let size = Size::new(layout.outer_width(), layout.outer_height());

    let mut base = DrawLayer::default();
    let mut plot = DrawLayer::clipped(inner);
    let mut annotations = DrawLayer::clipped(Rectangle {
        x: inner.x,
        y: 0.0,
        width: inner.width,
        height: inner.height,
    });
    let mut overlay = DrawLayer::default();

    if input.active {
        base.rect(Rectangle::new(Point::ORIGIN, size), palette.active);
    }
    if input.axes {
        draw_axes(&mut base, &layout, series, palette);
    }
    if let Some(title) = input.title {
        base.text(
            title,
            Point::new(inner.x + 5.0, inner.y),
            palette.text,
            TEXT_SIZE,
            (Align::Start, Align::End),
        );
    }

    if input.shade_range {
        let (lo, hi) = layout.window;
        if let (Some(x0), Some(x1)) = (layout.x_at(series, lo), layout.x_at(series, hi)) {
            plot.rect(
                Rectangle::new(Point::new(x0, inner.y), Size::new(x1 - x0, inner.height)),
                palette.envelope_fill,
            );
        }
    }

    if input.fill {
        let baseline = layout.y.map(layout.y_extent.0);
        for points in runs(&layout, series, layout.window) {
            plot.push(DrawCommand::Area {
                points,
                baseline,
                fill: palette.highlight,
            });
        }
    }

    if let Some(brush) = input.brush {
        draw_brush(&mut plot, &layout, series, brush, input.fill, palette);
    }

    let degenerate = matches!(input.range, Some((s, e)) if s == e);
    if !degenerate {
        let stroke = Stroke::solid(palette.line.scale_alpha(0.7), 1.0);
        for points in runs(&layout, series, layout.window) {
            plot.push(DrawCommand::Path { points, stroke });
        }
    }

    let split_stroke = Stroke::solid(darken(palette.line, 0.2).scale_alpha(0.5), 2.0);
    for range in split::regions(input.candidates) {
        if !layout.overlaps(series, range) {
            continue;
        }
        if let (Some(from), Some(to)) = (layout.point_at(series, range.0), layout.point_at(series, range.1)) {
            plot.line(from, to, split_stroke);
        }
    }

    let mut regions = Vec::new();
    let mut rows = Vec::new();
    let mut submit = None;
    let mut cancel = None;

    if let Some(interaction) = &input.interaction {
        regions = region_hits(&layout, series, input.candidates);
        for hit in &regions {
            if let Some(fill) = region_fill(hit.range, interaction, palette) {
                plot.rect(hit.bounds, fill);
            }
            if is_divider(hit.range, interaction.popover) {
                plot.line(
                    Point::new(hit.bounds.x, inner.y),
                    Point::new(hit.bounds.x, inner.y + inner.height),
                    Stroke::dashed(Color { a: 1.0, ..palette.relation_fill }, 1.0, [4.0, 4.0]),
                );
            }
        }
    }

    if let Some(results) = input.results {
        draw_results(&mut plot, &layout, series, results, input.accepted, palette);
    }

    if let Some(interaction) = &input.interaction {
        rows = draw_annotations(&mut annotations, &layout, series, interaction, palette);
        (submit, cancel) = draw_buttons(&mut overlay, &layout, series, interaction, palette);
    }

    if let Some(hover) = &input.hover {
        draw_hover(&mut overlay, &layout, series, hover, palette);
    }

    let popover_anchor = input
        .interaction
        .as_ref()
        .and_then(|interaction| interaction.popover)
        .and_then(|state| popover_anchor(state, &regions, &rows, inner.y));

    Some(Scene {
        size,
        layout,
        layers: vec![base, plot, annotations, overlay],
        regions,
        annotations: rows,
        submit,
        cancel,
        popover_anchor,
    })
}

/// Continuous polylines of the finite points in `window`.
fn runs(layout: &Layout, series: &Series, (start, end): (usize, usize)) -> Vec<Vec<Point>> {
    let mut out = Vec::new();
    let mut current = Vec::new();

    for idx in start..=end {
        match layout.point_at(series, idx) {
            Some(point) => current.push(point),
            None if current.len() > 1 => out.push(std::mem::take(&mut current)),
            None => current.clear(),
        }
    }
    if current.len() > 1 {
        out.push(current);
    }
    out
}

fn draw_axes(layer: &mut DrawLayer, layout: &Layout, series: &Series, palette: &ChartPalette) {
    let inner = layout.inner_bounds();
    let bottom = inner.y + inner.height;
    let right = inner.x + inner.width;
    let stroke = Stroke::solid(palette.axis, 1.0);

    layer.line(
        Point::new(inner.x, bottom),
        Point::new(right + AXIS_ARROW, bottom),
        stroke,
    );
    arrow_head(layer, Point::new(right + AXIS_ARROW, bottom), true, stroke);

    for tick in layout.x_ticks(series) {
        if tick.px < inner.x || tick.px > right {
            continue;
        }
        layer.line(
            Point::new(tick.px, bottom),
            Point::new(tick.px, bottom + AXIS_TICK),
            stroke,
        );
        layer.text(
            tick.label,
            Point::new(tick.px, bottom + AXIS_TICK + 3.0),
            palette.axis,
            AXIS_TEXT_SIZE,
            (Align::Center, Align::Start),
        );
    }

    layer.line(
        Point::new(inner.x, bottom),
        Point::new(inner.x, inner.y - ANNOTATION_STEP),
        stroke,
    );
    arrow_head(layer, Point::new(inner.x, inner.y - ANNOTATION_STEP), false, stroke);

    for tick in layout.y_ticks() {
        layer.line(
            Point::new(inner.x - AXIS_TICK, tick.px),
            Point::new(inner.x, tick.px),
            stroke,
        );
        layer.text(
            tick.label,
            Point::new(inner.x - AXIS_TICK - 3.0, tick.px),
            palette.axis,
            AXIS_TEXT_SIZE,
            (Align::End, Align::Center),
        );
    }
}

fn arrow_head(layer: &mut DrawLayer, tip: Point, horizontal: bool, stroke: Stroke) {
    let (a, b) = if horizontal {
        (Point::new(tip.x - 5.0, tip.y - 3.0), Point::new(tip.x - 5.0, tip.y + 3.0))
    } else {
        (Point::new(tip.x - 3.0, tip.y + 5.0), Point::new(tip.x + 3.0, tip.y + 5.0))
    };
    layer.line(a, tip, stroke);
    layer.line(b, tip, stroke);
}

fn draw_brush(
    layer: &mut DrawLayer,
    layout: &Layout,
    series: &Series,
    (start, end): (usize, usize),
    fill: bool,
    palette: &ChartPalette,
) {
    let inner = layout.inner_bounds();
    let (Some(x0), Some(x1)) = (layout.x_at(series, start), layout.x_at(series, end)) else {
        return;
    };
    let (x0, x1) = (x0.min(x1), x0.max(x1));

    layer.rect(
        Rectangle::new(Point::new(x0, inner.y), Size::new(x1 - x0, inner.height)),
        palette.brush,
    );

    if fill {
        let baseline = layout.y.map(layout.y_extent.0);
        for points in runs(layout, series, (start.min(end), start.max(end))) {
            layer.push(DrawCommand::Area {
                points,
                baseline,
                fill: palette.highlight,
            });
        }
    }
}

/// Full-height hit rectangles of the candidate regions inside the x domain.
fn region_hits(layout: &Layout, series: &Series, candidates: &[usize]) -> Vec<RegionHit> {
    let inner = layout.inner_bounds();
    let right = inner.x + inner.width;

    split::regions(candidates)
        .filter(|range| layout.overlaps(series, *range))
        .filter_map(|range| {
            let x0 = layout.x_at(series, range.0)?.max(inner.x);
            let x1 = layout.x_at(series, range.1)?.min(right);
            (x1 > x0).then(|| RegionHit {
                range,
                bounds: Rectangle::new(Point::new(x0, inner.y), Size::new(x1 - x0, inner.height)),
            })
        })
        .collect()
}

/// Staged relation side and open popover first, then the drag preview, then
/// the envelope.
fn region_fill(range: SplitRange, interaction: &Interaction, palette: &ChartPalette) -> Option<Color> {
    let popover = interaction.popover;
    let relation = !interaction.staged.is_empty()
        || popover.is_some_and(|state| state.selection.kind.is_relation());

    let in_staged = interaction.staged.contains(&range);
    let in_popover = popover.is_some_and(|state| state.selection.contains(range));
    if in_staged || in_popover {
        return Some(if relation {
            palette.relation_fill
        } else {
            palette.selection_fill
        });
    }

    if let Some(preview) = &interaction.preview
        && preview.ranges.contains(&range)
    {
        return Some(match (preview.authoring, preview.relation) {
            (true, _) => palette.envelope_fill,
            (false, true) => palette.relation_fill,
            (false, false) => palette.selection_fill,
        });
    }

    split::contains_range(interaction.envelope, range).then_some(palette.envelope_fill)
}

/// Whether a divider goes at the left edge of `range`: the two relation sides
/// of the open popover touch there.
fn is_divider(range: SplitRange, popover: Option<&PopoverState>) -> bool {
    let Some([a, b]) = popover.and_then(|state| state.selection.groups.as_ref()) else {
        return false;
    };
    matches!(
        (a.last(), b.first()),
        (Some(left), Some(right)) if left.1 == right.0 && right.0 == range.0
    )
}

fn draw_results(
    layer: &mut DrawLayer,
    layout: &Layout,
    series: &Series,
    results: &ResultsOverlay,
    accepted: &[usize],
    palette: &ChartPalette,
) {
    for fragment in &results.fragments {
        for (j, range) in fragment.iter().enumerate() {
            if !layout.overlaps(series, *range) {
                continue;
            }
            let (Some(from), Some(to)) = (layout.point_at(series, range.0), layout.point_at(series, range.1)) else {
                continue;
            };

            let color = results
                .colors
                .get(j)
                .copied()
                .flatten()
                .unwrap_or(palette.result_default);
            let stroke = if split::contains_range(accepted, *range) {
                Stroke::solid(color, 4.0)
            } else {
                Stroke::solid(color.scale_alpha(0.7), 2.5)
            };
            layer.line(from, to, stroke);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Row {
    key: IntentionKey,
    spans: Vec<SplitRange>,
    level: usize,
}

impl Row {
    fn outer(&self) -> Option<SplitRange> {
        split::span(&self.spans)
    }
}

fn overlapping(a: SplitRange, b: SplitRange) -> bool {
    a.0.max(b.0) < a.1.min(b.1)
}

fn lowest_free(rows: &[Row], outer: SplitRange) -> usize {
    (0..=rows.len())
        .find(|level| {
            !rows
                .iter()
                .filter(|row| row.level == *level)
                .any(|row| row.outer().is_some_and(|other| overlapping(other, outer)))
        })
        .unwrap_or(rows.len())
}

/// Assigns every intention inside `envelope` the lowest row where it does
/// not overlap another one. Plain selections go first, the global intention
/// gets a row above all of them, relations fill in last.
fn stack(model: &IntentionModel, envelope: &[usize]) -> Vec<Row> {
    let mut rows: Vec<Row> = Vec::new();

    let place = |rows: &mut Vec<Row>, kinds: &[SelectionKind]| {
        for intention in model.iter().filter(|i| kinds.contains(&i.key.kind())) {
            let Some(spans) = intention.key.spans(envelope) else {
                continue;
            };
            let Some(outer) = split::span(&spans) else {
                continue;
            };
            let level = lowest_free(rows, outer);
            rows.push(Row {
                key: intention.key,
                spans,
                level,
            });
        }
    };

    place(&mut rows, &[SelectionKind::SingleSegment]);
    place(&mut rows, &[SelectionKind::SegmentGroup]);

    if let Some(spans) = model
        .iter()
        .find(|i| i.key == IntentionKey::Global)
        .and_then(|i| i.key.spans(envelope))
    {
        let level = rows.iter().map(|row| row.level + 1).max().unwrap_or(0);
        rows.push(Row {
            key: IntentionKey::Global,
            spans,
            level,
        });
    }

    place(&mut rows, &[SelectionKind::SingleRelation]);
    place(&mut rows, &[SelectionKind::GroupRelation]);
    rows
}

/// Row `level` sits that many steps above the plot, wrapping below the top
/// edge once it would leave the canvas.
pub fn annotation_y(top: f32, level: usize) -> f32 {
    let y = top - level as f32 * ANNOTATION_STEP;
    if y >= 0.0 {
        y
    } else {
        (level + 1) as f32 * ANNOTATION_STEP
    }
}

fn draw_annotations(
    layer: &mut DrawLayer,
    layout: &Layout,
    series: &Series,
    interaction: &Interaction,
    palette: &ChartPalette,
) -> Vec<AnnotationHit> {
    let mut hits = Vec::new();

    for row in stack(interaction.intentions, interaction.envelope) {
        let y = annotation_y(layout.margin.top, row.level);
        let relation = row.key.kind().is_relation();
        let color = if relation {
            palette.relation_annotation
        } else {
            palette.annotation
        };
        let stroke = Stroke::solid(color, 2.0);

        let Some(xs) = row
            .spans
            .iter()
            .map(|(s, e)| Some((layout.x_at(series, *s)?, layout.x_at(series, *e)?)))
            .collect::<Option<Vec<_>>>()
        else {
            continue;
        };

        for (x0, x1) in &xs {
            layer.line(Point::new(*x0, y), Point::new(*x1, y), stroke);
            for x in [*x0, *x1] {
                layer.line(
                    Point::new(x, y - ANNOTATION_TICK),
                    Point::new(x, y + ANNOTATION_TICK),
                    stroke,
                );
            }
        }
        if let [(_, end1), (start2, _)] = xs.as_slice() {
            layer.line(
                Point::new(*start2, y),
                Point::new(*end1, y),
                Stroke::dashed(color, 1.0, [4.0, 4.0]),
            );
        }

        let left = xs.iter().map(|(x0, _)| *x0).fold(f32::INFINITY, f32::min);
        let right = xs.iter().map(|(_, x1)| *x1).fold(f32::NEG_INFINITY, f32::max);
        hits.push(AnnotationHit {
            key: row.key,
            spans: row.spans,
            level: row.level,
            bounds: Rectangle::new(
                Point::new(left, y - ANNOTATION_SLACK),
                Size::new(right - left, ANNOTATION_SLACK * 2.0),
            ),
        });
    }
    hits
}

fn draw_buttons(
    layer: &mut DrawLayer,
    layout: &Layout,
    series: &Series,
    interaction: &Interaction,
    palette: &ChartPalette,
) -> (Option<ButtonHit>, Option<ButtonHit>) {
    let Some(last) = interaction.envelope.last() else {
        return (None, None);
    };
    let Some(edge) = layout.x_at(series, *last) else {
        return (None, None);
    };

    let width = interaction.submit_width;
    let max_x = (layout.outer_width() - width.max(CANCEL_WIDTH)).max(0.0);
    let x = (edge + BUTTON_GAP).clamp(0.0, max_x);
    let y = layout.margin.top;
    let enabled = !interaction.requesting;
    let alpha = if enabled { 1.0 } else { REQUESTING_ALPHA };

    let submit = Rectangle::new(Point::new(x, y), Size::new(width, BUTTON_HEIGHT));
    layer.push(DrawCommand::Rect {
        bounds: submit,
        fill: palette.primary.scale_alpha(alpha),
        radius: BUTTON_RADIUS,
    });
    layer.text(
        interaction.submit_label.clone(),
        submit.center(),
        palette.on_primary,
        TEXT_SIZE,
        (Align::Center, Align::Center),
    );

    let cancel = Rectangle::new(
        Point::new(x, y + CANCEL_OFFSET),
        Size::new(CANCEL_WIDTH, BUTTON_HEIGHT),
    );
    layer.push(DrawCommand::Rect {
        bounds: cancel,
        fill: palette.danger.scale_alpha(alpha),
        radius: BUTTON_RADIUS,
    });
    layer.text(
        "Cancel",
        cancel.center(),
        palette.on_primary,
        TEXT_SIZE,
        (Align::Center, Align::Center),
    );

    (
        Some(ButtonHit {
            bounds: submit,
            enabled,
        }),
        Some(ButtonHit {
            bounds: cancel,
            enabled,
        }),
    )
}

/// Lines of the hover read-out for index `idx`.
fn readout(series: &Series, idx: usize, segments: &[Segment]) -> Option<Vec<String>> {
    let x = *series.x.get(idx)?;
    let y = *series.y.get(idx)?;
    let unit = series.unit;

    let mut lines = if unit.is_time() {
        vec![
            format!("Time: {}", format_x(x, unit)),
            format!("Value: {}", format_number(y)),
        ]
    } else {
        vec![
            format!("X: {}", format_number(x)),
            format!("Y: {}", format_number(y)),
        ]
    };

    let containing = segments.iter().find(|seg| {
        matches!(
            (series.x.get(seg.start_idx), series.x.get(seg.end_idx)),
            (Some(s), Some(e)) if *s <= x && x <= *e
        )
    });

    if let Some(seg) = containing {
        let per_unit = unit.seconds();
        if let Some(category) = seg.category {
            lines.push(format!("Category: {category}"));
        }
        lines.push(format!("Slope: {:.4}/{unit}", seg.slope * per_unit));
        lines.push(match seg.score {
            Some(score) => format!("Score: {score:.4}"),
            None => "Score: N/A".to_string(),
        });
        if let Some(relative) = seg.relative_slope {
            lines.push(format!("Relative Slope: {relative:.4}%"));
        }
        if let Some(duration) = seg.duration {
            lines.push(format!("Duration: {} {unit}", format_number(duration / per_unit)));
        }
    }

    Some(lines)
}

fn draw_hover(layer: &mut DrawLayer, layout: &Layout, series: &Series, hover: &Hover, palette: &ChartPalette) {
    let inner = layout.inner_bounds();
    if !inner.contains(hover.cursor) {
        return;
    }
    let Some(idx) = layout.nearest_index(series, hover.cursor.x) else {
        return;
    };
    let Some(point) = layout.point_at(series, idx) else {
        return;
    };
    let Some(lines) = readout(series, idx, hover.segments) else {
        return;
    };

    layer.line(
        Point::new(point.x, inner.y),
        Point::new(point.x, inner.y + inner.height),
        Stroke::solid(palette.line.scale_alpha(0.7), 1.5),
    );
    layer.push(DrawCommand::Circle {
        center: point,
        radius: 4.0,
        fill: palette.line,
    });

    let chars = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let width = chars as f32 * TOOLTIP_CHAR_PX + TOOLTIP_PADDING * 2.0;
    let height = lines.len() as f32 * TOOLTIP_LINE + TOOLTIP_PADDING;

    let outer_width = layout.outer_width();
    let x = if point.x + 12.0 + width <= outer_width {
        point.x + 12.0
    } else {
        (point.x - 12.0 - width).max(0.0)
    };
    let y = (hover.cursor.y - height / 2.0).clamp(0.0, (layout.outer_height() - height).max(0.0));

    layer.push(DrawCommand::Rect {
        bounds: Rectangle::new(Point::new(x, y), Size::new(width, height)),
        fill: palette.tooltip_background,
        radius: 4.0,
    });
    for (i, line) in lines.into_iter().enumerate() {
        layer.text(
            line,
            Point::new(x + TOOLTIP_PADDING, y + TOOLTIP_PADDING / 2.0 + i as f32 * TOOLTIP_LINE),
            palette.tooltip_text,
            TEXT_SIZE,
            (Align::Start, Align::Start),
        );
    }
}

fn popover_anchor(state: &PopoverState, regions: &[RegionHit], rows: &[AnnotationHit], top: f32) -> Option<Point> {
    match state.anchor {
        Anchor::Regions => {
            let picked: Vec<&Rectangle> = regions
                .iter()
                .filter(|hit| state.selection.contains(hit.range))
                .map(|hit| &hit.bounds)
                .collect();
            let left = picked.iter().map(|b| b.x).fold(f32::INFINITY, f32::min);
            let right = picked.iter().map(|b| b.x + b.width).fold(f32::NEG_INFINITY, f32::max);
            (!picked.is_empty()).then(|| Point::new((left + right) / 2.0, top))
        }
        Anchor::Annotation { .. } => rows
            .iter()
            .find(|hit| hit.key == state.key)
            .map(|hit| Point::new(hit.bounds.center_x(), hit.bounds.y)),
    }
}
