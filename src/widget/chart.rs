pub mod detail;
pub mod glyph;
pub mod overview;

use data::chart::Series;
use data::chart::render::{
    self, Align, ChartPalette, DrawCommand, DrawLayer, RenderInput, ResultsOverlay, Scene, Stroke,
};
use data::chart::scale::{Margin, Viewport};

use iced::widget::canvas::{self, LineDash, Path};
use iced::{Alignment, Point, Rectangle, Renderer, Size, Theme, Vector, mouse};

pub const THUMBNAIL_HEIGHT: f32 = 42.0;

/// Paints every layer of a scene, honoring each layer's clip.
pub fn paint(frame: &mut canvas::Frame, scene: &Scene) {
    for layer in &scene.layers {
        paint_layer(frame, layer);
    }
}

fn paint_layer(frame: &mut canvas::Frame, layer: &DrawLayer) {
    match layer.clip {
        Some(clip) => frame.with_clip(clip, |frame| {
            frame.translate(Vector::new(-clip.x, -clip.y));
            layer.commands.iter().for_each(|command| paint_command(frame, command));
        }),
        None => layer
            .commands
            .iter()
            .for_each(|command| paint_command(frame, command)),
    }
}

fn paint_command(frame: &mut canvas::Frame, command: &DrawCommand) {
    match command {
        DrawCommand::Line { from, to, stroke } => {
            stroke_path(frame, &Path::line(*from, *to), stroke);
        }
        DrawCommand::Path { points, stroke } => {
            if let Some(path) = polyline(points, None) {
                stroke_path(frame, &path, stroke);
            }
        }
        DrawCommand::Area {
            points,
            baseline,
            fill,
        } => {
            if let Some(path) = polyline(points, Some(*baseline)) {
                frame.fill(&path, *fill);
            }
        }
        DrawCommand::Rect {
            bounds,
            fill,
            radius,
        } => {
            if *radius > 0.0 {
                let path = Path::rounded_rectangle(bounds.position(), bounds.size(), (*radius).into());
                frame.fill(&path, *fill);
            } else {
                frame.fill_rectangle(bounds.position(), bounds.size(), *fill);
            }
        }
        DrawCommand::Text {
            content,
            position,
            color,
            size,
            align_x,
            align_y,
        } => {
            frame.fill_text(canvas::Text {
                content: content.clone(),
                position: *position,
                color: *color,
                size: (*size).into(),
                align_x: alignment(*align_x).into(),
                align_y: alignment(*align_y).into(),
                ..Default::default()
            });
        }
        DrawCommand::Circle {
            center,
            radius,
            fill,
        } => {
            frame.fill(&Path::circle(*center, *radius), *fill);
        }
    }
}

fn stroke_path(frame: &mut canvas::Frame, path: &Path, stroke: &Stroke) {
    let mut canvas_stroke = canvas::Stroke::default()
        .with_color(stroke.color)
        .with_width(stroke.width);

    if let Some(dash) = stroke.dash.as_ref() {
        canvas_stroke.line_dash = LineDash {
            segments: dash,
            offset: 0,
        };
    }

    frame.stroke(path, canvas_stroke);
}

/// Open polyline, or a shape closed down to `baseline`.
fn polyline(points: &[Point], baseline: Option<f32>) -> Option<Path> {
    let (first, last) = (points.first()?, points.last()?);

    Some(Path::new(|builder| {
        match baseline {
            Some(y) => {
                builder.move_to(Point::new(first.x, y));
                builder.line_to(*first);
            }
            None => builder.move_to(*first),
        }
        points.iter().skip(1).for_each(|p| builder.line_to(*p));
        if let Some(y) = baseline {
            builder.line_to(Point::new(last.x, y));
            builder.close();
        }
    }))
}

fn alignment(align: Align) -> Alignment {
    match align {
        Align::Start => Alignment::Start,
        Align::Center => Alignment::Center,
        Align::End => Alignment::End,
    }
}

/// Small, non-interactive chart of one result fragment.
pub struct Thumbnail<'a> {
    series: &'a Series,
    window: Option<(usize, usize)>,
    overlay: ResultsOverlay,
    palette: ChartPalette,
}

impl<'a> Thumbnail<'a> {
    pub fn new(series: &'a Series, window: Option<(usize, usize)>, overlay: ResultsOverlay) -> Self {
        Self {
            series,
            window,
            overlay,
            palette: ChartPalette::thumbnail(),
        }
    }
}

impl<Message> canvas::Program<Message> for Thumbnail<'_> {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<canvas::Geometry> {
        let mut viewport = Viewport::new(bounds.width, THUMBNAIL_HEIGHT, Margin::THUMBNAIL);
        viewport.expand = false;

        let mut input = RenderInput::new(self.series, viewport, &self.palette);
        input.range = self.window;
        input.axes = false;
        input.results = Some(&self.overlay);

        let mut frame = canvas::Frame::new(renderer, Size::new(bounds.width, bounds.height));
        if let Some(scene) = render::build(&input) {
            paint(&mut frame, &scene);
        }
        vec![frame.into_geometry()]
    }
}
