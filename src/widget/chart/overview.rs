use super::paint;

use data::chart::Series;
use data::chart::render::{self, ChartPalette, RenderInput, Scene};
use data::chart::scale::{Margin, Viewport};
use data::chart::scroll;

use iced::widget::canvas::{self, Action};
use iced::{Event, Rectangle, Renderer, Size, Theme, mouse};

/// Drags shorter than this clear the brush instead.
const MIN_BRUSH_PX: f32 = 2.0;

#[derive(Debug, Clone, Copy)]
pub enum Message {
    Brushing((usize, usize)),
    Brushed(Option<(usize, usize)>),
}

#[derive(Debug, Default)]
pub struct State {
    anchor_x: Option<f32>,
}

/// Whole series with a draggable brush selecting the detail window.
pub struct Overview<'a> {
    series: &'a Series,
    brush: Option<(usize, usize)>,
    palette: ChartPalette,
}

impl<'a> Overview<'a> {
    pub fn new(series: &'a Series, brush: Option<(usize, usize)>, palette: ChartPalette) -> Self {
        Self {
            series,
            brush,
            palette,
        }
    }

    fn scene(&self, size: Size) -> Option<Scene> {
        let viewport = Viewport::new(size.width, size.height, Margin::OVERVIEW);

        let mut input = RenderInput::new(self.series, viewport, &self.palette);
        input.fill = true;
        input.brush = self.brush;
        render::build(&input)
    }

    fn brushed(&self, bounds: Rectangle, from: f32, to: f32) -> Option<(usize, usize)> {
        let scene = self.scene(bounds.size())?;
        scroll::brush_to_indices(&scene.layout, self.series, from, to)
    }
}

impl canvas::Program<Message> for Overview<'_> {
    type State = State;

    fn update(
        &self,
        state: &mut Self::State,
        event: &Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> Option<Action<Message>> {
        let Event::Mouse(event) = event else {
            return None;
        };
        // Dragging may leave the canvas, so positions are kept unclamped.
        let x = cursor.position().map(|p| p.x - bounds.x);

        match event {
            mouse::Event::ButtonPressed(mouse::Button::Left) => {
                cursor.position_in(bounds)?;
                state.anchor_x = x;
                Some(Action::capture())
            }
            mouse::Event::CursorMoved { .. } => {
                let (anchor, x) = (state.anchor_x?, x?);
                let range = self.brushed(bounds, anchor, x)?;
                Some(Action::publish(Message::Brushing(range)))
            }
            mouse::Event::ButtonReleased(mouse::Button::Left) => {
                let anchor = state.anchor_x.take()?;
                let range = match x {
                    Some(x) if (x - anchor).abs() >= MIN_BRUSH_PX => self.brushed(bounds, anchor, x),
                    _ => None,
                };
                Some(Action::publish(Message::Brushed(range)))
            }
            _ => None,
        }
    }

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<canvas::Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());

        if let Some(scene) = self.scene(bounds.size()) {
            paint(&mut frame, &scene);
        }
        vec![frame.into_geometry()]
    }

    fn mouse_interaction(
        &self,
        state: &Self::State,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> mouse::Interaction {
        if state.anchor_x.is_some() || cursor.is_over(bounds) {
            mouse::Interaction::Crosshair
        } else {
            mouse::Interaction::default()
        }
    }
}
