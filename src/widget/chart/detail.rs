use super::paint;

use data::chart::intention::IntentionKey;
use data::chart::render::{self, ButtonKind, ChartPalette, Hover, RenderInput, ResultsOverlay, Scene};
use data::chart::scale::{Margin, Viewport};
use data::chart::scroll;
use data::chart::selection::Button;
use data::chart::split::SplitRange;
use data::chart::{Series, SplitChart};

use iced::keyboard::{self, key};
use iced::widget::canvas::{self, Action};
use iced::{Event, Point, Rectangle, Renderer, Size, Theme, mouse, window};

/// Chart shown when the available height is unknown.
const FALLBACK_HEIGHT: f32 = 320.0;

#[derive(Debug, Clone)]
pub enum Message {
    PointerDown(SplitRange, Button),
    PointerMoved(SplitRange),
    PointerUp(Option<SplitRange>),
    Modifier(bool),
    Escape,
    OpenAnnotation(IntentionKey, usize),
    Submit,
    Cancel,
    Wheel { step: i64, position: f32 },
    AnchorMoved(Option<Point>),
}

#[derive(Debug, Default)]
pub struct State {
    hover: Option<Point>,
    region: Option<SplitRange>,
    anchor: Option<Point>,
}

/// The interactive chart: split regions, annotations and the submit
/// affordance of one [`SplitChart`].
pub struct DetailChart<'a> {
    chart: &'a SplitChart,
    series: &'a Series,
    palette: ChartPalette,
    range: Option<(usize, usize)>,
    results: Option<&'a ResultsOverlay>,
    ratio: Option<f32>,
    title: Option<&'a str>,
    active: bool,
}

impl<'a> DetailChart<'a> {
    pub fn new(chart: &'a SplitChart, series: &'a Series, palette: ChartPalette) -> Self {
        Self {
            chart,
            series,
            palette,
            range: None,
            results: None,
            ratio: None,
            title: None,
            active: true,
        }
    }

    pub fn with_range(mut self, range: Option<(usize, usize)>) -> Self {
        self.range = range;
        self
    }

    pub fn with_results(mut self, results: Option<&'a ResultsOverlay>) -> Self {
        self.results = results;
        self
    }

    pub fn with_ratio(mut self, ratio: Option<f32>) -> Self {
        self.ratio = ratio;
        self
    }

    pub fn with_title(mut self, title: Option<&'a str>) -> Self {
        self.title = title;
        self
    }

    /// Inactive charts draw the series but accept no selection.
    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    fn scene(&self, size: Size, hover: Option<Point>) -> Option<Scene> {
        let height = if size.height.is_finite() {
            size.height
        } else {
            FALLBACK_HEIGHT
        };
        let mut viewport = Viewport::new(size.width, height, Margin::DETAIL);
        viewport.ratio = self.ratio;

        let mut input = RenderInput::new(self.series, viewport, &self.palette);
        input.range = self.range;
        input.title = self.title;
        input.active = self.active;
        input.candidates = self.chart.candidates();
        input.accepted = self.chart.accepted();
        input.results = self.results;
        if self.active {
            input.interaction = Some(self.chart.interaction());
        }
        input.hover = hover.map(|cursor| Hover {
            cursor,
            segments: self.chart.segments(),
        });

        render::build(&input)
    }

    fn on_mouse(
        &self,
        state: &mut State,
        event: &mouse::Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> Option<Action<Message>> {
        let position = cursor.position_in(bounds);

        match event {
            mouse::Event::CursorMoved { .. } => {
                state.hover = position;
                let region = position
                    .and_then(|p| self.scene(bounds.size(), None)?.region_at(p));

                let moved = region.filter(|r| {
                    self.active && self.chart.is_dragging() && state.region != Some(*r)
                });
                state.region = region.or(state.region);

                Some(match moved {
                    Some(region) => Action::publish(Message::PointerMoved(region)),
                    None => Action::request_redraw(),
                })
            }
            mouse::Event::CursorLeft => {
                state.hover = None;
                Some(Action::request_redraw())
            }
            mouse::Event::ButtonPressed(button @ (mouse::Button::Left | mouse::Button::Right)) => {
                let point = position?;
                if !self.active {
                    return None;
                }
                let scene = self.scene(bounds.size(), None)?;

                if *button == mouse::Button::Left {
                    match scene.button_at(point) {
                        Some(ButtonKind::Submit) => {
                            return Some(Action::publish(Message::Submit).and_capture());
                        }
                        Some(ButtonKind::Cancel) => {
                            return Some(Action::publish(Message::Cancel).and_capture());
                        }
                        None => {}
                    }
                    if let Some(hit) = scene.annotation_at(point) {
                        let message = Message::OpenAnnotation(hit.key, hit.level);
                        return Some(Action::publish(message).and_capture());
                    }
                }

                let region = scene.region_at(point)?;
                state.region = Some(region);
                let button = match button {
                    mouse::Button::Right => Button::Secondary,
                    _ => Button::Primary,
                };
                Some(Action::publish(Message::PointerDown(region, button)).and_capture())
            }
            mouse::Event::ButtonReleased(mouse::Button::Left) if self.chart.is_dragging() => {
                let region = position.and_then(|p| self.scene(bounds.size(), None)?.region_at(p));
                Some(Action::publish(Message::PointerUp(region)))
            }
            mouse::Event::WheelScrolled { delta } => {
                let point = position?;
                let y = match delta {
                    mouse::ScrollDelta::Lines { y, .. } | mouse::ScrollDelta::Pixels { y, .. } => *y,
                };
                if y == 0.0 {
                    return None;
                }

                let notch = scroll::wheel_step(self.range, self.series.len());
                let step = if y > 0.0 { -notch } else { notch };
                let position = scroll::wheel_position(point.x, bounds.width, Margin::DETAIL);

                Some(Action::publish(Message::Wheel { step, position }).and_capture())
            }
            _ => None,
        }
    }
}

impl canvas::Program<Message> for DetailChart<'_> {
    type State = State;

    fn update(
        &self,
        state: &mut Self::State,
        event: &Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> Option<Action<Message>> {
        match event {
            Event::Mouse(mouse_event) => self.on_mouse(state, mouse_event, bounds, cursor),
            Event::Keyboard(keyboard::Event::ModifiersChanged(modifiers)) if self.active => {
                let pressed = modifiers.shift() || modifiers.control();
                Some(Action::publish(Message::Modifier(pressed)))
            }
            Event::Keyboard(keyboard::Event::KeyPressed {
                key: keyboard::Key::Named(key::Named::Escape),
                ..
            }) => Some(Action::publish(Message::Escape)),
            Event::Window(window::Event::RedrawRequested(_)) => {
                let anchor = self
                    .scene(bounds.size(), None)
                    .and_then(|scene| scene.popover_anchor);

                if anchor == state.anchor {
                    return None;
                }
                state.anchor = anchor;
                Some(Action::publish(Message::AnchorMoved(anchor)))
            }
            _ => None,
        }
    }

    fn draw(
        &self,
        state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<canvas::Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());

        if let Some(scene) = self.scene(bounds.size(), state.hover) {
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
        let Some(point) = cursor.position_in(bounds) else {
            return mouse::Interaction::default();
        };
        if !self.active {
            return mouse::Interaction::default();
        }
        if self.chart.is_dragging() {
            return mouse::Interaction::Crosshair;
        }

        match self.scene(bounds.size(), state.hover) {
            Some(scene) if scene.button_at(point).is_some() => mouse::Interaction::Pointer,
            Some(scene) if scene.annotation_at(point).is_some() => mouse::Interaction::Pointer,
            Some(scene) if scene.region_at(point).is_some() => mouse::Interaction::Crosshair,
            _ => mouse::Interaction::default(),
        }
    }
}
