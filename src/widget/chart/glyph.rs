use super::paint_layer;

use data::chart::intention::IntentionModel;
use data::query::ColorMap;
use data::query::glyph::{Glyph, GlyphInput, Pick};

use iced::widget::canvas::{self, Action};
use iced::{Event, Rectangle, Renderer, Size, Theme, mouse};
use service::QuerySpecWithSource;

pub const GLYPH_WIDTH: f32 = 280.0;
pub const GLYPH_HEIGHT: f32 = 96.0;

/// Parsed query drawn as trend strokes and relation lanes. Clicking a
/// trend or relation publishes it.
pub struct QueryGlyph<'a> {
    query: &'a QuerySpecWithSource,
    colors: &'a ColorMap,
    intentions: &'a IntentionModel,
    selected: Option<Pick>,
}

impl<'a> QueryGlyph<'a> {
    pub fn new(
        query: &'a QuerySpecWithSource,
        colors: &'a ColorMap,
        intentions: &'a IntentionModel,
        selected: Option<Pick>,
    ) -> Self {
        Self {
            query,
            colors,
            intentions,
            selected,
        }
    }

    fn glyph(&self, size: Size) -> Option<Glyph> {
        let input = GlyphInput {
            query: self.query,
            colors: self.colors,
            intentions: self.intentions,
            selected: self.selected,
        };
        Glyph::build(&input, size)
    }

    fn pick(&self, bounds: Rectangle, cursor: mouse::Cursor) -> Option<Pick> {
        let position = cursor.position_in(bounds)?;
        self.glyph(bounds.size())?.pick_at(position)
    }
}

impl canvas::Program<Pick> for QueryGlyph<'_> {
    type State = ();

    fn update(
        &self,
        _state: &mut Self::State,
        event: &Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> Option<Action<Pick>> {
        match event {
            Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
                let pick = self.pick(bounds, cursor)?;
                Some(Action::publish(pick).and_capture())
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

        if let Some(glyph) = self.glyph(bounds.size()) {
            paint_layer(&mut frame, &glyph.layer);
        }
        vec![frame.into_geometry()]
    }

    fn mouse_interaction(
        &self,
        _state: &Self::State,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> mouse::Interaction {
        if self.pick(bounds, cursor).is_some() {
            mouse::Interaction::Pointer
        } else {
            mouse::Interaction::default()
        }
    }
}
