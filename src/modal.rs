pub mod intention;

use iced::widget::{container, opaque, stack};
use iced::{Element, Length, Point, padding};

/// Layers `content` over `base` with its top-left corner at `anchor`,
/// leaving the rest of `base` interactive.
pub fn anchored<'a, Message>(
    base: impl Into<Element<'a, Message>>,
    content: impl Into<Element<'a, Message>>,
    anchor: Point,
) -> Element<'a, Message>
where
    Message: Clone + 'a,
{
    stack![
        base.into(),
        container(opaque(content))
            .width(Length::Fill)
            .height(Length::Fill)
            .padding(padding::top(anchor.y.max(0.0)).left(anchor.x.max(0.0))),
    ]
    .into()
}
