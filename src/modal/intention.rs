use crate::style;

use data::chart::popover::{ChoiceRow, PopoverState};
use data::chart::selection::SelectionKind;

use iced::widget::{button, checkbox, column, container, row, space, text};
use iced::{Alignment, Element, padding};

pub const POPOVER_WIDTH: f32 = 220.0;

#[derive(Debug, Clone)]
pub enum Message {
    Toggle(&'static str),
    Confirm,
    Delete,
    Close,
}

fn title(kind: SelectionKind) -> &'static str {
    match kind {
        SelectionKind::SingleSegment => "Segment",
        SelectionKind::SegmentGroup => "Segment group",
        SelectionKind::SingleRelation => "Segment relation",
        SelectionKind::GroupRelation => "Group relation",
        SelectionKind::Global => "Whole selection",
    }
}

/// Attribute checklist for the selection under the popover.
pub fn view<'a>(state: &PopoverState, rows: Vec<ChoiceRow>) -> Element<'a, Message> {
    let header = row![
        text(title(state.selection.kind)).size(style::TITLE_SIZE),
        space::horizontal(),
        button(text("x").size(style::LABEL_SIZE))
            .on_press(Message::Close)
            .style(|theme, status| style::button::transparent(theme, status, false))
            .padding(padding::left(6).right(6).top(2).bottom(2)),
    ]
    .align_y(Alignment::Center);

    let choices = rows.into_iter().fold(column![].spacing(6), |column, choice| {
        let key = choice.key;
        let mut entry = column![
            checkbox(choice.checked)
                .label(choice.label)
                .on_toggle(move |_| Message::Toggle(key)),
        ]
        .spacing(2);

        if let Some(hint) = choice.hint {
            entry = entry.push(
                container(text(hint).size(style::LABEL_SIZE)).padding(padding::left(26)),
            );
        }
        column.push(entry)
    });

    let can_confirm = !state.choices.is_empty();
    let mut actions = row![space::horizontal()].spacing(6);
    if state.existing {
        actions = actions.push(
            button(text("Delete").size(style::LABEL_SIZE))
                .on_press(Message::Delete)
                .style(button::danger),
        );
    }
    actions = actions.push(
        button(text("Confirm").size(style::LABEL_SIZE))
            .on_press_maybe(can_confirm.then_some(Message::Confirm))
            .style(button::primary),
    );

    container(column![header, choices, actions].spacing(10))
        .width(POPOVER_WIDTH)
        .padding(10)
        .style(style::popover)
        .into()
}
