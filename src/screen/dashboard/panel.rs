use super::Message;
use crate::style;
use crate::widget::chart::{THUMBNAIL_HEIGHT, Thumbnail};
use crate::widget::range_slider;

use data::chart::Series;
use data::chart::render::ResultsOverlay;
use data::dataset::DatasetState;
use data::query::{Piece, QueryState, pieces};
use data::results::{Attribute, Fragment, Order, ResultsView};

use iced::widget::{
    button, canvas, center, column, container, pick_list, row, scrollable, space, text, text_input,
};
use iced::{Color, Element, Length, padding};
use rustc_hash::FxHashMap;
use service::Segment;

/// Relative scroll offset past which the next page is listed.
pub const LOAD_MORE_AT: f32 = 0.95;

#[derive(Debug, Clone)]
pub enum ResultsMessage {
    ToggleSort(Attribute),
    Filter(Attribute, Option<(f64, f64)>),
    AddFilter(Attribute),
    Scrolled(f32),
    Focus(usize),
}

/// Query input, its highlighted text sources and the query actions.
pub fn query_bar(query: &QueryState, busy: bool) -> Element<'_, Message> {
    let input = text_input("Describe the trend you are looking for...", &query.text)
        .on_input(Message::QueryEdited)
        .on_submit(Message::RunQuery)
        .padding(6)
        .width(Length::Fill);

    let actions = row![
        button(text("Parse")).on_press_maybe((!busy).then_some(Message::ParseQuery)),
        button(text("Run"))
            .style(button::primary)
            .on_press_maybe((!busy).then_some(Message::RunQuery)),
    ]
    .spacing(4);

    let highlights = query.highlights();
    let sources: Element<'_, Message> = if highlights.is_empty() {
        column![].into()
    } else {
        let spans = pieces(&query.text, &highlights)
            .into_iter()
            .map(|piece| match piece {
                Piece::Plain(plain) => text(plain.to_string()).size(style::LABEL_SIZE).into(),
                Piece::Source(inner, highlight) => {
                    let (color, disabled) = (highlight.color, highlight.disabled);
                    button(text(inner.to_string()).size(style::LABEL_SIZE))
                        .padding([0, 2])
                        .style(move |theme, status| {
                            style::button::source(theme, status, color, disabled)
                        })
                        .on_press(Message::ToggleSource(highlight.source_id))
                        .into()
                }
            });

        row(spans).align_y(iced::Center).wrap().into()
    };

    column![row![input, actions].spacing(6).align_y(iced::Center), sources]
        .spacing(4)
        .into()
}

/// Dataset path, series and approximation level.
pub fn controls<'a>(path: &'a str, dataset: &'a DatasetState, loading: bool) -> Element<'a, Message> {
    let load = button(text(if loading { "Loading..." } else { "Load" }))
        .on_press_maybe((!loading).then_some(Message::LoadDataset));

    let path_input = text_input("Path to a CSV file", path)
        .on_input(Message::PathChanged)
        .on_submit(Message::LoadDataset)
        .padding(4)
        .width(Length::FillPortion(2));

    let sources: Vec<String> = dataset.sources().into_iter().map(str::to_string).collect();
    let source = pick_list(
        sources,
        dataset.source().map(str::to_string),
        Message::SourceSelected,
    )
    .placeholder("Series")
    .text_size(style::LABEL_SIZE);

    let (level, max_level) = (dataset.level(), dataset.max_level());
    let levels = row![
        text("Level").size(style::LABEL_SIZE),
        button(text("-"))
            .style(|theme, status| style::button::transparent(theme, status, false))
            .on_press_maybe((level > 0).then(|| Message::LevelChanged(level - 1))),
        text(format!("{level} / {max_level}")).size(style::LABEL_SIZE),
        button(text("+"))
            .style(|theme, status| style::button::transparent(theme, status, false))
            .on_press_maybe((level < max_level).then(|| Message::LevelChanged(level + 1))),
    ]
    .spacing(4)
    .align_y(iced::Center);

    row![
        path_input,
        load,
        space::horizontal().width(12),
        source,
        levels,
        space::horizontal(),
        button(text("Data folder").size(style::LABEL_SIZE))
            .style(|theme, status| style::button::transparent(theme, status, false))
            .on_press(Message::OpenDataFolder),
    ]
    .spacing(6)
    .align_y(iced::Center)
    .into()
}

/// Ranked, filterable list of result fragments.
pub fn results<'a>(
    view: &'a ResultsView,
    series: &'a FxHashMap<String, Series>,
    colors: Vec<Option<Color>>,
    focused: Option<usize>,
) -> Element<'a, Message> {
    if view.is_empty() {
        return center(text("No results").size(style::LABEL_SIZE)).into();
    }

    let matching = view.matching().len();
    let header = text(format!("{matching} matching fragments")).size(style::TITLE_SIZE);

    let sort_keys = row(view.columns().into_iter().map(|attribute| {
        let order = view.sort_order(attribute);
        let label = match order {
            Some(Order::Ascending) => format!("{attribute} ↑"),
            Some(Order::Descending) => format!("{attribute} ↓"),
            None => attribute.to_string(),
        };
        button(text(label).size(style::LABEL_SIZE))
            .padding([1, 4])
            .style(move |theme, status| style::button::sort_key(theme, status, order.is_some()))
            .on_press(ResultsMessage::ToggleSort(attribute))
            .into()
    }))
    .spacing(2)
    .wrap();

    let unfiltered: Vec<Attribute> = view
        .attributes()
        .into_iter()
        .filter(|a| view.filter(*a).is_none() && view.extent(*a).is_some())
        .collect();
    let add_filter = pick_list(unfiltered, None::<Attribute>, ResultsMessage::AddFilter)
        .placeholder("Add filter")
        .text_size(style::LABEL_SIZE);

    let filters = column(view.attributes().into_iter().filter_map(|attribute| {
        let bounds = view.filter(attribute)?;
        let extent = view.extent(attribute)?;
        let unit = view.unit();

        let slider = range_slider(
            attribute.to_string(),
            extent,
            bounds,
            move |bounds| ResultsMessage::Filter(attribute, Some(bounds)),
            move |value| attribute.format(value, unit),
        );
        let remove = button(text("x").size(style::LABEL_SIZE))
            .style(|theme, status| style::button::transparent(theme, status, false))
            .on_press(ResultsMessage::Filter(attribute, None));

        Some(row![slider, remove].spacing(4).into())
    }))
    .spacing(4);

    let cards = column(
        view.visible()
            .into_iter()
            .map(|fragment| card(view, fragment, series, &colors, focused == Some(fragment.index))),
    )
    .spacing(6);

    let list = scrollable(cards.padding(padding::right(10)))
        .on_scroll(|viewport| ResultsMessage::Scrolled(viewport.relative_offset().y))
        .height(Length::Fill);

    let content: Element<'a, ResultsMessage> = column![header, sort_keys, add_filter, filters, list]
        .spacing(6)
        .into();
    content.map(Message::Results)
}

fn card<'a>(
    view: &ResultsView,
    fragment: &'a Fragment,
    series: &'a FxHashMap<String, Series>,
    colors: &[Option<Color>],
    is_focused: bool,
) -> Element<'a, ResultsMessage> {
    let title = row![
        text(fragment.source.as_str()).size(style::LABEL_SIZE),
        space::horizontal(),
        text(format!("level {}", fragment.level)).size(style::LABEL_SIZE),
    ];

    let thumbnail: Element<'a, ResultsMessage> = match series.get(&fragment.source) {
        Some(series) => {
            let overlay = ResultsOverlay {
                fragments: vec![fragment.segments.iter().map(Segment::range).collect()],
                colors: colors.to_vec(),
            };
            canvas(Thumbnail::new(series, thumbnail_window(fragment, series.len()), overlay))
                .width(Length::Fill)
                .height(THUMBNAIL_HEIGHT)
                .into()
        }
        None => space::vertical().height(THUMBNAIL_HEIGHT).into(),
    };

    let unit = view.unit();
    let values = row(view.columns().into_iter().filter_map(|attribute| {
        let value = attribute.value(fragment, unit)?;
        Some(
            text(format!("{attribute}: {}", attribute.format(value, unit)))
                .size(style::LABEL_SIZE - 1.0)
                .into(),
        )
    }))
    .spacing(8)
    .wrap();

    button(
        container(column![title, thumbnail, values].spacing(3))
            .padding(4)
            .width(Length::Fill)
            .style(move |theme| style::result_card(theme, is_focused)),
    )
    .padding(0)
    .style(|theme, status| style::button::transparent(theme, status, false))
    .on_press(ResultsMessage::Focus(fragment.index))
    .into()
}

/// The fragment with half its length of context on either side.
fn thumbnail_window(fragment: &Fragment, len: usize) -> Option<(usize, usize)> {
    let (start, end) = fragment.span()?;
    let pad = end.saturating_sub(start).div_ceil(2).max(1);
    let last = len.checked_sub(1)?;
    Some((start.saturating_sub(pad), (end + pad).min(last)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(start: usize, end: usize) -> Fragment {
        Fragment {
            index: 0,
            source: "price".to_string(),
            level: 0,
            segments: vec![Segment {
                start_idx: start,
                end_idx: end,
                ..Segment::default()
            }],
        }
    }

    #[test]
    fn thumbnail_window_pads_and_clamps() {
        assert_eq!(thumbnail_window(&fragment(10, 20), 100), Some((5, 25)));
        assert_eq!(thumbnail_window(&fragment(0, 4), 6), Some((0, 5)));
        assert_eq!(thumbnail_window(&fragment(3, 3), 10), Some((2, 4)));
        assert_eq!(thumbnail_window(&fragment(0, 4), 0), None);
    }
}
