pub mod chart;
pub mod toast;

use iced::widget::{column, row, slider, space, text};
use iced::{Element, Length};

use crate::style;

/// Two sliders bounding a `[min, max]` filter over `extent`.
pub fn range_slider<'a, Message: Clone + 'a>(
    label: String,
    extent: (f64, f64),
    value: (f64, f64),
    on_change: impl Fn((f64, f64)) -> Message + Clone + 'a,
    format: impl Fn(f64) -> String,
) -> Element<'a, Message> {
    let (lo, hi) = (extent.0.min(extent.1), extent.0.max(extent.1));
    let step = ((hi - lo) / 100.0).max(0.01);
    let (min, max) = (value.0.clamp(lo, hi), value.1.clamp(lo, hi));

    let on_min = on_change.clone();
    let min_slider = slider(lo..=hi, min, move |v| on_min((v.min(max), max))).step(step);
    let max_slider = slider(lo..=hi, max, move |v| on_change((min, v.max(min)))).step(step);

    column![
        row![
            text(label).size(style::LABEL_SIZE),
            space::horizontal(),
            text(format!("{} - {}", format(min), format(max))).size(style::LABEL_SIZE),
        ],
        min_slider,
        max_slider,
    ]
    .spacing(2)
    .width(Length::Fill)
    .into()
}
