use iced::widget::container::{self, Style};
use iced::{Border, Color, Shadow, Theme, Vector};

pub const TITLE_SIZE: f32 = 16.0;
pub const LABEL_SIZE: f32 = 12.0;

pub fn modal_container(theme: &Theme) -> Style {
    let palette = theme.extended_palette();

    Style {
        text_color: Some(palette.background.base.text),
        background: Some(palette.background.base.color.into()),
        border: Border {
            width: 1.0,
            color: palette.background.strong.color,
            radius: 4.0.into(),
        },
        shadow: Shadow {
            offset: Vector { x: 0.0, y: 0.0 },
            color: Color::BLACK.scale_alpha(if palette.is_dark { 0.8 } else { 0.3 }),
            blur_radius: 12.0,
        },
        ..Default::default()
    }
}

/// Popover drawn over the detail chart.
pub fn popover(theme: &Theme) -> Style {
    let palette = theme.extended_palette();

    Style {
        border: Border {
            width: 1.0,
            color: palette.primary.weak.color,
            radius: 4.0.into(),
        },
        ..modal_container(theme)
    }
}

pub fn panel(theme: &Theme) -> Style {
    let palette = theme.extended_palette();

    Style {
        background: Some(palette.background.weak.color.scale_alpha(0.4).into()),
        border: Border {
            width: 1.0,
            color: palette.background.strong.color.scale_alpha(0.5),
            radius: 4.0.into(),
        },
        ..Default::default()
    }
}

/// Result card, highlighted while its fragment is focused.
pub fn result_card(theme: &Theme, is_focused: bool) -> Style {
    let palette = theme.extended_palette();

    Style {
        background: Some(palette.background.base.color.into()),
        border: Border {
            width: if is_focused { 2.0 } else { 1.0 },
            color: if is_focused {
                palette.primary.base.color
            } else {
                palette.background.strong.color.scale_alpha(0.6)
            },
            radius: 3.0.into(),
        },
        ..Default::default()
    }
}

pub fn chart_frame(theme: &Theme) -> Style {
    let palette = theme.extended_palette();

    Style {
        background: Some(palette.background.base.color.into()),
        border: Border {
            width: 1.0,
            color: palette.background.strong.color.scale_alpha(0.4),
            radius: 2.0.into(),
        },
        ..container::Style::default()
    }
}

pub mod button {
    use iced::widget::button::{Status, Style};
    use iced::{Background, Border, Color, Theme};

    pub fn transparent(theme: &Theme, status: Status, is_active: bool) -> Style {
        let palette = theme.extended_palette();

        Style {
            text_color: palette.background.base.text,
            border: Border {
                radius: 3.0.into(),
                ..Default::default()
            },
            background: match status {
                Status::Active if is_active => Some(palette.background.strong.color.into()),
                Status::Active | Status::Disabled => None,
                Status::Hovered => Some(palette.background.weak.color.into()),
                Status::Pressed => Some(palette.background.strong.color.into()),
            },
            ..Default::default()
        }
    }

    /// Text source span inside the query text.
    pub fn source(theme: &Theme, status: Status, color: Color, disabled: bool) -> Style {
        let palette = theme.extended_palette();
        let alpha = match status {
            Status::Hovered | Status::Pressed => 1.0,
            _ => 0.8,
        };

        Style {
            text_color: if disabled {
                palette.background.strong.text.scale_alpha(0.6)
            } else {
                palette.background.base.text
            },
            background: Some(Background::Color(color.scale_alpha(alpha))),
            border: Border {
                radius: 2.0.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Sort toggle in the results header.
    pub fn sort_key(theme: &Theme, status: Status, is_sorted: bool) -> Style {
        let palette = theme.extended_palette();

        let base = transparent(theme, status, false);
        if is_sorted {
            Style {
                text_color: palette.primary.base.color,
                border: Border {
                    width: 1.0,
                    color: palette.primary.weak.color,
                    radius: 3.0.into(),
                },
                ..base
            }
        } else {
            base
        }
    }
}
