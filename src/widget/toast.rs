use iced::time::{Duration, Instant};
use iced::widget::{button, column, container, row, space, stack, text};
use iced::{Border, Center, Element, Fill, Theme, padding, theme};

use crate::screen::AppError;
use crate::style;

pub const MAX_TOAST_BODY_HEIGHT: f32 = 120.0;
pub const TOAST_WIDTH: f32 = 240.0;
/// Older toasts are dropped past this many.
const MAX_TOASTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Primary,
    Danger,
    Warning,
}

impl Status {
    pub fn style(&self, theme: &Theme) -> container::Style {
        let palette = theme.extended_palette();

        match self {
            Status::Primary => styled(palette.primary.weak),
            Status::Danger => styled(palette.danger.weak),
            Status::Warning => styled(palette.warning.weak),
        }
    }

    /// Errors stay up twice as long as notices.
    fn lifetime(self, timeout: Duration) -> Duration {
        match self {
            Status::Danger => timeout * 2,
            Status::Primary | Status::Warning => timeout,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Toast {
    title: String,
    body: String,
    status: Status,
}

impl Toast {
    pub fn error(body: impl Into<String>) -> Self {
        Self {
            title: "Error".to_string(),
            body: body.into(),
            status: Status::Danger,
        }
    }

    pub fn warn(body: impl Into<String>) -> Self {
        Self {
            title: "Warning".to_string(),
            body: body.into(),
            status: Status::Warning,
        }
    }

    pub fn info(body: impl Into<String>) -> Self {
        Self {
            title: "Info".to_string(),
            body: body.into(),
            status: Status::Primary,
        }
    }

    /// Intentions dropped because the selected splits moved.
    pub fn invalidated(dropped: usize) -> Self {
        let noun = if dropped == 1 { "intention" } else { "intentions" };
        Self::warn(format!(
            "{dropped} {noun} no longer matched the selected splits and were removed"
        ))
    }
}

impl From<AppError> for Toast {
    fn from(err: AppError) -> Self {
        let title = match &err {
            AppError::Fetch(_) => "Network error",
            AppError::Dataset(_) => "Dataset error",
            AppError::Query(_) => "Query error",
            AppError::Refine(_) => "Refinement error",
        };
        Self {
            title: title.to_string(),
            ..Self::error(err.to_string())
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    toast: Toast,
    /// How many times the same toast was raised while shown.
    count: usize,
    shown_at: Instant,
}

/// Toasts on screen, newest last.
#[derive(Debug, Clone)]
pub struct Toasts {
    entries: Vec<Entry>,
    timeout: Duration,
}

impl Toasts {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            entries: Vec::new(),
            timeout: Duration::from_secs(timeout_secs.max(1)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Shows `toast`. A toast already on screen is counted again and its
    /// timer restarts, so a failing request retried in a loop stays one
    /// toast.
    pub fn push(&mut self, toast: Toast, now: Instant) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.toast == toast) {
            entry.count += 1;
            entry.shown_at = now;
            return;
        }

        self.entries.push(Entry {
            toast,
            count: 1,
            shown_at: now,
        });
        if self.entries.len() > MAX_TOASTS {
            self.entries.remove(0);
        }
    }

    pub fn dismiss(&mut self, index: usize) {
        if index < self.entries.len() {
            self.entries.remove(index);
        }
    }

    /// Drops toasts shown for longer than their lifetime.
    pub fn expire(&mut self, now: Instant) {
        let timeout = self.timeout;
        self.entries.retain(|entry| {
            now.saturating_duration_since(entry.shown_at) < entry.toast.status.lifetime(timeout)
        });
    }

    /// `content` with the toasts stacked in its bottom-right corner.
    pub fn view<'a, Message: Clone + 'a>(
        &'a self,
        content: impl Into<Element<'a, Message>>,
        on_close: impl Fn(usize) -> Message,
    ) -> Element<'a, Message> {
        if self.entries.is_empty() {
            return content.into();
        }

        let cards = self
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| card(entry, on_close(index)));

        stack![
            content.into(),
            container(column(cards).spacing(10).width(TOAST_WIDTH))
                .align_right(Fill)
                .align_bottom(Fill)
                .padding(padding::right(12).bottom(32)),
        ]
        .into()
    }
}

fn card<'a, Message: Clone + 'a>(entry: &'a Entry, on_close: Message) -> Element<'a, Message> {
    let toast = &entry.toast;
    let title = if entry.count > 1 {
        text(format!("{} (x{})", toast.title, entry.count))
    } else {
        text(toast.title.as_str())
    };
    let status = toast.status;

    let header = container(
        row![
            title,
            space::horizontal(),
            button("x")
                .on_press(on_close)
                .style(|theme, status| style::button::transparent(theme, status, false))
                .padding(padding::right(6).left(6).top(2).bottom(2)),
        ]
        .align_y(Center),
    )
    .style(move |theme| status.style(theme))
    .width(Fill)
    .padding(4);

    let body = container(
        text(toast.body.as_str())
            .wrapping(text::Wrapping::Word)
            .width(Fill),
    )
    .width(Fill)
    .max_height(MAX_TOAST_BODY_HEIGHT)
    .clip(true)
    .padding(4);

    container(column![header, body])
        .style(style::modal_container)
        .padding(4)
        .width(Fill)
        .into()
}

fn styled(pair: theme::palette::Pair) -> container::Style {
    container::Style {
        background: Some(pair.color.into()),
        text_color: pair.text.into(),
        border: Border {
            width: 1.0,
            color: pair.color,
            radius: 2.0.into(),
        },
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_become_danger_toasts() {
        let toast = Toast::from(AppError::Refine("timed out".to_string()));
        assert_eq!(toast.status, Status::Danger);
        assert_eq!(toast.title, "Refinement error");
        assert_eq!(toast.body, "Refinement error: timed out");
    }

    #[test]
    fn invalidation_names_the_count() {
        assert_eq!(Toast::invalidated(2).status, Status::Warning);
        assert!(Toast::invalidated(1).body.starts_with("1 intention no"));
    }

    #[test]
    fn repeated_failures_share_one_toast() {
        let t0 = Instant::now();
        let mut toasts = Toasts::new(8);
        let failure = || Toast::from(AppError::Fetch("connection refused".to_string()));

        toasts.push(failure(), t0);
        toasts.push(failure(), t0 + Duration::from_secs(10));
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts.entries[0].count, 2);

        // the second push restarted the timer
        toasts.expire(t0 + Duration::from_secs(20));
        assert_eq!(toasts.len(), 1);
        toasts.expire(t0 + Duration::from_secs(27));
        assert!(toasts.is_empty());
    }

    #[test]
    fn notices_expire_before_errors() {
        let t0 = Instant::now();
        let mut toasts = Toasts::new(8);
        toasts.push(Toast::info("No fragment matched the query"), t0);
        toasts.push(Toast::error("boom"), t0);

        toasts.expire(t0 + Duration::from_secs(9));
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts.entries[0].toast.status, Status::Danger);
    }

    #[test]
    fn oldest_toast_gives_way() {
        let t0 = Instant::now();
        let mut toasts = Toasts::new(8);
        for n in 0..=MAX_TOASTS {
            toasts.push(Toast::warn(format!("warning {n}")), t0);
        }
        assert_eq!(toasts.len(), MAX_TOASTS);
        assert_eq!(toasts.entries[0].toast.body, "warning 1");

        toasts.dismiss(0);
        toasts.dismiss(MAX_TOASTS);
        assert_eq!(toasts.len(), MAX_TOASTS - 1);
    }
}
