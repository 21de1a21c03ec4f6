#![windows_subsystem = "windows"]

mod logger;
mod modal;
mod screen;
mod style;
mod widget;

use data::Settings;
use data::chart::render::ChartPalette;
use screen::dashboard::{self, Dashboard};
use widget::toast::Toasts;

use iced::time::{self, Duration, Instant};
use iced::{Element, Size, Subscription, Task, Theme};

fn main() -> iced::Result {
    let settings = Settings::load();

    if let Err(e) = logger::setup(settings.log_level()) {
        eprintln!("Failed to initialize logger: {e}");
    }
    log::info!(
        "Starting trendsketch {} against {}",
        env!("CARGO_PKG_VERSION"),
        settings.backend_url
    );

    iced::application(move || App::new(settings.clone()), App::update, App::view)
        .title(App::title)
        .theme(App::theme)
        .subscription(App::subscription)
        .window_size(Size::new(1280.0, 820.0))
        .antialiasing(true)
        .run()
}

struct App {
    settings: Settings,
    dashboard: Dashboard,
    toasts: Toasts,
}

#[derive(Debug, Clone)]
enum Message {
    Dashboard(dashboard::Message),
    CloseToast(usize),
    ExpireToasts(Instant),
}

impl App {
    fn new(settings: Settings) -> Self {
        let dashboard = Dashboard::new(settings.backend());
        let toasts = Toasts::new(settings.toast_timeout_secs);

        Self {
            settings,
            dashboard,
            toasts,
        }
    }

    fn title(&self) -> String {
        match self.dashboard.dataset_name() {
            Some(name) => format!("trendsketch - {name}"),
            None => "trendsketch".to_string(),
        }
    }

    fn theme(&self) -> Theme {
        self.settings.theme.0.clone()
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Dashboard(message) => {
                let dashboard::Update { task, toasts } = self.dashboard.update(message);

                let now = Instant::now();
                for toast in toasts {
                    self.toasts.push(toast, now);
                }
                task.map(Message::Dashboard)
            }
            Message::CloseToast(index) => {
                self.toasts.dismiss(index);
                Task::none()
            }
            Message::ExpireToasts(now) => {
                self.toasts.expire(now);
                Task::none()
            }
        }
    }

    fn subscription(&self) -> Subscription<Message> {
        if self.toasts.is_empty() {
            Subscription::none()
        } else {
            time::every(Duration::from_millis(500)).map(Message::ExpireToasts)
        }
    }

    fn view(&self) -> Element<'_, Message> {
        let palette = ChartPalette::from_palette(&self.settings.theme.0.palette());

        let content = self
            .dashboard
            .view(palette, self.settings.aspect_ratio)
            .map(Message::Dashboard);

        self.toasts.view(content, Message::CloseToast)
    }
}
