pub mod panel;

use crate::modal::{self, intention};
use crate::screen::AppError;
use crate::style;
use crate::widget::chart::{detail, glyph, overview};
use crate::widget::toast::Toast;

use data::chart::intention::IntentionError;
use data::chart::popover::Ticket;
use data::chart::render::{ChartPalette, ResultsOverlay};
use data::chart::{self, Series, SplitChart, SubmitRequest, scroll, split};
use data::dataset::{DatasetState, is_target};
use data::query::QueryState;
use data::query::glyph::{self as query_glyph, Pick};
use data::results::{self, ResultsView};

use service::adapter::query::{Comparison, ComparisonRequest, RefineRequest};
use service::adapter::{chat, dataset as dataset_api, query as query_api};
use service::{
    ApproximationResults, ApproximationSegmentsContainer, Backend, QuerySpecWithSource, RawDataset,
};

use iced::widget::{canvas, center, column, container, row, text};
use iced::{Element, Length, Point, Task};
use rustc_hash::FxHashMap;
use std::path::PathBuf;

const OVERVIEW_HEIGHT: f32 = 110.0;

#[derive(Debug, Clone)]
pub enum Message {
    PathChanged(String),
    LoadDataset,
    DatasetLoaded(Result<(RawDataset, Vec<ApproximationSegmentsContainer>), AppError>),
    SourceSelected(String),
    LevelChanged(usize),
    QueryEdited(String),
    ParseQuery,
    RunQuery,
    Parsed {
        run: bool,
        result: Result<QuerySpecWithSource, AppError>,
    },
    QueryResults(Result<ApproximationResults, AppError>),
    ToggleSource(i64),
    GlyphPicked(Pick),
    Chart(detail::Message),
    Overview(overview::Message),
    Popover(intention::Message),
    ComparisonFetched(Ticket, Result<Comparison, AppError>),
    Refined {
        prompt: String,
        result: Result<QuerySpecWithSource, AppError>,
    },
    ChatRecorded,
    Results(panel::ResultsMessage),
    OpenDataFolder,
}

/// What an update asks of the application.
pub struct Update {
    pub task: Task<Message>,
    pub toasts: Vec<Toast>,
}

impl Update {
    fn none() -> Self {
        Self {
            task: Task::none(),
            toasts: Vec::new(),
        }
    }

    fn task(task: Task<Message>) -> Self {
        Self {
            task,
            toasts: Vec::new(),
        }
    }

    fn toast(toast: Toast) -> Self {
        Self {
            task: Task::none(),
            toasts: vec![toast],
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Loading {
    dataset: bool,
    parse: bool,
    query: bool,
}

pub struct Dashboard {
    backend: Backend,
    path: String,
    dataset: DatasetState,
    /// Every value column, for result thumbnails.
    series: FxHashMap<String, Series>,
    query: QueryState,
    chart: SplitChart,
    results: ResultsView,
    overlay: ResultsOverlay,
    focused: Option<usize>,
    /// Trend or relation picked in the query glyph.
    picked: Option<Pick>,
    anchor: Option<Point>,
    loading: Loading,
}

impl Dashboard {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            path: String::new(),
            dataset: DatasetState::default(),
            series: FxHashMap::default(),
            query: QueryState::default(),
            chart: SplitChart::new(),
            results: ResultsView::default(),
            overlay: ResultsOverlay::default(),
            focused: None,
            picked: None,
            anchor: None,
            loading: Loading::default(),
        }
    }

    pub fn dataset_name(&self) -> Option<&str> {
        self.dataset.dataset()?.filename.as_deref()
    }

    pub fn update(&mut self, message: Message) -> Update {
        match message {
            Message::PathChanged(path) => {
                self.path = path;
                Update::none()
            }
            Message::LoadDataset => self.load_dataset(),
            Message::DatasetLoaded(result) => {
                self.loading.dataset = false;
                match result {
                    Ok((raw, containers)) => self.set_dataset(raw, containers),
                    Err(err) => Update::toast(err.into()),
                }
            }
            Message::SourceSelected(source) => {
                if self.dataset.set_source(&source) {
                    self.reload_chart()
                } else {
                    Update::none()
                }
            }
            Message::LevelChanged(level) => {
                if self.dataset.set_level(level) {
                    self.reload_chart()
                } else {
                    Update::none()
                }
            }
            Message::QueryEdited(text) => {
                self.query.text = text;
                Update::none()
            }
            Message::ParseQuery => self.parse(false),
            Message::RunQuery => {
                if self.query.needs_parse() {
                    self.parse(true)
                } else {
                    self.run_query()
                }
            }
            Message::Parsed { run, result } => {
                self.loading.parse = false;
                match result {
                    Ok(parsed) => {
                        log::info!(
                            "Parsed query with {} text sources",
                            parsed.text_sources.len()
                        );
                        self.query.set_query(Some(parsed));
                        self.picked = None;
                        self.refresh_overlay();
                        if run {
                            self.run_query()
                        } else {
                            Update::none()
                        }
                    }
                    Err(err) => Update::toast(err.into()),
                }
            }
            Message::QueryResults(result) => {
                self.loading.query = false;
                match result {
                    Ok(found) => {
                        self.results = ResultsView::new(&found, self.unit());
                        self.dataset.set_query_results(Some(found));
                        self.focused = None;
                        self.refresh_overlay();
                        if self.results.is_empty() {
                            Update::toast(Toast::info("No fragment matched the query"))
                        } else {
                            Update::none()
                        }
                    }
                    Err(err) => Update::toast(err.into()),
                }
            }
            Message::ToggleSource(id) => {
                self.query.toggle_source(id);
                self.refresh_overlay();
                Update::none()
            }
            Message::GlyphPicked(pick) => {
                self.picked = (self.picked != Some(pick)).then_some(pick);
                Update::none()
            }
            Message::Chart(message) => self.on_chart(message),
            Message::Overview(message) => {
                match message {
                    overview::Message::Brushing(range) => {
                        self.dataset.set_range(Some(range), true);
                    }
                    overview::Message::Brushed(Some((start, end))) => {
                        let snapped = scroll::select_by_overlap(self.dataset.segments(), start, end);
                        self.dataset.set_range(Some(snapped.unwrap_or((start, end))), true);
                    }
                    overview::Message::Brushed(None) => self.dataset.set_range(None, true),
                }
                Update::none()
            }
            Message::Popover(message) => self.on_popover(message),
            Message::ComparisonFetched(ticket, result) => match result {
                Ok(comparison) => {
                    if !self.chart.apply_comparison(ticket, comparison) {
                        log::debug!("Discarded comparison for closed popover {ticket:?}");
                    }
                    Update::none()
                }
                Err(err) if self.chart.popover().is_some_and(|p| p.ticket == ticket) => {
                    Update::toast(err.into())
                }
                Err(err) => {
                    log::debug!("Dropped failed comparison for closed popover {ticket:?}: {err}");
                    Update::none()
                }
            },
            Message::Refined { prompt, result } => match result {
                Ok(refined) => {
                    self.chart.finish_submit(true);
                    let answer = refined.original_text.clone();
                    self.query.replace(refined);
                    self.picked = None;
                    self.refresh_overlay();

                    let backend = self.backend.clone();
                    Update::task(Task::perform(
                        async move { chat::add_chat_history(&backend, &prompt, &answer).await },
                        |result| {
                            if let Err(e) = result {
                                log::warn!("Chat history not recorded: {e}");
                            }
                            Message::ChatRecorded
                        },
                    ))
                }
                Err(err) => {
                    self.chart.finish_submit(false);
                    Update::toast(err.into())
                }
            },
            Message::ChatRecorded => Update::none(),
            Message::Results(message) => self.on_results(message),
            Message::OpenDataFolder => match data::open_data_folder() {
                Ok(()) => Update::none(),
                Err(e) => Update::toast(Toast::error(e.to_string())),
            },
        }
    }

    fn unit(&self) -> service::Unit {
        self.dataset.dataset().map_or_else(Default::default, |d| d.unit)
    }

    fn load_dataset(&mut self) -> Update {
        if self.path.trim().is_empty() {
            return Update::toast(Toast::warn("Enter the path of a CSV file"));
        }
        if self.loading.dataset {
            return Update::none();
        }
        self.loading.dataset = true;

        let path = PathBuf::from(self.path.trim());
        let backend = self.backend.clone();
        Update::task(Task::perform(
            async move {
                let mut raw = service::dataset::load_csv(&path).map_err(AppError::dataset)?;
                let uploaded = dataset_api::upload_csv_file(&backend, &path)
                    .await
                    .map_err(AppError::fetch)?;
                raw.filename = Some(uploaded.filename);

                let containers = dataset_api::process_dataset(&backend, &raw.info())
                    .await
                    .map_err(AppError::dataset)?;
                Ok((raw, containers))
            },
            Message::DatasetLoaded,
        ))
    }

    fn set_dataset(
        &mut self,
        raw: RawDataset,
        containers: Vec<ApproximationSegmentsContainer>,
    ) -> Update {
        self.series = raw
            .columns
            .iter()
            .filter_map(|column| Series::from_dataset(&raw, &column.name))
            .map(|series| (series.name.clone(), series))
            .collect();

        self.dataset.set_dataset(raw);
        self.dataset.set_containers(containers);
        self.results = ResultsView::default();
        self.focused = None;
        self.query.reset_original();

        self.reload_chart()
    }

    /// New segments for the chart with no splits selected.
    fn reload_chart(&mut self) -> Update {
        let mut toasts = Vec::new();
        let synced = self.sync_chart(&mut toasts);
        let cleared = self.clear_splits(&mut toasts);
        Update {
            task: Task::batch([synced, cleared]),
            toasts,
        }
    }

    /// Hands the segments of the shown series and level to the chart.
    fn sync_chart(&mut self, toasts: &mut Vec<Toast>) -> Task<Message> {
        let events = self.chart.set_segments(self.dataset.segments().to_vec());
        self.anchor = None;
        let task = self.on_chart_events(events, toasts);
        self.refresh_overlay();
        task
    }

    /// Forgets the selected and accepted splits.
    fn clear_splits(&mut self, toasts: &mut Vec<Toast>) -> Task<Message> {
        let events = self.chart.set_accepted(Vec::new());
        let task = self.on_chart_events(events, toasts);
        self.reset_original_if_idle();
        task
    }

    fn reset_original_if_idle(&mut self) {
        if self.chart.accepted().is_empty() && !self.dataset.has_query_results() {
            self.query.reset_original();
        }
    }

    fn parse(&mut self, run: bool) -> Update {
        let Some(text) = self.query.submittable_text().map(str::to_string) else {
            return Update::toast(Toast::warn("Query text is empty"));
        };
        if self.loading.parse {
            return Update::none();
        }
        self.loading.parse = true;

        let backend = self.backend.clone();
        Update::task(Task::perform(
            async move {
                query_api::parse_nl_query(&backend, &text)
                    .await
                    .map_err(AppError::query)
            },
            move |result| Message::Parsed { run, result },
        ))
    }

    fn run_query(&mut self) -> Update {
        let Some(query) = self.query.query() else {
            return Update::toast(Toast::warn("Query text is empty"));
        };
        if self.loading.query {
            return Update::none();
        }
        let spec = query.format();
        self.query.mark_executed();
        self.loading.query = true;

        let backend = self.backend.clone();
        Update::task(Task::perform(
            async move {
                query_api::query_by_specification(&backend, &spec)
                    .await
                    .map_err(AppError::query)
            },
            Message::QueryResults,
        ))
    }

    fn refresh_overlay(&mut self) {
        let targeted = self
            .dataset
            .source()
            .is_some_and(|source| is_target(self.query.query(), source));

        self.overlay = if targeted {
            ResultsOverlay {
                fragments: self.dataset.result_spans(),
                colors: self.query.trend_colors(),
            }
        } else {
            ResultsOverlay::default()
        };
    }

    fn on_chart(&mut self, message: detail::Message) -> Update {
        let events = match message {
            detail::Message::PointerDown(region, button) => self.chart.pointer_down(region, button),
            detail::Message::PointerMoved(region) => {
                self.chart.pointer_moved(Some(region));
                Vec::new()
            }
            detail::Message::PointerUp(region) => self.chart.pointer_up(region),
            detail::Message::Modifier(pressed) => self.chart.set_modifier(pressed),
            detail::Message::Escape => {
                self.chart.clear_selection();
                Vec::new()
            }
            detail::Message::OpenAnnotation(key, level) => self.chart.open_annotation(key, level),
            detail::Message::Submit => self.chart.submit(),
            detail::Message::Cancel => self.chart.cancel(),
            detail::Message::Wheel { step, position } => {
                self.dataset.scroll(step, position);
                Vec::new()
            }
            detail::Message::AnchorMoved(anchor) => {
                self.anchor = anchor;
                Vec::new()
            }
        };

        let mut toasts = Vec::new();
        let task = self.on_chart_events(events, &mut toasts);
        Update { task, toasts }
    }

    fn on_chart_events(&mut self, events: Vec<chart::Event>, toasts: &mut Vec<Toast>) -> Task<Message> {
        let mut tasks = Vec::new();

        for event in events {
            match event {
                chart::Event::EnvelopeChanged(splits) => {
                    log::debug!("Envelope spans {:?}", split::bounds(&splits));
                }
                chart::Event::Cancelled => self.reset_original_if_idle(),
                chart::Event::IntentionsInvalidated { dropped } => {
                    if dropped > 0 {
                        toasts.push(Toast::invalidated(dropped));
                    }
                }
                chart::Event::Comparison { ticket, request } => {
                    tasks.push(self.compare(ticket, request));
                }
                chart::Event::Submit(request) => tasks.push(self.refine(request)),
            }
        }
        Task::batch(tasks)
    }

    fn compare(&self, ticket: Ticket, request: ComparisonRequest) -> Task<Message> {
        let backend = self.backend.clone();
        Task::perform(
            async move {
                query_api::segment_comparison(&backend, &request)
                    .await
                    .map_err(AppError::fetch)
            },
            move |result| Message::ComparisonFetched(ticket, result),
        )
    }

    fn refine(&self, request: SubmitRequest) -> Task<Message> {
        let old_queryspec_with_source = request
            .refining
            .then(|| self.query.original().or(self.query.query()).cloned())
            .flatten();
        let prompt = self.query.text.clone();

        let body = RefineRequest {
            old_queryspec_with_source,
            segments: request.segments,
            intentions: request.intentions,
        };
        log::info!(
            "Refining with {} segments ({})",
            body.segments.len(),
            if request.refining { "refine" } else { "author" }
        );

        let backend = self.backend.clone();
        Task::perform(
            async move {
                query_api::modify_nl_query(&backend, &body)
                    .await
                    .map_err(AppError::refine)
            },
            move |result| Message::Refined { prompt, result },
        )
    }

    fn on_popover(&mut self, message: intention::Message) -> Update {
        match message {
            intention::Message::Toggle(key) => {
                self.chart.toggle_choice(key);
            }
            intention::Message::Confirm => match self.chart.confirm_popover() {
                Ok(_) => {}
                Err(IntentionError::EmptyChoices) => {
                    return Update::toast(Toast::warn("Pick at least one attribute"));
                }
                Err(e) => {
                    log::error!("Intention rejected: {e}");
                    return Update::toast(Toast::error(e.to_string()));
                }
            },
            intention::Message::Delete => {
                self.chart.delete_popover();
            }
            intention::Message::Close => self.chart.close_popover(),
        }
        Update::none()
    }

    fn on_results(&mut self, message: panel::ResultsMessage) -> Update {
        match message {
            panel::ResultsMessage::ToggleSort(attribute) => self.results.toggle_sort(attribute),
            panel::ResultsMessage::Filter(attribute, bounds) => {
                self.results.set_filter(attribute, bounds);
            }
            panel::ResultsMessage::AddFilter(attribute) => {
                let bounds = self.results.extent(attribute);
                self.results.set_filter(attribute, bounds);
            }
            panel::ResultsMessage::Scrolled(offset) => {
                if offset > panel::LOAD_MORE_AT {
                    self.results.load_more();
                }
            }
            panel::ResultsMessage::Focus(index) => return self.focus(index),
        }
        Update::none()
    }

    /// Shows a result fragment on the detail chart with its splits accepted.
    fn focus(&mut self, index: usize) -> Update {
        let Some(fragment) = self.results.fragment(index).cloned() else {
            return Update::none();
        };

        let level_segments = self
            .dataset
            .segments_of(Some(fragment.source.as_str()), fragment.level)
            .to_vec();
        let Some(focus) = results::focus(&fragment, &level_segments) else {
            return Update::none();
        };

        let mut toasts = Vec::new();
        self.dataset.set_source(&focus.source);
        self.dataset.set_level(focus.level);
        let synced = self.sync_chart(&mut toasts);
        self.dataset.set_range(Some(focus.window), true);

        let events = self.chart.set_accepted(focus.splits);
        let accepted = self.on_chart_events(events, &mut toasts);
        self.focused = Some(index);

        Update {
            task: Task::batch([synced, accepted]),
            toasts,
        }
    }

    /// Glyph of the parsed query with a caption for the picked part.
    fn query_glyph(&self) -> Option<Element<'_, Message>> {
        let query = self.query.query().filter(|query| !query.trends.is_empty())?;

        let canvas = Element::from(
            canvas(glyph::QueryGlyph::new(
                query,
                self.query.colors(),
                self.chart.intentions(),
                self.picked,
            ))
            .width(glyph::GLYPH_WIDTH)
            .height(glyph::GLYPH_HEIGHT),
        )
        .map(Message::GlyphPicked);

        let caption = self
            .picked
            .and_then(|pick| query_glyph::describe(query, pick))
            .unwrap_or_default();

        Some(
            container(
                column![canvas, text(caption).size(style::LABEL_SIZE)]
                    .spacing(2)
                    .width(glyph::GLYPH_WIDTH),
            )
            .style(style::chart_frame)
            .padding(4)
            .into(),
        )
    }

    pub fn view(&self, palette: ChartPalette, ratio: Option<f32>) -> Element<'_, Message> {
        let query_bar = panel::query_bar(&self.query, self.loading.parse || self.loading.query);
        let query_bar: Element<'_, Message> = match self.query_glyph() {
            Some(glyph) => row![container(query_bar).width(Length::Fill), glyph]
                .spacing(8)
                .into(),
            None => query_bar,
        };
        let controls = panel::controls(&self.path, &self.dataset, self.loading.dataset);

        let charts: Element<'_, Message> = match self.dataset.series() {
            Some(series) => {
                let active = self
                    .dataset
                    .source()
                    .is_some_and(|source| is_target(self.query.query(), source));

                let detail: Element<'_, Message> = Element::from(
                    canvas(
                        detail::DetailChart::new(&self.chart, series, palette)
                            .with_range(self.dataset.range())
                            .with_results(Some(&self.overlay))
                            .with_ratio(ratio)
                            .with_title(self.dataset.source())
                            .active(active),
                    )
                    .width(Length::Fill)
                    .height(Length::Fill),
                )
                .map(Message::Chart);

                let detail = match (self.chart.popover(), self.anchor) {
                    (Some(state), Some(anchor)) => modal::anchored(
                        detail,
                        intention::view(state, self.chart.choice_rows(self.unit()))
                            .map(Message::Popover),
                        anchor,
                    ),
                    _ => detail,
                };

                let overview: Element<'_, Message> = Element::from(
                    canvas(overview::Overview::new(series, self.dataset.brush(), palette))
                        .width(Length::Fill)
                        .height(OVERVIEW_HEIGHT),
                )
                .map(Message::Overview);

                column![
                    container(detail)
                        .style(style::chart_frame)
                        .height(Length::FillPortion(4)),
                    container(overview).style(style::chart_frame),
                ]
                .spacing(6)
                .into()
            }
            None => center(text("Load a CSV dataset to begin").size(style::TITLE_SIZE)).into(),
        };

        let results = panel::results(
            &self.results,
            &self.series,
            self.query.trend_colors(),
            self.focused,
        );

        column![
            query_bar,
            controls,
            row![
                container(charts).width(Length::FillPortion(3)),
                container(results)
                    .width(Length::FillPortion(1))
                    .style(style::panel)
                    .padding(6),
            ]
            .spacing(8)
            .height(Length::Fill),
        ]
        .spacing(8)
        .padding(8)
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data::chart::selection::Button;
    use service::Segment;

    fn seg(start_idx: usize, end_idx: usize) -> Segment {
        Segment {
            start_idx,
            end_idx,
            ..Segment::default()
        }
    }

    fn dashboard() -> Dashboard {
        Dashboard::new(Backend::new("http://127.0.0.1:5000"))
    }

    #[test]
    fn reloading_the_chart_reports_dropped_intentions() {
        let mut dashboard = dashboard();
        dashboard
            .chart
            .set_segments(vec![seg(0, 20), seg(20, 50), seg(50, 99)]);
        dashboard.chart.set_accepted(vec![0, 20, 50, 99]);
        dashboard.chart.pointer_down((20, 50), Button::Primary);
        dashboard.chart.pointer_up(Some((20, 50)));
        dashboard.chart.toggle_choice("slope");
        dashboard.chart.confirm_popover().unwrap();

        let update = dashboard.reload_chart();
        assert_eq!(update.toasts, vec![Toast::invalidated(1)]);
        assert!(dashboard.chart.accepted().is_empty());
        assert!(dashboard.chart.intentions().is_empty());
    }

    #[test]
    fn glyph_picks_toggle() {
        let mut dashboard = dashboard();
        dashboard.update(Message::GlyphPicked(Pick::Trend(1)));
        assert_eq!(dashboard.picked, Some(Pick::Trend(1)));

        dashboard.update(Message::GlyphPicked(Pick::Relation(0)));
        assert_eq!(dashboard.picked, Some(Pick::Relation(0)));

        dashboard.update(Message::GlyphPicked(Pick::Relation(0)));
        assert_eq!(dashboard.picked, None);
    }

    #[test]
    fn comparison_failures_toast_only_for_the_open_popover() {
        let mut dashboard = dashboard();
        dashboard
            .chart
            .set_segments(vec![seg(0, 20), seg(20, 50), seg(50, 99)]);
        dashboard.chart.pointer_down((20, 50), Button::Primary);
        dashboard.chart.pointer_up(Some((20, 50)));
        let ticket = dashboard.chart.popover().unwrap().ticket;
        let failed = || AppError::Fetch("connection reset".to_string());

        let update = dashboard.update(Message::ComparisonFetched(ticket, Err(failed())));
        assert_eq!(update.toasts, vec![Toast::from(failed())]);

        dashboard.chart.close_popover();
        let update = dashboard.update(Message::ComparisonFetched(ticket, Err(failed())));
        assert!(update.toasts.is_empty());
    }
}
