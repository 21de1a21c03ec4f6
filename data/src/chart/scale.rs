use super::Series;

use chrono::{Datelike, TimeZone, Utc};
use iced_core::{Point, Rectangle};
use service::Unit;

/// Pixels per character when estimating axis label width.
const LABEL_CHAR_PX: f32 = 8.0;
const MIN_INNER_WIDTH: f32 = 10.0;
/// Below this inner height the y axis only labels its extremes.
const COMPACT_Y_AXIS: f32 = 100.0;
/// Aspect ratios are expressed per thousand x units.
const RATIO_FACTOR: f64 = 1_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margin {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Margin {
    pub const NONE: Margin = Margin::new(0.0, 0.0, 0.0, 0.0);
    pub const DETAIL: Margin = Margin::new(30.0, 15.0, 30.0, 50.0);
    pub const OVERVIEW: Margin = Margin::new(15.0, 15.0, 25.0, 50.0);
    pub const THUMBNAIL: Margin = Margin::new(2.0, 1.0, 2.0, 1.0);

    pub const fn new(top: f32, right: f32, bottom: f32, left: f32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }
}

/// Pixel budget a chart is laid out into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: Option<f32>,
    pub margin: Margin,
    pub ratio: Option<f32>,
    /// Narrow the drawn index window to what the widened x domain covers.
    pub expand: bool,
}

impl Viewport {
    pub fn new(width: f32, height: f32, margin: Margin) -> Self {
        Self {
            width,
            height: Some(height),
            margin,
            ratio: None,
            expand: true,
        }
    }

    pub fn with_ratio(mut self, ratio: Option<f32>) -> Self {
        self.ratio = ratio.filter(|r| r.is_finite() && *r > 0.0);
        self
    }

    pub fn with_expand(mut self, expand: bool) -> Self {
        self.expand = expand;
        self
    }

    /// Height derived from width and ratio instead of the viewport.
    pub fn without_height(mut self) -> Self {
        self.height = None;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f32, f32),
}

impl LinearScale {
    /// A zero-width domain is widened to one unit around its value.
    pub fn new(domain: (f64, f64), range: (f32, f32)) -> Self {
        let domain = if (domain.1 - domain.0).abs() < f64::EPSILON {
            (domain.0 - 0.5, domain.0 + 0.5)
        } else {
            domain
        };
        Self { domain, range }
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn range(&self) -> (f32, f32) {
        self.range
    }

    pub fn map(&self, value: f64) -> f32 {
        let t = (value - self.domain.0) / (self.domain.1 - self.domain.0);
        self.range.0 + (t as f32) * (self.range.1 - self.range.0)
    }

    pub fn invert(&self, px: f32) -> f64 {
        let span = self.range.1 - self.range.0;
        if span.abs() < f32::EPSILON {
            return self.domain.0;
        }
        let t = f64::from((px - self.range.0) / span);
        self.domain.0 + t * (self.domain.1 - self.domain.0)
    }

    pub fn contains(&self, value: f64) -> bool {
        let (lo, hi) = (self.domain.0.min(self.domain.1), self.domain.0.max(self.domain.1));
        value >= lo && value <= hi
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub value: f64,
    /// Position along the axis, in outer canvas coordinates.
    pub px: f32,
    pub label: String,
}

/// Scales and geometry for one render of one series.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub x: LinearScale,
    pub y: LinearScale,
    pub margin: Margin,
    pub inner_width: f32,
    pub inner_height: f32,
    /// Inclusive index window that is drawn.
    pub window: (usize, usize),
    /// Finite min/max of y inside the requested range.
    pub y_extent: (f64, f64),
}

impl Layout {
    pub fn fit(series: &Series, range: Option<(usize, usize)>, viewport: &Viewport) -> Option<Layout> {
        let len = series.len();
        if len == 0 {
            return None;
        }

        let (mut start, mut end) = match range {
            Some((s, e)) => (s.min(len - 1), e.min(len - 1)),
            None => (0, len - 1),
        };
        if start > end {
            std::mem::swap(&mut start, &mut end);
        }

        let x_min = series.x[start];
        let x_max = series.x[end];
        let y_extent = finite_extent(&series.y[start..=end])?;

        let x_range = (x_max - x_min).max(1.0);
        let y_range = (y_extent.1 - y_extent.0).max(1.0);
        let mut x_domain = (x_min, x_max);
        let mut y_domain = y_extent;

        let margin = viewport.margin;
        let width = (viewport.width - margin.left - margin.right).max(MIN_INNER_WIDTH);
        let budget_height = viewport
            .height
            .map(|h| (h - margin.top - margin.bottom).max(1.0));

        let mut window = (start, end);

        let inner_height = match (budget_height, viewport.ratio) {
            (Some(inner_h), Some(ratio)) => {
                let y_unit_px = f64::from(inner_h) / y_range;
                let x_unit_px = y_unit_px * f64::from(ratio);
                let natural_width = (x_unit_px * x_range / RATIO_FACTOR).max(f64::EPSILON);
                let scale = f64::from(width) / natural_width;

                if natural_width > f64::from(width) {
                    let delta = y_range / scale - y_range;
                    y_domain = (y_domain.0 - delta / 2.0, y_domain.1 + delta / 2.0);
                } else {
                    let delta = x_range * scale - x_range;
                    x_domain = (x_domain.0 - delta / 2.0, x_domain.1 + delta / 2.0);

                    if viewport.expand {
                        let lo = series.x.partition_point(|x| *x < x_domain.0);
                        let hi = series.x.partition_point(|x| *x <= x_domain.1);
                        if lo < hi {
                            window = (lo, hi - 1);
                        }
                    }
                }
                inner_h
            }
            (None, Some(ratio)) => {
                let x_unit_px = f64::from(width) / x_range;
                let y_unit_px = x_unit_px / f64::from(ratio);
                (y_range * y_unit_px * RATIO_FACTOR) as f32
            }
            (Some(inner_h), None) => inner_h,
            (None, None) => return None,
        };

        Some(Layout {
            x: LinearScale::new(x_domain, (margin.left, margin.left + width)),
            y: LinearScale::new(y_domain, (margin.top + inner_height, margin.top)),
            margin,
            inner_width: width,
            inner_height,
            window,
            y_extent,
        })
    }

    pub fn outer_width(&self) -> f32 {
        self.inner_width + self.margin.left + self.margin.right
    }

    pub fn outer_height(&self) -> f32 {
        self.inner_height + self.margin.top + self.margin.bottom
    }

    pub fn inner_bounds(&self) -> Rectangle {
        Rectangle {
            x: self.margin.left,
            y: self.margin.top,
            width: self.inner_width,
            height: self.inner_height,
        }
    }

    /// Canvas x of series index `idx`.
    pub fn x_at(&self, series: &Series, idx: usize) -> Option<f32> {
        series.x.get(idx).map(|x| self.x.map(*x))
    }

    pub fn point_at(&self, series: &Series, idx: usize) -> Option<Point> {
        let y = *series.y.get(idx)?;
        if !y.is_finite() {
            return None;
        }
        Some(Point::new(self.x_at(series, idx)?, self.y.map(y)))
    }

    /// Whether any of `[start, end]` lies inside the x domain.
    pub fn overlaps(&self, series: &Series, (start, end): (usize, usize)) -> bool {
        let (lo, hi) = self.x.domain();
        match (series.x.get(start), series.x.get(end)) {
            (Some(s), Some(e)) => *s <= hi && *e >= lo,
            _ => false,
        }
    }

    /// Index in the drawn window whose x is closest to canvas `px`.
    pub fn nearest_index(&self, series: &Series, px: f32) -> Option<usize> {
        let (start, end) = self.window;
        let xs = series.x.get(start..=end)?;
        let target = self.x.invert(px);

        let right = xs.partition_point(|x| *x < target);
        let idx = match right {
            0 => 0,
            r if r >= xs.len() => xs.len() - 1,
            r => {
                if target - xs[r - 1] <= xs[r] - target {
                    r - 1
                } else {
                    r
                }
            }
        };
        Some(start + idx)
    }

    pub fn x_ticks(&self, series: &Series) -> Vec<Tick> {
        let (lo, hi) = self.x.domain();

        // Widest label of the domain ends.
        let chars = [lo, hi]
            .iter()
            .map(|x| format_x(*x, series.unit).chars().count())
            .max()
            .unwrap_or(1)
            .max(1);
        let label_px = chars as f32 * LABEL_CHAR_PX * 1.5;
        let count = ((self.inner_width / label_px).floor() as usize).clamp(2, 10);
        let values = if series.unit.is_time() {
            time_ticks(lo, hi, count)
        } else {
            ticks(lo, hi, count).0
        };

        values
            .into_iter()
            .map(|value| Tick {
                value,
                px: self.x.map(value),
                label: format_x(value, series.unit),
            })
            .collect()
    }

    pub fn y_ticks(&self) -> Vec<Tick> {
        let (values, step) = if self.inner_height < COMPACT_Y_AXIS {
            let (lo, hi) = self.y_extent;
            (vec![lo, hi], (hi - lo).abs())
        } else {
            let (lo, hi) = self.y.domain();
            let count = ((self.inner_height / 30.0) as usize).clamp(2, 10);
            ticks(lo, hi, count)
        };

        values
            .into_iter()
            .map(|value| Tick {
                value,
                px: self.y.map(value),
                label: format_value(value, step),
            })
            .collect()
    }
}

fn finite_extent(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// A "nice" step close to range/target using 1/2/5*10^k.
fn nice_step(range: f64, target: usize) -> f64 {
    let target = target.max(2) as f64;
    let raw = (range / target).max(f64::EPSILON);
    let power = raw.log10().floor();
    let base = 10f64.powf(power);
    let n = raw / base;
    let nice = if n <= 1.0 {
        1.0
    } else if n <= 2.0 {
        2.0
    } else if n <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * base
}

/// Multiples of a nice step that fall inside `[min, max]`.
fn ticks(min: f64, max: f64, target: usize) -> (Vec<f64>, f64) {
    let (min, max) = (min.min(max), min.max(max));
    let span = (max - min).max(1e-9);
    let step = nice_step(span, target);

    let mut out = Vec::new();
    let mut t = (min / step).ceil() * step;
    for _ in 0..=100 {
        if t > max + step * 1e-9 {
            break;
        }
        out.push(t);
        t += step;
    }
    (out, step)
}

const S: i64 = 1_000;
const M: i64 = 60 * S;
const H: i64 = 60 * M;
const D: i64 = 24 * H;

fn fixed_steps() -> &'static [i64] {
    &[
        S,
        5 * S,
        15 * S,
        30 * S, //
        M,
        5 * M,
        15 * M,
        30 * M, //
        H,
        3 * H,
        6 * H,
        12 * H, //
        D,
        2 * D,
        7 * D,
        14 * D,
    ]
}

const MONTH_STEPS: [u32; 4] = [1, 3, 6, 12];

/// Calendar-aligned timestamps (ms) in `[min, max]`, roughly `count` of them.
fn time_ticks(min: f64, max: f64, count: usize) -> Vec<f64> {
    let (lo, hi) = (min.min(max) as i64, min.max(max) as i64);
    let span = (hi - lo).max(1);
    let count = count.max(1) as i64;

    if let Some(&step) = fixed_steps().iter().find(|&&step| span / step <= count) {
        let first = if lo.rem_euclid(step) == 0 {
            lo
        } else {
            lo - lo.rem_euclid(step) + step
        };
        return (0..)
            .map(|i| first + i * step)
            .take_while(|t| *t <= hi)
            .take(200)
            .map(|t| t as f64)
            .collect();
    }

    let months_span = span / (30 * D);
    let month_step = MONTH_STEPS
        .iter()
        .copied()
        .find(|step| months_span / i64::from(*step) <= count)
        .unwrap_or_else(|| {
            let years = (months_span / 12 / count).max(1);
            (nice_step(years as f64 * count as f64, count as usize) as u32).max(1) * 12
        });

    month_ticks(lo, hi, month_step)
}

fn month_ticks(lo: i64, hi: i64, month_step: u32) -> Vec<f64> {
    let Some(start) = Utc.timestamp_millis_opt(lo).single() else {
        return Vec::new();
    };

    let mut year = start.year();
    let mut month0 = start.month0();
    month0 -= month0 % month_step.min(12);
    if month_step >= 12 {
        month0 = 0;
        let years = (month_step / 12) as i32;
        year -= year.rem_euclid(years);
    }

    let mut out = Vec::new();
    for _ in 0..200 {
        let Some(t) = Utc
            .with_ymd_and_hms(year, month0 + 1, 1, 0, 0, 0)
            .single()
            .map(|dt| dt.timestamp_millis())
        else {
            break;
        };
        if t > hi {
            break;
        }
        if t >= lo {
            out.push(t as f64);
        }

        let next = month0 + month_step;
        year += (next / 12) as i32;
        month0 = next % 12;
    }
    out
}

/// `YYYY/MM/DD HH:MM:SS`, truncated to the resolution of `unit`.
pub fn format_time(ts_ms: i64, unit: Unit) -> String {
    let Some(dt) = Utc.timestamp_millis_opt(ts_ms).single() else {
        return String::new();
    };
    let full = dt.format("%Y/%m/%d %H:%M:%S").to_string();
    let len = match unit {
        Unit::Year => 4,
        Unit::Month => 7,
        Unit::Week | Unit::Day => 10,
        Unit::Hour => 13,
        Unit::Minute => 16,
        Unit::Second | Unit::Number => 19,
    };
    full[..len.min(full.len())].to_string()
}

pub fn format_x(value: f64, unit: Unit) -> String {
    if unit.is_time() {
        format_time(value as i64, unit)
    } else {
        format_number(value)
    }
}

/// Plain number without trailing zeros.
pub fn format_number(value: f64) -> String {
    if value.fract().abs() < 1e-9 {
        format!("{}", value.round() as i64)
    } else {
        let s = format!("{value:.4}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

fn format_value(value: f64, step: f64) -> String {
    if step >= 1.0 || step <= 0.0 {
        format_number(value)
    } else {
        let decimals = (-step.log10()).ceil().clamp(0.0, 6.0) as usize;
        format!("{value:.decimals$}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_series(n: usize) -> Series {
        Series {
            name: "v".to_string(),
            x: (0..n).map(|i| i as f64).collect(),
            y: (0..n).map(|i| i as f64).collect(),
            unit: Unit::Number,
        }
    }

    #[test]
    fn scale_maps_and_inverts() {
        let scale = LinearScale::new((0.0, 100.0), (50.0, 250.0));
        assert_eq!(scale.map(0.0), 50.0);
        assert_eq!(scale.map(50.0), 150.0);
        assert!((scale.invert(150.0) - 50.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_domain_is_widened() {
        let scale = LinearScale::new((5.0, 5.0), (0.0, 100.0));
        assert_eq!(scale.map(5.0), 50.0);
        assert!(scale.map(5.0).is_finite());
    }

    #[test]
    fn flat_series_still_lays_out() {
        let series = Series {
            name: "flat".to_string(),
            x: vec![0.0, 1.0, 2.0],
            y: vec![3.0, 3.0, 3.0],
            unit: Unit::Number,
        };
        let layout = Layout::fit(&series, None, &Viewport::new(400.0, 200.0, Margin::NONE)).unwrap();
        let p = layout.point_at(&series, 1).unwrap();
        assert!(p.x.is_finite() && p.y.is_finite());
    }

    #[test]
    fn fit_respects_margins_and_range() {
        let series = linear_series(100);
        let viewport = Viewport::new(565.0, 260.0, Margin::DETAIL);
        let layout = Layout::fit(&series, Some((10, 60)), &viewport).unwrap();

        assert_eq!(layout.inner_width, 500.0);
        assert_eq!(layout.inner_height, 200.0);
        assert_eq!(layout.window, (10, 60));
        assert_eq!(layout.x_at(&series, 10), Some(50.0));
        assert_eq!(layout.x_at(&series, 60), Some(550.0));
        assert_eq!(layout.outer_height(), 260.0);
    }

    #[test]
    fn ratio_with_height_widens_x_and_narrows_window() {
        let series = linear_series(1_000);
        // y range 99 over 100px, ratio 1000 => one x unit per px, 99px natural width
        let viewport = Viewport::new(400.0, 100.0, Margin::NONE).with_ratio(Some(1_000.0));
        let layout = Layout::fit(&series, Some((100, 199)), &viewport).unwrap();

        let (lo, hi) = layout.x.domain();
        assert!(lo < 100.0 && hi > 199.0);
        assert!(layout.window.0 < 100 && layout.window.1 > 199);
        assert_eq!(layout.inner_width, 400.0);
    }

    #[test]
    fn ratio_overflow_pads_y_instead() {
        let series = linear_series(1_000);
        let viewport = Viewport::new(100.0, 100.0, Margin::NONE).with_ratio(Some(10_000.0));
        let layout = Layout::fit(&series, Some((0, 199)), &viewport).unwrap();

        let (y_lo, y_hi) = layout.y.domain();
        assert!(y_lo < 0.0 && y_hi > 199.0);
        assert_eq!(layout.window, (0, 199));
    }

    #[test]
    fn ratio_without_height_derives_height() {
        let series = linear_series(11);
        let viewport = Viewport::new(100.0, 0.0, Margin::NONE)
            .without_height()
            .with_ratio(Some(1_000.0));
        let layout = Layout::fit(&series, None, &viewport).unwrap();
        // 10 px per x unit, y units at 10/1000 px, times 1000
        assert!((layout.inner_height - 100.0).abs() < 1e-3);
    }

    #[test]
    fn x_tick_count_follows_label_width() {
        let series = linear_series(1_000);
        let narrow = Layout::fit(&series, None, &Viewport::new(60.0, 200.0, Margin::NONE)).unwrap();
        assert!(narrow.x_ticks(&series).len() <= 3);

        let wide = Layout::fit(&series, None, &Viewport::new(2_000.0, 200.0, Margin::NONE)).unwrap();
        let ticks = wide.x_ticks(&series);
        assert!(ticks.len() >= 5 && ticks.len() <= 11);
        assert!(ticks.windows(2).all(|w| w[0].value < w[1].value));
    }

    #[test]
    fn x_tick_width_uses_the_longest_label() {
        // "0" at the start, "99999" at the end
        let series = linear_series(100_000);
        let layout = Layout::fit(&series, None, &Viewport::new(200.0, 200.0, Margin::NONE)).unwrap();
        // 5 chars at 12 px each fit 3 labels in 200 px
        assert!(layout.x_ticks(&series).len() <= 4);
    }

    #[test]
    fn short_y_axis_labels_extremes_only() {
        let series = linear_series(50);
        let layout = Layout::fit(&series, None, &Viewport::new(400.0, 80.0, Margin::NONE)).unwrap();
        let ticks = layout.y_ticks();
        assert_eq!(ticks.len(), 2);
        assert_eq!(ticks[0].value, 0.0);
        assert_eq!(ticks[1].value, 49.0);
    }

    #[test]
    fn time_labels_truncate_by_unit() {
        let ts = Utc
            .with_ymd_and_hms(2024, 3, 5, 14, 30, 15)
            .unwrap()
            .timestamp_millis();
        assert_eq!(format_time(ts, Unit::Second), "2024/03/05 14:30:15");
        assert_eq!(format_time(ts, Unit::Hour), "2024/03/05 14");
        assert_eq!(format_time(ts, Unit::Day), "2024/03/05");
        assert_eq!(format_time(ts, Unit::Month), "2024/03");
        assert_eq!(format_time(ts, Unit::Year), "2024");
    }

    #[test]
    fn monthly_ticks_land_on_month_starts() {
        let lo = Utc.with_ymd_and_hms(2023, 1, 15, 0, 0, 0).unwrap().timestamp_millis();
        let hi = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap().timestamp_millis();
        let ticks = time_ticks(lo as f64, hi as f64, 6);

        assert!(!ticks.is_empty());
        for t in ticks {
            let dt = Utc.timestamp_millis_opt(t as i64).unwrap();
            assert_eq!(dt.day(), 1);
        }
    }

    #[test]
    fn nearest_index_bisects_center() {
        let series = linear_series(11);
        let layout = Layout::fit(&series, None, &Viewport::new(100.0, 50.0, Margin::NONE)).unwrap();
        assert_eq!(layout.nearest_index(&series, 0.0), Some(0));
        assert_eq!(layout.nearest_index(&series, 34.0), Some(3));
        assert_eq!(layout.nearest_index(&series, 500.0), Some(10));
    }

    #[test]
    fn all_nan_values_do_not_lay_out() {
        let series = Series {
            name: "nan".to_string(),
            x: vec![0.0, 1.0],
            y: vec![f64::NAN, f64::NAN],
            unit: Unit::Number,
        };
        assert!(Layout::fit(&series, None, &Viewport::new(100.0, 50.0, Margin::NONE)).is_none());
    }
}
