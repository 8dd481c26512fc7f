//! ASCII plotting for terminal output.
//!
//! Fixed-size character grid, deterministic output (helpful for golden
//! tests). The x axis is time, the y axis is price.
//!
//! Price chart:
//! - close: `*` line
//! - open: `.` line
//!
//! Forecast chart:
//! - observed history: `o`
//! - forecast `yhat`: `-` line
//! - uncertainty interval: `:` fill

use chrono::NaiveDateTime;

use crate::domain::ForecastResult;
use crate::series::TimeSeries;
use crate::table::ChartRow;

/// Render the raw open/close price chart.
pub fn render_price_chart(rows: &[ChartRow], width: usize, height: usize) -> String {
    let close: Vec<(f64, f64)> = rows
        .iter()
        .filter_map(|r| r.close.map(|c| (x_of(r.date), c)))
        .collect();
    let open: Vec<(f64, f64)> = rows
        .iter()
        .filter_map(|r| r.open.map(|o| (x_of(r.date), o)))
        .collect();

    let Some((x_min, x_max)) = x_range(rows.iter().map(|r| r.date)) else {
        return "Plot: not enough dated rows to draw.\n".to_string();
    };
    let (y_min, y_max) = y_range(close.iter().chain(&open).map(|p| p.1)).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut canvas = Canvas::new(width, height, x_min, x_max, y_min, y_max);
    canvas.polyline(&close, '*');
    canvas.polyline(&open, '.');

    canvas.render(&format!(
        "Plot: ds=[{}, {}] | y=[{y_min:.2}, {y_max:.2}]",
        date_label(x_min),
        date_label(x_max)
    ))
}

/// Render history points, the forecast line and its interval band.
pub fn render_forecast_chart(
    history: &TimeSeries,
    result: &ForecastResult,
    width: usize,
    height: usize,
) -> String {
    let rows = &result.extended_series;
    let Some((x_min, x_max)) = x_range(rows.iter().map(|r| r.ds).chain(history.points().iter().map(|p| p.ds)))
    else {
        return "Plot: not enough dated rows to draw.\n".to_string();
    };

    let values = rows
        .iter()
        .flat_map(|r| [r.yhat_lower, r.yhat_upper, r.yhat])
        .chain(history.points().iter().map(|p| p.y));
    let (y_min, y_max) = y_range(values).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut canvas = Canvas::new(width, height, x_min, x_max, y_min, y_max);

    let line: Vec<(f64, f64)> = rows.iter().map(|r| (x_of(r.ds), r.yhat)).collect();
    canvas.polyline(&line, '-');
    for r in rows {
        canvas.band(x_of(r.ds), r.yhat_lower, r.yhat_upper, ':');
    }
    for p in history.points() {
        canvas.point(x_of(p.ds), p.y, 'o');
    }

    canvas.render(&format!(
        "Plot: ds=[{}, {}] | y=[{y_min:.2}, {y_max:.2}] | history={} forecast={}",
        date_label(x_min),
        date_label(x_max),
        result.history_len,
        result.future().len(),
    ))
}

struct Canvas {
    grid: Vec<Vec<char>>,
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
}

impl Canvas {
    fn new(width: usize, height: usize, x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        let width = width.max(10);
        let height = height.max(5);
        Self {
            grid: vec![vec![' '; width]; height],
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    fn width(&self) -> usize {
        self.grid[0].len()
    }

    fn height(&self) -> usize {
        self.grid.len()
    }

    fn cell(&self, x: f64, y: f64) -> (usize, usize) {
        (
            map_x(x, self.x_min, self.x_max, self.width()),
            map_y(y, self.y_min, self.y_max, self.height()),
        )
    }

    /// Overwrites whatever is below.
    fn point(&mut self, x: f64, y: f64, ch: char) {
        let (cx, cy) = self.cell(x, y);
        self.grid[cy][cx] = ch;
    }

    /// Only paints blank cells.
    fn polyline(&mut self, points: &[(f64, f64)], ch: char) {
        if points.len() < 2 {
            return;
        }
        let mut prev = None;
        for &(x, y) in points {
            let (cx, cy) = self.cell(x, y);
            if let Some((x0, y0)) = prev {
                draw_line(&mut self.grid, x0, y0, cx, cy, ch);
            }
            prev = Some((cx, cy));
        }
    }

    /// Vertical fill between two values; only paints blank cells.
    fn band(&mut self, x: f64, lower: f64, upper: f64, ch: char) {
        let (cx, top) = self.cell(x, upper);
        let (_, bottom) = self.cell(x, lower);
        for row in top.min(bottom)..=top.max(bottom) {
            if self.grid[row][cx] == ' ' {
                self.grid[row][cx] = ch;
            }
        }
    }

    fn render(self, header: &str) -> String {
        let mut out = String::new();
        out.push_str(header);
        out.push('\n');
        for row in self.grid {
            out.push_str(&row.into_iter().collect::<String>());
            out.push('\n');
        }
        out
    }
}

fn x_of(ds: NaiveDateTime) -> f64 {
    ds.and_utc().timestamp() as f64
}

fn date_label(x: f64) -> String {
    chrono::DateTime::from_timestamp(x as i64, 0)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "?".to_string())
}

fn x_range(dates: impl Iterator<Item = NaiveDateTime>) -> Option<(f64, f64)> {
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    for d in dates {
        let x = x_of(d);
        min_x = min_x.min(x);
        max_x = max_x.max(x);
    }
    if min_x.is_finite() && max_x.is_finite() && max_x > min_x {
        Some((min_x, max_x))
    } else {
        None
    }
}

fn y_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for y in values.filter(|v| v.is_finite()) {
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
