use crate::metrics::align::AlignedTrend;
use crate::metrics::rate::StrainRate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Style {
    pub width: f32,
    pub dash: Option<[f32; 2]>,
    pub color: Color,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub const RED: Color = Color(0xFF0000);
    pub const BLUE: Color = Color(0x0000FF);

    pub fn rgb(&self) -> (u8, u8, u8) {
        (
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Series {
    Line(LineSeries),
}

impl Series {
    pub fn points(&self) -> &[[f64; 2]] {
        match self {
            Series::Line(line) => &line.points,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Figure {
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
    pub series: Vec<Series>,
}

impl Figure {
    pub fn new(title: impl Into<Option<String>>) -> Self {
        Self {
            title: title.into(),
            x: Axis { label: None },
            y: Axis { label: None },
            series: Vec::new(),
        }
    }

    pub fn with_axes(mut self, x: &str, y: &str) -> Self {
        self.x.label = Some(x.into());
        self.y.label = Some(y.into());
        self
    }

    pub fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }

    /// `(x_min, x_max, y_min, y_max)` over every series, `None` when there are no points.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut points = self.series.iter().flat_map(|s| s.points().iter());
        let first = points.next()?;
        let init = (first[0], first[0], first[1], first[1]);
        Some(points.fold(init, |(x0, x1, y0, y1), p| {
            (x0.min(p[0]), x1.max(p[0]), y0.min(p[1]), y1.max(p[1]))
        }))
    }
}

pub fn decimate_points(points: &[[f64; 2]], max_points: usize) -> Vec<[f64; 2]> {
    if points.len() <= max_points {
        return points.to_vec();
    }
    let bucket_size = points.len() as f64 / max_points as f64;
    let mut result = Vec::with_capacity(max_points);
    for i in 0..max_points {
        let start = (i as f64 * bucket_size).floor() as usize;
        if start >= points.len() {
            break;
        }
        result.push(points[start]);
    }
    result
}

fn line(name: &str, points: Vec<[f64; 2]>, width: f32, dash: Option<[f32; 2]>, color: Color) -> Series {
    Series::Line(LineSeries {
        name: name.into(),
        points,
        style: Style { width, dash, color },
    })
}

/// Mean curve with dashed mean±std bounds.
pub fn figure_from_trend_limit(trend: &AlignedTrend, max_points: usize) -> Figure {
    let color = match trend.channel {
        crate::dataset::Channel::Length => Color::RED,
        crate::dataset::Channel::Width => Color::BLUE,
    };
    let collect = |f: &dyn Fn(f64, f64) -> f64| -> Vec<[f64; 2]> {
        let points: Vec<[f64; 2]> = trend.points().map(|(t, m, s)| [t, f(m, s)]).collect();
        decimate_points(&points, max_points)
    };
    let mut fig = Figure::new(Some(format!(
        "Average {} over {} cycles",
        trend.channel,
        trend.cycles.len()
    )))
    .with_axes("Time within cycle (s)", "Strain");
    fig.add_series(line("mean", collect(&|m, _| m), 2.0, None, color));
    fig.add_series(line("mean + std", collect(&|m, s| m + s), 1.0, Some([4.0, 4.0]), color));
    fig.add_series(line("mean - std", collect(&|m, s| m - s), 1.0, Some([4.0, 4.0]), color));
    fig
}

pub fn figure_from_trend(trend: &AlignedTrend) -> Figure {
    figure_from_trend_limit(trend, 2048)
}

/// Length rate in red, width rate in blue.
pub fn figure_from_strain_rate(rate: &StrainRate) -> Figure {
    let to_points = |values: &[f64]| -> Vec<[f64; 2]> {
        rate.time
            .iter()
            .zip(values)
            .map(|(&t, &v)| [t, v])
            .collect()
    };
    let mut fig = Figure::new(Some("Strain rate".to_string()))
        .with_axes("Time within cycle (s)", "Strain rate (1/s)");
    fig.add_series(line("length", to_points(&rate.length_rate), 2.0, None, Color::RED));
    fig.add_series(line("width", to_points(&rate.width_rate), 2.0, None, Color::BLUE));
    fig
}
