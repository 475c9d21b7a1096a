//! Chart rendering using Plotters
//!
//! Every chart is drawn onto its own drawing area: either an in-memory RGB
//! buffer (for document export) or a PNG file.

use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use tracing::{debug, info};

use crate::aggregate::{Histogram, StackedShares};
use crate::bucket::{format_rate, BucketGrid, CHARGE_BANDS, TENURE_BANDS};
use crate::charts::{Chart, ChartBody, ChartKind, CountPanel};

/// Colors per churn status, in the order statuses first appear
const HUE_COLORS: [RGBColor; 2] = [RGBColor(31, 119, 180), RGBColor(255, 127, 14)];

/// Fill for heatmap cells without rows
const NO_DATA_FILL: RGBColor = RGBColor(210, 210, 210);

const NO_DATA_TEXT: RGBColor = RGBColor(120, 120, 120);

/// A chart drawn into an owned RGB pixel buffer
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedChart {
    pub kind: ChartKind,
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Row-major RGB, 3 bytes per pixel
    pub pixels: Vec<u8>,
}

impl RenderedChart {
    pub fn is_valid(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.pixels.len() == self.width as usize * self.height as usize * 3
    }
}

fn hue_color(index: usize) -> RGBColor {
    HUE_COLORS[index % HUE_COLORS.len()]
}

/// White-to-red scale for rates in [0,1]
fn heat_color(rate: f64) -> RGBColor {
    let t = rate.clamp(0.0, 1.0);
    let lerp = |from: u8, to: u8| (from as f64 + (to as f64 - from as f64) * t).round() as u8;
    RGBColor(lerp(255, 103), lerp(245, 0), lerp(240, 13))
}

fn text_style(size: u32, vertical: VPos) -> TextStyle<'static> {
    TextStyle::from(("sans-serif", size).into_font()).pos(Pos::new(HPos::Center, vertical))
}

/// Label for an integer tick on a category axis
fn category_label(categories: &[String], x: f64) -> String {
    let nearest = x.round();
    if (x - nearest).abs() > 1e-6 || nearest < 0.0 {
        return String::new();
    }
    categories.get(nearest as usize).cloned().unwrap_or_default()
}

/// Render a chart into an in-memory RGB buffer
pub fn render_chart(chart: &Chart) -> crate::Result<RenderedChart> {
    let (width, height) = chart.size;
    let mut pixels = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut pixels, (width, height)).into_drawing_area();
        draw_chart(&root, chart)?;
        root.present()?;
    }
    debug!(chart = %chart.title, width, height, "chart rendered");

    Ok(RenderedChart {
        kind: chart.kind,
        title: chart.title.clone(),
        width,
        height,
        pixels,
    })
}

/// Render a chart and save it as a PNG file
pub fn save_chart_png(chart: &Chart, output_path: &Path) -> crate::Result<()> {
    let root = BitMapBackend::new(output_path, chart.size).into_drawing_area();
    draw_chart(&root, chart)?;
    root.present()?;
    info!(chart = %chart.title, path = %output_path.display(), "chart saved");
    Ok(())
}

/// Draw a chart onto any Plotters backend
pub fn draw_chart<DB>(root: &DrawingArea<DB, Shift>, chart: &Chart) -> crate::Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    match &chart.body {
        ChartBody::Counts(panel) => draw_count_panel(root, panel, 22)?,
        ChartBody::Panels { columns, panels } => {
            let columns = (*columns).max(1);
            let rows = (panels.len() + columns - 1) / columns;
            let area = root.titled(&chart.title, ("sans-serif", 26))?;
            for (cell, panel) in area.split_evenly((rows.max(1), columns)).iter().zip(panels) {
                draw_count_panel(cell, panel, 16)?;
            }
        }
        ChartBody::Stacked {
            x_label,
            y_label,
            shares,
        } => draw_stacked(root, &chart.title, x_label, y_label, shares)?,
        ChartBody::Histogram { x_label, histogram } => {
            draw_histogram(root, &chart.title, x_label, histogram)?
        }
        ChartBody::Heatmap(grid) => draw_heatmap(root, &chart.title, grid)?,
    }

    Ok(())
}

fn draw_no_data<DB>(area: &DrawingArea<DB, Shift>) -> crate::Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let (width, height) = area.dim_in_pixel();
    area.draw(&Text::new(
        "No data",
        ((width / 2) as i32, (height / 2) as i32),
        text_style(18, VPos::Center).color(&NO_DATA_TEXT),
    ))?;
    Ok(())
}

/// Grouped bar chart: one bar per churn status within each category
fn draw_count_panel<DB>(
    area: &DrawingArea<DB, Shift>,
    panel: &CountPanel,
    caption_size: u32,
) -> crate::Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let counts = &panel.counts;
    let n = counts.categories.len().max(1);
    let y_max = counts.max_count().max(1) as f64 * 1.15;

    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, ("sans-serif", caption_size))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), 0f64..y_max)?;

    let x_formatter = |x: &f64| category_label(&counts.categories, *x);
    let y_formatter = |y: &f64| format!("{:.0}", y);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&x_formatter)
        .y_label_formatter(&y_formatter)
        .x_desc(panel.x_label.as_str())
        .y_desc(panel.y_label.as_str())
        .axis_desc_style(("sans-serif", 14))
        .draw()?;

    if counts.is_empty() {
        return draw_no_data(area);
    }

    let bar_width = 0.8 / counts.hues.len() as f64;
    for (h, hue) in counts.hues.iter().enumerate() {
        let color = hue_color(h);
        let left = |c: usize| c as f64 - 0.4 + h as f64 * bar_width;

        chart
            .draw_series(counts.counts.iter().enumerate().map(|(c, row)| {
                Rectangle::new(
                    [(left(c), 0.0), (left(c) + bar_width, row[h] as f64)],
                    color.filled(),
                )
            }))?
            .label(hue.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));

        if panel.bar_labels {
            chart.draw_series(counts.counts.iter().enumerate().map(|(c, row)| {
                Text::new(
                    row[h].to_string(),
                    (left(c) + bar_width / 2.0, row[h] as f64),
                    text_style(12, VPos::Bottom),
                )
            }))?;
        }
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font(("sans-serif", 12))
        .draw()?;

    Ok(())
}

/// 100% stacked bars with a percentage label per segment
fn draw_stacked<DB>(
    area: &DrawingArea<DB, Shift>,
    title: &str,
    x_label: &str,
    y_label: &str,
    shares: &StackedShares,
) -> crate::Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let n = shares.categories.len().max(1);

    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), 0f64..100f64)?;

    let x_formatter = |x: &f64| category_label(&shares.categories, *x);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&x_formatter)
        .x_desc(x_label)
        .y_desc(y_label)
        .axis_desc_style(("sans-serif", 14))
        .draw()?;

    if shares.is_empty() {
        return draw_no_data(area);
    }

    for (h, hue) in shares.hues.iter().enumerate() {
        let color = hue_color(h);
        let segments: Vec<(f64, f64, f64)> = shares
            .percent
            .iter()
            .enumerate()
            .map(|(c, row)| {
                let bottom: f64 = row[..h].iter().sum();
                (c as f64, bottom, row[h])
            })
            .collect();

        chart
            .draw_series(segments.iter().map(|&(x, bottom, pct)| {
                Rectangle::new([(x - 0.3, bottom), (x + 0.3, bottom + pct)], color.filled())
            }))?
            .label(hue.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));

        chart.draw_series(segments.iter().filter(|s| s.2 > 0.0).map(|&(x, bottom, pct)| {
            Text::new(
                format!("{:.1}%", pct),
                (x, bottom + pct / 2.0),
                text_style(13, VPos::Center),
            )
        }))?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font(("sans-serif", 12))
        .draw()?;

    Ok(())
}

/// Overlaid per-status histograms on shared bins
fn draw_histogram<DB>(
    area: &DrawingArea<DB, Shift>,
    title: &str,
    x_label: &str,
    histogram: &Histogram,
) -> crate::Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let (x_min, x_max) = match (histogram.edges.first(), histogram.edges.last()) {
        (Some(&first), Some(&last)) if last > first => (first, last),
        _ => (0.0, 1.0),
    };
    let y_max = histogram.max_count().max(1) as f64 * 1.1;

    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, 0f64..y_max)?;

    let y_formatter = |y: &f64| format!("{:.0}", y);
    chart
        .configure_mesh()
        .y_label_formatter(&y_formatter)
        .x_desc(x_label)
        .y_desc("Count")
        .axis_desc_style(("sans-serif", 14))
        .draw()?;

    if histogram.is_empty() {
        return draw_no_data(area);
    }

    for (h, hue) in histogram.hues.iter().enumerate() {
        let color = hue_color(h);
        let bars = histogram.counts[h]
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .map(|(bin, &count)| {
                Rectangle::new(
                    [
                        (histogram.edges[bin], 0.0),
                        (histogram.edges[bin + 1], count as f64),
                    ],
                    color.mix(0.5).filled(),
                )
            });

        chart
            .draw_series(bars)?
            .label(hue.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font(("sans-serif", 12))
        .draw()?;

    Ok(())
}

/// Annotated grid of churn rates; empty cells are grey and marked "n/a"
fn draw_heatmap<DB>(area: &DrawingArea<DB, Shift>, title: &str, grid: &BucketGrid) -> crate::Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let rows = grid.rows().len();
    let columns = grid.columns().len();

    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(-0.5f64..(columns as f64 - 0.5), -0.5f64..(rows as f64 - 0.5))?;

    let column_labels: Vec<String> = grid.columns().iter().map(|s| s.to_string()).collect();
    // First tenure band is drawn at the top
    let row_labels: Vec<String> = grid.rows().iter().rev().map(|s| s.to_string()).collect();
    let x_formatter = |x: &f64| category_label(&column_labels, *x);
    let y_formatter = |y: &f64| category_label(&row_labels, *y);
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(columns)
        .y_labels(rows)
        .x_label_formatter(&x_formatter)
        .y_label_formatter(&y_formatter)
        .x_desc(CHARGE_BANDS.name)
        .y_desc(TENURE_BANDS.name)
        .axis_desc_style(("sans-serif", 14))
        .draw()?;

    let cells: Vec<(f64, f64, Option<f64>)> = (0..rows)
        .flat_map(|row| {
            (0..columns).map(move |column| {
                let y = (rows - 1 - row) as f64;
                (column as f64, y, grid.rate(row, column))
            })
        })
        .collect();

    chart.draw_series(cells.iter().map(|&(x, y, rate)| {
        let fill = match rate {
            Some(rate) => heat_color(rate),
            None => NO_DATA_FILL,
        };
        Rectangle::new([(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)], fill.filled())
    }))?;

    chart.draw_series(cells.iter().map(|&(x, y, rate)| {
        let style = match rate {
            Some(rate) if rate > 0.6 => text_style(15, VPos::Center).color(&WHITE),
            Some(_) => text_style(15, VPos::Center),
            None => text_style(15, VPos::Center).color(&NO_DATA_TEXT),
        };
        Text::new(format_rate(rate), (x, y), style)
    }))?;

    Ok(())
}
