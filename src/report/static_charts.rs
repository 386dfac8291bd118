//! Static PNG charts drawn with plotters.
//!
//! Each chart is rendered independently; a failure is reported for that
//! chart and the next one is still attempted.

use super::ChartOutcome;
use crate::analysis::{category_green_adoption, category_mean_emissions, rating_distribution};
use crate::error::RenderError;
use crate::models::Dataset;
use indicatif::{ProgressBar, ProgressStyle};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const EMISSIONS_ANALYSIS: &str = "emissions_analysis.png";
pub const RATING_DISTRIBUTION: &str = "rating_distribution.png";
pub const CATEGORY_ANALYSIS: &str = "category_analysis.png";

const FONT: &str = "sans-serif";
const BAR_COLOR: RGBColor = RGBColor(0x46, 0x82, 0xB4);

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;
type DrawResult = Result<(), Box<dyn std::error::Error>>;

/// Options for static chart rendering.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Pixels per inch of figure size.
    pub dpi: u32,
    /// Show a progress bar while rendering.
    pub show_progress: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            dpi: 100,
            show_progress: false,
        }
    }
}

/// Font sizing derived from the output resolution.
#[derive(Debug, Clone, Copy)]
struct ChartStyle {
    dpi: u32,
}

impl ChartStyle {
    /// Convert a point size to pixels.
    fn px(&self, points: f64) -> f64 {
        points * self.dpi as f64 / 72.0
    }

    fn px_u32(&self, points: f64) -> u32 {
        self.px(points).round() as u32
    }
}

struct StaticChart {
    file_name: &'static str,
    /// Figure size in inches.
    figure: (f64, f64),
    draw: fn(&Area<'_>, &Dataset, ChartStyle) -> DrawResult,
}

const STATIC_CHARTS: [StaticChart; 3] = [
    StaticChart {
        file_name: EMISSIONS_ANALYSIS,
        figure: (15.0, 12.0),
        draw: draw_emissions_analysis,
    },
    StaticChart {
        file_name: RATING_DISTRIBUTION,
        figure: (10.0, 6.0),
        draw: draw_rating_distribution,
    },
    StaticChart {
        file_name: CATEGORY_ANALYSIS,
        figure: (15.0, 6.0),
        draw: draw_category_analysis,
    },
];

/// Render every static chart into `out_dir`.
pub fn render_static_charts(
    dataset: &Dataset,
    out_dir: &Path,
    options: &RenderOptions,
) -> Vec<ChartOutcome> {
    let progress = if options.show_progress {
        let pb = ProgressBar::new(STATIC_CHARTS.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    } else {
        ProgressBar::hidden()
    };

    let style = ChartStyle { dpi: options.dpi };
    let mut outcomes = Vec::with_capacity(STATIC_CHARTS.len());

    for chart in &STATIC_CHARTS {
        progress.set_message(chart.file_name);
        let result = render_chart(chart, dataset, out_dir, style);

        match &result {
            Ok(path) => info!("Chart written: {}", path.display()),
            Err(e) => warn!("Chart {} failed: {}", chart.file_name, e),
        }

        outcomes.push(ChartOutcome {
            file_name: chart.file_name,
            result,
        });
        progress.inc(1);
    }

    progress.finish_and_clear();
    outcomes
}

fn render_chart(
    chart: &StaticChart,
    dataset: &Dataset,
    out_dir: &Path,
    style: ChartStyle,
) -> Result<PathBuf, RenderError> {
    if dataset.is_empty() {
        return Err(RenderError::NoData {
            chart: chart.file_name.to_string(),
        });
    }

    fs::create_dir_all(out_dir).map_err(|source| RenderError::Io {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let path = out_dir.join(chart.file_name);
    let size = (
        (chart.figure.0 * style.dpi as f64).round() as u32,
        (chart.figure.1 * style.dpi as f64).round() as u32,
    );
    debug!("Rendering {} at {}x{}", chart.file_name, size.0, size.1);

    draw_to_file(chart, &path, size, dataset, style).map_err(|e| RenderError::Draw {
        chart: chart.file_name.to_string(),
        message: e.to_string(),
    })?;

    Ok(path)
}

fn draw_to_file(
    chart: &StaticChart,
    path: &Path,
    size: (u32, u32),
    dataset: &Dataset,
    style: ChartStyle,
) -> DrawResult {
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    (chart.draw)(&root, dataset, style)?;
    root.present()?;
    Ok(())
}

fn hosting_color(green: bool) -> RGBColor {
    if green {
        GREEN
    } else {
        RED
    }
}

/// Box plot, scatter, rating bars and category bars on a 2x2 grid.
fn draw_emissions_analysis(root: &Area<'_>, dataset: &Dataset, style: ChartStyle) -> DrawResult {
    let root = root.titled(
        "Website Carbon Emissions Analysis",
        (FONT, style.px(16.0)).into_font().style(FontStyle::Bold),
    )?;
    let panels = root.split_evenly((2, 2));

    draw_hosting_boxplot(&panels[0], dataset, style)?;
    draw_size_scatter(&panels[1], dataset, style)?;

    let ratings = rating_distribution(dataset);
    let labels: Vec<String> = ratings.iter().map(|s| s.rating.to_string()).collect();
    let counts: Vec<f64> = ratings.iter().map(|s| s.count as f64).collect();
    draw_bars(
        &panels[2],
        &BarChart {
            caption: "Carbon Rating Distribution",
            x_desc: "Rating",
            y_desc: "Number of Websites",
            labels: &labels,
            values: &counts,
            colors: &[],
            annotations: &[],
        },
        style,
    )?;

    let categories = category_mean_emissions(dataset);
    let labels: Vec<String> = categories.iter().map(|(c, _)| c.to_string()).collect();
    let means: Vec<f64> = categories.iter().map(|(_, m)| *m).collect();
    draw_bars(
        &panels[3],
        &BarChart {
            caption: "Average Emissions by Category",
            x_desc: "Category",
            y_desc: "CO2 Emissions (grams)",
            labels: &labels,
            values: &means,
            colors: &[],
            annotations: &[],
        },
        style,
    )?;

    Ok(())
}

fn draw_hosting_boxplot(area: &Area<'_>, dataset: &Dataset, style: ChartStyle) -> DrawResult {
    let hosting = [(true, "Green Hosting"), (false, "Non-Green Hosting")];
    let groups: Vec<(String, bool, Quartiles)> = hosting
        .into_iter()
        .filter_map(|(green, label)| {
            let values: Vec<f64> = dataset
                .iter()
                .filter(|r| r.green == green)
                .map(|r| r.gco2e)
                .collect();
            (!values.is_empty()).then(|| (label.to_string(), green, Quartiles::new(&values)))
        })
        .collect();

    let labels: Vec<String> = groups.iter().map(|(label, _, _)| label.clone()).collect();
    let y_max = dataset
        .iter()
        .map(|r| r.gco2e as f32)
        .fold(0f32, f32::max)
        .max(1.0)
        * 1.05;

    let mut chart = ChartBuilder::on(area)
        .caption("CO2 Emissions by Hosting Type", (FONT, style.px(12.0)))
        .margin(style.px_u32(8.0))
        .x_label_area_size(style.px_u32(24.0))
        .y_label_area_size(style.px_u32(40.0))
        .build_cartesian_2d(labels[..].into_segmented(), 0f32..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_label_formatter(&segment_label)
        .y_desc("CO2 Emissions (grams)")
        .label_style((FONT, style.px(9.0)))
        .draw()?;

    chart.draw_series(groups.iter().map(|(label, green, quartiles)| {
        Boxplot::new_vertical(SegmentValue::CenterOf(label), quartiles)
            .width(style.px_u32(60.0))
            .whisker_width(0.5)
            .style(hosting_color(*green).stroke_width(2))
    }))?;

    Ok(())
}

fn draw_size_scatter(area: &Area<'_>, dataset: &Dataset, style: ChartStyle) -> DrawResult {
    let x_max = dataset.iter().map(|r| r.size_mb).fold(0f64, f64::max).max(1.0) * 1.05;
    let y_max = dataset.iter().map(|r| r.gco2e).fold(0f64, f64::max).max(1.0) * 1.05;

    let mut chart = ChartBuilder::on(area)
        .caption("Size vs Emissions", (FONT, style.px(12.0)))
        .margin(style.px_u32(8.0))
        .x_label_area_size(style.px_u32(24.0))
        .y_label_area_size(style.px_u32(40.0))
        .build_cartesian_2d(0f64..x_max, 0f64..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Website Size (MB)")
        .y_desc("CO2 Emissions (grams)")
        .label_style((FONT, style.px(9.0)))
        .draw()?;

    let radius = style.px_u32(2.5);
    chart.draw_series(dataset.iter().map(|r| {
        Circle::new(
            (r.size_mb, r.gco2e),
            radius,
            hosting_color(r.green).mix(0.6).filled(),
        )
    }))?;

    Ok(())
}

/// Input for a categorical bar chart.
struct BarChart<'a> {
    caption: &'a str,
    x_desc: &'a str,
    y_desc: &'a str,
    labels: &'a [String],
    values: &'a [f64],
    /// Per-bar colors; falls back to a single color when empty.
    colors: &'a [RGBColor],
    /// Text drawn above each bar; skipped when empty.
    annotations: &'a [String],
}

fn draw_bars(area: &Area<'_>, bars: &BarChart<'_>, style: ChartStyle) -> DrawResult {
    let labels = bars.labels;
    if labels.is_empty() {
        return Ok(());
    }
    let y_max = bars.values.iter().copied().fold(0f64, f64::max).max(1.0) * 1.15;

    let mut chart = ChartBuilder::on(area)
        .caption(bars.caption, (FONT, style.px(12.0)))
        .margin(style.px_u32(8.0))
        .x_label_area_size(style.px_u32(28.0))
        .y_label_area_size(style.px_u32(40.0))
        .build_cartesian_2d(labels.into_segmented(), 0f64..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(labels.len())
        .x_label_formatter(&segment_label)
        .x_desc(bars.x_desc)
        .y_desc(bars.y_desc)
        .label_style((FONT, style.px(9.0)))
        .draw()?;

    let gap = style.px_u32(6.0);
    chart.draw_series(bars.values.iter().take(labels.len()).enumerate().map(|(i, &value)| {
        let color = bars.colors.get(i).copied().unwrap_or(BAR_COLOR);
        let (left, right) = bar_edges(labels, i);
        let mut bar = Rectangle::new([(left, 0.0), (right, value)], color.filled());
        bar.set_margin(0, 0, gap, gap);
        bar
    }))?;

    if !bars.annotations.is_empty() {
        let text_style = TextStyle::from((FONT, style.px(9.0)).into_font())
            .pos(Pos::new(HPos::Center, VPos::Bottom));
        chart.draw_series(labels.iter().zip(bars.annotations).zip(bars.values).map(
            |((label, text), &value)| {
                EmptyElement::at((SegmentValue::CenterOf(label), value + y_max * 0.01))
                    + Text::new(text.clone(), (0, 0), text_style.clone())
            },
        ))?;
    }

    Ok(())
}

/// Segment edges of the `i`th bar; the last bar closes on the axis end.
fn bar_edges(labels: &[String], i: usize) -> (SegmentValue<&String>, SegmentValue<&String>) {
    let right = labels
        .get(i + 1)
        .map_or(SegmentValue::Last, SegmentValue::Exact);
    (SegmentValue::Exact(&labels[i]), right)
}

/// Tick text for a label-slice axis.
fn segment_label(value: &SegmentValue<&String>) -> String {
    match value {
        SegmentValue::Exact(label) | SegmentValue::CenterOf(label) => label.to_string(),
        SegmentValue::Last => String::new(),
    }
}

/// Rating counts with fixed per-rating colors and count/share labels.
fn draw_rating_distribution(root: &Area<'_>, dataset: &Dataset, style: ChartStyle) -> DrawResult {
    let ratings = rating_distribution(dataset);
    let labels: Vec<String> = ratings.iter().map(|s| s.rating.to_string()).collect();
    let counts: Vec<f64> = ratings.iter().map(|s| s.count as f64).collect();
    let colors: Vec<RGBColor> = ratings
        .iter()
        .map(|s| {
            let (r, g, b) = s.rating.color_rgb();
            RGBColor(r, g, b)
        })
        .collect();
    let annotations: Vec<String> = ratings
        .iter()
        .map(|s| format!("{} ({:.1}%)", s.count, s.pct))
        .collect();

    draw_bars(
        root,
        &BarChart {
            caption: "Distribution of Carbon Intensity Ratings",
            x_desc: "Carbon Rating",
            y_desc: "Number of Websites",
            labels: &labels,
            values: &counts,
            colors: &colors,
            annotations: &annotations,
        },
        style,
    )
}

/// Mean emissions (ascending) beside green adoption (descending) per category.
fn draw_category_analysis(root: &Area<'_>, dataset: &Dataset, style: ChartStyle) -> DrawResult {
    let panels = root.split_evenly((1, 2));

    let emissions = category_mean_emissions(dataset);
    let labels: Vec<String> = emissions.iter().map(|(c, _)| c.to_string()).collect();
    let means: Vec<f64> = emissions.iter().map(|(_, m)| *m).collect();
    draw_bars(
        &panels[0],
        &BarChart {
            caption: "Average CO2 Emissions by Category",
            x_desc: "Category",
            y_desc: "CO2 Emissions (grams)",
            labels: &labels,
            values: &means,
            colors: &[],
            annotations: &[],
        },
        style,
    )?;

    let adoption = category_green_adoption(dataset);
    let labels: Vec<String> = adoption.iter().map(|(c, _)| c.to_string()).collect();
    let shares: Vec<f64> = adoption.iter().map(|(_, p)| *p).collect();
    draw_bars(
        &panels[1],
        &BarChart {
            caption: "Green Hosting Adoption by Category",
            x_desc: "Category",
            y_desc: "Green Hosting Percentage",
            labels: &labels,
            values: &shares,
            colors: &[GREEN],
            annotations: &[],
        },
        style,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::synthesize;
    use tempfile::TempDir;

    #[test]
    fn test_empty_dataset_fails_every_chart() {
        let dir = TempDir::new().unwrap();
        let options = RenderOptions::default();
        let outcomes = render_static_charts(&Dataset::default(), dir.path(), &options);

        assert_eq!(outcomes.len(), 3);
        for outcome in &outcomes {
            assert!(matches!(outcome.result, Err(RenderError::NoData { .. })));
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unwritable_directory_is_reported_per_chart() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("plots");
        std::fs::write(&blocker, "not a directory").unwrap();

        let options = RenderOptions::default();
        let outcomes = render_static_charts(&synthesize(50, 42), &blocker, &options);

        let names: Vec<&str> = outcomes.iter().map(|o| o.file_name).collect();
        assert_eq!(names, vec![EMISSIONS_ANALYSIS, RATING_DISTRIBUTION, CATEGORY_ANALYSIS]);
        for outcome in &outcomes {
            assert!(matches!(outcome.result, Err(RenderError::Io { .. })));
        }
    }

    fn png_dimensions(bytes: &[u8]) -> (u32, u32) {
        let be = |at: usize| {
            u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
        };
        (be(16), be(20))
    }

    #[test]
    fn test_render_writes_every_chart() {
        let dir = TempDir::new().unwrap();
        let options = RenderOptions::default();
        let outcomes = render_static_charts(&synthesize(200, 42), dir.path(), &options);

        assert_eq!(outcomes.len(), STATIC_CHARTS.len());
        for (outcome, chart) in outcomes.iter().zip(&STATIC_CHARTS) {
            let path = outcome.result.as_ref().unwrap();
            assert_eq!(path, &dir.path().join(chart.file_name));

            let bytes = std::fs::read(path).unwrap();
            assert!(bytes.starts_with(b"\x89PNG\r\n\x1a\n"));
            let expected = (
                (chart.figure.0 * options.dpi as f64) as u32,
                (chart.figure.1 * options.dpi as f64) as u32,
            );
            assert_eq!(png_dimensions(&bytes), expected);
        }
    }

    #[test]
    fn test_bars_fill_the_axis_evenly() {
        let labels: Vec<String> = ["A+", "A", "B", "C", "D"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let axis = labels[..].into_segmented();
        let width = (0, 500);

        for i in 0..labels.len() {
            let (left, right) = bar_edges(&labels, i);
            assert_eq!(axis.map(&left, width), 100 * i as i32);
            assert_eq!(axis.map(&right, width), 100 * (i as i32 + 1));
        }
    }

    #[test]
    fn test_segment_label() {
        let label = "Retail".to_string();
        assert_eq!(segment_label(&SegmentValue::CenterOf(&label)), "Retail");
        assert_eq!(segment_label(&SegmentValue::Exact(&label)), "Retail");
        assert_eq!(segment_label(&SegmentValue::Last), "");
    }

    #[test]
    fn test_chart_style_scales_with_dpi() {
        let low = ChartStyle { dpi: 72 };
        let high = ChartStyle { dpi: 144 };
        assert_eq!(low.px(10.0), 10.0);
        assert_eq!(high.px(10.0), 20.0);
        assert_eq!(high.px_u32(12.0), 24);
    }

    #[test]
    fn test_figure_sizes() {
        let sizes: Vec<(f64, f64)> = STATIC_CHARTS.iter().map(|c| c.figure).collect();
        assert_eq!(sizes, vec![(15.0, 12.0), (10.0, 6.0), (15.0, 6.0)]);
    }
}
