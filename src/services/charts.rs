//! Server-side chart rendering.
//!
//! Charts are described with `charming` and rendered to SVG by its ECharts
//! image renderer, then handed to templates as base64 so they can be inlined
//! with a `data:` URI. Each render gets a fresh renderer, so identical
//! aggregations give byte-identical images.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use charming::component::{Axis, Grid, Title};
use charming::element::{AxisLabel, AxisType, JsFunction, Label};
use charming::series::{bar, Pie};
use charming::{Chart, ImageRenderer};

use crate::services::aggregation::{CategoryTotal, PeriodTotal};

const PIE_WIDTH: u32 = 600;
const PIE_HEIGHT: u32 = 600;

const BAR_WIDTH: u32 = 1000;
const BAR_HEIGHT: u32 = 500;

const EMPTY_CHART_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="1000" height="500" viewBox="0 0 1000 500"><rect width="100%" height="100%" fill="#ffffff"/><text class="empty" x="500" y="250" text-anchor="middle" dominant-baseline="middle" font-size="20" fill="#555555" font-family="DejaVu Sans, Arial, sans-serif">No data available</text></svg>"##;

/// An encoded chart ready for inline embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartImage {
    base64: String,
}

impl ChartImage {
    pub const MIME_TYPE: &'static str = "image/svg+xml";

    fn from_svg(svg: &str) -> Self {
        Self {
            base64: STANDARD.encode(svg.as_bytes()),
        }
    }

    pub fn base64(&self) -> &str {
        &self.base64
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", Self::MIME_TYPE, self.base64)
    }
}

/// Pie chart with one slice per category, labelled with its share of the total.
/// Only positive totals can be drawn as slices; with none left the placeholder
/// is returned.
pub fn render_pie_chart(categories: &[CategoryTotal]) -> ChartImage {
    match pie_chart(categories) {
        Some(chart) => render(&chart, PIE_WIDTH, PIE_HEIGHT),
        None => render_empty_chart(),
    }
}

/// Bar chart with one bar per period, in the order given. Negative totals
/// hang below the zero line.
pub fn render_bar_chart(periods: &[PeriodTotal], title: &str) -> ChartImage {
    match bar_chart(periods, title) {
        Some(chart) => render(&chart, BAR_WIDTH, BAR_HEIGHT),
        None => render_empty_chart(),
    }
}

/// Placeholder shown whenever there is nothing to plot.
pub fn render_empty_chart() -> ChartImage {
    ChartImage::from_svg(EMPTY_CHART_SVG)
}

fn pie_chart(categories: &[CategoryTotal]) -> Option<Chart> {
    let slices: Vec<(f64, String)> = categories
        .iter()
        .filter(|c| c.total > 0.0)
        .map(|c| (c.total, c.category.clone()))
        .collect();
    if slices.is_empty() {
        return None;
    }

    Some(
        Chart::new()
            .title(Title::new().text("Spending by Category").left("center"))
            .series(
                Pie::new()
                    .name("Spending")
                    .radius("60%")
                    .center(vec!["50%", "55%"])
                    .label(Label::new().show(true).formatter(percent_label()))
                    .data(slices),
            ),
    )
}

fn bar_chart(periods: &[PeriodTotal], title: &str) -> Option<Chart> {
    if periods.is_empty() {
        return None;
    }

    let labels: Vec<String> = periods.iter().map(|p| p.label.clone()).collect();
    let values: Vec<f64> = periods.iter().map(|p| p.total).collect();

    Some(
        Chart::new()
            .title(Title::new().text(title).left("center"))
            .grid(
                Grid::new()
                    .left("3%")
                    .right("8%")
                    .bottom("3%")
                    .top(60)
                    .contain_label(true),
            )
            .x_axis(
                Axis::new()
                    .type_(AxisType::Category)
                    .name("Time Period")
                    .axis_label(AxisLabel::new().rotate(45.0))
                    .data(labels),
            )
            .y_axis(Axis::new().type_(AxisType::Value).name("Amount ($)"))
            .series(bar::Bar::new().name("Spending").data(values)),
    )
}

/// "<category> (<share>%)" with one decimal.
fn percent_label() -> JsFunction {
    JsFunction::new_with_args(
        "params",
        "return params.name + ' (' + params.percent.toFixed(1) + '%)';",
    )
}

fn render(chart: &Chart, width: u32, height: u32) -> ChartImage {
    let mut renderer = ImageRenderer::new(width, height);
    match renderer.render(chart) {
        Ok(svg) => ChartImage::from_svg(&svg),
        Err(e) => {
            tracing::error!("Failed to render chart: {:?}", e);
            render_empty_chart()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn decode(image: &ChartImage) -> String {
        String::from_utf8(STANDARD.decode(image.base64()).unwrap()).unwrap()
    }

    fn category(name: &str, total: f64) -> CategoryTotal {
        CategoryTotal {
            category: name.into(),
            total,
            expense_count: 1,
        }
    }

    fn period(label: &str, month: u32, total: f64) -> PeriodTotal {
        PeriodTotal {
            period_start: NaiveDate::from_ymd_opt(2024, month, 1).unwrap(),
            label: label.into(),
            total,
            expense_count: 1,
        }
    }

    #[test]
    fn test_data_uri() {
        let image = render_empty_chart();
        assert!(image
            .data_uri()
            .starts_with("data:image/svg+xml;base64,"));
    }

    #[test]
    fn test_empty_chart() {
        let svg = decode(&render_empty_chart());
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("No data available"));
    }

    #[test]
    fn test_pie_chart_options() {
        let options = pie_chart(&[category("Rent", 75.0), category("Food", 25.0)])
            .unwrap()
            .to_string();

        assert!(options.contains("Spending by Category"));
        assert!(options.contains("\"Rent\""));
        assert!(options.contains("\"Food\""));
        assert!(options.contains("toFixed(1)"));
    }

    #[test]
    fn test_pie_chart_skips_non_positive_slices() {
        let options = pie_chart(&[
            category("Food", 10.0),
            category("Refund", -5.0),
            category("Zero", 0.0),
            category("Rent", 30.0),
        ])
        .unwrap()
        .to_string();
        assert!(!options.contains("Refund"));
        assert!(!options.contains("Zero"));

        assert!(pie_chart(&[]).is_none());
        assert!(pie_chart(&[category("Refund", -5.0)]).is_none());
    }

    #[test]
    fn test_pie_chart_without_positive_totals_is_placeholder() {
        assert_eq!(render_pie_chart(&[]), render_empty_chart());
        assert_eq!(
            render_pie_chart(&[category("Refund", -5.0), category("Zero", 0.0)]),
            render_empty_chart()
        );
    }

    #[test]
    fn test_pie_chart_renders_labels() {
        let svg = decode(&render_pie_chart(&[
            category("Rent", 75.0),
            category("Food", 25.0),
        ]));

        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Spending by Category"));
        assert!(svg.contains("Rent (75.0%)"));
        assert!(svg.contains("Food (25.0%)"));
    }

    #[test]
    fn test_bar_chart_options_keep_input_order() {
        let options = bar_chart(
            &[period("2024-01", 1, 12.5), period("2024-02", 2, -7.5)],
            "Monthly Spending",
        )
        .unwrap()
        .to_string();

        let first = options.find("\"2024-01\"").unwrap();
        let second = options.find("\"2024-02\"").unwrap();
        assert!(first < second);
        assert!(options.contains("Monthly Spending"));
        assert!(options.contains("Time Period"));
        assert!(options.contains("Amount ($)"));
        assert!(options.contains("\"rotate\":45"));
        assert!(options.contains("-7.5"));
    }

    #[test]
    fn test_bar_chart_renders_axes() {
        let svg = decode(&render_bar_chart(
            &[period("2024-01", 1, -40.0), period("2024-02", 2, 0.0)],
            "Monthly Spending",
        ));
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Monthly Spending"));
        assert!(svg.contains("2024-01"));
        assert!(!svg.contains("NaN"));
    }

    #[test]
    fn test_bar_chart_empty_is_placeholder() {
        assert!(bar_chart(&[], "Daily Spending").is_none());
        assert_eq!(render_bar_chart(&[], "Daily Spending"), render_empty_chart());
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let categories = [category("Rent", 800.0), category("Food", 20.0)];
        assert_eq!(render_pie_chart(&categories), render_pie_chart(&categories));

        let periods = [period("2024-01", 1, 12.5), period("2024-02", 2, 7.5)];
        assert_eq!(
            render_bar_chart(&periods, "Monthly Spending"),
            render_bar_chart(&periods, "Monthly Spending")
        );
    }
}
