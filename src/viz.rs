//! Chart rendering with Plotters and console RFM reports

use std::path::Path;

use chrono::{Duration, NaiveDate};
use plotters::prelude::*;

use crate::rfm::{CustomerRfm, Segment, SegmentSummary};

/// One color per named segment, in `Segment::NAMED` order
const SEGMENT_COLORS: [RGBColor; 9] = [
    RGBColor(46, 139, 87),
    RGBColor(60, 179, 113),
    RGBColor(144, 238, 144),
    RGBColor(30, 144, 255),
    RGBColor(100, 149, 237),
    RGBColor(173, 216, 230),
    RGBColor(220, 20, 60),
    RGBColor(255, 140, 0),
    RGBColor(255, 215, 0),
];

const BAR_COLOR: RGBColor = RGBColor(31, 119, 180);

const MIN_BUBBLE_RADIUS: f64 = 3.0;
const MAX_BUBBLE_RADIUS: f64 = 20.0;

fn segment_color(segment: Segment) -> RGBColor {
    Segment::NAMED
        .iter()
        .position(|&s| s == segment)
        .map_or(RGBColor(128, 128, 128), |i| SEGMENT_COLORS[i])
}

/// Bubble radius in pixels; area grows with spend relative to the top spender
fn bubble_radius(monetary: f64, max_monetary: f64) -> i32 {
    if max_monetary <= 0.0 || monetary <= 0.0 {
        return MIN_BUBBLE_RADIUS as i32;
    }
    let share = (monetary / max_monetary).clamp(0.0, 1.0).sqrt();
    (MIN_BUBBLE_RADIUS + share * (MAX_BUBBLE_RADIUS - MIN_BUBBLE_RADIUS)).round() as i32
}

/// Axis range covering `values` and zero, with 10% headroom
fn value_range(values: impl IntoIterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .into_iter()
        .fold((0.0_f64, 0.0_f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if hi - lo <= f64::EPSILON {
        return (0.0, 1.0);
    }
    (lo * 1.1, hi * 1.1)
}

fn path_str(path: &Path) -> crate::Result<&str> {
    path.to_str()
        .ok_or_else(|| anyhow::anyhow!("Chart path is not valid UTF-8: {}", path.display()))
}

/// Scatter customers by recency and frequency, sized by spend and colored by segment
pub fn rfm_bubble_chart(rows: &[CustomerRfm], output_path: impl AsRef<Path>) -> crate::Result<()> {
    if rows.is_empty() {
        anyhow::bail!("No RFM rows to plot");
    }
    let output_path = output_path.as_ref();

    let max_recency = rows.iter().map(|r| r.recency_days).max().unwrap_or(0) as f64;
    let max_frequency = rows.iter().map(|r| r.frequency).max().unwrap_or(0) as f64;
    let max_monetary = rows.iter().map(|r| r.monetary).fold(0.0, f64::max);

    let root = BitMapBackend::new(path_str(output_path)?, (1000, 700)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Customer Segments: Recency vs Frequency", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(-1f64..(max_recency + 5.0), 0f64..(max_frequency + 1.0))?;

    chart
        .configure_mesh()
        .x_desc("Recency (days)")
        .y_desc("Frequency (orders)")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for segment in Segment::NAMED.into_iter().chain([Segment::Unscored]) {
        let members: Vec<&CustomerRfm> = rows.iter().filter(|r| r.segment == segment).collect();
        if members.is_empty() {
            continue;
        }
        let color = segment_color(segment);
        chart
            .draw_series(members.iter().map(|r| {
                Circle::new(
                    (r.recency_days as f64, r.frequency as f64),
                    bubble_radius(r.monetary, max_monetary),
                    color.mix(0.6).filled(),
                )
            }))?
            .label(segment.label())
            .legend(move |(x, y)| Circle::new((x, y), 5, color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    tracing::info!(path = %output_path.display(), customers = rows.len(), "wrote RFM bubble chart");
    Ok(())
}

/// Vertical bars for labelled values, in the given order
pub fn bar_chart(title: &str, bars: &[(String, f64)], output_path: impl AsRef<Path>) -> crate::Result<()> {
    if bars.is_empty() {
        anyhow::bail!("No values to plot for '{}'", title);
    }
    let output_path = output_path.as_ref();
    let (y_min, y_max) = value_range(bars.iter().map(|(_, v)| *v));
    let labels: Vec<&str> = bars.iter().map(|(label, _)| label.as_str()).collect();

    let root = BitMapBackend::new(path_str(output_path)?, (1000, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(80)
        .y_label_area_size(70)
        .build_cartesian_2d((0..bars.len()).into_segmented(), y_min..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(bars.len())
        .x_label_formatter(&|v: &SegmentValue<usize>| match v {
            SegmentValue::Exact(i) | SegmentValue::CenterOf(i) => {
                labels.get(*i).map(|l| l.to_string()).unwrap_or_default()
            }
            SegmentValue::Last => String::new(),
        })
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(BAR_COLOR.filled())
            .margin(10)
            .data(bars.iter().enumerate().map(|(i, (_, v))| (i, *v))),
    )?;

    root.present()?;
    tracing::info!(path = %output_path.display(), bars = bars.len(), "wrote bar chart");
    Ok(())
}

/// Customers per segment, named segments in display order
pub fn segment_distribution_chart(
    distribution: &std::collections::BTreeMap<Segment, usize>,
    output_path: impl AsRef<Path>,
) -> crate::Result<()> {
    let bars: Vec<(String, f64)> = distribution
        .iter()
        .map(|(segment, &count)| (segment.label().to_string(), count as f64))
        .collect();
    bar_chart("Customers per Segment", &bars, output_path)
}

/// Sales per day as a line, oldest day on the left
pub fn daily_sales_chart(days: &[(NaiveDate, f64)], output_path: impl AsRef<Path>) -> crate::Result<()> {
    let Some(&(first, _)) = days.first() else {
        anyhow::bail!("No dated sales to plot");
    };
    let output_path = output_path.as_ref();
    let offsets: Vec<(f64, f64)> = days
        .iter()
        .map(|(day, total)| ((*day - first).num_days() as f64, *total))
        .collect();
    let span = offsets.last().map_or(1.0, |(x, _)| x.max(1.0));
    let (_, y_max) = value_range(offsets.iter().map(|(_, y)| *y));

    let root = BitMapBackend::new(path_str(output_path)?, (1000, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Daily Sales", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(0f64..span, 0f64..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc("Sales (THB)")
        .x_label_formatter(&|x: &f64| {
            (first + Duration::days(x.round() as i64)).format("%d %b").to_string()
        })
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(LineSeries::new(offsets.iter().copied(), BAR_COLOR.stroke_width(2)))?;
    chart.draw_series(offsets.iter().map(|&point| Circle::new(point, 3, BAR_COLOR.filled())))?;

    root.present()?;
    tracing::info!(path = %output_path.display(), days = days.len(), "wrote daily sales chart");
    Ok(())
}

/// Print the top customers by spend, then the segment breakdown
pub fn print_segment_report(rows: &[CustomerRfm], summaries: &[SegmentSummary], top: usize) {
    let total = rows.len();
    println!("\n=== RFM Segmentation ===");
    println!("Scored customers: {}", total);

    let mut by_spend: Vec<&CustomerRfm> = rows.iter().collect();
    by_spend.sort_by(|a, b| b.monetary.total_cmp(&a.monetary));

    println!("\nTop {} customers by spend:", top.min(total));
    println!("  {:<28} | {:>7} | {:>6} | {:>12} | Code | Segment", "Customer", "Recency", "Orders", "Spend");
    println!("  {:-<28}-|-{:->7}-|-{:->6}-|-{:->12}-|------|--------", "", "", "", "");
    for row in by_spend.into_iter().take(top) {
        println!(
            "  {:<28} | {:>7} | {:>6} | {:>12.2} | {:>4} | {}",
            row.customer_id,
            row.recency_days,
            row.frequency,
            row.monetary,
            row.code(),
            row.segment
        );
    }

    println!("\nSegments:");
    println!(
        "  {:<28} | {:>9} | {:>6} | {:>12} | {:>10} | {:>12}",
        "Segment", "Customers", "Share", "Avg recency", "Avg orders", "Avg spend"
    );
    for summary in summaries {
        let share = if total > 0 {
            summary.customers as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        println!(
            "  {:<28} | {:>9} | {:>5.1}% | {:>12.1} | {:>10.2} | {:>12.2}",
            summary.segment.label(),
            summary.customers,
            share,
            summary.mean_recency_days,
            summary.mean_frequency,
            summary.mean_monetary
        );
    }
}
