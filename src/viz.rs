//! Segment reporting: console statistics and SVG charts using Plotters

use plotters::prelude::*;

use crate::model::{CustomerRfm, RfmTable};
use crate::segment::Segment;

/// One color per segment, in `Segment::ALL` order
static SEGMENT_COLORS: [RGBColor; 5] = [GREEN, RED, MAGENTA, BLUE, RGBColor(128, 128, 128)];

fn segment_color(segment: Segment) -> &'static RGBColor {
    let idx = Segment::ALL
        .iter()
        .position(|&s| s == segment)
        .unwrap_or(Segment::ALL.len() - 1);
    &SEGMENT_COLORS[idx]
}

/// Per-segment summary used by the statistics printout
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentSummary {
    pub segment: Segment,
    pub customers: usize,
    pub share: f64,
    pub mean_recency: f64,
    pub mean_frequency: f64,
    pub mean_monetary: f64,
}

/// Summarize every segment; empty segments report zero means
pub fn summarize_segments(table: &RfmTable) -> Vec<SegmentSummary> {
    let total = table.len().max(1) as f64;

    Segment::ALL
        .iter()
        .map(|&segment| {
            let rows = table.segment(segment);
            let n = rows.len();
            let mean = |metric: fn(&CustomerRfm) -> f64| {
                if n == 0 {
                    0.0
                } else {
                    rows.iter().map(|row| metric(row)).sum::<f64>() / n as f64
                }
            };

            SegmentSummary {
                segment,
                customers: n,
                share: n as f64 / total * 100.0,
                mean_recency: mean(|row| row.recency as f64),
                mean_frequency: mean(|row| row.frequency as f64),
                mean_monetary: mean(|row| row.monetary),
            }
        })
        .collect()
}

/// Scatter plot of frequency against monetary, colored by segment
///
/// # Arguments
/// * `table` - Scored customers
/// * `output_path` - Path of the SVG file to write
/// * `plot_title` - Title for the plot
pub fn create_segment_visualization(
    table: &RfmTable,
    output_path: &str,
    plot_title: Option<&str>,
) -> anyhow::Result<()> {
    let title = plot_title.unwrap_or("Customer Segments: Frequency vs Monetary");

    let frequency_values: Vec<f64> = table.iter().map(|row| row.frequency as f64).collect();
    let monetary_values: Vec<f64> = table.iter().map(|row| row.monetary).collect();

    let (freq_min, freq_max) = padded_range(&frequency_values);
    let (mon_min, mon_max) = padded_range(&monetary_values);

    let root = SVGBackend::new(output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(freq_min..freq_max, mon_min..mon_max)?;

    chart
        .configure_mesh()
        .x_desc("Frequency")
        .y_desc("Monetary")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for segment in Segment::ALL {
        let color = segment_color(segment);
        let points: Vec<(f64, f64)> = table
            .segment(segment)
            .iter()
            .map(|row| (row.frequency as f64, row.monetary))
            .collect();
        if points.is_empty() {
            continue;
        }

        chart
            .draw_series(
                points
                    .into_iter()
                    .map(|point| Circle::new(point, 4, color.filled())),
            )?
            .label(segment.as_str())
            .legend(move |(x, y)| Circle::new((x + 5, y), 4, color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    log::info!("Segment visualization saved to: {}", output_path);

    Ok(())
}

/// Bar chart of customers per segment
pub fn create_segment_size_chart(table: &RfmTable, output_path: &str) -> anyhow::Result<()> {
    let counts = table.segment_counts();
    let max_size = counts.iter().map(|&(_, n)| n).max().unwrap_or(1).max(1) as f64;

    let root = SVGBackend::new(output_path, (600, 400)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Segment Sizes", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(-0.5f64..(counts.len() as f64 - 0.5), 0f64..(max_size * 1.1))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(counts.len())
        .x_label_formatter(&|x: &f64| {
            Segment::ALL
                .get(x.round().max(0.0) as usize)
                .map(|segment| segment.to_string())
                .unwrap_or_default()
        })
        .y_desc("Number of Customers")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (idx, &(segment, size)) in counts.iter().enumerate() {
        let color = segment_color(segment);
        chart.draw_series(std::iter::once(Rectangle::new(
            [(idx as f64 - 0.4, 0.0), (idx as f64 + 0.4, size as f64)],
            color.filled(),
        )))?;
    }

    root.present()?;
    log::info!("Segment size chart saved to: {}", output_path);

    Ok(())
}

/// Print segment statistics to console
pub fn print_segment_statistics(table: &RfmTable) {
    println!("\n=== Segment Statistics ===");
    println!("Total customers: {}", table.len());
    println!("Binning: {}", binning_summary(table));

    println!("\n  Segment   | Customers |  Share | Recency | Frequency |  Monetary");
    println!("  ----------|-----------|--------|---------|-----------|----------");
    for summary in summarize_segments(table) {
        println!(
            "  {:9} | {:9} | {:5.1}% | {:7.1} | {:9.2} | {:9.2}",
            summary.segment.as_str(),
            summary.customers,
            summary.share,
            summary.mean_recency,
            summary.mean_frequency,
            summary.mean_monetary
        );
    }
}

/// Bin count and the strategy each metric ended up with
pub fn binning_summary(table: &RfmTable) -> String {
    format!(
        "{} bins per metric (recency={}, frequency={}, monetary={})",
        table.num_bins, table.strategies[0], table.strategies[1], table.strategies[2]
    )
}

/// Write both charts; the size chart goes next to the main one with a `_sizes` suffix
pub fn generate_visualization_report(table: &RfmTable, base_output_path: &str) -> anyhow::Result<()> {
    create_segment_visualization(table, base_output_path, None)?;

    let size_chart_path = sizes_path(base_output_path);
    create_segment_size_chart(table, &size_chart_path)?;

    Ok(())
}

/// `report.svg` becomes `report_sizes.svg`
pub fn sizes_path(base_output_path: &str) -> String {
    match base_output_path.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.contains('/') => {
            format!("{stem}_sizes.{ext}")
        }
        _ => format!("{base_output_path}_sizes.svg"),
    }
}

/// Min and max with some padding so single points are not drawn on the border
fn padded_range(values: &[f64]) -> (f64, f64) {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }

    let pad = ((max - min) * 0.05).max(0.5);
    (min - pad, max + pad)
}
