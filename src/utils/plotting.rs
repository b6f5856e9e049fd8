use std::path::Path;
use plotters::prelude::*;
use crate::config::defs::PipelineError;
use crate::utils::histogram::Histogram;
use crate::utils::peaks::Peak;

/// Threshold context drawn onto a histogram plot.
#[derive(Debug, Clone)]
pub struct Annotation<'a> {
    pub label: &'a str,
    pub threshold: f64,
    pub passing: usize,
    pub total: usize,
}

pub fn plot_histogram(
    hist: &Histogram,
    peaks: &[Peak],
    annotation: &Annotation,
    output_path: &Path,
) -> Result<(), PipelineError> {
    draw_histogram(hist, peaks, annotation, output_path).map_err(|e| PipelineError::Plot(e.to_string()))
}

fn draw_histogram(
    hist: &Histogram,
    peaks: &[Peak],
    annotation: &Annotation,
    output_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let (x_min, x_max) = match (hist.edges.first(), hist.edges.last()) {
        (Some(&first), Some(&last)) if last > first => (first, last),
        _ => return Err("Histogram has no bins to plot".into()),
    };
    // Leave headroom for peak labels
    let y_max = (hist.max_count().max(1) as f64) * 1.15;

    let root = BitMapBackend::new(output_path, (1000, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let caption = format!(
        "{} Distribution ({} of {} >= {})",
        annotation.label, annotation.passing, annotation.total, annotation.threshold
    );
    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, 0f64..y_max)?;

    chart
        .configure_mesh()
        .x_desc(annotation.label)
        .y_desc("Frequency")
        .draw()?;

    chart.draw_series(
        hist.counts
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .map(|(i, &count)| {
                Rectangle::new(
                    [(hist.edges[i], 0.0), (hist.edges[i + 1], count as f64)],
                    BLUE.mix(0.7).filled(),
                )
            }),
    )?;

    if annotation.threshold >= x_min && annotation.threshold <= x_max {
        chart.draw_series(LineSeries::new(
            vec![(annotation.threshold, 0.0), (annotation.threshold, y_max)],
            BLACK.stroke_width(2),
        ))?;
    }

    chart.draw_series(peaks.iter().map(|p| Circle::new((p.midpoint, p.height as f64), 4, RED.filled())))?;
    chart.draw_series(peaks.iter().map(|p| {
        Text::new(
            format!("Peak: {}", p.height),
            (p.midpoint, p.height as f64 * 1.05),
            ("sans-serif", 14).into_font().color(&RED),
        )
    }))?;

    root.present()?;
    Ok(())
}
