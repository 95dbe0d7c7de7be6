use crate::metrics::Analysed;

use plotters::prelude::*;
use plotters::coord::Shift;
use std::ops::Range;

pub mod cli;

// axis limits; worse VSWR or better return loss is pinned to the edge
pub const VSWR_CEILING: f64 = 10.0;
pub const RETURN_LOSS_CEILING: f64 = 50.0; // dB

fn extent<I>(values: I) -> Range<f64>
where
    I: IntoIterator<Item=f64>,
{
    let mut range: Option<Range<f64>> = None;
    for v in values.into_iter().filter(|v| v.is_finite()) {
        range = Some(match range {
            None => v..v,
            Some(r) => r.start.min(v)..r.end.max(v),
        });
    }
    match range {
        None => 0.0..1.0,
        Some(r) if r.end - r.start <= 0.0 => (r.start - 0.5)..(r.end + 0.5),
        Some(r) => {
            let pad = (r.end - r.start) * 0.05;
            (r.start - pad)..(r.end + pad)
        }
    }
}

pub fn title(analysed: &Analysed) -> String {
    let result = &analysed.result;
    let mut title = match (result.samples.first(), result.samples.last()) {
        (Some(a), Some(b)) => format!(
            "{:.3} - {:.3} MHz", a.frequency / 1e6, b.frequency / 1e6,
        ),
        _ => "no data".to_owned(),
    };
    if result.cancelled {
        title.push_str(" (stopped)");
    } else if result.is_partial() {
        title.push_str(&format!(" ({} points missing)", result.missing.len()));
    }
    title
}

type Traces = Vec<(String, Vec<(f64, f64)>)>;

fn panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    caption: &str,
    xlabel: &str,
    ylabel: &str,
    yrange: Option<Range<f64>>,
    lines: Traces,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let xrange = extent(lines.iter().flat_map(|l| l.1.iter().map(|p| p.0)));
    let yrange = yrange.unwrap_or_else(
        || extent(lines.iter().flat_map(|l| l.1.iter().map(|p| p.1)))
    );

    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 20).into_font())
        .margin(5)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .build_ranged(xrange, yrange)?;

    chart.configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_desc(xlabel)
        .y_desc(ylabel)
        .draw()?;

    let labelled = lines.len() > 1;
    for (idx, (label, data)) in lines.into_iter().enumerate() {
        let style: ShapeStyle = Palette99::pick(idx).stroke_width(2);
        let legend = style.clone();
        let anno = chart.draw_series(LineSeries::new(data, style))?;
        if labelled {
            anno.label(label).legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], legend.clone())
            });
        }
    }

    if labelled {
        chart.configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .draw()?;
    }
    Ok(())
}

fn span_label(analysed: &Analysed) -> String {
    match (analysed.result.samples.first(), analysed.result.samples.last()) {
        (Some(a), Some(b)) => format!("{:.3}-{:.3}", a.frequency / 1e6, b.frequency / 1e6),
        _ => "empty".to_owned(),
    }
}

// impedance, VSWR, return loss and (when there is one) TDR, stacked
pub fn draw_sweep<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    analysed: &Analysed,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    draw_sweeps(root, std::slice::from_ref(analysed))
}

// several sweeps (a band scan) overlaid on the same panels
pub fn draw_sweeps<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    sweeps: &[Analysed],
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    root.fill(&WHITE)?;
    let with_tdr = sweeps.iter().any(|a| a.tdr.is_some());
    let rows = if with_tdr { 4 } else { 3 };
    let areas = root.split_evenly((rows, 1));

    let caption = match sweeps {
        [one] => title(one),
        _ => format!("{} sweeps", sweeps.len()),
    };
    // one sweep gets plain trace names, a scan names each trace by its span
    let name = |trace: &str, a: &Analysed| if sweeps.len() == 1 {
        trace.to_owned()
    } else {
        format!("{} {}", trace, span_label(a))
    };
    let mhz = |f: f64| f / 1e6;

    let mut impedance: Traces = vec![];
    let mut vswr: Traces = vec![];
    let mut return_loss: Traces = vec![];
    let mut tdr: Traces = vec![];
    for a in sweeps {
        let samples = &a.result.samples;
        impedance.push((name("R", a),
                        samples.iter().map(|s| (mhz(s.frequency), s.resistance)).collect()));
        impedance.push((name("X", a),
                        samples.iter().map(|s| (mhz(s.frequency), s.reactance)).collect()));
        vswr.push((name("VSWR", a),
                   a.vswr.iter().map(|&(f, v)| (mhz(f), v.min(VSWR_CEILING))).collect()));
        return_loss.push((name("RL", a),
                          a.return_loss.iter()
                          .map(|&(f, rl)| (mhz(f), rl.min(RETURN_LOSS_CEILING)))
                          .collect()));
        if let Some(ref trace) = a.tdr {
            tdr.push((name("TDR", a), trace.clone()));
        }
    }

    panel(&areas[0], &caption, "frequency (MHz)", "ohms", None, impedance)?;
    panel(&areas[1], "VSWR", "frequency (MHz)", "VSWR",
          Some(0.0..VSWR_CEILING), vswr)?;
    panel(&areas[2], "Return Loss", "frequency (MHz)", "dB",
          Some(0.0..RETURN_LOSS_CEILING), return_loss)?;
    if with_tdr {
        panel(&areas[3], "TDR", "distance (m)", "|impulse|", None, tdr)?;
    }
    Ok(())
}
