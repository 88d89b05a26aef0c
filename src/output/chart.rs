use crate::engine::evaluator::{CurveSeries, CurveView, PAYOFF_COMBINED, RESULT_COMBINED};
use crate::engine::Evaluation;
use crate::output::ArtifactRenderer;

const WIDTH: i32 = 960;
const HEIGHT: i32 = 540;
const PADDING: f64 = 64.0;
const TICKS: usize = 6;
const MAX_POLYLINE_POINTS: usize = 2_000;

const PAYOFF_COLOR: &str = "#348dc1";
const RESULT_COLOR: &str = "#ff9933";
const LEG_COLORS: [&str; 8] = [
    "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f", "#bcbd22", "#17becf",
];

const X_LABEL: &str = "Underlying price at expiry (St)";
const Y_LABEL: &str = "Payoff / Result";

/// Self-contained HTML page with one inline SVG line chart.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlChart;

impl ArtifactRenderer for HtmlChart {
    fn name(&self) -> &'static str {
        "chart"
    }

    fn extension(&self) -> &'static str {
        "html"
    }

    fn render(&self, strategy: &str, evaluation: &Evaluation) -> String {
        let title = chart_title(strategy);
        let caption = format!(
            "Grid {:.2} to {:.2} over {} prices, bounded by strikes {:.2} and {:.2}",
            evaluation.bounds.grid_lower(),
            evaluation.bounds.grid_upper(),
            evaluation.curves.prices.len(),
            evaluation.bounds.lower_strike,
            evaluation.bounds.upper_strike
        );
        let svg = render_svg(&evaluation.curves);
        format!(
            r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><title>{title}</title>
<style>body{{font-family:Arial,sans-serif;margin:24px;color:#333}}.plot-title{{font-size:18px;font-weight:bold;margin-bottom:4px}}.plot-caption{{font-size:12px;color:#888;margin-bottom:8px}}</style>
</head><body><div class="plot"><div class="plot-title">{title}</div><div class="plot-caption">{caption}</div>{svg}</div></body></html>
"#,
            title = escape(&title),
            caption = caption,
            svg = svg
        )
    }
}

/// `long-call_spread` -> `Long call spread`.
pub fn chart_title(strategy: &str) -> String {
    let spaced = strategy.replace(['-', '_'], " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn series_color(index: usize, series: &CurveSeries) -> &'static str {
    match series.name.as_str() {
        PAYOFF_COMBINED => PAYOFF_COLOR,
        RESULT_COMBINED => RESULT_COLOR,
        _ => LEG_COLORS[index % LEG_COLORS.len()],
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn value_extent(view: &CurveView) -> Option<(f64, f64)> {
    let mut min_v = 0.0_f64;
    let mut max_v = 0.0_f64;
    for point in view.points() {
        if point.value.is_finite() {
            min_v = min_v.min(point.value);
            max_v = max_v.max(point.value);
        }
    }

    if !min_v.is_finite() || !max_v.is_finite() {
        return None;
    }

    if min_v == max_v {
        let adjust = if min_v == 0.0 { 1.0 } else { min_v.abs() * 0.1 }; // widen flat ranges
        min_v -= adjust;
        max_v += adjust;
    }

    Some((min_v, max_v))
}

fn scale_x(price: f64, lo: f64, hi: f64) -> f64 {
    let inner = WIDTH as f64 - 2.0 * PADDING;
    PADDING + (price - lo) / (hi - lo) * inner
}

fn scale_y(value: f64, min_v: f64, max_v: f64) -> f64 {
    let inner = HEIGHT as f64 - 2.0 * PADDING;
    PADDING + (1.0 - (value - min_v) / (max_v - min_v)) * inner
}

/// Evenly strided indices, at most `max` of them, always ending on `len - 1`.
fn decimate(len: usize, max: usize) -> Vec<usize> {
    if len <= max {
        return (0..len).collect();
    }
    let stride = len.div_ceil(max - 1);
    let mut idx: Vec<usize> = (0..len).step_by(stride).collect();
    if idx.last() != Some(&(len - 1)) {
        idx.push(len - 1);
    }
    idx
}

fn render_svg(view: &CurveView) -> String {
    let (lo, hi) = match (view.prices.first(), view.prices.last()) {
        (Some(&lo), Some(&hi)) if hi > lo => (lo, hi),
        _ => return String::new(),
    };
    let (min_v, max_v) = match value_extent(view) {
        Some(extent) => extent,
        None => return String::new(),
    };

    let width = WIDTH as f64;
    let height = HEIGHT as f64;
    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {WIDTH} {HEIGHT}"><style>text{{font-family:Arial,sans-serif;font-size:11px;fill:#666}}</style>"#
    );

    add_axes(&mut svg, lo, hi, min_v, max_v);

    let zero_y = scale_y(0.0, min_v, max_v);
    svg.push_str(&format!(
        r##"<line x1="{x1:.2}" y1="{y:.2}" x2="{x2:.2}" y2="{y:.2}" stroke="#bbbbbb" stroke-width="1" />"##,
        x1 = PADDING,
        x2 = width - PADDING,
        y = zero_y
    ));

    let indices = decimate(view.prices.len(), MAX_POLYLINE_POINTS);
    let mut legend = Vec::with_capacity(view.series.len());
    let mut leg_index = 0;
    for series in &view.series {
        let color = series_color(leg_index, series);
        if !series.dashed {
            leg_index += 1;
        }

        let points = indices
            .iter()
            .filter_map(|&i| {
                let value = *series.values.get(i)?;
                value.is_finite().then(|| {
                    format!(
                        "{:.2},{:.2}",
                        scale_x(view.prices[i], lo, hi),
                        scale_y(value, min_v, max_v)
                    )
                })
            })
            .collect::<Vec<_>>()
            .join(" ");
        if points.is_empty() {
            continue;
        }

        let dash = if series.dashed { "6 4" } else { "0" };
        svg.push_str(&format!(
            r#"<polyline fill="none" stroke="{color}" stroke-width="1.5" stroke-dasharray="{dash}" points="{points}" />"#
        ));
        legend.push((series.name.as_str(), color, series.dashed));
    }

    draw_legend(&mut svg, &legend, width);

    svg.push_str(&format!(
        r#"<text x="{x:.2}" y="{y:.2}" text-anchor="middle">{label}</text>"#,
        x = width / 2.0,
        y = height - 16.0,
        label = escape(X_LABEL)
    ));
    svg.push_str(&format!(
        r#"<text x="16" y="{y:.2}" text-anchor="middle" transform="rotate(-90 16 {y:.2})">{label}</text>"#,
        y = height / 2.0,
        label = escape(Y_LABEL)
    ));

    svg.push_str("</svg>");
    svg
}

fn add_axes(svg: &mut String, lo: f64, hi: f64, min_v: f64, max_v: f64) {
    let width = WIDTH as f64;
    let height = HEIGHT as f64;
    let bottom = height - PADDING;

    svg.push_str(&format!(
        r##"<line x1="{x0:.2}" y1="{b:.2}" x2="{x1:.2}" y2="{b:.2}" stroke="#999" stroke-width="1" />"##,
        x0 = PADDING,
        x1 = width - PADDING,
        b = bottom
    ));
    svg.push_str(&format!(
        r##"<line x1="{x:.2}" y1="{t:.2}" x2="{x:.2}" y2="{b:.2}" stroke="#999" stroke-width="1" />"##,
        x = PADDING,
        t = PADDING,
        b = bottom
    ));

    for k in 0..TICKS {
        let frac = k as f64 / (TICKS - 1) as f64;

        let price = lo + frac * (hi - lo);
        let x = scale_x(price, lo, hi);
        svg.push_str(&format!(
            r##"<line x1="{x:.2}" y1="{b:.2}" x2="{x:.2}" y2="{t:.2}" stroke="#999" stroke-width="1" />"##,
            b = bottom,
            t = bottom + 4.0
        ));
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{y:.2}" text-anchor="middle">{price:.2}</text>"#,
            y = bottom + 16.0
        ));

        let value = min_v + frac * (max_v - min_v);
        let y = scale_y(value, min_v, max_v);
        svg.push_str(&format!(
            r##"<line x1="{x0:.2}" y1="{y:.2}" x2="{x1:.2}" y2="{y:.2}" stroke="#eeeeee" stroke-width="1" />"##,
            x0 = PADDING,
            x1 = width - PADDING
        ));
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{ty:.2}" text-anchor="end">{value:.2}</text>"#,
            x = PADDING - 6.0,
            ty = y + 4.0
        ));
    }
}

fn draw_legend(svg: &mut String, entries: &[(&str, &str, bool)], width: f64) {
    if entries.is_empty() {
        return;
    }

    let x = width - PADDING - 220.0;
    let mut y = PADDING + 14.0;
    for (label, color, dashed) in entries {
        let dash = if *dashed { "6 4" } else { "0" };
        svg.push_str(&format!(
            r#"<line x1="{x1:.2}" y1="{ly:.2}" x2="{x2:.2}" y2="{ly:.2}" stroke="{color}" stroke-width="1.5" stroke-dasharray="{dash}" />"#,
            x1 = x,
            x2 = x + 20.0,
            ly = y - 4.0
        ));
        svg.push_str(&format!(
            r##"<text x="{tx:.2}" y="{y:.2}" text-anchor="start" fill="#333">{label}</text>"##,
            tx = x + 26.0,
            label = escape(label)
        ));
        y += 16.0;
    }
}
