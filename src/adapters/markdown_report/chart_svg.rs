//! Inline SVG charts for the backtest report.

use crate::domain::portfolio::EquityPoint;

const WIDTH: f64 = 500.0;
const HEIGHT: f64 = 200.0;
const PADDING: f64 = 40.0;

/// Scale `values` into polyline points inside the padded plot area.
fn polyline_points(values: &[f64]) -> String {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let plot_width = WIDTH - 2.0 * PADDING;
    let plot_height = HEIGHT - 2.0 * PADDING;

    let range = max - min;
    let scale_y = if range > 0.0 { plot_height / range } else { 1.0 };
    let scale_x = if values.len() > 1 {
        plot_width / (values.len() - 1) as f64
    } else {
        0.0
    };

    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let x = PADDING + i as f64 * scale_x;
            let y = HEIGHT - PADDING - (v - min) * scale_y;
            format!("{:.1},{:.1}", x, y)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_chart(values: &[f64], title: &str, stroke: &str, low: &str, high: &str) -> String {
    let axis_bottom = HEIGHT - PADDING;
    let axis_right = WIDTH - PADDING;
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}">
  <title>{title}</title>
  <rect width="100%" height="100%" fill="white"/>
  <line x1="{p:.0}" y1="{p:.0}" x2="{p:.0}" y2="{b:.0}" stroke="#888"/>
  <line x1="{p:.0}" y1="{b:.0}" x2="{r:.0}" y2="{b:.0}" stroke="#888"/>
  <text x="2" y="{p:.0}" font-size="10">{high}</text>
  <text x="2" y="{b:.0}" font-size="10">{low}</text>
  <polyline fill="none" stroke="{stroke}" stroke-width="1.5" points="{points}"/>
</svg>
"##,
        w = WIDTH,
        h = HEIGHT,
        p = PADDING,
        b = axis_bottom,
        r = axis_right,
        title = title,
        high = high,
        low = low,
        stroke = stroke,
        points = polyline_points(values),
    )
}

pub fn equity_chart(equity_curve: &[EquityPoint]) -> String {
    if equity_curve.is_empty() {
        return "_No equity data available._\n".to_string();
    }
    let values: Vec<f64> = equity_curve.iter().map(|p| p.equity).collect();
    let low = values.iter().copied().fold(f64::INFINITY, f64::min);
    let high = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    render_chart(
        &values,
        "Equity Curve",
        "#1f77b4",
        &format!("{:.0}", low),
        &format!("{:.0}", high),
    )
}

/// Drawdown from the running peak, as a negative fraction.
pub fn drawdown_series(equity_curve: &[EquityPoint]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    equity_curve
        .iter()
        .map(|p| {
            peak = peak.max(p.equity);
            if peak > 0.0 { p.equity / peak - 1.0 } else { 0.0 }
        })
        .collect()
}

pub fn drawdown_chart(equity_curve: &[EquityPoint]) -> String {
    if equity_curve.is_empty() {
        return "_No equity data available._\n".to_string();
    }
    let series = drawdown_series(equity_curve);
    let deepest = series.iter().copied().fold(0.0, f64::min);
    render_chart(
        &series,
        "Drawdown",
        "#d62728",
        &format!("{:.1}%", deepest * 100.0),
        "0.0%",
    )
}
