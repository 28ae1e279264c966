use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Color,
    style::Style,
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Bar, BarChart, BarGroup, Block, Borders, Chart, Dataset, Gauge, GraphType, Paragraph,
    },
    Frame,
};

use crate::dashboard::Dashboard;
use crate::model::Progress;

/// One-line summary of the visible response-time window, shown under the chart.
fn render_metrics_text<'a>(metrics: (f64, f64, f64, f64), color: Color) -> Line<'a> {
    let (mean_val, median_val, p25_val, p75_val) = metrics;
    Line::from(vec![
        Span::styled("avg", Style::default().fg(Color::Gray)),
        Span::styled(format!(" {:.1}", mean_val), Style::default().fg(color)),
        Span::raw(" "),
        Span::styled("med", Style::default().fg(Color::Gray)),
        Span::styled(format!(" {:.1}", median_val), Style::default().fg(color)),
        Span::raw(" "),
        Span::styled("p25", Style::default().fg(Color::Gray)),
        Span::styled(format!(" {:.1}", p25_val), Style::default().fg(color)),
        Span::raw(" "),
        Span::styled("p75", Style::default().fg(Color::Gray)),
        Span::styled(format!(" {:.1}", p75_val), Style::default().fg(color)),
    ])
}

/// Chart points for the visible window: x is the 1-based slot, matching the `T1..Tn` labels.
pub fn window_points(chart: &[f64]) -> Vec<(f64, f64)> {
    chart
        .iter()
        .enumerate()
        .map(|(i, ms)| ((i + 1) as f64, *ms))
        .collect()
}

/// Response-time line chart over the last few samples, with window metrics inside the box.
pub fn render_response_chart(f: &mut Frame, area: Rect, dashboard: &Dashboard) {
    let title = Line::from(vec![
        Span::raw("Response time (avg "),
        Span::styled(dashboard.average_display(), Style::default().fg(Color::Green)),
        Span::raw(")"),
    ]);

    if dashboard.chart.is_empty() {
        let empty = Paragraph::new("Waiting for data...")
            .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(empty, area);
        return;
    }

    // metrics row lives inside the border
    let inner = if area.width > 2 && area.height > 2 {
        Rect {
            x: area.x + 1,
            y: area.y + 1,
            width: area.width.saturating_sub(2),
            height: area.height.saturating_sub(2),
        }
    } else {
        area
    };

    let chart_metrics = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(1)].as_ref())
        .split(inner);

    let points = window_points(&dashboard.chart);
    let y_max = dashboard
        .chart
        .iter()
        .copied()
        .fold(0.0_f64, f64::max)
        .max(1.0)
        * 1.10;
    let labels = dashboard.chart_labels();
    let x_labels = match (labels.first(), labels.last()) {
        (Some(first), Some(last)) if labels.len() > 1 => vec![first.clone(), last.clone()],
        _ => labels.clone(),
    };

    let ds = Dataset::default()
        .graph_type(GraphType::Line)
        .marker(symbols::Marker::Braille)
        .style(Style::default().fg(Color::Green))
        .data(&points);
    let chart = Chart::new(vec![ds])
        .x_axis(
            Axis::default()
                .bounds([1.0, (points.len() as f64).max(2.0)])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .title("ms")
                .bounds([0.0, y_max])
                .labels(vec!["0".to_string(), format!("{:.0}", y_max)]),
        );
    f.render_widget(chart, chart_metrics[0]);

    if let Some(metrics) = crate::metrics::window_metrics(&dashboard.chart) {
        f.render_widget(
            Paragraph::new(render_metrics_text(metrics, Color::Green)).alignment(Alignment::Center),
            chart_metrics[1],
        );
    }

    let block = Block::default().borders(Borders::ALL).title(title);
    f.render_widget(block, area);
}

/// Two bars: successful and failed requests.
pub fn render_distribution(f: &mut Frame, area: Rect, dashboard: &Dashboard) {
    let [ok, failed] = dashboard.distribution();
    let bars = [
        Bar::default()
            .value(ok)
            .label(Line::from("Success"))
            .style(Style::default().fg(Color::Green)),
        Bar::default()
            .value(failed)
            .label(Line::from("Failed"))
            .style(Style::default().fg(Color::Red)),
    ];
    let bar_width = (area.width.saturating_sub(4) / 2).clamp(3, 20);
    let chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title("Distribution"))
        .data(BarGroup::default().bars(&bars))
        .bar_width(bar_width)
        .bar_gap(1)
        .max(ok.max(failed).max(1));
    f.render_widget(chart, area);
}

pub fn progress_label(p: &Progress) -> String {
    format!(
        "{}s elapsed / {}s remaining ({}%)",
        p.elapsed_secs,
        p.remaining_secs,
        p.percentage.floor() as u64
    )
}

pub fn render_progress(f: &mut Frame, area: Rect, progress: &Progress) {
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Progress"))
        .gauge_style(Style::default().fg(Color::Cyan))
        .ratio((progress.percentage / 100.0).clamp(0.0, 1.0))
        .label(progress_label(progress));
    f.render_widget(gauge, area);
}
