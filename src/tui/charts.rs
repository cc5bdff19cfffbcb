use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::canvas::Line as CanvasLine,
    widgets::{canvas::Canvas, Bar, BarChart, BarGroup, Block, Borders, Paragraph},
    Frame,
};

use super::state::{label_color, phase_color, push_wrapped_status_kv, UiState};
use crate::metrics::SentimentSummary;
use crate::model::{DashboardSnapshot, MAX_POLLS};

/// Helper function to draw a line on a canvas
pub fn draw_line(
    ctx: &mut ratatui::widgets::canvas::Context,
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    color: Color,
) {
    ctx.draw(&CanvasLine {
        x1,
        y1,
        x2,
        y2,
        color,
    });
}

/// Box plot of compound scores on a fixed [-1, 1] axis, with metrics below it.
fn render_score_box_plot(f: &mut Frame, area: Rect, scores: &[f64]) {
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
        .constraints([Constraint::Min(3), Constraint::Length(1)].as_ref())
        .split(inner);

    match crate::metrics::compute_metrics(scores) {
        Some((mean, med, q1, q3)) => {
            let min_val = scores.iter().copied().fold(f64::INFINITY, f64::min);
            let max_val = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let canvas = Canvas::default()
                .x_bounds([-1.05, 1.05])
                .y_bounds([-1.0, 1.0])
                .paint(move |ctx| {
                    // Zero line
                    draw_line(ctx, 0.0, -0.8, 0.0, 0.8, Color::DarkGray);

                    draw_line(ctx, q1, -0.4, q3, -0.4, Color::White);
                    draw_line(ctx, q1, 0.4, q3, 0.4, Color::White);
                    draw_line(ctx, q1, -0.4, q1, 0.4, Color::White);
                    draw_line(ctx, q3, -0.4, q3, 0.4, Color::White);

                    draw_line(ctx, med, -0.4, med, 0.4, Color::Yellow);
                    draw_line(ctx, mean, -0.4, mean, 0.4, Color::Cyan);

                    draw_line(ctx, min_val, 0.0, q1, 0.0, Color::White);
                    draw_line(ctx, q3, 0.0, max_val, 0.0, Color::White);
                    draw_line(ctx, min_val, -0.2, min_val, 0.2, Color::White);
                    draw_line(ctx, max_val, -0.2, max_val, 0.2, Color::White);
                });
            f.render_widget(canvas, chart_metrics[0]);
            f.render_widget(
                Paragraph::new(render_metrics_text((mean, med, q1, q3))).alignment(Alignment::Center),
                chart_metrics[1],
            );
        }
        None => {
            f.render_widget(Paragraph::new("Need at least 2 posts for score stats"), inner);
        }
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title("Compound score (-1 … +1)");
    f.render_widget(block, area);
}

fn render_metrics_text<'a>(metrics: (f64, f64, f64, f64)) -> Line<'a> {
    let (mean_val, median_val, p25_val, p75_val) = metrics;
    let mut spans = Vec::new();
    for (name, v, color) in [
        ("avg", mean_val, Color::Cyan),
        ("med", median_val, Color::Yellow),
        ("p25", p25_val, Color::White),
        ("p75", p75_val, Color::White),
    ] {
        if !spans.is_empty() {
            spans.push(Span::raw(" "));
        }
        spans.push(Span::styled(name, Style::default().fg(Color::Gray)));
        spans.push(Span::styled(format!(" {v:+.3}"), Style::default().fg(color)));
    }
    Line::from(spans)
}

fn render_label_bars(f: &mut Frame, area: Rect, summary: &SentimentSummary) {
    let counts = [
        ("bullish", summary.bullish),
        ("bearish", summary.bearish),
        ("neutral", summary.neutral),
        ("other", summary.other),
    ];
    let max = counts.iter().map(|(_, c)| *c).max().unwrap_or(0).max(1);
    let bars: Vec<Bar> = counts
        .iter()
        .map(|(label, count)| {
            Bar::default()
                .value(*count as u64)
                .label(Line::from(*label))
                .style(Style::default().fg(label_color(label)))
        })
        .collect();

    // Four bars, one cell gap each, inside the border.
    let bar_width = (area.width.saturating_sub(2) / 4).saturating_sub(1).clamp(1, 12);
    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Labels ({} shown)", summary.total())),
        )
        .data(BarGroup::default().bars(&bars))
        .bar_width(bar_width)
        .bar_gap(1)
        .max(max as u64);
    f.render_widget(chart, area);
}

fn render_job_panel(f: &mut Frame, area: Rect, snapshot: &DashboardSnapshot) {
    let job = &snapshot.job;
    let mut lines = vec![Line::from(vec![
        Span::styled("Phase:", Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("{:?}", job.phase),
            Style::default().fg(phase_color(job.phase)),
        ),
    ])];
    if job.polls > 0 {
        push_wrapped_status_kv(
            &mut lines,
            "Polls",
            &format!("{}/{}", job.polls, MAX_POLLS),
            area.width,
        );
    }
    if let Some(started) = job.started_at {
        let started = started
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default();
        push_wrapped_status_kv(&mut lines, "Started", &started, area.width);
    }
    if let Some(last) = job.last_completed_at.as_deref() {
        push_wrapped_status_kv(&mut lines, "Last run", last, area.width);
    }
    if let Some(n) = job.posts_count {
        push_wrapped_status_kv(&mut lines, "Posts fetched", &n.to_string(), area.width);
    }
    if let Some(n) = job.sentiment_count {
        push_wrapped_status_kv(&mut lines, "Posts scored", &n.to_string(), area.width);
    }
    if let Some(err) = job.error_message.as_deref() {
        push_wrapped_status_kv(&mut lines, "Error", err, area.width);
    }
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Analysis"));
    f.render_widget(p, area);
}

pub fn draw_summary(area: Rect, f: &mut Frame, state: &UiState) {
    let Some(snapshot) = state.snapshot.as_ref() else {
        f.render_widget(
            Paragraph::new("Loading…").block(Block::default().borders(Borders::ALL)),
            area,
        );
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(7)].as_ref())
        .split(area);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(rows[0]);

    let summary = crate::metrics::summarize(&snapshot.view);
    render_label_bars(f, top[0], &summary);
    let scores: Vec<f64> = snapshot.view.iter().map(|p| p.score()).collect();
    render_score_box_plot(f, top[1], &scores);
    render_job_panel(f, rows[1], snapshot);
}
