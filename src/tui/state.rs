use crate::model::{DashboardEvent, DashboardSnapshot, JobPhase};
use ratatui::{
    style::Color,
    style::Style,
    text::{Line, Span},
};

pub const TAB_POSTS: usize = 0;
pub const TAB_SUMMARY: usize = 1;
pub const TAB_HELP: usize = 2;
pub const TAB_COUNT: usize = 3;

#[derive(Default)]
pub struct UiState {
    pub tab: usize,
    pub info: String,
    /// Latest controller snapshot; None until the first one arrives.
    pub snapshot: Option<DashboardSnapshot>,
    // Query editing
    pub query_editing: bool,
    pub query_input: String,
    // Post list navigation
    pub selected: usize,
    pub scroll_offset: usize,
    /// Post list rows visible in the last drawn frame.
    pub list_rows: usize,
}

impl UiState {
    pub fn view_len(&self) -> usize {
        self.snapshot.as_ref().map(|s| s.view.len()).unwrap_or(0)
    }

    /// Keep the selection inside the current view after it changed underneath us.
    pub fn clamp_selection(&mut self) {
        let len = self.view_len();
        if len == 0 {
            self.selected = 0;
            self.scroll_offset = 0;
            return;
        }
        if self.selected >= len {
            self.selected = len - 1;
        }
        if self.scroll_offset > self.selected {
            self.scroll_offset = self.selected;
        }
    }

    pub fn select_prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            if self.selected < self.scroll_offset {
                self.scroll_offset = self.selected;
            }
        }
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.view_len() {
            self.selected += 1;
            self.keep_selection_visible();
        }
    }

    /// Record the list height of the frame being drawn; a shrink may push the selection off screen.
    pub fn set_list_rows(&mut self, rows: usize) {
        self.list_rows = rows;
        self.keep_selection_visible();
    }

    fn keep_selection_visible(&mut self) {
        let rows = self.list_rows.max(1);
        if self.selected >= self.scroll_offset + rows {
            self.scroll_offset = self.selected + 1 - rows;
        }
    }

    pub fn job_phase(&self) -> JobPhase {
        self.snapshot
            .as_ref()
            .map(|s| s.job.phase)
            .unwrap_or_default()
    }
}

/// Apply a controller event to UI state.
pub fn apply_event(state: &mut UiState, ev: DashboardEvent) {
    match ev {
        DashboardEvent::Snapshot(snapshot) => {
            let filter_changed = state
                .snapshot
                .as_ref()
                .map(|old| old.filter != snapshot.filter || old.sort != snapshot.sort)
                .unwrap_or(false);
            state.snapshot = Some(*snapshot);
            if filter_changed {
                state.selected = 0;
                state.scroll_offset = 0;
            }
            state.clamp_selection();
        }
        DashboardEvent::Info(info) => state.info = info.to_message(),
    }
}

/// Next ticker in the cycle: no filter, then each available ticker in order, then no filter again.
pub fn next_ticker(current: &str, available: &[String]) -> String {
    if current.is_empty() {
        return available.first().cloned().unwrap_or_default();
    }
    match available.iter().position(|t| t == current) {
        Some(i) => available.get(i + 1).cloned().unwrap_or_default(),
        None => String::new(),
    }
}

pub fn label_color(label: &str) -> Color {
    match label {
        "bullish" => Color::Green,
        "bearish" => Color::Red,
        "neutral" => Color::Gray,
        _ => Color::Yellow,
    }
}

pub fn phase_color(phase: JobPhase) -> Color {
    match phase {
        JobPhase::Idle => Color::Gray,
        JobPhase::Starting | JobPhase::Running => Color::Yellow,
        JobPhase::Succeeded => Color::Green,
        JobPhase::Failed | JobPhase::TimedOut => Color::Red,
    }
}

pub fn push_wrapped_status_kv(
    out: &mut Vec<Line<'static>>,
    label: &str,
    value: &str,
    status_area_width: u16,
) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }

    // Account for borders (2 chars on each side)
    let usable_width = status_area_width.saturating_sub(4).max(1);
    let label_text = format!("{label}:");
    let label_width = label_text.chars().count() as u16;

    let value_chars: Vec<char> = value.chars().collect();
    let mut remaining = value_chars.as_slice();
    let mut first = true;

    while !remaining.is_empty() {
        let line_width = if first {
            usable_width.saturating_sub(label_width + 1).max(1)
        } else {
            usable_width.saturating_sub(2).max(1)
        };

        let chars_to_take = (remaining.len() as u16).min(line_width) as usize;
        let (line_chars, rest) = remaining.split_at(chars_to_take);
        let line_text: String = line_chars.iter().collect();

        if first {
            out.push(Line::from(vec![
                Span::styled(label_text.clone(), Style::default().fg(Color::Gray)),
                Span::raw(" "),
                Span::raw(line_text),
            ]));
            first = false;
        } else {
            out.push(Line::from(vec![Span::raw("  "), Span::raw(line_text)]));
        }

        remaining = rest;
    }
}
