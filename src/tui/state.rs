use crate::dashboard::Dashboard;
use crate::model::RunForm;
use crate::reveal::CounterReveal;
use ratatui::{
    style::Color,
    style::Style,
    text::{Line, Span},
};
use std::time::Instant;

pub const TAB_DASHBOARD: usize = 0;
pub const TAB_ABOUT: usize = 1;
pub const TAB_HELP: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    TargetUrl,
    Users,
    Duration,
    RampUp,
}

impl FormField {
    pub const ALL: [FormField; 4] = [
        FormField::TargetUrl,
        FormField::Users,
        FormField::Duration,
        FormField::RampUp,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FormField::TargetUrl => "Target URL",
            FormField::Users => "Users",
            FormField::Duration => "Duration (s)",
            FormField::RampUp => "Ramp-up (s)",
        }
    }

    pub fn next(self) -> Self {
        match self {
            FormField::TargetUrl => FormField::Users,
            FormField::Users => FormField::Duration,
            FormField::Duration => FormField::RampUp,
            FormField::RampUp => FormField::TargetUrl,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            FormField::TargetUrl => FormField::RampUp,
            FormField::Users => FormField::TargetUrl,
            FormField::Duration => FormField::Users,
            FormField::RampUp => FormField::Duration,
        }
    }
}

pub struct UiState {
    pub tab: usize,
    pub info: String,
    pub dashboard: Dashboard,
    pub form: RunForm,
    /// Field currently receiving keystrokes, if the form is being edited.
    pub editing: Option<FormField>,
    pub engine_url: String,
    pub about: Vec<CounterReveal>,
    pub about_last_frame: Instant,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tab: TAB_DASHBOARD,
            info: String::new(),
            dashboard: Dashboard::default(),
            form: RunForm::default(),
            editing: None,
            engine_url: String::new(),
            about: Vec::new(),
            about_last_frame: Instant::now(),
        }
    }
}

impl UiState {
    pub fn field(&self, field: FormField) -> &str {
        match field {
            FormField::TargetUrl => &self.form.target_url,
            FormField::Users => &self.form.users,
            FormField::Duration => &self.form.duration,
            FormField::RampUp => &self.form.ramp_up,
        }
    }

    pub fn field_mut(&mut self, field: FormField) -> &mut String {
        match field {
            FormField::TargetUrl => &mut self.form.target_url,
            FormField::Users => &mut self.form.users,
            FormField::Duration => &mut self.form.duration,
            FormField::RampUp => &mut self.form.ramp_up,
        }
    }

    pub fn type_char(&mut self, c: char) {
        if let Some(field) = self.editing {
            let numeric = field != FormField::TargetUrl;
            if !numeric || c.is_ascii_digit() {
                self.field_mut(field).push(c);
            }
        }
    }

    pub fn backspace(&mut self) {
        if let Some(field) = self.editing {
            self.field_mut(field).pop();
        }
    }

    /// Restart the About counters from zero.
    pub fn open_about(&mut self, now: Instant) {
        self.tab = TAB_ABOUT;
        self.about = vec![
            CounterReveal::new("Uptime", 99.9),
            CounterReveal::new("Support", 24.0),
            CounterReveal::new(
                "Requests this session",
                self.dashboard.total_requests as f64,
            ),
        ];
        self.about_last_frame = now;
    }

    pub fn tick_about(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.about_last_frame);
        let frame = crate::reveal::REVEAL_FRAME_INTERVAL;
        if elapsed < frame {
            return;
        }
        for c in &mut self.about {
            c.advance_by(elapsed);
        }
        // keep the sub-frame remainder so the animation speed is independent of redraw rate
        let whole = frame * (elapsed.as_millis() / frame.as_millis()) as u32;
        self.about_last_frame += whole;
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
