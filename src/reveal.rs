//! Animated counters for the About tab.
//!
//! A counter climbs from 0 to its target over a fixed number of frames. A few targets
//! read better in a domain notation than as a literal count: `99.9` is shown as an
//! availability percentage and `24` as round-the-clock coverage (`24/7`).

use std::time::Duration;

pub const REVEAL_STEPS: u32 = 100;
pub const REVEAL_FRAME_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealFormat {
    Percent,
    PerWeek,
    Count,
}

impl RevealFormat {
    pub fn for_target(target: f64) -> Self {
        if (target - 99.9).abs() < 1e-9 {
            RevealFormat::Percent
        } else if target == 24.0 {
            RevealFormat::PerWeek
        } else {
            RevealFormat::Count
        }
    }

    pub fn render(self, value: f64) -> String {
        match self {
            RevealFormat::Percent => format!("{value:.1}%"),
            RevealFormat::PerWeek => format!("{}/7", value.floor() as u64),
            RevealFormat::Count => group_thousands(value.floor().max(0.0) as u64),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CounterReveal {
    pub label: String,
    target: f64,
    step: u32,
    format: RevealFormat,
}

impl CounterReveal {
    pub fn new(label: impl Into<String>, target: f64) -> Self {
        Self {
            label: label.into(),
            target,
            step: 0,
            format: RevealFormat::for_target(target),
        }
    }

    /// Move one frame forward. Saturates at the target.
    pub fn advance(&mut self) {
        self.step = (self.step + 1).min(REVEAL_STEPS);
    }

    /// Advance by however many frames fit into `elapsed`.
    pub fn advance_by(&mut self, elapsed: Duration) {
        let frames = (elapsed.as_millis() / REVEAL_FRAME_INTERVAL.as_millis()) as u32;
        self.step = self.step.saturating_add(frames).min(REVEAL_STEPS);
    }

    pub fn is_done(&self) -> bool {
        self.step >= REVEAL_STEPS
    }

    pub fn value(&self) -> f64 {
        if self.is_done() {
            self.target
        } else {
            self.target * f64::from(self.step) / f64::from(REVEAL_STEPS)
        }
    }

    pub fn display(&self) -> String {
        self.format.render(self.value())
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
