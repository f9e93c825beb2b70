use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Focus modes offered by the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerMode {
    Pomodoro,
    DeepWork,
    MockTest,
    Custom,
}

impl TimerMode {
    pub fn label(&self) -> &'static str {
        match self {
            TimerMode::Pomodoro => "Pomodoro",
            TimerMode::DeepWork => "Deep Work",
            TimerMode::MockTest => "Mock Test",
            TimerMode::Custom => "Custom",
        }
    }

    /// Only Pomodoro runs follow the focus/break cadence.
    pub fn supports_breaks(&self) -> bool {
        matches!(self, TimerMode::Pomodoro)
    }
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TimerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['_', ' '], "-").as_str() {
            "pomodoro" => Ok(TimerMode::Pomodoro),
            "deep-work" | "deep" => Ok(TimerMode::DeepWork),
            "mock-test" | "mock" => Ok(TimerMode::MockTest),
            "custom" => Ok(TimerMode::Custom),
            other => Err(format!("unknown timer mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakKind {
    Short,
    Long,
}

impl fmt::Display for BreakKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BreakKind::Short => "Short Break",
            BreakKind::Long => "Long Break",
        })
    }
}

/// Lengths (in minutes) used by mode presets and breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presets {
    pub pomodoro_minutes: u64,
    pub deep_work_minutes: u64,
    pub mock_test_minutes: u64,
    pub custom_minutes: u64,
    pub short_break_minutes: u64,
    pub long_break_minutes: u64,
    pub pomodoros_before_long_break: u32,
}

impl Default for Presets {
    fn default() -> Self {
        Self {
            pomodoro_minutes: 25,
            deep_work_minutes: 50,
            mock_test_minutes: 180,
            custom_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
            pomodoros_before_long_break: 4,
        }
    }
}

impl Presets {
    pub fn minutes_for(&self, mode: TimerMode) -> u64 {
        match mode {
            TimerMode::Pomodoro => self.pomodoro_minutes,
            TimerMode::DeepWork => self.deep_work_minutes,
            TimerMode::MockTest => self.mock_test_minutes,
            TimerMode::Custom => self.custom_minutes,
        }
    }

    pub fn break_minutes(&self, kind: BreakKind) -> u64 {
        match kind {
            BreakKind::Short => self.short_break_minutes,
            BreakKind::Long => self.long_break_minutes,
        }
    }

    /// Break to offer after the `completed`-th Pomodoro.
    pub fn break_after(&self, completed: u32) -> BreakKind {
        let every = self.pomodoros_before_long_break.max(1);
        if completed > 0 && completed % every == 0 {
            BreakKind::Long
        } else {
            BreakKind::Short
        }
    }
}

/// `m:ss`, or `h:mm:ss` from one hour up.
pub fn format_clock(secs: u64) -> String {
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_fourth_pomodoro_earns_a_long_break() {
        let presets = Presets::default();
        let kinds: Vec<_> = (1..=8).map(|n| presets.break_after(n)).collect();
        assert_eq!(kinds[2], BreakKind::Short);
        assert_eq!(kinds[3], BreakKind::Long);
        assert_eq!(kinds[7], BreakKind::Long);
    }

    #[test]
    fn mode_parsing_accepts_cli_spellings() {
        assert_eq!("deep-work".parse::<TimerMode>().unwrap(), TimerMode::DeepWork);
        assert_eq!("Mock Test".parse::<TimerMode>().unwrap(), TimerMode::MockTest);
        assert!("marathon".parse::<TimerMode>().is_err());
    }

    #[test]
    fn clock_formatting() {
        assert_eq!(format_clock(0), "0:00");
        assert_eq!(format_clock(25 * 60), "25:00");
        assert_eq!(format_clock(3 * 3600 + 5), "3:00:05");
    }
}
