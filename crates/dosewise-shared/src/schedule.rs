//! Dose-time resolution.
//!
//! A medication's frequency label maps to a canonical set of daily dose times
//! starting at 08:00.  Patients may replace that set with their own custom
//! times; [`DoseTimes`] models the editor state for that override.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::TimeOfDay;

/// Recognized frequency labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    OnceDaily,
    Every12Hours,
    Every8Hours,
    Every6Hours,
}

impl Frequency {
    pub const ALL: [Frequency; 4] = [
        Frequency::OnceDaily,
        Frequency::Every12Hours,
        Frequency::Every8Hours,
        Frequency::Every6Hours,
    ];

    /// Match a stored label.  Unrecognized labels return `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "1x ao dia" => Some(Self::OnceDaily),
            "12/12h" => Some(Self::Every12Hours),
            "8/8h" => Some(Self::Every8Hours),
            "6/6h" => Some(Self::Every6Hours),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::OnceDaily => "1x ao dia",
            Self::Every12Hours => "12/12h",
            Self::Every8Hours => "8/8h",
            Self::Every6Hours => "6/6h",
        }
    }

    pub fn doses_per_day(&self) -> u32 {
        match self {
            Self::OnceDaily => 1,
            Self::Every12Hours => 2,
            Self::Every8Hours => 3,
            Self::Every6Hours => 4,
        }
    }

    /// Evenly spaced times starting at the first dose, wrapping past midnight.
    pub fn default_times(&self) -> Vec<TimeOfDay> {
        let period = 24 / self.doses_per_day();
        (0..self.doses_per_day())
            .filter_map(|i| TimeOfDay::new((FIRST_DOSE_HOUR + i * period) % 24, 0))
            .collect()
    }
}

/// Hour of the first dose of the day for every frequency.
const FIRST_DOSE_HOUR: u32 = 8;

/// Default dose times for a frequency label, in schedule order.  Unknown
/// labels get the single once-a-day slot.
pub fn default_times(label: &str) -> Vec<TimeOfDay> {
    Frequency::from_label(label)
        .unwrap_or(Frequency::OnceDaily)
        .default_times()
}

/// Effective dose times: the custom list sorted ascending when non-empty,
/// otherwise the label's defaults.
pub fn resolve_times(label: &str, custom: &[TimeOfDay]) -> Vec<TimeOfDay> {
    if custom.is_empty() {
        return default_times(label);
    }
    let mut times = custom.to_vec();
    times.sort();
    times.dedup();
    times
}

/// Concrete UTC instants of each dose time on `date`, in clock order.
pub fn daily_slots(date: NaiveDate, times: &[TimeOfDay]) -> Vec<DateTime<Utc>> {
    let mut slots: Vec<DateTime<Utc>> = times
        .iter()
        .map(|t| date.and_time(t.as_naive()).and_utc())
        .collect();
    slots.sort();
    slots.dedup();
    slots
}

// ---------------------------------------------------------------------------
// Editor state
// ---------------------------------------------------------------------------

/// Dose-time editor state behind the medication form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoseTimes {
    frequency: String,
    use_custom: bool,
    custom: Vec<TimeOfDay>,
}

impl DoseTimes {
    pub fn new(frequency: impl Into<String>) -> Self {
        Self {
            frequency: frequency.into(),
            use_custom: false,
            custom: Vec::new(),
        }
    }

    /// Start from an existing medication's stored custom times.
    pub fn with_custom(frequency: impl Into<String>, custom: Vec<TimeOfDay>) -> Self {
        let mut state = Self::new(frequency);
        if !custom.is_empty() {
            state.use_custom = true;
            state.custom = resolve_times(&state.frequency, &custom);
        }
        state
    }

    pub fn frequency(&self) -> &str {
        &self.frequency
    }

    pub fn uses_custom(&self) -> bool {
        self.use_custom
    }

    pub fn custom_times(&self) -> &[TimeOfDay] {
        &self.custom
    }

    /// Times the medication will actually be scheduled at.
    pub fn effective_times(&self) -> Vec<TimeOfDay> {
        if self.use_custom {
            resolve_times(&self.frequency, &self.custom)
        } else {
            default_times(&self.frequency)
        }
    }

    /// Custom times to persist: empty unless the override is active.
    pub fn times_to_save(&self) -> Vec<TimeOfDay> {
        if self.use_custom {
            self.custom.clone()
        } else {
            Vec::new()
        }
    }

    /// Change the label.  An active, non-empty custom list is kept as is; an
    /// active but empty one is seeded from the new label's defaults.
    pub fn set_frequency(&mut self, label: impl Into<String>) {
        self.frequency = label.into();
        if self.use_custom && self.custom.is_empty() {
            self.custom = default_times(&self.frequency);
            self.custom.sort();
        }
    }

    /// Toggle the override.  Turning it off clears the custom list; turning it
    /// on with an empty list seeds it from the current defaults.
    pub fn set_custom(&mut self, enabled: bool) {
        self.use_custom = enabled;
        if !enabled {
            self.custom.clear();
        } else if self.custom.is_empty() {
            self.custom = default_times(&self.frequency);
            self.custom.sort();
        }
    }

    /// Add a custom time, keeping the list sorted.  Returns `false` when the
    /// time is already present.
    pub fn add_time(&mut self, time: TimeOfDay) -> bool {
        if self.custom.contains(&time) {
            return false;
        }
        self.custom.push(time);
        self.custom.sort();
        true
    }

    /// Remove a custom time.  Returns `false` when it was not present.
    pub fn remove_time(&mut self, time: TimeOfDay) -> bool {
        let before = self.custom.len();
        self.custom.retain(|t| *t != time);
        self.custom.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    fn text(times: &[TimeOfDay]) -> Vec<String> {
        times.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_default_times_for_known_labels() {
        assert_eq!(text(&default_times("1x ao dia")), ["08:00"]);
        assert_eq!(text(&default_times("12/12h")), ["08:00", "20:00"]);
        assert_eq!(text(&default_times("8/8h")), ["08:00", "16:00", "00:00"]);
        assert_eq!(text(&default_times("6/6h")), ["08:00", "14:00", "20:00", "02:00"]);
    }

    #[test]
    fn test_unknown_label_falls_back() {
        assert_eq!(text(&default_times("xyz")), ["08:00"]);
        assert_eq!(text(&default_times("")), ["08:00"]);
    }

    #[test]
    fn test_label_round_trip() {
        for f in Frequency::ALL {
            assert_eq!(Frequency::from_label(f.label()), Some(f));
        }
    }

    #[test]
    fn test_resolve_prefers_sorted_custom() {
        let custom = vec![t("22:00"), t("07:30")];
        assert_eq!(text(&resolve_times("8/8h", &custom)), ["07:30", "22:00"]);
        assert_eq!(text(&resolve_times("12/12h", &[])), ["08:00", "20:00"]);
    }

    #[test]
    fn test_daily_slots() {
        let date = NaiveDate::from_ymd_opt(2026, 5, 4).unwrap();
        let slots = daily_slots(date, &default_times("8/8h"));
        let hours: Vec<String> = slots.iter().map(|s| s.format("%H:%M").to_string()).collect();
        assert_eq!(hours, ["00:00", "08:00", "16:00"]);
        assert!(slots.iter().all(|s| s.date_naive() == date));
    }

    #[test]
    fn test_add_duplicate_is_noop() {
        let mut state = DoseTimes::new("12/12h");
        state.set_custom(true);
        assert_eq!(state.custom_times().len(), 2);
        assert!(!state.add_time(t("20:00")));
        assert_eq!(state.custom_times().len(), 2);
        assert!(state.add_time(t("13:00")));
        assert_eq!(text(state.custom_times()), ["08:00", "13:00", "20:00"]);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut state = DoseTimes::with_custom("1x ao dia", vec![t("09:00"), t("21:00")]);
        assert!(!state.remove_time(t("10:00")));
        assert_eq!(text(state.custom_times()), ["09:00", "21:00"]);
        assert!(state.remove_time(t("09:00")));
        assert_eq!(text(state.custom_times()), ["21:00"]);
    }

    #[test]
    fn test_toggle_off_reverts_to_defaults() {
        let mut state = DoseTimes::with_custom("12/12h", vec![t("06:00")]);
        assert_eq!(text(&state.effective_times()), ["06:00"]);
        state.set_custom(false);
        assert!(state.custom_times().is_empty());
        assert!(state.times_to_save().is_empty());
        assert_eq!(text(&state.effective_times()), ["08:00", "20:00"]);
    }

    #[test]
    fn test_toggle_on_seeds_from_defaults() {
        let mut state = DoseTimes::new("6/6h");
        state.set_custom(true);
        assert_eq!(text(state.custom_times()), ["02:00", "08:00", "14:00", "20:00"]);
    }

    #[test]
    fn test_label_change_keeps_active_custom_times() {
        let mut state = DoseTimes::with_custom("12/12h", vec![t("10:00")]);
        state.set_frequency("6/6h");
        assert_eq!(text(state.custom_times()), ["10:00"]);

        let mut inactive = DoseTimes::new("12/12h");
        inactive.set_frequency("8/8h");
        assert_eq!(text(&inactive.effective_times()), ["08:00", "16:00", "00:00"]);
    }

    #[test]
    fn test_label_change_seeds_empty_custom_list() {
        let mut state = DoseTimes::new("12/12h");
        state.set_custom(true);
        state.remove_time(t("08:00"));
        state.remove_time(t("20:00"));
        assert!(state.uses_custom() && state.custom_times().is_empty());

        state.set_frequency("8/8h");
        assert_eq!(text(state.custom_times()), ["00:00", "08:00", "16:00"]);
    }
}
