//! Adherence summaries over dose logs, and the two-sample vital trend shown
//! on dashboards.

use serde::{Deserialize, Serialize};

use crate::models::MedicationLog;
use crate::types::DoseStatus;

/// Percentage thresholds for the coarse classification.
pub const GOOD_ADHERENCE: u8 = 80;
pub const MODERATE_ADHERENCE: u8 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Stable,
    Down,
}

impl Trend {
    pub fn from_percentage(percentage: u8) -> Self {
        if percentage >= GOOD_ADHERENCE {
            Self::Up
        } else if percentage >= MODERATE_ADHERENCE {
            Self::Stable
        } else {
            Self::Down
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdherenceRating {
    Good,
    Moderate,
    Poor,
}

impl AdherenceRating {
    pub fn from_percentage(percentage: u8) -> Self {
        match Trend::from_percentage(percentage) {
            Trend::Up => Self::Good,
            Trend::Stable => Self::Moderate,
            Trend::Down => Self::Poor,
        }
    }
}

/// Taken doses over all scheduled doses in a period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adherence {
    pub percentage: u8,
    pub taken: usize,
    pub total: usize,
}

impl Adherence {
    /// Summarize a set of dose statuses.  Order does not matter; an empty set
    /// yields zero everywhere.
    pub fn from_statuses<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = DoseStatus>,
    {
        let (taken, total) = statuses.into_iter().fold((0usize, 0usize), |(taken, total), s| {
            (taken + usize::from(s == DoseStatus::Taken), total + 1)
        });

        if total == 0 {
            return Self::default();
        }

        let percentage = (100.0 * taken as f64 / total as f64).round() as u8;
        Self {
            percentage,
            taken,
            total,
        }
    }

    pub fn from_logs(logs: &[MedicationLog]) -> Self {
        Self::from_statuses(logs.iter().map(|l| l.status))
    }

    pub fn trend(&self) -> Trend {
        Trend::from_percentage(self.percentage)
    }

    pub fn rating(&self) -> AdherenceRating {
        AdherenceRating::from_percentage(self.percentage)
    }
}

/// Adherence plus its classification, as returned to dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdherenceSummary {
    #[serde(flatten)]
    pub adherence: Adherence,
    pub trend: Trend,
    pub rating: AdherenceRating,
}

impl From<Adherence> for AdherenceSummary {
    fn from(adherence: Adherence) -> Self {
        Self {
            adherence,
            trend: adherence.trend(),
            rating: adherence.rating(),
        }
    }
}

// ---------------------------------------------------------------------------
// Vital trend
// ---------------------------------------------------------------------------

/// Direction and size of the change between the two latest samples of one
/// vital.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VitalTrend {
    pub direction: Trend,
    /// Percent change from the previous sample, rounded to one decimal.
    pub percent_change: f64,
}

impl VitalTrend {
    pub fn stable() -> Self {
        Self {
            direction: Trend::Stable,
            percent_change: 0.0,
        }
    }
}

/// Compare the last two samples (ordered oldest first).  Fewer than two
/// samples, or no change, is `stable`.
pub fn vital_trend(samples: &[f64]) -> VitalTrend {
    let [.., previous, latest] = samples else {
        return VitalTrend::stable();
    };

    let delta = latest - previous;
    let direction = if delta > 0.0 {
        Trend::Up
    } else if delta < 0.0 {
        Trend::Down
    } else {
        Trend::Stable
    };

    let percent_change = if *previous == 0.0 {
        0.0
    } else {
        (delta / previous * 1000.0).round() / 10.0
    };

    VitalTrend {
        direction,
        percent_change,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DoseStatus::*;

    #[test]
    fn test_empty_logs() {
        let a = Adherence::from_statuses([]);
        assert_eq!(
            a,
            Adherence {
                percentage: 0,
                taken: 0,
                total: 0
            }
        );
    }

    #[test]
    fn test_mixed_logs() {
        let a = Adherence::from_statuses([Taken, Taken, Skipped, Pending]);
        assert_eq!(
            a,
            Adherence {
                percentage: 50,
                taken: 2,
                total: 4
            }
        );
    }

    #[test]
    fn test_percentage_rounds() {
        assert_eq!(Adherence::from_statuses([Taken, Missed, Missed]).percentage, 33);
        assert_eq!(Adherence::from_statuses([Taken, Taken, Missed]).percentage, 67);
    }

    #[test]
    fn test_classification() {
        assert_eq!(Trend::from_percentage(85), Trend::Up);
        assert_eq!(AdherenceRating::from_percentage(85), AdherenceRating::Good);
        assert_eq!(Trend::from_percentage(70), Trend::Stable);
        assert_eq!(AdherenceRating::from_percentage(70), AdherenceRating::Moderate);
        assert_eq!(Trend::from_percentage(40), Trend::Down);
        assert_eq!(AdherenceRating::from_percentage(40), AdherenceRating::Poor);

        assert_eq!(Trend::from_percentage(80), Trend::Up);
        assert_eq!(Trend::from_percentage(60), Trend::Stable);
        assert_eq!(Trend::from_percentage(59), Trend::Down);
    }

    #[test]
    fn test_summary_serializes_flat() {
        let summary = AdherenceSummary::from(Adherence::from_statuses([Taken]));
        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json["percentage"], 100);
        assert_eq!(json["trend"], "up");
        assert_eq!(json["rating"], "good");
    }

    #[test]
    fn test_vital_trend() {
        let up = vital_trend(&[70.0, 80.0, 88.0]);
        assert_eq!(up.direction, Trend::Up);
        assert_eq!(up.percent_change, 10.0);

        let down = vital_trend(&[150.0, 120.0]);
        assert_eq!(down.direction, Trend::Down);
        assert_eq!(down.percent_change, -20.0);

        assert_eq!(vital_trend(&[72.0, 72.0]).direction, Trend::Stable);
        assert_eq!(vital_trend(&[72.0]), VitalTrend::stable());
        assert_eq!(vital_trend(&[]), VitalTrend::stable());
    }
}
