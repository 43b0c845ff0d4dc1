use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::booking::{DurationUnit, RequestedDuration};
use crate::domain::catalog::FrequencyRow;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustedDuration {
    pub duration: Decimal,
    pub unit: DurationUnit,
    pub display_text: Option<String>,
    pub shortened: bool,
}

impl AdjustedDuration {
    fn unchanged(requested: &RequestedDuration) -> Self {
        Self {
            duration: requested.parsed().unwrap_or(Decimal::ZERO),
            unit: requested.unit,
            display_text: None,
            shortened: false,
        }
    }
}

/// Effective job length for visits of a recurring frequency that shortens
/// subsequent appointments.
///
/// The result is informational only: hourly pricing keeps using the
/// requested duration.
pub fn adjust_duration(
    frequency: Option<&FrequencyRow>,
    requested: &RequestedDuration,
    is_first_appointment: bool,
) -> AdjustedDuration {
    let Some(frequency) = frequency else {
        return AdjustedDuration::unchanged(requested);
    };
    if !frequency.is_recurring() || !frequency.shorter_job_length {
        return AdjustedDuration::unchanged(requested);
    }
    if is_first_appointment && frequency.exclude_first_appointment {
        return AdjustedDuration::unchanged(requested);
    }

    let percent = frequency.shorter_job_length_by.unwrap_or(Decimal::ZERO);
    if percent <= Decimal::ZERO {
        return AdjustedDuration::unchanged(requested);
    }
    let Some(original) = requested.parsed() else {
        return AdjustedDuration::unchanged(requested);
    };

    let Some(reduced) = original.checked_mul(Decimal::ONE - percent / Decimal::ONE_HUNDRED) else {
        return AdjustedDuration::unchanged(requested);
    };

    match requested.unit {
        DurationUnit::Hours => {
            let whole = reduced.trunc();
            let minutes = ((reduced - whole) * Decimal::from(60)).round();
            AdjustedDuration {
                duration: reduced.normalize(),
                unit: DurationUnit::Hours,
                display_text: Some(hours_display(whole, minutes)),
                shortened: true,
            }
        }
        DurationUnit::Minutes => AdjustedDuration {
            duration: reduced.round(),
            unit: DurationUnit::Minutes,
            display_text: None,
            shortened: true,
        },
    }
}

/// Remainders under half an hour are dropped from the text; larger ones are
/// shown as minutes and never carried into the hour.
fn hours_display(whole: Decimal, minutes: Decimal) -> String {
    let hours = whole.to_i64().unwrap_or_default();
    let minutes = minutes.to_i64().unwrap_or_default();

    if minutes < 30 {
        format!("{hours} Hr")
    } else {
        format!("{hours} Hr {minutes} Min")
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::booking::{DurationUnit, RequestedDuration};
    use crate::domain::catalog::{FrequencyRow, OccurrenceTime};

    use super::adjust_duration;

    fn weekly(percent: &str, exclude_first: bool) -> FrequencyRow {
        FrequencyRow {
            id: "f-2".to_string(),
            name: "Weekly".to_string(),
            occurrence_time: OccurrenceTime::Recurring,
            shorter_job_length: true,
            shorter_job_length_by: crate::numeric::parse_decimal(percent),
            exclude_first_appointment: exclude_first,
            ..Default::default()
        }
    }

    fn hours(value: &str) -> RequestedDuration {
        RequestedDuration { value: value.to_string(), unit: DurationUnit::Hours }
    }

    #[test]
    fn quarter_reduction_of_four_hours_reads_three_hours() {
        let result = adjust_duration(Some(&weekly("25", false)), &hours("04"), false);

        assert!(result.shortened);
        assert_eq!(result.duration, Decimal::from(3));
        assert_eq!(result.display_text.as_deref(), Some("3 Hr"));
    }

    #[test]
    fn half_hour_remainder_is_shown_as_minutes() {
        let result = adjust_duration(Some(&weekly("30", false)), &hours("5"), false);

        assert_eq!(result.duration, Decimal::new(35, 1));
        assert_eq!(result.display_text.as_deref(), Some("3 Hr 30 Min"));
    }

    #[test]
    fn short_remainder_is_dropped_from_display() {
        let result = adjust_duration(Some(&weekly("10", false)), &hours("2.5"), false);

        assert_eq!(result.duration, Decimal::new(225, 2));
        assert_eq!(result.display_text.as_deref(), Some("2 Hr"));
    }

    #[test]
    fn minutes_round_to_whole_minutes() {
        let requested = RequestedDuration { value: "95".to_string(), unit: DurationUnit::Minutes };
        let result = adjust_duration(Some(&weekly("15", false)), &requested, false);

        assert_eq!(result.duration, Decimal::from(81));
        assert_eq!(result.unit, DurationUnit::Minutes);
        assert_eq!(result.display_text, None);
    }

    #[test]
    fn out_of_range_reduction_leaves_duration_unchanged() {
        let result = adjust_duration(
            Some(&weekly("10000000000000000000000000000", false)),
            &hours("100000"),
            false,
        );

        assert!(!result.shortened);
        assert_eq!(result.duration, Decimal::from(100_000));
    }

    #[test]
    fn first_visit_keeps_full_length_when_excluded() {
        let result = adjust_duration(Some(&weekly("25", true)), &hours("4"), true);

        assert!(!result.shortened);
        assert_eq!(result.duration, Decimal::from(4));

        let later = adjust_duration(Some(&weekly("25", true)), &hours("4"), false);
        assert!(later.shortened);
    }

    #[test]
    fn no_change_for_one_time_or_disabled_or_non_positive() {
        let mut one_time = weekly("25", false);
        one_time.occurrence_time = OccurrenceTime::OneTime;
        assert!(!adjust_duration(Some(&one_time), &hours("4"), false).shortened);

        let mut disabled = weekly("25", false);
        disabled.shorter_job_length = false;
        assert!(!adjust_duration(Some(&disabled), &hours("4"), false).shortened);

        assert!(!adjust_duration(Some(&weekly("0", false)), &hours("4"), false).shortened);
        assert!(!adjust_duration(Some(&weekly("junk", false)), &hours("4"), false).shortened);
        assert!(!adjust_duration(None, &hours("4"), false).shortened);
    }
}
